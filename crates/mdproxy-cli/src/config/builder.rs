use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileParticleSource, FileStageConfig};
use super::models::AppConfig;
use crate::cli::{ParticleSourceArgs, RunArgs};
use crate::error::{CliError, Result};
use mdproxy::engine::config as core_config;
use std::str::FromStr;
use tracing::debug;

/// Resolves the run configuration. Command-line flags win over `--set` values, which
/// win over the config file, which wins over the built-in defaults.
pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let workers = args
        .workers
        .or(file_config.workers)
        .unwrap_or(defaults.workers);
    let time_step = args
        .time_step
        .or(file_config.time_step)
        .unwrap_or(defaults.time_step);

    let system_file = file_config.system.take().unwrap_or_default();
    let box_l = match system_file.box_l {
        Some(values) => box_from_values(&values)?,
        None => [defaults.box_length; 3],
    };
    let skin = system_file.skin.unwrap_or(defaults.skin);
    let seed = args.seed.or(system_file.seed).unwrap_or(defaults.seed);

    let particles = particles_from_cli(&args.particles)
        .or_else(|| file_config.particles.take().map(Into::into))
        .unwrap_or(core_config::ParticleSource::Lattice {
            per_side: defaults.lattice_per_side,
        });

    let interaction_file = file_config.interaction.take().unwrap_or_default();
    let cutoff = interaction_file.cutoff.unwrap_or(defaults.cutoff);
    let potentials = interaction_file
        .potentials
        .map(|list| list.into_iter().map(Into::into).collect())
        .unwrap_or_else(|| defaults.potentials());

    let schedule = merge_schedule(file_config.stages.take(), args, &defaults);
    let snapshot_path = args.xyz_out.clone().or(file_config.snapshot_out.take());

    debug!(
        workers,
        time_step,
        stages = schedule.len(),
        "Configuration sources merged."
    );

    let core_config = core_config::SimulationConfigBuilder::new()
        .box_l(box_l)
        .skin(skin)
        .seed(seed)
        .workers(workers)
        .particles(particles)
        .cutoff(cutoff)
        .potentials(potentials)
        .time_step(time_step)
        .schedule(schedule)
        .snapshot_path(snapshot_path)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        config_path: args.config.clone(),
        core_config,
    })
}

fn box_from_values(values: &[f64]) -> Result<[f64; 3]> {
    match *values {
        [edge] => Ok([edge; 3]),
        [x, y, z] => Ok([x, y, z]),
        _ => Err(CliError::Config(format!(
            "system.box takes one or three values, got {}",
            values.len()
        ))),
    }
}

fn particles_from_cli(args: &ParticleSourceArgs) -> Option<core_config::ParticleSource> {
    if let Some(per_side) = args.lattice {
        Some(core_config::ParticleSource::Lattice { per_side })
    } else if let Some(count) = args.random {
        Some(core_config::ParticleSource::Random { count })
    } else {
        args.restart
            .clone()
            .map(|path| core_config::ParticleSource::Snapshot { path })
    }
}

fn merge_schedule(
    file_stages: Option<Vec<FileStageConfig>>,
    args: &RunArgs,
    defaults: &DefaultsConfig,
) -> Vec<core_config::StageConfig> {
    let mut schedule = match file_stages {
        Some(stages) => stages
            .into_iter()
            .map(|stage| core_config::StageConfig {
                name: stage.name,
                blocks: stage.blocks,
                steps_per_block: stage.steps_per_block.unwrap_or(defaults.steps_per_block),
                thermostat: stage.thermostat.map(Into::into),
            })
            .collect(),
        None => defaults.schedule(),
    };

    if let Some(steps) = args.steps_per_block {
        for stage in &mut schedule {
            stage.steps_per_block = steps;
        }
    }
    if args.no_thermostat {
        schedule.retain(|stage| stage.thermostat.is_none());
    }
    schedule
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "workers" => {
                config.workers = Some(parse_value(key, value_str, "integer")?);
            }
            "time-step" => {
                config.time_step = Some(parse_value(key, value_str, "float")?);
            }
            "system.skin" => {
                config.system.get_or_insert_with(Default::default).skin =
                    Some(parse_value(key, value_str, "float")?);
            }
            "system.seed" => {
                config.system.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value_str, "integer")?);
            }
            "interaction.cutoff" => {
                config.interaction.get_or_insert_with(Default::default).cutoff =
                    Some(parse_value(key, value_str, "float")?);
            }
            "particles.per-side" => {
                config.particles = Some(FileParticleSource::Lattice {
                    per_side: parse_value(key, value_str, "integer")?,
                });
            }
            "particles.count" => {
                config.particles = Some(FileParticleSource::Random {
                    count: parse_value(key, value_str, "integer")?,
                });
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn base_run_args() -> RunArgs {
        RunArgs {
            config: None,
            workers: None,
            seed: None,
            particles: ParticleSourceArgs::default(),
            time_step: None,
            steps_per_block: None,
            no_thermostat: false,
            xyz_out: None,
            set_values: vec![],
        }
    }

    fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, toml).unwrap();
        path
    }

    #[test]
    fn defaults_reproduce_the_lj_run() {
        let app = build_config(&base_run_args()).expect("build ok");
        let cfg = app.core_config;

        assert!(app.config_path.is_none());
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.system.box_l, [10.0; 3]);
        assert_eq!(cfg.system.skin, 0.3);
        assert_eq!(
            cfg.particles,
            core_config::ParticleSource::Lattice { per_side: 10 }
        );
        assert_eq!(cfg.interaction.cutoff, 2.5);
        assert_eq!(cfg.interaction.potentials.len(), 2);
        assert_eq!(cfg.time_step, 0.005);

        let names: Vec<_> = cfg.schedule.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Equilibration", "Heat up", "Cool down"]);
        assert_eq!(cfg.total_steps(), (20 + 20 + 40) * 20);
        assert!(cfg.snapshot_path.is_none());
    }

    #[test]
    fn build_config_reads_file_and_merges() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            workers = 2
            [system]
            box = [12.0, 12.0, 6.0]
            seed = 99
            [particles]
            type = "random"
            count = 40
            [[stages]]
            name = "Warm"
            blocks = 3
            thermostat = { gamma = 1.0, temperature = 2.0 }
            "#,
        );
        let mut args = base_run_args();
        args.config = Some(path.clone());

        let app = build_config(&args).expect("build ok");
        let cfg = app.core_config;

        assert_eq!(app.config_path, Some(path));
        assert_eq!(cfg.workers, 2);
        assert_eq!(cfg.system.box_l, [12.0, 12.0, 6.0]);
        assert_eq!(cfg.system.seed, 99);
        assert_eq!(cfg.particles, core_config::ParticleSource::Random { count: 40 });
        assert_eq!(cfg.schedule.len(), 1);
        assert_eq!(cfg.schedule[0].steps_per_block, 20);
        assert_eq!(
            cfg.schedule[0].thermostat,
            Some(core_config::ThermostatConfig {
                gamma: 1.0,
                temperature: 2.0
            })
        );
        // Untouched sections fall back to the defaults.
        assert_eq!(cfg.interaction.cutoff, 2.5);
        assert_eq!(cfg.system.skin, 0.3);
    }

    #[test]
    fn cli_overrides_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
            workers = 2
            time-step = 0.01
            snapshot-out = "from-file.xyz"
            [particles]
            type = "random"
            count = 40
            "#,
        );
        let mut args = base_run_args();
        args.config = Some(path);
        args.workers = Some(4);
        args.time_step = Some(0.002);
        args.particles.lattice = Some(5);
        args.xyz_out = Some(PathBuf::from("from-cli.xyz"));

        let cfg = build_config(&args).expect("build ok").core_config;

        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.time_step, 0.002);
        assert_eq!(cfg.particles, core_config::ParticleSource::Lattice { per_side: 5 });
        assert_eq!(cfg.snapshot_path, Some(PathBuf::from("from-cli.xyz")));
    }

    #[test]
    fn set_values_override() {
        let mut args = base_run_args();
        args.set_values = vec![
            "workers=3".to_string(),
            "time-step=0.004".to_string(),
            "system.skin=0.5".to_string(),
            "system.seed=7".to_string(),
            "interaction.cutoff=2.0".to_string(),
            "particles.count=64".to_string(),
        ];

        let cfg = build_config(&args).expect("build ok").core_config;

        assert_eq!(cfg.workers, 3);
        assert!((cfg.time_step - 0.004).abs() < 1e-12);
        assert!((cfg.system.skin - 0.5).abs() < 1e-12);
        assert_eq!(cfg.system.seed, 7);
        assert!((cfg.interaction.cutoff - 2.0).abs() < 1e-12);
        assert_eq!(cfg.particles, core_config::ParticleSource::Random { count: 64 });
    }

    #[test]
    fn cli_flag_beats_set_value() {
        let mut args = base_run_args();
        args.workers = Some(2);
        args.set_values = vec!["workers=5".to_string()];
        let cfg = build_config(&args).expect("build ok").core_config;
        assert_eq!(cfg.workers, 2);
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        for bad in ["workers", "workers=many", "integrator.gamma=1.0"] {
            let mut args = base_run_args();
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_config(&args), Err(CliError::Config(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn steps_per_block_and_no_thermostat_reshape_the_schedule() {
        let mut args = base_run_args();
        args.steps_per_block = Some(5);
        args.no_thermostat = true;

        let cfg = build_config(&args).expect("build ok").core_config;

        assert_eq!(cfg.schedule.len(), 1);
        assert_eq!(cfg.schedule[0].name, "Equilibration");
        assert_eq!(cfg.schedule[0].steps_per_block, 5);
    }

    #[test]
    fn box_needs_one_or_three_values() {
        let dir = tempdir().unwrap();
        let path = write_config(&dir, "[system]\nbox = [10.0, 10.0]\n");
        let mut args = base_run_args();
        args.config = Some(path);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let mut args = base_run_args();
        args.time_step = Some(-1.0);
        match build_config(&args) {
            Err(CliError::Config(msg)) => assert!(msg.contains("time_step"), "{}", msg),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }
}
