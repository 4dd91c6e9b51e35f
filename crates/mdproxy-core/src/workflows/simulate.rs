use crate::core::analysis::EnergySample;
use crate::core::decomp::{cell_grid, node_grid};
use crate::core::forcefield::potentials::LennardJones;
use crate::core::io::xyz::{XyzFile, XyzSnapshot};
use crate::core::lattice::perturbed_lattice;
use crate::core::models::grid::Int3D;
use crate::core::models::ids::TypeId;
use crate::core::models::particle::Particle;
use crate::engine::config::{ParticleSource, SimulationConfig, StageConfig, ThermostatConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::protocol::SystemSetup;
use crate::engine::proxy::{
    Langevin, LennardJonesInteraction, System, Temperature, VelocityVerlet,
};
use crate::engine::session::Session;
use nalgebra::Vector3;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialShift {
    pub type_a: TypeId,
    pub type_b: TypeId,
    pub shift: f64,
}

impl fmt::Display for PotentialShift {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "potLJ({}, {}), shift = {}",
            self.type_a,
            self.type_b,
            format_g(self.shift)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub name: String,
    pub thermostat: Option<ThermostatConfig>,
    /// One sample per block, taken after the block's steps.
    pub samples: Vec<EnergySample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub node_grid: Int3D,
    pub cell_grid: Int3D,
    pub particle_count: usize,
    pub initial_time_step: f64,
    pub time_step: f64,
    pub shifts: Vec<PotentialShift>,
    pub initial: EnergySample,
    pub stages: Vec<StageReport>,
    pub final_step: u64,
    pub snapshot_path: Option<PathBuf>,
}

impl SimulationReport {
    /// The status lines of the run, in the order they were produced.
    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = grid_lines(self.node_grid, self.cell_grid).to_vec();
        lines.push(time_step_line(self.initial_time_step));
        lines.push(time_step_line(self.time_step));
        lines.extend(self.shifts.iter().map(PotentialShift::to_string));
        lines.push(self.initial.start_line());
        for stage in &self.stages {
            lines.push(stage_banner(&stage.name, stage.thermostat.as_ref()));
            lines.extend(stage.samples.iter().map(EnergySample::to_string));
        }
        lines
    }

    /// The last sample taken, or the initial one if no stage ran.
    pub fn final_sample(&self) -> &EnergySample {
        self.stages
            .iter()
            .rev()
            .find_map(|stage| stage.samples.last())
            .unwrap_or(&self.initial)
    }
}

/// Runs the configured simulation on a fresh worker pool whose integrators only advance
/// the clock.
pub fn run(
    config: &SimulationConfig,
    reporter: &ProgressReporter,
) -> Result<SimulationReport, EngineError> {
    let session = Session::start(config.workers)?;
    run_in(session, config, reporter)
}

/// Runs the configured simulation on an existing session.
#[instrument(skip_all, name = "simulation_workflow")]
pub fn run_in(
    session: Arc<Session>,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
) -> Result<SimulationReport, EngineError> {
    // === Phase 0: Storage and particles ===
    reporter.report(Progress::PhaseStart {
        name: "Setup".to_string(),
    });

    if session.size() != config.workers {
        warn!(
            configured = config.workers,
            running = session.size(),
            "Session size differs from the configured worker count; using the session."
        );
    }

    let (box_l, particles) = initial_particles(config, reporter)?;
    let nodes = node_grid(session.size());
    let range = config.interaction.cutoff + config.system.skin;
    let cells = cell_grid(&box_l, &nodes, range);
    info!(node_grid = %nodes, cell_grid = %cells, range, "Domain decomposition sized.");
    for line in grid_lines(nodes, cells) {
        reporter.report(Progress::Status(line));
    }

    let system = System::new(
        session,
        SystemSetup {
            box_l,
            skin: config.system.skin,
            seed: config.system.seed,
        },
    )?;
    system.decompose(nodes, cells)?;

    let particles = match particles {
        Some(particles) => particles,
        None => match &config.particles {
            ParticleSource::Random { count } => system.random_particles(*count, 0),
            _ => {
                return Err(EngineError::Internal(
                    "particle source produced no particles".to_string(),
                ));
            }
        },
    };
    system.add_particles(particles)?;
    system.resort()?;
    let particle_count = system.particle_count()?;
    info!(particle_count, "System populated.");

    // === Phase 1: Integrator and interactions ===
    let mut integrator = VelocityVerlet::with_default_time_step(&system)?;
    let initial_time_step = integrator.time_step();
    reporter.report(Progress::Status(time_step_line(initial_time_step)));
    integrator.set_time_step(config.time_step)?;
    reporter.report(Progress::Status(time_step_line(integrator.time_step())));

    let mut interaction = LennardJonesInteraction::new(&system, config.interaction.cutoff)?;
    let mut shifts = Vec::with_capacity(config.interaction.potentials.len());
    for pair in &config.interaction.potentials {
        let potential = LennardJones::new(pair.epsilon, pair.sigma, config.interaction.cutoff)?;
        interaction.set_potential(pair.type_a, pair.type_b, potential)?;
        let shift = PotentialShift {
            type_a: pair.type_a,
            type_b: pair.type_b,
            shift: potential.shift(),
        };
        reporter.report(Progress::Status(shift.to_string()));
        shifts.push(shift);
    }
    system.add_interaction(&interaction)?;

    let temperature = Temperature::new(&system);
    let initial = sample(integrator.step(), &interaction, &temperature, particle_count)?;
    reporter.report(Progress::Status(initial.start_line()));
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Stage schedule ===
    let mut thermostat: Option<Langevin> = None;
    let mut stages = Vec::with_capacity(config.schedule.len());
    for stage in &config.schedule {
        reporter.report(Progress::PhaseStart {
            name: stage.name.clone(),
        });
        configure_thermostat(&system, &mut integrator, &mut thermostat, stage)?;
        reporter.report(Progress::Status(stage_banner(
            &stage.name,
            stage.thermostat.as_ref(),
        )));

        reporter.report(Progress::TaskStart {
            total_steps: stage.total_steps(),
        });
        let mut samples = Vec::with_capacity(stage.blocks);
        for _ in 0..stage.blocks {
            integrator.run(stage.steps_per_block)?;
            let current = sample(integrator.step(), &interaction, &temperature, particle_count)?;
            reporter.report(Progress::TaskIncrement {
                amount: stage.steps_per_block,
            });
            reporter.report(Progress::StatusUpdate {
                text: format!("T = {:.4}, E = {:.4}", current.temperature, current.total()),
            });
            reporter.report(Progress::Status(current.to_string()));
            samples.push(current);
        }
        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);
        info!(stage = %stage.name, step = integrator.step(), "Stage finished.");

        stages.push(StageReport {
            name: stage.name.clone(),
            thermostat: stage.thermostat,
            samples,
        });
    }

    // === Phase 3: Final snapshot ===
    if let Some(path) = &config.snapshot_path {
        let snapshot = XyzSnapshot {
            box_l: system.box_l(),
            particles: system.snapshot()?,
        };
        XyzFile::write_to_path(&snapshot, path).map_err(|source| EngineError::Snapshot {
            path: path.clone(),
            source,
        })?;
        reporter.report(Progress::Message(format!(
            "Wrote {} particles to {}",
            snapshot.particles.len(),
            path.display()
        )));
    }

    let report = SimulationReport {
        node_grid: nodes,
        cell_grid: cells,
        particle_count,
        initial_time_step,
        time_step: integrator.time_step(),
        shifts,
        initial,
        stages,
        final_step: integrator.step(),
        snapshot_path: config.snapshot_path.clone(),
    };
    info!(final_step = report.final_step, "Simulation complete.");
    Ok(report)
}

/// Box and particles known before the system exists. Random placement needs the system's
/// generator, so that source yields `None`.
fn initial_particles(
    config: &SimulationConfig,
    reporter: &ProgressReporter,
) -> Result<(Vector3<f64>, Option<Vec<Particle>>), EngineError> {
    let box_l = Vector3::from(config.system.box_l);
    match &config.particles {
        ParticleSource::Lattice { per_side } => {
            Ok((box_l, Some(perturbed_lattice(*per_side, &box_l))))
        }
        ParticleSource::Random { .. } => Ok((box_l, None)),
        ParticleSource::Snapshot { path } => {
            let snapshot =
                XyzFile::read_from_path(path).map_err(|source| EngineError::Snapshot {
                    path: path.clone(),
                    source,
                })?;
            if snapshot.box_l != box_l {
                info!(
                    configured = ?box_l,
                    snapshot = ?snapshot.box_l,
                    "Using the box stored in the snapshot."
                );
            }
            reporter.report(Progress::Message(format!(
                "Read {} particles from {}",
                snapshot.particles.len(),
                path.display()
            )));
            Ok((snapshot.box_l, Some(snapshot.particles)))
        }
    }
}

fn configure_thermostat<'a>(
    system: &'a System,
    integrator: &mut VelocityVerlet<'a>,
    thermostat: &mut Option<Langevin<'a>>,
    stage: &StageConfig,
) -> Result<(), EngineError> {
    match &stage.thermostat {
        Some(settings) => {
            let langevin = match thermostat.take() {
                Some(existing) => existing,
                None => Langevin::new(system)?,
            };
            let langevin = thermostat.insert(langevin);
            langevin.set_gamma(settings.gamma)?;
            langevin.set_temperature(settings.temperature)?;
            integrator.set_thermostat(Some(&*langevin))?;
        }
        None => {
            if integrator.thermostat().is_some() {
                integrator.set_thermostat(None)?;
            }
        }
    }
    Ok(())
}

fn sample(
    step: u64,
    interaction: &LennardJonesInteraction,
    temperature: &Temperature,
    particle_count: usize,
) -> Result<EnergySample, EngineError> {
    Ok(EnergySample {
        step,
        potential: interaction.compute_energy()?,
        temperature: temperature.compute()?,
        particle_count,
    })
}

fn grid_lines(nodes: Int3D, cells: Int3D) -> [String; 2] {
    [
        format!("NodeGrid = {}", nodes),
        format!("CellGrid = {}", cells),
    ]
}

fn time_step_line(time_step: f64) -> String {
    format!("integrator.dt = {}", format_g(time_step))
}

fn stage_banner(name: &str, thermostat: Option<&ThermostatConfig>) -> String {
    match thermostat {
        Some(t) => format!("{}: thermostat t = {}", name, format_g(t.temperature)),
        None => format!("{}: thermostat off", name),
    }
}

/// Formats like C's `%g`: six significant digits, trailing zeros dropped, scientific
/// notation outside `[1e-4, 1e6)`.
pub fn format_g(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{}", value);
    }
    let exponent = value.abs().log10().floor() as i32;
    if (-4..6).contains(&exponent) {
        let decimals = (5 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value))
    } else {
        let formatted = format!("{:.5e}", value);
        match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
            }
            None => formatted,
        }
    }
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}
