use mdproxy::engine::config::{PairPotentialConfig, StageConfig, ThermostatConfig};

/// Values used for anything neither the config file nor the command line sets: a
/// 10×10×10 Lennard-Jones lattice that is equilibrated, heated and cooled again.
pub struct DefaultsConfig {
    pub workers: usize,
    pub box_length: f64,
    pub skin: f64,
    pub seed: u64,
    pub lattice_per_side: usize,
    pub cutoff: f64,
    pub time_step: f64,
    pub steps_per_block: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            box_length: 10.0,
            skin: 0.3,
            seed: 12345,
            lattice_per_side: 10,
            cutoff: 2.5,
            time_step: 0.005,
            steps_per_block: 20,
        }
    }
}

impl DefaultsConfig {
    pub fn potentials(&self) -> Vec<PairPotentialConfig> {
        vec![
            PairPotentialConfig {
                type_a: 0,
                type_b: 0,
                epsilon: 0.8,
                sigma: 0.8,
            },
            PairPotentialConfig {
                type_a: 1,
                type_b: 1,
                epsilon: 1.0,
                sigma: 1.0,
            },
        ]
    }

    pub fn schedule(&self) -> Vec<StageConfig> {
        let stage = |name: &str, blocks, thermostat| StageConfig {
            name: name.to_string(),
            blocks,
            steps_per_block: self.steps_per_block,
            thermostat,
        };
        vec![
            stage("Equilibration", 20, None),
            stage(
                "Heat up",
                20,
                Some(ThermostatConfig {
                    gamma: 1.0,
                    temperature: 4.0,
                }),
            ),
            stage(
                "Cool down",
                40,
                Some(ThermostatConfig {
                    gamma: 1.0,
                    temperature: 0.5,
                }),
            ),
        ]
    }
}
