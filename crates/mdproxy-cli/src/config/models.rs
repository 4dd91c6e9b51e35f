use mdproxy::engine::config as core_config;
use std::path::PathBuf;

pub struct AppConfig {
    pub config_path: Option<PathBuf>,
    pub core_config: core_config::SimulationConfig,
}
