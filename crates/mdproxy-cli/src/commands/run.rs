use crate::cli::RunArgs;
use crate::config::build_config;
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use mdproxy::{engine::progress::ProgressReporter, workflows};
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: RunArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = build_config(&args)?;
    if let Some(path) = &app_config.config_path {
        info!("Configuration file: {:?}", path);
    }
    let config = app_config.core_config;

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting simulation on {} worker(s), {} steps in {} stage(s)...",
        config.workers,
        config.total_steps(),
        config.schedule.len()
    );
    info!("Invoking the core simulation workflow...");

    // Status lines reach the terminal through the UI as the run produces them.
    let report = tokio::task::block_in_place(|| workflows::simulate::run(&config, &reporter))?;

    let last = report.final_sample();
    info!(
        step = report.final_step,
        total = last.total(),
        temperature = last.temperature,
        "Workflow finished."
    );
    if let Some(path) = &report.snapshot_path {
        println!("Final configuration written to: {}", path.display());
    }

    Ok(())
}
