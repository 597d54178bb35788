use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pibot_zenoh_runtime::config::{Cli, Mode};
use pibot_zenoh_runtime::dispatch::CommandDispatcher;
use pibot_zenoh_runtime::motor::DriveController;
use pibot_zenoh_runtime::{demo, runtime};

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    cli.speed.validate()?;

    let kind = cli.actuator_kind();
    info!("Initializing drive controller ({:?})", kind);
    let controller = DriveController::new(kind.build())?;

    match cli.mode() {
        Mode::Demo => demo::run(controller, 1.0).await?,
        Mode::Serve => {
            info!(
                "Speed range: {}% - {}%, default {}%",
                cli.speed.min, cli.speed.max, cli.speed.default
            );
            let dispatcher = Arc::new(CommandDispatcher::new(controller, cli.speed));
            runtime::run(dispatcher).await?
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
