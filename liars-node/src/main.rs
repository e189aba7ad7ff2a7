use clap::Parser;
use tracing::info;

use liars_node::{cli::Cli, logging, SimulationConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = SimulationConfig::load_from_file(&cli.config)?;

    let _guard = logging::init(&config.log_dir)?;
    info!("config: {} (rendezvous {})", cli.config.display(), config.rendezvous);

    cli.execute(config).await?;
    Ok(())
}
