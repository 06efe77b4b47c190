use anyhow::Result;
use clap::Parser;
use log::info;
use pipeview::cli::Cli;
use pipeview::output;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting pipeview");
    cli.execute().await?;

    Ok(())
}
