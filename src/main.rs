mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use downhaul::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args.config).await?,
    }

    Ok(())
}
