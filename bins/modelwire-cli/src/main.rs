mod cmd;
mod config;
mod error;
mod json;

use clap::Parser;
use config::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Encode(args) => cmd::encode::run(&cli.global, args),
        Commands::Decode(args) => cmd::decode::run(&cli.global, args),
        Commands::Schema(args) => cmd::schema::run(&cli.global, args),
        Commands::Check => cmd::check::run(&cli.global),
    };
    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
