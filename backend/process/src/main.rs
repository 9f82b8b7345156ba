use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "REDIS_URL", default_value = "redis://redis:6379")]
    redis_url: String,

    #[arg(long, env = "REDIS_PREFIX", default_value = "raffle")]
    prefix: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bulk import prizes from a CSV file
    Import { file: PathBuf },

    /// Open or close public registration
    Registration { state: Gate },

    /// Print confirmed winners
    Winners,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Gate {
    Open,
    Closed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let ledger = process::connect(&args.redis_url, &args.prefix).await?;

    match args.command {
        Command::Import { file } => {
            process::import_file(&ledger, &file).await?;
        }
        Command::Registration { state } => {
            process::set_registration(&ledger, matches!(state, Gate::Open)).await?;
        }
        Command::Winners => {
            process::winners(&ledger).await?;
        }
    }

    Ok(())
}
