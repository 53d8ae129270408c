use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use swap_cli::app_state::AppState;
use swap_cli::config::CliConfig;
use swap_cli::render::OutputFormat;
use swap_cli::{Command, SESSION_EXPIRED_MESSAGE, is_session_expired, run};
use tracing_subscriber::EnvFilter;

/// Command line arguments for swapctl
#[derive(Parser, Debug)]
#[command(name = "swapctl")]
#[command(about = "Battery-swap pillar grid console")]
struct Args {
    /// Path to the console configuration JSON file
    #[arg(short, long)]
    config: PathBuf,

    /// Access token, overrides the one in the config file
    #[arg(long, env = "SWAP_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::load(&args.config).await?;
    let state = AppState::new(config, args.token)?;
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match run(&state, args.command, format).await {
        Ok(output) => {
            println!("{output}");
            Ok(ExitCode::SUCCESS)
        }
        Err(error) if is_session_expired(&error) => {
            eprintln!("{SESSION_EXPIRED_MESSAGE}");
            Ok(ExitCode::from(2))
        }
        Err(error) => Err(error),
    }
}
