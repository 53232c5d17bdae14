mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "tap-logmeinrescue",
    version,
    about = "Singer tap for LogMeIn Rescue technicians and custom fields"
)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long)]
    config: PathBuf,

    /// Print the catalog instead of syncing
    #[arg(short, long)]
    discover: bool,

    /// Catalog with stream selection, as produced by --discover
    #[arg(long, alias = "properties", conflicts_with = "discover")]
    catalog: Option<PathBuf>,

    /// Singer state file from a previous run
    #[arg(short, long, conflicts_with = "discover")]
    state: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let result = if cli.discover {
        commands::discover::execute(&cli.config).await
    } else {
        commands::sync::execute(&cli.config, cli.catalog.as_deref(), cli.state.as_deref()).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
