use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use glistener_cli::commands::listen::{self, ListenArgs};
use glistener_cli::config;

/// glistener - sample GPU utilization for a while, then report per-device statistics
#[derive(Parser)]
#[command(name = "glistener")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose mode (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    #[command(flatten)]
    listen: ListenArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The report owns stdout, logs go to stderr.
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(cli.verbose > 1)
        .with_writer(std::io::stderr)
        .init();

    // Load config if specified
    if let Some(config_path) = &cli.config {
        config::set_config_path(config_path);
    }

    listen::execute(cli.listen).await
}
