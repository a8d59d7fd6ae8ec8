use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use tracing::info;

use glistener_core::{NvidiaSmi, RunSummary, SamplingConfig, Scheduler};

use crate::config::{self, ListenerConfig, DEFAULT_DELAY_SECS};
use crate::report;
use crate::utils::progress::SamplingProgress;

/// Sample GPUs for a fixed duration and report per-device statistics
#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Duration of the observation window, in seconds
    #[arg(short = 'd', long = "duration", visible_alias = "d", value_name = "SECS")]
    pub duration: u64,

    /// Delay between samples, in seconds [default: 1]
    #[arg(
        short = 'l',
        long = "delay",
        visible_alias = "l",
        value_name = "SECS",
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    pub delay: Option<u64>,

    /// Path to the nvidia-smi binary
    #[arg(long, env = "GLISTENER_NVIDIA_SMI", value_name = "PATH")]
    pub nvidia_smi: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Do not show the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl ListenArgs {
    /// Combine flags with the config file, flags first
    pub fn sampling_config(&self, file: &ListenerConfig) -> Result<SamplingConfig> {
        let delay = self.delay.or(file.delay).unwrap_or(DEFAULT_DELAY_SECS);
        SamplingConfig::from_secs(delay, self.duration)
            .with_context(|| format!("invalid --delay {} for --duration {}", delay, self.duration))
    }

    pub fn source(&self, file: &ListenerConfig) -> NvidiaSmi {
        match self.nvidia_smi.clone().or_else(|| file.nvidia_smi.clone()) {
            Some(path) => NvidiaSmi::with_binary(path),
            None => NvidiaSmi::new(),
        }
    }
}

pub async fn execute(args: ListenArgs) -> Result<()> {
    let file = config::load_config()?;

    // Reject bad delay/duration before anything is sampled
    let sampling = args.sampling_config(&file)?;
    let source = args.source(&file);
    info!("Using {}", source.binary().display());

    let scheduler = Arc::new(Scheduler::new(Arc::new(source), sampling));
    let started_at = Utc::now();

    let progress = (!args.quiet && !args.json).then(|| SamplingProgress::start(scheduler.clone()));
    let result = scheduler.run().await;
    if let Some(progress) = progress {
        progress.finish();
    }

    let run = result.context("GPU sampling failed")?;
    let summary = RunSummary::build(&run, &sampling, started_at)?;

    if args.json {
        println!("{}", report::to_json(&summary)?);
    } else {
        report::print_report(&summary);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        listen: ListenArgs,
    }

    fn parse(args: &[&str]) -> ListenArgs {
        TestCli::try_parse_from(std::iter::once("glistener").chain(args.iter().copied()))
            .unwrap()
            .listen
    }

    #[test]
    fn test_original_flag_spelling() {
        let args = parse(&["--d", "10", "--l", "3"]);
        assert_eq!(args.duration, 10);
        assert_eq!(args.delay, Some(3));
    }

    #[test]
    fn test_delay_defaults() {
        let file = ListenerConfig::default();

        let args = parse(&["--duration", "10"]);
        assert_eq!(args.sampling_config(&file).unwrap().delay, Duration::from_secs(1));

        let bare = parse(&["-d", "10", "-l"]);
        assert_eq!(bare.delay, Some(1));
    }

    #[test]
    fn test_flag_overrides_config_file() {
        let file = ListenerConfig {
            delay: Some(4),
            nvidia_smi: Some(PathBuf::from("/opt/nvidia-smi")),
        };

        let from_file = parse(&["-d", "10"]);
        assert_eq!(from_file.sampling_config(&file).unwrap().delay, Duration::from_secs(4));
        assert_eq!(from_file.source(&file).binary(), PathBuf::from("/opt/nvidia-smi"));

        let from_flag = parse(&["-d", "10", "-l", "2", "--nvidia-smi", "/usr/bin/nvidia-smi"]);
        assert_eq!(from_flag.sampling_config(&file).unwrap().delay, Duration::from_secs(2));
        assert_eq!(from_flag.source(&file).binary(), PathBuf::from("/usr/bin/nvidia-smi"));
    }

    #[test]
    fn test_delay_not_below_duration_rejected() {
        let args = parse(&["-d", "5", "-l", "5"]);
        assert!(args.sampling_config(&ListenerConfig::default()).is_err());
    }

    #[test]
    fn test_duration_required() {
        assert!(TestCli::try_parse_from(["glistener", "-l", "2"]).is_err());
    }
}
