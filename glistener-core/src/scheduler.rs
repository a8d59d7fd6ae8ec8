use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::accumulator::SampleAccumulator;
use crate::error::{ListenerError, Result};
use crate::sample::Run;
use crate::source::SampleSource;

/// How often and for how long to sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Delay between firings
    pub delay: Duration,

    /// Total observation window
    pub duration: Duration,
}

impl SamplingConfig {
    /// Create a validated config
    pub fn new(delay: Duration, duration: Duration) -> Result<Self> {
        let config = Self { delay, duration };
        config.validate()?;
        Ok(config)
    }

    pub fn from_secs(delay: u64, duration: u64) -> Result<Self> {
        Self::new(Duration::from_secs(delay), Duration::from_secs(duration))
    }

    /// `delay` must be non-zero and strictly less than `duration`
    pub fn validate(&self) -> Result<()> {
        if self.delay.is_zero() {
            return Err(ListenerError::InvalidConfiguration(
                "delay must be greater than zero".to_string(),
            ));
        }
        if self.delay >= self.duration {
            return Err(ListenerError::InvalidConfiguration(format!(
                "delay ({}s) must be less than duration ({}s)",
                self.delay.as_secs_f64(),
                self.duration.as_secs_f64()
            )));
        }
        Ok(())
    }

    /// Ticks a run produces when every query returns faster than `delay`.
    /// Firings happen at `k * delay` for every offset strictly below `duration`.
    pub fn expected_ticks(&self) -> usize {
        let delay = self.delay.as_nanos();
        if delay == 0 {
            return 0;
        }
        ((self.duration.as_nanos() + delay - 1) / delay) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Drives a sample source at a fixed delay for a fixed duration
pub struct Scheduler<S: SampleSource + ?Sized + 'static> {
    source: Arc<S>,
    config: SamplingConfig,
    accumulator: Arc<SampleAccumulator>,
    state: Mutex<SchedulerState>,
}

impl<S: SampleSource + ?Sized + 'static> Scheduler<S> {
    pub fn new(source: Arc<S>, config: SamplingConfig) -> Self {
        Self {
            source,
            config,
            accumulator: Arc::new(SampleAccumulator::new()),
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Ticks appended so far
    pub fn ticks_collected(&self) -> usize {
        self.accumulator.len()
    }

    /// Sample until the duration has elapsed, then hand out the finalized run.
    ///
    /// The first sample is taken immediately. A source error ends the run
    /// right away and no run is returned.
    pub async fn run(&self) -> Result<Run> {
        self.config.validate()?;

        {
            let mut state = self.state.lock();
            if *state != SchedulerState::Idle {
                return Err(ListenerError::InvalidState(format!(
                    "cannot start a scheduler that is {:?}",
                    *state
                )));
            }
            *state = SchedulerState::Running;
        }

        info!(
            "Sampling every {:?} for {:?}",
            self.config.delay, self.config.duration
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let started = Instant::now();
        let mut worker = tokio::spawn(sample_loop(
            self.source.clone(),
            self.accumulator.clone(),
            self.config,
            started,
            stop_rx,
        ));

        let outcome = tokio::select! {
            _ = time::sleep_until(started + self.config.duration) => {
                debug!("Duration elapsed, stopping sampler");
                let _ = stop_tx.send(true);
                flatten((&mut worker).await)
            }
            joined = &mut worker => flatten(joined),
        };

        *self.state.lock() = SchedulerState::Stopped;

        if let Err(e) = outcome {
            warn!("Sampling aborted: {}", e);
            return Err(e);
        }

        let run = self.accumulator.finalize()?;
        info!("Collected {} tick(s)", run.len());
        Ok(run)
    }
}

async fn sample_loop<S: SampleSource + ?Sized>(
    source: Arc<S>,
    accumulator: Arc<SampleAccumulator>,
    config: SamplingConfig,
    started: Instant,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<()> {
    let deadline = started + config.duration;
    let mut ticker = time::interval_at(started, config.delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {
                let now = Instant::now();
                if now >= deadline {
                    // Window is closed, wait for the stop signal
                    let _ = stop_rx.changed().await;
                    break;
                }

                let mut tick = source.query().await?;
                tick.elapsed = now.duration_since(started);
                accumulator.append(tick)?;
            }
        }
    }

    Ok(())
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(ListenerError::TaskFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{sample, Tick};
    use crate::source::MockSampleSource;

    fn one_device() -> Tick {
        Tick::new(vec![sample(0, "GPU-a", 0.5)])
    }

    #[test]
    fn test_config_validation() {
        assert!(SamplingConfig::from_secs(1, 10).is_ok());
        assert!(matches!(
            SamplingConfig::from_secs(5, 5),
            Err(ListenerError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SamplingConfig::from_secs(6, 5),
            Err(ListenerError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SamplingConfig::from_secs(0, 5),
            Err(ListenerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_expected_ticks() {
        assert_eq!(SamplingConfig::from_secs(3, 10).unwrap().expected_ticks(), 4);
        assert_eq!(SamplingConfig::from_secs(5, 10).unwrap().expected_ticks(), 2);
        assert_eq!(SamplingConfig::from_secs(1, 2).unwrap().expected_ticks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_never_samples() {
        let mut source = MockSampleSource::new();
        source.expect_query().times(0);

        let config = SamplingConfig {
            delay: Duration::from_secs(5),
            duration: Duration::from_secs(5),
        };
        let scheduler = Scheduler::new(Arc::new(source), config);

        let err = scheduler.run().await.unwrap_err();
        assert!(matches!(err, ListenerError::InvalidConfiguration(_)));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.ticks_collected(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_count_follows_schedule() {
        let mut source = MockSampleSource::new();
        source.expect_query().times(4).returning(|| Ok(one_device()));

        let config = SamplingConfig::from_secs(3, 10).unwrap();
        let scheduler = Scheduler::new(Arc::new(source), config);
        let run = scheduler.run().await.unwrap();

        assert_eq!(run.len(), config.expected_ticks());
        let offsets: Vec<u64> = run.ticks().iter().map(|t| t.elapsed.as_secs()).collect();
        assert_eq!(offsets, vec![0, 3, 6, 9]);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_failure_aborts_run() {
        let mut calls = 0;
        let mut source = MockSampleSource::new();
        source.expect_query().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(one_device())
            } else {
                Err(ListenerError::SampleSource("query failed".to_string()))
            }
        });

        let config = SamplingConfig::from_secs(1, 60).unwrap();
        let scheduler = Scheduler::new(Arc::new(source), config);

        let started = Instant::now();
        let err = scheduler.run().await.unwrap_err();
        assert!(matches!(err, ListenerError::SampleSource(_)));
        assert!(started.elapsed() < config.duration);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_once() {
        let mut source = MockSampleSource::new();
        source.expect_query().returning(|| Ok(one_device()));

        let scheduler = Scheduler::new(Arc::new(source), SamplingConfig::from_secs(1, 2).unwrap());
        assert_eq!(scheduler.run().await.unwrap().len(), 2);
        assert!(matches!(
            scheduler.run().await,
            Err(ListenerError::InvalidState(_))
        ));
    }
}
