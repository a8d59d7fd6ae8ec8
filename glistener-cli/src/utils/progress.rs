use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

use glistener_core::{SampleSource, Scheduler};

/// Progress bar over the observation window. Only reads the clock and the tick count.
pub struct SamplingProgress {
    bar: ProgressBar,
    handle: JoinHandle<()>,
}

impl SamplingProgress {
    pub fn start<S: SampleSource + ?Sized + 'static>(scheduler: Arc<Scheduler<S>>) -> Self {
        let total = scheduler.config().duration;
        let bar = ProgressBar::new(total.as_secs().max(1));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        let handle = {
            let bar = bar.clone();
            tokio::spawn(async move {
                let started = tokio::time::Instant::now();
                let mut ticker = tokio::time::interval(Duration::from_millis(250));
                loop {
                    ticker.tick().await;
                    bar.set_position(started.elapsed().as_secs().min(total.as_secs()));
                    bar.set_message(format!("{} sample(s)", scheduler.ticks_collected()));
                }
            })
        };

        Self { bar, handle }
    }

    pub fn finish(self) {
        self.handle.abort();
        self.bar.finish_and_clear();
    }
}
