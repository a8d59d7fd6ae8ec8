// Re-export main components for easy access
pub use accumulator::SampleAccumulator;
pub use error::{ListenerError, Result};
pub use sample::{DeviceSample, Run, Tick};
pub use scheduler::{SamplingConfig, Scheduler, SchedulerState};
pub use source::{NvidiaSmi, SampleSource};
pub use stats::{summarize, DeviceSummary, RunSummary};

pub mod accumulator;
pub mod error;
pub mod sample;
pub mod scheduler;
pub mod source;
pub mod stats;

/// Version of the glistener-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version
pub fn version() -> &'static str {
    VERSION
}
