use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Sample source error: {0}")]
    SampleSource(String),

    #[error("nvidia-smi exited with {status}: {stderr}")]
    CommandFailed { status: ExitStatus, stderr: String },

    #[error("No GPU devices found")]
    NoDevicesFound,

    #[error("Cannot compute statistics over an empty run")]
    EmptyRun,

    #[error("Device set changed at tick {tick}: expected {expected:?}, found {found:?}")]
    DeviceSetChanged {
        tick: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Accumulator already finalized")]
    AlreadyFinalized,

    #[error("Invalid scheduler state: {0}")]
    InvalidState(String),

    #[error("Sampling task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ListenerError>;
