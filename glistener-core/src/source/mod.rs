pub mod nvidia_smi;

use async_trait::async_trait;

use crate::error::Result;
use crate::sample::Tick;

pub use nvidia_smi::NvidiaSmi;

/// Produces one tick of per-device measurements on demand
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Query every visible device once. Any error is fatal to the run.
    async fn query(&self) -> Result<Tick>;
}
