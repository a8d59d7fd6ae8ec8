use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ListenerError, Result};
use crate::sample::{Run, Tick};

/// Collects ticks in arrival order until it is finalized
pub struct SampleAccumulator {
    state: Mutex<AccumulatorState>,
}

#[derive(Default)]
struct AccumulatorState {
    ticks: Vec<Tick>,
    sealed: bool,
}

impl SampleAccumulator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AccumulatorState::default()),
        }
    }

    /// Add one tick to the run
    pub fn append(&self, tick: Tick) -> Result<()> {
        let mut state = self.state.lock();
        if state.sealed {
            return Err(ListenerError::AlreadyFinalized);
        }

        state.ticks.push(tick);
        debug!("Appended tick {}", state.ticks.len());
        Ok(())
    }

    /// Number of ticks collected so far
    pub fn len(&self) -> usize {
        self.state.lock().ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finalized(&self) -> bool {
        self.state.lock().sealed
    }

    /// Stop accepting ticks and hand out the collected run. Can only be called once.
    pub fn finalize(&self) -> Result<Run> {
        let mut state = self.state.lock();
        if state.sealed {
            return Err(ListenerError::AlreadyFinalized);
        }

        state.sealed = true;
        Ok(Run::new(std::mem::take(&mut state.ticks)))
    }
}

impl Default for SampleAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
