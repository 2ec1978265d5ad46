//! Loop runner module - hosts the event loop on a dedicated thread.
//!
//! This module provides:
//! - LoopRunner for the init / run / stop lifecycle
//! - LoopState for the runner's state machine
//! - StopSignal for waking the loop from another thread

mod loop_runner;
pub mod signal;
mod state;

pub use loop_runner::{LoopRunner, LoopRunnerConfig};
pub use signal::StopSignal;
pub use state::LoopState;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let runner = LoopRunner::with_config(LoopRunnerConfig::default());
        assert_eq!(runner.state(), LoopState::Uninitialized);
        assert!(!StopSignal::new().is_raised());
    }
}
