//! meshloop - embedded event loop hosting for an overlay network client
//!
//! meshloop runs the client engine's event loop on a dedicated thread and
//! provides the seams the engine uses to reach its host: structured logging,
//! posture-check providers, tagged event payloads, and diagnostic dumps.

pub mod dump;
pub mod error;
pub mod events;
pub mod logging;
pub mod posture;
pub mod runner;

pub use error::{MeshloopError, Result};
pub use runner::{LoopRunner, LoopRunnerConfig, LoopState};
