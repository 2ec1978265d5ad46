//! Posture checks
//!
//! The client engine asks the host for compliance facts (domain, process,
//! OS, MAC addresses). The host supplies them through a `PostureProvider`;
//! the `PostureDispatcher` runs the queries on the event loop.

pub mod dispatcher;
pub mod types;

pub use dispatcher::{PostureDispatcher, PostureProvider, answer};
pub use types::*;
