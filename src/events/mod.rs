//! Overlay client events
//!
//! Tagged event payloads (context / router / service) and a topic that fans
//! them out to subscribers from the event loop.

pub mod topic;
pub mod types;

pub use topic::{EventTopic, TopicPump, TopicStats};
pub use types::*;
