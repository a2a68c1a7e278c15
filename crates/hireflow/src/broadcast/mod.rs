//! Job state shared between orchestrators and observers.
//!
//! The store holds the authoritative job snapshots; the broadcaster lets
//! observers follow changes live instead of polling.

pub mod job_events;
pub mod job_store;

pub use job_events::{JobEvent, JobEventBroadcaster};
pub use job_store::{JobCounts, JobStore};
