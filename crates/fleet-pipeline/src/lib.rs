//! Per-query pipeline state tracker: six-stage state machine
//! with event emission and TTL-based cleanup.

pub mod error;
pub mod tracker;

pub use error::PipelineError;
pub use tracker::{PipelineStats, Tracker, TrackerConfig};
