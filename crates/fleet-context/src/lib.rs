//! Context window allocator: token counting and per-query
//! context budget attribution.

pub mod allocator;
pub mod estimator;

pub use allocator::{Allocator, AllocatorConfig, AllocatorStats, ArtifactInput, StoreRequest};
pub use estimator::{TokenCounter, TokenEstimator, WordBasedEstimator};
