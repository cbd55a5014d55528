//! Query orchestration engine: the central state machine that
//! turns a `QueryRequest` into a `QueryResponse` while driving the pipeline
//! tracker, event bus, metrics aggregator, and context allocator.

pub mod cgrag;
mod complexity;
pub mod error;
mod modes;
mod orchestrator;
mod selection;
pub mod types;
pub mod websearch;

pub use cgrag::{CgragClient, CgragError, CgragResult, HttpCgragClient, NullCgragClient};
pub use error::OrchestratorError;
pub use orchestrator::Orchestrator;
pub use selection::Selector;
pub use types::{Mode, QueryMetadata, QueryRequest, QueryResponse};
pub use websearch::{NullWebSearchClient, WebSearchClient, WebSearchResult};
