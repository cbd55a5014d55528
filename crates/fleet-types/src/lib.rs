//! Shared data model for the fleetctl control plane.
//!
//! Every other crate in the workspace depends on `fleet-types` for the wire
//! shapes and the error taxonomy; it has no dependency on any sibling crate.

pub mod context;
pub mod error;
pub mod event;
pub mod metric;
pub mod model;
pub mod pipeline;
pub mod settings;

pub use context::{CgragArtifactRef, Component, ComponentKind, ContextAllocation};
pub use error::{FleetError, FleetResult};
pub use event::{Event, EventSeverity, EventType};
pub use metric::{MetricMetadata, MetricPoint, MetricType};
pub use model::{Model, ModelRegistrySnapshot, Quantization, Tier, TierThresholds};
pub use pipeline::{Pipeline, PipelineStatus, Stage, StageName, StageStatus};
pub use settings::{BenchmarkDefaults, DefaultTemperatures, RuntimeSettings};
