//! Pub/sub event bus for the fleetctl control plane.

pub mod bus;
pub mod error;
pub mod metrics;

pub use bus::{EventBus, EventSubscription};
pub use error::EventBusError;
pub use metrics::{BusMetrics, BusMetricsSnapshot};
