//! fleetctl control-plane gateway.
//!
//! A thin HTTP/WebSocket surface over the orchestration crates:
//! query submission drives the orchestrator, the remaining routes expose
//! the model registry, inference server lifecycle, pipeline status,
//! context allocation, time-series metrics, routing analytics, and runtime
//! settings each crate already owns.
//!
//! # Endpoints
//!
//! | Method            | Path                                 |
//! |--------------------|---------------------------------------|
//! | `POST`             | `/api/query`                          |
//! | `GET`              | `/api/models/registry`                |
//! | `POST`             | `/api/models/rescan`                  |
//! | `PUT`              | `/api/models/{id}/tier`               |
//! | `PUT`              | `/api/models/{id}/thinking`           |
//! | `PUT`              | `/api/models/{id}/enabled`            |
//! | `GET`              | `/api/models/servers`                 |
//! | `POST`             | `/api/models/servers/{id}/start`      |
//! | `POST`             | `/api/models/servers/{id}/stop`       |
//! | `POST`             | `/api/models/servers/start-all`       |
//! | `POST`             | `/api/models/servers/stop-all`        |
//! | `GET`              | `/api/models/tiers/{tier}`            |
//! | `GET/POST/DELETE`  | `/api/models/profiles[/{name}]`       |
//! | `GET`              | `/api/pipeline/status/{query_id}`     |
//! | `GET`              | `/api/pipeline/stats`                 |
//! | `GET`              | `/api/context/allocation/{query_id}`  |
//! | `GET`              | `/api/context/stats`                  |
//! | `GET`              | `/api/timeseries*`                    |
//! | `GET`              | `/api/metrics/routing`                |
//! | `GET/PUT/POST`     | `/api/settings*`                      |
//! | `GET`              | `/ws/events`                          |
//! | `GET`              | `/health`, `/ready`                   |

pub mod error;
pub mod handlers;
pub mod json;
pub mod middleware;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use middleware::RateLimiter;
pub use server::{build_router, ServerConfig};
pub use state::AppState;
