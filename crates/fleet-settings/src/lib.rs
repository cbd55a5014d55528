//! Runtime settings store: persisted tunables with schema
//! validation, atomic rewrite, and restart-required flagging.

mod env;
pub mod error;
mod persistence;
pub mod schema;
mod store;
mod validate;
pub mod vram;

pub use error::SettingsError;
pub use store::{PutOutcome, SettingsStore};
