//! Inference server process manager: spawns and supervises
//! per-model `llama-server`-compatible subprocesses and proxies chat
//! completion calls to whichever are ready.

mod client;
mod config;
mod error;
mod manager;
mod process;

pub use client::InferenceClient;
pub use config::ManagerConfig;
pub use error::InferenceError;
pub use manager::{Manager, ServerState, ServerStatus};
