//! Tunables for the inference server manager, following
//! `LinuxInferenceConfig`'s builder idiom.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Path to the inference server binary (e.g. `llama-server`).
    pub binary_path: String,
    /// Host the spawned servers bind to, and the host this process dials.
    pub bind_host: String,
    /// Context window size passed as `--ctx-size`.
    pub ctx_size: u32,
    /// Seconds to wait for a readiness line before declaring startup failed.
    pub max_startup_seconds: u64,
    /// Seconds to wait after SIGTERM before escalating to SIGKILL.
    pub grace_seconds: u64,
    /// Timeout for a single `Call` to an upstream server.
    pub call_timeout_seconds: u64,
    /// Start multiple models concurrently in `StartAll`.
    pub concurrent_starts: bool,
    /// Regex (case-insensitive) matched against each stderr line to detect
    /// readiness. Default: `listening on|http server listening`.
    pub readiness_pattern: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            binary_path: "llama-server".to_string(),
            bind_host: "127.0.0.1".to_string(),
            ctx_size: 4096,
            max_startup_seconds: 120,
            grace_seconds: 10,
            call_timeout_seconds: 120,
            concurrent_starts: true,
            readiness_pattern: "listening on|http server listening".to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn with_binary_path(mut self, path: impl Into<String>) -> Self {
        self.binary_path = path.into();
        self
    }

    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    pub fn with_max_startup_seconds(mut self, seconds: u64) -> Result<Self, &'static str> {
        if seconds == 0 {
            return Err("max_startup_seconds must be > 0");
        }
        self.max_startup_seconds = seconds;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.max_startup_seconds, 120);
        assert_eq!(cfg.grace_seconds, 10);
        assert_eq!(cfg.call_timeout_seconds, 120);
    }

    #[test]
    fn rejects_zero_startup_timeout() {
        let result = ManagerConfig::default().with_max_startup_seconds(0);
        assert!(result.is_err());
    }
}
