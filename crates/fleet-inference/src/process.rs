//! Subprocess lifecycle: spawn, stderr-driven readiness detection, and
//! graceful SIGTERM → SIGKILL shutdown.

use fleet_types::Model;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::ManagerConfig;
use crate::error::InferenceError;

pub fn spawn(model: &Model, config: &ManagerConfig) -> Result<Child, InferenceError> {
    Command::new(&config.binary_path)
        .arg("--model")
        .arg(&model.path)
        .arg("--host")
        .arg(&config.bind_host)
        .arg("--port")
        .arg(model.port.to_string())
        .arg("--ctx-size")
        .arg(config.ctx_size.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| InferenceError::SpawnFailed {
            model_id: model.id.clone(),
            message: e.to_string(),
        })
}

/// Read `child`'s stderr line by line until a readiness line matches or
/// `max_startup_seconds` elapses. Consumes and drops `child`'s stderr handle
/// (taken by the caller), leaving the rest of the child process untouched.
pub async fn wait_for_readiness(
    model_id: &str,
    child: &mut Child,
    readiness_pattern: &Regex,
    max_startup_seconds: u64,
) -> Result<(), InferenceError> {
    let stderr = child
        .stderr
        .take()
        .expect("child spawned with Stdio::piped() stderr");
    let mut lines = BufReader::new(stderr).lines();

    let scan = async {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if readiness_pattern.is_match(&line) {
                        info!(model_id, "inference server reported ready");
                        return Ok(());
                    }
                }
                Ok(None) => {
                    return Err(InferenceError::StartupTimeout(model_id.to_string()));
                }
                Err(e) => {
                    warn!(model_id, error = %e, "error reading inference server stderr");
                    return Err(InferenceError::StartupTimeout(model_id.to_string()));
                }
            }
        }
    };

    match tokio::time::timeout(Duration::from_secs(max_startup_seconds), scan).await {
        Ok(result) => result,
        Err(_) => Err(InferenceError::StartupTimeout(model_id.to_string())),
    }
}

/// SIGTERM, wait up to `grace_seconds`, then SIGKILL if still alive.
pub async fn graceful_shutdown(model_id: &str, child: &mut Child, grace_seconds: u64) {
    if let Some(pid) = child.id() {
        send_sigterm(pid);
    }

    let wait = tokio::time::timeout(Duration::from_secs(grace_seconds), child.wait()).await;
    if wait.is_err() {
        warn!(model_id, "process did not exit within grace period, sending SIGKILL");
        let _ = child.kill().await;
        let _ = child.wait().await;
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!(pid, error = %e, "failed to send SIGTERM");
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn readiness_times_out_when_process_never_prints_the_pattern() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("sleep 2")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let pattern = Regex::new("(?i)listening on").unwrap();
        let result = wait_for_readiness("test-model", &mut child, &pattern, 0).await;
        assert!(matches!(result, Err(InferenceError::StartupTimeout(_))));
        let _ = child.kill().await;
    }

    #[tokio::test]
    async fn readiness_detects_matching_line() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("echo 'HTTP server listening on 127.0.0.1:8100' 1>&2; sleep 5")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap();

        let pattern = Regex::new("(?i)listening on|http server listening").unwrap();
        let result = wait_for_readiness("test-model", &mut child, &pattern, 5).await;
        assert!(result.is_ok());
        let _ = child.kill().await;
    }
}
