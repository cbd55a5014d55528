use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum InferenceError {
    #[error("model {0} is not running")]
    NotRunning(String),

    #[error("model {0} is not ready yet")]
    NotReady(String),

    #[error("upstream http error calling {model_id}: {status} {message}")]
    HttpError { model_id: String, status: u16, message: String },

    #[error("call to {0} timed out")]
    Timeout(String),

    #[error("failed to decode response from {0}: {1}")]
    DecodeError(String, String),

    #[error("inference server for {0} did not become ready in time")]
    StartupTimeout(String),

    #[error("failed to spawn inference process for {model_id}: {message}")]
    SpawnFailed { model_id: String, message: String },
}

impl From<InferenceError> for fleet_types::FleetError {
    fn from(err: InferenceError) -> Self {
        match &err {
            InferenceError::NotRunning(_) | InferenceError::NotReady(_) => {
                fleet_types::FleetError::Conflict(err.to_string())
            }
            InferenceError::HttpError { model_id, message, .. } => fleet_types::FleetError::UpstreamHttpError {
                model_id: model_id.clone(),
                message: message.clone(),
            },
            InferenceError::Timeout(model_id) => fleet_types::FleetError::UpstreamTimeout { model_id: model_id.clone() },
            InferenceError::StartupTimeout(model_id) => fleet_types::FleetError::StartupTimeout { model_id: model_id.clone() },
            InferenceError::DecodeError(..) | InferenceError::SpawnFailed { .. } => {
                fleet_types::FleetError::internal(err.to_string())
            }
        }
    }
}
