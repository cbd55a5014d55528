use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum OrchestratorError {
    #[error("invalid query: {0}")]
    Validation(String),

    #[error("no model available: {0}")]
    NoModelAvailable(String),

    #[error("upstream timeout calling {0}")]
    UpstreamTimeout(String),

    #[error("upstream http error calling {model_id}: {message}")]
    UpstreamHttpError { model_id: String, message: String },

    #[error("pipeline error: {0}")]
    Pipeline(#[from] fleet_pipeline::PipelineError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<fleet_inference::InferenceError> for OrchestratorError {
    fn from(err: fleet_inference::InferenceError) -> Self {
        match err {
            fleet_inference::InferenceError::Timeout(model_id) => OrchestratorError::UpstreamTimeout(model_id),
            fleet_inference::InferenceError::HttpError { model_id, message, .. } => {
                OrchestratorError::UpstreamHttpError { model_id, message }
            }
            other => OrchestratorError::Internal(other.to_string()),
        }
    }
}

impl From<OrchestratorError> for fleet_types::FleetError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Validation(msg) => fleet_types::FleetError::Validation(msg),
            OrchestratorError::NoModelAvailable(msg) => fleet_types::FleetError::NoModelAvailable(msg),
            OrchestratorError::UpstreamTimeout(model_id) => fleet_types::FleetError::UpstreamTimeout { model_id },
            OrchestratorError::UpstreamHttpError { model_id, message } => {
                fleet_types::FleetError::UpstreamHttpError { model_id, message }
            }
            OrchestratorError::Pipeline(e) => e.into(),
            OrchestratorError::Internal(msg) => fleet_types::FleetError::internal(msg),
        }
    }
}
