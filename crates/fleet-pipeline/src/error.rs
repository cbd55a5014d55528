use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    #[error("pipeline {0} not found")]
    NotFound(String),

    #[error("stage {stage:?} of pipeline {query_id} is not ACTIVE (cannot transition from current state)")]
    StageNotActive { query_id: String, stage: fleet_types::StageName },

    #[error("stage {stage:?} of pipeline {query_id} was already started")]
    StageAlreadyStarted { query_id: String, stage: fleet_types::StageName },
}

impl From<PipelineError> for fleet_types::FleetError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::NotFound(id) => fleet_types::FleetError::NotFound(format!("pipeline {id}")),
            PipelineError::StageNotActive { .. } | PipelineError::StageAlreadyStarted { .. } => {
                fleet_types::FleetError::Conflict(err.to_string())
            }
        }
    }
}
