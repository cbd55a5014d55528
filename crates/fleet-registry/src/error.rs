use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry persistence error: {0}")]
    Persistence(String),

    #[error("scan path error: {0}")]
    ScanPath(String),

    #[error("no free port in range {0}-{1}")]
    PortRangeExhausted(u16, u16),

    #[error("model not found: {0}")]
    ModelNotFound(String),
}

impl From<RegistryError> for fleet_types::FleetError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ModelNotFound(id) => fleet_types::FleetError::NotFound(id),
            other => fleet_types::FleetError::internal(other.to_string()),
        }
    }
}
