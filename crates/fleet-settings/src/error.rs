use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Validation(String),

    #[error("settings persistence error: {0}")]
    Persistence(String),
}

impl From<SettingsError> for fleet_types::FleetError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Validation(msg) => fleet_types::FleetError::Validation(msg),
            SettingsError::Persistence(msg) => fleet_types::FleetError::internal(msg),
        }
    }
}
