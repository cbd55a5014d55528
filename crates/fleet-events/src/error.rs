use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("event bus has no active subscribers")]
    NoSubscribers,
}
