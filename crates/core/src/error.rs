/// Rejected input of the pure domain logic: configuration values, dates,
/// tag lists and tree parameters.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}
