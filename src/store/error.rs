#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Reading source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Backend rejected write: {0}")]
    WriteRejected(String),
}
