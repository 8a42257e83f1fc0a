use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid input: {0}")]
    BadInput(String),

    #[error("chart snapshot unusable: {0}")]
    Snapshot(String),

    #[error("font unusable: {0}")]
    Font(String),

    #[error("document could not be serialized: {0}")]
    Serialize(String),

    #[error("document write failed: {0:#}")]
    Write(#[from] anyhow::Error),
}

impl ReportError {
    /// Stable code for IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ReportError::BadInput(_) => "bad_params",
            ReportError::Snapshot(_) => "bad_snapshot",
            ReportError::Font(_) => "font_unavailable",
            ReportError::Serialize(_) => "document_serialize_failed",
            ReportError::Write(_) => "document_write_failed",
        }
    }
}
