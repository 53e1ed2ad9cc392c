use thiserror::Error;

#[derive(Debug, Error)]
pub enum DdpError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read DDP: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("archive did not contain a {expected} file")]
    EmptyArchive { expected: &'static str },

    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("unsupported DDP content: {reason}")]
    UnsupportedFormat { reason: String },
}

pub type Result<T> = std::result::Result<T, DdpError>;
