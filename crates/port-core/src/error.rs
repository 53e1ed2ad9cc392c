// crates/port-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("rows per chunk must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PortError>;
