use serde::{Deserialize, Serialize};

use crate::error::{PortError, Result};

pub const DEFAULT_CHUNK_ROWS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Prefix for the `<session_id>-tracking` telemetry donations.
    pub session_id: String,
    /// Consent form tables taller than this are split into several tables.
    pub chunk_rows: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            session_id: "local".to_string(),
            chunk_rows: DEFAULT_CHUNK_ROWS,
        }
    }
}

impl FlowConfig {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FlowConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(PortError::Config("session_id must not be empty".to_string()));
        }
        if self.chunk_rows == 0 {
            return Err(PortError::InvalidChunkSize(self.chunk_rows));
        }
        Ok(())
    }

    pub fn tracking_key(&self) -> String {
        format!("{}-tracking", self.session_id)
    }
}
