// In crates/port-core/src/validation.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Nl,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DdpFiletype {
    Csv,
    Json,
    Html,
    Zip,
    Unknown,
}

/// One recognizable flavour of a platform's data download package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdpCategory {
    pub id: String,
    pub ddp_filetype: DdpFiletype,
    pub language: Language,
    pub known_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode {
    pub id: i32,
    pub description: String,
    pub message: String,
}

impl StatusCode {
    pub fn new(id: i32, description: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.description)
    }
}

/// Result of validating a file against a platform's expected shape.
///
/// Status `0` conventionally means the DDP was recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateInput {
    pub status_codes: Vec<StatusCode>,
    pub ddp_categories: Vec<DdpCategory>,
    pub status_code: Option<StatusCode>,
    pub ddp_category: Option<DdpCategory>,
}

impl ValidateInput {
    pub fn new(status_codes: Vec<StatusCode>, ddp_categories: Vec<DdpCategory>) -> Self {
        Self {
            status_codes,
            ddp_categories,
            status_code: None,
            ddp_category: None,
        }
    }

    /// Selects the status code with the given id. Unknown ids leave the current
    /// status untouched.
    pub fn set_status_code(&mut self, id: i32) {
        match self.status_codes.iter().find(|code| code.id == id) {
            Some(code) => self.status_code = Some(code.clone()),
            None => error!("status code {} is not defined for this platform", id),
        }
    }

    pub fn set_current_ddp_category(&mut self, id: &str) {
        match self.ddp_categories.iter().find(|category| category.id == id) {
            Some(category) => self.ddp_category = Some(category.clone()),
            None => error!("DDP category '{}' is not defined for this platform", id),
        }
    }

    /// Picks the category whose known files overlap most with `file_names`.
    /// Returns `false` when no category has a single hit.
    pub fn infer_ddp_category<S: AsRef<str>>(&mut self, file_names: &[S]) -> bool {
        let mut best: Option<(usize, &DdpCategory)> = None;

        for category in &self.ddp_categories {
            let hits = file_names
                .iter()
                .filter(|name| category.known_files.iter().any(|known| known == name.as_ref()))
                .count();
            debug!("DDP category '{}' matched {} known files", category.id, hits);
            if hits > 0 && best.map_or(true, |(best_hits, _)| hits > best_hits) {
                best = Some((hits, category));
            }
        }

        match best {
            Some((_, category)) => {
                self.ddp_category = Some(category.clone());
                true
            }
            None => false,
        }
    }

    /// The current status id, or `None` before validation ran.
    pub fn status_id(&self) -> Option<i32> {
        self.status_code.as_ref().map(|code| code.id)
    }

    pub fn is_valid(&self) -> bool {
        self.status_id() == Some(0)
    }
}
