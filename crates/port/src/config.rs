use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use port_core::config::FlowConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CONFIG_ENV: &str = "PORT_CONFIG";

/// How the `run` command talks to the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// Interactive prompts on the terminal.
    #[default]
    Terminal,
    /// One JSON command per line on stdout, one JSON payload per line on stdin.
    JsonLines,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    pub flow: FlowConfig,
    pub donations_dir: PathBuf,
    pub locale: String,
    pub protocol: Protocol,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            flow: FlowConfig::new(Uuid::new_v4().to_string()),
            donations_dir: PathBuf::from("donations"),
            locale: "en".to_string(),
            protocol: Protocol::default(),
        }
    }
}

impl PortConfig {
    /// Loads the TOML file at `path`, or the defaults when there is none.
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML from '{}'", path.display()))
    }

    /// Applies `PORT_*` overrides; `lookup` is normally `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(session_id) = lookup("PORT_SESSION_ID") {
            self.flow.session_id = session_id;
        }
        if let Some(dir) = lookup("PORT_DONATIONS_DIR") {
            self.donations_dir = PathBuf::from(dir);
        }
        if let Some(rows) = lookup("PORT_CHUNK_ROWS") {
            self.flow.chunk_rows = rows
                .trim()
                .parse()
                .with_context(|| format!("PORT_CHUNK_ROWS must be a number, got '{rows}'"))?;
        }
        if let Some(locale) = lookup("PORT_LOCALE") {
            self.locale = locale;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.flow.validate().context("Invalid flow configuration")?;
        Ok(())
    }
}

/// Config file, then environment, as the CLI sees it before its own flags.
pub fn load(path: Option<PathBuf>) -> Result<PortConfig> {
    let path = path.or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
    let mut config = PortConfig::from_file(path.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_use_a_fresh_session_id() {
        let a = PortConfig::default();
        let b = PortConfig::default();
        assert_ne!(a.flow.session_id, b.flow.session_id);
        assert!(Uuid::parse_str(&a.flow.session_id).is_ok());
        assert_eq!(a.locale, "en");
        assert_eq!(a.protocol, Protocol::Terminal);
    }

    #[test]
    fn reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "donations_dir = \"out\"\nprotocol = \"json-lines\"\n\n[flow]\nsession_id = \"study-7\"\nchunk_rows = 50"
        )
        .expect("write config");

        let config = PortConfig::from_file(Some(file.path())).expect("config");
        assert_eq!(config.flow.session_id, "study-7");
        assert_eq!(config.flow.chunk_rows, 50);
        assert_eq!(config.donations_dir, PathBuf::from("out"));
        assert_eq!(config.protocol, Protocol::JsonLines);
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = PortConfig::from_file(Some(dir.path().join("absent.toml").as_path()))
            .expect_err("missing file");
        assert!(format!("{err:#}").contains("Failed to read config"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("PORT_SESSION_ID", "from-env"),
            ("PORT_CHUNK_ROWS", "25"),
            ("PORT_LOCALE", "nl"),
        ]
        .into_iter()
        .collect();

        let mut config = PortConfig::default();
        config
            .apply_env(|key| env.get(key).map(|value| value.to_string()))
            .expect("apply env");

        assert_eq!(config.flow.session_id, "from-env");
        assert_eq!(config.flow.chunk_rows, 25);
        assert_eq!(config.locale, "nl");
        assert_eq!(config.donations_dir, PathBuf::from("donations"));
    }

    #[test]
    fn bad_chunk_rows_are_reported() {
        let mut config = PortConfig::default();
        let err = config
            .apply_env(|key| (key == "PORT_CHUNK_ROWS").then(|| "lots".to_string()))
            .expect_err("not a number");
        assert!(err.to_string().contains("PORT_CHUNK_ROWS"));

        config.flow.chunk_rows = 0;
        assert!(config.validate().is_err());
    }
}
