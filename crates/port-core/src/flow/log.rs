use chrono::Utc;
use tracing::Level;

const NO_LOGS: &str = "no logs";

/// Append-only record of flow events, donated as telemetry.
///
/// Each entry is also forwarded to `tracing` so the host's own logs see it.
#[derive(Debug, Clone)]
pub struct FlowLog {
    name: String,
    lines: Vec<String>,
}

impl FlowLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "port::flow", "{}", message);
        self.push(Level::INFO, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "port::flow", "{}", message);
        self.push(Level::WARN, message);
    }

    fn push(&mut self, level: Level, message: String) {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%z");
        self.lines
            .push(format!("{timestamp} --- {} --- {level} --- {message}", self.name));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// JSON array of all lines so far, or `["no logs"]` when nothing was logged.
    pub fn to_json(&self) -> String {
        let encoded = if self.lines.is_empty() {
            serde_json::to_string(&[NO_LOGS])
        } else {
            serde_json::to_string(&self.lines)
        };
        encoded.unwrap_or_else(|_| format!("[\"{NO_LOGS}\"]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_serializes_placeholder() {
        let log = FlowLog::new("script");
        assert_eq!(log.to_json(), r#"["no logs"]"#);
    }

    #[test]
    fn lines_carry_name_and_level() {
        let mut log = FlowLog::new("script");
        log.info("Starting the donation flow");
        log.warn("Skipped Slack");

        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" --- script --- INFO --- Starting the donation flow"));
        assert!(lines[1].ends_with(" --- script --- WARN --- Skipped Slack"));

        let decoded: Vec<String> = serde_json::from_str(&log.to_json()).expect("valid json");
        assert_eq!(decoded, lines);
    }
}
