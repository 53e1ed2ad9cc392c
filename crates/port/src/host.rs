use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use polars::prelude::DataFrame;
use port_core::commands::{Command, Payload};
use port_core::flow::Host;
use port_core::props::{dataframe_to_records, ConsentFormTable, Page, PromptBody};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Rows printed per table when reviewing in the terminal.
const PREVIEW_ROWS: usize = 20;

/// Stores each donation as `<dir>/<key>.json`; later donations under the same
/// key replace earlier ones.
#[derive(Debug, Clone)]
pub struct DonationSink {
    dir: PathBuf,
}

impl DonationSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }

    pub fn write(&self, key: &str, json_string: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create '{}'", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, json_string)
            .with_context(|| format!("Failed to write donation '{}'", path.display()))?;
        debug!("stored donation '{}' at {}", key, path.display());
        Ok(path)
    }
}

/// Renders a table for the terminal, limited to `max_rows` rows.
pub fn render_table(df: &DataFrame, max_rows: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(df.get_column_names().iter().map(|name| name.to_string()));

    for record in dataframe_to_records(&df.head(Some(max_rows))) {
        if let Value::Object(row) = record {
            table.add_row(row.values().map(cell_text));
        }
    }
    table
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// The JSON a participant donates after approving a consent form: one object
/// per table, keyed by table id, holding its rows.
pub fn consent_payload(tables: &[ConsentFormTable]) -> Result<String> {
    let donated: Vec<Value> = tables
        .iter()
        .map(|table| {
            let mut entry = Map::new();
            entry.insert(
                table.id.clone(),
                Value::Array(dataframe_to_records(&table.data_frame)),
            );
            Value::Object(entry)
        })
        .collect();
    Ok(serde_json::to_string(&donated)?)
}

/// Interactive host on a terminal. Empty answers skip a step.
pub struct TerminalHost<R, W> {
    input: R,
    output: W,
    sink: DonationSink,
    locale: String,
    exit_code: Option<i32>,
}

impl<R: BufRead, W: Write> TerminalHost<R, W> {
    pub fn new(input: R, output: W, sink: DonationSink, locale: impl Into<String>) -> Self {
        Self {
            input,
            output,
            sink,
            locale: locale.into(),
            exit_code: None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt} ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }

    fn show(&mut self, page: &Page) -> Result<Payload> {
        let (header, body) = match page {
            Page::Donation { header, body, .. } => (header, body),
            Page::End => {
                writeln!(self.output, "\nThank you for participating.")?;
                return Ok(Payload::Void);
            }
        };

        writeln!(self.output, "\n== {} ==", header.title.text(&self.locale))?;
        match body {
            PromptBody::FileInput {
                description,
                extensions,
            } => {
                writeln!(self.output, "{}", description.text(&self.locale))?;
                Ok(match self.ask(&format!("File ({extensions}), empty to skip:"))? {
                    Some(path) => Payload::String { value: path },
                    None => Payload::False,
                })
            }
            PromptBody::Confirm { text, ok, cancel } => {
                writeln!(self.output, "{}", text.text(&self.locale))?;
                let prompt = format!(
                    "[1] {}  [2] {}:",
                    ok.text(&self.locale),
                    cancel.text(&self.locale)
                );
                let accepted = matches!(self.ask(&prompt)?.as_deref(), Some("1"));
                Ok(if accepted { Payload::True } else { Payload::False })
            }
            PromptBody::ConsentForm { tables, .. } => {
                for table in tables {
                    writeln!(self.output, "\n{}", table.title.text(&self.locale))?;
                    if let Some(description) = &table.description {
                        writeln!(self.output, "{}", description.text(&self.locale))?;
                    }
                    writeln!(self.output, "{}", render_table(&table.data_frame, PREVIEW_ROWS))?;
                    if table.data_frame.height() > PREVIEW_ROWS {
                        writeln!(
                            self.output,
                            "({} more rows)",
                            table.data_frame.height() - PREVIEW_ROWS
                        )?;
                    }
                }
                let answer = self.ask("Donate this data? [y/N]:")?;
                if matches!(answer.as_deref(), Some("y" | "Y" | "yes")) {
                    Ok(Payload::Json {
                        value: consent_payload(tables)?,
                    })
                } else {
                    Ok(Payload::False)
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> Host for TerminalHost<R, W> {
    fn render(&mut self, page: &Page) -> Payload {
        self.show(page).unwrap_or_else(|err| {
            warn!("terminal interaction failed: {:#}", err);
            Payload::Error {
                value: err.to_string(),
            }
        })
    }

    fn donate(&mut self, key: &str, json_string: &str) -> Result<()> {
        self.sink.write(key, json_string)?;
        Ok(())
    }

    fn exit(&mut self, code: i32, info: &str) {
        info!("flow finished with {} ({})", code, info);
        self.exit_code = Some(code);
    }
}

/// Machine host: every command goes out as one JSON line and every page is
/// answered by one JSON payload line. Donations are also stored in the sink.
pub struct JsonLinesHost<R, W> {
    input: R,
    output: W,
    sink: DonationSink,
    exit_code: Option<i32>,
}

impl<R: BufRead, W: Write> JsonLinesHost<R, W> {
    pub fn new(input: R, output: W, sink: DonationSink) -> Self {
        Self {
            input,
            output,
            sink,
            exit_code: None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        serde_json::to_writer(&mut self.output, command)?;
        writeln!(self.output)?;
        self.output.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<Payload> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            anyhow::bail!("input closed before a payload arrived");
        }
        serde_json::from_str(line.trim())
            .with_context(|| format!("Invalid payload line '{}'", line.trim()))
    }
}

impl<R: BufRead, W: Write> Host for JsonLinesHost<R, W> {
    fn render(&mut self, page: &Page) -> Payload {
        let exchange = self
            .send(&Command::render(page.clone()))
            .and_then(|()| self.receive());
        exchange.unwrap_or_else(|err| {
            warn!("render exchange failed: {:#}", err);
            Payload::Error {
                value: err.to_string(),
            }
        })
    }

    fn donate(&mut self, key: &str, json_string: &str) -> Result<()> {
        self.send(&Command::donate(key, json_string, Default::default()))?;
        self.sink.write(key, json_string)?;
        Ok(())
    }

    fn exit(&mut self, code: i32, info: &str) {
        if let Err(err) = self.send(&Command::exit(code, info)) {
            warn!("could not announce exit: {:#}", err);
        }
        self.exit_code = Some(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use port_core::config::FlowConfig;
    use port_core::flow::{run_flow, ConsentFlow};
    use port_ddp::all_platforms;
    use std::io::Cursor;

    fn fixture(name: &str) -> String {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../port-ddp/tests/data")
            .join(name)
            .display()
            .to_string()
    }

    #[test]
    fn sink_sanitizes_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = DonationSink::new(dir.path());

        let path = sink.write("abc/../tracking", "[]").expect("write");
        assert_eq!(path, dir.path().join("abc____tracking.json"));
        assert_eq!(fs::read_to_string(path).expect("read back"), "[]");
        assert_eq!(sink.dir(), dir.path());
    }

    #[test]
    fn table_preview_is_limited() {
        let df = df!["n" => (0..30i64).collect::<Vec<_>>()].expect("df");
        let rendered = render_table(&df, 5).to_string();
        assert!(rendered.contains(" 4 "));
        assert!(!rendered.contains(" 5 "));
    }

    #[test]
    fn terminal_flow_donates_approved_slack_data() {
        let dir = tempfile::tempdir().expect("temp dir");
        let answers = format!("{}\ny\n", fixture("slack_access_logs.csv"));
        let mut host = TerminalHost::new(
            Cursor::new(answers),
            Vec::new(),
            DonationSink::new(dir.path()),
            "en",
        );
        let mut flow = ConsentFlow::new(FlowConfig::new("cli-test"), all_platforms());

        let outcome = run_flow(&mut flow, &mut host);
        assert_eq!(outcome.code, 0);
        assert_eq!(host.exit_code(), Some(0));

        let donated = fs::read_to_string(dir.path().join("Slack.json")).expect("donation");
        let value: Value = serde_json::from_str(&donated).expect("json");
        assert_eq!(value[0]["slack"].as_array().map(Vec::len), Some(3));

        let tracking = fs::read_to_string(dir.path().join("cli-test-tracking.json")).expect("log");
        assert!(tracking.contains("Data donated; Slack"));

        let transcript = String::from_utf8(host.into_output()).expect("utf8");
        assert!(transcript.contains("Your Slack access logs"));
        assert!(transcript.contains("Thank you for participating."));
    }

    #[test]
    fn terminal_skip_on_closed_input() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut host = TerminalHost::new(
            Cursor::new(String::new()),
            Vec::new(),
            DonationSink::new(dir.path()),
            "nl",
        );
        let mut flow = ConsentFlow::new(FlowConfig::new("cli-test"), all_platforms());

        run_flow(&mut flow, &mut host);

        assert!(!dir.path().join("Slack.json").exists());
        let transcript = String::from_utf8(host.into_output()).expect("utf8");
        assert!(transcript.contains("Selecteer uw Slack bestand"));
    }

    #[test]
    fn json_lines_host_speaks_the_wire_protocol() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = [
            serde_json::json!({"__type__": "PayloadString", "value": fixture("slack_missing_ip.csv")}),
            serde_json::json!({"__type__": "PayloadFalse"}),
            serde_json::json!({"__type__": "PayloadVoid"}),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

        let mut host = JsonLinesHost::new(Cursor::new(input), Vec::new(), DonationSink::new(dir.path()));
        let mut flow = ConsentFlow::new(FlowConfig::new("wire"), all_platforms());
        run_flow(&mut flow, &mut host);
        assert_eq!(host.exit_code(), Some(0));

        let output = String::from_utf8(host.into_output()).expect("utf8");
        let commands: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("command line"))
            .collect();
        let kinds: Vec<&str> = commands
            .iter()
            .filter_map(|command| command["__type__"].as_str())
            .collect();

        assert_eq!(kinds.first(), Some(&"CommandSystemDonate"));
        assert_eq!(kinds.last(), Some(&"CommandSystemExit"));
        let bodies: Vec<&str> = commands
            .iter()
            .filter_map(|command| command["page"]["body"]["__type__"].as_str())
            .collect();
        assert_eq!(bodies, vec!["PropsUIPromptFileInput", "PropsUIPromptConfirm"]);
        assert!(dir.path().join("wire-tracking.json").exists());
    }

    #[test]
    fn malformed_payload_lines_become_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut host = JsonLinesHost::new(
            Cursor::new("not json\n".to_string()),
            Vec::new(),
            DonationSink::new(dir.path()),
        );
        let payload = host.render(&Page::End);
        assert_eq!(payload.kind(), "PayloadError");
    }
}
