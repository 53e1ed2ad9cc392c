//! Slack access logs (`access_logs.csv` from a workspace export).

use std::path::Path;

use polars::prelude::*;
use port_core::flow::Platform;
use port_core::props::{
    Aggregate, ChartGroup, ChartKind, ChartValue, ConsentFormTable, DateFormat, Translatable,
    Visualization,
};
use port_core::text::strip_parenthesized;
use port_core::timestamps::{parse_lenient, sort_key_timestamp_empty_last, ParsedTimestamp};
use port_core::validation::{DdpCategory, DdpFiletype, Language, StatusCode, ValidateInput};
use tracing::{debug, error, info};

use crate::errors::{DdpError, Result};
use crate::reader::read_csv_from_file_to_df;

pub const PLATFORM_NAME: &str = "Slack";
pub const TABLE_ID: &str = "slack";

pub const DATE_ACCESSED: &str = "Date Accessed";
pub const LAST_DATE_ACCESSED: &str = "Last Date Accessed";
pub const USER_AGENT_SIMPLE: &str = "User Agent - Simple";
pub const USER_AGENT_FULL: &str = "User Agent - Full";
pub const IP_ADDRESS: &str = "IP Address";
pub const NUMBER_OF_LOGINS: &str = "Number of Logins";
pub const LOGIN_DURATION: &str = "Login duration in hours";

pub const REQUIRED_COLUMNS: [&str; 6] = [
    DATE_ACCESSED,
    USER_AGENT_SIMPLE,
    USER_AGENT_FULL,
    IP_ADDRESS,
    NUMBER_OF_LOGINS,
    LAST_DATE_ACCESSED,
];

pub const COLUMNS_TO_KEEP: [&str; 4] = [
    DATE_ACCESSED,
    LAST_DATE_ACCESSED,
    USER_AGENT_SIMPLE,
    NUMBER_OF_LOGINS,
];

/// Rows Slack could not attribute to a client.
pub const NOISE_VALUE: &str = "Unknown";

pub fn ddp_categories() -> Vec<DdpCategory> {
    vec![DdpCategory {
        id: "csv_en".to_string(),
        ddp_filetype: DdpFiletype::Csv,
        language: Language::En,
        known_files: Vec::new(),
    }]
}

pub fn status_codes() -> Vec<StatusCode> {
    vec![
        StatusCode::new(0, "Valid slack CSV", ""),
        StatusCode::new(1, "Not a slack CSV", ""),
    ]
}

pub fn missing_columns(df: &DataFrame) -> Vec<&'static str> {
    let present = df.get_column_names();
    REQUIRED_COLUMNS
        .into_iter()
        .filter(|required| !present.iter().any(|name| name.as_str() == *required))
        .collect()
}

/// Checks that the file is a table with every Slack access log column.
/// Unreadable files are reported as not matching.
pub fn validate(path: impl AsRef<Path>) -> ValidateInput {
    let mut validation = ValidateInput::new(status_codes(), ddp_categories());
    let df = read_csv_from_file_to_df(path);

    let missing = missing_columns(&df);
    if missing.is_empty() {
        validation.set_current_ddp_category("csv_en");
        validation.set_status_code(0);
    } else {
        info!("not a Slack access log, missing columns: {}", missing.join(", "));
        validation.set_status_code(1);
    }
    validation
}

/// Reads and cleans the access log. Failures are logged and give an empty
/// table.
pub fn slack_logins_to_df(path: impl AsRef<Path>) -> DataFrame {
    let df = read_csv_from_file_to_df(path);
    if df.height() == 0 {
        return DataFrame::default();
    }
    match clean_logins(&df) {
        Ok(cleaned) => cleaned,
        Err(err) => {
            error!("could not extract Slack logins: {}", err);
            DataFrame::default()
        }
    }
}

struct LoginRow {
    date_accessed: String,
    last_date_accessed: String,
    user_agent: Option<String>,
    logins: Option<i64>,
    duration_hours: Option<f64>,
    sort_key: f64,
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

fn parse_access_time(raw: Option<&str>) -> Option<ParsedTimestamp> {
    let raw = raw?;
    let timestamp = parse_lenient(&strip_parenthesized(raw)).timestamp();
    if timestamp.is_none() {
        debug!("unrecognized access time '{}'", raw);
    }
    timestamp
}

fn hours_between(first: &ParsedTimestamp, last: &ParsedTimestamp) -> f64 {
    let seconds = (last.to_utc() - first.to_utc()).num_seconds() as f64;
    (seconds / 3600.0 * 100.0).round() / 100.0
}

/// Narrows an access log to the kept columns, drops noise rows, derives the
/// login duration and rewrites both access times as ISO 8601, newest first.
pub fn clean_logins(df: &DataFrame) -> Result<DataFrame> {
    let missing: Vec<String> = COLUMNS_TO_KEEP
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DdpError::MissingColumns { columns: missing });
    }

    let accessed = string_column(df, DATE_ACCESSED)?;
    let last_accessed = string_column(df, LAST_DATE_ACCESSED)?;
    let agents = string_column(df, USER_AGENT_SIMPLE)?;
    let logins = string_column(df, NUMBER_OF_LOGINS)?;

    let mut rows: Vec<LoginRow> = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let user_agent = agents[idx].clone();
        if user_agent.as_deref().map(str::trim) == Some(NOISE_VALUE) {
            continue;
        }

        let first = parse_access_time(accessed[idx].as_deref());
        let last = parse_access_time(last_accessed[idx].as_deref());
        let duration_hours = match (&first, &last) {
            (Some(first), Some(last)) => Some(hours_between(first, last)),
            _ => None,
        };

        let date_accessed = first.as_ref().map(ParsedTimestamp::to_iso8601).unwrap_or_default();
        let sort_key = sort_key_timestamp_empty_last(&date_accessed);
        rows.push(LoginRow {
            date_accessed,
            last_date_accessed: last.as_ref().map(ParsedTimestamp::to_iso8601).unwrap_or_default(),
            user_agent,
            logins: logins[idx]
                .as_deref()
                .and_then(|value| value.trim().parse::<i64>().ok()),
            duration_hours,
            sort_key,
        });
    }

    rows.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key));

    let columns: Vec<Column> = vec![
        Series::new(
            DATE_ACCESSED.into(),
            rows.iter().map(|row| row.date_accessed.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            LAST_DATE_ACCESSED.into(),
            rows.iter()
                .map(|row| row.last_date_accessed.clone())
                .collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            USER_AGENT_SIMPLE.into(),
            rows.iter().map(|row| row.user_agent.clone()).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            NUMBER_OF_LOGINS.into(),
            rows.iter().map(|row| row.logins).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            LOGIN_DURATION.into(),
            rows.iter().map(|row| row.duration_hours).collect::<Vec<_>>(),
        )
        .into(),
    ];

    Ok(DataFrame::new(columns)?)
}

fn visualizations() -> Vec<Visualization> {
    let duration = || {
        vec![ChartValue {
            column: LOGIN_DURATION.to_string(),
            aggregate: Aggregate::Sum,
        }]
    };

    vec![
        Visualization {
            title: Translatable::new([
                ("en", "Hours logged in by month of the year"),
                ("nl", "Uren ingelogd per maand van het jaar"),
            ]),
            kind: ChartKind::Area,
            group: Some(ChartGroup {
                column: DATE_ACCESSED.to_string(),
                date_format: Some(DateFormat::Month),
            }),
            values: duration(),
            text_column: None,
        },
        Visualization {
            title: Translatable::new([
                ("en", "Total time logged in by hour"),
                ("nl", "Totaal ingelogde tijd per uur van de dag"),
            ]),
            kind: ChartKind::Bar,
            group: Some(ChartGroup {
                column: DATE_ACCESSED.to_string(),
                date_format: Some(DateFormat::HourCycle),
            }),
            values: duration(),
            text_column: None,
        },
        Visualization {
            title: Translatable::new([("en", "User agent"), ("nl", "User agent")]),
            kind: ChartKind::Wordcloud,
            group: None,
            values: Vec::new(),
            text_column: Some(USER_AGENT_SIMPLE.to_string()),
        },
    ]
}

/// Wraps a cleaned access log in its consent form table. An empty log gives no
/// table.
pub fn logins_table(df: DataFrame) -> Option<ConsentFormTable> {
    if df.height() == 0 {
        return None;
    }

    let title = Translatable::new([
        ("en", "Your Slack access logs"),
        ("nl", "Uw Slack access logs"),
    ]);
    let description = Translatable::new([
        (
            "en",
            "The table shows when you accessed slack from different devices, and for how long. In the first figure you can see how many hours you stayed logged in per month of the year. In the second figure you can see the hours when you are likely to be on slack. In the third figure you can see on which device you used Slack the most.",
        ),
        (
            "nl",
            "De tabel toont wanneer u Slack hebt geopend vanaf verschillende apparaten en voor hoelang dat was. In de eerste grafiek kunt u zien hoeveel uur u per maand van het jaar ingelogd bent geweest. In de tweede grafiek kunt u zien op welke uren u waarschijnlijk op Slack bent geweest. In de derde grafiek kunt u zien op welk apparaat u Slack het meest hebt gebruikt.",
        ),
    ]);

    Some(
        ConsentFormTable::new(TABLE_ID, title, df)
            .with_description(description)
            .with_visualizations(visualizations()),
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlackPlatform;

impl Platform for SlackPlatform {
    fn name(&self) -> &str {
        PLATFORM_NAME
    }

    fn extensions(&self) -> &str {
        "text/csv, application/zip"
    }

    fn validate(&self, file: &str) -> ValidateInput {
        validate(file)
    }

    fn extract(&self, file: &str, _validation: &ValidateInput) -> Vec<ConsentFormTable> {
        logins_table(slack_logins_to_df(file)).into_iter().collect()
    }
}
