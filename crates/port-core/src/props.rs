use std::collections::BTreeMap;

use polars::prelude::{AnyValue, DataFrame};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Text with one entry per locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translatable {
    pub translations: BTreeMap<String, String>,
}

impl Translatable {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            translations: pairs
                .into_iter()
                .map(|(locale, text)| (locale.into(), text.into()))
                .collect(),
        }
    }

    /// Text for `locale`, falling back to English and then to any translation.
    pub fn text(&self, locale: &str) -> &str {
        self.translations
            .get(locale)
            .or_else(|| self.translations.get("en"))
            .or_else(|| self.translations.values().next())
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Area,
    Bar,
    Line,
    Wordcloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    Auto,
    Year,
    Quarter,
    Month,
    Day,
    Hour,
    HourCycle,
    WeekdayCycle,
    MonthCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Count,
    CountPct,
    Mean,
    Sum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartGroup {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartValue {
    pub column: String,
    pub aggregate: Aggregate,
}

/// Chart descriptor rendered next to a consent form table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visualization {
    pub title: Translatable,
    #[serde(rename = "type")]
    pub kind: ChartKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ChartGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ChartValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_column: Option<String>,
}

/// A table the participant reviews before donating.
#[derive(Debug, Clone)]
pub struct ConsentFormTable {
    pub id: String,
    pub title: Translatable,
    pub data_frame: DataFrame,
    pub description: Option<Translatable>,
    pub visualizations: Vec<Visualization>,
}

impl ConsentFormTable {
    pub fn new(id: impl Into<String>, title: Translatable, data_frame: DataFrame) -> Self {
        Self {
            id: id.into(),
            title,
            data_frame,
            description: None,
            visualizations: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Translatable) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_visualizations(mut self, visualizations: Vec<Visualization>) -> Self {
        self.visualizations = visualizations;
        self
    }
}

impl Serialize for ConsentFormTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PropsUIPromptConsentFormTable", 6)?;
        state.serialize_field("__type__", "PropsUIPromptConsentFormTable")?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("data_frame", &dataframe_to_json(&self.data_frame).to_string())?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("visualizations", &self.visualizations)?;
        state.end()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "__type__", rename = "PropsUIHeader")]
pub struct Header {
    pub title: Translatable,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "__type__", rename = "PropsUIFooter")]
pub struct Footer {}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "__type__")]
pub enum PromptBody {
    #[serde(rename = "PropsUIPromptFileInput")]
    FileInput {
        description: Translatable,
        extensions: String,
    },
    #[serde(rename = "PropsUIPromptConfirm")]
    Confirm {
        text: Translatable,
        ok: Translatable,
        cancel: Translatable,
    },
    #[serde(rename = "PropsUIPromptConsentForm")]
    ConsentForm {
        tables: Vec<ConsentFormTable>,
        #[serde(rename = "metaTables")]
        meta_tables: Vec<ConsentFormTable>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "__type__")]
pub enum Page {
    #[serde(rename = "PropsUIPageDonation")]
    Donation {
        platform: String,
        header: Header,
        body: PromptBody,
        footer: Footer,
    },
    #[serde(rename = "PropsUIPageEnd")]
    End,
}

/// Column-oriented JSON (`{"column": {"0": value, ...}}`), the shape the
/// consent form host reads table data in.
pub fn dataframe_to_json(df: &DataFrame) -> Value {
    let mut columns = Map::new();
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let mut cells = Map::new();
        for idx in 0..series.len() {
            let value = series.get(idx).map(any_value_to_json).unwrap_or(Value::Null);
            cells.insert(idx.to_string(), value);
        }
        columns.insert(column.name().to_string(), Value::Object(cells));
    }
    Value::Object(columns)
}

/// Row-oriented JSON, one object per row keyed by column name.
pub fn dataframe_to_records(df: &DataFrame) -> Vec<Value> {
    let columns = df.get_columns();
    (0..df.height())
        .map(|idx| {
            let mut row = Map::new();
            for column in columns {
                let value = column
                    .as_materialized_series()
                    .get(idx)
                    .map(any_value_to_json)
                    .unwrap_or(Value::Null);
                row.insert(column.name().to_string(), value);
            }
            Value::Object(row)
        })
        .collect()
}

fn any_value_to_json(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(flag) => Value::Bool(flag),
        AnyValue::String(text) => Value::String(text.to_string()),
        AnyValue::StringOwned(text) => Value::String(text.to_string()),
        AnyValue::Int32(number) => Value::from(number),
        AnyValue::Int64(number) => Value::from(number),
        AnyValue::UInt32(number) => Value::from(number),
        AnyValue::UInt64(number) => Value::from(number),
        AnyValue::Float32(number) => float_to_json(f64::from(number)),
        AnyValue::Float64(number) => float_to_json(number),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(number: f64) -> Value {
    Number::from_f64(number)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
