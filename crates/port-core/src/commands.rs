use serde::{Deserialize, Serialize};

use crate::props::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DonationKind {
    /// Flow telemetry; failures never affect the flow.
    #[default]
    Tracking,
    /// Data the participant consented to donate.
    Data,
}

/// Requests the flow makes of its host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "__type__")]
pub enum Command {
    #[serde(rename = "CommandUIRender")]
    Render { page: Page },
    #[serde(rename = "CommandSystemDonate")]
    Donate {
        key: String,
        json_string: String,
        #[serde(skip)]
        kind: DonationKind,
    },
    #[serde(rename = "CommandSystemExit")]
    Exit { code: i32, info: String },
}

impl Command {
    pub fn render(page: Page) -> Self {
        Command::Render { page }
    }

    pub fn donate(key: impl Into<String>, json_string: impl Into<String>, kind: DonationKind) -> Self {
        Command::Donate {
            key: key.into(),
            json_string: json_string.into(),
            kind,
        }
    }

    pub fn exit(code: i32, info: impl Into<String>) -> Self {
        Command::Exit {
            code,
            info: info.into(),
        }
    }
}

/// The host's answer to a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "__type__")]
pub enum Payload {
    /// A selected file, as a path the platform reader can open.
    #[serde(rename = "PayloadString")]
    String { value: String },
    #[serde(rename = "PayloadTrue")]
    True,
    #[serde(rename = "PayloadFalse")]
    False,
    /// Consent given; `value` is the JSON the participant approved.
    #[serde(rename = "PayloadJSON")]
    Json { value: String },
    #[serde(rename = "PayloadVoid")]
    Void,
    #[serde(rename = "PayloadError")]
    Error { value: String },
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::String { .. } => "PayloadString",
            Payload::True => "PayloadTrue",
            Payload::False => "PayloadFalse",
            Payload::Json { .. } => "PayloadJSON",
            Payload::Void => "PayloadVoid",
            Payload::Error { .. } => "PayloadError",
        }
    }
}
