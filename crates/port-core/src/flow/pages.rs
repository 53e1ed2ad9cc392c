use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::warn;

use crate::chunking::split_dataframe;
use crate::props::{ConsentFormTable, Footer, Header, Page, PromptBody, Translatable};

pub const NO_DATA_FOUND: &str = "No data found";

pub fn render_page(platform: &str, header_text: Translatable, body: PromptBody) -> Page {
    Page::Donation {
        platform: platform.to_lowercase(),
        header: Header { title: header_text },
        body,
        footer: Footer::default(),
    }
}

pub fn render_end_page() -> Page {
    Page::End
}

pub fn file_prompt_header(platform: &str) -> Translatable {
    Translatable::new([
        ("en", format!("Select your {platform} file")),
        ("nl", format!("Selecteer uw {platform} bestand")),
    ])
}

pub fn retry_header(platform: &str) -> Translatable {
    Translatable::new([("en", platform), ("nl", platform)])
}

pub fn consent_header(platform: &str) -> Translatable {
    Translatable::new([
        ("en", format!("Your {platform} data")),
        ("nl", format!("Uw {platform} gegevens")),
    ])
}

pub fn prompt_file(extensions: &str, platform: &str) -> PromptBody {
    let description = Translatable::new([
        (
            "en",
            format!(
                "Please follow the download instructions and choose the file that you stored on your device. Click “Skip” at the right bottom, if you do not have a file from {platform}."
            ),
        ),
        (
            "nl",
            format!(
                "Volg de download instructies en kies het bestand dat u opgeslagen heeft op uw apparaat. Als u geen {platform} bestand heeft klik dan op “Overslaan” rechts onder."
            ),
        ),
    ]);
    PromptBody::FileInput {
        description,
        extensions: extensions.to_string(),
    }
}

pub fn retry_confirmation(platform: &str) -> PromptBody {
    let text = Translatable::new([
        (
            "en",
            format!(
                "Unfortunately, we could not process your {platform} file. If you are sure that you selected the correct file, press Continue. To select a different file, press Try again."
            ),
        ),
        (
            "nl",
            format!(
                "Helaas, kunnen we uw {platform} bestand niet verwerken. Weet u zeker dat u het juiste bestand heeft gekozen? Ga dan verder. Probeer opnieuw als u een ander bestand wilt kiezen."
            ),
        ),
    ]);
    PromptBody::Confirm {
        text,
        ok: Translatable::new([("en", "Try again"), ("nl", "Probeer opnieuw")]),
        cancel: Translatable::new([("en", "Continue"), ("nl", "Verder")]),
    }
}

/// Placeholder shown when extraction produced no tables, so the participant
/// always sees a review step.
pub fn create_empty_table(platform: &str) -> ConsentFormTable {
    let title = Translatable::new([
        ("en", "Nothing went wrong, but we could not find anything"),
        ("nl", "Er ging niks mis, maar we konden niks vinden"),
    ]);
    let series = Series::new(NO_DATA_FOUND.into(), vec![NO_DATA_FOUND]);
    let df = DataFrame::new(vec![series.into()]).unwrap_or_default();
    ConsentFormTable::new(format!("{platform}_no_data_found"), title, df)
}

/// Builds the consent form, splitting tables taller than `chunk_rows` into
/// `<id>_<n>` parts.
pub fn assemble_tables_into_form(tables: Vec<ConsentFormTable>, chunk_rows: usize) -> PromptBody {
    let mut assembled = Vec::with_capacity(tables.len());

    for table in tables {
        if table.data_frame.height() <= chunk_rows {
            assembled.push(table);
            continue;
        }

        match split_dataframe(&table.data_frame, chunk_rows) {
            Ok(chunks) => {
                for (idx, chunk) in chunks.into_iter().enumerate() {
                    assembled.push(ConsentFormTable {
                        id: format!("{}_{}", table.id, idx),
                        title: table.title.clone(),
                        data_frame: chunk,
                        description: table.description.clone(),
                        visualizations: table.visualizations.clone(),
                    });
                }
            }
            Err(err) => {
                warn!("keeping table '{}' whole: {}", table.id, err);
                assembled.push(table);
            }
        }
    }

    PromptBody::ConsentForm {
        tables: assembled,
        meta_tables: Vec::new(),
    }
}
