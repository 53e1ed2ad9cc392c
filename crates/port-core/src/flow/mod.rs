//! The consent flow: for every platform, prompt for a file, validate it, offer
//! a retry when it is not recognized, show the extracted tables for review and
//! donate what the participant approves.
//!
//! The flow is a state machine. [`ConsentFlow::resume`] hands out one
//! [`Command`] at a time; a `Render` command suspends the flow until the host
//! answers with a [`Payload`]. [`run_flow`] drives a flow against a [`Host`].

mod log;
pub mod pages;

use std::collections::VecDeque;

use tracing::{debug, error};

use crate::commands::{Command, DonationKind, Payload};
use crate::config::FlowConfig;
use crate::props::{ConsentFormTable, Page};
use crate::validation::ValidateInput;

pub use log::FlowLog;

/// A platform whose data download package the flow can process.
pub trait Platform {
    fn name(&self) -> &str;

    /// Accepted file types, as shown in the file prompt.
    fn extensions(&self) -> &str {
        "text/csv"
    }

    fn validate(&self, file: &str) -> ValidateInput;

    /// Extracts the tables to review. Only called after a successful validation.
    fn extract(&self, file: &str, validation: &ValidateInput) -> Vec<ConsentFormTable>;
}

/// The rendering and donation side of the flow.
pub trait Host {
    fn render(&mut self, page: &Page) -> Payload;
    fn donate(&mut self, key: &str, json_string: &str) -> anyhow::Result<()>;
    fn exit(&mut self, code: i32, info: &str);
}

#[derive(Debug, Clone)]
pub enum FlowState {
    Start,
    PromptFile { platform: usize },
    AwaitFile { platform: usize },
    Validate { platform: usize, file: String },
    AwaitRetry { platform: usize },
    Review {
        platform: usize,
        tables: Vec<ConsentFormTable>,
    },
    AwaitConsent { platform: usize },
    Done { platform: usize },
    EndPage,
    AwaitEnd,
    Finished,
}

impl FlowState {
    /// States that wait for the host's answer to a rendered page.
    pub fn is_suspended(&self) -> bool {
        matches!(
            self,
            FlowState::AwaitFile { .. }
                | FlowState::AwaitRetry { .. }
                | FlowState::AwaitConsent { .. }
                | FlowState::AwaitEnd
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub code: i32,
    pub info: String,
}

pub struct ConsentFlow {
    config: FlowConfig,
    platforms: Vec<Box<dyn Platform>>,
    state: FlowState,
    pending: VecDeque<Command>,
    log: FlowLog,
}

impl ConsentFlow {
    pub fn new(config: FlowConfig, platforms: Vec<Box<dyn Platform>>) -> Self {
        Self {
            config,
            platforms,
            state: FlowState::Start,
            pending: VecDeque::new(),
            log: FlowLog::new("script"),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn log(&self) -> &FlowLog {
        &self.log
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, FlowState::Finished) && self.pending.is_empty()
    }

    /// Advances the flow and returns the next command for the host, or `None`
    /// once the flow has finished.
    ///
    /// `response` answers the previous `Render` command. For any other command,
    /// and for the very first call, pass [`Payload::Void`].
    pub fn resume(&mut self, response: Payload) -> Option<Command> {
        if let Some(command) = self.pending.pop_front() {
            return Some(command);
        }

        let mut response = Some(response);
        loop {
            if matches!(self.state, FlowState::Finished) {
                return None;
            }

            let state = std::mem::replace(&mut self.state, FlowState::Finished);
            let (next, commands) = self.transition(state, response.take().unwrap_or(Payload::Void));
            self.state = next;
            self.pending.extend(commands);

            if let Some(command) = self.pending.pop_front() {
                return Some(command);
            }
        }
    }

    fn transition(&mut self, state: FlowState, response: Payload) -> (FlowState, Vec<Command>) {
        match state {
            FlowState::Start => {
                self.log.info("Starting the donation flow");
                let next = self.first_state_for(0);
                (next, vec![self.donate_logs()])
            }

            FlowState::PromptFile { platform } => {
                let Some(current) = self.platforms.get(platform) else {
                    return (FlowState::EndPage, Vec::new());
                };
                let name = current.name().to_string();
                let body = pages::prompt_file(current.extensions(), &name);
                self.log.info(format!("Prompt for file for {name}"));
                let page = pages::render_page(&name, pages::file_prompt_header(&name), body);
                (
                    FlowState::AwaitFile { platform },
                    vec![self.donate_logs(), Command::render(page)],
                )
            }

            FlowState::AwaitFile { platform } => match response {
                Payload::String { value } => (FlowState::Validate { platform, file: value }, Vec::new()),
                other => {
                    let name = self.platform_name(platform);
                    debug!("file prompt answered with {}", other.kind());
                    self.log.info(format!("Skipped {name}"));
                    (FlowState::Done { platform }, vec![self.donate_logs()])
                }
            },

            FlowState::Validate { platform, file } => {
                let Some(current) = self.platforms.get(platform) else {
                    return (FlowState::EndPage, Vec::new());
                };
                let name = current.name().to_string();
                let validation = current.validate(&file);

                if validation.is_valid() {
                    let tables = current.extract(&file, &validation);
                    self.log.info(format!("Payload for {name}"));
                    (FlowState::Review { platform, tables }, vec![self.donate_logs()])
                } else {
                    self.log.info(format!(
                        "Not a valid {name} file; No payload; prompt retry_confirmation"
                    ));
                    let page = pages::render_page(
                        &name,
                        pages::retry_header(&name),
                        pages::retry_confirmation(&name),
                    );
                    (
                        FlowState::AwaitRetry { platform },
                        vec![self.donate_logs(), Command::render(page)],
                    )
                }
            }

            FlowState::AwaitRetry { platform } => match response {
                Payload::True => (FlowState::PromptFile { platform }, Vec::new()),
                _ => {
                    let name = self.platform_name(platform);
                    self.log.info(format!("Skipped during retry {name}"));
                    (FlowState::Done { platform }, vec![self.donate_logs()])
                }
            },

            FlowState::Review { platform, mut tables } => {
                let name = self.platform_name(platform);
                self.log.info(format!("Prompt consent; {name}"));

                if tables.is_empty() {
                    tables.push(pages::create_empty_table(&name));
                }

                let form = pages::assemble_tables_into_form(tables, self.config.chunk_rows);
                let page = pages::render_page(&name, pages::consent_header(&name), form);
                (
                    FlowState::AwaitConsent { platform },
                    vec![self.donate_logs(), Command::render(page)],
                )
            }

            FlowState::AwaitConsent { platform } => {
                let name = self.platform_name(platform);
                match response {
                    Payload::Json { value } => {
                        self.log.info(format!("Data donated; {name}"));
                        (
                            FlowState::Done { platform },
                            vec![
                                self.donate_logs(),
                                Command::donate(name, value, DonationKind::Data),
                            ],
                        )
                    }
                    _ => {
                        self.log.info(format!("Skipped after reviewing consent: {name}"));
                        (FlowState::Done { platform }, vec![self.donate_logs()])
                    }
                }
            }

            FlowState::Done { platform } => (self.first_state_for(platform + 1), Vec::new()),

            FlowState::EndPage => (
                FlowState::AwaitEnd,
                vec![Command::render(pages::render_end_page())],
            ),

            FlowState::AwaitEnd => (FlowState::Finished, vec![Command::exit(0, "Success")]),

            FlowState::Finished => (FlowState::Finished, Vec::new()),
        }
    }

    fn first_state_for(&self, platform: usize) -> FlowState {
        if platform < self.platforms.len() {
            FlowState::PromptFile { platform }
        } else {
            FlowState::EndPage
        }
    }

    fn platform_name(&self, platform: usize) -> String {
        self.platforms
            .get(platform)
            .map(|p| p.name().to_string())
            .unwrap_or_default()
    }

    fn donate_logs(&self) -> Command {
        Command::donate(
            self.config.tracking_key(),
            self.log.to_json(),
            DonationKind::Tracking,
        )
    }
}

/// Runs `flow` to completion against `host`.
///
/// Donation failures never stop the flow: telemetry failures are dropped and
/// data donation failures are logged, also in the flow's own log.
pub fn run_flow<H: Host + ?Sized>(flow: &mut ConsentFlow, host: &mut H) -> FlowOutcome {
    let mut response = Payload::Void;
    let mut outcome = None;

    while let Some(command) = flow.resume(response) {
        response = Payload::Void;
        match command {
            Command::Render { page } => {
                response = host.render(&page);
            }
            Command::Donate {
                key,
                json_string,
                kind,
            } => {
                if let Err(err) = host.donate(&key, &json_string) {
                    match kind {
                        DonationKind::Tracking => debug!("dropping tracking donation {}: {:#}", key, err),
                        DonationKind::Data => {
                            error!("donation '{}' failed: {:#}", key, err);
                            flow.log.warn(format!("Donation failed; {key}"));
                        }
                    }
                }
            }
            Command::Exit { code, info } => {
                host.exit(code, &info);
                outcome = Some(FlowOutcome { code, info });
            }
        }
    }

    outcome.unwrap_or(FlowOutcome {
        code: 0,
        info: "Success".to_string(),
    })
}
