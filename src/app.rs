use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};

use crate::browser::HelpLauncher;
use crate::error::LookupError;
use crate::form::LookupForm;
use crate::lookup::{LookupResult, ProfileHttp, ProfileLookup};
use crate::render::DisplayFields;

/// Messages delivered to the foreground loop.
#[derive(Debug)]
pub enum AppEvent {
    LookupFinished(LookupResult),
}

/// A line typed into the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Lookup(String),
    ToggleDashes,
    Web,
    About,
    Quit,
    Empty,
}

/// Classify one input line. Only the line terminator is stripped, so the
/// lookup text reaches the validator exactly as typed.
pub fn parse_command(line: &str) -> Command {
    match line.trim_end_matches(['\r', '\n']) {
        "" => Command::Empty,
        ":dashes" => Command::ToggleDashes,
        ":web" | ":help" => Command::Web,
        ":about" => Command::About,
        ":quit" | ":q" | ":exit" => Command::Quit,
        other => Command::Lookup(other.to_string()),
    }
}

pub fn about_text(help_url: &str) -> String {
    format!(
        "{} {}\n{}\nMinecraft is (c) Mojang.\n{help_url}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION"),
    )
}

pub fn format_fields(fields: &DisplayFields) -> String {
    format!(
        "Name:   {}\nUUID:   {}\nLegacy: {}\n",
        fields.name, fields.id, fields.legacy
    )
}

fn dashes_indicator(dashes: bool) -> String {
    let mark = if dashes { "x" } else { " " };
    format!("[{mark}] Show dashes\n")
}

/// Foreground controller: owns the form and dispatches background lookups.
pub struct App<H> {
    form: LookupForm,
    lookup: Arc<ProfileLookup<H>>,
    help: HelpLauncher,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
}

impl<H> App<H>
where
    H: ProfileHttp + Send + Sync + 'static,
{
    pub fn new(form: LookupForm, lookup: ProfileLookup<H>, help: HelpLauncher) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1);
        Self {
            form,
            lookup: Arc::new(lookup),
            help,
            events_tx,
            events_rx,
        }
    }

    pub fn form(&self) -> &LookupForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut LookupForm {
        &mut self.form
    }

    pub fn lookup(&self) -> &ProfileLookup<H> {
        &self.lookup
    }

    /// Start a background lookup for the current input.
    ///
    /// Returns false, without building a request, when the input is invalid
    /// or a lookup is already in flight.
    pub fn trigger(&mut self) -> bool {
        let Some(username) = self.form.begin_lookup() else {
            return false;
        };
        info!(username = %username, "dispatching profile lookup");

        let lookup = Arc::clone(&self.lookup);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = task::spawn_blocking(move || lookup.lookup(&username))
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "profile lookup task failed");
                    LookupResult::Error
                });
            if events.send(AppEvent::LookupFinished(result)).await.is_err() {
                debug!("foreground loop closed before lookup finished");
            }
        });
        true
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.recv().await
    }

    pub fn handle_event(&mut self, event: AppEvent) -> &DisplayFields {
        match event {
            AppEvent::LookupFinished(result) => {
                debug!(outcome = result.label(), "applying lookup result");
                self.form.complete_lookup(&result)
            }
        }
    }

    /// Look up a single name and wait for the rendered fields.
    pub async fn lookup_once(&mut self, name: &str) -> Result<DisplayFields> {
        self.form.set_input(name);
        if !self.trigger() {
            return Err(LookupError::ValidationRejected(name.to_string()).into());
        }
        let event = self
            .next_event()
            .await
            .context("Lookup finished without reporting a result")?;
        Ok(self.handle_event(event).clone())
    }

    pub fn open_help(&self) {
        self.help.open();
    }

    /// Toggle the separator preference, returning the new indicator line.
    pub fn toggle_dashes(&mut self) -> Result<String> {
        let dashes = self.form.toggle_dashes()?;
        Ok(dashes_indicator(dashes))
    }

    /// Drive the interactive session until `:quit` or end of input.
    ///
    /// A lookup still running when input closes is awaited before returning.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut input_open = true;

        output
            .write_all(dashes_indicator(self.form.dashes()).as_bytes())
            .await?;
        output.flush().await?;

        loop {
            if !input_open && self.form.input_enabled() {
                break;
            }
            tokio::select! {
                line = lines.next_line(), if input_open => {
                    let Some(line) = line.context("Failed to read input")? else {
                        input_open = false;
                        continue;
                    };
                    let reply = match parse_command(&line) {
                        Command::Quit => break,
                        Command::Empty => None,
                        Command::About => Some(format!("{}\n", about_text(self.help.url()))),
                        Command::Web => {
                            self.open_help();
                            Some(format!("Opening {}\n", self.help.url()))
                        }
                        Command::ToggleDashes => match self.toggle_dashes() {
                            Ok(indicator) => Some(indicator),
                            Err(err) => {
                                warn!(error = %format!("{err:#}"), "display preference not saved");
                                Some(format!("Could not save preference: {err:#}\n"))
                            }
                        },
                        Command::Lookup(name) => self.submit(&name),
                    };
                    if let Some(reply) = reply {
                        output.write_all(reply.as_bytes()).await?;
                        output.flush().await?;
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    let rendered = format_fields(self.handle_event(event));
                    output.write_all(rendered.as_bytes()).await?;
                    output.flush().await?;
                }
            }
        }
        Ok(())
    }

    fn submit(&mut self, name: &str) -> Option<String> {
        if !self.form.set_input(name) {
            return Some("Lookup in progress, input disabled\n".into());
        }
        if self.trigger() {
            None
        } else {
            Some("Usernames are 1-16 letters, digits or underscores\n".into())
        }
    }
}
