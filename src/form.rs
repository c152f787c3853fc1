use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use tracing::debug;

use crate::lookup::LookupResult;
use crate::preference::PreferenceStore;
use crate::render::{DisplayFields, render};
use crate::username::{Username, is_valid_username};

/// Single-permit guard: at most one lookup may hold it.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    /// Take the permit. Returns false if a lookup already holds it.
    pub fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Foreground state of the lookup form: input, display fields and preference.
///
/// Only the foreground loop owns and mutates this; background work reports
/// back through [`LookupForm::complete_lookup`].
pub struct LookupForm {
    input: String,
    in_flight: InFlight,
    fields: DisplayFields,
    dashes: bool,
    preferences: Box<dyn PreferenceStore>,
}

impl LookupForm {
    pub fn new(preferences: Box<dyn PreferenceStore>) -> Result<Self> {
        let dashes = preferences
            .load()
            .context("Failed to load display preference")?;
        Ok(Self {
            input: String::new(),
            in_flight: InFlight::default(),
            fields: DisplayFields::default(),
            dashes,
            preferences,
        })
    }

    /// Replace the input text. Ignored while the input is disabled.
    pub fn set_input(&mut self, text: &str) -> bool {
        if !self.input_enabled() {
            return false;
        }
        self.input = text.to_string();
        true
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_enabled(&self) -> bool {
        !self.in_flight.is_held()
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Whether the lookup action is enabled for the current input.
    pub fn can_submit(&self) -> bool {
        !self.in_flight.is_held() && is_valid_username(&self.input)
    }

    /// Validate the input and take the in-flight permit.
    ///
    /// Returns `None` without side effects when the input is invalid or a
    /// lookup is already running.
    pub fn begin_lookup(&mut self) -> Option<Username> {
        let username = match Username::parse(&self.input) {
            Ok(username) => username,
            Err(err) => {
                debug!(error = %err, "lookup not started");
                return None;
            }
        };
        if !self.in_flight.try_acquire() {
            debug!(username = %username, "lookup already in flight");
            return None;
        }
        Some(username)
    }

    /// Render the outcome and release the permit.
    pub fn complete_lookup(&mut self, result: &LookupResult) -> &DisplayFields {
        self.fields = render(result, self.dashes);
        self.in_flight.release();
        &self.fields
    }

    pub fn dashes(&self) -> bool {
        self.dashes
    }

    /// Flip the separator preference and persist it straight away.
    pub fn toggle_dashes(&mut self) -> Result<bool> {
        let next = !self.dashes;
        self.preferences
            .save(next)
            .context("Failed to save display preference")?;
        self.dashes = next;
        Ok(next)
    }

    /// Persist an explicit preference value, skipping the write if unchanged.
    pub fn set_dashes(&mut self, dashes: bool) -> Result<()> {
        if self.dashes != dashes {
            self.toggle_dashes()?;
        }
        Ok(())
    }
}
