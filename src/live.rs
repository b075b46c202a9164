use std::sync::Arc;

use tracing::{debug, error};

use crate::backend::KeyBackend;
use crate::encoding::OtpType;
use crate::entry::FetchedEntry;

/// Presentation state of one entry in the live list. Lives until the next
/// refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEntryState {
    pub identifier: String,
    pub issuer: Option<String>,
    pub code: String,
    /// `code` split in two groups for reading.
    pub display_code: String,
    pub otp_type: i32,
    pub hash_algorithm: i32,
    pub hotp_counter: i64,
    pub period: i64,
    pub elapsed_in_period: i64,
    /// Degrees of the countdown circle, `[0, 360)`.
    pub presentation_arc: f64,
    /// How far the real time step had run when the store calculated the
    /// code.
    pub window_elapsed: i64,
    /// Valid, but with a period that can't count down. Reported once per
    /// refresh.
    pub countdown_frozen: bool,
    pub valid: bool,
    pub invalid_reason: String,
}

impl LiveEntryState {
    fn from_fetched(fetched: FetchedEntry) -> Self {
        match fetched {
            FetchedEntry::Valid(live) => {
                let countdown_frozen = live.period <= 0;
                if countdown_frozen {
                    error!(
                        identifier = %live.identifier,
                        period = live.period,
                        "time step is <= 0, countdown frozen"
                    );
                }
                Self {
                    display_code: group_code(&live.current_code),
                    identifier: live.identifier,
                    issuer: live.issuer,
                    code: live.current_code,
                    otp_type: live.otp_type,
                    hash_algorithm: live.hash_algorithm,
                    hotp_counter: live.hotp_counter,
                    period: live.period,
                    elapsed_in_period: 0,
                    presentation_arc: 0.0,
                    window_elapsed: live.window_elapsed,
                    countdown_frozen,
                    valid: true,
                    invalid_reason: String::new(),
                }
            }
            FetchedEntry::Invalid(stub) => Self {
                identifier: stub.identifier,
                issuer: None,
                code: String::new(),
                display_code: String::new(),
                otp_type: -1,
                hash_algorithm: -1,
                hotp_counter: -1,
                period: 0,
                elapsed_in_period: 0,
                presentation_arc: 0.0,
                window_elapsed: 0,
                countdown_frozen: false,
                valid: false,
                invalid_reason: stub.reason,
            },
        }
    }

    /// The store's reason when this entry has no code.
    pub fn error(&self) -> Option<&str> {
        (!self.valid).then_some(self.invalid_reason.as_str())
    }

    /// Seconds until the real time step ends, going by the phase the store
    /// reported and the ticks since.
    pub fn seconds_left(&self) -> i64 {
        (self.period - self.window_elapsed - self.elapsed_in_period).max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdowns moved on by one second.
    Advanced,
    /// Some code ran out; the whole list was fetched again.
    Refreshed,
}

/// The list of entries on screen and their countdowns.
///
/// Must be driven from one thread: `tick` once per second, `refresh`
/// whenever the store changed.
pub struct LiveCodeRegistry {
    backend: Arc<dyn KeyBackend>,
    entries: Vec<LiveEntryState>,
}

impl LiveCodeRegistry {
    /// Starts empty; call [`refresh`](Self::refresh) to load.
    pub fn new(backend: Arc<dyn KeyBackend>) -> Self {
        Self {
            backend,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[LiveEntryState] {
        &self.entries
    }

    pub fn get(&self, identifier: &str) -> Option<&LiveEntryState> {
        self.entries.iter().find(|e| e.identifier == identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seconds until the first TOTP window on the list rolls over. `None`
    /// when no entry follows the clock.
    pub fn next_rollover(&self) -> Option<i64> {
        self.entries
            .iter()
            .filter(|e| e.valid && !e.countdown_frozen)
            .filter(|e| OtpType::from_code(e.otp_type) == Some(OtpType::Totp))
            .map(LiveEntryState::seconds_left)
            .min()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole list with what the store has now.
    pub fn refresh(&mut self) {
        let fetched = self.backend.fetch_entries().unwrap_or_else(|| {
            debug!("store unavailable, showing no entries");
            Vec::new()
        });
        self.entries = fetched
            .into_iter()
            .map(LiveEntryState::from_fetched)
            .collect();
        debug!(count = self.entries.len(), "live entries refreshed");
    }

    /// Advance every valid countdown by one second. The first entry whose
    /// period ran out triggers one refresh of the whole list and ends the
    /// tick. Invalid entries are left alone.
    pub fn tick(&mut self) -> TickOutcome {
        let mut expired = None;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.valid && !e.countdown_frozen)
        {
            entry.elapsed_in_period += 1;
            if entry.elapsed_in_period >= entry.period {
                expired = Some(entry.identifier.clone());
                break;
            }
        }

        if let Some(identifier) = expired {
            debug!(%identifier, "code expired, fetching all codes");
            self.refresh();
            return TickOutcome::Refreshed;
        }

        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.valid && !e.countdown_frozen)
        {
            entry.presentation_arc = 360.0 * (entry.elapsed_in_period as f64 / entry.period as f64);
        }
        TickOutcome::Advanced
    }
}

/// Put a space in the middle of a code: 6 -> 3+3, 7 -> 4+3, 8 -> 4+4.
/// Other lengths come back as they are.
pub fn group_code(code: &str) -> String {
    let split = match code.chars().count() {
        6 => 3,
        7 | 8 => 4,
        _ => return code.to_string(),
    };
    let at = code
        .char_indices()
        .nth(split)
        .map_or(code.len(), |(i, _)| i);
    let (head, tail) = code.split_at(at);
    format!("{head} {tail}")
}
