//! Test doubles for the store and the scanner.

use crate::backend::{ImportSource, KeyBackend};
use crate::entry::{CredentialEntry, FetchedEntry, InvalidEntryStub, LiveCode};
use std::cell::{Cell, RefCell};

/// Store double: serves canned entries and records every write.
pub(crate) struct FakeBackend {
    pub entries: RefCell<Vec<CredentialEntry>>,
    pub fetched: RefCell<Option<Vec<FetchedEntry>>>,
    pub fetch_calls: Cell<usize>,
    pub added: RefCell<Vec<CredentialEntry>>,
    pub updated: RefCell<Vec<(String, CredentialEntry)>>,
    pub accept_writes: Cell<bool>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            fetched: RefCell::new(Some(Vec::new())),
            fetch_calls: Cell::new(0),
            added: RefCell::new(Vec::new()),
            updated: RefCell::new(Vec::new()),
            accept_writes: Cell::new(true),
        }
    }
}

impl FakeBackend {
    pub fn with_entry(entry: CredentialEntry) -> Self {
        let backend = Self::default();
        backend.entries.borrow_mut().push(entry);
        backend
    }

    pub fn serving(fetched: Vec<FetchedEntry>) -> Self {
        let backend = Self::default();
        *backend.fetched.borrow_mut() = Some(fetched);
        backend
    }
}

impl KeyBackend for FakeBackend {
    fn fetch_entries(&self) -> Option<Vec<FetchedEntry>> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        self.fetched.borrow().clone()
    }

    fn resolve_by_identifier(&self, identifier: &str) -> Option<CredentialEntry> {
        self.entries
            .borrow()
            .iter()
            .find(|e| e.identifier == identifier)
            .cloned()
    }

    fn add_entry(&self, entry: &CredentialEntry) -> bool {
        self.added.borrow_mut().push(entry.clone());
        self.accept_writes.get()
    }

    fn update_entry(&self, original: &str, entry: &CredentialEntry) -> bool {
        self.updated
            .borrow_mut()
            .push((original.to_string(), entry.clone()));
        self.accept_writes.get()
    }

    fn delete_entry(&self, _identifier: &str) -> bool {
        self.accept_writes.get()
    }

    fn increment_hotp_counter(&self, _identifier: &str) -> bool {
        self.accept_writes.get()
    }

    fn is_properly_encoded(&self, _encoding: i32, secret: &str) -> bool {
        secret.len() >= 8
    }
}

pub(crate) fn totp_entry(identifier: &str) -> CredentialEntry {
    CredentialEntry {
        identifier: identifier.to_string(),
        issuer: None,
        secret: "JBSWY3DPEHPK3PXP".to_string(),
        secret_encoding: 1,
        otp_type: 0,
        digit_count: 6,
        hash_algorithm: 0,
        period: 30,
        counter_or_offset: 0,
    }
}

pub(crate) fn live(identifier: &str, code: &str, period: i64) -> FetchedEntry {
    live_at(identifier, code, period, 0)
}

/// A live code fetched `window_elapsed` seconds into its window.
pub(crate) fn live_at(identifier: &str, code: &str, period: i64, window_elapsed: i64) -> FetchedEntry {
    FetchedEntry::Valid(LiveCode {
        identifier: identifier.to_string(),
        issuer: None,
        current_code: code.to_string(),
        otp_type: 0,
        hash_algorithm: 0,
        period,
        hotp_counter: 0,
        window_elapsed,
    })
}

pub(crate) fn broken(identifier: &str, reason: &str) -> FetchedEntry {
    FetchedEntry::Invalid(InvalidEntryStub {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    })
}

/// Scanner double.
#[derive(Default)]
pub(crate) struct Scan {
    pub ready: bool,
    pub secret: Option<String>,
    pub label: Option<String>,
    pub digits: Option<String>,
    pub otp_type: Option<i32>,
    pub issuer: Option<String>,
}

impl Scan {
    pub fn with_secret(secret: &str) -> Self {
        Self {
            ready: true,
            secret: Some(secret.to_string()),
            ..Default::default()
        }
    }
}

impl ImportSource for Scan {
    fn secret(&self) -> Option<String> {
        self.secret.clone()
    }

    fn label(&self) -> Option<String> {
        self.label.clone()
    }

    fn digit_count(&self) -> Option<String> {
        self.digits.clone()
    }

    fn otp_type(&self) -> Option<i32> {
        self.otp_type
    }

    fn issuer(&self) -> Option<String> {
        self.issuer.clone()
    }

    fn is_ready_to_import(&self) -> bool {
        self.ready
    }
}
