//! Credential entry lifecycle and live code refresh for an OTP
//! authenticator.
//!
//! [`edit::EntryEditSession`] validates and saves one entry at a time,
//! merging scanned [`otpauth`] parameters into the form.
//! [`live::LiveCodeRegistry`] keeps the list of current codes and their
//! countdowns, driven by a once-per-second tick. Both talk to the store
//! through [`backend::KeyBackend`]; [`store::Vault`] is the bundled one.

pub mod backend;
pub mod codegen;
pub mod config;
pub mod crypto;
pub mod edit;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod live;
pub mod otpauth;
pub mod store;
pub mod validate;

#[cfg(test)]
mod testing;

pub use backend::{ImportSource, KeyBackend};
pub use edit::{EditMode, EntryEditSession, Navigation};
pub use entry::CredentialEntry;
pub use error::{EditError, StoreError, ValidationError};
pub use live::{LiveCodeRegistry, TickOutcome, group_code};
pub use store::Vault;
