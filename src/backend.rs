use crate::entry::{CredentialEntry, FetchedEntry};

/// The store of credential entries. It is the only authority on
/// identifier uniqueness; mutations report plain success/failure.
///
/// Handles are shared between the edit flow and the live list, so every
/// method takes `&self`; implementations keep their state behind interior
/// mutability.
pub trait KeyBackend {
    /// All entries with their current codes. `None` when the store is
    /// unavailable.
    fn fetch_entries(&self) -> Option<Vec<FetchedEntry>>;

    fn resolve_by_identifier(&self, identifier: &str) -> Option<CredentialEntry>;

    fn add_entry(&self, entry: &CredentialEntry) -> bool;

    /// Replace the entry currently stored as `original` (the identifier may
    /// change).
    fn update_entry(&self, original: &str, entry: &CredentialEntry) -> bool;

    fn delete_entry(&self, identifier: &str) -> bool;

    fn increment_hotp_counter(&self, identifier: &str) -> bool;

    /// Character set / length check of `secret` for the encoding `code`.
    fn is_properly_encoded(&self, encoding: i32, secret: &str) -> bool;
}

/// Parameters decoded from a scanned code, offered to an edit in progress.
pub trait ImportSource {
    fn secret(&self) -> Option<String>;

    /// Candidate identifier.
    fn label(&self) -> Option<String>;

    /// Raw digit count as found in the scan.
    fn digit_count(&self) -> Option<String>;

    /// OTP type code hint.
    fn otp_type(&self) -> Option<i32>;

    fn issuer(&self) -> Option<String> {
        None
    }

    fn hash_algorithm(&self) -> Option<i32> {
        None
    }

    fn period(&self) -> Option<i64> {
        None
    }

    fn counter(&self) -> Option<i64> {
        None
    }

    /// False when nothing (or nothing OTP-shaped) was scanned, e.g. the
    /// user cancelled the scanner.
    fn is_ready_to_import(&self) -> bool;
}
