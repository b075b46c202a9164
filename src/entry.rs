use serde::{Deserialize, Serialize};

/// One OTP credential as the store sees it: enum fields travel as the
/// integer codes from [`crate::encoding`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub secret: String,
    pub secret_encoding: i32,
    pub otp_type: i32,
    pub digit_count: i32,
    pub hash_algorithm: i32,
    pub period: i64,
    pub counter_or_offset: i64,
}

/// An entry whose code was calculated by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveCode {
    pub identifier: String,
    pub issuer: Option<String>,
    pub current_code: String,
    pub otp_type: i32,
    pub hash_algorithm: i32,
    pub period: i64,
    pub hotp_counter: i64,
    /// Seconds of the current TOTP window already gone when the code was
    /// calculated; 0 for HOTP.
    pub window_elapsed: i64,
}

/// An entry the store could not produce a code for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntryStub {
    pub identifier: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedEntry {
    Valid(LiveCode),
    Invalid(InvalidEntryStub),
}

impl FetchedEntry {
    pub fn identifier(&self) -> &str {
        match self {
            FetchedEntry::Valid(code) => &code.identifier,
            FetchedEntry::Invalid(stub) => &stub.identifier,
        }
    }
}
