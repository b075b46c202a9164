use std::path::PathBuf;
use thiserror::Error;

/// Why a form can't be saved yet. One variant per check, in the order
/// the checks run; the message is what the user gets to see.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The identifier can't be empty.")]
    EmptyIdentifier,
    #[error("The secret can't be empty.")]
    EmptySecret,
    #[error("Unknown secret encoding '{0}'.")]
    UnknownSecretEncoding(String),
    #[error("The secret is not encoded properly!")]
    SecretNotEncoded,
    #[error("The number of digits must be 6, 7 or 8 (got {0}).")]
    InvalidDigitCount(i64),
    #[error("Unknown OTP type '{0}'.")]
    UnknownOtpType(String),
    #[error("Unknown hash algorithm '{0}'.")]
    UnknownHashAlgorithm(String),
    #[error("The period can't be negative (got {0}).")]
    NegativePeriod(i64),
    #[error("The counter/offset can't be negative (got {0}).")]
    NegativeCounter(i64),
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("no entry with identifier '{0}'")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("the scanned code did not contain a secret")]
    ImportIncomplete,
    #[error("Unable to save the entry!")]
    PersistenceFailed,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid master password")]
    InvalidMasterPassword,
    #[error("vault already exists at {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("no vault at {}, run `otpdeck init` first", .0.display())]
    Missing(PathBuf),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("Unable to decode the secret value: {0}")]
    Secret(String),
    #[error("Unknown {what} code {code}")]
    UnknownCode { what: &'static str, code: i32 },
    #[error("Unsupported number of digits: {0}")]
    Digits(i32),
    #[error("Invalid time step of {0} second(s)")]
    Period(i64),
    #[error("Negative counter/offset: {0}")]
    Counter(i64),
    #[error("System clock is before the Unix epoch")]
    Clock,
}
