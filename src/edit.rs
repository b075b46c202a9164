use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{ImportSource, KeyBackend};
use crate::encoding::{self, Domain, HashAlgorithm, OtpType, SecretEncoding};
use crate::entry::CredentialEntry;
use crate::error::{EditError, ValidationError};
use crate::validate;

const DEFAULT_DIGIT_COUNT: i64 = 6;
const DEFAULT_PERIOD: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    New,
    /// Editing the stored entry with this identifier.
    Editing(String),
}

/// Working copy of every entry field, as the form shows them: enum fields
/// are labels, numbers are signed so bad input can be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub identifier: String,
    pub issuer: String,
    pub secret: String,
    pub secret_encoding: String,
    pub otp_type: String,
    pub digit_count: i64,
    pub hash_algorithm: String,
    pub period: i64,
    pub counter_or_offset: i64,
}

impl Default for EditForm {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            issuer: String::new(),
            secret: String::new(),
            secret_encoding: SecretEncoding::Base32.label().to_string(),
            otp_type: OtpType::Totp.label().to_string(),
            digit_count: DEFAULT_DIGIT_COUNT,
            hash_algorithm: HashAlgorithm::Sha1.label().to_string(),
            period: DEFAULT_PERIOD,
            counter_or_offset: 0,
        }
    }
}

impl EditForm {
    fn from_entry(entry: &CredentialEntry) -> Self {
        Self {
            identifier: entry.identifier.clone(),
            issuer: entry.issuer.clone().unwrap_or_default(),
            secret: entry.secret.clone(),
            secret_encoding: encoding::to_label(entry.secret_encoding, Domain::SecretEncoding)
                .to_string(),
            otp_type: encoding::to_label(entry.otp_type, Domain::OtpType).to_string(),
            digit_count: i64::from(entry.digit_count),
            hash_algorithm: encoding::to_label(entry.hash_algorithm, Domain::HashAlgorithm)
                .to_string(),
            period: entry.period,
            counter_or_offset: entry.counter_or_offset,
        }
    }

    /// Store representation. Only meaningful once `can_save` passed.
    fn to_entry(&self) -> CredentialEntry {
        let issuer = self.issuer.trim();
        CredentialEntry {
            identifier: self.identifier.trim().to_string(),
            issuer: (!issuer.is_empty()).then(|| issuer.to_string()),
            secret: validate::normalize_secret(
                SecretEncoding::from_label(&self.secret_encoding),
                &self.secret,
            ),
            secret_encoding: encoding::to_int(&self.secret_encoding, Domain::SecretEncoding),
            otp_type: encoding::to_int(&self.otp_type, Domain::OtpType),
            digit_count: i32::try_from(self.digit_count).unwrap_or(encoding::UNKNOWN_CODE),
            hash_algorithm: encoding::to_int(&self.hash_algorithm, Domain::HashAlgorithm),
            period: self.period,
            counter_or_offset: self.counter_or_offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Identifier,
    Issuer,
    Secret,
    SecretEncoding,
    OtpType,
    DigitCount,
    HashAlgorithm,
    Period,
    CounterOrOffset,
}

/// Everything an open create/edit form holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSessionState {
    pub mode: EditMode,
    pub form: EditForm,
    dirty: HashSet<Field>,
}

impl EditSessionState {
    /// Whether the user has typed into `field`.
    pub fn is_dirty(&self, field: Field) -> bool {
        self.dirty.contains(&field)
    }
}

/// Which views the router closes after a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Close the edit view.
    CloseEditor,
    /// Close the edit view and the detail view below it.
    CloseEditorAndDetail,
}

impl Navigation {
    pub fn levels(self) -> usize {
        match self {
            Navigation::CloseEditor => 1,
            Navigation::CloseEditorAndDetail => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Applied,
    /// The source had nothing to offer (scan cancelled); nothing changed.
    NotReady,
}

/// One create or edit operation, from opening the form to saving it.
/// Dropping it without `commit` leaves the store untouched.
pub struct EntryEditSession {
    backend: Arc<dyn KeyBackend>,
    state: EditSessionState,
    save_error: Option<String>,
}

impl EntryEditSession {
    pub fn start(backend: Arc<dyn KeyBackend>, mode: EditMode) -> Result<Self, EditError> {
        let form = match &mode {
            EditMode::New => EditForm::default(),
            EditMode::Editing(identifier) => {
                let entry = backend
                    .resolve_by_identifier(identifier)
                    .ok_or_else(|| EditError::NotFound(identifier.clone()))?;
                EditForm::from_entry(&entry)
            }
        };
        debug!(?mode, "edit session started");

        Ok(Self {
            backend,
            state: EditSessionState {
                mode,
                form,
                dirty: HashSet::new(),
            },
            save_error: None,
        })
    }

    pub fn state(&self) -> &EditSessionState {
        &self.state
    }

    pub fn form(&self) -> &EditForm {
        &self.state.form
    }

    pub fn mode(&self) -> &EditMode {
        &self.state.mode
    }

    /// Message from the last failed `commit`, for a toast or banner.
    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    pub fn can_save(&self) -> bool {
        self.save_blocker().is_none()
    }

    /// The first reason the form can't be saved, if any.
    pub fn save_blocker(&self) -> Option<ValidationError> {
        validate::can_save(self.backend.as_ref(), &self.state.form).err()
    }

    fn touch(&mut self, field: Field) -> &mut EditForm {
        self.state.dirty.insert(field);
        self.save_error = None;
        &mut self.state.form
    }

    pub fn set_identifier(&mut self, value: impl Into<String>) {
        self.touch(Field::Identifier).identifier = value.into();
    }

    pub fn set_issuer(&mut self, value: impl Into<String>) {
        self.touch(Field::Issuer).issuer = value.into();
    }

    pub fn set_secret(&mut self, value: impl Into<String>) {
        self.touch(Field::Secret).secret = value.into();
    }

    pub fn set_secret_encoding(&mut self, label: impl Into<String>) {
        self.touch(Field::SecretEncoding).secret_encoding = label.into();
    }

    pub fn set_otp_type(&mut self, label: impl Into<String>) {
        self.touch(Field::OtpType).otp_type = label.into();
    }

    pub fn set_digit_count(&mut self, value: i64) {
        self.touch(Field::DigitCount).digit_count = value;
    }

    pub fn set_hash_algorithm(&mut self, label: impl Into<String>) {
        self.touch(Field::HashAlgorithm).hash_algorithm = label.into();
    }

    pub fn set_period(&mut self, value: i64) {
        self.touch(Field::Period).period = value;
    }

    pub fn set_counter_or_offset(&mut self, value: i64) {
        self.touch(Field::CounterOrOffset).counter_or_offset = value;
    }

    /// Merge scanned parameters into the form.
    ///
    /// A scan without a secret is dropped whole. Otherwise the secret always
    /// wins; every other field is only filled if the user hasn't typed into
    /// it. Digit count and OTP type fall back to 6 and TOTP.
    pub fn apply_import(&mut self, source: &dyn ImportSource) -> Result<ImportOutcome, EditError> {
        if !source.is_ready_to_import() {
            debug!("import source not ready, nothing to merge");
            return Ok(ImportOutcome::NotReady);
        }

        let Some(secret) = source.secret().filter(|s| !s.trim().is_empty()) else {
            warn!("no secret was found in the scanned code, ignoring it");
            return Err(EditError::ImportIncomplete);
        };

        let state = &mut self.state;
        let untouched = |field: Field| !state.dirty.contains(&field);
        let mut form = state.form.clone();

        form.secret = secret;
        if untouched(Field::SecretEncoding) {
            // Key URIs always carry Base32.
            form.secret_encoding = SecretEncoding::Base32.label().to_string();
        }
        if let Some(label) = source.label().filter(|l| !l.trim().is_empty()) {
            if untouched(Field::Identifier) {
                form.identifier = label;
            }
        }
        if untouched(Field::DigitCount) {
            form.digit_count = imported_digit_count(source.digit_count());
        }
        if untouched(Field::OtpType) {
            let otp_type = source
                .otp_type()
                .and_then(OtpType::from_code)
                .unwrap_or(OtpType::Totp);
            form.otp_type = otp_type.label().to_string();
        }
        if let Some(issuer) = source.issuer().filter(|i| !i.trim().is_empty()) {
            if untouched(Field::Issuer) {
                form.issuer = issuer;
            }
        }
        if let Some(algorithm) = source.hash_algorithm().and_then(HashAlgorithm::from_code) {
            if untouched(Field::HashAlgorithm) {
                form.hash_algorithm = algorithm.label().to_string();
            }
        }
        if let Some(period) = source.period().filter(|p| *p > 0) {
            if untouched(Field::Period) {
                form.period = period;
            }
        }
        if let Some(counter) = source.counter().filter(|c| *c >= 0) {
            if untouched(Field::CounterOrOffset) {
                form.counter_or_offset = counter;
            }
        }

        state.form = form;
        self.save_error = None;
        debug!(identifier = %self.state.form.identifier, "scanned code merged into the form");
        Ok(ImportOutcome::Applied)
    }

    /// Validate, convert to store codes and write. On failure the session
    /// stays usable and `save_error` says why.
    pub fn commit(&mut self) -> Result<Navigation, EditError> {
        if let Err(reason) = validate::can_save(self.backend.as_ref(), &self.state.form) {
            self.save_error = Some(reason.to_string());
            return Err(reason.into());
        }

        let entry = self.state.form.to_entry();
        let (saved, navigation) = match &self.state.mode {
            EditMode::New => (self.backend.add_entry(&entry), Navigation::CloseEditor),
            EditMode::Editing(original) => (
                self.backend.update_entry(original, &entry),
                Navigation::CloseEditorAndDetail,
            ),
        };

        if !saved {
            // The store doesn't tell us why (duplicate identifier, I/O, ...).
            warn!(identifier = %entry.identifier, "store rejected the entry");
            let err = EditError::PersistenceFailed;
            self.save_error = Some(err.to_string());
            return Err(err);
        }

        debug!(identifier = %entry.identifier, ?navigation, "entry saved");
        self.save_error = None;
        Ok(navigation)
    }
}

fn imported_digit_count(raw: Option<String>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_DIGIT_COUNT;
    };
    match raw.trim().parse::<i64>() {
        Ok(count) if validate::is_valid_digit_count(count) => count,
        _ => {
            warn!(digits = %raw, "got an invalid number of digits, using the default");
            DEFAULT_DIGIT_COUNT
        }
    }
}
