use crate::backend::KeyBackend;
use crate::edit::EditForm;
use crate::encoding::{self, Domain, SecretEncoding};
use crate::error::ValidationError;

/// Digit counts a code may have.
pub const DIGIT_COUNTS: [i64; 3] = [6, 7, 8];

pub fn is_valid_digit_count(count: i64) -> bool {
    DIGIT_COUNTS.contains(&count)
}

/// Canonical form of a typed or scanned secret: whitespace dropped; Base32
/// is upper-cased and loses its `=` padding.
pub fn normalize_secret(encoding: Option<SecretEncoding>, secret: &str) -> String {
    let compact: String = secret.chars().filter(|c| !c.is_whitespace()).collect();
    match encoding {
        Some(SecretEncoding::Base32) => compact.trim_end_matches('=').to_ascii_uppercase(),
        _ => compact,
    }
}

/// Ask the store whether `candidate` is well formed for `encoding`.
/// An unknown encoding code is invalid without asking.
pub fn is_properly_encoded(backend: &dyn KeyBackend, encoding: i32, candidate: &str) -> bool {
    let Some(known) = SecretEncoding::from_code(encoding) else {
        return false;
    };
    backend.is_properly_encoded(known.code(), &normalize_secret(Some(known), candidate))
}

/// Whether the form may be saved; on `Err` the first failing check, in
/// a fixed order. Nothing is mutated.
pub fn can_save(backend: &dyn KeyBackend, form: &EditForm) -> Result<(), ValidationError> {
    if form.identifier.trim().is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }
    if form.secret.trim().is_empty() {
        return Err(ValidationError::EmptySecret);
    }

    let encoding = encoding::lookup_code(&form.secret_encoding, Domain::SecretEncoding)
        .ok_or_else(|| ValidationError::UnknownSecretEncoding(form.secret_encoding.clone()))?;
    if !is_properly_encoded(backend, encoding, &form.secret) {
        return Err(ValidationError::SecretNotEncoded);
    }

    if !is_valid_digit_count(form.digit_count) {
        return Err(ValidationError::InvalidDigitCount(form.digit_count));
    }
    if encoding::lookup_code(&form.otp_type, Domain::OtpType).is_none() {
        return Err(ValidationError::UnknownOtpType(form.otp_type.clone()));
    }
    if encoding::lookup_code(&form.hash_algorithm, Domain::HashAlgorithm).is_none() {
        return Err(ValidationError::UnknownHashAlgorithm(
            form.hash_algorithm.clone(),
        ));
    }
    if form.period < 0 {
        return Err(ValidationError::NegativePeriod(form.period));
    }
    if form.counter_or_offset < 0 {
        return Err(ValidationError::NegativeCounter(form.counter_or_offset));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{CredentialEntry, FetchedEntry};
    use std::cell::Cell;

    /// Accepts anything, counting how often it was asked.
    #[derive(Default)]
    struct CountingBackend {
        encoding_checks: Cell<usize>,
        accept: bool,
    }

    impl KeyBackend for CountingBackend {
        fn fetch_entries(&self) -> Option<Vec<FetchedEntry>> {
            None
        }
        fn resolve_by_identifier(&self, _: &str) -> Option<CredentialEntry> {
            None
        }
        fn add_entry(&self, _: &CredentialEntry) -> bool {
            false
        }
        fn update_entry(&self, _: &str, _: &CredentialEntry) -> bool {
            false
        }
        fn delete_entry(&self, _: &str) -> bool {
            false
        }
        fn increment_hotp_counter(&self, _: &str) -> bool {
            false
        }
        fn is_properly_encoded(&self, _: i32, _: &str) -> bool {
            self.encoding_checks.set(self.encoding_checks.get() + 1);
            self.accept
        }
    }

    fn accepting() -> CountingBackend {
        CountingBackend {
            accept: true,
            ..Default::default()
        }
    }

    fn valid_form() -> EditForm {
        EditForm {
            identifier: "site".into(),
            secret: "JBSWY3DPEHPK3PXP".into(),
            ..EditForm::default()
        }
    }

    #[test]
    fn test_unknown_encoding_never_reaches_the_store() {
        let backend = accepting();
        assert!(!is_properly_encoded(&backend, -1, "JBSWY3DP"));
        assert!(!is_properly_encoded(&backend, 2, "JBSWY3DP"));
        assert_eq!(backend.encoding_checks.get(), 0);

        assert!(is_properly_encoded(&backend, 1, "JBSWY3DP"));
        assert_eq!(backend.encoding_checks.get(), 1);
    }

    #[test]
    fn test_empty_identifier_or_secret_blocks_save() {
        let backend = accepting();

        let mut form = valid_form();
        form.identifier.clear();
        assert_eq!(can_save(&backend, &form), Err(ValidationError::EmptyIdentifier));

        let mut form = valid_form();
        form.secret = "   ".into();
        assert_eq!(can_save(&backend, &form), Err(ValidationError::EmptySecret));

        // Both empty: the identifier is reported first.
        let mut form = valid_form();
        form.identifier.clear();
        form.secret.clear();
        assert_eq!(can_save(&backend, &form), Err(ValidationError::EmptyIdentifier));
        assert_eq!(backend.encoding_checks.get(), 0);
    }

    #[test]
    fn test_digit_count_boundaries() {
        let backend = accepting();
        for digits in [6, 7, 8] {
            let form = EditForm {
                digit_count: digits,
                ..valid_form()
            };
            assert_eq!(can_save(&backend, &form), Ok(()), "{digits} digits");
        }
        for digits in [0, 5, 9, -6] {
            let form = EditForm {
                digit_count: digits,
                ..valid_form()
            };
            assert_eq!(
                can_save(&backend, &form),
                Err(ValidationError::InvalidDigitCount(digits))
            );
        }
    }

    #[test]
    fn test_checks_run_in_order() {
        let rejecting = CountingBackend::default();
        let form = EditForm {
            digit_count: 4,
            otp_type: "YOTP".into(),
            ..valid_form()
        };
        assert_eq!(can_save(&rejecting, &form), Err(ValidationError::SecretNotEncoded));

        let backend = accepting();
        assert_eq!(
            can_save(&backend, &form),
            Err(ValidationError::InvalidDigitCount(4))
        );

        let form = EditForm {
            otp_type: "YOTP".into(),
            hash_algorithm: "MD5".into(),
            ..valid_form()
        };
        assert_eq!(
            can_save(&backend, &form),
            Err(ValidationError::UnknownOtpType("YOTP".into()))
        );

        let form = EditForm {
            hash_algorithm: "MD5".into(),
            period: -1,
            ..valid_form()
        };
        assert_eq!(
            can_save(&backend, &form),
            Err(ValidationError::UnknownHashAlgorithm("MD5".into()))
        );

        let form = EditForm {
            period: -1,
            counter_or_offset: -1,
            ..valid_form()
        };
        assert_eq!(can_save(&backend, &form), Err(ValidationError::NegativePeriod(-1)));

        let form = EditForm {
            counter_or_offset: -1,
            ..valid_form()
        };
        assert_eq!(can_save(&backend, &form), Err(ValidationError::NegativeCounter(-1)));
    }

    #[test]
    fn test_unknown_encoding_label_is_its_own_reason() {
        let backend = accepting();
        let form = EditForm {
            secret_encoding: "Base64".into(),
            ..valid_form()
        };
        assert_eq!(
            can_save(&backend, &form),
            Err(ValidationError::UnknownSecretEncoding("Base64".into()))
        );
    }

    #[test]
    fn test_secrets_are_normalized_per_encoding() {
        assert_eq!(
            normalize_secret(Some(SecretEncoding::Base32), "jbsw y3dp ehpk 3pxp=="),
            "JBSWY3DPEHPK3PXP"
        );
        assert_eq!(normalize_secret(Some(SecretEncoding::Hex), " 3132 33\n"), "313233");
        assert_eq!(normalize_secret(None, "a b"), "ab");
    }
}
