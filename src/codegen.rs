use time::OffsetDateTime;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::encoding::{HashAlgorithm, OtpType, SecretEncoding};
use crate::entry::CredentialEntry;
use crate::error::CodeError;
use crate::validate;

/// Decode a stored secret into the raw key bytes.
pub fn decode_secret(encoding: i32, secret: &str) -> Result<Vec<u8>, CodeError> {
    let encoding = SecretEncoding::from_code(encoding).ok_or(CodeError::UnknownCode {
        what: "secret encoding",
        code: encoding,
    })?;
    let secret = validate::normalize_secret(Some(encoding), secret);

    let bytes = match encoding {
        SecretEncoding::Base32 => Secret::Encoded(secret)
            .to_bytes()
            .map_err(|e| CodeError::Secret(format!("invalid base32: {e:?}")))?,
        SecretEncoding::Hex => {
            hex::decode(secret).map_err(|e| CodeError::Secret(format!("invalid hex: {e}")))?
        }
    };

    if bytes.is_empty() {
        return Err(CodeError::Secret("decoded to an empty byte string".into()));
    }
    Ok(bytes)
}

pub fn unix_now() -> Result<u64, CodeError> {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).map_err(|_| CodeError::Clock)
}

/// The code `entry` shows at `unix_time`.
///
/// TOTP: `period` is the time step and `counter_or_offset` is added to the
/// clock. HOTP: `counter_or_offset` is the counter.
pub fn calculate(entry: &CredentialEntry, unix_time: u64) -> Result<String, CodeError> {
    let algorithm = match HashAlgorithm::from_code(entry.hash_algorithm) {
        Some(HashAlgorithm::Sha1) => Algorithm::SHA1,
        Some(HashAlgorithm::Sha256) => Algorithm::SHA256,
        Some(HashAlgorithm::Sha512) => Algorithm::SHA512,
        None => {
            return Err(CodeError::UnknownCode {
                what: "hash algorithm",
                code: entry.hash_algorithm,
            });
        }
    };
    let otp_type = OtpType::from_code(entry.otp_type).ok_or(CodeError::UnknownCode {
        what: "OTP type",
        code: entry.otp_type,
    })?;
    if !(6..=8).contains(&entry.digit_count) {
        return Err(CodeError::Digits(entry.digit_count));
    }
    let digits = entry.digit_count as usize;
    let counter =
        u64::try_from(entry.counter_or_offset).map_err(|_| CodeError::Counter(entry.counter_or_offset))?;
    let key = decode_secret(entry.secret_encoding, &entry.secret)?;

    // new_unchecked: providers hand out 80-bit secrets, below the RFC minimum.
    let code = match otp_type {
        OtpType::Totp => {
            let step = u64::try_from(entry.period)
                .ok()
                .filter(|p| *p > 0)
                .ok_or(CodeError::Period(entry.period))?;
            TOTP::new_unchecked(algorithm, digits, 1, step, key)
                .generate(unix_time.saturating_add(counter))
        }
        // A one-second step turns the time counter into the HOTP counter.
        OtpType::Hotp => TOTP::new_unchecked(algorithm, digits, 0, 1, key).generate(counter),
    };
    Ok(code)
}

/// Seconds of the current time step already gone at `unix_time`, offset
/// included. Always 0 for HOTP and for a non-positive period.
pub fn window_elapsed(entry: &CredentialEntry, unix_time: u64) -> i64 {
    if OtpType::from_code(entry.otp_type) != Some(OtpType::Totp) {
        return 0;
    }
    let (Ok(step), Ok(offset)) = (
        u64::try_from(entry.period),
        u64::try_from(entry.counter_or_offset),
    ) else {
        return 0;
    };
    if step == 0 {
        return 0;
    }
    // Below `period`, so it fits.
    (unix_time.saturating_add(offset) % step) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_SEED_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";
    const RFC_SEED_HEX: &str = "3132333435363738393031323334353637383930";
    const RFC_SEED_256_HEX: &str =
        "3132333435363738393031323334353637383930313233343536373839303132";

    fn entry(secret: &str, secret_encoding: i32) -> CredentialEntry {
        CredentialEntry {
            identifier: "rfc".into(),
            issuer: None,
            secret: secret.into(),
            secret_encoding,
            otp_type: 0,
            digit_count: 8,
            hash_algorithm: 0,
            period: 30,
            counter_or_offset: 0,
        }
    }

    #[test]
    fn test_matches_rfc6238_vectors() {
        let sha1 = entry(RFC_SEED_B32, 1);
        assert_eq!(calculate(&sha1, 59).unwrap(), "94287082");
        assert_eq!(calculate(&sha1, 1_111_111_109).unwrap(), "07081804");

        let sha1_hex = entry(RFC_SEED_HEX, 0);
        assert_eq!(calculate(&sha1_hex, 1_234_567_890).unwrap(), "89005924");

        let sha256 = CredentialEntry {
            hash_algorithm: 1,
            ..entry(RFC_SEED_256_HEX, 0)
        };
        assert_eq!(calculate(&sha256, 59).unwrap(), "46119246");
    }

    #[test]
    fn test_offset_shifts_the_clock() {
        let shifted = CredentialEntry {
            counter_or_offset: 30,
            ..entry(RFC_SEED_B32, 1)
        };
        assert_eq!(calculate(&shifted, 29).unwrap(), "94287082");
    }

    #[test]
    fn test_window_elapsed_follows_the_clock() {
        let totp = entry(RFC_SEED_B32, 1);
        assert_eq!(window_elapsed(&totp, 59), 29);
        assert_eq!(window_elapsed(&totp, 60), 0);
        assert_eq!(window_elapsed(&totp, 1_000_000_008), 18);

        let shifted = CredentialEntry {
            counter_or_offset: 5,
            ..entry(RFC_SEED_B32, 1)
        };
        assert_eq!(window_elapsed(&shifted, 1_000_000_008), 23);

        let hotp = CredentialEntry {
            otp_type: 1,
            ..entry(RFC_SEED_B32, 1)
        };
        assert_eq!(window_elapsed(&hotp, 59), 0);

        let frozen = CredentialEntry {
            period: 0,
            ..entry(RFC_SEED_B32, 1)
        };
        assert_eq!(window_elapsed(&frozen, 59), 0);
    }

    #[test]
    fn test_matches_rfc4226_vectors() {
        let expected = ["755224", "287082", "359152", "969429"];
        for (counter, code) in expected.iter().enumerate() {
            let hotp = CredentialEntry {
                otp_type: 1,
                digit_count: 6,
                counter_or_offset: counter as i64,
                ..entry(RFC_SEED_HEX, 0)
            };
            // The clock must not matter for HOTP.
            assert_eq!(calculate(&hotp, 1_700_000_000).unwrap(), *code);
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let base = entry(RFC_SEED_B32, 1);

        let digits = CredentialEntry {
            digit_count: 5,
            ..base.clone()
        };
        assert_eq!(calculate(&digits, 59), Err(CodeError::Digits(5)));

        let period = CredentialEntry {
            period: 0,
            ..base.clone()
        };
        assert_eq!(calculate(&period, 59), Err(CodeError::Period(0)));

        let algorithm = CredentialEntry {
            hash_algorithm: 9,
            ..base.clone()
        };
        assert!(matches!(
            calculate(&algorithm, 59),
            Err(CodeError::UnknownCode { code: 9, .. })
        ));

        let secret = CredentialEntry {
            secret: "not base32 at all!".into(),
            ..base
        };
        assert!(matches!(calculate(&secret, 59), Err(CodeError::Secret(_))));
    }

    #[test]
    fn test_decodes_both_encodings() {
        assert_eq!(decode_secret(1, RFC_SEED_B32).unwrap(), b"12345678901234567890");
        assert_eq!(decode_secret(0, RFC_SEED_HEX).unwrap(), b"12345678901234567890");
        assert!(decode_secret(0, "abc").is_err());
        assert!(decode_secret(0, "").is_err());
        assert!(decode_secret(-1, RFC_SEED_HEX).is_err());
    }
}
