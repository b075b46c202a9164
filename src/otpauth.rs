//! `otpauth://TYPE/LABEL?PARAMETERS` key URIs, as found in enrollment QR
//! codes (<https://github.com/google/google-authenticator/wiki/Key-Uri-Format>).

use std::collections::HashMap;

use tracing::debug;
use url::Url;

use crate::backend::ImportSource;
use crate::encoding::{self, Domain, OtpType};

/// Text decoded from a scanned code. Anything that isn't an `otpauth` URI
/// parses to a value that is not ready to import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpAuthUri {
    is_otp_code: bool,
    kind: String,
    label: String,
    params: HashMap<String, String>,
}

impl OtpAuthUri {
    pub fn parse(text: &str) -> Self {
        let url = match Url::parse(text.trim()) {
            Ok(url) => url,
            Err(e) => {
                debug!("the scanned code isn't a valid URI: {e}");
                return Self::default();
            }
        };
        if !url.scheme().eq_ignore_ascii_case("otpauth") {
            debug!(scheme = url.scheme(), "the scanned URI isn't an OTP code");
            return Self::default();
        }

        let kind = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let raw_label = url.path().trim_start_matches('/');
        let label = urlencoding::decode(raw_label)
            .map(|l| l.into_owned())
            .unwrap_or_else(|_| raw_label.to_string());
        let params = url
            .query_pairs()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.into_owned()))
            .collect();

        Self {
            is_otp_code: true,
            kind,
            label,
            params,
        }
    }

    pub fn is_otp_code(&self) -> bool {
        self.is_otp_code
    }

    /// `totp` or `hotp` (lower-cased) for a well-formed URI.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.params
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

impl ImportSource for OtpAuthUri {
    fn secret(&self) -> Option<String> {
        self.parameter("secret").map(str::to_string)
    }

    fn label(&self) -> Option<String> {
        (!self.label.is_empty()).then(|| self.label.clone())
    }

    fn digit_count(&self) -> Option<String> {
        self.parameter("digits").map(str::to_string)
    }

    fn otp_type(&self) -> Option<i32> {
        match self.kind.as_str() {
            "totp" => Some(OtpType::Totp.code()),
            "hotp" => Some(OtpType::Hotp.code()),
            _ => None,
        }
    }

    /// The `issuer` parameter, else the `Issuer:` prefix of the label.
    fn issuer(&self) -> Option<String> {
        self.parameter("issuer")
            .map(str::to_string)
            .or_else(|| {
                self.label
                    .split_once(':')
                    .map(|(issuer, _)| issuer.trim().to_string())
            })
            .filter(|i| !i.is_empty())
    }

    fn hash_algorithm(&self) -> Option<i32> {
        self.parameter("algorithm")
            .and_then(|a| encoding::lookup_code(&a.to_ascii_uppercase(), Domain::HashAlgorithm))
    }

    fn period(&self) -> Option<i64> {
        self.parameter("period").and_then(|p| p.parse().ok())
    }

    fn counter(&self) -> Option<i64> {
        self.parameter("counter").and_then(|c| c.parse().ok())
    }

    fn is_ready_to_import(&self) -> bool {
        self.is_otp_code
    }
}
