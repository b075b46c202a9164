use serde::{Deserialize, Serialize};
use tracing::error;

/// Code returned by [`to_int`] for a label it does not know.
pub const UNKNOWN_CODE: i32 = -1;

/// Label returned by [`to_label`] for a code it does not know.
pub const UNKNOWN_LABEL: &str = "<UNKNOWN>";

/// The three independent label/code tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    SecretEncoding,
    OtpType,
    HashAlgorithm,
}

impl Domain {
    pub const ALL: [Domain; 3] = [
        Domain::SecretEncoding,
        Domain::OtpType,
        Domain::HashAlgorithm,
    ];

    fn table(self) -> &'static [(&'static str, i32)] {
        match self {
            Domain::SecretEncoding => &[("HEX", 0), ("Base32", 1)],
            Domain::OtpType => &[("TOTP", 0), ("HOTP", 1)],
            Domain::HashAlgorithm => &[("SHA1", 0), ("SHA256", 1), ("SHA512", 2)],
        }
    }

    /// Every code defined for this domain.
    pub fn codes(self) -> impl Iterator<Item = i32> {
        self.table().iter().map(|(_, code)| *code)
    }

    /// Every label defined for this domain, in code order.
    pub fn labels(self) -> impl Iterator<Item = &'static str> {
        self.table().iter().map(|(label, _)| *label)
    }

    fn name(self) -> &'static str {
        match self {
            Domain::SecretEncoding => "secret encoding",
            Domain::OtpType => "OTP type",
            Domain::HashAlgorithm => "hash algorithm",
        }
    }
}

/// Look a label up without reporting anything.
pub fn lookup_code(label: &str, domain: Domain) -> Option<i32> {
    domain
        .table()
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, code)| *code)
}

/// Look a code up without reporting anything.
pub fn lookup_label(code: i32, domain: Domain) -> Option<&'static str> {
    domain
        .table()
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(label, _)| *label)
}

/// Label shown in the UI -> integer code used by the store.
/// Unknown labels give [`UNKNOWN_CODE`] and an error in the log.
pub fn to_int(label: &str, domain: Domain) -> i32 {
    lookup_code(label, domain).unwrap_or_else(|| {
        error!(domain = domain.name(), label, "unknown/unexpected label");
        UNKNOWN_CODE
    })
}

/// Integer code used by the store -> label shown in the UI.
/// Unknown codes give [`UNKNOWN_LABEL`] and an error in the log.
pub fn to_label(code: i32, domain: Domain) -> &'static str {
    lookup_label(code, domain).unwrap_or_else(|| {
        error!(domain = domain.name(), code, "unknown/unexpected code");
        UNKNOWN_LABEL
    })
}

macro_rules! coded_enum {
    ($name:ident, $domain:expr, { $($variant:ident = $code:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const DOMAIN: Domain = $domain;

            pub fn code(self) -> i32 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: i32) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn label(self) -> &'static str {
                to_label(self.code(), Self::DOMAIN)
            }

            pub fn from_label(label: &str) -> Option<Self> {
                lookup_code(label, Self::DOMAIN).and_then(Self::from_code)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

coded_enum!(SecretEncoding, Domain::SecretEncoding, { Hex = 0, Base32 = 1 });
coded_enum!(OtpType, Domain::OtpType, { Totp = 0, Hotp = 1 });
coded_enum!(HashAlgorithm, Domain::HashAlgorithm, { Sha1 = 0, Sha256 = 1, Sha512 = 2 });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_round_trips_through_its_label() {
        for domain in Domain::ALL {
            for code in domain.codes() {
                assert_eq!(to_int(to_label(code, domain), domain), code, "{domain:?}");
            }
        }
    }

    #[test]
    fn test_unknown_values_map_to_sentinels() {
        assert_eq!(to_int("BASE64", Domain::SecretEncoding), UNKNOWN_CODE);
        assert_eq!(to_int("totp", Domain::OtpType), UNKNOWN_CODE);
        assert_eq!(to_label(3, Domain::HashAlgorithm), UNKNOWN_LABEL);
        assert_eq!(to_label(-1, Domain::OtpType), UNKNOWN_LABEL);
    }

    #[test]
    fn test_store_codes_match_the_wire_values() {
        assert_eq!(to_int("HEX", Domain::SecretEncoding), 0);
        assert_eq!(to_int("Base32", Domain::SecretEncoding), 1);
        assert_eq!(to_int("HOTP", Domain::OtpType), 1);
        assert_eq!(to_int("SHA512", Domain::HashAlgorithm), 2);
    }

    #[test]
    fn test_typed_enums_agree_with_the_tables() {
        assert_eq!(SecretEncoding::Base32.code(), 1);
        assert_eq!(OtpType::from_code(1), Some(OtpType::Hotp));
        assert_eq!(HashAlgorithm::from_label("SHA256"), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_label("sha256"), None);
        assert_eq!(OtpType::Totp.to_string(), "TOTP");
        assert_eq!(SecretEncoding::from_code(7), None);
    }
}
