use std::{fmt, str::FromStr};

use rand::RngCore;
use tracing::warn;

use crate::error::SaltError;

/// Length of a campaign salt in bytes.
pub const SALT_LEN: usize = 16;

/// The campaign-wide salt mixed into every token derivation.
///
/// `Debug` does not reveal the bytes; use `Display` (lowercase hex) when the
/// salt is meant to be shown.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    #[must_use]
    pub const fn new(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// A fresh salt from the thread-local CSPRNG (seeded by the OS).
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Decode a salt from exactly 32 hex characters (either case).
    ///
    /// # Errors
    /// Returns [`SaltError`] on the wrong length or a non-hex character.
    pub fn from_hex(value: &str) -> Result<Self, SaltError> {
        let value = value.trim();
        if value.len() != SALT_LEN * 2 {
            return Err(SaltError::WrongLength {
                expected: SALT_LEN * 2,
                actual: value.len(),
            });
        }

        let mut bytes = [0u8; SALT_LEN];
        hex::decode_to_slice(value, &mut bytes)?;
        Ok(Self(bytes))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Salt {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Salt {
    type Err = SaltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

/// Hands out the salt for a run and makes sure the operator sees it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SaltProvider;

impl SaltProvider {
    /// Decode `explicit_hex` if given, otherwise generate a random salt.
    ///
    /// The salt is logged at WARN either way: it is never written next to the
    /// ledger, so the log is the operator's record of it.
    ///
    /// # Errors
    /// Returns [`SaltError`] if `explicit_hex` is malformed. Nothing is logged
    /// in that case.
    pub fn obtain(self, explicit_hex: Option<&str>) -> Result<Salt, SaltError> {
        let salt = match explicit_hex {
            Some(value) => {
                let salt = Salt::from_hex(value)?;
                warn!(%salt, "Using operator-supplied campaign salt");
                salt
            }
            None => {
                let salt = Salt::random();
                warn!(
                    %salt,
                    "Generated campaign salt; record it, resuming this campaign requires it"
                );
                salt
            }
        };

        Ok(salt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FIXED: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn test_decodes_fixed_salt() {
        let salt = Salt::from_hex(FIXED).unwrap();
        assert_eq!(salt.as_bytes(), &core::array::from_fn::<u8, 16, _>(|i| i as u8));
        assert_eq!(salt.to_string(), FIXED);
    }

    #[test]
    fn test_accepts_uppercase_and_whitespace() {
        let salt = Salt::from_hex(&format!(" {} ", FIXED.to_uppercase())).unwrap();
        assert_eq!(salt.to_string(), FIXED);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            Salt::from_hex("0001").unwrap_err(),
            SaltError::WrongLength {
                expected: 32,
                actual: 4
            }
        );
        assert!(matches!(
            Salt::from_hex(&format!("{FIXED}00")),
            Err(SaltError::WrongLength { actual: 34, .. })
        ));
        assert!(Salt::from_hex("").is_err());
    }

    #[test]
    fn test_rejects_non_hex() {
        let bad = "zz0102030405060708090a0b0c0d0e0f";
        assert!(matches!(
            Salt::from_hex(bad),
            Err(SaltError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_random_salts_differ() {
        assert_ne!(Salt::random(), Salt::random());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let salt = Salt::from_hex(FIXED).unwrap();
        assert_eq!(format!("{salt:?}"), "Salt(..)");
    }

    #[test]
    fn test_provider_prefers_explicit_value() {
        let salt = SaltProvider.obtain(Some(FIXED)).unwrap();
        assert_eq!(salt.to_string(), FIXED);

        assert!(SaltProvider.obtain(Some("nope")).is_err());
        assert_ne!(SaltProvider.obtain(None).unwrap().to_string(), FIXED);
    }
}
