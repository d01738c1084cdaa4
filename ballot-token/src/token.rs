use std::{fmt, num::NonZeroU32, str::FromStr};

use sha2::Sha256;

use crate::{error::TokenError, salt::SALT_LEN};

/// Length of a voting token in bytes.
pub const TOKEN_LEN: usize = 8;

/// Default PBKDF2 work factor.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// A voting token: 8 bytes shown as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token([u8; TOKEN_LEN]);

impl Token {
    #[must_use]
    pub const fn new(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; TOKEN_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| TokenError::Malformed {
            expected: TOKEN_LEN * 2,
            reason: e.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

/// Derives tokens with PBKDF2-HMAC-SHA256 over the address, keyed by the
/// campaign salt, truncated to [`TOKEN_LEN`] bytes.
///
/// The address bytes are used exactly as given; no case folding happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDeriver {
    iterations: NonZeroU32,
}

impl Default for TokenDeriver {
    fn default() -> Self {
        Self {
            iterations: NonZeroU32::new(DEFAULT_ITERATIONS).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl TokenDeriver {
    #[must_use]
    pub const fn new(iterations: NonZeroU32) -> Self {
        Self { iterations }
    }

    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations.get()
    }

    /// Derive the token for `address` under `salt`.
    ///
    /// # Errors
    /// - [`TokenError::EmptyAddress`] if `address` is empty
    /// - [`TokenError::SaltLength`] if `salt` is not [`SALT_LEN`] bytes
    pub fn derive(&self, address: &str, salt: impl AsRef<[u8]>) -> Result<Token, TokenError> {
        let salt = salt.as_ref();

        if address.is_empty() {
            return Err(TokenError::EmptyAddress);
        }

        if salt.len() != SALT_LEN {
            return Err(TokenError::SaltLength {
                expected: SALT_LEN,
                actual: salt.len(),
            });
        }

        let mut output = [0u8; TOKEN_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            address.as_bytes(),
            salt,
            self.iterations.get(),
            &mut output,
        );

        Ok(Token(output))
    }
}
