//! Voting-token primitives.
//!
//! - [`SaltProvider`] obtains the campaign salt, random or operator supplied
//! - [`TokenDeriver`] turns an address and the salt into a [`Token`]
//! - [`RecipientShuffler`] randomises processing order so the token ledger
//!   cannot be lined up against the membership list

mod error;
mod salt;
mod shuffle;
mod token;

pub use error::{SaltError, TokenError};
pub use salt::{SALT_LEN, Salt, SaltProvider};
pub use shuffle::RecipientShuffler;
pub use token::{DEFAULT_ITERATIONS, TOKEN_LEN, Token, TokenDeriver};
