pub mod password;
pub mod token;

pub use password::*;
pub use token::*;

use thiserror::Error;

/// Default PBKDF2 work factor for stored password hashes.
pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const SALT_LENGTH: usize = 16;
pub const HASH_LENGTH: usize = 32;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Unsupported password hash scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Iteration count must be positive")]
    InvalidIterations,
}
