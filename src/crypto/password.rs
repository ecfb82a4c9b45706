use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{CryptoError, HASH_LENGTH, SALT_LENGTH};

const SCHEME: &str = "pbkdf2-sha256";
const TEMPORARY_PASSWORD_LENGTH: usize = 10;

/// Hash a password into the self-describing form
/// `pbkdf2-sha256$<iterations>$<salt>$<hash>` (unpadded base64).
pub fn hash_password(password: &str, iterations: u32) -> Result<String, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::InvalidIterations);
    }
    let salt = generate_salt();
    let hash = derive(password, &salt, iterations);
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check `password` against an encoded hash. The iteration count and salt
/// come from the encoded form, so hashes made with older settings still verify.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, CryptoError> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(CryptoError::MalformedHash);
    };
    if scheme != SCHEME {
        return Err(CryptoError::UnsupportedScheme(scheme.to_string()));
    }
    let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
    if iterations == 0 {
        return Err(CryptoError::InvalidIterations);
    }
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| CryptoError::MalformedHash)?;
    let expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| CryptoError::MalformedHash)?;
    if expected.len() != HASH_LENGTH {
        return Err(CryptoError::MalformedHash);
    }

    let actual = derive(password, &salt, iterations);
    Ok(bool::from(actual.as_slice().ct_eq(expected.as_slice())))
}

/// Random alphanumeric password mailed to new doctors and on reset.
pub fn generate_temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn correct_password_verifies() {
        let encoded = hash_password("Str0ng!pass", TEST_ITERATIONS).unwrap();
        assert!(verify_password("Str0ng!pass", &encoded).unwrap());
    }

    #[test]
    fn wrong_password_fails() {
        let encoded = hash_password("Str0ng!pass", TEST_ITERATIONS).unwrap();
        assert!(!verify_password("str0ng!pass", &encoded).unwrap());
    }

    #[test]
    fn same_password_gets_different_salts() {
        let a = hash_password("secret", TEST_ITERATIONS).unwrap();
        let b = hash_password("secret", TEST_ITERATIONS).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn encoded_form_records_iterations() {
        let encoded = hash_password("secret", 1234).unwrap();
        assert!(encoded.starts_with("pbkdf2-sha256$1234$"));
        assert_eq!(encoded.split('$').count(), 4);
    }

    #[test]
    fn malformed_hash_is_rejected() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(CryptoError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("x", "bcrypt$10$abc$def"),
            Err(CryptoError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            verify_password("x", "pbkdf2-sha256$0$abc$def"),
            Err(CryptoError::InvalidIterations)
        ));
    }

    #[test]
    fn zero_iterations_refused() {
        assert!(hash_password("x", 0).is_err());
    }

    #[test]
    fn temporary_password_is_ten_alphanumerics() {
        let password = generate_temporary_password();
        assert_eq!(password.len(), 10);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_temporary_password());
    }
}
