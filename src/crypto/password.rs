use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AuthError;

pub const PBKDF2_ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 210_000 };
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const SCHEME: &str = "pbkdf2-sha256";

/// Derived password hash: zeroed on drop
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedHash([u8; HASH_LENGTH]);

impl DerivedHash {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut bytes = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        Self(bytes)
    }
}

/// Generate a cryptographically random salt
fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Hash a password for storage as `pbkdf2-sha256$<iterations>$<salt>$<hash>`.
pub fn hash_password(password: &str) -> String {
    let salt = generate_salt();
    let derived = DerivedHash::derive(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(derived.0)
    )
}

/// Check a password against a stored hash in constant time.
///
/// The iteration count is read from the stored string, so hashes made with
/// an older cost keep verifying.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AuthError::MalformedHash);
    };

    let iterations: u32 = iterations.parse().map_err(|_| AuthError::MalformedHash)?;
    let salt = STANDARD_NO_PAD
        .decode(salt)
        .map_err(|_| AuthError::MalformedHash)?;
    let mut expected = STANDARD_NO_PAD
        .decode(expected)
        .map_err(|_| AuthError::MalformedHash)?;
    if iterations == 0 || expected.len() != HASH_LENGTH {
        return Err(AuthError::MalformedHash);
    }

    let derived = DerivedHash::derive(password, &salt, iterations);
    let matches: bool = derived.0[..].ct_eq(&expected[..]).into();
    expected.zeroize();
    Ok(matches)
}
