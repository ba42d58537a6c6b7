//! Master password to vault key derivation (PBKDF2-HMAC-SHA256).

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tracing::debug;

use super::salt::SALT_SIZE;
use super::storage::{VaultKey, KEY_SIZE};

/// PBKDF2 iteration count. Changing it makes existing vaults unreadable.
pub const PBKDF2_ITERATIONS: u32 = 200_000;

/// Derive the vault key from the master password and the vault salt.
///
/// Deterministic and intentionally slow. A wrong password is only detected
/// later, when the derived key fails to authenticate the vault blob.
pub fn derive_key(password: &str, salt: &[u8; SALT_SIZE]) -> VaultKey {
    let mut key = VaultKey::zeroed();
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        key.as_mut_bytes(),
    );

    debug!("Derived {}-byte key from master password", KEY_SIZE);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_key("correct horse", &salt);
        let key2 = derive_key("correct horse", &salt);

        assert_eq!(
            key1.as_bytes(),
            key2.as_bytes(),
            "Same password and salt should produce same key"
        );
        assert_eq!(key1.as_bytes().len(), KEY_SIZE);
    }

    #[test]
    fn test_derive_key_different_passwords() {
        let salt = [1u8; SALT_SIZE];
        let key1 = derive_key("correct horse", &salt);
        let key2 = derive_key("correct horsf", &salt);

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_salts() {
        let key1 = derive_key("correct horse", &[1u8; SALT_SIZE]);
        let key2 = derive_key("correct horse", &[2u8; SALT_SIZE]);

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }
}
