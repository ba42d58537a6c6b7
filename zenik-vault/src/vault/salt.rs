//! Salt manager for PBKDF2 key derivation.
//!
//! Each vault gets a unique 16-byte salt the first time it is used. The salt
//! is stored next to the vault file and never rewritten afterwards, so the
//! same master password keeps deriving the same key.

use rand::rngs::OsRng;
use rand::TryRngCore;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use super::error::{VaultError, VaultResult};

/// Salt size in bytes (128 bits)
pub const SALT_SIZE: usize = 16;

/// Get the existing salt at `path` or create a new one.
///
/// An existing file is returned verbatim. A file of the wrong length is an
/// error rather than something to overwrite, since replacing it would make
/// the vault undecryptable.
///
/// # Errors
/// Returns `Io` if the file cannot be read or written, `Salt` if it has the
/// wrong size or the OS random source fails.
pub fn get_or_create_salt(path: &Path) -> VaultResult<[u8; SALT_SIZE]> {
    if path.exists() {
        let bytes = std::fs::read(path)?;
        if bytes.len() != SALT_SIZE {
            return Err(VaultError::Salt(format!(
                "Invalid salt file size: expected {} bytes, got {}",
                SALT_SIZE,
                bytes.len()
            )));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes);
        debug!("Loaded vault salt from {:?}", path);
        return Ok(salt);
    }

    let mut salt = [0u8; SALT_SIZE];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| VaultError::Salt(format!("OS random source failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(&salt)?;
    file.sync_all()?;

    info!("Created new vault salt at {:?}", path);
    Ok(salt)
}

/// Delete the salt file.
///
/// Returns `Ok(())` if the file doesn't exist.
pub fn delete_salt(path: &Path) -> VaultResult<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_is_created_once_and_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.salt");

        let first = get_or_create_salt(&path).unwrap();
        let second = get_or_create_salt(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&path).unwrap(), first.to_vec());
    }

    #[test]
    fn test_existing_salt_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.salt");
        let fixed = [7u8; SALT_SIZE];
        std::fs::write(&path, fixed).unwrap();

        assert_eq!(get_or_create_salt(&path).unwrap(), fixed);
    }

    #[test]
    fn test_wrong_size_salt_is_rejected_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.salt");
        std::fs::write(&path, [1u8; 5]).unwrap();

        let err = get_or_create_salt(&path).unwrap_err();
        assert!(matches!(err, VaultError::Salt(_)));
        assert_eq!(std::fs::read(&path).unwrap(), vec![1u8; 5]);
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vault.salt");

        get_or_create_salt(&path).unwrap();
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_new_salt_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.salt");
        get_or_create_salt(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_delete_salt_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.salt");
        get_or_create_salt(&path).unwrap();

        delete_salt(&path).unwrap();
        assert!(!path.exists());
        delete_salt(&path).unwrap();
    }
}
