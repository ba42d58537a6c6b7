//! Encrypted vault file storage using AES-256-GCM.
//!
//! This module provides:
//! - `VaultKey`: A 256-bit key wrapper that zeroizes on drop
//! - Functions to read/write the encrypted vault file
//!
//! File format: `[12-byte nonce][ciphertext with 16-byte auth tag]`. The
//! plaintext is the JSON collection document `{"items": [...]}`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::collection::ItemStore;
use super::error::{VaultError, VaultResult};

/// Nonce size for AES-GCM (96 bits = 12 bytes)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (32 bytes)
pub const KEY_SIZE: usize = 32;

/// A 256-bit encryption key with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    key: [u8; KEY_SIZE],
}

impl VaultKey {
    pub(crate) fn zeroed() -> Self {
        Self {
            key: [0u8; KEY_SIZE],
        }
    }

    /// Create a new VaultKey from raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { key: bytes }
    }

    /// Get the key as a byte slice for cryptographic operations.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_SIZE] {
        &mut self.key
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the actual key material
        f.debug_struct("VaultKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Check if a vault file exists.
pub fn vault_exists(path: &Path) -> bool {
    path.exists()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("vault"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Encrypt and write the collection to `path`.
///
/// The blob is written to a sibling temporary file, synced, then renamed over
/// the target, so an interrupted write leaves the previous vault intact.
pub fn write_vault(store: &ItemStore, key: &VaultKey, path: &Path) -> VaultResult<()> {
    let plaintext = Zeroizing::new(serde_json::to_vec(store)?);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("Invalid key: {}", e)))?;

    // Fresh nonce on every save
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_slice())
        .map_err(|e| VaultError::Encryption(format!("Encryption failed: {}", e)))?;

    let mut output = nonce_bytes.to_vec();
    output.extend(ciphertext);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = write_synced(&temp_path, &output) {
        if let Err(cleanup) = std::fs::remove_file(&temp_path) {
            debug!("Could not remove temporary vault file: {}", cleanup);
        }
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&temp_path, path) {
        warn!("Failed to replace vault file: {}", e);
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    debug!("Wrote {} items to {:?}", store.len(), path);
    Ok(())
}

/// Write `bytes` to a file only the owner can read, then sync it.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; a leftover temp file keeps its own.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()
}

/// Read and decrypt the collection from `path`.
///
/// A missing file is an empty vault. A blob that fails authentication (wrong
/// key, truncation, tampering) yields `Authentication` and no data.
pub fn read_vault(key: &VaultKey, path: &Path) -> VaultResult<ItemStore> {
    if !path.exists() {
        debug!("No vault file at {:?}, starting empty", path);
        return Ok(ItemStore::new());
    }

    let encrypted = std::fs::read(path)?;

    if encrypted.len() < NONCE_SIZE {
        return Err(VaultError::Authentication);
    }

    let (nonce_bytes, ciphertext) = encrypted.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultError::Encryption(format!("Invalid key: {}", e)))?;

    // Decryption failure = wrong key or corrupted file
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::Authentication)?,
    );

    let store: ItemStore = serde_json::from_slice(&plaintext)
        .map_err(|e| VaultError::Corrupted(e.to_string()))?;

    debug!("Read {} items from {:?}", store.len(), path);
    Ok(store)
}

/// Delete the vault file.
pub fn delete_vault(path: &Path) -> VaultResult<()> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
