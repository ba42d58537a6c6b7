//! Vault-specific error types.
//!
//! Every failure of a vault operation is reported as one of these variants so
//! the presentation layer can branch on the outcome instead of parsing
//! messages. None of them carries secret material.

use thiserror::Error;

use crate::clipboard::ClipboardError;

/// Errors that can occur during vault operations.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Wrong master password, or the vault blob was corrupted or tampered with.
    /// The vault stays locked; the caller may retry.
    #[error("Wrong master password (or vault corrupted)")]
    Authentication,

    /// The session was idle past the auto-lock threshold and has been locked.
    /// The requested operation was not performed.
    #[error("Vault auto-locked after inactivity")]
    AutoLocked,

    /// An operation that needs an unlocked vault was called while locked.
    #[error("Vault is locked")]
    Locked,

    /// A required field is missing or empty. Nothing was changed.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// An item position outside the current collection. Nothing was changed.
    #[error("No item at position {index} (vault holds {len} items)")]
    Index { index: usize, len: usize },

    /// The vault decrypted fine but its contents are not a valid collection.
    #[error("Vault data is corrupted: {0}")]
    Corrupted(String),

    /// An error occurred in the encryption layer.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// The salt file is invalid or the OS random source failed.
    #[error("Salt error: {0}")]
    Salt(String),

    /// No clipboard service is present. Reveal-on-screen still works.
    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    /// The clipboard service is present but the operation failed.
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// An I/O error occurred (file access, permissions, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Stable error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Authentication => "AUTHENTICATION",
            VaultError::AutoLocked => "AUTO_LOCKED",
            VaultError::Locked => "LOCKED",
            VaultError::Validation(_) => "VALIDATION",
            VaultError::Index { .. } => "INDEX",
            VaultError::Corrupted(_) => "CORRUPTED",
            VaultError::Encryption(_) => "ENCRYPTION_ERROR",
            VaultError::Salt(_) => "SALT_ERROR",
            VaultError::ClipboardUnavailable(_) => "CLIPBOARD_UNAVAILABLE",
            VaultError::Clipboard(_) => "CLIPBOARD_ERROR",
            VaultError::Io(_) => "IO_ERROR",
            VaultError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for the two outcomes after which the caller must unlock again.
    pub fn requires_unlock(&self) -> bool {
        matches!(self, VaultError::AutoLocked | VaultError::Locked)
    }
}

impl From<ClipboardError> for VaultError {
    fn from(err: ClipboardError) -> Self {
        match err {
            ClipboardError::Unavailable(msg) => VaultError::ClipboardUnavailable(msg),
            other => VaultError::Clipboard(other.to_string()),
        }
    }
}

// ============================================================================
// Serialization for the presentation layer
// ============================================================================

impl serde::Serialize for VaultError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("VaultError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
