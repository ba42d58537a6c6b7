//! Session state reported to the presentation layer.

use serde::{Deserialize, Serialize};

/// Represents the current state of the vault session.
///
/// - `Locked` → `Unlocked` after a successful `unlock`
/// - `Unlocked` → `Locked` on `lock`, idle auto-lock or `destroy`
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum VaultStatus {
    /// No key in memory. Item operations fail with `Locked`.
    #[default]
    Locked,
    /// Key and decrypted collection are held in memory.
    Unlocked,
}

impl VaultStatus {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked)
    }
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "Locked"),
            Self::Unlocked => write!(f, "Unlocked"),
        }
    }
}
