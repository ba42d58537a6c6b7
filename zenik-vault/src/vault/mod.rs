//! Password-protected local vault.
//!
//! Items (logins and notes) live in a single AES-256-GCM encrypted file. The
//! key is derived from the master password with PBKDF2-HMAC-SHA256 and a
//! per-vault random salt, and is only held in memory while the session is
//! unlocked.

pub mod auth;
pub mod collection;
pub mod error;
pub mod item;
pub mod kdf;
pub mod salt;
pub mod session;
pub mod storage;

pub use auth::VaultStatus;
pub use collection::ItemStore;
pub use error::{VaultError, VaultResult};
pub use item::{Item, ItemEdit, ItemField, ItemKind, ItemSummary, ItemView, NewLogin};
pub use kdf::derive_key;
pub use salt::{delete_salt, get_or_create_salt};
pub use session::SessionManager;
pub use storage::{read_vault, write_vault, VaultKey};
