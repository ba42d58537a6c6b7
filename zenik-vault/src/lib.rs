//! zenik-vault: a password-protected local vault for notes and logins.
//!
//! The library exposes the vault session (`vault::SessionManager`), the
//! clipboard controller and the small amount of configuration the session
//! needs. The `zenik-vault` binary wraps it in an interactive shell.

pub mod clipboard;
pub mod error;
pub mod events;
pub mod shell;
pub mod storage;
pub mod vault;

pub use error::{Result, ZenikError};
