use thiserror::Error;

use crate::clipboard::ClipboardError;
use crate::vault::VaultError;

#[derive(Error, Debug)]
pub enum ZenikError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ZenikError>;
