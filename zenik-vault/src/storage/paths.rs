use std::path::{Path, PathBuf};

use crate::error::{Result, ZenikError};

pub const VAULT_FILE: &str = "zenik_vault.bin";
pub const SALT_FILE: &str = "zenik_vault.salt";
pub const CONFIG_FILE: &str = "config.json";
pub const LOG_FILE: &str = "zenik_tool.log";

const APP_DIR: &str = "zenik";

/// Default data directory: `<platform data dir>/zenik`.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| ZenikError::Config("Could not determine data directory".into()))
}

/// Locations of the vault's files inside one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub vault_file: PathBuf,
    pub salt_file: PathBuf,
}

impl VaultPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            vault_file: dir.join(VAULT_FILE),
            salt_file: dir.join(SALT_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir() {
        let paths = VaultPaths::in_dir(Path::new("/data/zenik"));
        assert_eq!(paths.vault_file, PathBuf::from("/data/zenik/zenik_vault.bin"));
        assert_eq!(paths.salt_file, PathBuf::from("/data/zenik/zenik_vault.salt"));
    }
}
