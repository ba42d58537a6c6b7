use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_AUTOLOCK_MINUTES: u64 = 3;
pub const DEFAULT_CLIPBOARD_CLEAR_SECONDS: u64 = 20;

/// User settings read from `config.json`.
///
/// Missing keys take their defaults and unknown keys are ignored, so the file
/// can be shared with other tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub vault_autolock_minutes: u64,
    pub vault_clipboard_clear_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            vault_autolock_minutes: DEFAULT_AUTOLOCK_MINUTES,
            vault_clipboard_clear_seconds: DEFAULT_CLIPBOARD_CLEAR_SECONDS,
        }
    }
}

impl AppSettings {
    /// Idle threshold, never shorter than one minute.
    pub fn autolock(&self) -> Duration {
        Duration::from_secs(self.vault_autolock_minutes.max(1) * 60)
    }

    /// Clipboard auto-clear delay; `0` falls back to the default.
    pub fn clipboard_clear_seconds(&self) -> u64 {
        match self.vault_clipboard_clear_seconds {
            0 => DEFAULT_CLIPBOARD_CLEAR_SECONDS,
            seconds => seconds,
        }
    }
}

/// Load settings from `path`. A missing or unreadable file yields defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    if !path.exists() {
        return AppSettings::default();
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| {
            serde_json::from_str::<AppSettings>(&content).map_err(|e| e.to_string())
        });

    match parsed {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Ignoring invalid settings file {:?}: {}", path, e);
            AppSettings::default()
        }
    }
}

pub fn save_settings(settings: &AppSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
