//! zenik-vault interactive shell.
//!
//! Items are stored in `<data dir>/zenik_vault.bin`, encrypted with a key
//! derived from the master password. Secrets copied to the clipboard are
//! cleared again after a delay unless something else was copied meanwhile.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use zenik_vault::clipboard::{
    ClipboardBackend, ClipboardController, MemoryClipboard, SystemClipboard,
};
use zenik_vault::events::FileEventLog;
use zenik_vault::shell::{Shell, TerminalPrompter};
use zenik_vault::storage::{default_data_dir, load_settings, VaultPaths, CONFIG_FILE, LOG_FILE};
use zenik_vault::vault::SessionManager;

/// Password-protected local vault
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding the vault, salt, settings and event log
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to <data-dir>/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the auto-lock timeout in minutes
    #[arg(long)]
    autolock_minutes: Option<u64>,

    /// Override the clipboard auto-clear delay in seconds
    #[arg(long)]
    clipboard_clear_seconds: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zenik_vault=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let config_path = args.config.unwrap_or_else(|| data_dir.join(CONFIG_FILE));
    let mut settings = load_settings(&config_path);
    if let Some(minutes) = args.autolock_minutes {
        settings.vault_autolock_minutes = minutes;
    }
    if let Some(seconds) = args.clipboard_clear_seconds {
        settings.vault_clipboard_clear_seconds = seconds;
    }

    info!("Data directory: {:?}", data_dir);

    // The clipboard auto-clear timer runs on this runtime's worker threads
    // while the shell blocks on terminal input.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let _guard = runtime.enter();

    let backend: Arc<dyn ClipboardBackend> = match SystemClipboard::detect() {
        Ok(clipboard) => {
            info!("Clipboard: {}", clipboard.name());
            Arc::new(clipboard)
        }
        Err(e) => {
            warn!("{}; copy commands will report the clipboard as unavailable", e);
            Arc::new(MemoryClipboard::unavailable())
        }
    };

    let events = Arc::new(FileEventLog::new(data_dir.join(LOG_FILE)));
    let session = SessionManager::new(
        VaultPaths::in_dir(&data_dir),
        &settings,
        ClipboardController::new(backend),
        events.clone(),
    );

    let mut shell = Shell::new(
        session,
        settings,
        config_path,
        events,
        TerminalPrompter,
        std::io::stdout(),
    );
    shell.run()?;

    Ok(())
}
