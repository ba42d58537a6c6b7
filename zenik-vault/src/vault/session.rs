//! SessionManager - the locked/unlocked vault session.
//!
//! This is the only entry point the presentation layer uses for vault data.
//! It owns:
//! - The derived key and the decrypted collection (only while unlocked)
//! - The idle auto-lock check that gates every item and clipboard operation
//! - Immediate re-encryption after each mutation, with rollback on failure

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::auth::VaultStatus;
use super::collection::ItemStore;
use super::error::{VaultError, VaultResult};
use super::item::{Item, ItemEdit, ItemField, ItemView, NewLogin};
use super::kdf::derive_key;
use super::salt::{delete_salt, get_or_create_salt};
use super::storage::{delete_vault, read_vault, write_vault, VaultKey};
use crate::clipboard::ClipboardController;
use crate::events::EventSink;
use crate::storage::{AppSettings, VaultPaths};

/// Everything that exists only while the vault is unlocked. Dropping it wipes
/// the key and the item secrets.
struct UnlockedState {
    key: VaultKey,
    items: ItemStore,
    last_activity: Instant,
}

impl UnlockedState {
    fn persist(&self, vault_file: &Path) -> VaultResult<()> {
        write_vault(&self.items, &self.key, vault_file)
    }
}

pub struct SessionManager {
    paths: VaultPaths,
    autolock: Duration,
    clipboard_clear_seconds: u64,
    state: Option<UnlockedState>,
    clipboard: ClipboardController,
    events: Arc<dyn EventSink>,
}

impl SessionManager {
    pub fn new(
        paths: VaultPaths,
        settings: &AppSettings,
        clipboard: ClipboardController,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            paths,
            autolock: settings.autolock(),
            clipboard_clear_seconds: settings.clipboard_clear_seconds(),
            state: None,
            clipboard,
            events,
        }
    }

    /// Take new auto-lock and clipboard values. The idle clock is not reset.
    pub fn apply_settings(&mut self, settings: &AppSettings) {
        self.autolock = settings.autolock();
        self.clipboard_clear_seconds = settings.clipboard_clear_seconds();
    }

    pub fn status(&self) -> VaultStatus {
        if self.state.is_some() {
            VaultStatus::Unlocked
        } else {
            VaultStatus::Locked
        }
    }

    pub fn autolock(&self) -> Duration {
        self.autolock
    }

    pub fn clipboard_clear_seconds(&self) -> u64 {
        self.clipboard_clear_seconds
    }

    pub fn clipboard(&self) -> &ClipboardController {
        &self.clipboard
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Unlock the vault with the master password.
    ///
    /// A missing vault file unlocks to an empty collection; the file is
    /// created by the first save. On failure the session stays locked and no
    /// key is kept.
    pub fn unlock(&mut self, password: &str) -> VaultResult<()> {
        if password.is_empty() {
            return Err(VaultError::Validation("master password is required".into()));
        }

        if self.state.take().is_some() {
            debug!("Dropping current session before unlocking again");
            self.clipboard.cancel_pending();
        }

        match self.open(password) {
            Ok(state) => {
                info!("Vault unlocked with {} items", state.items.len());
                self.state = Some(state);
                self.events.record("Vault unlocked.");
                Ok(())
            }
            Err(e) => {
                warn!("Vault unlock failed: {}", e);
                self.events.record("Vault: unlock failed.");
                Err(e)
            }
        }
    }

    fn open(&self, password: &str) -> VaultResult<UnlockedState> {
        let salt = get_or_create_salt(&self.paths.salt_file)?;
        let key = derive_key(password, &salt);
        let items = read_vault(&key, &self.paths.vault_file)?;

        Ok(UnlockedState {
            key,
            items,
            last_activity: Instant::now(),
        })
    }

    /// Lock the vault, discarding the key and the decrypted collection, and
    /// cancel any pending clipboard clear.
    pub fn lock(&mut self) {
        self.clipboard.cancel_pending();
        if self.state.take().is_some() {
            info!("Vault locked");
            self.events.record("Vault locked manually.");
        }
    }

    /// Apply the idle check and report whether the session is locked.
    pub fn is_idle_locked(&mut self) -> bool {
        self.expire_if_idle();
        self.state.is_none()
    }

    /// Lock and delete the vault and salt files. All items are lost.
    pub fn destroy(&mut self) -> VaultResult<()> {
        warn!("Destroying vault - all items will be lost!");
        self.clipboard.cancel_pending();
        self.state = None;

        delete_vault(&self.paths.vault_file)?;
        delete_salt(&self.paths.salt_file)?;

        self.events.record("Vault destroyed.");
        Ok(())
    }

    /// Auto-lock if the session has been idle for at least the threshold.
    /// Returns true if it locked now.
    fn expire_if_idle(&mut self) -> bool {
        let idle = self
            .state
            .as_ref()
            .is_some_and(|state| state.last_activity.elapsed() >= self.autolock);

        if idle {
            self.clipboard.cancel_pending();
            self.state = None;
            info!("Vault auto-locked after {:?} of inactivity", self.autolock);
            self.events.record("Vault auto-locked.");
        }
        idle
    }

    /// Gate for every item operation: idle check, then refresh the clock.
    fn touch(&mut self) -> VaultResult<()> {
        if self.expire_if_idle() {
            return Err(VaultError::AutoLocked);
        }
        let state = self.state.as_mut().ok_or(VaultError::Locked)?;
        state.last_activity = Instant::now();
        Ok(())
    }

    fn unlocked(&self) -> VaultResult<&UnlockedState> {
        self.state.as_ref().ok_or(VaultError::Locked)
    }

    // =========================================================================
    // Mutations - persisted immediately
    // =========================================================================

    pub fn add_note(&mut self, title: &str, value: &str, tags: &str) -> VaultResult<Item> {
        self.touch()?;
        let state = self.state.as_mut().ok_or(VaultError::Locked)?;

        let item = state.items.add_note(title, value, tags)?;
        if let Err(e) = state.persist(&self.paths.vault_file) {
            state.items.pop();
            return Err(e);
        }

        self.events.record("Vault: added NOTE.");
        Ok(item)
    }

    pub fn add_login(&mut self, login: NewLogin<'_>) -> VaultResult<Item> {
        self.touch()?;
        let state = self.state.as_mut().ok_or(VaultError::Locked)?;

        let item = state.items.add_login(login)?;
        if let Err(e) = state.persist(&self.paths.vault_file) {
            state.items.pop();
            return Err(e);
        }

        self.events.record("Vault: added LOGIN.");
        Ok(item)
    }

    /// Delete the item at `index` and return it.
    pub fn delete(&mut self, index: usize) -> VaultResult<Item> {
        self.touch()?;
        let state = self.state.as_mut().ok_or(VaultError::Locked)?;

        let removed = state.items.delete(index)?;
        if let Err(e) = state.persist(&self.paths.vault_file) {
            state.items.insert(index, removed);
            return Err(e);
        }

        self.events
            .record(&format!("Vault: deleted '{}'.", removed.title()));
        Ok(removed)
    }

    /// Apply `edit` to the item at `index` and return the updated item.
    pub fn edit(&mut self, index: usize, edit: &ItemEdit) -> VaultResult<Item> {
        self.touch()?;
        let state = self.state.as_mut().ok_or(VaultError::Locked)?;

        let previous = state.items.edit(index, edit)?;
        if let Err(e) = state.persist(&self.paths.vault_file) {
            state.items.replace(index, previous)?;
            return Err(e);
        }

        let updated = state.items.get(index)?.clone();
        self.events
            .record(&format!("Vault: edited '{}'.", updated.title()));
        Ok(updated)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn item_count(&mut self) -> VaultResult<usize> {
        self.touch()?;
        Ok(self.unlocked()?.items.len())
    }

    pub fn get(&mut self, index: usize) -> VaultResult<&Item> {
        self.touch()?;
        self.unlocked()?.items.get(index)
    }

    /// Items with their positions, optionally filtered by tag.
    pub fn list(&mut self, tag_filter: Option<&str>) -> VaultResult<Vec<(usize, &Item)>> {
        self.touch()?;
        Ok(self.unlocked()?.items.list(tag_filter))
    }

    pub fn search(&mut self, query: &str) -> VaultResult<Vec<(usize, &Item)>> {
        self.touch()?;
        Ok(self.unlocked()?.items.search(query))
    }

    /// Display record for the item at `index`. Revealing the secret is logged.
    pub fn view(&mut self, index: usize, reveal: bool) -> VaultResult<ItemView> {
        self.touch()?;
        let view = self.unlocked()?.items.get(index)?.view(reveal);
        if reveal {
            self.events.record("Vault: password revealed on screen.");
        }
        Ok(view)
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Copy one field of the item at `index` to the clipboard.
    ///
    /// Secret fields are cleared again after the configured delay unless the
    /// clipboard has changed in the meantime.
    pub fn copy_field(&mut self, index: usize, field: ItemField) -> VaultResult<()> {
        self.touch()?;
        let state = self.state.as_ref().ok_or(VaultError::Locked)?;
        let item = state.items.get(index)?;

        let value = item.field(field).ok_or_else(|| {
            VaultError::Validation(format!("{} items have no {} field", item.kind(), field))
        })?;
        if value.is_empty() {
            return Err(VaultError::Validation(format!("{} is empty", field)));
        }

        if field.is_secret() {
            let seconds = self.clipboard_clear_seconds;
            self.clipboard.copy_with_autoclear(value, seconds)?;
            self.events
                .record(&format!("Vault: password copied (auto-clear {}s).", seconds));
        } else {
            self.clipboard.copy(value)?;
            debug!("Copied {} to clipboard", field);
        }
        Ok(())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.clipboard.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::{ClipboardBackend, MemoryClipboard};
    use crate::events::MemoryEventLog;
    use crate::vault::storage::vault_exists;

    struct Fixture {
        _dir: tempfile::TempDir,
        session: SessionManager,
        clipboard: Arc<MemoryClipboard>,
        events: Arc<MemoryEventLog>,
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryClipboard::new()))
    }

    fn fixture_with(clipboard: Arc<MemoryClipboard>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(MemoryEventLog::new());
        let settings = AppSettings {
            vault_autolock_minutes: 1,
            vault_clipboard_clear_seconds: 5,
        };
        let session = SessionManager::new(
            VaultPaths::in_dir(dir.path()),
            &settings,
            ClipboardController::new(clipboard.clone()),
            events.clone(),
        );
        Fixture {
            _dir: dir,
            session,
            clipboard,
            events,
        }
    }

    fn bank() -> NewLogin<'static> {
        NewLogin {
            title: "Bank",
            username: "alice",
            password: "s3cret!",
            url: Some("https://bank.example"),
            note: None,
            tags: "money",
        }
    }

    #[test]
    fn test_starts_locked() {
        let mut f = fixture();
        assert_eq!(f.session.status(), VaultStatus::Locked);
        assert!(f.session.is_idle_locked());
        assert!(matches!(f.session.item_count(), Err(VaultError::Locked)));
        assert!(matches!(
            f.session.add_note("t", "v", ""),
            Err(VaultError::Locked)
        ));
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let mut f = fixture();
        assert!(matches!(
            f.session.unlock(""),
            Err(VaultError::Validation(_))
        ));
        assert!(!f.session.paths().salt_file.exists());
    }

    #[test]
    fn test_first_unlock_is_empty_and_file_created_on_save() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        assert_eq!(f.session.status(), VaultStatus::Unlocked);
        assert_eq!(f.session.item_count().unwrap(), 0);
        assert!(!vault_exists(&f.session.paths().vault_file));

        f.session.add_note("Wifi", "pw123", "home").unwrap();
        assert!(vault_exists(&f.session.paths().vault_file));
        assert!(f.events.contains("Vault unlocked."));
        assert!(f.events.contains("Vault: added NOTE."));
    }

    #[test]
    fn test_round_trip_through_unlock() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("Wifi", "pw123", "home").unwrap();
        f.session.add_login(bank()).unwrap();
        let before: Vec<Item> = f
            .session
            .list(None)
            .unwrap()
            .into_iter()
            .map(|(_, item)| item.clone())
            .collect();

        f.session.lock();
        assert_eq!(f.session.status(), VaultStatus::Locked);
        assert!(f.events.contains("Vault locked manually."));

        f.session.unlock("master").unwrap();
        let after: Vec<Item> = f
            .session
            .list(None)
            .unwrap()
            .into_iter()
            .map(|(_, item)| item.clone())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_wrong_password_stays_locked() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_login(bank()).unwrap();
        f.session.lock();

        assert!(matches!(
            f.session.unlock("not-master"),
            Err(VaultError::Authentication)
        ));
        assert_eq!(f.session.status(), VaultStatus::Locked);
        assert!(matches!(f.session.item_count(), Err(VaultError::Locked)));
        assert!(f.events.contains("Vault: unlock failed."));
    }

    #[test]
    fn test_unlock_while_unlocked_replaces_session() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("Wifi", "pw123", "").unwrap();

        assert!(f.session.unlock("wrong").is_err());
        assert_eq!(f.session.status(), VaultStatus::Locked);

        f.session.unlock("master").unwrap();
        assert_eq!(f.session.item_count().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_auto_lock() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("Wifi", "pw123", "").unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(f.session.item_count().unwrap(), 1);

        // Activity above reset the clock; 61s from here is past the threshold.
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(matches!(f.session.item_count(), Err(VaultError::AutoLocked)));
        assert_eq!(f.session.status(), VaultStatus::Locked);
        assert!(f.events.contains("Vault auto-locked."));

        // Locked now, not auto-locked again.
        assert!(matches!(f.session.item_count(), Err(VaultError::Locked)));

        f.session.unlock("master").unwrap();
        assert_eq!(f.session.item_count().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_idle_locked_applies_check() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        assert!(!f.session.is_idle_locked());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(f.session.is_idle_locked());
        assert_eq!(f.session.status(), VaultStatus::Locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_lock_rejects_mutation_without_side_effects() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("Wifi", "pw123", "").unwrap();
        let blob = std::fs::read(&f.session.paths().vault_file).unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(matches!(
            f.session.add_note("Other", "x", ""),
            Err(VaultError::AutoLocked)
        ));
        assert_eq!(std::fs::read(&f.session.paths().vault_file).unwrap(), blob);
    }

    #[test]
    fn test_validation_does_not_write() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("Wifi", "pw123", "").unwrap();
        let blob = std::fs::read(&f.session.paths().vault_file).unwrap();

        let result = f.session.add_login(NewLogin {
            title: "",
            username: "u",
            password: "p",
            ..Default::default()
        });
        assert!(matches!(result, Err(VaultError::Validation(_))));
        assert_eq!(f.session.item_count().unwrap(), 1);
        assert_eq!(std::fs::read(&f.session.paths().vault_file).unwrap(), blob);
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("A", "1", "").unwrap();
        f.session.add_note("B", "2", "").unwrap();

        // A directory on the temp path makes every save fail.
        let mut temp = f.session.paths().vault_file.clone().into_os_string();
        temp.push(".tmp");
        std::fs::create_dir(&temp).unwrap();

        assert!(matches!(
            f.session.add_note("C", "3", ""),
            Err(VaultError::Io(_))
        ));
        assert_eq!(f.session.item_count().unwrap(), 2);

        assert!(f.session.delete(0).is_err());
        assert_eq!(f.session.get(0).unwrap().title(), "A");

        let edit = ItemEdit {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        assert!(f.session.edit(1, &edit).is_err());
        assert_eq!(f.session.get(1).unwrap().title(), "B");

        std::fs::remove_dir(&temp).unwrap();
        f.session.lock();
        f.session.unlock("master").unwrap();
        let titles: Vec<String> = f
            .session
            .list(None)
            .unwrap()
            .iter()
            .map(|(_, item)| item.title().to_string())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_delete_and_edit_persist() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("A", "1", "").unwrap();
        f.session.add_note("B", "2", "").unwrap();
        f.session.add_note("C", "3", "").unwrap();

        let removed = f.session.delete(1).unwrap();
        assert_eq!(removed.title(), "B");
        assert!(f.events.contains("Vault: deleted 'B'."));

        let edit = ItemEdit {
            value: Some("33".into()),
            ..Default::default()
        };
        let updated = f.session.edit(1, &edit).unwrap();
        assert_eq!(updated.field(ItemField::Value), Some("33"));
        assert!(updated.updated_at().is_some());
        assert!(f.events.contains("Vault: edited 'C'."));

        assert!(matches!(
            f.session.delete(5),
            Err(VaultError::Index { index: 5, len: 2 })
        ));

        f.session.lock();
        f.session.unlock("master").unwrap();
        assert_eq!(f.session.item_count().unwrap(), 2);
        assert_eq!(
            f.session.get(1).unwrap().field(ItemField::Value),
            Some("33")
        );
    }

    #[test]
    fn test_search_and_tag_filter() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("Wifi", "pw123", "home").unwrap();
        f.session.add_login(bank()).unwrap();

        let hits = f.session.search("BANK").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 1);

        let home = f.session.list(Some("Home")).unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].1.title(), "Wifi");
    }

    #[test]
    fn test_view_masks_and_logs_reveal() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_login(bank()).unwrap();

        let masked = f.session.view(0, false).unwrap();
        assert_eq!(masked.secret, "s3*****");
        assert!(!f.events.contains("Vault: password revealed on screen."));

        let revealed = f.session.view(0, true).unwrap();
        assert_eq!(revealed.secret, "s3cret!");
        assert!(f.events.contains("Vault: password revealed on screen."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_secret_auto_clears() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_login(bank()).unwrap();

        f.session.copy_field(0, ItemField::Password).unwrap();
        assert_eq!(f.clipboard.get().unwrap(), "s3cret!");
        assert!(f.events.contains("Vault: password copied (auto-clear 5s)."));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(f.clipboard.get().unwrap(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_plain_field_has_no_timer() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_login(bank()).unwrap();

        f.session.copy_field(0, ItemField::Username).unwrap();
        assert!(!f.session.clipboard().has_pending());
        assert_eq!(f.clipboard.get().unwrap(), "alice");

        // Login without a note; notes have no username.
        assert!(matches!(
            f.session.copy_field(0, ItemField::Note),
            Err(VaultError::Validation(_))
        ));
        f.session.add_note("Wifi", "pw123", "").unwrap();
        assert!(matches!(
            f.session.copy_field(1, ItemField::Username),
            Err(VaultError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_cancels_pending_clear() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_login(bank()).unwrap();
        f.session.copy_field(0, ItemField::Password).unwrap();
        assert!(f.session.clipboard().has_pending());

        f.session.lock();
        assert!(!f.session.clipboard().has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_again_cancels_pending_clear() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_login(bank()).unwrap();
        f.session.copy_field(0, ItemField::Password).unwrap();
        assert!(f.session.clipboard().has_pending());

        assert!(f.session.unlock("wrong").is_err());
        assert_eq!(f.session.status(), VaultStatus::Locked);
        assert!(!f.session.clipboard().has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_without_clipboard_reports_unavailable() {
        let mut f = fixture_with(Arc::new(MemoryClipboard::unavailable()));
        f.session.unlock("master").unwrap();
        f.session.add_login(bank()).unwrap();

        assert!(matches!(
            f.session.copy_field(0, ItemField::Password),
            Err(VaultError::ClipboardUnavailable(_))
        ));
        // Reveal on screen still works.
        assert_eq!(f.session.view(0, true).unwrap().secret, "s3cret!");
    }

    #[test]
    fn test_destroy() {
        let mut f = fixture();
        f.session.unlock("master").unwrap();
        f.session.add_note("Wifi", "pw123", "").unwrap();

        f.session.destroy().unwrap();
        assert_eq!(f.session.status(), VaultStatus::Locked);
        assert!(!f.session.paths().vault_file.exists());
        assert!(!f.session.paths().salt_file.exists());

        // A new password works on the fresh vault.
        f.session.unlock("another").unwrap();
        assert_eq!(f.session.item_count().unwrap(), 0);
    }
}
