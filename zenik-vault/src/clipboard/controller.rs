use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::backend::{ClipboardBackend, ClipboardError, ClipboardResult};

/// Copies text to the clipboard, optionally clearing it again after a delay.
///
/// At most one auto-clear timer is pending at a time. A successful copy cancels
/// the previous timer, and the timer only clears the clipboard if it still
/// holds exactly the text that was copied.
pub struct ClipboardController {
    backend: Arc<dyn ClipboardBackend>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ClipboardController {
    pub fn new(backend: Arc<dyn ClipboardBackend>) -> Self {
        Self {
            backend,
            pending: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &Arc<dyn ClipboardBackend> {
        &self.backend
    }

    /// Place `text` on the clipboard with no auto-clear.
    ///
    /// A pending clear is only cancelled once the copy succeeded.
    pub fn copy(&self, text: &str) -> ClipboardResult<()> {
        self.backend.set(text)?;
        self.cancel_pending();
        Ok(())
    }

    /// Place `text` on the clipboard and clear it after `seconds` unless the
    /// user has copied something else by then. `0` disables the clear.
    ///
    /// The timer runs on the current tokio runtime; calling this outside one
    /// fails before the clipboard is touched.
    pub fn copy_with_autoclear(&self, text: &str, seconds: u64) -> ClipboardResult<()> {
        if seconds == 0 {
            return self.copy(text);
        }

        let runtime = Handle::try_current().map_err(|_| {
            ClipboardError::Backend("clipboard auto-clear needs a running tokio runtime".into())
        })?;

        self.backend.set(text)?;
        self.cancel_pending();

        let backend = Arc::clone(&self.backend);
        let expected = Zeroizing::new(text.to_string());
        let delay = Duration::from_secs(seconds);

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            clear_if_unchanged(backend.as_ref(), &expected);
        });

        *self.pending.lock() = Some(handle);
        debug!("Clipboard auto-clear scheduled in {}s", seconds);
        Ok(())
    }

    /// Cancel the pending auto-clear, if any. Returns whether one was running.
    pub fn cancel_pending(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                debug!("Cancelled pending clipboard auto-clear");
                true
            }
            _ => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for ClipboardController {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

fn clear_if_unchanged(backend: &dyn ClipboardBackend, expected: &str) {
    match backend.get() {
        Ok(mut current) => {
            if current == expected {
                match backend.set("") {
                    Ok(()) => debug!("Clipboard cleared"),
                    Err(e) => warn!("Failed to clear clipboard: {}", e),
                }
            } else {
                debug!("Clipboard changed since copy, leaving it alone");
            }
            zeroize::Zeroize::zeroize(&mut current);
        }
        Err(e) => warn!("Could not read clipboard for auto-clear: {}", e),
    }
}
