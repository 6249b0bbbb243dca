//! Per-path debouncing with latest-write-wins semantics.
//!
//! Each observed path arms its own timer; further events for the same path
//! cancel and re-arm it, so the handler fires once per burst, with the most
//! recently observed change kind. No queue-based batching.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::FileChangeKind;

/// Coalesces bursts of filesystem events per path.
pub struct PathDebouncer {
    window: Duration,
    timers: Arc<Mutex<HashMap<PathBuf, JoinHandle<()>>>>,
    tx: mpsc::UnboundedSender<(PathBuf, FileChangeKind)>,
}

impl PathDebouncer {
    /// Create a debouncer with the given quiet window.
    ///
    /// Returns the debouncer and the receiver its settled events arrive on.
    #[must_use]
    pub fn new(
        window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<(PathBuf, FileChangeKind)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                window,
                timers: Arc::new(Mutex::new(HashMap::new())),
                tx,
            },
            rx,
        )
    }

    /// Observe an event for a path, arming or re-arming its timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn observe(&self, path: PathBuf, kind: FileChangeKind) {
        let Ok(mut timers) = self.timers.lock() else {
            return;
        };

        if let Some(previous) = timers.remove(&path) {
            previous.abort();
        }

        let tx = self.tx.clone();
        let timers_ref = Arc::clone(&self.timers);
        let window = self.window;
        let key = path.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Ok(mut timers) = timers_ref.lock() {
                timers.remove(&key);
            }
            let _ = tx.send((key, kind));
        });

        timers.insert(path, handle);
    }

    /// Number of paths with an armed timer.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.lock().map(|t| t.len()).unwrap_or(0)
    }
}
