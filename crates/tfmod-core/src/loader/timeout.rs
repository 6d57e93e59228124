//! Per-module timeout at the loader boundary.

use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use super::{LoadError, ModuleContent, ModuleLoader};

/// Runs the inner loader on a helper thread and gives up after `timeout`.
///
/// On timeout the helper thread is left to finish on its own; its result is
/// discarded. The batch it belongs to can complete regardless.
pub struct TimeoutLoader {
    inner: Arc<dyn ModuleLoader>,
    timeout: Duration,
}

impl TimeoutLoader {
    pub fn new(inner: Arc<dyn ModuleLoader>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl std::fmt::Debug for TimeoutLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutLoader")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ModuleLoader for TimeoutLoader {
    fn load(&self, target_dir: &Path, link: &str, version: &str) -> Result<ModuleContent, LoadError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let target_dir = target_dir.to_path_buf();
        let link = link.to_string();
        let version = version.to_string();
        std::thread::spawn(move || {
            let _ = tx.send(inner.load(&target_dir, &link, &version));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(res) => res,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(LoadError::Timeout(self.timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(LoadError::Panicked(
                "loader thread exited without a result".to_string(),
            )),
        }
    }
}
