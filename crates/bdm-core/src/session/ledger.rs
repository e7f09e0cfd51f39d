//! Ordered record of destination files created during this session.
//!
//! If the process exits before the files are cleared, they stay in the
//! download directory and must be removed manually.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::fsutil;
use crate::notify::Notifier;

/// Append-only ledger of files created this run, drained by a bulk clear.
#[derive(Default)]
pub struct SessionFileLedger {
    files: Mutex<VecDeque<PathBuf>>,
}

impl SessionFileLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly created destination file, in creation order.
    pub fn record(&self, path: PathBuf) {
        self.files.lock().unwrap().push_back(path);
    }

    /// The recorded files, oldest first.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }

    /// Delete every recorded file from storage. An entry leaves the ledger
    /// only once its file is gone (or was already absent); a failed deletion
    /// is logged and the entry kept, and the remaining entries are still
    /// attempted.
    pub async fn drain_and_delete(&self, notifier: &Notifier) {
        let pending = self.snapshot();
        for path in pending {
            match fsutil::delete_file(&path).await {
                Ok(()) => {
                    let mut files = self.files.lock().unwrap();
                    if let Some(pos) = files.iter().position(|p| *p == path) {
                        files.remove(pos);
                    }
                }
                Err(err) => {
                    notifier.error(format!(
                        "Error while deleting {}: {}",
                        path.display(),
                        err
                    ));
                }
            }
        }
    }
}
