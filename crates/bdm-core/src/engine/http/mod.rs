//! In-process transfer engine backed by libcurl.
//!
//! Stands in for a system background-transfer service: each transfer
//! streams a GET into its destination file on a blocking thread, supports
//! pause (stop the stream, keep the offset) and resume (Range request from
//! the offset), and reports progress through the handle callback. Transfer
//! state lives in process memory only; nothing survives a restart.

mod perform;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{
    Priority, Progress, ProgressFn, ResponseInfo, TransferEngine, TransferError, TransferHandle,
    TransferId, TransferStatus,
};

/// Engine state shared by every clone of one transfer's handle.
struct Shared {
    id: TransferId,
    source: Url,
    destination: PathBuf,
    priority: Mutex<Priority>,
    unconstrained: AtomicBool,
    paused: AtomicBool,
    resumed: Notify,
    progress: Mutex<Progress>,
    response: Mutex<Option<ResponseInfo>>,
}

impl Shared {
    fn snapshot(&self) -> Progress {
        *self.progress.lock().unwrap()
    }

    fn set_status(&self, status: TransferStatus) {
        self.progress.lock().unwrap().status = status;
    }
}

/// One transfer tracked by [`HttpTransferEngine`]. Cheap to clone; clones
/// share state.
#[derive(Clone)]
pub struct HttpTransfer {
    shared: Arc<Shared>,
}

impl HttpTransfer {
    fn new(source: Url, destination: PathBuf) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: TransferId::generate(),
                source,
                destination,
                priority: Mutex::new(Priority::Default),
                unconstrained: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                resumed: Notify::new(),
                progress: Mutex::new(Progress::idle()),
                response: Mutex::new(None),
            }),
        }
    }

    /// Whether the engine was asked to exempt this transfer from
    /// power-saving throttling.
    pub fn is_unconstrained(&self) -> bool {
        self.shared.unconstrained.load(Ordering::Relaxed)
    }

    /// Forward one progress event, then clear the per-event flags so the
    /// next event reports only what changed since this one.
    pub(super) fn emit(&self, on_progress: &ProgressFn) {
        on_progress(self);
        let mut progress = self.shared.progress.lock().unwrap();
        progress.restarted = false;
        progress.response_changed = false;
    }

    /// Drive the transfer until terminal, pausing and resuming as the
    /// flags dictate. Shared by start and attach: the only difference
    /// between them is how much progress already exists.
    async fn run(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError> {
        let shared = &self.shared;
        loop {
            if cancel.is_cancelled() {
                shared.set_status(TransferStatus::Canceled);
                self.emit(&on_progress);
                return Err(TransferError::Canceled);
            }

            if shared.paused.load(Ordering::Relaxed) {
                shared.set_status(TransferStatus::PausedByApplication);
                self.emit(&on_progress);
                tokio::select! {
                    _ = cancel.cancelled() => continue,
                    _ = shared.resumed.notified() => continue,
                }
            }

            // Attaching to a transfer that already has all its bytes.
            {
                let progress = shared.snapshot();
                if let Some(total) = progress.total_bytes {
                    if total > 0 && progress.bytes_received >= total {
                        shared.set_status(TransferStatus::Completed);
                        self.emit(&on_progress);
                        let code =
                            (*shared.response.lock().unwrap()).map_or(200, |r| r.status_code);
                        return Ok(code);
                    }
                }
            }

            shared.set_status(TransferStatus::Running);
            self.emit(&on_progress);

            let fetched = {
                let this = self.clone();
                let cancel = cancel.clone();
                let on_progress = on_progress.clone();
                tokio::task::spawn_blocking(move || perform::fetch(&this, &cancel, &on_progress))
                    .await
                    .map_err(|e| TransferError::Other(format!("transfer task join: {}", e)))?
            };

            match fetched {
                Ok(perform::FetchEnd::Completed(code)) => {
                    shared.set_status(TransferStatus::Completed);
                    self.emit(&on_progress);
                    return Ok(code);
                }
                // Paused or canceled mid-stream; the loop top decides which.
                Ok(perform::FetchEnd::Interrupted) => continue,
                Err(err) => {
                    shared.set_status(TransferStatus::Error);
                    self.emit(&on_progress);
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl TransferHandle for HttpTransfer {
    fn id(&self) -> TransferId {
        self.shared.id
    }

    fn source(&self) -> &Url {
        &self.shared.source
    }

    fn destination(&self) -> &Path {
        &self.shared.destination
    }

    fn progress(&self) -> Progress {
        self.shared.snapshot()
    }

    fn response_info(&self) -> Option<ResponseInfo> {
        *self.shared.response.lock().unwrap()
    }

    fn priority(&self) -> Priority {
        *self.shared.priority.lock().unwrap()
    }

    fn set_priority(&self, priority: Priority) {
        *self.shared.priority.lock().unwrap() = priority;
    }

    fn pause(&self) {
        self.shared.paused.store(true, Ordering::Relaxed);
    }

    fn resume(&self) {
        self.shared.paused.store(false, Ordering::Relaxed);
        self.shared.resumed.notify_one();
    }

    async fn start(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError> {
        self.run(cancel, on_progress).await
    }

    async fn attach(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError> {
        self.run(cancel, on_progress).await
    }
}

/// In-process curl engine.
#[derive(Default)]
pub struct HttpTransferEngine {
    transfers: Mutex<Vec<HttpTransfer>>,
}

impl HttpTransferEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferEngine for HttpTransferEngine {
    fn create_transfer(
        &self,
        source: &Url,
        destination: &Path,
    ) -> Result<Arc<dyn TransferHandle>, TransferError> {
        let transfer = HttpTransfer::new(source.clone(), destination.to_path_buf());
        let mut transfers = self.transfers.lock().unwrap();
        transfers.retain(|t| !t.progress().status.is_terminal());
        transfers.push(transfer.clone());
        Ok(Arc::new(transfer))
    }

    async fn list_existing_transfers(
        &self,
    ) -> Result<Vec<Arc<dyn TransferHandle>>, TransferError> {
        let mut transfers = self.transfers.lock().unwrap();
        transfers.retain(|t| !t.progress().status.is_terminal());
        Ok(transfers
            .iter()
            .map(|t| Arc::new(t.clone()) as Arc<dyn TransferHandle>)
            .collect())
    }

    async fn request_unconstrained(
        &self,
        handles: &[Arc<dyn TransferHandle>],
    ) -> Result<bool, TransferError> {
        // This engine applies no power-saving throttling, so the request
        // is always granted; the flag is recorded per transfer.
        let transfers = self.transfers.lock().unwrap();
        for handle in handles {
            if let Some(t) = transfers.iter().find(|t| t.id() == handle.id()) {
                t.shared.unconstrained.store(true, Ordering::Relaxed);
            }
        }
        Ok(true)
    }
}
