//! Scripted in-memory transfer engine for orchestration tests.
//!
//! Transfers hang until the test injects a terminal outcome (or the
//! supervision token is cancelled), so tests control exactly when each
//! lifecycle transition happens.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use bdm_core::engine::{
    Priority, Progress, ProgressFn, ResponseInfo, TransferEngine, TransferError, TransferHandle,
    TransferId, TransferStatus,
};

/// Terminal outcome a test scripts into a fake transfer.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Complete(u16),
    FailHttp(u16),
    FailConnection,
    FailUnrecognized(String),
}

pub struct FakeTransfer {
    id: TransferId,
    source: Url,
    destination: PathBuf,
    priority: Mutex<Priority>,
    status: Mutex<TransferStatus>,
    outcome: watch::Sender<Option<FakeOutcome>>,
    // Keeps the channel open so a `finish()` scripted before the driver
    // subscribes still updates the retained value instead of being dropped
    // as a send to zero receivers.
    _outcome_keepalive: watch::Receiver<Option<FakeOutcome>>,
    starts: AtomicUsize,
    attaches: AtomicUsize,
}

impl FakeTransfer {
    pub fn new() -> Arc<Self> {
        Self::with(
            Url::parse("https://example.com/file.bin").unwrap(),
            PathBuf::from("file.bin"),
        )
    }

    pub fn with(source: Url, destination: PathBuf) -> Arc<Self> {
        let (outcome, outcome_keepalive) = watch::channel(None);
        Arc::new(Self {
            id: TransferId::generate(),
            source,
            destination,
            priority: Mutex::new(Priority::Default),
            status: Mutex::new(TransferStatus::Idle),
            outcome,
            _outcome_keepalive: outcome_keepalive,
            starts: AtomicUsize::new(0),
            attaches: AtomicUsize::new(0),
        })
    }

    /// Script the terminal outcome; a running driver observes it at once.
    pub fn finish(&self, outcome: FakeOutcome) {
        let _ = self.outcome.send(Some(outcome));
    }

    pub fn set_status(&self, status: TransferStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn attach_count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    async fn drive(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError> {
        self.set_status(TransferStatus::Running);
        on_progress(self);

        let mut rx = self.outcome.subscribe();
        loop {
            let scripted = rx.borrow_and_update().clone();
            if let Some(outcome) = scripted {
                return match outcome {
                    FakeOutcome::Complete(code) => {
                        self.set_status(TransferStatus::Completed);
                        on_progress(self);
                        Ok(code)
                    }
                    FakeOutcome::FailHttp(code) => {
                        self.set_status(TransferStatus::Error);
                        Err(TransferError::Http(code))
                    }
                    FakeOutcome::FailConnection => {
                        self.set_status(TransferStatus::Error);
                        Err(TransferError::PartialTransfer {
                            expected: 1,
                            received: 0,
                        })
                    }
                    FakeOutcome::FailUnrecognized(message) => {
                        self.set_status(TransferStatus::Error);
                        Err(TransferError::Other(message))
                    }
                };
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.set_status(TransferStatus::Canceled);
                    return Err(TransferError::Canceled);
                }
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Err(TransferError::Other("outcome script dropped".into()));
                    }
                }
            }
        }
    }
}

#[async_trait]
impl TransferHandle for FakeTransfer {
    fn id(&self) -> TransferId {
        self.id
    }

    fn source(&self) -> &Url {
        &self.source
    }

    fn destination(&self) -> &Path {
        &self.destination
    }

    fn progress(&self) -> Progress {
        Progress {
            status: *self.status.lock().unwrap(),
            bytes_received: 0,
            total_bytes: None,
            restarted: false,
            response_changed: false,
        }
    }

    fn response_info(&self) -> Option<ResponseInfo> {
        None
    }

    fn priority(&self) -> Priority {
        *self.priority.lock().unwrap()
    }

    fn set_priority(&self, priority: Priority) {
        *self.priority.lock().unwrap() = priority;
    }

    fn pause(&self) {
        self.set_status(TransferStatus::PausedByApplication);
    }

    fn resume(&self) {
        self.set_status(TransferStatus::Running);
    }

    async fn start(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.drive(cancel, on_progress).await
    }

    async fn attach(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        self.drive(cancel, on_progress).await
    }
}

/// Scripted engine: hands out fake transfers and records what was asked.
pub struct FakeEngine {
    created: Mutex<Vec<Arc<FakeTransfer>>>,
    existing: Mutex<Vec<Arc<FakeTransfer>>>,
    list_failure: Mutex<Option<TransferError>>,
    unconstrained_supported: AtomicBool,
    unconstrained_requests: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            existing: Mutex::new(Vec::new()),
            list_failure: Mutex::new(None),
            unconstrained_supported: AtomicBool::new(true),
            unconstrained_requests: AtomicUsize::new(0),
        })
    }

    pub fn without_unconstrained_support(self: &Arc<Self>) -> Arc<Self> {
        self.unconstrained_supported.store(false, Ordering::SeqCst);
        Arc::clone(self)
    }

    /// Make the engine report `transfer` as already tracked (discovery).
    pub fn add_existing(&self, transfer: Arc<FakeTransfer>) {
        self.existing.lock().unwrap().push(transfer);
    }

    /// Fail the next `list_existing_transfers` call with `err`.
    pub fn fail_next_list(&self, err: TransferError) {
        *self.list_failure.lock().unwrap() = Some(err);
    }

    /// Transfers created through `create_transfer`, in order.
    pub fn created(&self) -> Vec<Arc<FakeTransfer>> {
        self.created.lock().unwrap().clone()
    }

    pub fn unconstrained_requests(&self) -> usize {
        self.unconstrained_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferEngine for FakeEngine {
    fn create_transfer(
        &self,
        source: &Url,
        destination: &Path,
    ) -> Result<Arc<dyn TransferHandle>, TransferError> {
        let transfer = FakeTransfer::with(source.clone(), destination.to_path_buf());
        self.created.lock().unwrap().push(Arc::clone(&transfer));
        Ok(transfer)
    }

    async fn list_existing_transfers(
        &self,
    ) -> Result<Vec<Arc<dyn TransferHandle>>, TransferError> {
        if let Some(err) = self.list_failure.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self
            .existing
            .lock()
            .unwrap()
            .iter()
            .map(|t| Arc::clone(t) as Arc<dyn TransferHandle>)
            .collect())
    }

    async fn request_unconstrained(
        &self,
        _handles: &[Arc<dyn TransferHandle>],
    ) -> Result<bool, TransferError> {
        self.unconstrained_requests.fetch_add(1, Ordering::SeqCst);
        if !self.unconstrained_supported.load(Ordering::SeqCst) {
            return Err(TransferError::Unsupported(
                "unconstrained downloads".into(),
            ));
        }
        Ok(true)
    }
}
