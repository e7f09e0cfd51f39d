//! Download session orchestration.
//!
//! A [`DownloadSession`] owns the registry of in-flight transfers, the
//! session-wide cancellation scope, and the ledger of files created this
//! run. Transfers are driven by per-transfer supervision tasks; outcomes
//! are observed through the notification channel and the registry state,
//! not through return values.

mod driver;
mod ledger;
mod progress;
mod registry;
mod scope;

pub use driver::{Outcome, SuperviseMode};
pub use ledger::SessionFileLedger;
pub use registry::{ActiveRegistry, DuplicateIdentity};
pub use scope::CancelScope;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use url::Url;

use crate::engine::{classify, Priority, TransferEngine, TransferHandle, TransferId, TransferStatus};
use crate::fsutil;
use crate::notify::Notifier;

/// Orchestrates every download of the current process lifetime.
pub struct DownloadSession {
    engine: Arc<dyn TransferEngine>,
    registry: Arc<ActiveRegistry>,
    scope: CancelScope,
    ledger: SessionFileLedger,
    notifier: Notifier,
    download_dir: PathBuf,
}

impl DownloadSession {
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        download_dir: PathBuf,
        notifier: Notifier,
    ) -> Self {
        Self {
            engine,
            registry: Arc::new(ActiveRegistry::new()),
            scope: CancelScope::new(),
            ledger: SessionFileLedger::new(),
            notifier,
            download_dir,
        }
    }

    /// Validate inputs, create the destination file, and hand the new
    /// transfer to a supervision task. Fire-and-forget: validation failures
    /// and transfer outcomes alike surface only through the notification
    /// channel.
    pub async fn start_download(
        &self,
        file_name: &str,
        server_address: &str,
        priority: Priority,
        unconstrained: bool,
    ) {
        // The address comes from an untrusted source; only well-formed
        // absolute URLs reach the engine.
        let source = match Url::parse(server_address) {
            Ok(url) => url,
            Err(_) => {
                self.notifier.error("Invalid URI.");
                return;
            }
        };

        if file_name.trim().is_empty() {
            self.notifier.error("A local file name is required.");
            return;
        }

        let destination = match fsutil::create_unique_file(&self.download_dir, file_name).await {
            Ok(path) => path,
            Err(err) => {
                self.notifier
                    .error(format!("Error while creating file: {}", err));
                return;
            }
        };
        self.ledger.record(destination.clone());

        let handle = match self.engine.create_transfer(&source, &destination) {
            Ok(handle) => handle,
            Err(err) => {
                self.notifier
                    .error(format!("Error while creating transfer: {}", err));
                return;
            }
        };

        self.notifier.log(format!(
            "Downloading {} to {} with {} priority, {}",
            source,
            crate::engine::display_file_name(&destination),
            priority,
            handle.id()
        ));

        if unconstrained {
            // Best-effort: a denial or an engine without the notion is
            // logged and the download proceeds constrained.
            match self
                .engine
                .request_unconstrained(std::slice::from_ref(&handle))
                .await
            {
                Ok(granted) => self.notifier.log(format!(
                    "Request for unconstrained downloads has been {}",
                    if granted { "granted" } else { "denied" }
                )),
                Err(err) => self
                    .notifier
                    .error(format!("Unconstrained downloads are not available: {}", err)),
            }
        }

        self.spawn_driver(handle, SuperviseMode::Start, Some(priority));
    }

    /// Admit and attach to every transfer the engine already tracks (for
    /// example ones still running from a previous process lifetime).
    ///
    /// Returns once every discovered transfer is admitted and its attach
    /// dispatched; transfer completion is not awaited. Recognized engine
    /// query failures abort discovery with a log line; anything else is
    /// re-raised.
    pub async fn discover_active_downloads(&self) -> Result<()> {
        let downloads = match self.engine.list_existing_transfers().await {
            Ok(downloads) => downloads,
            Err(err) => match classify(&err) {
                Some(class) => {
                    self.notifier
                        .error(format!("Error: Discovery error: {}", class));
                    return Ok(());
                }
                None => return Err(anyhow::Error::from(err).context("transfer discovery")),
            },
        };

        self.notifier
            .log(format!("Loading background downloads: {}", downloads.len()));

        for handle in downloads {
            self.notifier.log(format!(
                "Discovered background download: {}, Status: {}",
                handle.id(),
                handle.progress().status
            ));
            // Dispatch immediately rather than awaiting each in turn, so a
            // slow transfer does not delay attaching to the others.
            self.spawn_driver(handle, SuperviseMode::Attach, None);
        }

        Ok(())
    }

    /// Pause one registered transfer. Unknown identities are ignored.
    pub fn pause(&self, id: TransferId) {
        if let Some(handle) = self.registry.lookup(id) {
            handle.pause();
        }
    }

    /// Resume one registered transfer. Unknown identities are ignored.
    pub fn resume(&self, id: TransferId) {
        if let Some(handle) = self.registry.lookup(id) {
            handle.resume();
        }
    }

    /// Pause every running transfer; handles in any other state are skipped
    /// with a log line instead of failing the batch.
    pub fn pause_all(&self) {
        for handle in self.registry.snapshot() {
            let status = handle.progress().status;
            if status == TransferStatus::Running {
                handle.pause();
                self.notifier.log(format!("Paused: {}", handle.id()));
            } else {
                self.notifier.log(format!(
                    "Skipped pausing: {}, Status: {}",
                    handle.id(),
                    status
                ));
            }
        }
    }

    /// Resume every transfer this application paused; others are skipped
    /// with a log line.
    pub fn resume_all(&self) {
        for handle in self.registry.snapshot() {
            let status = handle.progress().status;
            if status == TransferStatus::PausedByApplication {
                handle.resume();
                self.notifier.log(format!("Resumed: {}", handle.id()));
            } else {
                self.notifier.log(format!(
                    "Skipped resuming: {}, Status: {}",
                    handle.id(),
                    status
                ));
            }
        }
    }

    /// Cancel every transfer admitted since the last cancel-all and open a
    /// fresh epoch for future admissions. Does not wait for the running
    /// drivers: each observes the triggered token and finishes as canceled
    /// on its own, removing itself against the already-reset registry.
    pub fn cancel_all_active(&self) {
        self.scope.cancel_all();
        self.registry.reset();
    }

    /// Delete every file recorded in the session ledger.
    pub async fn clear_session_files(&self) {
        self.ledger.drain_and_delete(&self.notifier).await;
    }

    /// Snapshot of the transfers currently under supervision.
    pub fn active_downloads(&self) -> Vec<Arc<dyn TransferHandle>> {
        self.registry.snapshot()
    }

    /// Snapshot of the files created this session, in creation order.
    pub fn session_files(&self) -> Vec<PathBuf> {
        self.ledger.snapshot()
    }

    /// Admit `handle` under the current epoch's cancel signal and spawn its
    /// supervision task.
    fn spawn_driver(
        &self,
        handle: Arc<dyn TransferHandle>,
        mode: SuperviseMode,
        priority: Option<Priority>,
    ) {
        let cancel = self.scope.signal();
        let supervision = match driver::supervise(
            Arc::clone(&self.registry),
            self.notifier.clone(),
            handle,
            mode,
            priority,
            cancel,
        ) {
            Ok(future) => future,
            Err(err) => {
                self.notifier
                    .error(format!("Error: Admission error: {}", err));
                return;
            }
        };

        tokio::spawn(async move {
            if let Err(fault) = supervision.await {
                // No recognized transfer-error class: swallowing this would
                // hide a fault the session cannot reason about. The registry
                // guard has already run.
                panic!("unhandled transfer fault: {:#}", fault);
            }
        });
    }
}
