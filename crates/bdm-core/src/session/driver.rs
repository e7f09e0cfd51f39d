//! Drives one transfer from start-or-attach to its terminal outcome.
//!
//! `supervise` runs a synchronous prelude (log, admit, apply priority) and
//! returns the supervision future, so admission is visible to pause/resume
//! and cancel-all before the engine call is even issued. The future resolves
//! to an [`Outcome`] for everything the session understands; faults outside
//! the recognized transfer-error classes come back as `Err` for the caller
//! to re-raise.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::engine::{classify, ErrorClass, Priority, ProgressFn, TransferError, TransferHandle};
use crate::notify::Notifier;

use super::progress;
use super::registry::{ActiveRegistry, DuplicateIdentity};

/// Whether the driver starts a new transfer or re-attaches to one the
/// engine already tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperviseMode {
    Start,
    Attach,
}

/// Terminal classification recorded when supervision ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The transfer finished; carries the final HTTP status code.
    Completed(u16),
    /// The epoch's cancel signal fired. Expected, not an error.
    Canceled,
    /// The engine reported a recognized transfer-layer failure.
    Failed(ErrorClass),
}

/// Removes the registry entry when supervision ends, on every exit path
/// (return, cancellation, propagated fault, unwind).
struct RegistryGuard {
    registry: Arc<ActiveRegistry>,
    id: crate::engine::TransferId,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

/// Admit `handle` and build the future that supervises it.
///
/// Admission (and the priority write, in Start mode) happens before this
/// function returns; the returned future performs the long-lived engine
/// call. `priority` is ignored in Attach mode: an existing transfer keeps
/// whatever priority it already had.
pub(crate) fn supervise(
    registry: Arc<ActiveRegistry>,
    notifier: Notifier,
    handle: Arc<dyn TransferHandle>,
    mode: SuperviseMode,
    priority: Option<Priority>,
    cancel: CancellationToken,
) -> Result<impl Future<Output = anyhow::Result<Outcome>> + Send, DuplicateIdentity> {
    let id = handle.id();

    notifier.status(format!("Running: {}", id));
    registry.admit(id, Arc::clone(&handle))?;

    if mode == SuperviseMode::Start {
        if let Some(priority) = priority {
            handle.set_priority(priority);
        }
    }

    Ok(async move {
        let _guard = RegistryGuard { registry, id };

        let on_progress: ProgressFn = {
            let notifier = notifier.clone();
            Arc::new(move |h: &dyn TransferHandle| progress::report(&notifier, h))
        };

        let result = match mode {
            SuperviseMode::Start => handle.start(cancel, on_progress).await,
            SuperviseMode::Attach => handle.attach(cancel, on_progress).await,
        };

        match result {
            Ok(status_code) => {
                notifier.status(format!("Completed: {}, Status Code: {}", id, status_code));
                Ok(Outcome::Completed(status_code))
            }
            Err(TransferError::Canceled) => {
                notifier.status(format!("Canceled: {}", id));
                Ok(Outcome::Canceled)
            }
            Err(err) => match classify(&err) {
                Some(class) => {
                    notifier.error(format!("Error: {} - Execution error: {}", id, class));
                    Ok(Outcome::Failed(class))
                }
                // Not a transfer-layer failure; nothing here can handle it.
                // The guard still releases the registry entry first.
                None => Err(anyhow::Error::from(err).context(format!("transfer {}", id))),
            },
        }
    })
}
