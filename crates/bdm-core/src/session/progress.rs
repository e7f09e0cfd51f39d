//! Progress event rendering.
//!
//! Stateless: every event the engine emits is rendered from the handle's
//! current snapshot, without throttling or coalescing.

use crate::engine::TransferHandle;
use crate::notify::Notifier;

/// Render one progress event for `handle` into the notification channel.
pub(crate) fn report(notifier: &Notifier, handle: &dyn TransferHandle) {
    let progress = handle.progress();
    notifier.log(format!(
        "Progress: {}, Status: {}",
        handle.id(),
        progress.status
    ));

    let (total, percent) = match progress.total_bytes {
        // Unknown or zero total: nothing meaningful to divide by.
        None | Some(0) => (0, 100),
        Some(total) => (total, progress.bytes_received * 100 / total),
    };
    notifier.log(format!(
        " - Transferred bytes: {} of {}, {}%",
        progress.bytes_received, total, percent
    ));

    if progress.restarted {
        notifier.log(" - Download restarted");
    }

    if progress.response_changed {
        if let Some(response) = handle.response_info() {
            notifier.log(format!(
                " - Response updated; Header count: {}",
                response.header_count
            ));
        }
    }
}
