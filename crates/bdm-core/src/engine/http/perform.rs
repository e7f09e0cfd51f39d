//! One blocking fetch attempt against the source, from the current offset.
//!
//! Runs on a `spawn_blocking` thread. Pause and cancellation abort the
//! stream by returning zero from the write callback; the caller's run loop
//! interprets the interruption.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::str;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::{ProgressFn, ResponseInfo, TransferError};

use super::HttpTransfer;

/// How a fetch attempt ended short of an error.
pub(super) enum FetchEnd {
    /// Terminal success; carries the final HTTP status code.
    Completed(u16),
    /// Stopped by pause or cancellation; the caller's loop decides which.
    Interrupted,
}

/// Per-response parsing state shared by the header and write callbacks.
#[derive(Default)]
struct ResponseState {
    status: u16,
    header_count: usize,
    content_length: Option<u64>,
    io_error: Option<std::io::Error>,
}

pub(super) fn fetch(
    handle: &HttpTransfer,
    cancel: &CancellationToken,
    on_progress: &ProgressFn,
) -> Result<FetchEnd, TransferError> {
    let shared = &handle.shared;
    let base_offset = shared.snapshot().bytes_received;

    let file = RefCell::new(
        std::fs::OpenOptions::new()
            .write(true)
            .open(&shared.destination)?,
    );
    file.borrow_mut().seek(SeekFrom::Start(base_offset))?;

    let mut easy = curl::easy::Easy::new();
    easy.url(shared.source.as_str())?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    if base_offset > 0 {
        easy.range(&format!("{}-", base_offset))?;
    }

    let state = RefCell::new(ResponseState::default());
    let result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            on_header(line, handle, &state, &file, base_offset, on_progress);
            true
        })?;
        transfer.write_function(|data| {
            Ok(on_body(data, handle, cancel, &state, &file, on_progress))
        })?;
        transfer.perform()
    };

    if let Some(io_error) = state.borrow_mut().io_error.take() {
        return Err(TransferError::Storage(io_error));
    }
    if let Err(err) = result {
        if cancel.is_cancelled() || shared.paused.load(Ordering::Relaxed) {
            return Ok(FetchEnd::Interrupted);
        }
        return Err(TransferError::Curl(err));
    }

    let code = easy.response_code()? as u16;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    let progress = shared.snapshot();
    if let Some(total) = progress.total_bytes {
        if progress.bytes_received < total {
            return Err(TransferError::PartialTransfer {
                expected: total,
                received: progress.bytes_received,
            });
        }
    }
    Ok(FetchEnd::Completed(code))
}

/// Header callback: tracks the response status line, counts headers, and
/// publishes response metadata once a final response's headers are in.
fn on_header(
    line: &[u8],
    handle: &HttpTransfer,
    state: &RefCell<ResponseState>,
    file: &RefCell<File>,
    base_offset: u64,
    on_progress: &ProgressFn,
) {
    let Ok(line) = str::from_utf8(line) else {
        return;
    };
    let line = line.trim_end();
    let mut st = state.borrow_mut();

    if line.starts_with("HTTP/") {
        // A new response begins; redirects arrive here too.
        st.status = line
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        st.header_count = 0;
        st.content_length = None;
        return;
    }

    if line.is_empty() {
        // End of one response's headers. Informational and redirect
        // responses are not surfaced; only the final one is.
        if st.status < 200 || (300..400).contains(&st.status) {
            return;
        }

        let restarted = st.status == 200 && base_offset > 0;
        if restarted {
            // The server ignored the range request; start over from zero.
            if let Err(err) = reset_file(file) {
                st.io_error = Some(err);
                return;
            }
        }
        let total = match (st.status, st.content_length) {
            (206, Some(len)) => Some(base_offset + len),
            (_, Some(len)) => Some(len),
            _ => None,
        };

        {
            let mut progress = handle.shared.progress.lock().unwrap();
            if restarted {
                progress.bytes_received = 0;
                progress.restarted = true;
            }
            progress.total_bytes = total;
            progress.response_changed = true;
        }
        *handle.shared.response.lock().unwrap() = Some(ResponseInfo {
            status_code: st.status,
            header_count: st.header_count,
        });

        drop(st);
        handle.emit(on_progress);
        return;
    }

    st.header_count += 1;
    if let Some((name, value)) = line.split_once(':') {
        if name.trim().eq_ignore_ascii_case("content-length") {
            st.content_length = value.trim().parse().ok();
        }
    }
}

/// Write callback: streams body bytes into the destination file and emits
/// one progress event per chunk. Returning zero aborts the transfer.
fn on_body(
    data: &[u8],
    handle: &HttpTransfer,
    cancel: &CancellationToken,
    state: &RefCell<ResponseState>,
    file: &RefCell<File>,
    on_progress: &ProgressFn,
) -> usize {
    if cancel.is_cancelled() || handle.shared.paused.load(Ordering::Relaxed) {
        return 0;
    }

    let mut st = state.borrow_mut();
    if st.io_error.is_some() {
        return 0;
    }
    if st.status >= 400 {
        // Error body; consume it without touching the destination.
        return data.len();
    }

    if let Err(err) = file.borrow_mut().write_all(data) {
        st.io_error = Some(err);
        return 0;
    }
    handle.shared.progress.lock().unwrap().bytes_received += data.len() as u64;

    drop(st);
    handle.emit(on_progress);
    data.len()
}

fn reset_file(file: &RefCell<File>) -> std::io::Result<()> {
    let mut f = file.borrow_mut();
    f.set_len(0)?;
    f.seek(SeekFrom::Start(0))?;
    Ok(())
}
