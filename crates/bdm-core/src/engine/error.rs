//! Transfer-layer error type and classification.
//!
//! `classify` decides which failures the session may handle on its own:
//! a recognized [`ErrorClass`] is logged and absorbed at the driver
//! boundary, while `None` marks a fault the session cannot reason about
//! and must re-raise.

use std::fmt;

use thiserror::Error;

/// Error surfaced by the transfer engine for one operation.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The supplied cancellation token fired mid-operation.
    #[error("transfer canceled")]
    Canceled,
    /// libcurl reported a transport failure (timeout, connection, ...).
    #[error(transparent)]
    Curl(#[from] curl::Error),
    /// The response completed with a non-success HTTP status.
    #[error("HTTP {0}")]
    Http(u16),
    /// The transfer ended with fewer bytes than the server announced.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Destination file I/O failed mid-transfer.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    /// The engine does not implement the requested operation.
    #[error("not supported by this engine: {0}")]
    Unsupported(String),
    /// Anything the engine cannot attribute to the transfer layer.
    #[error("{0}")]
    Other(String),
}

/// Recognized transfer-layer failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The operation timed out.
    Timeout,
    /// Could not reach or keep a connection to the server.
    Connection,
    /// The server asked us to back off (429/503).
    Throttled,
    /// The server answered with an error status.
    HttpStatus(u16),
    /// The destination could not be written.
    Disk,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Timeout => f.write_str("Timeout"),
            ErrorClass::Connection => f.write_str("Connection"),
            ErrorClass::Throttled => f.write_str("Throttled"),
            ErrorClass::HttpStatus(code) => write!(f, "HTTP {}", code),
            ErrorClass::Disk => f.write_str("Disk"),
        }
    }
}

/// Classify an HTTP status code.
fn classify_http_status(code: u16) -> Option<ErrorClass> {
    match code {
        429 | 503 => Some(ErrorClass::Throttled),
        400..=599 => Some(ErrorClass::HttpStatus(code)),
        _ => None,
    }
}

/// Classify a curl error. Only transport-level failures are recognized;
/// everything else (bad option, unsupported protocol, ...) is `None`.
fn classify_curl_error(e: &curl::Error) -> Option<ErrorClass> {
    if e.is_operation_timedout() {
        return Some(ErrorClass::Timeout);
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_ssl_connect_error()
        || e.is_partial_file()
    {
        return Some(ErrorClass::Connection);
    }
    None
}

/// Classify a transfer error into a recognized class, or `None` when the
/// session has no safe way to handle it.
pub fn classify(e: &TransferError) -> Option<ErrorClass> {
    match e {
        TransferError::Curl(ce) => classify_curl_error(ce),
        TransferError::Http(code) => classify_http_status(*code),
        TransferError::PartialTransfer { .. } => Some(ErrorClass::Connection),
        TransferError::Storage(_) => Some(ErrorClass::Disk),
        TransferError::Canceled | TransferError::Unsupported(_) | TransferError::Other(_) => None,
    }
}
