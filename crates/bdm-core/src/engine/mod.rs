//! Boundary to the background transfer engine.
//!
//! The session core drives transfers only through these traits, so the
//! component that actually moves bytes (and decides how transfer state
//! survives restarts) stays swappable: the curl-backed [`http`] engine for
//! real use, scripted doubles in tests.

pub mod error;
pub mod http;

pub use error::{classify, ErrorClass, TransferError};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Engine-assigned identifier for one transfer.
///
/// Stable for the transfer's lifetime, including across process restarts
/// when the engine persists its transfers. Never minted by the session core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Mint a fresh identifier. Reserved for engine implementations.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its canonical string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a transfer currently stands, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Idle,
    Running,
    PausedByApplication,
    PausedNoNetwork,
    Completed,
    Canceled,
    Error,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Idle => "Idle",
            TransferStatus::Running => "Running",
            TransferStatus::PausedByApplication => "PausedByApplication",
            TransferStatus::PausedNoNetwork => "PausedNoNetwork",
            TransferStatus::Completed => "Completed",
            TransferStatus::Canceled => "Canceled",
            TransferStatus::Error => "Error",
        }
    }

    /// A terminal transfer will never make further progress.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Canceled | TransferStatus::Error
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative scheduling priority for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Default,
    High,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Default => f.write_str("Default"),
            Priority::High => f.write_str("High"),
            Priority::Low => f.write_str("Low"),
        }
    }
}

/// Snapshot of a transfer's progress counters and flags.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub status: TransferStatus,
    /// Bytes received so far.
    pub bytes_received: u64,
    /// Total bytes expected, when the server announced a length.
    pub total_bytes: Option<u64>,
    /// The engine discarded previous progress and started over.
    pub restarted: bool,
    /// New response metadata arrived since the last event.
    pub response_changed: bool,
}

impl Progress {
    pub fn idle() -> Self {
        Self {
            status: TransferStatus::Idle,
            bytes_received: 0,
            total_bytes: None,
            restarted: false,
            response_changed: false,
        }
    }
}

/// Response metadata captured once headers have arrived.
#[derive(Debug, Clone, Copy)]
pub struct ResponseInfo {
    pub status_code: u16,
    pub header_count: usize,
}

/// Callback invoked for every progress event the engine emits.
///
/// The engine calls this from whatever context drives the transfer, so
/// implementations must be cheap and must not block.
pub type ProgressFn = Arc<dyn Fn(&dyn TransferHandle) + Send + Sync>;

/// One transfer tracked by the engine.
///
/// The session core holds a shared reference; it may pause, resume, or
/// reprioritize the transfer, and drives it to completion through
/// [`start`](TransferHandle::start) or [`attach`](TransferHandle::attach).
/// Everything else about the transfer belongs to the engine.
#[async_trait]
pub trait TransferHandle: Send + Sync {
    fn id(&self) -> TransferId;
    fn source(&self) -> &Url;
    fn destination(&self) -> &Path;

    /// Current progress snapshot.
    fn progress(&self) -> Progress;

    /// Response metadata, once available.
    fn response_info(&self) -> Option<ResponseInfo>;

    fn priority(&self) -> Priority;
    fn set_priority(&self, priority: Priority);

    /// Stop transferring without giving up accumulated progress.
    fn pause(&self);

    /// Continue a paused transfer.
    fn resume(&self);

    /// Begin the transfer and drive it until it reaches a terminal state or
    /// `cancel` fires. Every progress event is forwarded to `on_progress`.
    /// Returns the final HTTP status code.
    async fn start(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError>;

    /// Like [`start`](TransferHandle::start), but for a transfer the engine
    /// already tracks (for example one created before this process started).
    /// Picks up from whatever progress the transfer already made.
    async fn attach(
        &self,
        cancel: CancellationToken,
        on_progress: ProgressFn,
    ) -> Result<u16, TransferError>;
}

/// The background transfer engine itself.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Create a new transfer from `source` to the file at `destination`.
    /// The destination file must already exist; the engine writes into it.
    fn create_transfer(
        &self,
        source: &Url,
        destination: &Path,
    ) -> Result<Arc<dyn TransferHandle>, TransferError>;

    /// Every non-terminal transfer the engine currently tracks, including
    /// ones created before this process started.
    async fn list_existing_transfers(&self)
        -> Result<Vec<Arc<dyn TransferHandle>>, TransferError>;

    /// Ask the engine to exempt `handles` from power-saving throttling.
    /// Returns whether the request was granted; engines without the notion
    /// fail with [`TransferError::Unsupported`].
    async fn request_unconstrained(
        &self,
        handles: &[Arc<dyn TransferHandle>],
    ) -> Result<bool, TransferError>;
}

/// File-name form of a destination path for log lines.
pub(crate) fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
