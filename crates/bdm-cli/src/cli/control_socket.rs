//! Control socket: server (during `bdm get`) and client (for `bdm pause`
//! and friends). Protocol: one line per command: "pause <id>",
//! "resume <id>", "pause-all", "resume-all" or "cancel-all".

use anyhow::Result;
use bdm_core::engine::TransferId;
use bdm_core::session::DownloadSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;

/// Default path for the control socket (same XDG state dir as the log).
pub fn default_socket_path() -> std::io::Result<PathBuf> {
    let dir = xdg::BaseDirectories::with_prefix("bdm")?.get_state_home();
    Ok(dir.join("control.sock"))
}

/// Spawns a task that listens on `path` and forwards each command line to
/// the session. Ignores malformed lines.
pub fn spawn_control_listener(
    session: Arc<DownloadSession>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    let handle = tokio::spawn(async move {
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket bind: {}", e);
                return;
            }
        };
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let session = Arc::clone(&session);
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            dispatch_line(&session, line.trim());
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

fn dispatch_line(session: &DownloadSession, line: &str) {
    if let Some(rest) = line.strip_prefix("pause ") {
        if let Ok(id) = TransferId::parse(rest.trim()) {
            session.pause(id);
        }
    } else if let Some(rest) = line.strip_prefix("resume ") {
        if let Ok(id) = TransferId::parse(rest.trim()) {
            session.resume(id);
        }
    } else if line == "pause-all" {
        session.pause_all();
    } else if line == "resume-all" {
        session.resume_all();
    } else if line == "cancel-all" {
        session.cancel_all_active();
    }
}

/// Sends one command line to the control socket. No-op if no session is
/// listening.
pub async fn send_command(socket_path: &Path, line: &str) -> Result<()> {
    if !socket_path.exists() {
        return Ok(());
    }
    let mut stream = tokio::net::UnixStream::connect(socket_path).await?;
    let msg = format!("{}\n", line);
    tokio::io::AsyncWriteExt::write_all(&mut stream, msg.as_bytes()).await?;
    Ok(())
}
