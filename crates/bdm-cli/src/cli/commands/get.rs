//! `bdm get <url>...` – download URLs as tracked transfers, rendering
//! session notices until every transfer reaches a terminal state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bdm_core::config::BdmConfig;
use bdm_core::engine::http::HttpTransferEngine;
use bdm_core::notify::{Notifier, Severity};
use bdm_core::session::DownloadSession;
use url::Url;

use crate::cli::control_socket;
use crate::cli::PriorityArg;

pub struct GetOptions {
    pub urls: Vec<String>,
    pub name: Option<String>,
    pub priority: PriorityArg,
    pub unconstrained: bool,
    pub dir: Option<PathBuf>,
    pub verbose: bool,
    pub clear: bool,
}

pub async fn run_get(cfg: &BdmConfig, opts: GetOptions) -> Result<()> {
    if opts.name.is_some() && opts.urls.len() > 1 {
        anyhow::bail!("--name applies to a single URL");
    }

    let download_dir = opts
        .dir
        .clone()
        .or_else(|| cfg.download_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let (notifier, mut notices) = Notifier::with_subscriber(opts.verbose || cfg.verbose_logging);
    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            match notice.severity {
                Severity::Log => println!("LOG: {}", notice.message),
                Severity::Status => println!("STATUS: {}", notice.message),
                Severity::Error => eprintln!("ERROR: {}", notice.message),
            }
        }
    });

    let engine = Arc::new(HttpTransferEngine::new());
    let session = Arc::new(DownloadSession::new(engine, download_dir, notifier));

    // Re-attach to whatever the engine already tracks. Nothing for a fresh
    // in-process engine, but the step belongs to session startup.
    session.discover_active_downloads().await?;

    let control = match control_socket::default_socket_path() {
        Ok(path) => Some(control_socket::spawn_control_listener(
            Arc::clone(&session),
            path,
        )?),
        Err(err) => {
            tracing::warn!("control socket unavailable: {}", err);
            None
        }
    };

    let unconstrained = opts.unconstrained || cfg.request_unconstrained;
    for address in &opts.urls {
        let file_name = match &opts.name {
            Some(name) => name.clone(),
            None => file_name_from_url(address),
        };
        session
            .start_download(&file_name, address, opts.priority.into(), unconstrained)
            .await;
    }

    // Wait for every driver to finish; Ctrl-C cancels the whole epoch.
    while !session.active_downloads().is_empty() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.cancel_all_active();
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }
    }

    if opts.clear {
        session.clear_session_files().await;
    }

    if let Some(control) = control {
        control.abort();
    }
    drop(session);

    // Give the printer a moment to drain what the drivers already sent.
    let _ = tokio::time::timeout(Duration::from_millis(500), printer).await;
    Ok(())
}

/// Last non-empty path segment of the URL, or "download.bin" when the path
/// has none. Invalid addresses also fall back; the session rejects them
/// with its own error message.
fn file_name_from_url(address: &str) -> String {
    Url::parse(address)
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .filter(|segment| !segment.is_empty())
                .last()
                .map(str::to_string)
        })
        .unwrap_or_else(|| "download.bin".to_string())
}
