//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub mod fake_engine;
pub mod range_server;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bdm_core::notify::Notice;
use tokio::sync::mpsc::UnboundedReceiver;

/// Polls `predicate` every few milliseconds until it holds. Panics with
/// `what` if it does not within ten seconds.
pub async fn wait_until(what: &str, predicate: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !predicate() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Accumulates notices from the subscriber channel. Reads drain whatever
/// has already been sent, so anything emitted before the call is visible.
pub struct Notices {
    rx: Mutex<UnboundedReceiver<Notice>>,
    seen: Mutex<Vec<Notice>>,
}

impl Notices {
    pub fn new(rx: UnboundedReceiver<Notice>) -> Arc<Self> {
        Arc::new(Self {
            rx: Mutex::new(rx),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn drain(&self) {
        let mut rx = self.rx.lock().unwrap();
        let mut seen = self.seen.lock().unwrap();
        while let Ok(notice) = rx.try_recv() {
            seen.push(notice);
        }
    }

    /// Every message observed so far, in arrival order.
    pub fn messages(&self) -> Vec<String> {
        self.drain();
        self.seen.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }

    /// Whether any message so far contains `needle`.
    pub fn saw(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }

    /// How many messages so far start with `prefix`.
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        self.messages().iter().filter(|m| m.starts_with(prefix)).count()
    }
}
