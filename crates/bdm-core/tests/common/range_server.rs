//! Minimal HTTP/1.1 server with optional Range support for engine tests.
//!
//! Serves a single static body. GET with `Range: bytes=X-` gets a 206 from
//! that offset (when enabled); the body can be trickled in delayed chunks
//! so tests have time to pause or cancel mid-transfer.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// Sleep between body chunks (4 KiB each) to slow the transfer down.
    pub chunk_delay: Option<Duration>,
    /// Respond to every request with this error status instead of the body.
    pub error_status: Option<u16>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            chunk_delay: None,
            error_status: None,
        }
    }
}

/// Starts a server in a background thread serving `body`. Returns the base
/// URL (e.g. "http://127.0.0.1:12345/"). The server runs until the process
/// exits.
pub fn start(body: Vec<u8>) -> String {
    start_with_options(body, ServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            thread::spawn(move || handle(stream, &body, opts));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: std::net::TcpStream, body: &[u8], opts: ServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let range_start = parse_range_start(request);

    if let Some(code) = opts.error_status {
        let message = b"not here";
        let response = format!(
            "HTTP/1.1 {} Error\r\nContent-Length: {}\r\n\r\n",
            code,
            message.len()
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(message);
        return;
    }

    let total = body.len() as u64;
    let (status, start) = match range_start {
        Some(start) if opts.support_ranges && start < total => ("206 Partial Content", start),
        _ => ("200 OK", 0),
    };
    let slice = &body[start as usize..];

    let mut response = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\n", status, slice.len());
    if status.starts_with("206") {
        response.push_str(&format!(
            "Content-Range: bytes {}-{}/{}\r\n",
            start,
            total.saturating_sub(1),
            total
        ));
    }
    response.push_str("Accept-Ranges: bytes\r\n\r\n");
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }

    for chunk in slice.chunks(4096) {
        if stream.write_all(chunk).is_err() {
            return;
        }
        let _ = stream.flush();
        if let Some(delay) = opts.chunk_delay {
            thread::sleep(delay);
        }
    }
}

/// Start offset from a `Range: bytes=X-` header, if present.
fn parse_range_start(request: &str) -> Option<u64> {
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim().to_lowercase();
                let bytes = value.strip_prefix("bytes=")?;
                let (start, _) = bytes.split_once('-')?;
                return start.trim().parse().ok();
            }
        }
    }
    None
}
