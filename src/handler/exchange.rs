//! Per-request state shared by the default handler and the stream writer.

use std::time::{Duration, Instant, SystemTime};

use crate::http::request::{Method, Request};

/// Per-request flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFlags {
    /// Content is produced by the script evaluator rather than streamed.
    pub dynamic: bool,
    /// HEAD request: headers only.
    pub head: bool,
    /// Connection stays open after this response.
    pub keep_alive: bool,
    /// The client sent a usable `If-Modified-Since`.
    pub if_modified: bool,
}

/// Mutable context for one request, owned by its connection.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Public URL path as sent by the client, without the query string.
    pub url: String,
    pub query: String,
    /// Document root this request resolves against.
    pub dir: String,
    /// Local filesystem path, filled in by URL validation.
    pub local_path: String,
    pub flags: RequestFlags,
    /// Conditional-GET timestamp.
    pub since: Option<SystemTime>,
    /// Expected body size in bytes.
    pub bytes: u64,
    /// Body bytes accepted by the socket so far.
    pub written: u64,
    pub last_activity: Instant,
}

impl Exchange {
    pub fn new(url: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: String::new(),
            dir: dir.into(),
            local_path: String::new(),
            flags: RequestFlags::default(),
            since: None,
            bytes: 0,
            written: 0,
            last_activity: Instant::now(),
        }
    }

    /// Builds the exchange for a parsed request. The dynamic flag is left
    /// unset; only the handler knows whether an evaluator is installed.
    pub fn from_request(req: &Request, dir: &str) -> Self {
        let (path, query) = req.path_and_query();
        let mut exchange = Self::new(path, dir);
        exchange.query = query.to_string();
        exchange.flags.head = req.method == Method::HEAD;
        exchange.flags.keep_alive = req.keep_alive();
        exchange.set_since(req.if_modified_since());
        exchange
    }

    /// Sets the conditional timestamp and the matching flag together.
    pub fn set_since(&mut self, since: Option<SystemTime>) {
        self.flags.if_modified = since.is_some();
        self.since = since;
    }

    /// Records activity for the idle-timeout check.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn remaining(&self) -> u64 {
        self.bytes.saturating_sub(self.written)
    }
}
