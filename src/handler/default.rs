//! The default (fallback) URL handler
//!
//! Runs last in the handler chain and always handles the request. For each
//! request it either finishes immediately (error, redirect, HEAD, 304,
//! dynamic page) or hands back a [`StreamWriter`] for the connection to drive
//! on writable events.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::ServerDefaults;
use crate::handler::exchange::Exchange;
use crate::handler::script::{EvalError, ScriptEvaluator};
use crate::handler::stream::StreamWriter;
use crate::handler::validate::PathValidator;
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Scratch buffer size used when none is configured.
pub const DEFAULT_READ_BUFFER: usize = 8192;

/// Handler counters.
#[derive(Debug, Default)]
pub struct Stats {
    local_hits: AtomicU64,
}

impl Stats {
    /// Documents successfully opened from the local filesystem.
    pub fn local_hits(&self) -> u64 {
        self.local_hits.load(Ordering::Relaxed)
    }

    fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of a document's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    /// Modification time, truncated to whole seconds to match HTTP dates.
    pub mtime: SystemTime,
    pub size: u64,
    pub is_dir: bool,
}

impl FileMetadata {
    pub fn from_fs(meta: &fs::Metadata) -> std::io::Result<Self> {
        Ok(Self {
            mtime: whole_seconds(meta.modified()?),
            size: meta.len(),
            is_dir: meta.is_dir(),
        })
    }
}

fn whole_seconds(t: SystemTime) -> SystemTime {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => UNIX_EPOCH,
    }
}

/// What the connection does next with a handled request.
#[derive(Debug)]
pub enum Reply {
    /// Send `response` and finish the request with `status`.
    ///
    /// `status` is the completion code, which for HEAD is always 200 even
    /// when the status line says 304.
    Done {
        response: Response,
        status: StatusCode,
    },
    /// Send the head in `response`, then drive `writer` until it finishes.
    Stream {
        response: Response,
        writer: StreamWriter<File>,
    },
}

impl Reply {
    fn done(response: Response, status: StatusCode) -> Self {
        Reply::Done { response, status }
    }

    fn error(status: StatusCode, message: &str) -> Self {
        Reply::Done {
            response: Response::error(status, message),
            status,
        }
    }

    pub fn response(&self) -> &Response {
        match self {
            Reply::Done { response, .. } | Reply::Stream { response, .. } => response,
        }
    }

    /// The code the request finishes with, once known. Streams finish when
    /// their writer does.
    pub fn completion_status(&self) -> Option<StatusCode> {
        match self {
            Reply::Done { status, .. } => Some(*status),
            Reply::Stream { .. } => None,
        }
    }
}

pub struct DefaultHandler {
    defaults: ServerDefaults,
    validator: PathValidator,
    evaluator: Option<Arc<dyn ScriptEvaluator>>,
    dynamic_extensions: Vec<String>,
    read_buffer_size: usize,
    stats: Stats,
}

impl DefaultHandler {
    pub fn new(defaults: ServerDefaults, validator: PathValidator) -> Self {
        Self {
            defaults,
            validator,
            evaluator: None,
            dynamic_extensions: vec!["asp".to_string()],
            read_buffer_size: DEFAULT_READ_BUFFER,
            stats: Stats::default(),
        }
    }

    /// Installs the evaluator for dynamic pages.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// File extensions (without the dot) treated as dynamic pages once an
    /// evaluator is installed.
    pub fn with_dynamic_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dynamic_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    pub fn defaults(&self) -> &ServerDefaults {
        &self.defaults
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Builds the exchange for `req`, rooted at the default document directory.
    pub fn exchange_for(&self, req: &Request) -> Exchange {
        let mut exchange = Exchange::from_request(req, self.defaults.default_dir());
        exchange.flags.dynamic = self.is_dynamic(&exchange.url);
        exchange
    }

    fn is_dynamic(&self, url: &str) -> bool {
        if self.evaluator.is_none() {
            return false;
        }
        Path::new(url)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.dynamic_extensions
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(ext))
            })
    }

    /// Handles one request. Always handles it.
    pub fn handle(&self, exchange: &mut Exchange) -> Reply {
        if let Err(e) = self.validator.validate_exchange(exchange) {
            // The URL goes to the log only; echoing it would reflect client
            // input into the page.
            tracing::debug!(url = %exchange.url, error = %e, "Rejected URL");
            return Reply::error(StatusCode::InternalServerError, "Invalid URL");
        }
        if exchange.local_path.ends_with(['/', '\\']) {
            exchange.local_path.pop();
        }

        let file = match File::open(&exchange.local_path) {
            Ok(file) => file,
            // Directories cannot be opened on every platform.
            Err(_) if is_directory(&exchange.local_path) => {
                return self.redirect_to_default_page(exchange);
            }
            Err(e) => {
                tracing::debug!(path = %exchange.local_path, error = %e, "Cannot open document");
                return Reply::error(StatusCode::NotFound, "Cannot open URL");
            }
        };
        let meta = match file.metadata().and_then(|m| FileMetadata::from_fs(&m)) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(path = %exchange.local_path, error = %e, "Cannot stat document");
                return Reply::error(StatusCode::BadRequest, "Cannot stat page for URL");
            }
        };
        if meta.is_dir {
            return self.redirect_to_default_page(exchange);
        }
        self.stats.record_local_hit();

        let status = if is_not_modified(exchange, &meta) {
            StatusCode::NotModified
        } else {
            StatusCode::Ok
        };
        let response = response_head(status, exchange.flags.dynamic, &meta);

        if exchange.flags.head {
            return Reply::done(response, StatusCode::Ok);
        }
        if status == StatusCode::NotModified {
            return Reply::done(response, StatusCode::NotModified);
        }
        if exchange.flags.dynamic {
            return self.evaluate(exchange, response);
        }

        exchange.bytes = meta.size;
        exchange.written = 0;
        Reply::Stream {
            response,
            writer: StreamWriter::new(file, self.read_buffer_size),
        }
    }

    fn redirect_to_default_page(&self, exchange: &Exchange) -> Reply {
        let location = directory_redirect(&exchange.url, self.defaults.default_page());
        tracing::debug!(url = %exchange.url, location = %location, "Directory redirect");
        Reply::done(Response::redirect(&location), StatusCode::Found)
    }

    fn evaluate(&self, exchange: &mut Exchange, mut response: Response) -> Reply {
        let mut out = Vec::new();
        let local_path = exchange.local_path.clone();
        let result = match &self.evaluator {
            Some(evaluator) => evaluator.evaluate(&local_path, exchange, &mut out),
            None => Err(EvalError::Unavailable),
        };
        if let Err(e) = result {
            tracing::warn!(path = %local_path, error = %e, "Script evaluation failed");
            if out.is_empty() {
                out.extend_from_slice(e.to_string().as_bytes());
            }
        }

        // No length was sent, so the body ends when the connection does.
        exchange.flags.keep_alive = false;
        response.body = out;
        Reply::done(response, StatusCode::Ok)
    }
}

fn is_directory(path: &str) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// `/docs/` or `/docs` with page `index.html` gives `/docs/index.html`.
///
/// Leading slashes collapse to one so the Location never reads as a
/// scheme-relative `//host/...` reference.
pub fn directory_redirect(public_path: &str, default_page: &str) -> String {
    let path = public_path.trim_start_matches(['/', '\\']);
    let path = path.strip_suffix(['/', '\\']).unwrap_or(path);
    if path.is_empty() {
        format!("/{default_page}")
    } else {
        format!("/{path}/{default_page}")
    }
}

fn is_not_modified(exchange: &Exchange, meta: &FileMetadata) -> bool {
    exchange.flags.if_modified
        && !exchange.flags.dynamic
        && exchange.since.is_some_and(|since| meta.mtime <= since)
}

fn response_head(status: StatusCode, dynamic: bool, meta: &FileMetadata) -> Response {
    if dynamic {
        ResponseBuilder::new(status)
            .header("Pragma", "no-cache")
            .header("Cache-Control", "no-cache")
            .without_length()
            .build()
    } else {
        ResponseBuilder::new(status)
            .header("Content-Length", meta.size.to_string())
            .header("Last-Modified", httpdate::fmt_http_date(meta.mtime))
            .build()
    }
}
