//! URL to local path resolution
//!
//! Turns a request URL into a path under the document root. `..` segments
//! only ever remove segments pushed earlier, so nothing a client sends can
//! climb above the root. The validator never touches the filesystem.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::handler::exchange::Exchange;
use crate::handler::guard::PathGuard;

/// Maximum number of retained path segments below the document root.
pub const MAX_URL_DEPTH: usize = 8;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no document root configured")]
    NoRoot,
    #[error("URL has more than {MAX_URL_DEPTH} path segments")]
    TooDeep,
    #[error("URL contains a reserved name")]
    ReservedName,
    #[error("URL resolves to an empty path")]
    EmptyPath,
}

/// Retained path segments, bounded by [`MAX_URL_DEPTH`].
#[derive(Debug, Default)]
struct PathSegments<'a> {
    parts: Vec<&'a str>,
}

impl<'a> PathSegments<'a> {
    fn push(&mut self, segment: &'a str) -> Result<(), ValidationError> {
        if self.parts.len() >= MAX_URL_DEPTH {
            return Err(ValidationError::TooDeep);
        }
        self.parts.push(segment);
        Ok(())
    }

    /// Drops the last segment; a no-op at the root.
    fn pop(&mut self) {
        self.parts.pop();
    }

    fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &&'a str> {
        self.parts.iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathValidator {
    guard: Option<Arc<dyn PathGuard>>,
}

impl PathValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_guard(guard: Arc<dyn PathGuard>) -> Self {
        Self { guard: Some(guard) }
    }

    /// Resolves `raw_url` against `root`.
    ///
    /// The result is `root` itself or `root/seg/...`, where every segment
    /// came from the URL and none of them is `.` or `..`.
    pub fn validate(&self, root: &str, raw_url: &str) -> Result<String, ValidationError> {
        if root.is_empty() {
            return Err(ValidationError::NoRoot);
        }

        let decoded = percent_decode_str(raw_url)
            .decode_utf8_lossy()
            .replace('\\', "/");

        let mut segments = PathSegments::default();
        for token in decoded.split('/') {
            match token {
                "" | "." => {}
                ".." => segments.pop(),
                _ => segments.push(token)?,
            }
        }

        if let Some(guard) = &self.guard {
            if segments.iter().any(|s| guard.is_reserved(s)) {
                return Err(ValidationError::ReservedName);
            }
        }

        if segments.is_empty() && !(decoded.is_empty() || decoded == "/") {
            return Err(ValidationError::EmptyPath);
        }

        let mut local = String::with_capacity(root.len() + decoded.len() + 1);
        local.push_str(root);
        for segment in segments.iter() {
            local.push('/');
            local.push_str(segment);
        }
        Ok(local)
    }

    /// Validates the exchange's URL against its document root and stores the
    /// resulting local path on it.
    pub fn validate_exchange(&self, exchange: &mut Exchange) -> Result<(), ValidationError> {
        exchange.local_path = self.validate(&exchange.dir, &exchange.url)?;
        Ok(())
    }
}
