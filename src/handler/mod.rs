//! Request handling.
//!
//! Requests run through a short handler chain. The optional home-page
//! handler goes first; the default handler runs last and handles everything
//! that reaches it.
//!
//! - **`validate`**: resolves a URL to a path under the document root
//! - **`guard`**: optional reserved device-name check used by the validator
//! - **`default`**: the fallback handler deciding how each request is answered
//! - **`stream`**: writes file bodies on writable-socket events
//! - **`exchange`**: per-request state shared by the pieces above
//! - **`script`**: boundary to a dynamic-page evaluator
//! - **`home`**: redirect for the bare `/` URL
//!
//! # Default handler decisions
//!
//! ```text
//!   validate URL ──err──► 500 Invalid URL
//!        │
//!   directory? ──yes──► 302 → <url>/<default page>
//!        │
//!   open ──err──► 404          stat ──err──► 400
//!        │
//!   write head (200 or 304)
//!        ├─ HEAD ──────► done (200)
//!        ├─ 304 ───────► done (304)
//!        ├─ dynamic ───► evaluate, done (200)
//!        └─ static ────► StreamWriter, one call per writable event
//! ```

pub mod default;
pub mod exchange;
pub mod guard;
pub mod home;
pub mod script;
pub mod stream;
pub mod validate;

use std::sync::Arc;

use crate::config::Config;
use crate::handler::default::{DefaultHandler, Reply};
use crate::handler::exchange::Exchange;
use crate::handler::guard::ReservedNameGuard;
use crate::handler::script::ScriptEvaluator;
use crate::handler::validate::PathValidator;
use crate::http::request::Request;

pub use default::Stats;
pub use stream::{NonBlockingWrite, Progress, StreamWriter};
pub use validate::{MAX_URL_DEPTH, ValidationError};

/// The handler chain shared by every connection.
pub struct Handlers {
    default: DefaultHandler,
    home_page_redirect: bool,
}

impl Handlers {
    pub fn new(default: DefaultHandler) -> Self {
        Self {
            default,
            home_page_redirect: false,
        }
    }

    /// Builds the chain described by `cfg`, without a script evaluator.
    pub fn from_config(cfg: &Config) -> Self {
        Self::from_config_with_evaluator(cfg, None)
    }

    pub fn from_config_with_evaluator(
        cfg: &Config,
        evaluator: Option<Arc<dyn ScriptEvaluator>>,
    ) -> Self {
        let validator = if cfg.handler.reject_reserved_names {
            PathValidator::with_guard(Arc::new(ReservedNameGuard::default()))
        } else {
            PathValidator::new()
        };
        let mut default = DefaultHandler::new(cfg.defaults.clone(), validator)
            .with_read_buffer_size(cfg.handler.read_buffer_size)
            .with_dynamic_extensions(cfg.handler.dynamic_extensions.iter().cloned());
        if let Some(evaluator) = evaluator {
            default = default.with_evaluator(evaluator);
        }

        Self::new(default).with_home_page_redirect(cfg.handler.home_page_redirect)
    }

    pub fn with_home_page_redirect(mut self, enabled: bool) -> Self {
        self.home_page_redirect = enabled;
        self
    }

    pub fn default_handler(&self) -> &DefaultHandler {
        &self.default
    }

    pub fn exchange_for(&self, req: &Request) -> Exchange {
        self.default.exchange_for(req)
    }

    pub fn dispatch(&self, exchange: &mut Exchange) -> Reply {
        if self.home_page_redirect {
            if let Some(reply) =
                home::home_page_redirect(exchange, self.default.defaults().default_page())
            {
                return reply;
            }
        }
        self.default.handle(exchange)
    }
}
