//! Boundary to the dynamic-page evaluator.

use std::io;

use thiserror::Error;

use crate::handler::exchange::Exchange;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("script error: {0}")]
    Script(String),
    #[error("no script evaluator installed")]
    Unavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Produces the body of a dynamic page.
///
/// Implementations write the page, and any error text they want the client
/// to see, into `out`. The request is finished with status 200 whatever the
/// result; the error only reaches the log.
pub trait ScriptEvaluator: Send + Sync {
    fn evaluate(
        &self,
        local_path: &str,
        exchange: &mut Exchange,
        out: &mut Vec<u8>,
    ) -> Result<(), EvalError>;
}
