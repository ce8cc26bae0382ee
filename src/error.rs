//! Operation-level error taxonomy.
//!
//! [`OpError`] is what every aggregation operation returns on failure.
//! The HTTP layer maps `InvalidInput` to a 400 carrying its reason;
//! every other variant becomes a generic 500 while the detail goes to
//! the logs only.

use thiserror::Error;

use crate::completion::CompletionError;
use crate::reddit::FetchError;

#[derive(Debug, Error)]
pub enum OpError {
    /// The request failed validation. The message is client-safe and
    /// raised before any outbound call.
    #[error("{0}")]
    InvalidInput(String),
    /// A fetch the operation cannot degrade failed.
    #[error("discussion fetch failed: {0}")]
    Fetch(#[from] FetchError),
    /// The completion call failed.
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] CompletionError),
    /// Completion output was not a JSON object after fence stripping.
    #[error("completion output unparseable: {0}")]
    Parse(String),
}

impl OpError {
    /// True when the failure was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, OpError::InvalidInput(_))
    }
}
