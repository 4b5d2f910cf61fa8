use std::time::Duration;
use thiserror::Error;

use crate::cdp::CDPError;
use selector::SelectorError;

/// Failures of the browser-session capability itself
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Cdp(#[from] CDPError),

    #[error("Element handle {0} is no longer attached")]
    StaleElement(String),

    #[error("Unexpected session response: {0}")]
    InvalidResponse(String),

    #[error("Script failed: {0}")]
    Script(String),
}

#[derive(Error, Debug)]
pub enum WebAutomationError {
    #[error("No element matched {descriptor} within {timeout:?}")]
    ElementTimeout { descriptor: String, timeout: Duration },

    #[error("{count} elements matched {descriptor}, expected exactly one")]
    AmbiguousMatch { descriptor: String, count: usize },

    #[error("Index {index} out of range for {descriptor} ({count} matches)")]
    IndexOutOfRange {
        descriptor: String,
        index: usize,
        count: usize,
    },

    #[error("Session has no scripting capability, needed to resolve {0}")]
    ScriptingUnavailable(String),

    #[error("No candidate passed the filter for {0}")]
    ElementNotFound(String),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<CDPError> for WebAutomationError {
    fn from(error: CDPError) -> Self {
        WebAutomationError::Session(SessionError::Cdp(error))
    }
}

pub type Result<T> = std::result::Result<T, WebAutomationError>;
