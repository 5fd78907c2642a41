use thiserror::Error;

use crate::soap::Fault;

#[derive(Error, Debug)]
pub enum WsmanError {
    /// Nothing usable came back: refused connection, DNS failure, timeout, TLS failure.
    /// Only `retryable` failures are re-sent by the transport.
    #[error("HTTP connection error: {message}")]
    Connection { message: String, retryable: bool },
    #[error("WSMAN endpoint returned HTTP code '{status}' Reason '{reason}'")]
    Http { status: u16, reason: String },
    #[error("WSMAN endpoint rejected the credentials: HTTP code '{status}' Reason '{reason}'")]
    Auth { status: u16, reason: String },
    /// A request template is missing an anchor element. Programming defect, never retried.
    #[error("Failed to build SOAP envelope: {0}")]
    EnvelopeBuild(String),
    #[error("WSMAN call failed: {0}")]
    Fault(Fault),
    #[error("{0}")]
    ElementNotFound(String),
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),
}

impl WsmanError {
    pub fn connection(message: impl Into<String>, retryable: bool) -> Self {
        WsmanError::Connection {
            message: message.into(),
            retryable,
        }
    }

    pub fn element_not_found(message: impl Into<String>) -> Self {
        WsmanError::ElementNotFound(message.into())
    }

    pub fn envelope_build(message: impl Into<String>) -> Self {
        WsmanError::EnvelopeBuild(message.into())
    }

    /// True only for pure connection-level failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WsmanError::Connection { retryable: true, .. })
    }

    pub fn fault(&self) -> Option<&Fault> {
        match self {
            WsmanError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}
