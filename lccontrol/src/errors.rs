use lcwsman::WsmanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LcError {
    #[error(transparent)]
    Wsman(#[from] WsmanError),
    /// Server or controller waiting for a human. Polling must not resume.
    #[error("Lifecycle controller halted: {0}")]
    Halted(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Raised once every job of a batch has been polled.
    #[error("LC jobs {job_ids:?} failed")]
    JobFailure { job_ids: Vec<String> },
    #[error("Command returned {return_value}: {message_id}: {message}")]
    Command {
        return_value: String,
        message_id: String,
        message: String,
    },
    #[error("{0}")]
    Value(String),
    #[error("{0}")]
    Attribute(String),
    #[error("{0}")]
    Argument(String),
    #[error("LifeCycle controller version '{0}' is not supported")]
    UnsupportedVersion(String),
    #[error("Class {0} is not defined for this LifeCycle controller")]
    UnknownClass(String),
    #[error("Class {0} has no method {1}")]
    UnknownMethod(String, String),
    #[error("Bad data from LifeCycle controller: {0}")]
    Data(String),
    /// Requested settings the firmware cannot apply.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Storage controller refused to drop its pending state.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LcError {
    pub fn job_failure(job_ids: Vec<String>) -> Self {
        LcError::JobFailure { job_ids }
    }

    pub fn attribute_not_returned(name: &str) -> Self {
        LcError::Attribute(format!(
            "Attribute '{}' was not returned by the LifeCycle Controller",
            name
        ))
    }

    pub fn unknown_method(class: &str, method: &str) -> Self {
        LcError::UnknownMethod(class.to_string(), method.to_string())
    }

    /// `MessageID` of a rejected command.
    pub fn command_message_id(&self) -> Option<&str> {
        match self {
            LcError::Command { message_id, .. } => Some(message_id),
            _ => None,
        }
    }
}
