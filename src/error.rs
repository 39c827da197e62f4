//! Error types for adw.
//!
//! Uses thiserror for derive macros. Agent invocation failures are not
//! errors: they surface as an [`InvocationOutcome`](crate::agent::InvocationOutcome)
//! value so callers decide what a failed attempt means. The variants here
//! cover configuration, plumbing and contract problems only.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for adw operations.
#[derive(Error, Debug)]
pub enum AdwError {
    /// User provided invalid arguments or the environment is unusable.
    #[error("{0}")]
    UserError(String),

    /// Configuration or taxonomy file could not be read or failed validation.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The agent outcome was a failure (used by the CLI to pick an exit code).
    #[error("Agent failed: {0}")]
    AgentError(String),

    /// An event was assembled without one of its structurally required fields.
    #[error("Event contract violated: {0}")]
    EventContract(String),

    /// A delivery handler could not deliver an event.
    #[error("Delivery failed: {0}")]
    DeliveryError(String),

    /// Git or GitHub CLI operation failed.
    #[error("Git operation failed: {0}")]
    GitError(String),
}

impl AdwError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AdwError::UserError(_) => exit_codes::USER_ERROR,
            AdwError::ConfigError(_) => exit_codes::USER_ERROR,
            AdwError::AgentError(_) => exit_codes::AGENT_FAILURE,
            AdwError::EventContract(_) => exit_codes::EVENT_CONTRACT,
            AdwError::DeliveryError(_) => exit_codes::GIT_FAILURE,
            AdwError::GitError(_) => exit_codes::GIT_FAILURE,
        }
    }
}

/// Result type alias for adw operations.
pub type Result<T> = std::result::Result<T, AdwError>;
