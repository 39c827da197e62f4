//! Agent invocation engine.
//!
//! This module runs the external coding agent as a subprocess and turns its
//! streamed output into a single [`InvocationOutcome`]:
//!
//! - **Command**: argument list and prompt transport (`-p` or stdin)
//! - **Dispatch**: subprocess execution with timeout and output capture
//! - **Stream / Extract**: decoding of the output stream and outcome derivation
//! - **Retry**: re-invocation of transient failures with increasing delays
//! - **Template**: slash-command expansion from `.claude/commands/`
//!
//! The engine is fully blocking. Failures are reported as outcome values
//! carrying a [`RetryCode`], never as errors.

pub mod artifacts;
pub mod command;
pub mod dispatch;
pub mod extract;
mod invoke;
pub mod retry;
pub mod stream;
pub mod template;
pub mod truncate;
mod types;

pub use command::{AgentCommand, PromptTransport, build_command};
pub use extract::{parse_output, parse_output_file};
pub use invoke::{AgentRunner, check_agent_installed};
pub use retry::{RetryPolicy, run_with_retry};
pub use stream::{ResultMessage, StreamMessage};
pub use template::TemplateRequest;
pub use truncate::{truncate, truncate_output};
pub use types::{
    DEFAULT_AGENT_NAME, InvocationOutcome, InvocationRequest, InvocationRequestBuilder, Model,
    RetryCode,
};
