//! Request and outcome types for agent invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default agent role when none is given.
pub const DEFAULT_AGENT_NAME: &str = "ops";

/// Failure classification driving the retry controller.
///
/// `None` means either success or a failure that retrying will not fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryCode {
    /// The agent CLI exited non-zero.
    ClaudeCodeError,
    /// The attempt exceeded its overall timeout.
    TimeoutError,
    /// The process could not be spawned or its output could not be handled locally.
    ExecutionError,
    /// The agent reported an internal failure (`subtype: error_during_execution`).
    ErrorDuringExecution,
    /// Not retryable.
    #[default]
    None,
}

impl RetryCode {
    /// True for the classifications the retry controller re-attempts.
    pub fn is_retryable(self) -> bool {
        !matches!(self, RetryCode::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RetryCode::ClaudeCodeError => "claude_code_error",
            RetryCode::TimeoutError => "timeout_error",
            RetryCode::ExecutionError => "execution_error",
            RetryCode::ErrorDuringExecution => "error_during_execution",
            RetryCode::None => "none",
        }
    }
}

impl fmt::Display for RetryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit model selection. Leaving it unset keeps whatever model the
/// authenticated CLI session defaults to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    Sonnet,
    Opus,
}

impl Model {
    pub fn as_str(self) -> &'static str {
        match self {
            Model::Sonnet => "sonnet",
            Model::Opus => "opus",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prompt to run through the agent. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    prompt: String,
    adw_id: String,
    agent_name: String,
    model: Option<Model>,
    skip_permissions: bool,
    output_file: PathBuf,
    working_dir: Option<PathBuf>,
}

impl InvocationRequest {
    /// Start building a request for `prompt` within run `adw_id`, streaming
    /// agent output to `output_file`.
    pub fn builder(
        prompt: impl Into<String>,
        adw_id: impl Into<String>,
        output_file: impl Into<PathBuf>,
    ) -> InvocationRequestBuilder {
        InvocationRequestBuilder {
            request: InvocationRequest {
                prompt: prompt.into(),
                adw_id: adw_id.into(),
                agent_name: DEFAULT_AGENT_NAME.to_string(),
                model: None,
                skip_permissions: false,
                output_file: output_file.into(),
                working_dir: None,
            },
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn adw_id(&self) -> &str {
        &self.adw_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn model(&self) -> Option<Model> {
        self.model
    }

    pub fn skip_permissions(&self) -> bool {
        self.skip_permissions
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

/// Builder for [`InvocationRequest`].
#[derive(Debug, Clone)]
pub struct InvocationRequestBuilder {
    request: InvocationRequest,
}

impl InvocationRequestBuilder {
    pub fn agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.request.agent_name = agent_name.into();
        self
    }

    pub fn model(mut self, model: Option<Model>) -> Self {
        self.request.model = model;
        self
    }

    pub fn skip_permissions(mut self, skip: bool) -> Self {
        self.request.skip_permissions = skip;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.request.working_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> InvocationRequest {
        self.request
    }
}

/// Normalized result of one invocation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    /// Result text on success, human-readable reason on failure.
    pub output: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub retry_code: RetryCode,
}

impl InvocationOutcome {
    pub fn success(output: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            session_id,
            retry_code: RetryCode::None,
        }
    }

    pub fn failure(output: impl Into<String>, retry_code: RetryCode) -> Self {
        Self {
            output: output.into(),
            success: false,
            session_id: None,
            retry_code,
        }
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }
}
