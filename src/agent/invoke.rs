//! Single-attempt and retrying agent invocation.
//!
//! One attempt runs the full pipeline: install check, prompt audit copy,
//! command build, process run, artifact conversion and outcome derivation.
//! Every failure is mapped into an [`InvocationOutcome`]; nothing here
//! returns an error to the caller.

use super::artifacts;
use super::command::build_command;
use super::dispatch::{ProcessResult, RunSpec, execute_agent};
use super::extract::{failure_message, outcome_from_messages};
use super::retry::{RetryPolicy, run_with_retry};
use super::stream::decode_stream;
use super::types::{InvocationOutcome, InvocationRequest, RetryCode};
use crate::config::Settings;
use crate::context::ProjectContext;
use crate::error::Result;
use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use std::time::Duration;

const STDERR_PREVIEW_CHARS: usize = 500;

/// Check that the agent CLI runs. Returns the error message if it does not.
pub fn check_agent_installed(binary: &str) -> Option<String> {
    let status = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => None,
        _ => Some(format!(
            "Error: Claude Code CLI is not installed. Expected at: {}",
            binary
        )),
    }
}

/// Runs invocation requests against the configured agent binary.
#[derive(Debug, Clone)]
pub struct AgentRunner {
    binary: String,
    timeout: Duration,
    env: BTreeMap<String, String>,
    policy: RetryPolicy,
    context: ProjectContext,
}

impl AgentRunner {
    pub fn new(settings: &Settings, context: ProjectContext) -> Self {
        Self {
            binary: settings.agent.binary.clone(),
            timeout: settings.agent_timeout(),
            env: settings.agent.env.clone(),
            policy: RetryPolicy::from(&settings.retry),
            context,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Check that the configured agent binary runs.
    pub fn check_installed(&self) -> Option<String> {
        check_agent_installed(&self.binary)
    }

    /// Run `request` with retries, sleeping between attempts.
    pub fn prompt_with_retry(&self, request: &InvocationRequest) -> InvocationOutcome {
        self.prompt_with_retry_using(request, std::thread::sleep)
    }

    /// Run `request` with retries, calling `sleep` between attempts.
    pub fn prompt_with_retry_using<S>(
        &self,
        request: &InvocationRequest,
        sleep: S,
    ) -> InvocationOutcome
    where
        S: FnMut(Duration),
    {
        run_with_retry(&self.policy, sleep, || self.prompt(request))
    }

    /// Run one attempt of `request`.
    pub fn prompt(&self, request: &InvocationRequest) -> InvocationOutcome {
        if let Some(message) = self.check_installed() {
            tracing::error!(binary = %self.binary, "agent CLI not installed");
            return InvocationOutcome::failure(message, RetryCode::None);
        }

        let prompts_dir = self
            .context
            .prompts_dir(request.adw_id(), request.agent_name());
        if let Err(e) = artifacts::save_prompt(request.prompt(), &prompts_dir) {
            tracing::warn!(error = %e, "failed to save prompt copy");
        }

        match self.run_attempt(request) {
            Ok(outcome) => outcome,
            Err(e) => InvocationOutcome::failure(
                format!("Error executing Claude Code: {}", e),
                RetryCode::ExecutionError,
            ),
        }
    }

    fn run_attempt(&self, request: &InvocationRequest) -> Result<InvocationOutcome> {
        let command = build_command(request, &self.binary)?;

        tracing::info!(
            command = %command.display(),
            prompt_chars = request.prompt().chars().count(),
            transport = command.transport.describe(),
            working_dir = %request
                .working_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| ".".to_string()),
            output_file = %request.output_file().display(),
            model = request.model().map(|m| m.as_str()).unwrap_or("default"),
            "executing agent"
        );

        let spec = RunSpec {
            prompt: request.prompt(),
            sink: request.output_file(),
            working_dir: request.working_dir(),
            env_overrides: &self.env,
            timeout: self.timeout,
        };
        let process = execute_agent(&command, &spec)?;
        log_process(&process);

        if process.timed_out {
            return Ok(InvocationOutcome::failure(
                format!(
                    "Error: Claude Code command timed out after {} seconds",
                    self.timeout.as_secs()
                ),
                RetryCode::TimeoutError,
            ));
        }

        let content = std::fs::read(request.output_file())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        if !process.is_success() {
            return Ok(InvocationOutcome::failure(
                failure_message(&content, &process.stderr, process.exit_code),
                RetryCode::ClaudeCodeError,
            ));
        }

        let messages = decode_stream(&content);
        artifacts::write_json_array(request.output_file(), &messages)?;
        if let Err(e) = artifacts::write_final_object(request.output_file(), &messages) {
            tracing::warn!(error = %e, "failed to save final object");
        }

        Ok(outcome_from_messages(&messages, &content))
    }
}

fn log_process(process: &ProcessResult) {
    tracing::info!(
        exit_code = process.exit_code.unwrap_or(-1),
        timed_out = process.timed_out,
        duration_ms = process.duration.as_millis() as u64,
        "agent process finished"
    );

    let stderr = process.stderr.trim();
    if !stderr.is_empty() {
        let preview: String = stderr.chars().take(STDERR_PREVIEW_CHARS).collect();
        tracing::info!(stderr = %preview, "agent stderr");
    }
}
