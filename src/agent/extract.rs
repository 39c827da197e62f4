//! Outcome derivation from decoded agent output.

use super::stream::{StreamMessage, decode_stream, last_result};
use super::truncate::truncate;
use super::types::{InvocationOutcome, RetryCode};
use std::path::Path;

/// Fixed message for `subtype: error_during_execution`.
pub const ERROR_DURING_EXECUTION_MESSAGE: &str =
    "Error during execution: Agent encountered an error and did not return a result";

/// Message used when the stream carries no result and no assistant text.
pub const NO_RESULT_MESSAGE: &str = "No result message found in Claude Code output";

/// Error results longer than this are truncated.
const ERROR_TRUNCATE_THRESHOLD: usize = 1000;

/// Maximum length of any error text returned in an outcome.
const ERROR_MAX_CHARS: usize = 800;

/// Trailing raw lines inspected when no result message exists.
const DIAGNOSTIC_TAIL_LINES: usize = 5;

const ASSISTANT_EXCERPT_CHARS: usize = 500;
const STDOUT_EXCERPT_CHARS: usize = 200;

/// Derive the outcome of a successful (exit code 0) run from the sink file.
///
/// An unreadable file is treated like an empty one.
pub fn parse_output_file(path: &Path) -> InvocationOutcome {
    let content = match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read agent output");
            String::new()
        }
    };

    parse_output(&content)
}

/// Derive the outcome of a successful (exit code 0) run from raw output.
///
/// Pure with respect to `content`: parsing the same text twice yields the
/// same outcome.
pub fn parse_output(content: &str) -> InvocationOutcome {
    let messages = decode_stream(content);
    outcome_from_messages(&messages, content)
}

/// Derive the outcome from already decoded messages.
///
/// `raw` is the undecoded content, scanned for diagnostics when no result
/// message exists.
pub fn outcome_from_messages(messages: &[StreamMessage], raw: &str) -> InvocationOutcome {
    let Some(result) = last_result(messages) else {
        tracing::warn!(messages = messages.len(), "no result message found in agent output");
        return InvocationOutcome::failure(
            truncate(&degraded_message(raw), ERROR_MAX_CHARS),
            RetryCode::None,
        );
    };

    tracing::debug!(
        is_error = result.is_error,
        subtype = result.subtype.as_deref().unwrap_or(""),
        session_id = result.session_id.as_deref().unwrap_or(""),
        "found result message"
    );

    if result.is_error_during_execution() {
        return InvocationOutcome::failure(
            ERROR_DURING_EXECUTION_MESSAGE,
            RetryCode::ErrorDuringExecution,
        )
        .with_session_id(result.session_id.clone());
    }

    let mut output = result.result_text();
    if result.is_error && output.chars().count() > ERROR_TRUNCATE_THRESHOLD {
        output = truncate(&output, ERROR_MAX_CHARS);
    }

    InvocationOutcome {
        output,
        success: !result.is_error,
        session_id: result.session_id.clone(),
        retry_code: RetryCode::None,
    }
}

/// Scan the last raw lines for assistant text to explain a missing result.
fn degraded_message(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let tail = &lines[lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES)..];

    tail.iter()
        .rev()
        .filter_map(|line| StreamMessage::parse_line(line))
        .find_map(|message| {
            let text = message.as_assistant()?.first_text()?;
            Some(format!(
                "Claude Code output: {}",
                take_chars(text, ASSISTANT_EXCERPT_CHARS)
            ))
        })
        .unwrap_or_else(|| NO_RESULT_MESSAGE.to_string())
}

/// Build the error text for a run that exited non-zero.
///
/// Preference order: an error result in the stream, an assistant message
/// in the last five mentioning "error" or "failed", stderr and the last
/// stdout line, and finally the bare exit code.
pub fn failure_message(content: &str, stderr: &str, exit_code: Option<i32>) -> String {
    let stderr = stderr.trim();
    let messages = decode_stream(content);

    if let Some(error) = error_from_stream(&messages) {
        return truncate(&format!("Claude Code error: {}", error), ERROR_MAX_CHARS);
    }

    let stdout_tail = content
        .lines()
        .last()
        .map(|line| take_chars(line.trim(), STDOUT_EXCERPT_CHARS))
        .unwrap_or_default();

    let message = match (stderr.is_empty(), stdout_tail.is_empty()) {
        (true, false) => format!("Claude Code error: {}", stdout_tail),
        (false, true) => format!("Claude Code error: {}", stderr),
        (false, false) => format!("Claude Code error: {}\nStdout: {}", stderr, stdout_tail),
        (true, true) => match exit_code {
            Some(code) => format!("Claude Code error: Command failed with exit code {}", code),
            None => "Claude Code error: Command terminated by signal".to_string(),
        },
    };

    truncate(&message, ERROR_MAX_CHARS)
}

fn error_from_stream(messages: &[StreamMessage]) -> Option<String> {
    if let Some(result) = last_result(messages)
        && result.is_error
    {
        let text = result.result_text();
        return Some(if text.is_empty() {
            "Unknown error".to_string()
        } else {
            text
        });
    }

    let tail = &messages[messages.len().saturating_sub(DIAGNOSTIC_TAIL_LINES)..];
    tail.iter()
        .rev()
        .filter_map(|m| m.as_assistant().and_then(|a| a.first_text()))
        .find(|text| {
            let lower = text.to_lowercase();
            lower.contains("error") || lower.contains("failed")
        })
        .map(|text| take_chars(text, ASSISTANT_EXCERPT_CHARS))
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
