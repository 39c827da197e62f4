//! Command builder for agent invocations.
//!
//! Decides how the prompt reaches the agent and which flags are passed:
//!
//! - short single-line prompts go inline as `-p <prompt>`
//! - long prompts (over 2000 characters) or prompts with a newline in the
//!   first 500 characters are piped through stdin, and a copy is written to
//!   `expanded_prompt.txt` next to the output sink
//! - `--output-format stream-json --verbose` is always present
//! - `--model` only when one was requested explicitly
//! - `--mcp-config` when the working directory has a `.mcp.json`
//! - `--dangerously-skip-permissions` when the request asks for it

use super::types::InvocationRequest;
use crate::context::EXPANDED_PROMPT;
use crate::error::Result;
use crate::fs::atomic_write_file;
use std::path::{Path, PathBuf};

/// Prompts longer than this many characters are piped via stdin.
pub const MAX_INLINE_PROMPT_CHARS: usize = 2000;

/// A newline within this many leading characters forces stdin transport.
pub const NEWLINE_SCAN_CHARS: usize = 500;

/// File name of the tool-integration config looked up in the working directory.
pub const MCP_CONFIG_FILE: &str = ".mcp.json";

/// How the prompt is handed to the agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTransport {
    /// Passed as the value of `-p`.
    Inline,
    /// Written to the child's stdin.
    Stdin,
}

impl PromptTransport {
    pub fn describe(self) -> &'static str {
        match self {
            PromptTransport::Inline => "-p flag",
            PromptTransport::Stdin => "stdin",
        }
    }
}

/// A fully built agent command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
    pub transport: PromptTransport,
    /// Audit copy of the prompt, present with [`PromptTransport::Stdin`].
    pub prompt_file: Option<PathBuf>,
}

impl AgentCommand {
    /// Shell-quoted rendering for logs.
    pub fn display(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// Decide whether `prompt` must be piped through stdin.
pub fn prompt_transport(prompt: &str) -> PromptTransport {
    let too_long = prompt.chars().count() > MAX_INLINE_PROMPT_CHARS;
    let early_newline = prompt.chars().take(NEWLINE_SCAN_CHARS).any(|c| c == '\n');

    if too_long || early_newline {
        PromptTransport::Stdin
    } else {
        PromptTransport::Inline
    }
}

/// Build the agent command for `request`.
///
/// With stdin transport the prompt is written to `expanded_prompt.txt` in
/// the sink's directory before returning.
pub fn build_command(request: &InvocationRequest, binary: &str) -> Result<AgentCommand> {
    let transport = prompt_transport(request.prompt());
    let mut args = Vec::new();

    let prompt_file = match transport {
        PromptTransport::Inline => {
            args.push("-p".to_string());
            args.push(request.prompt().to_string());
            None
        }
        PromptTransport::Stdin => {
            let dir = request.output_file().parent().unwrap_or(Path::new("."));
            let path = dir.join(EXPANDED_PROMPT);
            atomic_write_file(&path, request.prompt())?;
            tracing::info!(path = %path.display(), "saved large prompt to file");
            Some(path)
        }
    };

    if let Some(model) = request.model() {
        args.push("--model".to_string());
        args.push(model.as_str().to_string());
    }

    args.push("--output-format".to_string());
    args.push("stream-json".to_string());
    args.push("--verbose".to_string());

    if let Some(config) = mcp_config_path(request.working_dir()) {
        args.push("--mcp-config".to_string());
        args.push(config.to_string_lossy().to_string());
    }

    if request.skip_permissions() {
        args.push("--dangerously-skip-permissions".to_string());
    }

    Ok(AgentCommand {
        program: binary.to_string(),
        args,
        transport,
        prompt_file,
    })
}

fn mcp_config_path(working_dir: Option<&Path>) -> Option<PathBuf> {
    let path = working_dir?.join(MCP_CONFIG_FILE);
    path.exists().then_some(path)
}
