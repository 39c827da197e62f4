//! CLI argument parsing for adw.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use adw::agent::{DEFAULT_AGENT_NAME, Model};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ADW: run the coding agent and broadcast workflow progress.
///
/// Workflow drivers call these commands to:
/// - run prompts and slash-command templates through the agent with retries
/// - extract an outcome from a recorded output stream
/// - emit workflow events to GitHub issue comments and Slack
#[derive(Parser, Debug)]
#[command(name = "adw")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging (overridden by ADW_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for adw.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a prompt through the agent, retrying transient failures.
    ///
    /// Output is streamed to agents/<adw_id>/<agent>/cc_raw_output.jsonl
    /// unless --output is given.
    Prompt(PromptArgs),

    /// Expand a slash-command template and run it.
    ///
    /// Reads .claude/commands/<name>.md, substitutes $ARGUMENTS and $1..$N,
    /// and runs the result with permission prompts bypassed.
    Template(TemplateArgs),

    /// Extract the outcome from an existing agent output file.
    Parse(ParseArgs),

    /// Emit a workflow event to the configured channels.
    ///
    /// Unknown event types and delivery failures are logged, never fatal.
    Emit(EmitArgs),

    /// List the event types defined in the taxonomy.
    Events,

    /// Check that the agent CLI is installed.
    Check,
}

/// Options shared by the commands that run the agent.
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Run identifier; artifacts are grouped under agents/<adw_id>/.
    #[arg(long)]
    pub adw_id: String,

    /// Agent role name.
    #[arg(long, default_value = DEFAULT_AGENT_NAME)]
    pub agent: String,

    /// Model to request (CLI default when omitted).
    #[arg(long, value_enum)]
    pub model: Option<Model>,

    /// Working directory for the agent process.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Issue to notify with a workflow.error event when the run fails.
    #[arg(long)]
    pub issue: Option<String>,

    /// Print the outcome as JSON instead of plain text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `prompt` command.
#[derive(Parser, Debug)]
pub struct PromptArgs {
    /// Prompt text; read from stdin when omitted.
    pub prompt: Option<String>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Output sink for the raw agent stream.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Pass --dangerously-skip-permissions to the agent.
    #[arg(long)]
    pub skip_permissions: bool,

    /// Run a single attempt without retries.
    #[arg(long)]
    pub no_retry: bool,
}

/// Arguments for the `template` command.
#[derive(Parser, Debug)]
pub struct TemplateArgs {
    /// Slash command to expand (e.g., /implement).
    pub slash_command: String,

    /// Arguments substituted into the template.
    pub args: Vec<String>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the `parse` command.
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Path to a cc_raw_output.jsonl file.
    pub file: PathBuf,

    /// Print the outcome as JSON instead of plain text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `emit` command.
#[derive(Parser, Debug)]
pub struct EmitArgs {
    /// Event type defined in the taxonomy (e.g., workflow.started).
    pub event_type: String,

    /// Event data as key=value pairs. Values that parse as JSON are kept
    /// typed; everything else is a string.
    #[arg(short, long = "data", value_name = "KEY=VALUE")]
    pub data: Vec<String>,

    /// Event data as a JSON object (merged before --data).
    #[arg(long)]
    pub data_json: Option<String>,

    /// Workflow name (e.g., adw_plan_iso).
    #[arg(long)]
    pub workflow: Option<String>,

    /// Run identifier.
    #[arg(long)]
    pub adw_id: Option<String>,

    /// Issue number; required for any delivery.
    #[arg(long)]
    pub issue: Option<String>,

    /// Workflow stage.
    #[arg(long)]
    pub stage: Option<String>,

    /// Exit non-zero when a delivery fails or times out.
    #[arg(long)]
    pub strict: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_debug_assert() {
        // Verifies the CLI arguments configuration is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_prompt_minimal() {
        let cli =
            Cli::try_parse_from(["adw", "prompt", "fix it", "--adw-id", "abc12345"]).unwrap();
        if let Command::Prompt(args) = cli.command {
            assert_eq!(args.prompt.as_deref(), Some("fix it"));
            assert_eq!(args.run.adw_id, "abc12345");
            assert_eq!(args.run.agent, "ops");
            assert!(args.run.model.is_none());
            assert!(!args.skip_permissions);
            assert!(!args.no_retry);
        } else {
            panic!("Expected Prompt command");
        }
    }

    #[test]
    fn parse_prompt_requires_adw_id() {
        assert!(Cli::try_parse_from(["adw", "prompt", "fix it"]).is_err());
    }

    #[test]
    fn parse_template_full() {
        let cli = Cli::try_parse_from([
            "adw",
            "template",
            "/implement",
            "specs/plan.md",
            "extra",
            "--adw-id",
            "abc12345",
            "--agent",
            "sdlc_implementor",
            "--model",
            "opus",
            "--issue",
            "42",
        ])
        .unwrap();
        if let Command::Template(args) = cli.command {
            assert_eq!(args.slash_command, "/implement");
            assert_eq!(args.args, vec!["specs/plan.md", "extra"]);
            assert_eq!(args.run.agent, "sdlc_implementor");
            assert_eq!(args.run.model, Some(Model::Opus));
            assert_eq!(args.run.issue.as_deref(), Some("42"));
        } else {
            panic!("Expected Template command");
        }
    }

    #[test]
    fn parse_emit_with_data() {
        let cli = Cli::try_parse_from([
            "adw",
            "emit",
            "workflow.started",
            "-d",
            "workflow_stage=planning",
            "--data",
            "attempt=2",
            "--issue",
            "42",
            "--strict",
        ])
        .unwrap();
        if let Command::Emit(args) = cli.command {
            assert_eq!(args.event_type, "workflow.started");
            assert_eq!(args.data, vec!["workflow_stage=planning", "attempt=2"]);
            assert_eq!(args.issue.as_deref(), Some("42"));
            assert!(args.strict);
        } else {
            panic!("Expected Emit command");
        }
    }

    #[test]
    fn parse_global_verbose() {
        let cli = Cli::try_parse_from(["adw", "events", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Events));
    }

    #[test]
    fn parse_check() {
        let cli = Cli::try_parse_from(["adw", "check"]).unwrap();
        assert!(matches!(cli.command, Command::Check));
        assert!(!cli.verbose);
    }
}
