//! Slash-command template execution.
//!
//! A slash command such as `/implement plan.md` is expanded from
//! `.claude/commands/implement.md`:
//!
//! - `$ARGUMENTS` becomes all arguments joined with spaces
//! - `$1`, `$2`, ... become the individual arguments
//!
//! Placeholders without a matching argument are left as written. When the
//! template file does not exist the prompt falls back to `<command> <args>`
//! and the agent resolves the command itself.

use super::invoke::AgentRunner;
use super::types::{InvocationOutcome, InvocationRequest, Model};
use crate::context::ProjectContext;
use regex::{Captures, Regex};
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(ARGUMENTS|\d+)").expect("Invalid placeholder regex"));

/// A slash command to expand and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRequest {
    pub agent_name: String,
    pub slash_command: String,
    pub args: Vec<String>,
    pub adw_id: String,
    pub model: Option<Model>,
    pub working_dir: Option<PathBuf>,
}

/// Substitute `$ARGUMENTS` and `$N` placeholders in one pass.
pub fn expand_template(template: &str, args: &[String]) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            if name == "ARGUMENTS" {
                return args.join(" ");
            }

            name.parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .and_then(|n| args.get(n - 1))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Build the prompt for `slash_command`, from its template when present.
pub fn load_prompt(ctx: &ProjectContext, slash_command: &str, args: &[String]) -> String {
    let path = ctx.command_template_path(slash_command);

    match std::fs::read_to_string(&path) {
        Ok(template) => {
            tracing::info!(template = %path.display(), args = %args.join(" "), "expanding slash command template");
            expand_template(&template, args)
        }
        Err(_) => {
            tracing::warn!(template = %path.display(), "template not found, using fallback prompt");
            format!("{} {}", slash_command, args.join(" "))
        }
    }
}

impl AgentRunner {
    /// Expand a slash command and run it with retries.
    ///
    /// Output goes to `agents/<adw_id>/<agent_name>/cc_raw_output.jsonl` and
    /// permission prompts are bypassed.
    pub fn execute_template(&self, request: &TemplateRequest) -> InvocationOutcome {
        let invocation = self.template_invocation(request);
        self.prompt_with_retry(&invocation)
    }

    /// The invocation request `execute_template` would run.
    pub fn template_invocation(&self, request: &TemplateRequest) -> InvocationRequest {
        let ctx = self.context();
        let prompt = load_prompt(ctx, &request.slash_command, &request.args);
        let output_file = ctx.raw_output_path(&request.adw_id, &request.agent_name);

        let mut builder = InvocationRequest::builder(prompt, &request.adw_id, output_file)
            .agent_name(&request.agent_name)
            .model(request.model)
            .skip_permissions(true);
        if let Some(dir) = &request.working_dir {
            builder = builder.working_dir(dir);
        }

        builder.build()
    }
}
