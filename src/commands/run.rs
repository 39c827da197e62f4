//! Implementation of the `adw prompt` and `adw template` commands.
//!
//! Both run the agent through the retrying invocation engine, print the
//! outcome, and exit non-zero when the outcome is a failure. With `--issue`
//! a failed run also emits a `workflow.error` event.

use super::App;
use crate::cli::{PromptArgs, RunArgs, TemplateArgs};
use adw::agent::{AgentRunner, InvocationOutcome, InvocationRequest, TemplateRequest, truncate};
use adw::error::{AdwError, Result};
use adw::events::EmitContext;
use serde_json::{Map, Value, json};
use std::io::Read;

/// Event emitted when a run fails and an issue is given.
const FAILURE_EVENT: &str = "workflow.error";

/// Longest error text carried in a failure event.
const MAX_EVENT_ERROR_CHARS: usize = 800;

/// Longest error text in the command's own error message.
const MAX_EXIT_ERROR_CHARS: usize = 200;

/// Execute the `adw prompt` command.
pub fn cmd_prompt(args: PromptArgs, app: &App) -> Result<()> {
    let prompt = match args.prompt {
        Some(prompt) => prompt,
        None => read_stdin_prompt()?,
    };
    if prompt.trim().is_empty() {
        return Err(AdwError::UserError("prompt is empty".to_string()));
    }

    let run = &args.run;
    let output_file = args
        .output
        .clone()
        .unwrap_or_else(|| app.context.raw_output_path(&run.adw_id, &run.agent));

    let mut builder = InvocationRequest::builder(prompt, &run.adw_id, output_file)
        .agent_name(&run.agent)
        .model(run.model)
        .skip_permissions(args.skip_permissions);
    if let Some(dir) = &run.cwd {
        builder = builder.working_dir(dir);
    }
    let request = builder.build();

    let runner = AgentRunner::new(&app.settings, app.context.clone());
    let outcome = if args.no_retry {
        runner.prompt(&request)
    } else {
        runner.prompt_with_retry(&request)
    };

    finish(&outcome, run, app)
}

/// Execute the `adw template` command.
pub fn cmd_template(args: TemplateArgs, app: &App) -> Result<()> {
    let run = &args.run;
    let request = TemplateRequest {
        agent_name: run.agent.clone(),
        slash_command: args.slash_command.clone(),
        args: args.args.clone(),
        adw_id: run.adw_id.clone(),
        model: run.model,
        working_dir: run.cwd.clone(),
    };

    let runner = AgentRunner::new(&app.settings, app.context.clone());
    let outcome = runner.execute_template(&request);

    finish(&outcome, run, app)
}

fn read_stdin_prompt() -> Result<String> {
    let mut prompt = String::new();
    std::io::stdin()
        .read_to_string(&mut prompt)
        .map_err(|e| AdwError::UserError(format!("failed to read prompt from stdin: {}", e)))?;
    Ok(prompt)
}

fn finish(outcome: &InvocationOutcome, run: &RunArgs, app: &App) -> Result<()> {
    print_outcome(outcome, run.json)?;

    if outcome.success {
        return Ok(());
    }

    tracing::error!(
        adw_id = %run.adw_id,
        agent = %run.agent,
        retry_code = %outcome.retry_code,
        "agent run failed"
    );

    if let Some(issue) = &run.issue {
        let context = EmitContext::new()
            .with_adw_id(&run.adw_id)
            .with_issue_number(issue);
        app.router
            .emit_safe(FAILURE_EVENT, failure_data(outcome, &run.agent), &context);
    }

    Err(AdwError::AgentError(truncate(
        &outcome.output,
        MAX_EXIT_ERROR_CHARS,
    )))
}

pub(super) fn print_outcome(outcome: &InvocationOutcome, as_json: bool) -> Result<()> {
    if as_json {
        let json = serde_json::to_string_pretty(outcome)
            .map_err(|e| AdwError::UserError(format!("failed to serialize outcome: {}", e)))?;
        println!("{}", json);
    } else if outcome.success {
        println!("{}", outcome.output);
    }
    Ok(())
}

/// Template data for the failure event.
fn failure_data(outcome: &InvocationOutcome, agent_name: &str) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("agent_name".to_string(), json!(agent_name));
    data.insert(
        "error_message".to_string(),
        json!(truncate(&outcome.output, MAX_EVENT_ERROR_CHARS)),
    );
    data.insert("retry_code".to_string(), json!(outcome.retry_code.as_str()));
    data
}
