//! GitHub CLI runner.
//!
//! Issue comments are posted through `gh` so authentication stays with the
//! user's existing `gh auth` session (or `GITHUB_PAT` when one is exported).

use crate::error::{AdwError, Result};
use std::process::Command;

/// Marker prepended to every comment the workflow posts, so webhook
/// listeners can ignore the bot's own comments.
pub const BOT_IDENTIFIER: &str = "[ADW-AGENTS]";

/// Run a `gh` command and return its trimmed stdout.
///
/// When `GITHUB_PAT` is set it is exported to `gh` as `GH_TOKEN`.
pub fn run_gh(args: &[&str]) -> Result<String> {
    let mut command = Command::new("gh");
    command.args(args);

    if let Ok(token) = std::env::var("GITHUB_PAT")
        && !token.is_empty()
    {
        command.env("GH_TOKEN", token);
    }

    let output = command.output().map_err(|e| {
        AdwError::GitError(format!(
            "failed to execute gh {}: {} (is the GitHub CLI installed?)",
            args.first().unwrap_or(&""),
            e
        ))
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(AdwError::GitError(format!(
        "gh {} failed (exit code {}): {}",
        args.first().unwrap_or(&""),
        output.status.code().unwrap_or(-1),
        if stderr.is_empty() { stdout } else { stderr }
    )))
}

/// Build the body of an issue comment, adding the bot identifier once.
pub fn comment_body(message: &str) -> String {
    if message.starts_with(BOT_IDENTIFIER) {
        message.to_string()
    } else {
        format!("{} {}", BOT_IDENTIFIER, message)
    }
}

/// Post a comment on an issue.
///
/// `repo` is an `owner/name` slug or repository URL; when `None`, `gh`
/// infers the repository from the current directory.
pub fn make_issue_comment(issue_number: &str, message: &str, repo: Option<&str>) -> Result<()> {
    let body = comment_body(message);
    let mut args = vec!["issue", "comment", issue_number, "--body", body.as_str()];
    if let Some(repo) = repo {
        args.push("--repo");
        args.push(repo);
    }

    run_gh(&args).map(|_| ())
}
