//! Git command runner for adw.
//!
//! Provides a wrapper around git commands with captured stdout/stderr and
//! structured error handling. The core only needs git to locate the project
//! root and to derive the repository URL used for issue links.

use crate::error::{AdwError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a successful git command execution.
#[derive(Debug, Clone)]
pub struct GitOutput {
    /// Standard output from the command (trimmed).
    pub stdout: String,
    /// Standard error from the command (trimmed).
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}

/// Run a git command in `cwd`.
///
/// # Returns
///
/// * `Ok(GitOutput)` - On exit code 0
/// * `Err(AdwError::GitError)` - On spawn failure or non-zero exit
///
/// # Examples
///
/// ```no_run
/// use adw::git::run_git;
/// use std::path::Path;
///
/// let output = run_git(Path::new("."), &["remote", "get-url", "origin"])?;
/// println!("origin: {}", output.stdout);
/// # Ok::<(), adw::error::AdwError>(())
/// ```
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let output = Command::new("git")
        .current_dir(cwd.as_ref())
        .args(args)
        .output()
        .map_err(|e| {
            AdwError::GitError(format!(
                "failed to execute git {}: {}",
                args.first().unwrap_or(&""),
                e
            ))
        })?;

    let git_output = GitOutput::from_output(&output);

    if output.status.success() {
        Ok(git_output)
    } else {
        let error_msg = if git_output.stderr.is_empty() {
            git_output.stdout.clone()
        } else {
            git_output.stderr.clone()
        };

        Err(AdwError::GitError(format!(
            "git {} failed (exit code {}): {}",
            args.first().unwrap_or(&""),
            output.status.code().unwrap_or(-1),
            error_msg
        )))
    }
}

/// Get the repository root directory using `git rev-parse --show-toplevel`.
///
/// "Not a git repository" is reported as a user error (exit 1), not a git
/// failure.
pub fn get_repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    match run_git(cwd, &["rev-parse", "--show-toplevel"]) {
        Ok(output) => Ok(PathBuf::from(output.stdout)),
        Err(AdwError::GitError(msg)) if msg.contains("not a git repository") => Err(
            AdwError::UserError("not inside a git repository".to_string()),
        ),
        Err(e) => Err(e),
    }
}

/// Resolve the repository web URL used for issue links.
///
/// `GITHUB_REPO_URL` wins when set; otherwise the `origin` remote is used.
/// A trailing `.git` is removed either way.
pub fn get_repo_url<P: AsRef<Path>>(cwd: P) -> Result<String> {
    let raw = match std::env::var("GITHUB_REPO_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => run_git(cwd, &["remote", "get-url", "origin"])?.stdout,
    };

    Ok(normalize_repo_url(&raw))
}

/// Strip whitespace and a trailing `.git` from a remote URL.
pub fn normalize_repo_url(url: &str) -> String {
    let url = url.trim();
    url.strip_suffix(".git").unwrap_or(url).to_string()
}
