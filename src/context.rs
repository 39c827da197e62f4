//! Project path resolution for adw.
//!
//! Every run artifact lives at a fixed location relative to the project
//! root: agent output under `agents/<adw_id>/<agent_name>/`, slash-command
//! templates under `.claude/commands/`, configuration under
//! `adws/adw_config/`. This module resolves the root once and hands out the
//! derived paths so the CLI and the library agree on the layout.

use crate::error::{AdwError, Result};
use crate::git;
use std::env;
use std::path::{Path, PathBuf};

/// File name of the raw line-delimited agent output.
pub const OUTPUT_JSONL: &str = "cc_raw_output.jsonl";

/// File name of the JSON array conversion of the raw output.
pub const OUTPUT_JSON: &str = "cc_raw_output.json";

/// File name of the last decoded message.
pub const FINAL_OBJECT_JSON: &str = "cc_final_object.json";

/// File name of the prompt copy written when the prompt is piped via stdin.
pub const EXPANDED_PROMPT: &str = "expanded_prompt.txt";

/// Resolved project paths. All paths are absolute.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Root of the project (git toplevel, or the working directory outside git).
    pub project_root: PathBuf,

    /// `{project_root}/agents/`, one subdirectory per run identifier.
    pub agents_dir: PathBuf,

    /// `{project_root}/.claude/commands/`, slash-command templates.
    pub commands_dir: PathBuf,

    /// `{project_root}/adws/adw_config/`.
    pub config_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve the project context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            AdwError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the project context from a specific directory.
    ///
    /// Inside a git repository the toplevel is the root; outside one the
    /// directory itself is used so the CLI still works in scratch folders.
    pub fn resolve_from<P: AsRef<Path>>(cwd: P) -> Result<Self> {
        let cwd = cwd.as_ref();

        let project_root = match git::get_repo_root(cwd) {
            Ok(root) => root,
            Err(AdwError::UserError(_)) => {
                tracing::debug!(cwd = %cwd.display(), "not in a git repository, using cwd as project root");
                cwd.to_path_buf()
            }
            Err(e) => return Err(e),
        };

        Ok(Self::at(project_root))
    }

    /// Build a context rooted at `project_root` without consulting git.
    pub fn at<P: Into<PathBuf>>(project_root: P) -> Self {
        let project_root = project_root.into();
        Self {
            agents_dir: project_root.join("agents"),
            commands_dir: project_root.join(".claude").join("commands"),
            config_dir: project_root.join("adws").join("adw_config"),
            project_root,
        }
    }

    /// Path to `settings.yaml`.
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.yaml")
    }

    /// Resolve a configured path relative to the project root.
    pub fn resolve_path(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Directory holding everything one agent produced during one run.
    pub fn agent_run_dir(&self, adw_id: &str, agent_name: &str) -> PathBuf {
        self.agents_dir.join(adw_id).join(agent_name)
    }

    /// Directory holding audit copies of slash-command prompts.
    pub fn prompts_dir(&self, adw_id: &str, agent_name: &str) -> PathBuf {
        self.agent_run_dir(adw_id, agent_name).join("prompts")
    }

    /// Default output sink for an agent within a run.
    pub fn raw_output_path(&self, adw_id: &str, agent_name: &str) -> PathBuf {
        self.agent_run_dir(adw_id, agent_name).join(OUTPUT_JSONL)
    }

    /// Template file for a slash command (`/implement` → `implement.md`).
    pub fn command_template_path(&self, slash_command: &str) -> PathBuf {
        let name = slash_command.trim_start_matches('/');
        self.commands_dir.join(format!("{}.md", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_repo;

    #[test]
    fn test_resolve_from_repo_root() {
        let temp_dir = create_test_repo();

        let ctx = ProjectContext::resolve_from(temp_dir.path()).unwrap();

        assert_eq!(
            ctx.project_root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_resolve_from_subdirectory() {
        let temp_dir = create_test_repo();
        let nested = temp_dir.path().join("app").join("server");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = ProjectContext::resolve_from(&nested).unwrap();

        assert_eq!(
            ctx.project_root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_resolve_outside_repo_uses_cwd() {
        let temp_dir = tempfile::TempDir::new().unwrap();

        let ctx = ProjectContext::resolve_from(temp_dir.path()).unwrap();

        assert_eq!(ctx.project_root, temp_dir.path());
    }

    #[test]
    fn test_run_layout() {
        let ctx = ProjectContext::at("/work/project");

        assert_eq!(
            ctx.raw_output_path("abc12345", "sdlc_planner"),
            Path::new("/work/project/agents/abc12345/sdlc_planner/cc_raw_output.jsonl")
        );
        assert_eq!(
            ctx.prompts_dir("abc12345", "ops"),
            Path::new("/work/project/agents/abc12345/ops/prompts")
        );
        assert_eq!(
            ctx.settings_path(),
            Path::new("/work/project/adws/adw_config/settings.yaml")
        );
    }

    #[test]
    fn test_command_template_path_strips_slash() {
        let ctx = ProjectContext::at("/work/project");

        assert_eq!(
            ctx.command_template_path("/classify_issue"),
            Path::new("/work/project/.claude/commands/classify_issue.md")
        );
        assert_eq!(
            ctx.command_template_path("implement"),
            Path::new("/work/project/.claude/commands/implement.md")
        );
    }

    #[test]
    fn test_resolve_path_relative_and_absolute() {
        let ctx = ProjectContext::at("/work/project");

        assert_eq!(
            ctx.resolve_path("adws/adw_config/event_taxonomy.yaml"),
            Path::new("/work/project/adws/adw_config/event_taxonomy.yaml")
        );
        assert_eq!(
            ctx.resolve_path("/etc/adw/events.yaml"),
            Path::new("/etc/adw/events.yaml")
        );
    }
}
