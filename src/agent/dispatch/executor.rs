//! Agent subprocess executor.
//!
//! Runs a built [`AgentCommand`] with the full ambient environment, streams
//! stdout straight into the output sink, captures stderr into a sibling log,
//! and enforces an overall timeout by polling and killing the child.

use crate::agent::command::{AgentCommand, PromptTransport};
use crate::error::{AdwError, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Variables re-exported explicitly to the agent when present in the
/// environment, so they survive even if a caller clears the inherited set.
pub const PASS_THROUGH_VARS: [&str; 3] = ["GITHUB_REPO_URL", "GITHUB_PAT", "CLAUDE_CODE_PATH"];

/// Default overall timeout for one agent attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of running the agent process once.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Exit code of the process (None if killed or terminated by a signal).
    pub exit_code: Option<i32>,
    /// Whether the process was killed due to timeout.
    pub timed_out: bool,
    /// Captured standard error.
    pub stderr: String,
    /// Path of the stderr log next to the sink.
    pub stderr_path: PathBuf,
    pub duration: Duration,
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Everything the runner needs besides the command itself.
#[derive(Debug, Clone)]
pub struct RunSpec<'a> {
    /// Prompt text, written to stdin for [`PromptTransport::Stdin`].
    pub prompt: &'a str,
    /// File receiving the agent's stdout.
    pub sink: &'a Path,
    pub working_dir: Option<&'a Path>,
    /// Explicit environment overrides applied last.
    pub env_overrides: &'a BTreeMap<String, String>,
    pub timeout: Duration,
}

/// Build the explicit environment for the agent: pass-through variables
/// that are set, then configured overrides. Everything else is inherited.
pub fn agent_env(overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = PASS_THROUGH_VARS
        .iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), v))
        })
        .collect();

    env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Path of the stderr log that accompanies `sink`.
pub fn stderr_log_path(sink: &Path) -> PathBuf {
    sink.with_extension("stderr.log")
}

/// Execute the agent command and block until it exits or times out.
///
/// The sink is truncated and fully written by the time this returns: the
/// child has been reaped, so no further writes can land in it.
pub fn execute_agent(cmd: &AgentCommand, spec: &RunSpec<'_>) -> Result<ProcessResult> {
    if let Some(dir) = spec.sink.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir).map_err(|e| {
            AdwError::UserError(format!(
                "failed to create output directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }

    let stdout_file = std::fs::File::create(spec.sink).map_err(|e| {
        AdwError::UserError(format!(
            "failed to create output file '{}': {}",
            spec.sink.display(),
            e
        ))
    })?;

    let stderr_path = stderr_log_path(spec.sink);
    let stderr_file = std::fs::File::create(&stderr_path).map_err(|e| {
        AdwError::UserError(format!(
            "failed to create stderr log '{}': {}",
            stderr_path.display(),
            e
        ))
    })?;

    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .envs(agent_env(spec.env_overrides))
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .stdin(match cmd.transport {
            PromptTransport::Stdin => Stdio::piped(),
            PromptTransport::Inline => Stdio::null(),
        });

    if let Some(dir) = spec.working_dir {
        command.current_dir(dir);
    }

    let start_time = Instant::now();
    let mut child = command.spawn().map_err(|e| {
        AdwError::UserError(format!(
            "failed to execute agent command '{}': {}",
            cmd.program, e
        ))
    })?;
    drop(command);

    // Feed stdin from a separate thread so a child that writes a lot before
    // reading cannot deadlock against us.
    let writer = child.stdin.take().map(|mut stdin| {
        let prompt = spec.prompt.to_string();
        std::thread::spawn(move || {
            let _ = stdin.write_all(prompt.as_bytes());
        })
    });

    let (exit_code, timed_out) = wait_with_timeout(&mut child, spec.timeout)?;
    let duration = start_time.elapsed();

    if let Some(writer) = writer {
        let _ = writer.join();
    }

    let stderr = std::fs::read(&stderr_path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();

    Ok(ProcessResult {
        exit_code,
        timed_out,
        stderr,
        stderr_path,
        duration,
    })
}

/// Wait for a child process with timeout.
///
/// Returns (exit_code, timed_out).
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<(Option<i32>, bool)> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((status.code(), false)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process(child);
                    return Ok((None, true));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_process(child);
                return Err(AdwError::UserError(format!(
                    "failed to check agent process status: {}",
                    e
                )));
            }
        }
    }
}

/// Kill a process and reap it.
fn kill_process(child: &mut Child) {
    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::write_fake_agent;
    use tempfile::TempDir;

    fn command(program: &Path, transport: PromptTransport) -> AgentCommand {
        AgentCommand {
            program: program.to_string_lossy().to_string(),
            args: vec!["--output-format".to_string(), "stream-json".to_string()],
            transport,
            prompt_file: None,
        }
    }

    fn spec<'a>(
        sink: &'a Path,
        prompt: &'a str,
        env: &'a BTreeMap<String, String>,
        timeout: Duration,
    ) -> RunSpec<'a> {
        RunSpec {
            prompt,
            sink,
            working_dir: None,
            env_overrides: env,
            timeout,
        }
    }

    #[test]
    fn test_stdout_streams_into_sink() {
        let temp_dir = TempDir::new().unwrap();
        let agent = write_fake_agent(temp_dir.path(), "agent", "echo '{\"type\":\"result\"}'");
        let sink = temp_dir.path().join("run").join("cc_raw_output.jsonl");
        let env = BTreeMap::new();

        let result = execute_agent(
            &command(&agent, PromptTransport::Inline),
            &spec(&sink, "hi", &env, Duration::from_secs(10)),
        )
        .unwrap();

        assert!(result.is_success());
        assert_eq!(
            std::fs::read_to_string(&sink).unwrap().trim(),
            "{\"type\":\"result\"}"
        );
    }

    #[test]
    fn test_stderr_is_captured_separately() {
        let temp_dir = TempDir::new().unwrap();
        let agent = write_fake_agent(temp_dir.path(), "agent", "echo oops >&2\nexit 3");
        let sink = temp_dir.path().join("out.jsonl");
        let env = BTreeMap::new();

        let result = execute_agent(
            &command(&agent, PromptTransport::Inline),
            &spec(&sink, "hi", &env, Duration::from_secs(10)),
        )
        .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stderr.trim(), "oops");
        assert!(std::fs::read_to_string(&sink).unwrap().is_empty());
        assert!(result.stderr_path.exists());
    }

    #[test]
    fn test_stdin_transport_feeds_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let agent = write_fake_agent(temp_dir.path(), "agent", "cat");
        let sink = temp_dir.path().join("out.jsonl");
        let env = BTreeMap::new();
        let prompt = "line one\nline two";

        let result = execute_agent(
            &command(&agent, PromptTransport::Stdin),
            &spec(&sink, prompt, &env, Duration::from_secs(10)),
        )
        .unwrap();

        assert!(result.is_success());
        assert_eq!(std::fs::read_to_string(&sink).unwrap(), prompt);
    }

    #[test]
    fn test_timeout_kills_process() {
        let temp_dir = TempDir::new().unwrap();
        let agent = write_fake_agent(temp_dir.path(), "agent", "sleep 10");
        let sink = temp_dir.path().join("out.jsonl");
        let env = BTreeMap::new();

        let result = execute_agent(
            &command(&agent, PromptTransport::Inline),
            &spec(&sink, "hi", &env, Duration::from_millis(300)),
        )
        .unwrap();

        assert!(result.timed_out);
        assert!(!result.is_success());
        assert!(result.duration < Duration::from_secs(5));
    }

    #[test]
    fn test_env_overrides_reach_the_agent() {
        let temp_dir = TempDir::new().unwrap();
        let agent = write_fake_agent(temp_dir.path(), "agent", "echo \"$ADW_TEST_MARKER\"");
        let sink = temp_dir.path().join("out.jsonl");
        let mut env = BTreeMap::new();
        env.insert("ADW_TEST_MARKER".to_string(), "marker-value".to_string());

        execute_agent(
            &command(&agent, PromptTransport::Inline),
            &spec(&sink, "hi", &env, Duration::from_secs(10)),
        )
        .unwrap();

        assert_eq!(std::fs::read_to_string(&sink).unwrap().trim(), "marker-value");
    }

    #[test]
    fn test_missing_binary_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let sink = temp_dir.path().join("out.jsonl");
        let env = BTreeMap::new();

        let err = execute_agent(
            &command(
                &temp_dir.path().join("nonexistent_agent_xyz"),
                PromptTransport::Inline,
            ),
            &spec(&sink, "hi", &env, Duration::from_secs(10)),
        )
        .unwrap_err();

        assert!(err.to_string().contains("failed to execute"));
    }

    #[test]
    fn test_stderr_log_path() {
        assert_eq!(
            stderr_log_path(Path::new("/runs/ops/cc_raw_output.jsonl")),
            Path::new("/runs/ops/cc_raw_output.stderr.log")
        );
    }
}
