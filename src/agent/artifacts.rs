//! Run artifacts written next to the agent output.
//!
//! - `prompts/<command>.txt`: audit copy of slash-command prompts
//! - `cc_raw_output.json`: the decoded stream as a JSON array
//! - `cc_final_object.json`: the last decoded message

use super::stream::StreamMessage;
use crate::context::{FINAL_OBJECT_JSON, OUTPUT_JSON};
use crate::error::{AdwError, Result};
use crate::fs::atomic_write_file;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Leading slash command of a prompt, e.g. `/implement` in `/implement plan.md`.
static SLASH_COMMAND_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\w+)").expect("Invalid slash command regex"));

/// Name of the slash command a prompt starts with, without the slash.
pub fn slash_command_name(prompt: &str) -> Option<&str> {
    SLASH_COMMAND_REGEX
        .captures(prompt)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Save `prompt` as `<prompts_dir>/<command>.txt` when it starts with a
/// slash command. Free-form prompts are not saved.
pub fn save_prompt(prompt: &str, prompts_dir: &Path) -> Result<Option<PathBuf>> {
    let Some(name) = slash_command_name(prompt) else {
        return Ok(None);
    };

    let path = prompts_dir.join(format!("{}.txt", name));
    atomic_write_file(&path, prompt)?;
    Ok(Some(path))
}

/// Write every decoded message as a pretty-printed JSON array next to `sink`.
pub fn write_json_array(sink: &Path, messages: &[StreamMessage]) -> Result<PathBuf> {
    let path = sibling(sink, OUTPUT_JSON);
    let array = Value::Array(messages.iter().map(StreamMessage::to_value).collect());

    atomic_write_file(&path, &to_pretty_json(&array)?)?;
    tracing::debug!(path = %path.display(), count = messages.len(), "wrote output array");
    Ok(path)
}

/// Write the last decoded message next to `sink`.
///
/// Returns `None` without writing when there are no messages.
pub fn write_final_object(sink: &Path, messages: &[StreamMessage]) -> Result<Option<PathBuf>> {
    let Some(last) = messages.last() else {
        tracing::warn!("no messages to save as final object");
        return Ok(None);
    };

    let path = sibling(sink, FINAL_OBJECT_JSON);
    atomic_write_file(&path, &to_pretty_json(&last.to_value())?)?;
    tracing::debug!(path = %path.display(), kind = last.kind(), "saved final object");
    Ok(Some(path))
}

fn sibling(sink: &Path, name: &str) -> PathBuf {
    sink.parent().unwrap_or(Path::new(".")).join(name)
}

fn to_pretty_json(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AdwError::AgentError(format!("failed to serialize output: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::stream::decode_stream;
    use crate::test_support::success_stream;
    use tempfile::TempDir;

    #[test]
    fn test_slash_command_name() {
        assert_eq!(slash_command_name("/implement plan.md"), Some("implement"));
        assert_eq!(slash_command_name("/classify_issue"), Some("classify_issue"));
        assert_eq!(slash_command_name("please /implement"), None);
        assert_eq!(slash_command_name("/ nothing"), None);
    }

    #[test]
    fn test_save_prompt_for_slash_command() {
        let temp_dir = TempDir::new().unwrap();
        let prompts = temp_dir.path().join("prompts");

        let path = save_prompt("/chore 42\nDo it", &prompts).unwrap().unwrap();

        assert_eq!(path, prompts.join("chore.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "/chore 42\nDo it");
    }

    #[test]
    fn test_free_form_prompt_is_not_saved() {
        let temp_dir = TempDir::new().unwrap();
        let prompts = temp_dir.path().join("prompts");

        assert!(save_prompt("fix the tests", &prompts).unwrap().is_none());
        assert!(!prompts.exists());
    }

    #[test]
    fn test_json_array_and_final_object() {
        let temp_dir = TempDir::new().unwrap();
        let sink = temp_dir.path().join("cc_raw_output.jsonl");
        let messages = decode_stream(&success_stream("OK", "s1"));

        let array_path = write_json_array(&sink, &messages).unwrap();
        let final_path = write_final_object(&sink, &messages).unwrap().unwrap();

        let array: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(array_path).unwrap()).unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[0]["type"], "system");

        let last: Value =
            serde_json::from_str(&std::fs::read_to_string(&final_path).unwrap()).unwrap();
        assert_eq!(last["type"], "result");
        assert_eq!(last["result"], "OK");
        assert_eq!(final_path, temp_dir.path().join(FINAL_OBJECT_JSON));
    }

    #[test]
    fn test_final_object_skipped_without_messages() {
        let temp_dir = TempDir::new().unwrap();
        let sink = temp_dir.path().join("cc_raw_output.jsonl");

        assert!(write_final_object(&sink, &[]).unwrap().is_none());
        assert!(!temp_dir.path().join(FINAL_OBJECT_JSON).exists());

        let array_path = write_json_array(&sink, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(array_path).unwrap(), "[]");
    }
}
