//! Decoding of the agent's streamed output.
//!
//! The agent writes one JSON object per line, each tagged by a string `type`
//! field. Only `result` messages carry the authoritative outcome; `assistant`
//! messages are used for diagnostics; anything else is kept opaque.
//!
//! When no line decodes, the content is scanned for a fenced ```` ```json ````
//! block instead and the last one is treated as a successful result.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Matches a fenced JSON object block; the object is capture group 1.
static FENCED_JSON_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("Invalid fenced JSON regex")
});

/// The `subtype` reported when the agent failed internally without a result.
pub const ERROR_DURING_EXECUTION_SUBTYPE: &str = "error_during_execution";

/// Final summary message of an agent run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultMessage {
    pub subtype: Option<String>,
    pub is_error: bool,
    pub session_id: Option<String>,
    /// String, object or array payload.
    pub result: Option<Value>,
    /// Run metadata, kept as reported; never used to classify the outcome.
    pub duration_ms: Option<Value>,
    pub duration_api_ms: Option<Value>,
    pub num_turns: Option<Value>,
    pub total_cost_usd: Option<Value>,
    /// The line as decoded, including fields not modelled above.
    #[serde(skip)]
    pub raw: Value,
}

impl ResultMessage {
    pub fn is_error_during_execution(&self) -> bool {
        self.subtype.as_deref() == Some(ERROR_DURING_EXECUTION_SUBTYPE)
    }

    /// The payload as display text.
    ///
    /// Strings are returned as-is, objects and arrays pretty-printed, other
    /// scalars as their JSON text, and a missing or null payload as "".
    pub fn result_text(&self) -> String {
        match &self.result {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(v @ (Value::Object(_) | Value::Array(_))) => {
                serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
            }
            Some(other) => other.to_string(),
        }
    }
}

/// An `assistant` message. Only its first text block is ever inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantMessage {
    pub raw: Value,
}

impl AssistantMessage {
    /// Text of the first content block, if it is a non-empty text.
    pub fn first_text(&self) -> Option<&str> {
        self.raw
            .get("message")?
            .get("content")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()
            .filter(|text| !text.is_empty())
    }
}

/// One decoded line of the agent stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Result(ResultMessage),
    Assistant(AssistantMessage),
    Other { kind: String, raw: Value },
}

impl StreamMessage {
    /// Classify a decoded JSON value.
    ///
    /// Returns `None` unless the value is an object with a string `type`.
    pub fn from_value(value: Value) -> Option<Self> {
        let kind = value.as_object()?.get("type")?.as_str()?.to_string();

        Some(match kind.as_str() {
            "result" => match serde_json::from_value::<ResultMessage>(value.clone()) {
                Ok(message) => StreamMessage::Result(ResultMessage {
                    raw: value,
                    ..message
                }),
                Err(e) => {
                    tracing::debug!(error = %e, "result message has unexpected field types");
                    StreamMessage::Other { kind, raw: value }
                }
            },
            "assistant" => StreamMessage::Assistant(AssistantMessage { raw: value }),
            _ => StreamMessage::Other { kind, raw: value },
        })
    }

    /// Decode a single line.
    pub fn parse_line(line: &str) -> Option<Self> {
        serde_json::from_str::<Value>(line.trim())
            .ok()
            .and_then(Self::from_value)
    }

    pub fn kind(&self) -> &str {
        match self {
            StreamMessage::Result(_) => "result",
            StreamMessage::Assistant(_) => "assistant",
            StreamMessage::Other { kind, .. } => kind,
        }
    }

    pub fn as_result(&self) -> Option<&ResultMessage> {
        match self {
            StreamMessage::Result(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            StreamMessage::Assistant(message) => Some(message),
            _ => None,
        }
    }

    /// JSON form of the message, used when writing artifacts.
    pub fn to_value(&self) -> Value {
        match self {
            StreamMessage::Result(message) if !message.raw.is_null() => message.raw.clone(),
            StreamMessage::Result(message) => {
                let mut value = serde_json::to_value(message).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut value {
                    map.retain(|_, v| !v.is_null());
                    map.insert("type".to_string(), Value::String("result".to_string()));
                }
                value
            }
            StreamMessage::Assistant(message) => message.raw.clone(),
            StreamMessage::Other { raw, .. } => raw.clone(),
        }
    }
}

/// A way of recovering messages from raw output. `None` means "not applicable".
pub type ExtractionStrategy = fn(&str) -> Option<Vec<StreamMessage>>;

/// Strategies in the order they are tried.
pub const STRATEGIES: &[(&str, ExtractionStrategy)] = &[
    ("line-delimited", decode_lines),
    ("fenced-json", decode_fenced_json),
];

/// Decode raw output with the first strategy that yields messages.
pub fn decode_stream(content: &str) -> Vec<StreamMessage> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    for (name, strategy) in STRATEGIES {
        if let Some(messages) = strategy(content) {
            tracing::debug!(strategy = name, count = messages.len(), "decoded agent output");
            return messages;
        }
    }

    tracing::debug!("no decoding strategy matched agent output");
    Vec::new()
}

/// The last `result` message, if any.
pub fn last_result(messages: &[StreamMessage]) -> Option<&ResultMessage> {
    messages.iter().rev().find_map(StreamMessage::as_result)
}

/// One JSON object per line; undecodable or untyped lines are skipped.
pub fn decode_lines(content: &str) -> Option<Vec<StreamMessage>> {
    let messages: Vec<StreamMessage> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(StreamMessage::parse_line)
        .collect();

    (!messages.is_empty()).then_some(messages)
}

/// The last fenced JSON object block, synthesized into a successful result.
pub fn decode_fenced_json(content: &str) -> Option<Vec<StreamMessage>> {
    let block = FENCED_JSON_REGEX
        .captures_iter(content)
        .last()?
        .get(1)?
        .as_str();

    match serde_json::from_str::<Value>(block) {
        Ok(object) => Some(vec![StreamMessage::Result(ResultMessage {
            raw: serde_json::json!({
                "type": "result",
                "result": object.clone(),
                "is_error": false,
            }),
            result: Some(object),
            is_error: false,
            ..Default::default()
        })]),
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse fenced JSON block");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::success_stream;
    use serde_json::json;

    #[test]
    fn test_decode_lines_classifies_messages() {
        let messages = decode_stream(&success_stream("OK", "sess-1"));

        let kinds: Vec<&str> = messages.iter().map(StreamMessage::kind).collect();
        assert_eq!(kinds, vec!["system", "assistant", "result"]);

        let result = last_result(&messages).unwrap();
        assert_eq!(result.result_text(), "OK");
        assert_eq!(result.session_id.as_deref(), Some("sess-1"));
        assert!(!result.is_error);
    }

    #[test]
    fn test_lines_without_type_are_skipped() {
        let content = "not json\n{\"foo\": 1}\n[1,2]\n{\"type\": 5}\n{\"type\":\"user\"}\n";
        let messages = decode_stream(content);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), "user");
    }

    #[test]
    fn test_last_result_wins() {
        let content = concat!(
            "{\"type\":\"result\",\"is_error\":true,\"result\":\"first\"}\n",
            "{\"type\":\"result\",\"is_error\":false,\"result\":\"second\"}\n",
        );
        let messages = decode_stream(content);

        let result = last_result(&messages).unwrap();
        assert_eq!(result.result_text(), "second");
        assert!(!result.is_error);
    }

    #[test]
    fn test_fenced_json_fallback_uses_last_block() {
        let content = "Here is the plan:\n```json\n{\"step\": 1}\n```\nand finally\n```json\n{\"issue_class\": \"/bug\"}\n```\n";
        let messages = decode_stream(content);

        assert_eq!(messages.len(), 1);
        let result = last_result(&messages).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.result, Some(json!({"issue_class": "/bug"})));
    }

    #[test]
    fn test_fenced_json_not_tried_when_lines_decode() {
        let content = "{\"type\":\"assistant\",\"message\":{\"content\":[]}}\n```json\n{\"a\": 1}\n```\n";
        let messages = decode_stream(content);

        assert_eq!(messages.len(), 1);
        assert!(last_result(&messages).is_none());
    }

    #[test]
    fn test_invalid_fenced_json_yields_nothing() {
        assert!(decode_stream("```json\n{not valid}\n```").is_empty());
    }

    #[test]
    fn test_empty_content_yields_nothing() {
        assert!(decode_stream("").is_empty());
        assert!(decode_stream("\n  \n").is_empty());
    }

    #[test]
    fn test_result_text_formats_payloads() {
        let mut message = ResultMessage::default();
        assert_eq!(message.result_text(), "");

        message.result = Some(json!({"a": 1}));
        assert_eq!(message.result_text(), "{\n  \"a\": 1\n}");

        message.result = Some(json!(42));
        assert_eq!(message.result_text(), "42");

        message.result = Some(Value::Null);
        assert_eq!(message.result_text(), "");
    }

    #[test]
    fn test_assistant_first_text() {
        let message = StreamMessage::parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hello"},{"type":"text","text":"x"}]}}"#,
        )
        .unwrap();

        assert_eq!(message.as_assistant().unwrap().first_text(), Some("hello"));
    }

    #[test]
    fn test_result_with_mistyped_fields_is_opaque() {
        let message = StreamMessage::parse_line(r#"{"type":"result","is_error":"yes"}"#).unwrap();

        assert!(message.as_result().is_none());
        assert_eq!(message.kind(), "result");
    }

    #[test]
    fn test_result_metadata_of_any_type_is_accepted() {
        let line = r#"{"type":"result","is_error":false,"result":"ok","duration_ms":12.5,"num_turns":"2"}"#;
        let message = StreamMessage::parse_line(line).unwrap();

        let result = message.as_result().unwrap();
        assert_eq!(result.result_text(), "ok");
        assert_eq!(result.duration_ms, Some(serde_json::json!(12.5)));
        assert_eq!(result.num_turns, Some(serde_json::json!("2")));
    }

    #[test]
    fn test_to_value_keeps_raw_lines() {
        let line = r#"{"type":"system","subtype":"init","tools":["Bash"]}"#;
        let message = StreamMessage::parse_line(line).unwrap();

        assert_eq!(message.to_value(), serde_json::from_str::<Value>(line).unwrap());
    }

    #[test]
    fn test_fenced_result_serializes_as_result_message() {
        let messages = decode_stream("```json\n{\"ok\": true}\n```");

        assert_eq!(
            messages[0].to_value(),
            json!({"type": "result", "result": {"ok": true}, "is_error": false})
        );
    }
}
