//! Boundary-aware truncation of agent text for logs and error messages.

use super::stream::StreamMessage;

/// Marker appended to truncated text.
pub const TRUNCATION_SUFFIX: &str = "... (truncated)";

/// How far back from the cut point to look for a newline.
const NEWLINE_WINDOW: usize = 50;

/// How far back from the cut point to look for a space.
const SPACE_WINDOW: usize = 20;

/// Truncate `output` to at most `max_length` characters with the default suffix.
pub fn truncate(output: &str, max_length: usize) -> String {
    truncate_output(output, max_length, TRUNCATION_SUFFIX)
}

/// Truncate `output` to at most `max_length` characters including `suffix`.
///
/// Raw stream output (several `{"type":...}` lines) is reduced to the last
/// result or assistant text first, so error messages never carry stream
/// blobs. Otherwise the cut prefers a newline within the 50 characters
/// before the cut point, then a space within 20, then a hard cut.
pub fn truncate_output(output: &str, max_length: usize, suffix: &str) -> String {
    if looks_like_stream(output) {
        return truncate_stream(output, max_length, suffix);
    }

    let chars: Vec<char> = output.chars().collect();
    if chars.len() <= max_length {
        return output.to_string();
    }

    let cut = max_length.saturating_sub(suffix.chars().count());
    let head = |end: usize| chars[..end].iter().collect::<String>();

    if let Some(pos) = rfind_char(&chars, '\n', cut.saturating_sub(NEWLINE_WINDOW), cut)
        && pos > 0
    {
        return format!("{}{}", head(pos), suffix);
    }

    if let Some(pos) = rfind_char(&chars, ' ', cut.saturating_sub(SPACE_WINDOW), cut)
        && pos > 0
    {
        return format!("{}{}", head(pos), suffix);
    }

    format!("{}{}", head(cut), suffix)
}

fn looks_like_stream(output: &str) -> bool {
    output.starts_with("{\"type\":") && output.contains("\n{\"type\":")
}

fn truncate_stream(output: &str, max_length: usize, suffix: &str) -> String {
    let lines: Vec<&str> = output.trim().split('\n').collect();

    for line in lines.iter().rev() {
        let text = match StreamMessage::parse_line(line) {
            Some(StreamMessage::Result(result)) => result
                .result
                .as_ref()
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            Some(StreamMessage::Assistant(assistant)) => {
                assistant.first_text().map(str::to_string)
            }
            _ => None,
        };

        if let Some(text) = text {
            return truncate_output(&text, max_length, suffix);
        }
    }

    format!("[JSONL output with {} messages]{}", lines.len(), suffix)
}

/// Last index of `needle` in `chars[start..end]`.
fn rfind_char(chars: &[char], needle: char, start: usize, end: usize) -> Option<usize> {
    (start..end.min(chars.len())).rev().find(|&i| chars[i] == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        assert_eq!(truncate("all good", 500), "all good");
        let exact = "a".repeat(500);
        assert_eq!(truncate(&exact, 500), exact);
    }

    #[test]
    fn test_long_error_is_cut_near_800() {
        let text = "word ".repeat(240);
        let truncated = truncate(&text, 800);

        assert!(truncated.chars().count() <= 800);
        assert!(truncated.chars().count() > 700);
        assert!(truncated.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_prefers_newline_boundary() {
        let text = format!("{}\n{}", "a".repeat(70), "b".repeat(100));
        let truncated = truncate_output(&text, 100, "...");

        assert_eq!(truncated, format!("{}...", "a".repeat(70)));
    }

    #[test]
    fn test_falls_back_to_space_boundary() {
        let text = format!("{} {}", "a".repeat(90), "b".repeat(100));
        let truncated = truncate_output(&text, 100, "...");

        assert_eq!(truncated, format!("{}...", "a".repeat(90)));
    }

    #[test]
    fn test_hard_cut_without_boundary() {
        let text = "x".repeat(200);
        let truncated = truncate_output(&text, 100, "...");

        assert_eq!(truncated, format!("{}...", "x".repeat(97)));
    }

    #[test]
    fn test_never_splits_multibyte_chars() {
        let text = "é".repeat(300);
        let truncated = truncate_output(&text, 100, "…");

        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.starts_with('é'));
    }

    #[test]
    fn test_stream_output_reduced_to_last_text() {
        let stream = concat!(
            "{\"type\":\"system\",\"subtype\":\"init\"}\n",
            "{\"type\":\"assistant\",\"message\":{\"content\":[{\"type\":\"text\",\"text\":\"thinking\"}]}}\n",
            "{\"type\":\"result\",\"result\":\"Build failed: missing dependency\"}\n",
        );

        assert_eq!(truncate(stream, 500), "Build failed: missing dependency");
    }

    #[test]
    fn test_stream_output_without_text_is_summarized() {
        let stream = "{\"type\":\"system\"}\n{\"type\":\"user\"}\n{\"type\":\"system\"}";

        assert_eq!(
            truncate(stream, 500),
            "[JSONL output with 3 messages]... (truncated)"
        );
    }
}
