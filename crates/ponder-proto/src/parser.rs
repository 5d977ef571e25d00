//! Frame decoding
//!
//! A frame is one JSON object with a `type` discriminator. Decoding is a
//! soft-fail boundary: anything that does not decode into a [`StreamEvent`]
//! is logged and skipped so a corrupt frame never aborts the turn.

use serde::Deserialize;
use serde_json::Value;

use crate::event::StreamEvent;

/// Frame kinds this client understands
const KNOWN_KINDS: &[&str] = &[
    "plan",
    "thought",
    "step",
    "tool_call",
    "final_answer",
    "error",
];

/// Wire shape of a frame, before normalization
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireFrame {
    Plan {
        #[serde(default)]
        content: String,
    },
    Thought {
        #[serde(default)]
        content: String,
    },
    Step {
        #[serde(default)]
        step: Option<i64>,
        #[serde(default)]
        index: Option<i64>,
        #[serde(default)]
        thought: String,
        #[serde(default)]
        action: String,
        #[serde(default)]
        observation: Value,
    },
    /// Emitted by backends that report raw tool invocations
    ToolCall {
        #[serde(default)]
        step: Option<i64>,
        #[serde(default)]
        tool: String,
        #[serde(default)]
        arguments: Value,
        #[serde(default)]
        result: Value,
    },
    FinalAnswer {
        #[serde(default)]
        content: String,
    },
    Error {
        #[serde(default)]
        content: String,
    },
}

impl From<WireFrame> for StreamEvent {
    fn from(frame: WireFrame) -> Self {
        match frame {
            WireFrame::Plan { content } => StreamEvent::Plan { content },
            WireFrame::Thought { content } => StreamEvent::Thought { content },
            WireFrame::Step {
                step,
                index,
                thought,
                action,
                observation,
            } => StreamEvent::Step {
                index: normalize_index(index.or(step)),
                thought,
                action,
                observation: value_to_text(observation),
            },
            WireFrame::ToolCall {
                step,
                tool,
                arguments,
                result,
            } => StreamEvent::Step {
                index: normalize_index(step),
                thought: String::new(),
                action: format!("{}({})", tool, value_to_text(arguments)),
                observation: value_to_text(result),
            },
            WireFrame::FinalAnswer { content } => StreamEvent::FinalAnswer { content },
            WireFrame::Error { content } => StreamEvent::Error { content },
        }
    }
}

fn normalize_index(index: Option<i64>) -> u32 {
    match index {
        Some(i) if i >= 1 => u32::try_from(i).unwrap_or(u32::MAX),
        _ => 1,
    }
}

/// Strings pass through; structured values are re-serialized so the
/// observation formatter can pretty-print them later.
fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Decode one raw frame.
///
/// Returns `None` for blank input, malformed JSON, a missing or unknown
/// `type`, or fields of the wrong shape.
pub fn parse_frame(raw: &str) -> Option<StreamEvent> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Skipping malformed frame ({}): {}", e, preview(raw));
            return None;
        }
    };

    let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
        tracing::warn!("Skipping frame without a type: {}", preview(raw));
        return None;
    };

    if !KNOWN_KINDS.contains(&kind.as_str()) {
        tracing::warn!("Skipping frame of unrecognized type '{}'", kind);
        return None;
    }

    match serde_json::from_value::<WireFrame>(value) {
        Ok(frame) => {
            let event = StreamEvent::from(frame);
            tracing::debug!("Decoded {} frame", event.kind());
            Some(event)
        }
        Err(e) => {
            tracing::warn!("Skipping {} frame with invalid fields: {}", kind, e);
            None
        }
    }
}

fn preview(raw: &str) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(120).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Incremental newline splitter for a chunked response body.
///
/// Bytes are split on `\n` before UTF-8 decoding, so a multi-byte character
/// split across chunks is reassembled intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of body bytes
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Flush whatever is left once the body has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_thought() {
        let event = parse_frame(r#"{"type":"thought","content":"need to search"}"#);
        assert_eq!(
            event,
            Some(StreamEvent::Thought {
                content: "need to search".into()
            })
        );
    }

    #[test]
    fn test_parse_step_uses_step_key_as_index() {
        let event = parse_frame(
            r#"{"type":"step","step":3,"thought":"t","action":"search(x)","observation":"found"}"#,
        );
        assert_eq!(
            event,
            Some(StreamEvent::Step {
                index: 3,
                thought: "t".into(),
                action: "search(x)".into(),
                observation: "found".into(),
            })
        );
    }

    #[test]
    fn test_parse_step_index_key_and_defaults() {
        let event = parse_frame(r#"{"type":"step","index":7}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Step {
                index: 7,
                thought: String::new(),
                action: String::new(),
                observation: String::new(),
            }
        );

        let event = parse_frame(r#"{"type":"step","step":0,"action":"a"}"#).unwrap();
        assert!(matches!(event, StreamEvent::Step { index: 1, .. }));
    }

    #[test]
    fn test_parse_step_structured_observation() {
        let event =
            parse_frame(r#"{"type":"step","step":1,"observation":{"result":{"x":1}}}"#).unwrap();
        match event {
            StreamEvent::Step { observation, .. } => {
                assert_eq!(observation, r#"{"result":{"x":1}}"#);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_tool_call_normalizes_to_step() {
        let event = parse_frame(
            r#"{"type":"tool_call","step":2,"tool":"search","arguments":"{\"q\":\"rust\"}","result":{"tool":"search","status":"success","result":"ok"}}"#,
        )
        .unwrap();
        match event {
            StreamEvent::Step {
                index,
                thought,
                action,
                observation,
            } => {
                assert_eq!(index, 2);
                assert!(thought.is_empty());
                assert_eq!(action, r#"search({"q":"rust"})"#);
                assert!(observation.contains("\"status\":\"success\""));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_terminal_frames_ignore_extra_fields() {
        assert_eq!(
            parse_frame(r#"{"type":"final_answer","step":4,"content":"42"}"#),
            Some(StreamEvent::final_answer("42"))
        );
        assert_eq!(
            parse_frame(r#"{"type":"error","content":"gave up"}"#),
            Some(StreamEvent::error("gave up"))
        );
    }

    #[test]
    fn test_skip_malformed_and_unknown() {
        assert_eq!(parse_frame(""), None);
        assert_eq!(parse_frame("   "), None);
        assert_eq!(parse_frame("{not json"), None);
        assert_eq!(parse_frame(r#"["type","thought"]"#), None);
        assert_eq!(parse_frame(r#"{"content":"no type"}"#), None);
        assert_eq!(parse_frame(r#"{"type":"heartbeat"}"#), None);
        assert_eq!(parse_frame(r#"{"type":"thought","content":5}"#), None);
    }

    #[test]
    fn test_wrong_field_shape_skipped_then_next_frame_decodes() {
        assert_eq!(parse_frame(r#"{"type":"step","step":"two","action":"a"}"#), None);
        assert_eq!(
            parse_frame(r#"{"type":"step","step":2,"action":"a"}"#),
            Some(StreamEvent::Step {
                index: 2,
                thought: String::new(),
                action: "a".into(),
                observation: String::new(),
            })
        );
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut lines = LineBuffer::new();
        lines.push(b"{\"a\":1}\n{\"b\"");
        assert_eq!(lines.next_line().as_deref(), Some("{\"a\":1}"));
        assert_eq!(lines.next_line(), None);
        lines.push(b":2}\r\n");
        assert_eq!(lines.next_line().as_deref(), Some("{\"b\":2}"));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_line_buffer_multibyte_split() {
        let text = "{\"content\":\"世界\"}\n".as_bytes();
        let mut lines = LineBuffer::new();
        lines.push(&text[..13]);
        assert_eq!(lines.next_line(), None);
        lines.push(&text[13..]);
        assert_eq!(lines.next_line().as_deref(), Some("{\"content\":\"世界\"}"));
    }

    #[test]
    fn test_line_buffer_finish_returns_trailing_frame() {
        let mut lines = LineBuffer::new();
        lines.push(b"{\"type\":\"final_answer\",\"content\":\"x\"}");
        assert_eq!(lines.next_line(), None);
        assert_eq!(
            lines.finish().as_deref(),
            Some("{\"type\":\"final_answer\",\"content\":\"x\"}")
        );
        assert_eq!(lines.finish(), None);
    }
}
