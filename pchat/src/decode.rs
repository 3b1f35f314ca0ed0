//! Turning backend replies into [`GenerationResponse`] values.
//!
//! Reasoning text can arrive in a dedicated `thinking` field or inline as a
//! `<think>...</think>` span inside the content. The dedicated field wins; the
//! inline span is always removed from the visible content, together with the
//! whitespace that directly follows it. Content without spans is kept verbatim.
//!
//! ```rust
//! use pbackend::ChatResponse;
//! use pchat::decode_response;
//! use serde_json::json;
//!
//! let reply = ChatResponse::from_value(json!({
//!     "message": {"role": "assistant", "content": "<think>2+2=4</think>\n\nFour."},
//!     "done": true
//! }));
//!
//! let decoded = decode_response(&reply, "qwen3");
//! assert_eq!(decoded.content, "Four.");
//! assert_eq!(decoded.thinking.as_deref(), Some("2+2=4"));
//! ```

use pbackend::ChatResponse;

use crate::{GenerationResponse, TokenUsage};

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

pub fn decode_response(response: &ChatResponse, model: &str) -> GenerationResponse {
    let (content, inline_thinking) = extract_thinking(response.content().unwrap_or_default());
    let thinking = non_empty(response.thinking().unwrap_or_default().trim())
        .or_else(|| inline_thinking.as_deref().map(str::trim).and_then(non_empty));

    let mut decoded = base_response(response, model);
    decoded.content = content;
    decoded.thinking = thinking;
    decoded
}

/// Splits every complete `<think>` span out of `content`.
///
/// Returns the content with the spans removed and the concatenated span
/// bodies. Whitespace right after a removed span goes with it. An
/// unterminated opening tag is left in place.
pub fn extract_thinking(content: &str) -> (String, Option<String>) {
    let mut visible = String::with_capacity(content.len());
    let mut thoughts: Vec<&str> = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find(THINK_OPEN) {
        let after_open = &rest[start + THINK_OPEN.len()..];
        let Some(end) = after_open.find(THINK_CLOSE) else {
            break;
        };

        visible.push_str(&rest[..start]);
        thoughts.push(&after_open[..end]);
        rest = after_open[end + THINK_CLOSE.len()..].trim_start();
    }
    visible.push_str(rest);

    if thoughts.is_empty() {
        (visible, None)
    } else {
        (visible, Some(thoughts.join("\n")))
    }
}

/// Routes streamed text inside `<think>` ... `</think>` to thinking.
///
/// Tags are expected whole within a single chunk; an open span may run
/// across any number of chunks. Whitespace following a closed span is
/// dropped up to the next visible character, so the concatenated deltas
/// match [`extract_thinking`].
#[derive(Debug, Clone, Default)]
pub struct ThinkSplitter {
    inside: bool,
    after_span: bool,
}

impl ThinkSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Returns `(visible, thinking)` for one chunk of text.
    pub fn split(&mut self, text: &str) -> (String, String) {
        let mut visible = String::new();
        let mut thinking = String::new();
        let mut rest = text;

        while !rest.is_empty() {
            if self.inside {
                match rest.find(THINK_CLOSE) {
                    Some(end) => {
                        thinking.push_str(&rest[..end]);
                        rest = &rest[end + THINK_CLOSE.len()..];
                        self.inside = false;
                        self.after_span = true;
                    }
                    None => {
                        thinking.push_str(rest);
                        rest = "";
                    }
                }
            } else {
                match rest.find(THINK_OPEN) {
                    Some(start) => {
                        self.push_visible(&mut visible, &rest[..start]);
                        rest = &rest[start + THINK_OPEN.len()..];
                        self.inside = true;
                    }
                    None => {
                        self.push_visible(&mut visible, rest);
                        rest = "";
                    }
                }
            }
        }

        (visible, thinking)
    }

    /// Decodes one streamed chunk into a delta.
    pub fn decode_chunk(&mut self, chunk: &ChatResponse, model: &str) -> GenerationResponse {
        let (content, inline_thinking) = self.split(chunk.content().unwrap_or_default());
        let mut thinking = chunk.thinking().unwrap_or_default().to_string();
        thinking.push_str(&inline_thinking);

        let mut delta = base_response(chunk, model);
        delta.content = content;
        delta.thinking = non_empty(&thinking);
        delta
    }

    fn push_visible(&mut self, visible: &mut String, text: &str) {
        if !self.after_span {
            visible.push_str(text);
            return;
        }

        let trimmed = text.trim_start();
        if !trimmed.is_empty() {
            self.after_span = false;
            visible.push_str(trimmed);
        }
    }
}

fn base_response(response: &ChatResponse, model: &str) -> GenerationResponse {
    let tool_calls = response.tool_calls();
    let usage = if response.prompt_eval_count.is_some() || response.eval_count.is_some() {
        Some(TokenUsage {
            prompt_tokens: response.prompt_eval_count.unwrap_or_default(),
            completion_tokens: response.eval_count.unwrap_or_default(),
        })
    } else {
        None
    };

    let mut decoded = GenerationResponse::new(response.model.as_deref().unwrap_or(model), "");
    decoded.tool_calls = if tool_calls.is_empty() {
        None
    } else {
        Some(tool_calls.to_vec())
    };
    decoded.done = response.is_done();
    decoded.finish_reason = response.done_reason.clone();
    decoded.usage = usage;
    decoded.raw_response = Some(response.raw.clone());
    decoded
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pbackend::ChatResponse;
    use serde_json::json;

    use super::*;

    fn reply(message: serde_json::Value) -> ChatResponse {
        ChatResponse::from_value(json!({"model": "qwen3", "message": message, "done": true}))
    }

    #[test]
    fn inline_think_span_is_extracted_and_stripped() {
        let decoded = decode_response(
            &reply(json!({"content": "<think>Let me add.</think>The answer is 8."})),
            "fallback",
        );

        assert_eq!(decoded.content, "The answer is 8.");
        assert_eq!(decoded.thinking.as_deref(), Some("Let me add."));
        assert_eq!(decoded.model, "qwen3");
    }

    #[test]
    fn dedicated_field_wins_but_span_is_still_stripped() {
        let decoded = decode_response(
            &reply(json!({
                "content": "<think>inline</think> visible ",
                "thinking": "  dedicated  "
            })),
            "m",
        );

        assert_eq!(decoded.content, "visible ");
        assert_eq!(decoded.thinking.as_deref(), Some("dedicated"));
    }

    #[test]
    fn plain_reply_has_no_thinking_and_no_tool_calls() {
        let decoded = decode_response(&reply(json!({"content": "Hello"})), "m");

        assert_eq!(decoded.content, "Hello");
        assert_eq!(decoded.thinking, None);
        assert_eq!(decoded.tool_calls, None);
        assert!(decoded.done);
    }

    #[test]
    fn content_without_spans_keeps_its_whitespace() {
        let code = "Here is code:\n```\nfn main() {}\n```\n";
        let decoded = decode_response(&reply(json!({"content": code})), "m");
        assert_eq!(decoded.content, code);

        let indented = decode_response(&reply(json!({"content": "  - item\n"})), "m");
        assert_eq!(indented.content, "  - item\n");
    }

    #[test]
    fn text_before_a_span_and_trailing_newlines_survive() {
        let (visible, thinking) = extract_thinking("Intro\n<think>x</think>\n\nBody\n");
        assert_eq!(visible, "Intro\nBody\n");
        assert_eq!(thinking.as_deref(), Some("x"));
    }

    #[test]
    fn usage_and_finish_reason_come_from_the_reply() {
        let response = ChatResponse::from_value(json!({
            "message": {"content": "ok"},
            "done": true,
            "done_reason": "length",
            "prompt_eval_count": 9,
            "eval_count": 3
        }));
        let decoded = decode_response(&response, "llama3.2");

        assert_eq!(decoded.model, "llama3.2");
        assert_eq!(decoded.finish_reason.as_deref(), Some("length"));
        assert_eq!(
            decoded.usage,
            Some(TokenUsage {
                prompt_tokens: 9,
                completion_tokens: 3
            })
        );
        assert_eq!(decoded.raw_response, Some(response.raw.clone()));
    }

    #[test]
    fn missing_message_decodes_to_empty_content() {
        let decoded = decode_response(&ChatResponse::from_value(json!({"done": false})), "m");
        assert_eq!(decoded.content, "");
        assert_eq!(decoded.usage, None);
        assert!(!decoded.done);
    }

    #[test]
    fn extract_handles_multiple_and_unterminated_spans() {
        let (visible, thinking) = extract_thinking("<think>a</think>x<think>b</think>y");
        assert_eq!(visible, "xy");
        assert_eq!(thinking.as_deref(), Some("a\nb"));

        let (visible, thinking) = extract_thinking("x<think>never closed");
        assert_eq!(visible, "x<think>never closed");
        assert_eq!(thinking, None);
    }

    #[test]
    fn splitter_tracks_spans_across_chunks() {
        let mut splitter = ThinkSplitter::new();

        assert_eq!(splitter.split("<think>step one"), (String::new(), "step one".to_string()));
        assert!(splitter.is_inside());
        assert_eq!(splitter.split(", step two"), (String::new(), ", step two".to_string()));
        assert_eq!(
            splitter.split("</think>\n\nAnswer"),
            ("Answer".to_string(), String::new())
        );
        assert_eq!(splitter.split(" is 4."), (" is 4.".to_string(), String::new()));
    }

    #[test]
    fn streamed_deltas_concatenate_to_one_shot_content() {
        let chunks = ["<think>hmm", "</think>", "\nThe ", "answer", " is 8."];
        let mut splitter = ThinkSplitter::new();
        let mut content = String::new();
        let mut thinking = String::new();

        for chunk in chunks {
            let delta = splitter.decode_chunk(
                &ChatResponse::from_value(json!({"message": {"content": chunk}})),
                "m",
            );
            content.push_str(&delta.content);
            thinking.push_str(delta.thinking.as_deref().unwrap_or_default());
        }

        let one_shot = decode_response(
            &ChatResponse::from_value(json!({"message": {"content": chunks.concat()}})),
            "m",
        );
        assert_eq!(content, one_shot.content);
        assert_eq!(thinking, "hmm");
    }

    #[test]
    fn streamed_whitespace_matches_one_shot_content() {
        let cases: [&[&str]; 3] = [
            &["Line one\n", "Line two\n"],
            &["  indented", " start\n\n"],
            &["Intro ", "<think>a</think>", "  ", "\nBody", "\n"],
        ];

        for chunks in cases {
            let mut splitter = ThinkSplitter::new();
            let streamed: String = chunks
                .iter()
                .map(|chunk| splitter.split(chunk).0)
                .collect();

            let one_shot = decode_response(
                &ChatResponse::from_value(json!({"message": {"content": chunks.concat()}})),
                "m",
            );
            assert_eq!(streamed, one_shot.content, "chunks: {chunks:?}");
        }
    }
}
