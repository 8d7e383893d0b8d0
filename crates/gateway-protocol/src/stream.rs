//! Streaming `OpenAI` -> Claude SSE conversion. Holds per-stream state; one
//! instance is owned by the handler for the lifetime of a single proxied
//! stream.

use std::collections::HashMap;

use crate::claude::{
    ClaudeMessageDelta, ClaudeResponseBlock, ClaudeStreamContentBlock, ClaudeStreamDelta, ClaudeStreamEvent,
    ClaudeStreamMessage, ClaudeUsage,
};
use crate::openai::OpenAiStreamChunk;

fn finish_reason_to_stop_reason(finish_reason: &str) -> &'static str {
    match finish_reason {
        "stop" => "end_turn",
        "length" => "max_tokens",
        "tool_calls" => "tool_use",
        "content_filter" => "end_turn",
        _ => "end_turn",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    ToolUse,
}

struct ToolCallEntry {
    claude_index: u32,
}

/// Accumulates state across one `OpenAI` stream and emits Claude SSE events.
pub struct StreamConverter {
    message_started: bool,
    current_block_index: i64,
    block_open: bool,
    current_kind: Option<BlockKind>,
    tool_calls: HashMap<u32, ToolCallEntry>,
    message_delta_emitted: bool,
    stream_done: bool,
}

impl Default for StreamConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamConverter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            message_started: false,
            current_block_index: -1,
            block_open: false,
            current_kind: None,
            tool_calls: HashMap::new(),
            message_delta_emitted: false,
            stream_done: false,
        }
    }

    /// Convert one parsed `OpenAI` stream chunk into zero or more Claude
    /// events, in emission order.
    pub fn convert_chunk(&mut self, chunk: &OpenAiStreamChunk) -> Vec<ClaudeStreamEvent> {
        let mut events = Vec::new();

        if !self.message_started {
            self.message_started = true;
            events.push(ClaudeStreamEvent::MessageStart {
                message: ClaudeStreamMessage {
                    id: crate::convert::openai_id_to_claude_id(&chunk.id),
                    message_type: "message".to_owned(),
                    role: "assistant".to_owned(),
                    model: chunk.model.clone(),
                    content: Vec::<ClaudeResponseBlock>::new(),
                    usage: ClaudeUsage { input_tokens: 0, output_tokens: 0 },
                },
            });
        }

        let Some(choice) = chunk.choices.first() else {
            return events;
        };

        if let Some(text) = &choice.delta.content
            && !text.is_empty()
        {
            if self.current_kind != Some(BlockKind::Text) || !self.block_open {
                self.close_open_block(&mut events);
                self.current_block_index += 1;
                self.current_kind = Some(BlockKind::Text);
                self.block_open = true;
                events.push(ClaudeStreamEvent::ContentBlockStart {
                    index: self.block_index(),
                    content_block: ClaudeStreamContentBlock::Text { text: String::new() },
                });
            }
            events.push(ClaudeStreamEvent::ContentBlockDelta {
                index: self.block_index(),
                delta: ClaudeStreamDelta::TextDelta { text: text.clone() },
            });
        }

        if let Some(tool_calls) = &choice.delta.tool_calls {
            for tc in tool_calls {
                if !self.tool_calls.contains_key(&tc.index) {
                    self.close_open_block(&mut events);
                    self.current_block_index += 1;
                    self.current_kind = Some(BlockKind::ToolUse);
                    self.block_open = true;
                    let claude_index = self.block_index();
                    self.tool_calls.insert(tc.index, ToolCallEntry { claude_index });

                    let id = tc.id.clone().unwrap_or_default();
                    let name = tc.function.as_ref().and_then(|f| f.name.clone()).unwrap_or_default();
                    events.push(ClaudeStreamEvent::ContentBlockStart {
                        index: claude_index,
                        content_block: ClaudeStreamContentBlock::ToolUse { id, name, input: serde_json::json!({}) },
                    });
                }

                let claude_index = self.tool_calls.get(&tc.index).map_or(self.block_index(), |e| e.claude_index);

                if let Some(func) = &tc.function
                    && let Some(args) = &func.arguments
                    && !args.is_empty()
                {
                    events.push(ClaudeStreamEvent::ContentBlockDelta {
                        index: claude_index,
                        delta: ClaudeStreamDelta::InputJsonDelta { partial_json: args.clone() },
                    });
                }
            }
        }

        if let Some(finish_reason) = &choice.finish_reason {
            self.close_open_block(&mut events);
            self.message_delta_emitted = true;
            events.push(ClaudeStreamEvent::MessageDelta {
                delta: ClaudeMessageDelta { stop_reason: Some(finish_reason_to_stop_reason(finish_reason).to_owned()), stop_sequence: None },
                usage: chunk
                    .usage
                    .as_ref()
                    .map(|u| ClaudeUsage { input_tokens: u.prompt_tokens, output_tokens: u.completion_tokens }),
            });
        }

        events
    }

    /// Finalize the stream: close any open block and emit `message_delta`
    /// (if not already emitted) followed by `message_stop`.
    pub fn finish(&mut self) -> Vec<ClaudeStreamEvent> {
        if self.stream_done {
            return Vec::new();
        }
        self.stream_done = true;

        let mut events = Vec::new();
        self.close_open_block(&mut events);
        if !self.message_delta_emitted {
            events.push(ClaudeStreamEvent::MessageDelta {
                delta: ClaudeMessageDelta { stop_reason: None, stop_sequence: None },
                usage: None,
            });
        }
        events.push(ClaudeStreamEvent::MessageStop);
        events
    }

    fn close_open_block(&mut self, events: &mut Vec<ClaudeStreamEvent>) {
        if self.block_open {
            events.push(ClaudeStreamEvent::ContentBlockStop { index: self.block_index() });
            self.block_open = false;
        }
    }

    fn block_index(&self) -> u32 {
        u32::try_from(self.current_block_index.max(0)).unwrap_or(0)
    }
}

/// Render one Claude SSE event as `event: <type>\ndata: <json>\n\n`.
///
/// # Errors
/// Returns an error if the event cannot be serialized as JSON.
pub fn render_sse_event(event: &ClaudeStreamEvent) -> Result<String, serde_json::Error> {
    let event_type = match event {
        ClaudeStreamEvent::MessageStart { .. } => "message_start",
        ClaudeStreamEvent::ContentBlockStart { .. } => "content_block_start",
        ClaudeStreamEvent::ContentBlockDelta { .. } => "content_block_delta",
        ClaudeStreamEvent::ContentBlockStop { .. } => "content_block_stop",
        ClaudeStreamEvent::MessageDelta { .. } => "message_delta",
        ClaudeStreamEvent::MessageStop => "message_stop",
        ClaudeStreamEvent::Ping => "ping",
    };
    let body = serde_json::to_string(event)?;
    Ok(format!("event: {event_type}\ndata: {body}\n\n"))
}

/// Parse a raw SSE frame (everything up to a blank-line delimiter) into its
/// joined `data:` payload. Returns `None` for the literal `[DONE]` sentinel
/// or a frame carrying no `data:` line.
#[must_use]
pub fn extract_sse_data(frame: &str) -> Option<String> {
    let mut lines = Vec::new();
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            lines.push(rest.trim_start());
        }
    }
    if lines.is_empty() {
        return None;
    }
    let joined = lines.join("");
    if joined.trim() == "[DONE]" {
        return None;
    }
    Some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::{OpenAiStreamChoice, OpenAiStreamDelta, OpenAiStreamFunctionCall, OpenAiStreamToolCall};

    fn chunk(delta: OpenAiStreamDelta, finish_reason: Option<&str>) -> OpenAiStreamChunk {
        OpenAiStreamChunk {
            id: "chatcmpl-abc".to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created: 0,
            model: "gpt-4o".to_owned(),
            choices: vec![OpenAiStreamChoice { index: 0, delta, finish_reason: finish_reason.map(ToOwned::to_owned) }],
            usage: None,
        }
    }

    #[test]
    fn first_chunk_emits_message_start() {
        let mut conv = StreamConverter::new();
        let events = conv.convert_chunk(&chunk(OpenAiStreamDelta { role: Some("assistant".to_owned()), ..Default::default() }, None));
        assert!(matches!(events[0], ClaudeStreamEvent::MessageStart { .. }));
    }

    #[test]
    fn text_delta_opens_then_streams_block() {
        let mut conv = StreamConverter::new();
        conv.convert_chunk(&chunk(OpenAiStreamDelta::default(), None));
        let events = conv.convert_chunk(&chunk(OpenAiStreamDelta { content: Some("hi".to_owned()), ..Default::default() }, None));
        assert!(matches!(events[0], ClaudeStreamEvent::ContentBlockStart { index: 0, .. }));
        assert!(matches!(events[1], ClaudeStreamEvent::ContentBlockDelta { index: 0, .. }));
    }

    #[test]
    fn tool_call_after_text_closes_text_block_first() {
        let mut conv = StreamConverter::new();
        conv.convert_chunk(&chunk(OpenAiStreamDelta::default(), None));
        conv.convert_chunk(&chunk(OpenAiStreamDelta { content: Some("thinking".to_owned()), ..Default::default() }, None));
        let events = conv.convert_chunk(&chunk(
            OpenAiStreamDelta {
                tool_calls: Some(vec![OpenAiStreamToolCall {
                    index: 0,
                    id: Some("call_1".to_owned()),
                    tool_type: Some("function".to_owned()),
                    function: Some(OpenAiStreamFunctionCall { name: Some("lookup".to_owned()), arguments: None }),
                }]),
                ..Default::default()
            },
            None,
        ));
        assert!(matches!(events[0], ClaudeStreamEvent::ContentBlockStop { index: 0 }));
        assert!(matches!(events[1], ClaudeStreamEvent::ContentBlockStart { index: 1, .. }));
    }

    #[test]
    fn finish_then_final_close_emits_message_delta_and_stop() {
        let mut conv = StreamConverter::new();
        conv.convert_chunk(&chunk(OpenAiStreamDelta::default(), None));
        conv.convert_chunk(&chunk(OpenAiStreamDelta { content: Some("done".to_owned()), ..Default::default() }, None));
        let events = conv.convert_chunk(&chunk(OpenAiStreamDelta::default(), Some("stop")));
        assert!(matches!(events.last(), Some(ClaudeStreamEvent::MessageDelta { .. })));

        let final_events = conv.finish();
        assert!(matches!(final_events.last(), Some(ClaudeStreamEvent::MessageStop)));
        // message_delta already emitted by the finish_reason chunk, so finish()
        // should not emit a second one before message_stop.
        assert_eq!(final_events.len(), 1);
    }

    #[test]
    fn finish_without_prior_finish_reason_still_emits_message_delta() {
        let mut conv = StreamConverter::new();
        conv.convert_chunk(&chunk(OpenAiStreamDelta::default(), None));
        let events = conv.finish();
        assert!(matches!(events[0], ClaudeStreamEvent::MessageDelta { .. }));
        assert!(matches!(events[1], ClaudeStreamEvent::MessageStop));
    }

    #[test]
    fn extract_sse_data_joins_multiple_data_lines_and_skips_done() {
        assert_eq!(extract_sse_data("data: {\"a\":1}\n"), Some("{\"a\":1}".to_owned()));
        assert_eq!(extract_sse_data("data: [DONE]\n"), None);
        assert_eq!(extract_sse_data("event: ping\n"), None);
    }

    #[test]
    fn finish_called_twice_is_idempotent() {
        let mut conv = StreamConverter::new();
        conv.convert_chunk(&chunk(OpenAiStreamDelta::default(), None));
        let first = conv.finish();
        let second = conv.finish();
        assert!(!first.is_empty());
        assert!(second.is_empty());
    }
}
