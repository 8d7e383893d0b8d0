//! Request Claude -> `OpenAI` and response `OpenAI` -> Claude conversion.

use crate::claude::{
    ClaudeContentBlock, ClaudeMessage, ClaudeRequest, ClaudeResponse, ClaudeResponseBlock, ClaudeToolChoice,
    ClaudeUsage,
};
use crate::error::{ConvertError, Stage};
use crate::openai::{
    OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl, OpenAiMessage, OpenAiRequest,
    OpenAiResponse, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};

/// Map an `OpenAI` `finish_reason` to Claude's stop-reason vocabulary.
fn finish_reason_to_stop_reason(finish_reason: &str) -> &'static str {
    match finish_reason {
        "stop" => "end_turn",
        "length" => "max_tokens",
        "tool_calls" => "tool_use",
        "content_filter" => "end_turn",
        _ => "end_turn",
    }
}

/// `chatcmpl-XYZ` -> `msg_XYZ`; empty -> `msg_unknown`; anything else gets a
/// `msg_` prefix.
pub(crate) fn openai_id_to_claude_id(id: &str) -> String {
    if id.is_empty() {
        return "msg_unknown".to_owned();
    }
    id.strip_prefix("chatcmpl-").map_or_else(|| format!("msg_{id}"), |rest| format!("msg_{rest}"))
}

/// Request: Claude -> `OpenAI`.
#[tracing::instrument(skip(req), fields(model = %req.model))]
pub fn claude_request_to_openai(req: &ClaudeRequest) -> Result<OpenAiRequest, ConvertError> {
    let mut messages = Vec::new();

    if let Some(system) = &req.system {
        let text = system.flatten();
        if !text.is_empty() {
            messages.push(OpenAiMessage {
                role: "system".to_owned(),
                content: Some(OpenAiContent::Text(text)),
                tool_calls: None,
                tool_call_id: None,
            });
        }
    }

    for msg in &req.messages {
        messages.extend(claude_message_to_openai(msg)?);
    }

    let tools = req.tools.as_ref().map(|tools| {
        tools
            .iter()
            .map(|t| OpenAiTool {
                tool_type: "function".to_owned(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: Some(t.input_schema.clone()),
                },
            })
            .collect()
    });

    let tool_choice = req.tool_choice.as_ref().map(claude_tool_choice_to_openai);

    Ok(OpenAiRequest {
        model: req.model.clone(),
        messages,
        temperature: req.temperature,
        top_p: req.top_p,
        max_tokens: req.max_tokens,
        stop: req.stop_sequences.clone(),
        stream: req.stream,
        tools,
        tool_choice,
        stream_options: None,
    })
}

fn claude_tool_choice_to_openai(choice: &ClaudeToolChoice) -> serde_json::Value {
    match choice {
        ClaudeToolChoice::Auto => serde_json::json!("auto"),
        ClaudeToolChoice::Any => serde_json::json!("required"),
        ClaudeToolChoice::Tool { name } => serde_json::json!({
            "type": "function",
            "function": { "name": name },
        }),
    }
}

fn claude_message_to_openai(msg: &ClaudeMessage) -> Result<Vec<OpenAiMessage>, ConvertError> {
    let blocks = msg.content.as_blocks();

    let tool_results: Vec<&ClaudeContentBlock> =
        blocks.iter().filter(|b| matches!(b, ClaudeContentBlock::ToolResult { .. })).collect();

    if !tool_results.is_empty() {
        return tool_results
            .into_iter()
            .map(|block| {
                let ClaudeContentBlock::ToolResult { tool_use_id, content, .. } = block else {
                    unreachable!("filtered to ToolResult variants")
                };
                Ok(OpenAiMessage {
                    role: "tool".to_owned(),
                    content: Some(OpenAiContent::Text(content.clone().unwrap_or_default())),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id.clone()),
                })
            })
            .collect();
    }

    match msg.role.as_str() {
        "user" => {
            if blocks.len() == 1 {
                if let ClaudeContentBlock::Text { text } = &blocks[0] {
                    return Ok(vec![OpenAiMessage {
                        role: "user".to_owned(),
                        content: Some(OpenAiContent::Text(text.clone())),
                        tool_calls: None,
                        tool_call_id: None,
                    }]);
                }
            }
            let parts = blocks
                .iter()
                .map(|block| match block {
                    ClaudeContentBlock::Text { text } => Ok(OpenAiContentPart::Text { text: text.clone() }),
                    ClaudeContentBlock::Image { source } => Ok(OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl { url: format!("data:{};base64,{}", source.media_type, source.data) },
                    }),
                    other => Err(ConvertError::new(Stage::Request, format!("unsupported block in user message: {other:?}"))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vec![OpenAiMessage {
                role: "user".to_owned(),
                content: Some(OpenAiContent::Parts(parts)),
                tool_calls: None,
                tool_call_id: None,
            }])
        }
        "assistant" => {
            let mut text = String::new();
            let mut tool_calls = Vec::new();
            for block in &blocks {
                match block {
                    ClaudeContentBlock::Text { text: t } => text.push_str(t),
                    ClaudeContentBlock::ToolUse { id, name, input } => {
                        let arguments = serde_json::to_string(input)
                            .map_err(|e| ConvertError::new(Stage::Request, format!("serializing tool_use input: {e}")))?;
                        tool_calls.push(OpenAiToolCall {
                            id: id.clone(),
                            tool_type: "function".to_owned(),
                            function: OpenAiFunctionCall { name: name.clone(), arguments },
                        });
                    }
                    other => return Err(ConvertError::new(Stage::Request, format!("unsupported block in assistant message: {other:?}"))),
                }
            }
            Ok(vec![OpenAiMessage {
                role: "assistant".to_owned(),
                content: if text.is_empty() { None } else { Some(OpenAiContent::Text(text)) },
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                tool_call_id: None,
            }])
        }
        other => Err(ConvertError::new(Stage::Request, format!("unknown message role: {other}"))),
    }
}

/// Response: `OpenAI` -> Claude (non-streaming).
#[tracing::instrument(skip(resp), fields(model = %resp.model))]
pub fn openai_response_to_claude(resp: &OpenAiResponse) -> Result<ClaudeResponse, ConvertError> {
    let choice = resp.choices.first().ok_or_else(|| {
        tracing::warn!("openai response carried no choices");
        ConvertError::new(Stage::Response, "response has no choices")
    })?;

    let mut content = Vec::new();
    if let Some(text) = &choice.message.content
        && !text.is_empty()
    {
        content.push(ClaudeResponseBlock::Text { text: text.clone() });
    }

    if let Some(tool_calls) = &choice.message.tool_calls {
        for tc in tool_calls {
            let input = if tc.function.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&tc.function.arguments)
                    .map_err(|e| ConvertError::new(Stage::Response, format!("malformed tool_call arguments: {e}")))?
            };
            content.push(ClaudeResponseBlock::ToolUse { id: tc.id.clone(), name: tc.function.name.clone(), input });
        }
    }

    if content.is_empty() {
        content.push(ClaudeResponseBlock::Text { text: String::new() });
    }

    let usage = resp.usage.as_ref();

    Ok(ClaudeResponse {
        id: openai_id_to_claude_id(&resp.id),
        response_type: "message".to_owned(),
        role: "assistant".to_owned(),
        content,
        model: resp.model.clone(),
        stop_reason: Some(choice.finish_reason.as_deref().map_or("end_turn", finish_reason_to_stop_reason).to_owned()),
        stop_sequence: None,
        usage: ClaudeUsage {
            input_tokens: usage.map_or(0, |u| u.prompt_tokens),
            output_tokens: usage.map_or(0, |u| u.completion_tokens),
        },
    })
}
