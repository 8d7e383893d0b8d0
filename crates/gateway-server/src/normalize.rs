//! Claude-dialect JSON normalization and upstream sanitization (proxy step 5).
//!
//! Operates directly on `serde_json::Value` rather than a typed request, since
//! it runs on the pass-through path where the payload is relayed mostly as-is.

use serde_json::Value;

/// Coerce permissive content/system shapes into the canonical array form
/// before relaying to an upstream that expects it strictly.
pub fn normalize_content_shapes(body: &mut Value) {
    let Some(obj) = body.as_object_mut() else { return };

    if let Some(messages) = obj.get_mut("messages").and_then(Value::as_array_mut) {
        for message in messages {
            let Some(message) = message.as_object_mut() else { continue };
            match message.get("content") {
                Some(Value::String(text)) => {
                    let text = text.clone();
                    message.insert(
                        "content".to_owned(),
                        Value::Array(vec![serde_json::json!({"type": "text", "text": text})]),
                    );
                }
                Some(Value::Object(block)) => {
                    let block = Value::Object(block.clone());
                    message.insert("content".to_owned(), Value::Array(vec![block]));
                }
                _ => {}
            }
        }
    }

    if let Some(system) = obj.get("system").cloned() {
        let flattened = match system {
            Value::Array(parts) => Some(
                parts
                    .iter()
                    .filter_map(|part| {
                        part.as_str()
                            .map(str::to_owned)
                            .or_else(|| part.get("text").and_then(Value::as_str).map(str::to_owned))
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Value::Object(object) => object.get("text").and_then(Value::as_str).map(str::to_owned),
            _ => None,
        };
        if let Some(text) = flattened {
            obj.insert("system".to_owned(), Value::String(text));
        }
    }
}

/// Drop fields a genuinely-Anthropic upstream would accept but a merely
/// Claude-shaped one may not: malformed/empty tool declarations, and the two
/// fields that belong on the request only by convention (`anthropic_version`
/// travels as a header, `metadata` is never forwarded).
pub fn sanitize_for_non_anthropic(body: &mut Value) {
    let Some(obj) = body.as_object_mut() else { return };
    obj.remove("anthropic_version");
    obj.remove("metadata");

    let drop_tools = match obj.get("tools") {
        Some(Value::Array(tools)) if tools.is_empty() => true,
        Some(Value::Array(tools)) => tools[0].get("type").is_none(),
        _ => false,
    };
    if drop_tools {
        obj.remove("tools");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_content_is_wrapped_in_a_text_block() {
        let mut body = json!({"messages": [{"role": "user", "content": "hi"}]});
        normalize_content_shapes(&mut body);
        assert_eq!(body["messages"][0]["content"], json!([{"type": "text", "text": "hi"}]));
    }

    #[test]
    fn single_object_content_is_wrapped_in_a_one_element_array() {
        let mut body = json!({"messages": [{"role": "user", "content": {"type": "text", "text": "hi"}}]});
        normalize_content_shapes(&mut body);
        assert_eq!(body["messages"][0]["content"], json!([{"type": "text", "text": "hi"}]));
    }

    #[test]
    fn array_system_is_flattened_with_newlines() {
        let mut body = json!({"system": ["a", {"text": "b"}]});
        normalize_content_shapes(&mut body);
        assert_eq!(body["system"], json!("a\nb"));
    }

    #[test]
    fn object_system_keeps_only_its_text_field() {
        let mut body = json!({"system": {"type": "text", "text": "only this"}});
        normalize_content_shapes(&mut body);
        assert_eq!(body["system"], json!("only this"));
    }

    #[test]
    fn sanitize_drops_anthropic_version_and_metadata_always() {
        let mut body = json!({"anthropic_version": "2023-06-01", "metadata": {"user_id": "u1"}});
        sanitize_for_non_anthropic(&mut body);
        assert!(body.get("anthropic_version").is_none());
        assert!(body.get("metadata").is_none());
    }

    #[test]
    fn sanitize_drops_empty_tools_array() {
        let mut body = json!({"tools": []});
        sanitize_for_non_anthropic(&mut body);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn sanitize_drops_tools_whose_first_entry_has_no_type() {
        let mut body = json!({"tools": [{"name": "lookup", "input_schema": {}}]});
        sanitize_for_non_anthropic(&mut body);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn sanitize_keeps_tools_whose_first_entry_has_a_type() {
        let mut body = json!({"tools": [{"type": "function", "name": "lookup"}]});
        sanitize_for_non_anthropic(&mut body);
        assert!(body.get("tools").is_some());
    }
}
