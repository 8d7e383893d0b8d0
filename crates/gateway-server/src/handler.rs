//! Axum route handlers (proxy handler, component G).

use std::collections::VecDeque;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use bytes::Bytes;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::Stream;
use gateway_core::{Dialect, HttpError};
use gateway_detector::{ClassifyInput, kind};
use gateway_model::{ModelRepository, ProviderDirectory};
use gateway_protocol::claude::{ClaudeContentBlock, ClaudeRequest};
use gateway_protocol::openai::OpenAiResponse;
use gateway_protocol::{StreamConverter, estimate_tokens, extract_sse_data, render_sse_event, should_translate};
use http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use crate::error::ServerError;
use crate::forward::{Endpoint, forward, is_event_stream, maybe_gunzip};
use crate::normalize::{normalize_content_shapes, sanitize_for_non_anthropic};
use crate::state::AppState;

pub fn router<R, P>(state: AppState<R, P>) -> Router
where
    R: ModelRepository + 'static,
    P: ProviderDirectory + 'static,
{
    Router::new()
        .route("/v1/chat/completions", post(chat_completions::<R, P>))
        .route("/v1/messages", post(messages::<R, P>))
        .route("/v1/messages/count_tokens", post(count_tokens))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

async fn count_tokens(body: Bytes) -> Response {
    let Ok(request) = serde_json::from_slice::<ClaudeRequest>(&body) else {
        return error_response(Dialect::Claude, &ServerError::InvalidBody);
    };

    let mut text = String::new();
    if let Some(system) = &request.system {
        text.push_str(&system.flatten());
    }
    for message in &request.messages {
        for block in message.content.as_blocks() {
            if let ClaudeContentBlock::Text { text: block_text } = block {
                text.push_str(block_text);
            }
        }
    }

    let tokens = estimate_tokens(&text);
    Json(json!({
        "type": "message",
        "usage": {
            "input_tokens": tokens,
            "output_tokens": 0,
            "cache_creation_input_tokens": 0,
            "cache_read_input_tokens": 0,
        }
    }))
    .into_response()
}

async fn chat_completions<R, P>(State(state): State<AppState<R, P>>, headers: HeaderMap, body: Bytes) -> Response
where
    R: ModelRepository,
    P: ProviderDirectory,
{
    proxy(&state, Dialect::OpenAi, Endpoint::ChatCompletions, headers, &body).await
}

async fn messages<R, P>(State(state): State<AppState<R, P>>, headers: HeaderMap, body: Bytes) -> Response
where
    R: ModelRepository,
    P: ProviderDirectory,
{
    proxy(&state, Dialect::Claude, Endpoint::Messages, headers, &body).await
}

fn error_response(dialect: Dialect, error: &dyn HttpError) -> Response {
    (error.status_code(), Json(error.to_body(dialect))).into_response()
}

async fn proxy<R, P>(
    state: &AppState<R, P>,
    dialect: Dialect,
    endpoint: Endpoint,
    headers: HeaderMap,
    raw_body: &[u8],
) -> Response
where
    R: ModelRepository,
    P: ProviderDirectory,
{
    let Ok(mut body) = serde_json::from_slice::<Value>(raw_body) else {
        return error_response(dialect, &ServerError::InvalidBody);
    };
    if !body.is_object() {
        return error_response(dialect, &ServerError::InvalidBody);
    }

    let Some(model_name) = body
        .get("model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
    else {
        return error_response(dialect, &ServerError::MissingModel);
    };

    let candidates = match state.resolver.resolve(&model_name).await {
        Ok(candidates) => candidates,
        Err(e) => return error_response(dialect, &ServerError::from(e)),
    };

    let selection = match state.failover.select_with_failover(&candidates) {
        Ok(selection) => selection,
        Err(e) => return error_response(dialect, &ServerError::from(e)),
    };
    let provider_id = selection.chosen.provider_id;

    let provider = match state.providers.find_provider(provider_id).await {
        Ok(Some(provider)) => provider,
        Ok(None) => return error_response(dialect, &ServerError::Internal("selected provider record missing".to_owned())),
        Err(e) => return error_response(dialect, &ServerError::Internal(e.to_string())),
    };

    body.as_object_mut().unwrap().insert("model".to_owned(), json!(selection.chosen.target_model));

    let translate = dialect == Dialect::Claude && should_translate(&selection.chosen.target_model, &provider.base_url);

    let (outbound_endpoint, outbound_payload) = if translate {
        normalize_content_shapes(&mut body);
        let claude_request: ClaudeRequest = match serde_json::from_value(body) {
            Ok(request) => request,
            Err(_) => return error_response(dialect, &ServerError::InvalidBody),
        };
        let openai_request = match gateway_protocol::claude_request_to_openai(&claude_request) {
            Ok(request) => request,
            Err(e) => return error_response(dialect, &ServerError::from(e)),
        };
        let payload = match serde_json::to_value(&openai_request) {
            Ok(value) => value,
            Err(e) => return error_response(dialect, &ServerError::Internal(e.to_string())),
        };
        (Endpoint::ChatCompletions, payload)
    } else {
        if dialect == Dialect::Claude {
            normalize_content_shapes(&mut body);
            sanitize_for_non_anthropic(&mut body);
        }
        (endpoint, body)
    };

    let upstream = match forward(&state.http_client, &provider, outbound_endpoint, &outbound_payload, &headers).await {
        Ok(response) => response,
        Err(e) => {
            report_outcome(state, provider_id, kind(&ClassifyInput::from_error(e.to_string(), false, false)));
            return error_response(dialect, &e);
        }
    };

    let status = upstream.status();
    report_outcome(state, provider_id, kind(&ClassifyInput::from_status(status.as_u16())));

    let request_tokens = estimate_tokens(&collect_strings(&outbound_payload).join(" "));
    let is_stream = is_event_stream(upstream.headers());

    tracing::info!(
        dialect = ?dialect,
        model = %model_name,
        provider_id,
        status = status.as_u16(),
        attempt_count = selection.attempt_count,
        estimated_input_tokens = request_tokens,
        stream = is_stream,
        "proxied request"
    );

    if is_stream {
        return build_stream_response(upstream, translate);
    }

    build_buffered_response(upstream, dialect, translate).await
}

/// Collect every string leaf in a JSON value, depth-first. Used only to feed
/// the logging-only token estimator a rough text sample; never a parser.
fn collect_strings(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| out.extend(collect_strings(item))),
        Value::Object(map) => map.values().for_each(|item| out.extend(collect_strings(item))),
        _ => {}
    }
    out
}

fn report_outcome<R, P>(state: &AppState<R, P>, provider_id: i64, failure_kind: Option<gateway_detector::FailureKind>)
where
    R: ModelRepository,
    P: ProviderDirectory,
{
    match failure_kind {
        Some(kind) => state.detector.record_failure(provider_id, kind),
        None => state.detector.record_success(provider_id),
    }
}

fn build_stream_response(upstream: reqwest::Response, translate: bool) -> Response {
    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    response_headers.remove(http::header::CONTENT_LENGTH);
    if translate {
        response_headers.insert(
            http::header::CONTENT_TYPE,
            "text/event-stream; charset=utf-8".parse().unwrap(),
        );
    }

    let body = if translate {
        Body::from_stream(translate_event_stream(upstream))
    } else {
        Body::from_stream(passthrough_stream(upstream))
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

fn passthrough_stream(response: reqwest::Response) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    use futures_util::StreamExt;
    response
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| std::io::Error::other(e.to_string())))
}

struct TranslateState {
    upstream: reqwest::Response,
    converter: StreamConverter,
    buffer: String,
    pending: VecDeque<Bytes>,
    done: bool,
}

fn translate_event_stream(upstream: reqwest::Response) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    let state = TranslateState {
        upstream,
        converter: StreamConverter::new(),
        buffer: String::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(chunk) = state.pending.pop_front() {
                return Some((Ok(chunk), state));
            }
            if state.done {
                return None;
            }

            match state.upstream.chunk().await {
                Ok(Some(bytes)) => {
                    state.buffer.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = state.buffer.find("\n\n") {
                        let frame: String = state.buffer.drain(..pos + 2).collect();
                        enqueue_translated(&mut state.converter, &frame, &mut state.pending);
                    }
                }
                Ok(None) => {
                    for event in state.converter.finish() {
                        if let Ok(rendered) = render_sse_event(&event) {
                            state.pending.push_back(Bytes::from(rendered));
                        }
                    }
                    state.done = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "upstream stream read failed");
                    state.done = true;
                }
            }
        }
    })
}

fn enqueue_translated(converter: &mut StreamConverter, frame: &str, pending: &mut VecDeque<Bytes>) {
    let Some(data) = extract_sse_data(frame) else { return };
    let Ok(chunk) = serde_json::from_str(&data) else { return };
    for event in converter.convert_chunk(&chunk) {
        if let Ok(rendered) = render_sse_event(&event) {
            pending.push_back(Bytes::from(rendered));
        }
    }
}

async fn build_buffered_response(upstream: reqwest::Response, dialect: Dialect, translate: bool) -> Response {
    let status = upstream.status();
    let headers = upstream.headers().clone();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(dialect, &ServerError::UpstreamNetwork(e.to_string())),
    };

    let decoded = match maybe_gunzip(&headers, &bytes) {
        Ok(decoded) => decoded,
        Err(e) => return error_response(dialect, &e),
    };

    if !translate || !status.is_success() {
        let mut response = Response::new(Body::from(decoded));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        return response;
    }

    let Ok(openai_response) = serde_json::from_slice::<OpenAiResponse>(&decoded) else {
        let mut response = Response::new(Body::from(decoded));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        return response;
    };

    match gateway_protocol::openai_response_to_claude(&openai_response) {
        Ok(claude_response) => (status, Json(claude_response)).into_response(),
        Err(e) => error_response(Dialect::Claude, &ServerError::from(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_body_is_ok_status() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let response = rt.block_on(health());
        assert_eq!(response.status(), StatusCode::OK);
    }
}
