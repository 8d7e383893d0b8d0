//! HTTP forwarding to the selected upstream provider (proxy step 6).

use std::io::Read;

use gateway_model::Provider;
use http::HeaderMap;
use secrecy::ExposeSecret;

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ChatCompletions,
    Messages,
}

impl Endpoint {
    const fn path(self) -> &'static str {
        match self {
            Self::ChatCompletions => "/v1/chat/completions",
            Self::Messages => "/v1/messages",
        }
    }
}

const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// POST `payload` to `provider` at `endpoint`, propagating only the headers
/// the upstream actually needs and never the caller's own `Authorization`.
pub async fn forward(
    client: &reqwest::Client,
    provider: &Provider,
    endpoint: Endpoint,
    payload: &serde_json::Value,
    inbound_headers: &HeaderMap,
) -> Result<reqwest::Response, ServerError> {
    let base = provider.base_url.trim_end_matches('/');
    let url = format!("{base}{}", endpoint.path());

    let mut request = client
        .post(url)
        .header(http::header::CONTENT_TYPE, "application/json")
        .bearer_auth(provider.api_key.expose_secret())
        .json(payload);

    if endpoint == Endpoint::Messages {
        let version = inbound_headers
            .get("anthropic-version")
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_ANTHROPIC_VERSION);
        request = request.header("anthropic-version", version);
        if let Some(beta) = inbound_headers.get("anthropic-beta").and_then(|v| v.to_str().ok()) {
            request = request.header("anthropic-beta", beta);
        }
    }

    request.send().await.map_err(|e| ServerError::UpstreamNetwork(e.to_string()))
}

/// Gunzip `bytes` when either the magic number or `Content-Encoding` says so.
/// Otherwise returns the bytes unchanged.
pub fn maybe_gunzip(headers: &HeaderMap, bytes: &[u8]) -> Result<Vec<u8>, ServerError> {
    let looks_gzipped = bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b;
    let header_says_gzip = headers
        .get(http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));

    if !looks_gzipped && !header_says_gzip {
        return Ok(bytes.to_vec());
    }

    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ServerError::Internal(format!("gzip decode failed: {e}")))?;
    Ok(out)
}

/// Whether a response's `Content-Type` marks it as an SSE stream.
#[must_use]
pub fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| {
            let lowered = v.to_ascii_lowercase();
            lowered.contains("text/event-stream") || lowered.contains("stream")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn plain_bytes_pass_through_unchanged() {
        let headers = HeaderMap::new();
        let body = b"{\"ok\":true}";
        assert_eq!(maybe_gunzip(&headers, body).unwrap(), body);
    }

    #[test]
    fn gzip_magic_number_triggers_decode() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello world").unwrap();
        let gzipped = encoder.finish().unwrap();

        let headers = HeaderMap::new();
        let decoded = maybe_gunzip(&headers, &gzipped).unwrap();
        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn content_encoding_header_triggers_decode_even_without_magic_bytes_check_skipped() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"via header").unwrap();
        let gzipped = encoder.finish().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_ENCODING, "gzip".parse().unwrap());
        let decoded = maybe_gunzip(&headers, &gzipped).unwrap();
        assert_eq!(decoded, b"via header");
    }

    #[test]
    fn event_stream_content_type_is_detected() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, "text/event-stream; charset=utf-8".parse().unwrap());
        assert!(is_event_stream(&headers));
    }

    #[test]
    fn json_content_type_is_not_a_stream() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(!is_event_stream(&headers));
    }
}
