//! Gemini `generateContent` client.
//!
//! ```text
//! POST {endpoint}/models/{model}:generateContent
//! x-goog-api-key: <key>
//!
//! { "systemInstruction": { "parts": [{ "text": <instruction> }] },
//!   "contents": [{ "role": "user", "parts": [{ "text": <context block> }] }],
//!   "generationConfig": { "temperature": .., "maxOutputTokens": .. } }
//! ```
//!
//! The answer is the concatenated text of the first candidate's parts.
//!
//! ## Failure classification
//!
//! | Observed                                   | Result               |
//! |--------------------------------------------|----------------------|
//! | 401, 403, or 400 with `API_KEY_INVALID`    | `InvalidCredentials` |
//! | 408, 429, 5xx, timeout, connection failure | `ServiceUnavailable` |
//! | any other status, no candidates, bad JSON  | `Unclassified`       |

use crate::completion::{CompletionClient, CompletionRequest};
use crate::config::QueryConfig;
use crate::error::{DocuSearchError, QueryError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Error bodies longer than this are cut in the error detail.
const MAX_DETAIL_LEN: usize = 300;

/// Direct client for the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client from `config`. Requires `config.api_key`.
    pub fn new(config: &QueryConfig) -> Result<Self, DocuSearchError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DocuSearchError::ProviderNotConfigured {
                provider: "gemini".to_string(),
                hint: "Set GEMINI_API_KEY (or API_KEY) to your Google AI Studio key.".to_string(),
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| DocuSearchError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn build_request(request: &CompletionRequest) -> GenerateRequest<'_> {
    let generation_config = (request.temperature.is_some() || request.max_tokens.is_some())
        .then_some(GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        });

    GenerateRequest {
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: &request.system,
            }],
        },
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        generation_config,
    }
}

/// Text of the first candidate, or `None` when it carries no text part.
fn answer_text(response: GenerateResponse) -> Result<String, QueryError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| QueryError::unclassified("response contained no candidates"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(QueryError::unclassified(format!(
            "candidate carried no text (finishReason: {reason})"
        )));
    }
    Ok(text)
}

fn classify_status(status: StatusCode, body: &str) -> QueryError {
    let detail = error_detail(status, body);
    match status.as_u16() {
        401 | 403 => QueryError::invalid_credentials(detail),
        400 if body.contains("API_KEY_INVALID") => QueryError::invalid_credentials(detail),
        408 | 429 | 500..=599 => QueryError::service_unavailable(detail),
        _ => QueryError::unclassified(detail),
    }
}

fn classify_transport(err: &reqwest::Error) -> QueryError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        QueryError::service_unavailable(err.to_string())
    } else {
        QueryError::unclassified(err.to_string())
    }
}

fn error_detail(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(MAX_DETAIL_LEN).collect());
    format!("HTTP {status}: {message}")
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, QueryError> {
        let start = Instant::now();
        debug!(
            "Gemini request: model={}, {} prompt bytes",
            self.model,
            request.prompt.len()
        );

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(request))
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini request failed: {}", e);
                classify_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_status(status, &body);
            warn!("Gemini returned {}: {}", status, err);
            return Err(err);
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!("Gemini response body timed out: {}", e);
                    classify_transport(&e)
                } else {
                    QueryError::unclassified(format!("malformed Gemini response: {e}"))
                }
            })?;

        let text = answer_text(parsed)?;
        info!(
            "Gemini answered in {}ms ({} chars)",
            start.elapsed().as_millis(),
            text.chars().count()
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "Answer from the documentation only.".into(),
            prompt: "DOC\n---\nQ".into(),
            temperature: None,
            max_tokens: None,
        }
    }

    fn client_for(server: &MockServer, timeout_secs: u64) -> GeminiClient {
        let config = QueryConfig::builder()
            .api_key("test-key")
            .endpoint(server.uri())
            .api_timeout_secs(timeout_secs)
            .build()
            .unwrap();
        GeminiClient::new(&config).unwrap()
    }

    fn success_body(parts: &[&str]) -> serde_json::Value {
        let parts: Vec<_> = parts.iter().map(|t| json!({ "text": t })).collect();
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": parts },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = GeminiClient::new(&QueryConfig::default()).unwrap_err();
        assert!(matches!(err, DocuSearchError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn request_omits_unset_generation_config() {
        let value = serde_json::to_value(build_request(&request())).unwrap();
        assert!(value.get("generationConfig").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(
            value["systemInstruction"]["parts"][0]["text"],
            "Answer from the documentation only."
        );
    }

    #[test]
    fn request_carries_generation_config_when_set() {
        let mut req = request();
        req.temperature = Some(0.2);
        req.max_tokens = Some(512);
        let value = serde_json::to_value(build_request(&req)).unwrap();
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 512);
        assert!(value["generationConfig"]["temperature"].is_number());
    }

    #[tokio::test]
    async fn returns_answer_verbatim() {
        let server = MockServer::start().await;
        let answer = "  Run `cargo install`.\n\n```sh\ncargo install docusearch\n```\n";
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "DOC\n---\nQ" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body(&[answer])))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server, 5).complete(&request()).await.unwrap();
        assert_eq!(text, answer);
    }

    #[tokio::test]
    async fn concatenates_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(success_body(&["Hello, ", "world"])),
            )
            .mount(&server)
            .await;

        let text = client_for(&server, 5).complete(&request()).await.unwrap();
        assert_eq!(text, "Hello, world");
    }

    #[tokio::test]
    async fn unauthorized_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).complete(&request()).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidCredentials { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn invalid_api_key_400_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT",
                    "details": [{ "reason": "API_KEY_INVALID" }]
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).complete(&request()).await.unwrap_err();
        match err {
            QueryError::InvalidCredentials { detail } => {
                assert!(detail.contains("API key not valid"), "{detail}")
            }
            other => panic!("expected InvalidCredentials, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn service_unavailable_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).complete(&request()).await.unwrap_err();
        assert!(matches!(err, QueryError::ServiceUnavailable { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn timeout_is_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success_body(&["late"]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, 1).complete(&request()).await.unwrap_err();
        assert!(matches!(err, QueryError::ServiceUnavailable { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn no_candidates_is_unclassified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, 5).complete(&request()).await.unwrap_err();
        assert!(matches!(err, QueryError::Unclassified { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_service_unavailable() {
        let config = QueryConfig::builder()
            .api_key("k")
            .endpoint("http://127.0.0.1:9")
            .api_timeout_secs(2)
            .build()
            .unwrap();
        let err = GeminiClient::new(&config)
            .unwrap()
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::ServiceUnavailable { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn body_stalling_past_timeout_is_service_unavailable() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                        Content-Length: 1000\r\n\r\n{\"candidates\": [";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });

        let config = QueryConfig::builder()
            .api_key("k")
            .endpoint(format!("http://{addr}"))
            .api_timeout_secs(1)
            .build()
            .unwrap();
        let err = GeminiClient::new(&config)
            .unwrap()
            .complete(&request())
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::ServiceUnavailable { .. }), "{err:?}");
    }
}
