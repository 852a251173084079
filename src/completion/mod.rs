//! The external text-completion endpoint.
//!
//! [`CompletionClient`] is the only seam through which a search leaves the
//! process. Two implementations ship with the crate:
//!
//! - [`GeminiClient`]: the Gemini `generateContent` REST API, called directly
//! - [`ProviderClient`]: any [`edgequake_llm::LLMProvider`]
//!
//! Timeouts belong to the client; retries are not attempted. A client reports
//! one terminal outcome per request: the full response text, or a classified
//! [`QueryError`].

pub mod gemini;
pub mod provider;

use crate::error::QueryError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

pub use gemini::GeminiClient;
pub use provider::ProviderClient;

/// One completion request: the fixed instruction plus the context block.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// A text-completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `request` once and return the response text unmodified.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, QueryError>;

    /// Short provider name, for logs.
    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Three-digit HTTP status codes standing alone in a message.
static STATUS_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([1-5]\d{2})\b").unwrap());

/// "OPENAI_API_KEY not set", "missing API key", ...: nothing was sent.
static MISSING_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)(missing\s+\S*api[ _-]?key",
        r"|api[ _-]?key\S*\s+(is\s+)?(not set|missing|not found|required|not configured))",
    ))
    .unwrap()
});

/// Classify a failure from its error text.
///
/// Used where only a rendered message is available (errors surfaced by
/// `edgequake_llm` providers). Status codes count only as whole numbers.
pub fn classify_message(message: &str) -> QueryError {
    if MISSING_KEY.is_match(message) {
        return QueryError::unclassified(message);
    }

    let lower = message.to_lowercase();
    let statuses: Vec<u16> = STATUS_CODE
        .captures_iter(message)
        .filter_map(|c| c[1].parse().ok())
        .collect();

    let credential_markers = [
        "unauthorized",
        "unauthenticated",
        "forbidden",
        "permission denied",
        "api key not valid",
        "invalid api key",
        "incorrect api key",
        "api_key_invalid",
        "invalid_api_key",
        "invalid key",
    ];
    if statuses.iter().any(|s| matches!(s, 401 | 403))
        || credential_markers.iter().any(|m| lower.contains(m))
    {
        return QueryError::invalid_credentials(message);
    }

    let transient_markers = [
        "timeout",
        "timed out",
        "connect",
        "network",
        "dns",
        "unavailable",
        "overloaded",
        "rate limit",
    ];
    if statuses.iter().any(|s| matches!(s, 408 | 429 | 500..=599))
        || transient_markers.iter().any(|m| lower.contains(m))
    {
        return QueryError::service_unavailable(message);
    }

    QueryError::unclassified(message)
}
