//! Configuration for the query path.
//!
//! All completion behaviour is controlled through [`QueryConfig`], built via
//! [`QueryConfigBuilder`] or resolved from the process environment with
//! [`QueryConfig::from_env`]. The credential is an ordinary field: a config
//! without one is valid, and the first search reports a
//! [`crate::error::ConfigurationError`] instead.

use crate::error::DocuSearchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default Gemini model, as used by the hosted application.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default base URL of the Gemini REST API.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Language of the answer and of every user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    French,
    English,
}

impl Language {
    /// Parse a language tag such as `fr`, `fr-FR`, `en`, `english`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase();
        let primary = tag.split(['-', '_']).next().unwrap_or("");
        match primary {
            "fr" | "french" | "français" | "francais" => Some(Language::French),
            "en" | "english" => Some(Language::English),
            _ => None,
        }
    }
}

/// Configuration for [`crate::query::QueryService`].
///
/// # Example
/// ```rust
/// use docusearch::{Language, QueryConfig};
///
/// let config = QueryConfig::builder()
///     .api_key("test-key")
///     .language(Language::English)
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// assert!(config.has_api_key());
/// ```
#[derive(Clone)]
pub struct QueryConfig {
    /// Credential for the completion service. `None` degrades to a
    /// configuration error on search.
    pub api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the completion API. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Response language and display language. Default: French.
    pub language: Language,

    /// Sampling temperature. `None` leaves the service default.
    pub temperature: Option<f32>,

    /// Output token cap. `None` leaves the service default.
    pub max_tokens: Option<usize>,

    /// HTTP timeout for one completion call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Replaces the built-in instruction when set.
    pub system_prompt: Option<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language: Language::default(),
            temperature: None,
            max_tokens: None,
            api_timeout_secs: 60,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for QueryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("language", &self.language)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl QueryConfig {
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the configuration from the process environment.
    ///
    /// Reads the credential from `GEMINI_API_KEY`, then `API_KEY`; the model
    /// from `DOCUSEARCH_MODEL`. Empty values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`QueryConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = Self {
            api_key: API_KEY_VARS.iter().find_map(|name| non_empty(name)),
            ..Self::default()
        };
        if let Some(model) = non_empty("DOCUSEARCH_MODEL") {
            config.model = model;
        }
        config
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Builder for [`QueryConfig`].
#[derive(Debug)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.config.language = language;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<QueryConfig, DocuSearchError> {
        let c = &self.config;
        if let Some(t) = c.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(DocuSearchError::InvalidConfig(format!(
                    "temperature must be 0.0–2.0, got {t}"
                )));
            }
        }
        if c.model.trim().is_empty() {
            return Err(DocuSearchError::InvalidConfig(
                "model must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(DocuSearchError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.endpoint.trim().is_empty() {
            return Err(DocuSearchError::InvalidConfig(
                "endpoint must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
