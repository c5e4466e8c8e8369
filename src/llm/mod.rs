#[cfg(test)]
mod captured_log;
pub mod catalog;
pub mod gemini;
pub mod local;
pub mod openai;
pub mod prompt_builder;
mod prompts;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::LlmError;

/// Which backend a prompt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(alias = "open-ai")]
    OpenAi,
    Local,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Local => "local",
        }
    }

    /// Name used in log lines and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Gemini",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Local => "Local model server",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Local => "llama3.2",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" | "open-ai" => Ok(ProviderKind::OpenAi),
            "local" | "ollama" => Ok(ProviderKind::Local),
            other => Err(format!(
                "unknown provider '{other}' (expected gemini, openai or local)"
            )),
        }
    }
}

/// Everything needed to talk to one backend. Assembled once by the caller
/// and never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    /// Base URL; required for [`ProviderKind::Local`], optional override otherwise.
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            model: kind.default_model().to_string(),
            api_key: None,
            endpoint: None,
            timeout: None,
        }
    }

    /// Identifies whose model list this is: the normalized endpoint for a
    /// local server, a blake3 digest of the key for hosted providers (key
    /// prefixes such as `sk-proj-` are shared across accounts).
    pub(crate) fn credential_fingerprint(&self) -> String {
        match self.kind {
            ProviderKind::Local => self
                .endpoint
                .as_deref()
                .unwrap_or_default()
                .trim()
                .trim_end_matches('/')
                .to_ascii_lowercase(),
            _ => {
                let key = self.api_key.as_deref().unwrap_or_default().trim();
                blake3::hash(key.as_bytes()).to_hex().to_string()
            }
        }
    }
}

/// Raw text returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    /// The provider stopped because it hit its output-length limit.
    pub truncated: bool,
}

/// One LLM backend. Each call performs exactly one HTTP request.
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Send a prompt and return the first candidate's text.
    fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError>;

    /// Models the backend offers for text generation.
    fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// Build the provider client selected by `cfg`.
pub fn build_provider(cfg: &ProviderConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    log::debug!("Using {} provider with model: {}", cfg.kind, cfg.model);

    Ok(match cfg.kind {
        ProviderKind::Gemini => Box::new(gemini::GeminiClient::new(cfg)?),
        ProviderKind::OpenAi => Box::new(openai::OpenAiClient::new(cfg)?),
        ProviderKind::Local => Box::new(local::LocalClient::new(cfg)?),
    })
}

pub(crate) fn http_client(
    provider: &'static str,
    timeout: Option<Duration>,
) -> Result<Client, LlmError> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| LlmError::Network {
        provider,
        status: None,
        detail: format!("failed to build HTTP client: {e}"),
    })
}

/// Reject a blank credential before any request is made.
pub(crate) fn require_setting<'a>(
    value: Option<&'a str>,
    provider: &'static str,
    setting: &'static str,
    hint: &str,
) -> Result<&'a str, LlmError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LlmError::Configuration {
            provider,
            setting,
            hint: hint.to_string(),
        }),
    }
}

pub(crate) fn transport_error(provider: &'static str, err: reqwest::Error) -> LlmError {
    LlmError::Network {
        provider,
        status: err.status().map(|s| s.as_u16()),
        detail: err.to_string(),
    }
}

/// Map a non-success HTTP status to the error kind the user can act on.
pub(crate) fn status_error(
    provider: &'static str,
    credential_setting: &'static str,
    model: &str,
    status: u16,
    body: String,
) -> LlmError {
    match status {
        429 => LlmError::RateLimited { provider },
        404 => LlmError::ModelNotFound {
            provider,
            model: model.to_string(),
        },
        401 | 403 => LlmError::InvalidCredential {
            provider,
            setting: credential_setting,
        },
        400 | 422 => LlmError::InvalidRequest {
            provider,
            model: model.to_string(),
            detail: truncate(&error_detail(&body), 300),
        },
        _ => LlmError::Network {
            provider,
            status: Some(status),
            detail: error_detail(&body),
        },
    }
}

/// Pull the message out of `{"error":{"message":..}}` or `{"error":".."}`
/// bodies; anything else is returned trimmed.
fn error_detail(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| match v.get("error")? {
            serde_json::Value::String(s) => Some(s.clone()),
            obj => obj.get("message")?.as_str().map(str::to_string),
        });
    message.unwrap_or_else(|| body.trim().to_string())
}

/// Wrap the extracted text, warning when the provider cut it short.
pub(crate) fn finish(
    provider: &'static str,
    text: String,
    finish_reason: Option<String>,
    truncated: bool,
) -> LlmResponse {
    if truncated {
        log::warn!(
            "{provider} stopped at its output-length limit (finish reason {:?}); the reply is partial",
            finish_reason.as_deref().unwrap_or("unknown")
        );
    }
    LlmResponse {
        text,
        finish_reason,
        truncated,
    }
}

/// Truncate long strings for logging and error details.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}...[truncated {} bytes]", &s[..idx], s.len() - idx),
    }
}
