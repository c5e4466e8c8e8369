use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ProviderKind, finish, http_client, require_setting,
    status_error, transport_error, truncate,
};
use crate::error::LlmError;

const PROVIDER: &str = "Gemini";
const KEY_SETTING: &str = "gemini.api_key";
const KEY_HINT: &str = "Set GEMINI_API_KEY, pass --api-key, or add it to the config file.";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, LlmError> {
        let base_url = cfg
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL);

        Ok(Self {
            http: http_client(PROVIDER, cfg.timeout)?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        require_setting(self.api_key.as_deref(), PROVIDER, KEY_SETTING, KEY_HINT)
    }

    /// Gemini reports a bad key as 400 rather than 401.
    fn error_for(&self, status: u16, body: String) -> LlmError {
        if status == 400 && (body.contains("API_KEY_INVALID") || body.contains("API key not valid"))
        {
            return LlmError::InvalidCredential {
                provider: PROVIDER,
                setting: KEY_SETTING,
            };
        }
        status_error(PROVIDER, KEY_SETTING, &self.model, status, body)
    }
}

impl LlmProvider for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        log::info!("Calling Gemini model {:?}", &self.model);
        log::trace!("Gemini prompt:\n{}", truncate(prompt, 3000));

        let req = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&req)
            .send()
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(self.error_for(status.as_u16(), body));
        }

        let parsed: GenerateResponse = resp.json().map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!(" (blocked: {r})"))
                .unwrap_or_default();
            return Err(LlmError::EmptyResponse {
                provider: PROVIDER,
                reason,
            });
        };

        let text = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<String>();

        let truncated = candidate.finish_reason.as_deref() == Some("MAX_TOKENS");
        Ok(finish(PROVIDER, text, candidate.finish_reason, truncated))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models", self.base_url);

        log::info!("Listing Gemini models");

        let resp = self
            .http
            .get(url)
            .header("x-goog-api-key", api_key)
            .send()
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(self.error_for(status.as_u16(), body));
        }

        let list: ModelList = resp.json().map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

        let mut models: Vec<String> = list
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|g| g == "generateContent")
            })
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect();
        models.sort();
        Ok(models)
    }
}
