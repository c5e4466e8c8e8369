use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ProviderKind, finish, http_client, require_setting,
    status_error, transport_error, truncate,
};
use crate::error::LlmError;

const PROVIDER: &str = "OpenAI";
const KEY_SETTING: &str = "openai.api_key";
const KEY_HINT: &str = "Set OPENAI_API_KEY, pass --api-key, or add it to the config file.";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Minimal request/response structs for OpenAI Chat Completions API.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    id: String,
}

/// OpenAI Chat Completions client.
pub struct OpenAiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    api_base_url: String,
}

impl OpenAiClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, LlmError> {
        let base_url = cfg
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_BASE_URL);

        Ok(OpenAiClient {
            http: http_client(PROVIDER, cfg.timeout)?,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            api_base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if self.api_base_url.ends_with("/v1") {
            format!("{}/{path}", self.api_base_url)
        } else {
            format!("{}/v1/{path}", self.api_base_url)
        }
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        require_setting(self.api_key.as_deref(), PROVIDER, KEY_SETTING, KEY_HINT)
    }
}

impl LlmProvider for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let api_key = self.api_key()?;

        log::info!("Calling OpenAI model {:?}", &self.model);
        log::trace!("OpenAI prompt:\n{}", truncate(prompt, 3000));

        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let resp = self
            .http
            .post(self.url("chat/completions"))
            .bearer_auth(api_key)
            .json(&req)
            .send()
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(status_error(
                PROVIDER,
                KEY_SETTING,
                &self.model,
                status.as_u16(),
                body,
            ));
        }

        let chat_resp: ChatResponse = resp.json().map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

        if let Some(usage) = &chat_resp.usage {
            log::debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        let choice = chat_resp
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse {
                provider: PROVIDER,
                reason: String::new(),
            })?;

        let truncated = choice.finish_reason.as_deref() == Some("length");
        Ok(finish(
            PROVIDER,
            choice.message.content.unwrap_or_default(),
            choice.finish_reason,
            truncated,
        ))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let api_key = self.api_key()?;

        log::info!("Listing OpenAI models");

        let resp = self
            .http
            .get(self.url("models"))
            .bearer_auth(api_key)
            .send()
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(status_error(
                PROVIDER,
                KEY_SETTING,
                &self.model,
                status.as_u16(),
                body,
            ));
        }

        let list: ModelList = resp.json().map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

        let mut models: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        models.sort();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::captured_log::warnings_during;
    use mockito::{Matcher, Server};

    fn config(base_url: &str, api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            kind: ProviderKind::OpenAi,
            model: "gpt-test".into(),
            api_key: api_key.map(str::to_string),
            endpoint: Some(base_url.into()),
            timeout: None,
        }
    }

    #[test]
    fn chat_url_does_not_double_v1() {
        let client = OpenAiClient::new(&config("https://proxy.local/v1/", Some("k"))).unwrap();
        assert_eq!(client.url("chat/completions"), "https://proxy.local/v1/chat/completions");

        let client = OpenAiClient::new(&config("https://api.openai.com", Some("k"))).unwrap();
        assert_eq!(client.url("models"), "https://api.openai.com/v1/models");
    }

    #[test]
    fn generate_sends_bearer_chat_request() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJsonString(
                r#"{"model":"gpt-test","messages":[{"role":"user","content":"summarize"}]}"#.into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"Fix parser"},"finish_reason":"stop"}],
                    "usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#,
            )
            .create();

        let client = OpenAiClient::new(&config(&server.url(), Some("sk-test"))).unwrap();
        let resp = client.generate("summarize").unwrap();

        mock.assert();
        assert_eq!(resp.text, "Fix parser");
        assert!(!resp.truncated);
    }

    #[test]
    fn length_finish_reason_marks_truncation() {
        let mut server = Server::new();
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"content":"- partial bul"},"finish_reason":"length"}]}"#,
            )
            .create();

        let client = OpenAiClient::new(&config(&server.url(), Some("k"))).unwrap();
        let (resp, warnings) = warnings_during(|| client.generate("p").unwrap());

        assert!(resp.truncated);
        assert_eq!(resp.finish_reason.as_deref(), Some("length"));
        assert_eq!(resp.text, "- partial bul");
        assert!(warnings.iter().any(|w| w.contains("OpenAI") && w.contains("length")));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let mut server = Server::new();
        let never = server.mock("POST", "/v1/chat/completions").expect(0).create();

        let client = OpenAiClient::new(&config(&server.url(), None)).unwrap();
        let err = client.generate("p").unwrap_err();

        never.assert();
        assert!(matches!(err, LlmError::Configuration { setting: "openai.api_key", .. }));
    }

    #[test]
    fn zero_choices_is_empty_response() {
        let mut server = Server::new();
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create();

        let client = OpenAiClient::new(&config(&server.url(), Some("k"))).unwrap();
        assert!(matches!(
            client.generate("p").unwrap_err(),
            LlmError::EmptyResponse { .. }
        ));
    }

    #[test]
    fn status_codes_become_typed_errors() {
        let mut server = Server::new();
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
            .create();

        let client = OpenAiClient::new(&config(&server.url(), Some("k"))).unwrap();
        let err = client.generate("p").unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert!(err.to_string().contains("switch to another model"));
    }

    #[test]
    fn server_errors_keep_status_and_body() {
        let mut server = Server::new();
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("upstream failure")
            .create();

        let client = OpenAiClient::new(&config(&server.url(), Some("k"))).unwrap();
        let err = client.generate("p").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("HTTP 500"));
        assert!(msg.contains("upstream failure"));
    }

    #[test]
    fn list_models_sorted() {
        let mut server = Server::new();
        server
            .mock("GET", "/v1/models")
            .match_header("authorization", "Bearer k")
            .with_status(200)
            .with_body(r#"{"object":"list","data":[{"id":"gpt-4o"},{"id":"gpt-4o-mini"},{"id":"dall-e-3"}]}"#)
            .create();

        let client = OpenAiClient::new(&config(&server.url(), Some("k"))).unwrap();
        assert_eq!(
            client.list_models().unwrap(),
            vec!["dall-e-3", "gpt-4o", "gpt-4o-mini"]
        );
    }
}
