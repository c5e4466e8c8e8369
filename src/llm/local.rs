use musli::json;
use musli::{Decode, Encode};
use reqwest::blocking::Client;

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ProviderKind, finish, http_client, require_setting,
    status_error, transport_error, truncate,
};
use crate::error::LlmError;

const PROVIDER: &str = "Local model server";
const ENDPOINT_SETTING: &str = "local.endpoint";
const ENDPOINT_HINT: &str =
    "Set WORKLOGBOT_LOCAL_ENDPOINT (e.g. http://localhost:11434), pass --endpoint, or add it to the config file.";

#[derive(Debug, Encode)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Decode)]
struct GenerateResponse {
    #[musli(default)]
    response: String,
    #[musli(default)]
    done_reason: Option<String>,
}

#[derive(Debug, Decode)]
struct TagsResponse {
    #[musli(default)]
    models: Vec<LocalModel>,
}

#[derive(Debug, Decode)]
struct LocalModel {
    name: String,
}

/// Synchronous client for a self-hosted, Ollama-compatible server using /api/generate.
pub struct LocalClient {
    http: Client,
    endpoint: Option<String>,
    model: String,
}

impl LocalClient {
    pub fn new(cfg: &ProviderConfig) -> Result<Self, LlmError> {
        Ok(Self {
            http: http_client(PROVIDER, cfg.timeout)?,
            endpoint: cfg
                .endpoint
                .as_deref()
                .map(|e| e.trim().trim_end_matches('/').to_string()),
            model: cfg.model.clone(),
        })
    }

    fn endpoint(&self) -> Result<&str, LlmError> {
        require_setting(
            self.endpoint.as_deref(),
            PROVIDER,
            ENDPOINT_SETTING,
            ENDPOINT_HINT,
        )
    }

    fn read_body(&self, resp: reqwest::blocking::Response) -> Result<String, LlmError> {
        let status = resp.status();
        let body = resp.text().map_err(|e| transport_error(PROVIDER, e))?;
        if !status.is_success() {
            return Err(status_error(
                PROVIDER,
                ENDPOINT_SETTING,
                &self.model,
                status.as_u16(),
                body,
            ));
        }
        Ok(body)
    }
}

impl LlmProvider for LocalClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let endpoint = self.endpoint()?;

        let req_body = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let body_str = json::to_string(&req_body).map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            detail: format!("failed to encode request: {e}"),
        })?;

        log::info!("Calling local model {:?} at {endpoint}", &self.model);
        log::trace!("Local request body: {}", truncate(&body_str, 3000));

        let url = format!("{endpoint}/api/generate");
        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body_str)
            .send()
            .map_err(|e| transport_error(PROVIDER, e))?;

        let resp_text = self.read_body(resp)?;

        log::trace!("Local raw JSON response: {}", truncate(&resp_text, 3000));

        let parsed: GenerateResponse = json::from_str(&resp_text).map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

        if parsed.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: PROVIDER,
                reason: String::new(),
            });
        }

        let truncated = parsed.done_reason.as_deref() == Some("length");
        Ok(finish(PROVIDER, parsed.response, parsed.done_reason, truncated))
    }

    fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let endpoint = self.endpoint()?;
        let url = format!("{endpoint}/api/tags");

        log::info!("Listing local models at {endpoint}");

        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| transport_error(PROVIDER, e))?;
        let resp_text = self.read_body(resp)?;

        let tags: TagsResponse = json::from_str(&resp_text).map_err(|e| LlmError::Decode {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

        let mut models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        models.sort();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::captured_log::warnings_during;
    use mockito::{Matcher, Server};

    fn config(endpoint: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            kind: ProviderKind::Local,
            model: "llama-test".into(),
            api_key: None,
            endpoint: endpoint.map(str::to_string),
            timeout: None,
        }
    }

    #[test]
    fn missing_endpoint_is_configuration_error() {
        let client = LocalClient::new(&config(None)).unwrap();
        let err = client.generate("p").unwrap_err();
        assert!(matches!(err, LlmError::Configuration { setting: "local.endpoint", .. }));
        assert!(err.to_string().contains("WORKLOGBOT_LOCAL_ENDPOINT"));
    }

    #[test]
    fn generate_uses_single_prompt_shape() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJsonString(
                r#"{"model":"llama-test","prompt":"describe","stream":false}"#.into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"model":"llama-test","created_at":"2024-01-01T00:00:00Z","response":"- Added cache","done":true,"done_reason":"stop","context":[1,2,3]}"#,
            )
            .create();

        let client = LocalClient::new(&config(Some(format!("{}/", server.url()).as_str()))).unwrap();
        let resp = client.generate("describe").unwrap();

        mock.assert();
        assert_eq!(resp.text, "- Added cache");
        assert!(!resp.truncated);
    }

    #[test]
    fn length_done_reason_is_truncation() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"response":"- Added ca","done":true,"done_reason":"length"}"#)
            .create();

        let client = LocalClient::new(&config(Some(server.url().as_str()))).unwrap();
        let (resp, warnings) = warnings_during(|| client.generate("describe").unwrap());

        assert!(resp.truncated);
        assert_eq!(resp.text, "- Added ca");
        assert!(warnings.iter().any(|w| w.contains("output-length limit")));
    }

    #[test]
    fn unknown_model_maps_to_model_not_found() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/generate")
            .with_status(404)
            .with_body(r#"{"error":"model 'llama-test' not found"}"#)
            .create();

        let client = LocalClient::new(&config(Some(server.url().as_str()))).unwrap();
        assert!(matches!(
            client.generate("describe").unwrap_err(),
            LlmError::ModelNotFound { .. }
        ));
    }

    #[test]
    fn list_models_reads_tags() {
        let mut server = Server::new();
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"qwen2.5:7b","size":1},{"name":"llama3.2:latest","size":2}]}"#)
            .create();

        let client = LocalClient::new(&config(Some(server.url().as_str()))).unwrap();
        assert_eq!(
            client.list_models().unwrap(),
            vec!["llama3.2:latest", "qwen2.5:7b"]
        );
    }
}
