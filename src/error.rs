use thiserror::Error;

use crate::types::Style;

/// Failures of a single provider call.
///
/// Every message names what the user can change to recover.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider} is not configured: `{setting}` is missing. {hint}")]
    Configuration {
        provider: &'static str,
        setting: &'static str,
        hint: String,
    },

    #[error(
        "{provider} returned no candidates{reason}. The reply may have been filtered; \
         try again with a smaller diff or switch to another model."
    )]
    EmptyResponse { provider: &'static str, reason: String },

    #[error("{provider} rate limit reached. Wait a moment before retrying or switch to another model.")]
    RateLimited { provider: &'static str },

    #[error("{provider} model `{model}` was not found. Pick another model (see `worklogbot models`).")]
    ModelNotFound { provider: &'static str, model: String },

    #[error(
        "{provider} rejected the request for model `{model}`: {detail}. \
         The model may not support text generation; switch to a different model."
    )]
    InvalidRequest {
        provider: &'static str,
        model: String,
        detail: String,
    },

    #[error("{provider} rejected the API key. Re-enter `{setting}` and try again.")]
    InvalidCredential {
        provider: &'static str,
        setting: &'static str,
    },

    #[error("{provider} request failed{}: {detail}", status_suffix(.status))]
    Network {
        provider: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[error("failed to decode {provider} response: {detail}")]
    Decode { provider: &'static str, detail: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Failures of a whole summarize / describe run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no changes to summarize")]
    NoChanges,

    #[error("the model reply could not be turned into a {style} result; try again or switch models")]
    UnusableResponse { style: Style },

    #[error(transparent)]
    Provider(#[from] LlmError),
}
