//! Turn diffs into work logs, stand-up scripts, commit messages and
//! pull-request descriptions with an LLM.
//!
//! The pipeline is: [`llm::prompt_builder`] → an [`llm::LlmProvider`] →
//! [`response`] parsing → optionally the [`template`] filler. [`pipeline::Pipeline`]
//! wires these together.

pub mod cli_args;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod response;
pub mod template;
pub mod types;

pub use error::{LlmError, PipelineError};
pub use llm::{LlmProvider, LlmResponse, ProviderConfig, ProviderKind, build_provider};
pub use pipeline::Pipeline;
pub use types::{
    ChangeSet, CommitResult, FilledTemplate, PrTemplate, Style, StructuredResult, WorklogResult,
};
