use crate::error::PipelineError;
use crate::llm::LlmProvider;
use crate::llm::prompt_builder::build_prompt;
use crate::response;
use crate::template::{PrContent, TemplateFiller, cleanup};
use crate::types::{ChangeSet, FilledTemplate, PrTemplate, Style, StructuredResult};

/// One diff in, one structured summary out.
///
/// Holds no state between calls; the caller is expected to avoid running two
/// generations against the same credential at once.
pub struct Pipeline<'a> {
    provider: &'a dyn LlmProvider,
    filler: TemplateFiller,
}

impl<'a> Pipeline<'a> {
    pub fn new(provider: &'a dyn LlmProvider) -> Self {
        Self {
            provider,
            filler: TemplateFiller::default(),
        }
    }

    /// Use a custom set of checkbox rules for PR templates.
    pub fn with_filler(mut self, filler: TemplateFiller) -> Self {
        self.filler = filler;
        self
    }

    /// Summarize `change` in the requested style.
    pub fn summarize(
        &self,
        change: &ChangeSet,
        style: Style,
    ) -> Result<StructuredResult, PipelineError> {
        if change.is_empty() {
            return Err(PipelineError::NoChanges);
        }

        let prompt = build_prompt(change, style);
        log::trace!("Built {style} prompt ({} chars)", prompt.chars().count());

        let reply = self.provider.generate(&prompt)?;
        log::debug!("Raw {} reply:\n{}", self.provider.kind(), reply.text);

        let result = response::parse(style, &reply.text);
        if is_degenerate(&result) {
            return Err(PipelineError::UnusableResponse { style });
        }
        Ok(result)
    }

    /// Generate a technical worklog for `change` and merge it into `template`.
    pub fn describe_pull_request(
        &self,
        change: &ChangeSet,
        template: &PrTemplate,
        commits: &[String],
    ) -> Result<FilledTemplate, PipelineError> {
        let worklog = match self.summarize(change, Style::Technical)? {
            StructuredResult::Worklog(w) => w,
            _ => {
                return Err(PipelineError::UnusableResponse {
                    style: Style::Technical,
                });
            }
        };

        let filled = self
            .filler
            .fill(template, &PrContent::from_worklog(&worklog), commits);
        Ok(FilledTemplate {
            content: cleanup(&filled.content),
        })
    }
}

fn is_degenerate(result: &StructuredResult) -> bool {
    match result {
        StructuredResult::Worklog(w) => w.bullets.is_empty() && w.stand_up_script.is_empty(),
        StructuredResult::Commit(c) => c.subject.is_empty(),
        StructuredResult::Template(t) => t.content.trim().is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{LlmResponse, ProviderKind};
    use crate::types::{CommitResult, WorklogResult};
    use std::sync::Mutex;

    /// Replays a canned reply and records prompts it was sent.
    struct ScriptedProvider {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Gemini
        }

        fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(LlmResponse {
                    text: text.clone(),
                    finish_reason: Some("STOP".into()),
                    truncated: false,
                }),
                Err(()) => Err(LlmError::RateLimited { provider: "Gemini" }),
            }
        }

        fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn empty_diff_never_reaches_the_provider() {
        let provider = ScriptedProvider::replying("- anything");
        let pipeline = Pipeline::new(&provider);

        let err = pipeline
            .summarize(&ChangeSet::new("  \n\t"), Style::Technical)
            .unwrap_err();

        assert!(matches!(err, PipelineError::NoChanges));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn worklog_round_trip() {
        let provider =
            ScriptedProvider::replying("- Added `retry()` to `client.rs`\n\nSTAND-UP SCRIPT:\nI added retries.");
        let pipeline = Pipeline::new(&provider);

        let result = pipeline
            .summarize(&ChangeSet::new("+fn retry() {}"), Style::Technical)
            .unwrap();

        assert_eq!(
            result,
            StructuredResult::Worklog(WorklogResult {
                bullets: "- Added `retry()` to `client.rs`".into(),
                stand_up_script: "I added retries.".into(),
            })
        );
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].ends_with("+fn retry() {}\n```"));
    }

    #[test]
    fn commit_round_trip() {
        let provider = ScriptedProvider::replying("Add retries to client\n\n- Wrap calls in `retry()`");
        let pipeline = Pipeline::new(&provider);

        let result = pipeline
            .summarize(&ChangeSet::new("+fn retry() {}"), Style::CommitMessage)
            .unwrap();

        assert_eq!(
            result,
            StructuredResult::Commit(CommitResult {
                subject: "Add retries to client".into(),
                body: "Wrap calls in `retry()`".into(),
            })
        );
    }

    #[test]
    fn blank_reply_is_an_explicit_failure() {
        let provider = ScriptedProvider::replying("```\n```");
        let pipeline = Pipeline::new(&provider);

        let err = pipeline
            .summarize(&ChangeSet::new("+x"), Style::CommitMessage)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnusableResponse { style: Style::CommitMessage }));
    }

    #[test]
    fn provider_errors_propagate() {
        let provider = ScriptedProvider::failing();
        let pipeline = Pipeline::new(&provider);

        let err = pipeline
            .summarize(&ChangeSet::new("+x"), Style::Business)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Provider(LlmError::RateLimited { .. })));
    }

    #[test]
    fn pull_request_description_fills_template() {
        let provider = ScriptedProvider::replying(
            "- Fixed `parse()` panic on empty input\n\nSTAND-UP SCRIPT:\nI fixed a parser crash.",
        );
        let pipeline = Pipeline::new(&provider);
        let template = PrTemplate::new(
            "PULL_REQUEST_TEMPLATE.md",
            "## Description\n<!-- describe -->\n\n## Changes\n\n## Type\n- [ ] Bug fix\n- [ ] New feature\n",
        );

        let filled = pipeline
            .describe_pull_request(&ChangeSet::new("+guard"), &template, &[])
            .unwrap();

        assert_eq!(
            filled.content,
            "## Description\n\nI fixed a parser crash.\n\n## Changes\n\n- Fixed `parse()` panic on empty input\n\n## Type\n\n- [x] Bug fix\n- [ ] New feature\n"
        );
    }
}
