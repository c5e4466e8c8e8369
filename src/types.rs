use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Maximum number of characters of change text embedded in a prompt.
pub const MAX_CHANGE_CHARS: usize = 10_000;

/// Appended after a change set that was cut to [`MAX_CHANGE_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Maximum length of a commit subject line, in characters.
pub const MAX_SUBJECT_CHARS: usize = 100;

/// The diff/patch text a summary is generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    text: String,
}

impl ChangeSet {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when there is nothing worth sending to a model.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The text as it may be embedded in a prompt: at most
    /// [`MAX_CHANGE_CHARS`] characters, followed by [`TRUNCATION_MARKER`]
    /// when anything was cut.
    pub fn capped(&self) -> String {
        match self.text.char_indices().nth(MAX_CHANGE_CHARS) {
            None => self.text.clone(),
            Some((byte_idx, _)) => {
                let mut out = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
                out.push_str(&self.text[..byte_idx]);
                out.push_str(TRUNCATION_MARKER);
                out
            }
        }
    }
}

impl From<&str> for ChangeSet {
    fn from(s: &str) -> Self {
        ChangeSet::new(s)
    }
}

impl From<String> for ChangeSet {
    fn from(s: String) -> Self {
        ChangeSet::new(s)
    }
}

/// Which kind of summary to ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    Technical,
    Business,
    CommitMessage,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Technical => "technical",
            Style::Business => "business",
            Style::CommitMessage => "commit-message",
        }
    }

    /// Worklog styles produce bullets plus a stand-up script.
    pub fn is_worklog(&self) -> bool {
        matches!(self, Style::Technical | Style::Business)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" | "tech" => Ok(Style::Technical),
            "business" | "non-technical" => Ok(Style::Business),
            "commit-message" | "commit" => Ok(Style::CommitMessage),
            other => Err(format!(
                "unknown style '{other}' (expected technical, business or commit-message)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorklogResult {
    /// Dash-prefixed bullet lines, newline separated.
    pub bullets: String,
    /// Empty when the model produced no recognizable stand-up section.
    pub stand_up_script: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitResult {
    pub subject: String,
    pub body: String,
}

impl CommitResult {
    /// Subject and body in the layout `git commit` expects.
    pub fn to_message(&self) -> String {
        if self.body.is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.body)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledTemplate {
    pub content: String,
}

/// A pull-request template as read from the repository (or pasted in).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrTemplate {
    pub identity: String,
    pub raw_content: String,
}

impl PrTemplate {
    pub fn new(identity: impl Into<String>, raw_content: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            raw_content: raw_content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredResult {
    Worklog(WorklogResult),
    Commit(CommitResult),
    Template(FilledTemplate),
}

impl StructuredResult {
    /// Titled blocks for display, in reading order. Blank blocks are left out.
    pub fn sections(&self) -> Vec<(&'static str, String)> {
        let blocks = match self {
            StructuredResult::Worklog(w) => vec![
                ("Worklog", w.bullets.clone()),
                ("Stand-up Script", w.stand_up_script.clone()),
            ],
            StructuredResult::Commit(c) => vec![("Commit Message", c.to_message())],
            StructuredResult::Template(t) => vec![("PR Message", t.content.clone())],
        };
        blocks
            .into_iter()
            .filter(|(_, body)| !body.trim().is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_change_is_not_capped() {
        let change = ChangeSet::new("diff --git a/x b/x");
        assert_eq!(change.capped(), "diff --git a/x b/x");
    }

    #[test]
    fn exactly_max_chars_is_not_capped() {
        let text = "a".repeat(MAX_CHANGE_CHARS);
        assert_eq!(ChangeSet::new(text.clone()).capped(), text);
    }

    #[test]
    fn long_change_is_capped_on_char_boundary() {
        let text = "é".repeat(MAX_CHANGE_CHARS + 5);
        let capped = ChangeSet::new(text).capped();
        let expected = format!("{}{}", "é".repeat(MAX_CHANGE_CHARS), TRUNCATION_MARKER);
        assert_eq!(capped, expected);
    }

    #[test]
    fn whitespace_only_change_is_empty() {
        assert!(ChangeSet::new(" \n\t ").is_empty());
        assert!(!ChangeSet::new(" + added").is_empty());
    }

    #[test]
    fn style_parses_aliases() {
        assert_eq!("Business".parse::<Style>(), Ok(Style::Business));
        assert_eq!("commit".parse::<Style>(), Ok(Style::CommitMessage));
        assert!("poetry".parse::<Style>().is_err());
    }

    #[test]
    fn sections_skip_blank_blocks() {
        let worklog = StructuredResult::Worklog(WorklogResult {
            bullets: "- Added retries".into(),
            stand_up_script: String::new(),
        });
        assert_eq!(worklog.sections(), vec![("Worklog", "- Added retries".to_string())]);

        let filled = StructuredResult::Template(FilledTemplate {
            content: "## Description\n\nAdds caching\n".into(),
        });
        assert_eq!(
            filled.sections(),
            vec![("PR Message", "## Description\n\nAdds caching\n".to_string())]
        );
    }

    #[test]
    fn commit_message_layout() {
        let commit = CommitResult {
            subject: "Add pricing rules".into(),
            body: "Handles discounts".into(),
        };
        assert_eq!(commit.to_message(), "Add pricing rules\n\nHandles discounts");
    }
}
