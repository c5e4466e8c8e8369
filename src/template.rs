//! Filling pull-request templates with generated content.
//!
//! The filler only touches two things: the placeholder text directly under a
//! recognized section header, and unchecked checkboxes whose keyword rule
//! fires. Every other byte of the template is copied through unchanged.

use crate::types::{FilledTemplate, PrTemplate, WorklogResult};

/// Used when the repository has no template of its own.
pub const DEFAULT_TEMPLATE: &str = r#"## Description

<!-- What does this change do and why? -->

## Changes Made

<!-- List the notable changes. -->

## Type of change

- [ ] Bug fix (non-breaking change which fixes an issue)
- [ ] New feature (non-breaking change which adds functionality)
- [ ] Breaking change (fix or feature that would cause existing functionality to change)
- [ ] Documentation update
- [ ] Refactor (no functional changes)

## Checklist

- [ ] I have tested these changes locally
- [ ] I have updated the documentation where needed
"#;

const DESCRIPTION_HEADERS: &[&str] = &[
    "description",
    "summary",
    "overview",
    "prdescription",
    "whatdoesthisprdo",
    "whatdoesthisdo",
    "purpose",
];

const CHANGES_HEADERS: &[&str] = &[
    "changes",
    "changesmade",
    "whatchanged",
    "listofchanges",
    "summaryofchanges",
    "proposedchanges",
    "changelog",
];

/// Lines under a header that are treated as filler to be replaced.
const PLACEHOLDER_OPENERS: &[&str] = &[
    "please",
    "describe",
    "provide",
    "explain",
    "summarize",
    "summary of",
    "include a",
    "add a",
    "a brief",
    "a clear",
    "todo",
    "tbd",
    "n/a",
];

/// Maps a family of checkbox labels to the words that signal it applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckboxRule {
    /// A checkbox belongs to this rule when its label starts with one of these.
    pub label_prefixes: Vec<String>,
    /// Words in the change text that start with one of these mark the box.
    pub signals: Vec<String>,
}

impl CheckboxRule {
    pub fn new(label_prefixes: &[&str], signals: &[&str]) -> Self {
        Self {
            label_prefixes: label_prefixes.iter().map(|s| s.to_lowercase()).collect(),
            signals: signals.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// Keyword heuristics for common "type of change" boxes. Order matters:
    /// a checkbox is matched against the first rule whose prefix fits.
    pub fn defaults() -> Vec<CheckboxRule> {
        vec![
            CheckboxRule::new(&["breaking"], &["break", "major"]),
            CheckboxRule::new(
                &["bug fix", "bugfix", "bug", "fix", "hotfix"],
                &["fix", "bug", "hotfix", "patch", "resolve"],
            ),
            CheckboxRule::new(
                &["new feature", "feature", "feat", "enhancement"],
                &["feat", "add", "new", "introduce", "implement", "support"],
            ),
            CheckboxRule::new(
                &["documentation", "docs"],
                &["docs", "documentation", "readme"],
            ),
            CheckboxRule::new(
                &["refactor", "code refactor", "chore"],
                &["refactor", "cleanup", "restructure", "rename"],
            ),
            CheckboxRule::new(
                &["performance", "perf"],
                &["perf", "performance", "optimiz", "faster", "speed"],
            ),
        ]
    }

    fn owns(&self, label: &str) -> bool {
        self.label_prefixes.iter().any(|p| label.starts_with(p.as_str()))
    }

    fn fires(&self, words: &[String]) -> bool {
        words
            .iter()
            .any(|w| self.signals.iter().any(|s| w.starts_with(s.as_str())))
    }
}

/// What goes into the description-like and changes-like sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrContent {
    pub description: String,
    pub changes: String,
}

impl PrContent {
    /// The same text for every section.
    pub fn from_text(text: &str) -> Self {
        Self {
            description: text.trim().to_string(),
            changes: text.trim().to_string(),
        }
    }

    /// The stand-up script describes the PR, the bullets list the changes.
    pub fn from_worklog(worklog: &WorklogResult) -> Self {
        let bullets = worklog.bullets.trim().to_string();
        let script = worklog.stand_up_script.trim();
        Self {
            description: if script.is_empty() {
                bullets.clone()
            } else {
                script.to_string()
            },
            changes: bullets,
        }
    }

    fn signal_text(&self) -> String {
        format!("{}\n{}", self.description, self.changes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Description,
    Changes,
}

struct Replacement {
    start: usize,
    end: usize,
    text: String,
}

#[derive(Debug, Clone)]
pub struct TemplateFiller {
    rules: Vec<CheckboxRule>,
}

impl Default for TemplateFiller {
    fn default() -> Self {
        Self::new(CheckboxRule::defaults())
    }
}

impl TemplateFiller {
    pub fn new(rules: Vec<CheckboxRule>) -> Self {
        Self { rules }
    }

    /// Fill `template` with `content`, marking checkboxes that the content
    /// or `commits` signal. The result is not cleaned up; see [`cleanup`].
    pub fn fill(
        &self,
        template: &PrTemplate,
        content: &PrContent,
        commits: &[String],
    ) -> FilledTemplate {
        let mut signal_text = content.signal_text();
        for commit in commits {
            signal_text.push('\n');
            signal_text.push_str(commit);
        }

        let checked = self.infer_checkboxes(&template.raw_content, &signal_text);
        let filled = fill_sections(&checked, content);

        log::debug!(
            "Filled template {:?} ({} -> {} bytes)",
            template.identity,
            template.raw_content.len(),
            filled.len()
        );

        FilledTemplate { content: filled }
    }

    /// Flip `- [ ]` to `- [x]` for every checkbox whose rule fires on
    /// `signal_text`. Checked and unmatched boxes are left alone.
    pub fn infer_checkboxes(&self, template: &str, signal_text: &str) -> String {
        let words = words(signal_text);
        let mut out = String::with_capacity(template.len());
        let mut in_fence = false;

        for line in template.split_inclusive('\n') {
            if is_fence(line) {
                in_fence = !in_fence;
                out.push_str(line);
                continue;
            }

            match unchecked_box(line) {
                Some((idx, label)) if !in_fence && self.marks(&label, &words) => {
                    out.push_str(&line[..idx]);
                    out.push('x');
                    out.push_str(&line[idx + 1..]);
                }
                _ => out.push_str(line),
            }
        }
        out
    }

    fn marks(&self, label: &str, words: &[String]) -> bool {
        self.rules
            .iter()
            .find(|r| r.owns(label))
            .is_some_and(|r| r.fires(words))
    }
}

fn fill_sections(template: &str, content: &PrContent) -> String {
    let lines: Vec<(usize, &str)> = template
        .split_inclusive('\n')
        .scan(0usize, |offset, line| {
            let start = *offset;
            *offset += line.len();
            Some((start, line))
        })
        .collect();

    let mut replacements: Vec<Replacement> = Vec::new();
    let mut seen: Vec<SectionKind> = Vec::new();
    let mut in_fence = false;

    for (i, (start, line)) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(kind) = section_kind(line) else {
            continue;
        };
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);

        let insert = match kind {
            SectionKind::Description => content.description.trim(),
            SectionKind::Changes => content.changes.trim(),
        };
        if insert.is_empty() {
            continue;
        }

        let body_start = start + line.len();
        let body_end = placeholder_end(&lines, i + 1, template.len());

        let mut text = String::new();
        if !line.ends_with('\n') {
            text.push('\n');
        }
        text.push('\n');
        text.push_str(insert);
        text.push('\n');
        if body_end < template.len() {
            text.push('\n');
        }

        replacements.push(Replacement {
            start: body_start,
            end: body_end,
            text,
        });
    }

    let mut out = String::with_capacity(template.len() + 256);
    let mut cursor = 0;
    for r in &replacements {
        out.push_str(&template[cursor..r.start]);
        out.push_str(&r.text);
        cursor = r.end;
    }
    out.push_str(&template[cursor..]);

    if seen.is_empty() {
        append_sections(&mut out, content);
    }
    out
}

/// A template without any recognized section still gets the content.
fn append_sections(out: &mut String, content: &PrContent) {
    let description = content.description.trim();
    let changes = content.changes.trim();
    if description.is_empty() && changes.is_empty() {
        return;
    }

    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }

    if !description.is_empty() {
        out.push_str("## Description\n\n");
        out.push_str(description);
        out.push('\n');
    }
    if !changes.is_empty() && changes != description {
        if !description.is_empty() {
            out.push('\n');
        }
        out.push_str("## Changes\n\n");
        out.push_str(changes);
        out.push('\n');
    }
}

/// Byte offset where the placeholder run starting at line `from` ends.
/// Text after a closing `-->` on the same line is not placeholder.
fn placeholder_end(lines: &[(usize, &str)], from: usize, total_len: usize) -> usize {
    let mut i = from;
    while i < lines.len() {
        let (start, line) = lines[i];
        let trimmed = line.trim();
        if trimmed.starts_with("<!--") {
            let open = line.find("<!--").map_or(0, |p| p + 4);
            let close = (i..lines.len()).find_map(|j| {
                let offset = if j == i { open } else { 0 };
                lines[j].1[offset..].find("-->").map(|p| (j, offset + p + 3))
            });
            let Some((j, after)) = close else {
                return start;
            };
            let (close_start, close_line) = lines[j];
            if !close_line[after..].trim().is_empty() {
                return close_start + after;
            }
            i = j + 1;
            continue;
        }
        if !is_placeholder_line(trimmed) {
            return start;
        }
        i += 1;
    }
    total_len
}

fn is_placeholder_line(trimmed: &str) -> bool {
    if trimmed.is_empty() || matches!(trimmed, "-" | "*" | "1.") {
        return true;
    }
    if is_header(trimmed) || unchecked_box(trimmed).is_some() || is_checkbox(trimmed) {
        return false;
    }

    let wrapped = |open: char, close: char| {
        trimmed.len() > 2 && trimmed.starts_with(open) && trimmed.ends_with(close)
    };
    if wrapped('[', ']') || wrapped('_', '_') {
        return true;
    }
    if wrapped('<', '>') && trimmed.contains(' ') {
        return true;
    }
    if wrapped('*', '*') && !trimmed.starts_with("**") {
        return true;
    }

    let lower = trimmed.to_lowercase();
    PLACEHOLDER_OPENERS.iter().any(|p| lower.starts_with(p))
}

fn section_kind(line: &str) -> Option<SectionKind> {
    if !is_header(line) {
        return None;
    }
    let key: String = line
        .trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();

    if DESCRIPTION_HEADERS.contains(&key.as_str()) {
        Some(SectionKind::Description)
    } else if CHANGES_HEADERS.contains(&key.as_str()) {
        Some(SectionKind::Changes)
    } else {
        None
    }
}

/// Byte index of the space inside `[ ]` and the lowercased label.
fn unchecked_box(line: &str) -> Option<(usize, String)> {
    let indent = line.len() - line.trim_start().len();
    let rest = &line[indent..];
    let after_marker = ["- ", "* ", "+ "]
        .iter()
        .find_map(|m| rest.strip_prefix(m))?;
    let label = after_marker.strip_prefix("[ ]")?;

    let idx = indent + 2 + 1;
    let label = label
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    Some((idx, label))
}

fn is_checkbox(line: &str) -> bool {
    let t = line.trim_start();
    ["- [", "* [", "+ ["].iter().any(|p| t.starts_with(p))
}

/// Lowercased alphanumeric words.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// `#` to `######` followed by a space (or nothing), so `#123` is not a header.
fn is_header(line: &str) -> bool {
    let t = line.trim_start();
    let hashes = t.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes)
        && t[hashes..]
            .chars()
            .next()
            .is_none_or(|c| c == ' ' || c == '\t' || c == '\n' || c == '\r')
}

fn is_list_item(line: &str) -> bool {
    let t = line.trim_start();
    ["- ", "* ", "+ "].iter().any(|m| t.starts_with(m)) || t == "-"
}

fn is_prose(line: &str) -> bool {
    !line.is_empty()
        && !line.starts_with(char::is_whitespace)
        && !is_header(line)
        && !is_list_item(line)
}

/// Cosmetic pass over a filled template: strips a code fence wrapping the
/// whole text, puts blank lines around headers and before lists, and
/// collapses runs of blank lines. Applying it twice changes nothing.
pub fn cleanup(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    trim_blank_edges(&mut lines);
    strip_fence_wrapper(&mut lines);

    let mut spaced: Vec<&str> = Vec::with_capacity(lines.len() + 16);
    let mut in_fence = false;

    for (i, &line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            spaced.push(line);
            continue;
        }

        if !in_fence {
            let prev = spaced.last().copied().unwrap_or("");
            if is_header(line) && !prev.is_empty() {
                spaced.push("");
            } else if is_list_item(line) && is_prose(prev) {
                spaced.push("");
            }
        }

        spaced.push(line);

        if !in_fence && is_header(line) && lines.get(i + 1).is_some_and(|next| !next.is_empty()) {
            spaced.push("");
        }
    }

    let mut out: Vec<&str> = Vec::with_capacity(spaced.len());
    for line in spaced {
        if line.is_empty() && out.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    trim_blank_edges(&mut out);

    if out.is_empty() {
        return String::new();
    }
    let mut joined = out.join("\n");
    joined.push('\n');
    joined
}

fn trim_blank_edges(lines: &mut Vec<&str>) {
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
}

/// Remove a ```` ``` ```` / ```` ```markdown ```` wrapper, but only when those
/// two lines are the only fences in the text.
fn strip_fence_wrapper(lines: &mut Vec<&str>) {
    let fences = lines.iter().filter(|l| is_fence(l)).count();
    if fences != 2 || lines.len() < 2 {
        return;
    }
    let first = lines[0].trim();
    let last = lines[lines.len() - 1].trim();
    let lang = first.trim_start_matches('`').trim().to_lowercase();
    if first.starts_with("```")
        && last == "```"
        && matches!(lang.as_str(), "" | "markdown" | "md")
    {
        lines.pop();
        lines.remove(0);
        trim_blank_edges(lines);
    }
}
