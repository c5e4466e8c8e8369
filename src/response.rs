//! Best-effort parsing of free-text model replies.
//!
//! Nothing here fails on malformed output. The cleanup rules below are a list
//! of artifacts models are known to emit despite the prompt's output contract;
//! new models may produce new ones, and those have to be added here.

use crate::types::{CommitResult, MAX_SUBJECT_CHARS, Style, StructuredResult, WorklogResult};

/// Labels the model sometimes writes above the worklog bullets.
const WORKLOG_LABELS: &[&str] = &[
    "worklog",
    "work log",
    "technical worklog",
    "business worklog",
    "bullets",
    "bullet points",
    "summary",
    "changes",
];

/// Labels the model sometimes puts in front of the commit subject or body.
const COMMIT_LABELS: &[&str] = &[
    "commit message",
    "commit",
    "subject",
    "subject line",
    "title",
    "summary",
];

const BODY_LABELS: &[&str] = &["body", "description", "details", "changes"];

/// Labels that open the stand-up section. Only whole labels count, so prose
/// that merely starts with "standup" stays a bullet.
const STANDUP_LABELS: &[&str] = &[
    "stand-up script",
    "standup script",
    "stand-up",
    "standup",
    "daily stand-up",
    "daily standup",
    "daily stand-up script",
    "stand-up update",
    "stand-up summary",
    "stand-up notes",
];

/// Parse a reply according to the style it was requested with.
pub fn parse(style: Style, raw: &str) -> StructuredResult {
    match style {
        Style::Technical | Style::Business => StructuredResult::Worklog(parse_worklog(raw)),
        Style::CommitMessage => StructuredResult::Commit(parse_commit(raw)),
    }
}

/// Split a worklog reply into bullets and stand-up script.
///
/// Without a recognizable stand-up marker the whole reply becomes the
/// bullets and the script is left empty.
pub fn parse_worklog(raw: &str) -> WorklogResult {
    let lines: Vec<&str> = raw.lines().collect();

    let (bullet_lines, script_lines): (&[&str], Vec<&str>) =
        match lines.iter().position(|l| is_standup_marker(l)) {
            Some(idx) => {
                let mut script = Vec::new();
                if let Some(inline) = text_after_label(lines[idx]) {
                    script.push(inline);
                }
                script.extend_from_slice(&lines[idx + 1..]);
                (&lines[..idx], script)
            }
            None => (&lines[..], Vec::new()),
        };

    let bullets = bullet_lines
        .iter()
        .map(|l| strip_bold(l.trim_end()))
        .filter(|l| !is_fence(l) && !is_preamble(l) && !is_label_line(l, WORKLOG_LABELS))
        .map(|l| normalize_bullet(&l))
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let stand_up_script = script_lines
        .iter()
        .map(|l| strip_bold(l.trim()))
        .filter(|l| !l.is_empty() && !is_fence(l))
        .collect::<Vec<_>>()
        .join(" ");
    let stand_up_script = strip_quotes(&stand_up_script).to_string();

    WorklogResult {
        bullets,
        stand_up_script,
    }
}

/// Turn a reply into a commit subject (at most 100 characters) and a
/// plain-text body.
pub fn parse_commit(raw: &str) -> CommitResult {
    let mut lines = raw.lines();
    let mut subject = String::new();

    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_fence(trimmed) || is_rule(trimmed) || is_preamble(trimmed) {
            continue;
        }
        let cleaned = clean_subject(trimmed);
        if !cleaned.is_empty() {
            subject = cleaned;
            break;
        }
    }

    let body = lines
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_fence(l) && !is_rule(l) && !is_header(l))
        .filter(|l| !is_label_line(l, BODY_LABELS))
        .map(|l| strip_bold(strip_bullet(l)))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    CommitResult {
        subject: cap_subject(&subject),
        body,
    }
}

/// Cap a subject at [`MAX_SUBJECT_CHARS`], ending in "..." when cut.
pub fn cap_subject(subject: &str) -> String {
    if subject.chars().count() <= MAX_SUBJECT_CHARS {
        return subject.to_string();
    }
    let mut out: String = subject.chars().take(MAX_SUBJECT_CHARS - 3).collect();
    out.push_str("...");
    out
}

fn clean_subject(line: &str) -> String {
    let line = line.trim_start_matches('#').trim();
    let line = strip_bold(strip_bullet(line));
    let mut line = line.trim();

    // "Commit Message: Fix parser" -> "Fix parser"; a bare label yields "".
    if let Some((label, rest)) = line.split_once(':') {
        if is_known_label(label, COMMIT_LABELS) {
            line = rest.trim();
        }
    }

    strip_quotes(line.trim_matches('`').trim()).to_string()
}

fn is_standup_marker(line: &str) -> bool {
    let trimmed = line.trim_start();
    if strip_bullet(trimmed).len() != trimmed.len() {
        return false;
    }
    let label = trimmed.split(':').next().unwrap_or(trimmed);
    is_known_label(label, STANDUP_LABELS)
}

/// Text after the first ':' of a label line, if any.
fn text_after_label(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(':')?;
    let rest = rest.trim().trim_start_matches("**").trim();
    (!rest.is_empty()).then_some(rest)
}

fn is_label_line(line: &str, labels: &[&str]) -> bool {
    let trimmed = line.trim().trim_start_matches('#').trim();
    let Some(label) = trimmed.strip_suffix(':') else {
        // Markdown headers count as labels even without a colon.
        return line.trim_start().starts_with('#') && is_known_label(trimmed, labels);
    };
    is_known_label(label, labels)
}

fn is_known_label(text: &str, labels: &[&str]) -> bool {
    let key = normalize_key(text);
    labels.iter().any(|l| normalize_key(l) == key)
}

/// Lowercase letters and digits only.
fn normalize_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn strip_bold(line: &str) -> String {
    line.replace("**", "")
}

/// "Here is the worklog:" and similar lead-ins.
fn is_preamble(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    lower.ends_with(':')
        && (lower.starts_with("here is") || lower.starts_with("here's") || lower.starts_with("sure"))
}

fn strip_quotes(text: &str) -> &str {
    let t = text.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if let Some(inner) = t.strip_prefix(open).and_then(|s| s.strip_suffix(close)) {
            return inner.trim();
        }
    }
    t
}

fn strip_bullet(line: &str) -> &str {
    for marker in ["- ", "* ", "• ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    line
}

/// Rewrite "*", "•" and "+" bullets as dash bullets.
fn normalize_bullet(line: &str) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, rest) = line.split_at(indent_len);
    let stripped = strip_bullet(rest);
    if stripped.len() != rest.len() {
        format!("{indent}- {stripped}")
    } else {
        line.to_string()
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn is_rule(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3
        && (t.chars().all(|c| c == '-') || t.chars().all(|c| c == '*') || t.chars().all(|c| c == '_'))
}

fn is_header(line: &str) -> bool {
    line.trim_start().starts_with('#')
}
