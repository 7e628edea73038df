//! Reply formatting pipeline
//!
//! Turns the flattened text of a model reply into an ordered list of
//! renderable segments: agent badges, paragraphs, and at most one table.
//! Malformed tables, stray control tags, and empty content degrade to fewer
//! segments or the fallback paragraph, never to an error.

mod table;

#[cfg(test)]
mod proptests;

pub use table::ExtractedTable;

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use table::{extract_tables, is_blank_cell};

/// Notice emitted when a reply strips down to (almost) nothing.
pub const EMPTY_REPLY_NOTICE: &str =
    "The response was empty or incomplete. Please try rephrasing your question.";

/// Below this many characters of stripped content, a reply is treated as
/// empty rather than echoed.
const MIN_CONTENT_LEN: usize = 5;

/// One renderable unit of a formatted assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderSegment {
    /// Pill/chip naming the worker agent that contributed to the reply.
    AgentBadge { name: String },
    /// Plain text block.
    Paragraph { text: String },
    /// Bordered grid with a header row.
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

fn agent_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<name>(.*?)</name>").expect("agent tag pattern is valid"))
}

fn empty_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Only a marker standing alone on its line counts; the word "empty"
    // inside prose is left alone.
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*EMPTY[ \t]*$").expect("empty marker pattern is valid")
    })
}

/// Format a flattened reply into render segments.
pub fn format_reply(text: &str) -> Vec<RenderSegment> {
    // Step 1: collect worker-agent names and strip the tags.
    let agents = collect_agent_names(text);
    let stripped = agent_tag_regex().replace_all(text, "");

    // Step 2: drop the bare EMPTY placeholder the model sometimes emits.
    let stripped = empty_marker_regex().replace_all(&stripped, "");

    // Step 3: extract tables before any whitespace normalization; collapsing
    // runs of spaces first would destroy the column alignment the scanner
    // keys on.
    let (tables, summary) = extract_tables(&stripped);

    // Step 4: collapse horizontal whitespace in the table-free remainder.
    let summary = normalize_whitespace(&summary);

    // Step 5: assemble segments.
    let mut segments = Vec::new();

    for agent in agents {
        segments.push(RenderSegment::AgentBadge {
            name: display_agent_name(&agent),
        });
    }

    for paragraph in split_paragraphs(&summary) {
        segments.push(RenderSegment::Paragraph { text: paragraph });
    }

    // Intermediate pipeline stages echo partial tables; the final stage's
    // table is authoritative, so only the last one is emitted.
    if let Some(table) = tables.into_iter().next_back() {
        if !table.is_all_blank() {
            segments.push(RenderSegment::Table {
                header: table.header,
                rows: table.rows,
            });
        }
    }

    // Step 6: fallback for the degenerate "nothing extracted" case.
    if segments.is_empty() {
        let content = stripped.trim();
        let text = if content.chars().count() < MIN_CONTENT_LEN {
            EMPTY_REPLY_NOTICE.to_string()
        } else {
            content.to_string()
        };
        segments.push(RenderSegment::Paragraph { text });
    }

    segments
}

/// Names enclosed in agent tags, deduplicated in first-occurrence order.
/// The supervisor is the orchestrating role, not a worker, and is never
/// badged.
fn collect_agent_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for capture in agent_tag_regex().captures_iter(text) {
        let name = capture[1].trim();
        if name.is_empty() || name.eq_ignore_ascii_case("supervisor") {
            continue;
        }
        if !names.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names
}

/// Title-case an agent identifier for display: underscores become spaces,
/// each word gets a leading capital.
fn display_agent_name(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse runs of spaces and tabs to a single space, preserving newlines.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        match c {
            ' ' | '\t' => pending_space = true,
            '\n' => {
                pending_space = false;
                out.push('\n');
            }
            _ => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(c);
            }
        }
    }
    out
}

/// Split normalized summary text into paragraphs on blank lines, dropping
/// leftover separator punctuation from partially mis-detected tables.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !current.is_empty() {
                let paragraph = current.join("\n").trim().to_string();
                current.clear();
                if !paragraph.is_empty() && !is_separator_residue(&paragraph) {
                    paragraphs.push(paragraph);
                }
            }
        } else {
            current.push(line);
        }
    }

    paragraphs
}

fn is_separator_residue(paragraph: &str) -> bool {
    paragraph.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty()
            || trimmed
                .chars()
                .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
    })
}

/// Renderer-facing cell text: blank and placeholder cells display as an
/// em dash.
#[must_use]
pub fn display_cell(cell: &str) -> &str {
    if is_blank_cell(cell) {
        "\u{2014}"
    } else {
        cell.trim()
    }
}
