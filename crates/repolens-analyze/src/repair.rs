//! Line-oriented auto-fixes for common Mermaid mistakes.
//!
//! The pass is idempotent: `repair(&repair(x)) == repair(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validate::DIAGRAM_KEYWORDS;

static LONG_SOLID_ARROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{4,}>").unwrap());
static LONG_DOTTED_ARROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{4,}>").unwrap());
static SEMICOLON_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r";+").unwrap());
static SPACED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s+(\w+)(\s*)$").unwrap());
static ENDS_IN_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w\s*$").unwrap());

const FENCE: &str = "```";

pub fn repair(code: &str) -> String {
    let repaired = code
        .lines()
        .filter_map(unfence)
        .map(repair_line)
        .collect::<Vec<_>>()
        .join("\n");
    repaired.trim().to_string()
}

/// Strip code-fence markup from a line. A bare fence, or a fence carrying only
/// a language tag, disappears; a tag followed by the header on the same line
/// leaves just the header.
fn unfence(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let opens = trimmed.starts_with(FENCE);
    if !opens && !trimmed.ends_with(FENCE) {
        return Some(line);
    }

    let inner = trimmed.trim_matches('`').trim();
    if opens && inner.starts_with(FENCE) {
        return unfence(inner);
    }
    let kept = if opens {
        match inner.split_whitespace().next() {
            None => return None,
            Some(tag) if !is_diagram_keyword(tag) => inner[tag.len()..].trim(),
            Some(_) => inner,
        }
    } else {
        inner
    };

    if kept.is_empty() {
        None
    } else if kept.starts_with(FENCE) || kept.ends_with(FENCE) {
        unfence(kept)
    } else {
        Some(kept)
    }
}

fn is_diagram_keyword(token: &str) -> bool {
    DIAGRAM_KEYWORDS.iter().any(|k| token.starts_with(k))
}

fn is_passthrough(line: &str) -> bool {
    line.is_empty() || line.starts_with("%%") || line.starts_with("subgraph") || line == "end"
}

fn repair_line(line: &str) -> String {
    let line = line.trim();
    if is_passthrough(line) {
        return line.to_string();
    }

    let line = LONG_SOLID_ARROW.replace_all(line, "-->");
    let line = LONG_DOTTED_ARROW.replace_all(&line, "-..->");
    let line = line.replace("===>", "-->").replace("....>", "-..->");

    let line = match line.split_once('[') {
        Some((before, after)) => format!("{}[{}", join_spaced_id(before), after),
        None => line,
    };

    SEMICOLON_RUN.replace_all(&line, ";").into_owned()
}

/// `A --> my node` becomes `A --> my_node`. A run of three or more bare words
/// is left alone so a second pass finds nothing new to join.
fn join_spaced_id(segment: &str) -> String {
    let Some(caps) = SPACED_ID.captures(segment) else {
        return segment.to_string();
    };
    let (Some(whole), Some(first), Some(second)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return segment.to_string();
    };

    let head = &segment[..whole.start()];
    if ENDS_IN_WORD.is_match(head) {
        return segment.to_string();
    }

    let trailing = caps.get(3).map_or("", |m| m.as_str());
    format!("{head}{}_{}{trailing}", first.as_str(), second.as_str())
}
