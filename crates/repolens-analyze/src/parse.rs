use repolens_core::rules::{DIAGRAM_END, DIAGRAM_START};
use repolens_core::DiagramType;
use tracing::warn;

use crate::repair::repair;
use crate::validate::validate_syntax;

/// A diagram pulled out of one model reply, before and after repair.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramCandidate {
    pub raw_text: String,
    pub repaired_text: String,
    pub diagram_type: DiagramType,
    pub syntax_errors: Vec<String>,
    pub completeness_issues: Vec<String>,
}

impl DiagramCandidate {
    pub fn new(raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let repaired_text = repair(&raw_text);
        let diagram_type = detect_diagram_type(&repaired_text);
        Self {
            raw_text,
            repaired_text,
            diagram_type,
            syntax_errors: vec![],
            completeness_issues: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub answer: String,
    pub diagram: Option<DiagramCandidate>,
}

/// Keyword prefixes (lower-cased) in match order.
const TYPE_PREFIXES: [(&str, DiagramType); 6] = [
    ("sequencediagram", DiagramType::Sequence),
    ("flowchart", DiagramType::Flowchart),
    ("graph", DiagramType::Flowchart),
    ("classdiagram", DiagramType::Class),
    ("erdiagram", DiagramType::Database),
    ("statediagram", DiagramType::State),
];

/// Classify a diagram by the keyword on its first non-blank line.
pub fn detect_diagram_type(code: &str) -> DiagramType {
    let header = code
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_lowercase();

    TYPE_PREFIXES
        .iter()
        .find(|(prefix, _)| header.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or(DiagramType::Custom)
}

/// Split a reply into answer text and the diagram between the markers.
/// Missing or out-of-order markers leave the whole reply as the answer.
pub fn extract_diagram_from_response(text: &str) -> ParsedResponse {
    let text = text.trim();

    let bounds = text.find(DIAGRAM_START).and_then(|start| {
        let body_start = start + DIAGRAM_START.len();
        let end = text[body_start..].find(DIAGRAM_END)? + body_start;
        Some((start, body_start, end))
    });

    let Some((start, body_start, end)) = bounds else {
        if text.contains(DIAGRAM_START) || text.contains(DIAGRAM_END) {
            warn!("diagram markers malformed, treating reply as plain text");
        }
        return ParsedResponse { answer: text.to_string(), diagram: None };
    };

    let answer = text[..start].trim().to_string();
    let body = text[body_start..end].trim();
    let diagram = (!body.is_empty()).then(|| DiagramCandidate::new(body));

    ParsedResponse { answer, diagram }
}

/// Repair a diagram and log, without acting on, any syntax problems left.
pub fn clean_mermaid_code(code: &str) -> String {
    let cleaned = repair(code);
    let report = validate_syntax(&cleaned);
    if !report.valid {
        warn!(errors = %report.errors.join(", "), "diagram validation warnings");
    }
    cleaned
}
