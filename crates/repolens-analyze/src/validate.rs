use repolens_core::MinNodePolicy;

/// Outcome of a structural or completeness check. Never mutates the diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self { valid: errors.is_empty(), errors }
    }
}

/// Header keywords a Mermaid diagram may open with (case-sensitive prefixes).
pub const DIAGRAM_KEYWORDS: [&str; 11] = [
    "sequenceDiagram",
    "graph",
    "flowchart",
    "classDiagram",
    "erDiagram",
    "stateDiagram",
    "journey",
    "gantt",
    "mindmap",
    "pie",
    "gitGraph",
];

const PAIRS: [(char, char, &str); 3] = [
    ('[', ']', "brackets"),
    ('(', ')', "parentheses"),
    ('{', '}', "braces"),
];

fn is_exempt(line: &str) -> bool {
    line.is_empty() || line.starts_with("%%") || line.starts_with("subgraph") || line == "end"
}

/// Check the header keyword, then per-line delimiter balance.
///
/// A bad header is fatal and reported alone. Imbalances are collected for
/// every remaining line; the header is line 0, so the first body line is
/// "Line 1".
pub fn validate_syntax(code: &str) -> ValidationReport {
    let mut lines = code
        .lines()
        .map(str::trim)
        .skip_while(|l| l.is_empty())
        .enumerate();

    let Some((_, header)) = lines.next() else {
        return ValidationReport::from_errors(vec!["Empty diagram code".to_string()]);
    };

    if !DIAGRAM_KEYWORDS.iter().any(|k| header.starts_with(k)) {
        let shown: String = header.chars().take(50).collect();
        return ValidationReport::from_errors(vec![format!("Invalid diagram type: {shown}")]);
    }

    let mut errors = Vec::new();
    for (number, line) in lines {
        if is_exempt(line) {
            continue;
        }
        for (open, close, name) in PAIRS {
            if line.matches(open).count() != line.matches(close).count() {
                errors.push(format!("Line {number}: Unmatched {name}"));
            }
        }
    }

    ValidationReport::from_errors(errors)
}

/// Lines that introduce a labelled node.
pub fn count_nodes(code: &str) -> usize {
    code.lines()
        .filter(|l| l.contains('[') && l.contains(']') && !l.trim().starts_with("%%"))
        .count()
}

/// Judge whether a diagram is dense and organized enough for a repository of
/// `file_count` files. Advisory only.
pub fn validate_completeness(code: &str, file_count: usize, policy: MinNodePolicy) -> ValidationReport {
    let mut issues = Vec::new();

    let nodes = count_nodes(code);
    let min_nodes = policy.min_nodes(file_count);
    if nodes < min_nodes {
        issues.push(format!(
            "Diagram too simple: only {nodes} components (need {min_nodes}+)"
        ));
    }

    if !code.to_lowercase().contains("subgraph") && file_count > 10 {
        issues.push("Missing organization: no subgraphs used".to_string());
    }

    ValidationReport::from_errors(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_text_is_an_empty_diagram() {
        let report = validate_syntax("  \n\n ");
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Empty diagram code"]);
    }

    #[test]
    fn unknown_header_is_fatal_and_alone() {
        let report = validate_syntax("digraph G {\nA[unclosed\nB((x)\n}");
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Invalid diagram type: digraph G {"]);
    }

    #[test]
    fn header_is_truncated_to_fifty_chars() {
        let header = "x".repeat(80);
        let report = validate_syntax(&header);
        assert_eq!(report.errors, vec![format!("Invalid diagram type: {}", "x".repeat(50))]);
    }

    #[test]
    fn imbalances_accumulate_per_line() {
        let code = "flowchart TD\nA[ok] --> B[ok]\nC[bad --> D\n%% E[ignored\nsubgraph F[x\nend\nG((round) --> H{x}}";
        let report = validate_syntax(code);
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec!["Line 2: Unmatched brackets", "Line 6: Unmatched parentheses", "Line 6: Unmatched braces"]
        );
    }

    #[test]
    fn first_body_line_is_line_one() {
        assert_eq!(validate_syntax("flowchart TD\nA[broken").errors, vec!["Line 1: Unmatched brackets"]);
        assert_eq!(validate_syntax("\n\nflowchart TD\nA[broken").errors, vec!["Line 1: Unmatched brackets"]);
    }

    #[test]
    fn leading_blank_lines_before_header_are_skipped() {
        let report = validate_syntax("\n\ngraph TD\nA[x] --> B[y]");
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn small_flat_diagram_is_too_simple_but_not_disorganized() {
        let code = "flowchart TD\nA[a]\nB[b]\nC[c]";
        let report = validate_completeness(code, 5, MinNodePolicy::Tiered);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Diagram too simple: only 3 components (need 15+)"]);
    }

    #[test]
    fn large_grouped_diagram_is_complete() {
        let mut code = String::from("flowchart TD\nsubgraph core\n");
        for i in 0..40 {
            code.push_str(&format!("N{i}[node {i}]\n"));
        }
        code.push_str("end");
        let report = validate_completeness(&code, 60, MinNodePolicy::Tiered);
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn missing_subgraph_flagged_above_ten_files() {
        let code: String = std::iter::once("graph TD".to_string())
            .chain((0..20).map(|i| format!("N{i}[n]")))
            .collect::<Vec<_>>()
            .join("\n");
        let report = validate_completeness(&code, 11, MinNodePolicy::Tiered);
        assert_eq!(report.errors, vec!["Missing organization: no subgraphs used"]);
        assert!(validate_completeness(&code.replace("graph", "SUBGRAPH"), 11, MinNodePolicy::Tiered).valid);
    }

    #[test]
    fn comment_lines_do_not_count_as_nodes() {
        assert_eq!(count_nodes("graph TD\n%% A[x]\nB[y]"), 1);
    }
}
