//! Character budgets for the file-contents section and the whole prompt.
//!
//! Ceilings are enforced by truncation plus an explicit marker, never by
//! failing. Lengths are counted in `char`s so a cut never splits a code point.

use indexmap::IndexMap;
use repolens_core::{FileContent, RepositoryDescription};
use tracing::warn;

use crate::format::RepoFormatter;

pub const CONTEXT_TRUNCATED_MARKER: &str = "\n\n[CONTEXT TRUNCATED TO FIT TOKEN LIMIT]";

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Pick at most `max_files` entries: priority purposes first, then the rest,
/// each group in encounter order.
pub fn select_files(
    contents: &IndexMap<String, FileContent>,
    max_files: usize,
) -> Vec<(&str, &FileContent)> {
    let (priority, others): (Vec<_>, Vec<_>) = contents
        .iter()
        .map(|(path, content)| (path.as_str(), content))
        .partition(|(_, content)| content.purpose().is_priority());

    priority.into_iter().chain(others).take(max_files).collect()
}

/// Render the selected files and cap the result at `max_chars`.
pub fn build_file_contents_section(
    repo: &RepositoryDescription,
    formatter: &dyn RepoFormatter,
    max_chars: usize,
    max_files: usize,
) -> String {
    let total = repo.file_contents.len();
    if total == 0 {
        return "(no files)".to_string();
    }

    let selected = select_files(&repo.file_contents, max_files);
    if total > max_files {
        warn!(total, kept = selected.len(), "trimmed file contents to fit token budget");
    }

    let formatted = formatter.format_file_contents(&selected, max_files);
    if char_len(&formatted) <= max_chars {
        return formatted;
    }

    let mut capped = truncate_chars(&formatted, max_chars).to_string();
    capped.push_str(&format!(
        "\n\n... [TRUNCATED: showing {}/{} files to stay within token limit]",
        selected.len(),
        total
    ));
    capped
}

/// Backstop for the assembled prompt. Normal input never reaches it.
pub fn cap_context(context: String, max_chars: usize) -> String {
    let len = char_len(&context);
    if len <= max_chars {
        return context;
    }
    warn!(chars = len, max_chars, "context still too large, truncating");
    let mut capped = truncate_chars(&context, max_chars).to_string();
    capped.push_str(CONTEXT_TRUNCATED_MARKER);
    capped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PlainFormatter;
    use pretty_assertions::assert_eq;
    use repolens_core::FilePurpose;

    fn annotated(purpose: FilePurpose) -> FileContent {
        FileContent::Annotated { content: "x".into(), purpose }
    }

    #[test]
    fn truncate_respects_code_points() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn priority_files_fill_slots_first() {
        let mut contents = IndexMap::new();
        for i in 0..30 {
            contents.insert(format!("other_{i}.py"), FileContent::Text("x".into()));
        }
        for i in 0..25 {
            contents.insert(format!("api_{i}.py"), annotated(FilePurpose::Api));
        }
        contents.insert("settings.py".into(), annotated(FilePurpose::Configuration));
        contents.insert("notes.md".into(), annotated(FilePurpose::Other));

        let selected = select_files(&contents, 40);
        assert_eq!(selected.len(), 40);

        let paths: Vec<&str> = selected.iter().map(|(p, _)| *p).collect();
        assert_eq!(paths[0], "api_0.py");
        assert_eq!(paths[25], "settings.py");
        assert_eq!(paths[26], "other_0.py");
        assert_eq!(paths[39], "other_13.py");
        assert!(!paths.contains(&"notes.md"));

        let first_other = paths.iter().position(|p| p.starts_with("other_")).unwrap();
        assert!(selected[..first_other].iter().all(|(_, c)| c.purpose().is_priority()));
    }

    #[test]
    fn more_priority_files_than_slots_keeps_encounter_order() {
        let mut contents = IndexMap::new();
        contents.insert("readme.txt".into(), FileContent::Text("x".into()));
        for i in 0..10 {
            contents.insert(format!("svc_{i}.py"), annotated(FilePurpose::Service));
        }
        let selected = select_files(&contents, 3);
        let paths: Vec<&str> = selected.iter().map(|(p, _)| *p).collect();
        assert_eq!(paths, vec!["svc_0.py", "svc_1.py", "svc_2.py"]);
    }

    #[test]
    fn rendered_section_mentions_at_most_max_files() {
        let mut repo = RepositoryDescription::default();
        for i in 0..55 {
            repo.file_contents.insert(format!("f{i}.py"), FileContent::Text("pass".into()));
        }
        let text = build_file_contents_section(&repo, &PlainFormatter, 300_000, 40);
        assert_eq!(text.matches("### ").count(), 40);
    }

    #[test]
    fn oversized_section_is_cut_at_the_ceiling() {
        let mut repo = RepositoryDescription::default();
        repo.file_contents
            .insert("big.py".into(), FileContent::Text("a".repeat(400_000)));
        repo.file_contents
            .insert("small.py".into(), FileContent::Text("b".into()));

        let text = build_file_contents_section(&repo, &PlainFormatter, 300_000, 40);
        let suffix = "\n\n... [TRUNCATED: showing 2/2 files to stay within token limit]";
        assert!(text.ends_with(suffix));
        assert_eq!(char_len(&text), 300_000 + char_len(suffix));
    }

    #[test]
    fn empty_contents_render_placeholder() {
        let repo = RepositoryDescription::default();
        assert_eq!(build_file_contents_section(&repo, &PlainFormatter, 10, 10), "(no files)");
    }

    #[test]
    fn context_backstop_appends_marker() {
        let capped = cap_context("z".repeat(50), 20);
        assert_eq!(capped, format!("{}{}", "z".repeat(20), CONTEXT_TRUNCATED_MARKER));
        assert_eq!(cap_context("short".into(), 20), "short");
    }
}
