use repolens_core::rules::diagram_requirements;
use repolens_core::{BudgetConfig, RepositoryDescription};

use crate::budget::{build_file_contents_section, cap_context, truncate_chars};
use crate::components::{Bucket, ComponentIndex};
use crate::format::RepoFormatter;

const RULE: &str =
    "==============================================================================";

const FILE_CONTENTS_HEADING: &str = "FILE CONTENTS";
const REDUCED_HEADING: &str = "FILE CONTENTS (reduced due to token limit):";

/// The system prompt kept as separate sections so the file-contents part can
/// be swapped without touching the rest.
#[derive(Debug, Clone)]
pub struct PromptSections {
    overview: String,
    file_contents_heading: String,
    file_contents: String,
    tail: String,
    max_context_chars: usize,
    /// Nodes the model is asked for, per the prompt-time policy.
    pub min_nodes: usize,
    pub file_count: usize,
}

impl PromptSections {
    pub fn build(
        repo: &RepositoryDescription,
        components: &ComponentIndex,
        formatter: &dyn RepoFormatter,
        budget: &BudgetConfig,
    ) -> Self {
        let file_count = components.file_count();
        let min_nodes = budget.prompt_node_policy.min_nodes(file_count);

        let file_contents = build_file_contents_section(
            repo,
            formatter,
            budget.max_file_contents_chars,
            budget.max_files_in_prompt,
        );

        Self {
            overview: overview(repo, components, formatter, budget.bucket_display_limit),
            file_contents_heading: format!(
                "{FILE_CONTENTS_HEADING} (top {} most important files):",
                budget.max_files_in_prompt
            ),
            file_contents,
            tail: tail(repo, budget.readme_chars, min_nodes, file_count),
            max_context_chars: budget.max_context_chars,
            min_nodes,
            file_count,
        }
    }

    /// Rebuild only the file-contents section under the degraded budget.
    pub fn degrade(
        &mut self,
        repo: &RepositoryDescription,
        formatter: &dyn RepoFormatter,
        budget: &BudgetConfig,
    ) {
        self.file_contents_heading = REDUCED_HEADING.to_string();
        self.file_contents = build_file_contents_section(
            repo,
            formatter,
            budget.degraded_file_contents_chars,
            budget.degraded_files_in_prompt,
        );
    }

    pub fn render(&self) -> String {
        let context = format!(
            "{}\n{RULE}\n{}\n{RULE}\n{}\n{}",
            self.overview, self.file_contents_heading, self.file_contents, self.tail
        );
        cap_context(context, self.max_context_chars)
    }
}

fn section(out: &mut String, title: &str) {
    out.push_str(RULE);
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
}

fn overview(
    repo: &RepositoryDescription,
    components: &ComponentIndex,
    formatter: &dyn RepoFormatter,
    limit: usize,
) -> String {
    let mut out = String::with_capacity(8192);
    out.push('\n');
    section(&mut out, "REPOSITORY ANALYSIS");
    out.push_str(&format!(
        "\nRepository: {}\nLanguage: {}\nTotal Files: {}\nStars: {} | Forks: {}\nDescription: {}\n",
        repo.display_name(),
        repo.display_language(),
        components.file_count(),
        repo.stars,
        repo.forks,
        if repo.description.is_empty() { "N/A" } else { repo.description.as_str() },
    ));
    if !components.dependencies.is_empty() {
        out.push_str(&format!("Dependencies: {}\n", components.dependencies.join(", ")));
    }
    out.push('\n');

    section(&mut out, "FILE STRUCTURE:");
    out.push_str(&formatter.format_tree(&repo.file_structure));
    out.push('\n');

    section(&mut out, "CATEGORIZED COMPONENTS:");
    out.push_str(&format!(
        "\nFOLDERS ({}):\n{}\n\n",
        components.folders.len(),
        fmt_list(&components.folders, limit)
    ));

    let buckets = [
        ("FRONTEND", components.bucket(Bucket::Frontend)),
        ("BACKEND", components.bucket(Bucket::Backend)),
        ("SERVICES", components.bucket(Bucket::Services)),
        ("ROUTES", components.bucket(Bucket::Routes)),
        ("MODELS", components.bucket(Bucket::Models)),
        ("COMPONENTS", components.bucket(Bucket::Components)),
        ("PAGES", components.bucket(Bucket::Pages)),
        ("UTILS", components.bucket(Bucket::Utils)),
        ("CONFIG", components.config_files.as_slice()),
        ("DATABASE", components.database_files.as_slice()),
    ];
    for (label, items) in buckets {
        out.push_str(&format!("{label} ({}):\n{}\n", items.len(), fmt_list(items, limit)));
    }
    out
}

fn tail(repo: &RepositoryDescription, readme_chars: usize, min_nodes: usize, file_count: usize) -> String {
    let mut out = String::with_capacity(readme_chars + 1024);
    out.push('\n');
    section(&mut out, "README:");
    out.push_str(truncate_chars(&repo.readme, readme_chars));
    out.push_str("\n\n");
    section(&mut out, "DIAGRAM REQUIREMENTS:");
    out.push('\n');
    out.push_str(&diagram_requirements(min_nodes, file_count));
    out
}

/// At most `limit` entries, then a count of the rest.
fn fmt_list(items: &[String], limit: usize) -> String {
    if items.is_empty() {
        return "   (none)".to_string();
    }
    let mut s = items
        .iter()
        .take(limit)
        .map(|f| format!("   - {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    if items.len() > limit {
        s.push_str(&format!("\n   ... and {} more", items.len() - limit));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PlainFormatter;
    use repolens_core::{FileContent, FileNode, FilePurpose};

    fn repo_with_files(n: usize) -> RepositoryDescription {
        let mut repo = RepositoryDescription {
            name: "shop".into(),
            language: "Python".into(),
            readme: "r".repeat(9_000),
            ..Default::default()
        };
        let mut src = repolens_core::FileTree::new();
        for i in 0..n {
            let name = format!("service_{i}.py");
            src.insert(name.clone(), FileNode::File(serde_json::Value::Null));
            repo.file_contents.insert(
                format!("src/{name}"),
                FileContent::Annotated { content: "c".repeat(2_000), purpose: FilePurpose::Service },
            );
        }
        repo.file_structure.insert("src".into(), FileNode::Directory(src));
        repo
    }

    fn sections(repo: &RepositoryDescription, budget: &BudgetConfig) -> PromptSections {
        PromptSections::build(repo, &ComponentIndex::extract(repo), &PlainFormatter, budget)
    }

    #[test]
    fn bucket_lists_are_capped_with_remainder() {
        let items: Vec<String> = (0..33).map(|i| format!("f{i}")).collect();
        let s = fmt_list(&items, 30);
        assert_eq!(s.lines().count(), 31);
        assert!(s.ends_with("   ... and 3 more"));
        assert_eq!(fmt_list(&[], 30), "   (none)");
    }

    #[test]
    fn prompt_carries_metadata_readme_slice_and_requirements() {
        let repo = repo_with_files(40);
        let text = sections(&repo, &BudgetConfig::default()).render();

        assert!(text.contains("Repository: shop"));
        assert!(text.contains("Total Files: 40"));
        assert!(text.contains("SERVICES (40):"));
        assert!(text.contains("   ... and 10 more"));
        assert!(text.contains(&"r".repeat(5_000)));
        assert!(!text.contains(&"r".repeat(5_001)));
        assert!(text.contains("Include minimum 20 components (this repo has 40 files)"));
        assert!(text.contains("[DIAGRAM_START] ... [DIAGRAM_END]"));
    }

    #[test]
    fn degrade_swaps_only_the_file_contents() {
        let repo = repo_with_files(30);
        let budget = BudgetConfig::default();
        let mut prompt = sections(&repo, &budget);
        let before = prompt.render();

        prompt.degrade(&repo, &PlainFormatter, &budget);
        let after = prompt.render();

        assert!(after.contains("FILE CONTENTS (reduced due to token limit):"));
        assert_eq!(after.matches("### ").count(), 15);
        assert_eq!(before.matches("### ").count(), 30);
        assert!(after.contains("DIAGRAM REQUIREMENTS:"));
        assert!(after.contains("CATEGORIZED COMPONENTS:"));
        assert!(after.contains(&"r".repeat(5_000)));
    }

    #[test]
    fn whole_prompt_backstop_applies() {
        let repo = repo_with_files(10);
        let budget = BudgetConfig { max_context_chars: 1_000, ..Default::default() };
        let text = sections(&repo, &budget).render();
        assert!(text.ends_with("[CONTEXT TRUNCATED TO FIT TOKEN LIMIT]"));
        assert!(crate::budget::char_len(&text) < 1_100);
    }
}
