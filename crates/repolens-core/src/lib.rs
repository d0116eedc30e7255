pub mod rules;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

// --- Repository input ---

/// Directory listing keyed by path segment, in the order the reader produced it.
pub type FileTree = IndexMap<String, FileNode>;

/// A directory holds a nested tree; anything else is a file leaf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FileNode {
    Directory(FileTree),
    File(serde_json::Value),
}

/// Architectural role the repository reader inferred for a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilePurpose {
    Api,
    Service,
    DataModel,
    Middleware,
    Configuration,
    #[default]
    #[serde(other)]
    Other,
}

impl FilePurpose {
    /// Priority files survive prompt trimming ahead of everything else.
    pub fn is_priority(self) -> bool {
        !matches!(self, FilePurpose::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilePurpose::Api => "api",
            FilePurpose::Service => "service",
            FilePurpose::DataModel => "data_model",
            FilePurpose::Middleware => "middleware",
            FilePurpose::Configuration => "configuration",
            FilePurpose::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FileContent {
    Text(String),
    Annotated {
        content: String,
        #[serde(default, deserialize_with = "purpose_or_other")]
        purpose: FilePurpose,
    },
}

fn purpose_or_other<'de, D>(deserializer: D) -> Result<FilePurpose, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<FilePurpose>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl FileContent {
    pub fn text(&self) -> &str {
        match self {
            FileContent::Text(s) => s,
            FileContent::Annotated { content, .. } => content,
        }
    }

    pub fn purpose(&self) -> FilePurpose {
        match self {
            FileContent::Text(_) => FilePurpose::Other,
            FileContent::Annotated { purpose, .. } => *purpose,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepositoryDescription {
    pub name: String,
    pub language: String,
    pub description: String,
    pub stars: u64,
    pub forks: u64,
    pub readme: String,
    pub file_structure: FileTree,
    pub file_contents: IndexMap<String, FileContent>,
}

impl RepositoryDescription {
    pub fn display_name(&self) -> &str {
        or_unknown(&self.name)
    }

    pub fn display_language(&self) -> &str {
        or_unknown(&self.language)
    }
}

fn or_unknown(s: &str) -> &str {
    if s.is_empty() {
        "Unknown"
    } else {
        s
    }
}

// --- Conversation ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

// --- Output ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    Sequence,
    Flowchart,
    Class,
    Database,
    State,
    Custom,
}

impl DiagramType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagramType::Sequence => "sequence",
            DiagramType::Flowchart => "flowchart",
            DiagramType::Class => "class",
            DiagramType::Database => "database",
            DiagramType::State => "state",
            DiagramType::Custom => "custom",
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal output of one analysis run. `has_diagram` mirrors `mermaid_code.is_some()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub answer: String,
    pub mermaid_code: Option<String>,
    pub diagram_type: Option<DiagramType>,
    pub has_diagram: bool,
    pub follow_up_questions: Vec<String>,
    pub repo_name: String,
}

impl AnalysisResult {
    /// A result carrying only answer text: no diagram, no follow-ups.
    pub fn text_only(answer: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            mermaid_code: None,
            diagram_type: None,
            has_diagram: false,
            follow_up_questions: vec![],
            repo_name: repo_name.into(),
        }
    }
}

// --- Budget and retry configuration ---

/// How the minimum node count is derived from a repository's file count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MinNodePolicy {
    /// `max(15, file_count / 2)`.
    Scaled,
    /// `<20 → 15`, `<50 → 25`, otherwise 35.
    Tiered,
}

impl MinNodePolicy {
    pub fn min_nodes(self, file_count: usize) -> usize {
        match self {
            MinNodePolicy::Scaled => (file_count / 2).max(15),
            MinNodePolicy::Tiered => match file_count {
                0..=19 => 15,
                20..=49 => 25,
                _ => 35,
            },
        }
    }
}

/// Character ceilings for prompt assembly. Characters are `char`s, not bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetConfig {
    pub max_context_chars: usize,
    pub max_file_contents_chars: usize,
    pub max_files_in_prompt: usize,
    pub degraded_file_contents_chars: usize,
    pub degraded_files_in_prompt: usize,
    pub readme_chars: usize,
    pub bucket_display_limit: usize,
    pub history_turns: usize,
    pub assistant_history_chars: usize,
    /// Used when telling the model how many nodes to draw.
    pub prompt_node_policy: MinNodePolicy,
    /// Used when judging whether a returned diagram is complete.
    pub validation_node_policy: MinNodePolicy,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 480_000,
            max_file_contents_chars: 300_000,
            max_files_in_prompt: 40,
            degraded_file_contents_chars: 80_000,
            degraded_files_in_prompt: 15,
            readme_chars: 5_000,
            bucket_display_limit: 30,
            history_turns: 6,
            assistant_history_chars: 2_000,
            prompt_node_policy: MinNodePolicy::Scaled,
            validation_node_policy: MinNodePolicy::Tiered,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Total model invocations allowed for one request.
    pub max_attempts: u32,
    /// How much of a rejected reply is echoed back before a correction.
    pub echo_chars: usize,
    /// How many syntax errors a correction lists.
    pub max_reported_errors: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, echo_chars: 1_000, max_reported_errors: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerConfig {
    pub budget: BudgetConfig,
    pub retry: RetryPolicy,
}

// --- AI Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: String::new(),
            api_key: String::new(),
            model: String::new(),
            temperature: 0.05,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub ai: AiSettings,
    pub analyzer: AnalyzerConfig,
}

/// Resolve the global config directory (~/.repolens/).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".repolens")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn read_settings() -> Settings {
    read_settings_from(&settings_path())
}

/// Missing or unreadable files fall back to defaults.
pub fn read_settings_from(path: &Path) -> Settings {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn write_settings(settings: &Settings) -> Result<(), CoreError> {
    write_settings_to(&settings_path(), settings)
}

/// Atomic write: temp file next to the target, then rename.
pub fn write_settings_to(path: &Path, settings: &Settings) -> Result<(), CoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

/// Read a repository description exported by the repository reader as JSON.
pub fn read_repository(path: &Path) -> Result<RepositoryDescription, CoreError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Read a JSON array of prior conversation turns.
pub fn read_history(path: &Path) -> Result<Vec<ConversationTurn>, CoreError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repository_json_keeps_order_and_purposes() {
        let raw = r#"{
            "name": "demo",
            "file_structure": {"src": {"main.py": "file", "api": {"routes.py": null}}, "README.md": 12},
            "file_contents": {
                "src/main.py": "print('hi')",
                "src/api/routes.py": {"content": "def get(): ...", "purpose": "api"},
                "setup.cfg": {"content": "[x]", "purpose": "something_new"},
                "Makefile": {"content": "all:", "purpose": null}
            }
        }"#;
        let repo: RepositoryDescription = serde_json::from_str(raw).unwrap();

        let top: Vec<&String> = repo.file_structure.keys().collect();
        assert_eq!(top, vec!["src", "README.md"]);
        assert!(matches!(repo.file_structure["src"], FileNode::Directory(_)));
        assert!(matches!(repo.file_structure["README.md"], FileNode::File(_)));

        let purposes: Vec<FilePurpose> = repo.file_contents.values().map(|c| c.purpose()).collect();
        assert_eq!(purposes, vec![FilePurpose::Other, FilePurpose::Api, FilePurpose::Other, FilePurpose::Other]);
        assert_eq!(repo.file_contents["Makefile"].text(), "all:");
        assert_eq!(repo.file_contents["src/api/routes.py"].text(), "def get(): ...");
        assert_eq!(repo.display_language(), "Unknown");
    }

    #[test]
    fn min_node_policies_disagree_on_purpose() {
        assert_eq!(MinNodePolicy::Scaled.min_nodes(5), 15);
        assert_eq!(MinNodePolicy::Scaled.min_nodes(100), 50);
        assert_eq!(MinNodePolicy::Tiered.min_nodes(5), 15);
        assert_eq!(MinNodePolicy::Tiered.min_nodes(19), 15);
        assert_eq!(MinNodePolicy::Tiered.min_nodes(20), 25);
        assert_eq!(MinNodePolicy::Tiered.min_nodes(49), 25);
        assert_eq!(MinNodePolicy::Tiered.min_nodes(60), 35);
    }

    #[test]
    fn settings_round_trip_and_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        assert_eq!(read_settings_from(&path), Settings::default());

        let mut settings = Settings::default();
        settings.ai.provider = "openai".into();
        settings.ai.model = "gpt-4o".into();
        settings.analyzer.retry.max_attempts = 5;
        write_settings_to(&path, &settings).unwrap();
        assert_eq!(read_settings_from(&path), settings);

        fs::write(&path, r#"{"analyzer": {"budget": {"maxFilesInPrompt": 10}}}"#).unwrap();
        let partial = read_settings_from(&path);
        assert_eq!(partial.analyzer.budget.max_files_in_prompt, 10);
        assert_eq!(partial.analyzer.budget.max_context_chars, 480_000);
        assert_eq!(partial.ai.max_tokens, 4096);
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut ai = AiSettings { provider: "ollama".into(), model: "llama3".into(), ..Default::default() };
        assert!(ai_configured(&ai));
        ai.provider = "openai".into();
        assert!(!ai_configured(&ai));
    }
}
