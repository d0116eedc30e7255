use repolens_core::{FileNode, FileTree, RepositoryDescription};

/// Semantic bucket a repository path can be sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Frontend,
    Backend,
    Services,
    Routes,
    Models,
    Components,
    Pages,
    Utils,
}

/// Keyword rules, checked in order against the lower-cased path. Every matching rule applies.
const BUCKET_RULES: &[(&[&str], Bucket)] = &[
    (&["frontend", "client"], Bucket::Frontend),
    (&["backend", "server"], Bucket::Backend),
    (&["service"], Bucket::Services),
    (&["route", "router"], Bucket::Routes),
    (&["model", "schema"], Bucket::Models),
    (&["component"], Bucket::Components),
    (&["page", "view"], Bucket::Pages),
    (&["util", "helper"], Bucket::Utils),
];

const CONFIG_EXTENSIONS: [&str; 6] = [".json", ".yaml", ".yml", ".env", ".toml", ".ini"];

const DEPENDENCY_MANIFESTS: [&str; 3] = ["requirements.txt", "package.json", "pyproject.toml"];

const MANIFEST_SCAN_LINES: usize = 50;

/// Paths of one repository sorted into semantic buckets, plus harvested dependency names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentIndex {
    pub folders: Vec<String>,
    pub frontend_files: Vec<String>,
    pub backend_files: Vec<String>,
    pub services: Vec<String>,
    pub routes: Vec<String>,
    pub models: Vec<String>,
    pub components: Vec<String>,
    pub pages: Vec<String>,
    pub utils: Vec<String>,
    pub config_files: Vec<String>,
    pub database_files: Vec<String>,
    pub all_files: Vec<String>,
    pub dependencies: Vec<String>,
}

impl ComponentIndex {
    pub fn extract(repo: &RepositoryDescription) -> Self {
        let mut index = ComponentIndex::default();
        index.walk(&repo.file_structure, "");

        for (path, content) in &repo.file_contents {
            if DEPENDENCY_MANIFESTS.iter().any(|m| path.contains(m)) {
                index.dependencies.extend(dependency_names(content.text()));
            }
        }

        index
    }

    pub fn file_count(&self) -> usize {
        self.all_files.len()
    }

    pub fn bucket(&self, bucket: Bucket) -> &[String] {
        match bucket {
            Bucket::Frontend => &self.frontend_files,
            Bucket::Backend => &self.backend_files,
            Bucket::Services => &self.services,
            Bucket::Routes => &self.routes,
            Bucket::Models => &self.models,
            Bucket::Components => &self.components,
            Bucket::Pages => &self.pages,
            Bucket::Utils => &self.utils,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Frontend => &mut self.frontend_files,
            Bucket::Backend => &mut self.backend_files,
            Bucket::Services => &mut self.services,
            Bucket::Routes => &mut self.routes,
            Bucket::Models => &mut self.models,
            Bucket::Components => &mut self.components,
            Bucket::Pages => &mut self.pages,
            Bucket::Utils => &mut self.utils,
        }
    }

    fn walk(&mut self, tree: &FileTree, prefix: &str) {
        for (name, node) in tree {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            match node {
                FileNode::Directory(children) => {
                    self.folders.push(path.clone());
                    self.walk(children, &path);
                }
                FileNode::File(_) => self.classify(path),
            }
        }
    }

    fn classify(&mut self, path: String) {
        let lower = path.to_lowercase();

        for (keywords, bucket) in BUCKET_RULES {
            if keywords.iter().any(|k| lower.contains(k)) {
                self.bucket_mut(*bucket).push(path.clone());
            }
        }
        if CONFIG_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            self.config_files.push(path.clone());
        }
        if lower.contains("database") || lower.contains("/db") || path.ends_with(".sql") {
            self.database_files.push(path.clone());
        }

        self.all_files.push(path);
    }
}

/// Bare package names from the head of a manifest, with `==`/`>=` pins stripped.
fn dependency_names(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .take(MANIFEST_SCAN_LINES)
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let name = line.split("==").next().unwrap_or(line);
            let name = name.split(">=").next().unwrap_or(name);
            name.trim().to_string()
        })
}
