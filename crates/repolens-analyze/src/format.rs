use repolens_core::{FileContent, FileNode, FileTree};

/// Renders repository structure and file bodies as prompt text.
pub trait RepoFormatter: Send + Sync {
    fn format_tree(&self, tree: &FileTree) -> String;

    /// `files` is already trimmed and ordered; `max_files` is the cap it was trimmed to.
    fn format_file_contents(&self, files: &[(&str, &FileContent)], max_files: usize) -> String;
}

/// Indented tree plus one fenced block per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl RepoFormatter for PlainFormatter {
    fn format_tree(&self, tree: &FileTree) -> String {
        let mut out = String::new();
        write_tree(&mut out, tree, 0);
        if out.is_empty() {
            out.push_str("(empty)\n");
        }
        out
    }

    fn format_file_contents(&self, files: &[(&str, &FileContent)], max_files: usize) -> String {
        let mut out = String::new();
        for (path, content) in files.iter().take(max_files) {
            out.push_str("### ");
            out.push_str(path);
            out.push_str(" [");
            out.push_str(content.purpose().as_str());
            out.push_str("]\n```\n");
            out.push_str(content.text());
            if !content.text().ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n\n");
        }
        out
    }
}

fn write_tree(out: &mut String, tree: &FileTree, depth: usize) {
    let pad = "  ".repeat(depth);
    for (name, node) in tree {
        out.push_str(&pad);
        match node {
            FileNode::Directory(children) => {
                out.push_str(name);
                out.push_str("/\n");
                write_tree(out, children, depth + 1);
            }
            FileNode::File(_) => {
                out.push_str(name);
                out.push('\n');
            }
        }
    }
}
