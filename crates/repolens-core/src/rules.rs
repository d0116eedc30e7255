//! Diagram protocol rules shared by the prompt builder and the response parser.

/// Marker the model must emit right before the diagram body.
pub const DIAGRAM_START: &str = "[DIAGRAM_START]";
/// Marker the model must emit right after the diagram body.
pub const DIAGRAM_END: &str = "[DIAGRAM_END]";

/// The only arrow styles the model may use.
pub const ALLOWED_ARROWS: [&str; 3] = ["-->", "-.->", "==>"];

/// Render the numbered requirement list appended to every analysis prompt.
pub fn diagram_requirements(min_nodes: usize, file_count: usize) -> String {
    format!(
        "1. Include minimum {min_nodes} components (this repo has {file_count} files)\n\
2. Use subgraphs for each major folder\n\
3. Use actual filenames - NO generic names like \"Service\" or \"Component\"\n\
4. Node IDs: ONLY letters, numbers, underscores (no spaces)\n\
5. Arrows: ONLY {arrows}\n\
6. Wrap diagram in {DIAGRAM_START} ... {DIAGRAM_END}\n\
7. NO markdown code blocks inside the diagram tags\n",
        arrows = ALLOWED_ARROWS.join(" or "),
    )
}
