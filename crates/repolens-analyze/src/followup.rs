const WITH_DIAGRAM: [&str; 3] = [
    "Add more implementation details to the diagram",
    "Show error handling and edge cases",
    "Include deployment and infrastructure",
];

const WITHOUT_DIAGRAM: [&str; 3] = [
    "Create a comprehensive architecture diagram",
    "Show complete data flow with all components",
    "Generate detailed sequence diagram",
];

/// Suggested next questions, chosen by whether the answer carried a diagram.
pub fn follow_up_questions(has_diagram: bool) -> Vec<String> {
    let set = if has_diagram { WITH_DIAGRAM } else { WITHOUT_DIAGRAM };
    set.iter().map(|q| q.to_string()).collect()
}
