use repolens_core::{AnalysisResult, AnalyzerConfig, ConversationTurn, RepositoryDescription, Role};
use tracing::{debug, info, warn};

use crate::budget::{char_len, truncate_chars};
use crate::components::ComponentIndex;
use crate::followup::follow_up_questions;
use crate::format::{PlainFormatter, RepoFormatter};
use crate::machine::{transition, LoopAction, LoopEvent, LoopState};
use crate::parse::{extract_diagram_from_response, ParsedResponse};
use crate::prompt::PromptSections;
use crate::transport::{ChatTransport, Message};
use crate::validate::{validate_completeness, validate_syntax};

/// Drives one question about one repository through prompt assembly, model
/// calls, and diagram validation. Holds no per-request state, so a single
/// analyzer can serve concurrent requests.
pub struct Analyzer<T> {
    transport: T,
    config: AnalyzerConfig,
    formatter: Box<dyn RepoFormatter>,
}

impl<T: ChatTransport> Analyzer<T> {
    pub fn new(transport: T, config: AnalyzerConfig) -> Self {
        Self { transport, config, formatter: Box::new(PlainFormatter) }
    }

    pub fn with_formatter(mut self, formatter: impl RepoFormatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub async fn analyze(
        &self,
        repo: &RepositoryDescription,
        question: &str,
        history: &[ConversationTurn],
    ) -> AnalysisResult {
        let budget = &self.config.budget;
        let retry = &self.config.retry;

        let components = ComponentIndex::extract(repo);
        let mut prompt = PromptSections::build(repo, &components, self.formatter.as_ref(), budget);
        let system = prompt.render();
        debug!(chars = char_len(&system), files = prompt.file_count, "built system prompt");

        let mut messages = self.initial_messages(system, history, question);

        let mut state = LoopState::start(retry);
        while let LoopState::Invoking { attempt } = state {
            info!(attempt = attempt + 1, max_attempts = retry.max_attempts, "generating diagram");

            let (event, raw) = match self.transport.complete(&messages).await {
                Ok(raw) => {
                    debug!(chars = char_len(&raw), "model replied");
                    (LoopEvent::Replied(self.inspect(&raw, repo)), Some(raw))
                }
                Err(e) => {
                    warn!(error = %e, "model invocation failed");
                    (LoopEvent::Failed(e), None)
                }
            };

            let (next, action) = transition(state, event, retry);
            state = next;

            match action {
                LoopAction::CorrectSyntax { errors } => {
                    warn!(?errors, "diagram syntax errors");
                    let shown = &errors[..errors.len().min(retry.max_reported_errors)];
                    self.push_correction(
                        &mut messages,
                        raw.as_deref(),
                        format!(
                            "SYNTAX ERRORS: {}. Fix node IDs (no spaces, use underscores) and bracket matching. Regenerate.",
                            shown.join(", ")
                        ),
                    );
                }
                LoopAction::CorrectCompleteness { issues } => {
                    warn!(?issues, "diagram incomplete");
                    self.push_correction(
                        &mut messages,
                        raw.as_deref(),
                        format!(
                            "DIAGRAM TOO SIMPLE: {}. Include at least {} components with subgraphs. Use real filenames. Regenerate.",
                            issues.join(", "),
                            prompt.min_nodes
                        ),
                    );
                }
                LoopAction::Degrade => {
                    warn!("context too long, rebuilding prompt with reduced file contents");
                    prompt.degrade(repo, self.formatter.as_ref(), budget);
                    messages[0] = Message::system(prompt.render());
                }
                LoopAction::Retry => {}
                LoopAction::Accept(parsed) => return accept(parsed, repo),
                LoopAction::GiveUp(err) => {
                    return AnalysisResult::text_only(
                        format!("Error generating response: {err}"),
                        repo.display_name(),
                    );
                }
            }
        }

        AnalysisResult::text_only("Unable to generate response", repo.display_name())
    }

    /// System prompt, the most recent history turns, then the question.
    fn initial_messages(&self, system: String, history: &[ConversationTurn], question: &str) -> Vec<Message> {
        let budget = &self.config.budget;
        let recent = &history[history.len().saturating_sub(budget.history_turns)..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(Message::system(system));
        for turn in recent {
            messages.push(match turn.role {
                Role::User => Message::user(turn.content.clone()),
                Role::Assistant => {
                    Message::assistant(truncate_chars(&turn.content, budget.assistant_history_chars))
                }
            });
        }
        messages.push(Message::user(question));
        messages
    }

    fn push_correction(&self, messages: &mut Vec<Message>, raw: Option<&str>, correction: String) {
        let echo = truncate_chars(raw.unwrap_or_default(), self.config.retry.echo_chars);
        messages.push(Message::assistant(echo));
        messages.push(Message::user(correction));
    }

    /// Parse a reply and attach validation results to its diagram, if any.
    fn inspect(&self, raw: &str, repo: &RepositoryDescription) -> ParsedResponse {
        let mut parsed = extract_diagram_from_response(raw);
        if let Some(diagram) = parsed.diagram.as_mut() {
            diagram.syntax_errors = validate_syntax(&diagram.repaired_text).errors;
            diagram.completeness_issues = validate_completeness(
                &diagram.repaired_text,
                repo.file_contents.len(),
                self.config.budget.validation_node_policy,
            )
            .errors;
        }
        parsed
    }
}

fn accept(parsed: ParsedResponse, repo: &RepositoryDescription) -> AnalysisResult {
    let ParsedResponse { answer, diagram } = parsed;
    if diagram.as_ref().is_some_and(|d| d.syntax_errors.is_empty() && d.completeness_issues.is_empty()) {
        info!("diagram validated");
    }

    let has_diagram = diagram.is_some();
    let diagram_type = diagram.as_ref().map(|d| d.diagram_type);
    AnalysisResult {
        answer,
        mermaid_code: diagram.map(|d| d.repaired_text),
        diagram_type,
        has_diagram,
        follow_up_questions: follow_up_questions(has_diagram),
        repo_name: repo.display_name().to_string(),
    }
}

/// One-shot convenience over [`Analyzer`].
pub async fn analyze<T: ChatTransport>(
    transport: T,
    config: AnalyzerConfig,
    repo: &RepositoryDescription,
    question: &str,
    history: &[ConversationTurn],
) -> AnalysisResult {
    Analyzer::new(transport, config).analyze(repo, question, history).await
}
