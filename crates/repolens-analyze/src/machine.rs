//! Retry loop as a pure state machine.
//!
//! [`transition`] decides what happens after each model invocation; the
//! analyzer performs the side effects. Every `Invoking` state corresponds to
//! exactly one model call, so the loop makes at most `max_attempts` calls.

use repolens_core::RetryPolicy;

use crate::parse::ParsedResponse;
use crate::transport::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// About to make call number `attempt + 1`.
    Invoking { attempt: u32 },
    Finished,
}

impl LoopState {
    pub fn start(policy: &RetryPolicy) -> Self {
        if policy.max_attempts == 0 {
            LoopState::Finished
        } else {
            LoopState::Invoking { attempt: 0 }
        }
    }
}

#[derive(Debug)]
pub enum LoopEvent {
    /// The model answered; any diagram in it has already been validated.
    Replied(ParsedResponse),
    Failed(TransportError),
}

#[derive(Debug, PartialEq)]
pub enum LoopAction {
    /// Echo the reply and ask for a fix of these syntax errors.
    CorrectSyntax { errors: Vec<String> },
    /// Echo the reply and ask for a denser, organized diagram.
    CorrectCompleteness { issues: Vec<String> },
    /// Rebuild the system message under the reduced budget.
    Degrade,
    Retry,
    Accept(ParsedResponse),
    GiveUp(TransportError),
}

pub fn transition(state: LoopState, event: LoopEvent, policy: &RetryPolicy) -> (LoopState, LoopAction) {
    let next = match state {
        LoopState::Invoking { attempt } if attempt + 1 < policy.max_attempts => {
            Some(LoopState::Invoking { attempt: attempt + 1 })
        }
        _ => None,
    };

    match (event, next) {
        (LoopEvent::Replied(parsed), Some(next)) => {
            let Some(diagram) = parsed.diagram.as_ref() else {
                return (LoopState::Finished, LoopAction::Accept(parsed));
            };
            if !diagram.syntax_errors.is_empty() {
                let errors = diagram.syntax_errors.clone();
                (next, LoopAction::CorrectSyntax { errors })
            } else if !diagram.completeness_issues.is_empty() {
                let issues = diagram.completeness_issues.clone();
                (next, LoopAction::CorrectCompleteness { issues })
            } else {
                (LoopState::Finished, LoopAction::Accept(parsed))
            }
        }
        (LoopEvent::Replied(parsed), None) => (LoopState::Finished, LoopAction::Accept(parsed)),
        (LoopEvent::Failed(err), Some(next)) if err.is_context_overflow() => (next, LoopAction::Degrade),
        (LoopEvent::Failed(_), Some(next)) => (next, LoopAction::Retry),
        (LoopEvent::Failed(err), None) => (LoopState::Finished, LoopAction::GiveUp(err)),
    }
}
