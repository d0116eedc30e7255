//! Repository question answering with validated Mermaid diagrams.
//!
//! [`Analyzer`] builds a size-capped prompt from a [`RepositoryDescription`],
//! asks the model, pulls the diagram out of the reply, repairs and validates
//! it, and retries with corrective feedback until the diagram passes or the
//! attempt budget runs out.
//!
//! [`RepositoryDescription`]: repolens_core::RepositoryDescription

mod analyzer;
pub mod budget;
pub mod components;
pub mod engine;
mod followup;
pub mod format;
pub mod machine;
pub mod parse;
pub mod prompt;
pub mod repair;
pub mod transport;
pub mod validate;

pub use analyzer::{analyze, Analyzer};
pub use components::ComponentIndex;
pub use engine::LlmTransport;
pub use followup::follow_up_questions;
pub use format::{PlainFormatter, RepoFormatter};
pub use parse::{clean_mermaid_code, detect_diagram_type, extract_diagram_from_response, DiagramCandidate, ParsedResponse};
pub use repair::repair;
pub use transport::{ChatTransport, Message, MessageRole, TransportError};
pub use validate::{validate_completeness, validate_syntax, ValidationReport};
