//! Adapters to the external content service.
//!
//! The controller never calls these directly; see [`crate::driver`] for the
//! glue that runs one request against a controller ticket.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ContentRef;
use crate::exam::{AnswerSet, EvaluationResult, ExamConfiguration, ExamPaper, Question};

/// Greeting the explainer opens every study session with.
pub const EXPLAINER_GREETING: &str =
    "I'm ready to explain any part of this document while you study.";

/// Reply recorded when the explainer fails.
pub const EXPLAINER_FALLBACK: &str = "Sorry, I encountered an error while thinking.";

/// Failure reported by an adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The service could not be reached or rejected the request.
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// The service answered with something that is not a usable result.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Produces an exam paper from study material.
pub trait ExamGenerator {
    fn generate(
        &self,
        content: &ContentRef,
        config: &ExamConfiguration,
    ) -> impl Future<Output = Result<ExamPaper, AdapterError>> + Send;
}

/// Scores a submitted answer set.
pub trait AnswerEvaluator {
    /// `questions` is the full paper; unanswered questions are looked up via
    /// [`AnswerSet::answer_for`].
    fn evaluate(
        &self,
        questions: &[Question],
        answers: &AnswerSet,
        content: &ContentRef,
    ) -> impl Future<Output = Result<Vec<EvaluationResult>, AdapterError>> + Send;
}

/// Answers questions about the material during a study session.
pub trait Explainer {
    /// Replies to `message`, given the earlier turns of `chat`.
    fn send(
        &self,
        chat: &ChatSession,
        message: &str,
    ) -> impl Future<Output = Result<String, AdapterError>> + Send;
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Explainer conversation scoped to one study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSession {
    content: ContentRef,
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    /// Opens a conversation bound to `content`, starting with the greeting.
    #[must_use]
    pub fn open(content: ContentRef) -> Self {
        Self {
            content,
            turns: vec![ChatTurn {
                role: ChatRole::Model,
                text: EXPLAINER_GREETING.to_string(),
            }],
        }
    }

    #[must_use]
    pub const fn content(&self) -> &ContentRef {
        &self.content
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub(crate) fn push(&mut self, role: ChatRole, text: impl Into<String>) {
        self.turns.push(ChatTurn {
            role,
            text: text.into(),
        });
    }
}
