//! Claude API integration for Focus Zone.
//!
//! Provides LLM-backed implementations of the session adapters:
//! - Exam paper generation from study material
//! - Answer evaluation with model answers and feedback
//! - A study-time explainer chat

mod prompt;

use std::fmt;
use std::time::Duration;

use fz_core::{
    AdapterError, AnswerEvaluator, AnswerSet, ChatSession, ContentRef, EvaluationResult,
    ExamConfiguration, ExamGenerator, ExamPaper, Explainer, Question,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompt::Message;
pub use crate::prompt::{EVALUATION_CONTENT_CHARS, EXPLAINER_CONTENT_CHARS, GENERATION_CONTENT_CHARS};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Messages endpoint used unless overridden.
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used unless overridden.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const GENERATION_MAX_TOKENS: u32 = 4096;
const GENERATION_TEMPERATURE: f32 = 0.7;
const EVALUATION_MAX_TOKENS: u32 = 4096;
const EVALUATION_TEMPERATURE: f32 = 0.2;
const EXPLAINER_MAX_TOKENS: u32 = 1024;
const EXPLAINER_TEMPERATURE: f32 = 0.5;

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<LlmError> for AdapterError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse(message) => Self::InvalidResponse(message),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Claude API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();

        if api_key.is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the client at a different Messages endpoint.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates an exam paper for `content` shaped by `config`.
    pub async fn generate_paper(
        &self,
        content: &ContentRef,
        config: &ExamConfiguration,
    ) -> Result<ExamPaper, LlmError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: GENERATION_MAX_TOKENS,
            temperature: GENERATION_TEMPERATURE,
            system: None,
            messages: vec![Message {
                role: "user",
                content: prompt::build_generation_prompt(content, config),
            }],
        };
        let text = self.post_messages(&request).await?;
        let paper = prompt::parse_paper(&text)?;
        tracing::debug!(
            content = %content.id,
            questions = paper.question_count(),
            marks = paper.total_marks(),
            "parsed exam paper"
        );
        Ok(paper)
    }

    /// Scores every question in `questions` against `answers`.
    pub async fn evaluate_answers(
        &self,
        questions: &[Question],
        answers: &AnswerSet,
        content: &ContentRef,
    ) -> Result<Vec<EvaluationResult>, LlmError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: EVALUATION_MAX_TOKENS,
            temperature: EVALUATION_TEMPERATURE,
            system: None,
            messages: vec![Message {
                role: "user",
                content: prompt::build_evaluation_prompt(questions, answers, content)?,
            }],
        };
        let text = self.post_messages(&request).await?;
        prompt::parse_evaluations(&text, questions)
    }

    /// Answers one study question in the context of the conversation so far.
    pub async fn explain(&self, chat: &ChatSession, message: &str) -> Result<String, LlmError> {
        let system = prompt::build_explainer_system(chat.content());
        let request = MessageRequest {
            model: &self.model,
            max_tokens: EXPLAINER_MAX_TOKENS,
            temperature: EXPLAINER_TEMPERATURE,
            system: Some(&system),
            messages: prompt::build_chat_messages(chat, message),
        };
        let text = self.post_messages(&request).await?;
        Ok(text.trim().to_string())
    }

    async fn post_messages(&self, request: &MessageRequest<'_>) -> Result<String, LlmError> {
        tracing::debug!(
            model = request.model,
            turns = request.messages.len(),
            max_tokens = request.max_tokens,
            "sending messages request"
        );
        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(%status, "messages request failed");
            return Err(parse_api_error(&body).unwrap_or_else(|| LlmError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: MessageResponse = serde_json::from_str(&body)
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        extract_text(payload.content)
    }
}

impl ExamGenerator for Client {
    async fn generate(
        &self,
        content: &ContentRef,
        config: &ExamConfiguration,
    ) -> Result<ExamPaper, AdapterError> {
        Ok(self.generate_paper(content, config).await?)
    }
}

impl AnswerEvaluator for Client {
    async fn evaluate(
        &self,
        questions: &[Question],
        answers: &AnswerSet,
        content: &ContentRef,
    ) -> Result<Vec<EvaluationResult>, AdapterError> {
        Ok(self.evaluate_answers(questions, answers, content).await?)
    }
}

impl Explainer for Client {
    async fn send(&self, chat: &ChatSession, message: &str) -> Result<String, AdapterError> {
        Ok(self.explain(chat, message).await?)
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

fn extract_text(blocks: Vec<ContentBlock>) -> Result<String, LlmError> {
    let pieces: Vec<String> = blocks
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect();
    if pieces.is_empty() {
        return Err(LlmError::InvalidResponse(
            "missing text content".to_string(),
        ));
    }
    Ok(pieces.join("\n"))
}

fn parse_api_error(body: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| LlmError::Api {
            message: payload.error.message,
        })
}
