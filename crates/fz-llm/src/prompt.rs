//! Prompt construction and response parsing.

use std::collections::HashSet;

use fz_core::{
    AnswerSet, ChatRole, ChatSession, ContentRef, EvaluationResult, ExamConfiguration, ExamPaper,
    ExamSection, Marks, Question, QuestionId, Score,
};
use serde::{Deserialize, Serialize};

use crate::LlmError;

/// Characters of study material sent with a generation request.
pub const GENERATION_CONTENT_CHARS: usize = 15_000;
/// Characters of study material sent with an evaluation request.
pub const EVALUATION_CONTENT_CHARS: usize = 5_000;
/// Characters of study material given to the explainer.
pub const EXPLAINER_CONTENT_CHARS: usize = 5_000;

const DEFAULT_PAPER_TITLE: &str = "Exam Paper";

pub(crate) fn build_generation_prompt(content: &ContentRef, config: &ExamConfiguration) -> String {
    let mut lines = Vec::new();
    lines.push("Generate a university style exam paper based on the content below.".to_string());
    lines.push(String::new());
    lines.push("Structure required:".to_string());
    lines.push(format!(
        "1. Section A: {} questions of 2 marks each (definitions, short concepts).",
        config.count(Marks::Two)
    ));
    lines.push(format!(
        "2. Section B: {} questions of 5 marks each (explanations, comparisons).",
        config.count(Marks::Five)
    ));
    lines.push(format!(
        "3. Section C: {} questions of 10 marks each (deep theory, derivations).",
        config.count(Marks::Ten)
    ));
    lines.push("Omit any section that asks for 0 questions. Number questions 1, 2, 3... across the whole paper.".to_string());
    lines.push(String::new());
    lines.push(format!("Title: {}", content.title));
    lines.push("Content:".to_string());
    lines.push("\"\"\"".to_string());
    lines.push(content.excerpt(GENERATION_CONTENT_CHARS).to_string());
    lines.push("\"\"\"".to_string());
    lines.push(String::new());
    lines.push("Return strict JSON only:".to_string());
    lines.push(
        r#"{"title":"Exam Paper","sections":[{"title":"Section A (2 Marks)","questions":[{"id":1,"question":"...","marks":2,"type":"Definition"}]}]}"#
            .to_string(),
    );
    lines.join("\n")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QaPair<'a> {
    id: QuestionId,
    question: &'a str,
    marks: Marks,
    user_answer: &'a str,
}

pub(crate) fn build_evaluation_prompt(
    questions: &[Question],
    answers: &AnswerSet,
    content: &ContentRef,
) -> Result<String, LlmError> {
    let pairs: Vec<QaPair<'_>> = questions
        .iter()
        .map(|q| QaPair {
            id: q.id,
            question: &q.text,
            marks: q.marks,
            user_answer: answers.answer_for(q.id),
        })
        .collect();
    let pairs = serde_json::to_string(&pairs)
        .map_err(|err| LlmError::InvalidResponse(format!("could not encode answers: {err}")))?;

    let mut lines = Vec::new();
    lines.push("Evaluate the following student exam answers based on the provided content.".to_string());
    lines.push(String::new());
    lines.push("Content context:".to_string());
    lines.push("\"\"\"".to_string());
    lines.push(content.excerpt(EVALUATION_CONTENT_CHARS).to_string());
    lines.push("\"\"\"".to_string());
    lines.push(String::new());
    lines.push("Student answers:".to_string());
    lines.push(pairs);
    lines.push(String::new());
    lines.push("For each question provide:".to_string());
    lines.push("1. A concise \"modelAnswer\" (what was expected).".to_string());
    lines.push("2. \"feedback\" (what was missing or good).".to_string());
    lines.push("3. \"score\" (marks awarded out of the question's total; may be fractional).".to_string());
    lines.push(String::new());
    lines.push("Return a strict JSON array only:".to_string());
    lines.push(
        r#"[{"questionId":1,"modelAnswer":"...","feedback":"...","score":1.5}]"#.to_string(),
    );
    Ok(lines.join("\n"))
}

pub(crate) fn build_explainer_system(content: &ContentRef) -> String {
    format!(
        "You are a helpful, encouraging and knowledgeable tutor. The student is studying \
         \"{}\". Help them understand concepts from this material. Keep answers concise but \
         informative.\n\nMaterial:\n\"\"\"\n{}\n\"\"\"",
        content.title,
        content.excerpt(EXPLAINER_CONTENT_CHARS)
    )
}

fn framed_question(content: &ContentRef, text: &str) -> String {
    format!("Context: {}\nUser Question: {text}", content.title)
}

/// One Messages API turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Message {
    pub(crate) role: &'static str,
    pub(crate) content: String,
}

/// Maps an explainer transcript plus the new message onto API turns.
///
/// The API wants a user turn first and strictly alternating roles, so the
/// greeting is skipped and consecutive same-role turns are merged.
pub(crate) fn build_chat_messages(chat: &ChatSession, message: &str) -> Vec<Message> {
    let content = chat.content();
    let history = chat
        .turns()
        .iter()
        .skip_while(|turn| turn.role == ChatRole::Model)
        .map(|turn| match turn.role {
            ChatRole::User => ("user", framed_question(content, &turn.text)),
            ChatRole::Model => ("assistant", turn.text.clone()),
        });

    let mut messages: Vec<Message> = Vec::new();
    for (role, text) in history.chain(std::iter::once(("user", framed_question(content, message)))) {
        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&text);
            }
            _ => messages.push(Message {
                role,
                content: text,
            }),
        }
    }
    messages
}

/// Removes a surrounding Markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, Deserialize)]
struct PaperPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    sections: Vec<SectionPayload>,
}

#[derive(Debug, Deserialize)]
struct SectionPayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    questions: Vec<QuestionPayload>,
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    id: u32,
    question: String,
    marks: u32,
}

/// Parses the generator's reply into a validated paper.
///
/// Papers that restart numbering per section are renumbered in paper order.
pub(crate) fn parse_paper(text: &str) -> Result<ExamPaper, LlmError> {
    let payload: Option<PaperPayload> = serde_json::from_str(strip_code_fence(text))
        .map_err(|err| LlmError::InvalidResponse(format!("exam paper is not valid JSON: {err}")))?;
    let payload =
        payload.ok_or_else(|| LlmError::InvalidResponse("service returned no exam paper".to_string()))?;

    let mut sections = Vec::with_capacity(payload.sections.len());
    for section in payload.sections {
        let questions = section
            .questions
            .into_iter()
            .map(|q| {
                let marks = Marks::try_from(q.marks)
                    .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
                Ok(Question {
                    id: QuestionId::new(q.id),
                    text: q.question.trim().to_string(),
                    marks,
                })
            })
            .collect::<Result<Vec<_>, LlmError>>()?;
        if !questions.is_empty() {
            sections.push(ExamSection {
                title: section.title,
                questions,
            });
        }
    }

    let mut seen = HashSet::new();
    let unique = sections
        .iter()
        .flat_map(|s| &s.questions)
        .all(|q| seen.insert(q.id));
    if !unique {
        tracing::debug!("question ids repeat across sections; renumbering");
        let mut next = 0;
        for question in sections.iter_mut().flat_map(|s| s.questions.iter_mut()) {
            next += 1;
            question.id = QuestionId::new(next);
        }
    }

    let title = payload
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_PAPER_TITLE.to_string());
    ExamPaper::new(title, sections).map_err(|err| LlmError::InvalidResponse(err.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationPayload {
    question_id: u32,
    #[serde(default)]
    model_answer: String,
    #[serde(default)]
    feedback: String,
    score: f32,
}

/// Parses the evaluator's reply. Scores are clamped to each question's marks.
pub(crate) fn parse_evaluations(
    text: &str,
    questions: &[Question],
) -> Result<Vec<EvaluationResult>, LlmError> {
    let payload: Vec<EvaluationPayload> = serde_json::from_str(strip_code_fence(text))
        .map_err(|err| LlmError::InvalidResponse(format!("evaluation is not valid JSON: {err}")))?;

    Ok(payload
        .into_iter()
        .map(|entry| {
            let id = QuestionId::new(entry.question_id);
            let max = questions
                .iter()
                .find(|q| q.id == id)
                .map_or(Marks::Ten, |q| q.marks);
            EvaluationResult {
                question_id: id,
                score: Score::clamped(entry.score, max),
                feedback: entry.feedback.trim().to_string(),
                model_answer: entry.model_answer.trim().to_string(),
            }
        })
        .collect())
}
