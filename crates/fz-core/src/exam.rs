//! Exam papers, answers and evaluation results.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Marks, QuestionId, Score, ValidationError};

/// Placeholder sent to the evaluator for questions left blank.
pub const NOT_ANSWERED: &str = "Not Answered";

/// Feedback recorded for questions the evaluator skipped.
pub const NO_EVALUATION_FEEDBACK: &str = "No evaluation returned.";

/// Exam time allotted per mark (one and a half minutes).
const SECONDS_PER_MARK: u64 = 90;

/// Question counts per weight class.
///
/// Defaults to six 2-mark, three 5-mark and one 10-mark question (a 37-mark
/// paper).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfiguration {
    /// Number of 2-mark questions (section A).
    pub short: u32,
    /// Number of 5-mark questions (section B).
    pub medium: u32,
    /// Number of 10-mark questions (section C).
    pub long: u32,
}

impl Default for ExamConfiguration {
    fn default() -> Self {
        Self {
            short: 6,
            medium: 3,
            long: 1,
        }
    }
}

impl ExamConfiguration {
    #[must_use]
    pub const fn new(short: u32, medium: u32, long: u32) -> Self {
        Self {
            short,
            medium,
            long,
        }
    }

    /// Returns the number of questions requested for a weight class.
    #[must_use]
    pub const fn count(&self, class: Marks) -> u32 {
        match class {
            Marks::Two => self.short,
            Marks::Five => self.medium,
            Marks::Ten => self.long,
        }
    }

    /// Sets the number of questions for a weight class.
    pub const fn set_count(&mut self, class: Marks, count: u32) {
        match class {
            Marks::Two => self.short = count,
            Marks::Five => self.medium = count,
            Marks::Ten => self.long = count,
        }
    }

    /// Widened to `u64` so no count combination can overflow.
    #[must_use]
    pub fn total_questions(&self) -> u64 {
        u64::from(self.short) + u64::from(self.medium) + u64::from(self.long)
    }

    #[must_use]
    pub fn total_marks(&self) -> u64 {
        u64::from(self.short) * 2 + u64::from(self.medium) * 5 + u64::from(self.long) * 10
    }

    /// Whether a paper can be generated from this configuration.
    #[must_use]
    pub fn is_generatable(&self) -> bool {
        self.total_questions() > 0
    }

    /// Time a paper matching this configuration will allow.
    #[must_use]
    pub fn time_allowance(&self) -> Duration {
        Duration::from_secs(self.total_marks() * SECONDS_PER_MARK)
    }
}

/// A single theory question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub marks: Marks,
}

/// A titled group of questions, usually one per weight class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSection {
    pub title: String,
    pub questions: Vec<Question>,
}

/// A generated exam paper.
///
/// Validated on construction: at least one question and unique question ids.
/// Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamPaper {
    title: String,
    sections: Vec<ExamSection>,
}

impl ExamPaper {
    pub fn new(
        title: impl Into<String>,
        sections: Vec<ExamSection>,
    ) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        let mut count = 0usize;
        for question in sections.iter().flat_map(|s| &s.questions) {
            if !seen.insert(question.id) {
                return Err(ValidationError::DuplicateQuestion {
                    id: question.id.value(),
                });
            }
            count += 1;
        }
        if count == 0 {
            return Err(ValidationError::EmptyPaper);
        }
        Ok(Self {
            title: title.into(),
            sections,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn sections(&self) -> &[ExamSection] {
        &self.sections
    }

    /// All questions in paper order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions().find(|q| q.id == id)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions().count()
    }

    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.questions().map(|q| q.marks.value()).sum()
    }

    /// Exam time: one and a half minutes per mark.
    #[must_use]
    pub fn time_allowance(&self) -> Duration {
        Duration::from_secs(u64::from(self.total_marks()) * SECONDS_PER_MARK)
    }
}

/// Free-text answers keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet(BTreeMap<QuestionId, String>);

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the answer for a question.
    pub fn upsert(&mut self, id: QuestionId, text: impl Into<String>) {
        self.0.insert(id, text.into());
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    /// The answer to send for evaluation: blank answers count as unanswered.
    #[must_use]
    pub fn answer_for(&self, id: QuestionId) -> &str {
        match self.get(id) {
            Some(text) if !text.trim().is_empty() => text,
            _ => NOT_ANSWERED,
        }
    }

    /// Number of questions with a non-blank answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.0.values().filter(|text| !text.trim().is_empty()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &str)> {
        self.0.iter().map(|(id, text)| (*id, text.as_str()))
    }
}

/// Evaluator verdict for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub question_id: QuestionId,
    pub score: Score,
    pub feedback: String,
    pub model_answer: String,
}

/// Coarse grade used when presenting a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    /// At least 80% of the marks.
    Strong,
    /// At least 40% of the marks.
    Partial,
    Weak,
}

impl ScoreBand {
    #[must_use]
    pub fn classify(score: Score, marks: Marks) -> Self {
        let max = marks.weight();
        if score.value() >= max * 0.8 {
            Self::Strong
        } else if score.value() >= max * 0.4 {
            Self::Partial
        } else {
            Self::Weak
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Partial => "partial",
            Self::Weak => "weak",
        }
    }
}

/// Outcome of one exam attempt as shown on the result screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scorecard {
    results: Vec<EvaluationResult>,
    max_marks: u32,
    degraded: bool,
}

impl Scorecard {
    /// Aligns evaluator output to paper order.
    ///
    /// Every paper question gets exactly one result: scores are clamped to
    /// the question's marks, skipped questions score zero, and results for
    /// ids not on the paper are dropped.
    #[must_use]
    pub fn grade(paper: &ExamPaper, results: Vec<EvaluationResult>) -> Self {
        let mut by_id: BTreeMap<QuestionId, EvaluationResult> = BTreeMap::new();
        for result in results {
            if paper.question(result.question_id).is_none() {
                tracing::debug!(question = %result.question_id, "dropping result for unknown question");
                continue;
            }
            by_id.entry(result.question_id).or_insert(result);
        }

        let results = paper
            .questions()
            .map(|question| match by_id.remove(&question.id) {
                Some(mut result) => {
                    result.score = Score::clamped(result.score.value(), question.marks);
                    result
                }
                None => EvaluationResult {
                    question_id: question.id,
                    score: Score::ZERO,
                    feedback: NO_EVALUATION_FEEDBACK.to_string(),
                    model_answer: String::new(),
                },
            })
            .collect();

        Self {
            results,
            max_marks: paper.total_marks(),
            degraded: false,
        }
    }

    /// Result set for an attempt whose evaluation failed.
    #[must_use]
    pub fn degraded(paper: &ExamPaper) -> Self {
        Self {
            results: Vec::new(),
            max_marks: paper.total_marks(),
            degraded: true,
        }
    }

    #[must_use]
    pub fn results(&self) -> &[EvaluationResult] {
        &self.results
    }

    #[must_use]
    pub fn result(&self, id: QuestionId) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| r.question_id == id)
    }

    #[must_use]
    pub fn total_score(&self) -> f32 {
        self.results.iter().map(|r| r.score.value()).sum()
    }

    #[must_use]
    pub const fn max_marks(&self) -> u32 {
        self.max_marks
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn question(id: u32, marks: Marks) -> Question {
        Question {
            id: QuestionId::new(id),
            text: format!("Question {id}"),
            marks,
        }
    }

    pub(crate) fn paper(questions: Vec<Question>) -> ExamPaper {
        ExamPaper::new(
            "Exam Paper",
            vec![ExamSection {
                title: "Section A".to_string(),
                questions,
            }],
        )
        .unwrap()
    }

    fn result(id: u32, score: f32) -> EvaluationResult {
        EvaluationResult {
            question_id: QuestionId::new(id),
            score: Score::clamped(score, Marks::Ten),
            feedback: "ok".to_string(),
            model_answer: "answer".to_string(),
        }
    }

    #[test]
    fn configuration_totals() {
        let config = ExamConfiguration::default();
        assert_eq!(config.total_questions(), 10);
        assert_eq!(config.total_marks(), 37);
        assert_eq!(config.time_allowance(), Duration::from_secs(3330));
        assert!(config.is_generatable());
        assert!(!ExamConfiguration::new(0, 0, 0).is_generatable());
    }

    #[test]
    fn configuration_totals_do_not_overflow() {
        let config = ExamConfiguration::new(u32::MAX, 1, 0);
        assert!(config.is_generatable());
        assert_eq!(config.total_questions(), u64::from(u32::MAX) + 1);

        let config = ExamConfiguration::new(u32::MAX / 2 + 1, 0, 0);
        assert_eq!(config.total_marks(), u64::from(u32::MAX) + 1);

        let config = ExamConfiguration::new(u32::MAX, u32::MAX, u32::MAX);
        assert_eq!(config.total_marks(), u64::from(u32::MAX) * 17);
        assert_eq!(
            config.time_allowance(),
            Duration::from_secs(u64::from(u32::MAX) * 17 * 90)
        );
    }

    #[test]
    fn configuration_set_count_by_class() {
        let mut config = ExamConfiguration::new(0, 0, 0);
        config.set_count(Marks::Five, 2);
        assert_eq!(config.count(Marks::Five), 2);
        assert_eq!(config.total_marks(), 10);
    }

    #[test]
    fn paper_rejects_duplicate_ids() {
        let err = ExamPaper::new(
            "Exam",
            vec![ExamSection {
                title: "A".to_string(),
                questions: vec![question(1, Marks::Two), question(1, Marks::Five)],
            }],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateQuestion { id: 1 });
    }

    #[test]
    fn paper_rejects_empty() {
        let err = ExamPaper::new(
            "Exam",
            vec![ExamSection {
                title: "A".to_string(),
                questions: vec![],
            }],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::EmptyPaper);
    }

    #[test]
    fn paper_time_allowance_is_ninety_seconds_per_mark() {
        let paper = paper(vec![question(1, Marks::Two), question(2, Marks::Two)]);
        assert_eq!(paper.total_marks(), 4);
        assert_eq!(paper.time_allowance(), Duration::from_secs(360));
    }

    #[test]
    fn answer_for_marks_blank_as_not_answered() {
        let mut answers = AnswerSet::new();
        answers.upsert(QuestionId::new(1), "Paging splits memory");
        answers.upsert(QuestionId::new(2), "   ");
        assert_eq!(answers.answer_for(QuestionId::new(1)), "Paging splits memory");
        assert_eq!(answers.answer_for(QuestionId::new(2)), NOT_ANSWERED);
        assert_eq!(answers.answer_for(QuestionId::new(3)), NOT_ANSWERED);
        assert_eq!(answers.answered_count(), 1);
    }

    #[test]
    fn upsert_replaces_existing_answer() {
        let mut answers = AnswerSet::new();
        answers.upsert(QuestionId::new(1), "first");
        answers.upsert(QuestionId::new(1), "second");
        assert_eq!(answers.get(QuestionId::new(1)), Some("second"));
        assert_eq!(answers.iter().count(), 1);
    }

    #[test]
    fn grade_aligns_results_to_paper_order() {
        let paper = paper(vec![
            question(1, Marks::Two),
            question(2, Marks::Five),
            question(3, Marks::Ten),
        ]);
        let card = Scorecard::grade(&paper, vec![result(3, 8.0), result(9, 1.0), result(1, 5.0)]);

        let ids: Vec<u32> = card.results().iter().map(|r| r.question_id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // Clamped to the 2-mark ceiling
        assert!((card.result(QuestionId::new(1)).unwrap().score.value() - 2.0).abs() < f32::EPSILON);
        assert_eq!(
            card.result(QuestionId::new(2)).unwrap().feedback,
            NO_EVALUATION_FEEDBACK
        );
        assert!((card.total_score() - 10.0).abs() < f32::EPSILON);
        assert_eq!(card.max_marks(), 17);
        assert!(!card.is_degraded());
    }

    #[test]
    fn degraded_scorecard_is_empty() {
        let paper = paper(vec![question(1, Marks::Two)]);
        let card = Scorecard::degraded(&paper);
        assert!(card.results().is_empty());
        assert!(card.is_degraded());
        assert_eq!(card.max_marks(), 2);
    }

    #[test]
    fn score_band_thresholds() {
        assert_eq!(
            ScoreBand::classify(Score::clamped(8.0, Marks::Ten), Marks::Ten),
            ScoreBand::Strong
        );
        assert_eq!(
            ScoreBand::classify(Score::clamped(2.0, Marks::Five), Marks::Five),
            ScoreBand::Partial
        );
        assert_eq!(
            ScoreBand::classify(Score::clamped(0.5, Marks::Two), Marks::Two),
            ScoreBand::Weak
        );
    }
}
