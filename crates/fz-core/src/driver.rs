//! Runs adapter requests against a [`SessionController`].
//!
//! Each function takes a ticket from the controller, awaits the adapter and
//! hands the response back. Dropping the returned future before it resolves
//! leaves the request pending; a later [`SessionController::leave`] releases
//! everything and any response that still arrives is discarded.

use crate::controller::{Completion, ControllerError, EvaluationTicket, SessionController};
use crate::service::{AnswerEvaluator, ExamGenerator, Explainer};

/// Requests a paper for the current exam configuration.
pub async fn generate_exam<G>(
    ctrl: &mut SessionController,
    generator: &G,
) -> Result<Completion, ControllerError>
where
    G: ExamGenerator + Sync,
{
    let ticket = ctrl.begin_generation()?;
    let result = generator.generate(ticket.content(), ticket.config()).await;
    if let Err(err) = &result {
        tracing::debug!(attempt = %ticket.attempt(), error = %err, "generator returned an error");
    }
    Ok(ctrl.complete_generation(ticket.attempt(), result))
}

/// Submits the current answers and waits for the evaluation.
pub async fn submit_exam<E>(
    ctrl: &mut SessionController,
    evaluator: &E,
) -> Result<Completion, ControllerError>
where
    E: AnswerEvaluator + Sync,
{
    let ticket = ctrl.begin_submission()?;
    Ok(finish_submission(ctrl, evaluator, ticket).await)
}

/// Evaluates a submission that has already begun, such as one started by
/// an expired exam timer.
pub async fn finish_submission<E>(
    ctrl: &mut SessionController,
    evaluator: &E,
    ticket: EvaluationTicket,
) -> Completion
where
    E: AnswerEvaluator + Sync,
{
    let result = evaluator
        .evaluate(ticket.questions(), ticket.answers(), ticket.content())
        .await;
    ctrl.complete_evaluation(ticket.attempt(), result)
}

/// Sends one study question to the explainer and records the reply.
pub async fn ask_explainer<X>(
    ctrl: &mut SessionController,
    explainer: &X,
    message: &str,
) -> Result<Completion, ControllerError>
where
    X: Explainer + Sync,
{
    let ticket = ctrl.begin_chat(message)?;
    let reply = explainer.send(ticket.chat(), ticket.message()).await;
    Ok(ctrl.complete_chat(ticket.attempt(), reply))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::content::ContentRef;
    use crate::controller::{ControllerSettings, PendingRequest};
    use crate::display::tests::FakeScreen;
    use crate::exam::tests::{paper, question};
    use crate::exam::{AnswerSet, EvaluationResult, ExamConfiguration, ExamPaper, Question};
    use crate::presence::tests::FakeCamera;
    use crate::service::{AdapterError, ChatSession, EXPLAINER_FALLBACK};
    use crate::state::{SessionIntent, SessionPhase};
    use crate::types::{ContentId, Marks, QuestionId, Score};

    struct StubGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubGenerator {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl ExamGenerator for StubGenerator {
        async fn generate(
            &self,
            _content: &ContentRef,
            config: &ExamConfiguration,
        ) -> Result<ExamPaper, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AdapterError::Unavailable("offline".to_string()));
            }
            let questions = (1..=config.count(Marks::Two))
                .map(|id| question(id, Marks::Two))
                .collect();
            Ok(paper(questions))
        }
    }

    /// Never answers.
    struct Hanging;

    impl ExamGenerator for Hanging {
        async fn generate(
            &self,
            _content: &ContentRef,
            _config: &ExamConfiguration,
        ) -> Result<ExamPaper, AdapterError> {
            std::future::pending().await
        }
    }

    /// Awards full marks to every answered question.
    struct Generous;

    impl AnswerEvaluator for Generous {
        async fn evaluate(
            &self,
            questions: &[Question],
            answers: &AnswerSet,
            _content: &ContentRef,
        ) -> Result<Vec<EvaluationResult>, AdapterError> {
            Ok(questions
                .iter()
                .filter(|q| answers.get(q.id).is_some())
                .map(|q| EvaluationResult {
                    question_id: q.id,
                    score: Score::clamped(q.marks.weight(), q.marks),
                    feedback: "Correct.".to_string(),
                    model_answer: String::new(),
                })
                .collect())
        }
    }

    struct Echo {
        seen_turns: AtomicUsize,
    }

    impl Explainer for Echo {
        async fn send(&self, chat: &ChatSession, message: &str) -> Result<String, AdapterError> {
            self.seen_turns.store(chat.turns().len(), Ordering::SeqCst);
            if message == "fail" {
                return Err(AdapterError::Unavailable("quota".to_string()));
            }
            Ok(format!("You asked: {message}"))
        }
    }

    fn controller(intent: SessionIntent) -> SessionController {
        let mut ctrl = SessionController::new(
            ControllerSettings {
                exam: ExamConfiguration::new(2, 0, 0),
                ..ControllerSettings::default()
            },
            Box::new(FakeScreen::default()),
            Box::new(FakeCamera::default()),
        );
        ctrl.choose_intent(intent).unwrap();
        let content =
            ContentRef::new(ContentId::new("dbms").unwrap(), "Databases", "Normal forms.").unwrap();
        ctrl.select_content(content).unwrap();
        ctrl
    }

    #[tokio::test]
    async fn exam_round_trip() {
        let mut ctrl = controller(SessionIntent::Exam);
        let generator = StubGenerator::new(false);

        let done = generate_exam(&mut ctrl, &generator).await.unwrap();
        assert_eq!(done, Completion::Applied);
        assert_eq!(ctrl.phase(), SessionPhase::ExamActive);
        assert_eq!(ctrl.paper().unwrap().question_count(), 2);
        assert_eq!(ctrl.timer().remaining_secs, 360);

        ctrl.upsert_answer(QuestionId::new(1), "3NF removes transitive dependencies")
            .unwrap();
        let done = submit_exam(&mut ctrl, &Generous).await.unwrap();
        assert_eq!(done, Completion::Applied);

        let scorecard = ctrl.scorecard().unwrap();
        assert!((scorecard.total_score() - 2.0).abs() < f32::EPSILON);
        assert_eq!(scorecard.max_marks(), 4);
        assert_eq!(
            scorecard.result(QuestionId::new(2)).unwrap().score,
            Score::ZERO
        );
    }

    #[tokio::test]
    async fn generation_is_requested_once_per_call() {
        let mut ctrl = controller(SessionIntent::Exam);
        let generator = StubGenerator::new(true);

        let done = generate_exam(&mut ctrl, &generator).await.unwrap();
        assert_eq!(done, Completion::Applied);
        assert_eq!(ctrl.phase(), SessionPhase::ExamConfiguring);
        assert_eq!(ctrl.last_error(), Some("service unavailable: offline"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        let _ = generate_exam(&mut ctrl, &generator).await.unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abandoned_generation_can_be_left() {
        let mut ctrl = controller(SessionIntent::Exam);

        let outcome =
            tokio::time::timeout(Duration::from_millis(10), generate_exam(&mut ctrl, &Hanging))
                .await;
        assert!(outcome.is_err());
        assert_eq!(ctrl.pending(), Some(PendingRequest::Generation));
        assert!(ctrl.is_fullscreen());

        ctrl.leave();
        assert_eq!(ctrl.phase(), SessionPhase::Exited);
        assert!(!ctrl.is_fullscreen());
    }

    #[tokio::test]
    async fn wrong_phase_never_reaches_adapter() {
        let mut ctrl = controller(SessionIntent::Study);
        let generator = StubGenerator::new(false);
        assert!(generate_exam(&mut ctrl, &generator).await.is_err());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn explainer_sees_history_before_the_new_message() {
        let mut ctrl = controller(SessionIntent::Study);
        let echo = Echo {
            seen_turns: AtomicUsize::new(0),
        };

        let _ = ask_explainer(&mut ctrl, &echo, "What is 2NF?").await.unwrap();
        assert_eq!(echo.seen_turns.load(Ordering::SeqCst), 1);
        let _ = ask_explainer(&mut ctrl, &echo, "fail").await.unwrap();
        assert_eq!(echo.seen_turns.load(Ordering::SeqCst), 3);

        let texts: Vec<_> = ctrl
            .chat()
            .unwrap()
            .turns()
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts[1..], ["What is 2NF?", "You asked: What is 2NF?", "fail", EXPLAINER_FALLBACK]);
    }
}
