//! The proctored session state machine.
//!
//! # Shape
//!
//! Each phase is a variant of a private `Stage` enum carrying exactly the
//! data that phase owns. Every operation matches on the stage and rejects
//! phases it does not apply to.
//!
//! # Suspension
//!
//! The controller performs no I/O. Calls to the content service are split in
//! two: `begin_*` moves into a pending sub-state and returns an owned ticket,
//! and `complete_*` applies the response. A completion whose attempt id no
//! longer matches the pending one (the session was left, or a newer attempt
//! started) is discarded.
//!
//! # Resources
//!
//! Fullscreen, the camera, the timer and the monitor subscription are owned
//! here and nowhere else. [`SessionController::leave`] releases all of them
//! from any phase, and dropping the controller does the same.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ContentRef;
use crate::display::{Fullscreen, Screen};
use crate::exam::{
    AnswerSet, EvaluationResult, ExamConfiguration, ExamPaper, Question, Scorecard,
};
use crate::monitor::{DistractionEvent, DistractionMonitor, FocusSignal, Subscription};
use crate::presence::{CaptureDevice, PresenceCapture, PresenceStatus};
use crate::service::{AdapterError, ChatRole, ChatSession, EXPLAINER_FALLBACK};
use crate::state::{SessionIntent, SessionPhase};
use crate::timer::{Countdown, TimerSignal, TimerState, TimerToken, format_clock};
use crate::types::{Marks, QuestionId, SessionId};

const DEFAULT_STUDY_MINUTES: u64 = 25;
const TIME_UP_WARNING: &str = "Time is up. Submit your answers.";

/// What to do when the exam countdown reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryPolicy {
    /// Stop the timer and warn; the user still submits by hand.
    #[default]
    Warn,
    /// Start the submission as soon as time runs out.
    AutoSubmit,
}

/// Tunables for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Study countdown length.
    pub study_duration: Duration,
    pub expiry: ExpiryPolicy,
    /// Starting exam configuration.
    pub exam: ExamConfiguration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            study_duration: Duration::from_secs(DEFAULT_STUDY_MINUTES * 60),
            expiry: ExpiryPolicy::Warn,
            exam: ExamConfiguration::default(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: SessionPhase,
    },
    #[error("a {0} request is already in flight")]
    AlreadyPending(PendingRequest),
    #[error("exam configuration must request at least one question")]
    EmptyConfiguration,
    #[error("question {0} is not on the paper")]
    UnknownQuestion(QuestionId),
    #[error("message cannot be empty")]
    EmptyMessage,
}

/// Which adapter call a session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingRequest {
    Generation,
    Evaluation,
    Explainer,
}

impl fmt::Display for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generation => "generation",
            Self::Evaluation => "evaluation",
            Self::Explainer => "explainer",
        })
    }
}

/// Identifies one adapter round-trip within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptId(u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a `complete_*` call changed the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Completion {
    Applied,
    /// The response belonged to an attempt that is no longer pending.
    Discarded,
}

/// Everything the exam generator needs, detached from the controller.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    attempt: AttemptId,
    content: ContentRef,
    config: ExamConfiguration,
}

impl GenerationTicket {
    #[must_use]
    pub const fn attempt(&self) -> AttemptId {
        self.attempt
    }

    #[must_use]
    pub const fn content(&self) -> &ContentRef {
        &self.content
    }

    #[must_use]
    pub const fn config(&self) -> &ExamConfiguration {
        &self.config
    }
}

/// A frozen submission: every paper question plus the answers given.
#[derive(Debug, Clone)]
pub struct EvaluationTicket {
    attempt: AttemptId,
    questions: Vec<Question>,
    answers: AnswerSet,
    content: ContentRef,
}

impl EvaluationTicket {
    #[must_use]
    pub const fn attempt(&self) -> AttemptId {
        self.attempt
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub const fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    #[must_use]
    pub const fn content(&self) -> &ContentRef {
        &self.content
    }
}

/// One explainer message with the conversation that precedes it.
#[derive(Debug, Clone)]
pub struct ChatTicket {
    attempt: AttemptId,
    chat: ChatSession,
    message: String,
}

impl ChatTicket {
    #[must_use]
    pub const fn attempt(&self) -> AttemptId {
        self.attempt
    }

    #[must_use]
    pub const fn chat(&self) -> &ChatSession {
        &self.chat
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Notifications for the surrounding UI, drained with
/// [`SessionController::drain_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    Distraction(DistractionEvent),
    /// Study timer paused; the user must resume explicitly.
    ResumeRequired { message: String },
    /// Dismissible exam warning.
    Warning { message: String },
    PresenceUnavailable { reason: String },
    GenerationFailed { message: String },
    EvaluationDegraded { message: String },
    StudyComplete,
    TimeUp,
}

/// Result of feeding elapsed time into the session.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Idle,
    Ticked { remaining_secs: u64 },
    Expired,
    /// Exam time ran out under [`ExpiryPolicy::AutoSubmit`]; the submission
    /// has begun and this ticket must be evaluated.
    SubmissionDue(EvaluationTicket),
}

#[derive(Debug)]
struct Study {
    content: ContentRef,
    chat: ChatSession,
    awaiting_reply: Option<AttemptId>,
    prompt: Option<String>,
    subscription: Option<Subscription>,
    complete: bool,
}

#[derive(Debug)]
struct Configuring {
    content: ContentRef,
    generating: Option<AttemptId>,
    last_error: Option<String>,
}

#[derive(Debug)]
struct Exam {
    content: ContentRef,
    paper: ExamPaper,
    answers: AnswerSet,
    subscription: Option<Subscription>,
    warning: Option<String>,
    evaluating: Option<AttemptId>,
}

#[derive(Debug)]
struct Outcome {
    content: ContentRef,
    paper: ExamPaper,
    answers: AnswerSet,
    scorecard: Scorecard,
}

#[derive(Debug)]
enum Stage {
    SelectingIntent,
    SelectingContent,
    StudyActive(Study),
    ExamConfiguring(Configuring),
    ExamActive(Exam),
    ExamResult(Outcome),
    Exited,
}

impl Stage {
    const fn phase(&self) -> SessionPhase {
        match self {
            Self::SelectingIntent => SessionPhase::SelectingIntent,
            Self::SelectingContent => SessionPhase::SelectingContent,
            Self::StudyActive(_) => SessionPhase::StudyActive,
            Self::ExamConfiguring(_) => SessionPhase::ExamConfiguring,
            Self::ExamActive(_) => SessionPhase::ExamActive,
            Self::ExamResult(_) => SessionPhase::ExamResult,
            Self::Exited => SessionPhase::Exited,
        }
    }
}

/// Drives one study or exam session from intent selection to exit.
#[derive(Debug)]
pub struct SessionController {
    id: SessionId,
    settings: ControllerSettings,
    intent: Option<SessionIntent>,
    stage: Stage,
    exam_config: ExamConfiguration,
    timer: Countdown,
    timer_token: Option<TimerToken>,
    monitor: DistractionMonitor,
    presence: PresenceCapture,
    fullscreen: Fullscreen,
    last_attempt: u64,
    events: Vec<SessionEvent>,
}

impl SessionController {
    /// Creates a session in `SelectingIntent`. Nothing is acquired yet.
    #[must_use]
    pub fn new(
        settings: ControllerSettings,
        screen: Box<dyn Screen>,
        camera: Box<dyn CaptureDevice>,
    ) -> Self {
        let id = SessionId::generate();
        tracing::info!(session = %id, "session created");
        Self {
            id,
            exam_config: settings.exam,
            settings,
            intent: None,
            stage: Stage::SelectingIntent,
            timer: Countdown::new(),
            timer_token: None,
            monitor: DistractionMonitor::new(),
            presence: PresenceCapture::new(camera),
            fullscreen: Fullscreen::new(screen),
            last_attempt: 0,
            events: Vec::new(),
        }
    }

    // ----- intent and content -----

    /// `SelectingIntent -> SelectingContent`.
    pub fn choose_intent(&mut self, intent: SessionIntent) -> Result<(), ControllerError> {
        if !matches!(self.stage, Stage::SelectingIntent) {
            return Err(self.invalid("choose an intent"));
        }
        self.intent = Some(intent);
        tracing::info!(session = %self.id, %intent, "intent chosen");
        self.transition(Stage::SelectingContent);
        Ok(())
    }

    /// `SelectingContent -> StudyActive | ExamConfiguring`, by intent.
    pub fn select_content(&mut self, content: ContentRef) -> Result<SessionPhase, ControllerError> {
        let (Stage::SelectingContent, Some(intent)) = (&self.stage, self.intent) else {
            return Err(self.invalid("select content"));
        };
        tracing::info!(session = %self.id, content = %content.id, "content selected");
        match intent {
            SessionIntent::Study => self.enter_study(content),
            SessionIntent::Exam => self.transition(Stage::ExamConfiguring(Configuring {
                content,
                generating: None,
                last_error: None,
            })),
        }
        Ok(self.phase())
    }

    fn enter_study(&mut self, content: ContentRef) {
        let fullscreen = self.fullscreen.acquire();
        self.acquire_presence();
        let subscription = self.subscribe(fullscreen);
        self.timer_token = Some(self.timer.start(self.settings.study_duration.as_secs()));
        let chat = ChatSession::open(content.clone());
        self.transition(Stage::StudyActive(Study {
            content,
            chat,
            awaiting_reply: None,
            prompt: None,
            subscription,
            complete: false,
        }));
    }

    // ----- study -----

    /// Pauses the study timer by hand. Returns whether it was running.
    pub fn pause(&mut self) -> Result<bool, ControllerError> {
        if !matches!(self.stage, Stage::StudyActive(_)) {
            return Err(self.invalid("pause"));
        }
        Ok(self.timer.pause())
    }

    /// Clears the resume prompt, re-enters fullscreen and restarts the study
    /// timer where it stopped.
    pub fn resume(&mut self) -> Result<(), ControllerError> {
        let phase = self.phase();
        let Stage::StudyActive(study) = &mut self.stage else {
            return Err(ControllerError::InvalidPhase {
                operation: "resume",
                phase,
            });
        };
        study.prompt = None;
        let held = self.fullscreen.acquire();
        self.monitor.set_fullscreen_expected(held);
        if !study.complete {
            self.timer.resume();
        }
        tracing::info!(session = %self.id, remaining_secs = self.timer.remaining_secs(), "study resumed");
        Ok(())
    }

    /// Sends a message to the explainer. One message may be in flight.
    pub fn begin_chat(&mut self, message: &str) -> Result<ChatTicket, ControllerError> {
        let phase = self.phase();
        let Stage::StudyActive(study) = &mut self.stage else {
            return Err(ControllerError::InvalidPhase {
                operation: "ask the explainer",
                phase,
            });
        };
        let message = message.trim();
        if message.is_empty() {
            return Err(ControllerError::EmptyMessage);
        }
        if study.awaiting_reply.is_some() {
            return Err(ControllerError::AlreadyPending(PendingRequest::Explainer));
        }
        self.last_attempt += 1;
        let attempt = AttemptId(self.last_attempt);
        let chat = study.chat.clone();
        study.chat.push(ChatRole::User, message);
        study.awaiting_reply = Some(attempt);
        tracing::debug!(session = %self.id, %attempt, "explainer request started");
        Ok(ChatTicket {
            attempt,
            chat,
            message: message.to_string(),
        })
    }

    /// Appends the explainer's reply, or the fallback reply on failure.
    pub fn complete_chat(
        &mut self,
        attempt: AttemptId,
        reply: Result<String, AdapterError>,
    ) -> Completion {
        let Stage::StudyActive(study) = &mut self.stage else {
            return self.discard(attempt, PendingRequest::Explainer);
        };
        if study.awaiting_reply != Some(attempt) {
            return self.discard(attempt, PendingRequest::Explainer);
        }
        study.awaiting_reply = None;
        let text = reply.unwrap_or_else(|err| {
            tracing::warn!(session = %self.id, error = %err, "explainer failed");
            EXPLAINER_FALLBACK.to_string()
        });
        study.chat.push(ChatRole::Model, text);
        Completion::Applied
    }

    // ----- exam configuration -----

    /// Sets the question count for one weight class.
    pub fn set_question_count(&mut self, class: Marks, count: u32) -> Result<(), ControllerError> {
        let mut config = self.exam_config;
        config.set_count(class, count);
        self.set_exam_config(config)
    }

    /// Replaces the exam configuration. Only while configuring and idle.
    pub fn set_exam_config(&mut self, config: ExamConfiguration) -> Result<(), ControllerError> {
        match &self.stage {
            Stage::ExamConfiguring(Configuring {
                generating: None, ..
            }) => {
                self.exam_config = config;
                Ok(())
            }
            Stage::ExamConfiguring(_) => {
                Err(ControllerError::AlreadyPending(PendingRequest::Generation))
            }
            _ => Err(self.invalid("change the exam configuration")),
        }
    }

    /// Acquires the focus environment and requests a paper.
    ///
    /// A second call while a paper is being generated is rejected, so a
    /// double click produces one request.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, ControllerError> {
        let phase = self.phase();
        let Stage::ExamConfiguring(configuring) = &mut self.stage else {
            return Err(ControllerError::InvalidPhase {
                operation: "generate an exam",
                phase,
            });
        };
        if configuring.generating.is_some() {
            return Err(ControllerError::AlreadyPending(PendingRequest::Generation));
        }
        if !self.exam_config.is_generatable() {
            return Err(ControllerError::EmptyConfiguration);
        }
        self.last_attempt += 1;
        let attempt = AttemptId(self.last_attempt);
        configuring.generating = Some(attempt);
        configuring.last_error = None;
        let content = configuring.content.clone();

        self.fullscreen.acquire();
        self.acquire_presence();
        tracing::info!(
            session = %self.id,
            %attempt,
            questions = self.exam_config.total_questions(),
            marks = self.exam_config.total_marks(),
            "exam generation started"
        );
        Ok(GenerationTicket {
            attempt,
            content,
            config: self.exam_config,
        })
    }

    /// Applies the generator's answer.
    ///
    /// On success the exam starts with 1.5 minutes per mark. On failure the
    /// session stays in configuration with the error recorded and the
    /// resources taken for the attempt released.
    pub fn complete_generation(
        &mut self,
        attempt: AttemptId,
        result: Result<ExamPaper, AdapterError>,
    ) -> Completion {
        let Stage::ExamConfiguring(configuring) = &mut self.stage else {
            return self.discard(attempt, PendingRequest::Generation);
        };
        if configuring.generating != Some(attempt) {
            return self.discard(attempt, PendingRequest::Generation);
        }
        configuring.generating = None;

        match result {
            Ok(paper) => {
                let content = configuring.content.clone();
                let allowance = paper.time_allowance().as_secs();
                tracing::info!(
                    session = %self.id,
                    %attempt,
                    questions = paper.question_count(),
                    marks = paper.total_marks(),
                    allowance_secs = allowance,
                    "exam paper ready"
                );
                let subscription = self.subscribe(self.fullscreen.is_held());
                self.timer_token = Some(self.timer.start(allowance));
                self.transition(Stage::ExamActive(Exam {
                    content,
                    paper,
                    answers: AnswerSet::new(),
                    subscription,
                    warning: None,
                    evaluating: None,
                }));
            }
            Err(err) => {
                let message = err.to_string();
                configuring.last_error = Some(message.clone());
                self.fullscreen.release();
                self.presence.release();
                tracing::warn!(session = %self.id, %attempt, error = %err, "exam generation failed");
                self.events.push(SessionEvent::GenerationFailed { message });
            }
        }
        Completion::Applied
    }

    // ----- exam -----

    /// Records or replaces an answer while the exam is open.
    pub fn upsert_answer(
        &mut self,
        id: QuestionId,
        text: impl Into<String>,
    ) -> Result<(), ControllerError> {
        let phase = self.phase();
        let Stage::ExamActive(exam) = &mut self.stage else {
            return Err(ControllerError::InvalidPhase {
                operation: "answer",
                phase,
            });
        };
        if exam.evaluating.is_some() {
            return Err(ControllerError::AlreadyPending(PendingRequest::Evaluation));
        }
        if exam.paper.question(id).is_none() {
            return Err(ControllerError::UnknownQuestion(id));
        }
        exam.answers.upsert(id, text);
        Ok(())
    }

    /// Clears the exam warning and asks for fullscreen again.
    pub fn dismiss_warning(&mut self) -> Result<(), ControllerError> {
        let phase = self.phase();
        let Stage::ExamActive(exam) = &mut self.stage else {
            return Err(ControllerError::InvalidPhase {
                operation: "dismiss a warning",
                phase,
            });
        };
        exam.warning = None;
        if exam.evaluating.is_none() {
            let held = self.fullscreen.acquire();
            self.monitor.set_fullscreen_expected(held);
        }
        Ok(())
    }

    /// Stops the timer and freezes the answers for evaluation.
    pub fn begin_submission(&mut self) -> Result<EvaluationTicket, ControllerError> {
        let phase = self.phase();
        let Stage::ExamActive(exam) = &mut self.stage else {
            return Err(ControllerError::InvalidPhase {
                operation: "submit",
                phase,
            });
        };
        if exam.evaluating.is_some() {
            return Err(ControllerError::AlreadyPending(PendingRequest::Evaluation));
        }
        self.last_attempt += 1;
        let attempt = AttemptId(self.last_attempt);
        exam.evaluating = Some(attempt);
        let ticket = EvaluationTicket {
            attempt,
            questions: exam.paper.questions().cloned().collect(),
            answers: exam.answers.clone(),
            content: exam.content.clone(),
        };
        self.timer.stop();
        tracing::info!(
            session = %self.id,
            %attempt,
            questions = ticket.questions.len(),
            answered = ticket.answers.answered_count(),
            distractions = self.monitor.count(),
            "exam submitted"
        );
        Ok(ticket)
    }

    /// Applies the evaluator's answer and moves to the result screen.
    ///
    /// A failed evaluation still reaches the result screen, with an empty
    /// (degraded) scorecard.
    pub fn complete_evaluation(
        &mut self,
        attempt: AttemptId,
        result: Result<Vec<EvaluationResult>, AdapterError>,
    ) -> Completion {
        let Stage::ExamActive(exam) = &mut self.stage else {
            return self.discard(attempt, PendingRequest::Evaluation);
        };
        if exam.evaluating != Some(attempt) {
            return self.discard(attempt, PendingRequest::Evaluation);
        }

        let scorecard = match result {
            Ok(results) => Scorecard::grade(&exam.paper, results),
            Err(err) => {
                tracing::warn!(session = %self.id, %attempt, error = %err, "evaluation failed; showing degraded results");
                self.events.push(SessionEvent::EvaluationDegraded {
                    message: err.to_string(),
                });
                Scorecard::degraded(&exam.paper)
            }
        };
        let subscription = exam.subscription.take();
        let outcome = Outcome {
            content: exam.content.clone(),
            paper: exam.paper.clone(),
            answers: std::mem::take(&mut exam.answers),
            scorecard,
        };

        self.unsubscribe(subscription);
        self.cancel_timer();
        self.fullscreen.release();
        self.presence.release();
        tracing::info!(
            session = %self.id,
            %attempt,
            score = outcome.scorecard.total_score(),
            max = outcome.scorecard.max_marks(),
            degraded = outcome.scorecard.is_degraded(),
            "exam evaluated"
        );
        self.transition(Stage::ExamResult(outcome));
        Completion::Applied
    }

    /// `ExamResult -> SelectingContent`, discarding the attempt.
    pub fn take_another(&mut self) -> Result<(), ControllerError> {
        if !matches!(self.stage, Stage::ExamResult(_)) {
            return Err(self.invalid("take another exam"));
        }
        self.transition(Stage::SelectingContent);
        Ok(())
    }

    // ----- signals and time -----

    /// Feeds a platform focus signal, timestamped now.
    pub fn observe(&mut self, signal: FocusSignal) -> Option<DistractionEvent> {
        self.observe_at(signal, Utc::now())
    }

    /// Feeds a platform focus signal and applies the phase's policy.
    ///
    /// Study pauses the timer behind a resume prompt. Exam only warns.
    /// Everywhere else the signal is ignored.
    pub fn observe_at(&mut self, signal: FocusSignal, at: DateTime<Utc>) -> Option<DistractionEvent> {
        let phase = self.phase();
        let event = self.monitor.observe(signal, phase, at);
        if signal == FocusSignal::FullscreenExited {
            self.fullscreen.mark_lost();
            self.monitor.set_fullscreen_expected(false);
        }
        let event = event?;

        self.events.push(SessionEvent::Distraction(event.clone()));
        let reason = event.cause.reason();
        match &mut self.stage {
            Stage::StudyActive(study) if study.complete => {
                tracing::debug!(session = %self.id, "distraction after completion, timer already stopped");
            }
            Stage::StudyActive(study) => {
                self.timer.pause();
                let message = format!("Focus Lost! {reason}. Timer paused.");
                study.prompt = Some(message.clone());
                self.events.push(SessionEvent::ResumeRequired { message });
            }
            Stage::ExamActive(exam) => {
                let message = format!("Warning: {reason}. Incident logged.");
                exam.warning = Some(message.clone());
                self.events.push(SessionEvent::Warning { message });
            }
            Stage::SelectingIntent
            | Stage::SelectingContent
            | Stage::ExamConfiguring(_)
            | Stage::ExamResult(_)
            | Stage::Exited => {
                tracing::error!(session = %self.id, %phase, "monitor subscribed outside an active phase");
            }
        }
        tracing::info!(
            session = %self.id,
            %phase,
            cause = ?event.cause,
            total = self.monitor.count(),
            "distraction recorded"
        );
        Some(event)
    }

    /// Feeds elapsed wall time into the session timer.
    pub fn tick(&mut self, elapsed: Duration) -> TickOutcome {
        match self.timer.advance(elapsed) {
            TimerSignal::Idle => TickOutcome::Idle,
            TimerSignal::Ticked { remaining_secs } => TickOutcome::Ticked { remaining_secs },
            TimerSignal::Expired => self.on_expired(),
        }
    }

    fn on_expired(&mut self) -> TickOutcome {
        let policy = self.settings.expiry;
        match &mut self.stage {
            Stage::StudyActive(study) => {
                study.complete = true;
                tracing::info!(session = %self.id, "study session complete");
                self.events.push(SessionEvent::StudyComplete);
                TickOutcome::Expired
            }
            Stage::ExamActive(exam) => {
                tracing::info!(session = %self.id, ?policy, "exam time is up");
                self.events.push(SessionEvent::TimeUp);
                match policy {
                    ExpiryPolicy::Warn => {
                        exam.warning = Some(TIME_UP_WARNING.to_string());
                        TickOutcome::Expired
                    }
                    ExpiryPolicy::AutoSubmit => match self.begin_submission() {
                        Ok(ticket) => TickOutcome::SubmissionDue(ticket),
                        Err(err) => {
                            tracing::debug!(session = %self.id, error = %err, "auto-submit skipped");
                            TickOutcome::Expired
                        }
                    },
                }
            }
            Stage::SelectingIntent
            | Stage::SelectingContent
            | Stage::ExamConfiguring(_)
            | Stage::ExamResult(_)
            | Stage::Exited => TickOutcome::Expired,
        }
    }

    // ----- exit -----

    /// Leaves the session from any phase, releasing every resource.
    ///
    /// Idempotent. Outstanding tickets become stale.
    pub fn leave(&mut self) {
        if matches!(self.stage, Stage::Exited) {
            return;
        }
        let subscription = match &mut self.stage {
            Stage::StudyActive(study) => study.subscription.take(),
            Stage::ExamActive(exam) => exam.subscription.take(),
            Stage::SelectingIntent
            | Stage::SelectingContent
            | Stage::ExamConfiguring(_)
            | Stage::ExamResult(_)
            | Stage::Exited => None,
        };
        self.unsubscribe(subscription);
        self.cancel_timer();
        self.fullscreen.release();
        self.presence.release();
        tracing::info!(session = %self.id, distractions = self.monitor.count(), "session left");
        self.transition(Stage::Exited);
    }

    // ----- observation -----

    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.stage.phase()
    }

    #[must_use]
    pub const fn intent(&self) -> Option<SessionIntent> {
        self.intent
    }

    #[must_use]
    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    #[must_use]
    pub const fn exam_config(&self) -> &ExamConfiguration {
        &self.exam_config
    }

    #[must_use]
    pub const fn timer(&self) -> TimerState {
        self.timer.state()
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn clock(&self) -> String {
        format_clock(self.timer.remaining_secs())
    }

    #[must_use]
    pub fn distractions(&self) -> &[DistractionEvent] {
        self.monitor.log()
    }

    #[must_use]
    pub fn distraction_count(&self) -> usize {
        self.monitor.count()
    }

    #[must_use]
    pub const fn is_monitoring(&self) -> bool {
        self.monitor.is_subscribed()
    }

    #[must_use]
    pub const fn presence(&self) -> &PresenceStatus {
        self.presence.status()
    }

    #[must_use]
    pub const fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_held()
    }

    #[must_use]
    pub const fn content(&self) -> Option<&ContentRef> {
        match &self.stage {
            Stage::StudyActive(study) => Some(&study.content),
            Stage::ExamConfiguring(configuring) => Some(&configuring.content),
            Stage::ExamActive(exam) => Some(&exam.content),
            Stage::ExamResult(outcome) => Some(&outcome.content),
            Stage::SelectingIntent | Stage::SelectingContent | Stage::Exited => None,
        }
    }

    #[must_use]
    pub const fn chat(&self) -> Option<&ChatSession> {
        match &self.stage {
            Stage::StudyActive(study) => Some(&study.chat),
            _ => None,
        }
    }

    #[must_use]
    pub const fn paper(&self) -> Option<&ExamPaper> {
        match &self.stage {
            Stage::ExamActive(exam) => Some(&exam.paper),
            Stage::ExamResult(outcome) => Some(&outcome.paper),
            _ => None,
        }
    }

    #[must_use]
    pub const fn answers(&self) -> Option<&AnswerSet> {
        match &self.stage {
            Stage::ExamActive(exam) => Some(&exam.answers),
            Stage::ExamResult(outcome) => Some(&outcome.answers),
            _ => None,
        }
    }

    #[must_use]
    pub const fn scorecard(&self) -> Option<&Scorecard> {
        match &self.stage {
            Stage::ExamResult(outcome) => Some(&outcome.scorecard),
            _ => None,
        }
    }

    /// The blocking study prompt, if a distraction paused the timer.
    #[must_use]
    pub fn resume_prompt(&self) -> Option<&str> {
        match &self.stage {
            Stage::StudyActive(study) => study.prompt.as_deref(),
            _ => None,
        }
    }

    /// The dismissible exam warning.
    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        match &self.stage {
            Stage::ExamActive(exam) => exam.warning.as_deref(),
            _ => None,
        }
    }

    /// Error from the last failed generation, shown with a retry affordance.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        match &self.stage {
            Stage::ExamConfiguring(configuring) => configuring.last_error.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn pending(&self) -> Option<PendingRequest> {
        match &self.stage {
            Stage::StudyActive(Study {
                awaiting_reply: Some(_),
                ..
            }) => Some(PendingRequest::Explainer),
            Stage::ExamConfiguring(Configuring {
                generating: Some(_),
                ..
            }) => Some(PendingRequest::Generation),
            Stage::ExamActive(Exam {
                evaluating: Some(_),
                ..
            }) => Some(PendingRequest::Evaluation),
            _ => None,
        }
    }

    /// Whether the study countdown has run out.
    #[must_use]
    pub const fn is_study_complete(&self) -> bool {
        matches!(&self.stage, Stage::StudyActive(Study { complete: true, .. }))
    }

    /// Takes the notifications queued since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ----- internals -----

    fn invalid(&self, operation: &'static str) -> ControllerError {
        ControllerError::InvalidPhase {
            operation,
            phase: self.phase(),
        }
    }

    fn transition(&mut self, next: Stage) {
        let from = self.stage.phase();
        self.stage = next;
        let to = self.stage.phase();
        tracing::debug!(session = %self.id, %from, %to, "phase changed");
        self.events.push(SessionEvent::PhaseChanged { from, to });
    }

    fn discard(&self, attempt: AttemptId, request: PendingRequest) -> Completion {
        tracing::debug!(session = %self.id, %attempt, %request, "discarding stale response");
        Completion::Discarded
    }

    fn acquire_presence(&mut self) {
        if let PresenceStatus::Unavailable { reason } = self.presence.acquire() {
            self.events.push(SessionEvent::PresenceUnavailable {
                reason: reason.clone(),
            });
        }
    }

    fn subscribe(&mut self, fullscreen_expected: bool) -> Option<Subscription> {
        match self.monitor.subscribe(fullscreen_expected) {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                tracing::error!(session = %self.id, error = %err, "could not subscribe to distractions");
                None
            }
        }
    }

    fn unsubscribe(&mut self, subscription: Option<Subscription>) {
        if let Some(subscription) = subscription {
            if let Err(err) = self.monitor.unsubscribe(subscription) {
                tracing::error!(session = %self.id, error = %err, "could not unsubscribe from distractions");
            }
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer_token.take() {
            self.timer.cancel(token);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if !matches!(self.stage, Stage::Exited) {
            tracing::debug!(session = %self.id, phase = %self.phase(), "controller dropped; releasing resources");
            self.leave();
        }
    }
}
