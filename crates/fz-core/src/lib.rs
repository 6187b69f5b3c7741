//! Core session engine for Focus Zone.
//!
//! This crate contains the fundamental types and logic for:
//! - Session control: the study/exam state machine and its resources
//! - Timing: an elapsed-time-driven countdown
//! - Proctoring: distraction monitoring, fullscreen and presence capture
//! - Exams: configuration, papers, answers and scoring
//! - Service seams: traits for exam generation, evaluation and explanation

pub mod content;
pub mod controller;
pub mod display;
pub mod driver;
pub mod exam;
pub mod monitor;
pub mod presence;
pub mod service;
pub mod state;
pub mod timer;
pub mod types;

pub use content::ContentRef;
pub use controller::{
    AttemptId, ChatTicket, Completion, ControllerError, ControllerSettings, EvaluationTicket,
    ExpiryPolicy, GenerationTicket, PendingRequest, SessionController, SessionEvent, TickOutcome,
};
pub use display::{DisplayError, Screen};
pub use exam::{
    AnswerSet, EvaluationResult, ExamConfiguration, ExamPaper, ExamSection, NOT_ANSWERED,
    Question, ScoreBand, Scorecard,
};
pub use monitor::{DistractionCause, DistractionEvent, FocusSignal};
pub use presence::{CaptureDevice, CaptureStream, PresenceError, PresenceStatus};
pub use service::{
    AdapterError, AnswerEvaluator, ChatRole, ChatSession, ChatTurn, ExamGenerator, Explainer,
};
pub use state::{SessionIntent, SessionPhase};
pub use timer::{TimerState, format_clock};
pub use types::{ContentId, Marks, QuestionId, Score, SessionId, ValidationError};
