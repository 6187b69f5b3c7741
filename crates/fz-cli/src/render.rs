//! Plain-text rendering of session state.

use std::fmt::Write;

use fz_core::{
    AnswerSet, ChatRole, ChatTurn, ContentRef, ExamConfiguration, ExamPaper, Marks,
    PresenceStatus, ScoreBand, Scorecard, SessionEvent, format_clock,
};

pub const STUDY_HELP: &str = "\
Type a question to ask the tutor.
  /pause    pause the timer
  /resume   resume after a pause or distraction
  /time     show the time left
  /quit     end the session";

pub const EXAM_HELP: &str = "\
  /answer <id> <text>   save or replace an answer
  /questions            show the paper with your answers
  /time                 show the time left
  /dismiss              dismiss a warning and return to fullscreen
  /submit               submit for evaluation
  /set <section> <n>    set the question count for short, medium or long
  /start                generate a paper (also /retry after a failure)
  /again                take another exam on the same material
  /quit                 leave the exam";

pub const SETUP_HINT: &str =
    "Type /set <short|medium|long> <count> to change the paper or /start to generate it.";

/// Formats a mark total the way scores are shown: whole numbers without a
/// decimal point, fractions to one place.
fn format_marks(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{value}")
    } else {
        format!("{value:.1}")
    }
}

fn section_label(class: Marks) -> &'static str {
    match class {
        Marks::Two => "Section A",
        Marks::Five => "Section B",
        Marks::Ten => "Section C",
    }
}

pub fn render_study_intro(content: &ContentRef, clock: &str, presence: &PresenceStatus) -> String {
    format!(
        "Studying: {}\nTime left: {clock} | Camera: {presence}",
        content.title
    )
}

pub fn render_chat_turn(turn: &ChatTurn) -> String {
    match turn.role {
        ChatRole::User => format!("you> {}", turn.text),
        ChatRole::Model => format!("tutor> {}", turn.text),
    }
}

/// Line to show for a session event, if it is user-facing.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::PhaseChanged { .. } | SessionEvent::Distraction(_) => None,
        SessionEvent::ResumeRequired { message } => {
            Some(format!("!! {message} Type /resume to continue."))
        }
        SessionEvent::Warning { message } => Some(format!("!! {message} Type /dismiss to continue.")),
        SessionEvent::PresenceUnavailable { reason } => {
            Some(format!("Camera unavailable ({reason}); continuing without it."))
        }
        SessionEvent::GenerationFailed { message } => Some(format!(
            "Exam generation failed: {message}. Type /retry to try again or /set to change the paper."
        )),
        SessionEvent::EvaluationDegraded { message } => Some(format!(
            "Evaluation failed: {message}. Your answers are shown without scores."
        )),
        SessionEvent::StudyComplete => Some("Session Complete! Type /quit to finish.".to_string()),
        SessionEvent::TimeUp => Some("Time is up.".to_string()),
    }
}

pub fn render_configuration(config: &ExamConfiguration) -> String {
    let mut out = String::new();
    for class in Marks::ALL {
        let _ = writeln!(
            out,
            "{}: {} x {class} marks",
            section_label(class),
            config.count(class)
        );
    }
    let _ = write!(
        out,
        "Total: {} questions, {} marks, {}",
        config.total_questions(),
        config.total_marks(),
        format_clock(config.time_allowance().as_secs())
    );
    out
}

/// The paper with the current answer under each question.
pub fn render_paper(paper: &ExamPaper, answers: &AnswerSet) -> String {
    let mut out = format!(
        "{} ({} questions, {} marks)\n",
        paper.title(),
        paper.question_count(),
        paper.total_marks()
    );
    for section in paper.sections() {
        let _ = writeln!(out, "\n{}", section.title);
        for question in &section.questions {
            let _ = writeln!(
                out,
                "  Q{} [{}] {}",
                question.id, question.marks, question.text
            );
            let answer = answers.get(question.id).unwrap_or("(unanswered)");
            let _ = writeln!(out, "      > {answer}");
        }
    }
    out
}

/// The result screen: totals, then one block per question.
pub fn render_scorecard(
    paper: &ExamPaper,
    answers: &AnswerSet,
    scorecard: &Scorecard,
    distractions: usize,
) -> String {
    let mut out = String::new();
    if scorecard.is_degraded() {
        out.push_str("Evaluation unavailable. Your answers were saved but not scored.\n");
    } else {
        let total = scorecard.total_score();
        let max = scorecard.max_marks();
        let percent = if max == 0 {
            0.0
        } else {
            f64::from(total) / f64::from(max) * 100.0
        };
        let _ = writeln!(
            out,
            "Score: {} / {max} ({percent:.0}%)",
            format_marks(total)
        );
    }
    let _ = writeln!(out, "Distractions: {distractions}");

    for question in paper.questions() {
        let result = scorecard.result(question.id);
        match result {
            Some(result) => {
                let band = ScoreBand::classify(result.score, question.marks);
                let _ = writeln!(
                    out,
                    "\nQ{} [{}/{}] {}",
                    question.id,
                    result.score,
                    question.marks,
                    band.as_str()
                );
            }
            None => {
                let _ = writeln!(out, "\nQ{} [-/{}]", question.id, question.marks);
            }
        }
        let _ = writeln!(out, "  {}", question.text);
        let _ = writeln!(out, "  Your answer: {}", answers.answer_for(question.id));
        if let Some(result) = result {
            if !result.model_answer.is_empty() {
                let _ = writeln!(out, "  Model answer: {}", result.model_answer);
            }
            let _ = writeln!(out, "  Feedback: {}", result.feedback);
        }
    }
    out
}
