//! Exam command: generate a paper, sit it and see the scorecard.

use std::io::Write;

use anyhow::{Context, Result, bail};
use fz_core::driver::{finish_submission, generate_exam};
use fz_core::{
    AnswerEvaluator, ControllerSettings, EvaluationTicket, ExamGenerator, ExpiryPolicy, Marks,
    QuestionId, SessionController, SessionIntent, SessionPhase, TickOutcome, format_clock,
};

use super::input::{Console, ExamCommand, Input, InputSource};
use super::{flush_events, llm_client};
use crate::Config;
use crate::cli::ExamArgs;
use crate::content::load_content;
use crate::render::{
    EXAM_HELP, SETUP_HINT, render_configuration, render_paper, render_scorecard,
};
use crate::terminal::{FocusReporting, NoCamera, TerminalScreen, split_focus_reports};

/// Remaining-time reminders are printed on these boundaries.
const REMINDER_SECS: u64 = 5 * 60;

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &ExamArgs) -> Result<()> {
    let settings = exam_settings(config, args)?;
    let content = load_content(&args.file, &args.tags)?;
    let client = llm_client(config)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let mut ctrl = SessionController::new(
        settings,
        Box::new(TerminalScreen::new()),
        Box::new(NoCamera),
    );
    ctrl.choose_intent(SessionIntent::Exam)?;
    ctrl.select_content(content)?;
    let _focus = FocusReporting::enable();

    runtime.block_on(async {
        let mut input = Console::new();
        session(writer, &mut ctrl, &mut input, &client).await
    })
}

/// Applies command-line overrides on top of the configured defaults.
fn exam_settings(config: &Config, args: &ExamArgs) -> Result<ControllerSettings> {
    let mut settings = config.controller_settings();
    for (class, count) in [
        (Marks::Two, args.short),
        (Marks::Five, args.medium),
        (Marks::Ten, args.long),
    ] {
        if let Some(count) = count {
            settings.exam.set_count(class, count);
        }
    }
    if args.auto_submit {
        settings.expiry = ExpiryPolicy::AutoSubmit;
    }
    if !settings.exam.is_generatable() {
        bail!("an exam needs at least one question (see --short, --medium and --long)");
    }
    Ok(settings)
}

/// Drives an exam from generation to the result screen and beyond.
pub(crate) async fn session<W, S, C>(
    writer: &mut W,
    ctrl: &mut SessionController,
    input: &mut S,
    client: &C,
) -> Result<()>
where
    W: Write,
    S: InputSource,
    C: ExamGenerator + AnswerEvaluator + Sync,
{
    if let Some(content) = ctrl.content() {
        writeln!(writer, "Exam on {}", content.title)?;
    }
    writeln!(writer, "{}", render_configuration(ctrl.exam_config()))?;

    let mut running = generate(writer, ctrl, client).await?;
    while running {
        match input.next().await? {
            Input::Tick(elapsed) => match ctrl.tick(elapsed) {
                TickOutcome::Ticked { remaining_secs }
                    if remaining_secs > 0 && remaining_secs % REMINDER_SECS == 0 =>
                {
                    writeln!(writer, "[{} left]", format_clock(remaining_secs))?;
                }
                TickOutcome::SubmissionDue(ticket) => {
                    flush_events(writer, ctrl)?;
                    running = evaluate(writer, ctrl, client, ticket).await?;
                }
                TickOutcome::Idle | TickOutcome::Ticked { .. } | TickOutcome::Expired => {}
            },
            Input::Eof | Input::Interrupt => running = false,
            Input::Line(line) => {
                let (signals, text) = split_focus_reports(&line);
                for signal in signals {
                    ctrl.observe(signal);
                }
                flush_events(writer, ctrl)?;
                running = handle(writer, ctrl, client, ExamCommand::parse(&text)).await?;
            }
        }
        flush_events(writer, ctrl)?;
    }

    ctrl.leave();
    flush_events(writer, ctrl)?;
    writeln!(writer, "Exam session closed.")?;
    Ok(())
}

/// Applies one command. Returns `false` when the session should end.
async fn handle<W, C>(
    writer: &mut W,
    ctrl: &mut SessionController,
    client: &C,
    command: ExamCommand,
) -> Result<bool>
where
    W: Write,
    C: ExamGenerator + AnswerEvaluator + Sync,
{
    match command {
        ExamCommand::Answer { id, text } => match ctrl.upsert_answer(QuestionId::new(id), text) {
            Ok(()) => writeln!(writer, "Saved answer to Q{id}.")?,
            Err(err) => writeln!(writer, "{err}")?,
        },
        ExamCommand::Questions => match (ctrl.paper(), ctrl.answers()) {
            (Some(paper), Some(answers)) => write!(writer, "{}", render_paper(paper, answers))?,
            _ => writeln!(writer, "No exam paper yet.")?,
        },
        ExamCommand::Time => writeln!(writer, "{} left", ctrl.clock())?,
        ExamCommand::Dismiss => {
            if let Err(err) = ctrl.dismiss_warning() {
                writeln!(writer, "{err}")?;
            }
        }
        ExamCommand::Submit => match ctrl.begin_submission() {
            Ok(ticket) => return evaluate(writer, ctrl, client, ticket).await,
            Err(err) => writeln!(writer, "{err}")?,
        },
        ExamCommand::Set { class, count } => match ctrl.set_question_count(class, count) {
            Ok(()) => writeln!(writer, "{}", render_configuration(ctrl.exam_config()))?,
            Err(err) => writeln!(writer, "{err}")?,
        },
        ExamCommand::Start => {
            if ctrl.phase() == SessionPhase::ExamConfiguring {
                return generate(writer, ctrl, client).await;
            }
            writeln!(writer, "A paper can only be generated while setting up the exam.")?;
        }
        ExamCommand::Again => {
            let content = ctrl.content().cloned();
            if let Err(err) = ctrl.take_another() {
                writeln!(writer, "{err}")?;
                return Ok(true);
            }
            let Some(content) = content else {
                return Ok(false);
            };
            ctrl.select_content(content)?;
            writeln!(writer, "{}", render_configuration(ctrl.exam_config()))?;
            writeln!(writer, "{SETUP_HINT}")?;
        }
        ExamCommand::Help => writeln!(writer, "{EXAM_HELP}")?,
        ExamCommand::Quit => return Ok(false),
        ExamCommand::Empty => {}
        ExamCommand::Invalid(usage) => writeln!(writer, "{usage}")?,
        ExamCommand::Unknown(text) => writeln!(writer, "Unknown command {text}. Type /help.")?,
    }
    Ok(true)
}

/// Requests a paper. Ctrl-C while waiting ends the session.
async fn generate<W, G>(writer: &mut W, ctrl: &mut SessionController, generator: &G) -> Result<bool>
where
    W: Write,
    G: ExamGenerator + Sync,
{
    writeln!(writer, "Generating exam paper...")?;
    writer.flush()?;
    let outcome = tokio::select! {
        done = generate_exam(ctrl, generator) => Some(done),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(done) = outcome else {
        return Ok(false);
    };
    if let Err(err) = done {
        writeln!(writer, "{err}")?;
        return Ok(true);
    }
    flush_events(writer, ctrl)?;

    if let (Some(paper), Some(answers)) = (ctrl.paper(), ctrl.answers()) {
        write!(writer, "{}", render_paper(paper, answers))?;
        writeln!(
            writer,
            "\nTime allowed: {}. Type /help for commands.",
            ctrl.clock()
        )?;
    }
    Ok(true)
}

/// Waits for the evaluation and shows the scorecard. Ctrl-C while waiting
/// ends the session.
async fn evaluate<W, E>(
    writer: &mut W,
    ctrl: &mut SessionController,
    evaluator: &E,
    ticket: EvaluationTicket,
) -> Result<bool>
where
    W: Write,
    E: AnswerEvaluator + Sync,
{
    writeln!(
        writer,
        "Evaluating {} of {} answers...",
        ticket.answers().answered_count(),
        ticket.questions().len()
    )?;
    writer.flush()?;
    let outcome = tokio::select! {
        done = finish_submission(ctrl, evaluator, ticket) => Some(done),
        _ = tokio::signal::ctrl_c() => None,
    };
    if outcome.is_none() {
        return Ok(false);
    }
    flush_events(writer, ctrl)?;

    if let (Some(paper), Some(answers), Some(scorecard)) =
        (ctrl.paper(), ctrl.answers(), ctrl.scorecard())
    {
        write!(
            writer,
            "{}",
            render_scorecard(paper, answers, scorecard, ctrl.distraction_count())
        )?;
        writeln!(writer, "\nType /again for another exam or /quit to leave.")?;
    }
    Ok(true)
}
