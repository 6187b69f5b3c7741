//! Study command: a timed session with the tutor.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use fz_core::driver::ask_explainer;
use fz_core::{Explainer, SessionController, SessionIntent, TickOutcome, format_clock};

use super::input::{Console, Input, InputSource, StudyCommand};
use super::{flush_events, llm_client};
use crate::Config;
use crate::cli::StudyArgs;
use crate::content::load_content;
use crate::render::{STUDY_HELP, render_chat_turn, render_study_intro};
use crate::terminal::{FocusReporting, NoCamera, TerminalScreen, split_focus_reports};

/// Remaining-time reminders are printed on these boundaries.
const REMINDER_SECS: u64 = 5 * 60;

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &StudyArgs) -> Result<()> {
    let content = load_content(&args.file, &args.tags)?;
    let client = llm_client(config)?;

    let mut settings = config.controller_settings();
    if let Some(minutes) = args.minutes {
        settings.study_duration = Duration::from_secs(minutes.saturating_mul(60));
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let mut ctrl = SessionController::new(
        settings,
        Box::new(TerminalScreen::new()),
        Box::new(NoCamera),
    );
    ctrl.choose_intent(SessionIntent::Study)?;
    let _focus = FocusReporting::enable();
    ctrl.select_content(content)?;

    runtime.block_on(async {
        let mut input = Console::new();
        session(writer, &mut ctrl, &mut input, &client).await
    })
}

/// Drives an active study session until the user quits or input ends.
pub(crate) async fn session<W, S, X>(
    writer: &mut W,
    ctrl: &mut SessionController,
    input: &mut S,
    explainer: &X,
) -> Result<()>
where
    W: Write,
    S: InputSource,
    X: Explainer + Sync,
{
    if let Some(content) = ctrl.content() {
        writeln!(
            writer,
            "{}",
            render_study_intro(content, &ctrl.clock(), ctrl.presence())
        )?;
    }
    if let Some(chat) = ctrl.chat() {
        for turn in chat.turns() {
            writeln!(writer, "{}", render_chat_turn(turn))?;
        }
    }
    writeln!(writer, "Type /help for commands.")?;
    flush_events(writer, ctrl)?;

    loop {
        match input.next().await? {
            Input::Tick(elapsed) => {
                if let TickOutcome::Ticked { remaining_secs } = ctrl.tick(elapsed) {
                    if remaining_secs > 0 && remaining_secs % REMINDER_SECS == 0 {
                        writeln!(writer, "[{} left]", format_clock(remaining_secs))?;
                    }
                }
            }
            Input::Eof | Input::Interrupt => break,
            Input::Line(line) => {
                let (signals, text) = split_focus_reports(&line);
                for signal in signals {
                    ctrl.observe(signal);
                }
                flush_events(writer, ctrl)?;
                if !handle(writer, ctrl, explainer, StudyCommand::parse(&text)).await? {
                    break;
                }
            }
        }
        flush_events(writer, ctrl)?;
    }

    let remaining = ctrl.clock();
    let distractions = ctrl.distraction_count();
    ctrl.leave();
    flush_events(writer, ctrl)?;
    writeln!(
        writer,
        "Session ended with {remaining} left. Distractions: {distractions}."
    )?;
    Ok(())
}

/// Applies one command. Returns `false` when the session should end.
async fn handle<W, X>(
    writer: &mut W,
    ctrl: &mut SessionController,
    explainer: &X,
    command: StudyCommand,
) -> Result<bool>
where
    W: Write,
    X: Explainer + Sync,
{
    match command {
        StudyCommand::Ask(question) => {
            if ctrl.resume_prompt().is_some() {
                writeln!(writer, "Timer paused. Type /resume to continue.")?;
                return Ok(true);
            }
            return ask(writer, ctrl, explainer, &question).await;
        }
        StudyCommand::Pause => match ctrl.pause() {
            Ok(true) => writeln!(
                writer,
                "Paused at {}. Type /resume to continue.",
                ctrl.clock()
            )?,
            Ok(false) => writeln!(writer, "The timer is not running.")?,
            Err(err) => writeln!(writer, "{err}")?,
        },
        StudyCommand::Resume => match ctrl.resume() {
            Ok(()) => writeln!(writer, "Resumed with {} left.", ctrl.clock())?,
            Err(err) => writeln!(writer, "{err}")?,
        },
        StudyCommand::Time => writeln!(writer, "{} left", ctrl.clock())?,
        StudyCommand::Help => writeln!(writer, "{STUDY_HELP}")?,
        StudyCommand::Quit => return Ok(false),
        StudyCommand::Empty => {}
        StudyCommand::Unknown(command) => {
            writeln!(writer, "Unknown command {command}. Type /help.")?;
        }
    }
    Ok(true)
}

/// Sends a question to the tutor. Ctrl-C while waiting ends the session.
async fn ask<W, X>(
    writer: &mut W,
    ctrl: &mut SessionController,
    explainer: &X,
    question: &str,
) -> Result<bool>
where
    W: Write,
    X: Explainer + Sync,
{
    writeln!(writer, "(thinking...)")?;
    writer.flush()?;
    let outcome = tokio::select! {
        done = ask_explainer(ctrl, explainer, question) => Some(done),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(done) = outcome else {
        return Ok(false);
    };
    match done {
        Ok(_) => {
            if let Some(turn) = ctrl.chat().and_then(|chat| chat.turns().last()) {
                writeln!(writer, "{}", render_chat_turn(turn))?;
            }
        }
        Err(err) => writeln!(writer, "{err}")?,
    }
    Ok(true)
}
