//! Interactive input: typed lines, the one-second ticker and Ctrl-C.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use fz_core::Marks;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Something the session loop has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Wall time since the previous tick.
    Tick(Duration),
    Line(String),
    /// Stdin closed.
    Eof,
    Interrupt,
}

/// Source of [`Input`] for a session loop.
pub trait InputSource {
    fn next(&mut self) -> impl Future<Output = Result<Input>>;
}

/// Reads lines from stdin and ticks once a second.
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
    ticker: Interval,
    last_tick: Instant,
}

impl Console {
    pub fn new() -> Self {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            ticker,
            last_tick: Instant::now(),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for Console {
    async fn next(&mut self) -> Result<Input> {
        tokio::select! {
            _ = self.ticker.tick() => {
                // Ticks stall while a request is awaited; report the real gap.
                let now = Instant::now();
                let elapsed = now.duration_since(self.last_tick);
                self.last_tick = now;
                Ok(Input::Tick(elapsed))
            }
            line = self.lines.next_line() => {
                let line = line.context("failed to read input")?;
                Ok(line.map_or(Input::Eof, Input::Line))
            }
            _ = tokio::signal::ctrl_c() => Ok(Input::Interrupt),
        }
    }
}

/// A line typed during a study session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyCommand {
    Ask(String),
    Pause,
    Resume,
    Time,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl StudyCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Ask(line.to_string());
        }
        match line {
            "/pause" => Self::Pause,
            "/resume" => Self::Resume,
            "/time" => Self::Time,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A line typed during an exam session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamCommand {
    Answer { id: u32, text: String },
    Questions,
    Time,
    Dismiss,
    Submit,
    /// Changes one section's question count while configuring.
    Set { class: Marks, count: u32 },
    /// Generates a paper from the current configuration.
    Start,
    Again,
    Help,
    Quit,
    Empty,
    /// A known command used incorrectly, with the usage line.
    Invalid(&'static str),
    Unknown(String),
}

const ANSWER_USAGE: &str = "usage: /answer <id> <text>";
const SET_USAGE: &str = "usage: /set <short|medium|long> <count>";

impl ExamCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(command, rest)| (command, rest.trim()));
        match command {
            "/answer" => Self::parse_answer(rest),
            "/questions" => Self::Questions,
            "/time" => Self::Time,
            "/dismiss" => Self::Dismiss,
            "/submit" => Self::Submit,
            "/set" => Self::parse_set(rest),
            "/start" | "/generate" | "/retry" => Self::Start,
            "/again" => Self::Again,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }

    fn parse_answer(rest: &str) -> Self {
        let Some((id, text)) = rest.split_once(char::is_whitespace) else {
            return Self::Invalid(ANSWER_USAGE);
        };
        let id = id.trim_start_matches(['Q', 'q']);
        match id.parse() {
            Ok(id) => Self::Answer {
                id,
                text: text.trim().to_string(),
            },
            Err(_) => Self::Invalid(ANSWER_USAGE),
        }
    }

    fn parse_set(rest: &str) -> Self {
        let mut words = rest.split_whitespace();
        let (Some(section), Some(count), None) = (words.next(), words.next(), words.next()) else {
            return Self::Invalid(SET_USAGE);
        };
        let class = match section.to_ascii_lowercase().as_str() {
            "short" | "a" | "2" => Marks::Two,
            "medium" | "b" | "5" => Marks::Five,
            "long" | "c" | "10" => Marks::Ten,
            _ => return Self::Invalid(SET_USAGE),
        };
        match count.parse() {
            Ok(count) => Self::Set { class, count },
            Err(_) => Self::Invalid(SET_USAGE),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays a fixed script, then reports end of input.
    #[derive(Debug, Default)]
    pub(crate) struct Scripted(VecDeque<Input>);

    impl Scripted {
        pub(crate) fn new<I: IntoIterator<Item = Input>>(inputs: I) -> Self {
            Self(inputs.into_iter().collect())
        }
    }

    impl InputSource for Scripted {
        async fn next(&mut self) -> Result<Input> {
            Ok(self.0.pop_front().unwrap_or(Input::Eof))
        }
    }

    pub(crate) fn line(text: &str) -> Input {
        Input::Line(text.to_string())
    }

    #[test]
    fn study_free_text_is_a_question() {
        assert_eq!(
            StudyCommand::parse("  what is thrashing? "),
            StudyCommand::Ask("what is thrashing?".to_string())
        );
        assert_eq!(StudyCommand::parse("/pause"), StudyCommand::Pause);
        assert_eq!(StudyCommand::parse(""), StudyCommand::Empty);
        assert_eq!(
            StudyCommand::parse("/nap"),
            StudyCommand::Unknown("/nap".to_string())
        );
    }

    #[test]
    fn exam_answer_keeps_the_full_text() {
        assert_eq!(
            ExamCommand::parse("/answer 3  A page fault traps to the kernel."),
            ExamCommand::Answer {
                id: 3,
                text: "A page fault traps to the kernel.".to_string()
            }
        );
        assert_eq!(
            ExamCommand::parse("/answer Q2 paging"),
            ExamCommand::Answer {
                id: 2,
                text: "paging".to_string()
            }
        );
    }

    #[test]
    fn exam_answer_usage_errors() {
        assert_eq!(ExamCommand::parse("/answer"), ExamCommand::Invalid(ANSWER_USAGE));
        assert_eq!(ExamCommand::parse("/answer 2"), ExamCommand::Invalid(ANSWER_USAGE));
        assert_eq!(
            ExamCommand::parse("/answer two paging"),
            ExamCommand::Invalid(ANSWER_USAGE)
        );
    }

    #[test]
    fn exam_set_names_a_section_and_count() {
        assert_eq!(
            ExamCommand::parse("/set short 4"),
            ExamCommand::Set {
                class: Marks::Two,
                count: 4
            }
        );
        assert_eq!(
            ExamCommand::parse("/set C 0"),
            ExamCommand::Set {
                class: Marks::Ten,
                count: 0
            }
        );
        assert_eq!(ExamCommand::parse("/set huge 3"), ExamCommand::Invalid(SET_USAGE));
        assert_eq!(ExamCommand::parse("/set long -1"), ExamCommand::Invalid(SET_USAGE));
        assert_eq!(ExamCommand::parse("/set long 1 2"), ExamCommand::Invalid(SET_USAGE));
        assert_eq!(ExamCommand::parse("/retry"), ExamCommand::Start);
        assert_eq!(ExamCommand::parse("/start"), ExamCommand::Start);
    }

    #[test]
    fn exam_plain_text_is_unknown() {
        assert_eq!(
            ExamCommand::parse("paging"),
            ExamCommand::Unknown("paging".to_string())
        );
        assert_eq!(ExamCommand::parse("/submit"), ExamCommand::Submit);
    }
}
