//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Distraction-free study and exam sessions.
///
/// Studies a piece of material with a timed tutor chat, or sits a generated
/// exam on it under a proctored countdown.
#[derive(Debug, Parser)]
#[command(name = "fz", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a timed study session with a tutor.
    Study(StudyArgs),

    /// Generate an exam on the material and sit it.
    Exam(ExamArgs),

    /// Show the effective configuration.
    Config,
}

/// Arguments for `fz study`.
#[derive(Debug, Args)]
pub struct StudyArgs {
    /// Text or Markdown file with the study material.
    pub file: PathBuf,

    /// Session length in minutes (overrides `study_minutes`).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub minutes: Option<u64>,

    /// Subject tag for the material (repeatable).
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

/// Arguments for `fz exam`.
#[derive(Debug, Args)]
pub struct ExamArgs {
    /// Text or Markdown file with the exam material.
    pub file: PathBuf,

    /// Number of 2-mark questions.
    #[arg(long)]
    pub short: Option<u32>,

    /// Number of 5-mark questions.
    #[arg(long)]
    pub medium: Option<u32>,

    /// Number of 10-mark questions.
    #[arg(long)]
    pub long: Option<u32>,

    /// Submit automatically when time runs out.
    #[arg(long)]
    pub auto_submit: bool,

    /// Subject tag for the material (repeatable).
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}
