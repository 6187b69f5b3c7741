//! Focus Zone CLI library.
//!
//! This crate provides the terminal front end for study and exam sessions.

mod cli;
pub mod commands;
mod config;
pub mod content;
pub mod render;
pub mod terminal;

pub use cli::{Cli, Commands, ExamArgs, StudyArgs};
pub use config::Config;
