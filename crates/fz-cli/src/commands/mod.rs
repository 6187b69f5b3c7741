//! CLI subcommand implementations.

pub mod config;
pub mod exam;
pub mod input;
pub mod study;

use std::io::Write;

use anyhow::{Context, Result, anyhow};
use fz_core::SessionController;
use fz_llm::Client;

use crate::Config;
use crate::render::render_event;

/// Builds the Claude client from configuration.
fn llm_client(config: &Config) -> Result<Client> {
    let api_key = config
        .api_key()
        .ok_or_else(|| anyhow!("missing Claude API key (set FZ_API_KEY or config.toml)"))?;
    let client = Client::new(api_key)
        .context("failed to create LLM client")?
        .with_model(config.model.clone())
        .with_api_url(config.api_url.clone());
    Ok(client)
}

/// Prints the user-facing events queued by the controller.
fn flush_events<W: Write>(writer: &mut W, ctrl: &mut SessionController) -> Result<()> {
    for event in ctrl.drain_events() {
        tracing::debug!(?event, "session event");
        if let Some(line) = render_event(&event) {
            writeln!(writer, "{line}")?;
        }
    }
    writer.flush()?;
    Ok(())
}
