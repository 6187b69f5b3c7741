//! Config command: print the effective configuration.

use std::io::Write;

use anyhow::{Context, Result};

use crate::Config;
use crate::config::dirs_config_path;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    if let Some(dir) = dirs_config_path() {
        writeln!(writer, "# {}", dir.join("config.toml").display())?;
    }
    let rendered = config
        .to_redacted_toml()
        .context("failed to render configuration")?;
    write!(writer, "{rendered}")?;
    Ok(())
}
