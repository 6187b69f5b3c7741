//! Loads study material from disk.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use fz_core::{ContentId, ContentRef};

/// Reads a text or Markdown file into a [`ContentRef`].
///
/// The file stem becomes the content id. The title is the first level-one
/// Markdown heading, or the stem when there is none.
pub fn load_content(path: &Path, tags: &[String]) -> Result<ContentRef> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("cannot derive a content id from {}", path.display()))?;

    let id = ContentId::new(stem)?;
    let title = markdown_title(&body).unwrap_or(stem).to_string();
    let content = ContentRef::new(id, title, body)?.with_tags(tags);
    tracing::debug!(content = %content.id, title = %content.title, chars = content.body.len(), "loaded content");
    Ok(content)
}

fn markdown_title(body: &str) -> Option<&str> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn title_comes_from_first_heading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("operating-systems.md");
        fs::write(&path, "Intro line\n\n## Overview\n# Operating Systems \nProcesses.").unwrap();

        let content = load_content(&path, &["OS".to_string(), "os".to_string()]).unwrap();
        assert_eq!(content.id.as_str(), "operating-systems");
        assert_eq!(content.title, "Operating Systems");
        assert!(content.body.ends_with("Processes."));
        assert_eq!(content.tags, ["os"]);
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbms.txt");
        fs::write(&path, "Normal forms.").unwrap();

        let content = load_content(&path, &[]).unwrap();
        assert_eq!(content.title, "dbms");
        assert!(content.tags.is_empty());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.md");
        let err = load_content(&path, &[]).unwrap_err();
        assert!(err.to_string().contains("absent.md"));
    }
}
