//! Study material a session is bound to.

use serde::{Deserialize, Serialize};

use crate::types::{ContentId, ValidationError};

/// Read-only reference to the material being studied or examined.
///
/// Supplied by the surrounding catalog; the session engine never edits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: ContentId,
    pub title: String,
    /// Full text of the material. May be empty when only a title is known.
    pub body: String,
    /// Subject tags (e.g. "operating-systems", "sem-5").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ContentRef {
    /// Creates a content reference after validating the title.
    pub fn new(
        id: ContentId,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::Empty { field: "content title" });
        }
        Ok(Self {
            id,
            title,
            body: body.into(),
            tags: Vec::new(),
        })
    }

    /// Attaches subject tags, dropping blanks and duplicates.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into().trim().to_lowercase();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    /// Returns at most `max_chars` characters of the body.
    ///
    /// Truncation respects character boundaries.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.body.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &self.body[..byte_idx],
            None => &self.body,
        }
    }
}
