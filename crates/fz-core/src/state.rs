//! Session intent and the externally visible phase of a session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// What the user came to do. Chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionIntent {
    Study,
    Exam,
}

impl SessionIntent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Exam => "exam",
        }
    }
}

impl fmt::Display for SessionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionIntent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "study" => Ok(Self::Study),
            "exam" => Ok(Self::Exam),
            _ => Err(ValidationError::InvalidIntent {
                value: s.to_string(),
            }),
        }
    }
}

/// The current stage of a session, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    SelectingIntent,
    SelectingContent,
    StudyActive,
    ExamConfiguring,
    ExamActive,
    ExamResult,
    /// Terminal. Every resource has been released.
    Exited,
}

impl SessionPhase {
    /// Phases in which the focus environment is enforced.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::StudyActive | Self::ExamActive)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelectingIntent => "selecting_intent",
            Self::SelectingContent => "selecting_content",
            Self::StudyActive => "study_active",
            Self::ExamConfiguring => "exam_configuring",
            Self::ExamActive => "exam_active",
            Self::ExamResult => "exam_result",
            Self::Exited => "exited",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
