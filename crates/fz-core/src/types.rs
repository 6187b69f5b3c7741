//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A question carried a mark weight outside {2, 5, 10}.
    #[error("marks must be 2, 5 or 10, got {value}")]
    InvalidMarks { value: u32 },

    /// Two questions in one paper share an id.
    #[error("duplicate question id {id}")]
    DuplicateQuestion { id: u32 },

    /// A generated paper contained no questions at all.
    #[error("exam paper contains no questions")]
    EmptyPaper,

    /// Invalid session intent value.
    #[error("invalid session intent: {value}")]
    InvalidIntent { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated content identifier.
    ///
    /// Identifies the study material a session is bound to (a project, a
    /// document, a set of notes).
    ContentId, "content ID"
);

define_string_id!(
    /// A validated session identifier.
    ///
    /// Generated once per controller; appears in every log line the
    /// controller emits.
    SessionId, "session ID"
);

impl SessionId {
    /// Generates a fresh random session identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Identifier of a question, unique within one exam paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(u32);

impl QuestionId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for QuestionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Mark weight of a question.
///
/// Papers only ever use the three university weight classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Marks {
    Two,
    Five,
    Ten,
}

impl Marks {
    /// All weight classes in paper order (section A, B, C).
    pub const ALL: [Self; 3] = [Self::Two, Self::Five, Self::Ten];

    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Five => 5,
            Self::Ten => 10,
        }
    }

    /// The weight as a float, for score arithmetic.
    #[must_use]
    pub const fn weight(self) -> f32 {
        match self {
            Self::Two => 2.0,
            Self::Five => 5.0,
            Self::Ten => 10.0,
        }
    }
}

impl fmt::Display for Marks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl TryFrom<u32> for Marks {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Two),
            5 => Ok(Self::Five),
            10 => Ok(Self::Ten),
            _ => Err(ValidationError::InvalidMarks { value }),
        }
    }
}

impl From<Marks> for u32 {
    fn from(marks: Marks) -> Self {
        marks.value()
    }
}

/// A score awarded for one answer, in the range \[0, marks\].
///
/// Scores may be fractional. Values coming back from the evaluation service
/// are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Score(f32);

impl Score {
    /// The zero score.
    pub const ZERO: Self = Self(0.0);

    /// Creates a score, clamping to \[0, `max`\].
    ///
    /// NaN values become 0.0.
    #[must_use]
    pub fn clamped(value: f32, max: Marks) -> Self {
        let max = max.weight();
        if value.is_nan() || value < 0.0 {
            Self(0.0)
        } else if value > max {
            Self(max)
        } else {
            Self(value)
        }
    }

    /// Returns the inner f32 value.
    #[must_use]
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0)
        } else {
            write!(f, "{:.1}", self.0)
        }
    }
}

impl Serialize for Score {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f32::deserialize(deserializer)?;
        // Upper bound depends on the question; only the floor is known here
        if value.is_nan() || value < 0.0 {
            Ok(Self::ZERO)
        } else {
            Ok(Self(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_rejects_empty() {
        assert!(ContentId::new("").is_err());
        assert!(ContentId::new("   ").is_err());
        assert!(ContentId::new("os-notes").is_ok());
    }

    #[test]
    fn content_id_serde_rejects_empty() {
        let result: Result<ContentId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn marks_accepts_only_weight_classes() {
        assert_eq!(Marks::try_from(2).unwrap(), Marks::Two);
        assert_eq!(Marks::try_from(5).unwrap(), Marks::Five);
        assert_eq!(Marks::try_from(10).unwrap(), Marks::Ten);
        assert_eq!(
            Marks::try_from(3),
            Err(ValidationError::InvalidMarks { value: 3 })
        );
    }

    #[test]
    fn marks_deserialize_from_number() {
        let marks: Marks = serde_json::from_str("5").unwrap();
        assert_eq!(marks, Marks::Five);
        assert!(serde_json::from_str::<Marks>("7").is_err());
        assert_eq!(serde_json::to_string(&Marks::Ten).unwrap(), "10");
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "exact equality intended for boundary tests"
    )]
    fn score_clamped_handles_edge_cases() {
        assert_eq!(Score::clamped(-1.0, Marks::Two).value(), 0.0);
        assert_eq!(Score::clamped(7.5, Marks::Five).value(), 5.0);
        assert_eq!(Score::clamped(f32::NAN, Marks::Ten).value(), 0.0);
        assert_eq!(Score::clamped(1.5, Marks::Two).value(), 1.5);
    }

    #[test]
    fn score_display_drops_trailing_zero() {
        assert_eq!(Score::clamped(4.0, Marks::Five).to_string(), "4");
        assert_eq!(Score::clamped(1.5, Marks::Two).to_string(), "1.5");
    }

    #[test]
    #[expect(
        clippy::float_cmp,
        reason = "exact equality intended for clamped value"
    )]
    fn score_serde_clamps_negative() {
        let parsed: Score = serde_json::from_str("-2").unwrap();
        assert_eq!(parsed.value(), 0.0);
    }
}
