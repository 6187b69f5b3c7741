//! Exclusive display mode (fullscreen).

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("fullscreen request denied: {0}")]
    Denied(String),
    #[error("fullscreen is not supported on this display")]
    Unsupported,
}

/// Platform primitive for entering and leaving exclusive display mode.
pub trait Screen: Send {
    fn enter_fullscreen(&mut self) -> Result<(), DisplayError>;

    fn exit_fullscreen(&mut self);
}

/// Tracks whether the session currently holds fullscreen.
///
/// Exit is only requested from the platform when fullscreen is held, so
/// release is idempotent.
pub struct Fullscreen {
    screen: Box<dyn Screen>,
    held: bool,
}

impl fmt::Debug for Fullscreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fullscreen")
            .field("held", &self.held)
            .finish_non_exhaustive()
    }
}

impl Fullscreen {
    #[must_use]
    pub fn new(screen: Box<dyn Screen>) -> Self {
        Self {
            screen,
            held: false,
        }
    }

    /// Requests fullscreen. Returns whether it is held afterwards.
    ///
    /// Denial is logged and otherwise ignored.
    pub fn acquire(&mut self) -> bool {
        if self.held {
            return true;
        }
        match self.screen.enter_fullscreen() {
            Ok(()) => {
                self.held = true;
                tracing::debug!("fullscreen acquired");
            }
            Err(err) => {
                tracing::warn!(error = %err, "fullscreen unavailable; continuing windowed");
            }
        }
        self.held
    }

    pub fn release(&mut self) {
        if self.held {
            self.screen.exit_fullscreen();
            self.held = false;
            tracing::debug!("fullscreen released");
        }
    }

    /// Records that the platform left fullscreen on its own.
    pub fn mark_lost(&mut self) {
        self.held = false;
    }

    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.held
    }
}
