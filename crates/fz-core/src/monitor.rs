//! Distraction monitoring.
//!
//! The platform reports raw [`FocusSignal`]s. The monitor turns them into
//! logged [`DistractionEvent`]s, but only while someone holds a
//! [`Subscription`]. At most one subscription is live at a time, and it can
//! only be given back once because `unsubscribe` consumes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::SessionPhase;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("a distraction subscription is already active")]
    AlreadySubscribed,
    #[error("subscription {0} is not the active subscription")]
    UnknownSubscription(u64),
}

/// Raw notification from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusSignal {
    /// The session's window or tab stopped being visible.
    VisibilityLost,
    /// The display left exclusive fullscreen mode.
    FullscreenExited,
}

/// Why a distraction was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractionCause {
    TabSwitch,
    FullscreenExit,
}

impl DistractionCause {
    /// Human-readable reason shown in warnings.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::TabSwitch => "Tab switching detected",
            Self::FullscreenExit => "Exited fullscreen mode",
        }
    }
}

/// One logged loss of focus-environment integrity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionEvent {
    pub cause: DistractionCause,
    pub at: DateTime<Utc>,
    pub phase: SessionPhase,
}

/// Proof of an active subscription. Hand it back to
/// [`DistractionMonitor::unsubscribe`] on state exit.
#[derive(Debug)]
#[must_use = "a dropped subscription keeps the monitor listening"]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    id: u64,
    fullscreen_expected: bool,
}

/// Session-lifetime distraction log plus the single listener slot.
#[derive(Debug, Default)]
pub struct DistractionMonitor {
    next_id: u64,
    listener: Option<Listener>,
    log: Vec<DistractionEvent>,
}

impl DistractionMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts listening for signals.
    ///
    /// `fullscreen_expected` says whether leaving fullscreen counts as a
    /// distraction (it does not when fullscreen was never granted).
    pub fn subscribe(&mut self, fullscreen_expected: bool) -> Result<Subscription, MonitorError> {
        if self.listener.is_some() {
            return Err(MonitorError::AlreadySubscribed);
        }
        self.next_id += 1;
        let id = self.next_id;
        self.listener = Some(Listener {
            id,
            fullscreen_expected,
        });
        tracing::debug!(subscription = id, fullscreen_expected, "distraction monitor subscribed");
        Ok(Subscription { id })
    }

    /// Stops listening. Consumes the subscription.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> Result<(), MonitorError> {
        match self.listener {
            Some(listener) if listener.id == subscription.id => {
                self.listener = None;
                tracing::debug!(subscription = subscription.id, "distraction monitor unsubscribed");
                Ok(())
            }
            _ => Err(MonitorError::UnknownSubscription(subscription.id)),
        }
    }

    /// Updates whether fullscreen exit is currently a distraction.
    pub fn set_fullscreen_expected(&mut self, expected: bool) {
        if let Some(listener) = self.listener.as_mut() {
            listener.fullscreen_expected = expected;
        }
    }

    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.listener.is_some()
    }

    /// Records a signal if a listener is active.
    ///
    /// Returns the logged event, or `None` when the signal was ignored.
    pub fn observe(
        &mut self,
        signal: FocusSignal,
        phase: SessionPhase,
        at: DateTime<Utc>,
    ) -> Option<DistractionEvent> {
        let listener = self.listener?;
        let cause = match signal {
            FocusSignal::VisibilityLost => DistractionCause::TabSwitch,
            FocusSignal::FullscreenExited if listener.fullscreen_expected => {
                DistractionCause::FullscreenExit
            }
            FocusSignal::FullscreenExited => return None,
        };
        let event = DistractionEvent { cause, at, phase };
        self.log.push(event.clone());
        Some(event)
    }

    /// Every distraction recorded this session, oldest first.
    #[must_use]
    pub fn log(&self) -> &[DistractionEvent] {
        &self.log
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.log.len()
    }
}
