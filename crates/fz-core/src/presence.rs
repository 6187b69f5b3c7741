//! Passive presence capture ("I am here" camera indicator).
//!
//! Capture is best-effort. A denied permission or missing device degrades the
//! indicator to unavailable; it never fails the session.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresenceError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no capture device available")]
    NoDevice,
    #[error("capture device error: {0}")]
    Device(String),
}

/// An open capture stream, as handed out by a [`CaptureDevice`].
#[derive(Debug, PartialEq, Eq)]
pub struct CaptureStream {
    label: String,
}

impl CaptureStream {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Platform media-capture primitive.
pub trait CaptureDevice: Send {
    /// Opens a video stream.
    fn open(&mut self) -> Result<CaptureStream, PresenceError>;

    /// Stops every track of a previously opened stream.
    fn close(&mut self, stream: CaptureStream);
}

/// What the presence indicator should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PresenceStatus {
    /// No capture attempted (outside an active phase).
    Inactive,
    Live { label: String },
    Unavailable { reason: String },
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => f.write_str("inactive"),
            Self::Live { label } => write!(f, "live ({label})"),
            Self::Unavailable { .. } => f.write_str("unavailable"),
        }
    }
}

/// Owns the capture device and at most one open stream.
pub struct PresenceCapture {
    device: Box<dyn CaptureDevice>,
    handle: Option<CaptureStream>,
    status: PresenceStatus,
}

impl fmt::Debug for PresenceCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenceCapture")
            .field("handle", &self.handle)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl PresenceCapture {
    #[must_use]
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            handle: None,
            status: PresenceStatus::Inactive,
        }
    }

    /// Opens the camera for the current active phase.
    ///
    /// A second acquire while a stream is held does not touch the device.
    pub fn acquire(&mut self) -> &PresenceStatus {
        if self.handle.is_some() {
            tracing::warn!("presence capture already held; ignoring second acquire");
            return &self.status;
        }
        self.status = match self.device.open() {
            Ok(stream) => {
                let label = stream.label().to_string();
                tracing::debug!(device = %label, "presence capture acquired");
                self.handle = Some(stream);
                PresenceStatus::Live { label }
            }
            Err(err) => {
                tracing::warn!(error = %err, "camera unavailable; continuing without presence signal");
                PresenceStatus::Unavailable {
                    reason: err.to_string(),
                }
            }
        };
        &self.status
    }

    /// Closes the stream if one is held. Safe to call any number of times.
    pub fn release(&mut self) {
        if let Some(stream) = self.handle.take() {
            tracing::debug!(device = %stream.label(), "presence capture released");
            self.device.close(stream);
        }
        self.status = PresenceStatus::Inactive;
    }

    #[must_use]
    pub const fn status(&self) -> &PresenceStatus {
        &self.status
    }

    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.handle.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Camera double that counts opens and closes.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeCamera {
        pub(crate) opens: Arc<AtomicUsize>,
        pub(crate) closes: Arc<AtomicUsize>,
        pub(crate) deny: bool,
    }

    impl FakeCamera {
        pub(crate) fn denied() -> Self {
            Self {
                deny: true,
                ..Self::default()
            }
        }

        pub(crate) fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        pub(crate) fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl CaptureDevice for FakeCamera {
        fn open(&mut self) -> Result<CaptureStream, PresenceError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.deny {
                Err(PresenceError::PermissionDenied)
            } else {
                Ok(CaptureStream::new("fake-cam"))
            }
        }

        fn close(&mut self, _stream: CaptureStream) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn acquire_then_release_closes_stream_once() {
        let camera = FakeCamera::default();
        let mut capture = PresenceCapture::new(Box::new(camera.clone()));

        let status = capture.acquire().clone();
        assert_eq!(
            status,
            PresenceStatus::Live {
                label: "fake-cam".to_string()
            }
        );
        capture.release();
        capture.release();

        assert_eq!(camera.opens(), 1);
        assert_eq!(camera.closes(), 1);
        assert_eq!(capture.status(), &PresenceStatus::Inactive);
    }

    #[test]
    fn second_acquire_does_not_reopen() {
        let camera = FakeCamera::default();
        let mut capture = PresenceCapture::new(Box::new(camera.clone()));
        capture.acquire();
        capture.acquire();
        assert_eq!(camera.opens(), 1);
        assert!(capture.is_held());
    }

    #[test]
    fn denied_camera_degrades_and_release_is_noop() {
        let camera = FakeCamera::denied();
        let mut capture = PresenceCapture::new(Box::new(camera.clone()));

        assert_eq!(
            capture.acquire(),
            &PresenceStatus::Unavailable {
                reason: "camera permission denied".to_string()
            }
        );
        assert_eq!(capture.status().to_string(), "unavailable");
        capture.release();
        assert_eq!(camera.closes(), 0);
    }
}
