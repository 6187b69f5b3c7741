//! Terminal implementations of the proctoring platform seams.
//!
//! The alternate screen stands in for fullscreen. Focus reporting (xterm
//! mode 1004) makes the terminal send `ESC [ O` when it loses focus; those
//! bytes arrive on stdin mixed into the typed line and are split out with
//! [`split_focus_reports`]. Stdin stays line-buffered, so a focus loss is
//! only seen once the next line is entered.

use std::io::{self, IsTerminal, Stdout, Write};

use fz_core::{CaptureDevice, CaptureStream, DisplayError, FocusSignal, PresenceError, Screen};

const ENTER_ALTERNATE_SCREEN: &str = "\x1b[?1049h\x1b[H";
const LEAVE_ALTERNATE_SCREEN: &str = "\x1b[?1049l";
const ENABLE_FOCUS_REPORTING: &str = "\x1b[?1004h";
const DISABLE_FOCUS_REPORTING: &str = "\x1b[?1004l";
const FOCUS_OUT: &str = "\x1b[O";
const FOCUS_IN: &str = "\x1b[I";

fn write_sequence(out: &mut impl Write, sequence: &str) -> io::Result<()> {
    out.write_all(sequence.as_bytes())?;
    out.flush()
}

/// Alternate-screen "fullscreen" on stdout.
#[derive(Debug)]
pub struct TerminalScreen {
    out: Stdout,
    interactive: bool,
}

impl TerminalScreen {
    pub fn new() -> Self {
        let out = io::stdout();
        let interactive = out.is_terminal();
        Self { out, interactive }
    }
}

impl Default for TerminalScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen for TerminalScreen {
    fn enter_fullscreen(&mut self) -> Result<(), DisplayError> {
        if !self.interactive {
            return Err(DisplayError::Unsupported);
        }
        write_sequence(&mut self.out, ENTER_ALTERNATE_SCREEN)
            .map_err(|err| DisplayError::Denied(err.to_string()))
    }

    fn exit_fullscreen(&mut self) {
        if let Err(err) = write_sequence(&mut self.out, LEAVE_ALTERNATE_SCREEN) {
            tracing::warn!(error = %err, "failed to leave alternate screen");
        }
    }
}

/// Capture device for hosts without a camera.
#[derive(Debug, Default)]
pub struct NoCamera;

impl CaptureDevice for NoCamera {
    fn open(&mut self) -> Result<CaptureStream, PresenceError> {
        Err(PresenceError::NoDevice)
    }

    fn close(&mut self, _stream: CaptureStream) {}
}

/// Keeps terminal focus reporting enabled while alive.
#[derive(Debug)]
pub struct FocusReporting {
    active: bool,
}

impl FocusReporting {
    /// Turns on focus reports when stdout is a terminal.
    pub fn enable() -> Self {
        let mut out = io::stdout();
        let active = out.is_terminal() && write_sequence(&mut out, ENABLE_FOCUS_REPORTING).is_ok();
        tracing::debug!(active, "focus reporting");
        Self { active }
    }
}

impl Drop for FocusReporting {
    fn drop(&mut self) {
        if self.active {
            let _ = write_sequence(&mut io::stdout(), DISABLE_FOCUS_REPORTING);
        }
    }
}

/// Separates focus reports from typed text in one line of input.
///
/// Focus-out reports become [`FocusSignal::VisibilityLost`]; focus-in
/// reports are dropped. Other escape bytes are left in the text.
pub fn split_focus_reports(line: &str) -> (Vec<FocusSignal>, String) {
    let mut signals = Vec::new();
    let mut text = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find('\x1b') {
        text.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(FOCUS_OUT) {
            signals.push(FocusSignal::VisibilityLost);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(FOCUS_IN) {
            rest = after;
        } else {
            text.push('\x1b');
            rest = &tail[1..];
        }
    }
    text.push_str(rest);
    (signals, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_pass_through() {
        let (signals, text) = split_focus_reports("/answer 2 paging");
        assert!(signals.is_empty());
        assert_eq!(text, "/answer 2 paging");
    }

    #[test]
    fn focus_out_reports_become_signals() {
        let (signals, text) = split_focus_reports("\x1b[O\x1b[Iwhat is\x1b[O\x1b[I a TLB?");
        assert_eq!(signals, [FocusSignal::VisibilityLost, FocusSignal::VisibilityLost]);
        assert_eq!(text, "what is a TLB?");
    }

    #[test]
    fn unrelated_escapes_are_kept() {
        let (signals, text) = split_focus_reports("\x1b[Aup");
        assert!(signals.is_empty());
        assert_eq!(text, "\x1b[Aup");
    }

    #[test]
    fn no_camera_reports_missing_device() {
        assert_eq!(NoCamera.open().unwrap_err(), PresenceError::NoDevice);
    }
}
