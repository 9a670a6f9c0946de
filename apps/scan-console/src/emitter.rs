//! Prints render commands to the terminal in place of a real UI shell.

use titan_scan::{ScanEventEmitter, ScanFeedback, SessionSnapshot};
use titan_scan_core::{ScanErrorKind, ZoomState};

/// Emitter that writes one line per render command to stdout.
pub struct ConsoleEmitter;

impl ConsoleEmitter {
    fn print(&self, line: String) {
        println!("{}", line);
    }
}

/// Text shown for a session state change.
pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let camera = snapshot
        .camera
        .as_ref()
        .map(|c| c.label.clone())
        .unwrap_or_else(|| "-".into());
    let tier = snapshot
        .resolution_tier
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "[state] {} (camera: {}, tier: {}, retries: {})",
        snapshot.state, camera, tier, snapshot.retry_count
    )
}

/// Text shown for a processed frame.
pub fn render_feedback(feedback: &ScanFeedback) -> Option<String> {
    match feedback {
        ScanFeedback::Added {
            barcode,
            match_kind,
            confidence,
        } => Some(format!(
            "[added] {} ({} match, confidence {:.2})",
            barcode, match_kind, confidence
        )),
        ScanFeedback::NotFound { code } => Some(format!("[not found] {}", code)),
        // Unreadable frames are never surfaced.
        ScanFeedback::ExtractionFailure { .. } => None,
    }
}

impl ScanEventEmitter for ConsoleEmitter {
    fn on_state_changed(&self, snapshot: &SessionSnapshot) {
        self.print(render_snapshot(snapshot));
    }

    fn on_scan_feedback(&self, feedback: &ScanFeedback) {
        if let Some(line) = render_feedback(feedback) {
            self.print(line);
        }
    }

    fn show_guide(&self) {
        self.print("[guide] Point the camera at a barcode".into());
    }

    fn show_error(&self, kind: ScanErrorKind) {
        self.print(format!("[error] {}", kind.user_message()));
    }

    fn show_retry(&self) {
        self.print("[retry] Type :retry to try again".into());
    }

    fn on_camera_switch_available(&self, available: bool) {
        if available {
            self.print("[camera] :switch cycles cameras".into());
        }
    }

    fn on_zoom_changed(&self, zoom: &ZoomState) {
        self.print(format!(
            "[zoom] {:.2}x pan ({:.1}, {:.1})",
            zoom.factor, zoom.pan.x, zoom.pan.y
        ));
    }
}
