//! # Render Commands
//!
//! What the pipeline tells the UI shell. The shell owns every pixel; the
//! controller only says what should be on screen.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  on_state_changed(snapshot)   every session state transition            │
//! │  on_scan_feedback(feedback)   added / not found / unreadable            │
//! │  show_guide()                 scanning started: draw the aim box        │
//! │  show_error(kind)             a taxonomy error the user must see        │
//! │  show_retry()                 offer the manual retry action             │
//! │  on_camera_switch_available   hide the flip button on 1-camera devices  │
//! │  on_zoom_changed(zoom)        repaint the preview transform             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use titan_scan_core::{
    CameraDescriptor, MatchKind, ResolutionTier, ScanErrorKind, ScanSession, SessionState,
    ZoomState,
};

// =============================================================================
// Scan Feedback
// =============================================================================

/// Outcome of one decoded frame that made it past the cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanFeedback {
    /// Product resolved and handed to the cart.
    Added {
        /// Catalog barcode that matched.
        barcode: String,
        match_kind: MatchKind,
        confidence: f64,
    },
    /// Nothing in the catalog matched. Shown as a transient toast.
    NotFound { code: String },
    /// No usable digits in the decoded text. Never shown to the user.
    ExtractionFailure { raw: String },
}

impl ScanFeedback {
    /// Error kind for the miss variants.
    pub fn error_kind(&self) -> Option<ScanErrorKind> {
        match self {
            ScanFeedback::Added { .. } => None,
            ScanFeedback::NotFound { .. } => Some(ScanErrorKind::ProductNotFound),
            ScanFeedback::ExtractionFailure { .. } => Some(ScanErrorKind::ExtractionFailure),
        }
    }
}

// =============================================================================
// Session Snapshot
// =============================================================================

/// Serializable view of the session for the UI shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub camera: Option<CameraDescriptor>,
    pub resolution_tier: Option<ResolutionTier>,
    #[ts(as = "Option<String>")]
    pub started_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub zoom: ZoomState,
}

impl SessionSnapshot {
    pub fn capture(session: &ScanSession, zoom: ZoomState) -> Self {
        SessionSnapshot {
            session_id: session.id.clone(),
            state: session.state,
            camera: session.camera.clone(),
            resolution_tier: session.resolution_tier,
            started_at: session.started_at,
            retry_count: session.retry_count,
            zoom,
        }
    }
}

// =============================================================================
// Emitter Trait
// =============================================================================

/// Trait for emitting render commands (implemented by the UI integration).
pub trait ScanEventEmitter: Send + Sync {
    /// The session moved to a new state.
    fn on_state_changed(&self, snapshot: &SessionSnapshot);

    /// A decoded frame was processed.
    fn on_scan_feedback(&self, feedback: &ScanFeedback);

    /// Scanning is live; draw the targeting guide.
    fn show_guide(&self);

    /// Present an error to the user.
    fn show_error(&self, kind: ScanErrorKind);

    /// Offer the manual retry action.
    fn show_retry(&self);

    /// Whether the camera switch control should be offered.
    fn on_camera_switch_available(&self, available: bool);

    /// Digital zoom or pan changed.
    fn on_zoom_changed(&self, zoom: &ZoomState);
}

/// No-op event emitter for headless use.
pub struct NoOpEmitter;

impl ScanEventEmitter for NoOpEmitter {
    fn on_state_changed(&self, _snapshot: &SessionSnapshot) {}
    fn on_scan_feedback(&self, _feedback: &ScanFeedback) {}
    fn show_guide(&self) {}
    fn show_error(&self, _kind: ScanErrorKind) {}
    fn show_retry(&self) {}
    fn on_camera_switch_available(&self, _available: bool) {}
    fn on_zoom_changed(&self, _zoom: &ZoomState) {}
}
