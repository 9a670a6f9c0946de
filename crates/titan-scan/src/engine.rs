//! # Decoding Engine Contract
//!
//! The external video-decoding engine and the platform's camera permission
//! API, as seen by the pipeline.
//!
//! ## Callback Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Engine (per frame)          FrameCallbacks            Frame pump      │
//! │   ──────────────────          ──────────────            ──────────      │
//! │   decoded "890..."   ──►  on_decoded(text)   ──┐                        │
//! │   no code in frame   ──►  on_frame_error(msg) ─┼──► mpsc ──► adapter    │
//! │   stream revoked     ──►  on_frame_error(msg) ─┘    (tagged with        │
//! │                                                      session id)        │
//! │                                                                         │
//! │   Callbacks never block the engine: sends are unbounded and a closed   │
//! │   channel (controller gone) is ignored.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;

use titan_scan_core::{CameraDescriptor, CameraId, FacingMode, ScanConfig, VideoConstraints};

use crate::error::EngineError;

// =============================================================================
// Frame Signals
// =============================================================================

/// A callback from the engine, tagged with the session that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSignal {
    Decoded { session_id: String, text: String },
    FrameError { session_id: String, message: String },
}

impl FrameSignal {
    pub fn session_id(&self) -> &str {
        match self {
            FrameSignal::Decoded { session_id, .. } => session_id,
            FrameSignal::FrameError { session_id, .. } => session_id,
        }
    }
}

/// The `onDecoded` / `onFrameError` pair handed to [`DecodingEngine::start`].
#[derive(Debug, Clone)]
pub struct FrameCallbacks {
    session_id: String,
    tx: mpsc::UnboundedSender<FrameSignal>,
}

impl FrameCallbacks {
    pub(crate) fn new(session_id: String, tx: mpsc::UnboundedSender<FrameSignal>) -> Self {
        FrameCallbacks { session_id, tx }
    }

    /// Session these callbacks report for.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// A barcode was decoded from a frame.
    pub fn on_decoded(&self, text: impl Into<String>) {
        let _ = self.tx.send(FrameSignal::Decoded {
            session_id: self.session_id.clone(),
            text: text.into(),
        });
    }

    /// A frame produced no result, or the stream reported a problem.
    pub fn on_frame_error(&self, message: impl Into<String>) {
        let _ = self.tx.send(FrameSignal::FrameError {
            session_id: self.session_id.clone(),
            message: message.into(),
        });
    }
}

// =============================================================================
// Engine Trait
// =============================================================================

/// The external decoding engine.
///
/// Implementations wrap whatever actually reads frames (a WebView bridge,
/// a native scanner SDK, a test double). All methods are called from the
/// session controller only; none are called concurrently with `start`.
#[async_trait]
pub trait DecodingEngine: Send + Sync {
    /// Loads/initializes the engine. May be slow (script download).
    async fn initialize(&self) -> Result<(), EngineError>;

    /// Opens the camera and begins decoding.
    ///
    /// Resolves once the stream is live. The engine reports frames through
    /// `callbacks` until [`DecodingEngine::stop`] is called.
    async fn start(
        &self,
        camera: &CameraId,
        config: &ScanConfig,
        callbacks: FrameCallbacks,
    ) -> Result<(), EngineError>;

    /// Stops decoding and releases the media stream.
    async fn stop(&self) -> Result<(), EngineError>;

    /// Pauses decoding; with `should_pause_video` the preview freezes too.
    async fn pause(&self, should_pause_video: bool) -> Result<(), EngineError>;

    /// Resumes decoding after [`DecodingEngine::pause`].
    async fn resume(&self) -> Result<(), EngineError>;

    /// Applies live track constraints (torch, zoom, focus).
    async fn apply_video_constraints(&self, constraints: &VideoConstraints) -> Result<(), EngineError>;

    /// Enumerates cameras in device-list order.
    async fn get_cameras(&self) -> Result<Vec<CameraDescriptor>, EngineError>;
}

// =============================================================================
// Permission Probe
// =============================================================================

/// The platform's camera permission API.
#[async_trait]
pub trait CameraPermission: Send + Sync {
    /// Requests a stream for `facing` and releases it immediately.
    ///
    /// Succeeds only if the user granted access.
    async fn probe(&self, facing: FacingMode) -> Result<(), EngineError>;
}

/// Permission probe for hosts without a separate permission API.
///
/// Reports nothing granted so the first real start asks for access.
pub struct NoPermissionProbe;

#[async_trait]
impl CameraPermission for NoPermissionProbe {
    async fn probe(&self, _facing: FacingMode) -> Result<(), EngineError> {
        Err(EngineError::Failed("permission probe unsupported".into()))
    }
}
