//! # Stdin Decoding Engine
//!
//! A stand-in for the camera: every line typed at the console is treated as
//! the text decoded from one frame of whichever virtual camera is open.
//! Lines arriving while no stream is live, or while decoding is paused,
//! are dropped the way a real engine drops frames nobody asked for.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};

use titan_scan::{CameraPermission, DecodingEngine, EngineError, FrameCallbacks};
use titan_scan_core::{
    CameraDescriptor, CameraId, FacingMode, ScanConfig, VideoConstraints,
};

#[derive(Default)]
struct StreamState {
    callbacks: Option<FrameCallbacks>,
    camera: Option<CameraId>,
    paused: bool,
}

/// Engine fed from console input.
pub struct StdinEngine {
    cameras: Vec<CameraDescriptor>,
    stream: Mutex<StreamState>,
}

impl StdinEngine {
    /// Engine exposing a rear and a front virtual camera.
    pub fn new() -> Self {
        Self::with_cameras(vec![
            CameraDescriptor::device("console-rear", "Console rear camera"),
            CameraDescriptor::device("console-front", "Console front camera"),
        ])
    }

    pub fn with_cameras(cameras: Vec<CameraDescriptor>) -> Self {
        StdinEngine {
            cameras,
            stream: Mutex::new(StreamState::default()),
        }
    }

    /// Camera the stream is open on, if any.
    pub fn active_camera(&self) -> Option<CameraId> {
        self.stream.lock().ok().and_then(|s| s.camera.clone())
    }

    /// Hands a typed line to the pipeline as a decoded frame.
    ///
    /// Returns false when the frame was dropped.
    pub fn feed_decoded(&self, text: &str) -> bool {
        self.with_live_callbacks(|callbacks| callbacks.on_decoded(text))
    }

    /// Reports a frame error (e.g. a simulated permission revocation).
    pub fn feed_frame_error(&self, message: &str) -> bool {
        self.with_live_callbacks(|callbacks| callbacks.on_frame_error(message))
    }

    fn with_live_callbacks(&self, f: impl FnOnce(&FrameCallbacks)) -> bool {
        let Ok(stream) = self.stream.lock() else {
            return false;
        };
        match (&stream.callbacks, stream.paused) {
            (Some(callbacks), false) => {
                f(callbacks);
                true
            }
            _ => {
                debug!(paused = stream.paused, "Frame dropped, no live stream");
                false
            }
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StreamState>, EngineError> {
        self.stream
            .lock()
            .map_err(|_| EngineError::Failed("engine state poisoned".into()))
    }
}

impl Default for StdinEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecodingEngine for StdinEngine {
    async fn initialize(&self) -> Result<(), EngineError> {
        debug!("Console engine ready");
        Ok(())
    }

    async fn start(
        &self,
        camera: &CameraId,
        config: &ScanConfig,
        callbacks: FrameCallbacks,
    ) -> Result<(), EngineError> {
        if let Some(id) = camera.device_id() {
            if !self.cameras.iter().any(|c| c.id.device_id() == Some(id)) {
                return Err(EngineError::NotFound(format!("no camera named {}", id)));
            }
        }

        let mut stream = self.lock()?;
        info!(
            camera = %camera,
            tier = %config.tier,
            session_id = %callbacks.session_id(),
            "Console stream opened"
        );
        stream.callbacks = Some(callbacks);
        stream.camera = Some(camera.clone());
        stream.paused = false;
        Ok(())
    }

    async fn stop(&self) -> Result<(), EngineError> {
        let mut stream = self.lock()?;
        if stream.callbacks.take().is_none() {
            return Err(EngineError::NotRunning);
        }
        stream.camera = None;
        stream.paused = false;
        info!("Console stream closed");
        Ok(())
    }

    async fn pause(&self, _should_pause_video: bool) -> Result<(), EngineError> {
        let mut stream = self.lock()?;
        if stream.callbacks.is_none() {
            return Err(EngineError::NotRunning);
        }
        stream.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), EngineError> {
        let mut stream = self.lock()?;
        if stream.callbacks.is_none() {
            return Err(EngineError::NotRunning);
        }
        stream.paused = false;
        Ok(())
    }

    async fn apply_video_constraints(&self, constraints: &VideoConstraints) -> Result<(), EngineError> {
        debug!(?constraints, "Console engine ignores video constraints");
        Ok(())
    }

    async fn get_cameras(&self) -> Result<Vec<CameraDescriptor>, EngineError> {
        Ok(self.cameras.clone())
    }
}

/// The console always has camera access.
pub struct ConsolePermission;

#[async_trait]
impl CameraPermission for ConsolePermission {
    async fn probe(&self, _facing: FacingMode) -> Result<(), EngineError> {
        Ok(())
    }
}
