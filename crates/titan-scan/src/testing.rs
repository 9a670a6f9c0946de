//! Test doubles for the engine, permission probe, UI shell and cart.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use titan_scan_core::{
    CameraDescriptor, CameraId, CartSink, FacingMode, ResolutionTier, ScanConfig, ScanErrorKind,
    SessionState, VideoConstraints, ZoomState,
};

use crate::engine::{CameraPermission, DecodingEngine, FrameCallbacks};
use crate::error::EngineError;
use crate::events::{ScanEventEmitter, ScanFeedback, SessionSnapshot};

// =============================================================================
// Mock Engine
// =============================================================================

#[derive(Default)]
struct EngineState {
    init_delay: Duration,
    init_failure: Option<EngineError>,
    init_calls: u32,
    start_delay: Duration,
    start_results: VecDeque<Result<(), EngineError>>,
    start_calls: Vec<(CameraId, ResolutionTier)>,
    stop_calls: u32,
    cameras: Vec<CameraDescriptor>,
    callbacks: Option<FrameCallbacks>,
    streaming: bool,
    paused: bool,
    constraints: Vec<VideoConstraints>,
}

/// Scripted engine. Start results are consumed in order; an empty script
/// means every start succeeds.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<EngineState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with `count` enumerable cameras: `cam-0`, `cam-1`, ...
    pub fn with_cameras(count: usize) -> Self {
        let engine = Self::new();
        engine.state.lock().unwrap().cameras = (0..count)
            .map(|i| CameraDescriptor::device(format!("cam-{}", i), format!("Camera {}", i)))
            .collect();
        engine
    }

    pub fn set_init_delay(&self, delay: Duration) {
        self.state.lock().unwrap().init_delay = delay;
    }

    pub fn fail_init(&self, err: EngineError) {
        self.state.lock().unwrap().init_failure = Some(err);
    }

    pub fn clear_init_failure(&self) {
        self.state.lock().unwrap().init_failure = None;
    }

    pub fn set_start_delay(&self, delay: Duration) {
        self.state.lock().unwrap().start_delay = delay;
    }

    pub fn push_start_result(&self, result: Result<(), EngineError>) {
        self.state.lock().unwrap().start_results.push_back(result);
    }

    /// Simulates a decoded frame on the live stream.
    pub fn decode(&self, text: &str) {
        let state = self.state.lock().unwrap();
        if let Some(callbacks) = state.callbacks.as_ref().filter(|_| state.streaming) {
            callbacks.on_decoded(text);
        }
    }

    /// Simulates a per-frame error on the live stream.
    pub fn frame_error(&self, message: &str) {
        let state = self.state.lock().unwrap();
        if let Some(callbacks) = state.callbacks.as_ref().filter(|_| state.streaming) {
            callbacks.on_frame_error(message);
        }
    }

    pub fn init_calls(&self) -> u32 {
        self.state.lock().unwrap().init_calls
    }

    pub fn start_calls(&self) -> Vec<(CameraId, ResolutionTier)> {
        self.state.lock().unwrap().start_calls.clone()
    }

    pub fn stop_calls(&self) -> u32 {
        self.state.lock().unwrap().stop_calls
    }

    pub fn is_streaming(&self) -> bool {
        self.state.lock().unwrap().streaming
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    pub fn applied_constraints(&self) -> Vec<VideoConstraints> {
        self.state.lock().unwrap().constraints.clone()
    }
}

#[async_trait]
impl DecodingEngine for MockEngine {
    async fn initialize(&self) -> Result<(), EngineError> {
        let (delay, failure) = {
            let mut state = self.state.lock().unwrap();
            state.init_calls += 1;
            (state.init_delay, state.init_failure.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        failure.map_or(Ok(()), Err)
    }

    async fn start(
        &self,
        camera: &CameraId,
        config: &ScanConfig,
        callbacks: FrameCallbacks,
    ) -> Result<(), EngineError> {
        let delay = self.state.lock().unwrap().start_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.start_calls.push((camera.clone(), config.tier));
        let result = state.start_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            state.streaming = true;
            state.paused = false;
            state.callbacks = Some(callbacks);
        }
        result
    }

    async fn stop(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state.stop_calls += 1;
        state.callbacks = None;
        if std::mem::replace(&mut state.streaming, false) {
            Ok(())
        } else {
            Err(EngineError::NotRunning)
        }
    }

    async fn pause(&self, _should_pause_video: bool) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        if !state.streaming {
            return Err(EngineError::NotRunning);
        }
        state.paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        if !state.streaming {
            return Err(EngineError::NotRunning);
        }
        state.paused = false;
        Ok(())
    }

    async fn apply_video_constraints(&self, constraints: &VideoConstraints) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        if !state.streaming {
            return Err(EngineError::NotRunning);
        }
        state.constraints.push(constraints.clone());
        Ok(())
    }

    async fn get_cameras(&self) -> Result<Vec<CameraDescriptor>, EngineError> {
        Ok(self.state.lock().unwrap().cameras.clone())
    }
}

// =============================================================================
// Mock Permission
// =============================================================================

pub struct MockPermission {
    granted: AtomicBool,
    probes: AtomicU32,
}

impl MockPermission {
    pub fn granted() -> Self {
        MockPermission {
            granted: AtomicBool::new(true),
            probes: AtomicU32::new(0),
        }
    }

    pub fn denied() -> Self {
        MockPermission {
            granted: AtomicBool::new(false),
            probes: AtomicU32::new(0),
        }
    }

    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraPermission for MockPermission {
    async fn probe(&self, _facing: FacingMode) -> Result<(), EngineError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.granted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::PermissionDenied("NotAllowedError: Permission denied".into()))
        }
    }
}

// =============================================================================
// Recording Emitter
// =============================================================================

/// A render command as received by the UI shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    State(SessionState),
    Feedback(ScanFeedback),
    Guide,
    Error(ScanErrorKind),
    Retry,
    SwitchAvailable(bool),
    Zoom(ZoomState),
}

#[derive(Default)]
pub struct RecordingEmitter {
    commands: Mutex<Vec<Command>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ScanErrorKind> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Error(kind) => Some(kind),
                _ => None,
            })
            .collect()
    }

    pub fn feedback(&self) -> Vec<ScanFeedback> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Feedback(feedback) => Some(feedback),
                _ => None,
            })
            .collect()
    }

    pub fn saw(&self, command: &Command) -> bool {
        self.commands.lock().unwrap().contains(command)
    }

    fn push(&self, command: Command) {
        self.commands.lock().unwrap().push(command);
    }
}

impl ScanEventEmitter for RecordingEmitter {
    fn on_state_changed(&self, snapshot: &SessionSnapshot) {
        self.push(Command::State(snapshot.state));
    }

    fn on_scan_feedback(&self, feedback: &ScanFeedback) {
        self.push(Command::Feedback(feedback.clone()));
    }

    fn show_guide(&self) {
        self.push(Command::Guide);
    }

    fn show_error(&self, kind: ScanErrorKind) {
        self.push(Command::Error(kind));
    }

    fn show_retry(&self) {
        self.push(Command::Retry);
    }

    fn on_camera_switch_available(&self, available: bool) {
        self.push(Command::SwitchAvailable(available));
    }

    fn on_zoom_changed(&self, zoom: &ZoomState) {
        self.push(Command::Zoom(*zoom));
    }
}

// =============================================================================
// Recording Cart
// =============================================================================

pub struct RecordingCart<P> {
    lines: Mutex<Vec<(P, u32)>>,
}

impl<P> Default for RecordingCart<P> {
    fn default() -> Self {
        RecordingCart {
            lines: Mutex::new(Vec::new()),
        }
    }
}

impl<P: Clone> RecordingCart<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(P, u32)> {
        self.lines.lock().unwrap().clone()
    }
}

impl<P: Clone + Send + Sync> CartSink<P> for RecordingCart<P> {
    fn add_item(&self, product: &P, quantity: u32) {
        self.lines.lock().unwrap().push((product.clone(), quantity));
    }
}
