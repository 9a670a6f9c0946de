//! # Session Controller
//!
//! Owns the one live scan session: drives the camera through the decoding
//! engine, feeds frame signals through the adapter and tells the UI shell
//! what to draw.
//!
//! ## Start Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  start()                                                                │
//! │    │  Start event (ignored if a session is already live)                │
//! │    ▼                                                                    │
//! │  Initializing ── acquisition lock held from here ──────────────┐        │
//! │    │                                                           │        │
//! │    ├── ensure_engine_ready (bounded) ── timeout ──► Error(LibraryLoad.) │
//! │    │                                                           │        │
//! │    ├── HD   ── rejected ──┐                                    │        │
//! │    ├── VGA  ◄─────────────┘── rejected ──┐                     │        │
//! │    ├── QVGA ◄────────────────────────────┘── rejected ──► Error(Config.)│
//! │    │                                                           │        │
//! │    ├── permission refused at any rung ─────────► Error(PermissionDen.)  │
//! │    ▼                                                           │        │
//! │  Scanning  show_guide, camera switch availability              │        │
//! │                                                                ▼        │
//! │  stop(): cancel token ─► wait for the lock ─► release stream ─► Stopped │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## After a Successful Scan
//! ```text
//!   Matched ──► cart.add_item(product, 1) ──► Paused ──(resume_delay)──► Scanning
//! ```
//! The pause keeps the stream open; it only gives the cashier time to move
//! the item away before the next read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use titan_scan_core::session::transition;
use titan_scan_core::{
    CameraDescriptor, CartSink, ProductCatalog, ResolutionTier, Resolver, ScanCooldown, ScanError,
    ScanErrorKind, ScanSession, SessionEvent, SessionState, TierLadder, VideoConstraints,
    ViewportController, ZoomState,
};

use crate::adapter::{FrameDecodeAdapter, FrameOutcome};
use crate::bootstrap::Bootstrap;
use crate::cancel::CancelToken;
use crate::config::ScannerConfig;
use crate::engine::{DecodingEngine, FrameCallbacks, FrameSignal};
use crate::error::{EngineError, PipelineError, PipelineResult};
use crate::events::{ScanEventEmitter, ScanFeedback, SessionSnapshot};

/// How one camera acquisition ended.
enum Acquisition {
    Acquired(ResolutionTier),
    Cancelled,
}

// =============================================================================
// Session Controller
// =============================================================================

/// Drives a single scan session.
pub struct SessionController<C: ProductCatalog> {
    config: ScannerConfig,
    bootstrap: Arc<Bootstrap>,
    engine: Arc<dyn DecodingEngine>,
    cart: Arc<dyn CartSink<C::Product>>,
    emitter: Arc<dyn ScanEventEmitter>,

    session: RwLock<ScanSession>,
    adapter: Mutex<FrameDecodeAdapter<C>>,
    viewport: Mutex<ViewportController>,

    /// Held for the whole of an acquisition; `stop()` waits on it.
    acquisition: Mutex<()>,
    cancel: RwLock<CancelToken>,
    /// Tasks releasing cameras that opened after their start was cancelled.
    teardown: Mutex<Vec<JoinHandle<()>>>,
    resume_task: Mutex<Option<JoinHandle<()>>>,
    /// Set when a pause belongs to the current drag and `end_pan` owes a resume.
    resume_on_pan_end: AtomicBool,

    frame_tx: mpsc::UnboundedSender<FrameSignal>,
    frame_rx: Mutex<mpsc::UnboundedReceiver<FrameSignal>>,
}

impl<C> SessionController<C>
where
    C: ProductCatalog + 'static,
    C::Product: 'static,
{
    /// Creates a controller in the `Idle` state.
    pub fn new(
        config: ScannerConfig,
        bootstrap: Arc<Bootstrap>,
        catalog: C,
        cart: Arc<dyn CartSink<C::Product>>,
        emitter: Arc<dyn ScanEventEmitter>,
    ) -> Self {
        let resolver = Resolver::with_settings(catalog, config.resolver.to_settings());
        let adapter = FrameDecodeAdapter::new(resolver, ScanCooldown::new(config.decode.cooldown_ms));
        let viewport = ViewportController::new(config.viewport.max_zoom, config.viewport.zoom_step);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        SessionController {
            engine: bootstrap.engine(),
            config,
            bootstrap,
            cart,
            emitter,
            session: RwLock::new(ScanSession::new()),
            adapter: Mutex::new(adapter),
            viewport: Mutex::new(viewport),
            acquisition: Mutex::new(()),
            cancel: RwLock::new(CancelToken::new()),
            teardown: Mutex::new(Vec::new()),
            resume_task: Mutex::new(None),
            resume_on_pan_end: AtomicBool::new(false),
            frame_tx,
            frame_rx: Mutex::new(frame_rx),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub async fn state(&self) -> SessionState {
        self.session.read().await.state
    }

    /// Serializable view of the session for the UI shell.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.read().await;
        let zoom = self.viewport.lock().await.state();
        SessionSnapshot::capture(&session, zoom)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts scanning.
    ///
    /// A start while a session is already live is a no-op that returns the
    /// current state. Taxonomy failures leave the session in `Error` and
    /// are also returned.
    pub async fn start(&self) -> PipelineResult<SessionState> {
        let (token, camera) = {
            let mut session = self.session.write().await;
            let result = session.apply(SessionEvent::Start)?;
            if result.is_ignored() {
                debug!(state = %session.state, "Start ignored, session already live");
                return Ok(session.state);
            }
            // Token is installed before anything else can yield, so a
            // concurrent stop() always cancels this attempt
            let token = self.renew_token().await;
            info!(session_id = %session.id, "Scan session starting");
            self.emit_state(&session).await;

            let camera = session
                .camera
                .clone()
                .unwrap_or_else(|| CameraDescriptor::facing(self.config.camera.facing));
            (token, camera)
        };

        let _guard = self.acquisition.lock().await;
        self.acquire_and_settle(camera, token).await
    }

    /// The UI's retry action after an error.
    pub async fn retry(&self) -> PipelineResult<SessionState> {
        {
            let mut session = self.session.write().await;
            if !matches!(session.state, SessionState::Error(_)) {
                return Err(ScanError::InvalidTransition {
                    from: session.state,
                    event: SessionEvent::Start,
                }
                .into());
            }
            session.retry_count += 1;
            info!(retry_count = session.retry_count, "Retrying scan session");
        }
        self.start().await
    }

    /// Stops scanning and releases the camera.
    ///
    /// Cancels any in-flight acquisition and waits for it to settle. A
    /// camera that opens after cancellation is released in the background.
    /// From `Idle` this is a no-op.
    pub async fn stop(&self) -> PipelineResult<SessionState> {
        self.cancel.read().await.cancel();
        self.cancel_resume().await;

        let _guard = self.acquisition.lock().await;

        let mut session = self.session.write().await;
        if session.state == SessionState::Idle {
            return Ok(SessionState::Idle);
        }
        // A start that slipped in after the first cancel holds a newer token
        self.cancel.read().await.cancel();
        let was_live = session.state.is_live();
        session.apply(SessionEvent::Stop)?;
        info!(session_id = %session.id, "Scan session stopped");

        if was_live {
            self.release_stream().await;
        }
        self.adapter.lock().await.reset_cooldown();
        let zoom = self.viewport.lock().await.reset();
        self.resume_on_pan_end.store(false, Ordering::SeqCst);
        self.emitter.on_zoom_changed(&zoom);
        self.emit_state(&session).await;

        Ok(session.state)
    }

    /// Pauses decoding; the stream stays open.
    pub async fn pause(&self) -> PipelineResult<SessionState> {
        let mut session = self.session.write().await;
        if transition(session.state, SessionEvent::Pause)?.is_ignored() {
            return Ok(session.state);
        }
        self.engine.pause(self.config.decode.pause_video).await?;
        session.apply(SessionEvent::Pause)?;
        debug!("Decoding paused");
        self.emit_state(&session).await;
        Ok(session.state)
    }

    /// Resumes decoding after a pause.
    pub async fn resume(&self) -> PipelineResult<SessionState> {
        let mut session = self.session.write().await;
        if transition(session.state, SessionEvent::Resume)?.is_ignored() {
            return Ok(session.state);
        }
        self.engine.resume().await?;
        session.apply(SessionEvent::Resume)?;
        debug!("Decoding resumed");
        self.emit_state(&session).await;
        Ok(session.state)
    }

    /// Moves to the next enumerated camera.
    ///
    /// Rejected with `DeviceUnavailable` (state unchanged) when the device
    /// has fewer than two cameras.
    pub async fn switch_camera(&self) -> PipelineResult<SessionState> {
        let state = self.state().await;
        transition(state, SessionEvent::SwitchRequested)?;

        let cameras = self
            .engine
            .get_cameras()
            .await
            .map_err(EngineError::into_scan)?;
        if cameras.len() < 2 {
            warn!(cameras = cameras.len(), "Camera switch rejected");
            self.emitter.on_camera_switch_available(false);
            self.emitter.show_error(ScanErrorKind::DeviceUnavailable);
            return Err(ScanError::DeviceUnavailable(format!(
                "{} camera(s) available, need at least 2",
                cameras.len()
            ))
            .into());
        }

        let _guard = self.acquisition.lock().await;
        self.cancel_resume().await;

        let (token, target) = {
            let mut session = self.session.write().await;
            session.apply(SessionEvent::SwitchRequested)?;
            self.emit_state(&session).await;

            self.release_stream().await;

            let current = session
                .camera
                .as_ref()
                .and_then(|cam| cameras.iter().position(|c| c.id == cam.id))
                .unwrap_or(0);
            let target = cameras[(current + 1) % cameras.len()].clone();
            info!(from = current, camera = %target.id, "Switching camera");

            session.apply(SessionEvent::SwitchTargetChosen)?;
            session.camera = Some(target.clone());
            self.emit_state(&session).await;
            (self.renew_token().await, target)
        };

        let zoom = self.viewport.lock().await.reset();
        self.emitter.on_zoom_changed(&zoom);

        self.acquire_and_settle(target, token).await
    }

    /// Forwards torch/zoom/focus constraints while the stream is open.
    pub async fn apply_video_constraints(&self, constraints: &VideoConstraints) -> PipelineResult<()> {
        let state = self.state().await;
        if !matches!(state, SessionState::Scanning | SessionState::Paused) {
            return Err(EngineError::NotRunning.into());
        }
        self.engine.apply_video_constraints(constraints).await?;
        Ok(())
    }

    // =========================================================================
    // Acquisition
    // =========================================================================

    /// Runs the acquisition and records the outcome. Caller holds the
    /// acquisition lock.
    async fn acquire_and_settle(
        &self,
        camera: CameraDescriptor,
        token: CancelToken,
    ) -> PipelineResult<SessionState> {
        let session_id = self.session.read().await.id.clone();
        let outcome = self.acquire(&camera, &session_id, &token).await;

        let mut session = self.session.write().await;
        let superseded = token.is_cancelled()
            || session.id != session_id
            || session.state != SessionState::Initializing;
        if superseded {
            if let Ok(Acquisition::Acquired(_)) = outcome {
                // Stream came up for a session that has moved on
                self.release_stream().await;
            }
            debug!(state = %session.state, "Acquisition superseded");
            // Only stop() cancels, and it finishes the move to Stopped
            return Ok(if token.is_cancelled() {
                SessionState::Stopped
            } else {
                session.state
            });
        }

        match outcome {
            Ok(Acquisition::Acquired(tier)) => {
                if let Err(e) = session.apply(SessionEvent::CameraAcquired) {
                    self.release_stream().await;
                    return Err(e.into());
                }
                session.camera = Some(camera);
                session.resolution_tier = Some(tier);
                info!(session_id = %session.id, tier = %tier, "Scanning");
                self.emit_state(&session).await;
                drop(session);

                self.bootstrap.record_permission(true).await;
                self.emitter.show_guide();
                self.announce_switch_availability().await;
                Ok(SessionState::Scanning)
            }
            Ok(Acquisition::Cancelled) => Ok(SessionState::Stopped),
            Err(err) => {
                let kind = err.kind().unwrap_or(ScanErrorKind::DeviceUnavailable);
                session.apply(SessionEvent::Fail(kind))?;
                warn!(session_id = %session.id, error = %err, "Scan session failed to start");
                self.emit_state(&session).await;
                drop(session);

                if kind == ScanErrorKind::PermissionDenied {
                    self.bootstrap.record_permission(false).await;
                }
                self.emitter.show_error(kind);
                if kind.offers_retry() {
                    self.emitter.show_retry();
                }
                Err(PipelineError::from(err))
            }
        }
    }

    /// Waits for the engine, then walks the tier ladder.
    ///
    /// Every await here is raced against `token`, so a cancelled
    /// acquisition returns as soon as `stop()` asks.
    async fn acquire(
        &self,
        camera: &CameraDescriptor,
        session_id: &str,
        token: &CancelToken,
    ) -> Result<Acquisition, ScanError> {
        tokio::select! {
            ready = self.bootstrap.ensure_engine_ready(self.config.library_load_timeout()) => ready?,
            _ = token.cancelled() => return Ok(Acquisition::Cancelled),
        }

        if !self.await_teardown(token).await {
            return Ok(Acquisition::Cancelled);
        }

        let platform = self.bootstrap.platform();
        let mut ladder = TierLadder::starting_at(self.config.camera.preferred_tier);

        while let Some(tier) = ladder.next() {
            if token.is_cancelled() {
                return Ok(Acquisition::Cancelled);
            }

            let scan_config = tier.scan_config(&platform.symbologies, platform.native_detector);
            let callbacks = FrameCallbacks::new(session_id.to_string(), self.frame_tx.clone());

            let engine = Arc::clone(&self.engine);
            let camera_id = camera.id.clone();
            let mut attempt =
                tokio::spawn(async move { engine.start(&camera_id, &scan_config, callbacks).await });

            let result = tokio::select! {
                joined = &mut attempt => joined,
                _ = token.cancelled() => {
                    self.release_when_opened(attempt).await;
                    return Ok(Acquisition::Cancelled);
                }
            };

            match result {
                Ok(Ok(())) => return Ok(Acquisition::Acquired(tier)),
                Ok(Err(err)) if err.is_tier_related() => {
                    warn!(tier = %tier, error = %err, "Resolution tier rejected, falling back");
                }
                Ok(Err(err)) => return Err(err.into_scan()),
                Err(e) => {
                    error!(tier = %tier, error = %e, "Camera start task failed");
                    return Err(ScanError::DeviceUnavailable(e.to_string()));
                }
            }
        }

        Err(ladder.exhausted_error())
    }

    /// Leaves an abandoned `engine.start` running and stops the stream if it
    /// ever opens. The next acquisition waits for this first.
    async fn release_when_opened(&self, attempt: JoinHandle<Result<(), EngineError>>) {
        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(async move {
            if let Ok(Ok(())) = attempt.await {
                debug!("Camera opened after cancellation, releasing");
                match engine.stop().await {
                    Ok(()) | Err(EngineError::NotRunning) => {}
                    Err(e) => error!(error = %e, "Failed to release late camera stream"),
                }
            }
        });
        self.teardown.lock().await.push(handle);
    }

    /// Waits for late streams from cancelled acquisitions to be released.
    ///
    /// Returns false if `token` was cancelled first.
    async fn await_teardown(&self, token: &CancelToken) -> bool {
        let pending = std::mem::take(&mut *self.teardown.lock().await);
        let mut pending = pending.into_iter();

        while let Some(mut handle) = pending.next() {
            tokio::select! {
                _ = &mut handle => {}
                _ = token.cancelled() => {
                    let mut teardown = self.teardown.lock().await;
                    teardown.push(handle);
                    teardown.extend(pending);
                    return false;
                }
            }
        }
        true
    }

    async fn announce_switch_availability(&self) {
        match self.engine.get_cameras().await {
            Ok(cameras) => self.emitter.on_camera_switch_available(cameras.len() >= 2),
            Err(e) => {
                warn!(error = %e, "Camera enumeration failed");
                self.emitter.on_camera_switch_available(false);
            }
        }
    }

    async fn release_stream(&self) {
        match self.engine.stop().await {
            Ok(()) | Err(EngineError::NotRunning) => {}
            Err(e) => error!(error = %e, "Failed to release camera stream"),
        }
    }

    async fn renew_token(&self) -> CancelToken {
        let token = CancelToken::new();
        *self.cancel.write().await = token.clone();
        token
    }

    // =========================================================================
    // Frame Handling
    // =========================================================================

    /// Processes every frame signal already queued. Returns how many.
    pub async fn pump_frames(self: &Arc<Self>) -> usize {
        let mut handled = 0;
        loop {
            let signal = match self.frame_rx.lock().await.try_recv() {
                Ok(signal) => signal,
                Err(_) => break,
            };
            self.handle_signal(signal).await;
            handled += 1;
        }
        handled
    }

    /// Processes frame signals until the task is aborted.
    pub async fn run(self: Arc<Self>) {
        let mut rx = self.frame_rx.lock().await;
        while let Some(signal) = rx.recv().await {
            self.handle_signal(signal).await;
        }
    }

    async fn handle_signal(self: &Arc<Self>, signal: FrameSignal) {
        let outcome = {
            let session = self.session.read().await;
            self.adapter.lock().await.process(&signal, &session, Utc::now())
        };

        match outcome {
            FrameOutcome::Matched(found) => {
                self.cart.add_item(&found.product, 1);
                info!(
                    barcode = %found.barcode,
                    match_kind = %found.match_kind,
                    confidence = found.confidence,
                    "Product added from scan"
                );
                self.emitter.on_scan_feedback(&ScanFeedback::Added {
                    barcode: found.barcode,
                    match_kind: found.match_kind,
                    confidence: found.confidence,
                });
                self.pause_for_next_scan().await;
            }
            FrameOutcome::NotFound { code } => {
                info!(code = %code, "No product for scanned barcode");
                self.emitter
                    .on_scan_feedback(&ScanFeedback::NotFound { code });
            }
            FrameOutcome::Unreadable { raw } => {
                debug!(raw = %raw, "No barcode digits in decoded text");
                self.emitter
                    .on_scan_feedback(&ScanFeedback::ExtractionFailure { raw });
            }
            FrameOutcome::Suppressed { code } => {
                debug!(code = %code, "Duplicate read suppressed");
            }
            FrameOutcome::PermissionRevoked { message } => {
                self.revoke_permission(&message).await;
            }
            FrameOutcome::Noise => {}
            FrameOutcome::Dropped(reason) => {
                debug!(?reason, "Frame signal dropped");
            }
        }
    }

    async fn pause_for_next_scan(self: &Arc<Self>) {
        let session_id = match self.pause().await {
            Ok(SessionState::Paused) => self.session.read().await.id.clone(),
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, "Could not pause after scan");
                return;
            }
        };

        let this = Arc::clone(self);
        let delay = self.config.resume_delay();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.resume_after_scan(&session_id).await;
        });

        if let Some(previous) = self.resume_task.lock().await.replace(handle) {
            previous.abort();
        }
    }

    async fn resume_after_scan(&self, session_id: &str) {
        {
            let session = self.session.read().await;
            if session.id != session_id || session.state != SessionState::Paused {
                return;
            }
        }
        if self.viewport.lock().await.is_dragging() {
            // The drag ends the pause instead
            self.resume_on_pan_end.store(true, Ordering::SeqCst);
            return;
        }
        if let Err(e) = self.resume().await {
            warn!(error = %e, "Could not resume after scan");
        }
    }

    async fn cancel_resume(&self) {
        if let Some(handle) = self.resume_task.lock().await.take() {
            handle.abort();
        }
    }

    async fn revoke_permission(&self, message: &str) {
        self.cancel_resume().await;
        {
            let mut session = self.session.write().await;
            if session.apply(SessionEvent::PermissionRevoked).is_err() {
                return;
            }
            warn!(session_id = %session.id, reason = message, "Camera permission revoked");
            self.emit_state(&session).await;
        }

        self.release_stream().await;
        self.bootstrap.record_permission(false).await;
        self.emitter.show_error(ScanErrorKind::PermissionDenied);
        self.emitter.show_retry();
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    /// Updates the preview size used for pan bounds.
    pub async fn set_viewport(&self, width: f64, height: f64) {
        let zoom = {
            let mut viewport = self.viewport.lock().await;
            viewport.set_viewport(width, height);
            viewport.state()
        };
        self.emitter.on_zoom_changed(&zoom);
    }

    pub async fn zoom_in(&self) -> ZoomState {
        let zoom = self.viewport.lock().await.zoom_in();
        self.emitter.on_zoom_changed(&zoom);
        zoom
    }

    pub async fn zoom_out(&self) -> ZoomState {
        let zoom = self.viewport.lock().await.zoom_out();
        self.emitter.on_zoom_changed(&zoom);
        zoom
    }

    /// Pointer down on the preview. Pauses decoding while dragging.
    ///
    /// Returns false (and does nothing) at zoom factor 1.0.
    pub async fn begin_pan(&self) -> PipelineResult<bool> {
        if !self.viewport.lock().await.begin_drag() {
            return Ok(false);
        }
        if self.state().await == SessionState::Scanning {
            self.pause().await?;
            self.resume_on_pan_end.store(true, Ordering::SeqCst);
        }
        Ok(true)
    }

    /// Pointer move during a drag.
    pub async fn pan_by(&self, dx: f64, dy: f64) -> ZoomState {
        let zoom = self.viewport.lock().await.drag_by(dx, dy);
        self.emitter.on_zoom_changed(&zoom);
        zoom
    }

    /// Pointer up. Resumes decoding if the drag paused it, or if a
    /// post-scan pause ran out while the drag was still going.
    ///
    /// A post-scan pause that is still counting down is left to its timer.
    pub async fn end_pan(&self) -> PipelineResult<()> {
        if !self.viewport.lock().await.end_drag() {
            return Ok(());
        }
        let owed = self.resume_on_pan_end.swap(false, Ordering::SeqCst);
        if owed && self.state().await == SessionState::Paused {
            self.resume().await?;
        }
        Ok(())
    }

    /// CSS transform for the preview element.
    pub async fn preview_transform(&self) -> String {
        self.viewport.lock().await.transform().to_css()
    }

    async fn emit_state(&self, session: &ScanSession) {
        let zoom = self.viewport.lock().await.state();
        self.emitter
            .on_state_changed(&SessionSnapshot::capture(session, zoom));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use titan_scan_core::{CameraId, FacingMode, InMemoryCatalog, MatchKind};

    use crate::config::BootstrapSettings;
    use crate::testing::{Command, MockEngine, MockPermission, RecordingCart, RecordingEmitter};

    const UA: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

    struct Harness {
        controller: Arc<SessionController<InMemoryCatalog<String>>>,
        engine: Arc<MockEngine>,
        emitter: Arc<RecordingEmitter>,
        cart: Arc<RecordingCart<String>>,
    }

    fn harness_with(engine: MockEngine, config: ScannerConfig) -> Harness {
        let engine = Arc::new(engine);
        let bootstrap = Arc::new(Bootstrap::new(
            engine.clone(),
            Arc::new(MockPermission::granted()),
            UA,
            BootstrapSettings::default(),
            FacingMode::Environment,
        ));
        let catalog: InMemoryCatalog<String> = [
            ("8901030875071".to_string(), "Surf Excel 1kg".to_string()),
            ("4006381333931".to_string(), "Stabilo Boss".to_string()),
        ]
        .into_iter()
        .collect();
        let emitter = Arc::new(RecordingEmitter::new());
        let cart = Arc::new(RecordingCart::new());

        let controller = Arc::new(SessionController::new(
            config,
            bootstrap,
            catalog,
            cart.clone(),
            emitter.clone(),
        ));

        Harness {
            controller,
            engine,
            emitter,
            cart,
        }
    }

    fn harness(cameras: usize) -> Harness {
        harness_with(MockEngine::with_cameras(cameras), ScannerConfig::default())
    }

    fn permission_denied() -> EngineError {
        EngineError::PermissionDenied("NotAllowedError: Permission denied".into())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reaches_scanning() {
        let h = harness(2);
        let state = h.controller.start().await.unwrap();
        assert_eq!(state, SessionState::Scanning);

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.resolution_tier, Some(ResolutionTier::Hd));
        assert_eq!(
            snapshot.camera.unwrap().id,
            CameraId::Facing(FacingMode::Environment)
        );
        assert!(snapshot.started_at.is_some());

        assert_eq!(
            h.emitter.states(),
            vec![SessionState::Initializing, SessionState::Scanning]
        );
        assert!(h.emitter.saw(&Command::Guide));
        assert!(h.emitter.saw(&Command::SwitchAvailable(true)));
        assert!(h.engine.is_streaming());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_live_is_collapsed() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        let state = h.controller.start().await.unwrap();
        assert_eq!(state, SessionState::Scanning);
        assert_eq!(h.engine.start_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_then_retry() {
        let h = harness(1);
        h.engine.push_start_result(Err(permission_denied()));

        let err = h.controller.start().await.unwrap_err();
        assert_eq!(err.kind(), Some(ScanErrorKind::PermissionDenied));
        assert!(err.is_retryable());
        assert_eq!(
            h.controller.state().await,
            SessionState::Error(ScanErrorKind::PermissionDenied)
        );
        assert!(h.emitter.saw(&Command::Error(ScanErrorKind::PermissionDenied)));
        assert!(h.emitter.saw(&Command::Retry));
        // Permission failures never walk the ladder
        assert_eq!(h.engine.start_calls().len(), 1);

        let state = h.controller.retry().await.unwrap();
        assert_eq!(state, SessionState::Scanning);
        assert_eq!(h.controller.snapshot().await.retry_count, 0);
        assert!(h
            .emitter
            .states()
            .ends_with(&[SessionState::Initializing, SessionState::Scanning]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_only_from_error() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        let err = h.controller.retry().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Scan(ScanError::InvalidTransition { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_retry_counts() {
        let h = harness(1);
        h.engine.push_start_result(Err(permission_denied()));
        h.engine.push_start_result(Err(permission_denied()));

        h.controller.start().await.unwrap_err();
        h.controller.retry().await.unwrap_err();
        assert_eq!(h.controller.snapshot().await.retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tier_fallback_to_vga() {
        let h = harness(1);
        h.engine
            .push_start_result(Err(EngineError::ConstraintRejected("OverconstrainedError".into())));

        assert_eq!(h.controller.start().await.unwrap(), SessionState::Scanning);
        let tiers: Vec<_> = h.engine.start_calls().into_iter().map(|(_, t)| t).collect();
        assert_eq!(tiers, vec![ResolutionTier::Hd, ResolutionTier::Vga]);
        assert_eq!(
            h.controller.snapshot().await.resolution_tier,
            Some(ResolutionTier::Vga)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_tiers_rejected() {
        let h = harness(1);
        for _ in 0..5 {
            h.engine
                .push_start_result(Err(EngineError::ConstraintRejected("NotReadableError".into())));
        }

        let err = h.controller.start().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Scan(ScanError::ConfigUnsupported { ref attempted })
                if attempted == &vec![ResolutionTier::Hd, ResolutionTier::Vga, ResolutionTier::Qvga]
        ));
        assert_eq!(h.engine.start_calls().len(), 3);
        assert_eq!(
            h.controller.state().await,
            SessionState::Error(ScanErrorKind::ConfigUnsupported)
        );
        assert!(!h.emitter.saw(&Command::Retry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_preferred_tier_is_first_rung() {
        let mut config = ScannerConfig::default();
        config.camera.preferred_tier = ResolutionTier::Vga;
        let h = harness_with(MockEngine::with_cameras(1), config);
        for _ in 0..3 {
            h.engine
                .push_start_result(Err(EngineError::ConstraintRejected("width".into())));
        }

        h.controller.start().await.unwrap_err();
        let tiers: Vec<_> = h.engine.start_calls().into_iter().map(|(_, t)| t).collect();
        assert_eq!(tiers, vec![ResolutionTier::Vga, ResolutionTier::Qvga]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_library_load_timeout() {
        let engine = MockEngine::with_cameras(1);
        engine.set_init_delay(Duration::from_secs(30));
        let h = harness_with(engine, ScannerConfig::default());

        let err = h.controller.start().await.unwrap_err();
        assert_eq!(err.kind(), Some(ScanErrorKind::LibraryLoadTimeout));
        assert_eq!(
            h.controller.state().await,
            SessionState::Error(ScanErrorKind::LibraryLoadTimeout)
        );
        assert!(h.engine.start_calls().is_empty());
        assert!(h.emitter.saw(&Command::Error(ScanErrorKind::LibraryLoadTimeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_initializing_releases_stream() {
        let h = harness(1);
        h.engine.set_start_delay(Duration::from_millis(500));

        let controller = h.controller.clone();
        let start = tokio::spawn(async move { controller.start().await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.controller.state().await, SessionState::Initializing);

        let state = h.controller.stop().await.unwrap();
        assert_eq!(state, SessionState::Stopped);
        assert!(!h.engine.is_streaming());

        // The start resolved after cancellation and reports nothing new
        assert_eq!(start.await.unwrap().unwrap(), SessionState::Stopped);
        assert_eq!(h.controller.state().await, SessionState::Stopped);
        assert!(!h.emitter.saw(&Command::Guide));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_does_not_wait_for_hung_camera() {
        let h = harness(1);
        h.engine.set_start_delay(Duration::from_secs(60));

        let controller = h.controller.clone();
        let start = tokio::spawn(async move { controller.start().await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let before = tokio::time::Instant::now();
        assert_eq!(h.controller.stop().await.unwrap(), SessionState::Stopped);
        assert!(before.elapsed() < Duration::from_secs(1));
        assert_eq!(start.await.unwrap().unwrap(), SessionState::Stopped);

        // The camera eventually opens and is closed again in the background
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(h.engine.start_calls().len(), 1);
        assert!(!h.engine.is_streaming());
        assert_eq!(h.controller.state().await, SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_waits_for_late_stream_release() {
        let h = harness(1);
        h.engine.set_start_delay(Duration::from_millis(500));

        let controller = h.controller.clone();
        let first = tokio::spawn(async move { controller.start().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        let first_id = h.controller.snapshot().await.session_id;

        h.controller.stop().await.unwrap();
        assert_eq!(first.await.unwrap().unwrap(), SessionState::Stopped);

        h.engine.set_start_delay(Duration::ZERO);
        assert_eq!(h.controller.start().await.unwrap(), SessionState::Scanning);

        // The abandoned start landed and was stopped before the new one ran
        assert_eq!(h.engine.start_calls().len(), 2);
        assert_eq!(h.engine.stop_calls(), 2);
        assert!(h.engine.is_streaming());
        assert_ne!(h.controller.snapshot().await.session_id, first_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_between_start_and_acquisition() {
        let h = harness(1);

        // Park start() in its first state broadcast
        let viewport = h.controller.viewport.lock().await;
        let controller = h.controller.clone();
        let start = tokio::spawn(async move { controller.start().await });
        tokio::time::sleep(Duration::from_millis(1)).await;

        let controller = h.controller.clone();
        let stop = tokio::spawn(async move { controller.stop().await });
        tokio::time::sleep(Duration::from_millis(1)).await;
        drop(viewport);

        assert_eq!(stop.await.unwrap().unwrap(), SessionState::Stopped);
        assert_eq!(start.await.unwrap().unwrap(), SessionState::Stopped);
        assert_eq!(h.controller.state().await, SessionState::Stopped);
        assert!(!h.engine.is_streaming());
        assert!(!h.emitter.saw(&Command::Guide));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_idle_is_noop() {
        let h = harness(1);
        assert_eq!(h.controller.stop().await.unwrap(), SessionState::Idle);
        assert_eq!(h.engine.stop_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_start_new_session() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        let first = h.controller.snapshot().await.session_id;

        h.controller.zoom_in().await;
        assert_eq!(h.controller.stop().await.unwrap(), SessionState::Stopped);
        assert!(!h.engine.is_streaming());
        assert_eq!(h.controller.snapshot().await.zoom, ZoomState::default());

        h.controller.start().await.unwrap();
        assert_ne!(h.controller.snapshot().await.session_id, first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_rejected_with_one_camera() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        assert!(h.emitter.saw(&Command::SwitchAvailable(false)));

        let err = h.controller.switch_camera().await.unwrap_err();
        assert_eq!(err.kind(), Some(ScanErrorKind::DeviceUnavailable));
        assert_eq!(h.controller.state().await, SessionState::Scanning);
        assert!(h.engine.is_streaming());
        assert_eq!(h.engine.start_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_cycles_cameras_and_keeps_session() {
        let h = harness(3);
        h.controller.start().await.unwrap();
        let id = h.controller.snapshot().await.session_id;

        assert_eq!(h.controller.switch_camera().await.unwrap(), SessionState::Scanning);
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.session_id, id);
        assert_eq!(snapshot.camera.unwrap().id, CameraId::Device("cam-1".into()));

        h.controller.switch_camera().await.unwrap();
        h.controller.switch_camera().await.unwrap();
        let camera = h.controller.snapshot().await.camera.unwrap();
        assert_eq!(camera.id, CameraId::Device("cam-0".into()));

        let states = h.emitter.states();
        assert!(states.contains(&SessionState::SwitchingCamera));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_requires_live_session() {
        let h = harness(2);
        let err = h.controller.switch_camera().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Scan(ScanError::InvalidTransition { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_adds_to_cart_then_auto_resumes() {
        let h = harness(1);
        h.controller.start().await.unwrap();

        h.engine.decode("890103087507");
        assert_eq!(h.controller.pump_frames().await, 1);

        assert_eq!(h.cart.lines(), vec![("Surf Excel 1kg".to_string(), 1)]);
        assert_eq!(
            h.emitter.feedback(),
            vec![ScanFeedback::Added {
                barcode: "8901030875071".into(),
                match_kind: MatchKind::Prefix,
                confidence: 12.0 / 13.0,
            }]
        );
        assert_eq!(h.controller.state().await, SessionState::Paused);
        assert!(h.engine.is_paused());

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(h.controller.state().await, SessionState::Scanning);
        assert!(!h.engine.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_decodes_while_paused_are_dropped() {
        let h = harness(1);
        h.controller.start().await.unwrap();

        h.engine.decode("8901030875071");
        h.engine.decode("4006381333931");
        assert_eq!(h.controller.pump_frames().await, 2);

        // The second read arrived before the post-scan pause took effect
        assert_eq!(h.cart.lines().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_suppresses_repeat_read() {
        let mut config = ScannerConfig::default();
        config.decode.resume_delay_ms = 100;
        let h = harness_with(MockEngine::with_cameras(1), config);
        h.controller.start().await.unwrap();

        h.engine.decode("8901030875071");
        h.controller.pump_frames().await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(h.controller.state().await, SessionState::Scanning);

        // Wall clock has barely moved, well inside the 800ms window
        h.engine.decode("8901030875071");
        h.controller.pump_frames().await;
        assert_eq!(h.cart.lines().len(), 1);
        assert_eq!(h.controller.state().await, SessionState::Scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_and_unreadable_keep_scanning() {
        let h = harness(1);
        h.controller.start().await.unwrap();

        h.engine.decode("5555555555555");
        h.engine.decode("no digits at all");
        h.controller.pump_frames().await;

        assert_eq!(
            h.emitter.feedback(),
            vec![
                ScanFeedback::NotFound {
                    code: "5555555555555".into()
                },
                ScanFeedback::ExtractionFailure {
                    raw: "no digits at all".into()
                },
            ]
        );
        assert!(h.emitter.errors().is_empty());
        assert_eq!(h.controller.state().await, SessionState::Scanning);
        assert!(h.cart.lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_revoked_mid_scan() {
        let h = harness(1);
        h.controller.start().await.unwrap();

        h.engine.frame_error("No MultiFormat Readers were able to detect the code.");
        h.controller.pump_frames().await;
        assert_eq!(h.controller.state().await, SessionState::Scanning);

        h.engine.frame_error("NotAllowedError: Permission denied");
        h.controller.pump_frames().await;
        assert_eq!(
            h.controller.state().await,
            SessionState::Error(ScanErrorKind::PermissionDenied)
        );
        assert!(!h.engine.is_streaming());
        assert!(h.emitter.saw(&Command::Retry));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signals_from_previous_session_ignored() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        let stale = FrameCallbacks::new("old-session".into(), h.controller.frame_tx.clone());
        stale.on_decoded("8901030875071");
        h.controller.pump_frames().await;
        assert!(h.cart.lines().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pan_pauses_and_resumes_decoding() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        h.controller.set_viewport(400.0, 300.0).await;

        // No panning at 1.0
        assert!(!h.controller.begin_pan().await.unwrap());
        assert_eq!(h.controller.state().await, SessionState::Scanning);

        h.controller.zoom_in().await;
        h.controller.zoom_in().await;
        assert!(h.controller.begin_pan().await.unwrap());
        assert_eq!(h.controller.state().await, SessionState::Paused);

        let zoom = h.controller.pan_by(1000.0, 0.0).await;
        assert_eq!(zoom.pan.x, 100.0);

        h.controller.end_pan().await.unwrap();
        assert_eq!(h.controller.state().await, SessionState::Scanning);
        assert_eq!(
            h.controller.preview_transform().await,
            "scale(1.50) translate(66.7px, 0.0px)"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_pan_keeps_post_scan_pause() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        h.controller.set_viewport(400.0, 300.0).await;
        h.controller.zoom_in().await;

        h.engine.decode("8901030875071");
        h.controller.pump_frames().await;
        assert_eq!(h.controller.state().await, SessionState::Paused);

        assert!(h.controller.begin_pan().await.unwrap());
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.controller.end_pan().await.unwrap();
        assert_eq!(h.controller.state().await, SessionState::Paused);

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(h.controller.state().await, SessionState::Scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_pan_takes_over_post_scan_resume() {
        let h = harness(1);
        h.controller.start().await.unwrap();
        h.controller.set_viewport(400.0, 300.0).await;
        h.controller.zoom_in().await;

        h.engine.decode("8901030875071");
        h.controller.pump_frames().await;
        assert!(h.controller.begin_pan().await.unwrap());

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert_eq!(h.controller.state().await, SessionState::Paused);

        h.controller.end_pan().await.unwrap();
        assert_eq!(h.controller.state().await, SessionState::Scanning);
        assert!(!h.engine.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_constraints_need_live_stream() {
        let h = harness(1);
        let torch = VideoConstraints {
            torch: Some(true),
            ..Default::default()
        };
        assert!(h.controller.apply_video_constraints(&torch).await.is_err());

        h.controller.start().await.unwrap();
        h.controller.apply_video_constraints(&torch).await.unwrap();
        assert_eq!(h.engine.applied_constraints(), vec![torch]);
    }
}
