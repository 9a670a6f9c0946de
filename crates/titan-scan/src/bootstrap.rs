//! # Capability Bootstrap
//!
//! Gets the expensive things out of the way before the cashier taps
//! "Scan": engine initialization and the camera permission prompt.
//!
//! ## Warm-up Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  warm_up()  (spawned, caller continues immediately)                     │
//! │     │                                                                   │
//! │     ├──► engine.initialize()           ──► engine_ready (OnceCell)      │
//! │     │                                                                   │
//! │     └──► permission.probe(environment) ──► permission cache             │
//! │                                             Some(true) / Some(false)    │
//! │                                                                         │
//! │  SessionController::start()                                             │
//! │     └──► ensure_engine_ready(2000ms)                                    │
//! │            ├── already ready            ──► Ok                          │
//! │            ├── init in flight / retried ──► wait, bounded               │
//! │            └── bound exceeded           ──► LibraryLoadTimeout          │
//! │                                                                         │
//! │  Nothing here is fatal: failures are logged and the controller tries   │
//! │  again when a session actually starts.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{OnceCell, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ts_rs::TS;

use titan_scan_core::{FacingMode, PlatformTraits, ScanError, ScanResult};

use crate::config::BootstrapSettings;
use crate::engine::{CameraPermission, DecodingEngine};

// =============================================================================
// Bootstrap Report
// =============================================================================

/// Diagnostic snapshot of what the bootstrap has established so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BootstrapReport {
    pub engine_ready: bool,
    /// `None` until a probe or a real start has answered.
    pub permission_granted: Option<bool>,
    pub platform: PlatformTraits,
}

// =============================================================================
// Bootstrap
// =============================================================================

/// Shared, process-wide capability state.
pub struct Bootstrap {
    engine: Arc<dyn DecodingEngine>,
    permission: Arc<dyn CameraPermission>,
    settings: BootstrapSettings,
    facing: FacingMode,
    user_agent: String,
    platform: OnceLock<PlatformTraits>,
    engine_ready: OnceCell<()>,
    permission_granted: RwLock<Option<bool>>,
}

impl Bootstrap {
    pub fn new(
        engine: Arc<dyn DecodingEngine>,
        permission: Arc<dyn CameraPermission>,
        user_agent: impl Into<String>,
        settings: BootstrapSettings,
        facing: FacingMode,
    ) -> Self {
        Bootstrap {
            engine,
            permission,
            settings,
            facing,
            user_agent: user_agent.into(),
            platform: OnceLock::new(),
            engine_ready: OnceCell::new(),
            permission_granted: RwLock::new(None),
        }
    }

    pub fn engine(&self) -> Arc<dyn DecodingEngine> {
        Arc::clone(&self.engine)
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Platform traits, sampled from the user agent on first use.
    pub fn platform(&self) -> &PlatformTraits {
        self.platform.get_or_init(|| {
            let traits = PlatformTraits::from_user_agent(&self.user_agent);
            debug!(
                family = ?traits.family,
                mobile = traits.is_mobile,
                native_detector = traits.native_detector,
                "Platform traits detected"
            );
            traits
        })
    }

    /// Starts engine initialization and the permission probe in the
    /// background.
    pub fn warm_up(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.platform();

            match this.engine_ready.get_or_try_init(|| this.engine.initialize()).await {
                Ok(()) => info!("Decoding engine warmed up"),
                Err(e) => warn!(error = %e, "Engine warm-up failed, will retry on start"),
            }

            if this.settings.warm_permission {
                this.probe_permission().await;
            }
        })
    }

    /// Requests the camera once and releases it, caching the answer.
    pub async fn probe_permission(&self) -> bool {
        let granted = match self.permission.probe(self.facing).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, facing = %self.facing, "Camera permission probe failed");
                false
            }
        };
        self.record_permission(granted).await;
        granted
    }

    /// Waits for the engine, bounded by `timeout`.
    ///
    /// Initialization failures are not cached, so a later call retries.
    pub async fn ensure_engine_ready(&self, timeout: Duration) -> ScanResult<()> {
        let waited_ms = timeout.as_millis() as u64;
        let init = self
            .engine_ready
            .get_or_try_init(|| self.engine.initialize());

        match tokio::time::timeout(timeout, init).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "Decoding engine failed to initialize");
                Err(ScanError::LibraryLoadTimeout { waited_ms })
            }
            Err(_) => {
                warn!(waited_ms, "Decoding engine did not become ready in time");
                Err(ScanError::LibraryLoadTimeout { waited_ms })
            }
        }
    }

    pub fn is_engine_ready(&self) -> bool {
        self.engine_ready.initialized()
    }

    pub async fn permission_granted(&self) -> Option<bool> {
        *self.permission_granted.read().await
    }

    /// Updates the permission cache from any source (probe or real start).
    pub async fn record_permission(&self, granted: bool) {
        let mut cached = self.permission_granted.write().await;
        if *cached != Some(granted) {
            debug!(granted, "Camera permission cache updated");
        }
        *cached = Some(granted);
    }

    pub async fn report(&self) -> BootstrapReport {
        BootstrapReport {
            engine_ready: self.is_engine_ready(),
            permission_granted: self.permission_granted().await,
            platform: self.platform().clone(),
        }
    }
}
