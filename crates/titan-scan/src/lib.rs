//! # titan-scan: Barcode Scan Sessions for Titan POS
//!
//! This crate drives the camera and the external decoding engine, and turns
//! decoded frames into cart additions. The pure rules (normalizer, resolver,
//! state machine, zoom math) live in `titan-scan-core`; everything here is
//! async plumbing around them.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Session Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 SessionController (one per screen)               │  │
//! │  │                                                                  │  │
//! │  │  start / retry / stop / switch_camera / pause / resume           │  │
//! │  │  zoom & pan, frame pump                                          │  │
//! │  └──────┬──────────────────────┬──────────────────────┬─────────────┘  │
//! │         ▼                      ▼                      ▼                │
//! │  ┌────────────────┐  ┌──────────────────┐  ┌────────────────────────┐  │
//! │  │   Bootstrap    │  │ FrameDecode      │  │  ScanEventEmitter      │  │
//! │  │                │  │ Adapter          │  │                        │  │
//! │  │ Engine warm-up │  │ normalize,       │  │ Render commands for    │  │
//! │  │ Permission     │  │ cooldown,        │  │ the UI shell           │  │
//! │  │ Platform traits│  │ resolve          │  │                        │  │
//! │  └───────┬────────┘  └──────────────────┘  └────────────────────────┘  │
//! │          ▼                                                              │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  DecodingEngine / CameraPermission (host-provided, async traits) │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`adapter`] - Frame signal → cart decision
//! - [`bootstrap`] - Engine warm-up, permission cache, platform traits
//! - [`cancel`] - Acquisition cancellation token
//! - [`config`] - Scanner configuration (TOML + environment)
//! - [`controller`] - `SessionController`
//! - [`engine`] - Decoding engine and permission contracts
//! - [`error`] - Pipeline error types
//! - [`events`] - UI render commands and payloads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use titan_scan::{Bootstrap, ScannerConfig, SessionController};
//!
//! let config = ScannerConfig::load_or_default(None);
//! let bootstrap = Arc::new(Bootstrap::new(
//!     engine,
//!     permission,
//!     user_agent,
//!     config.bootstrap.clone(),
//!     config.camera.facing,
//! ));
//! bootstrap.warm_up();
//!
//! let controller = Arc::new(SessionController::new(config, bootstrap, catalog, cart, emitter));
//! tokio::spawn(controller.clone().run());
//! controller.start().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod adapter;
pub mod bootstrap;
pub mod cancel;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use adapter::{DropReason, FrameDecodeAdapter, FrameOutcome};
pub use bootstrap::{Bootstrap, BootstrapReport};
pub use cancel::CancelToken;
pub use config::ScannerConfig;
pub use controller::SessionController;
pub use engine::{CameraPermission, DecodingEngine, FrameCallbacks, FrameSignal, NoPermissionProbe};
pub use error::{EngineError, PipelineError, PipelineResult};
pub use events::{NoOpEmitter, ScanEventEmitter, ScanFeedback, SessionSnapshot};
