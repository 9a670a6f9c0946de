//! # titan-scan-core: Pure Scan Logic for Titan POS
//!
//! This crate is the **heart** of the barcode scanning pipeline. Everything
//! here is a pure function or a plain data structure; the camera, the
//! decoding engine and all timers live in `titan-scan`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Titan Scan Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI Shell (render commands)                   │   │
//! │  │    show_guide ──► show_error ──► show_retry ──► zoom level      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ScanEventEmitter                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               titan-scan (SessionController, tokio)             │   │
//! │  │    start, stop, switch_camera, retry, frame pump                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ titan-scan-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌───────────────┐   │   │
//! │  │  │normalizer │ │ resolver  │ │  session  │ │   viewport    │   │   │
//! │  │  │ cascade   │ │ exact +   │ │  state    │ │  zoom / pan   │   │   │
//! │  │  │ of 5      │ │ fuzzy     │ │  machine  │ │  math         │   │   │
//! │  │  └───────────┘ └───────────┘ └───────────┘ └───────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO TIMERS • NO CAMERA • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Camera descriptors, decode events, resolution tiers
//! - [`error`] - Scan error taxonomy
//! - [`normalizer`] - Raw decoded text → canonical barcode
//! - [`cooldown`] - Duplicate-read suppression window
//! - [`catalog`] - Product Catalog / Cart Sink contracts
//! - [`resolver`] - Exact and fuzzy catalog matching
//! - [`session`] - Session state machine and tier ladder
//! - [`viewport`] - Digital zoom and pan
//! - [`platform`] - Browser/platform trait detection
//!
//! ## Example Usage
//!
//! ```rust
//! use titan_scan_core::normalizer::normalize;
//!
//! // Separators are stripped when the text is otherwise all digits
//! assert_eq!(normalize("89-0103-087507").as_deref(), Some("890103087507"));
//!
//! // Nothing usable: the event is discarded
//! assert_eq!(normalize("no digits here"), None);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod cooldown;
pub mod error;
pub mod normalizer;
pub mod platform;
pub mod resolver;
pub mod session;
pub mod types;
pub mod viewport;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{CartSink, InMemoryCatalog, ProductCatalog};
pub use cooldown::{CooldownVerdict, ScanCooldown};
pub use error::{ScanError, ScanErrorKind, ScanResult};
pub use normalizer::normalize;
pub use platform::{BrowserFamily, PlatformTraits};
pub use resolver::{MatchKind, ProductMatch, Resolver, ResolverSettings};
pub use session::{ScanSession, SessionEvent, SessionState, TierLadder, Transition};
pub use types::*;
pub use viewport::{Pan, Transform, ViewportController, ZoomState};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shortest barcode the normalizer will ever emit.
pub const MIN_BARCODE_DIGITS: usize = 6;

/// Default duplicate-suppression window for identical codes.
///
/// Cheaper cameras re-read a code many times per second while it stays in
/// frame; one physical scan should produce one cart line.
pub const DEFAULT_COOLDOWN_MS: u64 = 800;

/// Default per-position match ratio a fuzzy window must exceed.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// How long a session start waits for the decoding engine to load.
pub const DEFAULT_LIBRARY_LOAD_TIMEOUT_MS: u64 = 2000;

/// Zoom increment per user action.
pub const ZOOM_STEP: f64 = 0.25;

/// Lower zoom bound (no magnification).
pub const MIN_ZOOM: f64 = 1.0;

/// Default upper zoom bound.
pub const DEFAULT_MAX_ZOOM: f64 = 3.0;
