//! # Error Types
//!
//! Domain-specific error types for the scanning pipeline.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Scan Error Kinds                                │
//! │                                                                         │
//! │  STOPS THE SESSION                  SCANNING CONTINUES                  │
//! │  ─────────────────                  ──────────────────                  │
//! │  PermissionDenied   (retry action)  DeviceUnavailable  (action refused) │
//! │  LibraryLoadTimeout (reload hint)   ExtractionFailure  (silent)         │
//! │  ConfigUnsupported  (terminal)      ProductNotFound    (toast)          │
//! │                                                                         │
//! │  Flow: ScanError (this crate) → PipelineError (titan-scan) → UI shell  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, tier, state)
//! 3. Every variant maps onto a [`ScanErrorKind`] the UI understands

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::session::{SessionEvent, SessionState};
use crate::types::ResolutionTier;

// =============================================================================
// Error Kind
// =============================================================================

/// The user-facing error categories of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanErrorKind {
    /// User declined camera access. Recoverable via the retry action.
    PermissionDenied,
    /// No camera hardware, or a switch with a single camera.
    DeviceUnavailable,
    /// Decoding engine did not initialize in time.
    LibraryLoadTimeout,
    /// Every resolution tier was rejected by the device.
    ConfigUnsupported,
    /// No usable digits in the decoded text.
    ExtractionFailure,
    /// Catalog lookup exhausted every strategy.
    ProductNotFound,
}

impl ScanErrorKind {
    /// Returns true if this error ends the current session.
    pub fn stops_session(&self) -> bool {
        matches!(
            self,
            ScanErrorKind::PermissionDenied
                | ScanErrorKind::LibraryLoadTimeout
                | ScanErrorKind::ConfigUnsupported
        )
    }

    /// Returns true if the UI should offer the manual retry action.
    pub fn offers_retry(&self) -> bool {
        matches!(self, ScanErrorKind::PermissionDenied)
    }

    /// Returns true if the user is never interrupted for this kind.
    pub fn is_silent(&self) -> bool {
        matches!(self, ScanErrorKind::ExtractionFailure)
    }

    /// Message shown by the UI shell.
    pub fn user_message(&self) -> &'static str {
        match self {
            ScanErrorKind::PermissionDenied => {
                "Camera access was denied. Allow camera access and tap Retry."
            }
            ScanErrorKind::DeviceUnavailable => "No other camera is available on this device.",
            ScanErrorKind::LibraryLoadTimeout => {
                "The scanner could not load. Please reload the page."
            }
            ScanErrorKind::ConfigUnsupported => "This camera does not support scanning.",
            ScanErrorKind::ExtractionFailure => "Could not read the barcode.",
            ScanErrorKind::ProductNotFound => "Product not found.",
        }
    }
}

impl std::fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanErrorKind::PermissionDenied => write!(f, "permission_denied"),
            ScanErrorKind::DeviceUnavailable => write!(f, "device_unavailable"),
            ScanErrorKind::LibraryLoadTimeout => write!(f, "library_load_timeout"),
            ScanErrorKind::ConfigUnsupported => write!(f, "config_unsupported"),
            ScanErrorKind::ExtractionFailure => write!(f, "extraction_failure"),
            ScanErrorKind::ProductNotFound => write!(f, "product_not_found"),
        }
    }
}

// =============================================================================
// Scan Error
// =============================================================================

/// Scan pipeline errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScanError {
    /// Camera permission was refused or revoked.
    ///
    /// ## When This Occurs
    /// - User dismissed the browser permission prompt
    /// - Permission was revoked while the stream was live
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    /// No usable camera for the requested action.
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The decoding engine did not become ready within the bound.
    #[error("Decoding engine failed to load within {waited_ms}ms")]
    LibraryLoadTimeout { waited_ms: u64 },

    /// Every attempted resolution tier was rejected.
    ///
    /// ## User Workflow
    /// ```text
    /// start()
    ///   │
    ///   ├── HD   rejected (OverconstrainedError)
    ///   ├── VGA  rejected
    ///   └── QVGA rejected
    ///         │
    ///         ▼
    /// ConfigUnsupported { attempted: [Hd, Vga, Qvga] }
    /// ```
    #[error("No supported camera configuration (tried {attempted:?})")]
    ConfigUnsupported { attempted: Vec<ResolutionTier> },

    /// Nothing with at least six digits could be extracted.
    #[error("No barcode digits in {raw:?}")]
    ExtractionFailure { raw: String },

    /// Catalog has no exact or fuzzy match.
    #[error("Product not found for barcode {code}")]
    ProductNotFound { code: String },

    /// Event is not valid for the current session state.
    #[error("Cannot apply {event:?} while {from}")]
    InvalidTransition {
        from: SessionState,
        event: SessionEvent,
    },

    /// Invalid pipeline configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),
}

impl ScanError {
    /// Maps the error onto the user-facing taxonomy.
    ///
    /// Returns `None` for programming/configuration errors that the UI
    /// shell has no dedicated presentation for.
    pub fn kind(&self) -> Option<ScanErrorKind> {
        match self {
            ScanError::PermissionDenied(_) => Some(ScanErrorKind::PermissionDenied),
            ScanError::DeviceUnavailable(_) => Some(ScanErrorKind::DeviceUnavailable),
            ScanError::LibraryLoadTimeout { .. } => Some(ScanErrorKind::LibraryLoadTimeout),
            ScanError::ConfigUnsupported { .. } => Some(ScanErrorKind::ConfigUnsupported),
            ScanError::ExtractionFailure { .. } => Some(ScanErrorKind::ExtractionFailure),
            ScanError::ProductNotFound { .. } => Some(ScanErrorKind::ProductNotFound),
            ScanError::InvalidTransition { .. } | ScanError::InvalidConfig(_) => None,
        }
    }

    /// Returns true if this error ends the current session.
    pub fn stops_session(&self) -> bool {
        self.kind().map(|k| k.stops_session()).unwrap_or(false)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with ScanError.
pub type ScanResult<T> = Result<T, ScanError>;

// =============================================================================
// Unit Tests
// =============================================================================
