//! # Pipeline Error Types
//!
//! Error types for the async scanning layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pipeline Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Scan (core)    │  │     Engine      │  │    Configuration        │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  PermissionDen. │  │  Permission     │  │  InvalidConfig          │ │
//! │  │  ConfigUnsupp.  │  │  NotFound       │  │  ConfigLoadFailed       │ │
//! │  │  LibraryTimeout │  │  Constraint     │  │  ConfigSaveFailed       │ │
//! │  │  ...            │  │  Failed         │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  EngineError is what an engine implementation returns; the controller  │
//! │  classifies it into the scan taxonomy (see EngineError::into_scan).    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use titan_scan_core::{ScanError, ScanErrorKind};

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

// =============================================================================
// Engine Error
// =============================================================================

/// Failure reported by a decoding engine or media device implementation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Camera permission refused (`NotAllowedError`, `SecurityError`).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No camera matches the request (`NotFoundError`).
    #[error("Camera not found: {0}")]
    NotFound(String),

    /// The device rejected the requested constraints
    /// (`OverconstrainedError`, `NotReadableError`).
    #[error("Constraints rejected: {0}")]
    ConstraintRejected(String),

    /// Engine is not running (stop/pause without a stream).
    #[error("Engine not running")]
    NotRunning,

    /// Anything else the engine reported.
    #[error("Engine failure: {0}")]
    Failed(String),
}

impl EngineError {
    /// Classifies a free-form engine message.
    ///
    /// Browser engines report failures as strings; the DOMException name is
    /// the reliable part.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if is_permission_message(&message) {
            EngineError::PermissionDenied(message)
        } else if lower.contains("notfounderror") || lower.contains("requested device not found") {
            EngineError::NotFound(message)
        } else if lower.contains("overconstrained")
            || lower.contains("notreadableerror")
            || lower.contains("constraint")
        {
            EngineError::ConstraintRejected(message)
        } else {
            EngineError::Failed(message)
        }
    }

    /// Returns true if this is a permission failure.
    pub fn is_permission(&self) -> bool {
        matches!(self, EngineError::PermissionDenied(_))
    }

    /// Returns true if a lower resolution tier might succeed.
    pub fn is_tier_related(&self) -> bool {
        matches!(self, EngineError::ConstraintRejected(_) | EngineError::Failed(_))
    }

    /// Maps the failure onto the scan taxonomy.
    ///
    /// Tier exhaustion is not decided here; the controller reports
    /// `ConfigUnsupported` once the ladder runs out.
    pub fn into_scan(self) -> ScanError {
        match self {
            EngineError::PermissionDenied(msg) => ScanError::PermissionDenied(msg),
            EngineError::NotFound(msg) => ScanError::DeviceUnavailable(msg),
            EngineError::ConstraintRejected(msg) | EngineError::Failed(msg) => {
                ScanError::DeviceUnavailable(msg)
            }
            EngineError::NotRunning => ScanError::DeviceUnavailable("engine not running".into()),
        }
    }
}

/// Returns true if an engine message describes a permission problem.
///
/// Used both for start failures and for per-frame error messages, where a
/// revoked permission must end the session even mid-scan.
pub fn is_permission_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["permission", "notallowederror", "not allowed", "securityerror"]
        .iter()
        .any(|needle| lower.contains(needle))
}

// =============================================================================
// Pipeline Error
// =============================================================================

/// Error type covering all async pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A scan-domain error (taxonomy, transitions).
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Engine failure not mapped to the taxonomy.
    #[error("Decoding engine error: {0}")]
    Engine(#[from] EngineError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Frame channel closed (controller dropped).
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(err: toml::ser::Error) -> Self {
        PipelineError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl PipelineError {
    /// Scan taxonomy kind, if this error has one.
    pub fn kind(&self) -> Option<ScanErrorKind> {
        match self {
            PipelineError::Scan(err) => err.kind(),
            _ => None,
        }
    }

    /// Returns true if the user can recover with the retry action.
    pub fn is_retryable(&self) -> bool {
        self.kind().map(|k| k.offers_retry()).unwrap_or(false)
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidConfig(_)
                | PipelineError::ConfigLoadFailed(_)
                | PipelineError::ConfigSaveFailed(_)
                | PipelineError::Scan(ScanError::InvalidConfig(_))
        )
    }
}
