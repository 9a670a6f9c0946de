//! # Domain Types
//!
//! Core domain types shared by every stage of the scanning pipeline.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Scan Domain Types                               │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ CameraDescriptor │   │   DecodeEvent    │   │ ResolutionTier   │    │
//! │  │ ──────────────── │   │ ──────────────── │   │ ──────────────── │    │
//! │  │ id (device or    │   │ raw_text         │   │ Hd   1920×1080   │    │
//! │  │   facing mode)   │   │ timestamp        │   │ Vga   640×480    │    │
//! │  │ label            │   │ session_id       │   │ Qvga  320×240    │    │
//! │  │ capabilities     │   └──────────────────┘   └──────────────────┘    │
//! │  └──────────────────┘                                                   │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐                           │
//! │  │   Symbology      │   │   ScanConfig     │  (what the engine gets)   │
//! │  │  Ean13 UpcA      │   │  fps, size,      │                           │
//! │  │  Ean8  UpcE      │   │  disable_flip,   │                           │
//! │  │  Code128         │   │  formats         │                           │
//! │  └──────────────────┘   └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Facing Mode
// =============================================================================

/// Logical camera selector used when no device id is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Rear-facing camera.
    #[default]
    Environment,
    /// Front-facing camera.
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for FacingMode {
    type Err = crate::error::ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            "user" | "front" | "selfie" => Ok(FacingMode::User),
            other => Err(crate::error::ScanError::InvalidConfig(format!(
                "Unknown facing mode: '{}'. Valid options: environment, user",
                other
            ))),
        }
    }
}

// =============================================================================
// Camera
// =============================================================================

/// How a camera is addressed when opening a stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum CameraId {
    /// A concrete device identifier from enumeration.
    Device(String),
    /// Facing-mode sentinel (`"environment"` / `"user"`).
    Facing(FacingMode),
}

impl CameraId {
    /// Returns the device identifier, if this is not a sentinel.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            CameraId::Device(id) => Some(id),
            CameraId::Facing(_) => None,
        }
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraId::Device(id) => write!(f, "{}", id),
            CameraId::Facing(mode) => write!(f, "{}", mode),
        }
    }
}

/// Advisory camera capabilities. Any field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CameraCapabilities {
    /// Supported (width, height) pairs.
    #[serde(default)]
    pub resolutions: Vec<(u32, u32)>,

    /// Optical/digital zoom range reported by the device.
    #[serde(default)]
    pub zoom_range: Option<(f64, f64)>,

    /// Whether the device has a controllable torch.
    #[serde(default)]
    pub torch: Option<bool>,
}

/// A physical or logical camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CameraDescriptor {
    pub id: CameraId,

    /// Human-readable label (may be empty before permission is granted).
    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub capabilities: Option<CameraCapabilities>,
}

impl CameraDescriptor {
    /// Descriptor for a concrete enumerated device.
    pub fn device(id: impl Into<String>, label: impl Into<String>) -> Self {
        CameraDescriptor {
            id: CameraId::Device(id.into()),
            label: label.into(),
            capabilities: None,
        }
    }

    /// Descriptor for a facing-mode sentinel.
    pub fn facing(mode: FacingMode) -> Self {
        CameraDescriptor {
            id: CameraId::Facing(mode),
            label: mode.to_string(),
            capabilities: None,
        }
    }

    /// Attaches capabilities.
    pub fn with_capabilities(mut self, capabilities: CameraCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }
}

// =============================================================================
// Decode Event
// =============================================================================

/// A single successful read reported by the decoding engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeEvent {
    /// Text exactly as the engine produced it.
    pub raw_text: String,

    /// When the read was observed.
    pub timestamp: DateTime<Utc>,

    /// Session that produced the read.
    pub session_id: String,
}

impl DecodeEvent {
    /// Creates an event stamped with the current time.
    pub fn now(raw_text: impl Into<String>, session_id: impl Into<String>) -> Self {
        DecodeEvent {
            raw_text: raw_text.into(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
        }
    }
}

// =============================================================================
// Symbology
// =============================================================================

/// Barcode formats the pipeline asks the engine to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Symbology {
    Ean13,
    UpcA,
    Ean8,
    UpcE,
    Code128,
}

impl Symbology {
    /// Formats used for retail scanning.
    pub const RETAIL: [Symbology; 5] = [
        Symbology::Ean13,
        Symbology::UpcA,
        Symbology::Ean8,
        Symbology::UpcE,
        Symbology::Code128,
    ];

    /// Fixed digit count, if the format has one.
    pub fn digit_len(&self) -> Option<usize> {
        match self {
            Symbology::Ean13 => Some(13),
            Symbology::UpcA => Some(12),
            Symbology::Ean8 | Symbology::UpcE => Some(8),
            Symbology::Code128 => None,
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbology::Ean13 => write!(f, "EAN-13"),
            Symbology::UpcA => write!(f, "UPC-A"),
            Symbology::Ean8 => write!(f, "EAN-8"),
            Symbology::UpcE => write!(f, "UPC-E"),
            Symbology::Code128 => write!(f, "CODE-128"),
        }
    }
}

// =============================================================================
// Resolution Tier
// =============================================================================

/// Named camera configuration bundle, tried in a fixed fallback order.
///
/// ## Fallback Ladder
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  HD (1920×1080 @15fps)  ──fail──►  VGA (640×480)  ──fail──►  QVGA      │
/// │  best detection range              balanced             (320×240,      │
/// │                                                          no flip,      │
/// │                                                          minimal)      │
/// │  Each rung trades detection range for startup reliability.             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    #[default]
    Hd,
    Vga,
    Qvga,
}

impl ResolutionTier {
    /// All tiers, best first.
    pub const ALL: [ResolutionTier; 3] = [ResolutionTier::Hd, ResolutionTier::Vga, ResolutionTier::Qvga];

    /// Next rung down the ladder.
    pub fn next(&self) -> Option<ResolutionTier> {
        match self {
            ResolutionTier::Hd => Some(ResolutionTier::Vga),
            ResolutionTier::Vga => Some(ResolutionTier::Qvga),
            ResolutionTier::Qvga => None,
        }
    }

    /// Ideal frame size for this tier.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ResolutionTier::Hd => (1920, 1080),
            ResolutionTier::Vga => (640, 480),
            ResolutionTier::Qvga => (320, 240),
        }
    }

    /// Builds the engine configuration for this tier.
    ///
    /// QVGA is the "just get a picture" rung: no frame rate request and
    /// no mirrored second pass.
    pub fn scan_config(&self, formats: &[Symbology], native_detector: bool) -> ScanConfig {
        let (width, height) = self.dimensions();
        match self {
            ResolutionTier::Hd => ScanConfig {
                tier: *self,
                width: Some(width),
                height: Some(height),
                fps: Some(15),
                disable_flip: false,
                formats: formats.to_vec(),
                use_native_detector: native_detector,
            },
            ResolutionTier::Vga => ScanConfig {
                tier: *self,
                width: Some(width),
                height: Some(height),
                fps: Some(10),
                disable_flip: false,
                formats: formats.to_vec(),
                use_native_detector: native_detector,
            },
            ResolutionTier::Qvga => ScanConfig {
                tier: *self,
                width: Some(width),
                height: Some(height),
                fps: None,
                disable_flip: true,
                formats: formats.to_vec(),
                use_native_detector: false,
            },
        }
    }
}

impl std::fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionTier::Hd => write!(f, "hd"),
            ResolutionTier::Vga => write!(f, "vga"),
            ResolutionTier::Qvga => write!(f, "qvga"),
        }
    }
}

impl std::str::FromStr for ResolutionTier {
    type Err = crate::error::ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hd" | "1080p" => Ok(ResolutionTier::Hd),
            "vga" | "480p" => Ok(ResolutionTier::Vga),
            "qvga" | "240p" => Ok(ResolutionTier::Qvga),
            other => Err(crate::error::ScanError::InvalidConfig(format!(
                "Unknown resolution tier: '{}'. Valid options: hd, vga, qvga",
                other
            ))),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Configuration handed to the decoding engine for one start attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub tier: ResolutionTier,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Decode attempts per second; `None` leaves it to the engine.
    pub fps: Option<u32>,
    /// Skip the mirrored decode pass.
    pub disable_flip: bool,
    pub formats: Vec<Symbology>,
    /// Prefer the platform's native barcode detector when present.
    pub use_native_detector: bool,
}

/// Live track constraints applied while scanning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub torch: Option<bool>,
    pub zoom: Option<f64>,
    pub focus_continuous: Option<bool>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ladder_order() {
        assert_eq!(ResolutionTier::Hd.next(), Some(ResolutionTier::Vga));
        assert_eq!(ResolutionTier::Vga.next(), Some(ResolutionTier::Qvga));
        assert_eq!(ResolutionTier::Qvga.next(), None);
    }

    #[test]
    fn test_qvga_is_minimal() {
        let config = ResolutionTier::Qvga.scan_config(&Symbology::RETAIL, true);
        assert!(config.disable_flip);
        assert_eq!(config.fps, None);
        assert!(!config.use_native_detector);

        let hd = ResolutionTier::Hd.scan_config(&Symbology::RETAIL, true);
        assert_eq!(hd.fps, Some(15));
        assert_eq!((hd.width, hd.height), (Some(1920), Some(1080)));
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("HD".parse::<ResolutionTier>().unwrap(), ResolutionTier::Hd);
        assert_eq!("vga".parse::<ResolutionTier>().unwrap(), ResolutionTier::Vga);
        assert!("4k".parse::<ResolutionTier>().is_err());
    }

    #[test]
    fn test_facing_parsing() {
        assert_eq!("rear".parse::<FacingMode>().unwrap(), FacingMode::Environment);
        assert_eq!("user".parse::<FacingMode>().unwrap(), FacingMode::User);
        assert!("sideways".parse::<FacingMode>().is_err());
    }

    #[test]
    fn test_camera_id_display() {
        assert_eq!(CameraId::Facing(FacingMode::Environment).to_string(), "environment");
        assert_eq!(CameraId::Device("cam-1".into()).to_string(), "cam-1");
        assert_eq!(CameraId::Device("cam-1".into()).device_id(), Some("cam-1"));
    }
}
