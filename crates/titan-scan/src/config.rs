//! # Scanner Configuration
//!
//! Configuration management for the scan pipeline.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TITAN_SCAN_TIER=vga                                                │
//! │     TITAN_SCAN_COOLDOWN_MS=1000                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/scanner.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.titan.pos/scanner.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     HD preferred, rear camera, 800ms cooldown, 0.8 fuzzy threshold     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [camera]
//! preferred_tier = "hd"     # hd | vga | qvga (advisory starting rung)
//! facing = "environment"    # environment | user
//!
//! [decode]
//! cooldown_ms = 800
//! resume_delay_ms = 1200
//!
//! [resolver]
//! fuzzy_threshold = 0.8
//! min_containment_len = 4
//! min_overlap_len = 6
//!
//! [bootstrap]
//! library_load_timeout_ms = 2000
//! warm_permission = true
//!
//! [viewport]
//! max_zoom = 3.0
//! zoom_step = 0.25
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use titan_scan_core::{
    FacingMode, ResolutionTier, ResolverSettings, DEFAULT_COOLDOWN_MS,
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_LIBRARY_LOAD_TIMEOUT_MS, DEFAULT_MAX_ZOOM, MIN_ZOOM,
    ZOOM_STEP,
};

use crate::error::{PipelineError, PipelineResult};

// =============================================================================
// Camera Settings
// =============================================================================

/// Which camera to open and how hard to push it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraSettings {
    /// First rung of the resolution ladder. Advisory: the ladder still
    /// walks down from here when the device rejects it.
    #[serde(default)]
    pub preferred_tier: ResolutionTier,

    /// Facing mode used until a concrete device has been chosen.
    #[serde(default)]
    pub facing: FacingMode,
}

// =============================================================================
// Decode Settings
// =============================================================================

/// Frame handling timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeSettings {
    /// Identical codes within this window are suppressed (milliseconds).
    #[serde(default = "default_cooldown")]
    pub cooldown_ms: u64,

    /// Pause after a successful scan before decoding resumes (milliseconds).
    #[serde(default = "default_resume_delay")]
    pub resume_delay_ms: u64,

    /// Freeze the preview during the post-scan pause.
    #[serde(default)]
    pub pause_video: bool,
}

fn default_cooldown() -> u64 {
    DEFAULT_COOLDOWN_MS
}

fn default_resume_delay() -> u64 {
    1200
}

impl Default for DecodeSettings {
    fn default() -> Self {
        DecodeSettings {
            cooldown_ms: default_cooldown(),
            resume_delay_ms: default_resume_delay(),
            pause_video: false,
        }
    }
}

// =============================================================================
// Resolver Settings
// =============================================================================

/// Catalog matching thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSection {
    /// A fuzzy window must match strictly more than this share of digits.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Shortest code tried against prefix/suffix/substring passes.
    #[serde(default = "default_min_containment")]
    pub min_containment_len: usize,

    /// Codes must be longer than this for the sliding-window pass.
    #[serde(default = "default_min_overlap")]
    pub min_overlap_len: usize,
}

fn default_fuzzy_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}

fn default_min_containment() -> usize {
    4
}

fn default_min_overlap() -> usize {
    6
}

impl Default for ResolverSection {
    fn default() -> Self {
        ResolverSection {
            fuzzy_threshold: default_fuzzy_threshold(),
            min_containment_len: default_min_containment(),
            min_overlap_len: default_min_overlap(),
        }
    }
}

impl ResolverSection {
    pub fn to_settings(&self) -> ResolverSettings {
        ResolverSettings {
            fuzzy_threshold: self.fuzzy_threshold,
            min_containment_len: self.min_containment_len,
            min_overlap_len: self.min_overlap_len,
        }
    }
}

// =============================================================================
// Bootstrap Settings
// =============================================================================

/// Warm-up behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// How long a session start waits for the engine (milliseconds).
    #[serde(default = "default_load_timeout")]
    pub library_load_timeout_ms: u64,

    /// Probe camera permission during warm-up.
    #[serde(default = "default_true")]
    pub warm_permission: bool,
}

fn default_load_timeout() -> u64 {
    DEFAULT_LIBRARY_LOAD_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        BootstrapSettings {
            library_load_timeout_ms: default_load_timeout(),
            warm_permission: true,
        }
    }
}

// =============================================================================
// Viewport Settings
// =============================================================================

/// Digital zoom limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportSettings {
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
}

fn default_max_zoom() -> f64 {
    DEFAULT_MAX_ZOOM
}

fn default_zoom_step() -> f64 {
    ZOOM_STEP
}

impl Default for ViewportSettings {
    fn default() -> Self {
        ViewportSettings {
            max_zoom: default_max_zoom(),
            zoom_step: default_zoom_step(),
        }
    }
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub camera: CameraSettings,

    #[serde(default)]
    pub decode: DecodeSettings,

    #[serde(default)]
    pub resolver: ResolverSection,

    #[serde(default)]
    pub bootstrap: BootstrapSettings,

    #[serde(default)]
    pub viewport: ViewportSettings,
}

impl ScannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> PipelineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> PipelineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| PipelineError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PipelineError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| PipelineError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> PipelineResult<()> {
        self.resolver.to_settings().validate()?;

        if self.bootstrap.library_load_timeout_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "library_load_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.viewport.max_zoom < MIN_ZOOM {
            return Err(PipelineError::InvalidConfig(format!(
                "max_zoom must be at least {}, got {}",
                MIN_ZOOM, self.viewport.max_zoom
            )));
        }

        if self.viewport.zoom_step <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "zoom_step must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(tier) = std::env::var("TITAN_SCAN_TIER") {
            match tier.parse() {
                Ok(parsed) => {
                    debug!(tier = %tier, "Overriding preferred tier from environment");
                    self.camera.preferred_tier = parsed;
                }
                Err(_) => warn!(tier = %tier, "Unknown resolution tier in environment"),
            }
        }

        if let Ok(facing) = std::env::var("TITAN_SCAN_FACING") {
            if let Ok(parsed) = facing.parse() {
                self.camera.facing = parsed;
            }
        }

        if let Ok(ms) = std::env::var("TITAN_SCAN_COOLDOWN_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                debug!(cooldown_ms = ms, "Overriding cooldown from environment");
                self.decode.cooldown_ms = ms;
            }
        }

        if let Ok(threshold) = std::env::var("TITAN_SCAN_FUZZY_THRESHOLD") {
            if let Ok(t) = threshold.parse::<f64>() {
                self.resolver.fuzzy_threshold = t;
            }
        }

        if let Ok(ms) = std::env::var("TITAN_SCAN_LOAD_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse::<u64>() {
                self.bootstrap.library_load_timeout_ms = ms;
            }
        }

        if let Ok(warm) = std::env::var("TITAN_SCAN_WARM_PERMISSION") {
            match warm.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.bootstrap.warm_permission = true,
                "0" | "false" | "no" => self.bootstrap.warm_permission = false,
                _ => warn!(value = %warm, "Unknown TITAN_SCAN_WARM_PERMISSION value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "titan", "pos")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.decode.cooldown_ms)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.decode.resume_delay_ms)
    }

    pub fn library_load_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap.library_load_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert_eq!(config.camera.preferred_tier, ResolutionTier::Hd);
        assert_eq!(config.camera.facing, FacingMode::Environment);
        assert_eq!(config.decode.cooldown_ms, 800);
        assert_eq!(config.resolver.fuzzy_threshold, 0.8);
        assert_eq!(config.library_load_timeout(), Duration::from_millis(2000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [camera]
            preferred_tier = "vga"

            [decode]
            cooldown_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.preferred_tier, ResolutionTier::Vga);
        assert_eq!(config.decode.cooldown_ms, 1500);
        assert_eq!(config.decode.resume_delay_ms, 1200);
        assert!(config.bootstrap.warm_permission);
        assert_eq!(config.viewport.max_zoom, 3.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();

        config.resolver.fuzzy_threshold = 1.5;
        assert!(config.validate().unwrap_err().is_config_error());

        config.resolver.fuzzy_threshold = 0.8;
        config.bootstrap.library_load_timeout_ms = 0;
        assert!(config.validate().is_err());

        config.bootstrap.library_load_timeout_ms = 2000;
        config.viewport.max_zoom = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("titan-scan-missing-config.toml");
        let _ = std::fs::remove_file(&path);
        let config = ScannerConfig::load_or_default(Some(path));
        assert_eq!(config.decode.resume_delay_ms, 1200);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir()
            .join(format!("titan-scan-{}", std::process::id()))
            .join("scanner.toml");
        let mut config = ScannerConfig::default();
        config.camera.preferred_tier = ResolutionTier::Qvga;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[camera]"));
        assert!(contents.contains("[resolver]"));

        let loaded: ScannerConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.camera.preferred_tier, ResolutionTier::Qvga);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
