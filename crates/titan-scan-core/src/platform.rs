//! # Platform Traits
//!
//! Browser family, mobile flag and decoding capabilities derived from the
//! host's user-agent string. Sampled once per process by the bootstrap.
//!
//! ```text
//!  "Mozilla/5.0 (Linux; Android 13; SM-A536B) ... Chrome/120 Mobile Safari"
//!        │
//!        ▼
//!  PlatformTraits { family: Chrome, is_mobile: true,
//!                   native_detector: true, symbologies: [EAN-13, ...] }
//! ```
//!
//! Order matters when sniffing: Edge and Samsung Internet also say
//! "Chrome", and Chrome also says "Safari".

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Symbology;

/// Browser engine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BrowserFamily {
    Chrome,
    Edge,
    Firefox,
    Safari,
    SamsungInternet,
    Other,
}

impl BrowserFamily {
    /// Chromium-based browsers ship the native `BarcodeDetector`.
    pub fn is_chromium(&self) -> bool {
        matches!(
            self,
            BrowserFamily::Chrome | BrowserFamily::Edge | BrowserFamily::SamsungInternet
        )
    }
}

/// Host capabilities relevant to scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlatformTraits {
    pub family: BrowserFamily,
    pub is_mobile: bool,
    /// Native barcode detection is worth asking the engine for.
    pub native_detector: bool,
    pub symbologies: Vec<Symbology>,
}

impl Default for PlatformTraits {
    fn default() -> Self {
        PlatformTraits {
            family: BrowserFamily::Other,
            is_mobile: false,
            native_detector: false,
            symbologies: Symbology::RETAIL.to_vec(),
        }
    }
}

impl PlatformTraits {
    /// Derives traits from a user-agent string.
    pub fn from_user_agent(ua: &str) -> Self {
        let family = detect_family(ua);
        let is_mobile = detect_mobile(ua);
        let is_ios = ["iPhone", "iPad", "iPod"].iter().any(|t| ua.contains(t));

        // Every iOS browser is WebKit underneath, whatever it calls itself
        let native_detector = family.is_chromium() && !is_ios;

        PlatformTraits {
            family,
            is_mobile,
            native_detector,
            symbologies: Symbology::RETAIL.to_vec(),
        }
    }
}

fn detect_family(ua: &str) -> BrowserFamily {
    if ua.contains("Edg/") || ua.contains("EdgA/") || ua.contains("EdgiOS/") {
        BrowserFamily::Edge
    } else if ua.contains("SamsungBrowser/") {
        BrowserFamily::SamsungInternet
    } else if ua.contains("Firefox/") || ua.contains("FxiOS/") {
        BrowserFamily::Firefox
    } else if ua.contains("Chrome/") || ua.contains("CriOS/") || ua.contains("Chromium/") {
        BrowserFamily::Chrome
    } else if ua.contains("Safari/") {
        BrowserFamily::Safari
    } else {
        BrowserFamily::Other
    }
}

fn detect_mobile(ua: &str) -> bool {
    ["Android", "iPhone", "iPad", "iPod", "Mobile"]
        .iter()
        .any(|token| ua.contains(token))
}
