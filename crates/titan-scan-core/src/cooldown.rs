//! # Scan Cooldown
//!
//! Suppresses repeated reads of the same physical barcode.
//!
//! A code held in front of the camera is decoded on many consecutive
//! frames. Without a cooldown each of those frames would add another unit
//! to the cart.
//!
//! ```text
//!  t=0ms     "8901030875071"  ──► forwarded   (new code)
//!  t=120ms   "8901030875071"  ──► suppressed  (same code, < 800ms)
//!  t=500ms   "8901030875071"  ──► suppressed
//!  t=650ms   "4006381333931"  ──► forwarded   (different code)
//!  t=1600ms  "4006381333931"  ──► forwarded   (window elapsed)
//! ```
//!
//! The window is measured from the last *forwarded* read, so a code held
//! steadily in frame is accepted again once per window.

use chrono::{DateTime, Duration, Utc};

use crate::DEFAULT_COOLDOWN_MS;

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownVerdict {
    /// Pass the code on to the resolver.
    Forward,
    /// Same code inside the window; drop silently.
    Suppress,
}

/// Cooldown bookkeeping for one session.
#[derive(Debug, Clone)]
pub struct ScanCooldown {
    last_code: Option<String>,
    last_timestamp: Option<DateTime<Utc>>,
    window: Duration,
}

impl Default for ScanCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}

impl ScanCooldown {
    /// Creates a cooldown with the given window in milliseconds.
    pub fn new(window_ms: u64) -> Self {
        ScanCooldown {
            last_code: None,
            last_timestamp: None,
            window: Duration::milliseconds(window_ms as i64),
        }
    }

    /// Window length in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window.num_milliseconds().max(0) as u64
    }

    /// Last forwarded code, if any.
    pub fn last_code(&self) -> Option<&str> {
        self.last_code.as_deref()
    }

    /// Checks a normalized code and records it if forwarded.
    pub fn check(&mut self, code: &str, at: DateTime<Utc>) -> CooldownVerdict {
        if let (Some(last), Some(last_at)) = (&self.last_code, self.last_timestamp) {
            // Out-of-order timestamps count as zero elapsed time
            if last == code && at.signed_duration_since(last_at) < self.window {
                return CooldownVerdict::Suppress;
            }
        }

        self.last_code = Some(code.to_string());
        self.last_timestamp = Some(at);
        CooldownVerdict::Forward
    }

    /// Forgets the last code (on session stop).
    pub fn reset(&mut self) {
        self.last_code = None;
        self.last_timestamp = None;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
