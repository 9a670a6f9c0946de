//! # Frame Decode Adapter
//!
//! Turns raw engine callbacks into decisions the controller acts on.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  FrameSignal::Decoded(text)                                             │
//! │     │                                                                   │
//! │     ├── wrong session / not scanning ──► Dropped                        │
//! │     ▼                                                                   │
//! │  normalize(text) ── None ──────────────► Unreadable  (silent)           │
//! │     ▼                                                                   │
//! │  cooldown.check(code) ── Suppress ─────► Suppressed  (silent)           │
//! │     ▼                                                                   │
//! │  resolver.resolve(code) ── None ───────► NotFound    (toast)            │
//! │     ▼                                                                   │
//! │  Matched(product)  ──► cart, then pause/resume                          │
//! │                                                                         │
//! │  FrameSignal::FrameError(msg)                                           │
//! │     ├── permission wording ────────────► PermissionRevoked              │
//! │     └── anything else ─────────────────► Noise                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cooldown runs on the normalized code, so `"89-0103-087507"` and
//! `"890103087507"` count as the same physical barcode.

use chrono::{DateTime, Utc};

use titan_scan_core::normalizer::normalize_detailed;
use titan_scan_core::{
    CooldownVerdict, DecodeEvent, ProductCatalog, ProductMatch, Resolver, ScanCooldown,
    ScanSession, SessionState,
};

use crate::engine::FrameSignal;
use crate::error::is_permission_message;

/// Why a signal was discarded before processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Signal belongs to a session that has since ended or restarted.
    StaleSession,
    /// Decoding is paused or the camera is switching.
    NotScanning,
}

/// What the controller should do with one frame signal.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome<P> {
    Matched(ProductMatch<P>),
    NotFound { code: String },
    Unreadable { raw: String },
    Suppressed { code: String },
    PermissionRevoked { message: String },
    Noise,
    Dropped(DropReason),
}

/// Normalizer + cooldown + resolver for the live session.
pub struct FrameDecodeAdapter<C> {
    resolver: Resolver<C>,
    cooldown: ScanCooldown,
}

impl<C: ProductCatalog> FrameDecodeAdapter<C> {
    pub fn new(resolver: Resolver<C>, cooldown: ScanCooldown) -> Self {
        FrameDecodeAdapter { resolver, cooldown }
    }

    pub fn resolver(&self) -> &Resolver<C> {
        &self.resolver
    }

    /// Forgets the last forwarded code.
    pub fn reset_cooldown(&mut self) {
        self.cooldown.reset();
    }

    /// Classifies a signal against the current session.
    pub fn process(
        &mut self,
        signal: &FrameSignal,
        session: &ScanSession,
        at: DateTime<Utc>,
    ) -> FrameOutcome<C::Product> {
        if signal.session_id() != session.id {
            return FrameOutcome::Dropped(DropReason::StaleSession);
        }

        match signal {
            FrameSignal::FrameError { message, .. } => {
                if session.state.is_live() && is_permission_message(message) {
                    FrameOutcome::PermissionRevoked {
                        message: message.clone(),
                    }
                } else {
                    FrameOutcome::Noise
                }
            }
            FrameSignal::Decoded { text, session_id } => {
                if session.state != SessionState::Scanning {
                    return FrameOutcome::Dropped(DropReason::NotScanning);
                }
                let event = DecodeEvent {
                    raw_text: text.clone(),
                    timestamp: at,
                    session_id: session_id.clone(),
                };
                self.on_decoded(&event)
            }
        }
    }

    /// Runs a decode event through normalize, cooldown and resolve.
    pub fn on_decoded(&mut self, event: &DecodeEvent) -> FrameOutcome<C::Product> {
        let Some(normalized) = normalize_detailed(&event.raw_text) else {
            return FrameOutcome::Unreadable {
                raw: event.raw_text.clone(),
            };
        };

        tracing::trace!(
            code = %normalized.code,
            strategy = normalized.strategy,
            symbology = ?normalized.symbology(),
            "Normalized decode"
        );

        if self.cooldown.check(&normalized.code, event.timestamp) == CooldownVerdict::Suppress {
            return FrameOutcome::Suppressed {
                code: normalized.code,
            };
        }

        match self.resolver.resolve(&normalized.code) {
            Some(found) => FrameOutcome::Matched(found),
            None => FrameOutcome::NotFound {
                code: normalized.code,
            },
        }
    }
}
