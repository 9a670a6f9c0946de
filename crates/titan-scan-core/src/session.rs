//! # Session State Machine
//!
//! The camera lifecycle as a pure function of (current state, event).
//! No timers, no engine calls: the async controller in `titan-scan` feeds
//! events in and performs the side effects the resulting state demands.
//!
//! ## State Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────┐  Start   ┌──────────────┐ CameraAcquired ┌──────────┐       │
//! │   │ Idle │ ───────► │ Initializing │ ─────────────► │ Scanning │◄──┐   │
//! │   └──────┘          └──────┬───────┘                └──┬────┬──┘   │   │
//! │                        ▲   │ Fail(kind)        Pause   │    │      │   │
//! │                        │   ▼                           ▼    │  Resume  │
//! │                        │ ┌───────┐              ┌────────┐  │      │   │
//! │           Start/Retry  │ │ Error │              │ Paused │──┼──────┘   │
//! │      ┌─────────────────┤ └───────┘              └───┬────┘  │          │
//! │      │                 │                            │       │          │
//! │  ┌───┴─────┐           │ SwitchTargetChosen  SwitchRequested│          │
//! │  │ Stopped │           │   ┌─────────────────┐      │       │          │
//! │  └─────────┘           └───│ SwitchingCamera │◄─────┴───────┘          │
//! │      ▲                     └─────────────────┘                         │
//! │      │ Stop (from any non-Idle state)                                   │
//! │                                                                         │
//! │  PermissionRevoked: any live state → Error(PermissionDenied)           │
//! │  Start while Initializing/Scanning/Paused/SwitchingCamera: ignored     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{ScanError, ScanErrorKind, ScanResult};
use crate::types::{CameraDescriptor, ResolutionTier};

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
pub enum SessionState {
    #[default]
    Idle,
    Initializing,
    Scanning,
    Paused,
    SwitchingCamera,
    Error(ScanErrorKind),
    Stopped,
}

impl SessionState {
    /// States in which a start request is accepted.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Stopped | SessionState::Error(_)
        )
    }

    /// States that hold (or are acquiring) a camera stream.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SessionState::Initializing
                | SessionState::Scanning
                | SessionState::Paused
                | SessionState::SwitchingCamera
        )
    }

    /// Returns the error kind if in the error state.
    pub fn error_kind(&self) -> Option<ScanErrorKind> {
        match self {
            SessionState::Error(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Initializing => write!(f, "initializing"),
            SessionState::Scanning => write!(f, "scanning"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::SwitchingCamera => write!(f, "switching_camera"),
            SessionState::Error(kind) => write!(f, "error({})", kind),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

// =============================================================================
// Session Events
// =============================================================================

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    CameraAcquired,
    Fail(ScanErrorKind),
    Pause,
    Resume,
    SwitchRequested,
    SwitchTargetChosen,
    PermissionRevoked,
    Stop,
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State changed.
    Moved {
        from: SessionState,
        to: SessionState,
    },
    /// Event accepted but has no effect in this state.
    Ignored(SessionState),
}

impl Transition {
    /// State after the transition.
    pub fn state(&self) -> SessionState {
        match self {
            Transition::Moved { to, .. } => *to,
            Transition::Ignored(state) => *state,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Transition::Ignored(_))
    }
}

/// The transition table.
///
/// Pure: the same state and event always produce the same result.
pub fn transition(state: SessionState, event: SessionEvent) -> ScanResult<Transition> {
    use SessionEvent as E;
    use SessionState as S;

    let to = match (state, event) {
        // Re-entrancy guard: collapse into the in-flight attempt
        (S::Initializing | S::Scanning | S::Paused | S::SwitchingCamera, E::Start) => {
            return Ok(Transition::Ignored(state));
        }
        (S::Idle | S::Stopped | S::Error(_), E::Start) => S::Initializing,

        (S::Initializing, E::CameraAcquired) => S::Scanning,
        (S::Initializing | S::SwitchingCamera, E::Fail(kind)) => S::Error(kind),

        (S::Scanning, E::Pause) => S::Paused,
        (S::Paused, E::Pause) => return Ok(Transition::Ignored(state)),
        (S::Paused, E::Resume) => S::Scanning,
        (S::Scanning, E::Resume) => return Ok(Transition::Ignored(state)),

        (S::Scanning | S::Paused, E::SwitchRequested) => S::SwitchingCamera,
        (S::SwitchingCamera, E::SwitchTargetChosen) => S::Initializing,

        (S::Initializing | S::Scanning | S::Paused | S::SwitchingCamera, E::PermissionRevoked) => {
            S::Error(ScanErrorKind::PermissionDenied)
        }

        (S::Idle, E::Stop) => {
            return Err(ScanError::InvalidTransition { from: state, event });
        }
        (_, E::Stop) => S::Stopped,

        _ => return Err(ScanError::InvalidTransition { from: state, event }),
    };

    Ok(Transition::Moved { from: state, to })
}

// =============================================================================
// Scan Session
// =============================================================================

/// The single live scan session owned by a controller.
///
/// ## Lifetime
/// - Created by a start request (new id, `started_at` set)
/// - Survives a camera switch (same id, new camera)
/// - Reset by stop; a later start creates a fresh id
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: String,
    pub state: SessionState,
    pub camera: Option<CameraDescriptor>,
    pub resolution_tier: Option<ResolutionTier>,
    pub started_at: Option<DateTime<Utc>>,
    /// Manual retries since the last successful start.
    pub retry_count: u32,
}

impl Default for ScanSession {
    fn default() -> Self {
        ScanSession {
            id: Uuid::new_v4().to_string(),
            state: SessionState::Idle,
            camera: None,
            resolution_tier: None,
            started_at: None,
            retry_count: 0,
        }
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event, updating the state on success.
    pub fn apply(&mut self, event: SessionEvent) -> ScanResult<Transition> {
        let result = transition(self.state, event)?;
        if let Transition::Moved { from, to } = result {
            self.on_moved(from, to, event);
        }
        Ok(result)
    }

    fn on_moved(&mut self, from: SessionState, to: SessionState, event: SessionEvent) {
        self.state = to;
        match (from, event) {
            // A fresh start (not a switch) begins a new session identity
            (SessionState::Idle | SessionState::Stopped | SessionState::Error(_), SessionEvent::Start) => {
                self.id = Uuid::new_v4().to_string();
                self.started_at = Some(Utc::now());
                self.resolution_tier = None;
            }
            (_, SessionEvent::CameraAcquired) => {
                self.retry_count = 0;
            }
            (_, SessionEvent::Stop) => {
                self.camera = None;
                self.resolution_tier = None;
                self.started_at = None;
                self.retry_count = 0;
            }
            _ => {}
        }
    }
}

// =============================================================================
// Tier Ladder
// =============================================================================

/// Resolution tiers for one acquisition, consumed best-first.
///
/// Starts at the preferred tier and walks down; a tier is never handed out
/// twice, so the ladder ends after at most three attempts.
#[derive(Debug, Clone)]
pub struct TierLadder {
    next: Option<ResolutionTier>,
    attempted: Vec<ResolutionTier>,
}

impl TierLadder {
    /// Ladder starting at `preferred`.
    pub fn starting_at(preferred: ResolutionTier) -> Self {
        TierLadder {
            next: Some(preferred),
            attempted: Vec::with_capacity(ResolutionTier::ALL.len()),
        }
    }

    /// Tiers handed out so far.
    pub fn attempted(&self) -> &[ResolutionTier] {
        &self.attempted
    }

    /// Error describing an exhausted ladder.
    pub fn exhausted_error(&self) -> ScanError {
        ScanError::ConfigUnsupported {
            attempted: self.attempted.clone(),
        }
    }
}

impl Iterator for TierLadder {
    type Item = ResolutionTier;

    fn next(&mut self) -> Option<ResolutionTier> {
        let tier = self.next.take()?;
        if self.attempted.contains(&tier) {
            return None;
        }
        self.attempted.push(tier);
        self.next = tier.next();
        Some(tier)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SessionState; 7] = [
        SessionState::Idle,
        SessionState::Initializing,
        SessionState::Scanning,
        SessionState::Paused,
        SessionState::SwitchingCamera,
        SessionState::Error(ScanErrorKind::PermissionDenied),
        SessionState::Stopped,
    ];

    #[test]
    fn test_happy_path() {
        let mut session = ScanSession::new();
        session.apply(SessionEvent::Start).unwrap();
        assert_eq!(session.state, SessionState::Initializing);
        assert!(session.started_at.is_some());
        session.apply(SessionEvent::CameraAcquired).unwrap();
        assert_eq!(session.state, SessionState::Scanning);
        session.apply(SessionEvent::Pause).unwrap();
        session.apply(SessionEvent::Resume).unwrap();
        assert_eq!(session.state, SessionState::Scanning);
        session.apply(SessionEvent::Stop).unwrap();
        assert_eq!(session.state, SessionState::Stopped);
        assert!(session.started_at.is_none());
    }

    #[test]
    fn test_start_is_reentrancy_guarded() {
        for state in [
            SessionState::Initializing,
            SessionState::Scanning,
            SessionState::Paused,
            SessionState::SwitchingCamera,
        ] {
            let t = transition(state, SessionEvent::Start).unwrap();
            assert_eq!(t, Transition::Ignored(state));
        }
    }

    #[test]
    fn test_start_allowed_from_terminal_states() {
        for state in ALL_STATES.into_iter().filter(|s| s.can_start()) {
            assert_eq!(
                transition(state, SessionEvent::Start).unwrap().state(),
                SessionState::Initializing
            );
        }
    }

    #[test]
    fn test_stop_valid_from_any_non_idle_state() {
        for state in ALL_STATES {
            let result = transition(state, SessionEvent::Stop);
            if state == SessionState::Idle {
                assert!(result.is_err());
            } else {
                assert_eq!(result.unwrap().state(), SessionState::Stopped);
            }
        }
    }

    #[test]
    fn test_permission_revoked_mid_scan() {
        let t = transition(SessionState::Scanning, SessionEvent::PermissionRevoked).unwrap();
        assert_eq!(t.state(), SessionState::Error(ScanErrorKind::PermissionDenied));
        assert!(transition(SessionState::Stopped, SessionEvent::PermissionRevoked).is_err());
    }

    #[test]
    fn test_switch_path() {
        let t = transition(SessionState::Scanning, SessionEvent::SwitchRequested).unwrap();
        assert_eq!(t.state(), SessionState::SwitchingCamera);
        let t = transition(SessionState::SwitchingCamera, SessionEvent::SwitchTargetChosen).unwrap();
        assert_eq!(t.state(), SessionState::Initializing);
        assert!(transition(SessionState::Idle, SessionEvent::SwitchRequested).is_err());
    }

    #[test]
    fn test_invalid_edges_rejected() {
        assert!(transition(SessionState::Idle, SessionEvent::CameraAcquired).is_err());
        assert!(transition(SessionState::Scanning, SessionEvent::CameraAcquired).is_err());
        assert!(transition(SessionState::Stopped, SessionEvent::Resume).is_err());
        assert!(transition(SessionState::Scanning, SessionEvent::Fail(ScanErrorKind::ConfigUnsupported)).is_err());
    }

    #[test]
    fn test_switch_keeps_session_identity() {
        let mut session = ScanSession::new();
        session.apply(SessionEvent::Start).unwrap();
        session.apply(SessionEvent::CameraAcquired).unwrap();
        let id = session.id.clone();
        session.apply(SessionEvent::SwitchRequested).unwrap();
        session.apply(SessionEvent::SwitchTargetChosen).unwrap();
        session.apply(SessionEvent::CameraAcquired).unwrap();
        assert_eq!(session.id, id);

        session.apply(SessionEvent::Stop).unwrap();
        session.apply(SessionEvent::Start).unwrap();
        assert_ne!(session.id, id);
    }

    #[test]
    fn test_tier_ladder_from_hd() {
        let ladder: Vec<_> = TierLadder::starting_at(ResolutionTier::Hd).collect();
        assert_eq!(
            ladder,
            vec![ResolutionTier::Hd, ResolutionTier::Vga, ResolutionTier::Qvga]
        );
    }

    #[test]
    fn test_tier_ladder_never_exceeds_three_or_repeats() {
        for preferred in ResolutionTier::ALL {
            let mut ladder = TierLadder::starting_at(preferred);
            let tiers: Vec<_> = ladder.by_ref().collect();
            assert!(tiers.len() <= 3);
            let mut dedup = tiers.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), tiers.len());
            assert_eq!(tiers[0], preferred);
            assert_eq!(ladder.next(), None);
            assert_eq!(ladder.attempted(), tiers.as_slice());
        }
    }

    #[test]
    fn test_exhausted_error_lists_attempts() {
        let mut ladder = TierLadder::starting_at(ResolutionTier::Vga);
        while ladder.next().is_some() {}
        assert_eq!(
            ladder.exhausted_error(),
            ScanError::ConfigUnsupported {
                attempted: vec![ResolutionTier::Vga, ResolutionTier::Qvga]
            }
        );
    }
}
