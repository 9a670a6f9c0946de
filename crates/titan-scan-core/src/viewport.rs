//! # Viewport Transform
//!
//! Digital zoom and pan for the live preview. Purely a human aid for lining
//! up small or damaged codes; it never changes what the engine decodes.
//!
//! ## Pan Bounds
//! ```text
//!   factor = 2.0, viewport 400px wide
//!
//!   ┌──────────────── scaled content (800px) ────────────────┐
//!   │            ┌──── viewport (400px) ────┐                │
//!   │            │                          │                │
//!   │◄── 200px ─►│                          │◄─── 200px ────►│
//!   │            └──────────────────────────┘                │
//!   └────────────────────────────────────────────────────────┘
//!
//!   max |pan.x| = (factor - 1) × width / 2 = 200px
//!   factor = 1.0  →  no room to pan, pan is always (0, 0)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{DEFAULT_MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};

// =============================================================================
// Zoom State
// =============================================================================

/// Translation of the preview in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Pan {
    pub x: f64,
    pub y: f64,
}

/// Current zoom factor and pan offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ZoomState {
    pub factor: f64,
    pub pan: Pan,
}

impl Default for ZoomState {
    fn default() -> Self {
        ZoomState {
            factor: MIN_ZOOM,
            pan: Pan::default(),
        }
    }
}

impl ZoomState {
    /// Returns true when zoomed in far enough to pan.
    pub fn can_pan(&self) -> bool {
        self.factor > MIN_ZOOM
    }
}

/// Scale + translate transform for the preview element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Transform {
    /// CSS `transform` value.
    pub fn to_css(&self) -> String {
        format!(
            "scale({:.2}) translate({:.1}px, {:.1}px)",
            self.scale, self.translate_x, self.translate_y
        )
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Owns [`ZoomState`] and enforces its bounds.
#[derive(Debug, Clone)]
pub struct ViewportController {
    state: ZoomState,
    max_zoom: f64,
    step: f64,
    /// Preview size in CSS pixels.
    viewport: (f64, f64),
    dragging: bool,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ZOOM, ZOOM_STEP)
    }
}

impl ViewportController {
    /// Creates a controller with the given zoom ceiling and step.
    pub fn new(max_zoom: f64, step: f64) -> Self {
        ViewportController {
            state: ZoomState::default(),
            max_zoom: max_zoom.max(MIN_ZOOM),
            step,
            viewport: (0.0, 0.0),
            dragging: false,
        }
    }

    pub fn state(&self) -> ZoomState {
        self.state
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Updates the preview size, re-clamping the pan.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width.max(0.0), height.max(0.0));
        self.state.pan = self.clamp_pan(self.state.pan, self.state.factor);
    }

    /// One step in. Returns the new state.
    pub fn zoom_in(&mut self) -> ZoomState {
        self.set_factor(self.state.factor + self.step)
    }

    /// One step out. Returns the new state.
    pub fn zoom_out(&mut self) -> ZoomState {
        self.set_factor(self.state.factor - self.step)
    }

    /// Sets the factor (clamped), rescaling pan so it stays proportional to
    /// `factor - 1`.
    pub fn set_factor(&mut self, factor: f64) -> ZoomState {
        let old = self.state.factor;
        let new = factor.clamp(MIN_ZOOM, self.max_zoom);

        let pan = if new <= MIN_ZOOM || old <= MIN_ZOOM {
            Pan::default()
        } else {
            let ratio = (new - MIN_ZOOM) / (old - MIN_ZOOM);
            Pan {
                x: self.state.pan.x * ratio,
                y: self.state.pan.y * ratio,
            }
        };

        self.state = ZoomState {
            factor: new,
            pan: self.clamp_pan(pan, new),
        };
        if !self.state.can_pan() {
            self.dragging = false;
        }
        self.state
    }

    /// Back to 1.0 with no pan.
    pub fn reset(&mut self) -> ZoomState {
        self.state = ZoomState::default();
        self.dragging = false;
        self.state
    }

    /// Starts a pointer drag. Refused (returns false) at factor 1.0.
    pub fn begin_drag(&mut self) -> bool {
        if !self.state.can_pan() {
            return false;
        }
        self.dragging = true;
        true
    }

    /// Moves the preview by a pointer delta. No-op unless dragging.
    pub fn drag_by(&mut self, dx: f64, dy: f64) -> ZoomState {
        if self.dragging {
            let pan = Pan {
                x: self.state.pan.x + dx,
                y: self.state.pan.y + dy,
            };
            self.state.pan = self.clamp_pan(pan, self.state.factor);
        }
        self.state
    }

    /// Ends the drag. Returns true if a drag was active.
    pub fn end_drag(&mut self) -> bool {
        std::mem::replace(&mut self.dragging, false)
    }

    /// Transform for the host to apply.
    pub fn transform(&self) -> Transform {
        // translate() runs after scale(), so divide to get screen pixels
        Transform {
            scale: self.state.factor,
            translate_x: self.state.pan.x / self.state.factor,
            translate_y: self.state.pan.y / self.state.factor,
        }
    }

    fn clamp_pan(&self, pan: Pan, factor: f64) -> Pan {
        let (width, height) = self.viewport;
        let max_x = (factor - MIN_ZOOM).max(0.0) * width / 2.0;
        let max_y = (factor - MIN_ZOOM).max(0.0) * height / 2.0;
        Pan {
            x: pan.x.clamp(-max_x, max_x),
            y: pan.y.clamp(-max_y, max_y),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ViewportController {
        let mut c = ViewportController::default();
        c.set_viewport(400.0, 300.0);
        c
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut c = controller();
        assert_eq!(c.zoom_in().factor, 1.25);
        for _ in 0..20 {
            c.zoom_in();
        }
        assert_eq!(c.state().factor, 3.0);
        for _ in 0..20 {
            c.zoom_out();
        }
        assert_eq!(c.state().factor, 1.0);
    }

    #[test]
    fn test_no_pan_at_factor_one() {
        let mut c = controller();
        assert!(!c.begin_drag());
        c.drag_by(50.0, 50.0);
        assert_eq!(c.state().pan, Pan::default());
    }

    #[test]
    fn test_pan_bounded_by_factor() {
        let mut c = controller();
        c.set_factor(2.0);
        assert!(c.begin_drag());
        let state = c.drag_by(1000.0, -1000.0);
        assert_eq!(state.pan, Pan { x: 200.0, y: -150.0 });
        assert!(c.end_drag());
        assert!(!c.end_drag());
    }

    #[test]
    fn test_pan_rescales_with_zoom() {
        let mut c = controller();
        c.set_factor(3.0);
        c.begin_drag();
        c.drag_by(100.0, 50.0);
        c.end_drag();

        let state = c.set_factor(2.0);
        assert_eq!(state.pan, Pan { x: 50.0, y: 25.0 });

        let state = c.set_factor(1.0);
        assert_eq!(state.pan, Pan::default());
    }

    #[test]
    fn test_zoom_out_to_one_ends_drag() {
        let mut c = controller();
        c.set_factor(1.5);
        c.begin_drag();
        c.set_factor(1.0);
        assert!(!c.is_dragging());
    }

    #[test]
    fn test_transform_css() {
        let mut c = controller();
        c.set_factor(2.0);
        c.begin_drag();
        c.drag_by(40.0, -20.0);
        let t = c.transform();
        assert_eq!(t.scale, 2.0);
        assert_eq!(t.to_css(), "scale(2.00) translate(20.0px, -10.0px)");
    }

    #[test]
    fn test_reset() {
        let mut c = controller();
        c.set_factor(2.5);
        assert_eq!(c.reset(), ZoomState::default());
    }
}
