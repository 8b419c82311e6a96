//! Pointer device handling.
//!
//! This module implements handling of pointer devices over the shader
//! canvas. A [`PointerTracker`] receives plain [`PointerInput`] data built by
//! the platform layer from DOM pointer events, tracks a single active pointer
//! identity, and maps positions from CSS pixels into backing-store pixels
//! with a bottom-left origin (the `gl_FragCoord` convention).
//!
//! The tracker itself never touches the DOM. Pointer capture side effects are
//! returned as [`CaptureRequest`] values and applied by the caller, which
//! keeps the tracker usable with synthetic input.

use std::str::FromStr;

/// Class of device a pointer event originates from.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PointerKind {
    /// A mouse. Hover movement is meaningful without a button press.
    Mouse,
    /// A finger on a touchscreen.
    Touch,
    /// A stylus.
    Pen,
}

impl FromStr for PointerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<PointerKind, String> {
        // These are the values taken by PointerEvent.pointerType.
        match s {
            "mouse" => Ok(PointerKind::Mouse),
            "touch" => Ok(PointerKind::Touch),
            "pen" => Ok(PointerKind::Pen),
            _ => Err(format!("unknown pointer type '{s}'")),
        }
    }
}

/// A pointer event reduced to plain data.
///
/// The position is relative to the canvas top-left corner, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    /// Pointer identity, as in `PointerEvent.pointerId`.
    pub id: i32,
    /// Device class of the pointer.
    pub kind: PointerKind,
    /// X position relative to the canvas, in CSS pixels.
    pub x: f64,
    /// Y position relative to the canvas, in CSS pixels (top-left origin).
    pub y: f64,
}

/// Pointer capture side effect requested by the tracker.
///
/// The platform layer translates these into `setPointerCapture` and
/// `releasePointerCapture` calls on the canvas.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CaptureRequest {
    /// Acquire capture for the given pointer id.
    Acquire(i32),
    /// Release capture for the given pointer id.
    Release(i32),
}

/// Result of feeding one pointer event to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerUpdate {
    /// Mapped position in backing-store pixels, bottom-left origin.
    pub position: (f32, f32),
    /// Capture operation the platform layer must perform, if any.
    pub capture: Option<CaptureRequest>,
}

/// Phase of a pointer event.
///
/// Leave and cancel events are folded into [`PointerPhase::Up`]; all three
/// end the interaction of the active identity.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PointerPhase {
    /// Pointer down.
    Down,
    /// Pointer move.
    Move,
    /// Pointer up, leave or cancel.
    Up,
}

/// Pointer tracker.
///
/// Tracks at most one active pointer identity. While an identity is active,
/// events from any other pointer are inert; a second finger placed on the
/// canvas does nothing until the first is lifted.
#[derive(Debug, Default)]
pub struct PointerTracker {
    active: Option<i32>,
}

impl PointerTracker {
    /// Creates a new pointer tracker with no active pointer.
    pub fn new() -> PointerTracker {
        PointerTracker::default()
    }

    /// Returns `true` if a pointer identity is currently active.
    pub fn has_active_pointer(&self) -> bool {
        self.active.is_some()
    }

    /// Handler for the pointer down event.
    ///
    /// Records the pointer as the active identity and requests capture, so
    /// that subsequent move/up events are received even if the pointer leaves
    /// the canvas bounds. Ignored while another identity is active.
    pub fn on_down(&mut self, input: &PointerInput, map: &PointerMap) -> Option<PointerUpdate> {
        if self.active.is_some() {
            return None;
        }
        self.active = Some(input.id);
        Some(PointerUpdate {
            position: map.to_backing(input.x, input.y),
            capture: Some(CaptureRequest::Acquire(input.id)),
        })
    }

    /// Handler for the pointer move event.
    ///
    /// While an identity is active, only its own moves are forwarded. With no
    /// active identity, mouse hover is forwarded (hover is meaningful without
    /// a press) and touch/pen movement is inert.
    pub fn on_move(&mut self, input: &PointerInput, map: &PointerMap) -> Option<PointerUpdate> {
        let forward = match self.active {
            Some(id) => id == input.id,
            None => matches!(input.kind, PointerKind::Mouse),
        };
        forward.then(|| PointerUpdate {
            position: map.to_backing(input.x, input.y),
            capture: None,
        })
    }

    /// Handler for the pointer up, leave and cancel events.
    ///
    /// For the active identity this forwards a final position, requests the
    /// capture release and clears the active identity. Events from any other
    /// pointer are ignored.
    pub fn on_up(&mut self, input: &PointerInput, map: &PointerMap) -> Option<PointerUpdate> {
        if self.active != Some(input.id) {
            return None;
        }
        self.active = None;
        Some(PointerUpdate {
            position: map.to_backing(input.x, input.y),
            capture: Some(CaptureRequest::Release(input.id)),
        })
    }

    /// Dispatches an event to the handler for its phase.
    pub fn on_event(
        &mut self,
        phase: PointerPhase,
        input: &PointerInput,
        map: &PointerMap,
    ) -> Option<PointerUpdate> {
        match phase {
            PointerPhase::Down => self.on_down(input, map),
            PointerPhase::Move => self.on_move(input, map),
            PointerPhase::Up => self.on_up(input, map),
        }
    }
}

/// Coordinate mapping between the displayed canvas and its backing store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMap {
    /// Displayed canvas size in CSS pixels.
    pub css_size: (f64, f64),
    /// Backing-store size in device pixels.
    pub backing_size: (u32, u32),
}

impl PointerMap {
    /// Maps a CSS-relative position into backing-store pixels.
    ///
    /// The position is scaled by the backing-store to CSS size ratio and the
    /// y axis is flipped so the origin is at the bottom-left corner.
    pub fn to_backing(&self, x: f64, y: f64) -> (f32, f32) {
        let (css_w, css_h) = self.css_size;
        let (backing_w, backing_h) = self.backing_size;
        if css_w <= 0.0 || css_h <= 0.0 {
            return (0.0, 0.0);
        }
        let bx = x / css_w * f64::from(backing_w);
        let by = f64::from(backing_h) - y / css_h * f64::from(backing_h);
        (bx as f32, by as f32)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn map_480() -> PointerMap {
        PointerMap {
            css_size: (640.0, 480.0),
            backing_size: (640, 480),
        }
    }

    fn touch(id: i32, x: f64, y: f64) -> PointerInput {
        PointerInput {
            id,
            kind: PointerKind::Touch,
            x,
            y,
        }
    }

    fn mouse(id: i32, x: f64, y: f64) -> PointerInput {
        PointerInput {
            id,
            kind: PointerKind::Mouse,
            x,
            y,
        }
    }

    #[test]
    fn down_move_up_flips_y() {
        let map = map_480();
        let mut tracker = PointerTracker::new();
        let down = tracker.on_down(&touch(7, 10.0, 20.0), &map).unwrap();
        assert_eq!(down.position, (10.0, 460.0));
        assert_eq!(down.capture, Some(CaptureRequest::Acquire(7)));
        let moved = tracker.on_move(&touch(7, 30.0, 40.0), &map).unwrap();
        assert_eq!(moved.position, (30.0, 440.0));
        assert_eq!(moved.capture, None);
        let up = tracker.on_up(&touch(7, 50.0, 60.0), &map).unwrap();
        assert_eq!(up.position, (50.0, 420.0));
        assert_eq!(up.capture, Some(CaptureRequest::Release(7)));
        assert!(!tracker.has_active_pointer());
    }

    #[test]
    fn second_pointer_is_inert_while_first_active() {
        let map = map_480();
        let mut tracker = PointerTracker::new();
        assert!(tracker.on_down(&touch(1, 0.0, 0.0), &map).is_some());
        assert!(tracker.on_down(&touch(2, 5.0, 5.0), &map).is_none());
        assert!(tracker.on_move(&touch(2, 6.0, 6.0), &map).is_none());
        assert!(tracker.on_up(&touch(2, 6.0, 6.0), &map).is_none());
        assert!(tracker.has_active_pointer());
        // Releasing the first pointer frees the slot for the second.
        assert!(tracker.on_up(&touch(1, 1.0, 1.0), &map).is_some());
        assert!(tracker.on_down(&touch(2, 5.0, 5.0), &map).is_some());
    }

    #[test]
    fn mouse_hover_forwards_without_press() {
        let map = map_480();
        let mut tracker = PointerTracker::new();
        let hover = tracker.on_move(&mouse(1, 320.0, 240.0), &map).unwrap();
        assert_eq!(hover.position, (320.0, 240.0));
        assert!(!tracker.has_active_pointer());
    }

    #[test]
    fn touch_hover_is_inert() {
        let map = map_480();
        let mut tracker = PointerTracker::new();
        assert!(tracker.on_move(&touch(1, 320.0, 240.0), &map).is_none());
    }

    #[test]
    fn mouse_move_ignored_while_touch_active() {
        let map = map_480();
        let mut tracker = PointerTracker::new();
        assert!(tracker.on_down(&touch(1, 0.0, 0.0), &map).is_some());
        assert!(tracker.on_move(&mouse(2, 10.0, 10.0), &map).is_none());
    }

    #[test]
    fn mapping_scales_to_backing_store() {
        // Canvas displayed at 300x150 CSS px with a 2x backing store.
        let map = PointerMap {
            css_size: (300.0, 150.0),
            backing_size: (600, 300),
        };
        assert_eq!(map.to_backing(150.0, 75.0), (300.0, 150.0));
        assert_eq!(map.to_backing(0.0, 0.0), (0.0, 300.0));
        assert_eq!(map.to_backing(300.0, 150.0), (600.0, 0.0));
    }

    #[test]
    fn zero_css_size_maps_to_origin() {
        let map = PointerMap {
            css_size: (0.0, 0.0),
            backing_size: (600, 300),
        };
        assert_eq!(map.to_backing(10.0, 10.0), (0.0, 0.0));
    }

    #[test]
    fn pointer_kind_parse() {
        assert_eq!("mouse".parse(), Ok(PointerKind::Mouse));
        assert_eq!("touch".parse(), Ok(PointerKind::Touch));
        assert_eq!("pen".parse(), Ok(PointerKind::Pen));
        assert!("gamepad".parse::<PointerKind>().is_err());
    }
}
