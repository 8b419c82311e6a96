//! Backing-store size management.
//!
//! This module computes the pixel dimensions of the canvas backing store from
//! the CSS size of the container, the device pixel ratio, and an optional
//! fixed-aspect constraint. Size changes are latched and handed to the render
//! loop once per frame through [`ResizeController::take_pending`], so that a
//! burst of resize notifications causes a single GPU viewport update.

use std::fmt;
use std::str::FromStr;

/// Aspect-ratio constraint for the rendered surface.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum AspectMode {
    /// The backing store follows the container dimensions directly.
    #[default]
    Free,
    /// The backing store is square, using the smaller container dimension.
    Square,
}

impl FromStr for AspectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<AspectMode, String> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(AspectMode::Free),
            "square" => Ok(AspectMode::Square),
            _ => Err(format!("unknown aspect mode '{s}'")),
        }
    }
}

impl fmt::Display for AspectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectMode::Free => write!(f, "free"),
            AspectMode::Square => write!(f, "square"),
        }
    }
}

/// Viewport specification for one canvas.
///
/// Holds the logical container size in CSS pixels, the device pixel ratio and
/// the aspect constraint, and derives the backing-store size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSpec {
    container: (f64, f64),
    device_pixel_ratio: f64,
    aspect: AspectMode,
}

impl ViewportSpec {
    /// CSS size of the rendered surface.
    ///
    /// Under [`AspectMode::Square`] this is the side length of the largest
    /// centered square that fits the container; under [`AspectMode::Free`] it
    /// is the container size itself. `None` while the container reports a
    /// zero dimension.
    pub fn css_size(&self) -> Option<(f64, f64)> {
        let (w, h) = self.container;
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        Some(match self.aspect {
            AspectMode::Free => (w, h),
            AspectMode::Square => {
                let side = w.min(h);
                (side, side)
            }
        })
    }

    /// Backing-store size in device pixels, at least 1x1.
    ///
    /// `None` while the container reports a zero dimension.
    pub fn backing_size(&self) -> Option<(u32, u32)> {
        let (w, h) = self.css_size()?;
        let scale = |x: f64| ((x * self.device_pixel_ratio).round() as u32).max(1);
        Some((scale(w), scale(h)))
    }
}

/// Backing-store size controller.
///
/// Consumes container size notifications and latches the resulting
/// backing-store dimension changes for the render loop.
#[derive(Debug)]
pub struct ResizeController {
    spec: ViewportSpec,
    applied: Option<(u32, u32)>,
    dirty: bool,
}

impl ResizeController {
    /// Creates a controller with no known container size.
    pub fn new(device_pixel_ratio: f64, aspect: AspectMode) -> ResizeController {
        ResizeController {
            spec: ViewportSpec {
                container: (0.0, 0.0),
                device_pixel_ratio,
                aspect,
            },
            applied: None,
            dirty: false,
        }
    }

    /// Handler for a container size notification, in CSS pixels.
    ///
    /// A zero dimension defers: the previously applied backing size stays in
    /// effect and no change is latched. This is not an error; layout engines
    /// report zero sizes transiently.
    pub fn set_container_size(&mut self, width: f64, height: f64) {
        self.spec.container = (width, height);
        self.refresh();
    }

    /// Changes the aspect constraint.
    pub fn set_aspect(&mut self, aspect: AspectMode) {
        self.spec.aspect = aspect;
        self.refresh();
    }

    /// Updates the device pixel ratio.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.spec.device_pixel_ratio = ratio;
        self.refresh();
    }

    fn refresh(&mut self) {
        if let Some(target) = self.spec.backing_size() {
            if self.applied != Some(target) {
                self.dirty = true;
            }
        }
    }

    /// Returns the viewport specification.
    pub fn spec(&self) -> ViewportSpec {
        self.spec
    }

    /// Backing-store size currently applied to the canvas, if any.
    pub fn applied_size(&self) -> Option<(u32, u32)> {
        self.applied
    }

    /// Takes the latched backing-size change, if there is one.
    ///
    /// Called by the render loop once per frame. Returns `Some` only when the
    /// target backing size differs from the size last returned; the caller
    /// must then resize the canvas and the GL viewport accordingly.
    pub fn take_pending(&mut self) -> Option<(u32, u32)> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        let target = self.spec.backing_size()?;
        if self.applied == Some(target) {
            return None;
        }
        self.applied = Some(target);
        Some(target)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn free_mode_follows_container() {
        let mut ctl = ResizeController::new(1.0, AspectMode::Free);
        ctl.set_container_size(800.0, 600.0);
        assert_eq!(ctl.take_pending(), Some((800, 600)));
    }

    #[test]
    fn square_mode_uses_min_dimension() {
        let mut ctl = ResizeController::new(1.0, AspectMode::Square);
        ctl.set_container_size(800.0, 600.0);
        assert_eq!(ctl.take_pending(), Some((600, 600)));
        ctl.set_container_size(300.0, 500.0);
        assert_eq!(ctl.take_pending(), Some((300, 300)));
    }

    #[test]
    fn zero_container_defers() {
        let mut ctl = ResizeController::new(1.0, AspectMode::Free);
        ctl.set_container_size(0.0, 600.0);
        assert_eq!(ctl.take_pending(), None);
        // A later nonzero notification reports the change.
        ctl.set_container_size(800.0, 600.0);
        assert_eq!(ctl.take_pending(), Some((800, 600)));
        // Going back to zero keeps the last applied size.
        ctl.set_container_size(0.0, 0.0);
        assert_eq!(ctl.take_pending(), None);
        assert_eq!(ctl.applied_size(), Some((800, 600)));
    }

    #[test]
    fn backing_store_never_zero_area() {
        let mut ctl = ResizeController::new(1.0, AspectMode::Free);
        ctl.set_container_size(0.4, 0.2);
        assert_eq!(ctl.take_pending(), Some((1, 1)));
    }

    #[test]
    fn device_pixel_ratio_scales_backing() {
        let mut ctl = ResizeController::new(2.0, AspectMode::Free);
        ctl.set_container_size(400.0, 300.0);
        assert_eq!(ctl.take_pending(), Some((800, 600)));
        // Square stays 1:1 in device pixels too.
        ctl.set_aspect(AspectMode::Square);
        assert_eq!(ctl.take_pending(), Some((600, 600)));
    }

    #[test]
    fn pending_change_reported_once() {
        let mut ctl = ResizeController::new(1.0, AspectMode::Free);
        ctl.set_container_size(800.0, 600.0);
        assert!(ctl.take_pending().is_some());
        assert_eq!(ctl.take_pending(), None);
        // Re-reporting the same size does not latch a change.
        ctl.set_container_size(800.0, 600.0);
        assert_eq!(ctl.take_pending(), None);
    }

    #[test]
    fn burst_of_notifications_latches_last() {
        let mut ctl = ResizeController::new(1.0, AspectMode::Free);
        ctl.set_container_size(100.0, 100.0);
        ctl.set_container_size(200.0, 150.0);
        ctl.set_container_size(640.0, 480.0);
        assert_eq!(ctl.take_pending(), Some((640, 480)));
        assert_eq!(ctl.take_pending(), None);
    }

    #[test]
    fn css_size_square_is_min_side() {
        let mut ctl = ResizeController::new(2.0, AspectMode::Square);
        ctl.set_container_size(800.0, 600.0);
        assert_eq!(ctl.spec().css_size(), Some((600.0, 600.0)));
        assert_eq!(ctl.spec().backing_size(), Some((1200, 1200)));
    }

    #[test]
    fn aspect_mode_parse_and_display() {
        assert_eq!("free".parse(), Ok(AspectMode::Free));
        assert_eq!("Square".parse(), Ok(AspectMode::Square));
        assert!("letterbox".parse::<AspectMode>().is_err());
        assert_eq!(AspectMode::Square.to_string(), "square");
    }
}
