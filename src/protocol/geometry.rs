//! Rectangles shared by the scanner, the bridge and the popup.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Geometry
// ============================================================================

/// An axis-aligned rectangle in CSS pixels.
///
/// Whether it is surface-local or host-window coordinates depends on who
/// holds it; [`Geometry::translate`] is the only conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Distance from the top edge.
    pub top: f64,
    /// Distance from the left edge.
    pub left: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Geometry {
    /// Creates a rectangle.
    #[inline]
    #[must_use]
    pub const fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Bottom edge.
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Right edge.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Returns `true` if every component is finite and the size is not
    /// negative.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.top, self.left, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// Moves a rectangle expressed relative to `origin` into the coordinate
    /// space `origin` itself is expressed in.
    ///
    /// `host_rect = surface_rect + local_rect`.
    #[inline]
    #[must_use]
    pub fn translate(self, origin: &Geometry) -> Geometry {
        Geometry {
            top: origin.top + self.top,
            left: origin.left + self.left,
            width: self.width,
            height: self.height,
        }
    }

    /// Returns `true` if `self` lies fully inside `bounds`.
    #[must_use]
    pub fn is_within(&self, bounds: &Geometry) -> bool {
        const EPSILON: f64 = 1e-6;
        self.left >= bounds.left - EPSILON
            && self.top >= bounds.top - EPSILON
            && self.right() <= bounds.right() + EPSILON
            && self.bottom() <= bounds.bottom() + EPSILON
    }
}

// ============================================================================
// Size
// ============================================================================

/// Dimensions of the host window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Size {
    /// Creates a size.
    #[inline]
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// The rectangle `(0, 0, width, height)`.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Geometry {
        Geometry::new(0.0, 0.0, self.width, self.height)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_adds_surface_origin() {
        let surface = Geometry::new(80.0, 200.0, 1000.0, 700.0);
        let field = Geometry::new(120.0, 40.0, 240.0, 32.0);

        let host = field.translate(&surface);
        assert_eq!(host, Geometry::new(200.0, 240.0, 240.0, 32.0));
    }

    #[test]
    fn test_is_valid_rejects_nan_and_negative() {
        assert!(Geometry::new(0.0, 0.0, 10.0, 10.0).is_valid());
        assert!(!Geometry::new(f64::NAN, 0.0, 10.0, 10.0).is_valid());
        assert!(!Geometry::new(0.0, 0.0, -1.0, 10.0).is_valid());
    }

    #[test]
    fn test_is_within() {
        let window = Size::new(800.0, 600.0).bounds();
        assert!(Geometry::new(10.0, 10.0, 100.0, 100.0).is_within(&window));
        assert!(!Geometry::new(550.0, 10.0, 100.0, 100.0).is_within(&window));
    }

    #[test]
    fn test_geometry_wire_shape() {
        let json = serde_json::to_value(Geometry::new(1.0, 2.0, 3.0, 4.0)).expect("serialize");
        assert_eq!(json["top"], 1.0);
        assert_eq!(json["left"], 2.0);
        assert_eq!(json["width"], 3.0);
        assert_eq!(json["height"], 4.0);
    }
}
