//! Build plate bounds.

use crate::footprint::Footprint;
use bedplate_core::transform::AABB2D;
use bedplate_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest accepted plate dimension.
const MIN_DIMENSION: f64 = 0.1;

/// Outline of the printable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PlateShape {
    #[default]
    Rectangular,
    /// Inscribed in the `width x depth` rectangle; the diameter is the smaller side.
    Circular,
}

/// Where plate coordinate `(0, 0)` sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PlateOrigin {
    /// Plate spans `[-w/2, w/2] x [-d/2, d/2]`.
    #[default]
    Center,
    /// Plate spans `[0, w] x [0, d]`.
    LowerLeft,
}

/// The bounded working surface objects are placed on.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plate {
    width: f64,
    depth: f64,
    shape: PlateShape,
    origin: PlateOrigin,
}

impl Plate {
    /// Rectangular plate centered on the origin.
    ///
    /// Dimensions below 0.1 are raised to 0.1.
    pub fn rectangle(width: f64, depth: f64) -> Self {
        Self {
            width: width.max(MIN_DIMENSION),
            depth: depth.max(MIN_DIMENSION),
            shape: PlateShape::Rectangular,
            origin: PlateOrigin::Center,
        }
    }

    /// Circular plate centered on the origin.
    pub fn circle(diameter: f64) -> Self {
        Self::rectangle(diameter, diameter).with_shape(PlateShape::Circular)
    }

    pub fn with_shape(mut self, shape: PlateShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_origin(mut self, origin: PlateOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn shape(&self) -> PlateShape {
        self.shape
    }

    pub fn origin(&self) -> PlateOrigin {
        self.origin
    }

    /// Plate outline bounding box in plate coordinates.
    pub fn bounds(&self) -> AABB2D {
        match self.origin {
            PlateOrigin::Center => AABB2D::new(
                -self.width / 2.0,
                -self.depth / 2.0,
                self.width / 2.0,
                self.depth / 2.0,
            ),
            PlateOrigin::LowerLeft => AABB2D::new(0.0, 0.0, self.width, self.depth),
        }
    }

    /// Center of the plate in plate coordinates.
    pub fn center(&self) -> (f64, f64) {
        self.bounds().center()
    }

    /// Radius of the usable disc (circular plates) or half the smaller side.
    pub fn radius(&self) -> f64 {
        self.width.min(self.depth) / 2.0
    }

    /// Bounds shrunk by `margin` on every side. May be inverted when the margin is too large.
    pub fn inner_bounds(&self, margin: f64) -> AABB2D {
        let bounds = match self.shape {
            PlateShape::Rectangular => self.bounds(),
            PlateShape::Circular => {
                let (cx, cy) = self.center();
                let r = self.radius();
                AABB2D::new(cx - r, cy - r, cx + r, cy + r)
            }
        };
        bounds.expanded(-margin)
    }

    /// Largest axis-aligned rectangle inside the plate outline.
    ///
    /// The plate bounds for rectangular plates, the inscribed square for circular ones.
    pub fn inscribed_bounds(&self) -> AABB2D {
        match self.shape {
            PlateShape::Rectangular => self.bounds(),
            PlateShape::Circular => {
                let (cx, cy) = self.center();
                let half = self.radius() * std::f64::consts::FRAC_1_SQRT_2;
                AABB2D::new(cx - half, cy - half, cx + half, cy + half)
            }
        }
    }

    /// Area of the plate.
    pub fn area(&self) -> f64 {
        match self.shape {
            PlateShape::Rectangular => self.width * self.depth,
            PlateShape::Circular => std::f64::consts::PI * self.radius() * self.radius(),
        }
    }

    /// Validates the plate descriptor.
    pub fn validate(&self) -> Result<()> {
        if !self.width.is_finite() || !self.depth.is_finite() {
            return Err(Error::InvalidBoundary(format!(
                "plate dimensions must be finite, got {} x {}",
                self.width, self.depth
            )));
        }
        Ok(())
    }

    /// True if `footprint` lies on the plate with at least `margin` clearance to the edge.
    ///
    /// Empty footprints have no extent and are always contained.
    pub fn contains_footprint(&self, footprint: &Footprint, margin: f64) -> bool {
        self.contains_footprint_at(footprint, 0.0, 0.0, margin)
    }

    /// Like [`Plate::contains_footprint`] for `footprint` moved by `(dx, dy)`, without moving it.
    pub fn contains_footprint_at(
        &self,
        footprint: &Footprint,
        dx: f64,
        dy: f64,
        margin: f64,
    ) -> bool {
        let Some(aabb) = footprint.aabb() else {
            return true;
        };
        let inner = self.inner_bounds(margin);
        if !inner.is_valid() || !inner.contains(&aabb.translated(dx, dy)) {
            return false;
        }
        match self.shape {
            PlateShape::Rectangular => true,
            PlateShape::Circular => {
                let (cx, cy) = self.center();
                let limit = self.radius() - margin;
                let limit_sq = limit * limit;
                footprint.vertices().all(|p| {
                    let (x, y) = (p.x + dx - cx, p.y + dy - cy);
                    x * x + y * y <= limit_sq
                })
            }
        }
    }
}

impl Default for Plate {
    fn default() -> Self {
        Self::rectangle(200.0, 200.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_plate_bounds() {
        let plate = Plate::rectangle(200.0, 150.0);
        assert_eq!(plate.bounds(), AABB2D::new(-100.0, -75.0, 100.0, 75.0));
        assert_relative_eq!(plate.area(), 30000.0);
    }

    #[test]
    fn test_lower_left_origin() {
        let plate = Plate::rectangle(200.0, 150.0).with_origin(PlateOrigin::LowerLeft);
        assert_eq!(plate.bounds(), AABB2D::new(0.0, 0.0, 200.0, 150.0));
        assert_eq!(plate.center(), (100.0, 75.0));
    }

    #[test]
    fn test_zero_dimensions_are_clamped() {
        let plate = Plate::rectangle(0.0, -5.0);
        assert_relative_eq!(plate.width(), 0.1);
        assert_relative_eq!(plate.depth(), 0.1);
        assert!(plate.validate().is_ok());
    }

    #[test]
    fn test_non_finite_plate_is_invalid() {
        assert!(Plate::rectangle(f64::INFINITY, 10.0).validate().is_err());
    }

    #[test]
    fn test_contains_footprint_with_margin() {
        let plate = Plate::rectangle(200.0, 200.0);
        let fp = Footprint::rectangle(-10.0, -10.0, 10.0, 10.0);
        assert!(plate.contains_footprint(&fp, 5.0));
        assert!(plate.contains_footprint_at(&fp, 85.0, 0.0, 5.0));
        assert!(!plate.contains_footprint_at(&fp, 86.0, 0.0, 5.0));
    }

    #[test]
    fn test_circular_plate_rejects_corners() {
        let plate = Plate::circle(200.0);
        let fp = Footprint::rectangle(-10.0, -10.0, 10.0, 10.0);
        assert!(plate.contains_footprint(&fp, 0.0));
        // Fits the bounding square but the corner leaves the disc.
        assert!(!plate.contains_footprint_at(&fp, 80.0, 80.0, 0.0));
        assert!(plate.contains_footprint_at(&fp, 80.0, 0.0, 0.0));
    }

    #[test]
    fn test_inscribed_bounds_stay_on_the_disc() {
        let rect = Plate::rectangle(200.0, 100.0);
        assert_eq!(rect.inscribed_bounds(), rect.bounds());

        let disc = Plate::circle(200.0).with_origin(PlateOrigin::LowerLeft);
        let square = disc.inscribed_bounds();
        assert_relative_eq!(square.width(), 200.0 * std::f64::consts::FRAC_1_SQRT_2);
        assert_eq!(square.center(), (100.0, 100.0));
        let inner = square.expanded(-1.0);
        let fp = Footprint::rectangle(inner.min_x, inner.min_y, inner.max_x, inner.max_y);
        assert!(disc.contains_footprint(&fp, 1.0));
    }

    #[test]
    fn test_oversized_footprint_never_fits() {
        let plate = Plate::rectangle(100.0, 100.0);
        let fp = Footprint::rectangle(-60.0, -60.0, 60.0, 60.0);
        assert!(!plate.contains_footprint(&fp, 0.0));
        assert!(!plate.inner_bounds(60.0).is_valid());
    }

    #[test]
    fn test_empty_footprint_is_contained() {
        assert!(Plate::rectangle(10.0, 10.0).contains_footprint(&Footprint::empty(), 3.0));
    }
}
