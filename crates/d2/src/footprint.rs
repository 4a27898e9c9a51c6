//! Object footprints and the mesh-to-footprint projector.
//!
//! A [`Footprint`] is the projection of one object's mesh onto the plate at
//! its current transform. Footprints are never edited in place: when the
//! transform changes, a new footprint is projected (or, for pure plate moves,
//! derived with [`Footprint::translated`]).

use crate::kernel::{footprints_conflict, objects_overlap, Point2, Triangle2};
use bedplate_core::geometry::{PlateObject, Triangle3};
use bedplate_core::transform::{Transform3D, AABB2D};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Health of a projected footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FootprintStatus {
    /// At least one triangle with area, no bad coordinates.
    Valid,
    /// Nothing with area survived projection (empty or flat-on-edge mesh).
    Empty,
    /// Some vertices were non-finite; those triangles were dropped.
    NonFinite,
}

/// An object's triangles projected onto the plate plane.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footprint {
    triangles: Vec<Triangle2>,
    aabb: Option<AABB2D>,
    degenerate_dropped: usize,
    non_finite_dropped: usize,
}

impl Footprint {
    /// Creates a footprint from plate-plane triangles, unfiltered.
    pub fn new(triangles: Vec<Triangle2>) -> Self {
        let aabb = bounds_of(&triangles);
        Self {
            triangles,
            aabb,
            degenerate_dropped: 0,
            non_finite_dropped: 0,
        }
    }

    /// A footprint with no triangles.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Axis-aligned rectangle `[min_x, max_x] x [min_y, max_y]` as two triangles.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let p0 = Point2::new(min_x, min_y);
        let p1 = Point2::new(max_x, min_y);
        let p2 = Point2::new(max_x, max_y);
        let p3 = Point2::new(min_x, max_y);
        Self::new(vec![Triangle2::new(p0, p1, p2), Triangle2::new(p0, p2, p3)])
    }

    pub fn triangles(&self) -> &[Triangle2] {
        &self.triangles
    }

    /// Plate-plane bounding box, `None` when empty.
    pub fn aabb(&self) -> Option<AABB2D> {
        self.aabb
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of zero-area triangles dropped during projection.
    pub fn degenerate_dropped(&self) -> usize {
        self.degenerate_dropped
    }

    /// Number of triangles dropped for non-finite coordinates.
    pub fn non_finite_dropped(&self) -> usize {
        self.non_finite_dropped
    }

    pub fn status(&self) -> FootprintStatus {
        if self.non_finite_dropped > 0 {
            FootprintStatus::NonFinite
        } else if self.triangles.is_empty() {
            FootprintStatus::Empty
        } else {
            FootprintStatus::Valid
        }
    }

    /// True when a host should surface this object as unusable for collision tests.
    pub fn is_degenerate(&self) -> bool {
        self.status() != FootprintStatus::Valid
    }

    /// Returns a new footprint moved by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            triangles: self.triangles.iter().map(|t| t.translated(dx, dy)).collect(),
            aabb: self.aabb.map(|b| b.translated(dx, dy)),
            degenerate_dropped: self.degenerate_dropped,
            non_finite_dropped: self.non_finite_dropped,
        }
    }

    /// Iterates over every vertex.
    pub fn vertices(&self) -> impl Iterator<Item = Point2> + '_ {
        self.triangles.iter().flat_map(|t| t.vertices())
    }

    /// Footprint overlap using the kernel's vertex-containment test.
    ///
    /// Disjoint bounding boxes short-circuit to `false`; empty footprints never overlap.
    pub fn overlaps(&self, other: &Footprint) -> bool {
        match (self.aabb, other.aabb) {
            (Some(a), Some(b)) if a.intersects(&b) => {
                objects_overlap(&self.triangles, &other.triangles)
            }
            _ => false,
        }
    }

    /// True if the footprints overlap, cross, or are closer than `margin`.
    pub fn conflicts_with(&self, other: &Footprint, margin: f64) -> bool {
        match (self.aabb, other.aabb) {
            (Some(a), Some(b)) if a.expanded(margin).intersects(&b) => {
                footprints_conflict(&self.triangles, &other.triangles, margin)
            }
            _ => false,
        }
    }
}

/// Projects an object's mesh at its current transform onto the plate.
pub fn project<O: PlateObject + ?Sized>(object: &O) -> Footprint {
    project_triangles(object.triangles(), object.transform())
}

/// Transforms object-space triangles to world space and drops the height.
///
/// Triangles with non-finite coordinates or zero projected area are dropped
/// and counted. Malformed input yields an empty footprint, never an error.
pub fn project_triangles(triangles: &[Triangle3], transform: &Transform3D) -> Footprint {
    let mut kept = Vec::with_capacity(triangles.len());
    let mut degenerate_dropped = 0;
    let mut non_finite_dropped = 0;

    for triangle in triangles {
        let [a, b, c] = (*triangle).map(|p| {
            let w = transform.transform_point(&p);
            Point2::new(w.x, w.y)
        });
        let projected = Triangle2::new(a, b, c);

        if !projected.is_finite() {
            non_finite_dropped += 1;
        } else if projected.is_degenerate() {
            degenerate_dropped += 1;
        } else {
            kept.push(projected);
        }
    }

    let aabb = bounds_of(&kept);
    Footprint {
        triangles: kept,
        aabb,
        degenerate_dropped,
        non_finite_dropped,
    }
}

fn bounds_of(triangles: &[Triangle2]) -> Option<AABB2D> {
    AABB2D::from_points(
        triangles
            .iter()
            .flat_map(|t| t.vertices())
            .map(Point2::as_tuple),
    )
}
