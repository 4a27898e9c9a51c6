//! Robust geometric predicates for plate-plane tests.
//!
//! Orientation signs are computed with Shewchuk's adaptive precision arithmetic
//! (via the `robust` crate), so "exactly on the line" really means exactly.
//! The planar kernel relies on that for its inclusive boundary handling.
//!
//! ## Example
//!
//! ```rust
//! use bedplate_core::robust::{orient2d, Orientation};
//!
//! let a = (0.0, 0.0);
//! let b = (1.0, 0.0);
//! let c = (0.5, 1.0);
//!
//! assert_eq!(orient2d(a, b, c), Orientation::CounterClockwise);
//! ```

use robust::{orient2d as robust_orient2d, Coord};

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Points are arranged counter-clockwise (left turn).
    CounterClockwise,
    /// Points are arranged clockwise (right turn).
    Clockwise,
    /// Points are collinear (on the same line).
    Collinear,
}

impl Orientation {
    /// Returns true if the orientation is counter-clockwise.
    #[inline]
    pub fn is_ccw(self) -> bool {
        matches!(self, Orientation::CounterClockwise)
    }

    /// Returns true if the orientation is clockwise.
    #[inline]
    pub fn is_cw(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }

    /// Returns true if the points are collinear.
    #[inline]
    pub fn is_collinear(self) -> bool {
        matches!(self, Orientation::Collinear)
    }

    /// True when the two orientations lie strictly on opposite sides.
    ///
    /// A collinear orientation is never opposite to anything.
    #[inline]
    pub fn opposes(self, other: Orientation) -> bool {
        matches!(
            (self, other),
            (Orientation::CounterClockwise, Orientation::Clockwise)
                | (Orientation::Clockwise, Orientation::CounterClockwise)
        )
    }
}

/// Determines the orientation of `pc` relative to the directed line `pa -> pb`.
///
/// This is the sign of the 2D cross product `(pb - pa) x (pc - pa)`, computed
/// exactly.
#[inline]
pub fn orient2d(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> Orientation {
    let det = orient2d_raw(pa, pb, pc);

    if det > 0.0 {
        Orientation::CounterClockwise
    } else if det < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Returns the raw orientation determinant (twice the signed triangle area).
///
/// Non-finite inputs yield a non-finite or zero result; callers that care
/// should screen coordinates first.
#[inline]
pub fn orient2d_raw(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> f64 {
    robust_orient2d(
        Coord { x: pa.0, y: pa.1 },
        Coord { x: pb.0, y: pb.1 },
        Coord { x: pc.0, y: pc.1 },
    )
}

/// Checks whether segment `p1-p2` and segment `q1-q2` share at least one point.
///
/// Touching endpoints and collinear overlaps count as intersecting.
pub fn segments_intersect(
    p1: (f64, f64),
    p2: (f64, f64),
    q1: (f64, f64),
    q2: (f64, f64),
) -> bool {
    let d1 = orient2d(q1, q2, p1);
    let d2 = orient2d(q1, q2, p2);
    let d3 = orient2d(p1, p2, q1);
    let d4 = orient2d(p1, p2, q2);

    if d1.opposes(d2) && d3.opposes(d4) {
        return true;
    }

    (d1.is_collinear() && on_segment(q1, q2, p1))
        || (d2.is_collinear() && on_segment(q1, q2, p2))
        || (d3.is_collinear() && on_segment(p1, p2, q1))
        || (d4.is_collinear() && on_segment(p1, p2, q2))
}

/// For a point already known to be collinear with `a-b`, checks it lies within the segment.
#[inline]
fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Euclidean distance from `p` to the closed segment `a-b`.
pub fn point_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return (p.0 - a.0).hypot(p.1 - a.1);
    }
    let t = (((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len_sq).clamp(0.0, 1.0);
    let cx = a.0 + t * abx;
    let cy = a.1 + t * aby;
    (p.0 - cx).hypot(p.1 - cy)
}
