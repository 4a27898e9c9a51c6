//! Planar geometry kernel.
//!
//! Pure functions testing whether triangles and triangle collections
//! (object footprints) overlap on the plate plane.
//!
//! ## Overlap semantics
//!
//! Two triangles intersect when any vertex of either lies inside (or on the
//! boundary of) the other. This is a vertex-containment test: two triangles
//! whose edges cross while neither contains a vertex of the other are NOT
//! reported as intersecting. The six-pointed star is the classic example:
//!
//! ```rust
//! use bedplate_d2::kernel::{triangles_intersect, Point2, Triangle2};
//!
//! let t0 = Triangle2::new(Point2::new(0.0, 1.0), Point2::new(0.0, -1.0), Point2::new(2.0, 0.0));
//! let t1 = Triangle2::new(Point2::new(-1.0, 0.0), Point2::new(1.0, 1.0), Point2::new(1.0, -1.0));
//! assert!(!triangles_intersect(&t0, &t1));
//! ```
//!
//! Callers that need edge crossings detected (the arrangement engine does)
//! use [`triangles_conflict`], which adds segment tests and a clearance margin.

use bedplate_core::robust::{orient2d, point_segment_distance, segments_intersect};
use bedplate_core::AABB2D;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point on the plate plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn as_tuple(self) -> (f64, f64) {
        (self.x, self.y)
    }

    #[inline]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// A triangle on the plate plane.
///
/// Vertex order does not matter for intersection, but the three roles are
/// kept distinct because each edge is tested against its opposite vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle2 {
    pub a: Point2,
    pub b: Point2,
    pub c: Point2,
}

impl Triangle2 {
    #[inline]
    pub const fn new(a: Point2, b: Point2, c: Point2) -> Self {
        Self { a, b, c }
    }

    /// Builds a triangle from coordinate tuples.
    pub fn from_coords(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Self {
        Self::new(a.into(), b.into(), c.into())
    }

    #[inline]
    pub fn vertices(&self) -> [Point2; 3] {
        [self.a, self.b, self.c]
    }

    /// The three edges as vertex pairs.
    #[inline]
    pub fn edges(&self) -> [(Point2, Point2); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    /// True when the vertices are exactly collinear (zero area).
    pub fn is_degenerate(&self) -> bool {
        orient2d(self.a.as_tuple(), self.b.as_tuple(), self.c.as_tuple()).is_collinear()
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite()
    }

    pub fn aabb(&self) -> AABB2D {
        AABB2D::new(
            self.a.x.min(self.b.x).min(self.c.x),
            self.a.y.min(self.b.y).min(self.c.y),
            self.a.x.max(self.b.x).max(self.c.x),
            self.a.y.max(self.b.y).max(self.c.y),
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.a.translated(dx, dy),
            self.b.translated(dx, dy),
            self.c.translated(dx, dy),
        )
    }
}

/// True if `p1` and `p2` lie on the same side of the line through `a` and `b`.
///
/// A point exactly on the line counts as being on either side, so boundary
/// points are accepted.
#[inline]
pub fn same_side(p1: Point2, p2: Point2, a: Point2, b: Point2) -> bool {
    let o1 = orient2d(a.as_tuple(), b.as_tuple(), p1.as_tuple());
    let o2 = orient2d(a.as_tuple(), b.as_tuple(), p2.as_tuple());
    !o1.opposes(o2)
}

/// True if `p` is inside `t` or on its boundary.
#[inline]
pub fn point_in_triangle(p: Point2, t: &Triangle2) -> bool {
    same_side(p, t.a, t.b, t.c) && same_side(p, t.b, t.a, t.c) && same_side(p, t.c, t.a, t.b)
}

/// True if any vertex of either triangle lies inside the other.
///
/// Edge crossings without vertex containment are not detected.
pub fn triangles_intersect(t0: &Triangle2, t1: &Triangle2) -> bool {
    t0.vertices().iter().any(|&p| point_in_triangle(p, t1))
        || t1.vertices().iter().any(|&p| point_in_triangle(p, t0))
}

/// True if any triangle of `o1` intersects any triangle of `o2`.
///
/// Every triangle of one footprint is compared with every triangle of the
/// other; the first intersecting pair ends the search.
pub fn objects_overlap(o1: &[Triangle2], o2: &[Triangle2]) -> bool {
    o1.iter()
        .any(|t1| o2.iter().any(|t2| triangles_intersect(t1, t2)))
}

/// True if the two triangles intersect, have crossing edges, or come closer than `margin`.
///
/// Unlike [`triangles_intersect`], crossing edges are always caught.
pub fn triangles_conflict(t0: &Triangle2, t1: &Triangle2, margin: f64) -> bool {
    if !t0.aabb().expanded(margin).intersects(&t1.aabb()) {
        return false;
    }
    if triangles_intersect(t0, t1) || edges_cross(t0, t1) {
        return true;
    }
    margin > 0.0 && triangle_gap(t0, t1) < margin
}

/// True if any footprint triangle pair conflicts under [`triangles_conflict`].
pub fn footprints_conflict(o1: &[Triangle2], o2: &[Triangle2], margin: f64) -> bool {
    o1.iter()
        .any(|t1| o2.iter().any(|t2| triangles_conflict(t1, t2, margin)))
}

fn edges_cross(t0: &Triangle2, t1: &Triangle2) -> bool {
    t0.edges().iter().any(|&(p1, p2)| {
        t1.edges().iter().any(|&(q1, q2)| {
            segments_intersect(p1.as_tuple(), p2.as_tuple(), q1.as_tuple(), q2.as_tuple())
        })
    })
}

/// Minimum vertex-to-edge distance between two triangles known not to touch.
fn triangle_gap(t0: &Triangle2, t1: &Triangle2) -> f64 {
    let one_way = |from: &Triangle2, to: &Triangle2| {
        from.vertices()
            .iter()
            .flat_map(|&p| {
                to.edges().into_iter().map(move |(a, b)| {
                    point_segment_distance(p.as_tuple(), a.as_tuple(), b.as_tuple())
                })
            })
            .fold(f64::INFINITY, f64::min)
    };
    one_way(t0, t1).min(one_way(t1, t0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> Triangle2 {
        Triangle2::from_coords(a, b, c)
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Triangle2> {
        vec![
            tri((x, y), (x + size, y), (x + size, y + size)),
            tri((x, y), (x + size, y + size), (x, y + size)),
        ]
    }

    #[test]
    fn test_same_side_basic() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert!(same_side(Point2::new(1.0, 1.0), Point2::new(5.0, 3.0), a, b));
        assert!(!same_side(Point2::new(1.0, 1.0), Point2::new(5.0, -3.0), a, b));
    }

    #[test]
    fn test_same_side_on_line_is_inclusive() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        let on_line = Point2::new(4.0, 0.0);
        assert!(same_side(on_line, Point2::new(0.0, 5.0), a, b));
        assert!(same_side(on_line, Point2::new(0.0, -5.0), a, b));
    }

    #[test]
    fn test_point_in_triangle() {
        let t = tri((0.0, 0.0), (10.0, 0.0), (5.0, 10.0));
        assert!(point_in_triangle(Point2::new(5.0, 3.0), &t));
        assert!(!point_in_triangle(Point2::new(20.0, 5.0), &t));
        // Edge midpoint
        assert!(point_in_triangle(Point2::new(5.0, 0.0), &t));
    }

    #[test]
    fn test_point_in_triangle_own_vertices() {
        let t = tri((-3.0, 1.5), (7.25, -2.0), (0.5, 9.0));
        for v in t.vertices() {
            assert!(point_in_triangle(v, &t), "vertex {:?} should be inside", v);
        }
    }

    #[test]
    fn test_point_in_triangle_winding_independent() {
        let ccw = tri((0.0, 0.0), (10.0, 0.0), (5.0, 10.0));
        let cw = tri((0.0, 0.0), (5.0, 10.0), (10.0, 0.0));
        let p = Point2::new(5.0, 2.0);
        assert_eq!(point_in_triangle(p, &ccw), point_in_triangle(p, &cw));
    }

    #[test]
    fn test_triangles_intersect_contained() {
        let big = tri((0.0, 0.0), (10.0, 0.0), (0.0, 10.0));
        let small = tri((1.0, 1.0), (2.0, 1.0), (1.0, 2.0));
        assert!(triangles_intersect(&big, &small));
        assert!(triangles_intersect(&small, &big));
    }

    #[test]
    fn test_triangles_intersect_disjoint() {
        let t0 = tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        let t1 = tri((5.0, 5.0), (6.0, 5.0), (5.0, 6.0));
        assert!(!triangles_intersect(&t0, &t1));
    }

    #[test]
    fn test_triangles_sharing_an_edge_intersect() {
        let t0 = tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0));
        let t1 = tri((1.0, 0.0), (0.0, 1.0), (1.0, 1.0));
        assert!(triangles_intersect(&t0, &t1));
    }

    #[test]
    fn test_star_crossing_is_missed() {
        // Edges cross, but no vertex of either triangle is inside the other.
        let t0 = tri((0.0, 1.0), (0.0, -1.0), (2.0, 0.0));
        let t1 = tri((-1.0, 0.0), (1.0, 1.0), (1.0, -1.0));
        assert!(!triangles_intersect(&t0, &t1));
        assert!(!triangles_intersect(&t1, &t0));
        // The point (0.5, 0) is inside both.
        assert!(point_in_triangle(Point2::new(0.5, 0.0), &t0));
        assert!(point_in_triangle(Point2::new(0.5, 0.0), &t1));
    }

    #[test]
    fn test_star_crossing_is_a_conflict() {
        let t0 = tri((0.0, 1.0), (0.0, -1.0), (2.0, 0.0));
        let t1 = tri((-1.0, 0.0), (1.0, 1.0), (1.0, -1.0));
        assert!(triangles_conflict(&t0, &t1, 0.0));
    }

    #[test]
    fn test_objects_overlap_gap_then_shift() {
        let a = square(0.0, 0.0, 20.0);
        let b = square(30.0, 0.0, 20.0);
        assert!(!objects_overlap(&a, &b));

        let shifted = square(15.0, 5.0, 20.0);
        assert!(objects_overlap(&a, &shifted));
        assert!(objects_overlap(&shifted, &a));
    }

    #[test]
    fn test_objects_overlap_compares_every_pair() {
        // Single-triangle footprints: the overlapping pair is (0, 0).
        let o1 = vec![tri((0.0, 0.0), (4.0, 0.0), (0.0, 4.0))];
        let o2 = vec![tri((1.0, 1.0), (2.0, 1.0), (1.0, 2.0))];
        assert!(objects_overlap(&o1, &o2));

        // Overlap only between o1[1] and o2[0], which a skewed inner index would skip.
        let o1 = vec![
            tri((100.0, 100.0), (101.0, 100.0), (100.0, 101.0)),
            tri((0.0, 0.0), (4.0, 0.0), (0.0, 4.0)),
        ];
        let o2 = vec![
            tri((1.0, 1.0), (2.0, 1.0), (1.0, 2.0)),
            tri((50.0, 50.0), (51.0, 50.0), (50.0, 51.0)),
        ];
        assert!(objects_overlap(&o1, &o2));
    }

    #[test]
    fn test_objects_overlap_empty() {
        let a = square(0.0, 0.0, 10.0);
        assert!(!objects_overlap(&a, &[]));
        assert!(!objects_overlap(&[], &a));
    }

    #[test]
    fn test_conflict_margin() {
        let a = square(0.0, 0.0, 20.0);
        let b = square(24.0, 0.0, 20.0);
        assert!(!footprints_conflict(&a, &b, 0.0));
        assert!(!footprints_conflict(&a, &b, 4.0));
        assert!(footprints_conflict(&a, &b, 5.0));
    }

    #[test]
    fn test_conflict_diagonal_gap_uses_distance() {
        // Bounding boxes are close, but the triangles are far apart diagonally.
        let t0 = tri((0.0, 0.0), (10.0, 0.0), (0.0, 10.0));
        let t1 = tri((10.0, 10.0), (20.0, 10.0), (10.0, 20.0));
        // Gap from (10,10) to hypotenuse x+y=10 is 10/sqrt(2) ~ 7.07
        assert!(!triangles_conflict(&t0, &t1, 7.0));
        assert!(triangles_conflict(&t0, &t1, 7.1));
    }

    #[test]
    fn test_degenerate_triangle() {
        assert!(tri((0.0, 0.0), (1.0, 1.0), (2.0, 2.0)).is_degenerate());
        assert!(!tri((0.0, 0.0), (1.0, 0.0), (0.0, 1.0)).is_degenerate());
    }

    #[test]
    fn test_triangle_aabb_and_translate() {
        let t = tri((1.0, 2.0), (4.0, -1.0), (0.0, 3.0)).translated(10.0, 10.0);
        assert_eq!(t.aabb(), AABB2D::new(10.0, 9.0, 14.0, 13.0));
    }
}
