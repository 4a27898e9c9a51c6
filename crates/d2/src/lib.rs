//! # Bedplate 2D
//!
//! Planar collision detection and arrangement of 3D objects on a build plate.
//!
//! Objects are reduced to their footprint, the projection of the mesh onto
//! the plate plane, and every test happens in 2D. Two objects at different
//! heights with overlapping footprints collide.
//!
//! ## Features
//!
//! - Exact-sign triangle predicates ([`kernel`])
//! - Mesh-to-footprint projection with degenerate-input reporting
//! - Incremental, budgeted, restartable pairwise collision matrix
//! - Anytime, resumable arrangement driven by a single step function
//! - Rectangular and circular plates, center or lower-left origin
//! - Spatial indexing for fast neighbour queries
//!
//! ## Quick Start
//!
//! ```rust
//! use bedplate_d2::{ArrangeConfig, ArrangeEngine, CollisionDetector, Mesh, Plate, SceneObject};
//!
//! // Three 20x20 boxes stacked on the same spot
//! let mut objects: Vec<SceneObject> = (0..3)
//!     .map(|i| SceneObject::new(format!("box{}", i), Mesh::cuboid(20.0, 20.0, 10.0)))
//!     .collect();
//! let plate = Plate::rectangle(200.0, 200.0);
//!
//! let mut engine = ArrangeEngine::new(ArrangeConfig::new().with_margin(5.0));
//! let step = engine.arrange_blocking(&mut objects, &plate, false).unwrap();
//! assert!(step.done);
//!
//! // Arrangement is best-effort: check the result.
//! let report = CollisionDetector::default().detect(&objects, plate);
//! assert!(report.is_complete());
//! assert!(!report.matrix.has_collisions());
//! ```
//!
//! ## Cooperative stepping
//!
//! ```rust
//! use bedplate_d2::{ArrangeEngine, Budget, Mesh, Plate, SceneObject};
//!
//! let mut objects = vec![
//!     SceneObject::new("a", Mesh::cuboid(30.0, 30.0, 5.0)),
//!     SceneObject::new("b", Mesh::cuboid(30.0, 30.0, 5.0)),
//! ];
//! let plate = Plate::rectangle(200.0, 200.0);
//! let mut engine = ArrangeEngine::default();
//!
//! loop {
//!     let step = engine.step(&mut objects, &plate, Budget::units(50), false).unwrap();
//!     // render a frame here
//!     if step.done {
//!         break;
//!     }
//! }
//! ```

pub mod arrange;
pub mod collision;
pub mod footprint;
pub mod kernel;
pub mod mesh;
pub mod plate;
pub mod spatial_index;

use bedplate_core::transform::AABB2D;

/// Clamps a placement so a footprint with local bounds `local` stays inside
/// `bounds` shrunk by `margin`.
///
/// Returns `Some((clamped_x, clamped_y))` if the footprint can fit,
/// `None` if it is too large for the plate at this margin.
///
/// # Arguments
/// * `x`, `y` - The proposed plate position of the object
/// * `local` - Footprint bounds relative to the object's plate position
/// * `bounds` - Plate bounds
/// * `margin` - Clearance to keep from the plate edge
pub fn clamp_to_plate(
    x: f64,
    y: f64,
    local: &AABB2D,
    bounds: &AABB2D,
    margin: f64,
) -> Option<(f64, f64)> {
    // x + local.min_x >= bounds.min_x + margin  =>  x >= bounds.min_x + margin - local.min_x
    // x + local.max_x <= bounds.max_x - margin  =>  x <= bounds.max_x - margin - local.max_x
    let min_valid_x = bounds.min_x + margin - local.min_x;
    let max_valid_x = bounds.max_x - margin - local.max_x;
    let min_valid_y = bounds.min_y + margin - local.min_y;
    let max_valid_y = bounds.max_y - margin - local.max_y;

    if max_valid_x < min_valid_x || max_valid_y < min_valid_y {
        return None;
    }

    Some((x.clamp(min_valid_x, max_valid_x), y.clamp(min_valid_y, max_valid_y)))
}

// Re-exports
pub use arrange::{ArrangeEngine, ArrangePhase, ArrangeStep, ArrangementState, StopReason};
pub use bedplate_core::{
    ArrangeConfig, Budget, CollisionConfig, Error, ObjectId, PlateObject, Result, Transform3D,
    Triangle3,
};
pub use collision::{
    CollisionDetector, CollisionEntry, CollisionJob, CollisionMatrix, CollisionReport,
    CollisionState, RunStatus,
};
pub use footprint::{project, project_triangles, Footprint, FootprintStatus};
pub use kernel::{
    objects_overlap, point_in_triangle, same_side, triangles_intersect, Point2, Triangle2,
};
pub use mesh::{Mesh, SceneObject};
pub use plate::{Plate, PlateOrigin, PlateShape};
pub use spatial_index::{SpatialEntry, SpatialIndex};
