//! The seam between host-owned objects and the plate engines.

use crate::transform::Transform3D;
use nalgebra::Point3;

/// Unique identifier for an object on the plate.
pub type ObjectId = String;

/// An object-space triangle with 3D vertices.
pub type Triangle3 = [Point3<f64>; 3];

/// A host-owned object the engines can read and reposition.
///
/// The engines never own objects. They read the mesh and transform to derive
/// footprints and, when arranging, write back a new plate position.
pub trait PlateObject {
    /// Returns the unique identifier of this object.
    fn id(&self) -> &ObjectId;

    /// Returns the current world transform.
    fn transform(&self) -> &Transform3D;

    /// Replaces the world transform.
    fn set_transform(&mut self, transform: Transform3D);

    /// Returns the mesh triangles in object space.
    fn triangles(&self) -> &[Triangle3];

    /// Moves the object on the plate, keeping height, rotation and scale.
    fn set_plate_position(&mut self, x: f64, y: f64) {
        let moved = self.transform().at_plate_position(x, y);
        self.set_transform(moved);
    }
}
