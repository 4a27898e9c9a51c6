//! Meshes and host-side scene objects.

use bedplate_core::geometry::{ObjectId, PlateObject, Triangle3};
use bedplate_core::transform::Transform3D;
use bedplate_core::{Error, Result};
use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A triangle mesh in object space.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Mesh {
    triangles: Vec<Triangle3>,
}

impl Mesh {
    /// Creates a mesh from a triangle soup.
    pub fn new(triangles: Vec<Triangle3>) -> Self {
        Self { triangles }
    }

    /// Creates a mesh from shared vertices and index triples.
    pub fn from_indexed(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<Self> {
        let mut triangles = Vec::with_capacity(faces.len());
        for (face_index, face) in faces.iter().enumerate() {
            let vertex = |i: usize| {
                vertices.get(i).copied().ok_or_else(|| {
                    Error::InvalidGeometry(format!(
                        "face {} references vertex {} of {}",
                        face_index,
                        i,
                        vertices.len()
                    ))
                })
            };
            triangles.push([vertex(face[0])?, vertex(face[1])?, vertex(face[2])?]);
        }
        Ok(Self { triangles })
    }

    /// Axis-aligned box centered on the origin in `x`/`y`, standing on `z = 0`.
    pub fn cuboid(width: f64, depth: f64, height: f64) -> Self {
        let (hx, hy) = (width / 2.0, depth / 2.0);
        let v = [
            Point3::new(-hx, -hy, 0.0),
            Point3::new(hx, -hy, 0.0),
            Point3::new(hx, hy, 0.0),
            Point3::new(-hx, hy, 0.0),
            Point3::new(-hx, -hy, height),
            Point3::new(hx, -hy, height),
            Point3::new(hx, hy, height),
            Point3::new(-hx, hy, height),
        ];
        let faces = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ];
        let triangles = faces.iter().map(|f| [v[f[0]], v[f[1]], v[f[2]]]).collect();
        Self { triangles }
    }

    pub fn triangles(&self) -> &[Triangle3] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// A concrete [`PlateObject`]: an identified mesh with a world transform.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneObject {
    id: ObjectId,
    transform: Transform3D,
    mesh: Mesh,
}

impl SceneObject {
    /// Creates an object at the identity transform.
    pub fn new(id: impl Into<ObjectId>, mesh: Mesh) -> Self {
        Self {
            id: id.into(),
            transform: Transform3D::identity(),
            mesh,
        }
    }

    /// Sets the world transform.
    pub fn with_transform(mut self, transform: Transform3D) -> Self {
        self.transform = transform;
        self
    }

    /// Moves the object to `(x, y)` on the plate.
    pub fn with_plate_position(mut self, x: f64, y: f64) -> Self {
        self.transform = self.transform.at_plate_position(x, y);
        self
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// World-space bounding box `(min, max)`, or `None` for an empty mesh.
    pub fn world_bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut points = self
            .mesh
            .triangles()
            .iter()
            .flatten()
            .map(|p| self.transform.transform_point(p));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }

    /// Lowers or raises the object so its lowest point rests on the plate (`z = 0`).
    pub fn drop_to_plate(&mut self) {
        if let Some((min, _)) = self.world_bounds() {
            if min.z.is_finite() {
                self.transform.position.z -= min.z;
            }
        }
    }
}

impl PlateObject for SceneObject {
    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn transform(&self) -> &Transform3D {
        &self.transform
    }

    fn set_transform(&mut self, transform: Transform3D) {
        self.transform = transform;
    }

    fn triangles(&self) -> &[Triangle3] {
        self.mesh.triangles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cuboid_has_twelve_triangles() {
        let mesh = Mesh::cuboid(20.0, 10.0, 5.0);
        assert_eq!(mesh.len(), 12);
    }

    #[test]
    fn test_from_indexed_rejects_bad_index() {
        let vertices = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(Mesh::from_indexed(&vertices, &[[0, 1, 2]]).is_err());
    }

    #[test]
    fn test_world_bounds() {
        let obj =
            SceneObject::new("box", Mesh::cuboid(20.0, 10.0, 5.0)).with_plate_position(100.0, 50.0);
        let (min, max) = obj.world_bounds().unwrap();
        assert_relative_eq!(min.x, 90.0);
        assert_relative_eq!(max.x, 110.0);
        assert_relative_eq!(min.y, 45.0);
        assert_relative_eq!(max.y, 55.0);
        assert_relative_eq!(max.z, 5.0);
    }

    #[test]
    fn test_drop_to_plate() {
        let mut obj = SceneObject::new("box", Mesh::cuboid(10.0, 10.0, 10.0))
            .with_transform(Transform3D::from_position(0.0, 0.0, 12.5));
        obj.drop_to_plate();
        let (min, _) = obj.world_bounds().unwrap();
        assert_relative_eq!(min.z, 0.0);
    }

    #[test]
    fn test_set_plate_position_keeps_height() {
        let mut obj = SceneObject::new("box", Mesh::cuboid(10.0, 10.0, 10.0))
            .with_transform(Transform3D::from_position(1.0, 2.0, 3.0));
        obj.set_plate_position(-40.0, 25.0);
        assert_eq!(obj.transform().plate_position(), (-40.0, 25.0));
        assert_relative_eq!(obj.transform().position.z, 3.0);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        let obj = SceneObject::new("empty", Mesh::default());
        assert!(obj.world_bounds().is_none());
    }
}
