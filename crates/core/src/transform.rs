//! Object transforms and plate-plane bounding boxes.

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// World transform of an object on the plate.
///
/// Applied in the order: scale -> rotate -> translate. The plate plane is
/// `x`/`y`; `z` is height above the plate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform3D {
    /// Translation (object origin in world coordinates).
    pub position: Vector3<f64>,
    /// Orientation.
    pub rotation: UnitQuaternion<f64>,
    /// Per-axis scale.
    pub scale: Vector3<f64>,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform3D {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    /// Creates a translation-only transform.
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            ..Self::identity()
        }
    }

    /// Sets the rotation from Euler angles in radians (roll about x, pitch about y, yaw about z).
    pub fn with_euler(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.rotation = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        self
    }

    /// Sets the rotation.
    pub fn with_rotation(mut self, rotation: UnitQuaternion<f64>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets a uniform scale.
    pub fn with_uniform_scale(mut self, s: f64) -> Self {
        self.scale = Vector3::new(s, s, s);
        self
    }

    /// Sets a per-axis scale.
    pub fn with_scale(mut self, sx: f64, sy: f64, sz: f64) -> Self {
        self.scale = Vector3::new(sx, sy, sz);
        self
    }

    /// Returns the plate-plane position `(x, y)`.
    #[inline]
    pub fn plate_position(&self) -> (f64, f64) {
        (self.position.x, self.position.y)
    }

    /// Returns a copy moved to `(x, y)` on the plate, keeping height, rotation and scale.
    pub fn at_plate_position(mut self, x: f64, y: f64) -> Self {
        self.position.x = x;
        self.position.y = y;
        self
    }

    /// Transforms a point from object space to world space.
    #[inline]
    pub fn transform_point(&self, point: &Point3<f64>) -> Point3<f64> {
        let scaled = point.coords.component_mul(&self.scale);
        Point3::from(self.rotation * scaled + self.position)
    }

    /// Converts to a 4x4 homogeneous matrix.
    pub fn to_matrix4(&self) -> Matrix4<f64> {
        Matrix4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    /// Returns true if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
    }
}

/// Axis-aligned bounding box on the plate plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AABB2D {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl AABB2D {
    /// Creates a box from its corners.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing all points, or `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut aabb = Self::new(x, y, x, y);
        for (x, y) in iter {
            aabb.min_x = aabb.min_x.min(x);
            aabb.min_y = aabb.min_y.min(y);
            aabb.max_x = aabb.max_x.max(x);
            aabb.max_y = aabb.max_y.max(y);
        }
        Some(aabb)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Inclusive overlap test: boxes that only touch still intersect.
    #[inline]
    pub fn intersects(&self, other: &AABB2D) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// True if `other` lies entirely inside (or on the edge of) this box.
    #[inline]
    pub fn contains(&self, other: &AABB2D) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Grows the box by `amount` on every side (shrinks for negative values).
    pub fn expanded(&self, amount: f64) -> Self {
        Self::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }

    /// Moves the box by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// Returns true when min <= max on both axes.
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }
}
