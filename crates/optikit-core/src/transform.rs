//! Rigid coordinate transforms carried by the path traversal.

use nalgebra::{Matrix3, Vector3};

/// A rigid transform: rotation followed by translation.
///
/// The sequence model accumulates one of these per surface when computing
/// global coordinates from a chosen starting surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform3 {
    /// Rotation part.
    pub rot: Matrix3<f64>,
    /// Translation part.
    pub trans: Vector3<f64>,
}

impl Transform3 {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rot: Matrix3::identity(),
            trans: Vector3::zeros(),
        }
    }

    /// A pure translation along the local z axis.
    pub fn z_offset(dz: f64) -> Self {
        Self {
            rot: Matrix3::identity(),
            trans: Vector3::new(0.0, 0.0, dz),
        }
    }

    /// Compose `self` with a following transform.
    pub fn compose(&self, next: &Transform3) -> Self {
        Self {
            rot: self.rot * next.rot,
            trans: self.trans + self.rot * next.trans,
        }
    }
}

impl Default for Transform3 {
    fn default() -> Self {
        Self::identity()
    }
}
