//! Local transform of a scene node.
//!
//! Position, Euler rotation and per-axis scale are the only state. The model
//! matrix is derived from them on every call, never stored.

use std::ops::Mul;

use cgmath::{Matrix4, Vector3};

use crate::math;

/// Position, rotation (Euler angles in radians per axis) and per-axis scale.
///
/// The derived matrix is `T * Rx * Ry * Rz * S`: scale first, then rotate about
/// Z, Y and X, then translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transform (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_uniform_scale(mut self, factor: f32) -> Self {
        self.scale = Vector3::new(factor, factor, factor);
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        let p = self.position;
        let r = self.rotation;
        let s = self.scale;
        math::translate(p.x, p.y, p.z)
            * math::rotate_x(r.x)
            * math::rotate_y(r.y)
            * math::rotate_z(r.z)
            * math::scale(s.x, s.y, s.z)
    }

    /// Column-major model matrix, ready for a uniform upload.
    pub fn to_raw(&self) -> TransformRaw {
        TransformRaw {
            model: math::to_columns(&self.to_matrix()),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

/// Applies `rhs` inside the frame of `self`: `parent * child`.
impl<'a, 'b> Mul<&'b Transform> for &'a Transform {
    type Output = Matrix4<f32>;

    fn mul(self, rhs: &'b Transform) -> Self::Output {
        self.to_matrix() * rhs.to_matrix()
    }
}

/**
 * The raw transform is what a backend stores per draw call
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<Matrix4<f32>> for TransformRaw {
    fn from(m: Matrix4<f32>) -> Self {
        Self {
            model: math::to_columns(&m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::SquareMatrix;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_transform_gives_identity_matrix() {
        assert_eq!(Transform::new().to_matrix(), Matrix4::identity());
        assert_eq!(
            Transform::default().to_raw().model,
            math::to_columns(&Matrix4::identity())
        );
    }

    #[test]
    fn scale_then_rotate_then_translate() {
        let transform = Transform {
            position: Vector3::new(10.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, FRAC_PI_2),
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        // (1,0,0) -> scaled (2,0,0) -> rotated (0,2,0) -> moved (10,2,0)
        let p = math::transform_point(&transform.to_matrix(), Vector3::unit_x());
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn z_rotation_is_applied_before_x_rotation() {
        let transform = Transform {
            rotation: Vector3::new(FRAC_PI_2, 0.0, FRAC_PI_2),
            ..Transform::new()
        };
        // Rz: x -> y, then Rx: y -> z
        let p = math::transform_point(&transform.to_matrix(), Vector3::unit_x());
        assert_relative_eq!(p.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn parent_times_child_nests_frames() {
        let parent = Transform::from(Vector3::new(0.0, 5.0, 0.0));
        let child = Transform::from(Vector3::new(1.0, 0.0, 0.0)).with_uniform_scale(3.0);
        let p = math::transform_point(&(&parent * &child), Vector3::unit_x());
        assert_relative_eq!(p.x, 4.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 5.0, epsilon = 1e-5);
    }
}
