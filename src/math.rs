//! Vector and matrix helpers.
//!
//! All matrices are `cgmath::Matrix4<f32>` and therefore column-major: the
//! translation lives in the last column (`m.w`) and `a * b` applies `b` first.
//! Model matrices are composed as `translate * rotate * scale`.

use cgmath::{InnerSpace, Matrix4, One, Point3, Quaternion, Rad, SquareMatrix, Vector3};

/// Lengths below this are treated as zero by [`normalize`].
pub const EPSILON: f32 = 1e-6;

pub fn subtract(a: Vector3<f32>, b: Vector3<f32>) -> Vector3<f32> {
    a - b
}

pub fn cross(a: Vector3<f32>, b: Vector3<f32>) -> Vector3<f32> {
    a.cross(b)
}

/// Divides `v` by its length.
///
/// A zero-length (or non-finite length) vector is returned as the zero vector
/// so that callers never see NaN components.
pub fn normalize(v: Vector3<f32>) -> Vector3<f32> {
    let length = v.magnitude();
    if !length.is_finite() || length < EPSILON {
        return Vector3::new(0.0, 0.0, 0.0);
    }
    v / length
}

pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}

/// Right-handed rotation of `angle` radians about the X axis.
pub fn rotate_x(angle: f32) -> Matrix4<f32> {
    Matrix4::from_angle_x(Rad(angle))
}

/// Right-handed rotation of `angle` radians about the Y axis.
pub fn rotate_y(angle: f32) -> Matrix4<f32> {
    Matrix4::from_angle_y(Rad(angle))
}

/// Right-handed rotation of `angle` radians about the Z axis.
pub fn rotate_z(angle: f32) -> Matrix4<f32> {
    Matrix4::from_angle_z(Rad(angle))
}

pub fn translate(tx: f32, ty: f32, tz: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(tx, ty, tz))
}

pub fn scale(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(sx, sy, sz)
}

/// OpenGL-style perspective projection; `fov_y` is in radians.
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    cgmath::perspective(Rad(fov_y), aspect, near, far)
}

/// Right-handed view matrix looking from `eye` towards `target`.
pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::look_at_rh(
        Point3::new(eye.x, eye.y, eye.z),
        Point3::new(target.x, target.y, target.z),
        up,
    )
}

/// `a * b`: the resulting matrix applies `b` first, then `a`.
pub fn multiply(a: &Matrix4<f32>, b: &Matrix4<f32>) -> Matrix4<f32> {
    a * b
}

/// Applies `m` to a point (w = 1).
pub fn transform_point(m: &Matrix4<f32>, p: Vector3<f32>) -> Vector3<f32> {
    (m * p.extend(1.0)).truncate()
}

/// Shortest rotation taking unit vector `from` onto unit vector `to`.
///
/// Antiparallel inputs rotate half a turn about an axis orthogonal to `from`.
pub fn quat_from_unit_vectors(from: Vector3<f32>, to: Vector3<f32>) -> Quaternion<f32> {
    let r = from.dot(to) + 1.0;
    if r < EPSILON {
        let axis = if from.x.abs() > from.z.abs() {
            Vector3::new(-from.y, from.x, 0.0)
        } else {
            Vector3::new(0.0, -from.z, from.y)
        };
        let axis = normalize(axis);
        return Quaternion::new(0.0, axis.x, axis.y, axis.z);
    }
    let c = from.cross(to);
    let q = Quaternion::new(r, c.x, c.y, c.z);
    let length = q.magnitude();
    if length < EPSILON {
        return Quaternion::one();
    }
    q / length
}

/// Flattens a matrix into the 16-float column-major layout a uniform upload expects.
pub fn to_columns(m: &Matrix4<f32>) -> [[f32; 4]; 4] {
    (*m).into()
}

pub fn is_finite(v: Vector3<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
