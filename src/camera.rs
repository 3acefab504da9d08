//! Camera, projection and framing.
//!
//! - [`Camera`] is an eye/front/up camera producing a right-handed look-at view
//! - [`Projection`] holds the perspective parameters and follows surface resizes
//! - [`CameraUniform`] is the combined view-projection as uploaded per frame
//! - [`Framing`] derives a camera distance and clip planes from model extents

use cgmath::{Deg, InnerSpace, Matrix4, Rad, SquareMatrix, Vector3};

use crate::{data_structures::mesh::Extents, math};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vector3<f32>,
    /// Viewing direction; kept unit length.
    pub front: Vector3<f32>,
    pub up: Vector3<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((0.0, 0.0, 12.0), (0.0, 0.0, -1.0))
    }
}

impl Camera {
    /// A zero `front` falls back to looking down -Z.
    pub fn new<E: Into<Vector3<f32>>, F: Into<Vector3<f32>>>(eye: E, front: F) -> Self {
        let front = math::normalize(front.into());
        Self {
            eye: eye.into(),
            front: if front.magnitude2() > 0.0 {
                front
            } else {
                -Vector3::unit_z()
            },
            up: Vector3::unit_y(),
        }
    }

    /// Points the camera at `target` without moving it.
    pub fn look_at(&mut self, target: Vector3<f32>) {
        let front = math::normalize(target - self.eye);
        if front.magnitude2() > 0.0 {
            self.front = front;
        }
    }

    pub fn target(&self) -> Vector3<f32> {
        self.eye + self.front
    }

    /// `up`, or the world axis least aligned with `front` when the two are parallel.
    fn view_up(&self) -> Vector3<f32> {
        if math::cross(self.front, self.up).magnitude2() > 1e-12 {
            return self.up;
        }
        [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()]
            .into_iter()
            .min_by(|a, b| {
                self.front
                    .dot(*a)
                    .abs()
                    .total_cmp(&self.front.dot(*b).abs())
            })
            .unwrap_or_else(Vector3::unit_z)
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        math::look_at(self.eye, self.target(), self.view_up())
    }

    pub fn right(&self) -> Vector3<f32> {
        math::normalize(math::cross(self.front, self.view_up()))
    }

    /// Moves along the viewing direction; negative values move back.
    pub fn move_forward(&mut self, amount: f32) {
        self.eye += self.front * amount;
    }

    /// Strafes along the camera's right vector; negative values move left.
    pub fn move_right(&mut self, amount: f32) {
        self.eye += self.right() * amount;
    }

    /// Places the camera on +Z at the framing distance, looking at the origin.
    pub fn frame(&mut self, framing: &Framing) {
        self.eye = Vector3::new(0.0, 0.0, framing.distance);
        self.front = -Vector3::unit_z();
        self.up = Vector3::unit_y();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(800, 600, Deg(60.0), 1.0, 2000.0)
    }
}

impl Projection {
    /// A zero-sized surface, e.g. a canvas before layout, starts with a square aspect.
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        let aspect = if width > 0 && height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
        Self {
            aspect,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn set_planes(&mut self, znear: f32, zfar: f32) {
        self.znear = znear;
        self.zfar = zfar;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn planes(&self) -> (f32, f32) {
        (self.znear, self.zfar)
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        math::perspective(self.fovy.0, self.aspect, self.znear, self.zfar)
    }
}

/// Combined view-projection for a uniform upload.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_proj = (projection.matrix() * camera.view_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// How to centre a model and where to put the camera so all of it is in view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Translation that moves the model's centre to the origin.
    pub offset: Vector3<f32>,
    pub distance: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Framing {
    pub fn from_extents(extents: &Extents) -> Self {
        let radius = extents.range().magnitude() * 1.2;
        Self {
            offset: -extents.center(),
            distance: radius,
            znear: radius / 100.0,
            zfar: radius * 3.0,
        }
    }
}
