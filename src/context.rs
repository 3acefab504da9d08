//! The render context passed explicitly through the frame loop.
//!
//! A [`Context`] owns the backend, the handles of every uploaded mesh, the
//! camera and projection, and the runtime settings flows may change from
//! `on_init`. Nothing here is global.

use crate::{
    camera::{Camera, CameraUniform, Projection},
    data_structures::{mesh::Mesh, transform::TransformRaw},
    render::{DrawCall, FrameUniforms, MeshId, RenderBackend},
};

pub struct Context<B: RenderBackend> {
    backend: B,
    meshes: Vec<B::MeshHandle>,
    pub camera: Camera,
    pub projection: Projection,
    pub clear_colour: [f32; 4],
    pub tick_duration_millis: u64,
}

impl<B: RenderBackend> Context<B> {
    pub fn new(backend: B, width: u32, height: u32) -> Self {
        let projection = Projection::new(width, height, cgmath::Deg(60.0), 1.0, 2000.0);
        Self {
            backend,
            meshes: Vec::new(),
            camera: Camera::default(),
            projection,
            clear_colour: [0.1, 0.2, 0.3, 1.0],
            tick_duration_millis: 1000,
        }
    }

    /// Uploads `mesh` once; draw calls refer to it by the returned id.
    pub fn register_mesh(&mut self, mesh: &Mesh) -> anyhow::Result<MeshId> {
        let handle = self.backend.upload_mesh(mesh)?;
        self.meshes.push(handle);
        let id = MeshId::new(self.meshes.len() - 1);
        log::debug!(
            "registered mesh {} ({} vertices, {} triangles)",
            id.index(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    pub fn uniforms(&self) -> FrameUniforms {
        FrameUniforms {
            view: self.camera.view_matrix(),
            projection: self.projection.matrix(),
            clear_colour: self.clear_colour,
        }
    }

    pub fn camera_uniform(&self) -> CameraUniform {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&self.camera, &self.projection);
        uniform
    }

    /// Issues one frame. Draws naming an unknown mesh are skipped with a
    /// warning. Returns the number of draws sent to the backend.
    ///
    /// A frame that was begun is always ended, even when a draw fails.
    pub(crate) fn submit(&mut self, draws: &[DrawCall]) -> anyhow::Result<usize> {
        let uniforms = self.uniforms();
        self.backend.begin_frame(&uniforms)?;
        let drawn = self.draw_all(draws);
        let ended = self.backend.end_frame();
        let drawn = drawn?;
        ended?;
        Ok(drawn)
    }

    fn draw_all(&mut self, draws: &[DrawCall]) -> anyhow::Result<usize> {
        let mut drawn = 0;
        for call in draws {
            let Some(handle) = self.meshes.get(call.mesh.index()) else {
                log::warn!(
                    "you attempted to draw mesh {} but only {} meshes are registered",
                    call.mesh.index(),
                    self.meshes.len()
                );
                continue;
            };
            self.backend.draw(handle, &TransformRaw::from(call.model))?;
            drawn += 1;
        }
        Ok(drawn)
    }
}
