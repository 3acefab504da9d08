//! Draw-call composition and the rendering backend seam.
//!
//! The engine never talks to a graphics API directly. Each frame it hands a
//! [`RenderBackend`] the frame uniforms followed by one draw per [`DrawCall`].
//! Meshes are uploaded once and referred to by [`MeshId`] afterwards.
//!
//! # Key types
//!
//! - [`DrawCall`] is a mesh reference plus the model matrix to bind for it
//! - [`FrameUniforms`] carries view, projection and clear colour for one frame
//! - [`RenderBackend`] is implemented by a WebGL/wgpu binding, or by
//! - [`Recorder`], which stores everything it receives for headless use and tests
//!

use cgmath::Matrix4;

use crate::{data_structures::mesh::Mesh, data_structures::transform::TransformRaw};

/// Handle to a mesh registered with a [`crate::context::Context`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

impl MeshId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// One mesh drawn with one model matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    pub mesh: MeshId,
    pub model: Matrix4<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUniforms {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub clear_colour: [f32; 4],
}

/// A graphics binding able to hold meshes and issue draws.
///
/// The call order within a frame is always `begin_frame`, any number of
/// `draw`s, then `end_frame`.
pub trait RenderBackend {
    type MeshHandle;

    /// Creates vertex/index buffers for `mesh`.
    fn upload_mesh(&mut self, mesh: &Mesh) -> anyhow::Result<Self::MeshHandle>;

    fn begin_frame(&mut self, uniforms: &FrameUniforms) -> anyhow::Result<()>;

    fn draw(&mut self, mesh: &Self::MeshHandle, model: &TransformRaw) -> anyhow::Result<()>;

    fn end_frame(&mut self) -> anyhow::Result<()>;
}

/// What a [`Recorder`] keeps of an uploaded mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedMesh {
    pub positions: Vec<f32>,
    pub attribute: Option<Vec<f32>>,
    pub indices: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    pub uniforms: FrameUniforms,
    pub draws: Vec<(usize, TransformRaw)>,
}

/// Backend that records uploads and frames instead of rendering them.
#[derive(Debug, Default)]
pub struct Recorder {
    meshes: Vec<RecordedMesh>,
    frames: Vec<RecordedFrame>,
    current: Option<RecordedFrame>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meshes(&self) -> &[RecordedMesh] {
        &self.meshes
    }

    /// Completed frames, oldest first.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }
}

impl RenderBackend for Recorder {
    type MeshHandle = usize;

    fn upload_mesh(&mut self, mesh: &Mesh) -> anyhow::Result<usize> {
        if !mesh.is_valid() {
            anyhow::bail!("refusing to upload a mesh with out-of-range indices");
        }
        self.meshes.push(RecordedMesh {
            positions: mesh.positions_flat().to_vec(),
            attribute: mesh.attribute_flat().map(<[f32]>::to_vec),
            indices: mesh.indices().to_vec(),
        });
        Ok(self.meshes.len() - 1)
    }

    fn begin_frame(&mut self, uniforms: &FrameUniforms) -> anyhow::Result<()> {
        if self.current.is_some() {
            anyhow::bail!("begin_frame called twice without end_frame");
        }
        self.current = Some(RecordedFrame {
            uniforms: *uniforms,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw(&mut self, mesh: &usize, model: &TransformRaw) -> anyhow::Result<()> {
        if *mesh >= self.meshes.len() {
            anyhow::bail!("mesh handle {} was never uploaded", mesh);
        }
        match self.current.as_mut() {
            Some(frame) => {
                frame.draws.push((*mesh, *model));
                Ok(())
            }
            None => anyhow::bail!("draw outside of a frame"),
        }
    }

    fn end_frame(&mut self) -> anyhow::Result<()> {
        match self.current.take() {
            Some(frame) => {
                self.frames.push(frame);
                Ok(())
            }
            None => anyhow::bail!("end_frame without begin_frame"),
        }
    }
}
