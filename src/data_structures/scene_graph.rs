//! Scene graph and hierarchical scene organization.
//!
//! A [`Scene`] owns every [`SceneNode`] in an arena and hands out [`NodeId`]s.
//! Nodes with a mesh produce one draw call per frame; nodes without one are
//! pure containers whose transform is passed on to their children.
//!
//! World matrices are never stored. They are recomputed as `parent * local`
//! while walking the hierarchy, so they always follow the current transforms.

use anyhow::bail;
use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    data_structures::transform::Transform,
    render::{DrawCall, MeshId},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneNode {
    transform: Transform,
    mesh: Option<MeshId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    /// A drawable node with an identity transform.
    pub fn new(mesh: MeshId) -> Self {
        Self {
            mesh: Some(mesh),
            ..Default::default()
        }
    }

    /// A node that only groups its children.
    pub fn container() -> Self {
        Self::default()
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn mesh(&self) -> Option<MeshId> {
        self.mesh
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.transform.position = Vector3::new(x, y, z);
    }

    pub fn set_rotation(&mut self, x: f32, y: f32, z: f32) {
        self.transform.rotation = Vector3::new(x, y, z);
    }

    pub fn set_scale(&mut self, x: f32, y: f32, z: f32) {
        self.transform.scale = Vector3::new(x, y, z);
    }

    pub fn rotate_by(&mut self, dx: f32, dy: f32, dz: f32) {
        self.transform.rotation += Vector3::new(dx, dy, dz);
    }

    pub fn translate_by(&mut self, dx: f32, dy: f32, dz: f32) {
        self.transform.position += Vector3::new(dx, dy, dz);
    }

    pub fn position(&self) -> [f32; 3] {
        self.transform.position.into()
    }

    pub fn rotation(&self) -> [f32; 3] {
        self.transform.rotation.into()
    }

    pub fn scale(&self) -> [f32; 3] {
        self.transform.scale.into()
    }

    /// The node's own matrix, ignoring its ancestors.
    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.transform.to_matrix()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a top-level node.
    pub fn add(&mut self, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = None;
        node.children.clear();
        self.nodes.push(node);
        self.roots.push(id);
        id
    }

    /// Adds `node` below `parent`; its transform becomes relative to the parent.
    pub fn add_child(&mut self, parent: NodeId, mut node: SceneNode) -> anyhow::Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            bail!(
                "parent node {} does not exist, the scene has {} nodes",
                parent.0,
                self.nodes.len()
            );
        }
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    /// Applies `mutation` to every node, e.g. a per-frame spin.
    pub fn for_each_mut(&mut self, mut mutation: impl FnMut(NodeId, &mut SceneNode)) {
        self.nodes
            .iter_mut()
            .enumerate()
            .for_each(|(i, node)| mutation(NodeId(i), node));
    }

    /// `parent * ... * local` for the node, or `None` for an unknown id.
    pub fn world_matrix(&self, id: NodeId) -> Option<Matrix4<f32>> {
        let mut node = self.node(id)?;
        let mut world = node.local_matrix();
        while let Some(parent) = node.parent {
            node = self.node(parent)?;
            world = node.local_matrix() * world;
        }
        Some(world)
    }

    /// One draw call per node with a mesh, parents before their children and
    /// top-level nodes in insertion order.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        let mut calls = Vec::with_capacity(self.nodes.len());
        let mut pending: Vec<(NodeId, Matrix4<f32>)> = self
            .roots
            .iter()
            .rev()
            .map(|&root| (root, Matrix4::identity()))
            .collect();
        while let Some((id, parent_world)) = pending.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let world = parent_world * node.local_matrix();
            if let Some(mesh) = node.mesh {
                calls.push(DrawCall { mesh, model: world });
            }
            pending.extend(node.children.iter().rev().map(|&child| (child, world)));
        }
        calls
    }
}
