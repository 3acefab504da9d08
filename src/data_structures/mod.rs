//! Geometry and scene data structures.
//!
//! This module contains the core data types for building and animating scenes:
//!
//! - `mesh` holds triangle meshes and the operations that keep their indices valid
//! - `shapes` contains the parametric builders (cylinder, tapered cylinder, cube)
//! - `lsystem` generates branching plant meshes from string-rewriting grammars
//! - `transform` holds a node's position, Euler rotation and scale
//! - `scene_graph` enables hierarchical scene organization
//! - `animation` drives node transforms frame by frame
//! - `mesh_graph` is the vertex adjacency graph used for path queries on loaded models

pub mod animation;
pub mod lsystem;
pub mod mesh;
pub mod mesh_graph;
pub mod scene_graph;
pub mod shapes;
pub mod transform;
