//! flow-geom
//!
//! Procedural geometry and a small frame-driven scene runtime for WebGL-style
//! renderers, usable natively and from WASM. The crate builds index-valid
//! meshes (cylinders, cubes, L-system plants), parses OBJ/MTL text, keeps a
//! scene of transformable nodes and drives it through a render loop that hands
//! draw calls to whatever backend the host provides.
//!
//! High-level modules
//! - `math`: vector helpers and column-major 4x4 matrix builders
//! - `error`: typed errors for rejected parameters and malformed asset lines
//! - `camera`: camera, projection and model framing
//! - `context`: render context owning the backend, mesh handles and camera
//! - `data_structures`: meshes, shape builders, L-systems, scene nodes and animations
//! - `flow`: flows, the render loop state machine and frame scheduling
//! - `render`: draw calls and the backend seam
//! - `resources`: OBJ/MTL parsing and asset loading
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod math;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use error::{GeometryError, MalformedAsset};
