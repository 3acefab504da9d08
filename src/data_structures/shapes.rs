//! Parametric solids: cylinders (straight and tapered) and the colour cube.
//!
//! Cylinders share one vertex layout: index 0 is the top cap centre, index 1
//! the bottom cap centre, then `sides` top ring vertices followed by `sides`
//! bottom ring vertices. Every triangle is wound counter-clockwise when seen
//! from outside the solid.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::{
    data_structures::mesh::{Mesh, VertexAttribute},
    error::GeometryError,
};

const TOP_CENTER_COLOR: [f32; 3] = [1.0, 0.1, 0.1];
const BOTTOM_CENTER_COLOR: [f32; 3] = [1.0, 0.0, 0.0];
const TOP_RING_COLOR: [f32; 3] = [1.0, 1.0, 0.0];
const BOTTOM_RING_COLOR: [f32; 3] = [0.2, 0.2, 0.0];

/// Parameters of [`cylinder`], loadable from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CylinderParams {
    pub sides: u32,
    pub height: f32,
    pub radius: f32,
}

impl Default for CylinderParams {
    fn default() -> Self {
        Self {
            sides: 20,
            height: 2.0,
            radius: 1.0,
        }
    }
}

impl CylinderParams {
    pub fn build(&self) -> Result<Mesh, GeometryError> {
        cylinder(self.sides, self.height, self.radius)
    }
}

fn check_sides(sides: u32) -> Result<(), GeometryError> {
    if sides < 3 {
        return Err(GeometryError::invalid(
            "sides",
            format!("a cylinder needs at least 3 sides, got {sides}"),
        ));
    }
    Ok(())
}

fn check_dimension(name: &'static str, value: f32) -> Result<(), GeometryError> {
    if !value.is_finite() || value < 0.0 {
        return Err(GeometryError::invalid(
            name,
            format!("expected a finite, non-negative value, got {value}"),
        ));
    }
    Ok(())
}

/// Cap centres followed by the two rings, see the module docs for the layout.
fn ring_positions(sides: u32, height: f32, radius_top: f32, radius_bottom: f32) -> Vec<[f32; 3]> {
    let half = height / 2.0;
    let step = TAU / sides as f32;
    let ring = |radius: f32, y: f32| {
        (0..sides).map(move |i| {
            let angle = i as f32 * step;
            [radius * angle.cos(), y, radius * angle.sin()]
        })
    };

    let mut positions = Vec::with_capacity(2 + 2 * sides as usize);
    positions.push([0.0, half, 0.0]);
    positions.push([0.0, -half, 0.0]);
    positions.extend(ring(radius_top, half));
    positions.extend(ring(radius_bottom, -half));
    positions
}

fn ring_indices(sides: u32) -> Vec<u32> {
    let top = |i: u32| 2 + i % sides;
    let bottom = |i: u32| 2 + sides + i % sides;

    let mut indices = Vec::with_capacity(12 * sides as usize);
    for i in 0..sides {
        indices.extend_from_slice(&[0, top(i + 1), top(i)]);
    }
    for i in 0..sides {
        indices.extend_from_slice(&[1, bottom(i), bottom(i + 1)]);
    }
    for i in 0..sides {
        indices.extend_from_slice(&[top(i), top(i + 1), bottom(i)]);
        indices.extend_from_slice(&[top(i + 1), bottom(i + 1), bottom(i)]);
    }
    indices
}

/// Closed cylinder centred on the origin with its axis along Y.
///
/// Produces `2 + 2 * sides` vertices with per-vertex colours and
/// `12 * sides` indices: one triangle fan per cap plus two triangles per
/// side quad.
pub fn cylinder(sides: u32, height: f32, radius: f32) -> Result<Mesh, GeometryError> {
    check_sides(sides)?;
    check_dimension("height", height)?;
    check_dimension("radius", radius)?;

    let positions = ring_positions(sides, height, radius, radius);
    let n = sides as usize;
    let mut colors = Vec::with_capacity(positions.len());
    colors.push(TOP_CENTER_COLOR);
    colors.push(BOTTOM_CENTER_COLOR);
    colors.extend(std::iter::repeat_n(TOP_RING_COLOR, n));
    colors.extend(std::iter::repeat_n(BOTTOM_RING_COLOR, n));

    Ok(Mesh::from_parts(
        positions,
        Some(VertexAttribute::Colors(colors)),
        ring_indices(sides),
    ))
}

/// Cylinder whose top and bottom radii differ, with smooth side normals.
///
/// Used for branch segments: the caller reorients the canonical vertical
/// solid onto the segment direction.
pub fn tapered_cylinder(
    sides: u32,
    height: f32,
    radius_top: f32,
    radius_bottom: f32,
) -> Result<Mesh, GeometryError> {
    check_sides(sides)?;
    check_dimension("height", height)?;
    check_dimension("radius_top", radius_top)?;
    check_dimension("radius_bottom", radius_bottom)?;

    let positions = ring_positions(sides, height, radius_top, radius_bottom);
    // Slope of the side wall tilts the radial normal up or down.
    let slope = if height > 0.0 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(positions.len());
    normals.push([0.0, 1.0, 0.0]);
    normals.push([0.0, -1.0, 0.0]);
    normals.extend(positions[2..].iter().map(|p| {
        let radial = cgmath::Vector3::new(p[0], 0.0, p[2]);
        let radial = crate::math::normalize(radial);
        let normal: [f32; 3] =
            crate::math::normalize(cgmath::Vector3::new(radial.x, slope, radial.z)).into();
        normal
    }));

    Ok(Mesh::from_parts(
        positions,
        Some(VertexAttribute::Normals(normals)),
        ring_indices(sides),
    ))
}

/// Axis-aligned cube of edge `size` centred on the origin, one colour per face.
///
/// Faces do not share vertices (24 vertices, 36 indices) so each keeps a flat
/// colour.
pub fn cube(size: f32) -> Result<Mesh, GeometryError> {
    check_dimension("size", size)?;
    let h = size / 2.0;

    // (corners, colour) per face, corners counter-clockwise from outside.
    let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
        // front (+Z)
        (
            [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
            [5.0 / 7.0, 3.0 / 7.0, 1.0],
        ),
        // back (-Z)
        (
            [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
            [1.0 / 3.0, 1.0 / 3.0, 1.0],
        ),
        // left (-X)
        (
            [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
            [0.0, 0.0, 1.0],
        ),
        // right (+X)
        (
            [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
            [1.0, 0.0, 0.0],
        ),
        // bottom (-Y)
        (
            [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
            [1.0, 1.0, 0.0],
        ),
        // top (+Y)
        (
            [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
            [0.0, 1.0, 0.0],
        ),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut colors = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face, (corners, color)) in faces.into_iter().enumerate() {
        let base = face as u32 * 4;
        positions.extend_from_slice(&corners);
        colors.extend(std::iter::repeat_n(color, 4));
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Ok(Mesh::from_parts(
        positions,
        Some(VertexAttribute::Colors(colors)),
        indices,
    ))
}
