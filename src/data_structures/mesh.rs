//! Triangle meshes produced by the builders and the OBJ loader.
//!
//! A [`Mesh`] is immutable once built: every index points at an existing
//! vertex and the index list holds whole triangles. Operations that change
//! geometry (`merge`, `translated`, `oriented`) consume the mesh and return a
//! new one, re-establishing those invariants by construction.

use cgmath::{Quaternion, Vector3};

use crate::math;

/// Per-vertex data parallel to the positions.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexAttribute {
    Colors(Vec<[f32; 3]>),
    Normals(Vec<[f32; 3]>),
}

impl VertexAttribute {
    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    pub fn values(&self) -> &[[f32; 3]] {
        match self {
            VertexAttribute::Colors(values) | VertexAttribute::Normals(values) => values,
        }
    }

    fn same_kind(&self, other: &VertexAttribute) -> bool {
        matches!(
            (self, other),
            (VertexAttribute::Colors(_), VertexAttribute::Colors(_))
                | (VertexAttribute::Normals(_), VertexAttribute::Normals(_))
        )
    }

    fn extend(&mut self, other: VertexAttribute) {
        let values = match self {
            VertexAttribute::Colors(values) | VertexAttribute::Normals(values) => values,
        };
        match other {
            VertexAttribute::Colors(more) | VertexAttribute::Normals(more) => values.extend(more),
        }
    }
}

/// Axis-aligned extents of a set of positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Extents {
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a [f32; 3]>) -> Option<Self> {
        positions.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Extents { min: *p, max: *p },
                Some(e) => e.include(*p),
            })
        })
    }

    fn include(self, p: [f32; 3]) -> Self {
        Extents {
            min: [self.min[0].min(p[0]), self.min[1].min(p[1]), self.min[2].min(p[2])],
            max: [self.max[0].max(p[0]), self.max[1].max(p[1]), self.max[2].max(p[2])],
        }
    }

    pub fn union(self, other: Extents) -> Self {
        self.include(other.min).include(other.max)
    }

    pub fn range(&self) -> Vector3<f32> {
        Vector3::from(self.max) - Vector3::from(self.min)
    }

    pub fn center(&self) -> Vector3<f32> {
        Vector3::from(self.min) + self.range() * 0.5
    }
}

/// Midpoint and unit normal of one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceFrame {
    pub center: Vector3<f32>,
    pub normal: Vector3<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    positions: Vec<[f32; 3]>,
    attribute: Option<VertexAttribute>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Assembles a mesh from parts that are valid by construction.
    pub(crate) fn from_parts(
        positions: Vec<[f32; 3]>,
        attribute: Option<VertexAttribute>,
        indices: Vec<u32>,
    ) -> Self {
        let mesh = Self {
            positions,
            attribute,
            indices,
        };
        debug_assert!(mesh.is_valid(), "mesh assembled with broken invariants");
        mesh
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn attribute(&self) -> Option<&VertexAttribute> {
        self.attribute.as_ref()
    }

    pub fn colors(&self) -> Option<&[[f32; 3]]> {
        match &self.attribute {
            Some(VertexAttribute::Colors(colors)) => Some(colors),
            _ => None,
        }
    }

    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        match &self.attribute {
            Some(VertexAttribute::Normals(normals)) => Some(normals),
            _ => None,
        }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// Positions as a flat `x, y, z, x, y, z, ...` slice for a vertex buffer.
    pub fn positions_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.positions)
    }

    /// The colours or normals as a flat slice, if present.
    pub fn attribute_flat(&self) -> Option<&[f32]> {
        self.attribute
            .as_ref()
            .map(|attribute| bytemuck::cast_slice(attribute.values()))
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Checks every structural invariant: whole triangles, in-range indices
    /// and an attribute array parallel to the positions.
    pub fn is_valid(&self) -> bool {
        let vertex_count = self.positions.len();
        self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < vertex_count)
            && self
                .attribute
                .as_ref()
                .is_none_or(|attribute| attribute.len() == vertex_count)
    }

    pub fn extents(&self) -> Option<Extents> {
        Extents::from_positions(&self.positions)
    }

    /// Concatenates meshes, offsetting each part's indices by the number of
    /// vertices that precede it.
    ///
    /// The attribute survives only when every part carries the same kind;
    /// otherwise it is dropped so it can never fall out of step with the
    /// positions.
    pub fn merge(parts: impl IntoIterator<Item = Mesh>) -> Mesh {
        let mut merged = Mesh::default();
        let mut attribute_lost = false;
        for (n, part) in parts.into_iter().enumerate() {
            let offset = merged.positions.len() as u32;
            merged
                .indices
                .extend(part.indices.iter().map(|index| index + offset));
            merged.positions.extend(part.positions);

            if attribute_lost {
                continue;
            }
            match (merged.attribute.as_mut(), part.attribute) {
                (None, Some(attribute)) if n == 0 => merged.attribute = Some(attribute),
                (Some(ours), Some(theirs)) if ours.same_kind(&theirs) => ours.extend(theirs),
                (None, None) => (),
                _ => {
                    log::debug!("dropping vertex attribute while merging meshes of mixed layout");
                    merged.attribute = None;
                    attribute_lost = true;
                }
            }
        }
        debug_assert!(merged.is_valid());
        merged
    }

    /// Returns the mesh moved by `offset`.
    pub fn translated(mut self, offset: Vector3<f32>) -> Mesh {
        for p in self.positions.iter_mut() {
            *p = (Vector3::from(*p) + offset).into();
        }
        self
    }

    /// Rotates the mesh by `rotation` and then moves it to `origin`.
    /// Normals are rotated along with the positions.
    pub fn oriented(mut self, rotation: Quaternion<f32>, origin: Vector3<f32>) -> Mesh {
        for p in self.positions.iter_mut() {
            *p = (rotation * Vector3::from(*p) + origin).into();
        }
        if let Some(VertexAttribute::Normals(normals)) = self.attribute.as_mut() {
            for n in normals.iter_mut() {
                *n = math::normalize(rotation * Vector3::from(*n)).into();
            }
        }
        self
    }

    /// Midpoint and normal of every triangle, e.g. for placing instances on
    /// the faces of a loaded model. Degenerate triangles get a zero normal.
    pub fn face_frames(&self) -> Vec<FaceFrame> {
        self.triangles()
            .map(|[a, b, c]| {
                let v0 = Vector3::from(self.positions[a as usize]);
                let v1 = Vector3::from(self.positions[b as usize]);
                let v2 = Vector3::from(self.positions[c as usize]);
                let normal = math::normalize(math::cross(
                    math::subtract(v1, v0),
                    math::subtract(v2, v0),
                ));
                FaceFrame {
                    center: (v0 + v1 + v2) / 3.0,
                    normal,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(color: bool) -> Mesh {
        let attribute = color.then(|| VertexAttribute::Colors(vec![[1.0, 0.0, 0.0]; 3]));
        Mesh::from_parts(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            attribute,
            vec![0, 1, 2],
        )
    }

    #[test]
    fn merge_offsets_indices_by_preceding_vertex_count() {
        let merged = Mesh::merge([triangle(true), triangle(true), triangle(true)]);
        assert_eq!(merged.vertex_count(), 9);
        assert_eq!(merged.indices(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(merged.colors().map(<[_]>::len), Some(9));
        assert!(merged.is_valid());
    }

    #[test]
    fn merge_drops_mismatched_attributes() {
        let merged = Mesh::merge([triangle(true), triangle(false)]);
        assert!(merged.attribute().is_none());
        assert!(merged.is_valid());
    }

    #[test]
    fn flat_views_have_three_floats_per_vertex() {
        let mesh = triangle(true);
        assert_eq!(mesh.positions_flat().len(), 9);
        assert_eq!(mesh.positions_flat()[3], 1.0);
        assert_eq!(mesh.attribute_flat().map(<[_]>::len), Some(9));
        assert_eq!(mesh.index_bytes().len(), 12);
    }

    #[test]
    fn face_frames_report_center_and_unit_normal() {
        let frames = triangle(false).face_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].normal, Vector3::new(0.0, 0.0, 1.0));
        assert!((frames[0].center.x - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn extents_cover_all_positions() {
        let mesh = triangle(false).translated(Vector3::new(0.0, -2.0, 0.0));
        let extents = mesh.extents().unwrap();
        assert_eq!(extents.min, [0.0, -2.0, 0.0]);
        assert_eq!(extents.max, [1.0, -1.0, 0.0]);
        assert!(Mesh::default().extents().is_none());
    }
}
