use crate::{
    data_structures::mesh::{Mesh, VertexAttribute},
    resources::obj::{ObjFile, ObjGeometry},
};

/**
 * OBJ geometries are already de-indexed, so the index buffer is simply 0..n.
 * Normals are preferred over vertex colours when a geometry carries both since
 * a mesh only holds one attribute stream.
 */
impl From<&ObjGeometry> for Mesh {
    fn from(geometry: &ObjGeometry) -> Self {
        let attribute = match (&geometry.normals, &geometry.colors) {
            (Some(normals), _) => Some(VertexAttribute::Normals(normals.clone())),
            (None, Some(colors)) => Some(VertexAttribute::Colors(colors.clone())),
            (None, None) => None,
        };
        let indices = (0..geometry.positions.len() as u32).collect();
        Mesh::from_parts(geometry.positions.clone(), attribute, indices)
    }
}

pub fn load_meshes(obj: &ObjFile) -> Vec<Mesh> {
    obj.geometries
        .iter()
        .filter(|geometry| {
            if geometry.positions.len() > u32::MAX as usize {
                log::warn!(
                    "Geometry {} has too many vertices for 32-bit indices and is skipped.",
                    geometry.object
                );
                return false;
            }
            true
        })
        .map(Mesh::from)
        .collect()
}
