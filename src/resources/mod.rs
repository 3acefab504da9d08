//! Loading meshes and materials from external files.
//!
//! Parsing is synchronous and works on text; [`AssetSource`] only decides where that
//! text comes from. On the web the host fetches the files itself and hands them over
//! with [`AssetSource::with_text`] before the render loop is armed.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::data_structures::mesh::Mesh;

pub mod mesh;
pub mod mtl;
pub mod obj;

use mtl::{Material, MtlFile};
use obj::{ObjFile, ObjGeometry};

#[derive(Debug, Clone)]
pub struct AssetSource {
    pub root: PathBuf,
    preloaded: HashMap<String, String>,
}

impl Default for AssetSource {
    fn default() -> Self {
        Self::new("./assets")
    }
}

impl AssetSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            preloaded: HashMap::new(),
        }
    }

    /// Serves `text` for `file_name` instead of reading it from `root`.
    pub fn with_text(mut self, file_name: &str, text: impl Into<String>) -> Self {
        self.preloaded.insert(file_name.to_string(), text.into());
        self
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub async fn load_string(&self, file_name: &str) -> anyhow::Result<String> {
        if let Some(text) = self.preloaded.get(file_name) {
            return Ok(text.clone());
        }
        let path = self.path(file_name);
        // TODO: switch to async file IO once an executor is part of the native build
        let txt = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("could not read {}: {}", path.display(), e))?;
        Ok(txt)
    }
}

/// A parsed OBJ file with its meshes and every material its `mtllib`s define.
#[derive(Debug, Clone)]
pub struct Model {
    pub obj: ObjFile,
    pub meshes: Vec<Mesh>,
    pub materials: HashMap<String, Material>,
}

impl Model {
    /// Material for `geometry`; unknown names fall back to the default material.
    pub fn material_for(&self, geometry: &ObjGeometry) -> Material {
        self.materials
            .get(&geometry.material)
            .cloned()
            .unwrap_or_else(|| Material::named(&geometry.material))
    }
}

pub async fn load_model_obj(source: &AssetSource, file_name: &str) -> anyhow::Result<Model> {
    let obj_text = source.load_string(file_name).await?;
    let obj = ObjFile::parse(&obj_text);
    if !obj.diagnostics.is_empty() {
        log::warn!(
            "{} line(s) of {} were skipped",
            obj.diagnostics.len(),
            file_name
        );
    }

    let loads = obj
        .material_libs
        .iter()
        .map(|lib| async move { (lib, source.load_string(lib).await) });
    let mut materials = HashMap::new();
    for (lib, result) in futures::future::join_all(loads).await {
        match result {
            Ok(text) => materials.extend(MtlFile::parse(&text).materials),
            Err(e) => {
                log::warn!(
                    "Material library {} referenced by {} could not be loaded: {}",
                    lib,
                    file_name,
                    e
                );
            }
        }
    }

    let meshes = mesh::load_meshes(&obj);
    Ok(Model {
        obj,
        meshes,
        materials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn preloaded_text_is_served_without_touching_disk() {
        let source = AssetSource::new("/does/not/exist")
            .with_text("tri.obj", "mtllib tri.mtl\nusemtl red\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
            .with_text("tri.mtl", "newmtl red\nKd 1 0 0\n");
        let model = block_on(load_model_obj(&source, "tri.obj")).unwrap();
        assert_eq!(model.meshes.len(), 1);
        let material = model.material_for(&model.obj.geometries[0]);
        assert_eq!(material.diffuse, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_material_library_is_not_fatal() {
        let source = AssetSource::new("/does/not/exist")
            .with_text("tri.obj", "mtllib gone.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let model = block_on(load_model_obj(&source, "tri.obj")).unwrap();
        assert!(model.materials.is_empty());
        assert_eq!(model.material_for(&model.obj.geometries[0]).shininess, 400.0);
    }

    #[test]
    fn missing_model_is_an_error() {
        let source = AssetSource::new("/does/not/exist");
        assert!(block_on(source.load_string("nope.obj")).is_err());
    }
}
