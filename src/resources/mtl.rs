//! Wavefront MTL text parsing.

use std::collections::HashMap;

use crate::{
    error::MalformedAsset,
    resources::obj::{parse_floats, split_keyword},
};

/// Surface description referenced by `usemtl`.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: [f32; 3],
    pub ambient: [f32; 3],
    pub specular: [f32; 3],
    pub emissive: [f32; 3],
    pub shininess: f32,
    pub opacity: f32,
    pub optical_density: Option<f32>,
    pub illum: Option<u32>,
    pub diffuse_map: Option<String>,
    pub specular_map: Option<String>,
    pub normal_map: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse: [1.0, 1.0, 1.0],
            ambient: [0.0, 0.0, 0.0],
            specular: [1.0, 1.0, 1.0],
            emissive: [0.0, 0.0, 0.0],
            shininess: 400.0,
            opacity: 1.0,
            optical_density: None,
            illum: None,
            diffuse_map: None,
            specular_map: None,
            normal_map: None,
        }
    }
}

impl Material {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MtlFile {
    pub materials: HashMap<String, Material>,
    pub diagnostics: Vec<MalformedAsset>,
}

impl MtlFile {
    pub fn parse(text: &str) -> MtlFile {
        let mut file = MtlFile::default();
        let mut current: Option<Material> = None;

        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (keyword, args) = split_keyword(line);
            let result = if keyword == "newmtl" {
                if let Some(done) = current.take() {
                    file.materials.insert(done.name.clone(), done);
                }
                current = Some(Material::named(args));
                Ok(())
            } else {
                match current.as_mut() {
                    Some(material) => apply(material, keyword, args),
                    None => Err(format!("`{keyword}` before any `newmtl`")),
                }
            };
            if let Err(reason) = result {
                let diagnostic = MalformedAsset {
                    line: i + 1,
                    reason,
                };
                log::warn!("{}", diagnostic);
                file.diagnostics.push(diagnostic);
            }
        }
        if let Some(done) = current {
            file.materials.insert(done.name.clone(), done);
        }
        file
    }

    /// The named material, or the default one for names missing from the file.
    pub fn material(&self, name: &str) -> Material {
        self.materials
            .get(name)
            .cloned()
            .unwrap_or_else(|| Material::named(name))
    }
}

fn rgb(args: &str) -> Result<[f32; 3], String> {
    match parse_floats(args)?.as_slice() {
        [r, g, b, ..] => Ok([*r, *g, *b]),
        // a single value is a grey
        [v] => Ok([*v; 3]),
        _ => Err("colour needs 3 values".to_string()),
    }
}

fn scalar(args: &str) -> Result<f32, String> {
    match parse_floats(args)?.first() {
        Some(v) => Ok(*v),
        None => Err("missing value".to_string()),
    }
}

/// Texture maps may carry options before the file name; the name is the last token.
fn map_name(args: &str) -> Result<String, String> {
    args.split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| "missing texture file name".to_string())
}

fn apply(material: &mut Material, keyword: &str, args: &str) -> Result<(), String> {
    match keyword {
        "Ns" => material.shininess = scalar(args)?,
        "Ka" => material.ambient = rgb(args)?,
        "Kd" => material.diffuse = rgb(args)?,
        "Ks" => material.specular = rgb(args)?,
        "Ke" => material.emissive = rgb(args)?,
        "Ni" => material.optical_density = Some(scalar(args)?),
        "d" => material.opacity = scalar(args)?,
        "illum" => {
            material.illum = Some(
                args.parse()
                    .map_err(|_| format!("`{args}` is not an illumination model"))?,
            )
        }
        "map_Kd" => material.diffuse_map = Some(map_name(args)?),
        "map_Ns" => material.specular_map = Some(map_name(args)?),
        "map_Bump" | "bump" => material.normal_map = Some(map_name(args)?),
        other => return Err(format!("unhandled keyword `{other}`")),
    }
    Ok(())
}
