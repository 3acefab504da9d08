//! Wavefront OBJ text parsing.
//!
//! Faces are fan-triangulated and de-indexed: every triangle corner becomes
//! its own vertex in the geometry's arrays, so a geometry's attribute arrays
//! are parallel and can be drawn without an index buffer.
//!
//! Indices are 1-based; negative indices count back from the end of the list
//! read so far. `o`, `g` and `usemtl` start a new geometry once the current one
//! has vertices. A line that cannot be interpreted is skipped, logged and
//! recorded in [`ObjFile::diagnostics`]; parsing never fails as a whole.

use crate::{
    camera::Framing,
    data_structures::{mesh::Extents, mesh_graph::VertexGraph},
    error::MalformedAsset,
};

const DEFAULT_NAME: &str = "default";
const DEFAULT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// A run of faces sharing object, groups and material.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjGeometry {
    pub object: String,
    pub groups: Vec<String>,
    pub material: String,
    pub positions: Vec<[f32; 3]>,
    pub texcoords: Option<Vec<[f32; 2]>>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub colors: Option<Vec<[f32; 3]>>,
}

impl ObjGeometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn extents(&self) -> Option<Extents> {
        Extents::from_positions(&self.positions)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjFile {
    pub geometries: Vec<ObjGeometry>,
    /// `mtllib` arguments, verbatim.
    pub material_libs: Vec<String>,
    pub diagnostics: Vec<MalformedAsset>,
    positions: Vec<[f32; 3]>,
    faces: Vec<Vec<usize>>,
}

impl ObjFile {
    pub fn parse(text: &str) -> ObjFile {
        let mut parser = Parser::default();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (keyword, args) = split_keyword(line);
            if let Err(reason) = parser.line(keyword, args) {
                let diagnostic = MalformedAsset {
                    line: i + 1,
                    reason,
                };
                log::warn!("{}", diagnostic);
                parser.file.diagnostics.push(diagnostic);
            }
        }
        parser.finish()
    }

    /// Every `v` position in file order, independent of faces.
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Face polygons as 0-based position indices, before triangulation.
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Extents over all geometries.
    pub fn extents(&self) -> Option<Extents> {
        self.geometries
            .iter()
            .filter_map(ObjGeometry::extents)
            .reduce(Extents::union)
    }

    /// Centring offset and camera distance for showing the whole file.
    pub fn framing(&self) -> Option<Framing> {
        self.extents().map(|extents| Framing::from_extents(&extents))
    }

    pub fn vertex_graph(&self) -> VertexGraph {
        VertexGraph::from_faces(self.positions.len(), self.faces.iter().map(Vec::as_slice))
    }
}

/// Splits `line` into its keyword and the rest of the line, trimmed.
pub(crate) fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    }
}

pub(crate) fn parse_floats(args: &str) -> Result<Vec<f32>, String> {
    args.split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| format!("`{token}` is not a number"))
        })
        .collect()
}

/// Resolves a 1-based or negative OBJ index against `len` entries.
fn resolve(token: &str, len: usize, what: &str) -> Result<usize, String> {
    let index: i64 = token
        .parse()
        .map_err(|_| format!("`{token}` is not a {what} index"))?;
    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => len as i64 + i,
        _ => return Err(format!("{what} index 0 is invalid, indices start at 1")),
    };
    if resolved < 0 || resolved >= len as i64 {
        return Err(format!(
            "{what} index {index} out of range, {len} defined so far"
        ));
    }
    Ok(resolved as usize)
}

#[derive(Clone, Copy)]
struct Corner {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

struct Parser {
    file: ObjFile,
    colors: Vec<[f32; 3]>,
    has_colors: bool,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    current: Option<Builder>,
    object: String,
    groups: Vec<String>,
    material: String,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            file: ObjFile::default(),
            colors: Vec::new(),
            has_colors: false,
            texcoords: Vec::new(),
            normals: Vec::new(),
            current: None,
            object: DEFAULT_NAME.to_string(),
            groups: vec![DEFAULT_NAME.to_string()],
            material: DEFAULT_NAME.to_string(),
        }
    }
}

/// Geometry under construction; attribute arrays are checked for length at the end.
#[derive(Default)]
struct Builder {
    object: String,
    groups: Vec<String>,
    material: String,
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<[f32; 3]>,
}

impl Builder {
    fn finish(self, has_colors: bool) -> ObjGeometry {
        let n = self.positions.len();
        let keep = |len: usize, name: &str| {
            if len == n {
                true
            } else {
                if len > 0 {
                    log::warn!(
                        "dropping {name} of geometry `{}`: only {len} of {n} vertices have one",
                        self.object
                    );
                }
                false
            }
        };
        let texcoords = keep(self.texcoords.len(), "texcoords").then_some(self.texcoords.clone());
        let normals = keep(self.normals.len(), "normals").then_some(self.normals.clone());
        let colors = (has_colors && keep(self.colors.len(), "colors")).then_some(self.colors.clone());
        ObjGeometry {
            object: self.object,
            groups: self.groups,
            material: self.material,
            positions: self.positions,
            texcoords,
            normals,
            colors,
        }
    }
}

impl Parser {
    fn line(&mut self, keyword: &str, args: &str) -> Result<(), String> {
        match keyword {
            "v" => self.vertex(args),
            "vn" => {
                let values = parse_floats(args)?;
                if values.len() < 3 {
                    return Err(format!("`vn` needs 3 values, got {}", values.len()));
                }
                self.normals.push([values[0], values[1], values[2]]);
                Ok(())
            }
            "vt" => {
                let values = parse_floats(args)?;
                if values.is_empty() {
                    return Err("`vt` needs at least 1 value".to_string());
                }
                self.texcoords
                    .push([values[0], values.get(1).copied().unwrap_or(0.0)]);
                Ok(())
            }
            "f" => self.face(args),
            // smoothing groups do not affect de-indexed geometry
            "s" => Ok(()),
            "mtllib" => {
                self.file.material_libs.push(args.to_string());
                Ok(())
            }
            "usemtl" => {
                self.material = args.to_string();
                self.new_geometry();
                Ok(())
            }
            "g" => {
                self.groups = if args.is_empty() {
                    vec![DEFAULT_NAME.to_string()]
                } else {
                    args.split_whitespace().map(str::to_string).collect()
                };
                self.new_geometry();
                Ok(())
            }
            "o" => {
                self.object = args.to_string();
                self.new_geometry();
                Ok(())
            }
            other => Err(format!("unhandled keyword `{other}`")),
        }
    }

    fn vertex(&mut self, args: &str) -> Result<(), String> {
        let values = parse_floats(args)?;
        let color = match values.len() {
            // optional w is ignored
            3 | 4 => None,
            6 => Some([values[3], values[4], values[5]]),
            n => return Err(format!("`v` needs 3 values or 3 plus an RGB colour, got {n}")),
        };
        self.file.positions.push([values[0], values[1], values[2]]);
        self.has_colors |= color.is_some();
        self.colors.push(color.unwrap_or(DEFAULT_COLOR));
        Ok(())
    }

    fn corner(&self, token: &str) -> Result<Corner, String> {
        let mut parts = token.split('/');
        let position = match parts.next() {
            Some(p) if !p.is_empty() => resolve(p, self.file.positions.len(), "position")?,
            _ => return Err(format!("face vertex `{token}` has no position")),
        };
        let texcoord = match parts.next() {
            Some(t) if !t.is_empty() => Some(resolve(t, self.texcoords.len(), "texcoord")?),
            _ => None,
        };
        let normal = match parts.next() {
            Some(n) if !n.is_empty() => Some(resolve(n, self.normals.len(), "normal")?),
            _ => None,
        };
        Ok(Corner {
            position,
            texcoord,
            normal,
        })
    }

    fn face(&mut self, args: &str) -> Result<(), String> {
        let corners = args
            .split_whitespace()
            .map(|token| self.corner(token))
            .collect::<Result<Vec<_>, _>>()?;
        if corners.len() < 3 {
            return Err(format!("a face needs 3 vertices, got {}", corners.len()));
        }

        self.file
            .faces
            .push(corners.iter().map(|c| c.position).collect());

        let mut builder = self.current.take().unwrap_or_else(|| Builder {
            object: self.object.clone(),
            groups: self.groups.clone(),
            material: self.material.clone(),
            ..Default::default()
        });
        for tri in 0..corners.len() - 2 {
            for corner in [corners[0], corners[tri + 1], corners[tri + 2]] {
                builder.positions.push(self.file.positions[corner.position]);
                builder.colors.push(self.colors[corner.position]);
                if let Some(t) = corner.texcoord {
                    builder.texcoords.push(self.texcoords[t]);
                }
                if let Some(n) = corner.normal {
                    builder.normals.push(self.normals[n]);
                }
            }
        }
        self.current = Some(builder);
        Ok(())
    }

    /// Closes the current geometry if it has vertices; an empty one just
    /// takes over the new object, groups and material.
    fn new_geometry(&mut self) {
        match self.current.take() {
            Some(builder) if !builder.positions.is_empty() => {
                let geometry = builder.finish(self.has_colors);
                self.file.geometries.push(geometry);
            }
            _ => (),
        }
    }

    fn finish(mut self) -> ObjFile {
        self.new_geometry();
        self.file
    }
}
