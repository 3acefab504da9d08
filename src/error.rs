//! Error types shared by the mesh builders and the asset parsers.

use thiserror::Error;

/// Rejected shape or generation parameters.
///
/// Builders return this before any vertex is emitted, so a failed call never
/// yields a partial mesh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl GeometryError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// A single OBJ/MTL line that could not be interpreted and was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed asset line {line}: {reason}")]
pub struct MalformedAsset {
    /// 1-based line number in the source text.
    pub line: usize,
    pub reason: String,
}
