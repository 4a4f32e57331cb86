//! Shared types for the planegrid workspace.
//!
//! # Invariants
//! - `Vertex` field order and widths are fixed; renderers depend on the layout.
//! - A `GridConfig` that passes `validate` always yields a well-formed mesh.

mod error;
mod types;

pub use error::MeshError;
pub use types::{
    AttributeFormat, Bounds, Color32, GridConfig, Vertex, VertexAttribute, VertexSemantic,
};
