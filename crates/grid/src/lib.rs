//! Grid Builder: deterministic rectangular grid meshes.
//!
//! # Invariants
//! - Output is a pure function of `GridConfig`.
//! - Vertex `(x, y)` lives at index `x + y * width` and never moves.
//! - Every index is in `[0, vertex_count)` and every triangle stays inside one cell.
//! - All triangles share one winding when projected onto the grid plane.

mod builder;

pub use builder::{GridMesh, generate};
