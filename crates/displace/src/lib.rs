//! Vertex displacement: animates grid heights with coherent noise.
//!
//! # Invariants
//! - Each vertex's new height depends only on that vertex and `time`.
//! - Only the height coordinate is written; planar coordinates, UVs and
//!   every other field are left bit-identical.
//! - `update` returns only after every worker batch has finished.

mod clock;
mod kernel;
mod source;

pub use clock::AnimationClock;
pub use kernel::{DisplacementParams, Plane, VertexDisplacementKernel};
pub use source::{NoiseSource, PerlinNoise};
