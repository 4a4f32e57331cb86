//! Rendering Adapter: the narrow interface the mesh lifecycle publishes to.
//!
//! # Invariants
//! - Sinks receive copies; they never hold on to the caller's buffers.
//! - Normals and tangents are derived by the sink, never authored upstream.
//!
//! # Implementations
//! `CpuMeshSink` keeps the published mesh in memory and derives normals on
//! the CPU. `DebugTextSink` records each call as a line of text. A GPU sink
//! lives in `planegrid-render-wgpu`; swap it in without changing callers.

mod cpu;
mod debug;
mod normals;
mod sink;

pub use cpu::CpuMeshSink;
pub use debug::DebugTextSink;
pub use normals::recompute_normals;
pub use sink::{
    MeshSink, SubmeshDescriptor, Topology, check_submesh, check_upload, submesh_indices,
};

pub fn crate_info() -> &'static str {
    "planegrid-render v0.1.0"
}
