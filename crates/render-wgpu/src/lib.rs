//! wgpu backend for the mesh sink interface.
//!
//! Keeps the grid's vertex and index buffers resident on the GPU and writes
//! every upload through the queue. Normals are derived on a CPU shadow copy
//! and rewritten in full.
//!
//! # Invariants
//! - The wgpu vertex layout matches `Vertex::ATTRIBUTES` attribute for attribute.
//! - Uploads never write past the sized buffer.

mod gpu;
mod layout;

pub use gpu::{GpuError, GpuMeshSink, headless_device};
pub use layout::{VERTEX_ATTRIBUTES, vertex_buffer_layout};
