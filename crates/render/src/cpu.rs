use planegrid_common::{Bounds, MeshError, Vertex};

use crate::normals::recompute_normals;
use crate::sink::{MeshSink, SubmeshDescriptor, check_submesh, check_upload, submesh_indices};

/// Keeps the published mesh in memory and derives normals on the CPU.
///
/// Stands in for a GPU-resident mesh in tools and tests; the counters make
/// the publish sequence observable.
#[derive(Debug, Default)]
pub struct CpuMeshSink {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    submesh: Option<SubmeshDescriptor>,
    bounds: Option<Bounds>,
    vertex_uploads: usize,
    index_uploads: usize,
    normal_recomputes: usize,
}

impl CpuMeshSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn submesh(&self) -> Option<SubmeshDescriptor> {
        self.submesh
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn vertex_uploads(&self) -> usize {
        self.vertex_uploads
    }

    pub fn index_uploads(&self) -> usize {
        self.index_uploads
    }

    pub fn normal_recomputes(&self) -> usize {
        self.normal_recomputes
    }
}

impl MeshSink for CpuMeshSink {
    fn set_vertex_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        tracing::trace!(count, "cpu vertex buffer sized");
        self.vertices = vec![Vertex::default(); count];
        Ok(())
    }

    fn set_index_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        tracing::trace!(count, "cpu index buffer sized");
        self.indices = vec![0; count];
        // A resized buffer invalidates the old draw range.
        self.submesh = None;
        Ok(())
    }

    fn upload_vertex_buffer(
        &mut self,
        vertices: &[Vertex],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError> {
        check_upload(vertices.len(), offset, count, self.vertices.len())?;
        self.vertices[offset..offset + count].copy_from_slice(&vertices[..count]);
        self.vertex_uploads += 1;
        Ok(())
    }

    fn upload_index_buffer(
        &mut self,
        indices: &[u32],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError> {
        check_upload(indices.len(), offset, count, self.indices.len())?;
        self.indices[offset..offset + count].copy_from_slice(&indices[..count]);
        self.index_uploads += 1;
        Ok(())
    }

    fn define_submesh(&mut self, submesh: SubmeshDescriptor) -> Result<(), MeshError> {
        check_submesh(&submesh, self.indices.len())?;
        self.submesh = Some(submesh);
        Ok(())
    }

    fn set_bounds(&mut self, bounds: Bounds) -> Result<(), MeshError> {
        self.bounds = Some(bounds);
        Ok(())
    }

    fn recompute_normals(&mut self) -> Result<(), MeshError> {
        let indices = submesh_indices(&self.indices, self.submesh)?;
        recompute_normals(&mut self.vertices, indices);
        self.normal_recomputes += 1;
        Ok(())
    }
}
