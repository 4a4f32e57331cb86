use planegrid_common::{Bounds, MeshError, Vertex};

/// Primitive assembly for a submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    #[default]
    Triangles,
}

impl Topology {
    pub fn indices_per_primitive(self) -> usize {
        match self {
            Self::Triangles => 3,
        }
    }
}

/// Range of the index buffer drawn as one submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshDescriptor {
    pub index_start: usize,
    pub index_count: usize,
    pub topology: Topology,
}

impl SubmeshDescriptor {
    /// A triangle-list submesh covering the first `index_count` indices.
    pub fn triangles(index_count: usize) -> Self {
        Self {
            index_start: 0,
            index_count,
            topology: Topology::Triangles,
        }
    }
}

/// Renderer-side destination for mesh buffers.
///
/// All calls come from the frame context that owns renderer state. Uploads
/// copy `data[..count]` into the sink's buffer starting at element `offset`;
/// the buffer must have been sized first with the matching `set_*_params`.
pub trait MeshSink {
    /// Size the vertex buffer to `count` vertices.
    fn set_vertex_buffer_params(&mut self, count: usize) -> Result<(), MeshError>;

    /// Size the index buffer to `count` 32-bit indices.
    fn set_index_buffer_params(&mut self, count: usize) -> Result<(), MeshError>;

    fn upload_vertex_buffer(
        &mut self,
        vertices: &[Vertex],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError>;

    fn upload_index_buffer(
        &mut self,
        indices: &[u32],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError>;

    fn define_submesh(&mut self, submesh: SubmeshDescriptor) -> Result<(), MeshError>;

    fn set_bounds(&mut self, bounds: Bounds) -> Result<(), MeshError>;

    /// Derive normals and tangents from the uploaded positions and topology.
    fn recompute_normals(&mut self) -> Result<(), MeshError>;
}

/// Lets a caller lend a sink to a lifecycle and inspect it afterwards.
impl<T: MeshSink + ?Sized> MeshSink for &mut T {
    fn set_vertex_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        (**self).set_vertex_buffer_params(count)
    }

    fn set_index_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        (**self).set_index_buffer_params(count)
    }

    fn upload_vertex_buffer(
        &mut self,
        vertices: &[Vertex],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError> {
        (**self).upload_vertex_buffer(vertices, offset, count)
    }

    fn upload_index_buffer(
        &mut self,
        indices: &[u32],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError> {
        (**self).upload_index_buffer(indices, offset, count)
    }

    fn define_submesh(&mut self, submesh: SubmeshDescriptor) -> Result<(), MeshError> {
        (**self).define_submesh(submesh)
    }

    fn set_bounds(&mut self, bounds: Bounds) -> Result<(), MeshError> {
        (**self).set_bounds(bounds)
    }

    fn recompute_normals(&mut self) -> Result<(), MeshError> {
        (**self).recompute_normals()
    }
}

/// Validate an upload of `count` elements from a slice of `available`
/// into a buffer of `capacity` at `offset`.
pub fn check_upload(
    available: usize,
    offset: usize,
    count: usize,
    capacity: usize,
) -> Result<(), MeshError> {
    if count > available {
        return Err(MeshError::BufferSize {
            expected: count,
            actual: available,
        });
    }
    match offset.checked_add(count) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(MeshError::BufferSize {
            expected: capacity,
            actual: offset.saturating_add(count),
        }),
    }
}

/// Reject a submesh that runs past `index_len` or splits a primitive.
pub fn check_submesh(submesh: &SubmeshDescriptor, index_len: usize) -> Result<(), MeshError> {
    let end = submesh.index_start.saturating_add(submesh.index_count);
    if end > index_len {
        return Err(MeshError::BufferSize {
            expected: index_len,
            actual: end,
        });
    }
    let per = submesh.topology.indices_per_primitive();
    if submesh.index_count % per != 0 {
        return Err(MeshError::Sink(format!(
            "submesh of {} indices is not a whole number of {:?} primitives",
            submesh.index_count, submesh.topology
        )));
    }
    Ok(())
}

/// Indices drawn by `submesh`, or the whole buffer when none is defined.
pub fn submesh_indices(
    indices: &[u32],
    submesh: Option<SubmeshDescriptor>,
) -> Result<&[u32], MeshError> {
    let Some(s) = submesh else {
        return Ok(indices);
    };
    check_submesh(&s, indices.len())?;
    Ok(&indices[s.index_start..s.index_start + s.index_count])
}
