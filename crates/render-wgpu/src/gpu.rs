use planegrid_common::{Bounds, MeshError, Vertex};
use planegrid_render::{
    MeshSink, SubmeshDescriptor, check_submesh, check_upload, recompute_normals, submesh_indices,
};

/// Errors from acquiring a GPU device.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("device request failed: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Request a device without a surface, for offscreen use and tools.
pub fn headless_device() -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok_or(GpuError::NoAdapter)?;

    let info = adapter.get_info();
    tracing::info!(name = %info.name, backend = ?info.backend, "using adapter");

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("planegrid_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
        },
        None,
    ))?;
    Ok((device, queue))
}

/// Mesh sink backed by wgpu vertex and index buffers.
///
/// A CPU shadow of both buffers is kept so normals can be derived after
/// each upload; the derived vertices are then rewritten to the GPU.
pub struct GpuMeshSink<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    submesh: Option<SubmeshDescriptor>,
    bounds: Option<Bounds>,
}

impl<'a> GpuMeshSink<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            vertex_buffer: None,
            index_buffer: None,
            vertices: Vec::new(),
            indices: Vec::new(),
            submesh: None,
            bounds: None,
        }
    }

    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        self.vertex_buffer.as_ref()
    }

    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.index_buffer.as_ref()
    }

    pub fn submesh(&self) -> Option<SubmeshDescriptor> {
        self.submesh
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Block until queued writes have been processed by the device.
    pub fn flush(&self) {
        self.queue.submit(std::iter::empty());
        let _ = self.device.poll(wgpu::Maintain::Wait);
    }

    fn create_buffer(&self, label: &str, size: usize, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as wgpu::BufferAddress,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

impl MeshSink for GpuMeshSink<'_> {
    fn set_vertex_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        let buffer = self.create_buffer(
            "grid_vertex_buffer",
            count * Vertex::STRIDE,
            wgpu::BufferUsages::VERTEX,
        );
        self.vertex_buffer = Some(buffer);
        self.vertices = vec![Vertex::default(); count];
        Ok(())
    }

    fn set_index_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        let buffer = self.create_buffer(
            "grid_index_buffer",
            count * std::mem::size_of::<u32>(),
            wgpu::BufferUsages::INDEX,
        );
        self.index_buffer = Some(buffer);
        self.indices = vec![0; count];
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
        let buffer = self
            .vertex_buffer
            .as_ref()
            .ok_or_else(|| MeshError::Sink("vertex buffer not sized".into()))?;
        let data = &vertices[..count];
        self.vertices[offset..offset + count].copy_from_slice(data);
        self.queue.write_buffer(
            buffer,
            (offset * Vertex::STRIDE) as wgpu::BufferAddress,
            bytemuck::cast_slice(data),
        );
        Ok(())
    }

    fn upload_index_buffer(
        &mut self,
        indices: &[u32],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError> {
        check_upload(indices.len(), offset, count, self.indices.len())?;
        let buffer = self
            .index_buffer
            .as_ref()
            .ok_or_else(|| MeshError::Sink("index buffer not sized".into()))?;
        let data = &indices[..count];
        self.indices[offset..offset + count].copy_from_slice(data);
        self.queue.write_buffer(
            buffer,
            (offset * std::mem::size_of::<u32>()) as wgpu::BufferAddress,
            bytemuck::cast_slice(data),
        );
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
        let Some(buffer) = self.vertex_buffer.as_ref() else {
            return Err(MeshError::Sink("vertex buffer not sized".into()));
        };
        let indices = submesh_indices(&self.indices, self.submesh)?;
        recompute_normals(&mut self.vertices, indices);
        self.queue
            .write_buffer(buffer, 0, bytemuck::cast_slice(&self.vertices));
        Ok(())
    }
}
