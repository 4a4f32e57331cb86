use planegrid_common::Vertex;

/// Shader locations 0..=5: position, normal, tangent, color, uv0, uv1.
pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x4,
    3 => Unorm8x4,
    4 => Float32x2,
    5 => Float32x2,
];

/// Per-vertex buffer layout for `Vertex`.
pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: Vertex::STRIDE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}
