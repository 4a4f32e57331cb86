use glam::{Vec2, Vec3};
use planegrid_common::{Bounds, GridConfig, MeshError, Vertex};

/// Vertex and index buffers of one generated grid.
///
/// Owned buffers move between the background generator, the lifecycle and
/// the displacement kernel; nothing here is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMesh {
    config: GridConfig,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl GridMesh {
    /// Config the mesh was generated from.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Mutable vertex access for in-place updates. The slice length is fixed.
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Vertex at grid coordinate `(x, y)`.
    pub fn vertex(&self, x: u32, y: u32) -> Option<&Vertex> {
        if x >= self.config.width || y >= self.config.height {
            return None;
        }
        self.vertices
            .get(x as usize + y as usize * self.config.width as usize)
    }

    /// Axis-aligned box around the current vertex positions.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(self.vertices.iter().map(Vertex::position))
            .unwrap_or(Bounds::new(Vec3::ZERO, Vec3::ZERO))
    }

    /// Split into the config and the raw buffers.
    pub fn into_parts(self) -> (GridConfig, Vec<Vertex>, Vec<u32>) {
        (self.config, self.vertices, self.indices)
    }
}

/// Build the vertex and index buffers for `config`.
///
/// Vertices are emitted row by row and centered on the origin. Every vertex
/// that closes a cell (`x != 0 && y != 0`) emits the two triangles of that
/// cell, so the index buffer holds exactly `6 * (width - 1) * (height - 1)`
/// entries.
pub fn generate(config: &GridConfig) -> Result<GridMesh, MeshError> {
    config.validate()?;
    let _span = tracing::debug_span!(
        "generate_grid",
        width = config.width,
        height = config.height
    )
    .entered();

    let width = config.width;
    let height = config.height;
    let scale = config.scale;
    let start_x = (width as f32 * scale - scale) * 0.5;
    let start_y = (height as f32 * scale - scale) * 0.5;
    let u_div = (width - 1) as f32;
    let v_div = (height - 1) as f32;

    let mut vertices = Vec::with_capacity(config.vertex_count());
    let mut indices = Vec::with_capacity(config.index_count());

    for y in 0..height {
        let vy = y as f32 * scale - start_y;
        for x in 0..width {
            let vx = x as f32 * scale - start_x;
            let position = if config.use_depth {
                Vec3::new(vx, 0.0, vy)
            } else {
                Vec3::new(vx, vy, 0.0)
            };
            let uv = Vec2::new(x as f32 / u_div, y as f32 / v_div);
            vertices.push(Vertex::at(position, uv));

            if x != 0 && y != 0 {
                let v4 = x + y * width;
                let v3 = v4 - 1;
                let v1 = v4 - width;
                let v0 = v3 - width;
                indices.extend_from_slice(&[v0, v3, v4, v4, v1, v0]);
            }
        }
    }

    tracing::debug!(
        vertices = vertices.len(),
        indices = indices.len(),
        "grid generated"
    );

    Ok(GridMesh {
        config: *config,
        vertices,
        indices,
    })
}
