use planegrid_common::{GridConfig, Vertex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::source::{NoiseSource, PerlinNoise};

/// Which two position components form the grid plane.
///
/// The remaining component is the height that the kernel overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Plane {
    /// Planar `(x, y)`, height along Z.
    #[default]
    Xy,
    /// Planar `(x, z)`, height along Y. Writing Z here instead would
    /// flatten a depth-axis grid onto a line.
    Xz,
}

impl Plane {
    /// Plane a grid built from `config` lies in.
    pub fn from_config(config: &GridConfig) -> Self {
        if config.use_depth { Self::Xz } else { Self::Xy }
    }

    /// Position components holding the two planar coordinates.
    pub fn planar_axes(self) -> (usize, usize) {
        match self {
            Self::Xy => (0, 1),
            Self::Xz => (0, 2),
        }
    }

    /// Position component the kernel writes.
    pub fn height_axis(self) -> usize {
        match self {
            Self::Xy => 2,
            Self::Xz => 1,
        }
    }
}

/// Affine mapping from noise to height, plus the dispatch batch size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementParams {
    pub amplitude: f32,
    pub offset: f32,
    /// Vertices handed to one worker at a time.
    pub batch_size: usize,
}

impl Default for DisplacementParams {
    fn default() -> Self {
        Self {
            amplitude: 1.1,
            offset: 0.5,
            batch_size: 100,
        }
    }
}

impl DisplacementParams {
    /// Lowest and highest height the kernel can write.
    pub fn height_range(&self) -> (f32, f32) {
        let a = -self.offset;
        let b = self.amplitude - self.offset;
        (a.min(b), a.max(b))
    }
}

/// Recomputes vertex heights from noise sampled at each vertex's planar
/// coordinates, shifted along the second planar axis by `time`.
#[derive(Debug, Clone)]
pub struct VertexDisplacementKernel<N: NoiseSource = PerlinNoise> {
    noise: N,
    params: DisplacementParams,
    plane: Plane,
}

impl Default for VertexDisplacementKernel {
    fn default() -> Self {
        Self::new(PerlinNoise::default(), DisplacementParams::default())
    }
}

impl<N: NoiseSource> VertexDisplacementKernel<N> {
    pub fn new(noise: N, params: DisplacementParams) -> Self {
        Self {
            noise,
            params,
            plane: Plane::default(),
        }
    }

    pub fn with_plane(mut self, plane: Plane) -> Self {
        self.plane = plane;
        self
    }

    pub fn set_plane(&mut self, plane: Plane) {
        self.plane = plane;
    }

    pub fn plane(&self) -> Plane {
        self.plane
    }

    pub fn params(&self) -> &DisplacementParams {
        &self.params
    }

    pub fn noise(&self) -> &N {
        &self.noise
    }

    /// Height `vertex` takes at `time`. Reads nothing but `vertex`.
    pub fn displace_vertex(&self, vertex: &Vertex, time: f32) -> f32 {
        let (a, b) = self.plane.planar_axes();
        let p = vertex.position;
        self.params.amplitude * self.noise.sample(p[a], p[b] + time) - self.params.offset
    }

    /// Displace every vertex in parallel.
    ///
    /// The buffer is split into disjoint batches of `batch_size` vertices,
    /// each owned by one rayon worker; the call blocks until all batches
    /// are done. No allocation happens here.
    pub fn update(&self, vertices: &mut [Vertex], time: f32) {
        let batch = self.params.batch_size.max(1);
        let axis = self.plane.height_axis();
        let _span = tracing::trace_span!(
            "displace_update",
            vertices = vertices.len(),
            batch,
            time
        )
        .entered();
        vertices.par_chunks_mut(batch).for_each(|chunk| {
            for v in chunk {
                v.position[axis] = self.displace_vertex(v, time);
            }
        });
    }

    /// Same as [`update`](Self::update) but on the calling thread only.
    pub fn update_serial(&self, vertices: &mut [Vertex], time: f32) {
        let axis = self.plane.height_axis();
        for v in vertices {
            v.position[axis] = self.displace_vertex(v, time);
        }
    }
}
