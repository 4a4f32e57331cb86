use noise::{NoiseFn, Perlin};

/// Continuous, deterministic 2D noise with output in `[0, 1]`.
///
/// Implementations are shared across worker threads during a kernel
/// dispatch, so they must be read-only after construction.
pub trait NoiseSource: Send + Sync {
    fn sample(&self, x: f32, y: f32) -> f32;
}

/// Seeded gradient noise remapped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct PerlinNoise {
    perlin: Perlin,
    seed: u32,
}

impl PerlinNoise {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl Default for PerlinNoise {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NoiseSource for PerlinNoise {
    fn sample(&self, x: f32, y: f32) -> f32 {
        let raw = self.perlin.get([x as f64, y as f64]);
        ((raw * 0.5 + 0.5) as f32).clamp(0.0, 1.0)
    }
}
