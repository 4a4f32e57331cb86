use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use planegrid_common::GridConfig;
use planegrid_displace::DisplacementParams;
use serde::{Deserialize, Serialize};

/// Contents of a `--config` JSON file. Missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub grid: GridConfig,
    pub displacement: DisplacementParams,
    /// Seed for the noise field.
    pub seed: u32,
}

impl SceneConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

/// Grid and displacement options shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct SceneArgs {
    /// JSON file with `grid`, `displacement` and `seed` sections
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Vertices along X
    #[arg(long)]
    pub width: Option<u32>,
    /// Vertices along the second planar axis
    #[arg(long)]
    pub height: Option<u32>,
    /// Spacing between vertices
    #[arg(long)]
    pub scale: Option<f32>,
    /// Lay the grid in the XZ plane
    #[arg(long)]
    pub use_depth: bool,
    /// Noise seed
    #[arg(long)]
    pub seed: Option<u32>,
    /// Vertices per worker batch
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl SceneArgs {
    /// File values first, then any flag given on the command line.
    pub fn resolve(&self) -> anyhow::Result<SceneConfig> {
        let mut scene = match &self.config {
            Some(path) => SceneConfig::load(path)?,
            None => SceneConfig::default(),
        };
        self.apply(&mut scene);
        scene.grid.validate()?;
        Ok(scene)
    }

    fn apply(&self, scene: &mut SceneConfig) {
        if let Some(width) = self.width {
            scene.grid.width = width;
        }
        if let Some(height) = self.height {
            scene.grid.height = height;
        }
        if let Some(scale) = self.scale {
            scene.grid.scale = scale;
        }
        if self.use_depth {
            scene.grid.use_depth = true;
        }
        if let Some(seed) = self.seed {
            scene.seed = seed;
        }
        if let Some(batch_size) = self.batch_size {
            scene.displacement.batch_size = batch_size;
        }
    }
}
