use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::MeshError;

/// 8-bit RGBA color, unorm when read by a renderer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color32 {
    fn default() -> Self {
        Self::WHITE
    }
}

/// One grid vertex, laid out exactly as renderers expect it.
///
/// Normal and tangent are derived by the sink after every upload; the grid
/// builder and the displacement kernel only ever write `position`, `uv0`
/// and `uv1`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub color: Color32,
    pub uv0: [f32; 2],
    pub uv1: [f32; 2],
}

impl Default for Vertex {
    fn default() -> Self {
        Self::at(Vec3::ZERO, Vec2::ZERO)
    }
}

/// Which vertex field an attribute describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    Color,
    TexCoord0,
    TexCoord1,
}

/// Scalar storage format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    Float32,
    Unorm8,
}

impl AttributeFormat {
    pub const fn size(self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Unorm8 => 1,
        }
    }
}

/// Description of one attribute inside the interleaved vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    pub format: AttributeFormat,
    pub components: usize,
    pub offset: usize,
}

impl VertexAttribute {
    pub const fn byte_len(&self) -> usize {
        self.format.size() * self.components
    }
}

impl Vertex {
    /// Interleaved layout in field order.
    pub const ATTRIBUTES: [VertexAttribute; 6] = [
        VertexAttribute {
            semantic: VertexSemantic::Position,
            format: AttributeFormat::Float32,
            components: 3,
            offset: 0,
        },
        VertexAttribute {
            semantic: VertexSemantic::Normal,
            format: AttributeFormat::Float32,
            components: 3,
            offset: 12,
        },
        VertexAttribute {
            semantic: VertexSemantic::Tangent,
            format: AttributeFormat::Float32,
            components: 4,
            offset: 24,
        },
        VertexAttribute {
            semantic: VertexSemantic::Color,
            format: AttributeFormat::Unorm8,
            components: 4,
            offset: 40,
        },
        VertexAttribute {
            semantic: VertexSemantic::TexCoord0,
            format: AttributeFormat::Float32,
            components: 2,
            offset: 44,
        },
        VertexAttribute {
            semantic: VertexSemantic::TexCoord1,
            format: AttributeFormat::Float32,
            components: 2,
            offset: 52,
        },
    ];

    /// Size of one vertex in bytes.
    pub const STRIDE: usize = std::mem::size_of::<Self>();

    /// A vertex at `position` with the given texture coordinate in both UV channels.
    pub fn at(position: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: [0.0; 3],
            tangent: [0.0; 4],
            color: Color32::WHITE,
            uv0: uv.to_array(),
            uv1: uv.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn uv0(&self) -> Vec2 {
        Vec2::from_array(self.uv0)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, p| Self::new(b.min.min(p), b.max.max(p))))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Widen the box along `axis` (0 = X, 1 = Y, 2 = Z) to include `[lo, hi]`.
    pub fn include_range(mut self, axis: usize, lo: f32, hi: f32) -> Self {
        self.min[axis] = self.min[axis].min(lo);
        self.max[axis] = self.max[axis].max(hi);
        self
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// Parameters of a procedural grid.
///
/// Immutable once buffers are generated; changing any field means building
/// a new mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Vertices along the X axis.
    pub width: u32,
    /// Vertices along the second planar axis (Y, or Z with `use_depth`).
    pub height: u32,
    /// Distance between neighbouring vertices.
    pub scale: f32,
    /// Lay the grid in the XZ plane instead of XY.
    pub use_depth: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            scale: 1.0,
            use_depth: false,
        }
    }
}

impl GridConfig {
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
            use_depth: false,
        }
    }

    pub fn with_depth(mut self, use_depth: bool) -> Self {
        self.use_depth = use_depth;
        self
    }

    /// Reject configs that would produce degenerate geometry.
    ///
    /// A single row or column has no quads and makes the UV divisor zero,
    /// so both dimensions must be at least 2.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.width < 2 {
            return Err(MeshError::InvalidConfig(format!(
                "width must be at least 2, got {}",
                self.width
            )));
        }
        if self.height < 2 {
            return Err(MeshError::InvalidConfig(format!(
                "height must be at least 2, got {}",
                self.height
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(MeshError::InvalidConfig(format!(
                "scale must be finite and positive, got {}",
                self.scale
            )));
        }
        let vertices = self.width as u64 * self.height as u64;
        if vertices > u32::MAX as u64 {
            return Err(MeshError::InvalidConfig(format!(
                "{vertices} vertices exceed the 32-bit index range"
            )));
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn quad_count(&self) -> usize {
        self.width.saturating_sub(1) as usize * self.height.saturating_sub(1) as usize
    }

    pub fn index_count(&self) -> usize {
        self.quad_count() * 6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_packed() {
        assert_eq!(Vertex::STRIDE, 60);
        let last = Vertex::ATTRIBUTES[Vertex::ATTRIBUTES.len() - 1];
        assert_eq!(last.offset + last.byte_len(), Vertex::STRIDE);
        for pair in Vertex::ATTRIBUTES.windows(2) {
            assert_eq!(pair[0].offset + pair[0].byte_len(), pair[1].offset);
        }
    }

    #[test]
    fn vertex_at_fills_both_uv_channels() {
        let v = Vertex::at(Vec3::new(1.0, 2.0, 3.0), Vec2::new(0.25, 0.75));
        assert_eq!(v.position, [1.0, 2.0, 3.0]);
        assert_eq!(v.uv0, [0.25, 0.75]);
        assert_eq!(v.uv1, v.uv0);
        assert_eq!(v.color, Color32::WHITE);
        assert_eq!(v.normal, [0.0; 3]);
    }

    #[test]
    fn bounds_from_points() {
        let b = Bounds::from_points([Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, -4.0, 0.5)]).unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(b.max, Vec3::new(3.0, 2.0, 0.5));
        assert_eq!(b.center(), Vec3::new(1.0, -1.0, 0.25));
        assert_eq!(b.size(), Vec3::new(4.0, 6.0, 0.5));
        assert!(Bounds::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn include_range_only_grows() {
        let b = Bounds::new(Vec3::ZERO, Vec3::ONE).include_range(2, -0.5, 0.6);
        assert_eq!(b.min.z, -0.5);
        assert_eq!(b.max.z, 1.0);
        assert!(b.contains(Vec3::new(0.5, 0.5, -0.25)));
    }

    #[test]
    fn default_config_is_valid() {
        let config = GridConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.vertex_count(), 100);
        assert_eq!(config.index_count(), 6 * 9 * 9);
    }

    #[test]
    fn single_row_or_column_is_rejected() {
        assert!(matches!(
            GridConfig::new(1, 5, 1.0).validate(),
            Err(MeshError::InvalidConfig(_))
        ));
        assert!(matches!(
            GridConfig::new(5, 1, 1.0).validate(),
            Err(MeshError::InvalidConfig(_))
        ));
        assert!(GridConfig::new(0, 0, 1.0).validate().is_err());
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        assert!(GridConfig::new(3, 3, 0.0).validate().is_err());
        assert!(GridConfig::new(3, 3, -1.0).validate().is_err());
        assert!(GridConfig::new(3, 3, f32::NAN).validate().is_err());
        assert!(GridConfig::new(3, 3, f32::INFINITY).validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: GridConfig = serde_json::from_str(r#"{ "width": 4, "use_depth": true }"#).unwrap();
        assert_eq!(config.width, 4);
        assert_eq!(config.height, 10);
        assert_eq!(config.scale, 1.0);
        assert!(config.use_depth);
    }
}
