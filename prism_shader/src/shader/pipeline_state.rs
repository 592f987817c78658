/// Primitive topologies and blend modes

use glam::Vec4;

/// Primitive topology of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Point,
    Line,
    LineStrip,
    Triangle,
    TriangleStrip,
}

impl PrimitiveType {
    /// Vertices consumed by each primitive of a list topology
    ///
    /// Strips and points consume one new vertex per primitive.
    pub const fn vertices_per_primitive(self) -> usize {
        match self {
            PrimitiveType::Line => 2,
            PrimitiveType::Triangle => 3,
            PrimitiveType::Point | PrimitiveType::LineStrip | PrimitiveType::TriangleStrip => 1,
        }
    }

    /// Vertex count forms a whole number of primitives
    pub const fn accepts_count(self, count: usize) -> bool {
        count % self.vertices_per_primitive() == 0
    }
}

/// Color attachment blending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// New fragments replace the framebuffer contents
    #[default]
    None,
    /// `alpha * new + (1 - alpha) * old`, alpha taken from the new fragment
    AlphaBlend,
}

impl BlendMode {
    /// CPU reference of the fixed-function blend equation configured by the backends
    pub fn blend(self, source: Vec4, destination: Vec4) -> Vec4 {
        match self {
            BlendMode::None => source,
            BlendMode::AlphaBlend => {
                let alpha = source.w;
                source * alpha + destination * (1.0 - alpha)
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_state_tests.rs"]
mod tests;
