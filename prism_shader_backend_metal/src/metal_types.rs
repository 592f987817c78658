/// Conversions between prism types and Metal enums

use metal::{MTLArgumentType, MTLBlendFactor, MTLDataType, MTLPrimitiveType};
use prism_shader::prism::{BlendMode, BufferType, PrimitiveType, VariableType};
use prism_shader::prism::backend::ShaderStages;

/// Entry point of the vertex stage library
pub const VERTEX_ENTRY: &str = "vertex_main";
/// Entry point of the fragment stage library
pub const FRAGMENT_ENTRY: &str = "fragment_main";

/// Element type and component count of a reflected buffer argument
///
/// Half precision, structs and pointers have no matching payload description.
pub fn declared_type(data_type: MTLDataType) -> Option<(VariableType, usize)> {
    let declared = match data_type {
        MTLDataType::Float => (VariableType::Float32, 1),
        MTLDataType::Float2 => (VariableType::Float32, 2),
        MTLDataType::Float3 => (VariableType::Float32, 3),
        MTLDataType::Float4 => (VariableType::Float32, 4),
        MTLDataType::Float2x2 => (VariableType::Float32, 4),
        MTLDataType::Float3x3 => (VariableType::Float32, 9),
        MTLDataType::Float4x4 => (VariableType::Float32, 16),
        MTLDataType::Int => (VariableType::Int32, 1),
        MTLDataType::Int2 => (VariableType::Int32, 2),
        MTLDataType::Int3 => (VariableType::Int32, 3),
        MTLDataType::Int4 => (VariableType::Int32, 4),
        MTLDataType::UInt => (VariableType::UInt32, 1),
        MTLDataType::UInt2 => (VariableType::UInt32, 2),
        MTLDataType::UInt3 => (VariableType::UInt32, 3),
        MTLDataType::UInt4 => (VariableType::UInt32, 4),
        MTLDataType::Short => (VariableType::Int16, 1),
        MTLDataType::UShort => (VariableType::UInt16, 1),
        MTLDataType::Char => (VariableType::Int8, 1),
        MTLDataType::UChar => (VariableType::UInt8, 1),
        MTLDataType::Bool => (VariableType::Bool, 1),
        _ => return None,
    };
    Some(declared)
}

/// Slot kind of an argument of `stage`
///
/// `pointer` marks buffers declared as `T *name`, which carry one element per
/// vertex (or per fragment invocation) instead of a single value.
pub fn slot_type(stage: ShaderStages, argument: MTLArgumentType, pointer: bool) -> Option<BufferType> {
    let vertex = stage == ShaderStages::VERTEX;
    let slot = match argument {
        MTLArgumentType::Buffer if !pointer => BufferType::UniformBuffer,
        MTLArgumentType::Buffer if vertex => BufferType::VertexBuffer,
        MTLArgumentType::Buffer => BufferType::FragmentBuffer,
        MTLArgumentType::Texture if vertex => BufferType::VertexTexture,
        MTLArgumentType::Texture => BufferType::FragmentTexture,
        MTLArgumentType::Sampler if vertex => BufferType::VertexSampler,
        MTLArgumentType::Sampler => BufferType::FragmentSampler,
        _ => return None,
    };
    Some(slot)
}

/// Argument `name` is declared as a pointer (`... *name [[buffer(n)]]`) in `source`
pub fn is_pointer_argument(source: &str, name: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    source.match_indices(name).any(|(at, _)| {
        let before = &source[..at];
        let after = &source[at + name.len()..];
        let bounded = !before.chars().next_back().is_some_and(is_ident)
            && !after.chars().next().is_some_and(is_ident);
        bounded && before.trim_end().ends_with('*') && after.trim_start().starts_with("[[")
    })
}

pub fn primitive_type(primitive: PrimitiveType) -> MTLPrimitiveType {
    match primitive {
        PrimitiveType::Point => MTLPrimitiveType::Point,
        PrimitiveType::Line => MTLPrimitiveType::Line,
        PrimitiveType::LineStrip => MTLPrimitiveType::LineStrip,
        PrimitiveType::Triangle => MTLPrimitiveType::Triangle,
        PrimitiveType::TriangleStrip => MTLPrimitiveType::TriangleStrip,
    }
}

/// Source and destination factors of the colour attachment, `None` when blending is off
pub fn blend_factors(blend_mode: BlendMode) -> Option<(MTLBlendFactor, MTLBlendFactor)> {
    match blend_mode {
        BlendMode::None => None,
        BlendMode::AlphaBlend => Some((MTLBlendFactor::SourceAlpha, MTLBlendFactor::OneMinusSourceAlpha)),
    }
}

#[cfg(test)]
#[path = "metal_types_tests.rs"]
mod tests;
