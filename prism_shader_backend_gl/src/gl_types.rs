/// Conversions between prism types and OpenGL enums
///
/// Pure functions, no context required.

use prism_shader::prism::{BlendMode, PrimitiveType, VariableType};

/// How an attribute is fed to `glVertexAttrib*Pointer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// `glVertexAttribPointer`, converted to float by the vertex fetch
    Float,
    /// `glVertexAttribIPointer`
    Integer,
    /// `glVertexAttribLPointer` (desktop only)
    Double,
}

/// Element type and component count declared by a GLSL type
///
/// Samplers are not data and return `None`.
pub fn declared_type(gl_type: u32) -> Option<(VariableType, usize)> {
    let declared = match gl_type {
        glow::FLOAT => (VariableType::Float32, 1),
        glow::FLOAT_VEC2 => (VariableType::Float32, 2),
        glow::FLOAT_VEC3 => (VariableType::Float32, 3),
        glow::FLOAT_VEC4 => (VariableType::Float32, 4),
        glow::FLOAT_MAT2 => (VariableType::Float32, 4),
        glow::FLOAT_MAT3 => (VariableType::Float32, 9),
        glow::FLOAT_MAT4 => (VariableType::Float32, 16),
        glow::INT => (VariableType::Int32, 1),
        glow::INT_VEC2 => (VariableType::Int32, 2),
        glow::INT_VEC3 => (VariableType::Int32, 3),
        glow::INT_VEC4 => (VariableType::Int32, 4),
        glow::UNSIGNED_INT => (VariableType::UInt32, 1),
        glow::UNSIGNED_INT_VEC2 => (VariableType::UInt32, 2),
        glow::UNSIGNED_INT_VEC3 => (VariableType::UInt32, 3),
        glow::UNSIGNED_INT_VEC4 => (VariableType::UInt32, 4),
        glow::BOOL => (VariableType::Bool, 1),
        glow::BOOL_VEC2 => (VariableType::Bool, 2),
        glow::BOOL_VEC3 => (VariableType::Bool, 3),
        glow::BOOL_VEC4 => (VariableType::Bool, 4),
        glow::DOUBLE => (VariableType::Float64, 1),
        glow::DOUBLE_VEC2 => (VariableType::Float64, 2),
        glow::DOUBLE_VEC3 => (VariableType::Float64, 3),
        glow::DOUBLE_VEC4 => (VariableType::Float64, 4),
        _ => return None,
    };
    Some(declared)
}

/// GLSL sampler types that occupy a texture unit
pub fn is_sampler(gl_type: u32) -> bool {
    matches!(
        gl_type,
        glow::SAMPLER_2D
            | glow::SAMPLER_3D
            | glow::SAMPLER_CUBE
            | glow::SAMPLER_2D_ARRAY
            | glow::SAMPLER_2D_SHADOW
            | glow::SAMPLER_2D_MULTISAMPLE
            | glow::INT_SAMPLER_2D
            | glow::UNSIGNED_INT_SAMPLER_2D
    )
}

/// Uniform arrays are reported as `name[0]`
pub fn strip_array_suffix(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

pub fn primitive_mode(primitive: PrimitiveType) -> u32 {
    match primitive {
        PrimitiveType::Point => glow::POINTS,
        PrimitiveType::Line => glow::LINES,
        PrimitiveType::LineStrip => glow::LINE_STRIP,
        PrimitiveType::Triangle => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

/// Source and destination blend factors, `None` when blending is off
pub fn blend_factors(blend_mode: BlendMode) -> Option<(u32, u32)> {
    match blend_mode {
        BlendMode::None => None,
        BlendMode::AlphaBlend => Some((glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA)),
    }
}

/// GL component type and pointer flavour for an attribute element type
///
/// `declared_integer` selects `glVertexAttribIPointer` for `ivec`/`uvec` inputs.
pub fn attribute_format(dtype: VariableType, declared_integer: bool) -> Option<(u32, AttributeKind)> {
    let gl_type = match dtype {
        VariableType::Int8 => glow::BYTE,
        VariableType::UInt8 | VariableType::Bool => glow::UNSIGNED_BYTE,
        VariableType::Int16 => glow::SHORT,
        VariableType::UInt16 => glow::UNSIGNED_SHORT,
        VariableType::Int32 => glow::INT,
        VariableType::UInt32 => glow::UNSIGNED_INT,
        VariableType::Float16 => glow::HALF_FLOAT,
        VariableType::Float32 => glow::FLOAT,
        VariableType::Float64 => return Some((glow::DOUBLE, AttributeKind::Double)),
        VariableType::Int64 | VariableType::UInt64 | VariableType::Invalid => return None,
    };
    let kind = if declared_integer && !dtype.is_float() {
        AttributeKind::Integer
    } else {
        AttributeKind::Float
    };
    Some((gl_type, kind))
}

/// Vertex shader writes `gl_PointSize`, which desktop GL honours only with
/// `PROGRAM_POINT_SIZE` enabled
pub fn writes_point_size(vertex_source: &str) -> bool {
    vertex_source.contains("gl_PointSize")
}

// ===== PAYLOAD DECODING =====

pub fn decode_f32(bytes: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec(bytes)
}

pub fn decode_i32(bytes: &[u8]) -> Vec<i32> {
    bytemuck::pod_collect_to_vec(bytes)
}

pub fn decode_u32(bytes: &[u8]) -> Vec<u32> {
    bytemuck::pod_collect_to_vec(bytes)
}

/// Boolean uniforms are set through the integer entry points
pub fn decode_bool_as_i32(dtype: VariableType, bytes: &[u8]) -> Option<Vec<i32>> {
    match dtype {
        VariableType::Bool | VariableType::UInt8 | VariableType::Int8 => {
            Some(bytes.iter().map(|&byte| i32::from(byte != 0)).collect())
        }
        VariableType::Int32 | VariableType::UInt32 => {
            Some(decode_i32(bytes).into_iter().map(|value| i32::from(value != 0)).collect())
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "gl_types_tests.rs"]
mod tests;
