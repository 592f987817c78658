//! Error types for prism_shader
//!
//! This module defines the error types used throughout the shader layer,
//! covering program construction, parameter binding, and the draw protocol.
//! Every variant is a usage or backend error surfaced synchronously; nothing
//! is retried.

use std::fmt;
use crate::shader::PrimitiveType;

/// Result type for prism_shader operations
pub type Result<T> = std::result::Result<T, Error>;

/// prism_shader errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Shader source failed to compile or the program failed to link
    CompilationFailed(String),

    /// Parameter name not declared by either shader stage
    UnknownParameter(String),

    /// Value shape, dimensionality, element type or byte count is unusable
    InvalidShape(String),

    /// A parameter required by the program (or by the draw call) was never bound
    MissingBinding(String),

    /// Vertex count not a multiple of what the primitive consumes
    TopologyMismatch {
        primitive: PrimitiveType,
        count: usize,
    },

    /// begin() / end() / draw_array() called out of sequence
    StateViolation(String),

    /// Supplied element type or shape disagrees with the program's declaration
    TypeMismatch(String),

    /// Draw range reaches past the bound data
    InvalidRange(String),

    /// Backend-specific error (OpenGL, Metal)
    BackendError(String),

    /// Resource handed to a backend that did not create it
    InvalidResource(String),

    /// Device creation failed
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::CompilationFailed(msg) => write!(f, "Compilation failed: {}", msg),
            Error::UnknownParameter(name) => write!(f, "Unknown parameter: '{}'", name),
            Error::InvalidShape(msg) => write!(f, "Invalid shape: {}", msg),
            Error::MissingBinding(msg) => write!(f, "Missing required binding: {}", msg),
            Error::TopologyMismatch { primitive, count } => write!(
                f,
                "Topology mismatch: {} vertices is not a multiple of {} for {:?}",
                count,
                primitive.vertices_per_primitive(),
                primitive
            ),
            Error::StateViolation(msg) => write!(f, "State violation: {}", msg),
            Error::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            Error::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
