/*!
# Prism Shader

Backend-agnostic shader programs for OpenGL, OpenGL ES and Metal.

A `Shader` compiles a vertex + fragment program through a backend `Device`,
reflects its interface into a name-indexed registry of typed parameters, and
drives the `begin` / `draw_array` / `end` protocol. Values are checked
against the program's declarations on the CPU and uploaded once per pass,
only when they changed.

## Architecture

- **Device**: backend factory trait (`GlDevice`, `MetalDevice` in the backend crates)
- **Program**: compiled program trait driven by `Shader`
- **BufferResource / Texture / RenderPass**: opaque backend handles
- **Shader**: parameter registry and draw protocol
- **UniformValue**: classification of Rust values into element type + shape

Backend crates implement these traits; call sites only use this crate's types.
*/

// Internal modules
mod error;
mod config;
pub mod log;
pub mod types;
pub mod backend;
pub mod shader;

// Main prism namespace module
pub mod prism {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::Config;

    // Shader and its registry
    pub use crate::shader::{Shader, ActiveShader, DrawState, Buffer, BufferType, PrimitiveType, BlendMode, INDICES};

    // Element types
    pub use crate::types::{VariableType, Scalar, UniformValue, UniformData, NdArray, variable_type_of, type_size, type_name, shape_size};

    // Backend traits
    pub use crate::backend::{Device, Program, BufferResource, Texture, RenderPass, Backend};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger};
    }

    // Backend sub-module with the types backend crates implement against
    pub mod backend {
        pub use crate::backend::*;
    }
}

// Re-export math library at crate root
pub use glam;
