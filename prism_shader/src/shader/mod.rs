/// Shader module - parameter registry, pipeline state and draw protocol

pub mod buffer;
pub mod pipeline_state;
pub mod shader;

pub use buffer::{Buffer, BufferType, INDICES};
pub use pipeline_state::{PrimitiveType, BlendMode};
pub use shader::{Shader, ActiveShader, DrawState};
