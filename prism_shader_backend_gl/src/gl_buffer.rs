/// GlBuffer - OpenGL implementation of BufferResource

use std::any::Any;
use std::sync::Arc;
use glow::HasContext;
use prism_shader::prism::BufferResource;

/// Storage behind one registry record
pub enum GlStorage {
    /// Buffer object bound to `target` (`ARRAY_BUFFER`, `ELEMENT_ARRAY_BUFFER`)
    Object { buffer: glow::Buffer, target: u32 },
    /// Plain uniform, applied from the CPU shadow with `glUniform*`
    Uniform,
}

pub struct GlBuffer {
    gl: Arc<glow::Context>,
    pub(crate) storage: GlStorage,
    pub(crate) size: usize,
}

impl GlBuffer {
    pub(crate) fn new(gl: Arc<glow::Context>, storage: GlStorage, size: usize) -> Self {
        Self { gl, storage, size }
    }

    /// Buffer object and its bind target, `None` for plain uniforms
    pub fn object(&self) -> Option<(glow::Buffer, u32)> {
        match self.storage {
            GlStorage::Object { buffer, target } => Some((buffer, target)),
            GlStorage::Uniform => None,
        }
    }
}

impl BufferResource for GlBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for GlBuffer {
    fn drop(&mut self) {
        if let GlStorage::Object { buffer, .. } = self.storage {
            unsafe {
                self.gl.delete_buffer(buffer);
            }
        }
    }
}
