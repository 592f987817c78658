/// MetalBuffer - Metal implementation of BufferResource

use std::any::Any;
use prism_shader::prism::BufferResource;

/// Shared-storage `MTLBuffer` holding one registry record
///
/// Released by ARC when dropped.
pub struct MetalBuffer {
    pub(crate) buffer: metal::Buffer,
    pub(crate) size: usize,
}

impl MetalBuffer {
    pub(crate) fn new(buffer: metal::Buffer, size: usize) -> Self {
        Self { buffer, size }
    }

    pub fn raw(&self) -> &metal::BufferRef {
        &self.buffer
    }

    /// Copy `bytes` to the start of the buffer
    pub(crate) fn write(&self, bytes: &[u8]) {
        let len = bytes.len().min(self.buffer.length() as usize);
        let contents = self.buffer.contents() as *mut u8;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), contents, len);
        }
    }
}

impl BufferResource for MetalBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
