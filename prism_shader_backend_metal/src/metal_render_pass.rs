/// MetalRenderPass - render target handle for the Metal backend

use std::any::Any;
use std::sync::Mutex;
use metal::MTLPixelFormat;
use prism_shader::prism::{RenderPass, Result};
use prism_shader::prism_err;

/// Render pass a program draws into
///
/// The caller creates one render command encoder per frame and hands it to
/// the pass before any shader using the pass calls `begin()`.
pub struct MetalRenderPass {
    encoder: Mutex<Option<metal::RenderCommandEncoder>>,
    color_format: Option<MTLPixelFormat>,
    depth_format: Option<MTLPixelFormat>,
}

impl MetalRenderPass {
    /// Pass drawing into the device's colour format, without depth
    pub fn new() -> Self {
        Self { encoder: Mutex::new(None), color_format: None, depth_format: None }
    }

    pub fn with_color_format(mut self, format: MTLPixelFormat) -> Self {
        self.color_format = Some(format);
        self
    }

    pub fn with_depth_format(mut self, format: MTLPixelFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    pub fn color_format(&self) -> Option<MTLPixelFormat> {
        self.color_format
    }

    pub fn depth_format(&self) -> Option<MTLPixelFormat> {
        self.depth_format
    }

    /// Encoder used by the next passes of every shader bound to this render pass
    pub fn set_encoder(&self, encoder: &metal::RenderCommandEncoderRef) -> Result<()> {
        *self.lock()? = Some(encoder.to_owned());
        Ok(())
    }

    /// Drop the encoder, typically before `end_encoding()`
    pub fn clear_encoder(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }

    pub(crate) fn encoder(&self) -> Result<Option<metal::RenderCommandEncoder>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<metal::RenderCommandEncoder>>> {
        self.encoder.lock().map_err(|_| {
            prism_err!("prism::metal", BackendError, "render pass encoder lock poisoned")
        })
    }
}

impl Default for MetalRenderPass {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPass for MetalRenderPass {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
