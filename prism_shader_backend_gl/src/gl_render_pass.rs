/// GlRenderPass - render target handle for the OpenGL backends

use std::any::Any;
use prism_shader::prism::RenderPass;

/// Framebuffer a program draws into
///
/// `None` targets the default framebuffer of the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlRenderPass {
    pub(crate) framebuffer: Option<glow::Framebuffer>,
}

impl GlRenderPass {
    /// Default framebuffer
    pub fn screen() -> Self {
        Self { framebuffer: None }
    }

    /// Offscreen framebuffer object owned by the caller
    pub fn offscreen(framebuffer: glow::Framebuffer) -> Self {
        Self { framebuffer: Some(framebuffer) }
    }

    pub fn framebuffer(&self) -> Option<glow::Framebuffer> {
        self.framebuffer
    }
}

impl RenderPass for GlRenderPass {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
