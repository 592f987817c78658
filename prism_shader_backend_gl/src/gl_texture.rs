/// GlTexture - texture handle for the OpenGL backends

use std::any::Any;
use prism_shader::prism::Texture;

/// Texture object created and owned by the caller
///
/// The handle is not deleted on drop.
#[derive(Debug, Clone, Copy)]
pub struct GlTexture {
    pub(crate) texture: glow::Texture,
    /// Bind target (`TEXTURE_2D`, `TEXTURE_CUBE_MAP`, ...)
    pub(crate) target: u32,
    pub(crate) size: (u32, u32),
}

impl GlTexture {
    pub fn new(texture: glow::Texture, target: u32, width: u32, height: u32) -> Self {
        Self { texture, target, size: (width, height) }
    }

    /// 2D texture
    pub fn texture_2d(texture: glow::Texture, width: u32, height: u32) -> Self {
        Self::new(texture, glow::TEXTURE_2D, width, height)
    }

    pub fn raw(&self) -> glow::Texture {
        self.texture
    }

    pub fn target(&self) -> u32 {
        self.target
    }
}

impl Texture for GlTexture {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
