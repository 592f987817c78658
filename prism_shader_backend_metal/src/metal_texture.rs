/// MetalTexture - texture and sampler pair for the Metal backend

use std::any::Any;
use metal::{MTLSamplerAddressMode, MTLSamplerMinMagFilter, SamplerDescriptor};
use prism_shader::prism::Texture;

/// Texture bound to `*_texture` slots, with the sampler state bound to the
/// matching `*_sampler` slots
#[derive(Clone)]
pub struct MetalTexture {
    pub(crate) texture: metal::Texture,
    pub(crate) sampler: metal::SamplerState,
}

impl MetalTexture {
    pub fn new(texture: metal::Texture, sampler: metal::SamplerState) -> Self {
        Self { texture, sampler }
    }

    /// Pair `texture` with a bilinear, clamp-to-edge sampler
    pub fn with_linear_sampler(device: &metal::DeviceRef, texture: metal::Texture) -> Self {
        let descriptor = SamplerDescriptor::new();
        descriptor.set_min_filter(MTLSamplerMinMagFilter::Linear);
        descriptor.set_mag_filter(MTLSamplerMinMagFilter::Linear);
        descriptor.set_address_mode_s(MTLSamplerAddressMode::ClampToEdge);
        descriptor.set_address_mode_t(MTLSamplerAddressMode::ClampToEdge);
        let sampler = device.new_sampler(&descriptor);
        Self { texture, sampler }
    }

    pub fn raw(&self) -> &metal::TextureRef {
        &self.texture
    }

    pub fn sampler(&self) -> &metal::SamplerStateRef {
        &self.sampler
    }
}

impl Texture for MetalTexture {
    fn size(&self) -> (u32, u32) {
        (self.texture.width() as u32, self.texture.height() as u32)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
