/// MetalDevice - Metal implementation of the Device trait

use std::sync::Arc;
use metal::MTLPixelFormat;
use prism_shader::prism::{Backend, Config, Device, Program, RenderPass, Result};
use prism_shader::prism::backend::ProgramDesc;
use prism_shader::{prism_bail, prism_info};

use crate::metal_program::MetalProgram;

/// Metal device
///
/// Pipelines are built for `pixel_format` unless the render pass names its
/// own colour format.
pub struct MetalDevice {
    device: metal::Device,
    pixel_format: MTLPixelFormat,
    config: Config,
}

impl MetalDevice {
    /// # Errors
    ///
    /// `Error::InitializationFailed` for `MTLPixelFormat::Invalid`.
    pub fn new(device: metal::Device, pixel_format: MTLPixelFormat, config: Config) -> Result<Self> {
        if matches!(pixel_format, MTLPixelFormat::Invalid) {
            prism_bail!("prism::metal", InitializationFailed, "invalid colour pixel format");
        }
        prism_info!("prism::metal", "[{}] Metal device on {}", config.label, device.name());
        Ok(Self { device, pixel_format, config })
    }

    /// Device on the system default GPU
    pub fn system_default(pixel_format: MTLPixelFormat, config: Config) -> Result<Self> {
        let Some(device) = metal::Device::system_default() else {
            prism_bail!("prism::metal", InitializationFailed, "no Metal device found");
        };
        Self::new(device, pixel_format, config)
    }

    pub fn raw(&self) -> &metal::DeviceRef {
        &self.device
    }

    pub fn pixel_format(&self) -> MTLPixelFormat {
        self.pixel_format
    }
}

impl Device for MetalDevice {
    fn backend(&self) -> Backend {
        Backend::Metal
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn create_program(
        &self,
        render_pass: &Arc<dyn RenderPass>,
        desc: &ProgramDesc<'_>,
    ) -> Result<Box<dyn Program>> {
        let program = MetalProgram::new(&self.device, self.pixel_format, render_pass.clone(), desc, &self.config)?;
        Ok(Box::new(program))
    }
}
