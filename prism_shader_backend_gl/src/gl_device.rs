/// GlDevice - OpenGL / OpenGL ES implementation of the Device trait

use std::sync::Arc;
use glow::HasContext;
use prism_shader::prism::{Backend, Config, Device, Program, RenderPass, Result};
use prism_shader::prism::backend::ProgramDesc;
use prism_shader::{prism_bail, prism_info};

use crate::gl_program::GlProgram;

/// Flavour of the GL context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlVariant {
    /// Desktop OpenGL 3.3 core or later: vertex array objects, program point size
    Desktop,
    /// OpenGL ES 2/3 or WebGL: no VAO, no double precision
    Es,
}

/// OpenGL device
///
/// Wraps a glow context that is current on the calling thread for the
/// lifetime of the device and of every shader it creates.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use prism_shader::prism::{Config, Shader, BlendMode, RenderPass};
/// use prism_shader_backend_gl::{GlDevice, GlVariant, GlRenderPass};
///
/// # fn demo(gl: glow::Context) -> prism_shader::prism::Result<()> {
/// let device = GlDevice::new(Arc::new(gl), GlVariant::Desktop, Config::default())?;
/// let pass: Arc<dyn RenderPass> = Arc::new(GlRenderPass::screen());
/// let shader = Shader::new(&device, pass, "quad", "/* vs */", "/* fs */", BlendMode::None)?;
/// # Ok(())
/// # }
/// ```
pub struct GlDevice {
    gl: Arc<glow::Context>,
    variant: GlVariant,
    config: Config,
}

impl GlDevice {
    /// Create a device over an existing context
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` when the context flavour does not match `variant`.
    pub fn new(gl: Arc<glow::Context>, variant: GlVariant, config: Config) -> Result<Self> {
        let version = gl.version();
        if variant == GlVariant::Desktop && version.is_embedded {
            prism_bail!("prism::gl", InitializationFailed,
                "desktop GL requested but the context is OpenGL ES {}.{}", version.major, version.minor);
        }
        if variant == GlVariant::Desktop && (version.major, version.minor) < (3, 3) {
            prism_bail!("prism::gl", InitializationFailed,
                "OpenGL 3.3 or later required, context is {}.{}", version.major, version.minor);
        }

        prism_info!("prism::gl", "[{}] {} device on GL {}.{} ({})",
            config.label,
            if variant == GlVariant::Desktop { "OpenGL" } else { "OpenGL ES" },
            version.major, version.minor, version.vendor_info);

        Ok(Self { gl, variant, config })
    }

    pub fn variant(&self) -> GlVariant {
        self.variant
    }

    /// Shared glow context
    pub fn context(&self) -> &Arc<glow::Context> {
        &self.gl
    }
}

impl Device for GlDevice {
    fn backend(&self) -> Backend {
        match self.variant {
            GlVariant::Desktop => Backend::OpenGl,
            GlVariant::Es => Backend::Gles,
        }
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn create_program(
        &self,
        render_pass: &Arc<dyn RenderPass>,
        desc: &ProgramDesc<'_>,
    ) -> Result<Box<dyn Program>> {
        let program = GlProgram::new(self.gl.clone(), self.variant, render_pass.clone(), desc, &self.config)?;
        Ok(Box::new(program))
    }
}
