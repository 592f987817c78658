/// Device trait - backend factory for shader programs

use std::fmt;
use std::sync::Arc;
use crate::error::Result;
use crate::config::Config;
use crate::backend::{Program, ProgramDesc, RenderPass};

/// Backend family, fixed when the device is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Desktop OpenGL (3.3 core and later)
    OpenGl,
    /// OpenGL ES 2/3 and WebGL
    Gles,
    /// Apple Metal
    Metal,
}

impl Backend {
    pub const fn name(self) -> &'static str {
        match self {
            Backend::OpenGl => "OpenGL",
            Backend::Gles => "OpenGL ES",
            Backend::Metal => "Metal",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backend device
///
/// Implemented by `GlDevice` and `MetalDevice`. A `Shader` only talks to the
/// device once, at construction, to compile and reflect its program.
pub trait Device {
    /// Backend family of this device
    fn backend(&self) -> Backend;

    /// Configuration shared by every shader created from this device
    fn config(&self) -> &Config;

    /// Compile, link and reflect a program
    ///
    /// # Errors
    ///
    /// Returns `Error::CompilationFailed` with the compiler/linker log.
    fn create_program(
        &self,
        render_pass: &Arc<dyn RenderPass>,
        desc: &ProgramDesc<'_>,
    ) -> Result<Box<dyn Program>>;
}
