/*!
# Prism Shader - OpenGL Backend

OpenGL 3.3+ and OpenGL ES implementation of the prism_shader device traits,
on top of glow.

Programs are compiled from GLSL sources. Attributes and uniforms are
discovered by querying the linked program, so the parameter registry of a
`Shader` matches exactly what the driver kept after optimization.

The context must be current on the calling thread whenever a device or one
of its shaders is used.
*/

mod gl_types;
mod gl_buffer;
mod gl_texture;
mod gl_render_pass;
mod gl_program;
mod gl_device;

pub use gl_device::{GlDevice, GlVariant};
pub use gl_program::GlProgram;
pub use gl_buffer::{GlBuffer, GlStorage};
pub use gl_texture::GlTexture;
pub use gl_render_pass::GlRenderPass;
