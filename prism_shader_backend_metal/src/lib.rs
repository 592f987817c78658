/*!
# Prism Shader - Metal Backend

Metal implementation of the prism_shader device traits, on top of metal-rs.

Each stage is an MSL source with a `vertex_main` or `fragment_main` entry
point. Parameters are taken from the argument tables Metal reflects when the
pipeline is built: pointer buffers (`const device float3 *position`) become
per-vertex or per-fragment data, buffers passed by reference
(`constant float4x4 &mvp`) become uniforms, textures and samplers keep their
stage.

Only compiled on macOS.
*/

#![cfg(target_os = "macos")]

mod metal_types;
mod metal_buffer;
mod metal_texture;
mod metal_render_pass;
mod metal_program;
mod metal_device;

pub use metal_device::MetalDevice;
pub use metal_program::MetalProgram;
pub use metal_buffer::MetalBuffer;
pub use metal_texture::MetalTexture;
pub use metal_render_pass::MetalRenderPass;
pub use metal_types::{VERTEX_ENTRY, FRAGMENT_ENTRY};
