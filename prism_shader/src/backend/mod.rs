/// Backend seam: traits implemented by the OpenGL, GLES and Metal backends

pub mod device;
pub mod program;
pub mod texture;
pub mod render_pass;

#[cfg(test)]
pub mod mock_device;

pub use device::*;
pub use program::*;
pub use texture::*;
pub use render_pass::*;
