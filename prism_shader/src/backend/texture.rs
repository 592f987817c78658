/// Texture handle trait
///
/// Texture creation and upload live outside this crate. A shader only needs an
/// opaque handle that the backend which created it can downcast.

use std::any::Any;

/// Backend texture handle
///
/// Shared between shaders through `Arc<dyn Texture>`.
pub trait Texture: Any {
    /// Texture size in pixels (width, height)
    fn size(&self) -> (u32, u32);

    /// Downcast access for the backend that created the texture
    fn as_any(&self) -> &dyn Any;
}
