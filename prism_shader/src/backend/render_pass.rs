/// Render pass handle trait
///
/// The render pass (target, clear state, encoder) is owned by the caller. A
/// shader keeps a shared reference for the lifetime of its pipeline.

use std::any::Any;

/// Backend render pass handle
pub trait RenderPass: Any {
    /// Downcast access for the backend that created the render pass
    fn as_any(&self) -> &dyn Any;
}
