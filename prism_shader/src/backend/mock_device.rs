/// Mock device for unit tests (no GPU required)
///
/// Every backend call made by a `Shader` is recorded as a string in a command
/// log shared by the device and all programs it creates, so tests can assert
/// on the exact sequence of activations, uploads, bindings and draws.

use std::any::Any;
use std::sync::{Arc, Mutex};
use crate::backend::{
    Backend, Binding, BufferResource, BufferView, DeclaredParameter, Device, Program,
    ProgramDesc, ProgramReflection, RenderPass, Texture,
};
use crate::config::Config;
use crate::error::Result;
use crate::shader::{BlendMode, BufferType, PrimitiveType};
use crate::types::VariableType;
use crate::prism_bail;

pub type CommandLog = Arc<Mutex<Vec<String>>>;

fn record(commands: &CommandLog, command: String) {
    if let Ok(mut log) = commands.lock() {
        log.push(command);
    }
}

// ============================================================================
// Mock BufferResource
// ============================================================================

#[derive(Debug)]
pub struct MockBufferResource {
    pub name: String,
    pub size: usize,
}

impl BufferResource for MockBufferResource {
    fn size(&self) -> usize {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Resource no mock program created, for the downcast failure path
#[derive(Debug)]
pub struct ForeignBufferResource;

impl BufferResource for ForeignBufferResource {
    fn size(&self) -> usize {
        0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Texture / RenderPass
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl MockTexture {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self { label: label.to_string(), width, height }
    }
}

impl Texture for MockTexture {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct MockRenderPass;

impl RenderPass for MockRenderPass {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Device
// ============================================================================

pub struct MockDevice {
    pub config: Config,
    pub reflection: ProgramReflection,
    pub commands: CommandLog,
    pub compile_error: Option<String>,
}

impl MockDevice {
    pub fn new(reflection: ProgramReflection) -> Self {
        Self {
            config: Config::default().with_label("mock"),
            reflection,
            commands: Arc::new(Mutex::new(Vec::new())),
            compile_error: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Device whose programs never compile
    pub fn failing(message: &str) -> Self {
        let mut device = Self::new(ProgramReflection::new());
        device.compile_error = Some(message.to_string());
        device
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn clear_commands(&self) {
        if let Ok(mut log) = self.commands.lock() {
            log.clear();
        }
    }
}

impl Device for MockDevice {
    fn backend(&self) -> Backend {
        Backend::OpenGl
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn create_program(
        &self,
        render_pass: &Arc<dyn RenderPass>,
        desc: &ProgramDesc<'_>,
    ) -> Result<Box<dyn Program>> {
        if render_pass.as_any().downcast_ref::<MockRenderPass>().is_none() {
            prism_bail!("prism::mock", InvalidResource, "render pass was not created by the mock backend");
        }
        if let Some(message) = &self.compile_error {
            prism_bail!("prism::mock", CompilationFailed, "{}: {}", desc.name, message);
        }
        if desc.vertex_source.trim().is_empty() || desc.fragment_source.trim().is_empty() {
            prism_bail!("prism::mock", CompilationFailed, "{}: empty shader source", desc.name);
        }
        record(&self.commands, format!("create_program({})", desc.name));
        Ok(Box::new(MockProgram {
            reflection: self.reflection.clone(),
            commands: self.commands.clone(),
            active: false,
        }))
    }
}

// ============================================================================
// Mock Program
// ============================================================================

pub struct MockProgram {
    reflection: ProgramReflection,
    commands: CommandLog,
    active: bool,
}

impl MockProgram {
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn resource<'r>(resource: &'r dyn BufferResource) -> Result<&'r MockBufferResource> {
        match resource.as_any().downcast_ref::<MockBufferResource>() {
            Some(resource) => Ok(resource),
            None => prism_bail!("prism::mock", InvalidResource, "buffer was not created by the mock backend"),
        }
    }
}

impl Program for MockProgram {
    fn reflection(&self) -> &ProgramReflection {
        &self.reflection
    }

    fn activate(&mut self, blend_mode: BlendMode) -> Result<()> {
        self.active = true;
        record(&self.commands, format!("activate({:?})", blend_mode));
        Ok(())
    }

    fn allocate(&mut self, view: &BufferView<'_>) -> Result<Box<dyn BufferResource>> {
        record(&self.commands, format!("allocate({}, {})", view.binding.name, view.bytes.len()));
        Ok(Box::new(MockBufferResource {
            name: view.binding.name.to_string(),
            size: view.bytes.len(),
        }))
    }

    fn update(&mut self, resource: &dyn BufferResource, view: &BufferView<'_>) -> Result<()> {
        let resource = Self::resource(resource)?;
        record(&self.commands, format!("update({}, {})", resource.name, view.bytes.len()));
        Ok(())
    }

    fn bind(&mut self, view: &BufferView<'_>, resource: &dyn BufferResource, dirty: bool) -> Result<()> {
        Self::resource(resource)?;
        record(&self.commands, format!("bind({}, {}, dirty={})", view.binding.name, view.binding.index, dirty));
        Ok(())
    }

    fn bind_texture(&mut self, binding: Binding<'_>, texture: &dyn Texture) -> Result<()> {
        let Some(texture) = texture.as_any().downcast_ref::<MockTexture>() else {
            prism_bail!("prism::mock", InvalidResource, "texture was not created by the mock backend");
        };
        record(&self.commands, format!("bind_texture({}, {}, {})", binding.name, binding.index, texture.label));
        Ok(())
    }

    fn draw(
        &mut self,
        primitive: PrimitiveType,
        offset: usize,
        count: usize,
        indices: Option<&dyn BufferResource>,
    ) -> Result<()> {
        if !self.active {
            prism_bail!("prism::mock", BackendError, "draw outside of an active pass");
        }
        if let Some(indices) = indices {
            Self::resource(indices)?;
        }
        record(&self.commands, format!(
            "draw({:?}, {}, {}, indexed={})",
            primitive, offset, count, indices.is_some()
        ));
        Ok(())
    }

    fn deactivate(&mut self) -> Result<()> {
        self.active = false;
        record(&self.commands, "deactivate".to_string());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Reflection helpers
// ============================================================================

pub fn parameter(
    name: &str,
    buffer_type: BufferType,
    index: u32,
    expected: Option<(VariableType, usize)>,
) -> DeclaredParameter {
    DeclaredParameter {
        name: name.to_string(),
        buffer_type,
        index,
        stages: buffer_type.stages(),
        expected,
    }
}

/// Interface of a textured, transformed quad shader:
/// `position` (vec3 attribute), `mvp` (mat4 uniform), `image` (fragment texture)
/// and its `image_sampler`
pub fn quad_reflection() -> ProgramReflection {
    let mut reflection = ProgramReflection::new();
    reflection.push(parameter("position", BufferType::VertexBuffer, 0, Some((VariableType::Float32, 3))));
    reflection.push(parameter("mvp", BufferType::UniformBuffer, 1, Some((VariableType::Float32, 16))));
    reflection.push(parameter("image", BufferType::FragmentTexture, 0, None));
    reflection.push(parameter("image_sampler", BufferType::FragmentSampler, 0, None));
    reflection
}

/// Interface with a single vec2 attribute, nothing else
pub fn position_only_reflection() -> ProgramReflection {
    let mut reflection = ProgramReflection::new();
    reflection.push(parameter("position", BufferType::VertexBuffer, 0, Some((VariableType::Float32, 2))));
    reflection
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
