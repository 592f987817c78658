/// Shader - named, type-erased parameter registry and draw protocol
///
/// A `Shader` owns one compiled program and one `Buffer` record per declared
/// parameter. Values are staged on the CPU by `set_buffer` / `set_uniform` /
/// `set_texture` and reach the GPU only inside `begin()`, once per pass and
/// only for records marked dirty.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use prism_shader::prism::{Shader, BlendMode, PrimitiveType, Device, RenderPass};
///
/// fn draw_quad(device: &dyn Device, pass: Arc<dyn RenderPass>) -> prism_shader::prism::Result<()> {
///     let mut shader = Shader::new(device, pass, "quad", "/* vs */", "/* fs */", BlendMode::AlphaBlend)?;
///     shader.set_uniform("mvp", &prism_shader::glam::Mat4::IDENTITY)?;
///     shader.set_uniform("position", &vec![[-1.0f32, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]])?;
///     shader.set_uniform("indices", &[0u32, 1, 2, 2, 3, 0])?;
///
///     shader.begin()?;
///     shader.draw_array(PrimitiveType::Triangle, 0, 6, true)?;
///     shader.end()
/// }
/// ```

use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::backend::{Backend, Binding, BufferView, Device, Program, ProgramDesc, RenderPass, Texture};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::shader::buffer::{Buffer, BufferType, Payload, INDICES};
use crate::shader::{BlendMode, PrimitiveType};
use crate::types::{shape_size, UniformValue, VariableType, MAX_DIMS};
use crate::{prism_bail, prism_debug, prism_err, prism_trace, prism_warn};

const SOURCE: &str = "prism::Shader";

/// Draw protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawState {
    Inactive,
    Active,
}

/// GPU program plus its named parameter registry
pub struct Shader {
    name: String,
    backend: Backend,
    config: Config,
    blend_mode: BlendMode,
    state: DrawState,
    /// Dropped before the program so backend allocations go first
    buffers: FxHashMap<String, Buffer>,
    program: Box<dyn Program>,
    render_pass: Arc<dyn RenderPass>,
}

impl Shader {
    /// Compile and link a program, then build the registry from its interface
    ///
    /// # Errors
    ///
    /// `Error::CompilationFailed` with the backend's compiler/linker log, or
    /// when a stage declares a parameter named `indices`.
    pub fn new(
        device: &dyn Device,
        render_pass: Arc<dyn RenderPass>,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
        blend_mode: BlendMode,
    ) -> Result<Self> {
        let desc = ProgramDesc { name, vertex_source, fragment_source, blend_mode };
        let program = device.create_program(&render_pass, &desc)?;

        let mut buffers = FxHashMap::default();
        for parameter in program.reflection().parameters() {
            if parameter.name == INDICES {
                prism_bail!(SOURCE, CompilationFailed,
                    "{}: '{}' is reserved for the index buffer and cannot be declared ({})",
                    name, INDICES, parameter.buffer_type);
            }
            buffers.insert(parameter.name.clone(), Buffer::declared(parameter));
        }
        buffers.insert(INDICES.to_string(), Buffer::index_buffer());

        let config = device.config().clone();
        prism_debug!(SOURCE, "[{}] Created shader '{}' ({}, {} parameters)",
            config.label, name, device.backend(), buffers.len());

        Ok(Self {
            name: name.to_string(),
            backend: device.backend(),
            config,
            blend_mode,
            state: DrawState::Inactive,
            buffers,
            program,
            render_pass,
        })
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Backend program, downcastable through `as_any()` to reach native handles
    pub fn program(&self) -> &dyn Program {
        self.program.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state == DrawState::Active
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    /// Binding record of a parameter
    pub fn buffer(&self, name: &str) -> Option<&Buffer> {
        self.buffers.get(name)
    }

    /// All records, in no particular order
    pub fn buffers(&self) -> impl Iterator<Item = (&str, &Buffer)> {
        self.buffers.iter().map(|(name, buffer)| (name.as_str(), buffer))
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    // ===== PARAMETERS =====

    /// Stage raw data for a declared parameter
    ///
    /// `shape` entries past `ndim` are ignored. No GPU work happens until the
    /// next `begin()`.
    ///
    /// # Errors
    ///
    /// - `StateViolation` inside `begin()` / `end()`
    /// - `UnknownParameter` if neither stage declares `name`
    /// - `InvalidShape` for `ndim > 3`, an `Invalid` dtype, or a byte count that
    ///   does not match `dtype` and `shape`
    /// - `TypeMismatch` for texture slots, or when the data disagrees with the
    ///   declared type (with `Config::validate_types`)
    pub fn set_buffer(
        &mut self,
        name: &str,
        dtype: VariableType,
        ndim: usize,
        shape: [usize; 3],
        data: &[u8],
    ) -> Result<()> {
        self.ensure_inactive(name)?;
        let Some(buffer) = self.buffers.get_mut(name) else {
            prism_bail!(SOURCE, UnknownParameter, "{}", name);
        };
        if ndim > MAX_DIMS {
            prism_bail!(SOURCE, InvalidShape,
                "'{}': invalid dimension {} (at most {} supported)", name, ndim, MAX_DIMS);
        }
        if dtype == VariableType::Invalid {
            prism_bail!(SOURCE, InvalidShape, "'{}': element type is invalid", name);
        }

        let mut shape = shape;
        for extent in &mut shape[ndim..] {
            *extent = 1;
        }
        let Some(expected_size) = shape_size(dtype, &shape[..ndim]) else {
            prism_bail!(SOURCE, InvalidShape,
                "'{}': {} x {:?} overflows the addressable size", name, dtype, &shape[..ndim]);
        };
        if expected_size != data.len() {
            prism_bail!(SOURCE, InvalidShape,
                "'{}': {} x {:?} needs {} bytes, got {}", name, dtype, &shape[..ndim], expected_size, data.len());
        }

        if !buffer.buffer_type.is_data() {
            prism_bail!(SOURCE, TypeMismatch,
                "'{}' is a {} slot and cannot take buffer data", name, buffer.buffer_type);
        }
        if self.config.validate_types {
            check_declared(name, buffer, dtype, ndim, &shape)?;
        }

        buffer.assign_data(dtype, ndim, shape, data);
        Ok(())
    }

    /// Stage a typed value, classified by `UniformValue`
    ///
    /// Works for every data slot (uniforms, attributes, indices). Matrices are
    /// expected column-major.
    pub fn set_uniform<V: UniformValue + ?Sized>(&mut self, name: &str, value: &V) -> Result<()> {
        self.ensure_inactive(name)?;
        if !self.buffers.contains_key(name) {
            prism_bail!(SOURCE, UnknownParameter, "{}", name);
        }
        let data = value.uniform_data()?;
        self.set_buffer(name, data.dtype, data.ndim, data.shape, &data.bytes)
    }

    /// Associate a texture with a texture (or sampler) slot
    ///
    /// A sampler slot named `<name>_sampler` picks up the same texture.
    pub fn set_texture(&mut self, name: &str, texture: Arc<dyn Texture>) -> Result<()> {
        self.ensure_inactive(name)?;
        let Some(buffer) = self.buffers.get_mut(name) else {
            prism_bail!(SOURCE, UnknownParameter, "{}", name);
        };
        if !buffer.buffer_type.is_texture() && !buffer.buffer_type.is_sampler() {
            prism_bail!(SOURCE, TypeMismatch,
                "'{}' is a {} slot and cannot take a texture", name, buffer.buffer_type);
        }
        buffer.assign_texture(texture.clone());

        let sampler = format!("{}_sampler", name);
        if let Some(sampler) = self.buffers.get_mut(&sampler) {
            if sampler.buffer_type.is_sampler() {
                sampler.assign_texture(texture);
            }
        }
        Ok(())
    }

    /// The registry is frozen while a pass uses the uploaded resources
    fn ensure_inactive(&self, name: &str) -> Result<()> {
        if self.state == DrawState::Active {
            prism_bail!(SOURCE, StateViolation,
                "'{}': cannot set '{}' inside begin()/end()", self.name, name);
        }
        Ok(())
    }

    // ===== DRAW PROTOCOL =====

    /// Start a pass: activate the program, upload dirty records, bind everything
    ///
    /// # Errors
    ///
    /// - `StateViolation` if a pass is already active
    /// - `MissingBinding` if a declared parameter was never set
    pub fn begin(&mut self) -> Result<()> {
        if self.state == DrawState::Active {
            prism_bail!(SOURCE, StateViolation, "'{}': begin() called twice without end()", self.name);
        }

        let mut missing: Vec<&str> = self.buffers.iter()
            .filter(|(name, buffer)| name.as_str() != INDICES && !buffer.is_bound())
            .map(|(name, _)| name.as_str())
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            prism_bail!(SOURCE, MissingBinding, "'{}': {}", self.name, missing.join(", "));
        }

        self.program.activate(self.blend_mode)?;
        if let Err(err) = self.upload_and_bind() {
            if let Err(deactivate_err) = self.program.deactivate() {
                prism_warn!(SOURCE, "'{}': deactivate after failed begin(): {}", self.name, deactivate_err);
            }
            return Err(err);
        }

        self.state = DrawState::Active;
        Ok(())
    }

    fn upload_and_bind(&mut self) -> Result<()> {
        let mut names: Vec<String> = self.buffers.keys().cloned().collect();
        names.sort_unstable();

        for name in &names {
            let Some(buffer) = self.buffers.get_mut(name) else {
                continue;
            };
            let Buffer { buffer_type, dtype, ndim, shape, index, dirty, payload, .. } = buffer;
            let binding = Binding { name: name.as_str(), buffer_type: *buffer_type, index: *index };

            match payload {
                Payload::Empty => continue,
                Payload::Texture(texture) => {
                    self.program.bind_texture(binding, texture.as_ref())?;
                }
                Payload::Data { bytes, resource } => {
                    let view = BufferView {
                        binding,
                        dtype: *dtype,
                        ndim: ndim.unwrap_or(0),
                        shape: *shape,
                        bytes: bytes.as_slice(),
                    };
                    match resource {
                        Some(existing) if *dirty => {
                            self.program.update(existing.as_ref(), &view)?;
                            if self.config.trace_uploads {
                                prism_trace!(SOURCE, "[{}] Updated '{}' ({} bytes)",
                                    self.config.label, name, view.bytes.len());
                            }
                        }
                        Some(_) => {}
                        None => {
                            *resource = Some(self.program.allocate(&view)?);
                            if self.config.trace_uploads {
                                prism_trace!(SOURCE, "[{}] Allocated '{}' ({} bytes)",
                                    self.config.label, name, view.bytes.len());
                            }
                        }
                    }
                    if let Some(resource) = resource.as_deref() {
                        self.program.bind(&view, resource, *dirty)?;
                    }
                }
            }
            *dirty = false;
        }
        Ok(())
    }

    /// Draw `count` vertices (or indices) starting at `offset`
    ///
    /// A `count` of zero draws nothing.
    ///
    /// # Errors
    ///
    /// - `StateViolation` outside of `begin()` / `end()`
    /// - `TopologyMismatch` when `count` is not a whole number of lines/triangles
    /// - `MissingBinding` / `TypeMismatch` for an indexed draw without `u32` indices
    /// - `InvalidRange` when the range reaches past the bound data
    pub fn draw_array(
        &mut self,
        primitive: PrimitiveType,
        offset: usize,
        count: usize,
        indexed: bool,
    ) -> Result<()> {
        if self.state != DrawState::Active {
            prism_bail!(SOURCE, StateViolation, "'{}': draw_array() called outside begin()/end()", self.name);
        }
        if !primitive.accepts_count(count) {
            let err = Error::TopologyMismatch { primitive, count };
            crate::prism_error!(SOURCE, "'{}': {}", self.name, err);
            return Err(err);
        }

        let limit = if indexed {
            let indices = self.indexed_buffer()?;
            indices.element_count()
        } else {
            self.vertex_limit()
        };
        if offset.checked_add(count).map_or(true, |end| end > limit) {
            prism_bail!(SOURCE, InvalidRange,
                "'{}': {} elements from offset {} exceed the {} bound {}",
                self.name, count, offset, limit,
                if indexed { "indices" } else { "vertices" });
        }

        if count == 0 {
            return Ok(());
        }

        let indices = if indexed {
            match self.buffers.get(INDICES).map(|buffer| &buffer.payload) {
                Some(Payload::Data { resource: Some(resource), .. }) => Some(resource.as_ref()),
                _ => {
                    return Err(prism_err!(SOURCE, MissingBinding,
                        "'{}': indices have no uploaded resource", self.name));
                }
            }
        } else {
            None
        };
        self.program.draw(primitive, offset, count, indices)
    }

    fn indexed_buffer(&self) -> Result<&Buffer> {
        let Some(indices) = self.buffers.get(INDICES).filter(|buffer| buffer.is_bound()) else {
            prism_bail!(SOURCE, MissingBinding, "'{}': indexed draw without '{}'", self.name, INDICES);
        };
        if indices.dtype != VariableType::UInt32 {
            prism_bail!(SOURCE, TypeMismatch,
                "'{}': '{}' must be uint32, got {}", self.name, INDICES, indices.dtype);
        }
        Ok(indices)
    }

    /// Smallest vertex count among bound attributes, `usize::MAX` when none is bound
    fn vertex_limit(&self) -> usize {
        self.buffers.values()
            .filter(|buffer| buffer.buffer_type == BufferType::VertexBuffer && buffer.is_bound())
            .map(|buffer| match buffer.ndim {
                Some(0) | None => 1,
                Some(_) => buffer.shape[0],
            })
            .min()
            .unwrap_or(usize::MAX)
    }

    /// End the pass
    ///
    /// # Errors
    ///
    /// `StateViolation` if no pass is active.
    pub fn end(&mut self) -> Result<()> {
        if self.state != DrawState::Active {
            prism_bail!(SOURCE, StateViolation, "'{}': end() called without begin()", self.name);
        }
        self.state = DrawState::Inactive;
        self.program.deactivate()
    }

    /// Begin a pass that ends when the returned guard is dropped
    pub fn scope(&mut self) -> Result<ActiveShader<'_>> {
        self.begin()?;
        Ok(ActiveShader { shader: self })
    }
}

/// Element type and count checks against the program's declaration
fn check_declared(
    name: &str,
    buffer: &Buffer,
    dtype: VariableType,
    ndim: usize,
    shape: &[usize; 3],
) -> Result<()> {
    let Some((declared, components)) = buffer.expected else {
        return Ok(());
    };
    match buffer.buffer_type {
        // Attributes are converted by the vertex fetch, only the component count must agree
        BufferType::VertexBuffer => {
            let supplied = if ndim < 2 { 1 } else { shape[1..ndim].iter().product() };
            if supplied != components {
                prism_bail!(SOURCE, TypeMismatch,
                    "'{}' declares {} components per vertex, got {}", name, components, supplied);
            }
        }
        BufferType::IndexBuffer => {}
        _ => {
            if dtype != declared {
                prism_bail!(SOURCE, TypeMismatch, "'{}' is declared as {}, got {}", name, declared, dtype);
            }
            let supplied: usize = shape[..ndim].iter().product();
            if supplied != components {
                prism_bail!(SOURCE, TypeMismatch,
                    "'{}' declares {} elements, got {}", name, components, supplied);
            }
        }
    }
    Ok(())
}

impl Drop for Shader {
    fn drop(&mut self) {
        if self.state == DrawState::Active {
            prism_warn!(SOURCE, "'{}' dropped inside an active pass", self.name);
            if let Err(err) = self.program.deactivate() {
                prism_warn!(SOURCE, "'{}': deactivate on drop: {}", self.name, err);
            }
        }
        prism_debug!(SOURCE, "[{}] Destroying shader '{}'", self.config.label, self.name);
    }
}

/// Active pass guard returned by `Shader::scope`
///
/// Ends the pass when dropped. Errors from that implicit `end()` are logged;
/// call `finish()` to observe them instead.
pub struct ActiveShader<'s> {
    shader: &'s mut Shader,
}

impl ActiveShader<'_> {
    pub fn draw_array(
        &mut self,
        primitive: PrimitiveType,
        offset: usize,
        count: usize,
        indexed: bool,
    ) -> Result<()> {
        self.shader.draw_array(primitive, offset, count, indexed)
    }

    pub fn shader(&self) -> &Shader {
        self.shader
    }

    /// End the pass now and report its result
    pub fn finish(self) -> Result<()> {
        self.shader.end()
    }
}

impl Drop for ActiveShader<'_> {
    fn drop(&mut self) {
        if self.shader.is_active() {
            if let Err(err) = self.shader.end() {
                prism_warn!(SOURCE, "'{}': implicit end() failed: {}", self.shader.name, err);
            }
        }
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
