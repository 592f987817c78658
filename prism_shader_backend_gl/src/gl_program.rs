/// GlProgram - OpenGL / OpenGL ES implementation of the Program trait

use std::sync::Arc;
use glow::HasContext;
use rustc_hash::FxHashMap;
use prism_shader::prism::{
    BlendMode, BufferResource, BufferType, Config, PrimitiveType, Program, RenderPass, Result,
    Texture, VariableType,
};
use prism_shader::prism::backend::{
    Binding, BufferView, DeclaredParameter, ProgramDesc, ProgramReflection, ShaderStages,
};
use prism_shader::{prism_bail, prism_debug, prism_err};

use crate::gl_buffer::{GlBuffer, GlStorage};
use crate::gl_device::GlVariant;
use crate::gl_render_pass::GlRenderPass;
use crate::gl_texture::GlTexture;
use crate::gl_types::{self, AttributeKind};

const SOURCE: &str = "prism::gl";

/// Uniform reflected at link time
struct UniformSlot {
    location: glow::UniformLocation,
    gl_type: u32,
    /// Texture unit for samplers
    unit: u32,
}

/// Linked GL program with its reflected interface
pub struct GlProgram {
    gl: Arc<glow::Context>,
    variant: GlVariant,
    name: String,
    program: glow::Program,
    /// Desktop only
    vertex_array: Option<glow::VertexArray>,
    render_pass: Arc<dyn RenderPass>,
    reflection: ProgramReflection,
    uniforms: FxHashMap<String, UniformSlot>,
    /// Declared GLSL type of each attribute
    attributes: FxHashMap<String, u32>,
    uses_point_size: bool,
    blending: bool,
    /// Attribute locations enabled by the current pass
    enabled_attributes: Vec<u32>,
}

impl GlProgram {
    pub(crate) fn new(
        gl: Arc<glow::Context>,
        variant: GlVariant,
        render_pass: Arc<dyn RenderPass>,
        desc: &ProgramDesc<'_>,
        config: &Config,
    ) -> Result<Self> {
        if render_pass.as_any().downcast_ref::<GlRenderPass>().is_none() {
            prism_bail!(SOURCE, InvalidResource, "'{}': render pass was not created by the GL backend", desc.name);
        }

        let program = unsafe { compile_program(&gl, desc) }?;

        let vertex_array = match variant {
            GlVariant::Desktop => match unsafe { gl.create_vertex_array() } {
                Ok(vertex_array) => Some(vertex_array),
                Err(err) => {
                    unsafe { gl.delete_program(program) };
                    prism_bail!(SOURCE, BackendError, "'{}': glGenVertexArrays failed: {}", desc.name, err);
                }
            },
            GlVariant::Es => None,
        };

        let mut this = Self {
            gl,
            variant,
            name: desc.name.to_string(),
            program,
            vertex_array,
            render_pass,
            reflection: ProgramReflection::new(),
            uniforms: FxHashMap::default(),
            attributes: FxHashMap::default(),
            uses_point_size: variant == GlVariant::Desktop && gl_types::writes_point_size(desc.vertex_source),
            blending: false,
            enabled_attributes: Vec::new(),
        };
        unsafe { this.reflect() };

        prism_debug!(SOURCE, "[{}] Linked '{}': {} attributes, {} uniforms",
            config.label, this.name, this.attributes.len(), this.uniforms.len());
        Ok(this)
    }

    /// Walk active attributes and uniforms into the reflection table
    unsafe fn reflect(&mut self) {
        let gl = &self.gl;

        for index in 0..gl.get_active_attributes(self.program) {
            let Some(attribute) = gl.get_active_attribute(self.program, index) else {
                continue;
            };
            // Built-ins (gl_VertexID, ...) have no location
            let Some(location) = gl.get_attrib_location(self.program, &attribute.name) else {
                continue;
            };
            let expected = gl_types::declared_type(attribute.atype);
            self.attributes.insert(attribute.name.clone(), attribute.atype);
            self.reflection.push(DeclaredParameter {
                name: attribute.name,
                buffer_type: BufferType::VertexBuffer,
                index: location,
                stages: ShaderStages::VERTEX,
                expected,
            });
        }

        let mut next_unit = 0;
        for index in 0..gl.get_active_uniforms(self.program) {
            let Some(uniform) = gl.get_active_uniform(self.program, index) else {
                continue;
            };
            let Some(location) = gl.get_uniform_location(self.program, &uniform.name) else {
                continue;
            };
            let name = gl_types::strip_array_suffix(&uniform.name).to_string();

            let (buffer_type, expected, unit) = if gl_types::is_sampler(uniform.utype) {
                next_unit += 1;
                (BufferType::FragmentTexture, None, next_unit - 1)
            } else {
                let expected = gl_types::declared_type(uniform.utype)
                    .map(|(dtype, components)| (dtype, components * uniform.size.max(1) as usize));
                (BufferType::UniformBuffer, expected, 0)
            };

            self.uniforms.insert(name.clone(), UniformSlot { location, gl_type: uniform.utype, unit });
            self.reflection.push(DeclaredParameter {
                name,
                buffer_type,
                index: if buffer_type == BufferType::FragmentTexture { unit } else { index },
                stages: ShaderStages::ALL,
                expected,
            });
        }
    }

    fn resource<'r>(&self, resource: &'r dyn BufferResource) -> Result<&'r GlBuffer> {
        match resource.as_any().downcast_ref::<GlBuffer>() {
            Some(buffer) => Ok(buffer),
            None => prism_bail!(SOURCE, InvalidResource, "'{}': buffer was not created by the GL backend", self.name),
        }
    }

    fn buffer_target(&self, view: &BufferView<'_>) -> Result<Option<u32>> {
        match view.binding.buffer_type {
            BufferType::VertexBuffer => {
                if view.dtype == VariableType::Float64 && self.variant == GlVariant::Es {
                    prism_bail!(SOURCE, TypeMismatch,
                        "'{}': double precision attribute '{}' is not supported on OpenGL ES",
                        self.name, view.binding.name);
                }
                Ok(Some(glow::ARRAY_BUFFER))
            }
            BufferType::IndexBuffer => Ok(Some(glow::ELEMENT_ARRAY_BUFFER)),
            BufferType::UniformBuffer => Ok(None),
            other => prism_bail!(SOURCE, BackendError,
                "'{}': {} slots do not exist in OpenGL ('{}')", self.name, other, view.binding.name),
        }
    }

    /// Point attribute `view` at the currently bound `ARRAY_BUFFER`
    unsafe fn point_attribute(&mut self, view: &BufferView<'_>) -> Result<()> {
        let location = view.binding.index;
        let components = if view.ndim < 2 { 1 } else { view.shape[1..view.ndim].iter().product() };
        if !(1..=4).contains(&components) {
            prism_bail!(SOURCE, InvalidShape,
                "'{}': attribute '{}' has {} components per vertex (1 to 4 supported)",
                self.name, view.binding.name, components);
        }

        let declared_integer = self.attributes.get(view.binding.name)
            .and_then(|&gl_type| gl_types::declared_type(gl_type))
            .is_some_and(|(dtype, _)| !dtype.is_float() && dtype != VariableType::Bool);
        let Some((gl_type, kind)) = gl_types::attribute_format(view.dtype, declared_integer) else {
            prism_bail!(SOURCE, TypeMismatch,
                "'{}': {} cannot feed attribute '{}'", self.name, view.dtype, view.binding.name);
        };

        let gl = &self.gl;
        let size = components as i32;
        match kind {
            AttributeKind::Float => gl.vertex_attrib_pointer_f32(location, size, gl_type, false, 0, 0),
            AttributeKind::Integer => gl.vertex_attrib_pointer_i32(location, size, gl_type, 0, 0),
            AttributeKind::Double => gl.vertex_attrib_pointer_f64(location, size, gl_type, 0, 0),
        }
        gl.enable_vertex_attrib_array(location);
        if !self.enabled_attributes.contains(&location) {
            self.enabled_attributes.push(location);
        }
        Ok(())
    }

    /// Apply a uniform value with the `glUniform*` entry point of its declared type
    unsafe fn apply_uniform(&self, view: &BufferView<'_>) -> Result<()> {
        let Some(slot) = self.uniforms.get(view.binding.name) else {
            prism_bail!(SOURCE, BackendError, "'{}': no location for uniform '{}'", self.name, view.binding.name);
        };
        let Some((declared, _)) = gl_types::declared_type(slot.gl_type) else {
            prism_bail!(SOURCE, BackendError,
                "'{}': unsupported uniform type 0x{:x} for '{}'", self.name, slot.gl_type, view.binding.name);
        };
        let location = Some(&slot.location);
        let gl = &self.gl;

        match declared {
            VariableType::Float32 => {
                if view.dtype != VariableType::Float32 {
                    return Err(self.uniform_mismatch(view, declared));
                }
                let values = gl_types::decode_f32(view.bytes);
                match slot.gl_type {
                    glow::FLOAT => gl.uniform_1_f32_slice(location, &values),
                    glow::FLOAT_VEC2 => gl.uniform_2_f32_slice(location, &values),
                    glow::FLOAT_VEC3 => gl.uniform_3_f32_slice(location, &values),
                    glow::FLOAT_VEC4 => gl.uniform_4_f32_slice(location, &values),
                    glow::FLOAT_MAT2 => gl.uniform_matrix_2_f32_slice(location, false, &values),
                    glow::FLOAT_MAT3 => gl.uniform_matrix_3_f32_slice(location, false, &values),
                    _ => gl.uniform_matrix_4_f32_slice(location, false, &values),
                }
            }
            VariableType::Int32 => {
                if !matches!(view.dtype, VariableType::Int32 | VariableType::UInt32) {
                    return Err(self.uniform_mismatch(view, declared));
                }
                let values = gl_types::decode_i32(view.bytes);
                match slot.gl_type {
                    glow::INT => gl.uniform_1_i32_slice(location, &values),
                    glow::INT_VEC2 => gl.uniform_2_i32_slice(location, &values),
                    glow::INT_VEC3 => gl.uniform_3_i32_slice(location, &values),
                    _ => gl.uniform_4_i32_slice(location, &values),
                }
            }
            VariableType::UInt32 => {
                if !matches!(view.dtype, VariableType::Int32 | VariableType::UInt32) {
                    return Err(self.uniform_mismatch(view, declared));
                }
                let values = gl_types::decode_u32(view.bytes);
                match slot.gl_type {
                    glow::UNSIGNED_INT => gl.uniform_1_u32_slice(location, &values),
                    glow::UNSIGNED_INT_VEC2 => gl.uniform_2_u32_slice(location, &values),
                    glow::UNSIGNED_INT_VEC3 => gl.uniform_3_u32_slice(location, &values),
                    _ => gl.uniform_4_u32_slice(location, &values),
                }
            }
            VariableType::Bool => {
                let Some(values) = gl_types::decode_bool_as_i32(view.dtype, view.bytes) else {
                    return Err(self.uniform_mismatch(view, declared));
                };
                match slot.gl_type {
                    glow::BOOL => gl.uniform_1_i32_slice(location, &values),
                    glow::BOOL_VEC2 => gl.uniform_2_i32_slice(location, &values),
                    glow::BOOL_VEC3 => gl.uniform_3_i32_slice(location, &values),
                    _ => gl.uniform_4_i32_slice(location, &values),
                }
            }
            _ => {
                prism_bail!(SOURCE, TypeMismatch,
                    "'{}': {} uniforms cannot be set through glow ('{}')", self.name, declared, view.binding.name);
            }
        }
        Ok(())
    }

    /// Native program object, for state the registry does not cover
    pub fn handle(&self) -> glow::Program {
        self.program
    }

    /// Vertex array object owned by this program (desktop GL only)
    pub fn vertex_array(&self) -> Option<glow::VertexArray> {
        self.vertex_array
    }

    pub fn variant(&self) -> GlVariant {
        self.variant
    }

    fn uniform_mismatch(&self, view: &BufferView<'_>, declared: VariableType) -> prism_shader::prism::Error {
        prism_err!(SOURCE, TypeMismatch,
            "'{}': uniform '{}' is declared as {}, got {}", self.name, view.binding.name, declared, view.dtype)
    }
}

impl Program for GlProgram {
    fn reflection(&self) -> &ProgramReflection {
        &self.reflection
    }

    fn activate(&mut self, blend_mode: BlendMode) -> Result<()> {
        let framebuffer = self.render_pass.as_any()
            .downcast_ref::<GlRenderPass>()
            .and_then(GlRenderPass::framebuffer);
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
            gl.use_program(Some(self.program));
            if let Some(vertex_array) = self.vertex_array {
                gl.bind_vertex_array(Some(vertex_array));
            }
            match gl_types::blend_factors(blend_mode) {
                Some((source, destination)) => {
                    gl.enable(glow::BLEND);
                    gl.blend_equation(glow::FUNC_ADD);
                    gl.blend_func(source, destination);
                    self.blending = true;
                }
                None => gl.disable(glow::BLEND),
            }
            if self.uses_point_size {
                gl.enable(glow::PROGRAM_POINT_SIZE);
            }
        }
        Ok(())
    }

    fn allocate(&mut self, view: &BufferView<'_>) -> Result<Box<dyn BufferResource>> {
        let storage = match self.buffer_target(view)? {
            Some(target) => unsafe {
                let buffer = self.gl.create_buffer().map_err(|err| {
                    prism_err!(SOURCE, BackendError, "'{}': glGenBuffers failed for '{}': {}",
                        self.name, view.binding.name, err)
                })?;
                self.gl.bind_buffer(target, Some(buffer));
                self.gl.buffer_data_u8_slice(target, view.bytes, glow::DYNAMIC_DRAW);
                GlStorage::Object { buffer, target }
            },
            None => GlStorage::Uniform,
        };
        Ok(Box::new(GlBuffer::new(self.gl.clone(), storage, view.bytes.len())))
    }

    fn update(&mut self, resource: &dyn BufferResource, view: &BufferView<'_>) -> Result<()> {
        let buffer = self.resource(resource)?;
        if let Some((buffer, target)) = buffer.object() {
            unsafe {
                self.gl.bind_buffer(target, Some(buffer));
                self.gl.buffer_sub_data_u8_slice(target, 0, view.bytes);
            }
        }
        Ok(())
    }

    fn bind(&mut self, view: &BufferView<'_>, resource: &dyn BufferResource, dirty: bool) -> Result<()> {
        let object = self.resource(resource)?.object();
        match (view.binding.buffer_type, object) {
            (BufferType::VertexBuffer, Some((buffer, target))) => unsafe {
                // The VAO keeps attribute pointers between passes, ES has to re-point every time
                if dirty || self.vertex_array.is_none() {
                    self.gl.bind_buffer(target, Some(buffer));
                    self.point_attribute(view)?;
                }
            },
            (BufferType::IndexBuffer, Some((buffer, target))) => unsafe {
                self.gl.bind_buffer(target, Some(buffer));
            },
            (BufferType::UniformBuffer, None) => {
                if dirty {
                    unsafe { self.apply_uniform(view)? };
                }
            }
            (buffer_type, _) => {
                prism_bail!(SOURCE, InvalidResource,
                    "'{}': resource of '{}' does not match its {} slot", self.name, view.binding.name, buffer_type);
            }
        }
        Ok(())
    }

    fn bind_texture(&mut self, binding: Binding<'_>, texture: &dyn Texture) -> Result<()> {
        let Some(texture) = texture.as_any().downcast_ref::<GlTexture>() else {
            prism_bail!(SOURCE, InvalidResource,
                "'{}': texture '{}' was not created by the GL backend", self.name, binding.name);
        };
        let Some(slot) = self.uniforms.get(binding.name) else {
            prism_bail!(SOURCE, BackendError, "'{}': no sampler uniform '{}'", self.name, binding.name);
        };
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + slot.unit);
            self.gl.bind_texture(texture.target, Some(texture.texture));
            self.gl.uniform_1_i32(Some(&slot.location), slot.unit as i32);
        }
        Ok(())
    }

    fn draw(
        &mut self,
        primitive: PrimitiveType,
        offset: usize,
        count: usize,
        indices: Option<&dyn BufferResource>,
    ) -> Result<()> {
        let mode = gl_types::primitive_mode(primitive);
        let (Ok(first), Ok(count)) = (i32::try_from(offset), i32::try_from(count)) else {
            prism_bail!(SOURCE, InvalidRange,
                "'{}': draw range {}+{} does not fit GL's 32-bit counts", self.name, offset, count);
        };
        match indices {
            Some(indices) => {
                let Some((buffer, target)) = self.resource(indices)?.object() else {
                    prism_bail!(SOURCE, InvalidResource, "'{}': index buffer has no GL object", self.name);
                };
                let Some(byte_offset) = first.checked_mul(4) else {
                    prism_bail!(SOURCE, InvalidRange, "'{}': index offset {} overflows", self.name, offset);
                };
                unsafe {
                    self.gl.bind_buffer(target, Some(buffer));
                    self.gl.draw_elements(mode, count, glow::UNSIGNED_INT, byte_offset);
                }
            }
            None => unsafe {
                self.gl.draw_arrays(mode, first, count);
            },
        }
        Ok(())
    }

    fn deactivate(&mut self) -> Result<()> {
        let gl = &self.gl;
        unsafe {
            if self.blending {
                gl.disable(glow::BLEND);
                self.blending = false;
            }
            if self.uses_point_size {
                gl.disable(glow::PROGRAM_POINT_SIZE);
            }
            if self.vertex_array.is_some() {
                gl.bind_vertex_array(None);
            } else {
                for location in self.enabled_attributes.drain(..) {
                    gl.disable_vertex_attrib_array(location);
                }
            }
            gl.use_program(None);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for GlProgram {
    fn drop(&mut self) {
        unsafe {
            if let Some(vertex_array) = self.vertex_array.take() {
                self.gl.delete_vertex_array(vertex_array);
            }
            self.gl.delete_program(self.program);
        }
    }
}

/// Compile both stages and link them
///
/// # Safety
///
/// Requires the context to be current on the calling thread.
unsafe fn compile_program(gl: &glow::Context, desc: &ProgramDesc<'_>) -> Result<glow::Program> {
    let program = gl.create_program().map_err(|err| {
        prism_err!(SOURCE, CompilationFailed, "'{}': glCreateProgram failed: {}", desc.name, err)
    })?;

    let vertex = match compile_shader(gl, glow::VERTEX_SHADER, desc.name, "vertex", desc.vertex_source) {
        Ok(shader) => shader,
        Err(err) => {
            gl.delete_program(program);
            return Err(err);
        }
    };
    let fragment = match compile_shader(gl, glow::FRAGMENT_SHADER, desc.name, "fragment", desc.fragment_source) {
        Ok(shader) => shader,
        Err(err) => {
            gl.delete_shader(vertex);
            gl.delete_program(program);
            return Err(err);
        }
    };

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    let linked = gl.get_program_link_status(program);

    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fragment);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);

    if !linked {
        let log = gl.get_program_info_log(program);
        gl.delete_program(program);
        prism_bail!(SOURCE, CompilationFailed, "'{}': link error:\n{}", desc.name, log);
    }
    Ok(program)
}

/// # Safety
///
/// Requires the context to be current on the calling thread.
unsafe fn compile_shader(
    gl: &glow::Context,
    stage: u32,
    name: &str,
    stage_name: &str,
    source: &str,
) -> Result<glow::Shader> {
    let shader = gl.create_shader(stage).map_err(|err| {
        prism_err!(SOURCE, CompilationFailed, "'{}': glCreateShader ({}) failed: {}", name, stage_name, err)
    })?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        prism_bail!(SOURCE, CompilationFailed, "'{}': {} shader error:\n{}", name, stage_name, log);
    }
    Ok(shader)
}
