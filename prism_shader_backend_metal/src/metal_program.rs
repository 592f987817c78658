/// MetalProgram - Metal implementation of the Program trait

use std::sync::Arc;
use metal::{
    CompileOptions, MTLArgumentType, MTLBlendOperation, MTLIndexType, MTLPipelineOption,
    MTLPixelFormat, MTLResourceOptions, RenderPipelineDescriptor,
};
use rustc_hash::FxHashMap;
use prism_shader::prism::{
    BlendMode, BufferResource, BufferType, Config, PrimitiveType, Program, RenderPass, Result,
    Texture, VariableType,
};
use prism_shader::prism::backend::{
    Binding, BufferView, DeclaredParameter, ProgramDesc, ProgramReflection, ShaderStages,
};
use prism_shader::{prism_bail, prism_debug, prism_err};

use crate::metal_buffer::MetalBuffer;
use crate::metal_render_pass::MetalRenderPass;
use crate::metal_texture::MetalTexture;
use crate::metal_types::{self, FRAGMENT_ENTRY, VERTEX_ENTRY};

const SOURCE: &str = "prism::metal";

/// Argument table index of a parameter in each stage that uses it
#[derive(Debug, Clone, Copy, Default)]
struct StageSlots {
    vertex: Option<u64>,
    fragment: Option<u64>,
}

/// Render pipeline state with its reflected argument tables
pub struct MetalProgram {
    device: metal::Device,
    name: String,
    pipeline: metal::RenderPipelineState,
    blend_mode: BlendMode,
    render_pass: Arc<dyn RenderPass>,
    reflection: ProgramReflection,
    slots: FxHashMap<String, StageSlots>,
    /// Encoder of the current pass
    encoder: Option<metal::RenderCommandEncoder>,
}

impl MetalProgram {
    pub(crate) fn new(
        device: &metal::Device,
        pixel_format: MTLPixelFormat,
        render_pass: Arc<dyn RenderPass>,
        desc: &ProgramDesc<'_>,
        config: &Config,
    ) -> Result<Self> {
        let Some(pass) = render_pass.as_any().downcast_ref::<MetalRenderPass>() else {
            prism_bail!(SOURCE, InvalidResource, "'{}': render pass was not created by the Metal backend", desc.name);
        };

        let vertex_function = compile_function(device, desc.name, "vertex", desc.vertex_source, VERTEX_ENTRY)?;
        let fragment_function = compile_function(device, desc.name, "fragment", desc.fragment_source, FRAGMENT_ENTRY)?;

        let descriptor = RenderPipelineDescriptor::new();
        descriptor.set_label(desc.name);
        descriptor.set_vertex_function(Some(&vertex_function));
        descriptor.set_fragment_function(Some(&fragment_function));

        let Some(attachment) = descriptor.color_attachments().object_at(0) else {
            prism_bail!(SOURCE, BackendError, "'{}': pipeline descriptor has no colour attachment", desc.name);
        };
        attachment.set_pixel_format(pass.color_format().unwrap_or(pixel_format));
        if let Some((source, destination)) = metal_types::blend_factors(desc.blend_mode) {
            attachment.set_blending_enabled(true);
            attachment.set_rgb_blend_operation(MTLBlendOperation::Add);
            attachment.set_alpha_blend_operation(MTLBlendOperation::Add);
            attachment.set_source_rgb_blend_factor(source);
            attachment.set_source_alpha_blend_factor(source);
            attachment.set_destination_rgb_blend_factor(destination);
            attachment.set_destination_alpha_blend_factor(destination);
        }
        if let Some(depth_format) = pass.depth_format() {
            descriptor.set_depth_attachment_pixel_format(depth_format);
        }

        let (pipeline, pipeline_reflection) = device
            .new_render_pipeline_state_with_reflection(&descriptor, MTLPipelineOption::ArgumentInfo)
            .map_err(|err| prism_err!(SOURCE, CompilationFailed, "'{}': pipeline creation failed:\n{}", desc.name, err))?;

        let (reflection, slots) = reflect(&pipeline_reflection, desc)?;
        prism_debug!(SOURCE, "[{}] Built pipeline '{}': {} parameters",
            config.label, desc.name, reflection.len());

        Ok(Self {
            device: device.clone(),
            name: desc.name.to_string(),
            pipeline,
            blend_mode: desc.blend_mode,
            render_pass,
            reflection,
            slots,
            encoder: None,
        })
    }

    fn encoder(&self) -> Result<&metal::RenderCommandEncoderRef> {
        match &self.encoder {
            Some(encoder) => Ok(encoder),
            None => prism_bail!(SOURCE, BackendError, "'{}': no command encoder outside a pass", self.name),
        }
    }

    fn slots(&self, name: &str) -> Result<StageSlots> {
        match self.slots.get(name) {
            Some(&slots) => Ok(slots),
            None => prism_bail!(SOURCE, BackendError, "'{}': no argument table entry for '{}'", self.name, name),
        }
    }

    /// Render pipeline state, with the blend mode baked in
    pub fn pipeline_state(&self) -> &metal::RenderPipelineStateRef {
        &self.pipeline
    }

    fn resource<'r>(&self, resource: &'r dyn BufferResource) -> Result<&'r MetalBuffer> {
        match resource.as_any().downcast_ref::<MetalBuffer>() {
            Some(buffer) => Ok(buffer),
            None => prism_bail!(SOURCE, InvalidResource, "'{}': buffer was not created by the Metal backend", self.name),
        }
    }

    fn check_payload(&self, view: &BufferView<'_>) -> Result<()> {
        if view.dtype == VariableType::Float64 {
            prism_bail!(SOURCE, TypeMismatch,
                "'{}': Metal has no double precision, '{}' holds float64 data", self.name, view.binding.name);
        }
        Ok(())
    }
}

impl Program for MetalProgram {
    fn reflection(&self) -> &ProgramReflection {
        &self.reflection
    }

    fn activate(&mut self, blend_mode: BlendMode) -> Result<()> {
        if blend_mode != self.blend_mode {
            prism_bail!(SOURCE, BackendError,
                "'{}': pipeline was built for blend mode {:?}, not {:?}", self.name, self.blend_mode, blend_mode);
        }
        let Some(pass) = self.render_pass.as_any().downcast_ref::<MetalRenderPass>() else {
            prism_bail!(SOURCE, InvalidResource, "'{}': render pass was not created by the Metal backend", self.name);
        };
        let Some(encoder) = pass.encoder()? else {
            prism_bail!(SOURCE, BackendError,
                "'{}': render pass has no command encoder, call MetalRenderPass::set_encoder first", self.name);
        };
        encoder.set_render_pipeline_state(&self.pipeline);
        self.encoder = Some(encoder);
        Ok(())
    }

    fn allocate(&mut self, view: &BufferView<'_>) -> Result<Box<dyn BufferResource>> {
        self.check_payload(view)?;
        // Zero-length MTLBuffers are invalid
        let length = view.bytes.len().max(1) as u64;
        let buffer = MetalBuffer::new(
            self.device.new_buffer(length, MTLResourceOptions::StorageModeShared),
            view.bytes.len(),
        );
        buffer.write(view.bytes);
        Ok(Box::new(buffer))
    }

    fn update(&mut self, resource: &dyn BufferResource, view: &BufferView<'_>) -> Result<()> {
        self.check_payload(view)?;
        let buffer = self.resource(resource)?;
        if buffer.size != view.bytes.len() {
            prism_bail!(SOURCE, BackendError,
                "'{}': '{}' holds {} bytes, update brings {}", self.name, view.binding.name, buffer.size, view.bytes.len());
        }
        buffer.write(view.bytes);
        Ok(())
    }

    fn bind(&mut self, view: &BufferView<'_>, resource: &dyn BufferResource, _dirty: bool) -> Result<()> {
        let buffer = self.resource(resource)?;
        // Indices are consumed by the draw call, not by an argument table
        if view.binding.buffer_type == BufferType::IndexBuffer {
            return Ok(());
        }
        let slots = self.slots(view.binding.name)?;
        let encoder = self.encoder()?;
        if let Some(index) = slots.vertex {
            encoder.set_vertex_buffer(index, Some(&buffer.buffer), 0);
        }
        if let Some(index) = slots.fragment {
            encoder.set_fragment_buffer(index, Some(&buffer.buffer), 0);
        }
        Ok(())
    }

    fn bind_texture(&mut self, binding: Binding<'_>, texture: &dyn Texture) -> Result<()> {
        let Some(texture) = texture.as_any().downcast_ref::<MetalTexture>() else {
            prism_bail!(SOURCE, InvalidResource,
                "'{}': texture '{}' was not created by the Metal backend", self.name, binding.name);
        };
        let slots = self.slots(binding.name)?;
        let encoder = self.encoder()?;
        if binding.buffer_type.is_sampler() {
            if let Some(index) = slots.vertex {
                encoder.set_vertex_sampler_state(index, Some(&texture.sampler));
            }
            if let Some(index) = slots.fragment {
                encoder.set_fragment_sampler_state(index, Some(&texture.sampler));
            }
        } else {
            if let Some(index) = slots.vertex {
                encoder.set_vertex_texture(index, Some(&texture.texture));
            }
            if let Some(index) = slots.fragment {
                encoder.set_fragment_texture(index, Some(&texture.texture));
            }
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
        let primitive_type = metal_types::primitive_type(primitive);
        let encoder = self.encoder()?;
        match indices {
            Some(indices) => {
                let indices = self.resource(indices)?;
                encoder.draw_indexed_primitives(
                    primitive_type,
                    count as u64,
                    MTLIndexType::UInt32,
                    &indices.buffer,
                    (offset * 4) as u64,
                );
            }
            None => encoder.draw_primitives(primitive_type, offset as u64, count as u64),
        }
        Ok(())
    }

    fn deactivate(&mut self) -> Result<()> {
        self.encoder = None;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn compile_function(
    device: &metal::DeviceRef,
    name: &str,
    stage_name: &str,
    source: &str,
    entry: &str,
) -> Result<metal::Function> {
    let library = device
        .new_library_with_source(source, &CompileOptions::new())
        .map_err(|err| prism_err!(SOURCE, CompilationFailed, "'{}': {} shader error:\n{}", name, stage_name, err))?;
    library
        .get_function(entry, None)
        .map_err(|_| prism_err!(SOURCE, CompilationFailed,
            "'{}': {} shader has no '{}' function", name, stage_name, entry))
}

/// Merge the vertex and fragment argument tables into one parameter list
///
/// A name used by both stages becomes one parameter bound in both tables.
fn reflect(
    pipeline_reflection: &metal::RenderPipelineReflectionRef,
    desc: &ProgramDesc<'_>,
) -> Result<(ProgramReflection, FxHashMap<String, StageSlots>)> {
    let mut reflection = ProgramReflection::new();
    let mut slots: FxHashMap<String, StageSlots> = FxHashMap::default();

    let stages = [
        (ShaderStages::VERTEX, pipeline_reflection.vertex_arguments(), desc.vertex_source),
        (ShaderStages::FRAGMENT, pipeline_reflection.fragment_arguments(), desc.fragment_source),
    ];

    for (stage, arguments, source) in stages {
        for position in 0..arguments.count() {
            let Some(argument) = arguments.object_at(position) else {
                continue;
            };
            if !argument.is_active() {
                continue;
            }
            let name = argument.name();
            let argument_type = argument.type_();
            let is_buffer = matches!(argument_type, MTLArgumentType::Buffer);
            let pointer = is_buffer && metal_types::is_pointer_argument(source, name);
            let Some(buffer_type) = metal_types::slot_type(stage, argument_type, pointer) else {
                continue;
            };
            // Fragment pointers are unbounded arrays
            let expected = if is_buffer && buffer_type != BufferType::FragmentBuffer {
                metal_types::declared_type(argument.buffer_data_type())
            } else {
                None
            };
            let index = argument.index();

            let parameter = match reflection.get(name) {
                Some(existing) => merge(existing, buffer_type, stage, desc.name)?,
                None => DeclaredParameter {
                    name: name.to_string(),
                    buffer_type,
                    index: index as u32,
                    stages: stage,
                    expected,
                },
            };
            reflection.push(parameter);

            let entry = slots.entry(name.to_string()).or_default();
            if stage == ShaderStages::VERTEX {
                entry.vertex = Some(index);
            } else {
                entry.fragment = Some(index);
            }
        }
    }

    Ok((reflection, slots))
}

/// Same name declared in a second stage
fn merge(
    existing: &DeclaredParameter,
    buffer_type: BufferType,
    stage: ShaderStages,
    program: &str,
) -> Result<DeclaredParameter> {
    let same_kind = (existing.buffer_type.is_data() && buffer_type.is_data())
        || (existing.buffer_type.is_texture() && buffer_type.is_texture())
        || (existing.buffer_type.is_sampler() && buffer_type.is_sampler());
    if !same_kind {
        prism_bail!(SOURCE, CompilationFailed,
            "'{}': '{}' is a {} in one stage and a {} in the other",
            program, existing.name, existing.buffer_type, buffer_type);
    }
    let mut merged = existing.clone();
    merged.stages |= stage;
    if buffer_type.is_data() && buffer_type != existing.buffer_type {
        merged.buffer_type = BufferType::UniformBuffer;
    }
    Ok(merged)
}
