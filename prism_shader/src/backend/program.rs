/// Program trait and the data exchanged between a `Shader` and its backend

use std::any::Any;
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::types::VariableType;
use crate::shader::{BlendMode, BufferType, PrimitiveType};
use crate::backend::Texture;

bitflags! {
    /// Pipeline stages that declare a parameter
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u8 {
        const VERTEX = 0b01;
        const FRAGMENT = 0b10;
        const ALL = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Everything a backend needs to build a program
#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc<'a> {
    /// Display name, used in logs and error messages
    pub name: &'a str,
    /// Vertex stage source (GLSL or MSL depending on the backend)
    pub vertex_source: &'a str,
    /// Fragment stage source
    pub fragment_source: &'a str,
    /// Blending applied to the color attachment
    pub blend_mode: BlendMode,
}

/// One parameter declared by the compiled program
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredParameter {
    pub name: String,
    pub buffer_type: BufferType,
    /// Backend binding slot (attribute location, uniform location, texture
    /// unit or argument table index)
    pub index: u32,
    pub stages: ShaderStages,
    /// Element type and element count declared in the source, when the
    /// backend can reflect them (e.g. `vec3` => `(Float32, 3)`)
    pub expected: Option<(VariableType, usize)>,
}

/// Reflected interface of a compiled program
#[derive(Debug, Clone, Default)]
pub struct ProgramReflection {
    parameters: Vec<DeclaredParameter>,
    by_name: FxHashMap<String, usize>,
}

impl ProgramReflection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter, replacing an earlier declaration with the same name
    pub fn push(&mut self, parameter: DeclaredParameter) {
        match self.by_name.get(&parameter.name) {
            Some(&position) => self.parameters[position] = parameter,
            None => {
                self.by_name.insert(parameter.name.clone(), self.parameters.len());
                self.parameters.push(parameter);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DeclaredParameter> {
        self.by_name.get(name).map(|&position| &self.parameters[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[DeclaredParameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Where a parameter is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub buffer_type: BufferType,
    pub index: u32,
}

/// Borrowed view of a registry record's buffer payload
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    pub binding: Binding<'a>,
    pub dtype: VariableType,
    pub ndim: usize,
    pub shape: [usize; 3],
    pub bytes: &'a [u8],
}

impl BufferView<'_> {
    /// Number of scalar elements in the payload
    pub fn element_count(&self) -> usize {
        self.shape[..self.ndim].iter().product()
    }
}

/// GPU-side storage created by a backend for one registry record
///
/// Released when dropped.
pub trait BufferResource: Any {
    /// Size in bytes of the GPU allocation
    fn size(&self) -> usize;

    /// Downcast access for the backend that created the resource
    fn as_any(&self) -> &dyn Any;
}

/// Compiled program of one backend
///
/// `Shader` drives a program through the following sequence each pass:
/// `activate` → (`allocate` | `update`) for dirty records → `bind` /
/// `bind_texture` for every record → `draw`* → `deactivate`.
pub trait Program: Any {
    /// Declared interface, computed once at creation
    fn reflection(&self) -> &ProgramReflection;

    /// Make the program current and apply the blend mode
    fn activate(&mut self, blend_mode: BlendMode) -> Result<()>;

    /// Create GPU storage sized for `view` and fill it
    fn allocate(&mut self, view: &BufferView<'_>) -> Result<Box<dyn BufferResource>>;

    /// Rewrite the contents of an existing allocation of the same size
    fn update(&mut self, resource: &dyn BufferResource, view: &BufferView<'_>) -> Result<()>;

    /// Attach a buffer record to its slot for the current pass
    ///
    /// `dirty` is set when the payload changed since the previous pass.
    fn bind(&mut self, view: &BufferView<'_>, resource: &dyn BufferResource, dirty: bool) -> Result<()>;

    /// Attach a texture to its slot for the current pass
    fn bind_texture(&mut self, binding: Binding<'_>, texture: &dyn Texture) -> Result<()>;

    /// Issue a draw call
    ///
    /// `indices` is the index buffer resource for indexed draws.
    fn draw(
        &mut self,
        primitive: PrimitiveType,
        offset: usize,
        count: usize,
        indices: Option<&dyn BufferResource>,
    ) -> Result<()>;

    /// Release the pipeline state set by `activate`
    fn deactivate(&mut self) -> Result<()>;

    /// Downcast access to the concrete program, for native handles
    fn as_any(&self) -> &dyn Any;
}
