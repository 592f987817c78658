/// Parameter binding records
///
/// One `Buffer` per parameter declared by a program (plus the reserved
/// `indices` entry). The record keeps the CPU shadow of the last value set,
/// the backend allocation created from it, and whether the two disagree.

use std::fmt;
use std::sync::Arc;
use crate::backend::{BufferResource, DeclaredParameter, ShaderStages, Texture};
use crate::types::{type_size, VariableType};

/// Name of the reserved index buffer record
pub const INDICES: &str = "indices";

/// Kind of binding slot a parameter occupies
///
/// Fixed by the program's reflected interface, never by how the parameter is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferType {
    #[default]
    Unknown,
    VertexBuffer,
    VertexTexture,
    VertexSampler,
    FragmentBuffer,
    FragmentTexture,
    FragmentSampler,
    UniformBuffer,
    IndexBuffer,
}

impl BufferType {
    pub const fn name(self) -> &'static str {
        match self {
            BufferType::Unknown => "unknown",
            BufferType::VertexBuffer => "vertex buffer",
            BufferType::VertexTexture => "vertex texture",
            BufferType::VertexSampler => "vertex sampler",
            BufferType::FragmentBuffer => "fragment buffer",
            BufferType::FragmentTexture => "fragment texture",
            BufferType::FragmentSampler => "fragment sampler",
            BufferType::UniformBuffer => "uniform buffer",
            BufferType::IndexBuffer => "index buffer",
        }
    }

    /// Slot takes a texture handle
    pub const fn is_texture(self) -> bool {
        matches!(self, BufferType::VertexTexture | BufferType::FragmentTexture)
    }

    /// Slot takes the sampler state of a texture
    pub const fn is_sampler(self) -> bool {
        matches!(self, BufferType::VertexSampler | BufferType::FragmentSampler)
    }

    /// Slot takes raw buffer data
    pub const fn is_data(self) -> bool {
        matches!(
            self,
            BufferType::VertexBuffer
                | BufferType::FragmentBuffer
                | BufferType::UniformBuffer
                | BufferType::IndexBuffer
        )
    }

    /// Stage the slot belongs to
    pub fn stages(self) -> ShaderStages {
        match self {
            BufferType::VertexBuffer
            | BufferType::VertexTexture
            | BufferType::VertexSampler
            | BufferType::IndexBuffer => ShaderStages::VERTEX,
            BufferType::FragmentBuffer
            | BufferType::FragmentTexture
            | BufferType::FragmentSampler => ShaderStages::FRAGMENT,
            BufferType::UniformBuffer => ShaderStages::ALL,
            BufferType::Unknown => ShaderStages::empty(),
        }
    }
}

impl fmt::Display for BufferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current value of a record
pub(crate) enum Payload {
    /// Never set
    Empty,
    /// CPU shadow plus the backend allocation made from it (created lazily by `begin()`)
    Data {
        bytes: Vec<u8>,
        resource: Option<Box<dyn BufferResource>>,
    },
    /// Shared texture handle
    Texture(Arc<dyn Texture>),
}

/// Binding record of one named parameter
pub struct Buffer {
    pub(crate) buffer_type: BufferType,
    pub(crate) dtype: VariableType,
    pub(crate) ndim: Option<usize>,
    pub(crate) shape: [usize; 3],
    pub(crate) index: u32,
    pub(crate) size: usize,
    pub(crate) dirty: bool,
    pub(crate) expected: Option<(VariableType, usize)>,
    pub(crate) payload: Payload,
}

impl Buffer {
    /// Unset record for a reflected parameter
    pub(crate) fn declared(parameter: &DeclaredParameter) -> Self {
        Self {
            buffer_type: parameter.buffer_type,
            dtype: VariableType::Invalid,
            ndim: None,
            shape: [1, 1, 1],
            index: parameter.index,
            size: 0,
            dirty: false,
            expected: parameter.expected,
            payload: Payload::Empty,
        }
    }

    /// Unset reserved index buffer record
    pub(crate) fn index_buffer() -> Self {
        Self {
            buffer_type: BufferType::IndexBuffer,
            dtype: VariableType::Invalid,
            ndim: None,
            shape: [1, 1, 1],
            index: 0,
            size: 0,
            dirty: false,
            expected: Some((VariableType::UInt32, 1)),
            payload: Payload::Empty,
        }
    }

    /// Replace the payload with new data
    ///
    /// The backend allocation survives only when the byte size is unchanged.
    pub(crate) fn assign_data(&mut self, dtype: VariableType, ndim: usize, shape: [usize; 3], data: &[u8]) {
        let resource = match std::mem::replace(&mut self.payload, Payload::Empty) {
            Payload::Data { resource: Some(resource), .. } if resource.size() == data.len() => Some(resource),
            _ => None,
        };
        self.payload = Payload::Data { bytes: data.to_vec(), resource };
        self.dtype = dtype;
        self.ndim = Some(ndim);
        self.shape = shape;
        self.size = data.len();
        self.dirty = true;
    }

    /// Replace the payload with a texture handle
    pub(crate) fn assign_texture(&mut self, texture: Arc<dyn Texture>) {
        self.payload = Payload::Texture(texture);
        self.dtype = VariableType::Invalid;
        self.ndim = Some(0);
        self.shape = [1, 1, 1];
        self.size = 0;
        self.dirty = true;
    }

    pub fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    pub fn dtype(&self) -> VariableType {
        self.dtype
    }

    /// Number of dimensions, `None` until the record is first set
    pub fn ndim(&self) -> Option<usize> {
        self.ndim
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Backend binding slot
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Size in bytes of the current payload
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.payload, Payload::Empty)
    }

    /// Element type and count the program declares, when known
    pub fn expected(&self) -> Option<(VariableType, usize)> {
        self.expected
    }

    /// Number of scalar elements in the payload
    pub fn element_count(&self) -> usize {
        match self.ndim {
            Some(ndim) => self.shape[..ndim].iter().product(),
            None => 0,
        }
    }

    /// CPU shadow of the last data set
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Data { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    pub fn texture(&self) -> Option<&Arc<dyn Texture>> {
        match &self.payload {
            Payload::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    /// A backend allocation currently backs this record
    pub fn has_resource(&self) -> bool {
        matches!(self.payload, Payload::Data { resource: Some(_), .. })
    }

    /// Payload size agrees with `dtype` and `shape`
    pub fn is_consistent(&self) -> bool {
        match (&self.payload, self.ndim) {
            (Payload::Data { bytes, .. }, Some(_)) => {
                bytes.len() == self.size && self.size == type_size(self.dtype) * self.element_count()
            }
            (Payload::Texture(_), Some(_)) => self.size == 0,
            (Payload::Empty, None) => self.size == 0,
            _ => false,
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer[type={}, dtype={}, ndim=", self.buffer_type, self.dtype)?;
        match self.ndim {
            Some(ndim) => write!(f, "{}", ndim)?,
            None => f.write_str("unset")?,
        }
        write!(
            f,
            ", shape=[{}, {}, {}], size={}, dirty={}]",
            self.shape[0], self.shape[1], self.shape[2], self.size, self.dirty
        )
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
