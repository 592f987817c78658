/// Uniform value classification
///
/// Turns a caller-supplied value into `(dtype, ndim, shape, bytes)` so that
/// `Shader::set_uniform` can forward it to the type-erased parameter registry.
///
/// Supported shapes:
/// - scalars (`f32`, `u8`, `bool`, ...) => ndim 0
/// - `[T; N]`, `[T]`, `Vec<T>` and glam vectors => ndim 1
/// - `[[T; R]; C]`, `[[T; R]]`, `Vec<[T; R]>`, `Vec<Vec<T>>` and glam
///   matrices => ndim 2 (outer = column)
/// - `[[[T; A]; B]; C]`, `Vec<Vec<Vec<T>>>` => ndim 3
/// - `NdArray`, a runtime-shaped view, => ndim = shape.len()

use std::borrow::Cow;
use crate::error::Result;
use crate::prism_bail;
use crate::types::{shape_size, Scalar, VariableType};

/// Maximum number of dimensions a parameter may have
pub const MAX_DIMS: usize = 3;

/// Classified view of a uniform value, ready for the registry
#[derive(Debug, Clone, PartialEq)]
pub struct UniformData<'a> {
    /// Element type
    pub dtype: VariableType,
    /// Number of dimensions (0 = scalar)
    pub ndim: usize,
    /// Extents, outer to inner. Entries past `ndim` are 1.
    pub shape: [usize; 3],
    /// Packed element bytes (column-major for matrices)
    pub bytes: Cow<'a, [u8]>,
}

/// A value that can be passed to `Shader::set_uniform`
pub trait UniformValue {
    /// Classify the value's element type and shape
    ///
    /// Fails with `Error::InvalidShape` for ragged, empty or too deep nesting.
    fn uniform_data(&self) -> Result<UniformData<'_>>;
}

fn flatten<'a, T: Scalar>(elements: impl Iterator<Item = &'a T>, capacity: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(capacity * std::mem::size_of::<T>());
    for element in elements {
        bytes.extend_from_slice(bytemuck::bytes_of(element));
    }
    bytes
}

fn uniform_extent<T>(rows: &[Vec<T>], what: &str) -> Result<usize> {
    let Some(first) = rows.first() else {
        prism_bail!("prism::Uniform", InvalidShape, "{}: outer dimension is empty", what);
    };
    let extent = first.len();
    if extent == 0 {
        prism_bail!("prism::Uniform", InvalidShape, "{}: inner dimension is empty", what);
    }
    if let Some(position) = rows.iter().position(|row| row.len() != extent) {
        prism_bail!("prism::Uniform", InvalidShape,
            "{}: ragged nesting (entry {} has {} elements, expected {})",
            what, position, rows[position].len(), extent);
    }
    Ok(extent)
}

// ===== SCALARS =====

macro_rules! impl_uniform_scalar {
    ($($ty:ty),*) => {
        $(
            impl UniformValue for $ty {
                fn uniform_data(&self) -> Result<UniformData<'_>> {
                    Ok(UniformData {
                        dtype: <$ty as Scalar>::VARIABLE_TYPE,
                        ndim: 0,
                        shape: [1, 1, 1],
                        bytes: Cow::Borrowed(bytemuck::bytes_of(self)),
                    })
                }
            }
        )*
    };
}

impl_uniform_scalar!(bool, i8, u8, i16, u16, i32, u32, i64, u64, isize, usize, f32, f64);

// ===== ONE DIMENSION =====

impl<T: Scalar> UniformValue for [T] {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        if self.is_empty() {
            prism_bail!("prism::Uniform", InvalidShape, "slice is empty");
        }
        Ok(UniformData {
            dtype: T::VARIABLE_TYPE,
            ndim: 1,
            shape: [self.len(), 1, 1],
            bytes: Cow::Owned(flatten(self.iter(), self.len())),
        })
    }
}

impl<T: Scalar, const N: usize> UniformValue for [T; N] {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        self.as_slice().uniform_data()
    }
}

impl<T: Scalar> UniformValue for Vec<T> {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        self.as_slice().uniform_data()
    }
}

// ===== TWO DIMENSIONS =====

impl<T: Scalar, const R: usize, const C: usize> UniformValue for [[T; R]; C] {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        if R == 0 || C == 0 {
            prism_bail!("prism::Uniform", InvalidShape, "nested array has an empty dimension ({}x{})", C, R);
        }
        Ok(UniformData {
            dtype: T::VARIABLE_TYPE,
            ndim: 2,
            shape: [C, R, 1],
            bytes: Cow::Owned(flatten(self.iter().flatten(), R * C)),
        })
    }
}

impl<T: Scalar> UniformValue for Vec<Vec<T>> {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        let inner = uniform_extent(self, "Vec<Vec<_>>")?;
        Ok(UniformData {
            dtype: T::VARIABLE_TYPE,
            ndim: 2,
            shape: [self.len(), inner, 1],
            bytes: Cow::Owned(flatten(self.iter().flatten(), self.len() * inner)),
        })
    }
}

/// Rows of fixed width, the usual layout of per-vertex attribute data
impl<T: Scalar, const N: usize> UniformValue for [[T; N]] {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        if self.is_empty() || N == 0 {
            prism_bail!("prism::Uniform", InvalidShape, "slice of arrays has an empty dimension ({}x{})", self.len(), N);
        }
        Ok(UniformData {
            dtype: T::VARIABLE_TYPE,
            ndim: 2,
            shape: [self.len(), N, 1],
            bytes: Cow::Owned(flatten(self.iter().flatten(), self.len() * N)),
        })
    }
}

impl<T: Scalar, const N: usize> UniformValue for Vec<[T; N]> {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        self.as_slice().uniform_data()
    }
}

// ===== THREE DIMENSIONS =====

impl<T: Scalar, const A: usize, const B: usize, const C: usize> UniformValue for [[[T; A]; B]; C] {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        if A == 0 || B == 0 || C == 0 {
            prism_bail!("prism::Uniform", InvalidShape,
                "nested array has an empty dimension ({}x{}x{})", C, B, A);
        }
        Ok(UniformData {
            dtype: T::VARIABLE_TYPE,
            ndim: 3,
            shape: [C, B, A],
            bytes: Cow::Owned(flatten(self.iter().flatten().flatten(), A * B * C)),
        })
    }
}

impl<T: Scalar> UniformValue for Vec<Vec<Vec<T>>> {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        let middle = uniform_extent(self, "Vec<Vec<Vec<_>>>")?;
        let mut inner = None;
        for plane in self {
            let extent = uniform_extent(plane, "Vec<Vec<Vec<_>>>")?;
            match inner {
                None => inner = Some(extent),
                Some(expected) if expected != extent => {
                    prism_bail!("prism::Uniform", InvalidShape,
                        "Vec<Vec<Vec<_>>>: ragged nesting (inner extent {} vs {})", extent, expected);
                }
                Some(_) => {}
            }
        }
        let inner = inner.unwrap_or(0);
        Ok(UniformData {
            dtype: T::VARIABLE_TYPE,
            ndim: 3,
            shape: [self.len(), middle, inner],
            bytes: Cow::Owned(flatten(
                self.iter().flatten().flatten(),
                self.len() * middle * inner,
            )),
        })
    }
}

// ===== GLAM =====

macro_rules! impl_uniform_glam_vector {
    ($($ty:ty => $scalar:ty),*) => {
        $(
            impl UniformValue for $ty {
                fn uniform_data(&self) -> Result<UniformData<'_>> {
                    let bytes = bytemuck::bytes_of(self);
                    Ok(UniformData {
                        dtype: <$scalar as Scalar>::VARIABLE_TYPE,
                        ndim: 1,
                        shape: [bytes.len() / std::mem::size_of::<$scalar>(), 1, 1],
                        bytes: Cow::Borrowed(bytes),
                    })
                }
            }
        )*
    };
}

impl_uniform_glam_vector!(
    glam::Vec2 => f32, glam::Vec3 => f32, glam::Vec4 => f32,
    glam::IVec2 => i32, glam::IVec3 => i32, glam::IVec4 => i32,
    glam::UVec2 => u32, glam::UVec3 => u32, glam::UVec4 => u32,
    glam::DVec2 => f64, glam::DVec3 => f64, glam::DVec4 => f64
);

macro_rules! impl_uniform_glam_matrix {
    ($($ty:ty => $scalar:ty, $dim:expr),*) => {
        $(
            impl UniformValue for $ty {
                fn uniform_data(&self) -> Result<UniformData<'_>> {
                    // glam stores columns contiguously
                    Ok(UniformData {
                        dtype: <$scalar as Scalar>::VARIABLE_TYPE,
                        ndim: 2,
                        shape: [$dim, $dim, 1],
                        bytes: Cow::Borrowed(bytemuck::bytes_of(self)),
                    })
                }
            }
        )*
    };
}

impl_uniform_glam_matrix!(
    glam::Mat2 => f32, 2, glam::Mat3 => f32, 3, glam::Mat4 => f32, 4,
    glam::DMat2 => f64, 2, glam::DMat3 => f64, 3, glam::DMat4 => f64, 4
);

// ===== RUNTIME SHAPED =====

/// Type-erased, runtime-shaped array view
///
/// Useful when the shape is only known at runtime (e.g. data loaded from a
/// file). Unlike the static impls, any depth can be described here, so depth
/// is validated when the value is classified.
#[derive(Debug, Clone, Copy)]
pub struct NdArray<'a> {
    pub dtype: VariableType,
    pub shape: &'a [usize],
    pub data: &'a [u8],
}

impl<'a> NdArray<'a> {
    pub fn new(dtype: VariableType, shape: &'a [usize], data: &'a [u8]) -> Self {
        Self { dtype, shape, data }
    }
}

impl UniformValue for NdArray<'_> {
    fn uniform_data(&self) -> Result<UniformData<'_>> {
        if self.shape.len() > MAX_DIMS {
            prism_bail!("prism::Uniform", InvalidShape,
                "invalid input array dimension {} (at most {} supported)", self.shape.len(), MAX_DIMS);
        }
        if self.dtype == VariableType::Invalid {
            prism_bail!("prism::Uniform", InvalidShape, "array element type is invalid");
        }
        let mut shape = [1usize; 3];
        shape[..self.shape.len()].copy_from_slice(self.shape);
        let Some(expected) = shape_size(self.dtype, self.shape) else {
            prism_bail!("prism::Uniform", InvalidShape,
                "shape {:?} of {} overflows the addressable size", self.shape, self.dtype);
        };
        if expected != self.data.len() {
            prism_bail!("prism::Uniform", InvalidShape,
                "shape {:?} of {} needs {} bytes, got {}", self.shape, self.dtype, expected, self.data.len());
        }
        Ok(UniformData {
            dtype: self.dtype,
            ndim: self.shape.len(),
            shape,
            bytes: Cow::Borrowed(self.data),
        })
    }
}

#[cfg(test)]
#[path = "uniform_value_tests.rs"]
mod tests;
