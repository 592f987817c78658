/// Scalar element type tags
///
/// Maps native Rust scalar types to a closed runtime enumeration. The mapping is
/// decided at compile time through the `Scalar` trait; `VariableType::of` is the
/// runtime counterpart that reports `Invalid` for anything unrecognised.

use std::any::{Any, TypeId};
use std::fmt;

/// Element type of a shader parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariableType {
    #[default]
    Invalid,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float16,
    Float32,
    Float64,
    Bool,
}

impl VariableType {
    /// Every valid tag, in declaration order
    pub const ALL: [VariableType; 12] = [
        VariableType::Int8,
        VariableType::UInt8,
        VariableType::Int16,
        VariableType::UInt16,
        VariableType::Int32,
        VariableType::UInt32,
        VariableType::Int64,
        VariableType::UInt64,
        VariableType::Float16,
        VariableType::Float32,
        VariableType::Float64,
        VariableType::Bool,
    ];

    /// Tag for an integer of the given signedness and byte width
    pub const fn integer(signed: bool, size: usize) -> Self {
        match (signed, size) {
            (true, 1) => VariableType::Int8,
            (false, 1) => VariableType::UInt8,
            (true, 2) => VariableType::Int16,
            (false, 2) => VariableType::UInt16,
            (true, 4) => VariableType::Int32,
            (false, 4) => VariableType::UInt32,
            (true, 8) => VariableType::Int64,
            (false, 8) => VariableType::UInt64,
            _ => VariableType::Invalid,
        }
    }

    /// Tag for a floating point number of the given byte width
    pub const fn float(size: usize) -> Self {
        match size {
            2 => VariableType::Float16,
            4 => VariableType::Float32,
            8 => VariableType::Float64,
            _ => VariableType::Invalid,
        }
    }

    /// Runtime classification of an arbitrary type
    ///
    /// Returns `Invalid` for every type that is not a supported scalar.
    pub fn of<T: Any>() -> Self {
        let id = TypeId::of::<T>();
        macro_rules! match_scalar {
            ($($ty:ty),*) => {
                $(
                    if id == TypeId::of::<$ty>() {
                        return <$ty as Scalar>::VARIABLE_TYPE;
                    }
                )*
            };
        }
        match_scalar!(bool, i8, u8, i16, u16, i32, u32, i64, u64, isize, usize, f32, f64);
        VariableType::Invalid
    }

    /// Size in bytes of one element
    pub const fn size_bytes(self) -> usize {
        match self {
            VariableType::Invalid => 0,
            VariableType::Int8 | VariableType::UInt8 | VariableType::Bool => 1,
            VariableType::Int16 | VariableType::UInt16 | VariableType::Float16 => 2,
            VariableType::Int32 | VariableType::UInt32 | VariableType::Float32 => 4,
            VariableType::Int64 | VariableType::UInt64 | VariableType::Float64 => 8,
        }
    }

    /// Human readable name (e.g. "uint8", "float32")
    pub const fn name(self) -> &'static str {
        match self {
            VariableType::Invalid => "invalid",
            VariableType::Int8 => "int8",
            VariableType::UInt8 => "uint8",
            VariableType::Int16 => "int16",
            VariableType::UInt16 => "uint16",
            VariableType::Int32 => "int32",
            VariableType::UInt32 => "uint32",
            VariableType::Int64 => "int64",
            VariableType::UInt64 => "uint64",
            VariableType::Float16 => "float16",
            VariableType::Float32 => "float32",
            VariableType::Float64 => "float64",
            VariableType::Bool => "bool",
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, VariableType::Float16 | VariableType::Float32 | VariableType::Float64)
    }

    pub const fn is_signed_integer(self) -> bool {
        matches!(
            self,
            VariableType::Int8 | VariableType::Int16 | VariableType::Int32 | VariableType::Int64
        )
    }

    pub const fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            VariableType::UInt8 | VariableType::UInt16 | VariableType::UInt32 | VariableType::UInt64
        )
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Return the size in bytes associated with a specific variable type
pub const fn type_size(ty: VariableType) -> usize {
    ty.size_bytes()
}

/// Byte size of an array of `ty` with the given extents, `None` on overflow
pub fn shape_size(ty: VariableType, shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(ty.size_bytes(), |size, &extent| size.checked_mul(extent))
}

/// Return the name (e.g. "uint8") associated with a specific variable type
pub const fn type_name(ty: VariableType) -> &'static str {
    ty.name()
}

/// Native scalar usable as a shader parameter element
///
/// `VARIABLE_TYPE` is resolved at compile time from the type's signedness and
/// width. Adding a native type means adding it to the macro list below.
pub trait Scalar: bytemuck::NoUninit + 'static {
    const VARIABLE_TYPE: VariableType;
}

/// Compile-time classification of a scalar type
pub const fn variable_type_of<T: Scalar>() -> VariableType {
    T::VARIABLE_TYPE
}

macro_rules! impl_scalar_int {
    ($signed:expr => $($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const VARIABLE_TYPE: VariableType =
                    VariableType::integer($signed, std::mem::size_of::<$ty>());
            }
        )*
    };
}

impl_scalar_int!(true => i8, i16, i32, i64, isize);
impl_scalar_int!(false => u8, u16, u32, u64, usize);

impl Scalar for f32 {
    const VARIABLE_TYPE: VariableType = VariableType::float(std::mem::size_of::<f32>());
}

impl Scalar for f64 {
    const VARIABLE_TYPE: VariableType = VariableType::float(std::mem::size_of::<f64>());
}

impl Scalar for bool {
    const VARIABLE_TYPE: VariableType = VariableType::Bool;
}

#[cfg(test)]
#[path = "variable_type_tests.rs"]
mod tests;
