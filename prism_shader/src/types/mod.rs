/// Element type tags and uniform value conversion

pub mod variable_type;
pub mod uniform_value;

pub use variable_type::{VariableType, Scalar, variable_type_of, type_size, type_name, shape_size};
pub use uniform_value::{UniformValue, UniformData, NdArray, MAX_DIMS};
