//! The host object model: values, classes, instances, functions, and the
//! real operations on them.

pub mod class;
pub mod error;
pub mod function_object;
pub mod object;
pub mod value;

pub mod operations {
    pub mod object;
    pub mod test_and_comparison;
    pub mod type_conversion;
}
