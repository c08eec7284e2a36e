//! Effect parameter descriptors.
//! Use [info::SimpleParamInfo] for most simple instances.
//! Implement [info::ParamInfo] yourself for more complex cases.

pub mod builtin;
mod info;
pub use info::*;
