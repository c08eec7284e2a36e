//! A recording, GPU-less device.

mod command;
mod device;

pub use command::{Command, UniformValue};
pub use device::{HeadlessDevice, COMPILE_ERROR_MARKER};
