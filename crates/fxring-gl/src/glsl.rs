//! GLSL version detection.

use std::ffi::CStr;

/// GLSL targets WGSL sources are transpiled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlslVersion {
    Glsl330,
    Glsl430,
}

impl GlslVersion {
    /// Version number as written in a `#version` directive.
    pub fn number(self) -> u16 {
        match self {
            GlslVersion::Glsl330 => 330,
            GlslVersion::Glsl430 => 430,
        }
    }

    pub(crate) fn to_naga(self) -> naga::back::glsl::Version {
        naga::back::glsl::Version::Desktop(self.number())
    }
}

/// Parse the leading `major.minor` of a `GL_SHADING_LANGUAGE_VERSION` string,
/// e.g. `"4.60 NVIDIA"` or `"3.30 - Build 31.0.101"`.
pub fn parse_shading_language_version(version: &str) -> Option<(u32, u32)> {
    let number = version.split_whitespace().next()?;
    let (major, minor) = number.split_once('.')?;
    let minor: String = minor.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Best transpilation target for a driver reporting `(major, minor)`, or
/// `None` below GLSL 3.30.
pub fn best_transpilation_target((major, minor): (u32, u32)) -> Option<GlslVersion> {
    let number = major * 100 + if minor < 10 { minor * 10 } else { minor };
    if number >= 430 {
        Some(GlslVersion::Glsl430)
    } else if number >= 330 {
        Some(GlslVersion::Glsl330)
    } else {
        None
    }
}

/// Query the current context.
///
/// # Safety
///
/// A GL context must be current and function pointers loaded.
pub unsafe fn query_transpilation_target() -> Option<GlslVersion> {
    let raw = gl::GetString(gl::SHADING_LANGUAGE_VERSION);
    if raw.is_null() {
        return None;
    }
    let version = CStr::from_ptr(raw.cast()).to_string_lossy();
    tracing::debug!("GLSL VERSION {version}");
    parse_shading_language_version(&version).and_then(best_transpilation_target)
}
