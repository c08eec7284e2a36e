//! Shaders compiled into the binary.

use fxring_core::MemoryFileSystem;

pub const SHADERS: &[(&str, &str)] = &[
    ("invert.wgsl", include_str!("../shaders/invert.wgsl")),
    ("pixelate.frag", include_str!("../shaders/pixelate.frag")),
    ("blur.frag", include_str!("../shaders/blur.frag")),
    ("depth_overlay.frag", include_str!("../shaders/depth_overlay.frag")),
];

pub fn builtin() -> MemoryFileSystem {
    let mut fs = MemoryFileSystem::new();
    for (path, source) in SHADERS {
        fs.insert(*path, *source);
    }
    fs
}
