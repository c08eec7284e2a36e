//! Byte views of plain-old-data records uploaded to ring buffers.

/// View a `#[repr(C)]` record as raw bytes for upload.
///
/// # Safety
///
/// Only implement on `#[repr(C)]` types made of plain numeric fields (f32,
/// i32, u32 and arrays of them) with no pointers, references or implicit
/// padding, and with a non-zero size.
///
/// ```rust,ignore
/// #[repr(C)]
/// struct BlurSettings {
///     radius: f32,
///     intensity: f32,
///     texel: [f32; 2],
/// }
///
/// unsafe impl AsBytes for BlurSettings {}
/// ```
pub unsafe trait AsBytes: Sized {
    /// The returned slice has length `std::mem::size_of::<Self>()`.
    fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(self as *const Self as *const u8, std::mem::size_of::<Self>())
        }
    }
}

unsafe impl AsBytes for f32 {}
unsafe impl AsBytes for u32 {}
unsafe impl AsBytes for i32 {}
unsafe impl<const N: usize> AsBytes for [f32; N] {}
unsafe impl<const N: usize> AsBytes for [u32; N] {}
