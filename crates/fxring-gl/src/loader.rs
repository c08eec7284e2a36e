//! GL function-pointer loading.

use once_cell::sync::OnceCell;
use tracing::debug;

static GL_LOADED: OnceCell<()> = OnceCell::new();

/// Load GL function pointers. Only the first call does any work.
pub fn load() {
    GL_LOADED.get_or_init(|| {
        gl_loader::init_gl();
        gl::load_with(|symbol| gl_loader::get_proc_address(symbol).cast());
        debug!("GL function pointers loaded");
    });
}

/// Whether a GL context is current on this thread.
///
/// # Safety
///
/// [`load`] must have been called.
pub unsafe fn is_context_current() -> bool {
    gl::GetString::is_loaded() && !gl::GetString(gl::VERSION).is_null()
}
