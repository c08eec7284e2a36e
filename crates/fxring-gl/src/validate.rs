//! GL error draining.

use fxring_core::{RenderError, RenderResult};
use tracing::warn;

/// Drop any errors left by earlier calls.
///
/// # Safety
///
/// A GL context must be current.
pub unsafe fn clear_errors() {
    while gl::GetError() != gl::NO_ERROR {}
}

/// Return the first pending GL error, tagged with `what`.
///
/// # Safety
///
/// A GL context must be current.
pub unsafe fn check_error(what: &str) -> RenderResult<()> {
    let code = gl::GetError();
    if code == gl::NO_ERROR {
        return Ok(());
    }
    clear_errors();
    warn!(what, code = format_args!("{code:#06x}"), "GL error");
    Err(RenderError::Allocation {
        what: format!("{what} (GL error {code:#06x})"),
    })
}
