//! OpenGL backend for the fxring render-device seam.
//!
//! [`GlDevice`] implements [`fxring_device::RenderDevice`] with raw `gl`
//! calls against the context that is current on the calling thread. It does
//! not create windows or contexts; the host application does.
//!
//! ```rust,ignore
//! // With the host's GL context current:
//! let device: SharedDevice = Rc::new(unsafe { GlDevice::new()? });
//! let ctx = RenderContext::new(device, Viewport::new(w, h));
//!
//! let saved = unsafe { SavedGlState::save() };
//! chain.render(&ctx, &mut framebuffer, &bindings)?;
//! unsafe { saved.restore() };
//! ```
//!
//! ### Warning
//!
//! Every method assumes the creating thread's context is still current.

mod device;
pub mod glsl;
pub mod loader;
pub mod state;
pub mod transpile;
pub mod validate;

pub use device::GlDevice;
pub use glsl::GlslVersion;
pub use state::SavedGlState;
pub use transpile::{wgsl_to_glsl, TranspiledStage};
