//! Save and restore the host's GL bindings around a chain render.

use gl::types::{GLenum, GLint, GLuint};

/// GL bindings the chain touches, captured before and restored after.
#[derive(Debug, Clone, Default)]
pub struct SavedGlState {
    program: GLint,
    framebuffer: GLint,
    draw_framebuffer: GLint,
    read_framebuffer: GLint,
    uniform_buffer: GLint,
    texture_2d: GLint,
    active_texture: GLint,
    vao: GLint,
    viewport: [GLint; 4],
    blend: bool,
    depth_test: bool,
    cull_face: bool,
}

impl SavedGlState {
    /// # Safety
    ///
    /// A GL context must be current and function pointers loaded.
    pub unsafe fn save() -> Self {
        let mut s = Self::default();
        gl::GetIntegerv(gl::CURRENT_PROGRAM, &mut s.program);
        gl::GetIntegerv(gl::FRAMEBUFFER_BINDING, &mut s.framebuffer);
        gl::GetIntegerv(gl::DRAW_FRAMEBUFFER_BINDING, &mut s.draw_framebuffer);
        gl::GetIntegerv(gl::READ_FRAMEBUFFER_BINDING, &mut s.read_framebuffer);
        gl::GetIntegerv(gl::UNIFORM_BUFFER_BINDING, &mut s.uniform_buffer);
        gl::GetIntegerv(gl::TEXTURE_BINDING_2D, &mut s.texture_2d);
        gl::GetIntegerv(gl::ACTIVE_TEXTURE, &mut s.active_texture);
        gl::GetIntegerv(gl::VERTEX_ARRAY_BINDING, &mut s.vao);
        gl::GetIntegerv(gl::VIEWPORT, s.viewport.as_mut_ptr());
        s.blend = gl::IsEnabled(gl::BLEND) == gl::TRUE;
        s.depth_test = gl::IsEnabled(gl::DEPTH_TEST) == gl::TRUE;
        s.cull_face = gl::IsEnabled(gl::CULL_FACE) == gl::TRUE;
        s
    }

    /// # Safety
    ///
    /// Same context as the matching [`save`](SavedGlState::save).
    pub unsafe fn restore(&self) {
        gl::UseProgram(self.program as GLuint);
        gl::BindFramebuffer(gl::FRAMEBUFFER, self.framebuffer as GLuint);
        gl::BindFramebuffer(gl::DRAW_FRAMEBUFFER, self.draw_framebuffer as GLuint);
        gl::BindFramebuffer(gl::READ_FRAMEBUFFER, self.read_framebuffer as GLuint);
        gl::BindBuffer(gl::UNIFORM_BUFFER, self.uniform_buffer as GLuint);
        gl::ActiveTexture(self.active_texture as GLenum);
        gl::BindTexture(gl::TEXTURE_2D, self.texture_2d as GLuint);
        gl::BindVertexArray(self.vao as GLuint);
        gl::Viewport(
            self.viewport[0],
            self.viewport[1],
            self.viewport[2],
            self.viewport[3],
        );
        set_capability(gl::BLEND, self.blend);
        set_capability(gl::DEPTH_TEST, self.depth_test);
        set_capability(gl::CULL_FACE, self.cull_face);
    }
}

unsafe fn set_capability(cap: GLenum, enabled: bool) {
    if enabled {
        gl::Enable(cap);
    } else {
        gl::Disable(cap);
    }
}
