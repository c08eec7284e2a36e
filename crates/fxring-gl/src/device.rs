//! [`RenderDevice`] on raw OpenGL calls.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ffi::CString;
use std::ptr;

use fxring_core::{FramebufferStatus, RenderError, RenderResult, TextureDesc, TextureFormat};
use fxring_device::{
    BufferId, BufferKind, DeviceLimits, FramebufferId, ProgramId, ProgramSource, RenderDevice,
    ShaderSource, ShaderStage, TextureId,
};
use gl::types::{GLchar, GLenum, GLint, GLintptr, GLsizeiptr, GLuint};
use tracing::{debug, trace, warn};

use crate::glsl::{self, GlslVersion};
use crate::transpile::{wgsl_to_glsl, TranspiledStage};
use crate::{loader, validate};

fn buffer_target(kind: BufferKind) -> GLenum {
    match kind {
        BufferKind::Uniform => gl::UNIFORM_BUFFER,
        BufferKind::Storage => gl::SHADER_STORAGE_BUFFER,
    }
}

/// `(internal format, pixel format, pixel type)` for `TexImage2D`.
fn texture_formats(format: TextureFormat) -> (GLint, GLenum, GLenum) {
    match format {
        TextureFormat::Rgba8 => (gl::RGBA8 as GLint, gl::RGBA, gl::UNSIGNED_BYTE),
        TextureFormat::Rgba16F => (gl::RGBA16F as GLint, gl::RGBA, gl::HALF_FLOAT),
        TextureFormat::Rgba32F => (gl::RGBA32F as GLint, gl::RGBA, gl::FLOAT),
        TextureFormat::Rg16F => (gl::RG16F as GLint, gl::RG, gl::HALF_FLOAT),
        TextureFormat::R16F => (gl::R16F as GLint, gl::RED, gl::HALF_FLOAT),
        TextureFormat::R32F => (gl::R32F as GLint, gl::RED, gl::FLOAT),
        TextureFormat::Depth16 => (
            gl::DEPTH_COMPONENT16 as GLint,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_SHORT,
        ),
        TextureFormat::Depth24 => (
            gl::DEPTH_COMPONENT24 as GLint,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_INT,
        ),
        TextureFormat::Depth32F => (gl::DEPTH_COMPONENT32F as GLint, gl::DEPTH_COMPONENT, gl::FLOAT),
        TextureFormat::Depth24Stencil8 => (
            gl::DEPTH24_STENCIL8 as GLint,
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
        ),
    }
}

unsafe fn get_integer(name: GLenum) -> GLint {
    let mut value = 0;
    gl::GetIntegerv(name, &mut value);
    value
}

unsafe fn info_log(object: GLuint, is_program: bool) -> String {
    let mut len: GLint = 0;
    if is_program {
        gl::GetProgramiv(object, gl::INFO_LOG_LENGTH, &mut len);
    } else {
        gl::GetShaderiv(object, gl::INFO_LOG_LENGTH, &mut len);
    }
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written = 0;
    if is_program {
        gl::GetProgramInfoLog(object, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    } else {
        gl::GetShaderInfoLog(object, len, &mut written, buf.as_mut_ptr() as *mut GLchar);
    }
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).trim_end().to_string()
}

#[derive(Default)]
struct Objects {
    buffers: HashMap<BufferId, u64>,
    textures: HashMap<TextureId, (TextureFormat, u32, u32)>,
    /// Size of colour attachment 0, the viewport draws into a framebuffer use.
    framebuffers: HashMap<FramebufferId, (u32, u32)>,
    bound_framebuffer: Option<FramebufferId>,
    /// Uniform names naga rewrote, per program.
    renames: HashMap<ProgramId, BTreeMap<String, String>>,
}

impl Objects {
    fn texture_format(&self, texture: TextureId) -> Option<TextureFormat> {
        self.textures.get(&texture).map(|(format, _, _)| *format)
    }

    fn attach_color(&mut self, framebuffer: FramebufferId, index: u32, texture: TextureId) {
        if index != 0 {
            return;
        }
        if let Some((_, width, height)) = self.textures.get(&texture) {
            self.framebuffers.insert(framebuffer, (*width, *height));
        }
    }

    /// Viewport for the bound framebuffer, `None` for the host's.
    fn draw_viewport(&self) -> Option<(u32, u32)> {
        self.framebuffers.get(&self.bound_framebuffer?).copied()
    }

    fn glsl_name(&self, program: ProgramId, name: &str) -> String {
        self.renames
            .get(&program)
            .and_then(|renames| renames.get(name))
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }
}

/// OpenGL device driving the context current on the creating thread.
pub struct GlDevice {
    limits: DeviceLimits,
    glsl: GlslVersion,
    vao: GLuint,
    objects: RefCell<Objects>,
}

impl GlDevice {
    /// Load function pointers and query the driver limits.
    ///
    /// # Safety
    ///
    /// A GL 3.3+ core context must be current on this thread, and stay current
    /// for as long as the device or any resource created from it is alive.
    pub unsafe fn new() -> RenderResult<Self> {
        loader::load();
        if !loader::is_context_current() {
            return Err(RenderError::Allocation {
                what: "GL device: no current context".into(),
            });
        }
        validate::clear_errors();

        let uniform_alignment = get_integer(gl::UNIFORM_BUFFER_OFFSET_ALIGNMENT).max(1) as u64;
        // Zero on drivers without shader storage buffers.
        let storage_alignment = match get_integer(gl::SHADER_STORAGE_BUFFER_OFFSET_ALIGNMENT) {
            a if a > 0 => a as u64,
            _ => uniform_alignment,
        };
        let limits = DeviceLimits {
            uniform_offset_alignment: uniform_alignment,
            storage_offset_alignment: storage_alignment,
            max_color_attachments: get_integer(gl::MAX_COLOR_ATTACHMENTS).max(1) as u32,
            max_texture_units: get_integer(gl::MAX_TEXTURE_IMAGE_UNITS).max(1) as u32,
        };
        let glsl = glsl::query_transpilation_target().unwrap_or(GlslVersion::Glsl330);

        let mut vao = 0;
        gl::GenVertexArrays(1, &mut vao);
        validate::check_error("vertex array")?;

        debug!(?limits, ?glsl, "GL device created");
        Ok(Self {
            limits,
            glsl,
            vao,
            objects: RefCell::new(Objects::default()),
        })
    }

    pub fn glsl_version(&self) -> GlslVersion {
        self.glsl
    }

    fn stage_source(
        &self,
        label: &str,
        stage: ShaderStage,
        source: &ShaderSource,
    ) -> RenderResult<TranspiledStage> {
        match source {
            ShaderSource::Glsl(text) => Ok(TranspiledStage {
                source: text.clone(),
                renames: BTreeMap::new(),
            }),
            ShaderSource::Wgsl {
                source,
                entry_point,
            } => wgsl_to_glsl(label, source, entry_point, stage, self.glsl),
        }
    }

    unsafe fn compile(&self, label: &str, kind: GLenum, source: &str) -> RenderResult<GLuint> {
        let text = CString::new(source).map_err(|_| RenderError::ShaderCompile {
            label: label.to_string(),
            log: "source contains a NUL byte".into(),
        })?;
        let shader = gl::CreateShader(kind);
        gl::ShaderSource(shader, 1, &text.as_ptr(), ptr::null());
        gl::CompileShader(shader);

        let mut ok = GLint::from(gl::FALSE);
        gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut ok);
        if ok != GLint::from(gl::TRUE) {
            let log = info_log(shader, false);
            gl::DeleteShader(shader);
            return Err(RenderError::ShaderCompile {
                label: label.to_string(),
                log,
            });
        }
        Ok(shader)
    }

    unsafe fn uniform_location(&self, program: ProgramId, name: &str) -> Option<GLint> {
        let glsl_name = self.objects.borrow().glsl_name(program, name);
        let name_c = CString::new(glsl_name).ok()?;
        let location = gl::GetUniformLocation(program.0, name_c.as_ptr());
        if location < 0 {
            trace!(?program, name, "uniform not active");
            return None;
        }
        Some(location)
    }
}

impl Drop for GlDevice {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteVertexArrays(1, &self.vao);
        }
    }
}

impl RenderDevice for GlDevice {
    fn name(&self) -> &str {
        "opengl"
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_buffer(&self, kind: BufferKind, size: u64) -> RenderResult<BufferId> {
        let target = buffer_target(kind);
        let mut id = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
            gl::BindBuffer(target, id);
            gl::BufferData(target, size as GLsizeiptr, ptr::null(), gl::DYNAMIC_DRAW);
            gl::BindBuffer(target, 0);
            if let Err(err) = validate::check_error("buffer storage") {
                gl::DeleteBuffers(1, &id);
                return Err(err);
            }
        }
        let id = BufferId(id);
        self.objects.borrow_mut().buffers.insert(id, size);
        Ok(id)
    }

    fn write_buffer(
        &self,
        buffer: BufferId,
        kind: BufferKind,
        offset: u64,
        data: &[u8],
    ) -> RenderResult<()> {
        let size = self
            .objects
            .borrow()
            .buffers
            .get(&buffer)
            .copied()
            .unwrap_or(0);
        let len = data.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(RenderError::BufferRange { offset, len, size });
        }

        let target = buffer_target(kind);
        unsafe {
            gl::BindBuffer(target, buffer.0);
            let mapped = gl::MapBufferRange(
                target,
                offset as GLintptr,
                len as GLsizeiptr,
                gl::MAP_WRITE_BIT | gl::MAP_INVALIDATE_RANGE_BIT | gl::MAP_UNSYNCHRONIZED_BIT,
            );
            if mapped.is_null() {
                gl::BindBuffer(target, 0);
                validate::clear_errors();
                return Err(RenderError::Allocation {
                    what: format!("mapping of {buffer:?} at {offset}+{len}"),
                });
            }
            ptr::copy_nonoverlapping(data.as_ptr(), mapped as *mut u8, data.len());
            gl::UnmapBuffer(target);
            gl::BindBuffer(target, 0);
        }
        Ok(())
    }

    fn bind_buffer_range(
        &self,
        kind: BufferKind,
        binding: u32,
        buffer: BufferId,
        offset: u64,
        size: u64,
    ) {
        unsafe {
            gl::BindBufferRange(
                buffer_target(kind),
                binding,
                buffer.0,
                offset as GLintptr,
                size as GLsizeiptr,
            );
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        self.objects.borrow_mut().buffers.remove(&buffer);
        unsafe {
            gl::DeleteBuffers(1, &buffer.0);
        }
    }

    fn create_texture(&self, desc: &TextureDesc) -> RenderResult<TextureId> {
        let (internal, format, ty) = texture_formats(desc.format);
        let mut id = 0;
        unsafe {
            gl::GenTextures(1, &mut id);
            gl::BindTexture(gl::TEXTURE_2D, id);
            gl::TexImage2D(
                gl::TEXTURE_2D,
                0,
                internal,
                desc.width as GLint,
                desc.height as GLint,
                0,
                format,
                ty,
                ptr::null(),
            );
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_S, gl::CLAMP_TO_EDGE as GLint);
            gl::TexParameteri(gl::TEXTURE_2D, gl::TEXTURE_WRAP_T, gl::CLAMP_TO_EDGE as GLint);
            gl::BindTexture(gl::TEXTURE_2D, 0);
            if let Err(err) = validate::check_error(&format!("texture '{}'", desc.label)) {
                gl::DeleteTextures(1, &id);
                return Err(err);
            }
        }
        let id = TextureId(id);
        self.objects
            .borrow_mut()
            .textures
            .insert(id, (desc.format, desc.width, desc.height));
        Ok(id)
    }

    fn bind_texture(&self, unit: u32, texture: TextureId) {
        unsafe {
            gl::ActiveTexture(gl::TEXTURE0 + unit);
            gl::BindTexture(gl::TEXTURE_2D, texture.0);
            gl::ActiveTexture(gl::TEXTURE0);
        }
    }

    fn delete_texture(&self, texture: TextureId) {
        self.objects.borrow_mut().textures.remove(&texture);
        unsafe {
            gl::DeleteTextures(1, &texture.0);
        }
    }

    fn create_framebuffer(&self) -> RenderResult<FramebufferId> {
        let mut id = 0;
        unsafe {
            gl::GenFramebuffers(1, &mut id);
        }
        Ok(FramebufferId(id))
    }

    fn attach_color(
        &self,
        framebuffer: FramebufferId,
        index: u32,
        texture: TextureId,
    ) -> RenderResult<()> {
        let max = self.limits.max_color_attachments;
        if index >= max {
            return Err(RenderError::AttachmentOutOfRange { index, max });
        }
        {
            let mut objects = self.objects.borrow_mut();
            objects.attach_color(framebuffer, index, texture);
            objects.bound_framebuffer = Some(framebuffer);
        }
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.0);
            gl::FramebufferTexture2D(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0 + index,
                gl::TEXTURE_2D,
                texture.0,
                0,
            );
        }
        Ok(())
    }

    fn attach_depth(&self, framebuffer: FramebufferId, texture: TextureId) -> RenderResult<()> {
        let format = self.objects.borrow().texture_format(texture);
        let attachment = match format {
            Some(TextureFormat::Depth24Stencil8) => gl::DEPTH_STENCIL_ATTACHMENT,
            _ => gl::DEPTH_ATTACHMENT,
        };
        self.objects.borrow_mut().bound_framebuffer = Some(framebuffer);
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.0);
            gl::FramebufferTexture2D(gl::FRAMEBUFFER, attachment, gl::TEXTURE_2D, texture.0, 0);
        }
        Ok(())
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        self.objects.borrow_mut().bound_framebuffer = Some(framebuffer);
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.0);
            FramebufferStatus::from_code(gl::CheckFramebufferStatus(gl::FRAMEBUFFER))
        }
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        self.objects.borrow_mut().bound_framebuffer = framebuffer;
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.map_or(0, |fb| fb.0));
        }
    }

    fn set_draw_buffer(&self, framebuffer: FramebufferId, index: u32) {
        self.objects.borrow_mut().bound_framebuffer = Some(framebuffer);
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.0);
            gl::DrawBuffer(gl::COLOR_ATTACHMENT0 + index);
        }
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        {
            let mut objects = self.objects.borrow_mut();
            objects.framebuffers.remove(&framebuffer);
            if objects.bound_framebuffer == Some(framebuffer) {
                objects.bound_framebuffer = None;
            }
        }
        unsafe {
            gl::DeleteFramebuffers(1, &framebuffer.0);
        }
    }

    fn create_program(&self, source: &ProgramSource) -> RenderResult<ProgramId> {
        let label = source.label.as_str();
        let vertex = self.stage_source(label, ShaderStage::Vertex, &source.vertex)?;
        let fragment = self.stage_source(label, ShaderStage::Fragment, &source.fragment)?;

        let mut renames = vertex.renames;
        renames.extend(fragment.renames);

        unsafe {
            let vs = self.compile(label, gl::VERTEX_SHADER, &vertex.source)?;
            let fs = match self.compile(label, gl::FRAGMENT_SHADER, &fragment.source) {
                Ok(fs) => fs,
                Err(err) => {
                    gl::DeleteShader(vs);
                    return Err(err);
                }
            };

            let program = gl::CreateProgram();
            gl::AttachShader(program, vs);
            gl::AttachShader(program, fs);
            gl::LinkProgram(program);
            gl::DetachShader(program, vs);
            gl::DetachShader(program, fs);
            gl::DeleteShader(vs);
            gl::DeleteShader(fs);

            let mut ok = GLint::from(gl::FALSE);
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut ok);
            if ok != GLint::from(gl::TRUE) {
                let log = info_log(program, true);
                gl::DeleteProgram(program);
                return Err(RenderError::ShaderLink {
                    label: label.to_string(),
                    log,
                });
            }
            debug!(label, program, "program linked");
            let program = ProgramId(program);
            if !renames.is_empty() {
                self.objects.borrow_mut().renames.insert(program, renames);
            }
            Ok(program)
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe {
            gl::UseProgram(program.map_or(0, |p| p.0));
        }
    }

    fn set_uniform_f32(&self, program: ProgramId, name: &str, value: f32) {
        unsafe {
            if let Some(location) = self.uniform_location(program, name) {
                gl::UseProgram(program.0);
                gl::Uniform1f(location, value);
            }
        }
    }

    fn set_uniform_i32(&self, program: ProgramId, name: &str, value: i32) {
        unsafe {
            if let Some(location) = self.uniform_location(program, name) {
                gl::UseProgram(program.0);
                gl::Uniform1i(location, value);
            }
        }
    }

    fn bind_uniform_block(&self, program: ProgramId, block: &str, binding: u32) {
        let glsl_name = self.objects.borrow().glsl_name(program, block);
        let Ok(name) = CString::new(glsl_name) else {
            warn!(block, "uniform block name contains a NUL byte");
            return;
        };
        unsafe {
            let index = gl::GetUniformBlockIndex(program.0, name.as_ptr());
            if index == gl::INVALID_INDEX {
                trace!(?program, block, "uniform block not active");
                return;
            }
            gl::UniformBlockBinding(program.0, index, binding);
        }
    }

    fn delete_program(&self, program: ProgramId) {
        self.objects.borrow_mut().renames.remove(&program);
        unsafe {
            gl::DeleteProgram(program.0);
        }
    }

    fn draw_fullscreen(&self, program: ProgramId) {
        let viewport = self.objects.borrow().draw_viewport();
        unsafe {
            if let Some((width, height)) = viewport {
                gl::Viewport(0, 0, width as GLint, height as GLint);
            }
            gl::Disable(gl::CULL_FACE);
            gl::Disable(gl::BLEND);
            gl::Disable(gl::DEPTH_TEST);
            gl::UseProgram(program.0);
            gl::BindVertexArray(self.vao);
            gl::DrawArrays(gl::TRIANGLE_STRIP, 0, 4);
            gl::BindVertexArray(0);
        }
    }
}
