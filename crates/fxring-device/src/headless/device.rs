use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use fxring_core::format::status;
use fxring_core::{FramebufferStatus, RenderError, RenderResult, TextureDesc};
use tracing::{trace, warn};

use super::command::{Command, UniformValue};
use crate::device::{
    BufferId, BufferKind, DeviceLimits, FramebufferId, ProgramId, ProgramSource, RenderDevice,
    ShaderSource, TextureId,
};

/// Marker that makes headless shader compilation fail.
pub const COMPILE_ERROR_MARKER: &str = "#error";

struct BufferState {
    kind: BufferKind,
    data: Vec<u8>,
}

struct TextureState {
    desc: TextureDesc,
    last_writer: Option<ProgramId>,
    draws: u32,
}

#[derive(Default)]
struct FramebufferState {
    colors: BTreeMap<u32, TextureId>,
    depth: Option<TextureId>,
    draw_buffer: u32,
}

struct ProgramState {
    label: String,
    uniforms: HashMap<String, UniformValue>,
    blocks: HashMap<String, u32>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    buffers: HashMap<BufferId, BufferState>,
    textures: HashMap<TextureId, TextureState>,
    framebuffers: HashMap<FramebufferId, FramebufferState>,
    programs: HashMap<ProgramId, ProgramState>,
    texture_units: BTreeMap<u32, TextureId>,
    bound_framebuffer: Option<FramebufferId>,
    current_program: Option<ProgramId>,
    commands: Vec<Command>,
}

impl State {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, command: Command) {
        trace!(?command, "headless");
        self.commands.push(command);
    }
}

/// In-memory [`RenderDevice`] that executes nothing and records everything.
///
/// Buffers are plain byte vectors, textures remember which program last drew
/// into them, and framebuffer completeness follows the GL rules and status
/// codes. Live-object counters make leaks visible to tests.
pub struct HeadlessDevice {
    limits: DeviceLimits,
    state: RefCell<State>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::with_limits(DeviceLimits::default())
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        Self {
            limits,
            state: RefCell::new(State::default()),
        }
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Snapshot of the command log.
    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    pub fn command_count(&self) -> usize {
        self.state.borrow().commands.len()
    }

    /// Drop the recorded log. Object state and last writers are kept.
    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    pub fn draw_count(&self) -> usize {
        self.state
            .borrow()
            .commands
            .iter()
            .filter(|c| c.is_draw())
            .count()
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .buffers
            .get(&buffer)
            .map(|b| b.data.clone())
    }

    /// Program whose last fullscreen draw wrote `texture`.
    pub fn last_writer(&self, texture: TextureId) -> Option<ProgramId> {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .and_then(|t| t.last_writer)
    }

    /// Number of draws that wrote `texture`.
    pub fn draws_into(&self, texture: TextureId) -> u32 {
        self.state
            .borrow()
            .textures
            .get(&texture)
            .map_or(0, |t| t.draws)
    }

    pub fn color_attachment(&self, framebuffer: FramebufferId, index: u32) -> Option<TextureId> {
        self.state
            .borrow()
            .framebuffers
            .get(&framebuffer)
            .and_then(|fb| fb.colors.get(&index).copied())
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.state.borrow().texture_units.get(&unit).copied()
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.state.borrow().bound_framebuffer
    }

    pub fn program_label(&self, program: ProgramId) -> Option<String> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.label.clone())
    }

    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.uniforms.get(name).copied())
    }

    pub fn uniform_block_binding(&self, program: ProgramId, block: &str) -> Option<u32> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .and_then(|p| p.blocks.get(block).copied())
    }
}

fn compile_stage(label: &str, stage: &str, source: &ShaderSource) -> RenderResult<()> {
    let text = source.text();
    if text.trim().is_empty() {
        return Err(RenderError::ShaderCompile {
            label: label.to_string(),
            log: format!("{stage} shader source is empty"),
        });
    }
    if let Some(line) = text
        .lines()
        .position(|line| line.trim_start().starts_with(COMPILE_ERROR_MARKER))
    {
        return Err(RenderError::ShaderCompile {
            label: label.to_string(),
            log: format!("0:{}: {stage} shader: #error directive", line + 1),
        });
    }
    Ok(())
}

impl RenderDevice for HeadlessDevice {
    fn name(&self) -> &str {
        "headless"
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn create_buffer(&self, kind: BufferKind, size: u64) -> RenderResult<BufferId> {
        if size == 0 {
            return Err(RenderError::Allocation {
                what: "zero-sized buffer".into(),
            });
        }
        let mut state = self.state.borrow_mut();
        let id = BufferId(state.next_id());
        state.buffers.insert(
            id,
            BufferState {
                kind,
                data: vec![0; size as usize],
            },
        );
        state.record(Command::CreateBuffer {
            buffer: id,
            kind,
            size,
        });
        Ok(id)
    }

    fn write_buffer(
        &self,
        buffer: BufferId,
        kind: BufferKind,
        offset: u64,
        data: &[u8],
    ) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        let target = state
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| RenderError::Allocation {
                what: format!("write to unknown buffer {buffer:?}"),
            })?;
        if target.kind != kind {
            warn!(?buffer, ?kind, actual = ?target.kind, "buffer written through the wrong binding kind");
        }
        let len = data.len() as u64;
        let size = target.data.len() as u64;
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(RenderError::BufferRange { offset, len, size });
        }
        let start = offset as usize;
        target.data[start..start + data.len()].copy_from_slice(data);
        state.record(Command::WriteBuffer {
            buffer,
            offset,
            len,
        });
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
        let mut state = self.state.borrow_mut();
        let alignment = self.limits.alignment_for(kind);
        if offset % alignment != 0 {
            warn!(?buffer, offset, alignment, "misaligned buffer range binding");
        }
        state.record(Command::BindBufferRange {
            kind,
            binding,
            buffer,
            offset,
            size,
        });
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        state.record(Command::DeleteBuffer(buffer));
    }

    fn create_texture(&self, desc: &TextureDesc) -> RenderResult<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::Allocation {
                what: format!("texture '{}' with zero extent", desc.label),
            });
        }
        let mut state = self.state.borrow_mut();
        let id = TextureId(state.next_id());
        state.textures.insert(
            id,
            TextureState {
                desc: desc.clone(),
                last_writer: None,
                draws: 0,
            },
        );
        state.record(Command::CreateTexture {
            texture: id,
            label: desc.label.clone(),
        });
        Ok(id)
    }

    fn bind_texture(&self, unit: u32, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        if unit >= self.limits.max_texture_units {
            warn!(unit, max = self.limits.max_texture_units, "texture unit out of range");
        }
        state.texture_units.insert(unit, texture);
        state.record(Command::BindTexture { unit, texture });
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture);
        state.texture_units.retain(|_, bound| *bound != texture);
        state.record(Command::DeleteTexture(texture));
    }

    fn create_framebuffer(&self) -> RenderResult<FramebufferId> {
        let mut state = self.state.borrow_mut();
        let id = FramebufferId(state.next_id());
        state.framebuffers.insert(id, FramebufferState::default());
        state.record(Command::CreateFramebuffer(id));
        Ok(id)
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
        let mut state = self.state.borrow_mut();
        let fb = state
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| RenderError::Allocation {
                what: format!("attachment on unknown framebuffer {framebuffer:?}"),
            })?;
        fb.colors.insert(index, texture);
        state.record(Command::AttachColor {
            framebuffer,
            index,
            texture,
        });
        Ok(())
    }

    fn attach_depth(&self, framebuffer: FramebufferId, texture: TextureId) -> RenderResult<()> {
        let mut state = self.state.borrow_mut();
        let fb = state
            .framebuffers
            .get_mut(&framebuffer)
            .ok_or_else(|| RenderError::Allocation {
                what: format!("attachment on unknown framebuffer {framebuffer:?}"),
            })?;
        fb.depth = Some(texture);
        state.record(Command::AttachDepth {
            framebuffer,
            texture,
        });
        Ok(())
    }

    fn framebuffer_status(&self, framebuffer: FramebufferId) -> FramebufferStatus {
        let state = self.state.borrow();
        let Some(fb) = state.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Incomplete(status::UNDEFINED);
        };
        if fb.colors.is_empty() && fb.depth.is_none() {
            return FramebufferStatus::Incomplete(status::INCOMPLETE_MISSING_ATTACHMENT);
        }

        let mut extent = None;
        let colors = fb.colors.values().map(|id| (id, false));
        for (id, is_depth_slot) in colors.chain(fb.depth.iter().map(|id| (id, true))) {
            let Some(texture) = state.textures.get(id) else {
                return FramebufferStatus::Incomplete(status::INCOMPLETE_ATTACHMENT);
            };
            if texture.desc.format.is_depth() != is_depth_slot {
                return FramebufferStatus::Incomplete(status::INCOMPLETE_ATTACHMENT);
            }
            let dims = (texture.desc.width, texture.desc.height);
            match extent {
                None => extent = Some(dims),
                Some(expected) if expected != dims => {
                    return FramebufferStatus::Incomplete(status::INCOMPLETE_DIMENSIONS);
                }
                Some(_) => {}
            }
        }
        FramebufferStatus::Complete
    }

    fn bind_framebuffer(&self, framebuffer: Option<FramebufferId>) {
        let mut state = self.state.borrow_mut();
        state.bound_framebuffer = framebuffer;
        state.record(Command::BindFramebuffer(framebuffer));
    }

    fn set_draw_buffer(&self, framebuffer: FramebufferId, index: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(fb) = state.framebuffers.get_mut(&framebuffer) {
            fb.draw_buffer = index;
        }
        state.record(Command::SetDrawBuffer { framebuffer, index });
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        let mut state = self.state.borrow_mut();
        state.framebuffers.remove(&framebuffer);
        if state.bound_framebuffer == Some(framebuffer) {
            state.bound_framebuffer = None;
        }
        state.record(Command::DeleteFramebuffer(framebuffer));
    }

    fn create_program(&self, source: &ProgramSource) -> RenderResult<ProgramId> {
        compile_stage(&source.label, "vertex", &source.vertex)?;
        compile_stage(&source.label, "fragment", &source.fragment)?;

        let mut state = self.state.borrow_mut();
        let id = ProgramId(state.next_id());
        state.programs.insert(
            id,
            ProgramState {
                label: source.label.clone(),
                uniforms: HashMap::new(),
                blocks: HashMap::new(),
            },
        );
        state.record(Command::CreateProgram {
            program: id,
            label: source.label.clone(),
        });
        Ok(id)
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut state = self.state.borrow_mut();
        state.current_program = program;
        state.record(Command::UseProgram(program));
    }

    fn set_uniform_f32(&self, program: ProgramId, name: &str, value: f32) {
        let mut state = self.state.borrow_mut();
        let value = UniformValue::F32(value);
        if let Some(p) = state.programs.get_mut(&program) {
            p.uniforms.insert(name.to_string(), value);
        }
        state.record(Command::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }

    fn set_uniform_i32(&self, program: ProgramId, name: &str, value: i32) {
        let mut state = self.state.borrow_mut();
        let value = UniformValue::I32(value);
        if let Some(p) = state.programs.get_mut(&program) {
            p.uniforms.insert(name.to_string(), value);
        }
        state.record(Command::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }

    fn bind_uniform_block(&self, program: ProgramId, block: &str, binding: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.get_mut(&program) {
            p.blocks.insert(block.to_string(), binding);
        }
        state.record(Command::BindUniformBlock {
            program,
            block: block.to_string(),
            binding,
        });
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
        state.record(Command::DeleteProgram(program));
    }

    fn draw_fullscreen(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        let target = state
            .bound_framebuffer
            .and_then(|id| state.framebuffers.get(&id))
            .and_then(|fb| fb.colors.get(&fb.draw_buffer).copied());
        if let Some(texture) = target.and_then(|id| state.textures.get_mut(&id)) {
            texture.last_writer = Some(program);
            texture.draws += 1;
        }
        state.record(Command::DrawFullscreen { program, target });
    }
}
