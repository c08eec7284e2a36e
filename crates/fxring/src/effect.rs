//! The [`Effect`] contract.
//!
//! An effect declares the render targets it reads, sets up its own GPU
//! resources once in [`Effect::initialize`], and draws each frame against the
//! targets the chain hands it. It never knows which other effects exist.
//! Whether an effect runs is decided by the chain, not by the effect.

use std::collections::BTreeMap;

use fxring_core::parameters::builtin::INTENSITY;
use fxring_core::parameters::{ParamInfo, SimpleParamInfo};
use fxring_core::{FileSystem, GBuffer, RenderResult};
use fxring_device::TextureId;

use crate::context::RenderContext;
use crate::framebuffer::FrameBuffer;

/// Mapping from render-target tag to the texture currently bound for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetBindings {
    targets: BTreeMap<GBuffer, TextureId>,
}

impl TargetBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: GBuffer, texture: TextureId) -> Self {
        self.insert(tag, texture);
        self
    }

    pub fn insert(&mut self, tag: GBuffer, texture: TextureId) -> Option<TextureId> {
        self.targets.insert(tag, texture)
    }

    pub fn remove(&mut self, tag: GBuffer) -> Option<TextureId> {
        self.targets.remove(&tag)
    }

    pub fn get(&self, tag: GBuffer) -> Option<TextureId> {
        self.targets.get(&tag).copied()
    }

    pub fn contains(&self, tag: GBuffer) -> bool {
        self.targets.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Ordered by tag.
    pub fn iter(&self) -> impl Iterator<Item = (GBuffer, TextureId)> + '_ {
        self.targets.iter().map(|(tag, texture)| (*tag, *texture))
    }
}

/// State every effect carries: its name, the targets it requires, and its
/// parameters. Parameter 0 is always the shared intensity.
#[derive(Debug, Clone)]
pub struct EffectBase {
    name: String,
    required: Vec<GBuffer>,
    params: Vec<SimpleParamInfo>,
    values: Vec<f32>,
}

impl EffectBase {
    pub const INTENSITY_PARAM: usize = 0;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: Vec::new(),
            params: vec![INTENSITY.clone()],
            values: vec![INTENSITY.default_value()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Declare a required target. Declaring the same tag twice is a no-op.
    pub fn add_required_buffer(&mut self, tag: GBuffer) {
        if !self.required.contains(&tag) {
            self.required.push(tag);
        }
    }

    pub fn remove_required_buffer(&mut self, tag: GBuffer) {
        self.required.retain(|t| *t != tag);
    }

    pub fn required_buffers(&self) -> &[GBuffer] {
        &self.required
    }

    pub fn is_buffer_required(&self, tag: GBuffer) -> bool {
        self.required.contains(&tag)
    }

    /// Register an extra parameter, returning its index.
    pub fn add_param(&mut self, info: SimpleParamInfo) -> usize {
        self.values.push(info.default_value());
        self.params.push(info);
        self.params.len() - 1
    }

    pub fn params(&self) -> &[SimpleParamInfo] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Set a parameter, clamped to its declared range. Returns `false` for an
    /// unknown index.
    pub fn set_param(&mut self, index: usize, value: f32) -> bool {
        match (self.params.get(index), self.values.get_mut(index)) {
            (Some(info), Some(slot)) => {
                *slot = info.clamp(value);
                true
            }
            _ => false,
        }
    }

    pub fn intensity(&self) -> f32 {
        self.values[Self::INTENSITY_PARAM]
    }

    pub fn set_intensity(&mut self, value: f32) {
        self.set_param(Self::INTENSITY_PARAM, value);
    }
}

/// An image-space effect driven by an [`EffectChain`](crate::EffectChain).
///
/// Implementors embed an [`EffectBase`] and expose it through
/// [`base`](Effect::base) / [`base_mut`](Effect::base_mut); the remaining
/// accessors have default implementations on top of it.
///
/// ```rust,ignore
/// struct Invert {
///     base: EffectBase,
///     pass: Option<FullscreenPass<InvertSettings>>,
/// }
///
/// impl Effect for Invert {
///     fn base(&self) -> &EffectBase { &self.base }
///     fn base_mut(&mut self) -> &mut EffectBase { &mut self.base }
///
///     fn initialize(&mut self, ctx: &RenderContext, fs: &dyn FileSystem) -> anyhow::Result<()> {
///         self.base.add_required_buffer(GBuffer::COLOR);
///         self.pass = Some(FullscreenPass::load(ctx, fs, "invert", "invert.frag", 3)?);
///         Ok(())
///     }
///
///     fn draw(&mut self, ctx: &RenderContext, _fb: &FrameBuffer, targets: &TargetBindings) -> RenderResult<()> {
///         // ...
///     }
/// }
/// ```
pub trait Effect: 'static {
    fn base(&self) -> &EffectBase;

    fn base_mut(&mut self) -> &mut EffectBase;

    /// Called exactly once, before the first draw. Compile shaders, allocate
    /// constant-data rings and declare required targets here.
    fn initialize(&mut self, ctx: &RenderContext, fs: &dyn FileSystem) -> anyhow::Result<()>;

    /// Perform this frame's GPU work. The framebuffer is bound with the
    /// scratch attachment as output and every required target that is
    /// available is bound at its tag's texture unit.
    fn draw(
        &mut self,
        ctx: &RenderContext,
        framebuffer: &FrameBuffer,
        targets: &TargetBindings,
    ) -> RenderResult<()>;

    /// Whether `draw` writes a new image into the scratch attachment. Effects
    /// that only have side effects (overlays, readbacks) return `false` so
    /// the chain does not swap after them. Their colour output goes to
    /// `IntermediateTarget2` when the framebuffer has a third attachment and
    /// is discarded otherwise.
    fn produces_target(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn required_buffers(&self) -> &[GBuffer] {
        self.base().required_buffers()
    }

    fn is_buffer_required(&self, tag: GBuffer) -> bool {
        self.base().is_buffer_required(tag)
    }

    fn intensity(&self) -> f32 {
        self.base().intensity()
    }

    fn set_intensity(&mut self, value: f32) {
        self.base_mut().set_intensity(value);
    }

    fn params(&self) -> &[SimpleParamInfo] {
        self.base().params()
    }

    fn param(&self, index: usize) -> Option<f32> {
        self.base().param(index)
    }

    fn set_param(&mut self, index: usize, value: f32) -> bool {
        self.base_mut().set_param(index, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_is_parameter_zero() {
        let mut base = EffectBase::new("Blur");
        assert_eq!(base.intensity(), 1.0);
        assert_eq!(base.params()[0].name, "Intensity");

        base.set_intensity(0.25);
        assert_eq!(base.param(EffectBase::INTENSITY_PARAM), Some(0.25));

        base.set_intensity(4.0);
        assert_eq!(base.intensity(), 1.0);
    }

    #[test]
    fn extra_params_are_clamped() {
        let mut base = EffectBase::new("Pixelate");
        let size = base.add_param(SimpleParamInfo::new("Pixel Size", 8.0).with_range(1.0, 64.0));
        assert_eq!(size, 1);
        assert_eq!(base.param(size), Some(8.0));

        assert!(base.set_param(size, 500.0));
        assert_eq!(base.param(size), Some(64.0));
        assert!(!base.set_param(7, 1.0));
        assert_eq!(base.param(7), None);
    }

    #[test]
    fn required_buffers_are_a_set() {
        let mut base = EffectBase::new("SSAO");
        base.add_required_buffer(GBuffer::Normal);
        base.add_required_buffer(GBuffer::Depth);
        base.add_required_buffer(GBuffer::Normal);
        assert_eq!(base.required_buffers(), &[GBuffer::Normal, GBuffer::Depth]);
        assert!(base.is_buffer_required(GBuffer::Depth));

        base.remove_required_buffer(GBuffer::Depth);
        assert!(!base.is_buffer_required(GBuffer::Depth));
    }

    #[test]
    fn bindings_iterate_in_tag_order() {
        let bindings = TargetBindings::new()
            .with(GBuffer::Velocity, TextureId(3))
            .with(GBuffer::Normal, TextureId(9));
        let tags: Vec<GBuffer> = bindings.iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec![GBuffer::Normal, GBuffer::Velocity]);
        assert_eq!(bindings.get(GBuffer::Normal), Some(TextureId(9)));
        assert!(!bindings.contains(GBuffer::Depth));
    }
}
