//! Ordered effect chain with ping-pong dispatch.
//!
//! The chain is a plain list. Order is the only dependency mechanism: there
//! is no reordering and no cycle detection. Before dispatching, `render`
//! checks that every target an enabled effect requires is either managed by
//! the framebuffer or supplied by the caller, and reports what is not.

use fxring_core::{FileSystem, FxConfig, GBuffer, RenderError, RenderResult};
use tracing::{debug, error, trace, warn};

use crate::context::RenderContext;
use crate::effect::{Effect, TargetBindings};
use crate::framebuffer::FrameBuffer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainConfig {
    /// Return [`RenderError::MissingBinding`] instead of warning.
    pub strict_bindings: bool,
}

impl From<&FxConfig> for ChainConfig {
    fn from(config: &FxConfig) -> Self {
        Self {
            strict_bindings: config.strict_bindings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Uninitialized,
    Initialized,
    /// `initialize` returned an error; the effect never runs.
    Failed,
}

/// A required target nothing provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingBinding {
    pub index: usize,
    pub effect: String,
    pub tag: GBuffer,
}

impl From<MissingBinding> for RenderError {
    fn from(missing: MissingBinding) -> Self {
        RenderError::MissingBinding {
            effect: missing.effect,
            tag: missing.tag,
        }
    }
}

/// What one `render` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Indices of the effects drawn, in order.
    pub dispatched: Vec<usize>,
    /// Indices of the effects followed by an attachment swap.
    pub swaps: Vec<usize>,
    pub missing: Vec<MissingBinding>,
}

/// An effect whose `initialize` failed.
#[derive(Debug)]
pub struct InitFailure {
    pub index: usize,
    pub effect: String,
    pub error: anyhow::Error,
}

struct Entry {
    effect: Box<dyn Effect>,
    enabled: bool,
    state: EffectState,
}

#[derive(Default)]
pub struct EffectChain {
    entries: Vec<Entry>,
    config: ChainConfig,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChainConfig) -> Self {
        Self {
            entries: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn set_strict_bindings(&mut self, strict: bool) {
        self.config.strict_bindings = strict;
    }

    /// Append an effect, disabled. Returns its index.
    pub fn add_effect(&mut self, effect: Box<dyn Effect>) -> usize {
        debug!(effect = effect.name(), index = self.entries.len(), "effect added");
        self.entries.push(Entry {
            effect,
            enabled: false,
            state: EffectState::Uninitialized,
        });
        self.entries.len() - 1
    }

    pub fn add<E: Effect>(&mut self, effect: E) -> usize {
        self.add_effect(Box::new(effect))
    }

    /// Panics if `index` is out of range.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) {
        let entry = &mut self.entries[index];
        if entry.state == EffectState::Failed && enabled {
            warn!(effect = entry.effect.name(), "cannot enable an effect that failed to initialize");
            return;
        }
        entry.enabled = enabled;
    }

    /// Whether the effect takes part in the next `render`: enabled, initialized
    /// and with a non-zero intensity.
    pub fn is_enabled(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|entry| {
            entry.enabled
                && entry.state == EffectState::Initialized
                && entry.effect.intensity() > 0.0
        })
    }

    pub fn state(&self, index: usize) -> Option<EffectState> {
        self.entries.get(index).map(|entry| entry.state)
    }

    /// Index of the first effect named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.effect.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn effect(&self, index: usize) -> Option<&dyn Effect> {
        self.entries.get(index).map(|entry| entry.effect.as_ref())
    }

    pub fn effect_mut(&mut self, index: usize) -> Option<&mut (dyn Effect + 'static)> {
        self.entries.get_mut(index).map(|entry| entry.effect.as_mut())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.effect.name()).collect()
    }

    /// Initialize every effect that has not been initialized yet. Failures
    /// are isolated: the effect is marked failed and disabled, and the rest of
    /// the chain is unaffected.
    pub fn initialize(&mut self, ctx: &RenderContext, fs: &dyn FileSystem) -> Vec<InitFailure> {
        let mut failures = Vec::new();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.state != EffectState::Uninitialized {
                continue;
            }
            match entry.effect.initialize(ctx, fs) {
                Ok(()) => {
                    entry.state = EffectState::Initialized;
                    debug!(effect = entry.effect.name(), index, "effect initialized");
                }
                Err(err) => {
                    error!(effect = entry.effect.name(), index, "effect failed to initialize: {err:#}");
                    entry.state = EffectState::Failed;
                    entry.enabled = false;
                    failures.push(InitFailure {
                        index,
                        effect: entry.effect.name().to_string(),
                        error: err,
                    });
                }
            }
        }
        failures
    }

    /// Required targets of enabled effects that neither `framebuffer` nor
    /// `bindings` provide.
    pub fn validate(&self, framebuffer: &FrameBuffer, bindings: &TargetBindings) -> Vec<MissingBinding> {
        let mut missing = Vec::new();
        for index in self.active() {
            let effect = &self.entries[index].effect;
            for &tag in effect.required_buffers() {
                if !framebuffer.provides(tag) && !bindings.contains(tag) {
                    missing.push(MissingBinding {
                        index,
                        effect: effect.name().to_string(),
                        tag,
                    });
                }
            }
        }
        missing
    }

    /// Draw every enabled effect in order over `framebuffer`.
    ///
    /// Each effect sees the caller's `bindings` with the framebuffer-managed
    /// tags resolved to the current attachments, has its available required
    /// targets bound at their texture units, and draws into the scratch
    /// attachment. Effects that produce a target are followed by a swap;
    /// the others draw into the side attachment instead.
    pub fn render(
        &mut self,
        ctx: &RenderContext,
        framebuffer: &mut FrameBuffer,
        bindings: &TargetBindings,
    ) -> RenderResult<ChainReport> {
        let active = self.active();
        if active.is_empty() {
            trace!("no enabled effects");
            return Ok(ChainReport::default());
        }

        let missing = self.validate(framebuffer, bindings);
        if let Some(first) = missing.first() {
            if self.config.strict_bindings {
                return Err(first.clone().into());
            }
            for m in &missing {
                warn!(
                    effect = %m.effect,
                    index = m.index,
                    tag = %m.tag,
                    "required target is not provided, effect will sample stale data"
                );
            }
        }

        let mut report = ChainReport {
            missing,
            ..Default::default()
        };
        let result = self.dispatch(ctx, framebuffer, bindings, &active, &mut report);
        ctx.device().bind_framebuffer(None);

        match result {
            Ok(()) => Ok(report),
            Err(err) => {
                warn!(
                    dispatched = ?report.dispatched,
                    swaps = ?report.swaps,
                    "chain render aborted: {err}"
                );
                Err(err)
            }
        }
    }

    /// Draw `active` in order, recording progress in `report`. Leaves the
    /// framebuffer bound.
    fn dispatch(
        &mut self,
        ctx: &RenderContext,
        framebuffer: &mut FrameBuffer,
        bindings: &TargetBindings,
        active: &[usize],
        report: &mut ChainReport,
    ) -> RenderResult<()> {
        let device = ctx.device();
        for &index in active {
            let entry = &mut self.entries[index];
            let targets = resolve_targets(framebuffer, bindings);

            for &tag in entry.effect.required_buffers() {
                if let Some(texture) = targets.get(tag) {
                    device.bind_texture(tag.binding_slot(), texture);
                }
            }
            let produces = entry.effect.produces_target();
            if produces {
                framebuffer.bind_for_output();
            } else {
                framebuffer.bind_for_side_output();
            }

            trace!(effect = entry.effect.name(), index, frame = ctx.frame(), "dispatch");
            entry.effect.draw(ctx, framebuffer, &targets)?;
            report.dispatched.push(index);

            if produces {
                framebuffer.swap()?;
                report.swaps.push(index);
            }
        }
        Ok(())
    }

    fn active(&self) -> Vec<usize> {
        (0..self.entries.len()).filter(|&i| self.is_enabled(i)).collect()
    }
}

/// Caller bindings overlaid with the targets the framebuffer manages.
fn resolve_targets(framebuffer: &FrameBuffer, bindings: &TargetBindings) -> TargetBindings {
    let mut targets = bindings.clone();
    for tag in [
        GBuffer::COLOR,
        GBuffer::IntermediateTarget,
        GBuffer::IntermediateTarget2,
        GBuffer::Depth,
    ] {
        if let Some(texture) = framebuffer.target(tag) {
            targets.insert(tag, texture.id());
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::EffectBase;
    use crate::framebuffer::FrameBufferConfig;
    use fxring_core::{MemoryFileSystem, TextureFormat, Viewport};
    use fxring_device::{HeadlessDevice, TextureId};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(String, TextureId)>>>;

    struct Probe {
        base: EffectBase,
        produces: bool,
        fail_init: bool,
        fail_draw: bool,
        log: Log,
    }

    impl Probe {
        fn new(name: &str, produces: bool, log: &Log) -> Self {
            Self {
                base: EffectBase::new(name),
                produces,
                fail_init: false,
                fail_draw: false,
                log: log.clone(),
            }
        }
    }

    impl Effect for Probe {
        fn base(&self) -> &EffectBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut EffectBase {
            &mut self.base
        }

        fn initialize(&mut self, _ctx: &RenderContext, _fs: &dyn FileSystem) -> anyhow::Result<()> {
            if self.fail_init {
                anyhow::bail!("shader did not compile");
            }
            self.base.add_required_buffer(GBuffer::COLOR);
            Ok(())
        }

        fn draw(
            &mut self,
            _ctx: &RenderContext,
            framebuffer: &FrameBuffer,
            targets: &TargetBindings,
        ) -> RenderResult<()> {
            assert_eq!(targets.get(GBuffer::COLOR), Some(framebuffer.source().id()));
            if self.fail_draw {
                return Err(RenderError::EffectNotInitialized {
                    effect: self.base.name().to_string(),
                });
            }
            self.log
                .borrow_mut()
                .push((self.base.name().to_string(), framebuffer.source().id()));
            Ok(())
        }

        fn produces_target(&self) -> bool {
            self.produces
        }
    }

    fn setup() -> (Rc<HeadlessDevice>, RenderContext, FrameBuffer) {
        let device = Rc::new(HeadlessDevice::new());
        let ctx = RenderContext::new(device.clone(), Viewport::new(16, 16));
        let fb = FrameBuffer::new(
            &ctx,
            FrameBufferConfig {
                width: 16,
                height: 16,
                color_format: TextureFormat::Rgba8,
                depth_format: None,
                attachment_count: 2,
            },
        )
        .unwrap();
        (device, ctx, fb)
    }

    #[test]
    fn effects_start_disabled() {
        let log = Log::default();
        let mut chain = EffectChain::new();
        let index = chain.add(Probe::new("A", true, &log));
        assert_eq!(index, 0);
        assert!(!chain.is_enabled(0));
        assert_eq!(chain.state(0), Some(EffectState::Uninitialized));
    }

    #[test]
    fn uninitialized_or_zero_intensity_effects_do_not_run() {
        let (_device, ctx, mut fb) = setup();
        let log = Log::default();
        let mut chain = EffectChain::new();
        chain.add(Probe::new("A", true, &log));
        chain.set_enabled(0, true);
        assert!(!chain.is_enabled(0));

        chain.initialize(&ctx, &MemoryFileSystem::new());
        assert!(chain.is_enabled(0));

        chain.effect_mut(0).unwrap().set_intensity(0.0);
        assert!(!chain.is_enabled(0));
        let report = chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();
        assert_eq!(report, ChainReport::default());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failed_draw_still_unbinds_the_framebuffer() {
        let (device, ctx, mut fb) = setup();
        let log = Log::default();
        let mut chain = EffectChain::new();
        chain.add(Probe::new("A", true, &log));
        let mut broken = Probe::new("B", true, &log);
        broken.fail_draw = true;
        chain.add(broken);
        chain.initialize(&ctx, &MemoryFileSystem::new());
        chain.set_enabled(0, true);
        chain.set_enabled(1, true);

        let result = chain.render(&ctx, &mut fb, &TargetBindings::new());
        assert!(matches!(result, Err(RenderError::EffectNotInitialized { .. })));
        assert_eq!(device.bound_framebuffer(), None);
        assert_eq!(fb.swap_count(), 1);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn empty_render_does_not_touch_the_framebuffer() {
        let (device, ctx, mut fb) = setup();
        let mut chain = EffectChain::new();
        device.clear_commands();
        let report = chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();
        assert!(report.dispatched.is_empty());
        assert!(device.commands().is_empty());
    }

    #[test]
    fn failed_initialization_is_isolated() {
        let (_device, ctx, mut fb) = setup();
        let log = Log::default();
        let mut chain = EffectChain::new();
        chain.add(Probe::new("A", true, &log));
        let mut broken = Probe::new("B", true, &log);
        broken.fail_init = true;
        chain.add(broken);
        chain.add(Probe::new("C", true, &log));
        for i in 0..3 {
            chain.set_enabled(i, true);
        }

        let failures = chain.initialize(&ctx, &MemoryFileSystem::new());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].effect, "B");
        assert_eq!(chain.state(1), Some(EffectState::Failed));

        chain.set_enabled(1, true);
        assert!(!chain.is_enabled(1));

        let report = chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();
        assert_eq!(report.dispatched, vec![0, 2]);
        assert!(chain.initialize(&ctx, &MemoryFileSystem::new()).is_empty());
    }

    #[test]
    fn missing_targets_warn_or_fail() {
        let (device, ctx, mut fb) = setup();
        let log = Log::default();
        let mut chain = EffectChain::new();
        chain.add(Probe::new("A", true, &log));
        chain.initialize(&ctx, &MemoryFileSystem::new());
        chain.effect_mut(0).unwrap().base_mut().add_required_buffer(GBuffer::Velocity);
        chain.set_enabled(0, true);

        let report = chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();
        assert_eq!(
            report.missing,
            vec![MissingBinding {
                index: 0,
                effect: "A".into(),
                tag: GBuffer::Velocity
            }]
        );
        assert_eq!(report.dispatched, vec![0]);

        let supplied = TargetBindings::new().with(GBuffer::Velocity, TextureId(77));
        let report = chain.render(&ctx, &mut fb, &supplied).unwrap();
        assert!(report.missing.is_empty());
        assert_eq!(device.bound_texture(GBuffer::Velocity.binding_slot()), Some(TextureId(77)));

        chain.set_strict_bindings(true);
        let draws = log.borrow().len();
        match chain.render(&ctx, &mut fb, &TargetBindings::new()) {
            Err(RenderError::MissingBinding { effect, tag }) => {
                assert_eq!(effect, "A");
                assert_eq!(tag, GBuffer::Velocity);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(log.borrow().len(), draws);
    }

    #[test]
    fn each_effect_reads_the_previous_output() {
        let (_device, ctx, mut fb) = setup();
        let log = Log::default();
        let mut chain = EffectChain::new();
        for name in ["A", "B", "C"] {
            let i = chain.add(Probe::new(name, true, &log));
            chain.set_enabled(i, true);
        }
        chain.initialize(&ctx, &MemoryFileSystem::new());

        let first = fb.source().id();
        let second = fb.scratch().id();
        chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();

        let reads: Vec<TextureId> = log.borrow().iter().map(|(_, t)| *t).collect();
        assert_eq!(reads, vec![first, second, first]);
        assert_eq!(chain.names(), vec!["A", "B", "C"]);
        assert_eq!(chain.position("C"), Some(2));
    }
}
