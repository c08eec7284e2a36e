mod common;

use common::{headless, program_of, targets, DrawLog, Recording};
use fxring::{ChainConfig, EffectChain, FrameBuffer, GBuffer, RenderError, TargetBindings};
use fxring_core::format::status;
use fxring_core::{MemoryFileSystem, TextureFormat};

fn abc_chain(log: &DrawLog) -> EffectChain {
    let mut chain = EffectChain::new();
    for (name, produces) in [("A", true), ("B", false), ("C", true)] {
        let index = chain.add(Recording::new(name, produces, log));
        chain.set_enabled(index, true);
    }
    chain
}

#[test]
fn swaps_follow_only_producing_effects() {
    let (device, ctx) = headless(32, 32);
    let mut fb = FrameBuffer::new(&ctx, targets(32, 32)).unwrap();
    let log = DrawLog::default();
    let mut chain = abc_chain(&log);
    assert!(chain.initialize(&ctx, &MemoryFileSystem::new()).is_empty());

    let report = chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();
    assert_eq!(report.dispatched, vec![0, 1, 2]);
    assert_eq!(report.swaps, vec![0, 2]);
    assert_eq!(fb.swap_count(), 2);
    assert_eq!(*log.borrow(), vec!["A", "B", "C"]);

    let c = program_of(&device, "C").unwrap();
    assert_eq!(device.last_writer(fb.source().id()), Some(c));
}

#[test]
fn non_producing_effects_draw_into_the_side_attachment() {
    let (device, ctx) = headless(32, 32);
    let config = fxring::FrameBufferConfig {
        attachment_count: 3,
        ..targets(32, 32)
    };
    let mut fb = FrameBuffer::new(&ctx, config).unwrap();
    let log = DrawLog::default();
    let mut chain = abc_chain(&log);
    chain.initialize(&ctx, &MemoryFileSystem::new());

    chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();

    let side = fb.target(GBuffer::IntermediateTarget2).unwrap().id();
    let b = program_of(&device, "B").unwrap();
    assert_eq!(device.last_writer(side), Some(b));
    assert_eq!(device.draws_into(side), 1);
    assert_eq!(
        device.last_writer(fb.source().id()),
        program_of(&device, "C")
    );
}

#[test]
fn disabling_a_non_producing_effect_keeps_the_swap_sequence() {
    let (_device, ctx) = headless(32, 32);
    let mut fb = FrameBuffer::new(&ctx, targets(32, 32)).unwrap();
    let log = DrawLog::default();
    let mut chain = abc_chain(&log);
    chain.initialize(&ctx, &MemoryFileSystem::new());

    let all = chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();
    chain.set_enabled(1, false);
    let without_b = chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();

    assert_eq!(all.swaps, without_b.swaps);
    assert_eq!(without_b.dispatched, vec![0, 2]);
}

#[test]
fn repeated_renders_are_deterministic() {
    let (device, ctx) = headless(32, 32);
    let mut fb = FrameBuffer::new(&ctx, targets(32, 32)).unwrap();
    let log = DrawLog::default();
    let mut chain = abc_chain(&log);
    chain.initialize(&ctx, &MemoryFileSystem::new());
    let bindings = TargetBindings::new();

    device.clear_commands();
    let first = chain.render(&ctx, &mut fb, &bindings).unwrap();
    let first_commands = device.commands();

    device.clear_commands();
    let second = chain.render(&ctx, &mut fb, &bindings).unwrap();
    let second_commands = device.commands();

    assert_eq!(first, second);
    // Two swaps per render leave the attachments where they started, so
    // the two command streams are identical.
    assert_eq!(first_commands, second_commands);
}

#[test]
fn incompatible_attachments_are_fatal() {
    let (device, ctx) = headless(32, 32);
    let result = FrameBuffer::new(
        &ctx,
        fxring::FrameBufferConfig {
            color_format: TextureFormat::Depth24,
            ..targets(32, 32)
        },
    );
    match result {
        Err(RenderError::IncompleteFramebuffer { status: code }) => {
            assert_eq!(code, status::INCOMPLETE_ATTACHMENT);
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("incomplete framebuffer was accepted"),
    }
    assert_eq!(device.live_textures(), 0);
}

#[test]
fn strict_chain_refuses_missing_targets_before_drawing() {
    let (device, ctx) = headless(32, 32);
    let mut fb = FrameBuffer::new(&ctx, targets(32, 32)).unwrap();
    let log = DrawLog::default();
    let mut chain = EffectChain::with_config(ChainConfig {
        strict_bindings: true,
    });
    let a = chain.add(Recording::new("A", true, &log));
    let ssao = chain.add(Recording::new("SSAO", true, &log).requiring(GBuffer::Normal));
    chain.set_enabled(a, true);
    chain.set_enabled(ssao, true);
    chain.initialize(&ctx, &MemoryFileSystem::new());

    device.clear_commands();
    let err = chain
        .render(&ctx, &mut fb, &TargetBindings::new())
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::MissingBinding {
            tag: GBuffer::Normal,
            ..
        }
    ));
    assert!(log.borrow().is_empty());
    assert_eq!(device.draw_count(), 0);
}

#[test]
fn everything_is_released_on_drop() {
    let (device, ctx) = headless(32, 32);
    {
        let mut fb = FrameBuffer::new(&ctx, targets(32, 32)).unwrap();
        let log = DrawLog::default();
        let mut chain = abc_chain(&log);
        chain.initialize(&ctx, &MemoryFileSystem::new());
        chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();
        fb.resize(64, 64).unwrap();
        chain.render(&ctx, &mut fb, &TargetBindings::new()).unwrap();

        assert_eq!(device.live_programs(), 3);
        assert_eq!(device.live_textures(), 3);
    }
    assert_eq!(device.live_programs(), 0);
    assert_eq!(device.live_textures(), 0);
    assert_eq!(device.live_framebuffers(), 0);
    assert_eq!(device.live_buffers(), 0);
}
