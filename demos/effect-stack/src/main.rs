//! Runs a stack of image effects through an [`EffectChain`] on the headless
//! device and reports what the chain did.

mod assets;
mod cli;
mod effects;

use std::rc::Rc;

use anyhow::Context;
use fxring::{
    ChainConfig, EffectChain, FrameBuffer, FrameBufferConfig, RenderContext,
    TargetBindings,
};
use fxring_core::{DirFileSystem, FileSystem, FxConfig, Viewport};
use fxring_device::{HeadlessDevice, ShaderStage};
use fxring_gl::{wgsl_to_glsl, GlslVersion};
use tracing::{debug, error, info, warn};

use crate::cli::{Options, USAGE};

fn main() -> anyhow::Result<()> {
    fxring_core::logging::init();

    let options = Options::parse(std::env::args().skip(1))?;
    if options.help {
        println!("{USAGE}");
        return Ok(());
    }

    run(&options).map_err(|err| {
        error!("{err:#}");
        err
    })
}

fn config_for(options: &Options) -> FxConfig {
    let mut config = FxConfig::from_env();
    if let Some(width) = options.width {
        config.width = width;
    }
    if let Some(height) = options.height {
        config.height = height;
    }
    if let Some(slots) = options.slots {
        config.ring_slots = slots.get();
    }
    config.strict_bindings |= options.strict;
    // The depth overlay draws into IntermediateTarget2.
    config.attachment_count = config.attachment_count.max(3);
    config
}

fn file_system(options: &Options) -> Box<dyn FileSystem> {
    match &options.assets {
        Some(dir) => Box::new(DirFileSystem::new(dir)),
        None => Box::new(assets::builtin()),
    }
}

fn emit_glsl(fs: &dyn FileSystem) -> anyhow::Result<()> {
    for (path, _) in assets::SHADERS.iter().filter(|(p, _)| p.ends_with(".wgsl")) {
        let source = fs.read_to_string(path).with_context(|| format!("reading {path}"))?;
        let stage = wgsl_to_glsl(
            path,
            &source,
            "fs_main",
            ShaderStage::Fragment,
            GlslVersion::Glsl330,
        )?;
        println!("// {path}");
        for (name, glsl_name) in &stage.renames {
            println!("// {name} -> {glsl_name}");
        }
        println!("{}", stage.source);
    }
    Ok(())
}

/// Summary of a headless run.
#[derive(Debug, Default, PartialEq)]
struct RunSummary {
    frames: u64,
    draws: usize,
    swaps: u64,
    peak_commands: usize,
    failed: Vec<String>,
}

fn build_chain(config: &FxConfig, options: &Options) -> EffectChain {
    let mut chain = EffectChain::with_config(ChainConfig::from(config));
    for effect in effects::demo_stack(config.ring_slots) {
        let enabled = !options.is_disabled(effect.name());
        let index = chain.add_effect(effect);
        chain.set_enabled(index, enabled);
    }
    chain
}

fn render_headless(
    config: &FxConfig,
    options: &Options,
    fs: &dyn FileSystem,
) -> anyhow::Result<RunSummary> {
    let device = Rc::new(HeadlessDevice::new());
    let mut ctx = RenderContext::new(device.clone(), Viewport::new(config.width, config.height));
    let mut framebuffer = FrameBuffer::new(&ctx, FrameBufferConfig::from(config))
        .context("creating the ping-pong framebuffer")?;

    let mut chain = build_chain(config, options);
    let mut summary = RunSummary::default();
    for failure in chain.initialize(&ctx, fs) {
        warn!(effect = %failure.effect, "effect disabled: {:#}", failure.error);
        summary.failed.push(failure.effect);
    }
    info!(effects = ?chain.names(), "chain ready");

    // Setup commands are not part of any frame.
    device.clear_commands();

    let bindings = TargetBindings::new();
    for _ in 0..options.frames {
        let report = chain
            .render(&ctx, &mut framebuffer, &bindings)
            .with_context(|| format!("rendering frame {}", ctx.frame()))?;
        debug!(
            frame = ctx.frame(),
            dispatched = ?report.dispatched,
            swaps = ?report.swaps,
            "frame done"
        );
        summary.draws += device.draw_count();
        summary.peak_commands = summary.peak_commands.max(device.command_count());
        device.clear_commands();
        ctx.advance_frame();
    }

    summary.frames = options.frames;
    summary.swaps = framebuffer.swap_count();
    Ok(summary)
}

fn run(options: &Options) -> anyhow::Result<()> {
    let config = config_for(options);
    let fs = file_system(options);

    if options.emit_glsl {
        return emit_glsl(fs.as_ref());
    }

    let summary = render_headless(&config, options, fs.as_ref())?;
    info!(
        frames = summary.frames,
        draws = summary.draws,
        swaps = summary.swaps,
        failed = summary.failed.len(),
        peak_commands = summary.peak_commands,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxring_core::MemoryFileSystem;

    fn options(args: &[&str]) -> Options {
        Options::parse(args.iter().map(|s| s.to_string())).unwrap()
    }

    fn small() -> FxConfig {
        FxConfig {
            width: 32,
            height: 16,
            attachment_count: 3,
            ..FxConfig::default()
        }
    }

    #[test]
    fn full_stack_draws_every_effect_each_frame() {
        let summary =
            render_headless(&small(), &options(&["--frames", "4"]), &assets::builtin()).unwrap();
        assert_eq!(summary.draws, 16);
        // The depth overlay does not swap.
        assert_eq!(summary.swaps, 12);
        assert!(summary.failed.is_empty());
    }

    #[test]
    fn command_log_is_bounded_by_one_frame() {
        let short = render_headless(&small(), &options(&["--frames", "2"]), &assets::builtin()).unwrap();
        let long = render_headless(&small(), &options(&["--frames", "40"]), &assets::builtin()).unwrap();
        assert!(short.peak_commands > 0);
        assert_eq!(short.peak_commands, long.peak_commands);
        assert_eq!(long.draws, 160);
    }

    #[test]
    fn disabled_effects_are_skipped() {
        let opts = options(&["--frames", "2", "--disable", "Invert", "--disable", "depth overlay"]);
        let summary = render_headless(&small(), &opts, &assets::builtin()).unwrap();
        assert_eq!(summary.draws, 4);
        assert_eq!(summary.swaps, 4);
    }

    #[test]
    fn missing_shader_disables_only_that_effect() {
        let mut fs = MemoryFileSystem::new();
        for (path, source) in assets::SHADERS.iter().filter(|(p, _)| *p != "blur.frag") {
            fs.insert(*path, *source);
        }
        let summary = render_headless(&small(), &options(&["--frames", "1"]), &fs).unwrap();
        assert_eq!(summary.failed, vec!["Box Blur".to_string()]);
        assert_eq!(summary.draws, 3);
    }

    #[test]
    fn command_line_overrides_environment_config() {
        let config = config_for(&options(&["--width", "100", "--slots", "4", "--strict"]));
        assert_eq!(config.width, 100);
        assert_eq!(config.ring_slots, 4);
        assert!(config.strict_bindings);
        assert_eq!(config.attachment_count, 3);
    }

    #[test]
    fn builtin_wgsl_transpiles() {
        assert!(emit_glsl(&assets::builtin()).is_ok());
    }

    #[test]
    fn invert_binds_by_the_names_the_pass_uses() {
        let (_, source) = assets::SHADERS
            .iter()
            .find(|(path, _)| *path == "invert.wgsl")
            .unwrap();
        let stage = wgsl_to_glsl(
            "invert",
            source,
            fxring::fullscreen::WGSL_FRAGMENT_ENTRY,
            ShaderStage::Fragment,
            GlslVersion::Glsl330,
        )
        .unwrap();
        assert!(stage.renames.contains_key(fxring::fullscreen::SETTINGS_BLOCK));
        assert!(stage
            .renames
            .contains_key(&fxring::fullscreen::sampler_name(fxring::GBuffer::COLOR)));
    }
}
