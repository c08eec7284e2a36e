//! WGSL to GLSL transpilation through naga.

use std::collections::BTreeMap;

use fxring_core::{RenderError, RenderResult};
use fxring_device::ShaderStage;

use crate::glsl::GlslVersion;

fn to_naga(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

/// GLSL for one WGSL entry point.
///
/// naga names uniform blocks and combined samplers after their bind group
/// slots, so `renames` maps the WGSL names callers bind by to the generated
/// GLSL names: a uniform block is keyed by its struct type name (`Settings`),
/// a sampler by its texture variable name (`u_Albedo`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranspiledStage {
    pub source: String,
    pub renames: BTreeMap<String, String>,
}

impl TranspiledStage {
    /// GLSL name for `name`, or `name` itself when naga kept it.
    pub fn glsl_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.renames.get(name).map_or(name, String::as_str)
    }
}

/// Parse, validate and write `entry_point` of a WGSL module as GLSL.
pub fn wgsl_to_glsl(
    label: &str,
    source: &str,
    entry_point: &str,
    stage: ShaderStage,
    version: GlslVersion,
) -> RenderResult<TranspiledStage> {
    let fail = |message: String| RenderError::ShaderTranspile {
        label: label.to_string(),
        message,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| fail(format!("parse: {}", e.emit_to_string(source))))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| fail(format!("validation: {e}")))?;

    let options = naga::back::glsl::Options {
        version: version.to_naga(),
        writer_flags: naga::back::glsl::WriterFlags::empty(),
        binding_map: Default::default(),
        zero_initialize_workgroup_memory: true,
    };
    let pipeline = naga::back::glsl::PipelineOptions {
        shader_stage: to_naga(stage),
        entry_point: entry_point.to_string(),
        multiview: None,
    };

    let mut glsl = String::new();
    let reflection = {
        let mut writer = naga::back::glsl::Writer::new(
            &mut glsl,
            &module,
            &info,
            &options,
            &pipeline,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .map_err(|e| fail(format!("{entry_point}: {e}")))?;

        writer
            .write()
            .map_err(|e| fail(format!("{entry_point}: {e}")))?
    };

    let mut renames = BTreeMap::new();
    for (handle, block) in &reflection.uniforms {
        let var = &module.global_variables[*handle];
        if let Some(name) = &module.types[var.ty].name {
            renames.insert(name.clone(), block.clone());
        }
    }
    for (sampler, mapping) in &reflection.texture_mapping {
        if let Some(name) = &module.global_variables[mapping.texture].name {
            renames.insert(name.clone(), sampler.clone());
        }
    }

    Ok(TranspiledStage {
        source: glsl,
        renames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxring::fullscreen::{
        sampler_name, FULLSCREEN_VERTEX_WGSL, SETTINGS_BLOCK, WGSL_FRAGMENT_ENTRY,
        WGSL_VERTEX_ENTRY,
    };
    use fxring_core::GBuffer;

    const FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(1.0 - uv.x, 1.0 - uv.y, 0.0, 1.0);
}
"#;

    const SAMPLING_FRAGMENT: &str = r#"
struct Settings {
    intensity: f32,
    amount: f32,
    texel: vec2<f32>,
}

@group(0) @binding(0) var<uniform> settings: Settings;
@group(0) @binding(1) var u_Albedo: texture_2d<f32>;
@group(0) @binding(2) var albedo_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(u_Albedo, albedo_sampler, uv) * settings.intensity;
}
"#;

    /// Name declared by the first `<qualifier> vec2 <name>;` line.
    fn varying(glsl: &str, qualifier: &str) -> Option<String> {
        let needle = format!("{qualifier} vec2 ");
        glsl.lines().find_map(|line| {
            let rest = line.trim().split_once(&needle)?.1;
            Some(rest.trim_end_matches(';').trim().to_string())
        })
    }

    #[test]
    fn writes_requested_version() {
        let stage = wgsl_to_glsl("invert", FRAGMENT, "fs_main", ShaderStage::Fragment, GlslVersion::Glsl330)
            .unwrap();
        assert!(stage.source.starts_with("#version 330 core"), "{}", stage.source);
        assert!(stage.source.contains("void main()"));
        assert!(stage.renames.is_empty());
    }

    #[test]
    fn pass_names_resolve_to_generated_glsl() {
        let fragment = wgsl_to_glsl(
            "tint",
            SAMPLING_FRAGMENT,
            WGSL_FRAGMENT_ENTRY,
            ShaderStage::Fragment,
            GlslVersion::Glsl330,
        )
        .unwrap();

        let block = fragment.glsl_name(SETTINGS_BLOCK);
        assert_ne!(block, SETTINGS_BLOCK);
        assert!(fragment.source.contains(&format!("uniform {block}")), "{}", fragment.source);

        let albedo = sampler_name(GBuffer::Albedo);
        let sampler = fragment.glsl_name(&albedo);
        assert_ne!(sampler, albedo);
        assert!(fragment.source.contains(&format!("uniform sampler2D {sampler};")), "{}", fragment.source);
    }

    #[test]
    fn fullscreen_vertex_feeds_the_fragment_varying() {
        let vertex = wgsl_to_glsl(
            "fullscreen",
            FULLSCREEN_VERTEX_WGSL,
            WGSL_VERTEX_ENTRY,
            ShaderStage::Vertex,
            GlslVersion::Glsl330,
        )
        .unwrap();
        let fragment = wgsl_to_glsl(
            "tint",
            SAMPLING_FRAGMENT,
            WGSL_FRAGMENT_ENTRY,
            ShaderStage::Fragment,
            GlslVersion::Glsl330,
        )
        .unwrap();

        let input = varying(&fragment.source, "in").expect("fragment varying");
        let output = varying(&vertex.source, "out").expect("vertex varying");
        assert_eq!(input, output);
    }

    #[test]
    fn parse_errors_name_the_shader() {
        let err = wgsl_to_glsl("broken", "fn (", "fs_main", ShaderStage::Fragment, GlslVersion::Glsl330)
            .unwrap_err();
        match err {
            RenderError::ShaderTranspile { label, message } => {
                assert_eq!(label, "broken");
                assert!(message.starts_with("parse"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn unknown_entry_point_is_an_error() {
        let err = wgsl_to_glsl("invert", FRAGMENT, "main", ShaderStage::Fragment, GlslVersion::Glsl330);
        assert!(matches!(err, Err(RenderError::ShaderTranspile { .. })));
    }
}
