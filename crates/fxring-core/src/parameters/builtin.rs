//! Parameters every effect exposes.

use once_cell::sync::Lazy;

use super::SimpleParamInfo;

/// Uniform blend parameter shared by all effects. Zero turns an effect off.
pub static INTENSITY: Lazy<SimpleParamInfo> = Lazy::new(|| SimpleParamInfo {
    name: "Intensity".to_string(),
    default: Some(1.0),
    min: Some(0.0),
    max: Some(1.0),
    display_name: None,
});
