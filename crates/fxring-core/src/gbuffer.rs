//! Render-target tags.
//!
//! Every logical render target has a small integer tag. The same integer is
//! the default texture-unit binding slot, so effects can bind and sample a
//! target without an indirection table. Tags are identity, not ownership:
//! several tags may alias the same image over the lifetime of a chain.

use std::fmt;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// Closed, ordered set of render-target tags.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive, ToPrimitive,
)]
#[repr(u32)]
pub enum GBuffer {
    Albedo = 0,
    WorldSpace = 1,
    TextureCoordinate = 2,
    Normal = 3,
    Specular = 4,
    Emission = 5,
    Depth = 6,
    Velocity = 7,
    Roughness = 8,
    AmbientOcclusion = 9,
    Displacement = 10,
    Metallic = 11,
    SubSurface = 12,
    LightPass = 13,
    IntermediateTarget = 14,
    IntermediateTarget2 = 15,
}

impl GBuffer {
    /// The lit colour image. Shares ordinal 0 with [`GBuffer::Albedo`].
    pub const COLOR: GBuffer = GBuffer::Albedo;

    /// Number of tags.
    pub const COUNT: usize = 16;

    /// Every tag in ordinal order.
    pub const ALL: [GBuffer; Self::COUNT] = [
        GBuffer::Albedo,
        GBuffer::WorldSpace,
        GBuffer::TextureCoordinate,
        GBuffer::Normal,
        GBuffer::Specular,
        GBuffer::Emission,
        GBuffer::Depth,
        GBuffer::Velocity,
        GBuffer::Roughness,
        GBuffer::AmbientOcclusion,
        GBuffer::Displacement,
        GBuffer::Metallic,
        GBuffer::SubSurface,
        GBuffer::LightPass,
        GBuffer::IntermediateTarget,
        GBuffer::IntermediateTarget2,
    ];

    /// Texture unit this tag binds to. Identity on the ordinal.
    pub const fn binding_slot(self) -> u32 {
        self as u32
    }

    /// Inverse of [`GBuffer::binding_slot`].
    pub fn from_binding_slot(slot: u32) -> Option<GBuffer> {
        GBuffer::from_u32(slot)
    }

    pub const fn name(self) -> &'static str {
        match self {
            GBuffer::Albedo => "Albedo",
            GBuffer::WorldSpace => "WorldSpace",
            GBuffer::TextureCoordinate => "TextureCoordinate",
            GBuffer::Normal => "Normal",
            GBuffer::Specular => "Specular",
            GBuffer::Emission => "Emission",
            GBuffer::Depth => "Depth",
            GBuffer::Velocity => "Velocity",
            GBuffer::Roughness => "Roughness",
            GBuffer::AmbientOcclusion => "AmbientOcclusion",
            GBuffer::Displacement => "Displacement",
            GBuffer::Metallic => "Metallic",
            GBuffer::SubSurface => "SubSurface",
            GBuffer::LightPass => "LightPass",
            GBuffer::IntermediateTarget => "IntermediateTarget",
            GBuffer::IntermediateTarget2 => "IntermediateTarget2",
        }
    }
}

impl fmt::Display for GBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for GBuffer {
    type Error = u32;

    fn try_from(slot: u32) -> Result<Self, Self::Error> {
        GBuffer::from_binding_slot(slot).ok_or(slot)
    }
}
