/// Texture roles and role-mask classification.
///
/// A texture's semantic role decides how its pixels are interpreted by the
/// shading code and which GPU pixel format it is uploaded with. Roles come
/// from a closed vocabulary of eight primitive roles, each owning one bit of
/// a `RoleMask`, plus two packed composites formed by OR-ing primitive bits:
///
/// - **RM**: Roughness | Metalness
/// - **RMAO**: Roughness | Metalness | AmbientOcclusion
///
/// Raw masks are only an interchange format. Everything past `classify` works
/// with the tagged `TextureRole`, so a mask that merely looks plausible
/// (e.g. Roughness | AmbientOcclusion) can never reach the loader or packer.

use std::fmt;
use bitflags::bitflags;
use crate::error::{Error, Result};

bitflags! {
    /// Raw role bitmask, as stored in material files and editor data
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoleMask: u8 {
        const ALBEDO            = 0b0000_0001;
        const NORMAL            = 0b0000_0010;
        const ROUGHNESS         = 0b0000_0100;
        const METALNESS         = 0b0000_1000;
        const AMBIENT_OCCLUSION = 0b0001_0000;
        const EMISSION          = 0b0010_0000;
        const HEIGHT            = 0b0100_0000;
        const OPACITY           = 0b1000_0000;

        const RM   = Self::ROUGHNESS.bits() | Self::METALNESS.bits();
        const RMAO = Self::ROUGHNESS.bits() | Self::METALNESS.bits() | Self::AMBIENT_OCCLUSION.bits();
    }
}

// ===== PRIMITIVE ROLES =====

/// One semantic channel of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveRole {
    Albedo,
    Normal,
    Roughness,
    Metalness,
    AmbientOcclusion,
    Emission,
    Height,
    Opacity,
}

impl PrimitiveRole {
    /// Size of the primitive vocabulary
    pub const COUNT: usize = 8;

    /// Every primitive role, in bit order
    pub const ALL: [PrimitiveRole; Self::COUNT] = [
        PrimitiveRole::Albedo,
        PrimitiveRole::Normal,
        PrimitiveRole::Roughness,
        PrimitiveRole::Metalness,
        PrimitiveRole::AmbientOcclusion,
        PrimitiveRole::Emission,
        PrimitiveRole::Height,
        PrimitiveRole::Opacity,
    ];

    /// The single mask bit owned by this role
    pub fn mask(self) -> RoleMask {
        match self {
            PrimitiveRole::Albedo => RoleMask::ALBEDO,
            PrimitiveRole::Normal => RoleMask::NORMAL,
            PrimitiveRole::Roughness => RoleMask::ROUGHNESS,
            PrimitiveRole::Metalness => RoleMask::METALNESS,
            PrimitiveRole::AmbientOcclusion => RoleMask::AMBIENT_OCCLUSION,
            PrimitiveRole::Emission => RoleMask::EMISSION,
            PrimitiveRole::Height => RoleMask::HEIGHT,
            PrimitiveRole::Opacity => RoleMask::OPACITY,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveRole::Albedo => "Albedo",
            PrimitiveRole::Normal => "Normal",
            PrimitiveRole::Roughness => "Roughness",
            PrimitiveRole::Metalness => "Metalness",
            PrimitiveRole::AmbientOcclusion => "AmbientOcclusion",
            PrimitiveRole::Emission => "Emission",
            PrimitiveRole::Height => "Height",
            PrimitiveRole::Opacity => "Opacity",
        }
    }
}

// ===== COMPOSITE ROLES =====

/// Packed multi-channel layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CompositeKind {
    /// Roughness in R, Metalness in G
    Rm,
    /// Roughness in R, Metalness in G, AmbientOcclusion in B
    Rmao,
}

impl CompositeKind {
    pub fn mask(self) -> RoleMask {
        match self {
            CompositeKind::Rm => RoleMask::RM,
            CompositeKind::Rmao => RoleMask::RMAO,
        }
    }

    /// Primitive roles that must be supplied to pack this layout
    pub fn constituents(self) -> &'static [PrimitiveRole] {
        match self {
            CompositeKind::Rm => &[PrimitiveRole::Roughness, PrimitiveRole::Metalness],
            CompositeKind::Rmao => &[
                PrimitiveRole::Roughness,
                PrimitiveRole::Metalness,
                PrimitiveRole::AmbientOcclusion,
            ],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompositeKind::Rm => "RM",
            CompositeKind::Rmao => "RMAO",
        }
    }
}

// ===== TEXTURE ROLE =====

/// Color space the shading code expects a role's samples in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Perceptually encoded color (decoded to linear by the sampler)
    Srgb,
    /// Data stored as-is
    Linear,
}

/// Validated role of a texture: one primitive role or one recognized composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureRole {
    Primitive(PrimitiveRole),
    Composite(CompositeKind),
}

impl TextureRole {
    /// Number of usable roles (8 primitives + 2 composites)
    pub const COUNT: usize = PrimitiveRole::COUNT + 2;

    pub const ALBEDO: TextureRole = TextureRole::Primitive(PrimitiveRole::Albedo);
    pub const NORMAL: TextureRole = TextureRole::Primitive(PrimitiveRole::Normal);
    pub const ROUGHNESS: TextureRole = TextureRole::Primitive(PrimitiveRole::Roughness);
    pub const METALNESS: TextureRole = TextureRole::Primitive(PrimitiveRole::Metalness);
    pub const AMBIENT_OCCLUSION: TextureRole = TextureRole::Primitive(PrimitiveRole::AmbientOcclusion);
    pub const EMISSION: TextureRole = TextureRole::Primitive(PrimitiveRole::Emission);
    pub const HEIGHT: TextureRole = TextureRole::Primitive(PrimitiveRole::Height);
    pub const OPACITY: TextureRole = TextureRole::Primitive(PrimitiveRole::Opacity);
    pub const RM: TextureRole = TextureRole::Composite(CompositeKind::Rm);
    pub const RMAO: TextureRole = TextureRole::Composite(CompositeKind::Rmao);

    /// Every usable role
    pub const ALL: [TextureRole; Self::COUNT] = [
        Self::ALBEDO,
        Self::NORMAL,
        Self::ROUGHNESS,
        Self::METALNESS,
        Self::AMBIENT_OCCLUSION,
        Self::EMISSION,
        Self::HEIGHT,
        Self::OPACITY,
        Self::RM,
        Self::RMAO,
    ];

    /// Parse a raw mask, failing with `Error::Classification` unless it is valid
    pub fn from_mask(mask: RoleMask) -> Result<Self> {
        match classify(mask) {
            Classification::Primitive(role) => Ok(TextureRole::Primitive(role)),
            Classification::Composite(kind) => Ok(TextureRole::Composite(kind)),
            Classification::Invalid => Err(Error::Classification(mask.bits())),
        }
    }

    pub fn mask(self) -> RoleMask {
        match self {
            TextureRole::Primitive(role) => role.mask(),
            TextureRole::Composite(kind) => kind.mask(),
        }
    }

    pub fn is_composite(self) -> bool {
        matches!(self, TextureRole::Composite(_))
    }

    pub fn as_primitive(self) -> Option<PrimitiveRole> {
        match self {
            TextureRole::Primitive(role) => Some(role),
            TextureRole::Composite(_) => None,
        }
    }

    pub fn as_composite(self) -> Option<CompositeKind> {
        match self {
            TextureRole::Composite(kind) => Some(kind),
            TextureRole::Primitive(_) => None,
        }
    }

    /// Primitive roles packed into this role (empty for primitives)
    pub fn constituents(self) -> &'static [PrimitiveRole] {
        match self {
            TextureRole::Primitive(_) => &[],
            TextureRole::Composite(kind) => kind.constituents(),
        }
    }

    /// Albedo and Emission hold color; every other role holds data
    pub fn color_space(self) -> ColorSpace {
        match self {
            TextureRole::Primitive(PrimitiveRole::Albedo)
            | TextureRole::Primitive(PrimitiveRole::Emission) => ColorSpace::Srgb,
            _ => ColorSpace::Linear,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureRole::Primitive(role) => role.name(),
            TextureRole::Composite(kind) => kind.name(),
        }
    }
}

impl From<PrimitiveRole> for TextureRole {
    fn from(role: PrimitiveRole) -> Self {
        TextureRole::Primitive(role)
    }
}

impl From<CompositeKind> for TextureRole {
    fn from(kind: CompositeKind) -> Self {
        TextureRole::Composite(kind)
    }
}

impl fmt::Display for TextureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ===== CLASSIFIER =====

/// Result of classifying a raw role mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Zero, or a bit combination that is not a recognized composite
    Invalid,
    Primitive(PrimitiveRole),
    Composite(CompositeKind),
}

/// Classify a raw role mask
///
/// Valid masks are exactly one primitive bit, or exactly the RM or RMAO bit
/// patterns. Everything else is `Invalid`.
pub fn classify(mask: RoleMask) -> Classification {
    if mask == RoleMask::RM {
        return Classification::Composite(CompositeKind::Rm);
    }
    if mask == RoleMask::RMAO {
        return Classification::Composite(CompositeKind::Rmao);
    }
    if mask.bits().count_ones() != 1 {
        return Classification::Invalid;
    }
    PrimitiveRole::ALL
        .iter()
        .copied()
        .find(|role| role.mask() == mask)
        .map_or(Classification::Invalid, Classification::Primitive)
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
