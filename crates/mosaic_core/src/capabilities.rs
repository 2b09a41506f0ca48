//! Hardware capabilities supplied by the external capability-query collaborator.
//!
//! Capabilities take part in the program cache fingerprint: the same render
//! state assembled for two devices with different limits yields two cache
//! entries.

use bitflags::bitflags;

use crate::language::TargetLanguage;

bitflags! {
    /// Optional language / hardware features a program may rely on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u32 {
        /// `mat2x4` / `mat3x4` style matrix types (missing in GLSL ES 1.00).
        const NON_SQUARE_MATRICES     = 1 << 0;
        /// `highp` precision is available in the fragment stage.
        const HIGH_PRECISION_FRAGMENT = 1 << 1;
        /// Vertex attributes can carry integer blend indices.
        const INTEGER_ATTRIBUTES      = 1 << 2;
    }
}

/// Limits and feature flags of the target device.
///
/// | Field               | Description                                      | Default |
/// |---------------------|--------------------------------------------------|---------|
/// | `max_bone_count`    | Bones the skinning path may address              | 70      |
/// | `max_interpolants`  | Vertex → fragment varying slots                  | 8       |
/// | `max_texture_units` | Samplers available to the fragment program       | 8       |
/// | `flags`             | Optional features                                | all     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub max_bone_count: u16,
    pub max_interpolants: u8,
    pub max_texture_units: u8,
    pub flags: CapabilityFlags,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            max_bone_count: 70,
            max_interpolants: 8,
            max_texture_units: 8,
            flags: CapabilityFlags::all(),
        }
    }
}

impl Capabilities {
    /// Conservative defaults for a given language.
    ///
    /// GLSL ES 1.00 has neither non-square matrices nor integer attributes and
    /// only guarantees 8 varyings and 8 fragment samplers.
    #[must_use]
    pub fn for_language(language: TargetLanguage) -> Self {
        match language {
            TargetLanguage::GlslEs => Self {
                max_bone_count: 60,
                flags: CapabilityFlags::HIGH_PRECISION_FRAGMENT,
                ..Self::default()
            },
            TargetLanguage::Glsl | TargetLanguage::Hlsl => Self::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn supports(&self, flags: CapabilityFlags) -> bool {
        self.flags.contains(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glsles_lacks_non_square_matrices() {
        let caps = Capabilities::for_language(TargetLanguage::GlslEs);
        assert!(!caps.supports(CapabilityFlags::NON_SQUARE_MATRICES));
        assert!(Capabilities::default().supports(CapabilityFlags::NON_SQUARE_MATRICES));
    }
}
