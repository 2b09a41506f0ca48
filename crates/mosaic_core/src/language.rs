use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ShaderError;

/// Shading language a program set is emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    /// Desktop GLSL 1.50 (`#version 150`).
    #[default]
    Glsl,
    /// GLSL ES 1.00 (`#version 100`), the WebGL 1 / GLES2 dialect.
    GlslEs,
    /// HLSL shader model 3 style entry points.
    Hlsl,
}

impl TargetLanguage {
    /// Every supported language, in declaration order.
    pub const ALL: [Self; 3] = [Self::Glsl, Self::GlslEs, Self::Hlsl];

    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Glsl => "glsl",
            Self::GlslEs => "glsles",
            Self::Hlsl => "hlsl",
        }
    }

    /// Extension used for library includes (`#include "FFPLib_Common.glsl"`).
    #[inline]
    #[must_use]
    pub fn include_extension(self) -> &'static str {
        match self {
            Self::Glsl | Self::GlslEs => "glsl",
            Self::Hlsl => "hlsl",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_glsl_family(self) -> bool {
        matches!(self, Self::Glsl | Self::GlslEs)
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetLanguage {
    type Err = ShaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glsl" => Ok(Self::Glsl),
            "glsles" | "glsl_es" | "essl" => Ok(Self::GlslEs),
            "hlsl" => Ok(Self::Hlsl),
            other => Err(ShaderError::configuration(
                "target_language",
                format!("unknown shading language '{other}'"),
            )),
        }
    }
}
