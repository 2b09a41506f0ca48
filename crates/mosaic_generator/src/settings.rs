//! Generator configuration.

use mosaic_core::{Capabilities, TargetLanguage};

/// Configuration of a [`ShaderGenerator`](crate::ShaderGenerator).
///
/// | Field           | Description                                        | Default              |
/// |-----------------|----------------------------------------------------|----------------------|
/// | `language`      | Shading language programs are emitted in           | GLSL 1.50            |
/// | `capabilities`  | Device limits and optional features                | [`Capabilities::default`] |
/// | `cache_enabled` | Reuse assembled programs through the program cache | `true`               |
/// | `dump_source`   | Log every newly assembled source at debug level    | `false`              |
///
/// ```rust,ignore
/// use mosaic::generator::GeneratorSettings;
/// use mosaic::core::{Capabilities, TargetLanguage};
///
/// let settings = GeneratorSettings {
///     language: TargetLanguage::GlslEs,
///     capabilities: Capabilities::for_language(TargetLanguage::GlslEs),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    pub language: TargetLanguage,
    pub capabilities: Capabilities,
    pub cache_enabled: bool,
    pub dump_source: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            language: TargetLanguage::Glsl,
            capabilities: Capabilities::default(),
            cache_enabled: true,
            dump_source: false,
        }
    }
}

impl GeneratorSettings {
    /// Settings targeting `language` with its conservative capabilities.
    #[must_use]
    pub fn for_language(language: TargetLanguage) -> Self {
        Self {
            language,
            capabilities: Capabilities::for_language(language),
            ..Self::default()
        }
    }
}
