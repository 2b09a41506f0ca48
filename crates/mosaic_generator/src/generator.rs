//! Shader generator facade.

use std::sync::Arc;

use mosaic_core::Result;
use mosaic_features::{FactoryRegistry, PassContext, RenderState, SubRenderState, global_registry};
use mosaic_program::library;

use crate::assembler::ProgramAssembler;
use crate::cache::{CachedProgramSet, ProgramCache};
use crate::cache_key::Fingerprint;
use crate::settings::GeneratorSettings;

/// Entry point for building programs: creates features through a factory
/// registry, composes them per pass and serves programs through the cache.
pub struct ShaderGenerator<'r> {
    settings: GeneratorSettings,
    registry: &'r FactoryRegistry,
    cache: ProgramCache,
}

impl ShaderGenerator<'static> {
    /// A generator backed by the process-wide registry.
    #[must_use]
    pub fn new(settings: GeneratorSettings) -> Self {
        Self::with_registry(settings, global_registry())
    }
}

impl<'r> ShaderGenerator<'r> {
    #[must_use]
    pub fn with_registry(settings: GeneratorSettings, registry: &'r FactoryRegistry) -> Self {
        library::preload();
        Self {
            settings,
            registry,
            cache: ProgramCache::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    #[must_use]
    pub fn registry(&self) -> &FactoryRegistry {
        self.registry
    }

    #[must_use]
    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    pub fn create_sub_render_state(&self, type_name: &str) -> Result<Box<dyn SubRenderState>> {
        self.registry.create_instance(type_name)
    }

    /// Builds the render state of a pass from default-configured features,
    /// letting each one opt out through its pass hook.
    pub fn render_state_for_pass(&self, type_names: &[&str], pass: &PassContext) -> Result<RenderState> {
        let mut render_state = RenderState::new();
        for name in type_names {
            let state = self.registry.create_instance(name)?;
            render_state.add_for_pass(state, pass, &self.settings.capabilities)?;
        }
        Ok(render_state)
    }

    /// Returns the program pair for `render_state` in the configured language.
    pub fn generate(&self, render_state: &RenderState) -> Result<Arc<CachedProgramSet>> {
        let language = self.settings.language;
        let caps = &self.settings.capabilities;

        let programs = if self.settings.cache_enabled {
            self.cache.get_or_create(render_state, language, caps)?
        } else {
            let assembled = ProgramAssembler::assemble(render_state, language, caps)?;
            Arc::new(CachedProgramSet::from_assembled(
                Fingerprint::compute(render_state, language, caps),
                render_state.clone(),
                *caps,
                assembled,
            ))
        };

        if self.settings.dump_source {
            log::debug!(
                "================= Generated Program {} ==================\n{}\n{}",
                programs.fingerprint,
                programs.vertex.source,
                programs.fragment.source
            );
        }
        Ok(programs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_features::{ColourFeature, FogFeature, FogMode, FogSettings, TransformFeature};

    fn basic_types() -> [&'static str; 2] {
        [TransformFeature::TYPE_NAME, ColourFeature::TYPE_NAME]
    }

    #[test]
    fn test_generate_reuses_cached_entry() {
        let generator = ShaderGenerator::new(GeneratorSettings::default());
        let rs = generator
            .render_state_for_pass(&basic_types(), &PassContext::default())
            .unwrap();

        let a = generator.generate(&rs).unwrap();
        let b = generator.generate(&rs).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(generator.cache().stats().hits, 1);
        assert_eq!(generator.cache().stats().misses, 1);
    }

    #[test]
    fn test_generate_without_cache() {
        let settings = GeneratorSettings {
            cache_enabled: false,
            ..Default::default()
        };
        let generator = ShaderGenerator::new(settings);
        let rs = generator
            .render_state_for_pass(&basic_types(), &PassContext::default())
            .unwrap();

        let a = generator.generate(&rs).unwrap();
        let b = generator.generate(&rs).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.vertex.source, b.vertex.source);
        assert!(generator.cache().is_empty());
    }

    #[test]
    fn test_pass_without_fog_drops_fog_feature() {
        let generator = ShaderGenerator::new(GeneratorSettings::default());
        let types = [TransformFeature::TYPE_NAME, ColourFeature::TYPE_NAME, FogFeature::TYPE_NAME];

        let rs = generator.render_state_for_pass(&types, &PassContext::default()).unwrap();
        assert!(!rs.contains(FogFeature::TYPE_NAME));

        let pass = PassContext {
            fog: Some(FogSettings {
                mode: FogMode::Exp,
                ..Default::default()
            }),
            ..Default::default()
        };
        let rs = generator.render_state_for_pass(&types, &pass).unwrap();
        assert!(rs.contains(FogFeature::TYPE_NAME));
        assert!(generator.generate(&rs).is_ok());
    }

    #[test]
    fn test_unknown_type_name_is_rejected() {
        let generator = ShaderGenerator::new(GeneratorSettings::default());
        assert!(matches!(
            generator.create_sub_render_state("FFP_DoesNotExist"),
            Err(mosaic_core::ShaderError::UnknownSubRenderState(_))
        ));
    }
}
