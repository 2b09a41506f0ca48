//! Program cache tests
//!
//! Tests for:
//! - Full-equality verification on fingerprint matches
//! - Identical requests with non-finite or ignored configuration fields
//! - Hits not re-running features
//! - Failed assemblies leaving the cache untouched
//! - Concurrent requests for one composition

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mosaic::core::{Capabilities, ShaderError, TargetLanguage};
use mosaic::features::{
    ColourFeature, FogConfig, FogFeature, FogMode, HardwareSkinning, RenderState, SkinningConfig, SkinningTechnique,
    SubRenderState, TextureBlend, TextureUnit, TexturingConfig, TexturingFeature, TransformFeature,
};
use mosaic::generator::{Fingerprint, GeneratorSettings, ProgramCache, ShaderGenerator};
use mosaic::program::ProgramSet;

// ============================================================================
// Test Feature
// ============================================================================

/// Does nothing, reports a constant hash and counts parameter resolutions.
#[derive(Debug, Clone)]
struct Probe {
    tint: u32,
    resolutions: Arc<AtomicUsize>,
}

impl Probe {
    fn new(tint: u32, resolutions: &Arc<AtomicUsize>) -> Self {
        Self {
            tint,
            resolutions: Arc::clone(resolutions),
        }
    }
}

impl SubRenderState for Probe {
    fn type_name(&self) -> &'static str {
        "Test_Probe"
    }

    fn execution_order(&self) -> i32 {
        900
    }

    fn hash_code(&self) -> u64 {
        7
    }

    fn resolve_parameters(&mut self, _programs: &mut ProgramSet) -> mosaic::Result<()> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn resolve_dependencies(&mut self, _programs: &mut ProgramSet) -> mosaic::Result<()> {
        Ok(())
    }

    fn add_function_invocations(&mut self, _programs: &mut ProgramSet) -> mosaic::Result<()> {
        Ok(())
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) {
        if let Some(other) = other.as_any().downcast_ref::<Self>() {
            self.tint = other.tint;
        }
    }

    fn config_eq(&self, other: &dyn SubRenderState) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| o.tint == self.tint)
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn probed_state(tint: u32, resolutions: &Arc<AtomicUsize>) -> RenderState {
    let mut rs = RenderState::new();
    rs.add(Box::new(TransformFeature::default())).unwrap();
    rs.add(Box::new(ColourFeature::default())).unwrap();
    rs.add(Box::new(Probe::new(tint, resolutions))).unwrap();
    rs
}

// ============================================================================
// Correctness
// ============================================================================

#[test]
fn equal_fingerprints_with_different_configs_are_not_reused() {
    let resolutions = Arc::new(AtomicUsize::new(0));
    let a = probed_state(1, &resolutions);
    let b = probed_state(2, &resolutions);
    let caps = Capabilities::default();

    assert_eq!(
        Fingerprint::compute(&a, TargetLanguage::Glsl, &caps),
        Fingerprint::compute(&b, TargetLanguage::Glsl, &caps)
    );

    let cache = ProgramCache::new();
    cache.get_or_create(&a, TargetLanguage::Glsl, &caps).unwrap();
    let err = cache.get_or_create(&b, TargetLanguage::Glsl, &caps).unwrap_err();
    assert!(matches!(err, ShaderError::FingerprintCollision { .. }));

    // the original entry is still served
    assert!(cache.get_or_create(&a, TargetLanguage::Glsl, &caps).is_ok());
}

#[test]
fn cache_hit_does_not_run_features_again() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let resolutions = Arc::new(AtomicUsize::new(0));
    let rs = probed_state(3, &resolutions);
    let generator = ShaderGenerator::new(GeneratorSettings {
        dump_source: true,
        ..GeneratorSettings::default()
    });

    let first = generator.generate(&rs)?;
    assert_eq!(resolutions.load(Ordering::SeqCst), 1);

    for _ in 0..5 {
        let again = generator.generate(&rs)?;
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(resolutions.load(Ordering::SeqCst), 1);
    assert_eq!(generator.cache().stats().hits, 5);
    Ok(())
}

#[test]
fn failed_assembly_registers_nothing() {
    let mut rs = RenderState::new();
    rs.add(Box::new(TransformFeature::default())).unwrap();
    rs.add(Box::new(ColourFeature::default())).unwrap();
    rs.add(Box::new(TexturingFeature::new(TexturingConfig {
        units: vec![
            TextureUnit {
                texcoord_index: 0,
                blend: TextureBlend::Modulate,
            };
            9
        ],
    })))
    .unwrap();

    let cache = ProgramCache::new();
    let caps = Capabilities::default();
    assert!(
        cache
            .get_or_create(&rs, TargetLanguage::Glsl, &caps)
            .unwrap_err()
            .is_resolution_failure()
    );
    assert!(cache.is_empty());

    // the slot stays usable for a later attempt
    let fp = Fingerprint::compute(&rs, TargetLanguage::Glsl, &caps);
    assert!(cache.get(fp).is_none());
}

#[test]
fn cached_entry_keeps_an_unresolved_composition() {
    let resolutions = Arc::new(AtomicUsize::new(0));
    let rs = probed_state(4, &resolutions);
    let cache = ProgramCache::new();
    let entry = cache
        .get_or_create(&rs, TargetLanguage::Hlsl, &Capabilities::default())
        .unwrap();

    assert_eq!(entry.composition, rs);
    assert_eq!(entry.language, TargetLanguage::Hlsl);
    assert!(!entry.vertex.uniforms.is_empty());
    assert_ne!(entry.vertex.source_hash, entry.fragment.source_hash);
}

#[test]
fn nan_fog_density_is_served_from_the_cache() {
    let mut rs = RenderState::new();
    rs.add(Box::new(TransformFeature::default())).unwrap();
    rs.add(Box::new(ColourFeature::default())).unwrap();
    rs.add(Box::new(FogFeature::new(FogConfig {
        mode: FogMode::Exp,
        density: f32::NAN,
        ..FogConfig::default()
    })))
    .unwrap();

    let cache = ProgramCache::new();
    let caps = Capabilities::default();
    let first = cache.get_or_create(&rs, TargetLanguage::Glsl, &caps).unwrap();
    let second = cache.get_or_create(&rs.clone(), TargetLanguage::Glsl, &caps).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn rigid_skinning_fallbacks_share_an_entry() {
    let skinned = |bones, weights| {
        let mut rs = RenderState::new();
        rs.add(Box::new(HardwareSkinning::new(SkinningConfig::new(
            SkinningTechnique::Linear,
            bones,
            weights,
        ))))
        .unwrap();
        rs.add(Box::new(ColourFeature::default())).unwrap();
        rs
    };

    let cache = ProgramCache::new();
    let caps = Capabilities::default();
    let a = cache.get_or_create(&skinned(0, 2), TargetLanguage::Glsl, &caps).unwrap();
    let b = cache.get_or_create(&skinned(30, 0), TargetLanguage::Glsl, &caps).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_requests_assemble_once() {
    let resolutions = Arc::new(AtomicUsize::new(0));
    let rs = probed_state(5, &resolutions);
    let cache = ProgramCache::new();
    let caps = Capabilities::default();

    let entries: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| cache.get_or_create(&rs, TargetLanguage::Glsl, &caps).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(resolutions.load(Ordering::SeqCst), 1);
    assert!(entries.iter().all(|e| Arc::ptr_eq(e, &entries[0])));
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 7);
    assert_eq!(stats.entries, 1);
}

#[test]
fn colliding_requests_keep_a_single_entry() {
    let resolutions = Arc::new(AtomicUsize::new(0));
    let states: Vec<_> = (10..14).map(|tint| probed_state(tint, &resolutions)).collect();
    let cache = ProgramCache::new();
    let caps = Capabilities::default();

    std::thread::scope(|s| {
        for rs in &states {
            let cache = &cache;
            let caps = &caps;
            s.spawn(move || {
                // equal fingerprints: the first one assembles, the rest collide
                let _ = cache.get_or_create(rs, TargetLanguage::Glsl, caps);
            });
        }
    });

    assert_eq!(cache.len(), 1);
    assert_eq!(resolutions.load(Ordering::SeqCst), 1);
}
