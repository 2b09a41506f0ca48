//! Program Cache
//!
//! Maps a [`Fingerprint`] to the program pair assembled for it.
//!
//! # Correctness
//!
//! A fingerprint match is never trusted on its own: every hit compares the
//! stored composition, language and capabilities with the request. A mismatch
//! is a hash collision and is reported as
//! [`ShaderError::FingerprintCollision`] rather than served.
//!
//! # Concurrency
//!
//! The fingerprint map sits behind a mutex held only long enough to fetch or
//! create the fingerprint's slot. Each slot has its own mutex, held for the
//! duration of an assembly, so concurrent requests for the same composition
//! wait for the first one instead of assembling twice while different
//! compositions assemble in parallel. A failed assembly drops its slot unless
//! another request is already waiting on it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mosaic_core::hash::source_hash;
use mosaic_core::{Capabilities, Result, ShaderError, TargetLanguage};
use mosaic_features::RenderState;
use mosaic_program::UniformBinding;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::assembler::{AssembledProgram, ProgramAssembler};
use crate::cache_key::Fingerprint;

// ─── Entries ─────────────────────────────────────────────────────────────────

/// Emitted source of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramSource {
    pub source: String,
    pub uniforms: Vec<UniformBinding>,
    /// xxh3-128 of `source`.
    pub source_hash: u128,
}

/// Immutable cache entry.
#[derive(Debug)]
pub struct CachedProgramSet {
    pub fingerprint: Fingerprint,
    pub language: TargetLanguage,
    pub capabilities: Capabilities,
    /// Unresolved copy of the composition the entry was built from.
    pub composition: RenderState,
    pub vertex: ProgramSource,
    pub fragment: ProgramSource,
}

impl CachedProgramSet {
    #[must_use]
    pub fn from_assembled(
        fingerprint: Fingerprint,
        composition: RenderState,
        capabilities: Capabilities,
        assembled: AssembledProgram,
    ) -> Self {
        let AssembledProgram {
            program_set,
            vertex_source,
            fragment_source,
        } = assembled;
        Self {
            fingerprint,
            language: program_set.language(),
            capabilities,
            composition,
            vertex: ProgramSource {
                source_hash: source_hash(&vertex_source),
                uniforms: program_set.vertex().uniform_bindings(),
                source: vertex_source,
            },
            fragment: ProgramSource {
                source_hash: source_hash(&fragment_source),
                uniforms: program_set.fragment().uniform_bindings(),
                source: fragment_source,
            },
        }
    }

    /// Full equality with a request.
    #[must_use]
    pub fn matches(&self, render_state: &RenderState, language: TargetLanguage, capabilities: &Capabilities) -> bool {
        self.language == language && self.capabilities == *capabilities && self.composition == *render_state
    }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

// ─── Program Cache ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Slot {
    entry: Mutex<Option<Arc<CachedProgramSet>>>,
}

#[derive(Default)]
pub struct ProgramCache {
    slots: Mutex<FxHashMap<Fingerprint, Arc<Slot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached program pair for the request, assembling it on a miss.
    pub fn get_or_create(
        &self,
        render_state: &RenderState,
        language: TargetLanguage,
        capabilities: &Capabilities,
    ) -> Result<Arc<CachedProgramSet>> {
        let fingerprint = Fingerprint::compute(render_state, language, capabilities);
        self.get_or_create_with(fingerprint, render_state, language, capabilities)
    }

    /// Same as [`get_or_create`](Self::get_or_create) with a caller-supplied
    /// fingerprint.
    pub fn get_or_create_with(
        &self,
        fingerprint: Fingerprint,
        render_state: &RenderState,
        language: TargetLanguage,
        capabilities: &Capabilities,
    ) -> Result<Arc<CachedProgramSet>> {
        let slot = self.slots.lock().entry(fingerprint).or_default().clone();
        let mut entry = slot.entry.lock();

        if let Some(cached) = entry.as_ref() {
            if cached.matches(render_state, language, capabilities) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Program cache hit {fingerprint}");
                return Ok(Arc::clone(cached));
            }
            log::error!(
                "Fingerprint collision on {fingerprint}: cached [{}] vs requested [{}]",
                describe(&cached.composition),
                describe(render_state)
            );
            return Err(ShaderError::FingerprintCollision {
                fingerprint: fingerprint.0,
            });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Program cache miss {fingerprint}, assembling");

        let assembled = match ProgramAssembler::assemble(render_state, language, capabilities) {
            Ok(assembled) => assembled,
            Err(e) => {
                drop(entry);
                self.release_empty_slot(fingerprint, &slot);
                return Err(e);
            }
        };
        let cached = Arc::new(CachedProgramSet::from_assembled(
            fingerprint,
            render_state.clone(),
            *capabilities,
            assembled,
        ));
        *entry = Some(Arc::clone(&cached));
        Ok(cached)
    }

    /// Removes a slot whose assembly failed, if nobody else holds it. A
    /// waiting request keeps it alive and retries the assembly itself.
    fn release_empty_slot(&self, fingerprint: Fingerprint, slot: &Arc<Slot>) {
        let mut slots = self.slots.lock();
        // map + caller
        if slots
            .get(&fingerprint)
            .is_some_and(|s| Arc::ptr_eq(s, slot) && Arc::strong_count(s) == 2)
        {
            slots.remove(&fingerprint);
        }
    }

    /// Looks up an entry without assembling.
    #[must_use]
    pub fn get(&self, fingerprint: Fingerprint) -> Option<Arc<CachedProgramSet>> {
        let slot = self.slots.lock().get(&fingerprint).cloned()?;
        let entry = slot.entry.lock();
        entry.clone()
    }

    /// Number of assembled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<_> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|s| s.entry.lock().is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

fn describe(render_state: &RenderState) -> String {
    render_state
        .iter()
        .map(|s| s.type_name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_features::{ColourFeature, FogConfig, FogFeature, FogMode, TransformFeature};

    fn composition(fog_density: Option<f32>) -> RenderState {
        let mut rs = RenderState::new();
        rs.add(Box::new(TransformFeature::default())).unwrap();
        rs.add(Box::new(ColourFeature::default())).unwrap();
        if let Some(density) = fog_density {
            let config = FogConfig {
                mode: FogMode::Exp,
                density,
                ..Default::default()
            };
            rs.add(Box::new(FogFeature::new(config))).unwrap();
        }
        rs
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = ProgramCache::new();
        let caps = Capabilities::default();
        let rs = composition(None);

        let first = cache.get_or_create(&rs, TargetLanguage::Glsl, &caps).unwrap();
        let second = cache.get_or_create(&rs, TargetLanguage::Glsl, &caps).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
        assert!(cache.get(first.fingerprint).is_some());
    }

    #[test]
    fn test_forced_collision_is_reported() {
        let cache = ProgramCache::new();
        let caps = Capabilities::default();
        let fp = Fingerprint(42);

        cache
            .get_or_create_with(fp, &composition(Some(0.01)), TargetLanguage::Glsl, &caps)
            .unwrap();
        let err = cache
            .get_or_create_with(fp, &composition(Some(0.02)), TargetLanguage::Glsl, &caps)
            .unwrap_err();

        assert!(matches!(err, ShaderError::FingerprintCollision { fingerprint: 42 }));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_language_is_part_of_identity() {
        let cache = ProgramCache::new();
        let caps = Capabilities::default();
        let rs = composition(None);

        let glsl = cache.get_or_create(&rs, TargetLanguage::Glsl, &caps).unwrap();
        let hlsl = cache.get_or_create(&rs, TargetLanguage::Hlsl, &caps).unwrap();

        assert_ne!(glsl.fingerprint, hlsl.fingerprint);
        assert_ne!(glsl.vertex.source_hash, hlsl.vertex.source_hash);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_assembly_leaves_no_entry() {
        let cache = ProgramCache::new();
        let empty = RenderState::new();

        assert!(cache.get_or_create(&empty, TargetLanguage::Glsl, &Capabilities::default()).is_err());
        assert!(cache.is_empty());
        assert!(cache.slots.lock().is_empty());

        // distinct failing compositions do not accumulate slots
        for lang in [TargetLanguage::GlslEs, TargetLanguage::Hlsl] {
            assert!(cache.get_or_create(&empty, lang, &Capabilities::default()).is_err());
        }
        assert!(cache.slots.lock().is_empty());

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
