//! Program cache fingerprints.

use std::fmt;

use mosaic_core::hash::FingerprintHasher;
use mosaic_core::{Capabilities, TargetLanguage};
use mosaic_features::RenderState;

/// xxh3 digest of a composition request.
///
/// Covers the ordered `(type name, configuration hash)` sequence, its length,
/// the target language and the device capabilities. Equal fingerprints are a
/// lookup hint only; the cache always confirms with full equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    #[must_use]
    pub fn compute(render_state: &RenderState, language: TargetLanguage, capabilities: &Capabilities) -> Self {
        let mut hasher = FingerprintHasher::new();
        hasher.write(&render_state.len());
        for (type_name, hash) in render_state.composition() {
            hasher.write(type_name).write(&hash);
        }
        hasher.write(&language).write(capabilities);
        Self(hasher.finish())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
