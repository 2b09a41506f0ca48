//! Stable hashing helpers.
//!
//! Feature configuration hashes use `FxHasher` (cheap, deterministic across
//! runs). Cache fingerprints and emitted-source hashes use xxh3, which has a
//! much lower collision rate over the large key space of compositions.

use std::hash::{BuildHasher, Hash, Hasher};

use xxhash_rust::xxh3::{Xxh3, xxh3_128};

/// Compute a `u64` hash of any `Hash`-able value using `FxBuildHasher`.
#[inline]
pub fn fx_hash_key<K: Hash + ?Sized>(key: &K) -> u64 {
    rustc_hash::FxBuildHasher.hash_one(key)
}

/// Feeds an `f32` into a hasher by bit pattern.
///
/// `-0.0` and `0.0` hash differently; NaN payloads are hashed verbatim.
#[inline]
pub fn hash_f32<H: Hasher>(value: f32, state: &mut H) {
    value.to_bits().hash(state);
}

/// Feeds a slice of `f32` into a hasher by bit pattern.
#[inline]
pub fn hash_f32_slice<H: Hasher>(values: &[f32], state: &mut H) {
    for v in values {
        hash_f32(*v, state);
    }
}

/// Compares `f32` slices by bit pattern, matching [`hash_f32_slice`].
///
/// NaN equals an identical NaN, and `-0.0 != 0.0`.
#[inline]
#[must_use]
pub fn eq_f32_slice(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Incremental xxh3 builder for composite fingerprints.
#[derive(Default)]
pub struct FingerprintHasher {
    inner: Xxh3,
}

impl FingerprintHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    /// Mixes one more `Hash`-able component into the fingerprint.
    pub fn write<T: Hash + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.hash(&mut self.inner);
        self
    }

    #[must_use]
    pub fn finish(&self) -> u64 {
        self.inner.finish()
    }
}

/// xxh3-128 of emitted program text.
#[inline]
#[must_use]
pub fn source_hash(source: &str) -> u128 {
    xxh3_128(source.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_is_deterministic() {
        assert_eq!(fx_hash_key(&("FFP_Fog", 3u32)), fx_hash_key(&("FFP_Fog", 3u32)));
        assert_ne!(fx_hash_key(&("FFP_Fog", 3u32)), fx_hash_key(&("FFP_Fog", 4u32)));
    }

    #[test]
    fn test_fingerprint_order_matters() {
        let mut a = FingerprintHasher::new();
        a.write("A").write("B");
        let mut b = FingerprintHasher::new();
        b.write("B").write("A");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_hash_f32_distinguishes_values() {
        let mut h1 = rustc_hash::FxHasher::default();
        let mut h2 = rustc_hash::FxHasher::default();
        hash_f32(0.5, &mut h1);
        hash_f32(0.25, &mut h2);
        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_bitwise_equality_agrees_with_hash() {
        assert!(eq_f32_slice(&[f32::NAN, 1.0], &[f32::NAN, 1.0]));
        assert!(!eq_f32_slice(&[0.0], &[-0.0]));
        assert!(!eq_f32_slice(&[1.0], &[1.0, 2.0]));
    }
}
