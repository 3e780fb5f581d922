//! Hash/equality capability the dict is generic over.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Per-key-type hash and equality, supplied by the embedding runtime.
///
/// The dict calls `hash` once per key on insertion and stores the result;
/// it never re-hashes a stored key. `eq` is only called on candidates
/// whose stored hash already matches.
pub trait KeyOps<K: ?Sized> {
    fn hash(&self, key: &K) -> u64;
    fn eq(&self, a: &K, b: &K) -> bool;
}

/// `KeyOps` for ordinary Rust keys: `Hash + Eq` with a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct StdKeyOps<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> StdKeyOps<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<K, S> KeyOps<K> for StdKeyOps<S>
where
    K: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn eq(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: equal keys hash equally under the default adapter.
    #[test]
    fn std_ops_hash_agrees_with_eq() {
        let ops = StdKeyOps::<DefaultHashBuilder>::default();
        let a = "spam".to_string();
        let b = "spam".to_string();
        assert!(KeyOps::<String>::eq(&ops, &a, &b));
        assert_eq!(KeyOps::<String>::hash(&ops, &a), KeyOps::<String>::hash(&ops, &b));
        assert!(!KeyOps::<String>::eq(&ops, &a, &"eggs".to_string()));
    }

    /// Invariant: a caller-defined capability can fold keys (here ASCII case).
    #[test]
    fn custom_ops_fold_case() {
        struct CaseFold;
        impl KeyOps<str> for CaseFold {
            fn hash(&self, key: &str) -> u64 {
                key.bytes()
                    .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(b.to_ascii_lowercase() as u64))
            }
            fn eq(&self, a: &str, b: &str) -> bool {
                a.eq_ignore_ascii_case(b)
            }
        }
        assert!(CaseFold.eq("Key", "kEY"));
        assert_eq!(CaseFold.hash("Key"), CaseFold.hash("KEY"));
    }
}
