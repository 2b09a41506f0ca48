//! Global String Interner
//!
//! Function names and library dependency names are repeated across every
//! program the composer assembles. They are interned once and handled as
//! compact [`Symbol`]s afterwards, so invocations stay `Copy`-cheap to compare
//! and hash.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier of an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if it was seen before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the names of the built-in shader libraries and the functions
/// most features call, keeping interning off the assembly hot path.
pub fn preload_library_names(names: &[&str]) {
    for name in names {
        intern(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let s1 = intern("FFP_Transform");
        let s2 = intern("FFP_Transform");
        let s3 = intern("FFP_Assign");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);

        assert_eq!(resolve(s1), "FFP_Transform");
        assert_eq!(resolve(s3), "FFP_Assign");
    }

    #[test]
    fn test_get() {
        let _ = intern("SGXLib_DualQuaternion");

        assert!(get("SGXLib_DualQuaternion").is_some());
        assert!(get("never_interned_name").is_none());
    }
}
