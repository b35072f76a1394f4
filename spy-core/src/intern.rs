//! String interning shared by fully qualified names, symbol tables, and
//! error messages.
//!
//! Mirrors the teacher's `intern::Interns` table (identifiers and literals
//! are interned once, referenced everywhere by a small `Copy` id) but pared
//! down to the single string-interning concern the compiler core needs —
//! the teacher's bytes/long-int/ext-function interning tables have no
//! counterpart here.

use std::fmt;

use ahash::AHashMap;

/// Interned string id. Equality and hashing are by id, not content, so
/// comparing two identifiers is a single integer compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StrId(u32);

impl fmt::Display for StrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only string interner.
///
/// Interning is idempotent: interning the same text twice returns the same
/// id. The table only grows during module loading/compilation and is read
/// afterwards, matching the "write-only-during-initialization, read-only
/// afterwards" rule `spec.md` §5 places on the FQN registry.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, StrId>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> StrId {
        if let Some(id) = self.lookup.get(text) {
            return *id;
        }
        let id = StrId(self.strings.len() as u32);
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    /// Resolves an id back to its text.
    ///
    /// Panics only if called with an id from a different `Interner`, which
    /// is a programmer error (every id handed out by this interner is a
    /// valid index by construction).
    #[must_use]
    pub fn resolve(&self, id: StrId) -> &str {
        self.strings.get(id.0 as usize).map_or("<invalid-str-id>", |s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_text_twice_returns_same_id() {
        let mut interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_text_gets_distinct_ids() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "foo");
        assert_eq!(interner.resolve(b), "bar");
    }
}
