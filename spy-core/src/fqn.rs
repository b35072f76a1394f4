//! Fully qualified names and the global registry keyed by them.
//!
//! `spec.md` §3.1: an FQN is the identity of every global value (function,
//! type, constant). Equality is structural; there is a canonical string
//! form `mod::sym[k=v]#n`. Within one VM an FQN resolves to at most one
//! value — enforced here by `FqnRegistry::insert` refusing to overwrite an
//! existing entry.

use std::fmt;

use indexmap::IndexMap;

/// A `(key, value)` qualifier used for generic instantiations, e.g. the
/// `T=i32` in `stdlib::list[T=i32]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Qualifier {
    pub key: String,
    pub value: String,
}

/// Fully qualified name: the sole identity of a global value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqn {
    module: Vec<String>,
    symbol: String,
    qualifiers: Vec<Qualifier>,
    suffix: Option<u32>,
}

impl Fqn {
    #[must_use]
    pub fn new(module: impl IntoIterator<Item = impl Into<String>>, symbol: impl Into<String>) -> Self {
        Self {
            module: module.into_iter().map(Into::into).collect(),
            symbol: symbol.into(),
            qualifiers: Vec::new(),
            suffix: None,
        }
    }

    #[must_use]
    pub fn with_qualifiers(mut self, qualifiers: Vec<Qualifier>) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: u32) -> Self {
        self.suffix = Some(suffix);
        self
    }

    #[must_use]
    pub fn module(&self) -> &[String] {
        &self.module
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn qualifiers(&self) -> &[Qualifier] {
        &self.qualifiers
    }

    /// A generic instantiation key: the FQN of the generic plus the
    /// argument FQNs, used by `function::GenericCache` (`spec.md` §4.4).
    #[must_use]
    pub fn instantiate(base: &Fqn, args: &[Fqn]) -> Fqn {
        let qualifiers = args
            .iter()
            .enumerate()
            .map(|(i, a)| Qualifier { key: format!("T{i}"), value: a.to_canonical() })
            .collect();
        base.clone().with_qualifiers(qualifiers)
    }

    #[must_use]
    pub fn to_canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module.join("."), self.symbol)?;
        if !self.qualifiers.is_empty() {
            f.write_str("[")?;
            for (i, q) in self.qualifiers.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", q.key, q.value)?;
            }
            f.write_str("]")?;
        }
        if let Some(n) = self.suffix {
            write!(f, "#{n}")?;
        }
        Ok(())
    }
}

/// What a global FQN resolves to.
#[derive(Debug, Clone)]
pub enum GlobalKind {
    Function,
    Type,
    Const,
}

/// Error raised when two distinct global values would collide on the same
/// FQN — a violation of the uniqueness invariant in `spec.md` §3.1.
#[derive(Debug, Clone)]
pub struct DuplicateFqn(pub Fqn);

impl fmt::Display for DuplicateFqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FQN already registered: {}", self.0)
    }
}

impl std::error::Error for DuplicateFqn {}

/// Process-wide (per-VM) registry of every global value.
///
/// Write-only during initialization, read-only afterwards (`spec.md` §5,
/// Shared resources). Insertion is deterministic: the same source always
/// produces the same registration order, which is required for the
/// residual AST to be reproducible across runs (`spec.md` §6.3).
#[derive(Debug, Default)]
pub struct FqnRegistry {
    entries: IndexMap<Fqn, GlobalKind>,
}

impl FqnRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fqn: Fqn, kind: GlobalKind) -> Result<(), DuplicateFqn> {
        if self.entries.contains_key(&fqn) {
            return Err(DuplicateFqn(fqn));
        }
        self.entries.insert(fqn, kind);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, fqn: &Fqn) -> bool {
        self.entries.contains_key(fqn)
    }

    #[must_use]
    pub fn kind_of(&self, fqn: &Fqn) -> Option<&GlobalKind> {
        self.entries.get(fqn)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
