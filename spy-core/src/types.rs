//! Type values and the capability (metafunction) protocol (`spec.md` §3.3,
//! §4.1).
//!
//! Types are themselves W-objects: they carry an FQN, a capability table,
//! an optional field layout, a size hint, and a kind tag. They may be
//! passed as arguments and produced by functions — generics are ordinary
//! (blue) functions from types to types.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::fqn::Fqn;
use crate::function::FunctionRef;

/// The core capability names from `spec.md` §4.1's table. Each is either an
/// ordinary implementation (`lower`) or a metafunction (`UPPER`) in the
/// source language; both map onto one `Capability` here, and
/// `CapabilityImpl` distinguishes how it was provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    New,
    Call,
    GetAttr,
    SetAttr,
    GetItem,
    SetItem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Neg,
    Str,
    Repr,
    Len,
    Hash,
    Bool,
    Iter,
    Next,
    Lift,
    Unlift,
    Init,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::New => "__new__",
            Capability::Call => "__call__",
            Capability::GetAttr => "__getattr__",
            Capability::SetAttr => "__setattr__",
            Capability::GetItem => "__getitem__",
            Capability::SetItem => "__setitem__",
            Capability::Eq => "__eq__",
            Capability::Ne => "__ne__",
            Capability::Lt => "__lt__",
            Capability::Le => "__le__",
            Capability::Gt => "__gt__",
            Capability::Ge => "__ge__",
            Capability::Add => "__add__",
            Capability::Sub => "__sub__",
            Capability::Mul => "__mul__",
            Capability::TrueDiv => "__truediv__",
            Capability::FloorDiv => "__floordiv__",
            Capability::Mod => "__mod__",
            Capability::Neg => "__neg__",
            Capability::Str => "__str__",
            Capability::Repr => "__repr__",
            Capability::Len => "__len__",
            Capability::Hash => "__hash__",
            Capability::Bool => "__bool__",
            Capability::Iter => "__iter__",
            Capability::Next => "__next__",
            Capability::Lift => "__lift__",
            Capability::Unlift => "__unlift__",
            Capability::Init => "__INIT__",
        };
        f.write_str(name)
    }
}

impl Capability {
    /// The reflected counterpart used in step 3 of the dispatch algorithm
    /// (`spec.md` §4.2), e.g. `__add__` reflects to `__radd__` conceptually.
    /// Here the reflection is modeled by swapping operand order rather than
    /// a distinct capability name, since the capability table already
    /// covers both directions through the same slot looked up on the other
    /// operand's type.
    #[must_use]
    pub fn is_binary_operator(self) -> bool {
        matches!(
            self,
            Capability::Add
                | Capability::Sub
                | Capability::Mul
                | Capability::TrueDiv
                | Capability::FloorDiv
                | Capability::Mod
                | Capability::Eq
                | Capability::Ne
                | Capability::Lt
                | Capability::Le
                | Capability::Gt
                | Capability::Ge
        )
    }
}

/// How a capability slot was filled.
///
/// `Direct` is the auto-wrapped default metafunction for a lower-case
/// implementation: at redshift time it always resolves to the same
/// `OpImpl` regardless of call site. `Meta` is a genuine metafunction — a
/// blue function invoked at the call site to *compute* the `OpImpl`,
/// which is how the language implements generics and specialized
/// operators without runtime dispatch (`spec.md` §4.1).
#[derive(Debug, Clone)]
pub enum CapabilityImpl {
    Direct(FunctionRef),
    Meta(FunctionRef),
}

impl CapabilityImpl {
    #[must_use]
    pub fn function(&self) -> &FunctionRef {
        match self {
            CapabilityImpl::Direct(f) | CapabilityImpl::Meta(f) => f,
        }
    }

    #[must_use]
    pub fn is_meta(&self) -> bool {
        matches!(self, CapabilityImpl::Meta(_))
    }
}

/// A type's capability table: the metafunctions/implementations it
/// supports, keyed by capability name. A table lookup plus a `None`
/// fallback chain, per `spec.md` §9 ("Polymorphism without inheritance").
#[derive(Debug, Clone, Default)]
pub struct CapabilityTable {
    slots: AHashMap<Capability, CapabilityImpl>,
}

impl CapabilityTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cap: Capability, imp: CapabilityImpl) {
        self.slots.insert(cap, imp);
    }

    #[must_use]
    pub fn get(&self, cap: Capability) -> Option<&CapabilityImpl> {
        self.slots.get(&cap)
    }

    #[must_use]
    pub fn supports(&self, cap: Capability) -> bool {
        self.slots.contains_key(&cap)
    }
}

/// One field in a struct's layout.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub offset: usize,
}

/// The `kind` tag from `spec.md` §3.3.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimKind),
    Struct { fields: Vec<Field> },
    Function { params: Vec<TypeRef>, ret: TypeRef },
    Pointer { pointee: TypeRef, checked: bool },
    TypeType,
    Exception,
    /// A type registered by user code (or a generic instantiation) with no
    /// further built-in structure beyond its capability table.
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimKind {
    Bool,
    I8,
    I32,
    F64,
    Str,
}

impl fmt::Display for PrimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimKind::Bool => "bool",
            PrimKind::I8 => "i8",
            PrimKind::I32 => "i32",
            PrimKind::F64 => "f64",
            PrimKind::Str => "str",
        })
    }
}

/// A type value (`spec.md` §3.3). Reference-counted like every other
/// heap-shaped value — see `SPEC_FULL.md` §3.2 for why `Rc` rather than an
/// arena is the chosen stand-in for "an implementation may use reference
/// counting".
#[derive(Debug, Clone)]
pub struct TypeObj {
    pub fqn: Fqn,
    pub kind: TypeKind,
    pub capabilities: CapabilityTable,
    pub size_hint: usize,
}

pub type TypeRef = Rc<TypeObj>;

impl TypeObj {
    #[must_use]
    pub fn primitive(fqn: Fqn, kind: PrimKind, size_hint: usize) -> TypeRef {
        Rc::new(Self { fqn, kind: TypeKind::Primitive(kind), capabilities: CapabilityTable::new(), size_hint })
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.fqn.to_canonical()
    }
}

impl fmt::Display for TypeObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn)
    }
}

impl PartialEq for TypeObj {
    fn eq(&self, other: &Self) -> bool {
        self.fqn == other.fqn
    }
}
impl Eq for TypeObj {}
