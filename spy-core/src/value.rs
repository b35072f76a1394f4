//! Runtime values ("W-objects", `spec.md` §3.2).
//!
//! Every value carries a concrete dynamic type (itself a `TypeRef`) and a
//! payload. Strings and structs are immutable at the value level; mutation
//! happens only through pointers (`Rc<RefCell<..>>`), matching the struct
//! the teacher's `Value` enum draws between immediate and heap-shaped
//! variants in `value.rs`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::function::FunctionRef;
use crate::types::{PrimKind, TypeKind, TypeObj, TypeRef};

/// A struct instance: an inline, by-value, immutable aggregate.
///
/// Attribute assignment on a bare `Struct` value is always a static error
/// (`spec.md` §4.3 edge cases) — only a `Pointer` to one can be mutated.
#[derive(Debug, Clone)]
pub struct StructInstance {
    pub ty: TypeRef,
    pub fields: Vec<Value>,
}

impl StructInstance {
    #[must_use]
    pub fn new(ty: TypeRef, fields: Vec<Value>) -> Self {
        Self { ty, fields }
    }

    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        match &self.ty.kind {
            TypeKind::Struct { fields } => fields.iter().position(|f| f.name == name),
            _ => None,
        }
    }
}

/// A typed, GC-allocated cell. Pointers are the only mutable storage in the
/// language; in checked mode (always used by the interpreter, `spec.md`
/// §9) they additionally carry a length for bounds checking.
#[derive(Debug, Clone)]
pub struct Pointer {
    pub cell: Rc<RefCell<Value>>,
    pub pointee: TypeRef,
    /// `Some(len)` in checked mode; `None` in release mode (bare address).
    pub checked_len: Option<usize>,
}

impl Pointer {
    #[must_use]
    pub fn new_checked(pointee: TypeRef, value: Value) -> Self {
        Self { cell: Rc::new(RefCell::new(value)), pointee, checked_len: Some(1) }
    }
}

/// A runtime value (`spec.md` §3.2).
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I32(i32),
    F64(f64),
    Str(Rc<str>),
    Ptr(Pointer),
    Struct(Rc<StructInstance>),
    Module(crate::fqn::Fqn),
    Function(FunctionRef),
    Type(TypeRef),
    Exception(Rc<ExceptionValue>),
    /// The value produced by a function falling off its end, or an explicit
    /// `return` with no expression (`spec.md` §3.5's `Return` statement).
    None,
}

/// The value-level representation of a raised exception instance, distinct
/// from the compiler's `SpyError` (which is the Rust-level error channel
/// used to *propagate* one). Comparing two of these for equality across
/// different exception types is always `false`, never an error (`spec.md`
/// §4.3 edge cases).
#[derive(Debug, Clone)]
pub struct ExceptionValue {
    pub exc_type: TypeRef,
    pub message: String,
}

impl Value {
    /// Returns the dynamic type of this value. Never changes across the
    /// value's lifetime (`spec.md` §3.2 invariant).
    #[must_use]
    pub fn dyn_type(&self, prims: &crate::builtins::Primitives) -> TypeRef {
        match self {
            Value::Bool(_) => prims.bool_ty.clone(),
            Value::I8(_) => prims.i8_ty.clone(),
            Value::I32(_) => prims.i32_ty.clone(),
            Value::F64(_) => prims.f64_ty.clone(),
            Value::Str(_) => prims.str_ty.clone(),
            Value::Ptr(p) => p.pointee.clone(),
            Value::Struct(s) => s.ty.clone(),
            Value::Module(_) => prims.module_ty.clone(),
            Value::Function(f) => f.signature_type(prims),
            Value::Type(_) => prims.type_ty.clone(),
            Value::Exception(e) => e.exc_type.clone(),
            Value::None => prims.module_ty.clone(),
        }
    }

    #[must_use]
    pub fn type_name(&self, prims: &crate::builtins::Primitives) -> String {
        self.dyn_type(prims).name()
    }

    #[must_use]
    pub fn as_bool_primitive(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::I8(i) => write!(f, "{i}"),
            Value::I32(i) => write!(f, "{i}"),
            Value::F64(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Ptr(p) => write!(f, "<ptr to {}>", p.pointee),
            Value::Struct(s) => write!(f, "<{} instance>", s.ty),
            Value::Module(m) => write!(f, "<module {m}>"),
            Value::Function(func) => write!(f, "<function {}>", func.fqn),
            Value::Type(t) => write!(f, "<type {t}>"),
            Value::Exception(e) => write!(f, "{}: {}", e.exc_type, e.message),
            Value::None => f.write_str("None"),
        }
    }
}

/// Helper used throughout the crate when two values need to be checked for
/// "exact type match" during dispatch tie-breaking (`spec.md` §4.2).
#[must_use]
pub fn same_prim(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Bool(_), Value::Bool(_))
            | (Value::I8(_), Value::I8(_))
            | (Value::I32(_), Value::I32(_))
            | (Value::F64(_), Value::F64(_))
            | (Value::Str(_), Value::Str(_))
    )
}

pub(crate) fn prim_kind_of(value: &Value) -> Option<PrimKind> {
    match value {
        Value::Bool(_) => Some(PrimKind::Bool),
        Value::I8(_) => Some(PrimKind::I8),
        Value::I32(_) => Some(PrimKind::I32),
        Value::F64(_) => Some(PrimKind::F64),
        Value::Str(_) => Some(PrimKind::Str),
        _ => None,
    }
}

pub(crate) fn type_is_prim(ty: &TypeObj, kind: PrimKind) -> bool {
    matches!(&ty.kind, TypeKind::Primitive(k) if *k == kind)
}
