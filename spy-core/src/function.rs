//! Function wrappers: closures, and the state machine backing generic
//! instantiation memoization (`spec.md` §4.4, component table "Function
//! wrappers ... doppler state").

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::ast::FuncDef;
use crate::errors::SpyError;
use crate::fqn::Fqn;
use crate::types::{TypeKind, TypeObj, TypeRef};
use crate::value::Value;

/// Per-instantiation redshift state (`spec.md` §4.3):
/// `Unresolved -> Resolving -> Redshifted`. `Resolving -> Resolving` (a
/// cycle in blue evaluation) is an error, reported as a `StaticError` with
/// the call stack — see `module::Vm::begin_doppler`.
#[derive(Debug, Clone, Default)]
pub enum FuncState {
    #[default]
    Unresolved,
    Resolving,
    Redshifted,
}

/// A native Rust implementation backing one of the `libspy`-contract FQNs
/// (`spec.md` §6.2) — e.g. `operator::i32_add`, `str::len`. These back
/// both the interpreter's fast path and the functions the residual AST's
/// call nodes point at; the (external) C emitter is expected to link
/// against a C implementation with the same FQN and signature.
pub type NativeFn = fn(&[Value]) -> Result<Value, SpyError>;

/// What a `FunctionWrapper` actually runs.
#[derive(Clone)]
pub enum FunctionBody {
    /// A function compiled from source: the frame evaluator walks `def.body`.
    User(Rc<FuncDef>),
    /// An intrinsic backing a `libspy` contract FQN.
    Native(NativeFn),
}

impl fmt::Debug for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionBody::User(def) => write!(f, "User({:?})", def.name),
            FunctionBody::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// A function value: its signature, body, and any captured closure cells.
/// Multiple `FunctionWrapper`s can share the same `FuncDef` `Rc` (one per
/// generic instantiation or per closure capture).
#[derive(Debug, Clone)]
pub struct FunctionWrapper {
    pub fqn: Fqn,
    pub params: Vec<TypeRef>,
    pub ret_type: TypeRef,
    pub is_blue: bool,
    pub is_generic: bool,
    pub body: FunctionBody,
    /// Captured outer-scope values, in the order the symbol table assigned
    /// them free-variable slots (`spec.md` §3.6, "Outer references chain
    /// to parent frames for closures").
    pub closure: Vec<Value>,
}

pub type FunctionRef = Rc<FunctionWrapper>;

impl FunctionWrapper {
    #[must_use]
    pub fn from_def(fqn: Fqn, def: Rc<FuncDef>, closure: Vec<Value>) -> FunctionRef {
        let params = def.params.iter().map(|p| p.ty.clone()).collect();
        Rc::new(Self {
            fqn,
            params,
            ret_type: def.ret_type.clone(),
            is_blue: def.is_blue,
            is_generic: def.is_generic,
            body: FunctionBody::User(def),
            closure,
        })
    }

    #[must_use]
    pub fn native(fqn: Fqn, params: Vec<TypeRef>, ret_type: TypeRef, f: NativeFn) -> FunctionRef {
        Rc::new(Self { fqn, params, ret_type, is_blue: false, is_generic: false, body: FunctionBody::Native(f), closure: vec![] })
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self.body, FunctionBody::Native(_))
    }

    /// Builds the function type for this value. Constructed on demand
    /// rather than cached on `Primitives`, since a function's signature
    /// type is uniquely determined by its fqn/params/ret and stays constant
    /// for the wrapper's lifetime either way.
    #[must_use]
    pub fn signature_type(&self, _prims: &crate::builtins::Primitives) -> TypeRef {
        Rc::new(TypeObj {
            fqn: self.fqn.clone(),
            kind: TypeKind::Function { params: self.params.clone(), ret: self.ret_type.clone() },
            capabilities: crate::types::CapabilityTable::new(),
            size_hint: 0,
        })
    }
}

impl fmt::Display for FunctionWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn)
    }
}

/// Memoization cache for `blue.generic` functions (`spec.md` §4.4): calls
/// sharing the same argument FQNs share the same cached result. This is the
/// sole mechanism for monomorphization — there is no separate monomorphizer
/// pass (`spec.md` §9, "Generic memoization").
#[derive(Debug, Default)]
pub struct GenericCache {
    entries: AHashMap<Fqn, Value>,
}

impl GenericCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &Fqn) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: Fqn, value: Value) {
        self.entries.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_cache_is_keyed_by_instantiation_fqn() {
        let mut cache = GenericCache::new();
        let base = Fqn::new(["main"], "make_fn");
        let key = Fqn::instantiate(&base, &[Fqn::new(["builtins"], "f64")]);
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), Value::I32(1));
        assert!(matches!(cache.get(&key), Some(Value::I32(1))));
    }
}
