//! Operator dispatch: `OpArg`/`OpImpl` and the resolution algorithm
//! (`spec.md` §4.2).
//!
//! This is implemented once and shared by arithmetic, comparison,
//! attribute access, subscripting, iteration, and construction — mirroring
//! the teacher's `binary_op_with_dunder!`/`inplace_op_with_dunder!` macros
//! in `bytecode/vm/binary.rs`, generalized from a fixed dunder pair into
//! the full `Capability` enum so one function covers every call-site shape
//! named in `spec.md` §4.2's closing sentence.

use crate::color::Color;
use crate::errors::SpyError;
use crate::function::FunctionRef;
use crate::span::Span;
use crate::types::{Capability, CapabilityImpl, TypeRef};
use crate::value::Value;

/// One call-site argument descriptor (`spec.md` §4.2).
#[derive(Debug, Clone)]
pub struct OpArg {
    pub color: Color,
    pub static_type: TypeRef,
    pub blue_value: Option<Value>,
    pub span: Span,
}

impl OpArg {
    #[must_use]
    pub fn new(color: Color, static_type: TypeRef, blue_value: Option<Value>, span: Span) -> Self {
        Self { color, static_type, blue_value, span }
    }

    /// Exact-type-match is one half of the tie-break rule in `spec.md`
    /// §4.2 — compares by FQN rather than `Rc` identity since two
    /// separately-constructed `TypeRef`s for the same type are equal.
    #[must_use]
    pub fn exact_type_match(&self, other: &TypeRef) -> bool {
        self.static_type == *other
    }
}

/// A resolved operator call: which function to invoke, in what argument
/// order, with which per-argument converters (`spec.md` §4.2). `None`
/// converters mean "pass the argument through unchanged".
#[derive(Debug, Clone)]
pub struct OpImpl {
    pub function: FunctionRef,
    /// Indices into the original (left, right, ...) argument list, in the
    /// order the target function expects them. Most calls are `[0, 1, ..]`
    /// (no reordering); a reflected binary call is `[1, 0]`.
    pub reordered_args: Vec<usize>,
    /// One optional converter function per (reordered) argument.
    pub converters: Vec<Option<FunctionRef>>,
}

impl OpImpl {
    #[must_use]
    pub fn identity(function: FunctionRef, arity: usize) -> Self {
        Self { function, reordered_args: (0..arity).collect(), converters: vec![None; arity] }
    }

    #[must_use]
    pub fn reflected(function: FunctionRef) -> Self {
        Self { function, reordered_args: vec![1, 0], converters: vec![None, None] }
    }
}

/// Callback used to invoke a metafunction (a blue function that computes an
/// `OpImpl` for a given call site) without `dispatch` depending on the
/// frame evaluator directly. The frame evaluator passes in a closure that
/// calls back into itself.
pub trait MetaResolver {
    fn invoke_meta(&mut self, meta: &FunctionRef, args: &[OpArg]) -> Result<Option<OpImpl>, SpyError>;
}

/// Looks up a capability slot on `ty` and, if present, resolves it to an
/// `OpImpl`: a `Direct` slot is already an `OpImpl` in disguise (the
/// auto-wrapped default metafunction always returns the same thing); a
/// `Meta` slot is invoked through `resolver`.
fn resolve_capability(
    ty: &TypeRef,
    cap: Capability,
    args: &[OpArg],
    resolver: &mut dyn MetaResolver,
    arity: usize,
) -> Result<Option<OpImpl>, SpyError> {
    match ty.capabilities.get(cap) {
        None => Ok(None),
        Some(CapabilityImpl::Direct(f)) => Ok(Some(OpImpl::identity(f.clone(), arity))),
        Some(CapabilityImpl::Meta(f)) => resolver.invoke_meta(f, args),
    }
}

/// Steps 1-4 of the dispatch algorithm (`spec.md` §4.2) for a binary
/// operator `lhs OP rhs`: try the left operand's `__OP__`, then the right
/// operand's reflected slot (modeled here as the *same* capability looked
/// up on the right type, invoked with swapped argument order), else a
/// `StaticError`.
pub fn dispatch_binary(
    op_name: &str,
    cap: Capability,
    lhs: &OpArg,
    rhs: &OpArg,
    resolver: &mut dyn MetaResolver,
) -> Result<OpImpl, SpyError> {
    let args = [lhs.clone(), rhs.clone()];
    if let Some(found) = resolve_capability(&lhs.static_type, cap, &args, resolver, 2)? {
        return Ok(found);
    }
    let reflected_args = [rhs.clone(), lhs.clone()];
    if let Some(found) = resolve_capability(&rhs.static_type, cap, &reflected_args, resolver, 2)? {
        // The right operand's metafunction is consulted with (rhs, lhs)
        // ordering per the tie-break "left before right" rule: the right
        // side only gets to see itself first, not displace an operand.
        return Ok(OpImpl { reordered_args: vec![1, 0], ..found });
    }
    Err(SpyError::no_operator(op_name, &lhs.static_type.name(), &rhs.static_type.name(), lhs.span))
}

/// Unary operator dispatch: only the operand's own type is consulted.
pub fn dispatch_unary(
    op_name: &str,
    cap: Capability,
    operand: &OpArg,
    resolver: &mut dyn MetaResolver,
) -> Result<OpImpl, SpyError> {
    let args = [operand.clone()];
    if let Some(found) = resolve_capability(&operand.static_type, cap, &args, resolver, 1)? {
        return Ok(found);
    }
    Err(SpyError::no_operator(op_name, &operand.static_type.name(), "<none>", operand.span))
}

/// Non-binary dispatch (attribute access, subscript, construction, call,
/// iteration): only the receiver's type is consulted, since there is no
/// "other operand" to reflect onto.
pub fn dispatch_unary_capability(
    op_name: &str,
    cap: Capability,
    receiver: &OpArg,
    extra_args: &[OpArg],
    resolver: &mut dyn MetaResolver,
) -> Result<OpImpl, SpyError> {
    let mut all_args = vec![receiver.clone()];
    all_args.extend_from_slice(extra_args);
    if let Some(found) = resolve_capability(&receiver.static_type, cap, &all_args, resolver, all_args.len())? {
        return Ok(found);
    }
    Err(SpyError::no_operator(op_name, &receiver.static_type.name(), "<none>", receiver.span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fqn::Fqn;
    use crate::function::FunctionWrapper;
    use crate::intern::Interner;
    use crate::span::{LineCol, Span};
    use crate::types::{PrimKind, TypeObj};
    use std::rc::Rc;

    struct NoMeta;
    impl MetaResolver for NoMeta {
        fn invoke_meta(&mut self, _meta: &FunctionRef, _args: &[OpArg]) -> Result<Option<OpImpl>, SpyError> {
            Ok(None)
        }
    }

    fn dummy_span() -> Span {
        let mut interner = Interner::new();
        let file = interner.intern("t.spy");
        Span::new(file, LineCol::new(0, 0), LineCol::new(0, 1))
    }

    fn dummy_func(name: &str) -> FunctionRef {
        let def = Rc::new(crate::ast::FuncDef {
            name: Interner::new().intern(name),
            span: dummy_span(),
            params: vec![],
            ret_type: TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4),
            body: vec![],
            is_blue: false,
            is_generic: false,
            free_vars: vec![],
        });
        FunctionWrapper::from_def(Fqn::new(["operator"], name), def, vec![])
    }

    #[test]
    fn dispatch_fails_with_no_operator_error_when_neither_side_implements_it() {
        let i32_ty = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        let str_ty = TypeObj::primitive(Fqn::new(["builtins"], "str"), PrimKind::Str, 0);
        let lhs = OpArg::new(Color::Blue, i32_ty, None, dummy_span());
        let rhs = OpArg::new(Color::Blue, str_ty, None, dummy_span());
        let mut resolver = NoMeta;
        let err = dispatch_binary("+", Capability::Add, &lhs, &rhs, &mut resolver).unwrap_err();
        assert!(err.message.contains("no operator + for types"));
    }

    #[test]
    fn dispatch_prefers_left_operand_metafunction() {
        let mut i32_ty_obj = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        Rc::get_mut(&mut i32_ty_obj)
            .expect("unique ref")
            .capabilities
            .register(Capability::Add, CapabilityImpl::Direct(dummy_func("i32_add")));
        let other_ty = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        let lhs = OpArg::new(Color::Blue, i32_ty_obj, None, dummy_span());
        let rhs = OpArg::new(Color::Blue, other_ty, None, dummy_span());
        let mut resolver = NoMeta;
        let resolved = dispatch_binary("+", Capability::Add, &lhs, &rhs, &mut resolver).expect("dispatch succeeds");
        assert_eq!(resolved.function.fqn.symbol(), "i32_add");
        assert_eq!(resolved.reordered_args, vec![0, 1]);
    }

    #[test]
    fn dispatch_falls_back_to_the_right_operands_capability_with_reordered_args() {
        let left_ty = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        let mut right_ty_obj = TypeObj::primitive(Fqn::new(["main"], "RightAdd"), PrimKind::I32, 4);
        Rc::get_mut(&mut right_ty_obj)
            .expect("unique ref")
            .capabilities
            .register(Capability::Add, CapabilityImpl::Direct(dummy_func("radd")));
        let lhs = OpArg::new(Color::Blue, left_ty, None, dummy_span());
        let rhs = OpArg::new(Color::Blue, right_ty_obj, None, dummy_span());
        let mut resolver = NoMeta;
        let resolved = dispatch_binary("+", Capability::Add, &lhs, &rhs, &mut resolver).expect("falls back to the right operand");
        assert_eq!(resolved.function.fqn.symbol(), "radd");
        assert_eq!(resolved.reordered_args, vec![1, 0], "the right operand's metafunction must see (rhs, lhs)");
    }

    #[test]
    fn dispatch_is_deterministic_across_repeated_calls() {
        let mut i32_ty_obj = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        Rc::get_mut(&mut i32_ty_obj)
            .expect("unique ref")
            .capabilities
            .register(Capability::Add, CapabilityImpl::Direct(dummy_func("i32_add")));
        let other_ty = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        let lhs = OpArg::new(Color::Blue, i32_ty_obj, None, dummy_span());
        let rhs = OpArg::new(Color::Blue, other_ty, None, dummy_span());
        let mut resolver = NoMeta;
        let first = dispatch_binary("+", Capability::Add, &lhs, &rhs, &mut resolver).expect("first dispatch succeeds");
        let second = dispatch_binary("+", Capability::Add, &lhs, &rhs, &mut resolver).expect("second dispatch succeeds");
        assert_eq!(first.function.fqn, second.function.fqn);
        assert_eq!(first.reordered_args, second.reordered_args);
    }
}
