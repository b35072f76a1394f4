//! Property-style checks on dispatch resolution and redshift determinism,
//! complementing the scenario tests in `end_to_end.rs`.

mod common;

use std::collections::HashSet;
use std::rc::Rc;

use spy_core::{Capability, CapabilityTable, Color, CmpOp, ConstValue, Expr, ExprKind, ResidualExpr, ResidualStmt, Span, Value, Vm};

fn const_expr(sp: Span, ty: spy_core::TypeRef, c: ConstValue) -> Expr {
    Expr { span: sp, ty, color: Color::Blue, kind: ExprKind::Const(c) }
}

/// `FqnRegistry::insert` already refuses a collision at registration time
/// (`fqn.rs`); this checks the whole native-function table `Vm::new` builds
/// actually produces distinct symbols, since a single duplicated literal in
/// `builtins.rs` would otherwise only surface as a panic deep in `Vm::new`.
#[test]
fn every_native_function_fqn_registered_by_a_fresh_vm_is_unique() {
    let vm = Vm::new();
    let mut seen = HashSet::new();
    for f in vm.primitives.native_functions() {
        assert!(seen.insert(f.fqn.to_canonical()), "duplicate native FQN: {}", f.fqn.to_canonical());
    }
}

#[test]
fn comparison_operators_redshift_to_resolved_cmp_fqns() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let i32_ty = vm.primitives.i32_ty.clone();
    let bool_ty = vm.primitives.bool_ty.clone();
    let x = vm.interner.intern("x");

    // return x < 10
    let x_expr = common::name_expr(sp, i32_ty.clone(), Color::Red, x);
    let ten = const_expr(sp, i32_ty.clone(), ConstValue::I32(10));
    let cmp = Expr { span: sp, ty: bool_ty.clone(), color: Color::Red, kind: ExprKind::Compare { op: CmpOp::Lt, lhs: Box::new(x_expr), rhs: Box::new(ten) } };
    let body = vec![common::ret_stmt(sp, cmp)];

    let fqn = common::define_function(&mut vm, "under_ten", vec![("x", i32_ty.clone())], bool_ty, body);
    let func = vm.lookup_function(&fqn).expect("under_ten is registered");

    let result = vm.call_function(&func, vec![Value::I32(3)]).expect("under_ten(3) runs");
    assert!(matches!(result, Value::Bool(true)));

    let residual = vm.redshift_program(&func, &[i32_ty]).expect("under_ten redshifts for (i32,)");
    match &residual.body[0] {
        ResidualStmt::Return(Some(ResidualExpr::BinOp { fqn, .. })) => assert_eq!(fqn.to_canonical(), "operator::i32_lt"),
        other => panic!("expected a Return(BinOp) residual statement, got {other:?}"),
    }
}

/// Redshifting the same function against two distinct argument-type tuples
/// must never collide on the same cached residual: `i32` and `f64`
/// instantiations of the identity function get their own FQNs and their own
/// cache entries (`function::GenericCache`/`module.rs`'s `redshifted` map
/// both key on the full instantiation, not just the base FQN).
#[test]
fn distinct_instantiations_of_the_same_function_redshift_independently() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let i32_ty = vm.primitives.i32_ty.clone();
    let f64_ty = vm.primitives.f64_ty.clone();
    let x = vm.interner.intern("x");
    let body = vec![common::ret_stmt(sp, common::name_expr(sp, i32_ty.clone(), Color::Red, x))];
    // The body's static param type is irrelevant to this check; what matters
    // is the instantiation key redshift_program builds from the argument
    // types it's called with.
    let fqn = common::define_function(&mut vm, "identity2", vec![("x", i32_ty.clone())], i32_ty.clone(), body);
    let func = vm.lookup_function(&fqn).expect("identity2 is registered");

    let as_i32 = vm.redshift_program(&func, &[i32_ty]).expect("redshifts for (i32,)");
    let as_f64 = vm.redshift_program(&func, &[f64_ty]).expect("redshifts for (f64,)");
    assert_ne!(as_i32.fqn.to_canonical(), as_f64.fqn.to_canonical(), "distinct instantiations must get distinct residual FQNs");
    assert!(!Rc::ptr_eq(&as_i32, &as_f64));
}

#[test]
fn empty_capability_table_supports_nothing() {
    let table = CapabilityTable::new();
    assert!(!table.supports(Capability::Add));
    assert!(table.get(Capability::Add).is_none());
}
