//! End-to-end scenarios exercising interp mode, redshift mode, and the
//! error/traceback machinery together, built from hand-assembled typed ASTs
//! (there is no parser in this crate, `SPEC_FULL.md` §6.1).

mod common;

use std::rc::Rc;

use spy_core::{
    BinOp, CapabilityTable, Color, ConstValue, Expr, ExprKind, Field, Fqn, FuncDef, Param, Pointer, ResidualExpr, ResidualStmt, Stmt, StmtKind, StructInstance,
    TypeKind, TypeObj, Value, Vm,
};

fn const_expr(sp: spy_core::Span, ty: spy_core::TypeRef, c: ConstValue) -> Expr {
    Expr { span: sp, ty, color: Color::Blue, kind: ExprKind::Const(c) }
}

#[test]
fn hello_world_print_runs_to_completion() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let str_ty = vm.primitives.str_ty.clone();
    let print_name = vm.interner.intern("print");
    let callee = common::name_expr(sp, vm.primitives.module_ty.clone(), Color::Red, print_name);
    let arg = Expr { span: sp, ty: str_ty, color: Color::Blue, kind: ExprKind::StrConst(Rc::from("Hello world!")) };
    let call_expr = common::call(sp, callee, vec![arg], vm.primitives.module_ty.clone(), Color::Red);
    vm.load_module(vec!["main".to_string()], vec![common::expr_stmt(sp, call_expr)]).expect("module with a bare print call loads and runs");
}

#[test]
fn add_x_y_redshifts_to_resolved_operator_fqns() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let i32_ty = vm.primitives.i32_ty.clone();
    let x = vm.interner.intern("x");
    let y = vm.interner.intern("y");

    // return x + y * 2
    let x_expr = common::name_expr(sp, i32_ty.clone(), Color::Red, x);
    let y_expr = common::name_expr(sp, i32_ty.clone(), Color::Red, y);
    let two = const_expr(sp, i32_ty.clone(), ConstValue::I32(2));
    let mul = common::binop(sp, BinOp::Mul, y_expr, two, i32_ty.clone(), Color::Red);
    let add = common::binop(sp, BinOp::Add, x_expr, mul, i32_ty.clone(), Color::Red);
    let body = vec![common::ret_stmt(sp, add)];

    let fqn = common::define_function(&mut vm, "add", vec![("x", i32_ty.clone()), ("y", i32_ty.clone())], i32_ty.clone(), body);
    let func = vm.lookup_function(&fqn).expect("add is registered");

    // Interp mode: add(3, 4) == 11
    let result = vm.call_function(&func, vec![Value::I32(3), Value::I32(4)]).expect("add(3, 4) runs");
    assert!(matches!(result, Value::I32(11)));

    // Redshift mode: the residual body names concrete operator FQNs, not a
    // dispatch site.
    let residual = vm.redshift_program(&func, &[i32_ty.clone(), i32_ty.clone()]).expect("add redshifts for (i32, i32)");
    assert_eq!(residual.body.len(), 1);
    match &residual.body[0] {
        ResidualStmt::Return(Some(ResidualExpr::BinOp { fqn, rhs, .. })) => {
            assert_eq!(fqn.to_canonical(), "operator::i32_add");
            match rhs.as_ref() {
                ResidualExpr::BinOp { fqn, .. } => assert_eq!(fqn.to_canonical(), "operator::i32_mul"),
                other => panic!("expected a nested i32_mul residual node, got {other:?}"),
            }
        }
        other => panic!("expected a Return(BinOp) residual statement, got {other:?}"),
    }
}

#[test]
fn redshift_memoizes_the_same_instantiation() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let i32_ty = vm.primitives.i32_ty.clone();
    let x = vm.interner.intern("x");
    let body = vec![common::ret_stmt(sp, common::name_expr(sp, i32_ty.clone(), Color::Red, x))];
    let fqn = common::define_function(&mut vm, "identity", vec![("x", i32_ty.clone())], i32_ty.clone(), body);
    let func = vm.lookup_function(&fqn).expect("identity is registered");

    let first = vm.redshift_program(&func, &[i32_ty.clone()]).expect("first redshift succeeds");
    let second = vm.redshift_program(&func, &[i32_ty]).expect("second redshift succeeds");
    assert!(Rc::ptr_eq(&first, &second), "redshifting the same instantiation twice must return the cached residual function");
}

/// `gen`'s body is only ever run once even though the caller invokes it
/// twice, because both calls share the same argument-type FQN (`i32`) —
/// the cache key is the argument's *type*, not its runtime value, matching
/// how a `blue.generic`'s arguments are themselves FQN-identified types
/// (`SPEC_FULL.md` §4.4/§9). `gen(5) + gen(7)` therefore evaluates to
/// `6 + 6`, not `6 + 8`: the second call returns the first call's cached
/// result without re-running the body against `7`.
#[test]
fn generic_call_is_memoized_by_argument_type_not_by_value() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let i32_ty = vm.primitives.i32_ty.clone();

    let gen_param = vm.interner.intern("x");
    let gen_name = vm.interner.intern("gen");
    let one = const_expr(sp, i32_ty.clone(), ConstValue::I32(1));
    let gen_body = vec![common::ret_stmt(
        sp,
        common::binop(sp, BinOp::Add, common::name_expr(sp, i32_ty.clone(), Color::Red, gen_param), one, i32_ty.clone(), Color::Red),
    )];
    let gen_def = Rc::new(FuncDef {
        name: gen_name,
        span: sp,
        params: vec![Param { name: gen_param, ty: i32_ty.clone() }],
        ret_type: i32_ty.clone(),
        body: gen_body,
        is_blue: true,
        is_generic: true,
        free_vars: vec![],
    });

    let caller_name = vm.interner.intern("caller");
    let gen_ref = common::name_expr(sp, vm.primitives.module_ty.clone(), Color::Blue, gen_name);
    let call_a = common::call(sp, gen_ref.clone(), vec![const_expr(sp, i32_ty.clone(), ConstValue::I32(5))], i32_ty.clone(), Color::Red);
    let call_b = common::call(sp, gen_ref, vec![const_expr(sp, i32_ty.clone(), ConstValue::I32(7))], i32_ty.clone(), Color::Red);
    let caller_body = vec![common::ret_stmt(sp, common::binop(sp, BinOp::Add, call_a, call_b, i32_ty.clone(), Color::Red))];
    let caller_def = Rc::new(FuncDef {
        name: caller_name,
        span: sp,
        params: vec![],
        ret_type: i32_ty.clone(),
        body: caller_body,
        is_blue: false,
        is_generic: false,
        free_vars: vec![],
    });

    vm.load_module(
        vec!["main".to_string()],
        vec![Stmt { span: sp, kind: StmtKind::FuncDef(gen_def) }, Stmt { span: sp, kind: StmtKind::FuncDef(caller_def) }],
    )
    .expect("module with gen/caller loads");

    let gen_fqn = Fqn::new(["main"], "gen");
    let caller_fqn = Fqn::new(["main"], "caller");
    let caller = vm.lookup_function(&caller_fqn).expect("caller is registered");

    assert!(vm.generics.get(&Fqn::instantiate(&gen_fqn, &[i32_ty.fqn.clone()])).is_none(), "cache starts empty");
    let result = vm.call_function(&caller, vec![]).expect("caller runs");
    assert!(matches!(result, Value::I32(12)), "expected 6 + 6 from the memoized call, got {result:?}");
    assert!(vm.generics.get(&Fqn::instantiate(&gen_fqn, &[i32_ty.fqn])).is_some(), "the instantiation is cached after the first call");
}

#[test]
fn floor_div_and_mod_follow_spec_sign_convention_not_truncation() {
    let mut vm = Vm::new();
    let floordiv = vm.lookup_function(&Fqn::new(["operator"], "i32_floordiv")).expect("i32_floordiv is a registered native function");
    let modulo = vm.lookup_function(&Fqn::new(["operator"], "i32_mod")).expect("i32_mod is a registered native function");

    let q = vm.call_function(&floordiv, vec![Value::I32(-7), Value::I32(2)]).expect("call succeeds");
    let r = vm.call_function(&modulo, vec![Value::I32(-7), Value::I32(2)]).expect("call succeeds");
    // -7 floor-divided by 2 rounds toward negative infinity: -4, remainder 1
    // (not Rust's truncating -3 remainder -1).
    assert!(matches!(q, Value::I32(-4)));
    assert!(matches!(r, Value::I32(1)));
}

/// `spec.md` §4.3 edge cases: comparing exceptions is never a `StaticError`
/// even across unrelated exception types — it is always `false` for `==`
/// (and so always `true` for `!=`), regardless of whether the two operands
/// happen to share the same exception type.
#[test]
fn exception_equality_is_always_false_even_for_the_same_exception_type() {
    use spy_core::ExceptionValue;

    let mut vm = Vm::new();
    let eq = vm.lookup_function(&Fqn::new(["operator"], "exception_eq")).expect("exception_eq is a registered native function");
    let ne = vm.lookup_function(&Fqn::new(["operator"], "exception_ne")).expect("exception_ne is a registered native function");

    let value_error = Rc::new(TypeObj { fqn: Fqn::new(["main"], "ValueError"), kind: TypeKind::Exception, capabilities: CapabilityTable::new(), size_hint: 0 });
    let key_error = Rc::new(TypeObj { fqn: Fqn::new(["main"], "KeyError"), kind: TypeKind::Exception, capabilities: CapabilityTable::new(), size_hint: 0 });

    let a = Value::Exception(Rc::new(ExceptionValue { exc_type: value_error.clone(), message: "bad value".to_string() }));
    let b = Value::Exception(Rc::new(ExceptionValue { exc_type: value_error, message: "bad value".to_string() }));
    let c = Value::Exception(Rc::new(ExceptionValue { exc_type: key_error, message: "missing key".to_string() }));

    // Same exception type, same message: still false.
    assert!(matches!(vm.call_function(&eq, vec![a.clone(), b.clone()]).expect("eq runs"), Value::Bool(false)));
    assert!(matches!(vm.call_function(&ne, vec![a.clone(), b]).expect("ne runs"), Value::Bool(true)));
    // Different exception types: also false, not a StaticError.
    assert!(matches!(vm.call_function(&eq, vec![a.clone(), c.clone()]).expect("eq runs"), Value::Bool(false)));
    assert!(matches!(vm.call_function(&ne, vec![a, c]).expect("ne runs"), Value::Bool(true)));
}

fn counter_type(i32_ty: spy_core::TypeRef) -> spy_core::TypeRef {
    Rc::new(TypeObj {
        fqn: Fqn::new(["main"], "Counter"),
        kind: TypeKind::Struct { fields: vec![Field { name: "count".to_string(), ty: i32_ty, offset: 0 }] },
        capabilities: CapabilityTable::new(),
        size_hint: 1,
    })
}

/// `def bump(c): c.count = 2` — called once with a bare struct value (a
/// `StaticError`, struct values are immutable, `SPEC_FULL.md` §4.3) and once
/// with a pointer to one (mutates the pointee in place).
#[test]
fn struct_value_field_assignment_is_a_static_error_but_pointer_mutation_succeeds() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let i32_ty = vm.primitives.i32_ty.clone();
    let struct_ty = counter_type(i32_ty.clone());
    let field_name = vm.interner.intern("count");
    let param_name = vm.interner.intern("c");

    let setattr = Expr {
        span: sp,
        ty: i32_ty.clone(),
        color: Color::Red,
        kind: ExprKind::SetAttr {
            obj: Box::new(common::name_expr(sp, struct_ty.clone(), Color::Red, param_name)),
            attr: field_name,
            value: Box::new(const_expr(sp, i32_ty.clone(), ConstValue::I32(2))),
        },
    };
    let bump_body = vec![common::expr_stmt(sp, setattr)];
    let bump_fqn = common::define_function(&mut vm, "bump", vec![("c", struct_ty.clone())], vm.primitives.module_ty.clone(), bump_body);
    let bump = vm.lookup_function(&bump_fqn).expect("bump is registered");

    let bare = Value::Struct(Rc::new(StructInstance::new(struct_ty.clone(), vec![Value::I32(1)])));
    let err = vm.call_function(&bump, vec![bare]).expect_err("assigning through a bare struct value must fail");
    assert!(err.to_string().contains("immutable"), "error should explain struct values are immutable, got: {err}");

    let pointee = Value::Struct(Rc::new(StructInstance::new(struct_ty.clone(), vec![Value::I32(1)])));
    let ptr = Pointer::new_checked(struct_ty, pointee);
    let cell = ptr.cell.clone();
    vm.call_function(&bump, vec![Value::Ptr(ptr)]).expect("assigning through a pointer succeeds");
    match &*cell.borrow() {
        Value::Struct(s) => assert!(matches!(s.fields[0], Value::I32(2)), "pointee's field should have been mutated to 2"),
        other => panic!("expected the pointee to remain a struct, got {other:?}"),
    }
}

/// `inner` calls itself with no base case distinguishable at redshift time,
/// so resolving it hits the cycle guard (`function::FuncState::Resolving`,
/// `SPEC_FULL.md` §4.4). `outer` calls `inner` once more on the outside, so
/// the propagating `SpyError` should pick up one `TraceFrame` per nested
/// blue-call site it unwinds through: the self-call inside `inner`'s own
/// body, then `outer`'s call into `inner` (`SPEC_FULL.md` §4.6/§7).
#[test]
fn nested_blue_call_cycle_renders_a_multi_frame_traceback() {
    let mut vm = Vm::new();
    let sp = common::span(&mut vm.interner);
    let i32_ty = vm.primitives.i32_ty.clone();
    let inner_name = vm.interner.intern("inner");
    let outer_name = vm.interner.intern("outer");

    // def inner(x: i32) -> i32: return inner(x)
    let inner_param = vm.interner.intern("x");
    let self_ref = common::name_expr(sp, vm.primitives.module_ty.clone(), Color::Blue, inner_name);
    let self_call = common::call(sp, self_ref, vec![common::name_expr(sp, i32_ty.clone(), Color::Red, inner_param)], i32_ty.clone(), Color::Red);
    let inner_def = Rc::new(FuncDef {
        name: inner_name,
        span: sp,
        params: vec![Param { name: inner_param, ty: i32_ty.clone() }],
        ret_type: i32_ty.clone(),
        body: vec![common::ret_stmt(sp, self_call)],
        is_blue: true,
        is_generic: false,
        free_vars: vec![],
    });

    // def outer(x: i32) -> i32: return inner(x)
    let outer_param = vm.interner.intern("x");
    let inner_ref = common::name_expr(sp, vm.primitives.module_ty.clone(), Color::Blue, inner_name);
    let call_inner = common::call(sp, inner_ref, vec![common::name_expr(sp, i32_ty.clone(), Color::Red, outer_param)], i32_ty.clone(), Color::Red);
    let outer_def = Rc::new(FuncDef {
        name: outer_name,
        span: sp,
        params: vec![Param { name: outer_param, ty: i32_ty.clone() }],
        ret_type: i32_ty.clone(),
        body: vec![common::ret_stmt(sp, call_inner)],
        is_blue: true,
        is_generic: false,
        free_vars: vec![],
    });

    // Both definitions must land in the same `load_module` call: a second
    // call would replace `vm.modules["main"]` wholesale, losing the first
    // function's global binding that the other's body needs to resolve
    // `inner` by name.
    vm.load_module(
        vec!["main".to_string()],
        vec![Stmt { span: sp, kind: StmtKind::FuncDef(inner_def) }, Stmt { span: sp, kind: StmtKind::FuncDef(outer_def) }],
    )
    .expect("module with inner/outer loads");

    let outer_fqn = Fqn::new(["main"], "outer");
    let outer = vm.lookup_function(&outer_fqn).expect("outer is registered");
    let err = vm.redshift_program(&outer, &[i32_ty]).expect_err("self-recursive blue evaluation must be rejected as a cycle");
    assert_eq!(err.frames().len(), 2, "expected one frame for inner's self-call and one for outer's call into inner, got {:?}", err.frames());
}
