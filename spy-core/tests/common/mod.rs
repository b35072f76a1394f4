//! Small AST-builder helpers shared by the integration tests. There is no
//! parser in this crate (one is out of scope, see `SPEC_FULL.md` §6.1), so
//! every test builds its typed AST by hand the way `module.rs`'s own unit
//! tests do.

use std::rc::Rc;

use spy_core::{
    Color, Expr, ExprKind, Fqn, FuncDef, Interner, LineCol, Param, Span, Stmt, StmtKind, TypeRef, Vm,
};

pub fn span(interner: &mut Interner) -> Span {
    let file = interner.intern("t.spy");
    Span::new(file, LineCol::new(0, 0), LineCol::new(0, 1))
}

pub fn name_expr(sp: Span, ty: TypeRef, color: Color, name: spy_core::StrId) -> Expr {
    Expr { span: sp, ty, color, kind: ExprKind::Name(name) }
}

pub fn binop(sp: Span, op: spy_core::BinOp, lhs: Expr, rhs: Expr, ty: TypeRef, color: Color) -> Expr {
    Expr { span: sp, ty, color, kind: ExprKind::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) } }
}

pub fn call(sp: Span, callee: Expr, args: Vec<Expr>, ty: TypeRef, color: Color) -> Expr {
    Expr { span: sp, ty, color, kind: ExprKind::Call { callee: Box::new(callee), args } }
}

pub fn ret_stmt(sp: Span, value: Expr) -> Stmt {
    Stmt { span: sp, kind: StmtKind::Return(Some(value)) }
}

pub fn expr_stmt(sp: Span, value: Expr) -> Stmt {
    Stmt { span: sp, kind: StmtKind::Expr(value) }
}

/// Builds a top-level, non-generic, non-blue `def name(params) -> ret: body`
/// and registers it under `["main"]` by loading a one-statement module.
pub fn define_function(
    vm: &mut Vm,
    name: &str,
    params: Vec<(&str, TypeRef)>,
    ret_type: TypeRef,
    body: Vec<Stmt>,
) -> Fqn {
    let sp = span(&mut vm.interner);
    let fn_name = vm.interner.intern(name);
    let params: Vec<Param> = params
        .into_iter()
        .map(|(pname, ty)| Param { name: vm.interner.intern(pname), ty })
        .collect();
    let def = Rc::new(FuncDef {
        name: fn_name,
        span: sp,
        params,
        ret_type,
        body,
        is_blue: false,
        is_generic: false,
        free_vars: vec![],
    });
    vm.load_module(vec!["main".to_string()], vec![Stmt { span: sp, kind: StmtKind::FuncDef(def) }]).expect("function definition loads");
    Fqn::new(["main"], name)
}
