//! Scope / symbol table analyzer (`spec.md` §3.6).
//!
//! Per function: a mapping name -> `Symbol { kind, static_type, color,
//! is_mutable }`. Outer references chain to parent frames for closures;
//! globals reference the module table. This module also hosts the color
//! monotonicity checker used to validate the invariant from `spec.md` §8.

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;

use crate::ast::{Expr, ExprKind, FuncDef, Stmt, StmtKind};
use crate::color::Color;
use crate::fqn::Fqn;
use crate::intern::StrId;
use crate::types::{CapabilityTable, TypeKind, TypeObj, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Local,
    Outer,
    Global,
    CellVar,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub static_type: TypeRef,
    pub color: Color,
    pub is_mutable: bool,
}

/// A function's full symbol table.
#[derive(Debug, Clone, Default)]
pub struct SymTable {
    symbols: IndexMap<StrId, Symbol>,
}

impl SymTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: StrId, symbol: Symbol) {
        self.symbols.insert(name, symbol);
    }

    #[must_use]
    pub fn get(&self, name: StrId) -> Option<&Symbol> {
        self.symbols.get(&name)
    }

    #[must_use]
    pub fn contains(&self, name: StrId) -> bool {
        self.symbols.contains_key(&name)
    }
}

/// Collects every name a function body assigns to directly (not through a
/// nested `FuncDef`/`ClassDef`, whose own bodies get their own table),
/// along with the static type each binding actually carries.
///
/// `Assign`/`VarDef` use the assigned expression's own type; a `For` loop
/// variable uses the iterable's static type as a conservative placeholder,
/// mirroring `redshift.rs`'s `stmt_for_item_type` (no dedicated sequence
/// element type exists yet); a nested `FuncDef`/`ClassDef` name gets a
/// freshly-built `Function`/`TypeType` type describing its own signature.
fn collect_assigned_types(body: &[Stmt], out: &mut AHashMap<StrId, TypeRef>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                out.insert(*target, value.ty.clone());
            }
            StmtKind::VarDef { name, ty, .. } => {
                out.insert(*name, ty.clone());
            }
            StmtKind::For { var, iter, body } => {
                out.insert(*var, iter.ty.clone());
                collect_assigned_types(body, out);
            }
            StmtKind::If { then_body, else_body, .. } => {
                collect_assigned_types(then_body, out);
                collect_assigned_types(else_body, out);
            }
            StmtKind::While { body, .. } => collect_assigned_types(body, out),
            StmtKind::FuncDef(def) => {
                let fn_ty = Rc::new(TypeObj {
                    fqn: Fqn::new(["local"], "function"),
                    kind: TypeKind::Function { params: def.params.iter().map(|p| p.ty.clone()).collect(), ret: def.ret_type.clone() },
                    capabilities: CapabilityTable::new(),
                    size_hint: 0,
                });
                out.insert(def.name, fn_ty);
            }
            StmtKind::ClassDef(def) => {
                let ty_ty = Rc::new(TypeObj { fqn: Fqn::new(["local"], "type"), kind: TypeKind::TypeType, capabilities: CapabilityTable::new(), size_hint: 0 });
                out.insert(def.name, ty_ty);
            }
            StmtKind::Return(_) | StmtKind::Raise(_) | StmtKind::Expr(_) | StmtKind::Pass => {}
        }
    }
}

/// Collects every free name read anywhere in the body (including nested
/// function bodies, since a name read only inside a closure still needs to
/// resolve against this function's scope).
fn collect_read_names(body: &[Stmt], out: &mut AHashSet<StrId>) {
    fn visit_expr(expr: &Expr, out: &mut AHashSet<StrId>) {
        match &expr.kind {
            ExprKind::Name(n) => {
                out.insert(*n);
            }
            ExprKind::Const(_) | ExprKind::StrConst(_) => {}
            ExprKind::FStr(parts) => {
                for p in parts {
                    if let crate::ast::FStrPart::Expr(e) = p {
                        visit_expr(e, out);
                    }
                }
            }
            ExprKind::BinOp { lhs, rhs, .. } | ExprKind::Compare { lhs, rhs, .. } => {
                visit_expr(lhs, out);
                visit_expr(rhs, out);
            }
            ExprKind::UnaryOp { operand, .. } => visit_expr(operand, out),
            ExprKind::Call { callee, args } => {
                visit_expr(callee, out);
                for a in args {
                    visit_expr(a, out);
                }
            }
            ExprKind::GetAttr { obj, .. } => visit_expr(obj, out),
            ExprKind::SetAttr { obj, value, .. } => {
                visit_expr(obj, out);
                visit_expr(value, out);
            }
            ExprKind::GetItem { obj, index } => {
                visit_expr(obj, out);
                visit_expr(index, out);
            }
            ExprKind::SetItem { obj, index, value } => {
                visit_expr(obj, out);
                visit_expr(index, out);
                visit_expr(value, out);
            }
            ExprKind::List(items) | ExprKind::Tuple(items) => {
                for i in items {
                    visit_expr(i, out);
                }
            }
        }
    }

    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { value, .. } => visit_expr(value, out),
            StmtKind::VarDef { value, .. } => {
                if let Some(v) = value {
                    visit_expr(v, out);
                }
            }
            StmtKind::If { cond, then_body, else_body } => {
                visit_expr(cond, out);
                collect_read_names(then_body, out);
                collect_read_names(else_body, out);
            }
            StmtKind::While { cond, body } => {
                visit_expr(cond, out);
                collect_read_names(body, out);
            }
            StmtKind::For { iter, body, .. } => {
                visit_expr(iter, out);
                collect_read_names(body, out);
            }
            StmtKind::Return(Some(e)) | StmtKind::Raise(e) | StmtKind::Expr(e) => visit_expr(e, out),
            StmtKind::Return(None) | StmtKind::Pass => {}
            StmtKind::FuncDef(def) => collect_read_names(&def.body, out),
            StmtKind::ClassDef(def) => {
                for m in &def.methods {
                    collect_read_names(&m.body, out);
                }
            }
        }
    }
}

/// Classifies every name referenced by `func` into Local / Outer / Global,
/// and every immediate param as Local. `outer` is the nearest enclosing
/// function's table (if any); `globals` is the module-level table.
///
/// Colors: a blue function's parameters are blue by contract (callers must
/// pass only blue arguments, `spec.md` §4.4); a red function's parameters
/// are red, since they are only known at call time.
#[must_use]
pub fn analyze_function(func: &FuncDef, outer: Option<&SymTable>, globals: &SymTable) -> SymTable {
    let mut table = SymTable::new();
    let param_color = if func.is_blue { Color::Blue } else { Color::Red };
    for param in &func.params {
        table.insert(param.name, Symbol { kind: SymbolKind::Local, static_type: param.ty.clone(), color: param_color, is_mutable: true });
    }

    let mut assigned = AHashMap::new();
    collect_assigned_types(&func.body, &mut assigned);
    let mut read = AHashSet::new();
    collect_read_names(&func.body, &mut read);

    for (name, ty) in assigned {
        table.entry_local(name, ty, param_color);
    }
    for name in read {
        if table.contains(name) {
            continue;
        }
        if let Some(outer_sym) = outer.and_then(|o| o.get(name)) {
            table.insert(name, Symbol { kind: SymbolKind::Outer, static_type: outer_sym.static_type.clone(), color: outer_sym.color, is_mutable: outer_sym.is_mutable });
        } else if let Some(global_sym) = globals.get(name) {
            table.insert(name, Symbol { kind: SymbolKind::Global, static_type: global_sym.static_type.clone(), color: global_sym.color, is_mutable: global_sym.is_mutable });
        }
        // Names resolved by neither scope are left unclassified here; the
        // (external) type checker is responsible for reporting an
        // unresolved-name error before this table is consulted at runtime.
    }
    table
}

impl SymTable {
    fn entry_local(&mut self, name: StrId, ty: TypeRef, color: Color) {
        self.symbols.entry(name).or_insert(Symbol { kind: SymbolKind::Local, static_type: ty, color, is_mutable: true });
    }
}

/// Verifies the color-monotonicity invariant from `spec.md` §8: "for every
/// expression, if any sub-expression is red, the expression is red."
#[must_use]
pub fn is_color_monotonic(expr: &Expr) -> bool {
    let children_colors: Vec<Color> = match &expr.kind {
        ExprKind::Const(_) | ExprKind::StrConst(_) | ExprKind::Name(_) => vec![],
        ExprKind::FStr(parts) => {
            parts.iter().filter_map(|p| if let crate::ast::FStrPart::Expr(e) = p { Some(e.color) } else { None }).collect()
        }
        ExprKind::BinOp { lhs, rhs, .. } | ExprKind::Compare { lhs, rhs, .. } => vec![lhs.color, rhs.color],
        ExprKind::UnaryOp { operand, .. } => vec![operand.color],
        ExprKind::Call { callee, args } => {
            let mut c = vec![callee.color];
            c.extend(args.iter().map(|a| a.color));
            c
        }
        ExprKind::GetAttr { obj, .. } => vec![obj.color],
        ExprKind::SetAttr { obj, value, .. } => vec![obj.color, value.color],
        ExprKind::GetItem { obj, index } => vec![obj.color, index.color],
        ExprKind::SetItem { obj, index, value } => vec![obj.color, index.color, value.color],
        ExprKind::List(items) | ExprKind::Tuple(items) => items.iter().map(|e| e.color).collect(),
    };
    let children_are_blue = children_colors.iter().all(|c| c.is_blue());
    let self_ok = if children_are_blue { true } else { expr.color.is_red() };
    self_ok
        && match &expr.kind {
            ExprKind::BinOp { lhs, rhs, .. } | ExprKind::Compare { lhs, rhs, .. } => is_color_monotonic(lhs) && is_color_monotonic(rhs),
            ExprKind::UnaryOp { operand, .. } => is_color_monotonic(operand),
            ExprKind::Call { callee, args } => is_color_monotonic(callee) && args.iter().all(is_color_monotonic),
            ExprKind::GetAttr { obj, .. } => is_color_monotonic(obj),
            ExprKind::SetAttr { obj, value, .. } => is_color_monotonic(obj) && is_color_monotonic(value),
            ExprKind::GetItem { obj, index } => is_color_monotonic(obj) && is_color_monotonic(index),
            ExprKind::SetItem { obj, index, value } => is_color_monotonic(obj) && is_color_monotonic(index) && is_color_monotonic(value),
            ExprKind::List(items) | ExprKind::Tuple(items) => items.iter().all(is_color_monotonic),
            ExprKind::FStr(parts) => parts.iter().all(|p| match p {
                crate::ast::FStrPart::Expr(e) => is_color_monotonic(e),
                crate::ast::FStrPart::Literal(_) => true,
            }),
            ExprKind::Const(_) | ExprKind::StrConst(_) | ExprKind::Name(_) => true,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, ConstValue};
    use crate::fqn::Fqn;
    use crate::intern::Interner;
    use crate::span::{LineCol, Span};
    use crate::types::{PrimKind, TypeObj};

    fn span() -> Span {
        let mut i = Interner::new();
        let f = i.intern("t.spy");
        Span::new(f, LineCol::new(0, 0), LineCol::new(0, 1))
    }

    fn i32_ty() -> TypeRef {
        TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4)
    }

    fn bool_ty() -> TypeRef {
        TypeObj::primitive(Fqn::new(["builtins"], "bool"), PrimKind::Bool, 1)
    }

    #[test]
    fn literal_on_literal_binop_is_blue_and_monotonic() {
        let lhs = Expr { span: span(), ty: i32_ty(), color: Color::Blue, kind: ExprKind::Const(ConstValue::I32(3)) };
        let rhs = Expr { span: span(), ty: i32_ty(), color: Color::Blue, kind: ExprKind::Const(ConstValue::I32(4)) };
        let sum = Expr { span: span(), ty: i32_ty(), color: Color::Blue, kind: ExprKind::BinOp { op: BinOp::Add, lhs: Box::new(lhs), rhs: Box::new(rhs) } };
        assert!(is_color_monotonic(&sum));
    }

    #[test]
    fn analyze_function_classifies_params_locals_and_globals_with_correct_colors() {
        use crate::ast::{FuncDef, Param, StmtKind};

        let mut interner = Interner::new();
        let x = interner.intern("x");
        let total = interner.intern("total");
        let shared = interner.intern("shared");

        let mut globals = SymTable::new();
        globals.insert(shared, Symbol { kind: SymbolKind::Global, static_type: i32_ty(), color: Color::Blue, is_mutable: false });

        // def f(x: i32) -> i32: total = x; return total + shared
        let assign = Stmt { span: span(), kind: StmtKind::Assign { target: total, value: Expr { span: span(), ty: i32_ty(), color: Color::Red, kind: ExprKind::Name(x) } } };
        let read = Expr {
            span: span(),
            ty: i32_ty(),
            color: Color::Red,
            kind: ExprKind::BinOp {
                op: BinOp::Add,
                lhs: Box::new(Expr { span: span(), ty: i32_ty(), color: Color::Red, kind: ExprKind::Name(total) }),
                rhs: Box::new(Expr { span: span(), ty: i32_ty(), color: Color::Blue, kind: ExprKind::Name(shared) }),
            },
        };
        let func = FuncDef {
            name: interner.intern("f"),
            span: span(),
            params: vec![Param { name: x, ty: i32_ty() }],
            // Deliberately distinct from `total`'s actual assigned type (i32) so a
            // regression that copies `func.ret_type` into every local's static_type
            // is caught instead of coinciding with the right answer.
            ret_type: bool_ty(),
            body: vec![assign, Stmt { span: span(), kind: StmtKind::Return(Some(read)) }],
            is_blue: false,
            is_generic: false,
            free_vars: vec![],
        };

        let table = analyze_function(&func, None, &globals);
        assert_eq!(table.get(x).expect("x is a local param").kind, SymbolKind::Local);
        assert_eq!(table.get(x).expect("x").color, Color::Red, "a red function's params are red");
        assert_eq!(table.get(x).expect("x").static_type, i32_ty(), "x keeps its declared param type");
        assert_eq!(table.get(total).expect("total is assigned locally").kind, SymbolKind::Local);
        assert_eq!(
            table.get(total).expect("total").static_type,
            i32_ty(),
            "total's static_type must come from the assigned expression (x: i32), not func.ret_type (bool)"
        );
        assert_eq!(table.get(shared).expect("shared falls back to the global table").kind, SymbolKind::Global);
        assert_eq!(table.get(shared).expect("shared").color, Color::Blue, "a global's color is inherited from its own table entry");
    }

    #[test]
    fn analyze_function_gives_blue_functions_blue_params() {
        use crate::ast::{FuncDef, Param};

        let mut interner = Interner::new();
        let x = interner.intern("x");
        let globals = SymTable::new();
        let func = FuncDef {
            name: interner.intern("g"),
            span: span(),
            params: vec![Param { name: x, ty: i32_ty() }],
            ret_type: i32_ty(),
            body: vec![],
            is_blue: true,
            is_generic: false,
            free_vars: vec![],
        };
        let table = analyze_function(&func, None, &globals);
        assert_eq!(table.get(x).expect("x is a local param").color, Color::Blue, "a blue function's params are blue by contract");
    }

    #[test]
    fn red_operand_forces_red_parent_and_monotonicity_check_catches_violations() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let lhs = Expr { span: span(), ty: i32_ty(), color: Color::Red, kind: ExprKind::Name(x) };
        let rhs = Expr { span: span(), ty: i32_ty(), color: Color::Blue, kind: ExprKind::Const(ConstValue::I32(4)) };
        let claimed_blue = Expr {
            span: span(),
            ty: i32_ty(),
            color: Color::Blue, // wrong: a red child forces the parent red
            kind: ExprKind::BinOp { op: BinOp::Add, lhs: Box::new(lhs.clone()), rhs: Box::new(rhs.clone()) },
        };
        assert!(!is_color_monotonic(&claimed_blue));

        let correctly_red = Expr { span: span(), ty: i32_ty(), color: Color::Red, kind: ExprKind::BinOp { op: BinOp::Add, lhs: Box::new(lhs), rhs: Box::new(rhs) } };
        assert!(is_color_monotonic(&correctly_red));
    }
}
