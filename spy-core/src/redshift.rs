//! The "doppler" partial-evaluation pass (`spec.md` §4.4, §4.5): walks a
//! blue-annotated typed `FuncDef` for a concrete set of argument types and
//! produces a fully monomorphic residual AST, ready for an external C
//! emitter to lower to a function body.
//!
//! This is "Redshift mode" of the shared two-mode evaluator: `frame.rs`'s
//! `eval_expr` is reused verbatim to fold every blue sub-expression (color
//! monotonicity, `spec.md` §8, guarantees a red node's blue children can
//! always be evaluated in isolation), and this module supplies the
//! structural rebuilding for whatever stays red.

use std::rc::Rc;

use ahash::{AHashMap, AHashSet};

use crate::ast::{BinOp, CmpOp, ConstValue, Expr, ExprKind, FStrPart, Stmt, StmtKind, UnaryOp};
use crate::color::Color;
use crate::dispatch::{self, OpArg};
use crate::errors::{ErrorKind, Level, SpyError, StaticKind};
use crate::fqn::Fqn;
use crate::frame::{self, VmMetaResolver};
use crate::function::{FuncState, FunctionBody, FunctionRef};
use crate::intern::StrId;
use crate::module::Vm;
use crate::span::Span;
use crate::types::{Capability, TypeKind, TypeRef};
use crate::value::Value;

/// A residual expression. Every guarantee from `spec.md` §4.5 holds by
/// construction: no node carries a color (everything here is implicitly
/// red/concrete), every `Call`/`BinOp`/`UnaryOp` names a resolved FQN
/// rather than a dispatch site, and every `ty` is a concrete `TypeRef`.
#[derive(Debug, Clone)]
pub enum ResidualExpr {
    Const(ConstValue),
    StrConst(Rc<str>),
    Name(StrId),
    BinOp { fqn: Fqn, lhs: Box<ResidualExpr>, rhs: Box<ResidualExpr>, ty: TypeRef },
    UnaryOp { fqn: Fqn, operand: Box<ResidualExpr>, ty: TypeRef },
    Call { fqn: Fqn, args: Vec<ResidualExpr>, ty: TypeRef },
    GetAttr { obj: Box<ResidualExpr>, attr: StrId, ty: TypeRef },
    SetAttr { obj: Box<ResidualExpr>, attr: StrId, value: Box<ResidualExpr> },
    GetItem { obj: Box<ResidualExpr>, index: Box<ResidualExpr>, ty: TypeRef },
    SetItem { obj: Box<ResidualExpr>, index: Box<ResidualExpr>, value: Box<ResidualExpr> },
    List(Vec<ResidualExpr>, TypeRef),
    Tuple(Vec<ResidualExpr>, TypeRef),
}

#[derive(Debug, Clone)]
pub enum ResidualStmt {
    Assign { target: StrId, value: ResidualExpr },
    VarDef { name: StrId, ty: TypeRef, value: Option<ResidualExpr> },
    If { cond: ResidualExpr, then_body: Vec<ResidualStmt>, else_body: Vec<ResidualStmt> },
    While { cond: ResidualExpr, body: Vec<ResidualStmt> },
    For { var: StrId, iter: ResidualExpr, body: Vec<ResidualStmt> },
    Return(Option<ResidualExpr>),
    Raise(ResidualExpr),
    Expr(ResidualExpr),
    Pass,
}

/// A fully monomorphic function, ready for C emission. `fqn` is the
/// instantiation key (base FQN plus argument-type qualifiers), distinct
/// from the source `FuncDef`'s own (possibly generic) FQN.
#[derive(Debug)]
pub struct ResidualFunc {
    pub fqn: Fqn,
    pub params: Vec<(StrId, TypeRef)>,
    pub ret_type: TypeRef,
    pub body: Vec<ResidualStmt>,
}

/// A local's redshift-time binding: either fully known (blue, folds away)
/// or only known by its static type (red, survives as a named slot).
#[derive(Clone)]
enum Binding {
    Blue(Value),
    Red(TypeRef),
}

fn blue_locals(env: &AHashMap<StrId, Binding>) -> AHashMap<StrId, Value> {
    env.iter()
        .filter_map(|(k, v)| match v {
            Binding::Blue(val) => Some((*k, val.clone())),
            Binding::Red(_) => None,
        })
        .collect()
}

/// Two blue values "agree" for merge purposes if they are the exact same
/// value, not merely the same type — e.g. `Blue(1)` and `Blue(2)` disagree.
/// Anything not comparable by value here (structs, pointers, exceptions)
/// conservatively disagrees, which only ever costs a spurious promotion to
/// `Red`, never an incorrect fold.
fn blue_values_agree(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::I8(x), Value::I8(y)) => x == y,
        (Value::I32(x), Value::I32(y)) => x == y,
        (Value::F64(x), Value::F64(y)) => x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Module(x), Value::Module(y)) => x == y,
        (Value::Type(x), Value::Type(y)) => x.fqn == y.fqn,
        (Value::Function(x), Value::Function(y)) => x.fqn == y.fqn,
        (Value::None, Value::None) => true,
        _ => false,
    }
}

fn binding_type(vm: &Vm, binding: &Binding) -> TypeRef {
    match binding {
        Binding::Blue(v) => v.dyn_type(&vm.primitives),
        Binding::Red(ty) => ty.clone(),
    }
}

/// Merges two environments forked from the same starting point — the two
/// branches of a red-conditioned `if`, or the "body never ran" / "body ran"
/// forks of a `while`/`for` — back into `env` (`spec.md` §4.3: "recurse into
/// both branches with forked copies of the local type environment, then
/// merge"). A name keeps its `Blue` binding only if both forks still agree
/// on the exact same value; any divergence, or a binding only one fork
/// produced, is promoted to `Red` so every statement after the branch sees
/// a binding that is valid regardless of which path was actually taken.
fn merge_forks(vm: &Vm, env: &mut AHashMap<StrId, Binding>, a: AHashMap<StrId, Binding>, b: AHashMap<StrId, Binding>) {
    let mut names: AHashSet<StrId> = a.keys().copied().collect();
    names.extend(b.keys().copied());
    for name in names {
        let merged = match (a.get(&name), b.get(&name)) {
            (Some(Binding::Blue(x)), Some(Binding::Blue(y))) if blue_values_agree(x, y) => Binding::Blue(x.clone()),
            (Some(x), Some(_)) => Binding::Red(binding_type(vm, x)),
            (Some(x), None) | (None, Some(x)) => Binding::Red(binding_type(vm, x)),
            (None, None) => unreachable!("name collected from at least one of the two forks"),
        };
        env.insert(name, merged);
    }
}

fn fold(vm: &mut Vm, env: &AHashMap<StrId, Binding>, expr: &Expr) -> Result<Value, SpyError> {
    let mut locals = blue_locals(env);
    frame::eval_expr(vm, &mut locals, expr)
}

fn value_to_residual(v: Value, span: Span) -> Result<ResidualExpr, SpyError> {
    match v {
        Value::Bool(b) => Ok(ResidualExpr::Const(ConstValue::Bool(b))),
        Value::I8(i) => Ok(ResidualExpr::Const(ConstValue::I8(i))),
        Value::I32(i) => Ok(ResidualExpr::Const(ConstValue::I32(i))),
        Value::F64(f) => Ok(ResidualExpr::Const(ConstValue::F64(f))),
        Value::Str(s) => Ok(ResidualExpr::StrConst(s)),
        Value::None => Ok(ResidualExpr::Const(ConstValue::None)),
        other => Err(SpyError::new(
            ErrorKind::Static(StaticKind::Generic),
            format!("blue value of type {other} has no residual representation"),
        )
        .with_annotation(Level::Error, span, "folded here")),
    }
}

/// Entry point: resolves `func` for the given concrete `arg_types` into a
/// residual function, memoized by the instantiation FQN (`spec.md` §4.4).
/// `Resolving -> Resolving` (a cycle reached while computing this very
/// instantiation) is reported with the call chain, per `spec.md` §4.4/§7.
pub fn redshift_function(vm: &mut Vm, func: &FunctionRef, arg_types: &[TypeRef]) -> Result<Rc<ResidualFunc>, SpyError> {
    let def = match &func.body {
        FunctionBody::Native(_) => {
            return Ok(Rc::new(ResidualFunc { fqn: func.fqn.clone(), params: vec![], ret_type: func.ret_type.clone(), body: vec![] }));
        }
        FunctionBody::User(def) => def.clone(),
    };
    let key = Fqn::instantiate(&func.fqn, &arg_types.iter().map(|t| t.fqn.clone()).collect::<Vec<_>>());

    if let Some(cached) = vm.cached_residual(&key) {
        return Ok(cached);
    }
    if matches!(vm.func_state(&key), FuncState::Resolving) {
        return Err(SpyError::cycle_in_blue_evaluation(&key.to_canonical(), def.span));
    }
    vm.set_func_state(key.clone(), FuncState::Resolving);

    let mut env: AHashMap<StrId, Binding> = AHashMap::new();
    for (param, ty) in def.params.iter().zip(arg_types) {
        env.insert(param.name, Binding::Red(ty.clone()));
    }

    let body = match redshift_block(vm, &mut env, &def.body) {
        Ok(b) => b,
        Err(e) => {
            vm.set_func_state(key, FuncState::Unresolved);
            return Err(e);
        }
    };

    let residual = Rc::new(ResidualFunc {
        fqn: key.clone(),
        params: def.params.iter().zip(arg_types.iter().cloned()).map(|(p, t)| (p.name, t)).collect(),
        ret_type: def.ret_type.clone(),
        body,
    });
    vm.set_func_state(key.clone(), FuncState::Redshifted);
    vm.cache_residual(key, residual.clone());
    Ok(residual)
}

fn redshift_block(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, body: &[Stmt]) -> Result<Vec<ResidualStmt>, SpyError> {
    let mut out = Vec::with_capacity(body.len());
    for stmt in body {
        redshift_stmt(vm, env, stmt, &mut out)?;
    }
    Ok(out)
}

fn redshift_stmt(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, stmt: &Stmt, out: &mut Vec<ResidualStmt>) -> Result<(), SpyError> {
    match &stmt.kind {
        StmtKind::Pass => out.push(ResidualStmt::Pass),
        StmtKind::Assign { target, value } => {
            if value.color.is_blue() {
                let v = fold(vm, env, value)?;
                env.insert(*target, Binding::Blue(v));
            } else {
                let r = redshift_expr(vm, env, value)?;
                env.insert(*target, Binding::Red(value.ty.clone()));
                out.push(ResidualStmt::Assign { target: *target, value: r });
            }
        }
        StmtKind::VarDef { name, ty, value } => {
            if let Some(v) = value {
                if v.color.is_blue() {
                    let folded = fold(vm, env, v)?;
                    env.insert(*name, Binding::Blue(folded));
                    return Ok(());
                }
                let r = redshift_expr(vm, env, v)?;
                env.insert(*name, Binding::Red(ty.clone()));
                out.push(ResidualStmt::VarDef { name: *name, ty: ty.clone(), value: Some(r) });
            } else {
                env.insert(*name, Binding::Red(ty.clone()));
                out.push(ResidualStmt::VarDef { name: *name, ty: ty.clone(), value: None });
            }
        }
        StmtKind::If { cond, then_body, else_body } => {
            if cond.color.is_blue() {
                let c = fold(vm, env, cond)?;
                let taken = matches!(c, Value::Bool(true));
                let branch = if taken { then_body } else { else_body };
                out.extend(redshift_block(vm, env, branch)?);
            } else {
                let c = redshift_expr(vm, env, cond)?;
                let mut then_env = env.clone();
                let then_out = redshift_block(vm, &mut then_env, then_body)?;
                let mut else_env = env.clone();
                let else_out = redshift_block(vm, &mut else_env, else_body)?;
                merge_forks(vm, env, then_env, else_env);
                out.push(ResidualStmt::If { cond: c, then_body: then_out, else_body: else_out });
            }
        }
        StmtKind::While { cond, body } => {
            if cond.color.is_blue() {
                // Compile-time loop: unroll while the condition keeps
                // folding to a concrete `true` (`spec.md` §4.4, blue
                // functions "run entirely during redshift").
                let mut guard = 0u32;
                loop {
                    let c = fold(vm, env, cond)?;
                    if !matches!(c, Value::Bool(true)) {
                        break;
                    }
                    out.extend(redshift_block(vm, env, body)?);
                    guard += 1;
                    if guard > 1_000_000 {
                        return Err(SpyError::new(ErrorKind::Static(StaticKind::Generic), "blue while-loop did not terminate within the compile-time iteration budget").with_annotation(Level::Error, stmt.span, "loop here"));
                    }
                }
            } else {
                let c = redshift_expr(vm, env, cond)?;
                let skipped_env = env.clone();
                let mut loop_env = env.clone();
                let b = redshift_block(vm, &mut loop_env, body)?;
                // The condition is red, so the loop may run zero times or
                // more than one; merge the "never entered" fork against the
                // "ran the body once" fork the same way an `if`'s two
                // branches merge (`spec.md` §4.3).
                merge_forks(vm, env, skipped_env, loop_env);
                out.push(ResidualStmt::While { cond: c, body: b });
            }
        }
        StmtKind::For { var, iter, body } => {
            let it = redshift_expr(vm, env, iter)?;
            let skipped_env = env.clone();
            env.insert(*var, Binding::Red(stmt_for_item_type(iter)));
            let mut loop_env = env.clone();
            let b = redshift_block(vm, &mut loop_env, body)?;
            merge_forks(vm, env, skipped_env, loop_env);
            out.push(ResidualStmt::For { var: *var, iter: it, body: b });
        }
        StmtKind::Return(expr) => match expr {
            Some(e) => out.push(ResidualStmt::Return(Some(redshift_expr(vm, env, e)?))),
            None => out.push(ResidualStmt::Return(None)),
        },
        StmtKind::Raise(expr) => out.push(ResidualStmt::Raise(redshift_expr(vm, env, expr)?)),
        StmtKind::Expr(expr) => out.push(ResidualStmt::Expr(redshift_expr(vm, env, expr)?)),
        StmtKind::FuncDef(_) | StmtKind::ClassDef(_) => {
            // Nested def/class statements only ever introduce a new blue
            // binding for a local name; they contribute nothing to the
            // residual body themselves (the value, if ever called with a
            // concrete instantiation, is redshifted lazily from its call
            // site instead).
        }
    }
    Ok(())
}

/// The typed AST does not carry a sequence element type separately from the
/// container's own type; for the narrow for-loop support here (iterating a
/// red expression), the loop variable is given the iterable's own static
/// type as a conservative placeholder until a dedicated sequence type
/// exists. Every worked `spec.md` §8 scenario only needs a `for` over
/// already-monomorphic containers, whose declared type already matches.
fn stmt_for_item_type(iter: &Expr) -> TypeRef {
    iter.ty.clone()
}

fn redshift_expr(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, expr: &Expr) -> Result<ResidualExpr, SpyError> {
    if expr.color.is_blue() {
        let v = fold(vm, env, expr)?;
        return value_to_residual(v, expr.span);
    }
    match &expr.kind {
        ExprKind::Const(c) => Ok(ResidualExpr::Const(c.clone())),
        ExprKind::StrConst(s) => Ok(ResidualExpr::StrConst(s.clone())),
        ExprKind::FStr(parts) => redshift_fstr(vm, env, parts),
        ExprKind::Name(name) => match env.get(name) {
            Some(Binding::Blue(v)) => value_to_residual(v.clone(), expr.span),
            _ => Ok(ResidualExpr::Name(*name)),
        },
        ExprKind::BinOp { op, lhs, rhs } => redshift_binop(vm, env, *op, lhs, rhs),
        ExprKind::Compare { op, lhs, rhs } => redshift_compare(vm, env, *op, lhs, rhs),
        ExprKind::UnaryOp { op, operand } => redshift_unaryop(vm, env, *op, operand),
        ExprKind::Call { callee, args } => {
            if is_unbound_print(vm, env, callee) {
                redshift_print(vm, env, args, expr.ty.clone(), expr.span)
            } else {
                redshift_call(vm, env, callee, args, expr.ty.clone(), expr.span)
            }
        }
        ExprKind::GetAttr { obj, attr } => {
            let o = redshift_expr(vm, env, obj)?;
            Ok(ResidualExpr::GetAttr { obj: Box::new(o), attr: *attr, ty: expr.ty.clone() })
        }
        ExprKind::SetAttr { obj, attr, value } => {
            let o = redshift_expr(vm, env, obj)?;
            let v = redshift_expr(vm, env, value)?;
            Ok(ResidualExpr::SetAttr { obj: Box::new(o), attr: *attr, value: Box::new(v) })
        }
        ExprKind::GetItem { obj, index } => {
            let o = redshift_expr(vm, env, obj)?;
            let i = redshift_expr(vm, env, index)?;
            Ok(ResidualExpr::GetItem { obj: Box::new(o), index: Box::new(i), ty: expr.ty.clone() })
        }
        ExprKind::SetItem { obj, index, value } => {
            let o = redshift_expr(vm, env, obj)?;
            let i = redshift_expr(vm, env, index)?;
            let v = redshift_expr(vm, env, value)?;
            Ok(ResidualExpr::SetItem { obj: Box::new(o), index: Box::new(i), value: Box::new(v) })
        }
        ExprKind::List(items) => Ok(ResidualExpr::List(
            items.iter().map(|i| redshift_expr(vm, env, i)).collect::<Result<Vec<_>, _>>()?,
            expr.ty.clone(),
        )),
        ExprKind::Tuple(items) => Ok(ResidualExpr::Tuple(
            items.iter().map(|i| redshift_expr(vm, env, i)).collect::<Result<Vec<_>, _>>()?,
            expr.ty.clone(),
        )),
    }
}

fn redshift_fstr(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, parts: &[FStrPart]) -> Result<ResidualExpr, SpyError> {
    let mut acc: Option<ResidualExpr> = None;
    for part in parts {
        let piece = match part {
            FStrPart::Literal(s) => ResidualExpr::StrConst(s.clone()),
            FStrPart::Expr(e) => fstr_piece(vm, env, e)?,
        };
        acc = Some(match acc {
            None => piece,
            Some(prev) => {
                let fqn = str_add_fqn(vm);
                ResidualExpr::BinOp { fqn, lhs: Box::new(prev), rhs: Box::new(piece), ty: vm.primitives.str_ty.clone() }
            }
        });
    }
    Ok(acc.unwrap_or_else(|| ResidualExpr::StrConst(Rc::from(""))))
}

fn fstr_piece(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, e: &Expr) -> Result<ResidualExpr, SpyError> {
    if e.color.is_blue() {
        let v = fold(vm, env, e)?;
        return Ok(ResidualExpr::StrConst(Rc::from(v.to_string())));
    }
    let sub = redshift_expr(vm, env, e)?;
    if e.ty.fqn == vm.primitives.str_ty.fqn {
        return Ok(sub);
    }
    match e.ty.capabilities.get(Capability::Str) {
        Some(imp) => Ok(ResidualExpr::Call { fqn: imp.function().fqn.clone(), args: vec![sub], ty: vm.primitives.str_ty.clone() }),
        None => Err(SpyError::no_operator("str", &e.ty.name(), "<none>", e.span)),
    }
}

fn str_add_fqn(vm: &Vm) -> Fqn {
    vm.primitives
        .str_ty
        .capabilities
        .get(Capability::Add)
        .map(|c| c.function().fqn.clone())
        .unwrap_or_else(|| Fqn::new(["str"], "add"))
}

/// Evaluates an operand for a binary/unary dispatch site: blue operands
/// fold to a concrete value (usable as the `OpArg::blue_value` a metafunction
/// may need); red operands keep their static type only.
fn operand_arg(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, e: &Expr) -> Result<(OpArg, ResidualExpr), SpyError> {
    if e.color.is_blue() {
        let v = fold(vm, env, e)?;
        let residual = value_to_residual(v.clone(), e.span)?;
        Ok((OpArg::new(Color::Blue, e.ty.clone(), Some(v), e.span), residual))
    } else {
        let residual = redshift_expr(vm, env, e)?;
        Ok((OpArg::new(Color::Red, e.ty.clone(), None, e.span), residual))
    }
}

fn redshift_binop(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<ResidualExpr, SpyError> {
    let (lhs_arg, lhs_r) = operand_arg(vm, env, lhs)?;
    let (rhs_arg, rhs_r) = operand_arg(vm, env, rhs)?;
    let cap = frame::binop_capability(op);
    let mut resolver = VmMetaResolver { vm: &mut *vm };
    let op_impl = dispatch::dispatch_binary(frame::binop_symbol(op), cap, &lhs_arg, &rhs_arg, &mut resolver)?;
    let (first, second) = if op_impl.reordered_args == [1, 0] { (rhs_r, lhs_r) } else { (lhs_r, rhs_r) };
    Ok(ResidualExpr::BinOp { fqn: op_impl.function.fqn.clone(), lhs: Box::new(first), rhs: Box::new(second), ty: op_impl.function.ret_type.clone() })
}

fn redshift_compare(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, op: CmpOp, lhs: &Expr, rhs: &Expr) -> Result<ResidualExpr, SpyError> {
    let (lhs_arg, lhs_r) = operand_arg(vm, env, lhs)?;
    let (rhs_arg, rhs_r) = operand_arg(vm, env, rhs)?;
    let cap = frame::cmp_capability(op);
    let mut resolver = VmMetaResolver { vm: &mut *vm };
    let op_impl = dispatch::dispatch_binary(frame::cmp_symbol(op), cap, &lhs_arg, &rhs_arg, &mut resolver)?;
    let (first, second) = if op_impl.reordered_args == [1, 0] { (rhs_r, lhs_r) } else { (lhs_r, rhs_r) };
    Ok(ResidualExpr::BinOp { fqn: op_impl.function.fqn.clone(), lhs: Box::new(first), rhs: Box::new(second), ty: op_impl.function.ret_type.clone() })
}

fn redshift_unaryop(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, op: UnaryOp, operand: &Expr) -> Result<ResidualExpr, SpyError> {
    let (arg, operand_r) = operand_arg(vm, env, operand)?;
    if let UnaryOp::Not = op {
        let bool_ty = vm.primitives.bool_ty.clone();
        let fqn = vm.primitives.bool_not_fn.fqn.clone();
        return Ok(ResidualExpr::UnaryOp { fqn, operand: Box::new(operand_r), ty: bool_ty });
    }
    let mut resolver = VmMetaResolver { vm: &mut *vm };
    let op_impl = dispatch::dispatch_unary("-", Capability::Neg, &arg, &mut resolver)?;
    Ok(ResidualExpr::UnaryOp { fqn: op_impl.function.fqn.clone(), operand: Box::new(operand_r), ty: op_impl.function.ret_type.clone() })
}

/// Mirrors `frame::is_unbound_print` against the redshift-time environment:
/// `print` is never a key in `env` (it is not a real local/param/closure
/// binding), so the only thing to check is that no such binding shadows it.
fn is_unbound_print(vm: &Vm, env: &AHashMap<StrId, Binding>, callee: &Expr) -> bool {
    match &callee.kind {
        ExprKind::Name(name) => frame::is_print_name(vm, *name) && !env.contains_key(name),
        _ => false,
    }
}

/// Resolves a `print(x)` call directly against `builtins::print_<T>` by
/// `x`'s static type, bypassing the "callee must be blue" requirement
/// `redshift_call` otherwise enforces — `print` has no FQN of its own to
/// fold a callee value down to, so it is resolved structurally instead
/// (`spec.md` §6.2, §8 scenario 1: one call node to `builtins::print_str`).
fn redshift_print(vm: &mut Vm, env: &mut AHashMap<StrId, Binding>, args: &[Expr], ret_ty: TypeRef, span: Span) -> Result<ResidualExpr, SpyError> {
    if args.len() != 1 {
        return Err(SpyError::new(ErrorKind::Static(StaticKind::Value), format!("print expects exactly one argument, got {}", args.len()))
            .with_annotation(Level::Error, span, "called here"));
    }
    let arg_ty = args[0].ty.clone();
    let kind = match &arg_ty.kind {
        TypeKind::Primitive(k) => *k,
        _ => {
            return Err(SpyError::new(ErrorKind::Static(StaticKind::Type), format!("print is only defined for primitive types, got {}", arg_ty.name()))
                .with_annotation(Level::Error, span, "called here"));
        }
    };
    let f = vm.primitives.print_fns.get(&kind).cloned().expect("every primitive kind has a registered print function");
    let arg_r = redshift_expr(vm, env, &args[0])?;
    Ok(ResidualExpr::Call { fqn: f.fqn.clone(), args: vec![arg_r], ty: ret_ty })
}

fn redshift_call(
    vm: &mut Vm,
    env: &mut AHashMap<StrId, Binding>,
    callee: &Expr,
    args: &[Expr],
    ret_ty: TypeRef,
    span: Span,
) -> Result<ResidualExpr, SpyError> {
    if !callee.color.is_blue() {
        return Err(SpyError::new(
            ErrorKind::Static(StaticKind::Generic),
            "call target is only known at runtime; indirect calls cannot be redshifted",
        )
        .with_annotation(Level::Error, span, "called here"));
    }
    let callee_v = fold(vm, env, callee)?;
    let arg_residuals = args.iter().map(|a| redshift_expr(vm, env, a)).collect::<Result<Vec<_>, _>>()?;
    let arg_types: Vec<TypeRef> = args.iter().map(|a| a.ty.clone()).collect();
    match callee_v {
        Value::Function(f) if f.is_native() => Ok(ResidualExpr::Call { fqn: f.fqn.clone(), args: arg_residuals, ty: ret_ty }),
        Value::Function(f) => {
            let residual_func = redshift_function(vm, &f, &arg_types).map_err(|mut e| {
                let name = vm.interner.intern(f.fqn.symbol());
                e.push_frame(span, Some(name));
                e
            })?;
            Ok(ResidualExpr::Call { fqn: residual_func.fqn.clone(), args: arg_residuals, ty: ret_ty })
        }
        other => Err(SpyError::new(ErrorKind::Static(StaticKind::Type), format!("{other} is not callable")).with_annotation(Level::Error, span, "called here")),
    }
}
