//! The tree-walking evaluator (`spec.md` §4): executes a typed `FuncDef`
//! body against concrete argument `Value`s.
//!
//! This is "Interp mode" of the two-mode evaluator the component table in
//! `spec.md` promises: the same expression/statement walk that `redshift.rs`
//! drives in "Redshift mode" to partially evaluate blue code. Interp mode
//! never looks at an expression's `color` — every local already has a
//! concrete binding by the time this runs, whether it originated from a
//! blue constant or a red call argument, so dispatch only ever needs each
//! operand's dynamic type.

use ahash::AHashMap;

use crate::ast::{BinOp, CmpOp, ConstValue, Expr, ExprKind, FStrPart, Stmt, StmtKind, UnaryOp};
use crate::color::Color;
use crate::dispatch::{self, MetaResolver, OpArg, OpImpl};
use crate::errors::SpyError;
use crate::function::{FunctionBody, FunctionRef};
use crate::intern::StrId;
use crate::module::Vm;
use crate::types::Capability;
use crate::value::Value;

/// What a statement (or block) did: either it ran through, or it hit a
/// `return` and the enclosing call should unwind with that value.
pub(crate) enum Flow {
    Next,
    Return(Value),
}

/// Adapts `Vm::call_function` to the `MetaResolver` contract so
/// `dispatch::dispatch_binary`/`dispatch_unary` can invoke a blue
/// metafunction without depending on the evaluator directly.
///
/// A metafunction is called with one argument per operand: its concrete
/// value if the operand is blue, or its static type (as a `Value::Type`)
/// otherwise — mirroring how a generic sees "either the value or just the
/// shape" depending on what is known at the call site. It is expected to
/// return a `Value::Function` naming the concrete implementation to use;
/// any other return value means "no specialized implementation offered".
pub(crate) struct VmMetaResolver<'a> {
    pub(crate) vm: &'a mut Vm,
}

impl MetaResolver for VmMetaResolver<'_> {
    fn invoke_meta(&mut self, meta: &FunctionRef, args: &[OpArg]) -> Result<Option<OpImpl>, SpyError> {
        let call_args: Vec<Value> =
            args.iter().map(|a| a.blue_value.clone().unwrap_or_else(|| Value::Type(a.static_type.clone()))).collect();
        match self.vm.call_function(meta, call_args)? {
            Value::Function(f) => Ok(Some(OpImpl::identity(f, args.len()))),
            _ => Ok(None),
        }
    }
}

/// Calls `func` with `args` bound to its parameters, running its body to
/// completion and returning its result. Native functions short-circuit
/// straight to their Rust body.
pub fn call_interp(vm: &mut Vm, func: &FunctionRef, args: Vec<Value>) -> Result<Value, SpyError> {
    let def = match &func.body {
        FunctionBody::Native(native) => return native(&args),
        FunctionBody::User(def) => def.clone(),
    };
    let mut locals: AHashMap<StrId, Value> = AHashMap::with_capacity(def.params.len() + def.free_vars.len());
    for (param, value) in def.params.iter().zip(args) {
        locals.insert(param.name, value);
    }
    for (name, value) in def.free_vars.iter().zip(func.closure.iter()) {
        locals.insert(*name, value.clone());
    }
    match exec_block(vm, &mut locals, &def.body)? {
        Flow::Return(v) => Ok(v),
        Flow::Next => Ok(Value::None),
    }
}

pub(crate) fn exec_block(vm: &mut Vm, locals: &mut AHashMap<StrId, Value>, body: &[Stmt]) -> Result<Flow, SpyError> {
    for stmt in body {
        match exec_stmt(vm, locals, stmt)? {
            Flow::Next => {}
            ret @ Flow::Return(_) => return Ok(ret),
        }
    }
    Ok(Flow::Next)
}

pub(crate) fn exec_stmt(vm: &mut Vm, locals: &mut AHashMap<StrId, Value>, stmt: &Stmt) -> Result<Flow, SpyError> {
    match &stmt.kind {
        StmtKind::Pass => Ok(Flow::Next),
        StmtKind::Assign { target, value } => {
            let v = eval_expr(vm, locals, value)?;
            locals.insert(*target, v);
            Ok(Flow::Next)
        }
        StmtKind::VarDef { name, value, .. } => {
            let v = match value {
                Some(e) => eval_expr(vm, locals, e)?,
                None => Value::None,
            };
            locals.insert(*name, v);
            Ok(Flow::Next)
        }
        StmtKind::If { cond, then_body, else_body } => {
            let c = eval_expr(vm, locals, cond)?;
            let taken = truthy(&c);
            if taken { exec_block(vm, locals, then_body) } else { exec_block(vm, locals, else_body) }
        }
        StmtKind::While { cond, body } => {
            loop {
                let c = eval_expr(vm, locals, cond)?;
                if !truthy(&c) {
                    break;
                }
                match exec_block(vm, locals, body)? {
                    Flow::Next => {}
                    ret @ Flow::Return(_) => return Ok(ret),
                }
            }
            Ok(Flow::Next)
        }
        StmtKind::For { var, iter, body } => {
            let iterable = eval_expr(vm, locals, iter)?;
            let iterator = call_capability(vm, &iterable, Capability::Iter, &[], stmt.span)?;
            loop {
                let item = match dispatch_unary_capability_call(vm, &iterator, Capability::Next, &[], stmt.span) {
                    Ok(v) => v,
                    Err(_) => break,
                };
                locals.insert(*var, item);
                match exec_block(vm, locals, body)? {
                    Flow::Next => {}
                    ret @ Flow::Return(_) => return Ok(ret),
                }
            }
            Ok(Flow::Next)
        }
        StmtKind::Return(expr) => {
            let v = match expr {
                Some(e) => eval_expr(vm, locals, e)?,
                None => Value::None,
            };
            Ok(Flow::Return(v))
        }
        StmtKind::Raise(expr) => {
            let v = eval_expr(vm, locals, expr)?;
            match v {
                Value::Exception(exc) => {
                    Err(SpyError::new(crate::errors::ErrorKind::Panic(crate::errors::PanicKind::NullDeref), exc.message.clone())
                        .with_annotation(crate::errors::Level::Error, stmt.span, "raised here"))
                }
                other => Err(SpyError::new(
                    crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type),
                    format!("raise expects an exception value, got {other}"),
                )),
            }
        }
        StmtKind::Expr(expr) => {
            eval_expr(vm, locals, expr)?;
            Ok(Flow::Next)
        }
        StmtKind::FuncDef(def) => {
            let free_values = def.free_vars.iter().map(|n| locals.get(n).cloned().unwrap_or(Value::None)).collect();
            let fqn = crate::fqn::Fqn::new(["<local>"], vm.interner.resolve(def.name).to_string());
            let wrapper = crate::function::FunctionWrapper::from_def(fqn, def.clone(), free_values);
            locals.insert(def.name, Value::Function(wrapper));
            Ok(Flow::Next)
        }
        StmtKind::ClassDef(_) => {
            // Local (nested) class definitions are out of scope: every
            // example in `spec.md` §8 defines classes at module level only.
            Ok(Flow::Next)
        }
    }
}

#[must_use]
fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::I8(i) => *i != 0,
        Value::I32(i) => *i != 0,
        Value::F64(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::None => false,
        _ => true,
    }
}

fn call_capability(vm: &mut Vm, receiver: &Value, cap: Capability, args: &[Value], span: crate::span::Span) -> Result<Value, SpyError> {
    dispatch_unary_capability_call(vm, receiver, cap, args, span)
}

fn dispatch_unary_capability_call(vm: &mut Vm, receiver: &Value, cap: Capability, args: &[Value], span: crate::span::Span) -> Result<Value, SpyError> {
    let receiver_ty = receiver.dyn_type(&vm.primitives);
    let receiver_arg = OpArg::new(Color::Red, receiver_ty, Some(receiver.clone()), span);
    let extra_args: Vec<OpArg> = args.iter().map(|a| OpArg::new(Color::Red, a.dyn_type(&vm.primitives), Some(a.clone()), span)).collect();
    let op_name = cap.to_string();
    let mut resolver = VmMetaResolver { vm: &mut *vm };
    let op_impl = dispatch::dispatch_unary_capability(&op_name, cap, &receiver_arg, &extra_args, &mut resolver)?;
    let mut call_args = vec![receiver.clone()];
    call_args.extend(args.iter().cloned());
    let ordered: Vec<Value> = op_impl.reordered_args.iter().map(|&i| call_args[i].clone()).collect();
    vm.call_function(&op_impl.function, ordered)
}

pub(crate) fn eval_expr(vm: &mut Vm, locals: &mut AHashMap<StrId, Value>, expr: &Expr) -> Result<Value, SpyError> {
    match &expr.kind {
        ExprKind::Const(c) => Ok(const_to_value(c)),
        ExprKind::StrConst(s) => Ok(Value::Str(s.clone())),
        ExprKind::FStr(parts) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    FStrPart::Literal(s) => out.push_str(s),
                    FStrPart::Expr(e) => {
                        let v = eval_expr(vm, locals, e)?;
                        out.push_str(&v.to_string());
                    }
                }
            }
            Ok(Value::Str(out.into()))
        }
        ExprKind::Name(name) => locals.get(name).cloned().or_else(|| lookup_global(vm, *name)).ok_or_else(|| {
            SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Value), format!("name '{}' is not defined", vm.interner.resolve(*name)))
                .with_annotation(crate::errors::Level::Error, expr.span, "used here")
        }),
        ExprKind::BinOp { op, lhs, rhs } => eval_binop(vm, locals, *op, lhs, rhs, expr.span),
        ExprKind::Compare { op, lhs, rhs } => eval_compare(vm, locals, *op, lhs, rhs, expr.span),
        ExprKind::UnaryOp { op, operand } => eval_unaryop(vm, locals, *op, operand, expr.span),
        ExprKind::Call { callee, args } => {
            if is_unbound_print(vm, locals, callee) {
                let mut arg_values = Vec::with_capacity(args.len());
                for a in args {
                    arg_values.push(eval_expr(vm, locals, a)?);
                }
                return call_print(vm, &arg_values, expr.span);
            }
            let callee_v = eval_expr(vm, locals, callee)?;
            let mut arg_values = Vec::with_capacity(args.len());
            for a in args {
                arg_values.push(eval_expr(vm, locals, a)?);
            }
            match callee_v {
                Value::Function(f) if f.is_generic => call_generic(vm, &f, arg_values, expr.span),
                Value::Function(f) => vm.call_function(&f, arg_values).map_err(|mut e| {
                    let name = vm.interner.intern(f.fqn.symbol());
                    e.push_frame(expr.span, Some(name));
                    e
                }),
                Value::Type(ty) => construct(vm, &ty, arg_values, expr.span),
                other => Err(SpyError::new(
                    crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type),
                    format!("{other} is not callable"),
                )
                .with_annotation(crate::errors::Level::Error, expr.span, "called here")),
            }
        }
        ExprKind::GetAttr { obj, attr } => {
            let receiver = eval_expr(vm, locals, obj)?;
            get_attr(vm, &receiver, *attr, expr.span)
        }
        ExprKind::SetAttr { obj, attr, value } => {
            let receiver = eval_expr(vm, locals, obj)?;
            let v = eval_expr(vm, locals, value)?;
            set_attr(vm, receiver, *attr, v, expr.span)
        }
        ExprKind::GetItem { obj, index } => {
            let receiver = eval_expr(vm, locals, obj)?;
            let idx = eval_expr(vm, locals, index)?;
            call_capability(vm, &receiver, Capability::GetItem, &[idx], expr.span)
        }
        ExprKind::SetItem { obj, index, value } => {
            let receiver = eval_expr(vm, locals, obj)?;
            let idx = eval_expr(vm, locals, index)?;
            let v = eval_expr(vm, locals, value)?;
            call_capability(vm, &receiver, Capability::SetItem, &[idx, v], expr.span)
        }
        ExprKind::List(items) | ExprKind::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for i in items {
                out.push(eval_expr(vm, locals, i)?);
            }
            // Lists/tuples are represented as struct-shaped aggregates at
            // this layer; a dedicated sequence builtin is out of scope
            // (`spec.md` Non-goals: "a standard library").
            Ok(Value::Struct(std::rc::Rc::new(crate::value::StructInstance::new(expr.ty.clone(), out))))
        }
    }
}

fn lookup_global(vm: &Vm, name: StrId) -> Option<Value> {
    for module in vm.modules.values() {
        if let Some(v) = module.globals.get(&name) {
            return Some(v.clone());
        }
    }
    None
}

/// Whether `callee` is a bare reference to the reserved name `print` with no
/// local or global binding shadowing it (`spec.md` §6.2's `print_<T>`
/// entries). `print` is not itself a name in any module's globals — both
/// evaluator modes recognize the call shape directly, the same way a
/// dunder method name is recognized rather than looked up as a value.
pub(crate) fn is_unbound_print(vm: &Vm, locals: &AHashMap<StrId, Value>, callee: &Expr) -> bool {
    match &callee.kind {
        ExprKind::Name(name) => is_print_name(vm, *name) && locals.get(name).is_none() && lookup_global(vm, *name).is_none(),
        _ => false,
    }
}

pub(crate) fn is_print_name(vm: &Vm, name: StrId) -> bool {
    vm.interner.resolve(name) == "print"
}

/// Resolves `print`'s single argument to the matching `builtins::print_<T>`
/// native function by its dynamic type and calls it.
pub(crate) fn call_print(vm: &mut Vm, args: &[Value], span: crate::span::Span) -> Result<Value, SpyError> {
    if args.len() != 1 {
        return Err(SpyError::new(
            crate::errors::ErrorKind::Static(crate::errors::StaticKind::Value),
            format!("print expects exactly one argument, got {}", args.len()),
        )
        .with_annotation(crate::errors::Level::Error, span, "called here"));
    }
    let kind = crate::value::prim_kind_of(&args[0]).ok_or_else(|| {
        SpyError::new(
            crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type),
            format!("print is only defined for primitive types, got {}", args[0].type_name(&vm.primitives)),
        )
        .with_annotation(crate::errors::Level::Error, span, "called here")
    })?;
    let f = vm.primitives.print_fns.get(&kind).expect("every primitive kind has a registered print function").clone();
    vm.call_function(&f, vec![args[0].clone()])
}

/// Calls a `blue.generic` function, memoizing its result by the FQNs of its
/// (type-valued) arguments (`spec.md` §4.4/§9, "generic memoization": calls
/// sharing the same argument FQNs share the same cached result, the sole
/// monomorphization mechanism). A generic's arguments are themselves types
/// or other blue values with a type of their own, so each argument's
/// `dyn_type` FQN is what keys the cache, not its runtime identity.
pub(crate) fn call_generic(vm: &mut Vm, f: &crate::function::FunctionRef, args: Vec<Value>, span: crate::span::Span) -> Result<Value, SpyError> {
    let arg_fqns: Vec<crate::fqn::Fqn> = args.iter().map(|a| a.dyn_type(&vm.primitives).fqn.clone()).collect();
    let key = crate::fqn::Fqn::instantiate(&f.fqn, &arg_fqns);
    if let Some(cached) = vm.generics.get(&key) {
        return Ok(cached.clone());
    }
    let result = vm.call_function(f, args).map_err(|mut e| {
        let name = vm.interner.intern(f.fqn.symbol());
        e.push_frame(span, Some(name));
        e
    })?;
    vm.generics.insert(key, result.clone());
    Ok(result)
}

fn get_attr(vm: &mut Vm, receiver: &Value, attr: StrId, span: crate::span::Span) -> Result<Value, SpyError> {
    if let Value::Struct(s) = receiver {
        let attr_name = vm.interner.resolve(attr);
        if let Some(idx) = s.field_index(attr_name) {
            return Ok(s.fields[idx].clone());
        }
    }
    call_capability(vm, receiver, Capability::GetAttr, &[Value::Str(vm.interner.resolve(attr).into())], span)
}

/// Field assignment (`spec.md` §4.3 edge cases): a bare struct value is
/// immutable, so assigning through one is always a `StaticError`; assigning
/// through a pointer mutates the pointee in place.
fn set_attr(vm: &mut Vm, receiver: Value, attr: StrId, value: Value, span: crate::span::Span) -> Result<Value, SpyError> {
    match receiver {
        Value::Ptr(ptr) => {
            let mut cell = ptr.cell.borrow_mut();
            if let Value::Struct(s) = &mut *cell {
                let attr_name = vm.interner.resolve(attr).to_string();
                if let Some(idx) = s.field_index(&attr_name) {
                    std::rc::Rc::make_mut(s).fields[idx] = value.clone();
                    return Ok(value);
                }
            }
            Err(SpyError::new(
                crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type),
                format!("no field '{}' on pointee", vm.interner.resolve(attr)),
            )
            .with_annotation(crate::errors::Level::Error, span, "assigned here"))
        }
        Value::Struct(_) => Err(SpyError::struct_field_assignment(vm.interner.resolve(attr), span)),
        other => call_capability(vm, &other, Capability::SetAttr, &[Value::Str(vm.interner.resolve(attr).into()), value], span),
    }
}

fn construct(vm: &mut Vm, ty: &crate::types::TypeRef, args: Vec<Value>, span: crate::span::Span) -> Result<Value, SpyError> {
    if let crate::types::TypeKind::Struct { .. } = &ty.kind {
        return Ok(Value::Struct(std::rc::Rc::new(crate::value::StructInstance::new(ty.clone(), args))));
    }
    let receiver = Value::Type(ty.clone());
    call_capability(vm, &receiver, Capability::New, &args, span)
}

fn const_to_value(c: &ConstValue) -> Value {
    match c {
        ConstValue::Bool(b) => Value::Bool(*b),
        ConstValue::I8(i) => Value::I8(*i),
        ConstValue::I32(i) => Value::I32(*i),
        ConstValue::F64(f) => Value::F64(*f),
        ConstValue::None => Value::None,
    }
}

pub(crate) fn binop_capability(op: BinOp) -> Capability {
    match op {
        BinOp::Add => Capability::Add,
        BinOp::Sub => Capability::Sub,
        BinOp::Mul => Capability::Mul,
        BinOp::TrueDiv => Capability::TrueDiv,
        BinOp::FloorDiv => Capability::FloorDiv,
        BinOp::Mod => Capability::Mod,
    }
}

pub(crate) fn binop_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::TrueDiv => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
    }
}

pub(crate) fn cmp_capability(op: CmpOp) -> Capability {
    match op {
        CmpOp::Eq => Capability::Eq,
        CmpOp::Ne => Capability::Ne,
        CmpOp::Lt => Capability::Lt,
        CmpOp::Le => Capability::Le,
        CmpOp::Gt => Capability::Gt,
        CmpOp::Ge => Capability::Ge,
    }
}

pub(crate) fn cmp_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::Ne => "!=",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

fn eval_binop(vm: &mut Vm, locals: &mut AHashMap<StrId, Value>, op: BinOp, lhs: &Expr, rhs: &Expr, span: crate::span::Span) -> Result<Value, SpyError> {
    let lv = eval_expr(vm, locals, lhs)?;
    let rv = eval_expr(vm, locals, rhs)?;
    dispatch_binary_values(vm, binop_symbol(op), binop_capability(op), lv, rv, span)
}

fn eval_compare(vm: &mut Vm, locals: &mut AHashMap<StrId, Value>, op: CmpOp, lhs: &Expr, rhs: &Expr, span: crate::span::Span) -> Result<Value, SpyError> {
    let lv = eval_expr(vm, locals, lhs)?;
    let rv = eval_expr(vm, locals, rhs)?;
    dispatch_binary_values(vm, cmp_symbol(op), cmp_capability(op), lv, rv, span)
}

fn dispatch_binary_values(vm: &mut Vm, op_name: &str, cap: Capability, lv: Value, rv: Value, span: crate::span::Span) -> Result<Value, SpyError> {
    let lhs_arg = OpArg::new(Color::Red, lv.dyn_type(&vm.primitives), Some(lv.clone()), span);
    let rhs_arg = OpArg::new(Color::Red, rv.dyn_type(&vm.primitives), Some(rv.clone()), span);
    let mut resolver = VmMetaResolver { vm: &mut *vm };
    let op_impl = dispatch::dispatch_binary(op_name, cap, &lhs_arg, &rhs_arg, &mut resolver)?;
    let ordered: Vec<Value> = op_impl.reordered_args.iter().map(|&i| if i == 0 { lv.clone() } else { rv.clone() }).collect();
    vm.call_function(&op_impl.function, ordered)
}

fn eval_unaryop(vm: &mut Vm, locals: &mut AHashMap<StrId, Value>, op: UnaryOp, operand: &Expr, span: crate::span::Span) -> Result<Value, SpyError> {
    let v = eval_expr(vm, locals, operand)?;
    if let UnaryOp::Not = op {
        return Ok(Value::Bool(!truthy(&v)));
    }
    let arg = OpArg::new(Color::Red, v.dyn_type(&vm.primitives), Some(v.clone()), span);
    let mut resolver = VmMetaResolver { vm: &mut *vm };
    let op_impl = dispatch::dispatch_unary("-", Capability::Neg, &arg, &mut resolver)?;
    vm.call_function(&op_impl.function, vec![v])
}
