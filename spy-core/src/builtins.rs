//! Registration of the primitive types and the `operator::*`/`str::*` FQNs
//! from the `libspy` contract (`spec.md` §6.2), plus the native Rust bodies
//! that back them for interp mode.
//!
//! This plays the role the teacher's `modules/operator.rs` plays for the
//! `operator` module: one FQN per Python-operator equivalent, each
//! delegating to the same logic the evaluator uses internally. Here the
//! "internal logic" and the `libspy` contract are the same functions,
//! since both the interpreter and the emitted C code must agree on
//! semantics bit-for-bit (floor-division rounding, saturating casts,
//! string hashing).

use std::rc::Rc;

use ahash::AHashMap;

use crate::errors::SpyError;
use crate::fqn::Fqn;
use crate::function::{FunctionBody, FunctionRef, FunctionWrapper};
use crate::span::{LineCol, Span};
use crate::types::{Capability, CapabilityImpl, CapabilityTable, PrimKind, TypeKind, TypeObj, TypeRef};
use crate::value::Value;

/// The concrete primitive types every SPy program can use without
/// importing anything, and a fully wired-up capability table on each.
#[derive(Debug, Clone)]
pub struct Primitives {
    pub bool_ty: TypeRef,
    pub i8_ty: TypeRef,
    pub i32_ty: TypeRef,
    pub f64_ty: TypeRef,
    pub str_ty: TypeRef,
    pub module_ty: TypeRef,
    pub type_ty: TypeRef,
    pub exception_ty: TypeRef,
    /// `not` is not a dispatched capability (it has no reflected/overridden
    /// form, `spec.md` §4.1's table omits it) so it is kept as a standalone
    /// native function rather than a `bool_ty` capability slot; redshift
    /// needs a concrete FQN for it just like any other residual call.
    pub bool_not_fn: FunctionRef,
    /// `builtins::print_<T>`, one per primitive kind (`spec.md` §6.2). `print`
    /// itself is not a name bound in any module — the frame evaluator and the
    /// doppler pass both recognize a call to the unbound name `print` and
    /// resolve it directly against this table by the argument's type, the
    /// same way `bool_not_fn` stands in for an operator with no dispatch slot.
    pub print_fns: AHashMap<PrimKind, FunctionRef>,
}

fn no_op_span() -> Span {
    // Native functions have no source location of their own; errors raised
    // inside them are annotated with the call site's span by the caller
    // before being surfaced, so this placeholder is never shown to a user.
    Span::new(crate::intern::StrId::default(), LineCol::new(0, 0), LineCol::new(0, 0))
}

impl Primitives {
    #[must_use]
    pub fn new() -> Self {
        let mut bool_ty = TypeObj { fqn: Fqn::new(["builtins"], "bool"), kind: TypeKind::Primitive(PrimKind::Bool), capabilities: CapabilityTable::new(), size_hint: 1 };
        let mut i32_ty = TypeObj { fqn: Fqn::new(["builtins"], "i32"), kind: TypeKind::Primitive(PrimKind::I32), capabilities: CapabilityTable::new(), size_hint: 4 };
        let mut i8_ty = TypeObj { fqn: Fqn::new(["builtins"], "i8"), kind: TypeKind::Primitive(PrimKind::I8), capabilities: CapabilityTable::new(), size_hint: 1 };
        let mut f64_ty = TypeObj { fqn: Fqn::new(["builtins"], "f64"), kind: TypeKind::Primitive(PrimKind::F64), capabilities: CapabilityTable::new(), size_hint: 8 };
        let mut str_ty = TypeObj { fqn: Fqn::new(["builtins"], "str"), kind: TypeKind::Primitive(PrimKind::Str), capabilities: CapabilityTable::new(), size_hint: 0 };
        let module_ty = TypeObj { fqn: Fqn::new(["builtins"], "module"), kind: TypeKind::User, capabilities: CapabilityTable::new(), size_hint: 0 };
        let type_ty = TypeObj { fqn: Fqn::new(["builtins"], "type"), kind: TypeKind::TypeType, capabilities: CapabilityTable::new(), size_hint: 0 };
        let mut exception_ty = TypeObj { fqn: Fqn::new(["builtins"], "Exception"), kind: TypeKind::Exception, capabilities: CapabilityTable::new(), size_hint: 0 };

        register_i32_ops(&mut i32_ty);
        register_f64_ops(&mut f64_ty);
        register_str_ops(&mut str_ty);
        register_bool_ops(&mut bool_ty);
        register_exception_ops(&mut exception_ty);

        let bool_ty = Rc::new(bool_ty);
        let i8_ty = Rc::new(i8_ty);
        let i32_ty = Rc::new(i32_ty);
        let f64_ty = Rc::new(f64_ty);
        let str_ty = Rc::new(str_ty);
        let module_ty = Rc::new(module_ty);

        let bool_not_fn = FunctionWrapper::native(Fqn::new(["operator"], "bool_not"), vec![bool_ty.clone()], bool_ty.clone(), |a| match &a[0] {
            Value::Bool(b) => Ok(Value::Bool(!*b)),
            other => Ok(Value::Bool(!truthy_primitive(other))),
        });

        let mut print_fns = AHashMap::new();
        print_fns.insert(PrimKind::Bool, FunctionWrapper::native(Fqn::new(["builtins"], "print_bool"), vec![bool_ty.clone()], module_ty.clone(), print_value));
        print_fns.insert(PrimKind::I8, FunctionWrapper::native(Fqn::new(["builtins"], "print_i8"), vec![i8_ty.clone()], module_ty.clone(), print_value));
        print_fns.insert(PrimKind::I32, FunctionWrapper::native(Fqn::new(["builtins"], "print_i32"), vec![i32_ty.clone()], module_ty.clone(), print_value));
        print_fns.insert(PrimKind::F64, FunctionWrapper::native(Fqn::new(["builtins"], "print_f64"), vec![f64_ty.clone()], module_ty.clone(), print_value));
        print_fns.insert(PrimKind::Str, FunctionWrapper::native(Fqn::new(["builtins"], "print_str"), vec![str_ty.clone()], module_ty.clone(), print_value));

        Self {
            bool_ty,
            i8_ty,
            i32_ty,
            f64_ty,
            str_ty,
            module_ty,
            type_ty: Rc::new(type_ty),
            exception_ty: Rc::new(exception_ty),
            bool_not_fn,
            print_fns,
        }
    }

    /// Every native function this module registers, for installation into
    /// the FQN registry at VM construction time.
    #[must_use]
    pub fn native_functions(&self) -> Vec<FunctionRef> {
        let mut out = Vec::new();
        for ty in [&self.i32_ty, &self.f64_ty, &self.str_ty, &self.bool_ty, &self.exception_ty] {
            for cap in [
                Capability::Add,
                Capability::Sub,
                Capability::Mul,
                Capability::TrueDiv,
                Capability::FloorDiv,
                Capability::Mod,
                Capability::Neg,
                Capability::Eq,
                Capability::Ne,
                Capability::Lt,
                Capability::Le,
                Capability::Gt,
                Capability::Ge,
                Capability::Len,
                Capability::Hash,
                Capability::Str,
                Capability::GetItem,
            ] {
                if let Some(CapabilityImpl::Direct(f)) = ty.capabilities.get(cap) {
                    out.push(f.clone());
                }
            }
        }
        out.push(self.bool_not_fn.clone());
        out.extend(self.print_fns.values().cloned());
        out
    }
}

/// Shared body for every `builtins::print_<T>` entry point (`spec.md`
/// §6.2: "write one value then newline") — `Value`'s own `Display` already
/// matches each primitive's expected textual form, so one function backs
/// every registered type.
fn print_value(args: &[Value]) -> Result<Value, SpyError> {
    println!("{}", args[0]);
    Ok(Value::None)
}

/// Truthiness of a non-bool value reaching `operator::bool_not` (numeric
/// zero, empty string); mirrors `frame::truthy`'s rule for every other
/// value kind without depending on the frame module.
fn truthy_primitive(v: &Value) -> bool {
    match v {
        Value::I8(i) => *i != 0,
        Value::I32(i) => *i != 0,
        Value::F64(f) => *f != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::None => false,
        _ => true,
    }
}

impl Default for Primitives {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! bin_native {
    ($ty:expr, $cap:expr, $fqn_name:expr, $params:expr, $ret:expr, $body:expr) => {
        $ty.capabilities.register($cap, CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["operator"], $fqn_name), $params, $ret, $body)));
    };
}

fn i32_vals(args: &[Value]) -> Result<(i32, i32), SpyError> {
    match (&args[0], &args[1]) {
        (Value::I32(a), Value::I32(b)) => Ok((*a, *b)),
        _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected (i32, i32) arguments")),
    }
}

fn register_i32_ops(ty: &mut TypeObj) {
    let i32_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "i32"), kind: TypeKind::Primitive(PrimKind::I32), capabilities: CapabilityTable::new(), size_hint: 4 });
    let f64_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "f64"), kind: TypeKind::Primitive(PrimKind::F64), capabilities: CapabilityTable::new(), size_hint: 8 });
    let bool_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "bool"), kind: TypeKind::Primitive(PrimKind::Bool), capabilities: CapabilityTable::new(), size_hint: 1 });

    bin_native!(ty, Capability::Add, "i32_add", vec![i32_ty(), i32_ty()], i32_ty(), |a| {
        let (x, y) = i32_vals(a)?;
        Ok(Value::I32(x.wrapping_add(y)))
    });
    bin_native!(ty, Capability::Sub, "i32_sub", vec![i32_ty(), i32_ty()], i32_ty(), |a| {
        let (x, y) = i32_vals(a)?;
        Ok(Value::I32(x.wrapping_sub(y)))
    });
    bin_native!(ty, Capability::Mul, "i32_mul", vec![i32_ty(), i32_ty()], i32_ty(), |a| {
        let (x, y) = i32_vals(a)?;
        Ok(Value::I32(x.wrapping_mul(y)))
    });
    bin_native!(ty, Capability::TrueDiv, "i32_div", vec![i32_ty(), i32_ty()], f64_ty(), |a| {
        let (x, y) = i32_vals(a)?;
        if y == 0 {
            return Err(SpyError::zero_division(no_op_span()));
        }
        Ok(Value::F64(f64::from(x) / f64::from(y)))
    });
    bin_native!(ty, Capability::FloorDiv, "i32_floordiv", vec![i32_ty(), i32_ty()], i32_ty(), |a| {
        let (x, y) = i32_vals(a)?;
        if y == 0 {
            return Err(SpyError::zero_division(no_op_span()));
        }
        Ok(Value::I32(floor_div_i32(x, y)))
    });
    bin_native!(ty, Capability::Mod, "i32_mod", vec![i32_ty(), i32_ty()], i32_ty(), |a| {
        let (x, y) = i32_vals(a)?;
        if y == 0 {
            return Err(SpyError::zero_division(no_op_span()));
        }
        Ok(Value::I32(floor_mod_i32(x, y)))
    });
    bin_native!(ty, Capability::Eq, "i32_eq", vec![i32_ty(), i32_ty()], bool_ty(), |a| Ok(Value::Bool(i32_vals(a)?.0 == i32_vals(a)?.1)));
    bin_native!(ty, Capability::Ne, "i32_ne", vec![i32_ty(), i32_ty()], bool_ty(), |a| Ok(Value::Bool(i32_vals(a)?.0 != i32_vals(a)?.1)));
    bin_native!(ty, Capability::Lt, "i32_lt", vec![i32_ty(), i32_ty()], bool_ty(), |a| Ok(Value::Bool(i32_vals(a)?.0 < i32_vals(a)?.1)));
    bin_native!(ty, Capability::Le, "i32_le", vec![i32_ty(), i32_ty()], bool_ty(), |a| Ok(Value::Bool(i32_vals(a)?.0 <= i32_vals(a)?.1)));
    bin_native!(ty, Capability::Gt, "i32_gt", vec![i32_ty(), i32_ty()], bool_ty(), |a| Ok(Value::Bool(i32_vals(a)?.0 > i32_vals(a)?.1)));
    bin_native!(ty, Capability::Ge, "i32_ge", vec![i32_ty(), i32_ty()], bool_ty(), |a| Ok(Value::Bool(i32_vals(a)?.0 >= i32_vals(a)?.1)));
    ty.capabilities.register(
        Capability::Neg,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["operator"], "i32_neg"), vec![i32_ty()], i32_ty(), |a| match &a[0] {
            Value::I32(x) => Ok(Value::I32(x.wrapping_neg())),
            _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected i32")),
        })),
    );
}

/// Floor division rounding toward negative infinity (`spec.md` §4.3 edge
/// case policy), distinct from C's truncating `/`.
#[must_use]
pub fn floor_div_i32(a: i32, b: i32) -> i32 {
    let q = a / b;
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) { q - 1 } else { q }
}

/// Modulo with the sign of the divisor (`spec.md` §4.3 edge case policy),
/// matching the high-level language's semantics rather than C's.
#[must_use]
pub fn floor_mod_i32(a: i32, b: i32) -> i32 {
    let r = a % b;
    if (r != 0) && ((r < 0) != (b < 0)) { r + b } else { r }
}

/// Saturating float-to-int cast (`spec.md` §4.3, §8): `NaN -> 0`, above
/// `i32::MAX -> i32::MAX`, below `i32::MIN -> i32::MIN`, otherwise
/// truncated toward zero.
#[must_use]
pub fn saturating_f64_to_i32(x: f64) -> i32 {
    if x.is_nan() {
        return 0;
    }
    if x > f64::from(i32::MAX) {
        return i32::MAX;
    }
    if x < f64::from(i32::MIN) {
        return i32::MIN;
    }
    x.trunc() as i32
}

fn f64_vals(args: &[Value]) -> Result<(f64, f64), SpyError> {
    match (&args[0], &args[1]) {
        (Value::F64(a), Value::F64(b)) => Ok((*a, *b)),
        _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected (f64, f64) arguments")),
    }
}

fn register_f64_ops(ty: &mut TypeObj) {
    let f64_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "f64"), kind: TypeKind::Primitive(PrimKind::F64), capabilities: CapabilityTable::new(), size_hint: 8 });
    let bool_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "bool"), kind: TypeKind::Primitive(PrimKind::Bool), capabilities: CapabilityTable::new(), size_hint: 1 });

    bin_native!(ty, Capability::Add, "f64_add", vec![f64_ty(), f64_ty()], f64_ty(), |a| Ok(Value::F64(f64_vals(a)?.0 + f64_vals(a)?.1)));
    bin_native!(ty, Capability::Sub, "f64_sub", vec![f64_ty(), f64_ty()], f64_ty(), |a| Ok(Value::F64(f64_vals(a)?.0 - f64_vals(a)?.1)));
    bin_native!(ty, Capability::Mul, "f64_mul", vec![f64_ty(), f64_ty()], f64_ty(), |a| Ok(Value::F64(f64_vals(a)?.0 * f64_vals(a)?.1)));
    bin_native!(ty, Capability::TrueDiv, "f64_div", vec![f64_ty(), f64_ty()], f64_ty(), |a| {
        let (x, y) = f64_vals(a)?;
        if y == 0.0 {
            return Err(SpyError::zero_division(no_op_span()));
        }
        Ok(Value::F64(x / y))
    });
    bin_native!(ty, Capability::FloorDiv, "f64_floordiv", vec![f64_ty(), f64_ty()], f64_ty(), |a| {
        let (x, y) = f64_vals(a)?;
        if y == 0.0 {
            return Err(SpyError::zero_division(no_op_span()));
        }
        Ok(Value::F64((x / y).floor()))
    });
    bin_native!(ty, Capability::Mod, "f64_mod", vec![f64_ty(), f64_ty()], f64_ty(), |a| {
        let (x, y) = f64_vals(a)?;
        if y == 0.0 {
            return Err(SpyError::zero_division(no_op_span()));
        }
        let r = x - (x / y).floor() * y;
        Ok(Value::F64(r))
    });
    bin_native!(ty, Capability::Eq, "f64_eq", vec![f64_ty(), f64_ty()], bool_ty(), |a| Ok(Value::Bool(f64_vals(a)?.0 == f64_vals(a)?.1)));
    bin_native!(ty, Capability::Ne, "f64_ne", vec![f64_ty(), f64_ty()], bool_ty(), |a| Ok(Value::Bool(f64_vals(a)?.0 != f64_vals(a)?.1)));
    bin_native!(ty, Capability::Lt, "f64_lt", vec![f64_ty(), f64_ty()], bool_ty(), |a| Ok(Value::Bool(f64_vals(a)?.0 < f64_vals(a)?.1)));
    bin_native!(ty, Capability::Le, "f64_le", vec![f64_ty(), f64_ty()], bool_ty(), |a| Ok(Value::Bool(f64_vals(a)?.0 <= f64_vals(a)?.1)));
    bin_native!(ty, Capability::Gt, "f64_gt", vec![f64_ty(), f64_ty()], bool_ty(), |a| Ok(Value::Bool(f64_vals(a)?.0 > f64_vals(a)?.1)));
    bin_native!(ty, Capability::Ge, "f64_ge", vec![f64_ty(), f64_ty()], bool_ty(), |a| Ok(Value::Bool(f64_vals(a)?.0 >= f64_vals(a)?.1)));
    ty.capabilities.register(
        Capability::Neg,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["operator"], "f64_neg"), vec![f64_ty()], f64_ty(), |a| match &a[0] {
            Value::F64(x) => Ok(Value::F64(-x)),
            _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected f64")),
        })),
    );
}

fn str_vals(args: &[Value]) -> Result<(Rc<str>, Rc<str>), SpyError> {
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok((a.clone(), b.clone())),
        _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected (str, str) arguments")),
    }
}

fn register_str_ops(ty: &mut TypeObj) {
    let str_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "str"), kind: TypeKind::Primitive(PrimKind::Str), capabilities: CapabilityTable::new(), size_hint: 0 });
    let i32_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "i32"), kind: TypeKind::Primitive(PrimKind::I32), capabilities: CapabilityTable::new(), size_hint: 4 });
    let bool_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "bool"), kind: TypeKind::Primitive(PrimKind::Bool), capabilities: CapabilityTable::new(), size_hint: 1 });

    ty.capabilities.register(
        Capability::Add,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["str"], "add"), vec![str_ty(), str_ty()], str_ty(), |a| {
            let (x, y) = str_vals(a)?;
            let mut s = String::with_capacity(x.len() + y.len());
            s.push_str(&x);
            s.push_str(&y);
            Ok(Value::Str(Rc::from(s)))
        })),
    );
    ty.capabilities.register(
        Capability::Mul,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["str"], "mul"), vec![str_ty(), i32_ty()], str_ty(), |a| {
            let s = match &a[0] {
                Value::Str(s) => s.clone(),
                _ => return Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected str")),
            };
            let n = match &a[1] {
                Value::I32(n) => *n,
                _ => return Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected i32 repeat count")),
            };
            if n <= 0 {
                return Ok(Value::Str(Rc::from("")));
            }
            Ok(Value::Str(Rc::from(s.repeat(n as usize))))
        })),
    );
    ty.capabilities.register(
        Capability::Eq,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["str"], "eq"), vec![str_ty(), str_ty()], bool_ty(), |a| {
            let (x, y) = str_vals(a)?;
            Ok(Value::Bool(x == y))
        })),
    );
    ty.capabilities.register(
        Capability::Len,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["str"], "len"), vec![str_ty()], i32_ty(), |a| match &a[0] {
            Value::Str(s) => Ok(Value::I32(i32::try_from(s.len()).unwrap_or(i32::MAX))),
            _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected str")),
        })),
    );
    ty.capabilities.register(
        Capability::Hash,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["str"], "hash"), vec![str_ty()], i32_ty(), |a| match &a[0] {
            Value::Str(s) => Ok(Value::I32(str_hash(s))),
            _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected str")),
        })),
    );
    ty.capabilities.register(
        Capability::GetItem,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["str"], "getitem"), vec![str_ty(), i32_ty()], str_ty(), |a| {
            let s = match &a[0] {
                Value::Str(s) => s.clone(),
                _ => return Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected str")),
            };
            let idx = match &a[1] {
                Value::I32(n) => *n,
                _ => return Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected i32 index")),
            };
            let bytes = s.as_bytes();
            let len = i32::try_from(bytes.len()).unwrap_or(i32::MAX);
            let real_idx = if idx < 0 { idx + len } else { idx };
            if real_idx < 0 || real_idx >= len {
                return Err(SpyError::new(crate::errors::ErrorKind::Panic(crate::errors::PanicKind::OutOfBounds), format!("string index {idx} out of bounds"))
                    .with_annotation(crate::errors::Level::Error, no_op_span(), "here"));
            }
            let byte = bytes[real_idx as usize];
            Ok(Value::Str(Rc::from(String::from_utf8_lossy(&[byte]).into_owned())))
        })),
    );
}

/// `spec.md` §4.3 edge cases: "Comparison between different exception
/// types is always false (not an error)" — implemented here as always
/// false regardless of type, since an exception value carries no
/// field-level equality of its own to fall back on for a matching type.
fn register_exception_ops(ty: &mut TypeObj) {
    let exception_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "Exception"), kind: TypeKind::Exception, capabilities: CapabilityTable::new(), size_hint: 0 });
    let bool_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "bool"), kind: TypeKind::Primitive(PrimKind::Bool), capabilities: CapabilityTable::new(), size_hint: 1 });
    bin_native!(ty, Capability::Eq, "exception_eq", vec![exception_ty(), exception_ty()], bool_ty(), |_a| Ok(Value::Bool(false)));
    bin_native!(ty, Capability::Ne, "exception_ne", vec![exception_ty(), exception_ty()], bool_ty(), |_a| Ok(Value::Bool(true)));
}

fn register_bool_ops(ty: &mut TypeObj) {
    let bool_ty = || Rc::new(TypeObj { fqn: Fqn::new(["builtins"], "bool"), kind: TypeKind::Primitive(PrimKind::Bool), capabilities: CapabilityTable::new(), size_hint: 1 });
    ty.capabilities.register(
        Capability::Eq,
        CapabilityImpl::Direct(FunctionWrapper::native(Fqn::new(["operator"], "bool_eq"), vec![bool_ty(), bool_ty()], bool_ty(), |a| match (&a[0], &a[1]) {
            (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(x == y)),
            _ => Err(SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Type), "expected (bool, bool)")),
        })),
    );
}

/// FNV-1a string hash, matching the `libspy` contract (`spec.md` §6.2):
/// "never returns 0 or -1". CPython itself special-cases 0/-1 (`-1` is
/// reserved to mean "hash failed"); this implementation nudges those two
/// sentinel outputs to the nearest non-sentinel value.
#[must_use]
pub fn str_hash(s: &str) -> i32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;
    let mut hash = FNV_OFFSET;
    for byte in s.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    let mut result = hash as i32;
    if result == 0 {
        result = 1;
    } else if result == -1 {
        result = 2;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_div_and_mod_satisfy_the_division_identity() {
        for (a, b) in [(7, 2), (-7, 2), (7, -2), (-7, -2)] {
            let q = floor_div_i32(a, b);
            let r = floor_mod_i32(a, b);
            assert_eq!(a, q * b + r, "identity broken for {a} // {b}");
            if r != 0 {
                assert_eq!(r.signum(), b.signum(), "mod sign should match divisor for {a} % {b}");
            }
        }
    }

    #[test]
    fn scenario_negative_seven_floordiv_two_is_negative_four() {
        assert_eq!(floor_div_i32(-7, 2), -4);
    }

    #[test]
    fn scenario_negative_seven_mod_two_is_one() {
        assert_eq!(floor_mod_i32(-7, 2), 1);
    }

    #[test]
    fn saturating_cast_handles_nan_and_both_overflow_directions() {
        assert_eq!(saturating_f64_to_i32(f64::NAN), 0);
        assert_eq!(saturating_f64_to_i32(1e30), i32::MAX);
        assert_eq!(saturating_f64_to_i32(-1e30), i32::MIN);
        assert_eq!(saturating_f64_to_i32(3.9), 3);
        assert_eq!(saturating_f64_to_i32(-3.9), -3);
    }

    #[test]
    fn string_hash_is_never_zero_or_negative_one_and_is_stable() {
        for s in ["", "a", "hello world", "SPy"] {
            let h = str_hash(s);
            assert_ne!(h, 0);
            assert_ne!(h, -1);
            assert_eq!(h, str_hash(s));
        }
    }

    #[test]
    fn equal_strings_hash_equal() {
        assert_eq!(str_hash("same"), str_hash("same"));
    }

    #[test]
    fn string_multiplication_by_non_positive_count_is_empty() {
        let primitives = Primitives::new();
        let mul = primitives.str_ty.capabilities.get(Capability::Mul).expect("str has __mul__");
        let CapabilityImpl::Direct(f) = mul else { panic!("expected Direct impl") };
        let FunctionBody::Native(native) = &f.body else { panic!("expected native body") };
        let result = native(&[Value::Str(Rc::from("ab")), Value::I32(0)]).expect("mul succeeds");
        assert!(matches!(result, Value::Str(s) if &*s == ""));
    }
}
