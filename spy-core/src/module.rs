//! The virtual machine: process-wide registries plus the entry points that
//! drive interp mode and redshift mode over loaded modules.
//!
//! Mirrors the teacher's top-level `Vm` (see `vm/mod.rs`): one struct owns
//! every shared, write-once-then-read-only resource (`spec.md` §5) — the
//! interner, the FQN registry, the primitive types, and the table of
//! loaded modules — and hands out `&mut self` to whichever evaluator mode
//! is currently running.

use std::rc::Rc;

use ahash::AHashMap;

use crate::ast::{ClassDef, FuncDef};
use crate::builtins::Primitives;
use crate::errors::SpyError;
use crate::fqn::{DuplicateFqn, Fqn, FqnRegistry, GlobalKind};
use crate::function::{FuncState, FunctionRef, FunctionWrapper, GenericCache};
use crate::intern::{Interner, StrId};
use crate::redshift::{redshift_function, ResidualFunc};
use crate::span::SourceMap;
use crate::types::TypeRef;
use crate::value::Value;

/// One loaded module's top-level namespace: its functions, classes, and
/// constants, all keyed by their unqualified (local) name. Lookup by FQN
/// goes through `Vm::functions`/`Vm::types` instead; `globals` exists for
/// plain `Name` resolution against whichever modules are loaded, matching
/// `spec.md` §3.6's "Global: resolved against the enclosing module".
#[derive(Debug, Default)]
pub struct Module {
    pub name: Vec<String>,
    pub globals: AHashMap<StrId, Value>,
}

impl Module {
    #[must_use]
    pub fn new(name: Vec<String>) -> Self {
        Self { name, globals: AHashMap::new() }
    }
}

/// Everything a running program needs, gathered in one place (`spec.md`
/// §5, "Shared resources"): interning, source text (for diagnostics), the
/// primitive type table, the FQN uniqueness registry, every registered
/// function/type, loaded modules, the generic-instantiation cache, and the
/// two pieces of state the doppler pass needs across calls — the
/// memoized residual functions and the `Unresolved -> Resolving ->
/// Redshifted` state of each instantiation (`function::FuncState`), used
/// to detect a cycle in blue evaluation rather than recursing forever.
#[derive(Debug)]
pub struct Vm {
    pub interner: Interner,
    pub sources: SourceMap,
    pub primitives: Primitives,
    pub fqns: FqnRegistry,
    pub functions: AHashMap<Fqn, FunctionRef>,
    pub types: AHashMap<Fqn, TypeRef>,
    pub modules: AHashMap<String, Module>,
    pub generics: GenericCache,
    redshifted: AHashMap<Fqn, Rc<ResidualFunc>>,
    func_states: AHashMap<Fqn, FuncState>,
}

impl Vm {
    /// Builds a fresh VM with every primitive type and `libspy`-contract
    /// native function registered (`spec.md` §6.2).
    #[must_use]
    pub fn new() -> Self {
        let mut vm = Self {
            interner: Interner::new(),
            sources: SourceMap::new(),
            primitives: Primitives::new(),
            fqns: FqnRegistry::new(),
            functions: AHashMap::new(),
            types: AHashMap::new(),
            modules: AHashMap::new(),
            generics: GenericCache::new(),
            redshifted: AHashMap::new(),
            func_states: AHashMap::new(),
        };
        for native in vm.primitives.native_functions() {
            let fqn = native.fqn.clone();
            vm.fqns.insert(fqn.clone(), GlobalKind::Function).expect("native FQNs are registered once, at startup");
            vm.functions.insert(fqn, native);
        }
        vm
    }

    /// Registers every top-level `def`/`class` of a parsed module under
    /// `module_path`-qualified FQNs and builds its `globals` table
    /// (`spec.md` §3.1, §3.6). Statements other than `FuncDef`/`ClassDef`
    /// are module-level side effects, run immediately via interp mode —
    /// matching how a script's top level executes top-to-bottom.
    pub fn load_module(&mut self, module_path: Vec<String>, stmts: Vec<crate::ast::Stmt>) -> Result<(), SpyError> {
        let module_key = module_path.join(".");
        let mut module = Module::new(module_path.clone());
        let mut locals: AHashMap<StrId, Value> = AHashMap::new();

        for stmt in &stmts {
            match &stmt.kind {
                crate::ast::StmtKind::FuncDef(def) => {
                    let value = self.register_function(&module_path, def.clone())?;
                    module.globals.insert(def.name, value);
                }
                crate::ast::StmtKind::ClassDef(def) => {
                    let value = self.register_class(&module_path, def.clone())?;
                    module.globals.insert(def.name, value);
                }
                _ => {
                    if let crate::frame::Flow::Return(_) = crate::frame::exec_stmt(self, &mut locals, stmt)? {
                        // A bare `return` at module scope ends module
                        // initialization early; nothing further to run.
                        break;
                    }
                }
            }
        }
        for (name, value) in locals {
            module.globals.entry(name).or_insert(value);
        }
        self.modules.insert(module_key, module);
        Ok(())
    }

    fn register_function(&mut self, module_path: &[String], def: Rc<FuncDef>) -> Result<Value, SpyError> {
        let fqn = Fqn::new(module_path.to_vec(), self.interner.resolve(def.name).to_string());
        self.fqns.insert(fqn.clone(), GlobalKind::Function).map_err(duplicate_fqn_error)?;
        let wrapper = FunctionWrapper::from_def(fqn.clone(), def, vec![]);
        self.functions.insert(fqn, wrapper.clone());
        Ok(Value::Function(wrapper))
    }

    fn register_class(&mut self, module_path: &[String], def: Rc<ClassDef>) -> Result<Value, SpyError> {
        let fqn = Fqn::new(module_path.to_vec(), self.interner.resolve(def.name).to_string());
        self.fqns.insert(fqn.clone(), GlobalKind::Type).map_err(duplicate_fqn_error)?;
        let fields: Vec<crate::types::Field> = def
            .fields
            .iter()
            .enumerate()
            .map(|(i, p)| crate::types::Field { name: self.interner.resolve(p.name).to_string(), ty: p.ty.clone(), offset: i })
            .collect();
        let mut capabilities = crate::types::CapabilityTable::new();
        for method in &def.methods {
            let method_fqn = Fqn::new(module_path.to_vec(), format!("{}.{}", self.interner.resolve(def.name), self.interner.resolve(method.name)));
            let wrapper = FunctionWrapper::from_def(method_fqn.clone(), method.clone(), vec![]);
            self.functions.insert(method_fqn, wrapper.clone());
            if let Some(cap) = method_capability(self.interner.resolve(method.name)) {
                capabilities.register(cap, crate::types::CapabilityImpl::Direct(wrapper));
            }
        }
        let ty = Rc::new(crate::types::TypeObj {
            fqn: fqn.clone(),
            kind: crate::types::TypeKind::Struct { fields },
            capabilities,
            size_hint: def.fields.len(),
        });
        self.types.insert(fqn, ty.clone());
        Ok(Value::Type(ty))
    }

    #[must_use]
    pub fn lookup_function(&self, fqn: &Fqn) -> Option<FunctionRef> {
        self.functions.get(fqn).cloned()
    }

    /// Calls a function to completion in interp mode (`spec.md` §4).
    pub fn call_function(&mut self, func: &FunctionRef, args: Vec<Value>) -> Result<Value, SpyError> {
        crate::frame::call_interp(self, func, args)
    }

    /// Drives the doppler pass over `func` for the given concrete argument
    /// types, producing a monomorphic residual function (`spec.md` §4.4).
    pub fn redshift_program(&mut self, func: &FunctionRef, arg_types: &[TypeRef]) -> Result<Rc<ResidualFunc>, SpyError> {
        redshift_function(self, func, arg_types)
    }

    #[must_use]
    pub(crate) fn cached_residual(&self, key: &Fqn) -> Option<Rc<ResidualFunc>> {
        self.redshifted.get(key).cloned()
    }

    pub(crate) fn cache_residual(&mut self, key: Fqn, value: Rc<ResidualFunc>) {
        self.redshifted.insert(key, value);
    }

    #[must_use]
    pub(crate) fn func_state(&self, key: &Fqn) -> FuncState {
        self.func_states.get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn set_func_state(&mut self, key: Fqn, state: FuncState) {
        self.func_states.insert(key, state);
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate_fqn_error(err: DuplicateFqn) -> SpyError {
    SpyError::new(crate::errors::ErrorKind::Static(crate::errors::StaticKind::Generic), err.to_string())
}

/// Maps a class body's dunder method name to the capability slot it fills
/// (`spec.md` §4.1/§9, "Polymorphism without inheritance" — a class gets
/// operator support purely by defining the matching dunder).
fn method_capability(name: &str) -> Option<crate::types::Capability> {
    use crate::types::Capability;
    match name {
        "__new__" => Some(Capability::New),
        "__call__" => Some(Capability::Call),
        "__getattr__" => Some(Capability::GetAttr),
        "__setattr__" => Some(Capability::SetAttr),
        "__getitem__" => Some(Capability::GetItem),
        "__setitem__" => Some(Capability::SetItem),
        "__eq__" => Some(Capability::Eq),
        "__ne__" => Some(Capability::Ne),
        "__lt__" => Some(Capability::Lt),
        "__le__" => Some(Capability::Le),
        "__gt__" => Some(Capability::Gt),
        "__ge__" => Some(Capability::Ge),
        "__add__" => Some(Capability::Add),
        "__sub__" => Some(Capability::Sub),
        "__mul__" => Some(Capability::Mul),
        "__truediv__" => Some(Capability::TrueDiv),
        "__floordiv__" => Some(Capability::FloorDiv),
        "__mod__" => Some(Capability::Mod),
        "__neg__" => Some(Capability::Neg),
        "__str__" => Some(Capability::Str),
        "__repr__" => Some(Capability::Repr),
        "__len__" => Some(Capability::Len),
        "__hash__" => Some(Capability::Hash),
        "__bool__" => Some(Capability::Bool),
        "__iter__" => Some(Capability::Iter),
        "__next__" => Some(Capability::Next),
        "__lift__" => Some(Capability::Lift),
        "__unlift__" => Some(Capability::Unlift),
        "__INIT__" => Some(Capability::Init),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, ExprKind, Param, Stmt, StmtKind};
    use crate::intern::Interner;
    use crate::span::{LineCol, Span};
    use crate::types::{PrimKind, TypeObj};

    fn dummy_span(interner: &mut Interner) -> Span {
        let file = interner.intern("m.spy");
        Span::new(file, LineCol::new(0, 0), LineCol::new(0, 1))
    }

    #[test]
    fn new_vm_registers_every_native_function() {
        let vm = Vm::new();
        let add_fqn = Fqn::new(["operator"], "i32_add");
        assert!(vm.fqns.contains(&add_fqn));
        assert!(vm.lookup_function(&add_fqn).is_some());
    }

    #[test]
    fn load_module_registers_top_level_function_under_module_fqn() {
        let mut vm = Vm::new();
        let span = dummy_span(&mut vm.interner);
        let name = vm.interner.intern("double");
        let i32_ty = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        let param_name = vm.interner.intern("x");
        let def = Rc::new(FuncDef {
            name,
            span,
            params: vec![Param { name: param_name, ty: i32_ty.clone() }],
            ret_type: i32_ty.clone(),
            body: vec![Stmt {
                span,
                kind: StmtKind::Return(Some(Expr {
                    span,
                    ty: i32_ty.clone(),
                    color: crate::color::Color::Red,
                    kind: ExprKind::Name(param_name),
                })),
            }],
            is_blue: false,
            is_generic: false,
            free_vars: vec![],
        });
        vm.load_module(vec!["main".to_string()], vec![Stmt { span, kind: StmtKind::FuncDef(def) }]).expect("loads");
        let fqn = Fqn::new(["main"], "double");
        assert!(vm.lookup_function(&fqn).is_some());
        assert!(vm.modules.contains_key("main"));
    }

    #[test]
    fn redshift_of_trivial_function_produces_residual_body() {
        let mut vm = Vm::new();
        let span = dummy_span(&mut vm.interner);
        let i32_ty = TypeObj::primitive(Fqn::new(["builtins"], "i32"), PrimKind::I32, 4);
        let param_name = vm.interner.intern("x");
        let name = vm.interner.intern("identity");
        let def = Rc::new(FuncDef {
            name,
            span,
            params: vec![Param { name: param_name, ty: i32_ty.clone() }],
            ret_type: i32_ty.clone(),
            body: vec![Stmt {
                span,
                kind: StmtKind::Return(Some(Expr { span, ty: i32_ty.clone(), color: crate::color::Color::Red, kind: ExprKind::Name(param_name) })),
            }],
            is_blue: false,
            is_generic: false,
            free_vars: vec![],
        });
        let func = FunctionWrapper::from_def(Fqn::new(["main"], "identity"), def, vec![]);
        let residual = vm.redshift_program(&func, &[i32_ty.clone()]).expect("redshift succeeds");
        assert_eq!(residual.body.len(), 1);
    }
}
