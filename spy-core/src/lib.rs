//! The SPy compiler core: a typed object model, a tree-walking interpreter
//! over a typed AST, and the "doppler" partial-evaluation pass that turns a
//! blue-annotated program into a monomorphic residual AST for external C
//! emission.
//!
//! This crate is the middle third of the pipeline described in `spec.md`:
//! it consumes an already-typed AST (an untyped parse tree plus type
//! checking are out of scope, §6.1) and produces either a program's output
//! (interp mode) or a residual AST (redshift mode, §6.3). Both modes share
//! one evaluator core (`frame`/`redshift`) driven by one process-wide `Vm`
//! (`module`).

mod ast;
mod builtins;
mod color;
mod dispatch;
mod errors;
mod fqn;
mod frame;
mod function;
mod intern;
mod libspy;
mod module;
mod redshift;
mod span;
mod symtable;
mod types;
mod value;

pub use crate::ast::{
    BinOp, ClassDef, CmpOp, ConstValue, Expr, ExprKind, FStrPart, FuncDef, Param, Stmt, StmtKind, UnaryOp,
};
pub use crate::builtins::Primitives;
pub use crate::color::Color;
pub use crate::dispatch::{MetaResolver, OpArg, OpImpl};
pub use crate::errors::{Annotation, ErrorKind, Level, PanicKind, SpyError, StaticKind, TraceFrame};
pub use crate::fqn::{DuplicateFqn, Fqn, FqnRegistry, GlobalKind, Qualifier};
pub use crate::function::{FuncState, FunctionBody, FunctionRef, FunctionWrapper, GenericCache, NativeFn};
pub use crate::intern::{Interner, StrId};
pub use crate::module::{Module, Vm};
pub use crate::redshift::{ResidualExpr, ResidualFunc, ResidualStmt};
pub use crate::span::{LineCol, SourceMap, Span};
pub use crate::symtable::{analyze_function, is_color_monotonic, SymTable, Symbol, SymbolKind};
pub use crate::types::{Capability, CapabilityImpl, CapabilityTable, Field, PrimKind, TypeKind, TypeObj, TypeRef};
pub use crate::value::{same_prim, ExceptionValue, Pointer, StructInstance, Value};
