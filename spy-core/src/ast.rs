//! Typed AST (`spec.md` §3.5).
//!
//! Statements: `Assign`, `VarDef`, `If`, `While`, `For`, `Return`, `Raise`,
//! `Expr`, `Pass`, `FuncDef`, `ClassDef`. Expressions: `Const`, `Name`,
//! `BinOp`, `UnaryOp`, `Compare`, `Call`, `GetAttr`, `SetAttr`, `GetItem`,
//! `SetItem`, `List`, `Tuple`, `StrConst`, `FStr`. Every node carries source
//! location, static type, and color. The AST is immutable after symbol
//! analysis; redshift produces a new (residual) AST rather than mutating
//! this one — see `redshift::Residual*`.

use std::rc::Rc;

use crate::color::Color;
use crate::intern::StrId;
use crate::span::Span;
use crate::types::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub enum ConstValue {
    Bool(bool),
    I8(i8),
    I32(i32),
    F64(f64),
    None,
}

/// A typed expression node. `ty`/`color` are filled in by symbol analysis
/// (`spec.md` §3.6) before redshift ever sees the tree.
#[derive(Debug, Clone)]
pub struct Expr {
    pub span: Span,
    pub ty: TypeRef,
    pub color: Color,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Const(ConstValue),
    StrConst(Rc<str>),
    FStr(Vec<FStrPart>),
    Name(StrId),
    BinOp { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    Compare { op: CmpOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    GetAttr { obj: Box<Expr>, attr: StrId },
    SetAttr { obj: Box<Expr>, attr: StrId, value: Box<Expr> },
    GetItem { obj: Box<Expr>, index: Box<Expr> },
    SetItem { obj: Box<Expr>, index: Box<Expr>, value: Box<Expr> },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
}

#[derive(Debug, Clone)]
pub enum FStrPart {
    Literal(Rc<str>),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Assign { target: StrId, value: Expr },
    VarDef { name: StrId, ty: TypeRef, value: Option<Expr> },
    If { cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt> },
    While { cond: Expr, body: Vec<Stmt> },
    For { var: StrId, iter: Expr, body: Vec<Stmt> },
    Return(Option<Expr>),
    Raise(Expr),
    Expr(Expr),
    Pass,
    FuncDef(Rc<FuncDef>),
    ClassDef(Rc<ClassDef>),
}

/// A function definition. Shared (`Rc`) because the same `FuncDef` backs
/// every generic instantiation produced from it (`spec.md` §4.4).
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: StrId,
    pub span: Span,
    pub params: Vec<Param>,
    pub ret_type: TypeRef,
    pub body: Vec<Stmt>,
    /// `true` for a `blue` function: runs entirely during redshift.
    pub is_blue: bool,
    /// `true` for `blue.generic`: first arguments are types, result is a
    /// type or function, memoized by argument FQNs.
    pub is_generic: bool,
    /// Names of the outer-scope variables this function closes over, in the
    /// same order as the captured values on the `FunctionWrapper` built from
    /// it (`spec.md` §3.6, "Outer references chain to parent frames").
    pub free_vars: Vec<StrId>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: StrId,
    pub ty: TypeRef,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: StrId,
    pub span: Span,
    pub fields: Vec<Param>,
    pub methods: Vec<Rc<FuncDef>>,
}
