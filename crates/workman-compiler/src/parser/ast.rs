//! Surface AST.
//!
//! Built by the parser and never mutated afterwards. Every expression,
//! pattern, and type node carries its dense per-module [`NodeId`] plus
//! the byte span it came from; inference hangs its marks off those IDs.

use serde::Serialize;
use workman_core::{NodeId, Span};

/// An identifier occurrence (binder or reference).
#[derive(Debug, Clone, Serialize)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

/// A parsed module.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum Item {
    Import(ImportDecl),
    ReExport(ReExportDecl),
    Let(LetDecl),
    Type(TypeDecl),
    Infix(InfixDecl),
    Prefix(PrefixDecl),
}

/// `from "path" import { name [as local], ... };` or
/// `from "path" import * as ns;`
#[derive(Debug, Clone, Serialize)]
pub struct ImportDecl {
    pub path: String,
    pub path_span: Span,
    pub names: ImportNames,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum ImportNames {
    Named(Vec<ImportSpecifier>),
    Namespace(Ident),
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSpecifier {
    pub name: Ident,
    pub local: Option<Ident>,
}

impl ImportSpecifier {
    /// The name the import binds locally.
    pub fn local_name(&self) -> &str {
        match &self.local {
            Some(local) => &local.name,
            None => &self.name.name,
        }
    }
}

/// `export from "path" type Name, Name(..);`
#[derive(Debug, Clone, Serialize)]
pub struct ReExportDecl {
    pub path: String,
    pub path_span: Span,
    pub items: Vec<ReExportItem>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReExportItem {
    pub name: Ident,
    /// `Name(..)` re-exports the constructors along with the type.
    pub with_constructors: bool,
}

/// `[export] let [rec] binding (and binding)* ;`
#[derive(Debug, Clone, Serialize)]
pub struct LetDecl {
    pub exported: bool,
    pub recursive: bool,
    pub bindings: Vec<Binding>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub name: Ident,
    pub annotation: Option<TypeExpr>,
    pub value: Expr,
    pub span: Span,
}

/// `[export] type Name<Params> = [|] member (| member)* ;`
#[derive(Debug, Clone, Serialize)]
pub struct TypeDecl {
    pub exported: bool,
    pub name: Ident,
    pub params: Vec<Ident>,
    pub rhs: TypeRhs,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum TypeRhs {
    /// Sum of constructors: `None | Some<T>`.
    Constructors(Vec<CtorDecl>),
    /// Error-row alias: `type Err = <NotMul>;`
    ErrorRow(TypeExpr),
}

#[derive(Debug, Clone, Serialize)]
pub struct CtorDecl {
    pub name: Ident,
    pub fields: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Assoc {
    None,
    Left,
    Right,
}

/// `infix[l|r] PREC OP = target ;`
#[derive(Debug, Clone, Serialize)]
pub struct InfixDecl {
    pub exported: bool,
    pub assoc: Assoc,
    pub precedence: u8,
    pub op: String,
    pub op_span: Span,
    pub target: Ident,
    pub span: Span,
}

/// `prefix OP = target ;`
#[derive(Debug, Clone, Serialize)]
pub struct PrefixDecl {
    pub exported: bool,
    pub op: String,
    pub op_span: Span,
    pub target: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    Var(String),
    /// Uppercase constructor reference; saturation happens at call sites
    /// or, for nullary constructors, in place.
    CtorRef(String),
    Int(i64),
    Bool(bool),
    Char(char),
    Str(String),
    Unit,
    Tuple(Vec<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Binary {
        op: String,
        op_span: Span,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: String,
        op_span: Span,
        operand: Box<Expr>,
    },
    Arrow {
        params: Vec<Param>,
        /// Always a `Block` expression.
        body: Box<Expr>,
    },
    Block(Block),
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    /// `base.field` - namespace member or record field access.
    Field {
        base: Box<Expr>,
        field: Ident,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub name: Ident,
    pub annotation: Option<TypeExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub result: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    /// Local (never exported) let binding.
    Let(LetDecl),
    /// Expression statement; its value is dropped.
    Expr(Expr),
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchArm {
    pub pattern: Pattern,
    /// Always a `Block` expression; enforced syntactically.
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pattern {
    pub id: NodeId,
    pub span: Span,
    pub kind: PatKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum PatKind {
    Wildcard,
    Var(String),
    Int(i64),
    Bool(bool),
    Char(char),
    Str(String),
    Ctor {
        name: String,
        args: Vec<Pattern>,
    },
    Tuple(Vec<Pattern>),
}

impl Pattern {
    pub fn is_wildcard_like(&self) -> bool {
        matches!(self.kind, PatKind::Wildcard | PatKind::Var(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum TypeExprKind {
    /// `Int`, `Option<T>`, or a type parameter in scope.
    Name {
        name: String,
        args: Vec<TypeExpr>,
    },
    /// `A -> B`, right-associative.
    Fun {
        from: Box<TypeExpr>,
        to: Box<TypeExpr>,
    },
    Tuple(Vec<TypeExpr>),
    /// Error-row literal: `<NotMul, Overflow<Int>>`.
    Row(Vec<RowCase>),
    Unit,
    /// `?` - a user hole.
    Hole,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowCase {
    pub name: Ident,
    pub payload: Option<TypeExpr>,
}
