//! Abstract syntax tree for Lox programs.
//!
//! The tree is immutable once the parser hands it out.  Expressions carry an
//! [`ExprId`] so that the resolver can record lexical depths in a side table
//! owned by the interpreter instead of mutating the tree.  Every node also
//! carries the byte `index` of the source text it came from, used for error
//! reporting.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::token::Token;

/// Process‑wide counter handing out expression identities.  Ids must stay
/// unique across every parse an interpreter session sees, because closures
/// created from one REPL line outlive it and share the interpreter's table
/// with nodes parsed later.
static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Stable identity of an expression node, used as the key of the resolver's
/// depth table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

impl ExprId {
    /// Allocate a fresh id.
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal with escapes decoded.
    Str(String),

    /// `true` / `false`.
    Bool(bool),

    /// The `nil` literal.
    Nil,
}

/// An expression node: identity, source offset and the expression itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub id: ExprId,
    pub index: usize,
    pub kind: ExprKind,
}

impl Expr {
    /// Build a node with a freshly allocated id.
    pub fn new(kind: ExprKind, index: usize) -> Self {
        Self {
            id: ExprId::fresh(),
            index,
            kind,
        }
    }
}

/// Every kind of Lox expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Variable access.
    Variable { name: Token },

    /// `identifier "=" expression`
    Assign { name: Token, value: Box<Expr> },

    /// Prefix operator expression (`!` or `-`).
    Unary { operator: Token, right: Box<Expr> },

    /// Infix operator expression, including the short‑circuiting `and`/`or`.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// Function, method or constructor call.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// `object.name`
    Get { object: Box<Expr>, name: Token },

    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { keyword: Token },

    /// `super.method`
    Super { keyword: Token, method: Token },
}

/// A function or method declaration.  Shared (`Rc`) between the tree and every
/// function value created from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Statements executed directly in the call frame.
    pub body: Vec<Stmt>,

    pub index: usize,
}

/// A statement node: source offset and the statement itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stmt {
    pub index: usize,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind, index: usize) -> Self {
        Self { index, kind }
    }
}

/// Every kind of Lox statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StmtKind {
    /// `"var" IDENT ("=" initializer)? ";"`
    VarDecl {
        name: Token,
        initializer: Option<Expr>,
    },

    /// `"fun" IDENT "(" params ")" block`
    FunctionDef(Rc<FunctionDecl>),

    /// `"class" IDENT ("<" IDENT)? "{" method* "}"`
    ClassDef {
        name: Token,
        /// Always an [`ExprKind::Variable`] when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `print` statement used for output.
    Print(Expr),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    /// Kept as its own node; never lowered into `while`.
    For {
        initializer: Option<Box<Stmt>>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },

    Return {
        /// The `return` keyword token.
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Stand‑alone expression terminated by a semicolon.
    ExprStmt(Expr),
}

/// A parsed compilation unit.
pub type Program = Vec<Stmt>;
