//! Static resolver pass for the **Lox** interpreter.
//!
//! One walk over a parsed program, before it runs:
//! 1. Mirror the runtime frame layout with a stack of name sets.
//! 2. Report static errors (local redeclaration, `return` outside a function,
//!    misplaced `this`/`super`, self‑inheritance).
//! 3. Tell the interpreter, for *each* variable occurrence, whether it's a
//!    local (and at what depth) or a global.
//!
//! The scopes pushed here must line up one‑for‑one with the frames the
//! interpreter creates, or the recorded depths point at the wrong frame.

use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprKind, FunctionDecl, Stmt, StmtKind};
use crate::error::{LoxError, Result};
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Are we inside a class body, and does it have a superclass?
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashSet<String>>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'interp> Resolver<'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        ensure_sufficient_stack(|| self.resolve_stmt_kind(stmt))
    }

    fn resolve_stmt_kind(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_all(statements);
                self.end_scope();
                result?;
            }

            StmtKind::VarDecl { name, initializer } => {
                // The initializer sees the *enclosing* binding of the name.
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.declare(name)?;
            }

            StmtKind::FunctionDef(decl) => {
                // Declared first so the body can recurse.
                self.declare(&decl.name)?;
                self.resolve_function(decl, FunctionType::Function)?;
            }

            StmtKind::ClassDef {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods)?,

            StmtKind::ExprStmt(expr) | StmtKind::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }

            StmtKind::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // One scope for the whole loop, matching the single frame the
                // interpreter opens; a block body adds its own.
                self.begin_scope();
                let result = self.resolve_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    increment.as_ref(),
                    body,
                );
                self.end_scope();
                result?;
            }

            StmtKind::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::parse(
                        keyword.index,
                        "Cannot return outside of a function",
                    ));
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_all(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(())
    }

    fn resolve_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> Result<()> {
        if let Some(init) = initializer {
            self.resolve_stmt(init)?;
        }
        if let Some(condition) = condition {
            self.resolve_expr(condition)?;
        }
        if let Some(increment) = increment {
            self.resolve_expr(increment)?;
        }

        self.resolve_stmt(body)
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Resolving class '{}'", name.lexeme);

        if let Some(superclass) = superclass {
            if let ExprKind::Variable { name: super_name } = &superclass.kind {
                if super_name.lexeme == name.lexeme {
                    return Err(LoxError::parse(
                        super_name.index,
                        "A class cannot inherit from itself",
                    ));
                }
            }
        }

        self.declare(name)?;

        let enclosing = self.current_class;
        self.current_class = if superclass.is_some() {
            ClassType::Subclass
        } else {
            ClassType::Class
        };

        let result = self.resolve_class_body(superclass, methods);

        self.current_class = enclosing;
        result
    }

    fn resolve_class_body(
        &mut self,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        if let Some(superclass) = superclass {
            self.resolve_expr(superclass)?;

            self.begin_scope();
            self.bind_synthetic("super");
        }

        self.begin_scope();
        self.bind_synthetic("this");

        let mut result = Ok(());
        for method in methods {
            result = self.resolve_function(method, FunctionType::Function);
            if result.is_err() {
                break;
            }
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        ensure_sufficient_stack(|| self.resolve_expr_kind(expr))
    }

    fn resolve_expr_kind(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            ExprKind::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            ExprKind::Variable { name } => {
                self.resolve_local(expr, &name.lexeme);
            }

            ExprKind::Assign { name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value)?;
                self.resolve_local(expr, &name.lexeme);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for argument in arguments {
                    self.resolve_expr(argument)?;
                }
            }

            ExprKind::Get { object, .. } => self.resolve_expr(object)?,

            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }

            ExprKind::This { keyword } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::parse(
                        keyword.index,
                        "Cannot use 'this' outside of a class",
                    ));
                }

                self.resolve_local(expr, "this");
            }

            ExprKind::Super { keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        return Err(LoxError::parse(
                            keyword.index,
                            "Cannot use 'super' outside of a class",
                        ))
                    }
                    ClassType::Class => {
                        return Err(LoxError::parse(
                            keyword.index,
                            "Cannot use 'super' in a class with no superclass",
                        ))
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(expr, "super");
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.  The body shares
    /// the parameters' scope, just like the call frame at runtime.
    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionType) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();

        let mut result = Ok(());
        for param in &decl.params {
            result = self.declare(param);
            if result.is_err() {
                break;
            }
        }
        if result.is_ok() {
            result = self.resolve_all(&decl.body);
        }

        self.end_scope();
        self.current_function = enclosing;

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Add `name` to the innermost local scope.  Globals are never tracked,
    /// so redeclaring a global is fine.
    fn declare(&mut self, name: &Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if !scope.insert(name.lexeme.clone()) {
                return Err(LoxError::parse(
                    name.index,
                    format!("Variable '{}' already defined in this scope", name.lexeme),
                ));
            }
        }

        Ok(())
    }

    fn bind_synthetic(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as either:
    ///  - a local at depth `d`, or
    ///  - a global if not found in *any* scope.
    fn resolve_local(&mut self, expr: &Expr, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.interpreter.note_local(expr.id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name);
        self.interpreter.note_global(expr.id);
    }
}
