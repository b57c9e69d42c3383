//! Tree‑walking evaluator.
//!
//! One evaluation function per node kind.  The interpreter owns the global
//! frame, a pointer to the current frame (swapped around block and call entry
//! and always restored, even on error) and the resolver's depth table.
//!
//! A tree must be resolved against the *same* `Interpreter` before it is
//! executed: the depths live here, not in the tree.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, LiteralValue, Stmt, StmtKind};
use crate::callable::{define_natives, Class, Function};
use crate::environment::{EnvRef, Environment, LookupError};
use crate::error::{LoxError, Result};
use crate::instance::Instance;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Calls nested deeper than this abort with an internal error.  The tree walk
/// itself never runs out of native stack; see [`crate::stack`].
pub const MAX_CALL_DEPTH: usize = 1000;

/// How a statement finished.  `Return` unwinds to the nearest call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecSignal {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: HashMap<ExprId, usize>,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
    call_stack: Vec<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout and reading `input()` from stdin.
    pub fn new() -> Self {
        Self::with_io(stdin_reader(), io::stdout())
    }

    /// Interpreter printing to `output`.
    pub fn with_output<W: Write + 'static>(output: W) -> Self {
        Self::with_io(stdin_reader(), output)
    }

    pub fn with_io<R, W>(input: R, output: W) -> Self
    where
        R: BufRead + 'static,
        W: Write + 'static,
    {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();
        define_natives(&mut globals);
        let globals = globals.into_ref();

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output: Box::new(output),
            input: Box::new(input),
            call_stack: Vec::new(),
        }
    }

    // ───────────────────────── resolver hooks ─────────────────────────

    /// Record that `id` refers to a binding `depth` frames up.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Record that `id` refers to a global.
    pub fn note_global(&mut self, id: ExprId) {
        self.locals.remove(&id);
    }

    /// The resolved depth table.
    pub fn locals(&self) -> &HashMap<ExprId, usize> {
        &self.locals
    }

    pub(crate) fn output(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    pub(crate) fn input(&mut self) -> &mut dyn BufRead {
        self.input.as_mut()
    }

    // ───────────────────────── statements ─────────────────────────

    /// Run a resolved program.  Stops at the first runtime error, leaving the
    /// interpreter usable for further programs.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        self.output.flush()?;

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Execute `statements` with `environment` as the current frame, restoring
    /// the previous frame afterwards whatever the outcome.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
    ) -> Result<ExecSignal> {
        let previous = mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<ExecSignal> {
        for stmt in statements {
            if let ExecSignal::Return(value) = self.execute(stmt)? {
                return Ok(ExecSignal::Return(value));
            }
        }

        Ok(ExecSignal::Normal)
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<ExecSignal> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<ExecSignal> {
        match &stmt.kind {
            StmtKind::ExprStmt(expr) => {
                self.evaluate(expr)?;
            }

            StmtKind::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
            }

            StmtKind::VarDecl { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            StmtKind::FunctionDef(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);

                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment));
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
            }

            StmtKind::ClassDef {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,

            StmtKind::Block(statements) => {
                let frame = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(statements, frame.into_ref());
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            StmtKind::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let signal @ ExecSignal::Return(_) = self.execute(body)? {
                        return Ok(signal);
                    }
                }
            }

            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let frame = Environment::with_enclosing(Rc::clone(&self.environment));
                let previous = mem::replace(&mut self.environment, frame.into_ref());
                let result = self.execute_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    increment.as_ref(),
                    body,
                );
                self.environment = previous;

                return result;
            }

            StmtKind::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                return Ok(ExecSignal::Return(value));
            }
        }

        Ok(ExecSignal::Normal)
    }

    fn execute_for(
        &mut self,
        initializer: Option<&Stmt>,
        condition: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> Result<ExecSignal> {
        if let Some(init) = initializer {
            self.execute(init)?;
        }

        loop {
            if let Some(condition) = condition {
                if !self.evaluate(condition)?.is_truthy() {
                    break;
                }
            }

            if let signal @ ExecSignal::Return(_) = self.execute(body)? {
                return Ok(signal);
            }

            if let Some(increment) = increment {
                self.evaluate(increment)?;
            }
        }

        Ok(ExecSignal::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<Class>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(LoxError::runtime(
                        expr.index,
                        format!(
                            "Can only inherit from classes, found '{}'",
                            other.type_name()
                        ),
                    ))
                }
            },
            None => None,
        };

        // Methods close over a frame binding `super` when there is a superclass.
        let method_closure: EnvRef = match &superclass {
            Some(superclass) => {
                let mut frame = Environment::with_enclosing(Rc::clone(&self.environment));
                frame.define("super", Value::Class(Rc::clone(superclass)));
                frame.into_ref()
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<Function>> = methods
            .iter()
            .map(|decl| {
                let method = Function::new(Rc::clone(decl), Rc::clone(&method_closure));
                (decl.name.lexeme.clone(), Rc::new(method))
            })
            .collect();

        let class = Class {
            name: name.lexeme.clone(),
            superclass,
            methods,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ───────────────────────── expressions ─────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            }),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Variable { name } => self.look_up(&name.lexeme, expr),

            ExprKind::This { .. } => self.look_up("this", expr),

            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(&expr.id) {
                    Some(&depth) => {
                        Environment::assign_at(&self.environment, depth, &name.lexeme, value.clone())
                    }
                    None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
                };
                assigned.map_err(|e| lookup_error(e, expr.index))?;

                Ok(value)
            }

            ExprKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(LoxError::runtime(
                            expr.index,
                            format!(
                                "Expected 'Number' for unary '-', got '{}'",
                                other.type_name()
                            ),
                        )),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(
                        operator.index,
                        format!("Unary '{}' not supported", operator.lexeme),
                    )),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(expr, left, operator, right),

            ExprKind::Call {
                callee, arguments, ..
            } => {
                let callee = self.evaluate(callee)?;

                // Every argument runs before we find out whether the callee
                // can be called at all.
                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call_value(&callee, values, expr.index)
            }

            ExprKind::Get { object, name } => {
                let instance = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(LoxError::runtime(
                            object.index,
                            format!("Cannot access properties inside '{}'", other.type_name()),
                        ))
                    }
                };

                Instance::get(&instance, &name.lexeme).ok_or_else(|| {
                    LoxError::runtime(
                        expr.index,
                        format!(
                            "'{}' object has no attribute '{}'",
                            instance.borrow().class.name,
                            name.lexeme
                        ),
                    )
                })
            }

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let instance = match self.evaluate(object)? {
                    Value::Instance(instance) => instance,
                    other => {
                        return Err(LoxError::runtime(
                            object.index,
                            format!("Cannot set properties on '{}'", other.type_name()),
                        ))
                    }
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());

                Ok(value)
            }

            ExprKind::Super { method, .. } => {
                let depth = *self.locals.get(&expr.id).ok_or_else(|| {
                    LoxError::runtime(expr.index, "Unresolved 'super' expression")
                })?;

                let superclass = Environment::get_at(&self.environment, depth, "super")
                    .map_err(|e| lookup_error(e, expr.index))?;
                let instance =
                    Environment::get_at(&self.environment, depth.saturating_sub(1), "this")
                        .map_err(|e| lookup_error(e, expr.index))?;

                let superclass = match superclass {
                    Value::Class(superclass) => superclass,
                    other => {
                        return Err(LoxError::runtime(
                            expr.index,
                            format!("'super' is a '{}', not a class", other.type_name()),
                        ))
                    }
                };

                let bound = superclass
                    .find_method(&method.lexeme)
                    .ok_or_else(|| {
                        LoxError::runtime(
                            expr.index,
                            format!(
                                "Superclass '{}' has no method '{}'",
                                superclass.name, method.lexeme
                            ),
                        )
                    })?
                    .bind(instance);

                Ok(Value::Function(Rc::new(bound)))
            }
        }
    }

    fn evaluate_binary(
        &mut self,
        expr: &Expr,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value> {
        let left_value = self.evaluate(left)?;

        // Short circuits return one of the operands unchanged.
        match operator.token_type {
            TokenType::OR if left_value.is_truthy() => return Ok(left_value),
            TokenType::AND if !left_value.is_truthy() => return Ok(left_value),
            TokenType::OR | TokenType::AND => return self.evaluate(right),
            _ => {}
        }

        let right_value = self.evaluate(right)?;

        let result = match (&operator.token_type, &left_value, &right_value) {
            (TokenType::EQUAL_EQUAL, l, r) => Value::Bool(l == r),
            (TokenType::BANG_EQUAL, l, r) => Value::Bool(l != r),

            (TokenType::PLUS, Value::String(a), Value::String(b)) => {
                Value::String(format!("{}{}", a, b))
            }

            (op, Value::Number(a), Value::Number(b)) => {
                let (a, b) = (*a, *b);

                match op {
                    TokenType::PLUS => Value::Number(a + b),
                    TokenType::MINUS => Value::Number(a - b),
                    TokenType::STAR => Value::Number(a * b),
                    TokenType::SLASH | TokenType::PERCENT if b == 0.0 => {
                        return Err(LoxError::runtime(right.index, "Division by zero"));
                    }
                    TokenType::SLASH => Value::Number(a / b),
                    TokenType::PERCENT => Value::Number(floored_rem(a, b)),
                    TokenType::GREATER => Value::Bool(a > b),
                    TokenType::GREATER_EQUAL => Value::Bool(a >= b),
                    TokenType::LESS => Value::Bool(a < b),
                    TokenType::LESS_EQUAL => Value::Bool(a <= b),
                    _ => return Err(unsupported(expr, operator, &left_value, &right_value)),
                }
            }

            _ => return Err(unsupported(expr, operator, &left_value, &right_value)),
        };

        Ok(result)
    }

    /// Check callability and arity, then invoke.
    fn call_value(&mut self, callee: &Value, arguments: Vec<Value>, index: usize) -> Result<Value> {
        let result = match callee {
            Value::NativeFunction(native) => {
                self.enter_call(callee, native.arity, arguments.len(), index)?;
                (native.func)(self, &arguments).map_err(|message| LoxError::runtime(index, message))
            }

            Value::Function(function) => {
                self.enter_call(callee, function.arity(), arguments.len(), index)?;
                function.call(self, arguments)
            }

            Value::Class(class) => {
                self.enter_call(callee, class.arity(), arguments.len(), index)?;
                Class::call(class, self, arguments)
            }

            other => {
                return Err(LoxError::runtime(
                    index,
                    format!("'{}' object is not callable", other.type_name()),
                ))
            }
        };

        self.call_stack.pop();

        result
    }

    /// Arity and depth checks, then push `callee` onto the call stack.  The
    /// caller pops once the call returns.
    fn enter_call(&mut self, callee: &Value, arity: usize, given: usize, index: usize) -> Result<()> {
        if given != arity {
            return Err(LoxError::runtime(
                index,
                format!("{} expected {} arguments, got {}", callee, arity, given),
            ));
        }

        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(LoxError::Internal {
                message: "maximum recursion depth exceeded".to_string(),
                trace: self.call_stack.clone(),
            });
        }

        self.call_stack.push(callee.to_string());

        Ok(())
    }

    /// Depth‑based lookup for resolved names, global lookup otherwise.
    fn look_up(&self, name: &str, expr: &Expr) -> Result<Value> {
        let found = match self.locals.get(&expr.id) {
            Some(&depth) => Environment::get_at(&self.environment, depth, name),
            None => self.globals.borrow().get(name),
        };

        found.map_err(|e| lookup_error(e, expr.index))
    }
}

// Stdin already has a process-wide buffer.  Keep ours at one byte so a REPL
// reading stdin on the same thread never loses input to it.
fn stdin_reader() -> BufReader<io::Stdin> {
    BufReader::with_capacity(1, io::stdin())
}

fn lookup_error(error: LookupError, index: usize) -> LoxError {
    LoxError::runtime(index, error.to_string())
}

fn unsupported(expr: &Expr, operator: &Token, left: &Value, right: &Value) -> LoxError {
    LoxError::runtime(
        expr.index,
        format!(
            "Unsupported types for '{}': '{}' and '{}'",
            operator.lexeme,
            left.type_name(),
            right.type_name()
        ),
    )
}

/// Remainder taking the sign of the divisor.
fn floored_rem(a: f64, b: f64) -> f64 {
    let r = a % b;

    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}
