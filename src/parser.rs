/*!
Recursive‑descent parser for Lox
================================

One‑token lookahead, no backtracking.  Each token is consumed once via
`advance()`, so parsing is Θ(n) in the number of tokens; call‑stack depth
grows with syntactic nesting.

### Modes

| Mode   | Behaviour on a syntax error                                                  |
|--------|------------------------------------------------------------------------------|
| `File` | Record it, synchronise to the next statement boundary, keep going.           |
| `Repl` | Stop at the first one.  Running out of tokens mid‑statement is reported as   |
|        | [`LoxError::UnexpectedEof`] so the caller can prompt for another line.       |

### Logging Policy

| Location                     | Level  | Purpose                                   |
|------------------------------|--------|-------------------------------------------|
| `Parser::new`, `parse`       | `info` | Lifecycle milestones.                     |
| `declaration`, `statement`   | `debug`| High‑level descent into grammar branches. |
| `synchronize`                | `debug`| Recovery after a recorded error.          |

--------------------------------------------------------------------------------
Grammar (EBNF)
--------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt
               | returnStmt | whileStmt | block ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
ifStmt         → "if" "(" expression ")" statement ( "else" statement )? ;
printStmt      → "print" expression ";" ;
returnStmt     → "return" expression? ";" ;
whileStmt      → "while" "(" expression ")" statement ;
block          → "{" declaration* "}" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" | "%" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT ;
```
*/

use std::mem;
use std::rc::Rc;

use crate::ast::{Expr, ExprKind, FunctionDecl, LiteralValue, Program, Stmt, StmtKind};
use crate::error::{LoxError, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Parameters and call arguments are capped at this many.
pub const MAX_ARITY: usize = 255;

/// How the parser reacts to syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Accumulate every statement‑level error.
    File,

    /// Fail on the first error, flagging end‑of‑input separately.
    Repl,
}

/// Top‑level parser over an owned token sequence.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    mode: ParseMode,
    /// Syntax errors recovered from so far, in source order.
    errors: Vec<LoxError>,
}

impl Parser {
    /// Construct a new parser.  A missing `EOF` sentinel is appended.
    pub fn new(mut tokens: Vec<Token>, mode: ParseMode) -> Self {
        info!("Parser created with {} tokens in {:?} mode", tokens.len(), mode);

        if !tokens.last().is_some_and(Token::is_eof) {
            let end = tokens.last().map_or(0, |t| t.index + t.lexeme.len());
            tokens.push(Token::new(TokenType::EOF, "", end));
        }

        Self {
            tokens,
            current: 0,
            mode,
            errors: Vec::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program.
    ///
    /// In [`ParseMode::File`] this always succeeds, returning the statements
    /// that parsed cleanly together with every syntax error found.  In
    /// [`ParseMode::Repl`] the first error is returned as `Err`.
    pub fn parse(&mut self) -> Result<(Program, Vec<LoxError>)> {
        info!("Beginning parse phase");

        let mut statements: Program = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.recovering_declaration()? {
                statements.push(stmt);
            }
        }

        let errors = mem::take(&mut self.errors);

        info!(
            "Parsed {} statement(s) with {} error(s)",
            statements.len(),
            errors.len()
        );

        Ok((statements, errors))
    }

    // ──────────────────────── declaration rules ───────────────────

    /// A declaration, or `None` after recording its error and skipping to
    /// the next statement boundary.  Only repl mode returns `Err`.
    fn recovering_declaration(&mut self) -> Result<Option<Stmt>> {
        match self.declaration() {
            Ok(stmt) => Ok(Some(stmt)),

            Err(e) if self.mode == ParseMode::Repl => Err(e),

            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                Ok(None)
            }
        }
    }

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration at {}", self.peek().index);

        if self.matches(TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(TokenType::FUN) {
            let index = self.previous().index;
            let decl = self.function("function")?;

            Ok(Stmt::new(StmtKind::FunctionDef(decl), index))
        } else if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let index = self.previous().index;
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected class name")?
            .clone();

        let superclass: Option<Expr> = if self.matches(TokenType::LESS) {
            let super_name = self
                .consume(TokenType::IDENTIFIER, "Expected superclass name")?
                .clone();
            let super_index = super_name.index;

            Some(Expr::new(
                ExprKind::Variable { name: super_name },
                super_index,
            ))
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before class body")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        Ok(Stmt::new(
            StmtKind::ClassDef {
                name,
                superclass,
                methods,
            },
            index,
        ))
    }

    /// `IDENT "(" parameters? ")" block`, shared by functions and methods.
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name: Token = self
            .consume(TokenType::IDENTIFIER, &format!("Expected {} name", kind))?
            .clone();
        let index = name.index;

        self.consume(
            TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();
        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARITY {
                    return Err(LoxError::parse(
                        self.peek().index,
                        format!("Cannot have more than {} parameters", MAX_ARITY),
                    ));
                }

                params.push(
                    self.consume(TokenType::IDENTIFIER, "Expected parameter name")?
                        .clone(),
                );

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;

        self.consume(
            TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body", kind),
        )?;
        let body: Vec<Stmt> = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body,
            index,
        }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let index = self.previous().index;
        let name: Token = self
            .consume(TokenType::IDENTIFIER, "Expected variable name")?
            .clone();

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::new(StmtKind::VarDecl { name, initializer }, index))
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<Stmt> {
        debug!("Entering statement at {}", self.peek().index);

        if self.matches(TokenType::FOR) {
            self.for_statement()
        } else if self.matches(TokenType::IF) {
            self.if_statement()
        } else if self.matches(TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(TokenType::LEFT_BRACE) {
            let index = self.previous().index;

            Ok(Stmt::new(StmtKind::Block(self.block()?), index))
        } else if self.matches(TokenType::PRINT) {
            self.print_statement()
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let index = self.previous().index;
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;

        let initializer = if self.matches(TokenType::SEMICOLON) {
            None
        } else if self.matches(TokenType::VAR) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

        let increment = if !self.check(TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::new(
            StmtKind::For {
                initializer,
                condition,
                increment,
                body,
            },
            index,
        ))
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let index = self.previous().index;
        let value: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "Expected ';' after value")?;

        Ok(Stmt::new(StmtKind::Print(value), index))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        let index = expr.index;

        self.consume(TokenType::SEMICOLON, "Expected ';' after expression")?;

        Ok(Stmt::new(StmtKind::ExprStmt(expr), index))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let index = self.previous().index;
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let then_branch: Box<Stmt> = Box::new(self.statement()?);
        let else_branch: Option<Box<Stmt>> = if self.matches(TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
            index,
        ))
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let index = self.previous().index;
        self.consume(TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let condition: Expr = self.expression()?;
        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after condition")?;
        let body: Box<Stmt> = Box::new(self.statement()?);

        Ok(Stmt::new(StmtKind::While { condition, body }, index))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let index = keyword.index;

        let value: Option<Expr> = if !self.check(TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::SEMICOLON, "Expected ';' after return value")?;

        Ok(Stmt::new(StmtKind::Return { keyword, value }, index))
    }

    /// The statements of a `{ … }` block; the opening brace is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            match self.recovering_declaration()? {
                Some(stmt) => statements.push(stmt),

                // Recovery stopped just past this block's own `}`.
                None if self.previous().token_type == TokenType::RIGHT_BRACE => {
                    return Ok(statements);
                }

                None => {}
            }
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.assignment())
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(TokenType::EQUAL) {
            let equals_index = self.previous().index;
            let value: Expr = self.assignment()?;
            let index = expr.index;

            return match expr.kind {
                ExprKind::Variable { name } => Ok(Expr::new(
                    ExprKind::Assign {
                        name,
                        value: Box::new(value),
                    },
                    index,
                )),

                ExprKind::Get { object, name } => Ok(Expr::new(
                    ExprKind::Set {
                        object,
                        name,
                        value: Box::new(value),
                    },
                    index,
                )),

                _ => Err(LoxError::parse(equals_index, "Invalid assign target")),
            };
        }

        Ok(expr)
    }

    /// Parse a left‑associative chain of binary operators drawn from `ops`,
    /// with `operand` parsing each side.
    fn binary_chain(
        &mut self,
        ops: &[TokenType],
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut expr: Expr = operand(self)?;

        while ops.iter().any(|op| self.check(op.clone())) {
            let operator: Token = self.advance().clone();
            let right: Expr = operand(self)?;
            let index = expr.index;

            expr = Expr::new(
                ExprKind::Binary {
                    left: Box::new(expr),
                    operator,
                    right: Box::new(right),
                },
                index,
            );
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        self.binary_chain(&[TokenType::OR], Self::logical_and)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        self.binary_chain(&[TokenType::AND], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary_chain(
            &[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_chain(
            &[
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_chain(&[TokenType::MINUS, TokenType::PLUS], Self::factor)
    }

    fn factor(&mut self) -> Result<Expr> {
        self.binary_chain(
            &[TokenType::STAR, TokenType::SLASH, TokenType::PERCENT],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(TokenType::BANG) || self.matches(TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let index = operator.index;
            let right: Expr = ensure_sufficient_stack(|| self.unary())?;

            return Ok(Expr::new(
                ExprKind::Unary {
                    operator,
                    right: Box::new(right),
                },
                index,
            ));
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::DOT) {
                let name: Token = self
                    .consume(TokenType::IDENTIFIER, "Expected property name after '.'")?
                    .clone();
                let index = expr.index;

                expr = Expr::new(
                    ExprKind::Get {
                        object: Box::new(expr),
                        name,
                    },
                    index,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    return Err(LoxError::parse(
                        self.peek().index,
                        format!("Cannot have more than {} arguments", MAX_ARITY),
                    ));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self
            .consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?
            .clone();
        let index = callee.index;

        Ok(Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                paren,
                arguments,
            },
            index,
        ))
    }

    fn primary(&mut self) -> Result<Expr> {
        let token: Token = self.peek().clone();
        let index = token.index;

        let kind = match token.token_type {
            TokenType::FALSE => ExprKind::Literal(LiteralValue::Bool(false)),
            TokenType::TRUE => ExprKind::Literal(LiteralValue::Bool(true)),
            TokenType::NIL => ExprKind::Literal(LiteralValue::Nil),
            TokenType::NUMBER(n) => ExprKind::Literal(LiteralValue::Number(n)),
            TokenType::STRING(ref s) => ExprKind::Literal(LiteralValue::Str(s.clone())),
            TokenType::IDENTIFIER => ExprKind::Variable { name: token },
            TokenType::THIS => ExprKind::This { keyword: token },

            TokenType::SUPER => {
                self.advance();
                self.consume(TokenType::DOT, "Expected '.' after 'super'")?;
                let method: Token = self
                    .consume(TokenType::IDENTIFIER, "Expected superclass method name")?
                    .clone();

                return Ok(Expr::new(
                    ExprKind::Super {
                        keyword: token,
                        method,
                    },
                    index,
                ));
            }

            TokenType::LEFT_PAREN => {
                self.advance();
                let expr: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;

                return Ok(Expr::new(ExprKind::Grouping(Box::new(expr)), index));
            }

            TokenType::EOF => return Err(self.error_at(&token, "Unexpected end of file")),

            _ => {
                return Err(self.error_at(
                    &token,
                    &format!("Unexpected token: '{}'", token.lexeme),
                ))
            }
        };

        self.advance();

        Ok(Expr::new(kind, index))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Build the error for `token`, flagging end of input in repl mode.
    fn error_at(&self, token: &Token, message: &str) -> LoxError {
        if token.is_eof() && self.mode == ParseMode::Repl {
            debug!("Unexpected EOF in repl mode: {}", message);

            return LoxError::UnexpectedEof {
                message: message.to_string(),
                index: token.index,
            };
        }

        LoxError::parse(token.index, message)
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&Token> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error_at(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Discards tokens until it thinks it is at a statement boundary: just
    /// past a `;` or `}`, or in front of a statement keyword.
    fn synchronize(&mut self) {
        debug!("Synchronizing after error at {}", self.peek().index);

        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(
                self.previous().token_type,
                TokenType::SEMICOLON | TokenType::RIGHT_BRACE
            ) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
