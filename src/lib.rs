//! A tree‑walking interpreter for **Lox**.
//!
//! source → [`scanner`] → tokens → [`parser`] → AST → [`resolver`] →
//! depth table (stored in the [`Interpreter`]) → [`interpreter`].
//!
//! The free functions below are the whole pipeline surface used by the
//! `rlox` binary and the integration tests.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod instance;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stack;
pub mod token;
pub mod value;

pub use ast::{Program, Stmt};
pub use error::{LoxError, Result};
pub use interpreter::Interpreter;
pub use parser::ParseMode;
pub use token::Token;

use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// Tokenize `source`, terminated by an `EOF` token.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    Scanner::new(source).scan_all()
}

/// Like [`lex`], but an unterminated string yields
/// [`LoxError::LexIncomplete`] instead of a plain lex error.
pub fn lex_interactive(source: &str) -> Result<Vec<Token>> {
    Scanner::interactive(source).scan_all()
}

/// Parse `tokens`.  See [`Parser::parse`] for how `mode` affects errors.
pub fn parse(tokens: Vec<Token>, mode: ParseMode) -> Result<(Program, Vec<LoxError>)> {
    Parser::new(tokens, mode).parse()
}

/// Run the static pass, recording depths into `interpreter`.
pub fn resolve(interpreter: &mut Interpreter, program: &[Stmt]) -> Result<()> {
    Resolver::new(interpreter).resolve(program)
}

/// Execute a program previously resolved against the same `interpreter`.
pub fn evaluate(interpreter: &mut Interpreter, program: &[Stmt]) -> Result<()> {
    interpreter.interpret(program)
}

/// Lex, parse (file mode), resolve and evaluate `source`.  The first syntax
/// error, if any, is returned and nothing runs.
pub fn run_source(interpreter: &mut Interpreter, source: &str) -> Result<()> {
    let tokens = lex(source)?;
    let (program, errors) = parse(tokens, ParseMode::File)?;

    if let Some(first) = errors.into_iter().next() {
        return Err(first);
    }

    resolve(interpreter, &program)?;
    evaluate(interpreter, &program)
}
