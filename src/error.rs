//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime) convert their internal
//! failure modes into one of the variants defined here.  Every language error
//! carries the byte `index` of the token or node it originated from, which is
//! all a front end needs to compute a line/column and draw a caret under the
//! offending source text (see [`line_col`]).
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error.
    #[error("LexError: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// Byte offset into the source where the error occurred.
        index: usize,
    },

    /// A string literal ran into the end of the input while scanning in
    /// interactive mode.  The caller should read another line and retry.
    #[error("LexError: Unterminated string")]
    LexIncomplete { index: usize },

    /// Syntactic error, also used for static resolution failures: both mean
    /// "this program does not compile".
    #[error("ParseError: {message}")]
    Parse { message: String, index: usize },

    /// The repl‑mode parser ran out of tokens in the middle of a statement.
    #[error("ParseError: {message}")]
    UnexpectedEof { message: String, index: usize },

    /// Runtime evaluation error.
    #[error("InterpreterError: {message}")]
    Runtime { message: String, index: usize },

    /// Host level failure that is not a Lox error (e.g. runaway recursion).
    /// `trace` lists the Lox call stack, innermost call last.
    #[error("Internal Error: {message}")]
    Internal { message: String, trace: Vec<String> },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(index: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: index={}, msg={}", index, message);

        LoxError::Lex { message, index }
    }

    /// Helper constructor for the **parser** and **resolver**.
    pub fn parse<S: Into<String>>(index: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: index={}, msg={}", index, message);

        LoxError::Parse { message, index }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(index: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: index={}, msg={}", index, message);

        LoxError::Runtime { message, index }
    }

    /// The bare message, without the kind prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::UnexpectedEof { message, .. }
            | LoxError::Runtime { message, .. }
            | LoxError::Internal { message, .. } => message.clone(),
            LoxError::LexIncomplete { .. } => "Unterminated string".to_string(),
            LoxError::Io(e) => e.to_string(),
        }
    }

    /// Byte offset of the originating token/node, if the error has one.
    pub fn index(&self) -> Option<usize> {
        match self {
            LoxError::Lex { index, .. }
            | LoxError::LexIncomplete { index }
            | LoxError::Parse { index, .. }
            | LoxError::UnexpectedEof { index, .. }
            | LoxError::Runtime { index, .. } => Some(*index),
            LoxError::Internal { .. } | LoxError::Io(_) => None,
        }
    }

    /// Short name of the error class, as shown to users.
    pub fn kind(&self) -> &'static str {
        match self {
            LoxError::Lex { .. } | LoxError::LexIncomplete { .. } => "LexError",
            LoxError::Parse { .. } | LoxError::UnexpectedEof { .. } => "ParseError",
            LoxError::Runtime { .. } => "InterpreterError",
            LoxError::Internal { .. } | LoxError::Io(_) => "InternalError",
        }
    }

    /// `true` when more input could turn this failure into a valid program.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            LoxError::LexIncomplete { .. } | LoxError::UnexpectedEof { .. }
        )
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

/// Map a byte `index` into `source` to a 1‑based line, a 0‑based column and
/// the text of that line (without its newline).
///
/// Indices past the end of the source point just after the last character.
pub fn line_col(source: &str, index: usize) -> (usize, usize, &str) {
    let mut index = index.min(source.len());
    while !source.is_char_boundary(index) {
        index -= 1;
    }

    let before = &source[..index];

    let line_start = before.rfind('\n').map_or(0, |pos| pos + 1);
    let line = before.matches('\n').count() + 1;
    let line_end = source[line_start..]
        .find('\n')
        .map_or(source.len(), |pos| line_start + pos);

    (line, index - line_start, &source[line_start..line_end])
}
