//! Module `scanner` implements a one‑pass, streaming lexer for the Lox language.
//!
//! It turns a source string into [`Token`]s, skipping whitespace and `//`
//! comments, and ends with exactly one `EOF` token whose index is the source
//! length.  The scanner is a `FusedIterator` of `Result<Token>`: a bad
//! character yields one `Err` and scanning resumes after it, which is what the
//! `tokenize` command wants.  [`Scanner::scan_all`] is the fail‑stop variant
//! the rest of the pipeline uses.
//!
//! # Modes
//!
//! - [`Scanner::new`]: batch.  An unterminated string is a [`LoxError::Lex`].
//! - [`Scanner::interactive`]: REPL.  An unterminated string yields
//!   [`LoxError::LexIncomplete`] so the caller can read another line.
//!
//! # Lexemes
//!
//! - Punctuation `( ) { } , . - + ; * / %` and `! != = == < <= > >=`.
//! - Strings in `"…"` or `'…'` with escapes `\\ \n \t \' \"`; a backslash
//!   right before a newline joins the two lines.
//! - Numbers: digits, optionally `.` followed by at least one digit.
//! - Identifiers `[A-Za-z_][A-Za-z0-9_]*`, keywords via the `KEYWORDS` map.

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Streaming lexer over a borrowed source string.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to look at.
    pos: usize,
    interactive: bool,
    finished: bool,
}

impl<'a> Scanner<'a> {
    /// Batch lexer over `source`.
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            pos: 0,
            interactive: false,
            finished: false,
        }
    }

    /// Lexer for REPL input.
    pub fn interactive(source: &'a str) -> Self {
        Self {
            interactive: true,
            ..Self::new(source)
        }
    }

    /// Scan the whole input, stopping at the first error.
    pub fn scan_all(self) -> Result<Vec<Token>> {
        self.collect()
    }

    // ───────────────────────────── byte cursor ─────────────────────────────

    #[inline(always)]
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Byte `ahead` positions past the cursor, `0` beyond the input.
    #[inline(always)]
    fn peek_at(&self, ahead: usize) -> u8 {
        self.bytes.get(self.pos + ahead).copied().unwrap_or(0)
    }

    /// Consume one byte.  Callers check [`Self::at_end`] first.
    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        b
    }

    #[inline(always)]
    fn eat(&mut self, expected: u8) -> bool {
        let hit = !self.at_end() && self.peek_at(0) == expected;
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// `long` if the next byte is `=` (consuming it), otherwise `short`.
    #[inline(always)]
    fn pick(&mut self, long: TokenType, short: TokenType) -> TokenType {
        if self.eat(b'=') {
            long
        } else {
            short
        }
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while !self.at_end() && pred(self.peek_at(0)) {
            self.pos += 1;
        }
    }

    fn char_at(&self, at: usize) -> char {
        self.source[at..].chars().next().unwrap_or('\0')
    }

    // ───────────────────────────── lexing ─────────────────────────────

    /// Scan from `self.start`.  `Ok(None)` means whitespace or a comment was
    /// skipped and nothing should be emitted.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let tt = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'%' => TokenType::PERCENT,

            b'!' => self.pick(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.pick(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.pick(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.pick(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'/' if self.eat(b'/') => {
                // Jump to the newline; the newline itself is whitespace.
                self.pos = memchr(b'\n', &self.bytes[self.pos..])
                    .map_or(self.bytes.len(), |offset| self.pos + offset);
                return Ok(None);
            }
            b'/' => TokenType::SLASH,

            b' ' | b'\r' | b'\t' | b'\n' => return Ok(None),

            quote @ (b'"' | b'\'') => self.string(quote)?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                let ch = self.char_at(self.start);
                // Resume on the next char boundary.
                self.pos = self.start + ch.len_utf8();

                return Err(LoxError::lex(
                    self.start,
                    format!("Unknown character found: '{}'", ch),
                ));
            }
        };

        Ok(Some(tt))
    }

    fn unterminated(&self) -> LoxError {
        if self.interactive {
            debug!("Incomplete string starting at {}", self.start);

            LoxError::LexIncomplete { index: self.start }
        } else {
            LoxError::lex(self.start, "Unterminated string")
        }
    }

    /// Body of a string literal; the opening `quote` is already consumed.
    fn string(&mut self, quote: u8) -> Result<TokenType> {
        let mut text: Vec<u8> = Vec::new();

        loop {
            if self.at_end() {
                return Err(self.unterminated());
            }

            match self.bump() {
                b if b == quote => break,

                b'\\' => {
                    if self.at_end() {
                        return Err(self.unterminated());
                    }

                    let decoded = match self.peek_at(0) {
                        b'\n' => None,
                        b'\\' => Some(b'\\'),
                        b'n' => Some(b'\n'),
                        b't' => Some(b'\t'),
                        b'\'' => Some(b'\''),
                        b'"' => Some(b'"'),
                        _ => {
                            return Err(LoxError::lex(
                                self.pos - 1,
                                format!("Unknown escape sequence: '\\{}'", self.char_at(self.pos)),
                            ));
                        }
                    };

                    self.pos += 1;
                    text.extend(decoded);
                }

                b => text.push(b),
            }
        }

        // Only ASCII bytes were dropped or substituted, so this stays UTF‑8.
        Ok(TokenType::STRING(String::from_utf8_lossy(&text).into_owned()))
    }

    fn number(&mut self) -> TokenType {
        self.eat_while(|b| b.is_ascii_digit());

        if self.peek_at(0) == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            self.eat_while(|b| b.is_ascii_digit());
        }

        // Digits with at most one inner dot always parse.
        TokenType::NUMBER(self.source[self.start..self.pos].parse().unwrap_or(0.0))
    }

    fn identifier(&mut self) -> TokenType {
        self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');

        KEYWORDS
            .get(&self.bytes[self.start..self.pos])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while !self.at_end() {
            self.start = self.pos;

            match self.scan_token() {
                Ok(Some(tt)) => {
                    let lexeme = &self.source[self.start..self.pos];
                    return Some(Ok(Token::new(tt, lexeme, self.start)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        self.finished = true;
        Some(Ok(Token::new(TokenType::EOF, "", self.bytes.len())))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
