//! Module `scanner` implements a one‑pass, streaming lexer for the Lox language.
//!
//! It transforms a source string into a sequence of [`Token`]s, skipping
//! whitespace and comments, and emitting exactly one `EOF` token at the end.
//! Designed as a `FusedIterator`, it can be chained safely with other
//! iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &str) -> Scanner<'_>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, ScanError>` on each `.next()`.
//!
//! - `Scanner::scan_tokens(self) -> (Vec<Token>, Vec<ScanError>)`
//!   Drain the iterator into the token list and the error list.
//!
//! # Error policy
//!
//! The first lexical error (unexpected character, unterminated string,
//! unterminated block comment) is reported once and ends the scan: the
//! iterator yields the error and then `None`, without an `EOF` token.
//!
//! # Token Recognition (`scan_token`)
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `,`, `.`, `-`, `+`, `;`, `*`.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`.
//! - String literals: `"` … `"`, allowing multi‑line.
//! - Numeric literals: integer and optional fractional part.
//! - Identifiers/keywords: alphanumeric/_ sequences, resolved via a
//!   perfect‑hash `KEYWORDS` map.
//! - Comments: `//` to end of line (via `memchr`) and nestable `/* … */`.
//!
//! # Example
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let (tokens, errors) = Scanner::new("print 123; // example").scan_tokens();
//! assert!(errors.is_empty());
//! assert_eq!(tokens.len(), 4);
//! ```

use crate::error::ScanError;
use crate::token::{Literal, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** over borrowed source text.
pub struct Scanner<'a> {
    src: &'a str,                  // entire source text
    bytes: &'a [u8],               // same text, byte view for the hot loop
    start: usize,                  // index of the *first* byte of the current lexeme
    curr: usize,                   // index *one past* the last byte examined
    line: usize,                   // 1‑based line counter (\n increments)
    pending: Option<TokenType>,    // recognised token kind waiting to be emitted
    literal: Option<Literal>,      // literal payload of the pending token
    finished: bool,                // EOF emitted or scan aborted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
            literal: None,
            finished: false,
        }
    }

    /// Run the scanner to completion, splitting tokens from errors.
    pub fn scan_tokens(self) -> (Vec<Token>, Vec<ScanError>) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors: Vec<ScanError> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        info!(
            "Scan finished: {} token(s), {} error(s)",
            tokens.len(),
            errors.len()
        );

        (tokens, errors)
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.bytes.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.bytes.get(self.curr).copied().unwrap_or(0)
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.bytes.get(self.curr + 1).copied().unwrap_or(0)
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline(always)]
    fn emit(&mut self, tt: TokenType) {
        self.pending = Some(tt);
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  Whitespace and
    /// comments return `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<(), ScanError> {
        let b = self.advance();

        match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => self.emit(TokenType::LEFT_PAREN),
            b')' => self.emit(TokenType::RIGHT_PAREN),
            b'{' => self.emit(TokenType::LEFT_BRACE),
            b'}' => self.emit(TokenType::RIGHT_BRACE),
            b',' => self.emit(TokenType::COMMA),
            b'.' => self.emit(TokenType::DOT),
            b'-' => self.emit(TokenType::MINUS),
            b'+' => self.emit(TokenType::PLUS),
            b';' => self.emit(TokenType::SEMICOLON),
            b'*' => self.emit(TokenType::STAR),

            // ── two‑character operators (!=, ==, <=, >=) ─────────────────
            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };

                self.emit(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };

                self.emit(tt);
            }

            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };

                self.emit(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.emit(tt);
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {}

            b'\n' => {
                self.line += 1;
            }

            // ── comments and slash ───────────────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Jump to the next newline; the newline itself is left
                    // for the main loop so the line counter stays right.
                    match memchr(b'\n', &self.bytes[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.bytes.len(),
                    }
                } else if self.match_byte(b'*') {
                    self.block_comment()?;
                } else {
                    self.emit(TokenType::SLASH);
                }
            }

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                let c: char = self.src[self.start..].chars().next().unwrap_or('\u{FFFD}');

                return Err(ScanError::new(
                    self.line,
                    format!("Unexpected character: {}", c),
                ));
            }
        }

        Ok(())
    }

    /// Skip a `/* … */` comment; `/*` has been consumed.  Comments nest.
    fn block_comment(&mut self) -> Result<(), ScanError> {
        let mut depth: usize = 1;

        while depth > 0 {
            if self.is_at_end() {
                return Err(ScanError::new(self.line, "Unterminated block comment."));
            }

            match (self.peek(), self.peek_next()) {
                (b'*', b'/') => {
                    depth -= 1;
                    self.curr += 2;
                }

                (b'/', b'*') => {
                    depth += 1;
                    self.curr += 2;
                }

                (b'\n', _) => {
                    self.line += 1;
                    self.curr += 1;
                }

                _ => self.curr += 1,
            }
        }

        debug!("Skipped block comment ending on line {}", self.line);

        Ok(())
    }

    /// Parse a double‑quoted string literal.  `self.start` points to the
    /// opening `"`; on return `self.curr` is past the closing `"`.
    fn string(&mut self) -> Result<(), ScanError> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(ScanError::new(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        let value: &str = &self.src[self.start + 1..self.curr - 1];
        self.literal = Some(Literal::Str(value.to_owned()));
        self.emit(TokenType::STRING);

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional but a
    /// dot must be followed by a digit to belong to the number.
    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: &str = &self.src[self.start..self.curr];
        let n: f64 = text.parse::<f64>().unwrap_or(0.0); // digits only, cannot fail
        self.literal = Some(Literal::Number(n));
        self.emit(TokenType::NUMBER);
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let text: &str = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS.get(text).copied().unwrap_or(TokenType::IDENTIFIER);

        self.emit(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.is_at_end() {
                self.finished = true;
                return Some(Ok(Token::new(TokenType::EOF, "", None, self.line)));
            }

            // 2. Reset per‑token state.
            self.start = self.curr;
            self.pending = None;
            self.literal = None;

            // 3. Attempt to scan a token; the first error ends the scan.
            if let Err(e) = self.scan_token() {
                debug!("Scan aborted on line {}: {}", e.line, e.message);
                self.finished = true;
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, lexeme, self.literal.take(), self.line)));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        let (tokens, errors) = Scanner::new(source).scan_tokens();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        tokens.into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn longest_match_wins_for_two_char_operators() {
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![
                TokenType::BANG,
                TokenType::BANG_EQUAL,
                TokenType::EQUAL,
                TokenType::EQUAL_EQUAL,
                TokenType::LESS,
                TokenType::LESS_EQUAL,
                TokenType::GREATER,
                TokenType::GREATER_EQUAL,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn bare_dots_are_not_part_of_numbers() {
        assert_eq!(
            kinds(".5 5."),
            vec![
                TokenType::DOT,
                TokenType::NUMBER,
                TokenType::NUMBER,
                TokenType::DOT,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn nested_block_comments_are_skipped() {
        let (tokens, errors) = Scanner::new("/* a /* b */\n c */ x").scan_tokens();

        assert!(errors.is_empty());
        assert_eq!(tokens[0].token_type, TokenType::IDENTIFIER);
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let (tokens, errors) = Scanner::new("x /* /* */").scan_tokens();

        assert_eq!(tokens.len(), 1);
        assert_eq!(errors[0].message, "Unterminated block comment.");
    }

    #[test]
    fn non_ascii_outside_strings_is_reported_by_character() {
        let (_, errors) = Scanner::new("var é = 1;").scan_tokens();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unexpected character: é");
    }
}
