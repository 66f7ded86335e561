//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! Each pipeline stage owns one error shape: the scanner reports
//! [`ScanError`]s, the parser [`ParseError`]s, and both the resolver and the
//! evaluator [`RuntimeError`]s.  [`LoxError`] bundles a failed stage for the
//! front end, which maps it onto a process exit code.
//!
//! The module **does not** print diagnostics itself

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Lexical error with source line information.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScanError {
    /// 1‑based line where the error occurred.
    pub line: usize,

    /// Human‑readable description.
    pub message: String,
}

impl ScanError {
    pub fn new<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Scan error: line={}, msg={}", line, message);

        ScanError { line, message }
    }
}

/// Syntactic error located at the offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error{}: {}", .token.line, location(.token), .message)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Parse error: line={}, at={}, msg={}",
            token.line, token.lexeme, message
        );

        ParseError {
            token: token.clone(),
            message,
        }
    }
}

/// Runtime evaluation error.  The resolver reuses this shape for its static
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}\n[line {}]", .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: line={}, at={}, msg={}",
            token.line, token.lexeme, message
        );

        RuntimeError {
            token: token.clone(),
            message,
        }
    }
}

fn location(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// A pipeline run that stopped at one stage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// The scanner rejected the input.
    #[error("{}", join(.0))]
    Scan(Vec<ScanError>),

    /// The parser rejected the token stream.
    #[error("{}", join(.0))]
    Parse(Vec<ParseError>),

    /// Static resolution found scoping errors.
    #[error("{}", join(.0))]
    Resolve(Vec<RuntimeError>),

    /// Evaluation aborted.
    #[error(transparent)]
    Runtime(RuntimeError),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Conventional sysexits code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Scan(_) | LoxError::Parse(_) | LoxError::Resolve(_) => 65,
            LoxError::Runtime(_) => 70,
            LoxError::Io(_) => 74,
        }
    }
}

impl From<RuntimeError> for LoxError {
    fn from(err: RuntimeError) -> Self {
        LoxError::Runtime(err)
    }
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Crate‑wide `Result` alias for evaluation.
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Literal;

    #[test]
    fn parse_error_names_the_offending_lexeme() {
        let token = Token::new(TokenType::NUMBER, "12", Some(Literal::Number(12.0)), 3);
        let err = ParseError::new(&token, "Expect ';' after value.");

        assert_eq!(
            err.to_string(),
            "[line 3] Error at '12': Expect ';' after value."
        );
    }

    #[test]
    fn parse_error_at_eof_says_at_end() {
        let token = Token::synthetic(TokenType::EOF, "", 7);
        let err = ParseError::new(&token, "Expect expression.");

        assert_eq!(err.to_string(), "[line 7] Error at end: Expect expression.");
    }

    #[test]
    fn exit_codes_follow_sysexits() {
        let token = Token::synthetic(TokenType::IDENTIFIER, "x", 1);

        assert_eq!(LoxError::Scan(vec![ScanError::new(1, "bad")]).exit_code(), 65);
        assert_eq!(LoxError::Resolve(vec![]).exit_code(), 65);
        assert_eq!(
            LoxError::Runtime(RuntimeError::new(&token, "boom")).exit_code(),
            70
        );
    }
}
