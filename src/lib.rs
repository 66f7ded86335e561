//! `rox`: a tree-walking interpreter for Lox.
//!
//! Source text flows through four stages, each of which reports every error
//! it finds before the next one is allowed to run:
//!
//! ```text
//! scan -> parse -> resolve -> interpret
//! ```
//!
//! ```
//! use rox::interpreter::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! rox::run("print 1 + 2;", &mut interpreter).unwrap();
//! ```

pub mod ast_printer;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use log::info;

use crate::error::{LoxError, ParseError, RuntimeError, ScanError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;

/// Tokenize `source`.  Scanning halts at the first lexical error.
pub fn scan(source: &str) -> (Vec<Token>, Vec<ScanError>) {
    Scanner::new(source).scan_tokens()
}

/// Parse a program, recovering at statement boundaries.
pub fn parse(tokens: &[Token]) -> (Vec<Stmt>, Vec<ParseError>) {
    Parser::new(tokens).parse()
}

/// Record binding distances for `statements` in `interpreter`.
pub fn resolve(statements: &[Stmt], interpreter: &mut Interpreter) -> Vec<RuntimeError> {
    Resolver::new(interpreter).resolve(statements)
}

/// Run `source` through the whole pipeline on `interpreter`.  Globals
/// defined by earlier calls stay visible, which is what the prompt relies
/// on.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<(), LoxError> {
    let (tokens, errors) = scan(source);
    if !errors.is_empty() {
        return Err(LoxError::Scan(errors));
    }

    let (statements, errors) = parse(&tokens);
    if !errors.is_empty() {
        return Err(LoxError::Parse(errors));
    }

    let errors: Vec<RuntimeError> = resolve(&statements, interpreter);
    if !errors.is_empty() {
        return Err(LoxError::Resolve(errors));
    }

    info!("Pipeline ready to run {} statement(s)", statements.len());

    interpreter.interpret(&statements)?;
    Ok(())
}
