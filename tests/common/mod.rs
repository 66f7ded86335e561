#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::error::LoxError;
use rox::interpreter::Interpreter;

/// Shared byte buffer the interpreter prints into.
#[derive(Clone, Default)]
pub struct Capture(Rc<RefCell<Vec<u8>>>);

impl Capture {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.borrow())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn interpreter() -> (Interpreter, Capture) {
    let capture = Capture::default();
    (Interpreter::with_output(capture.clone()), capture)
}

/// Run `source` on a fresh interpreter, returning printed lines and the
/// pipeline result.
pub fn run(source: &str) -> (Vec<String>, Result<(), LoxError>) {
    let (mut interpreter, capture) = interpreter();
    let result = rox::run(source, &mut interpreter);
    (capture.lines(), result)
}
