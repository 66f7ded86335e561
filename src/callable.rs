use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::{debug, error, info};

use crate::class::LoxInstance;
use crate::environment::{EnvRef, Environments};
use crate::error::{Result, RuntimeError};
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::token::Token;
use crate::value::Value;

/// Anything a call expression can invoke.  Arity has already been checked
/// by the interpreter when `call` runs.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value>;
}

/// Host function exposed to scripts.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> std::result::Result<Value, String>,
}

impl NativeFunction {
    /// `clock()`: seconds since the Unix epoch.
    pub fn clock() -> Self {
        NativeFunction {
            name: "clock",
            arity: 0,
            func: |_args: &[Value]| {
                debug!("Calling native function 'clock'");
                let micros: i64 = chrono::Utc::now().timestamp_micros();
                Ok(Value::Number(micros as f64 / 1_000_000.0))
            },
        }
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _: &mut Interpreter, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        let result: Value = (self.func)(&arguments).map_err(|msg| RuntimeError::new(paren, msg))?;

        info!("Native function '{}' returned: {}", self.name, result);

        Ok(result)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({}/{})", self.name, self.arity)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// A user function or method together with the scope it closes over.
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: EnvRef,
    /// `init` methods always evaluate to their receiver.
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Same declaration, closure extended with `this` → `instance`.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>, envs: &Environments) -> LoxFunction {
        let env: EnvRef = envs.child(&self.closure);
        envs.define(&env, "this", Value::Instance(instance));

        debug!("Bound method '{}' in environment {}", self.name(), env.id());

        LoxFunction::new(Rc::clone(&self.declaration), env, self.is_initializer)
    }

    fn this(&self, interpreter: &Interpreter) -> Result<Value> {
        interpreter
            .environments()
            .get_at(&self.closure, 0, "this")
            .ok_or_else(|| {
                error!("Initializer '{}' has no bound receiver", self.name());
                RuntimeError::new(&self.declaration.name, "Initializer called without a receiver.")
            })
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>, _: &Token) -> Result<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        let env: EnvRef = interpreter.environments().child(&self.closure);

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            interpreter.environments().define(&env, &param.lexeme, argument);
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, &env)?;

        if self.is_initializer {
            return self.this(interpreter);
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
