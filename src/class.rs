use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::callable::{Callable, LoxFunction};
use crate::environment::Environments;
use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::Value;

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Own methods first, then each ancestor in turn.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        let mut class: Option<&LoxClass> = Some(self);

        while let Some(current) = class {
            if let Some(method) = current.methods.get(name) {
                return Some(Rc::clone(method));
            }

            class = current.superclass.as_deref();
        }

        None
    }
}

/// Calling a class constructs an instance and runs `init` if any class in
/// the chain defines one.
impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(self))));

        debug!("Instantiating class '{}'", self.name);

        if let Some(init) = self.find_method("init") {
            let bound: LoxFunction = init.bind(Rc::clone(&instance), interpreter.environments());
            bound.call(interpreter, arguments, paren)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Fields are named bits of state stored directly in an instance.  Every
/// field is a property, but methods are properties too.
#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property lookup: a field shadows a method of the same name.  Methods
    /// come back bound to `this`.
    pub fn get(this: &Rc<RefCell<LoxInstance>>, name: &Token, envs: &Environments) -> Result<Value> {
        let (field, class) = {
            let instance = this.borrow();
            (
                instance.fields.get(&name.lexeme).cloned(),
                Rc::clone(&instance.class),
            )
        };

        if let Some(value) = field {
            return Ok(value);
        }

        match class.find_method(&name.lexeme) {
            Some(method) => Ok(Value::Function(Rc::new(
                method.bind(Rc::clone(this), envs),
            ))),
            None => Err(RuntimeError::new(
                name,
                format!("Undefined property '{}'.", name.lexeme),
            )),
        }
    }

    /// Create or overwrite a field.  Returns the displaced value so the
    /// caller can drop it outside the instance borrow.
    #[must_use]
    pub fn set(&mut self, name: &Token, value: Value) -> Option<Value> {
        self.fields.insert(name.lexeme.clone(), value)
    }
}

impl fmt::Display for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
