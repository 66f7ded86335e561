use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, error, info};

use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environments};
use crate::error::{Result, RuntimeError};
use crate::expr::{Expr, LiteralValue, NodeId};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nested calls allowed before a script call fails with "Stack overflow.".
pub const MAX_CALL_DEPTH: usize = 1000;

/// How a statement finished.  `Return` unwinds enclosing blocks and loops up
/// to the nearest call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// Tree‑walking evaluator.  The current scope is never stored here: every
/// `execute`/`evaluate` call receives it explicitly.
pub struct Interpreter {
    envs: Environments,
    globals: EnvRef,
    /// Scope distance for every resolved variable/assign/this/super node.
    locals: HashMap<NodeId, usize>,
    out: Box<dyn Write>,
    /// Calls currently in progress.
    depth: usize,
    max_call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Creates an Interpreter writing program output to `out`, and defines
    /// the native functions such as `clock`.
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        info!("Initializing Interpreter");

        let envs: Environments = Environments::new();
        let globals: EnvRef = envs.root();

        debug!("Defining native function 'clock'");
        envs.define(
            &globals,
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction::clock())),
        );

        Self {
            envs,
            globals,
            locals: HashMap::new(),
            out: Box::new(out),
            depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    /// Each nested call consumes native stack; hosts running on small
    /// thread stacks can lower the limit.
    pub fn set_max_call_depth(&mut self, limit: usize) {
        self.max_call_depth = limit;
    }

    pub fn environments(&self) -> &Environments {
        &self.envs
    }

    /// Record the scope distance of a resolved local reference.
    pub fn resolve(&mut self, id: NodeId, depth: usize) {
        debug!("Noting {:?} at depth {}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// error stops execution; output written so far stays written.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statements", statements.len());

        let globals: EnvRef = self.globals.clone();
        let mut result: Result<()> = Ok(());

        for stmt in statements {
            if let Err(e) = self.execute(stmt, &globals) {
                debug!("Runtime error: {}", e.message);
                result = Err(e);
                break;
            }
        }

        if let Err(e) = self.out.flush() {
            error!("Failed to flush program output: {}", e);
        }

        if result.is_ok() {
            info!("Interpretation completed successfully");
        }

        result
    }

    /// Evaluate a bare expression in the global scope (the `evaluate` CLI
    /// mode).
    pub fn evaluate_global(&mut self, expr: &Expr) -> Result<Value> {
        let globals: EnvRef = self.globals.clone();
        self.evaluate(expr, &globals)
    }

    // ───────────────────────────── statements ──────────────────────────────

    /// Executes a single statement in `env`.
    pub fn execute(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Flow> {
        match stmt {
            Stmt::Block(statements) => {
                debug!("Entering block with {} statements", statements.len());
                let scope: EnvRef = self.envs.child(env);
                self.execute_block(statements, &scope)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class(name, superclass.as_ref(), methods, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                let function = LoxFunction::new(Rc::clone(declaration), env.clone(), false);
                self.envs.define(
                    env,
                    &declaration.name.lexeme,
                    Value::Function(Rc::new(function)),
                );
                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute(then_branch, env)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt, env)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::Print {
                keyword,
                expression,
            } => {
                let value: Value = self.evaluate(expression, env)?;
                writeln!(self.out, "{}", value).map_err(|e| {
                    RuntimeError::new(keyword, format!("Failed to write output: {}", e))
                })?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.envs.define(env, &name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside the already‑created scope `env`, stopping at
    /// the first `return`.
    pub fn execute_block(&mut self, statements: &[Stmt], env: &EnvRef) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        env: &EnvRef,
    ) -> Result<()> {
        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr, env)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at: &Token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(RuntimeError::new(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        // Bound first so methods can refer to their own class.
        self.envs.define(env, &name.lexeme, Value::Nil);

        let method_env: EnvRef = match &superclass {
            Some(parent) => {
                let scope: EnvRef = self.envs.child(env);
                self.envs
                    .define(&scope, "super", Value::Class(Rc::clone(parent)));
                scope
            }
            None => env.clone(),
        };

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|decl| {
                let is_initializer: bool = decl.name.lexeme == "init";
                let function =
                    LoxFunction::new(Rc::clone(decl), method_env.clone(), is_initializer);
                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        info!(
            "Class '{}' defined with {} method(s)",
            name.lexeme,
            methods.len()
        );

        let class = LoxClass::new(name.lexeme.clone(), superclass, methods);
        self.envs.assign(env, name, Value::Class(Rc::new(class)))
    }

    // ───────────────────────────── expressions ─────────────────────────────

    /// Evaluates an expression in `env`.
    pub fn evaluate(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value> {
        match expr {
            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value, env)?;
                self.assign_variable(*id, name, value.clone(), env)?;
                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left, env)?;
                let right: Value = self.evaluate(right, env)?;
                binary(operator, left, right)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee, env)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument, env)?);
                }

                self.invoke_callable(&callee, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object, env)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name, &self.envs),
                _ => Err(RuntimeError::new(name, "Only instances have properties.")),
            },

            Expr::Grouping(inner) => self.evaluate(inner, env),

            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left, env)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right, env)
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object, env)? else {
                    return Err(RuntimeError::new(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value, env)?;
                let displaced: Option<Value> = instance.borrow_mut().set(name, value.clone());
                drop(displaced);

                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method, env),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword, env),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right, env)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(RuntimeError::new(operator, "Invalid unary operator.")),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name, env),
        }
    }

    fn look_up_variable(&self, id: NodeId, name: &Token, env: &EnvRef) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => self
                .envs
                .get_at(env, distance, &name.lexeme)
                .ok_or_else(|| {
                    error!(
                        "Resolved '{}' at depth {} but no binding exists there",
                        name.lexeme, distance
                    );
                    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
                }),
            None => self.envs.get(&self.globals, name),
        }
    }

    fn assign_variable(&self, id: NodeId, name: &Token, value: Value, env: &EnvRef) -> Result<()> {
        match self.locals.get(&id) {
            Some(&distance) => {
                if self.envs.assign_at(env, distance, &name.lexeme, value) {
                    Ok(())
                } else {
                    error!(
                        "Resolved assignment to '{}' at depth {} found no binding",
                        name.lexeme, distance
                    );
                    Err(RuntimeError::new(
                        name,
                        format!("Undefined variable '{}'.", name.lexeme),
                    ))
                }
            }
            None => self.envs.assign(&self.globals, name, value),
        }
    }

    fn evaluate_super(
        &self,
        id: NodeId,
        keyword: &Token,
        method: &Token,
        env: &EnvRef,
    ) -> Result<Value> {
        let unresolved = || {
            error!("'super' on line {} was not resolved", keyword.line);
            RuntimeError::new(keyword, "Can't use 'super' here.")
        };

        let distance: usize = *self.locals.get(&id).ok_or_else(unresolved)?;

        let superclass: Rc<LoxClass> = match self.envs.get_at(env, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(unresolved()),
        };

        // `this` lives in the scope just inside the one holding `super`.
        let this = match distance
            .checked_sub(1)
            .and_then(|d| self.envs.get_at(env, d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(unresolved()),
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(this, &self.envs)))),
            None => Err(RuntimeError::new(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    /// Invokes a callable (native function, user function or class).
    fn invoke_callable(&mut self, callee: &Value, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        let callable: &dyn Callable = match callee {
            Value::NativeFunction(native) => native.as_ref(),
            Value::Function(function) => function.as_ref(),
            Value::Class(class) => class,
            other => {
                debug!("Attempted to call a {}", other.type_name());
                return Err(RuntimeError::new(paren, "Can only call functions and classes."));
            }
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::new(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.depth >= self.max_call_depth {
            debug!("Call depth limit {} reached", self.max_call_depth);
            return Err(RuntimeError::new(paren, "Stack overflow."));
        }

        self.depth += 1;
        let result: Result<Value> = callable.call(self, arguments, paren);
        self.depth -= 1;

        result
    }
}

/// Arithmetic, comparison and equality operators.
fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    debug!("Binary {} on {} and {}", operator.lexeme, left, right);

    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(RuntimeError::new(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

        TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

        _ => {
            let (Value::Number(a), Value::Number(b)) = (left, right) else {
                return Err(RuntimeError::new(operator, "Operands must be numbers."));
            };

            match operator.token_type {
                TokenType::MINUS => Ok(Value::Number(a - b)),
                TokenType::STAR => Ok(Value::Number(a * b)),
                TokenType::SLASH => Ok(Value::Number(a / b)),
                TokenType::GREATER => Ok(Value::Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                TokenType::LESS => Ok(Value::Bool(a < b)),
                TokenType::LESS_EQUAL => Ok(Value::Bool(a <= b)),
                _ => Err(RuntimeError::new(operator, "Invalid binary operator.")),
            }
        }
    }
}
