use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A named function or method: `IDENT "(" params? ")" block`.
///
/// Shared behind `Rc` so runtime function values can point at their
/// declaration for as long as they live.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Body executed when the function is called.
    pub body: Vec<Stmt>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.  `for` loops do not appear
/// here: the parser lowers them to `while`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    Class {
        name: Token,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Function(Rc<FunctionDecl>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `print` statement used for output.
    Print { keyword: Token, expression: Expr },

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    While { condition: Expr, body: Box<Stmt> },
}

pub trait StmtVisitor<R> {
    fn visit_block(&mut self, statements: &[Stmt]) -> R;
    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> R;
    fn visit_expression(&mut self, expression: &Expr) -> R;
    fn visit_function(&mut self, declaration: &FunctionDecl) -> R;
    fn visit_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> R;
    fn visit_print(&mut self, expression: &Expr) -> R;
    fn visit_return(&mut self, keyword: &Token, value: Option<&Expr>) -> R;
    fn visit_var(&mut self, name: &Token, initializer: Option<&Expr>) -> R;
    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> R;
}

impl Stmt {
    pub fn accept<R, V: StmtVisitor<R> + ?Sized>(&self, visitor: &mut V) -> R {
        match self {
            Stmt::Block(statements) => visitor.visit_block(statements),
            Stmt::Class {
                name,
                superclass,
                methods,
            } => visitor.visit_class(name, superclass.as_ref(), methods),
            Stmt::Expression(expression) => visitor.visit_expression(expression),
            Stmt::Function(declaration) => visitor.visit_function(declaration),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => visitor.visit_if(condition, then_branch, else_branch.as_deref()),
            Stmt::Print { expression, .. } => visitor.visit_print(expression),
            Stmt::Return { keyword, value } => visitor.visit_return(keyword, value.as_ref()),
            Stmt::Var { name, initializer } => visitor.visit_var(name, initializer.as_ref()),
            Stmt::While { condition, body } => visitor.visit_while(condition, body),
        }
    }
}
