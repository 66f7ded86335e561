use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of an expression node that the resolver annotates with a scope
/// depth.  Ids are unique for the life of the process, so ASTs parsed at
/// different times (e.g. successive REPL lines) never collide in the
/// interpreter's binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(0);

impl NodeId {
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal.
    Nil,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: NodeId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Function‑ or method‑call expression
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method` inside a subclass method.
    Super {
        id: NodeId,
        keyword: Token,
        method: Token,
    },

    /// The 'this' keyword inside a method.
    This { id: NodeId, keyword: Token },

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary { operator: Token, right: Box<Expr> },

    /// Variable access ‑ resolves to the identifier's current value at runtime.
    Variable { id: NodeId, name: Token },
}

/// Double‑dispatch entry point for consumers that walk expressions without
/// matching on [`Expr`] themselves.
pub trait ExprVisitor<R> {
    fn visit_assign(&mut self, name: &Token, value: &Expr) -> R;
    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> R;
    fn visit_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> R;
    fn visit_get(&mut self, object: &Expr, name: &Token) -> R;
    fn visit_grouping(&mut self, expression: &Expr) -> R;
    fn visit_literal(&mut self, value: &LiteralValue) -> R;
    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> R;
    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> R;
    fn visit_super(&mut self, keyword: &Token, method: &Token) -> R;
    fn visit_this(&mut self, keyword: &Token) -> R;
    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> R;
    fn visit_variable(&mut self, name: &Token) -> R;
}

impl Expr {
    pub fn accept<R, V: ExprVisitor<R> + ?Sized>(&self, visitor: &mut V) -> R {
        match self {
            Expr::Assign { name, value, .. } => visitor.visit_assign(name, value),
            Expr::Binary {
                left,
                operator,
                right,
            } => visitor.visit_binary(left, operator, right),
            Expr::Call {
                callee,
                paren,
                arguments,
            } => visitor.visit_call(callee, paren, arguments),
            Expr::Get { object, name } => visitor.visit_get(object, name),
            Expr::Grouping(expression) => visitor.visit_grouping(expression),
            Expr::Literal(value) => visitor.visit_literal(value),
            Expr::Logical {
                left,
                operator,
                right,
            } => visitor.visit_logical(left, operator, right),
            Expr::Set {
                object,
                name,
                value,
            } => visitor.visit_set(object, name, value),
            Expr::Super {
                keyword, method, ..
            } => visitor.visit_super(keyword, method),
            Expr::This { keyword, .. } => visitor.visit_this(keyword),
            Expr::Unary { operator, right } => visitor.visit_unary(operator, right),
            Expr::Variable { name, .. } => visitor.visit_variable(name),
        }
    }
}
