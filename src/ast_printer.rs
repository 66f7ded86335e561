//! Debug renderings of the AST.  Used by the `parse` subcommand and tests;
//! the interpreter never consults them.

use std::rc::Rc;

use crate::expr::{Expr, ExprVisitor, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt, StmtVisitor};
use crate::token::Token;
use crate::value::format_number;

/// Fully parenthesized prefix form: `(* (- 123) (group 45.67))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&mut self, expr: &Expr) -> String {
        expr.accept(self)
    }

    pub fn print_stmt(&mut self, stmt: &Stmt) -> String {
        stmt.accept(self)
    }

    fn parenthesize(&mut self, name: &str, exprs: &[&Expr]) -> String {
        let mut out: String = format!("({}", name);

        for expr in exprs {
            out.push(' ');
            out.push_str(&expr.accept(self));
        }

        out.push(')');
        out
    }

    fn function(&mut self, keyword: &str, declaration: &FunctionDecl) -> String {
        let params: Vec<&str> = declaration.params.iter().map(|p| p.lexeme.as_str()).collect();
        let body: Vec<String> = declaration.body.iter().map(|s| s.accept(self)).collect();

        format!(
            "({} {}({}) {})",
            keyword,
            declaration.name.lexeme,
            params.join(" "),
            body.join(" ")
        )
    }
}

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Number(n) => format_number(*n),
        LiteralValue::Str(s) => s.clone(),
        LiteralValue::True => "true".to_string(),
        LiteralValue::False => "false".to_string(),
        LiteralValue::Nil => "nil".to_string(),
    }
}

impl ExprVisitor<String> for AstPrinter {
    fn visit_assign(&mut self, name: &Token, value: &Expr) -> String {
        self.parenthesize(&format!("= {}", name.lexeme), &[value])
    }

    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> String {
        self.parenthesize(&operator.lexeme, &[left, right])
    }

    fn visit_call(&mut self, callee: &Expr, _paren: &Token, arguments: &[Expr]) -> String {
        let mut exprs: Vec<&Expr> = vec![callee];
        exprs.extend(arguments.iter());
        self.parenthesize("call", &exprs)
    }

    fn visit_get(&mut self, object: &Expr, name: &Token) -> String {
        self.parenthesize(&format!(". {}", name.lexeme), &[object])
    }

    fn visit_grouping(&mut self, expression: &Expr) -> String {
        self.parenthesize("group", &[expression])
    }

    fn visit_literal(&mut self, value: &LiteralValue) -> String {
        literal(value)
    }

    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> String {
        self.parenthesize(&operator.lexeme, &[left, right])
    }

    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> String {
        self.parenthesize(&format!(".= {}", name.lexeme), &[object, value])
    }

    fn visit_super(&mut self, _keyword: &Token, method: &Token) -> String {
        format!("(super {})", method.lexeme)
    }

    fn visit_this(&mut self, _keyword: &Token) -> String {
        "this".to_string()
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> String {
        self.parenthesize(&operator.lexeme, &[right])
    }

    fn visit_variable(&mut self, name: &Token) -> String {
        name.lexeme.clone()
    }
}

impl StmtVisitor<String> for AstPrinter {
    fn visit_block(&mut self, statements: &[Stmt]) -> String {
        let inner: Vec<String> = statements.iter().map(|s| s.accept(self)).collect();
        format!("(block {})", inner.join(" "))
    }

    fn visit_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> String {
        let mut out: String = format!("(class {}", name.lexeme);

        if let Some(superclass) = superclass {
            out.push_str(" < ");
            out.push_str(&superclass.accept(self));
        }

        for method in methods {
            out.push(' ');
            out.push_str(&self.function("method", method));
        }

        out.push(')');
        out
    }

    fn visit_expression(&mut self, expression: &Expr) -> String {
        self.parenthesize(";", &[expression])
    }

    fn visit_function(&mut self, declaration: &FunctionDecl) -> String {
        self.function("fun", declaration)
    }

    fn visit_if(&mut self, condition: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> String {
        let condition: String = condition.accept(self);
        let then_branch: String = then_branch.accept(self);

        match else_branch {
            Some(else_branch) => format!("(if {} {} {})", condition, then_branch, else_branch.accept(self)),
            None => format!("(if {} {})", condition, then_branch),
        }
    }

    fn visit_print(&mut self, expression: &Expr) -> String {
        self.parenthesize("print", &[expression])
    }

    fn visit_return(&mut self, _keyword: &Token, value: Option<&Expr>) -> String {
        match value {
            Some(value) => self.parenthesize("return", &[value]),
            None => "(return)".to_string(),
        }
    }

    fn visit_var(&mut self, name: &Token, initializer: Option<&Expr>) -> String {
        match initializer {
            Some(init) => self.parenthesize(&format!("var {} =", name.lexeme), &[init]),
            None => format!("(var {})", name.lexeme),
        }
    }

    fn visit_while(&mut self, condition: &Expr, body: &Stmt) -> String {
        let condition: String = condition.accept(self);
        format!("(while {} {})", condition, body.accept(self))
    }
}

/// Reverse Polish form: `123 - 45.67 *`.  Groupings disappear, operators
/// follow their operands.
pub struct RpnPrinter;

impl RpnPrinter {
    pub fn print(&mut self, expr: &Expr) -> String {
        expr.accept(self)
    }

    fn postfix(&mut self, operands: &[&Expr], operator: &str) -> String {
        let mut parts: Vec<String> = operands.iter().map(|e| e.accept(self)).collect();
        parts.push(operator.to_string());
        parts.join(" ")
    }
}

impl ExprVisitor<String> for RpnPrinter {
    fn visit_assign(&mut self, name: &Token, value: &Expr) -> String {
        format!("{} {} =", value.accept(self), name.lexeme)
    }

    fn visit_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> String {
        self.postfix(&[left, right], &operator.lexeme)
    }

    fn visit_call(&mut self, callee: &Expr, _paren: &Token, arguments: &[Expr]) -> String {
        let mut exprs: Vec<&Expr> = arguments.iter().collect();
        exprs.push(callee);
        self.postfix(&exprs, &format!("call/{}", arguments.len()))
    }

    fn visit_get(&mut self, object: &Expr, name: &Token) -> String {
        self.postfix(&[object], &format!(".{}", name.lexeme))
    }

    fn visit_grouping(&mut self, expression: &Expr) -> String {
        expression.accept(self)
    }

    fn visit_literal(&mut self, value: &LiteralValue) -> String {
        literal(value)
    }

    fn visit_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> String {
        self.postfix(&[left, right], &operator.lexeme)
    }

    fn visit_set(&mut self, object: &Expr, name: &Token, value: &Expr) -> String {
        self.postfix(&[object, value], &format!(".{}=", name.lexeme))
    }

    fn visit_super(&mut self, _keyword: &Token, method: &Token) -> String {
        format!("super.{}", method.lexeme)
    }

    fn visit_this(&mut self, _keyword: &Token) -> String {
        "this".to_string()
    }

    fn visit_unary(&mut self, operator: &Token, right: &Expr) -> String {
        self.postfix(&[right], &operator.lexeme)
    }

    fn visit_variable(&mut self, name: &Token) -> String {
        name.lexeme.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::NodeId;
    use crate::token::TokenType;

    fn sample() -> Expr {
        Expr::Binary {
            left: Box::new(Expr::Unary {
                operator: Token::synthetic(TokenType::MINUS, "-", 1),
                right: Box::new(Expr::Literal(LiteralValue::Number(123.0))),
            }),
            operator: Token::synthetic(TokenType::STAR, "*", 1),
            right: Box::new(Expr::Grouping(Box::new(Expr::Literal(
                LiteralValue::Number(45.67),
            )))),
        }
    }

    #[test]
    fn prefix_form() {
        assert_eq!(AstPrinter.print(&sample()), "(* (- 123) (group 45.67))");
    }

    #[test]
    fn postfix_form() {
        assert_eq!(RpnPrinter.print(&sample()), "123 - 45.67 *");
    }

    #[test]
    fn statements_print_in_prefix_form() {
        let stmt = Stmt::Var {
            name: Token::synthetic(TokenType::IDENTIFIER, "a", 1),
            initializer: Some(Expr::Variable {
                id: NodeId::fresh(),
                name: Token::synthetic(TokenType::IDENTIFIER, "b", 1),
            }),
        };

        assert_eq!(AstPrinter.print_stmt(&stmt), "(var a = b)");
    }
}
