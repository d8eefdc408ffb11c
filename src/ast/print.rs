use crate::ast::Expr;
use crate::token::TokenType;

impl Expr {
    /// Renders the expression as a fully parenthesized prefix form.
    pub fn print(&self) -> String {
        match self {
            Expr::Assign { name, value } => {
                self.parenthesize("=", &[name.lexeme.as_str()], &[value.as_ref()])
            }
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(
                &operator.lexeme,
                &[],
                &[left.as_ref(), right.as_ref()],
            ),
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut exprs: Vec<&Expr> = vec![callee.as_ref()];
                exprs.extend(arguments);
                self.parenthesize("call", &[], &exprs)
            }
            Expr::Get { object, name } => {
                self.parenthesize(".", &[name.lexeme.as_str()], &[object.as_ref()])
            }
            Expr::Set {
                object,
                name,
                value,
            } => self.parenthesize(
                "set",
                &[name.lexeme.as_str()],
                &[object.as_ref(), value.as_ref()],
            ),
            Expr::Grouping { expression } => {
                self.parenthesize("group", &[], &[expression.as_ref()])
            }
            Expr::Literal { token } => match token.token_type {
                TokenType::String => format!("{:?}", token.lexeme),
                _ => token.lexeme.clone(),
            },
            Expr::Super { method, .. } => {
                self.parenthesize("super", &[method.lexeme.as_str()], &[])
            }
            Expr::This { .. } => "this".to_string(),
            Expr::Unary { operator, right } => {
                self.parenthesize(&operator.lexeme, &[], &[right.as_ref()])
            }
            Expr::Variable { name } => name.lexeme.clone(),
        }
    }

    fn parenthesize(&self, name: &str, names: &[&str], exprs: &[&Expr]) -> String {
        let mut rst = String::new();
        rst.push('(');
        rst.push_str(name);
        for n in names {
            rst.push(' ');
            rst.push_str(n);
        }
        for expr in exprs {
            rst.push(' ');
            rst.push_str(&expr.print());
        }
        rst.push(')');
        rst
    }
}

#[cfg(test)]
mod tests {
    use crate::token::Token;

    use super::*;

    // Helper to create integer literal expression
    fn int_expr(value: &str) -> Expr {
        Expr::Literal {
            token: Token::new(TokenType::Integer, value, 1),
        }
    }

    // Helper to create operator token
    fn op_token(op: &str) -> Token {
        match op {
            "+" => Token::new(TokenType::Plus, "+", 1),
            "-" => Token::new(TokenType::Minus, "-", 1),
            "*" => Token::new(TokenType::Star, "*", 1),
            "++" => Token::new(TokenType::PlusPlus, "++", 1),
            _ => panic!("Unknown operator"),
        }
    }

    #[test]
    fn test_print_literal() {
        assert_eq!(int_expr("42").print(), "42");
        assert_eq!(
            Expr::Literal {
                token: Token::new(TokenType::Null, "null", 1)
            }
            .print(),
            "null"
        );
        assert_eq!(
            Expr::Literal {
                token: Token::new(TokenType::String, "hi", 1)
            }
            .print(),
            "\"hi\""
        );
    }

    #[test]
    fn test_print_unary() {
        let expr = Expr::Unary {
            operator: op_token("++"),
            right: Box::new(Expr::Variable {
                name: Token::new(TokenType::Identifier, "i", 1),
            }),
        };
        assert_eq!(expr.print(), "(++ i)");
    }

    #[test]
    fn test_print_complex() {
        // (- (+ 1 2))
        let inner = Expr::Binary {
            left: Box::new(int_expr("1")),
            operator: op_token("+"),
            right: Box::new(int_expr("2")),
        };
        let expr = Expr::Unary {
            operator: op_token("-"),
            right: Box::new(Expr::Grouping {
                expression: Box::new(inner),
            }),
        };
        assert_eq!(expr.print(), "(- (group (+ 1 2)))");
    }

    #[test]
    fn test_print_call_and_assign() {
        let call = Expr::Call {
            callee: Box::new(Expr::Variable {
                name: Token::new(TokenType::Identifier, "f", 1),
            }),
            paren: Token::new(TokenType::RightParen, ")", 1),
            arguments: vec![int_expr("1"), int_expr("2")],
        };
        let expr = Expr::Assign {
            name: Token::new(TokenType::Identifier, "x", 1),
            value: Box::new(Expr::Binary {
                left: Box::new(call),
                operator: op_token("*"),
                right: Box::new(int_expr("3")),
            }),
        };
        assert_eq!(expr.print(), "(= x (* (call f 1 2) 3))");
    }
}
