use std::iter::Peekable;
use std::rc::Rc;
use std::vec::IntoIter;

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Upper bound on call arguments and function parameters.
pub const MAX_ARGUMENTS: usize = 255;

type Result<T> = std::result::Result<T, ParseError>;

pub struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    eof: Token,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let last_line = tokens.last().map_or(1, |t| t.line);
        Self {
            tokens: tokens.into_iter().peekable(),
            eof: Token::new_eof(last_line),
        }
    }

    /// Parses the whole token stream. The first syntax error aborts the parse.
    pub fn parse(mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            self.skip_line_comments();
            if self.check(TokenType::Eof) {
                break;
            }
            statements.push(self.declaration()?);
        }
        Ok(statements)
    }

    fn declaration(&mut self) -> Result<Stmt> {
        if self.next_if_type(&[TokenType::Var]).is_some() {
            self.var_declaration()
        } else if self.next_if_type(&[TokenType::Class]).is_some() {
            self.class_declaration()
        } else if self.next_if_type(&[TokenType::Function]).is_some() {
            Ok(Stmt::Function(self.function()?))
        } else {
            self.statement()
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(TokenType::Identifier, "variable name")?;
        let initializer = if self.next_if_type(&[TokenType::Equal]).is_some() {
            Some(self.expression()?)
        } else {
            None
        };
        self.next_if_type(&[TokenType::Semicolon]);
        Ok(Stmt::Var { name, initializer })
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(TokenType::Identifier, "class name")?;
        let superclass = if self.next_if_type(&[TokenType::Less]).is_some() {
            Some(Expr::Variable {
                name: self.consume(TokenType::Identifier, "superclass name")?,
            })
        } else {
            None
        };
        self.consume(TokenType::LeftBrace, "'{' before class body")?;

        let mut methods = Vec::new();
        loop {
            self.skip_line_comments();
            if self.check(TokenType::RightBrace) || self.check(TokenType::Eof) {
                break;
            }
            self.next_if_type(&[TokenType::Function]);
            methods.push(self.function()?);
        }
        self.consume(TokenType::RightBrace, "'}' after class body")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self) -> Result<Rc<FunctionDecl>> {
        let name = self.consume(TokenType::Identifier, "function name")?;
        self.consume(TokenType::LeftParen, "'(' after function name")?;

        let mut parameters = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if parameters.len() >= MAX_ARGUMENTS {
                    return Err(ParseError::TooManyParameters {
                        line: self.peek().line,
                    });
                }
                parameters.push(self.consume(TokenType::Identifier, "parameter name")?);
                if self.next_if_type(&[TokenType::Comma]).is_none() {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "')' after parameters")?;
        self.consume(TokenType::LeftBrace, "'{' before function body")?;
        let body = self.block()?;

        Ok(Rc::new(FunctionDecl {
            name,
            parameters,
            body,
        }))
    }

    fn statement(&mut self) -> Result<Stmt> {
        let Some(token) = self.next_if_type(&[
            TokenType::If,
            TokenType::Print,
            TokenType::LeftBrace,
            TokenType::While,
            TokenType::Do,
            TokenType::For,
            TokenType::Return,
        ]) else {
            return self.expression_statement();
        };

        match token.token_type {
            TokenType::If => self.if_statement(),
            TokenType::Print => self.print_statement(),
            TokenType::LeftBrace => Ok(Stmt::Block(self.block()?)),
            TokenType::While => self.while_statement(),
            TokenType::Do => self.do_while_statement(),
            TokenType::For => self.for_statement(),
            TokenType::Return => self.return_statement(token),
            _ => unreachable!("statement keywords are matched above"),
        }
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.next_if_type(&[TokenType::Else]).is_some() {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let expression = self.expression()?;
        self.next_if_type(&[TokenType::Semicolon]);
        let expect = self.next_if_type(&[TokenType::LineComment]);
        Ok(Stmt::Print { expression, expect })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(TokenType::LeftParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "')' after while condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `do body while (cond)` runs `body` once, then behaves as a `while`.
    fn do_while_statement(&mut self) -> Result<Stmt> {
        let body = self.statement()?;
        self.consume(TokenType::While, "'while' after do body")?;
        self.consume(TokenType::LeftParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "')' after while condition")?;
        self.next_if_type(&[TokenType::Semicolon]);

        Ok(Stmt::Block(vec![
            body.clone(),
            Stmt::While {
                condition,
                body: Box::new(body),
            },
        ]))
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let for_line = self.consume(TokenType::LeftParen, "'(' after 'for'")?.line;

        let initializer = if self.next_if_type(&[TokenType::Semicolon]).is_some() {
            None
        } else if self.next_if_type(&[TokenType::Var]).is_some() {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            Expr::Literal {
                token: Token::new(TokenType::True, "true", for_line),
            }
        } else {
            self.expression()?
        };
        self.consume(TokenType::Semicolon, "';' after loop condition")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "')' after for clauses")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let mut stmt = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            stmt = Stmt::Block(vec![initializer, stmt]);
        }
        Ok(stmt)
    }

    fn return_statement(&mut self, keyword: Token) -> Result<Stmt> {
        let value = if self.check(TokenType::Semicolon)
            || self.check(TokenType::RightBrace)
            || self.check(TokenType::Eof)
        {
            None
        } else {
            Some(self.expression()?)
        };
        self.next_if_type(&[TokenType::Semicolon]);
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            self.skip_line_comments();
            if self.check(TokenType::RightBrace) || self.check(TokenType::Eof) {
                break;
            }
            statements.push(self.declaration()?);
        }
        self.consume(TokenType::RightBrace, "'}' after block")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.next_if_type(&[TokenType::Semicolon]);
        Ok(Stmt::Expression(expr))
    }

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.or()?;

        let Some(equals) = self.next_if_type(&[TokenType::Equal]) else {
            return Ok(expr);
        };
        let value = Box::new(self.assignment()?);

        match expr {
            Expr::Variable { name } => Ok(Expr::Assign { name, value }),
            Expr::Get { object, name } => Ok(Expr::Set {
                object,
                name,
                value,
            }),
            _ => Err(ParseError::InvalidAssignTarget {
                found: equals.to_string(),
                line: equals.line,
            }),
        }
    }

    fn or(&mut self) -> Result<Expr> {
        self.parse_logical_op(|p| p.and(), TokenType::Or)
    }

    fn and(&mut self) -> Result<Expr> {
        self.parse_logical_op(|p| p.equality(), TokenType::And)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.parse_binary_op(
            |p| p.comparison(),
            &[TokenType::BangEqual, TokenType::EqualEqual],
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.parse_binary_op(
            |p| p.term(),
            &[
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
            ],
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.parse_binary_op(|p| p.factor(), &[TokenType::Minus, TokenType::Plus])
    }

    fn factor(&mut self) -> Result<Expr> {
        self.parse_binary_op(|p| p.unary(), &[TokenType::Slash, TokenType::Star])
    }

    fn unary(&mut self) -> Result<Expr> {
        if let Some(operator) = self.next_if_type(&[
            TokenType::Bang,
            TokenType::Minus,
            TokenType::Plus,
            TokenType::PlusPlus,
            TokenType::MinusMinus,
        ]) {
            let right = Box::new(self.unary()?);
            Ok(Expr::Unary { operator, right })
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.next_if_type(&[TokenType::LeftParen]).is_some() {
                expr = self.finish_call(expr)?;
            } else if self.next_if_type(&[TokenType::Dot]).is_some() {
                let name = self.consume(TokenType::Identifier, "property name after '.'")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(ParseError::TooManyArguments {
                        line: self.peek().line,
                    });
                }
                arguments.push(self.expression()?);
                if self.next_if_type(&[TokenType::Comma]).is_none() {
                    break;
                }
            }
        }
        let paren = self.consume(TokenType::RightParen, "')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if let Some(token) = self.next_if_type(&[
            TokenType::True,
            TokenType::False,
            TokenType::Null,
            TokenType::Integer,
            TokenType::Float,
            TokenType::String,
        ]) {
            return Ok(Expr::Literal { token });
        }

        if let Some(name) = self.next_if_type(&[TokenType::Identifier]) {
            return Ok(Expr::Variable { name });
        }

        if let Some(keyword) = self.next_if_type(&[TokenType::This]) {
            return Ok(Expr::This { keyword });
        }

        if let Some(keyword) = self.next_if_type(&[TokenType::Super]) {
            self.consume(TokenType::Dot, "'.' after 'super'")?;
            let method = self.consume(TokenType::Identifier, "superclass method name")?;
            return Ok(Expr::Super { keyword, method });
        }

        if self.next_if_type(&[TokenType::LeftParen]).is_some() {
            let expression = Box::new(self.expression()?);
            self.consume(TokenType::RightParen, "')' after expression")?;
            return Ok(Expr::Grouping { expression });
        }

        let token = self.peek();
        Err(ParseError::NotExpression {
            found: token.to_string(),
            line: token.line,
        })
    }

    // Helper function
    fn parse_binary_op<F>(&mut self, mut parse_operand: F, operators: &[TokenType]) -> Result<Expr>
    where
        F: FnMut(&mut Self) -> Result<Expr>,
    {
        let mut expr = parse_operand(self)?;

        while let Some(operator) = self.next_if_type(operators) {
            let right = parse_operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_logical_op<F>(
        &mut self,
        mut parse_operand: F,
        operator_type: TokenType,
    ) -> Result<Expr>
    where
        F: FnMut(&mut Self) -> Result<Expr>,
    {
        let mut expr = parse_operand(self)?;

        while let Some(operator) = self.next_if_type(&[operator_type]) {
            let right = parse_operand(self)?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn peek(&mut self) -> &Token {
        self.tokens.peek().unwrap_or(&self.eof)
    }

    fn check(&mut self, token_type: TokenType) -> bool {
        self.peek().token_type == token_type
    }

    fn next_if_type(&mut self, types: &[TokenType]) -> Option<Token> {
        self.tokens.next_if(|t| types.contains(&t.token_type))
    }

    fn consume(&mut self, token_type: TokenType, expected: &'static str) -> Result<Token> {
        if let Some(token) = self.next_if_type(&[token_type]) {
            return Ok(token);
        }
        let token = self.peek();
        Err(ParseError::Expected {
            expected,
            found: token.to_string(),
            line: token.line,
        })
    }

    fn skip_line_comments(&mut self) {
        while self.next_if_type(&[TokenType::LineComment]).is_some() {}
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: expect {expected}, found {found}")]
    Expected {
        expected: &'static str,
        found: String,
        line: usize,
    },
    #[error("line {line}: expect expression, found {found}")]
    NotExpression { found: String, line: usize },
    #[error("line {line}: invalid assignment target before {found}")]
    InvalidAssignTarget { found: String, line: usize },
    #[error("line {line}: can't have more than {} arguments", MAX_ARGUMENTS)]
    TooManyArguments { line: usize },
    #[error("line {line}: can't have more than {} parameters", MAX_ARGUMENTS)]
    TooManyParameters { line: usize },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>> {
        Parser::new(Scanner::scan_tokens(source).tokens).parse()
    }

    fn parse_expr(source: &str) -> String {
        match parse(source).expect("should parse").as_slice() {
            [Stmt::Expression(expr)] => expr.print(),
            other => panic!("expected one expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(parse_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(parse_expr("(1 + 2) * 3"), "(* (group (+ 1 2)) 3)");
        assert_eq!(parse_expr("-a * b"), "(* (- a) b)");
        assert_eq!(parse_expr("1 < 2 == true"), "(== (< 1 2) true)");
        assert_eq!(parse_expr("a or b and c"), "(or a (and b c))");
        assert_eq!(parse_expr("a || b && c == d"), "(|| a (&& b (== c d)))");
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(parse_expr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(parse_expr("8 / 4 / 2"), "(/ (/ 8 4) 2)");
        assert_eq!(parse_expr("a and b and c"), "(and (and a b) c)");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(parse_expr("a = b = 1"), "(= a (= b 1))");
        assert_eq!(parse_expr("o.x = 2"), "(set x o 2)");
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(matches!(
            parse("1 + 2 = 3;"),
            Err(ParseError::InvalidAssignTarget { line: 1, .. })
        ));
    }

    #[test]
    fn test_calls_and_prefix_operators() {
        assert_eq!(parse_expr("f(1)(2, 3)"), "(call (call f 1) 2 3)");
        assert_eq!(parse_expr("++i"), "(++ i)");
        assert_eq!(parse_expr("!--i"), "(! (-- i))");
        assert_eq!(parse_expr("+a.b"), "(+ (. b a))");
    }

    #[test]
    fn test_argument_limit() {
        let args = vec!["1"; MAX_ARGUMENTS].join(", ");
        assert!(parse(&format!("f({args});")).is_ok());

        let args = vec!["1"; MAX_ARGUMENTS + 1].join(", ");
        assert!(matches!(
            parse(&format!("f({args});")),
            Err(ParseError::TooManyArguments { .. })
        ));
    }

    #[test]
    fn test_parameter_limit() {
        let params = |n: usize| (0..n).map(|i| format!("p{i}")).collect::<Vec<_>>().join(", ");

        match parse(&format!("fun f({}) {{}}", params(MAX_ARGUMENTS))) {
            Ok(statements) => match statements.as_slice() {
                [Stmt::Function(decl)] => assert_eq!(decl.parameters.len(), MAX_ARGUMENTS),
                other => panic!("unexpected statements: {other:?}"),
            },
            Err(e) => panic!("should parse: {e}"),
        }

        let err = parse(&format!("fun f({}) {{}}", params(MAX_ARGUMENTS + 1)))
            .expect_err("one parameter too many");
        assert_eq!(err, ParseError::TooManyParameters { line: 1 });
        assert_eq!(err.to_string(), format!("line 1: can't have more than {MAX_ARGUMENTS} parameters"));
    }

    #[test]
    fn test_semicolons_are_optional() {
        let statements = parse("var a = 1 var b print a + b").expect("should parse");
        assert_eq!(statements.len(), 3);
        assert!(matches!(&statements[1], Stmt::Var { initializer: None, .. }));
    }

    #[test]
    fn test_print_keeps_expect_comment() {
        let statements = parse("print 1; // expect: 1\nprint 2").expect("should parse");
        match statements.as_slice() {
            [
                Stmt::Print {
                    expect: Some(comment),
                    ..
                },
                Stmt::Print { expect: None, .. },
            ] => assert_eq!(comment.lexeme, "// expect: 1"),
            other => panic!("unexpected statements {other:?}"),
        }
    }

    #[test]
    fn test_stray_expect_comment_is_skipped() {
        let statements =
            parse("var a = 1; // expect: 1\n{ a = 2 // expect: 2\n}").expect("should parse");
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn test_for_desugars_to_while() {
        let statements = parse("for (var i = 0; i < 3; ++i) print i;").expect("should parse");
        let [Stmt::Block(outer)] = statements.as_slice() else {
            panic!("expected block, got {statements:?}");
        };
        assert!(matches!(outer[0], Stmt::Var { .. }));
        let Stmt::While { condition, body } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };
        assert_eq!(condition.print(), "(< i 3)");
        assert!(matches!(body.as_ref(), Stmt::Block(inner) if inner.len() == 2));
    }

    #[test]
    fn test_for_without_clauses_loops_on_true() {
        let statements = parse("for (;;) {}").expect("should parse");
        let [Stmt::While { condition, .. }] = statements.as_slice() else {
            panic!("expected bare while, got {statements:?}");
        };
        assert_eq!(condition.print(), "true");
    }

    #[test]
    fn test_do_while_runs_body_first() {
        let statements = parse("do { print 1 } while (false)").expect("should parse");
        let [Stmt::Block(parts)] = statements.as_slice() else {
            panic!("expected block, got {statements:?}");
        };
        assert!(matches!(parts.as_slice(), [Stmt::Block(_), Stmt::While { .. }]));
    }

    #[test]
    fn test_function_and_class_declarations() {
        let statements = parse(
            "function add(a, b) { return a + b; }
             class Point < Base { init(x) { this.x = x } fun len() { return } }",
        )
        .expect("should parse");

        let [Stmt::Function(add), Stmt::Class { name, superclass, methods }] = statements.as_slice()
        else {
            panic!("unexpected statements {statements:?}");
        };
        assert_eq!(add.name.lexeme, "add");
        assert_eq!(add.parameters.len(), 2);
        assert_eq!(name.lexeme, "Point");
        assert!(superclass.is_some());
        assert_eq!(methods.len(), 2);
    }

    #[test]
    fn test_missing_paren_reports_token() {
        let err = parse("if (true print 1").expect_err("should fail");
        assert_eq!(
            err.to_string(),
            "line 1: expect ')' after if condition, found Print \"print\""
        );
    }

    #[test]
    fn test_unexpected_token_is_not_expression() {
        assert!(matches!(
            parse("var a = ;"),
            Err(ParseError::NotExpression { .. })
        ));
    }
}
