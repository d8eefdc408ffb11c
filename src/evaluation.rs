use std::io::{self, Write};
use std::rc::Rc;

use snafu::{ResultExt, Snafu};

use crate::ast::{Expr, Stmt};
use crate::callable::Callable;
use crate::config::InterpreterConfig;
use crate::environment::{Environment, EnvironmentError};
use crate::oracle::{self, TestOracle};
use crate::token::{Token, TokenType};
use crate::value::Value;

type Result<T> = std::result::Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter<W: Write = io::Stdout> {
    environment: Environment,
    globals: Environment,
    oracle: TestOracle,
    config: InterpreterConfig,
    out: W,
}

impl Interpreter<io::Stdout> {
    pub fn new(globals: Environment) -> Self {
        Self::with_output(globals, io::stdout())
    }
}

impl<W: Write> Interpreter<W> {
    /// Builds an interpreter whose `print` output goes to `out`. Whatever is
    /// already defined in `globals` is visible to the script.
    pub fn with_output(globals: Environment, out: W) -> Self {
        Self {
            environment: globals.clone(),
            globals,
            oracle: TestOracle::default(),
            config: InterpreterConfig::default(),
            out,
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn oracle(&self) -> &TestOracle {
        &self.oracle
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs top-level statements in order. A top-level `return` ends the
    /// script early.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            if let Flow::Return(_) = self.execute(statement)? {
                break;
            }
        }
        Ok(())
    }

    /// Executes `statements` with `environment` as the current scope. The
    /// previous scope is restored however the block exits.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: Environment) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for statement in statements {
            match self.execute(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, statement: &Stmt) -> Result<Flow> {
        match statement {
            Stmt::Expression(expression) => {
                self.evaluate(expression)?;
                Ok(Flow::Normal)
            }
            Stmt::Print { expression, expect } => {
                let actual = self.evaluate(expression)?.to_string();
                writeln!(self.out, "{actual}").context(OutputSnafu)?;

                if let Some(comment) = expect {
                    let expected = oracle::expected_text(&comment.lexeme);
                    if !self.oracle.record(expected, &actual) {
                        tracing::warn!(
                            line = comment.line,
                            expected = %expected,
                            actual = %actual,
                            "expectation failed"
                        );
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.lexeme, value);
                Ok(Flow::Normal)
            }
            Stmt::Block(statements) => {
                let local = Environment::new(Some(self.environment.clone()));
                self.execute_block(statements, local)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(stmt) = else_branch {
                    self.execute(stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                let limit = self.config.max_loop_iterations;
                let mut iterations = 0;
                while self.evaluate(condition)?.is_truthy() {
                    iterations += 1;
                    if iterations > limit {
                        return TooManyIterationsSnafu { limit }.fail();
                    }
                    match self.execute(body)? {
                        Flow::Normal => {}
                        flow @ Flow::Return(..) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(declaration) => {
                self.environment.define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::User(Rc::clone(declaration))),
                );
                Ok(Flow::Normal)
            }
            Stmt::Class { name, .. } => {
                tracing::debug!(class = %name.lexeme, "class declarations are not evaluated");
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    fn evaluate(&mut self, expression: &Expr) -> Result<Value> {
        match expression {
            Expr::Variable { name } => self.look_up(name),
            Expr::Literal { token } => literal_value(token),
            Expr::Grouping { expression } => self.evaluate(expression),
            Expr::Unary { operator, right } => match operator.token_type {
                TokenType::PlusPlus | TokenType::MinusMinus => self.prefix_update(operator, right),
                _ => {
                    let right = self.evaluate(right)?;
                    Ok(unary(operator, right))
                }
            },
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(operator, left, right)
            }
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                if operator.token_type == TokenType::Or {
                    if left.is_truthy() {
                        return Ok(left);
                    }
                } else if !left.is_truthy() {
                    return Ok(left);
                }
                self.evaluate(right)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let arguments = arguments
                    .iter()
                    .map(|expr| self.evaluate(expr))
                    .collect::<Result<Vec<Value>>>()?;

                match callee {
                    Value::Callable(function) => {
                        if arguments.len() < function.arity() {
                            return ArityMismatchSnafu {
                                line: paren.line,
                                expected: function.arity(),
                                found: arguments.len(),
                            }
                            .fail();
                        }
                        tracing::trace!(callee = %function, line = paren.line, "call");
                        function.call(self, &arguments)
                    }
                    _ => NotCallableSnafu {
                        line: paren.line,
                        found: callee.to_string(),
                    }
                    .fail(),
                }
            }
            Expr::Get { object, name } => {
                self.evaluate(object)?;
                tracing::debug!(property = %name.lexeme, "property access is not implemented");
                Ok(Value::Nil)
            }
            Expr::Set {
                object,
                name,
                value,
            } => {
                self.evaluate(object)?;
                self.evaluate(value)?;
                tracing::debug!(property = %name.lexeme, "property assignment is not implemented");
                Ok(Value::Nil)
            }
            Expr::This { .. } | Expr::Super { .. } => Ok(Value::Nil),
        }
    }

    fn look_up(&self, name: &Token) -> Result<Value> {
        Ok(self.environment.get(name)?)
    }

    /// `++x` / `--x`: writes the updated value back and yields it.
    fn prefix_update(&mut self, operator: &Token, target: &Expr) -> Result<Value> {
        let Expr::Variable { name } = target else {
            return InvalidPrefixTargetSnafu {
                line: operator.line,
                operator: operator.lexeme.clone(),
            }
            .fail();
        };

        let delta: i64 = if operator.token_type == TokenType::PlusPlus {
            1
        } else {
            -1
        };
        let updated = match self.look_up(name)? {
            Value::Integer(n) => n
                .checked_add(delta)
                .map_or(Value::Float(n as f64 + delta as f64), Value::Integer),
            other => match other.coerce_f64() {
                Some(n) => Value::Float(n + delta as f64),
                None => {
                    return OperandTypeSnafu {
                        line: operator.line,
                        operator: operator.lexeme.clone(),
                        operand: other.to_string(),
                    }
                    .fail();
                }
            },
        };

        self.environment.assign(name, updated.clone())?;
        Ok(updated)
    }
}

fn literal_value(token: &Token) -> Result<Value> {
    match token.token_type {
        TokenType::True => Ok(Value::Bool(true)),
        TokenType::False => Ok(Value::Bool(false)),
        TokenType::Null => Ok(Value::Nil),
        TokenType::String => Ok(Value::String(token.lexeme.clone())),
        // Out-of-range integer literals degrade to floats
        TokenType::Integer | TokenType::Float => {
            if let Ok(n) = token.lexeme.parse::<i64>() {
                return Ok(Value::Integer(n));
            }
            match token.lexeme.parse::<f64>() {
                Ok(n) => Ok(Value::Float(n)),
                Err(_) => InvalidNumberSnafu {
                    line: token.line,
                    lexeme: token.lexeme.clone(),
                }
                .fail(),
            }
        }
        _ => unreachable!("parser only builds literals from literal tokens"),
    }
}

fn unary(operator: &Token, right: Value) -> Value {
    match operator.token_type {
        TokenType::Plus => right,
        TokenType::Bang => Value::Bool(!right.is_truthy()),
        TokenType::Minus => match right {
            Value::Nil => Value::Integer(0),
            Value::Bool(b) => Value::Float(-(if b { 1.0 } else { 0.0 })),
            Value::Integer(n) => n
                .checked_neg()
                .map_or(Value::Float(-(n as f64)), Value::Integer),
            Value::Float(n) => Value::Float(-n),
            Value::String(_) | Value::Callable(_) => Value::nan(),
        },
        _ => unreachable!("prefix operators are fixed by the parser"),
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    let op = operator.token_type;

    match op {
        TokenType::EqualEqual => return Ok(Value::Bool(left == right)),
        TokenType::BangEqual => return Ok(Value::Bool(left != right)),
        _ => {}
    }

    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(match op {
            TokenType::Plus => Value::String(format!("{left}{right}")),
            TokenType::Minus | TokenType::Star | TokenType::Slash => Value::nan(),
            _ => Value::Bool(false),
        });
    }

    if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
        let (l, r) = (*l, *r);
        let exact = match op {
            TokenType::Plus => l.checked_add(r).map(Value::Integer),
            TokenType::Minus => l.checked_sub(r).map(Value::Integer),
            TokenType::Star => l.checked_mul(r).map(Value::Integer),
            TokenType::Greater => Some(Value::Bool(l > r)),
            TokenType::GreaterEqual => Some(Value::Bool(l >= r)),
            TokenType::Less => Some(Value::Bool(l < r)),
            TokenType::LessEqual => Some(Value::Bool(l <= r)),
            _ => None,
        };
        if let Some(value) = exact {
            return Ok(value);
        }
    }

    let (Some(l), Some(r)) = (left.coerce_f64(), right.coerce_f64()) else {
        return TypeSnafu {
            line: operator.line,
            operator: operator.lexeme.clone(),
            left: left.to_string(),
            right: right.to_string(),
        }
        .fail();
    };

    Ok(match op {
        TokenType::Plus => Value::Float(l + r),
        TokenType::Minus => Value::Float(l - r),
        TokenType::Star => Value::Float(l * r),
        TokenType::Slash if r == 0.0 => Value::Float(f64::MAX),
        TokenType::Slash => Value::Float(l / r),
        TokenType::Greater => Value::Bool(l > r),
        TokenType::GreaterEqual => Value::Bool(l >= r),
        TokenType::Less => Value::Bool(l < r),
        TokenType::LessEqual => Value::Bool(l <= r),
        _ => unreachable!("binary operators are fixed by the parser"),
    })
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RuntimeError {
    #[snafu(transparent)]
    UndefinedVariable { source: EnvironmentError },
    #[snafu(display("line {line}: unsupported operands for '{operator}': {left} and {right}"))]
    Type {
        line: usize,
        operator: String,
        left: String,
        right: String,
    },
    #[snafu(display("line {line}: unsupported operand for '{operator}': {operand}"))]
    OperandType {
        line: usize,
        operator: String,
        operand: String,
    },
    #[snafu(display("line {line}: can only call functions, found {found}"))]
    NotCallable { line: usize, found: String },
    #[snafu(display("line {line}: expected {expected} arguments, found {found}"))]
    ArityMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[snafu(display(
        "line {line}: invalid left-hand side expression in prefix operation '{operator}'"
    ))]
    InvalidPrefixTarget { line: usize, operator: String },
    #[snafu(display("too many iterations: loop exceeded {limit}"))]
    TooManyIterations { limit: usize },
    #[snafu(display("line {line}: invalid number literal '{lexeme}'"))]
    InvalidNumber { line: usize, lexeme: String },
    #[snafu(display("failed to write output"))]
    Output { source: io::Error },
}
