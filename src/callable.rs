use std::fmt::Display;
use std::io::Write;
use std::iter::zip;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::evaluation::{Flow, Interpreter, RuntimeError};
use crate::value::Value;

#[derive(Debug, Clone)]
pub enum Callable {
    Native {
        name: &'static str,
        arity: usize,
        function: fn(&[Value]) -> Value,
    },
    User(Rc<FunctionDecl>),
}

impl Callable {
    /// Invokes the callable. User functions run in a fresh scope whose parent
    /// is the global environment, not the scope they were declared in.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        match self {
            Self::Native { function, .. } => Ok(function(arguments)),
            Self::User(declaration) => {
                let local = Environment::new(Some(interpreter.globals().clone()));

                for (param, arg) in zip(&declaration.parameters, arguments) {
                    local.define(&param.lexeme, arg.clone());
                }

                match interpreter.execute_block(&declaration.body, local)? {
                    Flow::Return(value) => Ok(value),
                    Flow::Normal => Ok(Value::Nil),
                }
            }
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Native { arity, .. } => *arity,
            Self::User(declaration) => declaration.parameters.len(),
        }
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Native { name, .. } => write!(f, "<native fn {name}>"),
            Callable::User(declaration) => write!(f, "<fn {}>", declaration.name.lexeme),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native { name: n1, .. }, Callable::Native { name: n2, .. }) => n1 == n2,
            (Callable::User(f1), Callable::User(f2)) => Rc::ptr_eq(f1, f2),
            _ => false,
        }
    }
}
