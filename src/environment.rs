use std::cell::RefCell;
use std::collections::HashMap;
use std::iter;
use std::rc::Rc;

use snafu::{OptionExt, Snafu};

use crate::token::Token;
use crate::value::Value;

type Result<T> = std::result::Result<T, EnvironmentError>;

#[derive(Debug, Default)]
struct Scope {
    enclosing: Option<Environment>,
    bindings: HashMap<String, Value>,
}

/// A lexical scope plus the chain of scopes enclosing it. Clones are handles
/// to the same scope.
#[derive(Debug, Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    pub fn new(enclosing: Option<Self>) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            enclosing,
            bindings: HashMap::new(),
        })))
    }

    /// Binds `name` in this scope, replacing any earlier binding here.
    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().bindings.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value> {
        self.chain()
            .find_map(|scope| {
                let scope = scope.0.borrow();
                scope.bindings.get(&name.lexeme).cloned()
            })
            .context(UndefinedVariableSnafu {
                name: &name.lexeme,
                line: name.line,
            })
    }

    /// Rebinds `name` in the innermost scope that already holds it.
    pub fn assign(&self, name: &Token, value: Value) -> Result<()> {
        let owner = self
            .chain()
            .find(|scope| scope.0.borrow().bindings.contains_key(&name.lexeme))
            .context(UndefinedVariableSnafu {
                name: &name.lexeme,
                line: name.line,
            })?;
        owner
            .0
            .borrow_mut()
            .bindings
            .insert(name.lexeme.clone(), value);
        Ok(())
    }

    /// This scope, then each enclosing scope out to the globals.
    fn chain(&self) -> impl Iterator<Item = Environment> {
        iter::successors(Some(self.clone()), |scope| scope.0.borrow().enclosing.clone())
    }
}

#[derive(Debug, Snafu, PartialEq)]
pub enum EnvironmentError {
    #[snafu(display("line {line}: undefined variable '{name}'"))]
    UndefinedVariable { name: String, line: usize },
}
