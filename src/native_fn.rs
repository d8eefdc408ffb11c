use std::time::{SystemTime, UNIX_EPOCH};

use crate::callable::Callable;
use crate::environment::Environment;
use crate::value::Value;

/// Milliseconds since the Unix epoch.
pub fn clock(_: &[Value]) -> Value {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    Value::Integer(i64::try_from(millis).unwrap_or(i64::MAX))
}

pub fn clock_value() -> Value {
    Value::Callable(Callable::Native {
        name: "clock",
        arity: 0,
        function: clock,
    })
}

/// A fresh global environment holding the built-in functions.
pub fn prelude() -> Environment {
    let globals = Environment::default();
    globals.define("clock", clock_value());
    globals
}

#[cfg(test)]
mod tests {
    use crate::token::{Token, TokenType};

    use super::*;

    #[test]
    fn test_clock_moves_forward() {
        let (Value::Integer(first), Value::Integer(second)) = (clock(&[]), clock(&[])) else {
            panic!("clock should return integers");
        };
        assert!(first > 0);
        assert!(second >= first);
    }

    #[test]
    fn test_prelude_defines_clock() {
        let globals = prelude();
        let clock = Token::new(TokenType::Identifier, "clock", 1);
        assert_eq!(globals.get(&clock).ok(), Some(clock_value()));
    }
}
