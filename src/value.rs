use std::fmt::Display;

use crate::callable::Callable;

/// Result of string-typed `-`, `*` and `/`.
pub const NAN: &str = "NaN";

/// Digits after the decimal point when a float is printed.
pub const FLOAT_PRECISION: usize = 10;

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Callable(Callable),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(true) => true,
            Value::Nil | Value::Bool(false) | Value::Integer(0) => false,
            Value::Float(f) if *f == 0.0 => false,
            Value::String(s) => !s.is_empty(),
            // Callables have no string form on this path, so they are falsy
            Value::Callable(_) => false,
            Value::Integer(_) | Value::Float(_) => true,
        }
    }

    /// Numeric view used by arithmetic once both sides are known not to be
    /// strings.
    pub fn coerce_f64(&self) -> Option<f64> {
        match self {
            Value::Nil => Some(0.0),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::String(_) | Value::Callable(_) => None,
        }
    }

    pub fn nan() -> Self {
        Value::String(NAN.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:.FLOAT_PRECISION$}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Callable(c) => write!(f, "{c}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native_fn;

    #[test]
    fn test_falsy_set() {
        for value in [
            Value::Nil,
            Value::Bool(false),
            Value::Integer(0),
            Value::Float(0.0),
            Value::Float(-0.0),
            Value::from(""),
        ] {
            assert!(!value.is_truthy(), "{value:?} should be falsy");
        }
    }

    #[test]
    fn test_truthy_values() {
        for value in [
            Value::Bool(true),
            Value::Integer(-1),
            Value::Float(0.5),
            Value::from("0"),
            Value::from("false"),
        ] {
            assert!(value.is_truthy(), "{value:?} should be truthy");
        }
    }

    #[test]
    fn test_callable_is_falsy() {
        assert!(!native_fn::clock_value().is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Nil.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Integer(-42).to_string(), "-42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5000000000");
        assert_eq!(Value::Float(3.0).to_string(), "3.0000000000");
        assert_eq!(Value::Float(-0.125).to_string(), "-0.1250000000");
        assert_ne!(Value::Float(1.0).to_string(), Value::Integer(1).to_string());
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(native_fn::clock_value().to_string(), "<native fn clock>");
    }

    #[test]
    fn test_equality_has_no_coercion() {
        assert_eq!(Value::Integer(1), Value::Integer(1));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::from("1"), Value::Integer(1));
        assert_ne!(Value::Nil, Value::Bool(false));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(Value::Nil.coerce_f64(), Some(0.0));
        assert_eq!(Value::Bool(true).coerce_f64(), Some(1.0));
        assert_eq!(Value::Integer(7).coerce_f64(), Some(7.0));
        assert_eq!(Value::from("7").coerce_f64(), None);
    }
}
