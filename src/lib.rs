// Private
mod callable;
mod config;
mod environment;
mod evaluation;
mod interpreter;
mod native_fn;
mod oracle;
mod value;

// Public
pub mod ast;
pub mod parser;
pub mod scanner;
pub mod token;

pub use callable::Callable;
pub use config::{DEFAULT_MAX_LOOP_ITERATIONS, InterpreterConfig};
pub use environment::{Environment, EnvironmentError};
pub use evaluation::{Flow, Interpreter, RuntimeError};
pub use interpreter::{
    Lox, LoxError, LoxErrorKind, RunError, RunFileError, RunFileErrorKind, RunPromptError,
    RunTestsError, TestSummary, interpret,
};
pub use native_fn::prelude;
pub use oracle::{TestOracle, expected_text};
pub use value::{NAN, Value};
