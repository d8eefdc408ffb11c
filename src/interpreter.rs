use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ast::Stmt;
use crate::config::InterpreterConfig;
use crate::evaluation::{Interpreter, RuntimeError};
use crate::native_fn;
use crate::oracle::TestOracle;
use crate::parser::{ParseError, Parser};
use crate::scanner::Scanner;

/// Scans, parses and runs `source` against `interpreter`'s environment, so
/// successive calls share globals. Scan problems are logged, not returned.
pub fn interpret<W: Write>(source: &str, interpreter: &mut Interpreter<W>) -> Result<(), RunError> {
    let statements = parse_source(source)?;
    interpreter.interpret(&statements)?;
    Ok(())
}

fn parse_source(source: &str) -> Result<Vec<Stmt>, RunError> {
    let scanned = Scanner::scan_tokens(source);
    if !scanned.errors.is_empty() {
        tracing::debug!(count = scanned.errors.len(), "scanned with diagnostics");
    }
    Ok(Parser::new(scanned.tokens).parse()?)
}

/// Command-line front end: REPL, single file, or a directory of test scripts.
#[derive(Debug, Default)]
pub struct Lox {
    config: InterpreterConfig,
    print_ast: bool,
}

impl Lox {
    pub fn new(config: InterpreterConfig) -> Self {
        Self {
            config,
            print_ast: false,
        }
    }

    /// Echo each top-level expression in prefix form before running it.
    pub fn with_print_ast(mut self, print_ast: bool) -> Self {
        self.print_ast = print_ast;
        self
    }

    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<TestOracle, RunFileError> {
        let path = path.as_ref();
        let mut interpreter = self.interpreter(io::stdout());
        self.run_script(path, &mut interpreter)
            .map_err(|e| e.into_error(path))?;
        Ok(*interpreter.oracle())
    }

    pub fn run_prompt(&self) -> Result<(), RunPromptError> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut buffer = String::new();
        let mut interpreter = self.interpreter(io::stdout());

        loop {
            print!("> ");
            stdout.flush().map_err(RunPromptError::ReadPrompt)?;
            buffer.clear();
            let read = stdin
                .lock()
                .read_line(&mut buffer)
                .map_err(RunPromptError::ReadPrompt)?;

            let line = buffer.trim();
            if read == 0 || line.is_empty() || line == ".exit" {
                break;
            }
            let _ = self
                .run(line, &mut interpreter)
                .inspect_err(|e| eprintln!("{e}"));
        }
        Ok(())
    }

    /// Runs every file under `dir`, each with its own interpreter. A script
    /// fails when it errors or when any of its expectations does not hold.
    pub fn run_tests(&self, dir: impl AsRef<Path>) -> Result<TestSummary, RunTestsError> {
        let dir = dir.as_ref();
        let mut summary = TestSummary::default();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|source| RunTestsError {
                dir: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let mut interpreter = self.interpreter(io::sink());
            let outcome = self.run_script(path, &mut interpreter);
            let oracle = *interpreter.oracle();

            summary.total += 1;
            summary.oracle.merge(&oracle);
            match outcome {
                Ok(()) if oracle.failed() == 0 => {}
                Ok(()) => {
                    summary.failed += 1;
                    tracing::warn!(path = %path.display(), failed = oracle.failed(), "expectations failed");
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(path = %path.display(), "{e}");
                }
            }
        }

        Ok(summary)
    }

    fn interpreter<W: Write>(&self, out: W) -> Interpreter<W> {
        Interpreter::with_output(native_fn::prelude(), out).with_config(self.config)
    }

    fn run_script<W: Write>(
        &self,
        path: &Path,
        interpreter: &mut Interpreter<W>,
    ) -> Result<(), RunFileErrorKind> {
        let source = fs::read_to_string(path).map_err(RunFileErrorKind::ReadFile)?;
        self.run(&source, interpreter)?;
        Ok(())
    }

    fn run<W: Write>(&self, source: &str, interpreter: &mut Interpreter<W>) -> Result<(), RunError> {
        let statements = parse_source(source)?;
        if self.print_ast {
            for statement in &statements {
                if let Stmt::Expression(expr) | Stmt::Print { expression: expr, .. } = statement {
                    eprintln!("{}", expr.print());
                }
            }
        }
        interpreter.interpret(&statements)?;
        Ok(())
    }
}

/// Totals from a directory run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TestSummary {
    pub total: usize,
    pub failed: usize,
    pub oracle: TestOracle,
}

impl TestSummary {
    pub fn success(&self) -> usize {
        self.total - self.failed
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to execute commands: \"{}\"", args.join(" "))]
#[non_exhaustive]
pub struct LoxError {
    pub args: Vec<String>,
    pub source: LoxErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum LoxErrorKind {
    #[error(transparent)]
    RunFile(#[from] RunFileError),
    #[error("error execute prompt")]
    RunPrompt(#[from] RunPromptError),
    #[error(transparent)]
    RunTests(#[from] RunTestsError),
}

impl LoxErrorKind {
    pub fn into_error(self, args: &[String]) -> LoxError {
        LoxError {
            args: args.to_owned(),
            source: self,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("error execute file: {}", path.display())]
pub struct RunFileError {
    path: PathBuf,
    source: RunFileErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum RunFileErrorKind {
    #[error("failed to read file")]
    ReadFile(#[source] std::io::Error),
    #[error(transparent)]
    Run(#[from] RunError),
}

impl RunFileErrorKind {
    pub fn into_error(self, path: &Path) -> RunFileError {
        RunFileError {
            path: path.to_path_buf(),
            source: self,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunPromptError {
    #[error("failed to read prompt")]
    ReadPrompt(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to walk test directory: {}", dir.display())]
pub struct RunTestsError {
    dir: PathBuf,
    source: walkdir::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
