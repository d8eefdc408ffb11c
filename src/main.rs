use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tlox::{DEFAULT_MAX_LOOP_ITERATIONS, InterpreterConfig, Lox, LoxError, LoxErrorKind};
use tracing_subscriber::EnvFilter;

/// Tree-walking interpreter for a small dynamically typed scripting language.
#[derive(Debug, Parser)]
#[command(name = "tlox", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Script to run; starts a prompt when omitted.
    script: Option<PathBuf>,

    /// Iterations a single loop may run before it is aborted.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_LOOP_ITERATIONS)]
    max_iterations: usize,

    /// Print the parsed form of each top-level expression to stderr.
    #[arg(long, global = true)]
    print_ast: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every script under a directory and check its `// expect:` comments.
    Test {
        #[arg(default_value = "test")]
        dir: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let lox = Lox::new(InterpreterConfig::with_max_loop_iterations(cli.max_iterations))
        .with_print_ast(cli.print_ast);

    match execute(&lox, cli) {
        Ok(code) => code,
        Err(e) => {
            let exitcode = match e.source {
                LoxErrorKind::RunFile(_) => ExitCode::from(65),
                LoxErrorKind::RunPrompt(_) => ExitCode::from(66),
                LoxErrorKind::RunTests(_) => ExitCode::from(74),
            };
            eprintln!("{:?}", anyhow::Error::from(e));
            exitcode
        }
    }
}

fn execute(lox: &Lox, cli: Cli) -> Result<ExitCode, LoxError> {
    let args: Vec<String> = env::args().collect();
    let code = match (cli.command, cli.script) {
        (Some(Command::Test { dir }), _) => {
            let summary = lox
                .run_tests(&dir)
                .map_err(|e| LoxErrorKind::RunTests(e).into_error(&args))?;
            println!(
                "scripts: {} total, {} passed, {} failed; expectations: {} passed, {} failed",
                summary.total,
                summary.success(),
                summary.failed,
                summary.oracle.passed(),
                summary.oracle.failed(),
            );
            if summary.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        (None, Some(script)) => {
            let oracle = lox
                .run_file(&script)
                .map_err(|e| LoxErrorKind::RunFile(e).into_error(&args))?;
            if oracle.total() > 0 {
                println!("expect: {} passed, {} failed", oracle.passed(), oracle.failed());
            }
            ExitCode::SUCCESS
        }
        (None, None) => {
            lox.run_prompt()
                .map_err(|e| LoxErrorKind::RunPrompt(e).into_error(&args))?;
            ExitCode::SUCCESS
        }
    };
    Ok(code)
}
