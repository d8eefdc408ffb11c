/// Default cap on iterations of a single `while` loop.
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// A loop that would run more iterations than this fails instead.
    pub max_loop_iterations: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: DEFAULT_MAX_LOOP_ITERATIONS,
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_loop_iterations(max_loop_iterations: usize) -> Self {
        Self {
            max_loop_iterations,
        }
    }
}
