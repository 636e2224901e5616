//! Report sink for every diagnostic the pipeline produces.
//!
//! The two flags mirror the driver's lifecycle: `had_error` gates the
//! resolver and interpreter stages (and decides exit code 65 in file mode),
//! `had_runtime_error` is sticky and decides exit code 70. The REPL resets
//! `had_error` after each turn; `had_runtime_error` is never consulted there.

use log::info;

use crate::error::LoxError;
use crate::token::Token;

#[derive(Debug, Default)]
pub struct Diagnostics {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Print an error and raise the matching flag.
    pub fn report(&mut self, error: &LoxError) {
        info!("Reporting diagnostic: {}", error);

        match error {
            LoxError::Runtime { .. } => self.had_runtime_error = true,

            _ => self.had_error = true,
        }

        eprintln!("{}", error);
    }

    /// Print a non-fatal warning. Warnings raise no flag.
    pub fn warn(&mut self, token: &Token, message: &str) {
        info!("Reporting warning at '{}': {}", token.lexeme, message);

        eprintln!(
            "[line {} : col {}] Warning at '{}': {}",
            token.line, token.column, token.lexeme, message
        );
    }

    /// Forget static errors at the end of a REPL turn.
    pub fn reset(&mut self) {
        self.had_error = false;
    }
}
