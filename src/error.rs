//! Centralised error hierarchy for the **Lark interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables
//! a uniform `Result<T>` alias throughout the crate while preserving the
//! source position every diagnostic needs.
//!
//! The module **does not** print diagnostics itself; the driver owns the
//! stderr sink.

use std::io;

use log::info;
use thiserror::Error;

/// Canonical error type used throughout the interpreter.
///
/// Both language-level variants carry a 1-based `(row, col)` source position.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LarkError {
    /// Lexical or syntactic error raised by the scanner, parser, or the
    /// resolver's static checks.
    #[error("{row}:{col}: Syntax Error: {message}")]
    Syntax {
        /// Human-readable description.
        message: String,

        /// 1-based row where the error occurred.
        row: usize,

        /// 1-based column where the error occurred.
        col: usize,
    },

    /// Evaluation-time error.
    #[error("{row}:{col}: Runtime Error: {message}")]
    Runtime {
        message: String,
        row: usize,
        col: usize,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on the
    /// interpreter's output sink.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LarkError {
    /// Helper constructor for the **scanner**, **parser**, and **resolver**.
    pub fn syntax<S: Into<String>>(row: usize, col: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Syntax error: {}:{}: {}", row, col, message);

        LarkError::Syntax { message, row, col }
    }

    /// Helper constructor for the **evaluator**.
    pub fn runtime<S: Into<String>>(row: usize, col: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: {}:{}: {}", row, col, message);

        LarkError::Runtime { message, row, col }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display_carries_position() {
        let err = LarkError::syntax(3, 14, "unexpected character '$'");

        assert_eq!(
            err.to_string(),
            "3:14: Syntax Error: unexpected character '$'"
        );
    }

    #[test]
    fn runtime_error_display_carries_position() {
        let err = LarkError::runtime(1, 7, "undefined variable 'z'");

        assert_eq!(err.to_string(), "1:7: Runtime Error: undefined variable 'z'");
    }
}
