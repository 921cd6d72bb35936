// oledsim: sandboxed preview interpreter for OLED drawing scripts
//
// Scripts are written in a small C-like language (int variables, const,
// if/while/for, a fixed set of drawing builtins) and draw into a 128x64
// monochrome framebuffer. Each run is independent and bounded by a step
// budget.

// Public modules
pub mod ast;
pub mod builtins;
pub mod config;
pub mod drawing;
pub mod error;
pub mod evaluator;
pub mod framebuffer;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

/// Logging for unit tests.
#[cfg(test)]
pub mod test_utils {
    /// Routes `tracing` output through the test harness. `RUST_LOG` picks the
    /// level, defaulting to debug; repeated calls are harmless.
    pub fn init_test_logging() {
        use tracing_subscriber::{fmt, EnvFilter};

        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use ast::{Expr, Program, Stmt};
pub use config::{ConfigError, InterpreterConfig};
pub use error::{ErrorKind, ScriptError, Span};
pub use evaluator::Evaluator;
pub use framebuffer::{PixelBuffer, HEIGHT, WIDTH};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;
pub use value::Arg;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::{evaluate, evaluate_with_config, run};
