use crate::ast::Program;
use crate::config::InterpreterConfig;
use crate::error::ScriptError;
use crate::evaluator::Evaluator;
use crate::framebuffer::PixelBuffer;
use crate::lexer::Lexer;
use crate::parser::Parser;
use tracing::debug;

/// Lexes and parses a script without running it.
pub fn parse_source(source: &str) -> Result<Program, ScriptError> {
    let mut lexer = Lexer::new(source.to_string());
    let tokens = lexer.scan_tokens()?;
    debug!(tokens = tokens.len(), "lexing finished");

    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;
    debug!(statements = program.statements.len(), "parsing finished");
    Ok(program)
}

/// Runs a script against a fresh context with the default settings.
///
/// The seed, if given, is copied before drawing starts; the caller's buffer
/// is never touched. On failure the error carries the 1-based line of the
/// offending construct.
pub fn evaluate(source: &str, seed: Option<&PixelBuffer>) -> Result<PixelBuffer, ScriptError> {
    evaluate_with_config(source, seed, &InterpreterConfig::default())
}

pub fn evaluate_with_config(
    source: &str,
    seed: Option<&PixelBuffer>,
    config: &InterpreterConfig,
) -> Result<PixelBuffer, ScriptError> {
    let program = parse_source(source)?;
    let mut evaluator = Evaluator::new(config, seed);
    evaluator.evaluate_program(&program)?;
    Ok(evaluator.into_pixels())
}

/// Command line entry: evaluates and renders any error as a diagnostic.
pub fn run(
    source: &str,
    filename: Option<&str>,
    seed: Option<&PixelBuffer>,
    config: &InterpreterConfig,
) -> Option<PixelBuffer> {
    match evaluate_with_config(source, seed, config) {
        Ok(pixels) => Some(pixels),
        Err(error) => {
            error.report(source, filename);
            None
        }
    }
}
