use crate::ast::{BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp};
use crate::builtins::{Builtin, StringBuffer};
use crate::config::InterpreterConfig;
use crate::error::{ScriptError, Span};
use crate::framebuffer::PixelBuffer;
use crate::value::Arg;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Names every run starts with when builtin constants are enabled.
pub const BUILTIN_CONSTANTS: [(&str, i32); 7] = [
    ("OLED_BLACK", 0),
    ("OLED_WHITE", 1),
    ("OLED_FONT_SMALL", 0),
    ("OLED_FONT_MEDIUM", 1),
    ("OLED_FONT_LARGE", 2),
    ("TRUE", 1),
    ("FALSE", 0),
];

/// The single flat variable scope of a run. Declarations inside blocks and
/// loop bodies stay visible for the rest of the program.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, i32>,
    constants: HashSet<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.values.get(name).copied()
    }

    pub fn is_const(&self, name: &str) -> bool {
        self.constants.contains(name)
    }

    pub fn define(&mut self, name: &str, value: i32, is_const: bool, span: &Span) -> Result<(), ScriptError> {
        if self.is_const(name) {
            return Err(ScriptError::runtime_error(
                *span,
                format!("Cannot redeclare constant: '{}'", name),
            ));
        }
        self.values.insert(name.to_string(), value);
        if is_const {
            self.constants.insert(name.to_string());
        }
        Ok(())
    }

    /// Plain assignment also creates the variable, as the flat global model
    /// of the target dialect allows.
    pub fn assign(&mut self, name: &str, value: i32, span: &Span) -> Result<(), ScriptError> {
        if self.is_const(name) {
            return Err(ScriptError::runtime_error_with_help(
                *span,
                format!("Cannot assign to constant: '{}'", name),
                format!("'{}' was declared with const and cannot change.", name),
            ));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }
}

/// Execution context for one run: variables, string buffer, framebuffer and
/// the step counter that guards against runaway loops.
pub struct Evaluator {
    environment: Environment,
    strings: StringBuffer,
    pixels: PixelBuffer,
    steps: u64,
    max_steps: u64,
}

impl Evaluator {
    /// A fresh context. The seed buffer, if any, is copied.
    pub fn new(config: &InterpreterConfig, seed: Option<&PixelBuffer>) -> Self {
        let mut environment = Environment::new();
        if config.builtin_constants {
            for (name, value) in BUILTIN_CONSTANTS {
                environment.values.insert(name.to_string(), value);
                environment.constants.insert(name.to_string());
            }
        }

        Self {
            environment,
            strings: StringBuffer::new(),
            pixels: seed.cloned().unwrap_or_default(),
            steps: 0,
            max_steps: config.max_steps,
        }
    }

    pub fn evaluate_program(&mut self, program: &Program) -> Result<(), ScriptError> {
        for statement in &program.statements {
            self.execute_statement(statement)?;
        }
        debug!(steps = self.steps, "evaluation finished");
        Ok(())
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn into_pixels(self) -> PixelBuffer {
        self.pixels
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn variable(&self, name: &str) -> Option<i32> {
        self.environment.get(name)
    }

    fn step(&mut self, span: &Span) -> Result<(), ScriptError> {
        self.steps += 1;
        if self.steps > self.max_steps {
            warn!(
                max_steps = self.max_steps,
                line = span.line,
                "execution limit exceeded"
            );
            return Err(ScriptError::runtime_error_with_help(
                *span,
                "Execution limit exceeded (possible infinite loop)".to_string(),
                format!(
                    "Scripts may run at most {} evaluation steps. Check loop conditions.",
                    self.max_steps
                ),
            ));
        }
        Ok(())
    }

    fn execute_statement(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        self.step(stmt.span())?;

        match stmt {
            Stmt::VarDecl {
                name,
                is_const,
                initializer,
                span,
            } => {
                let value = match initializer {
                    Some(expr) => self.evaluate_expression(expr)?,
                    None => 0,
                };
                self.environment.define(name, value, *is_const, span)
            }
            Stmt::Assign {
                name,
                operator,
                value,
                span,
            } => {
                let mut result = self.evaluate_expression(value)?;
                if let Some(op) = operator.binary_op() {
                    let current = self.lookup(name, span)?;
                    result = apply_binary(op, current, result, span)?;
                }
                self.environment.assign(name, result, span)
            }
            Stmt::Expression { expr, .. } => {
                self.evaluate_expression(expr)?;
                Ok(())
            }
            Stmt::Block { statements, .. } => self.execute_block(statements),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate_expression(condition)? != 0 {
                    self.execute_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_block(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While {
                condition,
                body,
                span,
            } => loop {
                self.step(span)?;
                if self.evaluate_expression(condition)? == 0 {
                    return Ok(());
                }
                self.execute_block(body)?;
            },
            Stmt::For {
                initializer,
                condition,
                increment,
                body,
                span,
            } => {
                if let Some(init) = initializer {
                    self.execute_statement(init)?;
                }

                loop {
                    self.step(span)?;
                    if let Some(cond) = condition {
                        if self.evaluate_expression(cond)? == 0 {
                            return Ok(());
                        }
                    }

                    self.execute_block(body)?;

                    if let Some(inc) = increment {
                        self.execute_statement(inc)?;
                    }
                }
            }
        }
    }

    /// No new scope: the environment is flat.
    fn execute_block(&mut self, statements: &[Stmt]) -> Result<(), ScriptError> {
        for statement in statements {
            self.execute_statement(statement)?;
        }
        Ok(())
    }

    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<i32, ScriptError> {
        self.step(expr.span())?;

        match expr {
            Expr::Number { value, .. } => Ok(*value),
            Expr::String { .. } => Ok(0),
            Expr::Variable { name, span } => self.lookup(name, span),
            Expr::Unary {
                operator, operand, ..
            } => {
                let value = self.evaluate_expression(operand)?;
                Ok(match operator {
                    UnaryOp::Negate => value.wrapping_neg(),
                    UnaryOp::Not => (value == 0) as i32,
                    UnaryOp::BitNot => !value,
                })
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                let left_val = self.evaluate_expression(left)?;
                let right_val = self.evaluate_expression(right)?;
                apply_binary(*operator, left_val, right_val, span)
            }
            Expr::Logical {
                left,
                operator,
                right,
                ..
            } => {
                let left_val = self.evaluate_expression(left)? != 0;

                let result = match operator {
                    LogicalOp::And => left_val && self.evaluate_expression(right)? != 0,
                    LogicalOp::Or => left_val || self.evaluate_expression(right)? != 0,
                };
                Ok(result as i32)
            }
            Expr::Call { name, args, span } => self.call(name, args, span),
            Expr::Increment {
                name,
                operator,
                prefix,
                span,
            } => {
                let old = self.lookup(name, span)?;
                let new = old.wrapping_add(operator.delta());
                self.environment.assign(name, new, span)?;
                Ok(if *prefix { new } else { old })
            }
            Expr::Index { name, span, .. } => Err(ScriptError::runtime_error_with_help(
                *span,
                format!("Array access is not supported: '{}[...]'", name),
                "The preview interpreter only has integer variables.".to_string(),
            )),
        }
    }

    fn lookup(&self, name: &str, span: &Span) -> Result<i32, ScriptError> {
        self.environment.get(name).ok_or_else(|| {
            ScriptError::runtime_error_with_help(
                *span,
                format!("Undefined variable: '{}'", name),
                format!("Declare it first, e.g. int {} = 0;", name),
            )
        })
    }

    /// Arguments are evaluated left to right before the name and argument
    /// count are checked, so `foo(1 / 0)` fails with the division error.
    fn call(&mut self, name: &str, args: &[Expr], span: &Span) -> Result<i32, ScriptError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = match arg {
                Expr::String { value, .. } => Arg::Text(value.clone()),
                other => Arg::Number(self.evaluate_expression(other)?),
            };
            values.push(value);
        }

        let builtin = Builtin::from_name(name).ok_or_else(|| {
            ScriptError::runtime_error_with_help(
                *span,
                format!("Unknown function: '{}'", name),
                "Available functions: cls_oled, pixel_oled, line_oled, rect_oled, circle_oled, \
                 putc_oled, puts_oled, text_oled, abs, min, max."
                    .to_string(),
            )
        })?;

        if !builtin.arity().contains(&values.len()) {
            return Err(ScriptError::runtime_error_with_help(
                *span,
                format!(
                    "{} expects {}, got {}",
                    builtin.name(),
                    builtin.arity_description(),
                    values.len()
                ),
                format!("Usage: {}", builtin.usage()),
            ));
        }

        Ok(builtin.call(&values, &mut self.pixels, &mut self.strings))
    }
}

/// 32-bit integer arithmetic: wrapping on overflow, truncating division,
/// shift counts masked to five bits.
pub fn apply_binary(operator: BinaryOp, left: i32, right: i32, span: &Span) -> Result<i32, ScriptError> {
    let result = match operator {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Subtract => left.wrapping_sub(right),
        BinaryOp::Multiply => left.wrapping_mul(right),
        BinaryOp::Divide => {
            if right == 0 {
                return Err(ScriptError::runtime_error(*span, "Division by zero".to_string()));
            }
            left.wrapping_div(right)
        }
        BinaryOp::Modulo => {
            if right == 0 {
                return Err(ScriptError::runtime_error(*span, "Modulo by zero".to_string()));
            }
            left.wrapping_rem(right)
        }
        BinaryOp::BitAnd => left & right,
        BinaryOp::BitOr => left | right,
        BinaryOp::BitXor => left ^ right,
        BinaryOp::ShiftLeft => left.wrapping_shl(right as u32),
        BinaryOp::ShiftRight => left.wrapping_shr(right as u32),
        BinaryOp::Equal => (left == right) as i32,
        BinaryOp::NotEqual => (left != right) as i32,
        BinaryOp::Less => (left < right) as i32,
        BinaryOp::LessEqual => (left <= right) as i32,
        BinaryOp::Greater => (left > right) as i32,
        BinaryOp::GreaterEqual => (left >= right) as i32,
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::parse_source;
    use crate::test_utils::init_test_logging;

    fn run(source: &str) -> Result<Evaluator, ScriptError> {
        init_test_logging();
        let program = parse_source(source)?;
        let mut evaluator = Evaluator::new(&InterpreterConfig::default(), None);
        evaluator.evaluate_program(&program)?;
        Ok(evaluator)
    }

    #[test]
    fn block_declarations_stay_visible() {
        let evaluator = run("if (1) { int inner = 7; } int outer = inner + 1;").unwrap();
        assert_eq!(evaluator.variable("outer"), Some(8));
    }

    #[test]
    fn plain_assignment_creates_variable() {
        let evaluator = run("x = 4; x *= 3;").unwrap();
        assert_eq!(evaluator.variable("x"), Some(12));
    }

    #[test]
    fn builtin_constants_can_be_disabled() {
        let config = InterpreterConfig {
            builtin_constants: false,
            ..InterpreterConfig::default()
        };
        let evaluator = Evaluator::new(&config, None);
        assert_eq!(evaluator.variable("OLED_WHITE"), None);
    }

    #[test]
    fn step_counter_covers_statements_and_expressions() {
        // One statement plus its initializer expression.
        let evaluator = run("int a = 1;").unwrap();
        assert_eq!(evaluator.steps(), 2);
    }

    #[test]
    fn string_literal_arguments_cost_no_steps() {
        let with_text = run("text_oled(0, 0, 0, 1, \"hi\");").unwrap().steps();
        let with_number = run("text_oled(0, 0, 0, 1, 0);").unwrap().steps();
        assert_eq!(with_text + 1, with_number);
    }

    #[test]
    fn arithmetic_edge_cases() {
        let span = Span::new(0, 0, 1, 1);
        assert_eq!(apply_binary(BinaryOp::Divide, -7, 2, &span).unwrap(), -3);
        assert_eq!(apply_binary(BinaryOp::Modulo, -7, 2, &span).unwrap(), -1);
        assert_eq!(apply_binary(BinaryOp::Divide, i32::MIN, -1, &span).unwrap(), i32::MIN);
        assert_eq!(apply_binary(BinaryOp::ShiftLeft, 1, 33, &span).unwrap(), 2);
        assert_eq!(apply_binary(BinaryOp::ShiftRight, -8, 1, &span).unwrap(), -4);
        assert!(apply_binary(BinaryOp::Modulo, 1, 0, &span).is_err());
    }
}
