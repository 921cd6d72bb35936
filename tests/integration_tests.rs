// Parser robustness suites for oledsim scripts.
//
// Every case is lexed and parsed (never evaluated); panics are caught and
// reported as crashes so one bad input cannot hide the rest.

use oledsim::ast::Program;
use oledsim::error::{ErrorKind, ScriptError};
use oledsim::lexer::Lexer;
use oledsim::parser::Parser;

/// What a case is expected to do.
#[derive(Debug, Clone)]
pub enum Expectation {
    Parses,
    /// Any lexical or syntax error.
    Rejected,
    /// An error of this kind whose message contains the text.
    RejectedWith(ErrorKind, String),
}

#[derive(Debug)]
pub enum Outcome {
    Pass,
    Fail(String),
    Crash(String),
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expectation: Expectation,
}

impl TestCase {
    pub fn parses(name: &str, input: &str) -> Self {
        Self::new(name, input, Expectation::Parses)
    }

    pub fn rejected(name: &str, input: &str) -> Self {
        Self::new(name, input, Expectation::Rejected)
    }

    pub fn syntax_error(name: &str, input: &str, message: &str) -> Self {
        Self::new(
            name,
            input,
            Expectation::RejectedWith(ErrorKind::ParseError, message.to_string()),
        )
    }

    pub fn lex_error(name: &str, input: &str, message: &str) -> Self {
        Self::new(
            name,
            input,
            Expectation::RejectedWith(ErrorKind::LexError, message.to_string()),
        )
    }

    fn new(name: &str, input: &str, expectation: Expectation) -> Self {
        Self {
            name: name.to_string(),
            input: input.to_string(),
            expectation,
        }
    }

    /// Lexes and parses the input, turning a panic into `Outcome::Crash`.
    fn run(&self) -> Outcome {
        let input = self.input.clone();
        let parsed = std::panic::catch_unwind(move || parse_input(&input));

        let result = match parsed {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "unknown panic".to_string());
                return Outcome::Crash(message);
            }
        };

        match (&self.expectation, result) {
            (Expectation::Parses, Ok(_)) | (Expectation::Rejected, Err(_)) => Outcome::Pass,
            (Expectation::Parses, Err(error)) => Outcome::Fail(format!(
                "expected to parse, got {:?} on line {}: {}",
                error.kind,
                error.line(),
                error.message
            )),
            (_, Ok(_)) => Outcome::Fail("expected an error, but the input parsed".to_string()),
            (Expectation::RejectedWith(kind, text), Err(error)) => {
                if error.kind != *kind {
                    Outcome::Fail(format!("expected {:?}, got {:?}: {}", kind, error.kind, error.message))
                } else if !error.message.contains(text.as_str()) {
                    Outcome::Fail(format!("'{}' does not contain '{}'", error.message, text))
                } else {
                    Outcome::Pass
                }
            }
        }
    }
}

fn parse_input(input: &str) -> Result<Program, ScriptError> {
    let mut lexer = Lexer::new(input.to_string());
    let tokens = lexer.scan_tokens()?;
    Parser::new(tokens).parse()
}

#[derive(Debug)]
pub struct TestSuite {
    pub name: String,
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Runs every case, printing one line each, and returns the failures.
    pub fn run(&self) -> Vec<String> {
        println!("{}", self.name);
        println!("{}", "=".repeat(self.name.len()));

        let mut failures = Vec::new();
        for test in &self.tests {
            match test.run() {
                Outcome::Pass => println!("  ok    {}", test.name),
                Outcome::Fail(reason) => {
                    println!("  FAIL  {}: {}", test.name, reason);
                    failures.push(format!("{}::{}: {}", self.name, test.name, reason));
                }
                Outcome::Crash(reason) => {
                    println!("  CRASH {}: {}", test.name, reason);
                    failures.push(format!("{}::{}: panicked: {}", self.name, test.name, reason));
                }
            }
        }
        println!();
        failures
    }
}

// ============================================================================
// Test Suite Creation Functions
// ============================================================================


fn create_malformed_expressions_tests() -> TestSuite {
    let mut suite = TestSuite::new("Malformed Expressions");

    // === PARENTHESES TESTS ===

    suite.add_test(TestCase::syntax_error(
        "unmatched_opening_paren",
        "int x = (1 + 2;",
        "Expected ')', got ';'",
    ));

    suite.add_test(TestCase::syntax_error(
        "unmatched_opening_paren_nested",
        "int x = ((1 + 2);",
        "Expected ')', got ';'",
    ));

    suite.add_test(TestCase::syntax_error(
        "unmatched_closing_paren",
        "int x = 1 + 2);",
        "Expected ';', got ')'",
    ));

    suite.add_test(TestCase::syntax_error(
        "stray_closing_paren",
        ")",
        "Expected expression, got ')'",
    ));

    suite.add_test(TestCase::syntax_error(
        "empty_parentheses_in_expression",
        "int x = 1 + ();",
        "Expected expression, got ')'",
    ));

    // === BRACE TESTS ===

    suite.add_test(TestCase::syntax_error(
        "unmatched_opening_brace",
        "{ int x = 1;",
        "Expected '}', got end of input",
    ));

    suite.add_test(TestCase::syntax_error(
        "unmatched_closing_brace",
        "int x = 1; }",
        "Expected expression, got '}'",
    ));

    suite.add_test(TestCase::syntax_error(
        "missing_semicolon_at_end",
        "int x = 1",
        "Expected ';', got end of input",
    ));

    suite
}

fn create_edge_case_tests() -> TestSuite {
    let mut suite = TestSuite::new("Edge Cases");

    suite.add_test(TestCase::parses("empty_input", ""));
    suite.add_test(TestCase::parses("only_whitespace", "   \n\t  "));
    suite.add_test(TestCase::parses("only_line_comment", "// nothing to draw"));
    suite.add_test(TestCase::parses(
        "unclosed_block_comment_runs_to_eof",
        "pixel_oled(1, 1, 1); /* trailing",
    ));

    suite.add_test(TestCase::rejected("unexpected_eof_after_operator", "int x = 1 +"));
    suite.add_test(TestCase::rejected("unexpected_eof_in_expression", "int x = 1 + ("));

    let deep_parens = "int x = ".to_string() + &"(".repeat(100) + "1" + &")".repeat(100) + ";";
    suite.add_test(TestCase::parses("deeply_nested_parens", &deep_parens));

    suite
}

fn create_nesting_limit_tests() -> TestSuite {
    let mut suite = TestSuite::new("Nesting Limits");
    let too_deep = "Code nested too deeply";

    // Each shape recurses once per level while parsing and evaluating; past
    // the limit the parser must refuse instead of exhausting the stack.
    let parens = "int x = ".to_string() + &"(".repeat(100_000) + "1" + &")".repeat(100_000) + ";";
    suite.add_test(TestCase::syntax_error("deep_parentheses", &parens, too_deep));

    let negations = "int x = ".to_string() + &"- ".repeat(50_000) + "1;";
    suite.add_test(TestCase::syntax_error("deep_unary_minus", &negations, too_deep));

    let nots = "int x = ".to_string() + &"!".repeat(50_000) + "1;";
    suite.add_test(TestCase::syntax_error("deep_logical_not", &nots, too_deep));

    let sum = "int x = 1".to_string() + &"+1".repeat(150_000) + ";";
    suite.add_test(TestCase::syntax_error("long_addition_chain", &sum, too_deep));

    let conjunction = "int x = 1".to_string() + &" && 1".repeat(20_000) + ";";
    suite.add_test(TestCase::syntax_error("long_logical_chain", &conjunction, too_deep));

    let calls = "int x = ".to_string() + &"abs(".repeat(20_000) + "1" + &")".repeat(20_000) + ";";
    suite.add_test(TestCase::syntax_error("deep_call_arguments", &calls, too_deep));

    let ifs = "if (1) { ".repeat(20_000) + &"}".repeat(20_000);
    suite.add_test(TestCase::syntax_error("deep_if_bodies", &ifs, too_deep));

    let bare_ifs = "if (1) ".repeat(20_000) + "x = 1;";
    suite.add_test(TestCase::syntax_error("deep_unbraced_if_bodies", &bare_ifs, too_deep));

    let else_ifs = "int b = 0; if (b == 0) b = 0;".to_string()
        + &" else if (b == 1) b = 1;".repeat(20_000);
    suite.add_test(TestCase::syntax_error("long_else_if_chain", &else_ifs, too_deep));

    // Ordinary scripts stay well inside the limit
    let sum_of_100 = "int x = 1".to_string() + &"+1".repeat(99) + ";";
    suite.add_test(TestCase::parses("hundred_term_sum", &sum_of_100));
    let blocks = "{ ".repeat(60) + "x = 1;" + &" }".repeat(60);
    suite.add_test(TestCase::parses("sixty_nested_blocks", &blocks));

    suite
}

fn create_operator_tests() -> TestSuite {
    let mut suite = TestSuite::new("Operator Tests");

    suite.add_test(TestCase::rejected("missing_right_operand", "int x = 1 +;"));
    suite.add_test(TestCase::rejected("missing_both_operands", "int x = *;"));

    // `++` and `--` only attach to identifiers
    suite.add_test(TestCase::syntax_error(
        "increment_literal_prefix",
        "++5;",
        "Expected variable name, got '5'",
    ));
    suite.add_test(TestCase::syntax_error(
        "increment_literal_postfix",
        "5++;",
        "Expected ';', got '++'",
    ));
    suite.add_test(TestCase::parses("unary_chain", "int x = -~!0;"));
    suite.add_test(TestCase::parses("mixed_operators", "int x = 1 +- 2;"));

    suite.add_test(TestCase::parses("comparison_equal", "int x = 1 == 2;"));
    suite.add_test(TestCase::parses("comparison_not_equal", "int x = 1 != 2;"));
    suite.add_test(TestCase::parses("comparison_less_equal", "int x = 1 <= 2;"));
    suite.add_test(TestCase::parses("comparison_greater_equal", "int x = 1 >= 2;"));
    suite.add_test(TestCase::parses(
        "bitwise_and_shift",
        "int x = (1 << 4) | (0xF0 & 0x3C) ^ (~0 >> 28);",
    ));
    suite.add_test(TestCase::parses("logical", "int x = 1 && 0 || !0;"));

    suite
}

fn create_control_flow_tests() -> TestSuite {
    let mut suite = TestSuite::new("Control Flow Tests");

    // If statements
    suite.add_test(TestCase::parses("valid_if", "if (1) { pixel_oled(0, 0, 1); }"));
    suite.add_test(TestCase::parses(
        "else_if_chain",
        "int b = 0; if (b) b = 1; else if (b == 0) b = 2; else b = 3;",
    ));
    suite.add_test(TestCase::syntax_error(
        "if_missing_parens",
        "if x { }",
        "Expected '(', got 'x'",
    ));
    suite.add_test(TestCase::rejected("if_missing_body", "if (1)"));
    suite.add_test(TestCase::syntax_error(
        "dangling_else",
        "else { }",
        "Expected expression, got 'else'",
    ));

    // While loops
    suite.add_test(TestCase::parses("valid_while", "int i = 0; while (i < 3) { i++; }"));
    suite.add_test(TestCase::rejected("while_missing_condition", "while { }"));
    suite.add_test(TestCase::syntax_error(
        "while_missing_body",
        "while (1)",
        "Expected expression, got end of input",
    ));

    // For loops
    suite.add_test(TestCase::parses(
        "valid_for",
        "for (int i = 0; i < 10; i++) { pixel_oled(i, i, 1); }",
    ));
    suite.add_test(TestCase::parses(
        "for_with_assignment_clauses",
        "int i; for (i = 0; i < 10; i += 2) pixel_oled(i, 0, 1);",
    ));
    suite.add_test(TestCase::parses("for_all_clauses_empty", "for (;;) { }"));
    suite.add_test(TestCase::syntax_error(
        "for_missing_clause",
        "for (int i = 0; i < 3) { }",
        "Expected ';', got ')'",
    ));

    suite
}

fn create_literal_tests() -> TestSuite {
    let mut suite = TestSuite::new("Literal Tests");

    suite.add_test(TestCase::parses("integer_literal", "int x = 42;"));
    suite.add_test(TestCase::parses("hex_literal", "int x = 0xFF;"));
    suite.add_test(TestCase::parses("hex_literal_full_width", "int x = 0xFFFFFFFF;"));
    suite.add_test(TestCase::parses(
        "string_with_escapes",
        "text_oled(0, 0, 0, 1, \"a\\\"b\\n\");",
    ));

    suite.add_test(TestCase::lex_error(
        "hex_prefix_without_digits",
        "int x = 0x;",
        "Invalid integer literal",
    ));
    suite.add_test(TestCase::lex_error(
        "floating_point",
        "int x = 3.14;",
        "Unexpected character: '.'",
    ));
    suite.add_test(TestCase::lex_error(
        "unexpected_character",
        "int x = 1 @ 2;",
        "Unexpected character: '@'",
    ));

    suite.add_test(TestCase::lex_error(
        "unterminated_string",
        "text_oled(0, 0, 0, 1, \"hello",
        "Unterminated string literal",
    ));
    suite.add_test(TestCase::rejected(
        "unterminated_string_with_newline",
        "text_oled(0, 0, 0, 1, \"hello\nworld",
    ));

    suite
}

fn create_function_call_tests() -> TestSuite {
    let mut suite = TestSuite::new("Function Call Tests");

    // Unknown names are a runtime matter; parsing accepts any identifier
    suite.add_test(TestCase::parses("call_without_args", "foo();"));
    suite.add_test(TestCase::parses("call_with_args", "line_oled(0, 0, 127, 63, 1, 1);"));
    suite.add_test(TestCase::parses(
        "call_as_argument",
        "pixel_oled(abs(-3), max(1, 2), 1);",
    ));

    suite.add_test(TestCase::syntax_error(
        "missing_closing_paren",
        "pixel_oled(1, 2;",
        "Expected ')', got ';'",
    ));
    suite.add_test(TestCase::syntax_error(
        "missing_opening_paren",
        "foo 1, 2);",
        "Expected ';', got '1'",
    ));
    suite.add_test(TestCase::rejected("trailing_comma", "pixel_oled(1, 2,);"));

    // Index syntax parses; running it is rejected later
    suite.add_test(TestCase::parses("index_access", "int y = buf[3];"));
    suite.add_test(TestCase::rejected("index_unclosed", "int y = buf[3;"));

    suite
}

fn create_assignment_tests() -> TestSuite {
    let mut suite = TestSuite::new("Assignment Tests");

    suite.add_test(TestCase::parses("simple_assignment", "x = 1;"));
    suite.add_test(TestCase::parses(
        "compound_assignments",
        "int x = 0; x += 2; x -= 1; x *= 3; x /= 2; x %= 2;",
    ));
    suite.add_test(TestCase::parses("const_declaration", "const int N = 10;"));
    suite.add_test(TestCase::parses("const_without_type", "const N = 10;"));
    suite.add_test(TestCase::parses("declaration_without_initializer", "int x;"));

    suite.add_test(TestCase::syntax_error(
        "missing_value",
        "x = ;",
        "Expected expression, got ';'",
    ));
    suite.add_test(TestCase::syntax_error(
        "invalid_target",
        "1 = x;",
        "Expected ';', got '='",
    ));
    suite.add_test(TestCase::syntax_error(
        "expression_target",
        "a + b = 3;",
        "Expected ';', got '='",
    ));
    suite.add_test(TestCase::syntax_error(
        "missing_name",
        "int = 5;",
        "Expected variable name, got '='",
    ));
    suite.add_test(TestCase::syntax_error(
        "const_missing_name",
        "const int;",
        "Expected variable name, got ';'",
    ));

    suite
}

fn create_positive_tests() -> TestSuite {
    let mut suite = TestSuite::new("Positive Tests");

    suite.add_test(TestCase::parses(
        "bouncing_frame",
        "cls_oled(OLED_BLACK);\n\
         int x = 10;\n\
         for (int i = 0; i < 5; i++) {\n\
             circle_oled(x + i * 20, 32, 6, i % 2, OLED_WHITE);\n\
         }\n\
         rect_oled(0, 0, 128, 64, 0, 1);\n\
         puts_oled(4, 4, OLED_FONT_SMALL, \"HELLO\");\n",
    ));
    suite.add_test(TestCase::parses(
        "legacy_string_buffer",
        "putc_oled(0, 72); putc_oled(1, 105); puts_oled(0, 0, 1, 2, 1);",
    ));
    suite.add_test(TestCase::parses(
        "nested_blocks",
        "{ { int a = 1; } { a++; } }",
    ));

    suite
}

// ============================================================================
// Main Test Function
// ============================================================================

#[test]
fn comprehensive_parser_tests() {
    let suites = vec![
        create_malformed_expressions_tests(),
        create_edge_case_tests(),
        create_nesting_limit_tests(),
        create_operator_tests(),
        create_control_flow_tests(),
        create_literal_tests(),
        create_function_call_tests(),
        create_assignment_tests(),
        create_positive_tests(),
    ];

    let failures: Vec<String> = suites.iter().flat_map(TestSuite::run).collect();
    assert!(
        failures.is_empty(),
        "{} parser case(s) failed:\n{}",
        failures.len(),
        failures.join("\n")
    );
}
