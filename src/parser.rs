use crate::ast::{AssignOp, BinaryOp, Expr, IncrementOp, LogicalOp, Program, Stmt, UnaryOp};
use crate::error::{ScriptError, Span};
use crate::lexer::{parse_int_literal, Token, TokenType};

/// Deepest nesting of statements, parentheses, unary operators and
/// operator chains a script may use. Evaluation and drop of the tree recurse
/// as deep as the parser, so this also bounds their stack use.
pub const MAX_NESTING_DEPTH: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    /// `tokens` must end with an `Eof` token, as produced by the lexer.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Program, ScriptError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.statement()?);
        }

        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> Result<Stmt, ScriptError> {
        if self.check(&TokenType::Int) || self.check(&TokenType::Const) {
            self.var_declaration()
        } else if self.match_types(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_types(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_types(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_types(&[TokenType::LeftBrace]) {
            let start = self.previous().span;
            let statements = self.block()?;
            Ok(Stmt::Block {
                statements,
                span: start.to(&self.previous().span),
            })
        } else {
            self.expression_statement()
        }
    }

    /// Statements up to and including the closing `}`; the `{` is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut statements = Vec::new();

        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume_with_help(
            TokenType::RightBrace,
            "'}'",
            "Block statements must be closed with '}' after the opening '{'.".to_string(),
        )?;
        Ok(statements)
    }

    /// Loop and branch bodies: a braced block, or exactly one statement.
    fn body(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        if self.match_types(&[TokenType::LeftBrace]) {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, ScriptError> {
        let keyword = self.advance().clone();
        let is_const = keyword.token_type == TokenType::Const;
        if is_const {
            // `const int N` and `const N` are both accepted
            self.match_types(&[TokenType::Int]);
        }

        let name = self.consume(TokenType::Identifier, "variable name")?.clone();

        let initializer = if self.match_types(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume_with_help(
            TokenType::Semicolon,
            "';'",
            "Declarations end with a semicolon: int x = 0;".to_string(),
        )?;

        Ok(Stmt::VarDecl {
            name: name.lexeme,
            is_const,
            initializer,
            span: name.span.to(&self.previous().span),
        })
    }

    fn if_statement(&mut self) -> Result<Stmt, ScriptError> {
        let start = self.previous().span;

        self.consume_with_help(
            TokenType::LeftParen,
            "'('",
            "If statements require parentheses around the condition: if (condition) { ... }"
                .to_string(),
        )?;
        let condition = self.expression()?;
        self.consume_with_help(
            TokenType::RightParen,
            "')'",
            "If conditions must be enclosed in parentheses: if (condition) { ... }".to_string(),
        )?;

        let then_branch = self.body()?;
        let else_branch = if self.match_types(&[TokenType::Else]) {
            if self.match_types(&[TokenType::If]) {
                Some(vec![self.nested(Self::if_statement)?])
            } else {
                Some(self.body()?)
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span: start.to(&self.previous().span),
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ScriptError> {
        let start = self.previous().span;

        self.consume(TokenType::LeftParen, "'('")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "')'")?;

        let body = self.body()?;

        Ok(Stmt::While {
            condition,
            body,
            span: start.to(&self.previous().span),
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, ScriptError> {
        let start = self.previous().span;

        self.consume(TokenType::LeftParen, "'('")?;

        // Both forms consume their own ';'
        let initializer = if self.match_types(&[TokenType::Semicolon]) {
            None
        } else if self.check(&TokenType::Int) || self.check(&TokenType::Const) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if !self.check(&TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "';'")?;

        let increment = if !self.check(&TokenType::RightParen) {
            let expr = self.expression()?;
            Some(Box::new(self.finish_simple_statement(expr)?))
        } else {
            None
        };
        self.consume_with_help(
            TokenType::RightParen,
            "')'",
            "For loops take three clauses: for (init; condition; update) { ... }".to_string(),
        )?;

        let body = self.body()?;

        Ok(Stmt::For {
            initializer,
            condition,
            increment,
            body,
            span: start.to(&self.previous().span),
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt, ScriptError> {
        let expr = self.expression()?;
        let stmt = self.finish_simple_statement(expr)?;

        self.consume_with_help(
            TokenType::Semicolon,
            "';'",
            "Statements end with a semicolon.".to_string(),
        )?;

        Ok(stmt)
    }

    /// Turns an already parsed expression into an assignment when it is a
    /// bare variable followed by an assignment operator, else into an
    /// expression statement. Does not consume a terminator.
    fn finish_simple_statement(&mut self, expr: Expr) -> Result<Stmt, ScriptError> {
        if let Expr::Variable { name, span } = &expr {
            if let Some(operator) = self.assignment_operator() {
                self.advance();
                let value = self.expression()?;
                let span = span.to(value.span());
                return Ok(Stmt::Assign {
                    name: name.clone(),
                    operator,
                    value,
                    span,
                });
            }
        }

        let span = *expr.span();
        Ok(Stmt::Expression { expr, span })
    }

    fn assignment_operator(&self) -> Option<AssignOp> {
        match self.peek().token_type {
            TokenType::Equal => Some(AssignOp::Assign),
            TokenType::PlusEqual => Some(AssignOp::AddAssign),
            TokenType::MinusEqual => Some(AssignOp::SubtractAssign),
            TokenType::StarEqual => Some(AssignOp::MultiplyAssign),
            TokenType::SlashEqual => Some(AssignOp::DivideAssign),
            TokenType::PercentEqual => Some(AssignOp::ModuloAssign),
            _ => None,
        }
    }

    pub fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.logical_and()?;

        let mut folds = 0;
        while self.match_types(&[TokenType::OrOr]) {
            self.enter()?;
            folds += 1;
            let right = self.logical_and()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
                span,
            };
        }
        self.leave(folds);

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.bitwise_or()?;

        let mut folds = 0;
        while self.match_types(&[TokenType::AndAnd]) {
            self.enter()?;
            folds += 1;
            let right = self.bitwise_or()?;
            let span = expr.span().to(right.span());
            expr = Expr::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
                span,
            };
        }
        self.leave(folds);

        Ok(expr)
    }

    fn bitwise_or(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.bitwise_xor()?;
        let mut folds = 0;
        while self.match_types(&[TokenType::Pipe]) {
            self.enter()?;
            folds += 1;
            let right = self.bitwise_xor()?;
            expr = binary(expr, BinaryOp::BitOr, right);
        }
        self.leave(folds);
        Ok(expr)
    }

    fn bitwise_xor(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.bitwise_and()?;
        let mut folds = 0;
        while self.match_types(&[TokenType::Caret]) {
            self.enter()?;
            folds += 1;
            let right = self.bitwise_and()?;
            expr = binary(expr, BinaryOp::BitXor, right);
        }
        self.leave(folds);
        Ok(expr)
    }

    fn bitwise_and(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.equality()?;
        let mut folds = 0;
        while self.match_types(&[TokenType::Ampersand]) {
            self.enter()?;
            folds += 1;
            let right = self.equality()?;
            expr = binary(expr, BinaryOp::BitAnd, right);
        }
        self.leave(folds);
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.comparison()?;

        let mut folds = 0;
        while self.match_types(&[TokenType::EqualEqual, TokenType::BangEqual]) {
            self.enter()?;
            folds += 1;
            let operator = match self.previous().token_type {
                TokenType::EqualEqual => BinaryOp::Equal,
                TokenType::BangEqual => BinaryOp::NotEqual,
                _ => unreachable!(),
            };
            let right = self.comparison()?;
            expr = binary(expr, operator, right);
        }
        self.leave(folds);

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.shift()?;

        let mut folds = 0;
        while self.match_types(&[
            TokenType::Less,
            TokenType::Greater,
            TokenType::LessEqual,
            TokenType::GreaterEqual,
        ]) {
            self.enter()?;
            folds += 1;
            let operator = match self.previous().token_type {
                TokenType::Less => BinaryOp::Less,
                TokenType::Greater => BinaryOp::Greater,
                TokenType::LessEqual => BinaryOp::LessEqual,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                _ => unreachable!(),
            };
            let right = self.shift()?;
            expr = binary(expr, operator, right);
        }
        self.leave(folds);

        Ok(expr)
    }

    fn shift(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.term()?;

        let mut folds = 0;
        while self.match_types(&[TokenType::LessLess, TokenType::GreaterGreater]) {
            self.enter()?;
            folds += 1;
            let operator = match self.previous().token_type {
                TokenType::LessLess => BinaryOp::ShiftLeft,
                TokenType::GreaterGreater => BinaryOp::ShiftRight,
                _ => unreachable!(),
            };
            let right = self.term()?;
            expr = binary(expr, operator, right);
        }
        self.leave(folds);

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.factor()?;

        let mut folds = 0;
        while self.match_types(&[TokenType::Plus, TokenType::Minus]) {
            self.enter()?;
            folds += 1;
            let operator = match self.previous().token_type {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Subtract,
                _ => unreachable!(),
            };
            let right = self.factor()?;
            expr = binary(expr, operator, right);
        }
        self.leave(folds);

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.unary()?;

        let mut folds = 0;
        while self.match_types(&[TokenType::Star, TokenType::Slash, TokenType::Percent]) {
            self.enter()?;
            folds += 1;
            let operator = match self.previous().token_type {
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Percent => BinaryOp::Modulo,
                _ => unreachable!(),
            };
            let right = self.unary()?;
            expr = binary(expr, operator, right);
        }
        self.leave(folds);

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.match_types(&[TokenType::Minus, TokenType::Bang, TokenType::Tilde]) {
            let token = self.previous().clone();
            let operator = match token.token_type {
                TokenType::Minus => UnaryOp::Negate,
                TokenType::Bang => UnaryOp::Not,
                TokenType::Tilde => UnaryOp::BitNot,
                _ => unreachable!(),
            };
            let operand = self.nested(Self::unary)?;
            let span = token.span.to(operand.span());
            return Ok(Expr::Unary {
                operator,
                operand: Box::new(operand),
                span,
            });
        }

        if self.match_types(&[TokenType::PlusPlus, TokenType::MinusMinus]) {
            let token = self.previous().clone();
            let operator = increment_op(token.token_type);
            let name = self.consume(TokenType::Identifier, "variable name")?.clone();
            return Ok(Expr::Increment {
                name: name.lexeme,
                operator,
                prefix: true,
                span: token.span.to(&name.span),
            });
        }

        self.postfix()
    }

    /// Calls, index access and postfix `++`/`--` only follow a bare identifier.
    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let mut expr = self.primary()?;

        loop {
            let Expr::Variable { name, span } = &expr else {
                break;
            };
            let (name, span) = (name.clone(), *span);

            if self.match_types(&[TokenType::LeftParen]) {
                expr = self.finish_call(name, span)?;
            } else if self.match_types(&[TokenType::LeftBracket]) {
                let index = self.nested(Self::expression)?;
                let end = self.consume(TokenType::RightBracket, "']'")?.span;
                expr = Expr::Index {
                    name,
                    index: Box::new(index),
                    span: span.to(&end),
                };
            } else if self.match_types(&[TokenType::PlusPlus, TokenType::MinusMinus]) {
                let token = self.previous().clone();
                expr = Expr::Increment {
                    name,
                    operator: increment_op(token.token_type),
                    prefix: false,
                    span: span.to(&token.span),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, name: String, start: Span) -> Result<Expr, ScriptError> {
        let mut args = Vec::new();

        if !self.check(&TokenType::RightParen) {
            loop {
                args.push(self.nested(Self::expression)?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume_with_help(
            TokenType::RightParen,
            "')'",
            "Function calls must be closed with ')' after the arguments. Example: pixel_oled(x, y, 1)"
                .to_string(),
        )?;

        Ok(Expr::Call {
            name,
            args,
            span: start.to(&paren.span),
        })
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        let token = self.peek().clone();

        match token.token_type {
            TokenType::Number => {
                self.advance();
                let value = parse_int_literal(&token.lexeme).ok_or_else(|| {
                    ScriptError::parse_error(
                        token.span,
                        format!("Invalid integer literal: {}", token.lexeme),
                    )
                })?;
                Ok(Expr::Number {
                    value,
                    span: token.span,
                })
            }
            TokenType::String => {
                self.advance();
                Ok(Expr::String {
                    value: token.lexeme,
                    span: token.span,
                })
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expr::Variable {
                    name: token.lexeme,
                    span: token.span,
                })
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.nested(Self::expression)?;
                self.consume_with_help(
                    TokenType::RightParen,
                    "')'",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'."
                        .to_string(),
                )?;
                Ok(expr)
            }
            _ => {
                let help_msg = match token.token_type {
                    TokenType::RightParen => {
                        "Found ')' without matching '('. Check for unbalanced parentheses."
                    }
                    TokenType::RightBrace => {
                        "Found '}' without matching '{'. Check for unbalanced braces."
                    }
                    TokenType::Eof => "Reached end of input while expecting an expression.",
                    _ => "Expected a number, string, variable, call, or parenthesized expression here.",
                };

                Err(ScriptError::parse_error_with_help(
                    token.span,
                    format!("Expected expression, got {}", describe(&token)),
                    help_msg.to_string(),
                ))
            }
        }
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        self.enter()?;
        let result = parse(self);
        self.leave(1);
        result
    }

    fn enter(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ScriptError::parse_error_with_help(
                self.peek().span,
                "Code nested too deeply".to_string(),
                format!(
                    "At most {} levels of nested blocks, parentheses, unary operators \
                     and chained operators are allowed. Split the expression using variables.",
                    MAX_NESTING_DEPTH
                ),
            ));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            &self.peek().token_type == token_type
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof; clamp so a
        // hand-built token list cannot index out of bounds.
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, expected: &str) -> Result<&Token, ScriptError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(self.expected_error(expected, None))
        }
    }

    fn consume_with_help(
        &mut self,
        token_type: TokenType,
        expected: &str,
        help: String,
    ) -> Result<&Token, ScriptError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(self.expected_error(expected, Some(help)))
        }
    }

    fn expected_error(&self, expected: &str, help: Option<String>) -> ScriptError {
        let found = self.peek();
        let message = format!("Expected {}, got {}", expected, describe(found));
        match help {
            Some(help) => ScriptError::parse_error_with_help(found.span, message, help),
            None => ScriptError::parse_error(found.span, message),
        }
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    let span = left.span().to(right.span());
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        span,
    }
}

fn increment_op(token_type: TokenType) -> IncrementOp {
    match token_type {
        TokenType::MinusMinus => IncrementOp::Decrement,
        _ => IncrementOp::Increment,
    }
}

fn describe(token: &Token) -> String {
    match token.token_type {
        TokenType::Eof => "end of input".to_string(),
        TokenType::String => format!("string \"{}\"", token.lexeme),
        _ => format!("'{}'", token.lexeme),
    }
}
