//! Recursive-descent parser with panic-mode recovery.
//!
//! Consumes the scanner's token vector and produces statement AST nodes.  On
//! a syntax error the offending statement is abandoned, tokens are discarded
//! up to and including the next `;` or `}`, and parsing continues; all
//! collected diagnostics are available through [`Parser::errors`].  The
//! driver must check [`Parser::had_error`] before resolving or evaluating.

use std::rc::Rc;

use log::{debug, info};

use crate::error::LarkError;
use crate::expr::{Expr, NodeId};
use crate::stmt::{Declarator, FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<LarkError>,
    next_node_id: NodeId,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // The scanner guarantees a trailing EOF; re-establish it for token
        // streams built by hand.
        if tokens.last().map(|t| &t.token_type) != Some(&TokenType::EOF) {
            let (row, col) = tokens
                .last()
                .map_or((1, 1), |t| (t.row, t.col + t.lexeme.len()));

            tokens.push(Token::new(TokenType::EOF, String::new(), row, col));
        }

        Parser {
            tokens,
            current: 0,
            errors: Vec::new(),
            next_node_id: 0,
        }
    }

    /// Parse the whole token stream, recovering at statement boundaries.
    /// Always returns the successfully parsed statements.
    pub fn parse(&mut self) -> Vec<Stmt> {
        info!("Beginning parse over {} token(s)", self.tokens.len());

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            match self.statement() {
                Ok(stmt) => statements.push(stmt),

                Err(e) => {
                    debug!("Parse error, synchronizing: {}", e);

                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        info!(
            "Parse finished: {} statement(s), {} error(s)",
            statements.len(),
            self.errors.len()
        );

        statements
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[LarkError] {
        &self.errors
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn statement(&mut self) -> Result<Stmt, LarkError> {
        if self.match_tokens(&[TokenType::CLASS]) {
            return self.class_declaration();
        }

        if self.match_tokens(&[TokenType::FUNCTION]) {
            return self.function_declaration();
        }

        if self.match_tokens(&[TokenType::RETURN]) {
            return self.return_statement();
        }

        if self.match_tokens(&[TokenType::WHILE]) {
            return self.while_statement();
        }

        if self.match_tokens(&[TokenType::IF]) {
            return self.if_statement();
        }

        if self.match_tokens(&[TokenType::LEFT_BRACE]) {
            return Ok(Stmt::Block(self.block()?));
        }

        if self.match_tokens(&[TokenType::LET]) {
            return self.let_declaration();
        }

        self.expression_statement()
    }

    fn let_declaration(&mut self) -> Result<Stmt, LarkError> {
        let mut declarators: Vec<Declarator> = Vec::new();

        loop {
            let name: Token = self.consume(TokenType::IDENTIFIER, "expected variable name")?;

            let initializer: Option<Expr> = if self.match_tokens(&[TokenType::EQUAL]) {
                Some(self.expression()?)
            } else {
                None
            };

            declarators.push(Declarator { name, initializer });

            if !self.match_tokens(&[TokenType::COMMA]) {
                break;
            }
        }

        self.consume(
            TokenType::SEMICOLON,
            "expected ';' after variable declaration",
        )?;

        Ok(Stmt::Let(declarators))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, LarkError> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "expected '}' after block")?;

        Ok(statements)
    }

    fn if_statement(&mut self) -> Result<Stmt, LarkError> {
        self.consume(TokenType::LEFT_PAREN, "expected '(' after 'if'")?;

        let condition: Expr = self.expression()?;

        self.consume(TokenType::RIGHT_PAREN, "expected ')' after condition")?;

        let then_branch = Box::new(self.statement()?);

        let else_branch = if self.match_tokens(&[TokenType::ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, LarkError> {
        self.consume(TokenType::LEFT_PAREN, "expected '(' after 'while'")?;

        let condition: Expr = self.expression()?;

        self.consume(TokenType::RIGHT_PAREN, "expected ')' after condition")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn function_declaration(&mut self) -> Result<Stmt, LarkError> {
        let declaration = self.function_body("function")?;

        Ok(Stmt::Function(Rc::new(declaration)))
    }

    /// Shared by `function` declarations and class methods: name, parameter
    /// list, braced body.
    fn function_body(&mut self, kind: &str) -> Result<FunctionDecl, LarkError> {
        let name: Token =
            self.consume(TokenType::IDENTIFIER, format!("expected {} name", kind))?;

        debug!("Parsing {} '{}'", kind, name.lexeme);

        self.consume(
            TokenType::LEFT_PAREN,
            format!("expected '(' after {} name", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                params.push(self.consume(TokenType::IDENTIFIER, "expected parameter name")?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "expected ')' after parameters")?;

        self.consume(
            TokenType::LEFT_BRACE,
            format!("expected '{{' before {} body", kind),
        )?;

        let body: Vec<Stmt> = self.block()?;

        Ok(FunctionDecl { name, params, body })
    }

    fn return_statement(&mut self) -> Result<Stmt, LarkError> {
        let keyword: Token = self.previous().clone();

        let value: Option<Expr> = if self.check(&TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::SEMICOLON, "expected ';' after return value")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn class_declaration(&mut self) -> Result<Stmt, LarkError> {
        let name: Token = self.consume(TokenType::IDENTIFIER, "expected class name")?;

        debug!("Parsing class '{}'", name.lexeme);

        let superclass: Option<Expr> = if self.match_tokens(&[TokenType::EXTENDS]) {
            let super_name: Token =
                self.consume(TokenType::IDENTIFIER, "expected superclass name")?;

            Some(Expr::Literal {
                id: self.node_id(),
                token: super_name,
            })
        } else {
            None
        };

        self.consume(TokenType::LEFT_BRACE, "expected '{' before class body")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(Rc::new(self.function_body("method")?));
        }

        self.consume(TokenType::RIGHT_BRACE, "expected '}' after class body")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt, LarkError> {
        let expr: Expr = self.expression()?;

        self.consume(TokenType::SEMICOLON, "expected ';' after expression")?;

        Ok(Stmt::Expression(expr))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions, lowest to highest precedence
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, LarkError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, LarkError> {
        let expr: Expr = self.ternary()?;

        if self.match_tokens(&[TokenType::EQUAL]) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            self.validate_assign_target(&expr, &equals)?;

            return Ok(Expr::Assign {
                target: Box::new(expr),
                value: Box::new(value),
            });
        }

        if self.match_tokens(&[
            TokenType::PLUS_EQUAL,
            TokenType::MINUS_EQUAL,
            TokenType::STAR_EQUAL,
            TokenType::SLASH_EQUAL,
        ]) {
            let compound: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            self.validate_assign_target(&expr, &compound)?;

            // Desugar `x op= e` into `x = x op e`.  The synthesized operator
            // token carries the compound token's position; the read node
            // shares the target's node id, so both bind identically.
            let op: Token = synthesized_operator(&compound);
            let read: Expr = expr.clone();

            return Ok(Expr::Assign {
                target: Box::new(expr),
                value: Box::new(Expr::Binary {
                    left: Box::new(read),
                    op,
                    right: Box::new(value),
                }),
            });
        }

        Ok(expr)
    }

    fn validate_assign_target(&self, target: &Expr, equals: &Token) -> Result<(), LarkError> {
        match target {
            Expr::Literal { token, .. } if token.token_type == TokenType::IDENTIFIER => Ok(()),

            Expr::Get { .. } => Ok(()),

            _ => Err(LarkError::syntax(
                equals.row,
                equals.col,
                "invalid assignment target",
            )),
        }
    }

    fn ternary(&mut self) -> Result<Expr, LarkError> {
        let expr: Expr = self.equality()?;

        if self.match_tokens(&[TokenType::QUESTION]) {
            let then_branch: Expr = self.ternary()?;

            self.consume(TokenType::COLON, "expected ':' in ternary expression")?;

            let else_branch: Expr = self.ternary()?;

            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, LarkError> {
        let mut expr: Expr = self.comparison()?;

        while self.match_tokens(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, LarkError> {
        let mut expr: Expr = self.term()?;

        while self.match_tokens(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.term()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, LarkError> {
        let mut expr: Expr = self.factor()?;

        while self.match_tokens(&[TokenType::MINUS, TokenType::PLUS]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, LarkError> {
        let mut expr: Expr = self.power()?;

        while self.match_tokens(&[TokenType::SLASH, TokenType::STAR]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.power()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn power(&mut self) -> Result<Expr, LarkError> {
        let mut expr: Expr = self.unary()?;

        while self.match_tokens(&[TokenType::CARET]) {
            let op: Token = self.previous().clone();
            let right: Expr = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, LarkError> {
        if self.match_tokens(&[
            TokenType::MINUS,
            TokenType::PLUS,
            TokenType::BANG,
            TokenType::PLUS_PLUS,
            TokenType::MINUS_MINUS,
        ]) {
            let op: Token = self.previous().clone();
            let operand: Expr = self.unary()?;

            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                postfix: false,
            });
        }

        let expr: Expr = self.class_instantiation()?;

        // Postfix ++/-- bind directly to a bare identifier.
        let is_identifier = matches!(
            &expr,
            Expr::Literal { token, .. } if token.token_type == TokenType::IDENTIFIER
        );

        if is_identifier && self.match_tokens(&[TokenType::PLUS_PLUS, TokenType::MINUS_MINUS]) {
            let op: Token = self.previous().clone();

            return Ok(Expr::Unary {
                op,
                operand: Box::new(expr),
                postfix: true,
            });
        }

        Ok(expr)
    }

    fn class_instantiation(&mut self) -> Result<Expr, LarkError> {
        if self.match_tokens(&[TokenType::NEW]) {
            let keyword: Token = self.previous().clone();

            // The constructor reference is a primary plus property accesses;
            // the first argument list completes the instantiation.  Later
            // suffixes chain onto the created instance.
            let mut callee: Expr = self.primary()?;

            while self.match_tokens(&[TokenType::DOT]) {
                let property: Token =
                    self.consume(TokenType::IDENTIFIER, "expected property name after '.'")?;

                callee = Expr::Get {
                    object: Box::new(callee),
                    property,
                };
            }

            if !self.check(&TokenType::LEFT_PAREN) {
                let token: &Token = self.peek();

                return Err(LarkError::syntax(
                    token.row,
                    token.col,
                    "expected a call after 'new'",
                ));
            }

            self.advance();

            let call: Expr = self.finish_call(callee)?;

            let instantiation = Expr::New {
                keyword,
                call: Box::new(call),
            };

            return self.call_suffix(instantiation);
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr, LarkError> {
        let expr: Expr = self.primary()?;

        self.call_suffix(expr)
    }

    fn call_suffix(&mut self, mut expr: Expr) -> Result<Expr, LarkError> {
        loop {
            if self.match_tokens(&[TokenType::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tokens(&[TokenType::DOT]) {
                let property: Token =
                    self.consume(TokenType::IDENTIFIER, "expected property name after '.'")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    property,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, LarkError> {
        let mut args: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                args.push(self.expression()?);

                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(TokenType::RIGHT_PAREN, "expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            args,
        })
    }

    fn primary(&mut self) -> Result<Expr, LarkError> {
        if self.match_tokens(&[
            TokenType::NUMBER(0.0),
            TokenType::STRING(String::new()),
            TokenType::TRUE,
            TokenType::FALSE,
            TokenType::NONE,
            TokenType::IDENTIFIER,
        ]) {
            return Ok(Expr::Literal {
                id: self.node_id(),
                token: self.previous().clone(),
            });
        }

        if self.match_tokens(&[TokenType::THIS]) {
            return Ok(Expr::This {
                id: self.node_id(),
                keyword: self.previous().clone(),
            });
        }

        if self.match_tokens(&[TokenType::SUPER]) {
            let keyword: Token = self.previous().clone();

            self.consume(TokenType::DOT, "expected '.' after 'super'")?;

            let property: Token =
                self.consume(TokenType::IDENTIFIER, "expected method name after 'super.'")?;

            return Ok(Expr::Super {
                id: self.node_id(),
                keyword,
                property,
            });
        }

        if self.match_tokens(&[TokenType::LEFT_PAREN]) {
            let expr: Expr = self.expression()?;

            self.consume(TokenType::RIGHT_PAREN, "expected ')' after expression")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token: &Token = self.peek();

        Err(LarkError::syntax(token.row, token.col, "expected expression"))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Token-stream helpers
    // ─────────────────────────────────────────────────────────────────────

    /// Discard tokens up to and including the next `;` or `}` (or EOF).
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            let token_type: TokenType = self.advance().token_type.clone();

            if token_type == TokenType::SEMICOLON || token_type == TokenType::RIGHT_BRACE {
                return;
            }
        }
    }

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();

                return true;
            }
        }

        false
    }

    fn consume<S: Into<String>>(
        &mut self,
        token_type: TokenType,
        message: S,
    ) -> Result<Token, LarkError> {
        if self.check(&token_type) {
            return Ok(self.advance().clone());
        }

        let token: &Token = self.peek();

        Err(LarkError::syntax(token.row, token.col, message))
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        &self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn node_id(&mut self) -> NodeId {
        let id: NodeId = self.next_node_id;

        self.next_node_id += 1;

        id
    }
}

/// The plain operator standing in for a compound assignment operator.
fn synthesized_operator(compound: &Token) -> Token {
    let (token_type, lexeme) = match compound.token_type {
        TokenType::PLUS_EQUAL => (TokenType::PLUS, "+"),

        TokenType::MINUS_EQUAL => (TokenType::MINUS, "-"),

        TokenType::STAR_EQUAL => (TokenType::STAR, "*"),

        TokenType::SLASH_EQUAL => (TokenType::SLASH, "/"),

        _ => unreachable!("not a compound assignment operator"),
    };

    Token::new(token_type, lexeme.to_string(), compound.row, compound.col)
}
