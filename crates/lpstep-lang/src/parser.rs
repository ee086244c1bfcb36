use crate::ast::*;
use crate::lexer::{Span, Token, TokenKind};
use lpstep_solver::{Relation, Sense};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = crate::lexer::Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    /// Parses a single constraint such as `y >= 2x + 5`. Chains like
    /// `0 <= x <= 4` produce one statement per relation.
    pub fn parse_constraints(source: &str) -> Result<Vec<ConstraintStmt>, ParseError> {
        let tokens = crate::lexer::Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.skip_newlines_and_comments();
        let constraints = parser.parse_constraint_chain()?;
        parser.skip_newlines_and_comments();
        parser.expect(TokenKind::Eof)?;
        Ok(constraints)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn previous_end(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn skip_newlines_and_comments(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Comment) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: describe(t),
                span: t.span,
            },
            None => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        match self.current().cloned() {
            Some(t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            Some(_) => Err(self.unexpected(&format!("{:?}", kind))),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        loop {
            self.skip_newlines_and_comments();

            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Max | TokenKind::Min => {
                    statements.push(Statement::Objective(self.parse_objective()?));
                }
                _ => loop {
                    statements.extend(self.parse_constraint_chain()?.into_iter().map(Statement::Constraint));
                    if matches!(self.peek_kind(), TokenKind::Comma | TokenKind::Semicolon) {
                        self.advance();
                        continue;
                    }
                    break;
                },
            }
            self.end_of_statement()?;
        }

        Ok(Program { statements })
    }

    /// A statement ends at a newline, a comment, or the end of input.
    fn end_of_statement(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Comment | TokenKind::Eof => Ok(()),
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn parse_objective(&mut self) -> Result<ObjectiveStmt, ParseError> {
        let keyword = self.advance().cloned().ok_or(ParseError::UnexpectedEof)?;
        let sense = match keyword.kind {
            TokenKind::Max => Sense::Maximize,
            _ => Sense::Minimize,
        };

        if self.peek_kind() == TokenKind::Colon {
            self.advance();
        }

        // Optional objective name: `max z = ...`
        let mut name = None;
        if self.peek_kind() == TokenKind::Ident && self.peek_kind_at(1) == TokenKind::Eq {
            name = self.advance().map(|t| t.text.clone());
            self.advance();
        }

        let expr = self.parse_expr()?;
        Ok(ObjectiveStmt {
            span: Span::new(keyword.span.start, self.previous_end()),
            sense,
            name,
            expr,
        })
    }

    fn parse_constraint_chain(&mut self) -> Result<Vec<ConstraintStmt>, ParseError> {
        let start = self.current().map(|t| t.span.start).unwrap_or(0);
        let mut lhs = self.parse_expr()?;
        if !self.peek_kind().is_relation() {
            return Err(self.unexpected("<=, >= or ="));
        }

        let mut constraints = Vec::new();
        while self.peek_kind().is_relation() {
            let relation = match self.advance().map(|t| t.kind) {
                Some(TokenKind::Le) => Relation::Le,
                Some(TokenKind::Ge) => Relation::Ge,
                _ => Relation::Eq,
            };
            let rhs = self.parse_expr()?;
            constraints.push(ConstraintStmt {
                span: Span::new(start, self.previous_end()),
                lhs,
                relation,
                rhs: rhs.clone(),
            });
            lhs = rhs;
        }
        Ok(constraints)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => {
                    self.advance();
                    BinaryOp::Mul
                }
                TokenKind::Slash => {
                    self.advance();
                    BinaryOp::Div
                }
                // Juxtaposition: `3x`, `2(x + y)`
                TokenKind::Ident | TokenKind::LParen => BinaryOp::Mul,
                _ => break,
            };
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            TokenKind::Number => {
                let token = self.advance().cloned().ok_or(ParseError::UnexpectedEof)?;
                let value: f64 = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))?;
                Ok(Expr::Number(value))
            }
            TokenKind::Ident => {
                let token = self.advance().cloned().ok_or(ParseError::UnexpectedEof)?;
                Ok(Expr::Variable(Variable {
                    span: token.span,
                    name: token.text,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(expr)))
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEof),
            _ => Err(self.unexpected("number, variable or (")),
        }
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Newline => "end of line".to_string(),
        _ => format!("'{}'", token.text),
    }
}
