//! Recursive-descent parser for template expressions
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! program     := statement (';' statement)* ';'?
//! statement   := ternary ('=' statement)?        (target must be a session key)
//! ternary     := coalesce ('?' statement ':' statement)?
//! coalesce    := or ('??' or)*
//! or          := and ('||' and)*
//! and         := equality ('&&' equality)*
//! equality    := comparison (('==' | '!=') comparison)*
//! comparison  := additive (('<' | '<=' | '>' | '>=') additive)*
//! additive    := term (('+' | '-') term)*
//! term        := unary (('*' | '/' | '%') unary)*
//! unary       := ('!' | '-') unary | primary
//! primary     := literal | session | '(' statement ')'
//! session     := ('session' | 'Session') ('.' ident | '[' statement ']')
//! ```

use super::lexer::{Spanned, Token};
use super::ExprError;
use crate::session::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Session lookup; the key is any expression rendered as text
    Session(Box<Expr>),
    Assign {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Coalesce(Box<Expr>, Box<Expr>),
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

pub struct Parser {
    tokens: Vec<Spanned>,
    cursor: usize,
}

impl Parser {
    pub const fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, cursor: 0 }
    }

    /// Parse a `;`-separated statement list
    pub fn parse_program(mut self) -> Result<Vec<Expr>, ExprError> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            if self.eat(&Token::Semicolon) {
                continue;
            }
            statements.push(self.statement()?);
            if self.peek().is_some() && !self.eat(&Token::Semicolon) {
                return Err(self.unexpected());
            }
        }
        Ok(statements)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|s| s.token.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExprError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ExprError {
        self.tokens.get(self.cursor).map_or(ExprError::UnexpectedEnd, |s| {
            ExprError::UnexpectedToken {
                found: format!("{:?}", s.token),
                pos: s.pos,
            }
        })
    }

    fn statement(&mut self) -> Result<Expr, ExprError> {
        let target = self.ternary()?;
        if !self.eat(&Token::Assign) {
            return Ok(target);
        }
        match target {
            Expr::Session(key) => Ok(Expr::Assign {
                key,
                value: Box::new(self.statement()?),
            }),
            _ => Err(ExprError::InvalidAssignTarget),
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.coalesce()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.statement()?;
        self.expect(&Token::Colon)?;
        let otherwise = self.statement()?;
        Ok(Expr::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn coalesce(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.or()?;
        while self.eat(&Token::QuestionQuestion) {
            left = Expr::Coalesce(Box::new(left), Box::new(self.or()?));
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and()?;
        while self.eat(&Token::OrOr) {
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.binary_level(0)?;
        while self.eat(&Token::AndAnd) {
            left = Expr::And(Box::new(left), Box::new(self.binary_level(0)?));
        }
        Ok(left)
    }

    /// Left-associative binary levels: equality, comparison, additive, term
    fn binary_level(&mut self, level: usize) -> Result<Expr, ExprError> {
        if level == BINARY_LEVELS.len() {
            return self.unary();
        }
        let mut left = self.binary_level(level + 1)?;
        loop {
            let op = BINARY_LEVELS[level]
                .iter()
                .find(|(token, _)| self.peek() == Some(token))
                .map(|(_, op)| *op);
            let Some(op) = op else {
                return Ok(left);
            };
            self.cursor += 1;
            let right = self.binary_level(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        match token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::LParen => {
                let inner = self.statement()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "session" | "Session" => self.session_key(),
                _ => Err(ExprError::UnknownIdentifier(name)),
            },
            _ => {
                self.cursor -= 1;
                Err(self.unexpected())
            }
        }
    }

    fn session_key(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Dot) {
            return match self.advance() {
                Some(Token::Ident(key)) => {
                    Ok(Expr::Session(Box::new(Expr::Literal(Value::Str(key)))))
                }
                Some(_) => {
                    self.cursor -= 1;
                    Err(self.unexpected())
                }
                None => Err(ExprError::UnexpectedEnd),
            };
        }
        if self.eat(&Token::LBracket) {
            let key = self.statement()?;
            self.expect(&Token::RBracket)?;
            return Ok(Expr::Session(Box::new(key)));
        }
        Err(self.unexpected())
    }
}

const BINARY_LEVELS: [&[(Token, BinaryOp)]; 4] = [
    &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
    &[
        (Token::Lt, BinaryOp::Lt),
        (Token::Le, BinaryOp::Le),
        (Token::Gt, BinaryOp::Gt),
        (Token::Ge, BinaryOp::Ge),
    ],
    &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
    &[
        (Token::Star, BinaryOp::Mul),
        (Token::Slash, BinaryOp::Div),
        (Token::Percent, BinaryOp::Rem),
    ],
];
