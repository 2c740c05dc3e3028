// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::{Error, Result};
use crate::lang::ast::Expr;
use crate::lang::token::{Token, TokenType};

/// A recursive-descent parser over the scanner's tokens.
///
/// Statements are synapses, productions, or plain expressions. Telling a
/// production `[0] {'a'} --> …` from an expression statement `[0] = …`
/// needs unbounded lookahead, so the production rule parses speculatively
/// and rewinds to a checkpoint when it realizes it is looking at something
/// else; the expression grammar then takes over.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, current: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenType::Eof
    }

    fn advance(&mut self) -> Token {
        if !self.at_end() {
            self.current += 1;
        }
        self.tokens[self.current - 1].clone()
    }

    fn check(&self, kind: TokenType, d: usize) -> bool {
        self.tokens
            .get(self.current + d)
            .map_or(false, |t| t.kind == kind)
    }

    fn match_one(&mut self, kind: TokenType) -> bool {
        if self.check(kind, 0) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, token: &Token, message: &str) -> Error {
        if token.kind == TokenType::Eof {
            Error::syntax(
                "parser",
                format!("{} at end of file (line {})", message, token.line),
            )
        } else {
            Error::syntax(
                "parser",
                format!("{} at {:?} (line {})", message, token.lexeme, token.line),
            )
        }
    }

    fn error_here(&self, message: &str) -> Error {
        self.error(self.peek(), message)
    }

    fn consume(&mut self, kind: TokenType, message: &str) -> Result<Token> {
        if self.check(kind, 0) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    pub fn parse(mut self) -> Result<Vec<Expr>> {
        let mut statements = Vec::new();
        while !self.at_end() {
            if self.match_one(TokenType::End) {
                continue;
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Expr> {
        let statement = if self.check(TokenType::OpenChannel, 0) {
            self.synapse()?
        } else if let Some(production) = self.production()? {
            production
        } else {
            self.expression()?
        };
        if !self.at_end() && !self.match_one(TokenType::End) {
            return Err(self.error_here("Semicolon or end of line expected"));
        }
        Ok(statement)
    }

    fn synapse(&mut self) -> Result<Expr> {
        let channel = self.channel()?;
        let left = if self.check(TokenType::OpenMembrane, 0) {
            self.membrane()?
        } else {
            self.identifier()?
        };
        self.consume(TokenType::Then, "Then expression (\"-->\") expected")?;
        let right = if self.check(TokenType::OpenMembrane, 0) {
            self.membrane()?
        } else {
            self.identifier()?
        };
        Ok(Expr::Synapse {
            channel: Box::new(channel),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn membrane(&mut self) -> Result<Expr> {
        self.advance();
        let index = self.expression()?;
        self.consume(TokenType::CloseMembrane, "Close membrane expected")?;
        Ok(Expr::Membrane(Box::new(index)))
    }

    fn channel(&mut self) -> Result<Expr> {
        self.advance();
        let index = self.expression()?;
        self.consume(TokenType::CloseChannel, "Close channel expected")?;
        Ok(Expr::Channel(Box::new(index)))
    }

    fn identifier(&mut self) -> Result<Expr> {
        if self.check(TokenType::OpenParen, 1) {
            return self.function_call();
        }
        Ok(Expr::Identifier(self.advance()))
    }

    fn function_call(&mut self) -> Result<Expr> {
        let callee = self.advance();
        self.advance(); // the opening parenthesis
        if self.match_one(TokenType::CloseParen) {
            return Ok(Expr::Call {
                callee,
                args: Vec::new(),
            });
        }
        let mut args = vec![self.expression()?];
        while self.match_one(TokenType::Comma) {
            args.push(self.expression()?);
        }
        self.consume(TokenType::CloseParen, "Closing parenthesis expected.")?;
        Ok(Expr::Call { callee, args })
    }

    /// Tries to parse a production, rewinding and handing back `None` when
    /// the tokens turn out to be something else.
    fn production(&mut self) -> Result<Option<Expr>> {
        let checkpoint = self.current;
        match self.production_inner() {
            Ok(Some(p)) => Ok(Some(p)),
            Ok(None) | Err(_) => {
                self.current = checkpoint;
                Ok(None)
            }
        }
    }

    fn production_inner(&mut self) -> Result<Option<Expr>> {
        if !self.check(TokenType::OpenMembrane, 0) {
            return Ok(None);
        }
        let membrane = self.membrane()?;
        let items = self.regex()?;
        // Without a `/` this can still be a rule (`[0] {'a'} --> …`), but a
        // regex or a `=` means we are looking at an expression statement.
        if !self.match_one(TokenType::Div) && (!items.is_empty() || self.check(TokenType::Equal, 0))
        {
            return Ok(None);
        }
        let regex = if items.is_empty() {
            None
        } else {
            Some(Box::new(Expr::Regex(items)))
        };
        let consumed = self.expression()?;
        if !self.match_one(TokenType::Then) {
            return Err(self.error_here("Then expression (\"-->\") expected"));
        }

        if self.match_one(TokenType::Lambda) {
            if regex.is_some() {
                return Err(self.error_here("Forgetting rules can not have regular expression"));
            }
            return Ok(Some(Expr::Production {
                membrane: Box::new(membrane),
                regex: None,
                consumed: Box::new(consumed),
                channels: Vec::new(),
                block: Box::new(Expr::Literal(crate::lang::token::Lit::Int(0))),
            }));
        }

        let mut channels = vec![self.payload()?];
        while self.match_one(TokenType::Comma) {
            channels.push(self.payload()?);
        }

        let block = if self.match_one(TokenType::Colon) {
            self.expression()?
        } else {
            Expr::Literal(crate::lang::token::Lit::Int(0))
        };

        Ok(Some(Expr::Production {
            membrane: Box::new(membrane),
            regex,
            consumed: Box::new(consumed),
            channels,
            block: Box::new(block),
        }))
    }

    fn payload(&mut self) -> Result<(Expr, Expr)> {
        let send = self.expression()?;
        if !self.check(TokenType::OpenChannel, 0) {
            return Err(self.error_here("Channel expected"));
        }
        let channel = self.channel()?;
        Ok((send, channel))
    }

    fn regex(&mut self) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        while let Some(item) = self.regex_expr()? {
            items.push(item);
        }
        Ok(items)
    }

    fn regex_expr(&mut self) -> Result<Option<Expr>> {
        let mut expr = if self.check(TokenType::OpenParen, 0) {
            self.advance();
            let items = self.regex()?;
            self.consume(TokenType::CloseParen, "Closing parenthesis expected")?;
            Some(Expr::Grouping(Box::new(Expr::Regex(items))))
        } else if self.check(TokenType::Symbol, 0) {
            let token = self.advance();
            let lit = token.literal.clone().expect("symbol tokens carry a literal");
            Some(Expr::Literal(lit))
        } else {
            None
        };

        if expr.is_some() && (self.check(TokenType::Mult, 0) || self.check(TokenType::Plus, 0)) {
            let op = self.advance();
            expr = Some(Expr::Unary {
                op,
                expr: Box::new(expr.take().expect("checked just above")),
            });
        }
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let checkpoint = self.current;
        if self.check(TokenType::Identifier, 0) || self.check(TokenType::OpenMembrane, 0) {
            let target = if self.check(TokenType::Identifier, 0) {
                self.identifier()?
            } else {
                self.membrane()?
            };
            if self.peek().kind.is_assignment() {
                let op = self.advance();
                let value = self.assignment()?;
                return Ok(Expr::Binary {
                    left: Box::new(target),
                    op,
                    right: Box::new(value),
                });
            }
            self.current = checkpoint;
        }
        self.logical()
    }

    fn logical(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;
        while self.check(TokenType::Union, 0) || self.check(TokenType::Intersection, 0) {
            let op = self.advance();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;
        while self.check(TokenType::Minus, 0) || self.check(TokenType::Plus, 0) {
            let op = self.advance();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;
        while self.check(TokenType::Div, 0)
            || self.check(TokenType::Mult, 0)
            || self.check(TokenType::Mod, 0)
        {
            let op = self.advance();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.check(TokenType::Minus, 0) {
            let op = self.advance();
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_one(TokenType::Number) || self.match_one(TokenType::Symbol) {
            let token = &self.tokens[self.current - 1];
            let lit = token.literal.clone().expect("literal tokens carry a value");
            return Ok(Expr::Literal(lit));
        }

        if self.match_one(TokenType::OpenSet) {
            if self.match_one(TokenType::CloseSet) {
                return Ok(Expr::Struct(Vec::new()));
            }
            let mut items = vec![self.expression()?];
            while self.match_one(TokenType::Comma) {
                items.push(self.expression()?);
            }
            self.consume(TokenType::CloseSet, "Expected closing set.")?;
            return Ok(Expr::Struct(items));
        }

        if self.check(TokenType::Identifier, 0) {
            return self.identifier();
        }
        if self.check(TokenType::OpenMembrane, 0) {
            return self.membrane();
        }

        if self.match_one(TokenType::OpenParen) {
            let expr = self.expression()?;
            self.consume(TokenType::CloseParen, "Expected closing parenthesis.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(self.error_here("Expected expression."))
    }
}
