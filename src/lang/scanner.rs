// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::{Error, Result};
use crate::lang::token::{Lit, Token, TokenType};

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenType> = {
        let mut m = HashMap::new();
        m.insert("lambda", TokenType::Lambda);
        m
    };
}

/// A hand-rolled lexer over the program source.
///
/// Newlines and `;` both produce `End` tokens; `//` comments run to the end
/// of the line. Symbols are quoted (`'a'`, `'spike_1'`), numbers are
/// decimal integers, everything else word-shaped is an identifier or a
/// keyword.
pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Scanner {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        self.current += 1;
        self.source[self.current - 1]
    }

    fn peek(&self, d: usize) -> Option<char> {
        self.source.get(self.current + d).copied()
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek(0) == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenType, literal: Option<Lit>) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, literal, self.line));
    }

    /// Consumes the run of word characters starting at `start`.
    fn word(&mut self) -> String {
        while matches!(self.peek(0), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        self.lexeme()
    }

    fn number(&mut self) -> Result<()> {
        while matches!(self.peek(0), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        let value: i64 = self.lexeme().parse().map_err(|_| {
            Error::syntax(
                "scanner",
                format!("number literal too large on line {}", self.line),
            )
        })?;
        self.add_token(TokenType::Number, Some(Lit::Int(value)));
        Ok(())
    }

    fn identifier(&mut self) {
        let word = self.word();
        match KEYWORDS.get(word.as_str()) {
            Some(&kind) => self.add_token(kind, None),
            None => self.add_token(TokenType::Identifier, None),
        }
    }

    /// A quoted symbol: `'` word `'`.
    fn quoted_symbol(&mut self) -> Result<()> {
        self.start = self.current;
        let word = self.word();
        if !self.match_next('\'') {
            return Err(Error::syntax(
                "scanner",
                format!("unterminated symbol on line {}", self.line),
            ));
        }
        self.tokens.push(Token::new(
            TokenType::Symbol,
            word.clone(),
            Some(Lit::Str(word)),
            self.line,
        ));
        Ok(())
    }

    fn ignore_line(&mut self) {
        while !self.at_end() {
            if self.advance() == '\n' {
                self.line += 1;
                self.tokens
                    .push(Token::new(TokenType::End, "\n", None, self.line));
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<()> {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenType::OpenParen, None),
            ')' => self.add_token(TokenType::CloseParen, None),
            '{' => self.add_token(TokenType::OpenSet, None),
            '}' => self.add_token(TokenType::CloseSet, None),
            '[' => self.add_token(TokenType::OpenMembrane, None),
            ']' => self.add_token(TokenType::CloseMembrane, None),
            '<' => self.add_token(TokenType::OpenChannel, None),
            '>' => self.add_token(TokenType::CloseChannel, None),
            ',' => self.add_token(TokenType::Comma, None),
            ';' => self.add_token(TokenType::End, None),
            ':' => self.add_token(TokenType::Colon, None),
            '=' => self.add_token(TokenType::Equal, None),
            '*' => {
                if self.match_next('=') {
                    self.add_token(TokenType::MultEqual, None);
                } else {
                    self.add_token(TokenType::Mult, None);
                }
            }
            '%' => {
                if self.match_next('=') {
                    self.add_token(TokenType::ModEqual, None);
                } else {
                    self.add_token(TokenType::Mod, None);
                }
            }
            '+' => {
                if self.match_next('=') {
                    self.add_token(TokenType::PlusEqual, None);
                } else {
                    self.add_token(TokenType::Plus, None);
                }
            }
            '-' => {
                if self.peek(0) == Some('-') && self.peek(1) == Some('>') {
                    self.advance();
                    self.advance();
                    self.add_token(TokenType::Then, None);
                } else if self.match_next('=') {
                    self.add_token(TokenType::MinusEqual, None);
                } else {
                    self.add_token(TokenType::Minus, None);
                }
            }
            '/' => {
                if self.match_next('/') {
                    self.ignore_line();
                } else if self.match_next('=') {
                    self.add_token(TokenType::DivEqual, None);
                } else {
                    self.add_token(TokenType::Div, None);
                }
            }
            '|' => {
                if self.match_next('=') {
                    self.add_token(TokenType::UnionEqual, None);
                } else {
                    self.add_token(TokenType::Union, None);
                }
            }
            '&' => {
                if self.match_next('=') {
                    self.add_token(TokenType::IntersectionEqual, None);
                } else {
                    self.add_token(TokenType::Intersection, None);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
                self.add_token(TokenType::End, None);
            }
            '\'' => self.quoted_symbol()?,
            c if c.is_ascii_digit() => self.number()?,
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            c => {
                return Err(Error::syntax(
                    "scanner",
                    format!("unknown character {:?} on line {}", c, self.line),
                ))
            }
        }
        Ok(())
    }

    pub fn scan(mut self) -> Result<Vec<Token>> {
        while !self.at_end() {
            self.start = self.current;
            self.next_token()?;
        }
        self.tokens
            .push(Token::new(TokenType::Eof, "", None, self.line));
        Ok(self.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenType::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        Scanner::new(source)
            .scan()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != End)
            .collect()
    }

    #[test]
    fn scans_a_rule_statement() {
        assert_eq!(
            kinds("[0] 'a' / {'a'} --> {'1'} <1>"),
            vec![
                OpenMembrane,
                Number,
                CloseMembrane,
                Symbol,
                Div,
                OpenSet,
                Symbol,
                CloseSet,
                Then,
                OpenSet,
                Symbol,
                CloseSet,
                OpenChannel,
                Number,
                CloseChannel,
                Eof,
            ]
        );
    }

    #[test]
    fn arrow_binds_before_minus() {
        assert_eq!(kinds("a --> b"), vec![Identifier, Then, Identifier, Eof]);
        assert_eq!(kinds("a - b"), vec![Identifier, Minus, Identifier, Eof]);
        assert_eq!(kinds("a -= b"), vec![Identifier, MinusEqual, Identifier, Eof]);
    }

    #[test]
    fn symbols_carry_their_text() {
        let tokens = Scanner::new("'spike_1'").scan().unwrap();
        assert_eq!(tokens[0].kind, Symbol);
        assert_eq!(tokens[0].literal, Some(Lit::Str("spike_1".to_owned())));
    }

    #[test]
    fn numbers_carry_their_value() {
        let tokens = Scanner::new("42").scan().unwrap();
        assert_eq!(tokens[0].literal, Some(Lit::Int(42)));
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("1 // everything here disappears\n2"),
            vec![Number, Number, Eof]
        );
    }

    #[test]
    fn lambda_is_a_keyword() {
        assert_eq!(kinds("lambda lambdas"), vec![Lambda, Identifier, Eof]);
    }

    #[test]
    fn compound_assignments() {
        assert_eq!(
            kinds("x |= y &= z *= 2"),
            vec![
                Identifier,
                UnionEqual,
                Identifier,
                IntersectionEqual,
                Identifier,
                MultEqual,
                Number,
                Eof
            ]
        );
    }

    #[test]
    fn unknown_character_is_an_error() {
        let err = Scanner::new("a $ b").scan().unwrap_err();
        assert!(err.to_string().contains("SyntaxError (scanner)"));
    }

    #[test]
    fn unterminated_symbol_is_an_error() {
        assert!(Scanner::new("'oops").scan().is_err());
    }

    #[test]
    fn lines_are_tracked() {
        let tokens = Scanner::new("1\n2\n3").scan().unwrap();
        let lines: Vec<usize> = tokens
            .iter()
            .filter(|t| t.kind == Number)
            .map(|t| t.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }
}
