// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The surface language: a scanner, a parser and an evaluator that turn
//! program text into a populated [`SnpSystem`](crate::SnpSystem).
//!
//! A program is a list of statements, one per line (or per `;`):
//!
//! ```text
//! input([0])                              // designate the input membrane
//! [2] = {'1'} * 2                         // seed membrane contents
//! <1> [0] --> out                         // a synapse on channel 1
//! [0] 'a' 'a'+ / {'a'} --> {'a'} <1>      // a regex-gated rule
//! [0] {'a'} --> lambda                    // a forgetting rule
//! [0] {'a'} --> {'1'} <1> : 2             // a rule with a firing delay
//! ```

pub mod ast;
pub mod eval;
pub mod parser;
pub mod scanner;
pub mod token;

pub use self::ast::Expr;
pub use self::eval::{Interpreter, NeuronRef, Value};
pub use self::parser::Parser;
pub use self::scanner::Scanner;
pub use self::token::{Lit, Token, TokenType};
