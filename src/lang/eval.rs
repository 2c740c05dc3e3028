// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Display};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::lang::ast::Expr;
use crate::lang::token::{Lit, Token, TokenType};
use crate::multiset::Multiset;
use crate::regex::RegexToken;
use crate::system::SnpSystem;

/// A neuron reference in the surface language: a numbered membrane or the
/// output sentinel `out`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NeuronRef {
    Membrane(i64),
    Out,
}

impl Display for NeuronRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeuronRef::Membrane(i) => write!(f, "{}", i),
            NeuronRef::Out => f.write_str("out"),
        }
    }
}

/// A runtime value of the surface language.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Symbol(String),
    Multiset(Multiset<String>),
    Regex(Vec<RegexToken<String>>),
    Membrane(NeuronRef),
    Channel(i64),
    None,
}

impl Value {
    /// The value kind as it appears in type error messages.
    fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Symbol(_) => "Symbol",
            Value::Multiset(_) => "Multiset",
            Value::Regex(_) => "Regex",
            Value::Membrane(_) => "Membrane",
            Value::Channel(_) => "Channel",
            Value::None => "None",
        }
    }
}

/// An assignable location: a variable or a membrane's contents.
enum Place {
    Var(String),
    Mem(NeuronRef),
}

/// Walks a parsed program and populates an [`SnpSystem`] through its build
/// API.
///
/// Variables live in a flat store; membrane contents are accumulated
/// separately and handed to the system when the program ends. The output
/// neuron defaults to the `out` sentinel, and `input`/`output` are the two
/// builtin functions that re-designate the I/O neurons.
pub struct Interpreter {
    vars: HashMap<String, Value>,
    membranes: BTreeMap<NeuronRef, Multiset<String>>,
    system: SnpSystem<String, NeuronRef, i64>,
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Interpreter {
        let mut system = SnpSystem::new();
        system.set_output(NeuronRef::Out);
        Interpreter {
            vars: HashMap::new(),
            membranes: BTreeMap::new(),
            system,
        }
    }

    /// Evaluates every statement, then seeds the system with the membrane
    /// contents the program accumulated and hands the populated model back.
    pub fn run(mut self, program: &[Expr]) -> Result<SnpSystem<String, NeuronRef, i64>> {
        for statement in program {
            self.eval(statement)?;
        }
        let membranes = std::mem::take(&mut self.membranes);
        for (n, m) in membranes {
            self.system.add_symbols(n, m.iter().cloned());
        }
        Ok(self.system)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(Lit::Int(i)) => Ok(Value::Int(*i)),
            Expr::Literal(Lit::Str(s)) => Ok(Value::Symbol(s.clone())),

            Expr::Grouping(inner) => match self.eval(inner)? {
                Value::Regex(tokens) => {
                    let mut grouped = vec![RegexToken::Open];
                    grouped.extend(tokens);
                    grouped.push(RegexToken::Close);
                    Ok(Value::Regex(grouped))
                }
                v => Ok(v),
            },

            Expr::Unary { op, expr } => self.eval_unary(op, expr),

            Expr::Identifier(token) => {
                let name = token.lexeme.as_str();
                if name == "out" {
                    return Ok(Value::Membrane(NeuronRef::Out));
                }
                match self.vars.get(name) {
                    Some(v) => Ok(v.clone()),
                    None => Err(Error::Name(name.to_owned())),
                }
            }

            Expr::Struct(items) => {
                let mut m = Multiset::new();
                for item in items {
                    match self.eval(item)? {
                        Value::Symbol(s) => m.add(s),
                        v => {
                            return Err(Error::Type(format!(
                                "Expected multiset items to be symbol but {} found",
                                v.kind()
                            )))
                        }
                    }
                }
                Ok(Value::Multiset(m))
            }

            Expr::Membrane(index) => match self.eval(index)? {
                Value::Int(i) => Ok(Value::Membrane(NeuronRef::Membrane(i))),
                _ => Err(Error::Type(
                    "Can not get a membrane with a non int index".to_owned(),
                )),
            },

            Expr::Channel(index) => match self.eval(index)? {
                Value::Int(i) => Ok(Value::Channel(i)),
                _ => Err(Error::Type(
                    "Can not get a channel with a non int index".to_owned(),
                )),
            },

            Expr::Call { callee, args } => self.eval_call(callee, args),

            Expr::Regex(items) => {
                let mut tokens = Vec::new();
                for item in items {
                    match self.eval(item)? {
                        Value::Symbol(s) => tokens.push(RegexToken::Symbol(s)),
                        Value::Regex(inner) => tokens.extend(inner),
                        v => {
                            return Err(Error::Type(format!(
                                "Expected regex or symbol but {} found",
                                v.kind()
                            )))
                        }
                    }
                }
                Ok(Value::Regex(tokens))
            }

            Expr::Synapse {
                channel,
                left,
                right,
            } => {
                let left = self.as_membrane(left, "left")?;
                let right = self.as_membrane(right, "right")?;
                let channel = match self.eval(channel)? {
                    Value::Channel(c) => c,
                    v => {
                        return Err(Error::Type(format!(
                            "Expected channel as production label but {} found",
                            v.kind()
                        )))
                    }
                };
                debug!(
                    "new synapse on channel {} from membrane {} to membrane {}",
                    channel, left, right
                );
                self.system.add_channel(channel, left, right)?;
                Ok(Value::None)
            }

            Expr::Production {
                membrane,
                regex,
                consumed,
                channels,
                block,
            } => {
                let membrane = self.as_membrane(membrane, "membrane")?;
                let regex = match regex {
                    Some(r) => match self.eval(r)? {
                        Value::Regex(tokens) => Some(tokens),
                        v => {
                            return Err(Error::Type(format!(
                                "Expected regex or symbol but {} found",
                                v.kind()
                            )))
                        }
                    },
                    None => None,
                };
                let consumed = self.as_multiset(consumed)?;
                let mut payloads = BTreeMap::<i64, Multiset<String>>::new();
                for (send, channel) in channels {
                    let send = self.as_multiset(send)?;
                    let channel = match self.eval(channel)? {
                        Value::Channel(c) => c,
                        v => {
                            return Err(Error::Type(format!(
                                "Expected channel as production label but {} found",
                                v.kind()
                            )))
                        }
                    };
                    *payloads.entry(channel).or_default() += &send;
                }
                let block = match self.eval(block)? {
                    Value::Int(i) if i >= 0 => i as u32,
                    Value::Int(_) => {
                        return Err(Error::Type("Block delay can not be negative".to_owned()))
                    }
                    v => {
                        return Err(Error::Type(format!(
                            "Expected int as block delay but {} found",
                            v.kind()
                        )))
                    }
                };
                debug!(
                    "new production on membrane {} consuming {} over {} channels, delay {}",
                    membrane,
                    consumed,
                    payloads.len(),
                    block
                );
                self.system
                    .add_rule(membrane, regex.as_deref(), consumed, payloads, block)?;
                Ok(Value::None)
            }

            Expr::Binary { left, op, right } => {
                if op.kind.is_assignment() {
                    self.eval_assignment(left, op, right)
                } else {
                    let l = self.eval(left)?;
                    let l = self.materialize(l);
                    let r = self.eval(right)?;
                    let r = self.materialize(r);
                    calc(l, op, r)
                }
            }
        }
    }

    fn eval_unary(&mut self, op: &Token, expr: &Expr) -> Result<Value> {
        let value = self.eval(expr)?;
        match op.kind {
            TokenType::Minus => match value {
                Value::Int(i) => Ok(Value::Int(-i)),
                _ => Err(Error::Type(
                    "Can not apply minus operator to a non int value".to_owned(),
                )),
            },
            TokenType::Mult => match value {
                Value::Symbol(s) => Ok(Value::Regex(vec![RegexToken::Symbol(s), RegexToken::Star])),
                Value::Regex(mut tokens) => {
                    tokens.push(RegexToken::Star);
                    Ok(Value::Regex(tokens))
                }
                _ => Err(Error::Type(
                    "Can not use the star regex operator with non regex or symbol expression"
                        .to_owned(),
                )),
            },
            TokenType::Plus => match value {
                Value::Symbol(s) => Ok(Value::Regex(vec![RegexToken::Symbol(s), RegexToken::Plus])),
                Value::Regex(mut tokens) => {
                    tokens.push(RegexToken::Plus);
                    Ok(Value::Regex(tokens))
                }
                _ => Err(Error::Type(
                    "Can not use the plus regex operator with non regex or symbol expression"
                        .to_owned(),
                )),
            },
            kind => Err(Error::unexpected(
                "interpreter",
                format!("unknown unary operator {:?}", kind),
            )),
        }
    }

    fn eval_call(&mut self, callee: &Token, args: &[Expr]) -> Result<Value> {
        let name = callee.lexeme.as_str();
        if let Some(v) = self.vars.get(name) {
            return Err(Error::Type(format!(
                "Expected function but {} found",
                v.kind()
            )));
        }
        match name {
            "input" | "output" => {
                if args.len() != 1 {
                    return Err(Error::Type(format!(
                        "The {} function takes exactly one argument",
                        name
                    )));
                }
                let arg = self.eval(&args[0])?;
                let Value::Membrane(m) = arg else {
                    return Err(Error::Type(format!(
                        "The argument of the {} function should be a Membrane",
                        name
                    )));
                };
                if name == "input" {
                    debug!("input membrane set to [{}]", m);
                    self.system.set_input(m);
                } else {
                    debug!("output membrane set to [{}]", m);
                    self.system.set_output(m);
                }
                Ok(Value::None)
            }
            _ => Err(Error::Name(name.to_owned())),
        }
    }

    fn eval_assignment(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value> {
        let place = self.eval_place(left)?;
        let rhs = self.eval(right)?;
        let rhs = self.materialize(rhs);
        let value = if op.kind == TokenType::Equal {
            rhs
        } else {
            let current = self.read_place(&place)?;
            calc(current, op, rhs)?
        };
        self.write_place(place, value)?;
        Ok(Value::None)
    }

    fn eval_place(&mut self, expr: &Expr) -> Result<Place> {
        match expr {
            Expr::Identifier(token) => Ok(Place::Var(token.lexeme.clone())),
            Expr::Membrane(index) => match self.eval(index)? {
                Value::Int(i) => Ok(Place::Mem(NeuronRef::Membrane(i))),
                _ => Err(Error::Type(
                    "Can not get a membrane with a non int index".to_owned(),
                )),
            },
            _ => Err(Error::unexpected(
                "interpreter",
                "Trying to set value of a non variable object",
            )),
        }
    }

    fn read_place(&self, place: &Place) -> Result<Value> {
        match place {
            Place::Var(name) => match self.vars.get(name) {
                Some(v) => Ok(v.clone()),
                None => Err(Error::Name(name.clone())),
            },
            Place::Mem(n) => Ok(Value::Multiset(
                self.membranes.get(n).cloned().unwrap_or_default(),
            )),
        }
    }

    fn write_place(&mut self, place: Place, value: Value) -> Result<()> {
        match place {
            Place::Var(name) => {
                trace!("var {} = {:?}", name, value);
                self.vars.insert(name, value);
                Ok(())
            }
            Place::Mem(n) => match value {
                Value::Multiset(m) => {
                    trace!("membrane {} = {}", n, m);
                    self.membranes.insert(n, m);
                    Ok(())
                }
                _ => Err(Error::Type(
                    "Trying to set membrane value as a non multiset object".to_owned(),
                )),
            },
        }
    }

    /// Membranes used as values stand for their contents.
    fn materialize(&self, value: Value) -> Value {
        match value {
            Value::Membrane(n) => {
                Value::Multiset(self.membranes.get(&n).cloned().unwrap_or_default())
            }
            v => v,
        }
    }

    fn as_membrane(&mut self, expr: &Expr, side: &str) -> Result<NeuronRef> {
        match self.eval(expr)? {
            Value::Membrane(m) => Ok(m),
            v => Err(Error::Type(format!(
                "Expected membrane as {} production part but {} found",
                side,
                v.kind()
            ))),
        }
    }

    fn as_multiset(&mut self, expr: &Expr) -> Result<Multiset<String>> {
        let value = self.eval(expr)?;
        match self.materialize(value) {
            Value::Multiset(m) => Ok(m),
            v => Err(Error::Type(format!(
                "Expected multiset but {} found",
                v.kind()
            ))),
        }
    }
}

/// Applies a (possibly compound-assignment) binary operator to two values.
fn calc(left: Value, op: &Token, right: Value) -> Result<Value> {
    use TokenType::*;

    let undefined = |sign: char, l: &Value, r: &Value| {
        Err(Error::Type(format!(
            "The {} operator is not defined for {} and {}",
            sign,
            l.kind(),
            r.kind()
        )))
    };

    match op.kind {
        Union | UnionEqual => match (&left, &right) {
            (Value::Multiset(l), Value::Multiset(r)) => Ok(Value::Multiset(l.union(r))),
            _ => Err(Error::Type(
                "The union operator can only be used with multisets".to_owned(),
            )),
        },
        Intersection | IntersectionEqual => match (&left, &right) {
            (Value::Multiset(l), Value::Multiset(r)) => Ok(Value::Multiset(l.intersection(r))),
            _ => Err(Error::Type(
                "The intersection operator can only be used with multisets".to_owned(),
            )),
        },
        Plus | PlusEqual => match (&left, &right) {
            (Value::Multiset(l), Value::Multiset(r)) => Ok(Value::Multiset(l + r)),
            (Value::Symbol(l), Value::Symbol(r)) => Ok(Value::Symbol(format!("{}{}", l, r))),
            (Value::Symbol(l), Value::Int(r)) => Ok(Value::Symbol(format!("{}{}", l, r))),
            (Value::Int(l), Value::Symbol(r)) => Ok(Value::Symbol(format!("{}{}", l, r))),
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l + r)),
            _ => undefined('+', &left, &right),
        },
        Minus | MinusEqual => match (&left, &right) {
            (Value::Multiset(l), Value::Multiset(r)) => Ok(Value::Multiset(l - r)),
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l - r)),
            _ => undefined('-', &left, &right),
        },
        Div | DivEqual => match (&left, &right) {
            (Value::Int(_), Value::Int(0)) => Err(Error::Type("Division by zero".to_owned())),
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.div_euclid(*r))),
            _ => undefined('/', &left, &right),
        },
        Mod | ModEqual => match (&left, &right) {
            (Value::Int(_), Value::Int(0)) => Err(Error::Type("Division by zero".to_owned())),
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.rem_euclid(*r))),
            _ => undefined('%', &left, &right),
        },
        Mult | MultEqual => match (&left, &right) {
            (Value::Multiset(l), Value::Int(r)) => Ok(Value::Multiset(l * (*r).max(0) as usize)),
            (Value::Symbol(l), Value::Int(r)) => Ok(Value::Symbol(l.repeat((*r).max(0) as usize))),
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l * r)),
            _ => undefined('*', &left, &right),
        },
        kind => Err(Error::unexpected(
            "interpreter",
            format!("unknown operand {:?}", kind),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::parser::Parser;
    use crate::lang::scanner::Scanner;
    use matches::assert_matches;

    fn build(source: &str) -> Result<SnpSystem<String, NeuronRef, i64>> {
        let tokens = Scanner::new(source).scan()?;
        let program = Parser::new(tokens).parse()?;
        Interpreter::new().run(&program)
    }

    fn ms(symbols: &[&str]) -> Multiset<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn io_membranes_are_designated() {
        let sys = build("input([0])\noutput([1])").unwrap();
        assert_eq!(sys.input(), Some(&NeuronRef::Membrane(0)));
        assert_eq!(sys.output(), Some(&NeuronRef::Membrane(1)));
    }

    #[test]
    fn output_defaults_to_the_sentinel() {
        let sys = build("input([0])").unwrap();
        assert_eq!(sys.output(), Some(&NeuronRef::Out));
    }

    #[test]
    fn membrane_assignment_seeds_contents() {
        let sys = build("[2] = {'1'} * 2").unwrap();
        assert_eq!(
            sys.contents(&NeuronRef::Membrane(2)),
            Some(&ms(&["1", "1"]))
        );
    }

    #[test]
    fn variables_and_compound_assignment() {
        let sys = build("x = 2\nx *= 3\n[0] = {'a'} * x").unwrap();
        assert_eq!(
            sys.contents(&NeuronRef::Membrane(0)).map(|m| m.len()),
            Some(6)
        );
    }

    #[test]
    fn membrane_compound_assignment_appends() {
        let sys = build("[0] = {'a'}\n[0] += {'b', 'b'}").unwrap();
        assert_eq!(
            sys.contents(&NeuronRef::Membrane(0)),
            Some(&ms(&["a", "b", "b"]))
        );
    }

    #[test]
    fn union_and_intersection() {
        let sys = build("[0] = {'a', 'a'} | {'a', 'b'}\n[1] = {'a', 'a'} & {'a', 'b'}").unwrap();
        assert_eq!(
            sys.contents(&NeuronRef::Membrane(0)),
            Some(&ms(&["a", "a", "b"]))
        );
        assert_eq!(sys.contents(&NeuronRef::Membrane(1)), Some(&ms(&["a"])));
    }

    #[test]
    fn membranes_read_as_their_contents() {
        let sys = build("[0] = {'a'}\n[1] = [0] + {'b'}").unwrap();
        assert_eq!(
            sys.contents(&NeuronRef::Membrane(1)),
            Some(&ms(&["a", "b"]))
        );
    }

    #[test]
    fn synapse_to_out_uses_the_sentinel() {
        let sys = build("<1> [0] --> out").unwrap();
        assert!(sys.neurons().any(|n| *n == NeuronRef::Out));
        assert!(sys.neurons().any(|n| *n == NeuronRef::Membrane(0)));
    }

    #[test]
    fn circular_synapse_surfaces_the_builder_error() {
        let err = build("<1> [0] --> [0]").unwrap_err();
        assert_matches!(err, Error::CircularSinapsis(_));
    }

    #[test]
    fn synapse_from_out_is_an_env_error() {
        let err = build("<1> out --> [0]").unwrap_err();
        assert_matches!(err, Error::EnvValue(_));
    }

    #[test]
    fn unknown_variable_is_a_name_error() {
        let err = build("[0] = nope").unwrap_err();
        assert_eq!(err, Error::Name("nope".to_owned()));
    }

    #[test]
    fn unknown_function_is_a_name_error() {
        let err = build("setup([0])").unwrap_err();
        assert_eq!(err, Error::Name("setup".to_owned()));
    }

    #[test]
    fn calling_a_variable_is_a_type_error() {
        let err = build("f = 1\nf(2)").unwrap_err();
        assert_matches!(err, Error::Type(_));
    }

    #[test]
    fn input_wants_a_membrane() {
        let err = build("input(3)").unwrap_err();
        assert_matches!(err, Error::Type(_));
    }

    #[test]
    fn adding_multiset_and_int_is_a_type_error() {
        let err = build("[0] = {'a'} + 1").unwrap_err();
        assert_eq!(
            err,
            Error::Type("The + operator is not defined for Multiset and Int".to_owned())
        );
    }

    #[test]
    fn symbol_arithmetic() {
        let sys = build("[0] = {'a' + 1, 'b' * 2}").unwrap();
        assert_eq!(
            sys.contents(&NeuronRef::Membrane(0)),
            Some(&ms(&["a1", "bb"]))
        );
    }

    #[test]
    fn negative_block_delay_is_a_type_error() {
        let err = build("[0] {'a'} --> {'1'} <1> : -1").unwrap_err();
        assert_matches!(err, Error::Type(_));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let err = build("x = 1 / 0").unwrap_err();
        assert_matches!(err, Error::Type(_));
    }

    #[test]
    fn productions_and_forgetting_rules_build() {
        build(
            "input([0])\n\
             <1> [0] --> out\n\
             [0] 'a' 'a'+ / {'a'} --> {'a'} <1>\n\
             [0] {'a'} --> lambda\n",
        )
        .unwrap();
    }

    #[test]
    fn multiset_times_multiset_is_a_type_error() {
        let err = build("[0] = {'a'} * {'b'}").unwrap_err();
        assert_matches!(err, Error::Type(_));
    }
}
