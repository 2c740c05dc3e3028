// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt::Display;
use std::io::{self, Write};

use bit_set::BitSet;

use crate::automata::dot::GraphWriter;
use crate::error::{Error, Result};
use crate::regex::RegexToken;
use crate::Alphabet;

#[derive(Clone, Debug, PartialEq)]
pub struct EnfaState<A> {
    /// Symbol transitions; duplicate entries for the first component are
    /// allowed, that is what makes this automaton nondeterministic.
    pub(crate) edges: Vec<(A, usize)>,
    /// ε-successors, kept apart from the symbol edges so that closure
    /// computations need not filter.
    pub(crate) eps: Vec<usize>,
}

impl<A> Default for EnfaState<A> {
    fn default() -> Self {
        EnfaState {
            edges: Vec::new(),
            eps: Vec::new(),
        }
    }
}

/// A nondeterministic finite automaton with ε-transitions.
///
/// `Enfa` is the target of the Thompson construction in [`Enfa::from_regex`]
/// and exists only to be converted onwards; it cannot run words itself.
/// States live in a `Vec` and are identified by index, with the initial
/// state always at index zero. Concatenation splices one arena into another
/// by shifting indices, so sub-automata never share states.
#[derive(Clone, Debug, PartialEq)]
pub struct Enfa<A: Alphabet> {
    pub(crate) states: Vec<EnfaState<A>>,
    pub(crate) finals: BitSet,
}

impl<A: Alphabet> Enfa<A> {
    /// Creates the automaton accepting exactly the empty word: a single
    /// state, both initial and final.
    pub fn empty_word() -> Enfa<A> {
        let mut finals = BitSet::new();
        finals.insert(0);
        Enfa {
            states: vec![EnfaState::default()],
            finals,
        }
    }

    /// Creates the automaton accepting exactly the one-symbol word `a`.
    fn symbol(a: A) -> Enfa<A> {
        let mut finals = BitSet::new();
        finals.insert(1);
        Enfa {
            states: vec![
                EnfaState {
                    edges: vec![(a, 1)],
                    eps: Vec::new(),
                },
                EnfaState::default(),
            ],
            finals,
        }
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Compiles a tokenized regex.
    ///
    /// The construction is Thompson-style, processed left to right: each
    /// atom (a symbol, or a parenthesized group) becomes a fresh
    /// sub-automaton, a postfix `*` or `+` loops its finals back to its
    /// initial state, and the result is concatenated with the rest of the
    /// tokens through ε-bridges. A lone symbol under `*` or `+` is built
    /// directly as a self-loop instead of going through the group rule; the
    /// accepted language is the same either way.
    pub fn from_regex(tokens: &[RegexToken<A>]) -> Result<Enfa<A>> {
        use crate::regex::RegexToken::*;
        match tokens {
            [] => Ok(Enfa::empty_word()),
            [Symbol(a)] => Ok(Enfa::symbol(a.clone())),
            [Open, ..] => {
                let close = matching_close(tokens)?;
                let mut left = Enfa::from_regex(&tokens[1..close])?;
                let mut tail = close + 1;
                match tokens.get(tail) {
                    Some(Star) => {
                        left.loop_back();
                        left.finals.insert(0);
                        tail += 1;
                    }
                    Some(Plus) => {
                        left.loop_back();
                        tail += 1;
                    }
                    _ => {}
                }
                Ok(left.concat(Enfa::from_regex(&tokens[tail..])?))
            }
            [Symbol(a), Star, rest @ ..] => {
                let mut left = Enfa::empty_word();
                left.states[0].edges.push((a.clone(), 0));
                Ok(left.concat(Enfa::from_regex(rest)?))
            }
            [Symbol(a), Plus, rest @ ..] => {
                let mut left = Enfa::symbol(a.clone());
                left.states[1].edges.push((a.clone(), 1));
                Ok(left.concat(Enfa::from_regex(rest)?))
            }
            [Symbol(a), rest @ ..] => Ok(Enfa::symbol(a.clone()).concat(Enfa::from_regex(rest)?)),
            [Star | Plus, ..] => Err(Error::syntax(
                "builder",
                "regex operator with no preceding atom",
            )),
            [Close, ..] => Err(Error::syntax(
                "builder",
                "unmatched closing parenthesis in regex",
            )),
        }
    }

    /// Adds an ε-transition from every final state back to the initial
    /// state. This is the looping half of both `*` and `+`.
    fn loop_back(&mut self) {
        let finals: Vec<usize> = self.finals.iter().collect();
        for f in finals {
            self.states[f].eps.push(0);
        }
    }

    /// Splices `other` behind `self`: every final state of `self` gets an
    /// ε-transition to `other`'s initial state, and `other`'s finals become
    /// the finals of the result. `other`'s state indices are shifted past
    /// `self`'s arena, so the two never alias.
    fn concat(mut self, other: Enfa<A>) -> Enfa<A> {
        let offset = self.states.len();
        for st in other.states {
            self.states.push(EnfaState {
                edges: st.edges.into_iter().map(|(a, t)| (a, t + offset)).collect(),
                eps: st.eps.into_iter().map(|t| t + offset).collect(),
            });
        }
        let finals: Vec<usize> = self.finals.iter().collect();
        for f in finals {
            self.states[f].eps.push(offset);
        }
        self.finals = other.finals.iter().map(|f| f + offset).collect();
        self
    }

    /// Writes the automaton in dot format, ε-edges labeled `ε`.
    pub fn write_dot<W: Write>(&self, w: W, name: &str) -> io::Result<()>
    where
        A: Display,
    {
        let mut g = GraphWriter::new(w, name)?;
        g.entry("q0")?;
        for (i, st) in self.states.iter().enumerate() {
            let id = format!("q{}", i);
            g.node(&id, &id, self.finals.contains(i))?;
            for (a, t) in &st.edges {
                g.edge(&id, &format!("q{}", t), Some(&a.to_string()))?;
            }
            for t in &st.eps {
                g.edge(&id, &format!("q{}", t), Some("ε"))?;
            }
        }
        g.finish()?;
        Ok(())
    }
}

/// The index of the parenthesis closing the group that starts `tokens`.
fn matching_close<A: Alphabet>(tokens: &[RegexToken<A>]) -> Result<usize> {
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate() {
        match t {
            RegexToken::Open => depth += 1,
            RegexToken::Close => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(Error::syntax(
        "builder",
        "unmatched opening parenthesis in regex",
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a token list from a pattern over single-character symbols.
    /// Only for tests; real regexes arrive pre-tokenized from the
    /// evaluator.
    pub(crate) fn toks(pattern: &str) -> Vec<RegexToken<char>> {
        pattern
            .chars()
            .map(|c| match c {
                '*' => RegexToken::Star,
                '+' => RegexToken::Plus,
                '(' => RegexToken::Open,
                ')' => RegexToken::Close,
                c => RegexToken::Symbol(c),
            })
            .collect()
    }

    #[test]
    fn empty_regex_is_single_final_state() {
        let enfa = Enfa::<char>::from_regex(&[]).unwrap();
        assert_eq!(enfa.num_states(), 1);
        assert!(enfa.finals.contains(0));
        assert!(enfa.states[0].edges.is_empty());
        assert!(enfa.states[0].eps.is_empty());
    }

    #[test]
    fn single_symbol_shape() {
        let enfa = Enfa::from_regex(&toks("a")).unwrap();
        assert_eq!(enfa.num_states(), 2);
        assert_eq!(enfa.states[0].edges, vec![('a', 1)]);
        assert!(enfa.finals.contains(1));
        assert!(!enfa.finals.contains(0));
    }

    #[test]
    fn bare_star_is_a_self_loop() {
        // The single-atom specialization: one state, looping, appended to
        // the trailing empty-word automaton.
        let enfa = Enfa::from_regex(&toks("a*")).unwrap();
        assert_eq!(enfa.states[0].edges, vec![('a', 0)]);
        assert_eq!(enfa.states[0].eps, vec![1]);
    }

    #[test]
    fn unbalanced_parens_are_rejected() {
        assert!(Enfa::from_regex(&toks("(ab")).is_err());
        assert!(Enfa::from_regex(&toks("ab)")).is_err());
        assert!(Enfa::from_regex(&toks("*a")).is_err());
    }

    #[test]
    fn concat_splices_disjoint_arenas() {
        let ab = Enfa::from_regex(&toks("ab")).unwrap();
        // 2 states per symbol plus the trailing empty-word state.
        assert_eq!(ab.num_states(), 5);
        // No state index appears twice as an edge source with conflicting
        // ownership: every edge target is in range.
        for st in &ab.states {
            for &(_, t) in &st.edges {
                assert!(t < ab.num_states());
            }
            for &t in &st.eps {
                assert!(t < ab.num_states());
            }
        }
    }

    #[test]
    fn dot_output_mentions_epsilon() {
        let enfa = Enfa::from_regex(&toks("a*")).unwrap();
        let mut buf = Vec::new();
        enfa.write_dot(&mut buf, "enfa").unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("ε"));
    }
}
