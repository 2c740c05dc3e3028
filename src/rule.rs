// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeMap;

use crate::automata::Dfa;
use crate::error::Result;
use crate::multiset::Multiset;
use crate::regex::RegexToken;
use crate::system::Ident;
use crate::Alphabet;

/// A compiled firing rule.
///
/// Built once when the model is put together and read-only afterwards. The
/// optional regex predicate is compiled down to a [`Dfa`] at construction,
/// so rule selection during a run only ever walks automata that already
/// exist.
#[derive(Clone, Debug)]
pub struct Rule<A: Alphabet, U: Ident> {
    regex: Option<Dfa<A>>,
    consumed: Multiset<A>,
    channels: BTreeMap<U, Multiset<A>>,
    block: u32,
}

impl<A: Alphabet, U: Ident> Rule<A, U> {
    /// Compiles a rule. Fails only if the regex token sequence is
    /// malformed.
    pub fn new(
        regex: Option<&[RegexToken<A>]>,
        consumed: Multiset<A>,
        channels: BTreeMap<U, Multiset<A>>,
        block: u32,
    ) -> Result<Rule<A, U>> {
        let regex = match regex {
            Some(tokens) => Some(Dfa::from_regex(tokens)?),
            None => None,
        };
        Ok(Rule {
            regex,
            consumed,
            channels,
            block,
        })
    }

    /// A forgetting rule consumes without sending anything anywhere.
    pub fn forgetting(&self) -> bool {
        self.channels.is_empty()
    }

    /// Tests whether this rule may fire on a neuron holding `state`.
    ///
    /// The consumed multiset must fit in any case. A forgetting rule needs
    /// nothing more; a plain rule without a regex demands that the state be
    /// exactly what it consumes; a regex rule asks the predicate automaton
    /// whether some ordering of the whole state is accepted.
    pub fn valid(&self, state: &Multiset<A>) -> bool {
        if !state.contains(&self.consumed) {
            return false;
        }
        if self.forgetting() {
            return true;
        }
        match &self.regex {
            None => self.consumed == *state,
            Some(dfa) => dfa.accepts_multiset(state),
        }
    }

    pub fn consumed(&self) -> &Multiset<A> {
        &self.consumed
    }

    pub fn channels(&self) -> &BTreeMap<U, Multiset<A>> {
        &self.channels
    }

    /// The firing delay in steps; zero fires immediately.
    pub fn block(&self) -> u32 {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::RegexToken::*;

    fn ms(s: &str) -> Multiset<char> {
        s.chars().collect()
    }

    fn spiking(consumed: &str, payload: &str) -> Rule<char, u32> {
        let mut channels = BTreeMap::new();
        channels.insert(1, ms(payload));
        Rule::new(None, ms(consumed), channels, 0).unwrap()
    }

    #[test]
    fn without_regex_state_must_match_exactly() {
        let rule = spiking("a", "b");
        assert!(rule.valid(&ms("a")));
        assert!(!rule.valid(&ms("aa")));
        assert!(!rule.valid(&ms("")));
    }

    #[test]
    fn regex_gates_on_the_whole_state() {
        // a a+ / {a}: fires while at least two spikes are present.
        let tokens = [Symbol('a'), Symbol('a'), Plus];
        let mut channels = BTreeMap::new();
        channels.insert(1u32, ms("a"));
        let rule = Rule::new(Some(&tokens), ms("a"), channels, 0).unwrap();
        assert!(rule.valid(&ms("aa")));
        assert!(rule.valid(&ms("aaaa")));
        assert!(!rule.valid(&ms("a")));
        assert!(!rule.valid(&ms("ab")));
    }

    #[test]
    fn forgetting_needs_only_containment() {
        let rule: Rule<char, u32> = Rule::new(None, ms("a"), BTreeMap::new(), 0).unwrap();
        assert!(rule.forgetting());
        assert!(rule.valid(&ms("a")));
        assert!(rule.valid(&ms("aab")));
        assert!(!rule.valid(&ms("b")));
    }

    #[test]
    fn consumed_must_fit_even_with_a_happy_regex() {
        // 1* a / {1}: the regex accepts a lone `a`, but there is no `1` to
        // consume, so the rule may not fire.
        let tokens = [Symbol('1'), Star, Symbol('a')];
        let mut channels = BTreeMap::new();
        channels.insert(1u32, ms("1"));
        let rule = Rule::new(Some(&tokens), ms("1"), channels, 0).unwrap();
        assert!(!rule.valid(&ms("a")));
        assert!(rule.valid(&ms("1a")));
    }

    #[test]
    fn malformed_regex_is_an_error() {
        let tokens = [Open, Symbol('a')];
        let res: Result<Rule<char, u32>> = Rule::new(Some(&tokens), ms("a"), BTreeMap::new(), 0);
        assert!(res.is_err());
    }
}
