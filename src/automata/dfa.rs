// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::borrow::Borrow;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::fmt::Display;
use std::io::{self, Write};

use bit_set::BitSet;
use itertools::Itertools;

use crate::automata::dot::GraphWriter;
use crate::automata::enfa::Enfa;
use crate::automata::nfa::Nfa;
use crate::error::Result;
use crate::multiset::Multiset;
use crate::regex::RegexToken;
use crate::Alphabet;

#[derive(Clone, Debug, PartialEq)]
pub struct DfaState<A: Alphabet> {
    /// `symbol → unique successor index`. A missing entry rejects.
    transitions: HashMap<A, usize>,
}

impl<A: Alphabet> Default for DfaState<A> {
    fn default() -> Self {
        DfaState {
            transitions: HashMap::new(),
        }
    }
}

/// A deterministic finite automaton, the end of the compilation pipeline
/// and the only stage that answers queries.
///
/// Besides the usual word walk there is [`Dfa::accepts_multiset`], which
/// decides whether *some ordering* of a multiset's elements spells an
/// accepted word. That query is what gates rule selection in the
/// simulator.
#[derive(Clone, Debug, PartialEq)]
pub struct Dfa<A: Alphabet> {
    states: Vec<DfaState<A>>,
    finals: BitSet,
}

impl<A: Alphabet> From<&Nfa<A>> for Dfa<A> {
    /// The subset construction.
    ///
    /// Deterministic states are sets of NFA state indices; the worklist
    /// starts from `{0}` and a set is frozen and numbered the first time it
    /// shows up as a transition target. Finals are the sets meeting the NFA
    /// finals.
    fn from(nfa: &Nfa<A>) -> Dfa<A> {
        let mut states: Vec<DfaState<A>> = Vec::new();
        let mut finals = BitSet::new();
        let mut state_map = HashMap::<BitSet, usize>::new();
        let mut active = Vec::<BitSet>::new();

        let mut start = BitSet::new();
        start.insert(0);
        states.push(DfaState::default());
        if !start.is_disjoint(&nfa.finals) {
            finals.insert(0);
        }
        state_map.insert(start.clone(), 0);
        active.push(start);

        while let Some(set) = active.pop() {
            let set_idx = state_map[&set];

            // Group the outgoing edges of the whole set by symbol. The
            // ordered map keeps state numbering independent of hashing.
            let mut trans = BTreeMap::<&A, BitSet>::new();
            for q in set.iter() {
                for (a, targets) in &nfa.states[q].transitions {
                    trans.entry(a).or_default().union_with(targets);
                }
            }

            for (a, target) in trans {
                let target_idx = match state_map.get(&target) {
                    Some(&idx) => idx,
                    None => {
                        let idx = states.len();
                        states.push(DfaState::default());
                        if !target.is_disjoint(&nfa.finals) {
                            finals.insert(idx);
                        }
                        state_map.insert(target.clone(), idx);
                        active.push(target);
                        idx
                    }
                };
                states[set_idx].transitions.insert(a.clone(), target_idx);
            }
        }

        Dfa { states, finals }
    }
}

impl<A: Alphabet> Dfa<A> {
    /// Compiles a tokenized regex all the way down.
    pub fn from_regex(tokens: &[RegexToken<A>]) -> Result<Dfa<A>> {
        Ok(Dfa::from(&Nfa::from(&Enfa::from_regex(tokens)?)))
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Tests whether the automaton accepts the given word.
    pub fn accepts<I>(&self, word: I) -> bool
    where
        I: IntoIterator,
        I::Item: Borrow<A>,
    {
        let mut current = 0;
        for a in word {
            match self.states[current].transitions.get(a.borrow()) {
                Some(&t) => current = t,
                None => return false,
            }
        }
        self.finals.contains(current)
    }

    /// Tests whether some ordering of `m`'s elements is accepted.
    ///
    /// Best-first search over `(remaining counts, state)` pairs, preferring
    /// configurations with fewer symbols consumed. The counts are kept as a
    /// vector against a symbol order fixed on entry, and the visited set is
    /// keyed on the (counts, state) pair: two interleavings that consume the
    /// same symbols into the same state have identical futures, which is
    /// what keeps the search from exploring all `|m|!` orderings. Worst
    /// case is still exponential in `|m|`; rule predicates keep `|m|`
    /// small.
    pub fn accepts_multiset(&self, m: &Multiset<A>) -> bool {
        let symbols: Vec<&A> = m.support().collect();
        let counts: Vec<usize> = symbols.iter().map(|s| m.count(s)).collect();

        let mut heap = BinaryHeap::new();
        heap.push(Reverse((0usize, counts, 0usize)));
        let mut visited = HashSet::<(Vec<usize>, usize)>::new();

        while let Some(Reverse((consumed, counts, state))) = heap.pop() {
            if !visited.insert((counts.clone(), state)) {
                continue;
            }

            if counts.iter().all(|&c| c == 0) && self.finals.contains(state) {
                return true;
            }

            for (i, s) in symbols.iter().enumerate() {
                if counts[i] == 0 {
                    continue;
                }
                if let Some(&t) = self.states[state].transitions.get(*s) {
                    let mut rest = counts.clone();
                    rest[i] -= 1;
                    heap.push(Reverse((consumed + 1, rest, t)));
                }
            }
        }
        false
    }

    /// Tests whether every reachable state is final or can still reach a
    /// final state. An automaton built from a regex always is; a dead
    /// reachable state would mean the construction manufactured garbage.
    pub fn is_consistent(&self) -> bool {
        let mut reversed = vec![Vec::new(); self.states.len()];
        for (q, st) in self.states.iter().enumerate() {
            for &t in st.transitions.values() {
                reversed[t].push(q);
            }
        }

        let mut alive = self.finals.clone();
        let mut stack: Vec<usize> = self.finals.iter().collect();
        while let Some(q) = stack.pop() {
            for &p in &reversed[q] {
                if alive.insert(p) {
                    stack.push(p);
                }
            }
        }

        let mut seen = BitSet::new();
        seen.insert(0);
        let mut stack = vec![0];
        while let Some(q) = stack.pop() {
            if !alive.contains(q) {
                return false;
            }
            for &t in self.states[q].transitions.values() {
                if seen.insert(t) {
                    stack.push(t);
                }
            }
        }
        true
    }

    /// Writes the automaton in dot format, merging parallel edges into one
    /// arrow with a comma-separated label.
    pub fn write_dot<W: Write>(&self, w: W, name: &str) -> io::Result<()>
    where
        A: Display,
    {
        let mut g = GraphWriter::new(w, name)?;
        g.entry("q0")?;
        for (i, st) in self.states.iter().enumerate() {
            let id = format!("q{}", i);
            g.node(&id, &id, self.finals.contains(i))?;
            let mut grouped = BTreeMap::<usize, Vec<&A>>::new();
            for (a, &t) in &st.transitions {
                grouped.entry(t).or_default().push(a);
            }
            for (t, mut labels) in grouped {
                labels.sort();
                let label = labels.iter().format(", ").to_string();
                g.edge(&id, &format!("q{}", t), Some(&label))?;
            }
        }
        g.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::enfa::tests::toks;
    use quickcheck::quickcheck;

    fn dfa(pattern: &str) -> Dfa<char> {
        Dfa::from_regex(&toks(pattern)).unwrap()
    }

    fn assert_accepts(pattern: &str, accepted: &[&str], rejected: &[&str]) {
        let dfa = dfa(pattern);
        for word in accepted {
            assert!(dfa.accepts(word.chars()), "{:?} should accept {:?}", pattern, word);
        }
        for word in rejected {
            assert!(!dfa.accepts(word.chars()), "{:?} should reject {:?}", pattern, word);
        }
    }

    fn assert_accepts_multiset(pattern: &str, accepted: &[&str], rejected: &[&str]) {
        let dfa = dfa(pattern);
        for word in accepted {
            let m: Multiset<char> = word.chars().collect();
            assert!(dfa.accepts_multiset(&m), "{:?} should accept some ordering of {:?}", pattern, word);
        }
        for word in rejected {
            let m: Multiset<char> = word.chars().collect();
            assert!(!dfa.accepts_multiset(&m), "{:?} should reject every ordering of {:?}", pattern, word);
        }
    }

    #[test]
    fn word_acceptation() {
        assert_accepts("a*b*", &["", "b", "ab", "aab"], &["c", "ba", "bba", "abc"]);
        assert_accepts("(ab)+c*", &["ab", "abc", "ababccc"], &["", "c", "cab", "acc"]);
    }

    #[test]
    fn multiset_acceptation() {
        assert_accepts_multiset("a*b*", &["", "b", "ba", "ab", "aab", "bba"], &["c", "abc"]);
        assert_accepts_multiset("(ab)+c*", &["ab", "cab", "abc", "ababccc"], &["", "c", "acc"]);
    }

    #[test]
    fn empty_regex_accepts_only_the_empty_word() {
        let dfa = dfa("");
        assert!(dfa.accepts("".chars()));
        assert!(dfa.accepts_multiset(&Multiset::new()));
        assert!(!dfa.accepts("a".chars()));
        assert!(!dfa.accepts_multiset(&"a".chars().collect()));
    }

    #[test]
    fn grouped_star_matches_bare_star() {
        // The two take different construction paths and must not be
        // distinguishable by acceptance.
        let bare = dfa("a*");
        let grouped = dfa("(a)*");
        for word in ["", "a", "aa", "aaa", "b", "ab"] {
            assert_eq!(bare.accepts(word.chars()), grouped.accepts(word.chars()), "{:?}", word);
        }
    }

    #[test]
    fn plus_requires_one_occurrence() {
        assert_accepts("a+", &["a", "aa", "aaa"], &["", "b"]);
        assert_accepts("a+b+", &["ab", "aabb"], &["", "a", "b", "ba"]);
    }

    #[test]
    fn consistency_of_compiled_regexes() {
        for pattern in ["", "a", "a*b*", "(ab)+c*", "a+b+", "(a(bc)*)+"] {
            assert!(dfa(pattern).is_consistent(), "{:?}", pattern);
        }
    }

    #[test]
    fn inconsistency_is_detectable() {
        // A hand-made automaton with a reachable dead state.
        let mut dead = DfaState::default();
        dead.transitions.insert('a', 1);
        let mut finals = BitSet::new();
        finals.insert(0);
        let dfa = Dfa {
            states: vec![dead, DfaState::default()],
            finals,
        };
        assert!(!dfa.is_consistent());
    }

    const PATTERNS: [&str; 6] = ["", "a", "a*b*", "(ab)+c*", "a+b+", "(a(bc)*)+"];

    fn word(bytes: &[u8]) -> String {
        bytes.iter().take(8).map(|b| (b'a' + b % 3) as char).collect()
    }

    quickcheck! {
        /// The whole pipeline agrees with a reference regex engine.
        fn prop_accepts_matches_oracle(choice: usize, bytes: Vec<u8>) -> bool {
            let pattern = PATTERNS[choice % PATTERNS.len()];
            let word = word(&bytes);
            let oracle = ::regex::Regex::new(&format!("^(?:{})$", pattern)).unwrap();
            dfa(pattern).accepts(word.chars()) == oracle.is_match(&word)
        }

        /// Multiset acceptance means exactly "some permutation is accepted".
        fn prop_multiset_matches_permutations(choice: usize, bytes: Vec<u8>) -> bool {
            let pattern = PATTERNS[choice % PATTERNS.len()];
            let chars: Vec<char> = word(&bytes[..bytes.len().min(6)]).chars().collect();
            let dfa = dfa(pattern);
            let by_search = dfa.accepts_multiset(&chars.iter().copied().collect());
            let n = chars.len();
            let by_enumeration = chars
                .into_iter()
                .permutations(n)
                .any(|p| dfa.accepts(p.iter()));
            by_search == by_enumeration
        }

        fn prop_compiled_regexes_are_consistent(choice: usize) -> bool {
            dfa(PATTERNS[choice % PATTERNS.len()]).is_consistent()
        }
    }
}
