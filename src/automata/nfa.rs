// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;

use bit_set::BitSet;

use crate::automata::enfa::Enfa;
use crate::Alphabet;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NfaState<A: Alphabet> {
    /// `symbol → set of successor indices`.
    pub(crate) transitions: HashMap<A, BitSet>,
}

/// An ε-free nondeterministic automaton over the same state indices as the
/// [`Enfa`] it came from.
///
/// Like its source, this is a stepping stone: `Nfa` exists to make the
/// subset construction in [`Dfa`](crate::automata::Dfa) straightforward.
#[derive(Clone, Debug, PartialEq)]
pub struct Nfa<A: Alphabet> {
    pub(crate) states: Vec<NfaState<A>>,
    pub(crate) finals: BitSet,
}

/// The set of states reachable from `q` through ε-transitions alone,
/// including `q` itself.
fn eps_closure<A: Alphabet>(enfa: &Enfa<A>, q: usize) -> BitSet {
    let mut closure = BitSet::new();
    closure.insert(q);
    let mut stack = vec![q];
    while let Some(s) = stack.pop() {
        for &t in &enfa.states[s].eps {
            if closure.insert(t) {
                stack.push(t);
            }
        }
    }
    closure
}

impl<A: Alphabet> From<&Enfa<A>> for Nfa<A> {
    /// Removes ε-transitions.
    ///
    /// `δ'(q, s)` is the union of `ε-closure(q')` over every `q'` reachable
    /// by an `s`-edge from the closure of `q`; the new finals are the states
    /// whose closure meets the old finals. The initial state stays at index
    /// zero.
    fn from(enfa: &Enfa<A>) -> Nfa<A> {
        let n = enfa.num_states();
        let closures: Vec<BitSet> = (0..n).map(|q| eps_closure(enfa, q)).collect();

        let mut states = Vec::with_capacity(n);
        for q in 0..n {
            let mut transitions: HashMap<A, BitSet> = HashMap::new();
            for r in closures[q].iter() {
                for (a, t) in &enfa.states[r].edges {
                    transitions
                        .entry(a.clone())
                        .or_default()
                        .union_with(&closures[*t]);
                }
            }
            states.push(NfaState { transitions });
        }

        let finals = (0..n)
            .filter(|&q| !closures[q].is_disjoint(&enfa.finals))
            .collect();
        Nfa { states, finals }
    }
}

impl<A: Alphabet> Nfa<A> {
    pub fn num_states(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::enfa::tests::toks;

    fn set(elems: &[usize]) -> BitSet {
        elems.iter().copied().collect()
    }

    #[test]
    fn closure_follows_chains_and_loops() {
        // a* compiles to a self-looping state 0 with an ε-edge to the
        // trailing empty-word state 1.
        let enfa = Enfa::from_regex(&toks("a*")).unwrap();
        assert_eq!(eps_closure(&enfa, 0), set(&[0, 1]));
        assert_eq!(eps_closure(&enfa, 1), set(&[1]));
    }

    #[test]
    fn removal_preserves_finals_through_closures() {
        let nfa = Nfa::from(&Enfa::from_regex(&toks("a*")).unwrap());
        // State 0 reaches the final state 1 by ε, so both are final now.
        assert!(nfa.finals.contains(0));
        assert!(nfa.finals.contains(1));
    }

    #[test]
    fn transitions_land_on_closures() {
        let nfa = Nfa::from(&Enfa::from_regex(&toks("a*")).unwrap());
        // Reading `a` from state 0 loops into {0} and then ε-closes to 1.
        assert_eq!(nfa.states[0].transitions[&'a'], set(&[0, 1]));
    }

    #[test]
    fn no_epsilon_left_behind() {
        let nfa = Nfa::from(&Enfa::from_regex(&toks("(ab)+c*")).unwrap());
        // Nothing to check structurally for ε-edges (the type has none);
        // make sure every transition target is a valid index instead.
        for st in &nfa.states {
            for targets in st.transitions.values() {
                for t in targets.iter() {
                    assert!(t < nfa.num_states());
                }
            }
        }
    }
}
