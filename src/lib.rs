// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An interpreter and simulator for spiking neural P-systems.
//!
//! A spiking neural P-system is a network of neurons, each holding a
//! multiset of symbols and a set of firing rules. A rule is gated by a
//! regular expression over the neuron's contents, consumes a multiset, and
//! emits payloads onto labeled channels, possibly after a delay. This crate
//! provides:
//!
//! - [`Multiset`], the counted collection everything else is built on;
//! - an automata pipeline ([`automata::Enfa`] → [`automata::Nfa`] →
//!   [`automata::Dfa`]) that compiles tokenized regexes and answers the
//!   multiset-acceptance query gating rule selection;
//! - [`SnpSystem`], the nondeterministic maximal-step simulator;
//! - under [`lang`], a scanner, parser and evaluator for the small language
//!   that describes such systems, and the pieces the `snpsim` binary is
//!   made of.
//!
//! Building a model takes `&mut self` and running it takes `&self` with an
//! injected random number generator, so a built model can be run any number
//! of times, reproducibly when the generator is seeded.

use std::fmt::Debug;
use std::hash::Hash;

pub mod automata;
pub mod error;
pub mod lang;
pub mod multiset;
pub mod regex;
pub mod rule;
pub mod system;

pub use crate::error::{Error, Result};
pub use crate::multiset::Multiset;
pub use crate::regex::RegexToken;
pub use crate::rule::Rule;
pub use crate::system::{Mode, Output, RunOptions, SnpSystem};

/// A generic alphabet.
///
/// Automata in this crate run over any cheaply clonable symbol type with
/// total ordering and hashing; the surface language instantiates them at
/// `String`, tests mostly at `char`.
pub trait Alphabet: Clone + Eq + Ord + Hash + Debug {}

impl<T> Alphabet for T where T: Clone + Eq + Ord + Hash + Debug {}
