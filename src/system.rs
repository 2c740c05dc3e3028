// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Display};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::automata::dot::GraphWriter;
use crate::error::{Error, Result};
use crate::multiset::Multiset;
use crate::regex::RegexToken;
use crate::rule::Rule;
use crate::Alphabet;

/// Bounds required of neuron and channel identifiers.
pub trait Ident: Clone + Ord + Debug {}

impl<T> Ident for T where T: Clone + Ord + Debug {}

/// What a run should report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// The output neuron's final contents.
    #[default]
    Halt,
    /// Everything delivered to the output neuron over the whole run,
    /// grouped by channel.
    HaltMc,
    /// Per step, everything delivered to the output neuron, channel labels
    /// dropped.
    Time,
    /// The full per-step, per-channel delivery history.
    TimeMc,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Mode> {
        match s {
            "halt" => Ok(Mode::Halt),
            "halt-mc" => Ok(Mode::HaltMc),
            "time" => Ok(Mode::Time),
            "time-mc" => Ok(Mode::TimeMc),
            _ => Err(Error::syntax("cli", format!("unknown mode {:?}", s))),
        }
    }
}

/// The result of a run, shaped by the [`Mode`] it was asked for.
#[derive(Clone, Debug, PartialEq)]
pub enum Output<A: Alphabet, U: Ident> {
    Halt(Multiset<A>),
    HaltMc(BTreeMap<U, Multiset<A>>),
    Time(Vec<Multiset<A>>),
    TimeMc(Vec<BTreeMap<U, Multiset<A>>>),
}

fn fmt_frame<A, U>(f: &mut fmt::Formatter<'_>, frame: &BTreeMap<U, Multiset<A>>) -> fmt::Result
where
    A: Alphabet + Display,
    U: Ident + Display,
{
    write!(
        f,
        "{{{}}}",
        frame
            .iter()
            .format_with(", ", |(c, m), g| g(&format_args!("{}: {}", c, m)))
    )
}

impl<A: Alphabet + Display, U: Ident + Display> Display for Output<A, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Halt(m) => write!(f, "{}", m),
            Output::HaltMc(frame) => fmt_frame(f, frame),
            Output::Time(steps) => write!(f, "[{}]", steps.iter().format(", ")),
            Output::TimeMc(steps) => {
                f.write_str("[")?;
                for (i, frame) in steps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_frame(f, frame)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Knobs for a single run.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions<'a> {
    pub mode: Mode,
    /// Stop after this many steps even without quiescence.
    pub max_steps: Option<usize>,
    /// Write one dot snapshot per step into this directory.
    pub render: Option<&'a Path>,
}

/// A spiking neural P-system: neurons holding multisets, labeled channels
/// between them, and regex-gated rules.
///
/// Building the model takes `&mut self`; [`SnpSystem::run`] takes `&self`
/// and rebuilds all runtime state from scratch, so a built model can be run
/// repeatedly and the runs are independent. Neuron and channel identifiers
/// are whatever ordered types the caller likes; the surface language uses
/// membrane numbers and the `out` sentinel.
#[derive(Clone, Debug)]
pub struct SnpSystem<A: Alphabet, N: Ident, U: Ident> {
    input: Option<N>,
    output: Option<N>,
    contents: BTreeMap<N, Multiset<A>>,
    channels: BTreeMap<U, BTreeMap<N, BTreeSet<N>>>,
    rules: BTreeMap<N, Vec<Rule<A, U>>>,
}

impl<A: Alphabet, N: Ident, U: Ident> SnpSystem<A, N, U> {
    pub fn new() -> SnpSystem<A, N, U> {
        SnpSystem {
            input: None,
            output: None,
            contents: BTreeMap::new(),
            channels: BTreeMap::new(),
            rules: BTreeMap::new(),
        }
    }

    /// Neurons are created the first time anything mentions them.
    fn register(&mut self, n: &N) {
        if !self.contents.contains_key(n) {
            self.contents.insert(n.clone(), Multiset::new());
        }
    }

    /// Designates the neuron that receives the run's input multiset.
    pub fn set_input(&mut self, n: N) {
        self.register(&n);
        self.input = Some(n);
    }

    /// Designates the neuron whose deliveries are reported.
    pub fn set_output(&mut self, n: N) {
        self.register(&n);
        self.output = Some(n);
    }

    /// Appends symbols to a neuron's initial contents.
    pub fn add_symbols<I: IntoIterator<Item = A>>(&mut self, n: N, symbols: I) {
        self.register(&n);
        self.contents
            .get_mut(&n)
            .expect("registered just above")
            .extend(symbols);
    }

    /// Appends a synapse to a channel.
    ///
    /// A membrane cannot synapse onto itself, and the output sentinel is a
    /// sink: using it as a source is rejected here, at build time.
    pub fn add_channel(&mut self, channel: U, source: N, target: N) -> Result<()> {
        if source == target {
            return Err(Error::CircularSinapsis(format!(
                "membrane {:?} cannot be connected to itself through channel {:?}",
                source, channel
            )));
        }
        if self.output.as_ref() == Some(&source) {
            return Err(Error::EnvValue(format!(
                "the output membrane {:?} cannot be the source of a synapse",
                source
            )));
        }
        self.register(&source);
        self.register(&target);
        self.channels
            .entry(channel)
            .or_default()
            .entry(source)
            .or_default()
            .insert(target);
        Ok(())
    }

    /// Attaches a rule to a neuron, compiling its regex predicate.
    pub fn add_rule(
        &mut self,
        n: N,
        regex: Option<&[RegexToken<A>]>,
        consumed: Multiset<A>,
        channels: BTreeMap<U, Multiset<A>>,
        block: u32,
    ) -> Result<()> {
        self.register(&n);
        let rule = Rule::new(regex, consumed, channels, block)?;
        self.rules.entry(n).or_default().push(rule);
        Ok(())
    }

    pub fn input(&self) -> Option<&N> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&N> {
        self.output.as_ref()
    }

    /// All registered neurons, in order.
    pub fn neurons(&self) -> impl Iterator<Item = &N> {
        self.contents.keys()
    }

    /// The initial contents of a neuron.
    pub fn contents(&self, n: &N) -> Option<&Multiset<A>> {
        self.contents.get(n)
    }

    /// Runs the system until quiescence or the step bound.
    ///
    /// Rule choice is the only randomness; seeding `rng` makes a run fully
    /// reproducible, because neurons are visited in key order. Running
    /// never fails: a missing input neuron swallows the input, a missing
    /// output neuron yields empty reports, and snapshot rendering logs its
    /// I/O troubles rather than aborting the simulation.
    pub fn run<R: Rng + ?Sized>(
        &self,
        input: Multiset<A>,
        opts: &RunOptions<'_>,
        rng: &mut R,
    ) -> Output<A, U> {
        let mut exec = Execution {
            system: self,
            current: BTreeMap::new(),
            next: self.contents.clone(),
            delay: BTreeMap::new(),
            history: Vec::new(),
        };
        if let Some(n) = &self.input {
            if let Some(m) = exec.next.get_mut(n) {
                *m += &input;
            }
        }
        exec.commit();

        let mut steps = 0;
        loop {
            if !exec.step(rng) {
                debug!("quiescent after {} steps", steps);
                break;
            }
            exec.commit();
            steps += 1;
            if let Some(dir) = opts.render {
                exec.render_step(steps, dir);
            }
            if opts.max_steps.map_or(false, |max| steps >= max) {
                debug!("step bound reached after {} steps", steps);
                break;
            }
        }
        exec.commit();
        exec.into_output(opts.mode)
    }
}

impl<A: Alphabet, N: Ident, U: Ident> Default for SnpSystem<A, N, U> {
    fn default() -> SnpSystem<A, N, U> {
        SnpSystem::new()
    }
}

/// The per-run state. Dropped when the run ends, which is what makes
/// repeated runs of one model independent.
struct Execution<'s, A: Alphabet, N: Ident, U: Ident> {
    system: &'s SnpSystem<A, N, U>,
    /// The snapshot rules are evaluated against. Firing diminishes it in
    /// place, so validity re-checks within a step see a shrinking supply.
    current: BTreeMap<N, Multiset<A>>,
    /// Where consumption and deliveries accumulate; becomes visible when
    /// the step commits.
    next: BTreeMap<N, Multiset<A>>,
    /// Busy neurons: remaining countdown and the index of the reserved
    /// rule. Absent means idle.
    delay: BTreeMap<N, (u32, usize)>,
    /// One frame per executed step: channel → everything it delivered to
    /// the output neuron during that step.
    history: Vec<BTreeMap<U, Multiset<A>>>,
}

impl<A: Alphabet, N: Ident, U: Ident> Execution<'_, A, N, U> {
    fn commit(&mut self) {
        self.current = self.next.clone();
    }

    /// Runs every neuron once against the committed snapshot. Returns
    /// whether anything at all happened; if not, the frame pushed for this
    /// step is discarded again.
    fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.history.push(BTreeMap::new());
        let mut modified = false;
        let neurons: Vec<N> = self.current.keys().cloned().collect();
        for n in &neurons {
            modified |= self.run_neuron(n, rng);
        }
        if !modified {
            self.history.pop();
        }
        modified
    }

    fn run_neuron<R: Rng + ?Sized>(&mut self, n: &N, rng: &mut R) -> bool {
        let system = self.system;
        let mut modified = false;

        if let Some(&(left, pending)) = self.delay.get(n) {
            if left > 1 {
                self.delay.insert(n.clone(), (left - 1, pending));
                trace!("neuron {:?} busy for {} more steps", n, left - 1);
                return true;
            }
            // The countdown strikes zero this step: the reserved rule
            // fires exactly once, then the neuron may select again.
            self.delay.remove(n);
            self.fire(n, pending);
            modified = true;
        }

        let Some(rules) = system.rules.get(n) else {
            return modified;
        };
        let Some(state) = self.current.get(n) else {
            return modified;
        };
        let valid: Vec<usize> = rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.valid(state))
            .map(|(i, _)| i)
            .collect();
        if valid.is_empty() {
            return modified;
        }

        // Firing before forgetting: a neuron only forgets when no spiking
        // rule applies to this state.
        let spiking: Vec<usize> = valid
            .iter()
            .copied()
            .filter(|&i| !rules[i].forgetting())
            .collect();
        let preferred = if spiking.is_empty() { valid } else { spiking };

        let &choice = preferred
            .choose(rng)
            .expect("a preferred rule always exists here");
        if rules[choice].block() > 0 {
            trace!(
                "neuron {:?} reserves rule {} for {} steps",
                n,
                choice,
                rules[choice].block()
            );
            self.delay.insert(n.clone(), (rules[choice].block(), choice));
            return true;
        }

        // Greedy reuse: the chosen rule fires as long as it stays valid
        // against the diminishing snapshot.
        loop {
            self.fire(n, choice);
            modified = true;
            match self.current.get(n) {
                Some(state) if rules[choice].valid(state) => {}
                _ => break,
            }
        }
        modified
    }

    /// One firing: consume from both views of the neuron, deliver each
    /// payload to every target of its channel, and record deliveries to the
    /// output neuron in this step's history frame.
    fn fire(&mut self, n: &N, rule_ix: usize) {
        let system = self.system;
        let rule = &system.rules[n][rule_ix];
        if let Some(m) = self.current.get_mut(n) {
            *m -= rule.consumed();
        }
        if let Some(m) = self.next.get_mut(n) {
            *m -= rule.consumed();
        }
        let frame = self
            .history
            .last_mut()
            .expect("a frame is pushed before any neuron runs");
        for (channel, payload) in rule.channels() {
            let Some(targets) = system.channels.get(channel).and_then(|c| c.get(n)) else {
                continue;
            };
            for t in targets {
                *self.next.entry(t.clone()).or_default() += payload;
                if system.output.as_ref() == Some(t) {
                    *frame.entry(channel.clone()).or_default() += payload;
                }
            }
        }
    }

    fn into_output(self, mode: Mode) -> Output<A, U> {
        match mode {
            Mode::Halt => Output::Halt(
                self.system
                    .output
                    .as_ref()
                    .and_then(|o| self.current.get(o))
                    .cloned()
                    .unwrap_or_default(),
            ),
            Mode::HaltMc => {
                let mut merged = BTreeMap::<U, Multiset<A>>::new();
                for frame in &self.history {
                    for (c, m) in frame {
                        *merged.entry(c.clone()).or_default() += m;
                    }
                }
                Output::HaltMc(merged)
            }
            Mode::Time => Output::Time(
                self.history
                    .iter()
                    .map(|frame| {
                        frame.values().fold(Multiset::new(), |mut acc, m| {
                            acc += m;
                            acc
                        })
                    })
                    .collect(),
            ),
            Mode::TimeMc => Output::TimeMc(self.history),
        }
    }

    /// Best-effort dot snapshot of the committed state. I/O failure is
    /// logged and the run carries on.
    fn render_step(&self, step: usize, dir: &Path) {
        if let Err(e) = self.try_render_step(step, dir) {
            log::error!(
                "cannot render step {} under {}: {}",
                step,
                dir.display(),
                e
            );
        }
    }

    fn try_render_step(&self, step: usize, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let file = File::create(dir.join(format!("step_{}.dot", step)))?;
        let mut g = GraphWriter::new(BufWriter::new(file), "snapshot")?;

        let ids: BTreeMap<N, String> = self
            .current
            .keys()
            .enumerate()
            .map(|(i, n)| (n.clone(), format!("n{}", i)))
            .collect();

        for (n, m) in &self.current {
            let contents = m
                .counts()
                .map(|(x, c)| format!("{:?}×{}", x, c))
                .sorted()
                .join(", ");
            let mut label = format!("{:?}\n{}", n, contents);
            if let Some((left, _)) = self.delay.get(n) {
                label.push_str(&format!("\nwait {}", left));
            }
            let doubled = self.system.output.as_ref() == Some(n);
            g.node(&ids[n], &label, doubled)?;
        }
        for (channel, by_source) in &self.system.channels {
            for (src, targets) in by_source {
                for t in targets {
                    g.edge(&ids[src], &ids[t], Some(&format!("{:?}", channel)))?;
                }
            }
        }
        g.finish()?;
        Ok(())
    }
}
