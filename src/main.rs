// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use snpsim::lang::{Interpreter, Parser as SourceParser, Scanner};
use snpsim::{Error, Mode, Multiset, Result, RunOptions};

/// Interpret and simulate a spiking neural P-system.
#[derive(Parser)]
#[command(name = "snpsim", version)]
struct Args {
    /// Path to the program source.
    src: PathBuf,

    /// Input multiset, as separator-delimited symbols.
    #[arg(short, long)]
    input: Option<String>,

    /// Field separator for --input.
    #[arg(long, default_value = ",")]
    separator: String,

    /// Keep whitespace around input symbols.
    #[arg(long)]
    no_strip: bool,

    /// Write one dot snapshot of the system per step.
    #[arg(long)]
    render: bool,

    /// Directory the snapshots go to.
    #[arg(long, default_value = "./tmp")]
    render_path: PathBuf,

    /// Run the model this many times.
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Reporting mode: halt, halt-mc, time or time-mc.
    #[arg(short, long, default_value = "halt", value_parser = parse_mode)]
    mode: Mode,

    /// Stop a run after this many steps even without quiescence.
    #[arg(long)]
    max_steps: Option<usize>,
}

fn parse_mode(s: &str) -> Result<Mode> {
    s.parse()
}

fn parse_input(args: &Args) -> Multiset<String> {
    match &args.input {
        None => Multiset::new(),
        Some(raw) => raw
            .split(args.separator.as_str())
            .map(|s| {
                if args.no_strip {
                    s.to_owned()
                } else {
                    s.trim().to_owned()
                }
            })
            .collect(),
    }
}

fn run(args: &Args) -> Result<()> {
    let source = fs::read_to_string(&args.src).map_err(|e| {
        Error::unexpected("cli", format!("cannot read {}: {}", args.src.display(), e))
    })?;
    let input = parse_input(args);

    let tokens = Scanner::new(&source).scan()?;
    let program = SourceParser::new(tokens).parse()?;
    let model = Interpreter::new().run(&program)?;

    let opts = RunOptions {
        mode: args.mode,
        max_steps: args.max_steps,
        render: args.render.then_some(args.render_path.as_path()),
    };
    let mut rng = StdRng::from_entropy();
    for _ in 0..args.repeat {
        let output = model.run(input.clone(), &opts, &mut rng);
        println!("{}", output);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        process::exit(1);
    }
}
