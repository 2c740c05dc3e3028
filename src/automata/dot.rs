// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A small writer for the graphviz `dot` format.
//!
//! Covers just what the diagnostics need: directed graphs, node labels,
//! doubled peripheries for accepting states, and an invisible entry point
//! with an arrow into the initial state.

use std::io::{self, Write};

pub struct GraphWriter<W: Write> {
    inner: W,
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl<W: Write> GraphWriter<W> {
    /// Begins a directed graph with the given name.
    pub fn new(mut inner: W, name: &str) -> io::Result<GraphWriter<W>> {
        writeln!(inner, "digraph {} {{", name)?;
        Ok(GraphWriter { inner })
    }

    /// Draws the point-shaped entry marker with an arrow to `to`.
    pub fn entry(&mut self, to: &str) -> io::Result<()> {
        writeln!(self.inner, "    __entry [shape = point];")?;
        writeln!(self.inner, "    __entry -> {};", to)
    }

    /// Declares a node. `doubled` draws the two peripheries that mark an
    /// accepting state.
    pub fn node(&mut self, id: &str, label: &str, doubled: bool) -> io::Result<()> {
        let shape = if doubled { "doublecircle" } else { "circle" };
        writeln!(
            self.inner,
            "    {} [shape = {}, label = \"{}\"];",
            id,
            shape,
            escape(label)
        )
    }

    /// Declares an edge, optionally labeled.
    pub fn edge(&mut self, from: &str, to: &str, label: Option<&str>) -> io::Result<()> {
        match label {
            Some(l) => writeln!(self.inner, "    {} -> {} [label = \"{}\"];", from, to, escape(l)),
            None => writeln!(self.inner, "    {} -> {};", from, to),
        }
    }

    /// Closes the graph and hands back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        writeln!(self.inner, "}}")?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_wellformed_graph() {
        let mut w = GraphWriter::new(Vec::new(), "g").unwrap();
        w.entry("q0").unwrap();
        w.node("q0", "q0", false).unwrap();
        w.node("q1", "q1", true).unwrap();
        w.edge("q0", "q1", Some("a")).unwrap();
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        assert!(out.starts_with("digraph g {"));
        assert!(out.trim_end().ends_with('}'));
        assert!(out.contains("doublecircle"));
        assert!(out.contains("q0 -> q1 [label = \"a\"];"));
    }

    #[test]
    fn escapes_quotes_in_labels() {
        let mut w = GraphWriter::new(Vec::new(), "g").unwrap();
        w.node("q0", "say \"hi\"", false).unwrap();
        let out = String::from_utf8(w.finish().unwrap()).unwrap();
        assert!(out.contains("say \\\"hi\\\""));
    }
}
