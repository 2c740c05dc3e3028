// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while turning a program into a model.
///
/// Each variant displays as a single `ErrorType (component): message` line,
/// which is the shape the command-line front end prints to stderr. Running a
/// built model never produces an error: missing input or output neurons
/// degrade to empty results and idle neurons simply stay idle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Malformed source text, or a malformed regex token sequence.
    #[error("SyntaxError ({component}): {message}")]
    Syntax {
        component: &'static str,
        message: String,
    },

    /// An operation applied to values of the wrong kind.
    #[error("TypeError (interpreter): {0}")]
    Type(String),

    /// A read of a variable that was never assigned.
    #[error("NameError (interpreter): {0} is not defined")]
    Name(String),

    /// A synapse from a membrane to itself.
    #[error("CircularSinapsisError (builder): {0}")]
    CircularSinapsis(String),

    /// A synapse whose source is the output sentinel.
    #[error("EnvValueError (builder): {0}")]
    EnvValue(String),

    /// An internal invariant was broken. Seeing this is a bug.
    #[error("UnexpectedError ({component}): {message}")]
    Unexpected {
        component: &'static str,
        message: String,
    },
}

impl Error {
    pub fn syntax<S: Into<String>>(component: &'static str, message: S) -> Error {
        Error::Syntax {
            component,
            message: message.into(),
        }
    }

    pub fn unexpected<S: Into<String>>(component: &'static str, message: S) -> Error {
        Error::Unexpected {
            component,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_single_line() {
        let errors = [
            Error::syntax("parser", "Expected expression. at \"}\" (line 3)"),
            Error::Type("The + operator is not defined for Int and Symbol".to_owned()),
            Error::Name("spikes".to_owned()),
            Error::CircularSinapsis("membrane 2 cannot target itself".to_owned()),
        ];
        for e in &errors {
            let line = e.to_string();
            assert!(!line.contains('\n'));
            assert!(line.contains(": "));
        }
    }

    #[test]
    fn name_error_format() {
        let e = Error::Name("n".to_owned());
        assert_eq!(e.to_string(), "NameError (interpreter): n is not defined");
    }
}
