//! REPL tooling for driving the sampler from a host console.
//!
//! [`grammar`] turns one input line into a [`grammar::Command`] without
//! allocating; [`catalog`] holds the keyword table and help text.

pub mod catalog;
pub mod grammar;

pub use grammar::{Command, GrammarError, GrammarErrorKind, StallCommand, parse};
