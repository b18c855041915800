//! Shared pieces of the hypermon command-line monitors: argument parsing,
//! the CSV trace reader and the compiled-in formula tables.
#![deny(dead_code, missing_docs, unused_mut)]

pub mod cmd;
pub mod csv;
pub mod formula;
pub mod run;
