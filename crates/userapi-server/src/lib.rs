//! # UserAPI Server Library
//!
//! Command-line parsing and startup reporting for the `userapi` binary.

pub mod cli;
pub mod startup;
