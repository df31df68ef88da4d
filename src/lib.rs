//! stratrank: evaluates and ranks technical entry strategies per instrument.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The `stratrank` binary wires them
//! together in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
