//! stockbot: deterministic strategy execution engine.
//!
//! Hexagonal architecture: decision logic in [`domain`], collaborator traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
