//! Subcommand implementations.

pub mod completion;
pub mod resolve;
pub mod unpack;
