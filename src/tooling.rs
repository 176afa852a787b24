//! Tooling & Integration Layer
//!
//! CLI surface over the namespace engine. Every command is a direct
//! pass-through to an engine operation; no tree logic lives here.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
