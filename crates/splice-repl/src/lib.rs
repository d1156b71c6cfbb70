//! Splice REPL - Interactive command-line interface for the Splice rewrite
//! engine
//!
//! This crate provides REPL (Read-Eval-Print Loop) functionality for Splice,
//! including command parsing, multi-line input handling, and rules files.

pub mod repl;

// Re-export commonly used types for convenience
pub use repl::{DefaultNotifier, Execution, Repl, ReplCommand, ReplNotifier};
