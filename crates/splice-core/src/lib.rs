//! # Splice Core
//!
//! Pattern-based AST rewriting for a compiler front end, including:
//! - Arena-backed Abstract Syntax Tree with kind-checked node shapes
//! - Reference parser and source generator for the host language
//! - Pattern compiler, structural matcher and fixpoint rewriter
//! - Compilation pipeline with an installable rewrite stage
//!
//! Rules are written as pairs of ordinary source snippets. Identifiers that
//! start with the capture sigil (`$` by default) are wildcards:
//!
//! ```
//! use splice_core::{RewriteConfig, Runtime};
//!
//! let runtime = Runtime::new(RewriteConfig::default()).unwrap();
//! assert!(runtime.engine().add_rule("$a + $a", "$a * 2"));
//! let out = runtime.rewrite_source("y = x + x;", "example.php").unwrap();
//! assert_eq!(out, "y = x * 2;");
//! ```

#![warn(clippy::all)]

pub mod ast;
pub mod parser;
pub mod pipeline;
pub mod rewrite;
pub mod runtime;

use std::path::Path;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use ast::{Ast, Node, NodeId, NodeKind, ShapeViolation, ToSource, Value};
pub use parser::{create_parser, ParseError, Parser, SpliceParser};
pub use pipeline::{Pipeline, StageError, StageId};
pub use rewrite::{
    builtin_rules, Bindings, CompileError, Location, Pattern, PatternCompiler, RewriteEngine,
    RewriteError, RewriteSummary, RuleId, RuleStats, Template, TraceEntry,
};
pub use runtime::{Runtime, UnitError};

/// Splice version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default prefix marking capture points in rule snippets
pub const DEFAULT_SIGIL: char = '$';

/// Initialize tracing for splice components
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("splice_core=info"));
    // Ignore the error when a subscriber is already installed (tests, embedding hosts)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Rewrite engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Rule applications allowed at one tree position before `RuleCycle`
    pub max_rewrites_per_node: usize,
    /// Nesting depth at which a pass gives up with `DepthLimit`
    pub max_depth: usize,
    /// Identifier prefix marking capture points in rule snippets
    pub capture_sigil: char,
    /// Start with tracing enabled
    pub debug_trace: bool,
    /// Trace entries kept before the oldest are evicted
    pub trace_capacity: usize,
    /// Treat single-statement blocks as the statement itself when matching
    pub unwrap_single_statements: bool,
    /// Register the built-in rule set at construction
    pub builtin_rules: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_rewrites_per_node: 10,
            max_depth: 2048,
            capture_sigil: DEFAULT_SIGIL,
            debug_trace: false,
            trace_capacity: 1024,
            unwrap_single_statements: true,
            builtin_rules: false,
        }
    }
}

impl RewriteConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SpliceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SpliceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !parser::is_valid_sigil(self.capture_sigil) {
            return Err(SpliceError::Config(format!(
                "capture sigil `{}` clashes with host syntax",
                self.capture_sigil
            )));
        }
        if self.max_rewrites_per_node == 0 {
            return Err(SpliceError::Config(
                "max_rewrites_per_node must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(SpliceError::Config("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Error types for splice core operations
#[derive(thiserror::Error, Debug)]
pub enum SpliceError {
    /// Parser error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Rule snippet could not be compiled
    #[error("Rule error: {0}")]
    Compile(#[from] CompileError),

    /// Rewrite pass aborted
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    /// Compilation unit failed in the pipeline
    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for splice core operations
pub type Result<T> = std::result::Result<T, SpliceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RewriteConfig::default();
        assert_eq!(config.max_rewrites_per_node, 10);
        assert_eq!(config.capture_sigil, '$');
        assert_eq!(config.trace_capacity, 1024);
        assert!(config.unwrap_single_statements);
        assert!(!config.debug_trace);
        assert!(!config.builtin_rules);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = RewriteConfig::from_json(r#"{"debug_trace": true, "capture_sigil": "@"}"#).unwrap();
        assert!(config.debug_trace);
        assert_eq!(config.capture_sigil, '@');
        assert_eq!(config.max_rewrites_per_node, 10);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(matches!(
            RewriteConfig::from_json(r#"{"capture_sigil": "x"}"#),
            Err(SpliceError::Config(_))
        ));
        assert!(matches!(
            RewriteConfig::from_json(r#"{"max_rewrites_per_node": 0}"#),
            Err(SpliceError::Config(_))
        ));
        assert!(matches!(
            RewriteConfig::from_json("{not json"),
            Err(SpliceError::Config(_))
        ));
    }
}
