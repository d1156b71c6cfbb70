/*!
# Rewrite - Pattern-Based AST Transformation

Rules are pairs of host-language snippets. The `from` snippet compiles into a
[`Pattern`], the `to` snippet into a [`Template`]. The engine walks each
compilation unit post-order and replaces every subtree a pattern matches with
the instantiated template, until no rule applies anywhere.

## Architecture

- `PatternCompiler`: parses snippets and marks capture points
- `Matcher`: structural comparison producing capture `Bindings`
- `RuleStore`: ordered rules with hit counters
- `RewriteEngine`: fixpoint rewriter, trace log and pipeline hook

## Example Usage

```rust
use std::sync::Arc;
use splice_core::{Parser, RewriteEngine, SpliceParser, ToSource};

let parser = Arc::new(SpliceParser::new());
let engine = RewriteEngine::new(parser.clone());
engine.add_rule("true && $x", "$x");

let mut unit = parser.parse("if (true && ready()) go();", "demo.php").unwrap();
engine.process(&mut unit).unwrap();
assert_eq!(unit.to_source(), "if (ready()) go();");
```
*/

pub mod builtin_rules;
pub mod engine;
pub mod matcher;
pub mod patterns;
pub mod rules;
pub mod trace;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::ShapeViolation;
use crate::parser::ParseError;

// Re-export main types
pub use engine::RewriteEngine;
pub use matcher::{Bindings, Matcher};
pub use patterns::{Pattern, PatternCompiler, Template};
pub use rules::{RuleId, RuleStats};
pub use trace::TraceEntry;

/// Origin label used when parsing rule snippets
pub const PATTERN_ORIGIN: &str = "<pattern>";

/// Where in a compilation unit something happened
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub origin: String,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.line)
    }
}

/// Rule snippet compilation failures; registration leaves the store unchanged
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("snippet does not parse: {0}")]
    ParseFailed(#[from] ParseError),

    #[error("snippet contains no statement")]
    EmptyPattern,

    #[error("template uses capture `{name}` that the pattern never binds")]
    UnboundCapture { name: String },
}

/// Failures that abort the rewrite of a compilation unit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewriteError {
    #[error("rule {rule} still matches at {location} after {limit} rewrites")]
    RuleCycle {
        rule: RuleId,
        location: Location,
        limit: usize,
    },

    #[error("tree at {location} nests deeper than {limit} levels during rewriting")]
    DepthLimit { location: Location, limit: usize },

    #[error("internal shape violation: {0}")]
    Shape(#[from] ShapeViolation),
}

/// Counts for one `process` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteSummary {
    pub rewrites: u64,
    pub nodes_visited: u64,
}

impl RewriteSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: RewriteSummary) {
        self.rewrites += other.rewrites;
        self.nodes_visited += other.nodes_visited;
    }

    pub fn changed(&self) -> bool {
        self.rewrites > 0
    }
}
