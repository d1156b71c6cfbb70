//! JSON rule files
//!
//! A rules file is a JSON list of `{"from": "...", "to": "..."}` objects,
//! registered in file order. A file with any rule that fails to compile
//! registers nothing.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use splice_core::{PatternCompiler, RewriteEngine};
use tracing::info;

/// One rule as written in a rules file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub from: String,
    pub to: String,
}

/// Read a rules file without registering anything
pub fn load(path: &Path) -> Result<Vec<RuleSpec>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading rules file {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing rules file {}", path.display()))
}

/// Register `specs` in order once every one of them compiles
pub fn register(engine: &RewriteEngine, specs: &[RuleSpec]) -> Result<usize> {
    let compiler =
        PatternCompiler::new(engine.parser().as_ref()).with_sigil(engine.config().capture_sigil);
    for (index, spec) in specs.iter().enumerate() {
        compiler
            .compile_rule(&spec.from, &spec.to)
            .with_context(|| format!("rule {} (`{}` => `{}`)", index + 1, spec.from, spec.to))?;
    }
    for spec in specs {
        engine.try_add_rule(&spec.from, &spec.to)?;
    }
    info!(rules = specs.len(), "registered rules file");
    Ok(specs.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use splice_core::SpliceParser;

    use super::*;

    #[test]
    fn test_register_in_order() {
        let engine = RewriteEngine::new(Arc::new(SpliceParser::new()));
        let specs = vec![
            RuleSpec {
                from: "$a + 0".to_string(),
                to: "$a".to_string(),
            },
            RuleSpec {
                from: "$a * 1".to_string(),
                to: "$a".to_string(),
            },
        ];
        assert_eq!(register(&engine, &specs).unwrap(), 2);
        let stats = engine.rule_stats();
        assert_eq!(stats[1].from, "$a * 1");
    }

    #[test]
    fn test_register_reports_failing_rule() {
        let engine = RewriteEngine::new(Arc::new(SpliceParser::new()));
        let specs = vec![
            RuleSpec {
                from: "$a + 0".to_string(),
                to: "$a".to_string(),
            },
            RuleSpec {
                from: "$a +".to_string(),
                to: "$a".to_string(),
            },
        ];
        let err = register(&engine, &specs).unwrap_err();
        assert!(err.to_string().starts_with("rule 2"), "{err}");
        // the valid first rule is not left behind
        assert_eq!(engine.rule_count(), 0);
    }
}
