/*!
# Built-in Rewrite Rules

Standard simplifications written as ordinary rule snippets, grouped by what
they simplify. Registered on request through [`register_all`]; an engine
starts empty otherwise.
*/

pub mod branch_elim;
pub mod cond_elim;
pub mod incr_decr;
pub mod instanceof;

use tracing::info;

use super::{CompileError, RewriteEngine};

/// One catalogue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinRule {
    pub group: &'static str,
    pub from: String,
    pub to: String,
}

impl BuiltinRule {
    pub fn new(group: &'static str, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            group,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The whole catalogue in registration order
pub fn all() -> Vec<BuiltinRule> {
    let mut rules = cond_elim::rules();
    rules.extend(branch_elim::rules());
    rules.extend(incr_decr::rules());
    rules.extend(instanceof::rules());
    rules
}

/// Register every built-in rule, returning how many were added
pub fn register_all(engine: &RewriteEngine) -> Result<usize, CompileError> {
    let rules = all();
    for rule in &rules {
        engine.try_add_rule(&rule.from, &rule.to)?;
    }
    info!(count = rules.len(), "registered built-in rules");
    Ok(rules.len())
}

#[cfg(test)]
pub(crate) fn rewrite_with(rules: Vec<BuiltinRule>, source: &str) -> String {
    use std::sync::Arc;

    use crate::ast::ToSource;
    use crate::parser::{Parser, SpliceParser};

    let parser = Arc::new(SpliceParser::new());
    let engine = RewriteEngine::new(parser.clone());
    for rule in &rules {
        engine.try_add_rule(&rule.from, &rule.to).unwrap();
    }
    let mut ast = parser.parse(source, "builtin.php").unwrap();
    engine.process(&mut ast).unwrap();
    ast.to_source()
}
