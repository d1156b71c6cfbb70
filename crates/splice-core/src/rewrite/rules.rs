/*!
# Rule Store

Registered rewrite rules, kept in registration order. The first rule whose
pattern matches a node wins, so order is part of a rule set's meaning.
*/

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::matcher::{Bindings, Matcher};
use super::patterns::{Pattern, Template};
use crate::ast::{Ast, NodeId};

/// Registration-order identifier of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A compiled `from` / `to` pair
#[derive(Debug)]
pub struct Rule {
    id: RuleId,
    pattern: Pattern,
    template: Template,
    hits: AtomicU64,
}

impl Rule {
    pub fn new(id: RuleId, pattern: Pattern, template: Template) -> Self {
        Self {
            id,
            pattern,
            template,
            hits: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Count one application; callable under a shared store guard
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RuleStats {
        RuleStats {
            id: self.id,
            from: self.pattern.source().to_string(),
            to: self.template.source().to_string(),
            hits: self.hits(),
        }
    }
}

/// Rule execution statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    pub id: RuleId,
    pub from: String,
    pub to: String,
    pub hits: u64,
}

/// Insertion-ordered rule collection
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: IndexMap<RuleId, Rule>,
    next_id: u32,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule, assigning the next id
    pub fn push(&mut self, pattern: Pattern, template: Template) -> RuleId {
        let id = RuleId(self.next_id);
        self.next_id += 1;
        self.rules.insert(id, Rule::new(id, pattern, template));
        id
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// First rule, in registration order, whose pattern matches `candidate`
    pub fn first_match(
        &self,
        matcher: &Matcher,
        ast: &Ast,
        candidate: NodeId,
    ) -> Option<(&Rule, Bindings)> {
        self.rules.values().find_map(|rule| {
            matcher
                .matches(&rule.pattern, ast, candidate)
                .map(|bindings| (rule, bindings))
        })
    }

    pub fn stats(&self) -> Vec<RuleStats> {
        self.rules.values().map(Rule::stats).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, SpliceParser};
    use crate::rewrite::PatternCompiler;

    fn store_with(rules: &[(&str, &str)]) -> RuleStore {
        let parser = SpliceParser::new();
        let compiler = PatternCompiler::new(&parser);
        let mut store = RuleStore::new();
        for (from, to) in rules {
            let (pattern, template) = compiler.compile_rule(from, to).unwrap();
            store.push(pattern, template);
        }
        store
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let store = store_with(&[("$a + 0", "$a"), ("$a * 1", "$a")]);
        let ids = store.iter().map(Rule::id).collect::<Vec<_>>();
        assert_eq!(ids, [RuleId(0), RuleId(1)]);
        assert_eq!(RuleId(1).to_string(), "#1");
        assert_eq!(store.get(RuleId(1)).unwrap().pattern().source(), "$a * 1");
    }

    #[test]
    fn test_first_match_wins() {
        let store = store_with(&[("$a + $b", "$b"), ("$a + 0", "$a")]);
        let ast = SpliceParser::new().parse("x + 0;", "t").unwrap();
        let stmt = ast.children(ast.root().unwrap())[0];
        let (rule, bindings) = store.first_match(&Matcher::default(), &ast, stmt).unwrap();
        assert_eq!(rule.id(), RuleId(0));
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_stats_report_hits() {
        let store = store_with(&[("$a + 0", "$a")]);
        let rule = store.get(RuleId(0)).unwrap();
        rule.record_hit();
        rule.record_hit();
        assert_eq!(
            store.stats(),
            [RuleStats {
                id: RuleId(0),
                from: "$a + 0".to_string(),
                to: "$a".to_string(),
                hits: 2,
            }]
        );
    }
}
