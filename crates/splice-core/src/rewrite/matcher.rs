/*!
# Structural Matcher

Compares a compiled pattern against a subtree of a compilation unit. Capture
points bind the subtree found at their position; a capture name used twice
must see structurally equal subtrees both times.

Statement lists holding a single statement are transparent: `if ($c) { $s; }`
matches both `if (x) go();` and `if (x) { go(); }`, binding `$s` to the call.
A capture written directly in a slot binds the target as written, block
included.
*/

use indexmap::IndexMap;
use tracing::trace;

use super::patterns::Pattern;
use crate::ast::{Ast, Node, NodeId};

/// Capture name to bound subtree in the target arena
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    map: IndexMap<String, NodeId>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.map.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: NodeId) {
        self.map.insert(name.into(), id);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bindings in first-capture order
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.map.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
enum Mismatch {
    Kind,
    Value,
    Length,
    Slot,
    Declaration,
    InconsistentCapture(String),
}

/// Structural matcher
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    unwrap_single_statements: bool,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            unwrap_single_statements: true,
        }
    }
}

impl Matcher {
    pub fn new(unwrap_single_statements: bool) -> Self {
        Self {
            unwrap_single_statements,
        }
    }

    /// Match `pattern` against the subtree at `candidate`
    pub fn matches(&self, pattern: &Pattern, target: &Ast, candidate: NodeId) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        match self.match_node(pattern.ast(), pattern.root(), target, candidate, &mut bindings) {
            Ok(()) => Some(bindings),
            Err(Mismatch::InconsistentCapture(name)) => {
                trace!(
                    pattern = pattern.source(),
                    capture = %name,
                    line = target.line(candidate),
                    "capture bound to unequal subtrees"
                );
                None
            }
            Err(_) => None,
        }
    }

    fn unwrap(&self, ast: &Ast, id: NodeId) -> NodeId {
        if self.unwrap_single_statements {
            ast.unwrap_single(id)
        } else {
            id
        }
    }

    fn match_node(
        &self,
        pattern: &Ast,
        p: NodeId,
        target: &Ast,
        t: NodeId,
        bindings: &mut Bindings,
    ) -> Result<(), Mismatch> {
        let unwrapped = self.unwrap(pattern, p);
        let bare_capture = unwrapped == p && matches!(pattern.node(p), Node::Capture { .. });
        let p = unwrapped;
        let t = if bare_capture { t } else { self.unwrap(target, t) };
        match (pattern.node(p), target.node(t)) {
            (Node::Capture { name }, _) => match bindings.get(name) {
                Some(previous) if target.structurally_eq(previous, target, t) => Ok(()),
                Some(_) => Err(Mismatch::InconsistentCapture(name.clone())),
                None => {
                    bindings.insert(name.clone(), t);
                    Ok(())
                }
            },
            (Node::Leaf { kind: pk, value: pv }, Node::Leaf { kind: tk, value: tv }) => {
                if pk != tk {
                    Err(Mismatch::Kind)
                } else if pv != tv {
                    Err(Mismatch::Value)
                } else {
                    Ok(())
                }
            }
            (Node::Fixed { kind: pk, children: pc }, Node::Fixed { kind: tk, children: tc }) => {
                if pk != tk {
                    return Err(Mismatch::Kind);
                }
                let arity = pk.arity();
                self.match_slots(pattern, &pc[..arity], target, &tc[..arity], bindings)
            }
            (Node::List { kind: pk, children: pc }, Node::List { kind: tk, children: tc }) => {
                if pk != tk {
                    return Err(Mismatch::Kind);
                }
                if pc.len() != tc.len() {
                    return Err(Mismatch::Length);
                }
                pc.iter()
                    .zip(tc)
                    .try_for_each(|(p, t)| self.match_node(pattern, *p, target, *t, bindings))
            }
            (
                Node::Decl {
                    kind: pk,
                    name: pn,
                    flags: pf,
                    children: pc,
                },
                Node::Decl {
                    kind: tk,
                    name: tn,
                    flags: tf,
                    children: tc,
                },
            ) => {
                if pk != tk {
                    return Err(Mismatch::Kind);
                }
                if pn != tn || pf != tf {
                    return Err(Mismatch::Declaration);
                }
                let arity = pk.arity();
                self.match_slots(pattern, &pc[..arity], target, &tc[..arity], bindings)
            }
            _ => Err(Mismatch::Kind),
        }
    }

    fn match_slots(
        &self,
        pattern: &Ast,
        pattern_slots: &[Option<NodeId>],
        target: &Ast,
        target_slots: &[Option<NodeId>],
        bindings: &mut Bindings,
    ) -> Result<(), Mismatch> {
        for (p, t) in pattern_slots.iter().zip(target_slots) {
            match (p, t) {
                (None, None) => {}
                (Some(p), Some(t)) => self.match_node(pattern, *p, target, *t, bindings)?,
                _ => return Err(Mismatch::Slot),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::parser::{Parser, SpliceParser};
    use crate::rewrite::PatternCompiler;

    fn unit(source: &str) -> (Ast, NodeId) {
        let ast = SpliceParser::new().parse(source, "unit.php").unwrap();
        let first = ast.children(ast.root().unwrap())[0];
        (ast, first)
    }

    fn pattern(snippet: &str) -> Pattern {
        let parser = SpliceParser::new();
        PatternCompiler::new(&parser).compile(snippet).unwrap()
    }

    #[test]
    fn test_capture_binds_subtree() {
        let (ast, stmt) = unit("f(a + 1) && true;");
        let bindings = pattern("$x && true").matches(&ast, stmt).unwrap();
        assert_eq!(bindings.len(), 1);
        let bound = bindings.get("x").unwrap();
        assert_eq!(bound, ast.child(stmt, 0).unwrap());
        assert_eq!(ast.kind(bound), NodeKind::Fixed(crate::ast::FixedKind::Call));
    }

    #[test]
    fn test_repeated_capture_requires_equal_subtrees() {
        let p = pattern("$a + $a");
        let (same, stmt) = unit("x + x;");
        assert!(p.matches(&same, stmt).is_some());

        let (different, stmt) = unit("x + y;");
        assert!(p.matches(&different, stmt).is_none());
    }

    #[test]
    fn test_literals_compare_strictly() {
        let p = pattern("$x == 1");
        let (int, stmt) = unit("a == 1;");
        assert!(p.matches(&int, stmt).is_some());
        let (float, stmt) = unit("a == 1.0;");
        assert!(p.matches(&float, stmt).is_none());
        let (text, stmt) = unit("a == '1';");
        assert!(p.matches(&text, stmt).is_none());
    }

    #[test]
    fn test_kind_and_operator_must_agree() {
        let p = pattern("$x + $y");
        let (ast, stmt) = unit("a - b;");
        assert!(p.matches(&ast, stmt).is_none());
        let (ast, stmt) = unit("a += b;");
        assert!(p.matches(&ast, stmt).is_none());
    }

    #[test]
    fn test_empty_slots() {
        let p = pattern("if ($c) $body;");
        let (no_else, stmt) = unit("if (a) b();");
        assert!(p.matches(&no_else, stmt).is_some());
        let (with_else, stmt) = unit("if (a) b(); else c();");
        assert!(p.matches(&with_else, stmt).is_none());
    }

    #[test]
    fn test_lists_match_exact_length() {
        let p = pattern("f($a, $b)");
        let (two, stmt) = unit("f(1, 2);");
        assert!(p.matches(&two, stmt).is_some());
        let (three, stmt) = unit("f(1, 2, 3);");
        assert!(p.matches(&three, stmt).is_none());
    }

    #[test]
    fn test_single_statement_blocks_are_transparent() {
        let p = pattern("if (true) { $body; }");
        let (braced, stmt) = unit("if (true) { go(); }");
        let bindings = p.matches(&braced, stmt).unwrap();
        assert_eq!(
            braced.kind(bindings.get("body").unwrap()),
            NodeKind::Fixed(crate::ast::FixedKind::Call)
        );

        let (inline, stmt) = unit("if (true) go();");
        assert!(p.matches(&inline, stmt).is_some());

        let (multi, stmt) = unit("if (true) { a(); b(); }");
        let bindings = p.matches(&multi, stmt).unwrap();
        assert_eq!(multi.child_count(bindings.get("body").unwrap()), 2);
    }

    #[test]
    fn test_unwrap_can_be_disabled() {
        let p = pattern("if (true) { $body; }");
        let (inline, stmt) = unit("if (true) go();");
        assert!(Matcher::new(false).matches(&p, &inline, stmt).is_none());
        let (braced, stmt) = unit("if (true) { go(); }");
        assert!(Matcher::new(false).matches(&p, &braced, stmt).is_some());
    }

    #[test]
    fn test_declarations_compare_name() {
        let p = pattern("function helper($param) { return $result; }");
        let (same, stmt) = unit("function helper(v) { return v * 2; }");
        let bindings = p.matches(&same, stmt).expect("same name should match");
        assert_eq!(bindings.iter().map(|(name, _)| name).collect::<Vec<_>>(), ["param", "result"]);
        let (other, stmt) = unit("function other(v) { return v * 2; }");
        assert!(p.matches(&other, stmt).is_none());
    }

    #[test]
    fn test_bare_capture_binds_block_as_written() {
        let p = pattern("while ($c) $body;");
        let (ast, stmt) = unit("while (a) { step(); }");
        let bindings = p.matches(&ast, stmt).unwrap();
        assert_eq!(
            ast.kind(bindings.get("body").unwrap()),
            NodeKind::List(crate::ast::ListKind::StmtList)
        );
    }
}
