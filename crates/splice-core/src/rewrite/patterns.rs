/*!
# Pattern Compiler

Turns rule snippets into compiled fragments. A snippet is parsed by the host
parser, top-level single-statement lists are unwrapped, and identifiers that
start with the capture sigil become capture points.
*/

use tracing::trace;

use super::matcher::{Bindings, Matcher};
use super::{CompileError, PATTERN_ORIGIN};
use crate::ast::{Ast, FixedKind, ListKind, Node, NodeId, ShapeViolation, MAX_ARITY};
use crate::parser::Parser;
use crate::DEFAULT_SIGIL;

/// Parsed snippet with its capture points marked
#[derive(Debug, Clone)]
struct Fragment {
    source: String,
    ast: Ast,
    root: NodeId,
    captures: Vec<String>,
}

/// Compiled `from` side of a rule
#[derive(Debug, Clone)]
pub struct Pattern {
    fragment: Fragment,
}

impl Pattern {
    pub fn source(&self) -> &str {
        &self.fragment.source
    }

    pub fn ast(&self) -> &Ast {
        &self.fragment.ast
    }

    pub fn root(&self) -> NodeId {
        self.fragment.root
    }

    /// Capture names in first-occurrence order
    pub fn captures(&self) -> &[String] {
        &self.fragment.captures
    }

    pub fn binds(&self, name: &str) -> bool {
        self.fragment.captures.iter().any(|c| c == name)
    }

    /// Match with default matcher options
    pub fn matches(&self, target: &Ast, candidate: NodeId) -> Option<Bindings> {
        Matcher::default().matches(self, target, candidate)
    }
}

/// Compiled `to` side of a rule
#[derive(Debug, Clone)]
pub struct Template {
    fragment: Fragment,
}

impl Template {
    pub fn source(&self) -> &str {
        &self.fragment.source
    }

    pub fn ast(&self) -> &Ast {
        &self.fragment.ast
    }

    pub fn root(&self) -> NodeId {
        self.fragment.root
    }

    pub fn captures(&self) -> &[String] {
        &self.fragment.captures
    }

    /// Build the replacement subtree inside `target`. Template nodes take
    /// `line`; bound subtrees are deep-copied and keep their own lines.
    pub fn instantiate(
        &self,
        target: &mut Ast,
        bindings: &Bindings,
        line: u32,
    ) -> Result<NodeId, ShapeViolation> {
        self.build(self.fragment.root, target, bindings, line)
    }

    fn build(
        &self,
        id: NodeId,
        target: &mut Ast,
        bindings: &Bindings,
        line: u32,
    ) -> Result<NodeId, ShapeViolation> {
        match self.fragment.ast.node(id) {
            Node::Capture { name } => {
                let bound = bindings
                    .get(name)
                    .ok_or_else(|| ShapeViolation::UnboundCapture { name: name.clone() })?;
                Ok(target.deep_copy(bound))
            }
            Node::Leaf { kind, value } => Ok(target.leaf(*kind, value.clone(), line)),
            Node::Fixed { kind, children } => {
                let slots = self.build_slots(&children[..kind.arity()], target, bindings, line)?;
                target.fixed(*kind, &slots[..kind.arity()], line)
            }
            Node::List { kind, children } => {
                let items = children
                    .iter()
                    .map(|child| self.build(*child, target, bindings, line))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(target.list(*kind, items, line))
            }
            Node::Decl {
                kind,
                name,
                flags,
                children,
            } => {
                let slots = self.build_slots(&children[..kind.arity()], target, bindings, line)?;
                target.decl(*kind, name.clone(), *flags, &slots[..kind.arity()], line)
            }
        }
    }

    fn build_slots(
        &self,
        children: &[Option<NodeId>],
        target: &mut Ast,
        bindings: &Bindings,
        line: u32,
    ) -> Result<[Option<NodeId>; MAX_ARITY], ShapeViolation> {
        let mut slots = [None; MAX_ARITY];
        for (slot, child) in slots.iter_mut().zip(children) {
            *slot = match child {
                Some(child) => Some(self.build(*child, target, bindings, line)?),
                None => None,
            };
        }
        Ok(slots)
    }
}

/// Compiles rule snippets through the host parser
pub struct PatternCompiler<'p> {
    parser: &'p dyn Parser,
    sigil: char,
}

impl<'p> PatternCompiler<'p> {
    pub fn new(parser: &'p dyn Parser) -> Self {
        Self {
            parser,
            sigil: DEFAULT_SIGIL,
        }
    }

    pub fn with_sigil(mut self, sigil: char) -> Self {
        self.sigil = sigil;
        self
    }

    pub fn compile(&self, snippet: &str) -> Result<Pattern, CompileError> {
        let fragment = self.fragment(snippet)?;
        // An empty block matches nothing useful; templates may still produce one
        if fragment.ast.is_list(fragment.root) && fragment.ast.child_count(fragment.root) == 0 {
            return Err(CompileError::EmptyPattern);
        }
        Ok(Pattern { fragment })
    }

    pub fn compile_template(&self, snippet: &str) -> Result<Template, CompileError> {
        Ok(Template {
            fragment: self.fragment(snippet)?,
        })
    }

    /// Compile both sides of a rule and check every template capture is bound
    pub fn compile_rule(&self, from: &str, to: &str) -> Result<(Pattern, Template), CompileError> {
        let pattern = self.compile(from)?;
        let template = self.compile_template(to)?;
        if let Some(name) = template.captures().iter().find(|name| !pattern.binds(name)) {
            return Err(CompileError::UnboundCapture { name: name.clone() });
        }
        Ok((pattern, template))
    }

    fn fragment(&self, snippet: &str) -> Result<Fragment, CompileError> {
        let mut ast = match self.parser.parse(snippet, PATTERN_ORIGIN) {
            Ok(ast) => ast,
            // Expression snippets are written without their closing `;`
            Err(err) => self
                .parser
                .parse(&format!("{snippet}\n;"), PATTERN_ORIGIN)
                .map_err(|_| err)?,
        };
        let mut root = ast.root().ok_or(CompileError::EmptyPattern)?;
        if ast.child_count(root) == 0 {
            return Err(CompileError::EmptyPattern);
        }
        while let Node::List {
            kind: ListKind::StmtList,
            children,
        } = ast.node(root)
        {
            if children.len() != 1 {
                break;
            }
            let only = children[0];
            ast.release_shallow(root);
            root = only;
        }
        ast.set_root(root);

        let mut captures = Vec::new();
        self.mark_captures(&mut ast, root, &mut captures);
        trace!(snippet, ?captures, "compiled rule snippet");
        Ok(Fragment {
            source: snippet.to_string(),
            ast,
            root,
            captures,
        })
    }

    fn capture_name<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.strip_prefix(self.sigil).filter(|name| !name.is_empty())
    }

    /// Replace sigil names, and variables wrapping them, by capture points
    fn mark_captures(&self, ast: &mut Ast, id: NodeId, captures: &mut Vec<String>) {
        let marked = match ast.node(id) {
            Node::Leaf { .. } => ast
                .name_text(id)
                .and_then(|text| self.capture_name(text))
                .map(|name| (name.to_string(), None)),
            Node::Fixed {
                kind: FixedKind::Var,
                children,
            } => children[0].and_then(|child| {
                ast.name_text(child)
                    .and_then(|text| self.capture_name(text))
                    .map(|name| (name.to_string(), Some(child)))
            }),
            _ => None,
        };

        if let Some((name, wrapped)) = marked {
            if let Some(child) = wrapped {
                ast.release(child);
            }
            if ast.set_node(id, Node::Capture { name: name.clone() }).is_ok() && !captures.contains(&name) {
                captures.push(name);
            }
            return;
        }

        for child in ast.children(id) {
            self.mark_captures(ast, child, captures);
        }
    }
}
