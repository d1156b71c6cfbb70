// Arena-backed AST shared by the host front end and the rewrite engine.
// Nodes are addressed by `NodeId` handles; every node variant carries only the
// kind enum that matches its shape, so child counts always agree with kinds.

pub mod source_gen;
pub use source_gen::{render_literal, NodeRef, ToSource};


use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of child slots any fixed or declaration node carries.
pub const MAX_ARITY: usize = 4;

/// Handle to a node inside an [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Literal payload of a leaf node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Declaration modifier flags
pub mod flags {
    pub const PUBLIC: u32 = 1 << 0;
    pub const PROTECTED: u32 = 1 << 1;
    pub const PRIVATE: u32 = 1 << 2;
    pub const STATIC: u32 = 1 << 3;
    pub const ABSTRACT: u32 = 1 << 4;
    pub const FINAL: u32 = 1 << 5;

    /// Modifier keywords in the order the source generator prints them
    pub const KEYWORDS: [(u32, &str); 6] = [
        (ABSTRACT, "abstract"),
        (FINAL, "final"),
        (PUBLIC, "public"),
        (PROTECTED, "protected"),
        (PRIVATE, "private"),
        (STATIC, "static"),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeafKind {
    /// Constant value: number, string, boolean, null, array
    Literal,
    /// Bare identifier text (function names, property names, variable names)
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    ShiftLeft,
    ShiftRight,
    BitOr,
    BitAnd,
    BitXor,
    BoolAnd,
    BoolOr,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Concat => ".",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::BitOr => "|",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BoolAnd => "&&",
            BinaryOp::BoolOr => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }

    /// Operators that have a compound assignment form (`+=`, `.=`, ...)
    pub fn has_compound_form(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Mod
                | BinaryOp::Pow
                | BinaryOp::Concat
                | BinaryOp::ShiftLeft
                | BinaryOp::ShiftRight
                | BinaryOp::BitOr
                | BinaryOp::BitAnd
                | BinaryOp::BitXor
        )
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "." => BinaryOp::Concat,
            "<<" => BinaryOp::ShiftLeft,
            ">>" => BinaryOp::ShiftRight,
            "|" => BinaryOp::BitOr,
            "&" => BinaryOp::BitAnd,
            "^" => BinaryOp::BitXor,
            "&&" => BinaryOp::BoolAnd,
            "||" => BinaryOp::BoolOr,
            "==" => BinaryOp::Equal,
            "!=" => BinaryOp::NotEqual,
            "===" => BinaryOp::Identical,
            "!==" => BinaryOp::NotIdentical,
            "<" => BinaryOp::Less,
            "<=" => BinaryOp::LessEqual,
            ">" => BinaryOp::Greater,
            ">=" => BinaryOp::GreaterEqual,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
        }
    }
}

/// Kinds with a fixed number of child slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixedKind {
    /// Variable reference: [name]
    Var,
    /// [left, right]
    Binary(BinaryOp),
    /// [operand]
    Unary(UnaryOp),
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    /// [target, value]
    Assign,
    /// Compound assignment `target op= value`: [target, value]
    AssignOp(BinaryOp),
    /// [condition, then, else]
    Conditional,
    /// [expr, class]
    Instanceof,
    /// [callee, args]
    Call,
    /// [object, method, args]
    MethodCall,
    /// [object, property]
    Prop,
    /// [object, index?]
    Dim,
    /// [class, args]
    New,
    /// [condition, then, else?]
    If,
    /// [condition, body]
    While,
    /// [init?, condition?, step?, body]
    For,
    /// [value?]
    Return,
    /// [value]
    Echo,
    /// [name, default?]
    Param,
}

impl FixedKind {
    pub const fn arity(self) -> usize {
        match self {
            FixedKind::Var
            | FixedKind::Unary(_)
            | FixedKind::PreInc
            | FixedKind::PreDec
            | FixedKind::PostInc
            | FixedKind::PostDec
            | FixedKind::Return
            | FixedKind::Echo => 1,
            FixedKind::Binary(_)
            | FixedKind::Assign
            | FixedKind::AssignOp(_)
            | FixedKind::Instanceof
            | FixedKind::Call
            | FixedKind::Prop
            | FixedKind::Dim
            | FixedKind::New
            | FixedKind::While
            | FixedKind::Param => 2,
            FixedKind::Conditional | FixedKind::MethodCall | FixedKind::If => 3,
            FixedKind::For => 4,
        }
    }

    /// Statement kinds are rendered without a trailing `;` of their own
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            FixedKind::If | FixedKind::While | FixedKind::For | FixedKind::Return | FixedKind::Echo
        )
    }
}

/// Kinds holding a runtime-sized sequence of children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    StmtList,
    ArgList,
    Array,
    ParamList,
    NameList,
    ClosureUses,
}

/// Declarations: fixed shape plus name and modifier flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    /// [params, uses, body, return_type]
    Function,
    /// [params, uses, body, return_type]
    Closure,
    /// [params, uses, body, return_type]
    Method,
    /// [extends, implements, body]
    Class,
}

impl DeclKind {
    pub const fn arity(self) -> usize {
        match self {
            DeclKind::Class => 3,
            DeclKind::Function | DeclKind::Closure | DeclKind::Method => 4,
        }
    }
}

/// Kind tag of any node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Leaf(LeafKind),
    Fixed(FixedKind),
    List(ListKind),
    Decl(DeclKind),
    /// Named wildcard; only present in compiled patterns and templates
    Capture,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Leaf(kind) => write!(f, "{kind:?}"),
            NodeKind::Fixed(FixedKind::Binary(op)) => write!(f, "Binary({})", op.symbol()),
            NodeKind::Fixed(FixedKind::AssignOp(op)) => write!(f, "AssignOp({}=)", op.symbol()),
            NodeKind::Fixed(FixedKind::Unary(op)) => write!(f, "Unary({})", op.symbol()),
            NodeKind::Fixed(kind) => write!(f, "{kind:?}"),
            NodeKind::List(kind) => write!(f, "{kind:?}"),
            NodeKind::Decl(kind) => write!(f, "{kind:?}Decl"),
            NodeKind::Capture => write!(f, "Capture"),
        }
    }
}

pub type Slots = [Option<NodeId>; MAX_ARITY];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        kind: LeafKind,
        value: Value,
    },
    Fixed {
        kind: FixedKind,
        children: Slots,
    },
    List {
        kind: ListKind,
        children: Vec<NodeId>,
    },
    Decl {
        kind: DeclKind,
        name: String,
        flags: u32,
        children: Slots,
    },
    Capture {
        name: String,
    },
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf { kind, .. } => NodeKind::Leaf(*kind),
            Node::Fixed { kind, .. } => NodeKind::Fixed(*kind),
            Node::List { kind, .. } => NodeKind::List(*kind),
            Node::Decl { kind, .. } => NodeKind::Decl(*kind),
            Node::Capture { .. } => NodeKind::Capture,
        }
    }

    /// Number of child slots: kind arity for fixed/declaration nodes, length for lists
    pub fn child_count(&self) -> usize {
        match self {
            Node::Leaf { .. } | Node::Capture { .. } => 0,
            Node::Fixed { kind, .. } => kind.arity(),
            Node::List { children, .. } => children.len(),
            Node::Decl { kind, .. } => kind.arity(),
        }
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        if index >= self.child_count() {
            return None;
        }
        match self {
            Node::Fixed { children, .. } | Node::Decl { children, .. } => children[index],
            Node::List { children, .. } => Some(children[index]),
            Node::Leaf { .. } | Node::Capture { .. } => None,
        }
    }

    fn children_mut(&mut self) -> ChildrenMut<'_> {
        match self {
            Node::Fixed { kind, children } => ChildrenMut::Slots(&mut children[..kind.arity()]),
            Node::Decl { kind, children, .. } => ChildrenMut::Slots(&mut children[..kind.arity()]),
            Node::List { children, .. } => ChildrenMut::List(children),
            Node::Leaf { .. } | Node::Capture { .. } => ChildrenMut::None,
        }
    }
}

enum ChildrenMut<'a> {
    None,
    Slots(&'a mut [Option<NodeId>]),
    List(&'a mut Vec<NodeId>),
}

/// Internal invariant failure: a node shape disagrees with its kind
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeViolation {
    #[error("{kind} expects {expected} children, got {actual}")]
    Arity {
        kind: NodeKind,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} has no child slot {index}")]
    NoSuchSlot { kind: NodeKind, index: usize },

    #[error("list node {kind} cannot hold an empty slot")]
    EmptyListSlot { kind: NodeKind },

    #[error("capture `{name}` has no binding")]
    UnboundCapture { name: String },

    #[error("node {0} is not live in this arena")]
    Dangling(NodeId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    line: u32,
    node: Node,
}

/// Index-based arena owning every node of one compilation unit or fragment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ast {
    origin: String,
    nodes: Vec<Option<Entry>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Default::default()
        }
    }

    /// Label of the source this tree was parsed from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Number of allocated, not yet released nodes
    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.index()), Some(Some(_)))
    }

    // --- construction -----------------------------------------------------

    fn alloc(&mut self, line: u32, node: Node) -> NodeId {
        let entry = Entry { line, node };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Some(entry);
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(Some(entry));
                id
            }
        }
    }

    pub fn leaf(&mut self, kind: LeafKind, value: Value, line: u32) -> NodeId {
        self.alloc(line, Node::Leaf { kind, value })
    }

    pub fn literal(&mut self, value: Value, line: u32) -> NodeId {
        self.leaf(LeafKind::Literal, value, line)
    }

    pub fn name(&mut self, text: impl Into<String>, line: u32) -> NodeId {
        self.leaf(LeafKind::Name, Value::String(text.into()), line)
    }

    /// Variable reference `name`
    pub fn var(&mut self, name: impl Into<String>, line: u32) -> NodeId {
        let name = self.name(name, line);
        let mut children = [None; MAX_ARITY];
        children[0] = Some(name);
        self.alloc(
            line,
            Node::Fixed {
                kind: FixedKind::Var,
                children,
            },
        )
    }

    pub fn fixed(
        &mut self,
        kind: FixedKind,
        slots: &[Option<NodeId>],
        line: u32,
    ) -> Result<NodeId, ShapeViolation> {
        let children = Self::pack_slots(NodeKind::Fixed(kind), kind.arity(), slots)?;
        Ok(self.alloc(line, Node::Fixed { kind, children }))
    }

    pub fn list(&mut self, kind: ListKind, children: Vec<NodeId>, line: u32) -> NodeId {
        self.alloc(line, Node::List { kind, children })
    }

    pub fn decl(
        &mut self,
        kind: DeclKind,
        name: impl Into<String>,
        flags: u32,
        slots: &[Option<NodeId>],
        line: u32,
    ) -> Result<NodeId, ShapeViolation> {
        let children = Self::pack_slots(NodeKind::Decl(kind), kind.arity(), slots)?;
        Ok(self.alloc(
            line,
            Node::Decl {
                kind,
                name: name.into(),
                flags,
                children,
            },
        ))
    }

    pub fn capture(&mut self, name: impl Into<String>, line: u32) -> NodeId {
        self.alloc(line, Node::Capture { name: name.into() })
    }

    fn pack_slots(
        kind: NodeKind,
        arity: usize,
        slots: &[Option<NodeId>],
    ) -> Result<Slots, ShapeViolation> {
        if slots.len() != arity {
            return Err(ShapeViolation::Arity {
                kind,
                expected: arity,
                actual: slots.len(),
            });
        }
        let mut children = [None; MAX_ARITY];
        children[..arity].copy_from_slice(slots);
        Ok(children)
    }

    // --- queries ------------------------------------------------------------

    fn entry(&self, id: NodeId) -> &Entry {
        match self.nodes.get(id.index()) {
            Some(Some(entry)) => entry,
            _ => panic!("{}", ShapeViolation::Dangling(id)),
        }
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut Entry, ShapeViolation> {
        match self.nodes.get_mut(id.index()) {
            Some(Some(entry)) => Ok(entry),
            _ => Err(ShapeViolation::Dangling(id)),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.entry(id).node
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(|e| e.as_ref()).map(|e| &e.node)
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    pub fn line(&self, id: NodeId) -> u32 {
        self.entry(id).line
    }

    pub fn is_list(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::List { .. })
    }

    pub fn is_declaration(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Decl { .. })
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).child_count()
    }

    /// Child in slot `index`; `None` for empty slots and out-of-range indices
    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).child(index)
    }

    /// Occupied child slots in order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let node = self.node(id);
        (0..node.child_count()).filter_map(|i| node.child(i)).collect()
    }

    pub fn literal_value(&self, id: NodeId) -> Option<&Value> {
        match self.node(id) {
            Node::Leaf { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Identifier text of a `Name` leaf
    pub fn name_text(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            Node::Leaf {
                kind: LeafKind::Name,
                value,
            } => value.as_str(),
            _ => None,
        }
    }

    /// Follow statement lists that hold exactly one statement
    pub fn unwrap_single(&self, mut id: NodeId) -> NodeId {
        while let Node::List {
            kind: ListKind::StmtList,
            children,
        } = self.node(id)
        {
            if children.len() != 1 {
                break;
            }
            id = children[0];
        }
        id
    }

    // --- mutation -------------------------------------------------------------

    pub fn set_child(
        &mut self,
        id: NodeId,
        index: usize,
        child: Option<NodeId>,
    ) -> Result<(), ShapeViolation> {
        let entry = self.entry_mut(id)?;
        let kind = entry.node.kind();
        match entry.node.children_mut() {
            ChildrenMut::Slots(slots) if index < slots.len() => {
                slots[index] = child;
                Ok(())
            }
            ChildrenMut::List(children) if index < children.len() => match child {
                Some(child) => {
                    children[index] = child;
                    Ok(())
                }
                None => Err(ShapeViolation::EmptyListSlot { kind }),
            },
            _ => Err(ShapeViolation::NoSuchSlot { kind, index }),
        }
    }

    /// Overwrite the node stored at `id`, keeping its line number
    pub fn set_node(&mut self, id: NodeId, node: Node) -> Result<Node, ShapeViolation> {
        let entry = self.entry_mut(id)?;
        Ok(std::mem::replace(&mut entry.node, node))
    }

    /// Replace the subtree at `id` with the freshly built subtree rooted at
    /// `replacement`. The old children of `id` are released, the replacement's
    /// root moves into `id`'s slot, so parents keep pointing at `id`.
    pub fn replace_with(&mut self, id: NodeId, replacement: NodeId) -> Result<(), ShapeViolation> {
        if id == replacement {
            return Ok(());
        }
        let moved = self.take_entry(replacement)?;
        for child in self.children(id) {
            self.release(child);
        }
        let entry = self.entry_mut(id)?;
        *entry = moved;
        Ok(())
    }

    fn take_entry(&mut self, id: NodeId) -> Result<Entry, ShapeViolation> {
        let entry = self
            .nodes
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(ShapeViolation::Dangling(id))?;
        self.free.push(id);
        Ok(entry)
    }

    /// Release a subtree exclusively owned by its parent slot
    pub fn release(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        for child in self.children(id) {
            self.release(child);
        }
        if self.root == Some(id) {
            self.root = None;
        }
        // take_entry cannot fail: liveness checked above
        let _ = self.take_entry(id);
    }

    /// Drop a node without touching its children (used when unwrapping)
    pub fn release_shallow(&mut self, id: NodeId) {
        if self.contains(id) {
            if self.root == Some(id) {
                self.root = None;
            }
            let _ = self.take_entry(id);
        }
    }

    /// Deep copy of a subtree within this arena
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let entry = self.entry(id).clone();
        let node = self.copy_children(entry.node, |ast, child| ast.deep_copy(child));
        self.alloc(entry.line, node)
    }

    /// Deep copy of a subtree from another arena into this one
    pub fn import(&mut self, other: &Ast, id: NodeId) -> NodeId {
        let entry = other.entry(id).clone();
        let node = self.copy_children(entry.node, |ast, child| ast.import(other, child));
        self.alloc(entry.line, node)
    }

    fn copy_children<F>(&mut self, mut node: Node, mut copy: F) -> Node
    where
        F: FnMut(&mut Self, NodeId) -> NodeId,
    {
        match node.children_mut() {
            ChildrenMut::Slots(slots) => {
                for slot in slots.iter_mut() {
                    *slot = slot.map(|child| copy(self, child));
                }
            }
            ChildrenMut::List(children) => {
                for child in children.iter_mut() {
                    *child = copy(self, *child);
                }
            }
            ChildrenMut::None => {}
        }
        node
    }

    /// Structural equality of two subtrees, ignoring line numbers
    pub fn structurally_eq(&self, a: NodeId, other: &Ast, b: NodeId) -> bool {
        let (left, right) = (self.node(a), other.node(b));
        let slots_eq = |x: &[Option<NodeId>], y: &[Option<NodeId>]| {
            x.len() == y.len()
                && x.iter().zip(y).all(|pair| match pair {
                    (None, None) => true,
                    (Some(x), Some(y)) => self.structurally_eq(*x, other, *y),
                    _ => false,
                })
        };
        match (left, right) {
            (
                Node::Leaf { kind: k1, value: v1 },
                Node::Leaf { kind: k2, value: v2 },
            ) => k1 == k2 && v1 == v2,
            (
                Node::Fixed { kind: k1, children: c1 },
                Node::Fixed { kind: k2, children: c2 },
            ) => k1 == k2 && slots_eq(&c1[..k1.arity()], &c2[..k2.arity()]),
            (
                Node::List { kind: k1, children: c1 },
                Node::List { kind: k2, children: c2 },
            ) => {
                k1 == k2
                    && c1.len() == c2.len()
                    && c1
                        .iter()
                        .zip(c2)
                        .all(|(x, y)| self.structurally_eq(*x, other, *y))
            }
            (
                Node::Decl {
                    kind: k1,
                    name: n1,
                    flags: f1,
                    children: c1,
                },
                Node::Decl {
                    kind: k2,
                    name: n2,
                    flags: f2,
                    children: c2,
                },
            ) => {
                k1 == k2
                    && n1 == n2
                    && f1 == f2
                    && slots_eq(&c1[..k1.arity()], &c2[..k2.arity()])
            }
            (Node::Capture { name: n1 }, Node::Capture { name: n2 }) => n1 == n2,
            _ => false,
        }
    }

    /// Structural equality of the two roots
    pub fn same_tree(&self, other: &Ast) -> bool {
        match (self.root, other.root) {
            (Some(a), Some(b)) => self.structurally_eq(a, other, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Indented kind tree for diagnostics
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        let node = self.node(id);
        match node {
            Node::Leaf { kind, value } => {
                out.push_str(&format!("{pad}{kind:?} {}\n", render_literal(value)));
            }
            Node::Capture { name } => out.push_str(&format!("{pad}<${name}>\n")),
            Node::Decl { name, flags, .. } => {
                let flags = if *flags == 0 {
                    String::new()
                } else {
                    format!("0x{flags:x} ")
                };
                out.push_str(&format!(
                    "{pad}{} {name} {flags}({} children)\n",
                    node.kind(),
                    node.child_count()
                ));
            }
            _ => out.push_str(&format!(
                "{pad}{} ({} children)\n",
                node.kind(),
                node.child_count()
            )),
        }
        for index in 0..node.child_count() {
            match node.child(index) {
                Some(child) => self.dump_into(child, depth + 1, out),
                None => out.push_str(&format!("{pad}  -\n")),
            }
        }
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef::new(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(ast: &mut Ast, left: NodeId, right: NodeId) -> NodeId {
        ast.fixed(FixedKind::Binary(BinaryOp::Add), &[Some(left), Some(right)], 1)
            .unwrap()
    }

    #[test]
    fn test_child_count_follows_kind() {
        let mut ast = Ast::new("test");
        let x = ast.var("x", 1);
        let one = ast.literal(Value::Integer(1), 1);
        let sum = add(&mut ast, x, one);
        let ret = ast.fixed(FixedKind::Return, &[None], 1).unwrap();
        let block = ast.list(ListKind::StmtList, vec![sum, ret], 1);

        assert_eq!(ast.child_count(sum), 2);
        assert_eq!(ast.child_count(ret), 1);
        assert_eq!(ast.child(ret, 0), None);
        assert_eq!(ast.child_count(block), 2);
        assert!(ast.is_list(block));
        assert_eq!(ast.child_count(one), 0);
        assert_eq!(ast.literal_value(one), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_fixed_rejects_wrong_arity() {
        let mut ast = Ast::new("test");
        let x = ast.var("x", 1);
        let err = ast
            .fixed(FixedKind::Binary(BinaryOp::Add), &[Some(x)], 1)
            .unwrap_err();
        assert_eq!(
            err,
            ShapeViolation::Arity {
                kind: NodeKind::Fixed(FixedKind::Binary(BinaryOp::Add)),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_declaration_shapes() {
        let mut ast = Ast::new("test");
        let params = ast.list(ListKind::ParamList, vec![], 1);
        let body = ast.list(ListKind::StmtList, vec![], 1);
        let func = ast
            .decl(DeclKind::Function, "f", 0, &[Some(params), None, Some(body), None], 1)
            .unwrap();
        assert!(ast.is_declaration(func));
        assert_eq!(ast.child_count(func), 4);

        let class_body = ast.list(ListKind::StmtList, vec![], 1);
        assert!(ast
            .decl(DeclKind::Class, "A", 0, &[None, None, Some(class_body), None], 1)
            .is_err());
        let class = ast
            .decl(DeclKind::Class, "A", 0, &[None, None, Some(class_body)], 1)
            .unwrap();
        assert_eq!(ast.child_count(class), 3);
    }

    #[test]
    fn test_release_reuses_slots() {
        let mut ast = Ast::new("test");
        let x = ast.var("x", 1);
        let y = ast.var("y", 1);
        let sum = add(&mut ast, x, y);
        assert_eq!(ast.live_nodes(), 5);

        ast.release(sum);
        assert_eq!(ast.live_nodes(), 0);
        assert!(!ast.contains(sum));

        let z = ast.var("z", 2);
        assert_eq!(ast.live_nodes(), 2);
        assert!(z.index() < 5);
    }

    #[test]
    fn test_replace_with_keeps_parent_slot() {
        let mut ast = Ast::new("test");
        let x = ast.var("x", 1);
        let y = ast.var("y", 1);
        let sum = add(&mut ast, x, y);
        let echo = ast.fixed(FixedKind::Echo, &[Some(sum)], 1).unwrap();

        let replacement = ast.literal(Value::Integer(3), 1);
        ast.replace_with(sum, replacement).unwrap();

        assert_eq!(ast.child(echo, 0), Some(sum));
        assert_eq!(ast.literal_value(sum), Some(&Value::Integer(3)));
        assert!(!ast.contains(x));
        assert!(!ast.contains(y));
        assert_eq!(ast.live_nodes(), 2);
    }

    #[test]
    fn test_import_and_structural_equality() {
        let mut first = Ast::new("first");
        let x = first.var("x", 1);
        let two = first.literal(Value::Integer(2), 1);
        let product = first
            .fixed(FixedKind::Binary(BinaryOp::Mul), &[Some(x), Some(two)], 1)
            .unwrap();

        let mut second = Ast::new("second");
        let copied = second.import(&first, product);
        assert!(first.structurally_eq(product, &second, copied));

        let other = second.literal(Value::Float(2.0), 7);
        second.set_child(copied, 1, Some(other)).unwrap();
        assert!(!first.structurally_eq(product, &second, copied));
    }

    #[test]
    fn test_unwrap_single_statement_lists() {
        let mut ast = Ast::new("test");
        let x = ast.var("x", 1);
        let inner = ast.list(ListKind::StmtList, vec![x], 1);
        let outer = ast.list(ListKind::StmtList, vec![inner], 1);
        assert_eq!(ast.unwrap_single(outer), x);

        let y = ast.var("y", 1);
        let pair = ast.list(ListKind::StmtList, vec![x, y], 1);
        assert_eq!(ast.unwrap_single(pair), pair);
    }

    #[test]
    fn test_set_child_errors() {
        let mut ast = Ast::new("test");
        let one = ast.literal(Value::Integer(1), 1);
        let args = ast.list(ListKind::ArgList, vec![one], 1);
        assert!(matches!(
            ast.set_child(one, 0, None),
            Err(ShapeViolation::NoSuchSlot { .. })
        ));
        assert!(matches!(
            ast.set_child(args, 0, None),
            Err(ShapeViolation::EmptyListSlot { .. })
        ));
    }

    #[test]
    fn test_value_equality_is_strict() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(
            Value::Array(vec![Value::Integer(1), Value::Null]),
            Value::Array(vec![Value::Integer(1), Value::Null])
        );
    }
}
