// Source code generation from the arena AST
// Prints the host language back out with the minimal parentheses needed for
// the printed text to parse into the same tree.

use super::*;

/// Trait for things that can generate their source code representation
pub trait ToSource {
    fn to_source(&self) -> String;
}

/// Borrowed view of one subtree, printable on its own
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    ast: &'a Ast,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn new(ast: &'a Ast, id: NodeId) -> Self {
        Self { ast, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl ToSource for NodeRef<'_> {
    fn to_source(&self) -> String {
        let printer = Printer { ast: self.ast };
        let is_program = matches!(self.ast.kind(self.id), NodeKind::List(ListKind::StmtList));
        if is_program && self.ast.root() == Some(self.id) {
            return printer.program(self.id);
        }
        if printer.is_statement(self.id) {
            printer.stmt(self.id, 0)
        } else {
            printer.expr(self.id, LOWEST, 0)
        }
    }
}

impl ToSource for Ast {
    fn to_source(&self) -> String {
        match self.root() {
            Some(root) => self.node_ref(root).to_source(),
            None => String::new(),
        }
    }
}

impl ToSource for Value {
    fn to_source(&self) -> String {
        render_literal(self)
    }
}

/// Render a literal value as host-language source
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) if f.is_nan() => "NAN".to_string(),
        Value::Float(f) if f.is_infinite() => {
            if *f > 0.0 {
                "INF".to_string()
            } else {
                "-INF".to_string()
            }
        }
        Value::Float(f) => format!("{f:?}"),
        Value::String(s) => {
            let mut result = String::with_capacity(s.len() + 2);
            result.push('"');
            for c in s.chars() {
                match c {
                    '"' => result.push_str("\\\""),
                    '\\' => result.push_str("\\\\"),
                    '\n' => result.push_str("\\n"),
                    '\t' => result.push_str("\\t"),
                    '\r' => result.push_str("\\r"),
                    '\0' => result.push_str("\\0"),
                    c => result.push(c),
                }
            }
            result.push('"');
            result
        }
        Value::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(render_literal)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

// Binding strength, loosest first
const LOWEST: u8 = 0;
const ASSIGN: u8 = 1;
const TERNARY: u8 = 2;
const INSTANCEOF: u8 = 13;
const UNARY: u8 = 14;
const POW: u8 = 15;
const POSTFIX: u8 = 16;
const PRIMARY: u8 = 17;

pub(crate) fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::BoolOr => 3,
        BinaryOp::BoolAnd => 4,
        BinaryOp::BitOr => 5,
        BinaryOp::BitXor => 6,
        BinaryOp::BitAnd => 7,
        BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Identical | BinaryOp::NotIdentical => 8,
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => 9,
        BinaryOp::ShiftLeft | BinaryOp::ShiftRight => 10,
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Concat => 11,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 12,
        BinaryOp::Pow => POW,
    }
}

const INDENT: &str = "    ";

struct Printer<'a> {
    ast: &'a Ast,
}

impl Printer<'_> {
    fn is_statement(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::Fixed(kind) => kind.is_statement(),
            NodeKind::List(ListKind::StmtList) => true,
            NodeKind::Decl(kind) => kind != DeclKind::Closure,
            _ => false,
        }
    }

    fn program(&self, id: NodeId) -> String {
        self.ast
            .children(id)
            .into_iter()
            .map(|stmt| self.stmt(stmt, 0))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn slot(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.ast.child(id, index)
    }

    fn name_of(&self, id: Option<NodeId>) -> String {
        match id {
            Some(id) => match self.ast.node(id) {
                Node::Leaf {
                    kind: LeafKind::Name,
                    value,
                } => value.as_str().unwrap_or_default().to_string(),
                _ => self.expr(id, POSTFIX, 0),
            },
            None => String::new(),
        }
    }

    fn block(&self, id: NodeId, indent: usize) -> String {
        let stmts = self.ast.children(id);
        if stmts.is_empty() {
            return "{}".to_string();
        }
        let inner = INDENT.repeat(indent + 1);
        let mut result = "{\n".to_string();
        for stmt in stmts {
            result.push_str(&format!("{inner}{}\n", self.stmt(stmt, indent + 1)));
        }
        result.push_str(&INDENT.repeat(indent));
        result.push('}');
        result
    }

    /// Body of a control structure: a braced block or a single inline statement
    fn branch(&self, id: NodeId, indent: usize) -> String {
        if matches!(self.ast.kind(id), NodeKind::List(ListKind::StmtList)) {
            self.block(id, indent)
        } else {
            self.stmt(id, indent)
        }
    }

    fn stmt(&self, id: NodeId, indent: usize) -> String {
        let node = self.ast.node(id);
        match node {
            Node::List {
                kind: ListKind::StmtList,
                ..
            } => self.block(id, indent),
            Node::Fixed { kind, .. } => match kind {
                FixedKind::If => {
                    let cond = self.opt_expr(self.slot(id, 0));
                    let mut result = format!("if ({cond}) ");
                    if let Some(then) = self.slot(id, 1) {
                        result.push_str(&self.branch(then, indent));
                    } else {
                        result.push(';');
                    }
                    if let Some(otherwise) = self.slot(id, 2) {
                        result.push_str(" else ");
                        result.push_str(&self.branch(otherwise, indent));
                    }
                    result
                }
                FixedKind::While => {
                    let cond = self.opt_expr(self.slot(id, 0));
                    let body = self.opt_branch(self.slot(id, 1), indent);
                    format!("while ({cond}) {body}")
                }
                FixedKind::For => {
                    let init = self.opt_expr(self.slot(id, 0));
                    let cond = self.opt_expr(self.slot(id, 1));
                    let step = self.opt_expr(self.slot(id, 2));
                    let body = self.opt_branch(self.slot(id, 3), indent);
                    let header = [init, cond, step].join("; ");
                    format!("for ({}) {body}", header.trim_end())
                }
                FixedKind::Return => match self.slot(id, 0) {
                    Some(value) => format!("return {};", self.expr(value, LOWEST, indent)),
                    None => "return;".to_string(),
                },
                FixedKind::Echo => format!("echo {};", self.opt_expr(self.slot(id, 0))),
                _ => format!("{};", self.expr(id, LOWEST, indent)),
            },
            Node::Decl {
                kind,
                name,
                flags,
                ..
            } => {
                let modifiers = modifiers(*flags);
                match kind {
                    DeclKind::Class => {
                        let mut result = format!("{modifiers}class {name}");
                        if let Some(parent) = self.slot(id, 0) {
                            result.push_str(&format!(" extends {}", self.name_of(Some(parent))));
                        }
                        if let Some(interfaces) = self.slot(id, 1) {
                            let names = self.comma_list(interfaces, indent);
                            if !names.is_empty() {
                                result.push_str(&format!(" implements {names}"));
                            }
                        }
                        result.push(' ');
                        match self.slot(id, 2) {
                            Some(body) => result.push_str(&self.block(body, indent)),
                            None => result.push_str("{}"),
                        }
                        result
                    }
                    DeclKind::Closure => format!("{};", self.expr(id, LOWEST, indent)),
                    DeclKind::Function | DeclKind::Method => {
                        let mut result = format!("{modifiers}function {name}{}", self.signature(id, indent));
                        match self.slot(id, 2) {
                            Some(body) => {
                                result.push(' ');
                                result.push_str(&self.block(body, indent));
                            }
                            None => result.push(';'),
                        }
                        result
                    }
                }
            }
            _ => format!("{};", self.expr(id, LOWEST, indent)),
        }
    }

    fn opt_expr(&self, id: Option<NodeId>) -> String {
        id.map(|id| self.expr(id, LOWEST, 0)).unwrap_or_default()
    }

    fn opt_branch(&self, id: Option<NodeId>, indent: usize) -> String {
        match id {
            Some(id) => self.branch(id, indent),
            None => ";".to_string(),
        }
    }

    /// `(params) use (vars): type` of a function-like declaration
    fn signature(&self, id: NodeId, indent: usize) -> String {
        let params = self
            .slot(id, 0)
            .map(|list| self.comma_list(list, indent))
            .unwrap_or_default();
        let mut result = format!("({params})");
        if let Some(uses) = self.slot(id, 1) {
            if self.ast.child_count(uses) > 0 {
                result.push_str(&format!(" use ({})", self.comma_list(uses, indent)));
            }
        }
        if let Some(return_type) = self.slot(id, 3) {
            result.push_str(&format!(": {}", self.name_of(Some(return_type))));
        }
        result
    }

    fn comma_list(&self, id: NodeId, indent: usize) -> String {
        self.ast
            .children(id)
            .into_iter()
            .map(|item| self.expr(item, ASSIGN, indent))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn precedence(&self, id: NodeId) -> u8 {
        match self.ast.kind(id) {
            NodeKind::Fixed(kind) => match kind {
                FixedKind::Binary(op) => binary_precedence(op),
                FixedKind::Assign | FixedKind::AssignOp(_) => ASSIGN,
                FixedKind::Conditional => TERNARY,
                FixedKind::Instanceof => INSTANCEOF,
                FixedKind::Unary(_) | FixedKind::PreInc | FixedKind::PreDec => UNARY,
                FixedKind::PostInc
                | FixedKind::PostDec
                | FixedKind::Call
                | FixedKind::MethodCall
                | FixedKind::Prop
                | FixedKind::Dim => POSTFIX,
                FixedKind::Var | FixedKind::New | FixedKind::Param => PRIMARY,
                FixedKind::If
                | FixedKind::While
                | FixedKind::For
                | FixedKind::Return
                | FixedKind::Echo => LOWEST,
            },
            NodeKind::List(ListKind::StmtList) => LOWEST,
            _ => PRIMARY,
        }
    }

    /// Render `id` as an expression in a context binding at least `min`
    fn expr(&self, id: NodeId, min: u8, indent: usize) -> String {
        let text = self.bare_expr(id, indent);
        if self.precedence(id) < min {
            format!("({text})")
        } else {
            text
        }
    }

    fn bare_expr(&self, id: NodeId, indent: usize) -> String {
        let node = self.ast.node(id);
        let child = |index: usize, min: u8| {
            self.slot(id, index)
                .map(|c| self.expr(c, min, indent))
                .unwrap_or_default()
        };
        match node {
            Node::Leaf {
                kind: LeafKind::Name,
                value,
            } => value.as_str().unwrap_or_default().to_string(),
            Node::Leaf { value, .. } => render_literal(value),
            Node::Capture { name } => format!("${name}"),
            Node::List { kind, .. } => match kind {
                ListKind::Array => format!("[{}]", self.comma_list(id, indent)),
                ListKind::StmtList => self.block(id, indent),
                _ => self.comma_list(id, indent),
            },
            Node::Decl {
                kind: DeclKind::Closure,
                ..
            } => {
                let mut result = format!("function {}", self.signature(id, indent));
                result.push(' ');
                match self.slot(id, 2) {
                    Some(body) => result.push_str(&self.block(body, indent)),
                    None => result.push_str("{}"),
                }
                result
            }
            Node::Decl { .. } => self.stmt(id, indent),
            Node::Fixed { kind, .. } => match kind {
                FixedKind::Var => self.name_of(self.slot(id, 0)),
                FixedKind::Binary(op) => {
                    let (left, right) = if *op == BinaryOp::Pow {
                        (child(0, POSTFIX), child(1, UNARY))
                    } else {
                        let prec = binary_precedence(*op);
                        (child(0, prec), child(1, prec + 1))
                    };
                    format!("{left} {} {right}", op.symbol())
                }
                FixedKind::Unary(op) => prefix(op.symbol(), child(0, UNARY)),
                FixedKind::PreInc => prefix("++", child(0, UNARY)),
                FixedKind::PreDec => prefix("--", child(0, UNARY)),
                FixedKind::PostInc => format!("{}++", child(0, POSTFIX)),
                FixedKind::PostDec => format!("{}--", child(0, POSTFIX)),
                FixedKind::Assign => format!("{} = {}", child(0, POSTFIX), child(1, ASSIGN)),
                FixedKind::AssignOp(op) => {
                    format!("{} {}= {}", child(0, POSTFIX), op.symbol(), child(1, ASSIGN))
                }
                FixedKind::Conditional => format!(
                    "{} ? {} : {}",
                    child(0, TERNARY + 1),
                    child(1, ASSIGN),
                    child(2, TERNARY)
                ),
                FixedKind::Instanceof => {
                    format!("{} instanceof {}", child(0, INSTANCEOF), child(1, UNARY))
                }
                FixedKind::Call => format!(
                    "{}({})",
                    self.name_of(self.slot(id, 0)),
                    self.opt_list(self.slot(id, 1), indent)
                ),
                FixedKind::MethodCall => format!(
                    "{}->{}({})",
                    child(0, POSTFIX),
                    self.name_of(self.slot(id, 1)),
                    self.opt_list(self.slot(id, 2), indent)
                ),
                FixedKind::Prop => {
                    format!("{}->{}", child(0, POSTFIX), self.name_of(self.slot(id, 1)))
                }
                FixedKind::Dim => format!("{}[{}]", child(0, POSTFIX), child(1, LOWEST)),
                FixedKind::New => format!(
                    "new {}({})",
                    self.name_of(self.slot(id, 0)),
                    self.opt_list(self.slot(id, 1), indent)
                ),
                FixedKind::Param => match self.slot(id, 1) {
                    Some(default) => format!(
                        "{} = {}",
                        self.name_of(self.slot(id, 0)),
                        self.expr(default, ASSIGN, indent)
                    ),
                    None => self.name_of(self.slot(id, 0)),
                },
                FixedKind::If
                | FixedKind::While
                | FixedKind::For
                | FixedKind::Return
                | FixedKind::Echo => self.stmt(id, indent),
            },
        }
    }

    fn opt_list(&self, id: Option<NodeId>, indent: usize) -> String {
        id.map(|list| self.comma_list(list, indent)).unwrap_or_default()
    }
}

/// Prefix operator application; keeps `- -x` from lexing as `--x`
fn prefix(op: &str, operand: String) -> String {
    let last = op.chars().last();
    if last.is_some() && operand.starts_with(|c| Some(c) == last && (c == '-' || c == '+')) {
        format!("{op} {operand}")
    } else {
        format!("{op}{operand}")
    }
}

fn modifiers(bits: u32) -> String {
    flags::KEYWORDS
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, keyword)| format!("{keyword} "))
        .collect()
}
