// Recursive-descent grammar for the host language, built from the nom token
// parsers in `lexer`. Nodes are allocated straight into the unit's arena.

use std::cell::RefCell;

use nom::error::{VerboseError, VerboseErrorKind};

use super::lexer::{
    at_digit, at_quote, error, identifier, is_keyword, kw, number, open_tag, operator, peek_word,
    string, sym, ws, R,
};
use super::ParseError;
use crate::ast::source_gen::binary_precedence;
use crate::ast::{flags, Ast, BinaryOp, DeclKind, FixedKind, ListKind, NodeId, UnaryOp, Value};

type Fail<'s> = nom::Err<VerboseError<&'s str>>;

/// Loosest and tightest left-associative binary levels
const LOOSEST_BINARY: u8 = 3;
const TIGHTEST_BINARY: u8 = 12;

pub(crate) const CLOSURE_NAME: &str = "{closure}";

pub(crate) fn parse_unit(source: &str, origin: &str, sigil: char) -> Result<Ast, ParseError> {
    let grammar = Grammar::new(source, origin, sigil);
    match grammar.program(source) {
        Ok(_) => Ok(grammar.ast.into_inner()),
        Err(err) => Err(grammar.parse_error(err)),
    }
}

struct Grammar<'s> {
    source: &'s str,
    origin: &'s str,
    sigil: char,
    line_starts: Vec<usize>,
    ast: RefCell<Ast>,
}

impl<'s> Grammar<'s> {
    fn new(source: &'s str, origin: &'s str, sigil: char) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            origin,
            sigil,
            line_starts,
            ast: RefCell::new(Ast::new(origin)),
        }
    }

    // --- positions and errors ----------------------------------------------

    fn offset(&self, input: &str) -> usize {
        self.source.len() - input.len()
    }

    fn line_at(&self, input: &str) -> u32 {
        let offset = self.offset(input);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index + 1,
            Err(index) => index,
        };
        line as u32
    }

    fn column_at(&self, input: &str) -> u32 {
        let offset = self.offset(input);
        let line_start = self.line_starts[self.line_at(input) as usize - 1];
        self.source[line_start..offset].chars().count() as u32 + 1
    }

    /// Skip trivia and report the line the next token starts on
    fn here(&self, input: &'s str) -> R<'s, u32> {
        let (input, _) = ws(input)?;
        Ok((input, self.line_at(input)))
    }

    fn parse_error(&self, err: Fail<'s>) -> ParseError {
        let errors = match err {
            nom::Err::Error(e) | nom::Err::Failure(e) => e.errors,
            nom::Err::Incomplete(_) => Vec::new(),
        };
        let described = errors
            .iter()
            .find(|(_, kind)| matches!(kind, VerboseErrorKind::Context(_) | VerboseErrorKind::Char(_)))
            .or_else(|| errors.first());
        let (input, message) = match described {
            Some((input, VerboseErrorKind::Context(ctx))) if ctx.contains(' ') => (*input, ctx.to_string()),
            Some((input, VerboseErrorKind::Context(token))) => (*input, format!("expected `{token}`")),
            Some((input, VerboseErrorKind::Char(c))) => (*input, format!("expected `{c}`")),
            Some((input, VerboseErrorKind::Nom(kind))) => (*input, format!("unexpected input ({kind:?})")),
            None => ("", "unexpected end of input".to_string()),
        };
        let near = match input.lines().next().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let snippet: String = text.chars().take(16).collect();
                format!(" near `{snippet}`")
            }
            _ => " at end of input".to_string(),
        };
        ParseError {
            origin: self.origin.to_string(),
            line: self.line_at(input),
            column: self.column_at(input),
            message: format!("{message}{near}"),
        }
    }

    /// Committed failure; stops the parse at `input`
    fn commit(&self, input: &'s str, message: &'static str) -> Fail<'s> {
        nom::Err::Failure(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context(message))],
        })
    }

    fn shape_failure(&self, input: &'s str) -> Fail<'s> {
        self.commit(input, "malformed syntax tree")
    }

    /// `sym` that turns a miss into a committed failure
    fn expect(&self, input: &'s str, symbol: &'static str) -> R<'s, &'s str> {
        sym(symbol)(input).map_err(|e| match e {
            nom::Err::Error(e) => nom::Err::Failure(e),
            other => other,
        })
    }

    // --- node helpers -------------------------------------------------------

    fn fixed(
        &self,
        input: &'s str,
        kind: FixedKind,
        slots: &[Option<NodeId>],
        line: u32,
    ) -> Result<NodeId, Fail<'s>> {
        self.ast
            .borrow_mut()
            .fixed(kind, slots, line)
            .map_err(|_| self.shape_failure(input))
    }

    fn list(&self, kind: ListKind, children: Vec<NodeId>, line: u32) -> NodeId {
        self.ast.borrow_mut().list(kind, children, line)
    }

    fn name(&self, text: &str, line: u32) -> NodeId {
        self.ast.borrow_mut().name(text, line)
    }

    fn line_of(&self, id: NodeId) -> u32 {
        self.ast.borrow().line(id)
    }

    fn ident(&self, input: &'s str) -> R<'s, &'s str> {
        let (rest, text) = identifier(self.sigil)(input)?;
        if is_keyword(text) {
            return error(input, "expected identifier");
        }
        Ok((rest, text))
    }

    // --- statements ---------------------------------------------------------

    fn program(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, _) = open_tag(input)?;
        let (input, stmts) = self.statements(input, false)?;
        let (input, _) = ws(input)?;
        let input = input.strip_prefix("?>").unwrap_or(input);
        let (input, _) = ws(input)?;
        if !input.is_empty() {
            return error(input, "expected statement");
        }
        let root = self.list(ListKind::StmtList, stmts, 1);
        self.ast.borrow_mut().set_root(root);
        Ok((input, root))
    }

    fn statements(&self, mut input: &'s str, braced: bool) -> R<'s, Vec<NodeId>> {
        let mut stmts = Vec::new();
        loop {
            let (rest, _) = ws(input)?;
            if braced && rest.starts_with('}') {
                return Ok((rest, stmts));
            }
            if !braced && (rest.is_empty() || rest.starts_with("?>")) {
                return Ok((rest, stmts));
            }
            if rest.is_empty() {
                return error(rest, "expected `}` before end of input");
            }
            let (rest, stmt) = self.statement(rest)?;
            stmts.extend(stmt);
            input = rest;
        }
    }

    fn block(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, line) = self.here(input)?;
        let (input, _) = self.expect(input, "{")?;
        let (input, stmts) = self.statements(input, true)?;
        let (input, _) = self.expect(input, "}")?;
        Ok((input, self.list(ListKind::StmtList, stmts, line)))
    }

    /// One statement; `None` for the empty statement `;`
    fn statement(&self, input: &'s str) -> R<'s, Option<NodeId>> {
        let (input, line) = self.here(input)?;
        if let Ok((rest, _)) = sym(";")(input) {
            return Ok((rest, None));
        }
        if input.starts_with('{') {
            let (rest, block) = self.block(input)?;
            return Ok((rest, Some(block)));
        }
        let (rest, stmt) = match peek_word(input) {
            Some("if") => {
                let (rest, _) = kw("if")(input)?;
                self.if_rest(rest, line)?
            }
            Some("while") => self.while_stmt(input, line)?,
            Some("for") => self.for_stmt(input, line)?,
            Some("return") => self.return_stmt(input, line)?,
            Some("echo") => self.echo_stmt(input, line)?,
            Some("function") if self.is_named_function(input) => self.function_decl(input, line)?,
            Some("class" | "abstract" | "final") => self.class_decl(input, line)?,
            _ => {
                let (rest, expr) = self.expr(input)?;
                let (rest, _) = self.expect(rest, ";")?;
                (rest, expr)
            }
        };
        Ok((rest, Some(stmt)))
    }

    /// Everything after `if` / `elseif`: `(cond) stmt [else stmt]`
    fn if_rest(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = self.expect(input, "(")?;
        let (input, cond) = self.expr(input)?;
        let (input, _) = self.expect(input, ")")?;
        let (input, then) = self.statement(input)?;
        let (input, otherwise) = if let Ok((rest, _)) = kw("elseif")(input) {
            let (rest, line) = self.here(rest)?;
            let (rest, nested) = self.if_rest(rest, line)?;
            (rest, Some(nested))
        } else if let Ok((rest, _)) = kw("else")(input) {
            self.statement(rest)?
        } else {
            (input, None)
        };
        let id = self.fixed(input, FixedKind::If, &[Some(cond), then, otherwise], line)?;
        Ok((input, id))
    }

    fn while_stmt(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = kw("while")(input)?;
        let (input, _) = self.expect(input, "(")?;
        let (input, cond) = self.expr(input)?;
        let (input, _) = self.expect(input, ")")?;
        let (input, body) = self.statement(input)?;
        let id = self.fixed(input, FixedKind::While, &[Some(cond), body], line)?;
        Ok((input, id))
    }

    fn for_stmt(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = kw("for")(input)?;
        let (input, _) = self.expect(input, "(")?;
        let (input, init) = self.opt_expr(input, ";")?;
        let (input, _) = self.expect(input, ";")?;
        let (input, cond) = self.opt_expr(input, ";")?;
        let (input, _) = self.expect(input, ";")?;
        let (input, step) = self.opt_expr(input, ")")?;
        let (input, _) = self.expect(input, ")")?;
        let (input, body) = self.statement(input)?;
        let id = self.fixed(input, FixedKind::For, &[init, cond, step, body], line)?;
        Ok((input, id))
    }

    /// Expression unless the next token is `terminator`
    fn opt_expr(&self, input: &'s str, terminator: &'static str) -> R<'s, Option<NodeId>> {
        if sym(terminator)(input).is_ok() {
            return Ok((input, None));
        }
        let (input, expr) = self.expr(input)?;
        Ok((input, Some(expr)))
    }

    fn return_stmt(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = kw("return")(input)?;
        let (input, value) = self.opt_expr(input, ";")?;
        let (input, _) = self.expect(input, ";")?;
        let id = self.fixed(input, FixedKind::Return, &[value], line)?;
        Ok((input, id))
    }

    fn echo_stmt(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = kw("echo")(input)?;
        let (input, value) = self.expr(input)?;
        let (input, _) = self.expect(input, ";")?;
        let id = self.fixed(input, FixedKind::Echo, &[Some(value)], line)?;
        Ok((input, id))
    }

    fn is_named_function(&self, input: &'s str) -> bool {
        match kw("function")(input) {
            Ok((rest, _)) => self.ident(rest).is_ok(),
            Err(_) => false,
        }
    }

    fn function_decl(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = kw("function")(input)?;
        let (input, name) = self.ident(input)?;
        let (input, [params, uses, ret]) = self.signature(input, line)?;
        let (input, body) = self.block(input)?;
        let id = self
            .ast
            .borrow_mut()
            .decl(DeclKind::Function, name, 0, &[params, uses, Some(body), ret], line)
            .map_err(|_| self.shape_failure(input))?;
        Ok((input, id))
    }

    /// `(params) [use (vars)] [: type]` as [params, uses, return type]
    fn signature(&self, input: &'s str, line: u32) -> R<'s, [Option<NodeId>; 3]> {
        let (input, _) = self.expect(input, "(")?;
        let (input, params) = self.comma_separated(input, ")", |input| self.param(input))?;
        let params = self.list(ListKind::ParamList, params, line);
        let (input, uses) = if let Ok((rest, _)) = kw("use")(input) {
            let (rest, _) = self.expect(rest, "(")?;
            let (rest, vars) = self.comma_separated(rest, ")", |input| {
                let (input, line) = self.here(input)?;
                let (input, name) = self.ident(input)?;
                Ok((input, self.ast.borrow_mut().var(name, line)))
            })?;
            (rest, Some(self.list(ListKind::ClosureUses, vars, line)))
        } else {
            (input, None)
        };
        let (input, ret) = if let Ok((rest, _)) = sym(":")(input) {
            let (rest, line) = self.here(rest)?;
            let (rest, nullable) = match sym("?")(rest) {
                Ok((rest, _)) => (rest, "?"),
                Err(_) => (rest, ""),
            };
            let (rest, name) = self.ident(rest)?;
            (rest, Some(self.name(&format!("{nullable}{name}"), line)))
        } else {
            (input, None)
        };
        Ok((input, [Some(params), uses, ret]))
    }

    fn param(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, line) = self.here(input)?;
        let (input, name) = self.ident(input)?;
        let name = self.name(name, line);
        let (input, default) = match sym("=")(input) {
            Ok((rest, _)) => {
                let (rest, value) = self.ternary(rest)?;
                (rest, Some(value))
            }
            Err(_) => (input, None),
        };
        let id = self.fixed(input, FixedKind::Param, &[Some(name), default], line)?;
        Ok((input, id))
    }

    /// Items separated by `,` up to and including `close`; trailing comma allowed
    fn comma_separated<F>(&self, mut input: &'s str, close: &'static str, mut item: F) -> R<'s, Vec<NodeId>>
    where
        F: FnMut(&'s str) -> R<'s, NodeId>,
    {
        let mut items = Vec::new();
        loop {
            if let Ok((rest, _)) = sym(close)(input) {
                return Ok((rest, items));
            }
            let (rest, node) = item(input)?;
            items.push(node);
            match sym(",")(rest) {
                Ok((rest, _)) => input = rest,
                Err(_) => {
                    let (rest, _) = self.expect(rest, close)?;
                    return Ok((rest, items));
                }
            }
        }
    }

    fn modifiers(&self, mut input: &'s str) -> R<'s, u32> {
        let mut bits = 0;
        loop {
            let Some(word) = peek_word(input) else {
                return Ok((input, bits));
            };
            let Some((bit, keyword)) = flags::KEYWORDS.iter().find(|(_, keyword)| *keyword == word) else {
                return Ok((input, bits));
            };
            let (rest, _) = kw(keyword)(input)?;
            bits |= *bit;
            input = rest;
        }
    }

    fn class_decl(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, class_flags) = self.modifiers(input)?;
        let (input, _) = kw("class")(input).map_err(|_| self.commit(input, "expected `class`"))?;
        let (input, name) = self.ident(input)?;
        let (input, parent) = match kw("extends")(input) {
            Ok((rest, _)) => {
                let (rest, line) = self.here(rest)?;
                let (rest, parent) = self.ident(rest)?;
                (rest, Some(self.name(parent, line)))
            }
            Err(_) => (input, None),
        };
        let (input, interfaces) = match kw("implements")(input) {
            Ok((mut rest, _)) => {
                let mut names = Vec::new();
                loop {
                    let (after, line) = self.here(rest)?;
                    let (after, interface) = self.ident(after)?;
                    names.push(self.name(interface, line));
                    match sym(",")(after) {
                        Ok((after, _)) => rest = after,
                        Err(_) => {
                            rest = after;
                            break;
                        }
                    }
                }
                (rest, Some(self.list(ListKind::NameList, names, line)))
            }
            Err(_) => (input, None),
        };
        let (input, body_line) = self.here(input)?;
        let (mut input, _) = self.expect(input, "{")?;
        let mut members = Vec::new();
        loop {
            if let Ok((rest, _)) = sym("}")(input) {
                input = rest;
                break;
            }
            let (rest, member) = self.method_decl(input)?;
            members.push(member);
            input = rest;
        }
        let body = self.list(ListKind::StmtList, members, body_line);
        let id = self
            .ast
            .borrow_mut()
            .decl(DeclKind::Class, name, class_flags, &[parent, interfaces, Some(body)], line)
            .map_err(|_| self.shape_failure(input))?;
        Ok((input, id))
    }

    fn method_decl(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, line) = self.here(input)?;
        let (input, method_flags) = self.modifiers(input)?;
        let (input, _) = kw("function")(input).map_err(|_| self.commit(input, "expected method declaration"))?;
        let (input, name) = self.ident(input)?;
        let (input, [params, uses, ret]) = self.signature(input, line)?;
        let (input, body) = match sym(";")(input) {
            Ok((rest, _)) => (rest, None),
            Err(_) => {
                let (rest, body) = self.block(input)?;
                (rest, Some(body))
            }
        };
        let id = self
            .ast
            .borrow_mut()
            .decl(DeclKind::Method, name, method_flags, &[params, uses, body, ret], line)
            .map_err(|_| self.shape_failure(input))?;
        Ok((input, id))
    }

    // --- expressions --------------------------------------------------------

    fn expr(&self, input: &'s str) -> R<'s, NodeId> {
        self.assignment(input)
    }

    fn assignment(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, line) = self.here(input)?;
        let (rest, target) = self.ternary(input)?;
        let Ok((after, token)) = operator(rest) else {
            return Ok((rest, target));
        };
        let kind = match token {
            "=" => FixedKind::Assign,
            compound if compound.len() >= 2 && compound.ends_with('=') => {
                match BinaryOp::from_symbol(&compound[..compound.len() - 1]) {
                    Some(op) if op.has_compound_form() => FixedKind::AssignOp(op),
                    _ => return Ok((rest, target)),
                }
            }
            _ => return Ok((rest, target)),
        };
        let (after, value) = self.assignment(after)?;
        let id = self.fixed(after, kind, &[Some(target), Some(value)], line)?;
        Ok((after, id))
    }

    fn ternary(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, line) = self.here(input)?;
        let (input, cond) = self.binary(input, LOOSEST_BINARY)?;
        let Ok((rest, _)) = sym("?")(input) else {
            return Ok((input, cond));
        };
        let (rest, then) = self.assignment(rest)?;
        let (rest, _) = self.expect(rest, ":")?;
        let (rest, otherwise) = self.ternary(rest)?;
        let id = self.fixed(rest, FixedKind::Conditional, &[Some(cond), Some(then), Some(otherwise)], line)?;
        Ok((rest, id))
    }

    /// Left-associative binary operators by precedence climbing
    fn binary(&self, input: &'s str, level: u8) -> R<'s, NodeId> {
        if level > TIGHTEST_BINARY {
            return self.instanceof(input);
        }
        let (mut input, mut left) = self.binary(input, level + 1)?;
        loop {
            let Ok((rest, token)) = operator(input) else {
                break;
            };
            let op = match BinaryOp::from_symbol(token) {
                Some(op) if op != BinaryOp::Pow && binary_precedence(op) == level => op,
                _ => break,
            };
            let (rest, right) = self.binary(rest, level + 1)?;
            let line = self.line_of(left);
            left = self.fixed(rest, FixedKind::Binary(op), &[Some(left), Some(right)], line)?;
            input = rest;
        }
        Ok((input, left))
    }

    fn instanceof(&self, input: &'s str) -> R<'s, NodeId> {
        let (mut input, mut left) = self.unary(input)?;
        while let Ok((rest, _)) = kw("instanceof")(input) {
            let (rest, class) = self.unary(rest)?;
            let line = self.line_of(left);
            left = self.fixed(rest, FixedKind::Instanceof, &[Some(left), Some(class)], line)?;
            input = rest;
        }
        Ok((input, left))
    }

    fn unary(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, line) = self.here(input)?;
        if let Ok((rest, token)) = operator(input) {
            let kind = match token {
                "!" => Some(FixedKind::Unary(UnaryOp::Not)),
                "-" => Some(FixedKind::Unary(UnaryOp::Neg)),
                "+" => Some(FixedKind::Unary(UnaryOp::Plus)),
                "~" => Some(FixedKind::Unary(UnaryOp::BitNot)),
                "++" => Some(FixedKind::PreInc),
                "--" => Some(FixedKind::PreDec),
                _ => None,
            };
            if let Some(kind) = kind {
                let (rest, operand) = self.unary(rest)?;
                let id = self.fixed(rest, kind, &[Some(operand)], line)?;
                return Ok((rest, id));
            }
        }
        self.power(input)
    }

    /// `postfix ** unary`, right-associative
    fn power(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, base) = self.postfix(input)?;
        let Ok((rest, _)) = sym("**")(input) else {
            return Ok((input, base));
        };
        let (rest, exponent) = self.unary(rest)?;
        let line = self.line_of(base);
        let id = self.fixed(rest, FixedKind::Binary(BinaryOp::Pow), &[Some(base), Some(exponent)], line)?;
        Ok((rest, id))
    }

    fn args(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, args) = self.comma_separated(input, ")", |input| self.expr(input))?;
        Ok((input, self.list(ListKind::ArgList, args, line)))
    }

    fn postfix(&self, input: &'s str) -> R<'s, NodeId> {
        let (mut input, mut node) = self.primary(input)?;
        loop {
            let Ok((rest, token)) = operator(input) else {
                break;
            };
            let line = self.line_of(node);
            let (rest, next) = match token {
                "(" => {
                    let (rest, args) = self.args(rest, line)?;
                    (rest, self.fixed(rest, FixedKind::Call, &[Some(node), Some(args)], line)?)
                }
                "[" => {
                    let (rest, index) = self.opt_expr(rest, "]")?;
                    let (rest, _) = self.expect(rest, "]")?;
                    (rest, self.fixed(rest, FixedKind::Dim, &[Some(node), index], line)?)
                }
                "->" => {
                    let (rest, member_line) = self.here(rest)?;
                    let (rest, member) = self.ident(rest)?;
                    let member = self.name(member, member_line);
                    match sym("(")(rest) {
                        Ok((rest, _)) => {
                            let (rest, args) = self.args(rest, line)?;
                            let kind = FixedKind::MethodCall;
                            (rest, self.fixed(rest, kind, &[Some(node), Some(member), Some(args)], line)?)
                        }
                        Err(_) => (rest, self.fixed(rest, FixedKind::Prop, &[Some(node), Some(member)], line)?),
                    }
                }
                "++" => (rest, self.fixed(rest, FixedKind::PostInc, &[Some(node)], line)?),
                "--" => (rest, self.fixed(rest, FixedKind::PostDec, &[Some(node)], line)?),
                _ => break,
            };
            node = next;
            input = rest;
        }
        Ok((input, node))
    }

    fn primary(&self, input: &'s str) -> R<'s, NodeId> {
        let (input, line) = self.here(input)?;
        if at_digit(input) {
            let (rest, value) = number(input)?;
            return Ok((rest, self.ast.borrow_mut().literal(value, line)));
        }
        if at_quote(input) {
            let (rest, text) = string(input)?;
            return Ok((rest, self.ast.borrow_mut().literal(Value::String(text), line)));
        }
        if let Ok((rest, _)) = sym("(")(input) {
            let (rest, inner) = self.expr(rest)?;
            let (rest, _) = self.expect(rest, ")")?;
            return Ok((rest, inner));
        }
        if let Ok((rest, _)) = sym("[")(input) {
            let (rest, items) = self.comma_separated(rest, "]", |input| self.expr(input))?;
            return Ok((rest, self.list(ListKind::Array, items, line)));
        }
        match peek_word(input) {
            Some(word) if word.eq_ignore_ascii_case("true") => return self.keyword_literal(input, Value::Boolean(true), line),
            Some(word) if word.eq_ignore_ascii_case("false") => return self.keyword_literal(input, Value::Boolean(false), line),
            Some(word) if word.eq_ignore_ascii_case("null") => return self.keyword_literal(input, Value::Null, line),
            Some("new") => return self.new_expr(input, line),
            Some("function") => return self.closure(input, line),
            Some("array") => {
                let (rest, _) = identifier(self.sigil)(input)?;
                if let Ok((rest, _)) = sym("(")(rest) {
                    let (rest, items) = self.comma_separated(rest, ")", |input| self.expr(input))?;
                    return Ok((rest, self.list(ListKind::Array, items, line)));
                }
            }
            _ => {}
        }
        let Ok((rest, text)) = self.ident(input) else {
            return error(input, "expected expression");
        };
        // A name directly applied to arguments is a callee, not a variable
        if sym("(")(rest).is_ok() {
            return Ok((rest, self.name(text, line)));
        }
        Ok((rest, self.ast.borrow_mut().var(text, line)))
    }

    fn keyword_literal(&self, input: &'s str, value: Value, line: u32) -> R<'s, NodeId> {
        let (rest, _) = identifier(self.sigil)(input)?;
        Ok((rest, self.ast.borrow_mut().literal(value, line)))
    }

    fn new_expr(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = kw("new")(input)?;
        let (input, class_line) = self.here(input)?;
        let (input, class) = self.ident(input)?;
        let class = self.name(class, class_line);
        let (input, args) = match sym("(")(input) {
            Ok((rest, _)) => self.args(rest, line)?,
            Err(_) => (input, self.list(ListKind::ArgList, Vec::new(), line)),
        };
        let id = self.fixed(input, FixedKind::New, &[Some(class), Some(args)], line)?;
        Ok((input, id))
    }

    fn closure(&self, input: &'s str, line: u32) -> R<'s, NodeId> {
        let (input, _) = kw("function")(input)?;
        let (input, [params, uses, ret]) = self.signature(input, line)?;
        let (input, body) = self.block(input)?;
        let id = self
            .ast
            .borrow_mut()
            .decl(DeclKind::Closure, CLOSURE_NAME, 0, &[params, uses, Some(body), ret], line)
            .map_err(|_| self.shape_failure(input))?;
        Ok((input, id))
    }
}
