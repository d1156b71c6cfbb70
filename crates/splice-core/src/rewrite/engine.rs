/*!
# RewriteEngine - Fixpoint AST Rewriter

Owns the rule store and trace log, and rewrites compilation units in place.
A pass walks the tree post-order. At each position the first matching rule is
applied and the new subtree is walked again, until nothing matches or the
position exceeds `max_rewrites_per_node` applications.

The walk keeps its own stack, so unit depth is bounded only by memory.
`max_depth` limits how many rewritten positions may nest inside each other,
which stops rules that keep growing the tree below their own output.
*/

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::matcher::{Bindings, Matcher};
use super::patterns::PatternCompiler;
use super::rules::{Rule, RuleId, RuleStats, RuleStore};
use super::trace::{TraceEntry, TraceLog};
use super::{builtin_rules, CompileError, Location, RewriteError, RewriteSummary};
use crate::ast::{Ast, NodeId, ShapeViolation, ToSource};
use crate::parser::Parser;
use crate::pipeline::{Pipeline, StageId};
use crate::RewriteConfig;

/// Name of the pipeline stage added by [`RewriteEngine::install_hook`]
pub const STAGE_NAME: &str = "rewrite";

/// Pattern-based rewrite engine
///
/// Rules are registered at runtime and live as long as the engine. The engine
/// is shared through `Arc`; passes take a read guard on the rule store, so
/// several units can be rewritten concurrently.
pub struct RewriteEngine {
    parser: Arc<dyn Parser>,
    config: RewriteConfig,
    rules: RwLock<RuleStore>,
    trace: Mutex<TraceLog>,
}

impl RewriteEngine {
    pub fn new(parser: Arc<dyn Parser>) -> Self {
        Self::build(parser, RewriteConfig::default())
    }

    /// Engine with explicit configuration; registers the built-in rule set
    /// when `config.builtin_rules` is set
    pub fn with_config(parser: Arc<dyn Parser>, config: RewriteConfig) -> Result<Self, CompileError> {
        let builtins = config.builtin_rules;
        let engine = Self::build(parser, config);
        if builtins {
            builtin_rules::register_all(&engine)?;
        }
        Ok(engine)
    }

    fn build(parser: Arc<dyn Parser>, config: RewriteConfig) -> Self {
        let trace = TraceLog::new(config.debug_trace, config.trace_capacity);
        Self {
            parser,
            config,
            rules: RwLock::new(RuleStore::new()),
            trace: Mutex::new(trace),
        }
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    pub fn parser(&self) -> &Arc<dyn Parser> {
        &self.parser
    }

    /// Register a rule; `false` leaves the store unchanged
    pub fn add_rule(&self, from: &str, to: &str) -> bool {
        match self.try_add_rule(from, to) {
            Ok(_) => true,
            Err(e) => {
                warn!(from, to, error = %e, "rejected rewrite rule");
                false
            }
        }
    }

    /// Register a rule, reporting why compilation failed
    pub fn try_add_rule(&self, from: &str, to: &str) -> Result<RuleId, CompileError> {
        let compiler = PatternCompiler::new(self.parser.as_ref()).with_sigil(self.config.capture_sigil);
        // Both sides compile before the store is touched
        let (pattern, template) = compiler.compile_rule(from, to)?;
        let id = self.rules.write().push(pattern, template);
        info!(rule = %id, from, to, "registered rewrite rule");
        Ok(id)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    pub fn rule_stats(&self) -> Vec<RuleStats> {
        self.rules.read().stats()
    }

    pub fn set_debug_trace(&self, enabled: bool) {
        self.trace.lock().set_enabled(enabled);
        debug!(enabled, "rewrite tracing toggled");
    }

    pub fn debug_trace(&self) -> bool {
        self.trace.lock().enabled()
    }

    /// Snapshot of the trace log
    pub fn trace_entries(&self) -> Vec<TraceEntry> {
        self.trace.lock().snapshot()
    }

    /// Drain the trace log
    pub fn take_trace(&self) -> Vec<TraceEntry> {
        self.trace.lock().take()
    }

    pub fn clear_trace(&self) {
        self.trace.lock().clear();
    }

    /// Rewrite `ast` in place until no rule applies anywhere
    pub fn process(&self, ast: &mut Ast) -> Result<RewriteSummary, RewriteError> {
        let store = self.rules.read();
        let mut pass = Pass {
            engine: self,
            store: &store,
            matcher: Matcher::new(self.config.unwrap_single_statements),
            summary: RewriteSummary::new(),
        };
        if let Some(root) = ast.root() {
            if !store.is_empty() {
                pass.run(ast, root)?;
            }
        }
        let summary = pass.summary;
        debug!(
            origin = ast.origin(),
            rewrites = summary.rewrites,
            nodes_visited = summary.nodes_visited,
            "rewrite pass finished"
        );
        Ok(summary)
    }

    /// Append the rewrite stage to `pipeline`, after every stage already there
    pub fn install_hook(self: &Arc<Self>, pipeline: &mut Pipeline) -> StageId {
        let engine = Arc::clone(self);
        pipeline.push_stage(STAGE_NAME, move |mut ast: Ast| {
            engine.process(&mut ast)?;
            Ok(ast)
        })
    }

    pub fn remove_hook(&self, pipeline: &mut Pipeline, stage: StageId) -> bool {
        pipeline.remove_stage(stage)
    }
}

impl std::fmt::Debug for RewriteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteEngine")
            .field("parser", &self.parser.name())
            .field("config", &self.config)
            .field("rules", &self.rule_count())
            .finish()
    }
}

/// State of one `process` call
struct Pass<'e> {
    engine: &'e RewriteEngine,
    store: &'e RuleStore,
    matcher: Matcher,
    summary: RewriteSummary,
}

/// One position on the walk stack
struct Frame {
    id: NodeId,
    children: Vec<NodeId>,
    next: usize,
    applications: usize,
    /// Rewritten positions directly enclosing this one
    growth: usize,
}

impl Frame {
    fn new(ast: &Ast, id: NodeId, growth: usize) -> Self {
        Self {
            id,
            children: ast.children(id),
            next: 0,
            applications: 0,
            growth,
        }
    }
}

impl Pass<'_> {
    fn run(&mut self, ast: &mut Ast, root: NodeId) -> Result<(), RewriteError> {
        let engine = self.engine;
        let store = self.store;
        let config = &engine.config;

        self.summary.nodes_visited += 1;
        let mut stack = vec![Frame::new(ast, root, 0)];
        while let Some(frame) = stack.last_mut() {
            if let Some(&child) = frame.children.get(frame.next) {
                frame.next += 1;
                // Untouched ancestors reset the count
                let growth = if frame.applications > 0 { frame.growth + 1 } else { 0 };
                if growth >= config.max_depth {
                    return Err(RewriteError::DepthLimit {
                        location: location(ast, child),
                        limit: config.max_depth,
                    });
                }
                self.summary.nodes_visited += 1;
                stack.push(Frame::new(ast, child, growth));
                continue;
            }

            let id = frame.id;
            let Some((rule, bindings)) = store.first_match(&self.matcher, ast, id) else {
                stack.pop();
                continue;
            };
            if frame.applications == config.max_rewrites_per_node {
                return Err(RewriteError::RuleCycle {
                    rule: rule.id(),
                    location: location(ast, id),
                    limit: config.max_rewrites_per_node,
                });
            }
            self.apply(rule, &bindings, ast, id)?;
            frame.applications += 1;
            frame.children = ast.children(id);
            frame.next = 0;
        }
        Ok(())
    }

    fn apply(
        &mut self,
        rule: &Rule,
        bindings: &Bindings,
        ast: &mut Ast,
        id: NodeId,
    ) -> Result<(), RewriteError> {
        let location = location(ast, id);
        let traced = self.engine.trace.lock().enabled();
        let before = traced.then(|| ast.node_ref(id).to_source());

        let replacement = rule
            .template()
            .instantiate(ast, bindings, location.line)
            .map_err(shape_violation)?;
        ast.replace_with(id, replacement).map_err(shape_violation)?;

        rule.record_hit();
        self.summary.rewrites += 1;
        debug!(rule = %rule.id(), %location, "applied rewrite rule");

        if let Some(before) = before {
            self.engine.trace.lock().record(TraceEntry {
                rule: rule.id(),
                location,
                before,
                after: ast.node_ref(id).to_source(),
            });
        }
        Ok(())
    }
}

fn location(ast: &Ast, id: NodeId) -> Location {
    Location {
        origin: ast.origin().to_string(),
        line: ast.line(id),
    }
}

/// Broken tree invariants abort debug builds and surface as errors otherwise
fn shape_violation(err: ShapeViolation) -> RewriteError {
    if cfg!(debug_assertions) {
        panic!("rewrite produced an invalid tree: {err}");
    }
    RewriteError::Shape(err)
}
