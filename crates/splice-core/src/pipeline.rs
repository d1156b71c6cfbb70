// Compilation pipeline - ordered post-parse stages applied to each unit
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::ast::Ast;
use crate::SpliceError;

/// Handle returned when a stage is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(u64);

type StageFn = dyn Fn(Ast) -> crate::Result<Ast> + Send + Sync;

#[derive(Clone)]
struct Stage {
    id: StageId,
    name: String,
    run: Arc<StageFn>,
}

/// A stage failed; later stages did not run
#[derive(Error, Debug)]
#[error("stage `{stage}` failed: {source}")]
pub struct StageError {
    pub stage: String,
    #[source]
    pub source: Box<SpliceError>,
}

/// Ordered stages composed left to right
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    next_id: u64,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; it runs after every stage already present
    pub fn push_stage<F>(&mut self, name: impl Into<String>, run: F) -> StageId
    where
        F: Fn(Ast) -> crate::Result<Ast> + Send + Sync + 'static,
    {
        let id = StageId(self.next_id);
        self.next_id += 1;
        let name = name.into();
        debug!(stage = %name, "pipeline stage added");
        self.stages.push(Stage {
            id,
            name,
            run: Arc::new(run),
        });
        id
    }

    pub fn remove_stage(&mut self, id: StageId) -> bool {
        let before = self.stages.len();
        self.stages.retain(|stage| stage.id != id);
        self.stages.len() != before
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.stages.iter().any(|stage| stage.id == id)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order over `ast`
    pub fn run(&self, ast: Ast) -> Result<Ast, StageError> {
        self.stages.iter().try_fold(ast, |ast, stage| {
            trace!(stage = %stage.name, origin = ast.origin(), "running stage");
            (stage.run)(ast).map_err(|e| StageError {
                stage: stage.name.clone(),
                source: Box::new(e),
            })
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ListKind, Value};

    fn unit() -> Ast {
        let mut ast = Ast::new("unit.php");
        let root = ast.list(ListKind::StmtList, Vec::new(), 1);
        ast.set_root(root);
        ast
    }

    fn append_literal(n: i64) -> impl Fn(Ast) -> crate::Result<Ast> + Send + Sync {
        move |mut ast: Ast| {
            let root = ast.root().ok_or_else(|| SpliceError::Config("no root".to_string()))?;
            let mut items = ast.children(root);
            items.push(ast.literal(Value::Integer(n), 1));
            let list = ast.list(ListKind::StmtList, items, 1);
            ast.release_shallow(root);
            ast.set_root(list);
            Ok(ast)
        }
    }

    fn literals(ast: &Ast) -> Vec<i64> {
        let root = ast.root().unwrap();
        ast.children(root)
            .into_iter()
            .filter_map(|id| match ast.literal_value(id) {
                Some(Value::Integer(n)) => Some(*n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stages_run_in_order() {
        let mut pipeline = Pipeline::new();
        pipeline.push_stage("one", append_literal(1));
        pipeline.push_stage("two", append_literal(2));
        assert_eq!(pipeline.stage_names(), ["one", "two"]);
        let out = pipeline.run(unit()).unwrap();
        assert_eq!(literals(&out), [1, 2]);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let out = Pipeline::new().run(unit()).unwrap();
        assert!(out.same_tree(&unit()));
    }

    #[test]
    fn test_remove_stage() {
        let mut pipeline = Pipeline::new();
        let one = pipeline.push_stage("one", append_literal(1));
        pipeline.push_stage("two", append_literal(2));
        assert!(pipeline.contains(one));
        assert!(pipeline.remove_stage(one));
        assert!(!pipeline.remove_stage(one));
        assert_eq!(pipeline.len(), 1);
        assert_eq!(literals(&pipeline.run(unit()).unwrap()), [2]);
    }

    #[test]
    fn test_failure_names_stage_and_stops() {
        let mut pipeline = Pipeline::new();
        pipeline.push_stage("broken", |_ast: Ast| Err(SpliceError::Config("boom".to_string())));
        pipeline.push_stage("never", |_ast: Ast| -> crate::Result<Ast> {
            panic!("later stages must not run")
        });
        let err = pipeline.run(unit()).unwrap_err();
        assert_eq!(err.stage, "broken");
        assert!(matches!(*err.source, SpliceError::Config(_)));
        assert_eq!(err.to_string(), "stage `broken` failed: Configuration error: boom");
    }
}
