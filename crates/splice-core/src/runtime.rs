//! Splice Runtime - parse and rewrite compilation units
//!
//! Bundles the host parser, the post-parse pipeline with the rewrite stage
//! installed, and the shared engine, for use by drivers like the REPL.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{Ast, ToSource},
    parser::{ParseError, Parser, SpliceParser},
    pipeline::{Pipeline, StageError, StageId},
    rewrite::{RewriteEngine, RewriteError},
    RewriteConfig, SpliceError,
};

/// Failure compiling one unit
#[derive(Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Stage(#[from] StageError),
}

impl UnitError {
    /// The rewrite failure behind a failed rewrite stage, if that is the cause
    pub fn rewrite_error(&self) -> Option<&RewriteError> {
        match self {
            UnitError::Stage(stage) => match stage.source.as_ref() {
                SpliceError::Rewrite(e) => Some(e),
                _ => None,
            },
            UnitError::Parse(_) => None,
        }
    }
}

/// High-level runtime that combines parser, pipeline and rewrite engine
pub struct Runtime {
    parser: Arc<dyn Parser>,
    pipeline: Pipeline,
    engine: Arc<RewriteEngine>,
    hook: StageId,
}

impl Runtime {
    /// Runtime over the reference front end
    pub fn new(config: RewriteConfig) -> crate::Result<Self> {
        config.validate()?;
        let parser = Arc::new(SpliceParser::with_capture_sigil(config.capture_sigil));
        Self::with_parser(parser, config)
    }

    /// Runtime over a custom host parser
    pub fn with_parser(parser: Arc<dyn Parser>, config: RewriteConfig) -> crate::Result<Self> {
        Self::with_pipeline(parser, Pipeline::new(), config)
    }

    /// Runtime whose rewrite stage runs after the stages already in `pipeline`
    pub fn with_pipeline(
        parser: Arc<dyn Parser>,
        mut pipeline: Pipeline,
        config: RewriteConfig,
    ) -> crate::Result<Self> {
        config.validate()?;
        let engine = Arc::new(RewriteEngine::with_config(parser.clone(), config)?);
        let hook = engine.install_hook(&mut pipeline);
        debug!(parser = parser.name(), stages = ?pipeline.stage_names(), "runtime ready");
        Ok(Self {
            parser,
            pipeline,
            engine,
            hook,
        })
    }

    pub fn engine(&self) -> &Arc<RewriteEngine> {
        &self.engine
    }

    pub fn parser(&self) -> &Arc<dyn Parser> {
        &self.parser
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// Stage id of the installed rewrite hook
    pub fn hook(&self) -> StageId {
        self.hook
    }

    /// Parse `source`, then run the pipeline over it
    pub fn compile_unit(&self, source: &str, origin: &str) -> Result<Ast, UnitError> {
        let ast = self.parser.parse(source, origin)?;
        Ok(self.pipeline.run(ast)?)
    }

    pub fn compile_file(&self, path: &Path) -> Result<Ast, UnitError> {
        let ast = self.parser.parse_file(path)?;
        Ok(self.pipeline.run(ast)?)
    }

    /// Compile `source` and render the result back to source text
    pub fn rewrite_source(&self, source: &str, origin: &str) -> crate::Result<String> {
        Ok(self.compile_unit(source, origin)?.to_source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_unit_runs_rewrite_stage() {
        let runtime = Runtime::new(RewriteConfig::default()).unwrap();
        assert!(runtime.engine().add_rule("$x * 1", "$x"));
        let out = runtime.rewrite_source("y = z * 1;", "t.php").unwrap();
        assert_eq!(out, "y = z;");
        assert_eq!(runtime.pipeline().stage_names(), ["rewrite"]);
    }

    #[test]
    fn test_parse_errors_pass_through() {
        let runtime = Runtime::new(RewriteConfig::default()).unwrap();
        match runtime.compile_unit("y = ;", "bad.php") {
            Err(UnitError::Parse(e)) => {
                assert_eq!(e.origin, "bad.php");
                assert_eq!((e.line, e.column), (1, 5));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_rewrite_failure_is_reported() {
        let runtime = Runtime::new(RewriteConfig::default()).unwrap();
        assert!(runtime.engine().add_rule("$a", "$a"));
        let err = runtime.compile_unit("x;", "loop.php").unwrap_err();
        assert!(matches!(err.rewrite_error(), Some(RewriteError::RuleCycle { .. })));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RewriteConfig {
            capture_sigil: '(',
            ..RewriteConfig::default()
        };
        assert!(matches!(Runtime::new(config), Err(SpliceError::Config(_))));
    }

    #[test]
    fn test_builtin_rules_from_config() {
        let config = RewriteConfig {
            builtin_rules: true,
            ..RewriteConfig::default()
        };
        let runtime = Runtime::new(config).unwrap();
        assert_eq!(runtime.engine().rule_count(), crate::builtin_rules::all().len());
        let out = runtime.rewrite_source("if (true && ready()) go();", "b.php").unwrap();
        assert_eq!(out, "if (ready()) go();");
    }

    #[test]
    fn test_custom_sigil_runtime() {
        let config = RewriteConfig {
            capture_sigil: '@',
            ..RewriteConfig::default()
        };
        let runtime = Runtime::new(config).unwrap();
        assert!(runtime.engine().add_rule("@a - @a", "0"));
        assert_eq!(runtime.rewrite_source("n = $v - $v;", "s.php").unwrap(), "n = 0;");
    }

    #[test]
    fn test_extra_stages_run_before_rewrite() {
        let mut pipeline = Pipeline::new();
        pipeline.push_stage("noop", Ok);
        let parser: Arc<dyn Parser> = Arc::new(SpliceParser::new());
        let runtime = Runtime::with_pipeline(parser, pipeline, RewriteConfig::default()).unwrap();
        assert_eq!(runtime.pipeline().stage_names(), ["noop", "rewrite"]);
        assert!(runtime.pipeline().contains(runtime.hook()));
    }
}
