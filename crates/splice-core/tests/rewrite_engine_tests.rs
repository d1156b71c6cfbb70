/*!
# Rewrite Engine Integration Tests

End-to-end checks of rule registration, matching and rewriting through the
public API.
*/

use std::sync::Arc;

use splice_core::{
    Ast, Parser, PatternCompiler, RewriteConfig, RewriteEngine, RewriteError, RuleId, Runtime,
    SpliceError, SpliceParser, ToSource,
};
use tempfile::TempDir;

fn parse(source: &str) -> Ast {
    SpliceParser::new().parse(source, "it.php").unwrap()
}

fn first_statement(ast: &Ast) -> splice_core::NodeId {
    ast.children(ast.root().unwrap())[0]
}

/// Parse `source` as a single expression statement and return that statement
fn expression(source: &str) -> (Ast, splice_core::NodeId) {
    let ast = parse(&format!("{source};"));
    let id = first_statement(&ast);
    (ast, id)
}

#[test]
fn test_matching_is_sound_for_substituted_captures() {
    let parser = SpliceParser::new();
    let pattern = PatternCompiler::new(&parser)
        .compile("$a * ($b + $a)")
        .unwrap();

    for (a, b) in [
        ("x", "y"),
        ("f(1)", "items[2]"),
        ("obj->size()", "-n"),
        ("[1, 2]", "c ? d : e"),
    ] {
        let target = parse(&format!("({a}) * (({b}) + ({a}));"));
        let stmt = first_statement(&target);
        let bindings = pattern
            .matches(&target, stmt)
            .unwrap_or_else(|| panic!("no match for a = {a}, b = {b}"));
        assert_eq!(bindings.len(), 2);

        let (expected_a, a_id) = expression(a);
        let (expected_b, b_id) = expression(b);
        assert!(target.structurally_eq(bindings.get("a").unwrap(), &expected_a, a_id));
        assert!(target.structurally_eq(bindings.get("b").unwrap(), &expected_b, b_id));
    }
}

#[test]
fn test_rewrite_program_end_to_end() -> splice_core::Result<()> {
    let runtime = Runtime::new(RewriteConfig {
        builtin_rules: true,
        ..RewriteConfig::default()
    })?;
    runtime.engine().try_add_rule("strlen($s) == 0", "$s === \"\"")?;

    let source = "<?php
function label(name) {
    if (strlen(name) == 0 || false) {
        return \"anonymous\";
    }
    return name;
}
for (i = 0; i < count; i++) {
    total = total + weight(i);
}";
    let out = runtime.rewrite_source(source, "label.php")?;
    assert_eq!(
        out,
        "function label(name) {
    if (name === \"\") {
        return \"anonymous\";
    }
    return name;
}
for (i = 0; i < count; ++i) {
    total += weight(i);
}"
    );
    Ok(())
}

#[test]
fn test_second_pass_changes_nothing() -> splice_core::Result<()> {
    let runtime = Runtime::new(RewriteConfig {
        builtin_rules: true,
        ..RewriteConfig::default()
    })?;
    let once = runtime.compile_unit("x = x + 1; if (true && ok) { y = y . z; }", "twice.php")?;
    let mut again = once.clone();
    let summary = runtime.engine().process(&mut again)?;
    assert_eq!(summary.rewrites, 0);
    assert!(again.same_tree(&once));
    Ok(())
}

#[test]
fn test_cycle_error_reaches_caller() {
    let runtime = Runtime::new(RewriteConfig {
        max_rewrites_per_node: 4,
        ..RewriteConfig::default()
    })
    .unwrap();
    assert!(runtime.engine().add_rule("$a && $b", "$b && $a"));

    let err = runtime.rewrite_source("\n\nok = p && q;", "swap.php").unwrap_err();
    let SpliceError::Unit(unit) = err else {
        panic!("expected a unit error, got {err:?}");
    };
    match unit.rewrite_error() {
        Some(RewriteError::RuleCycle { rule, location, limit }) => {
            assert_eq!(*rule, RuleId(0));
            assert_eq!(location.to_string(), "swap.php:3");
            assert_eq!(*limit, 4);
        }
        other => panic!("expected a rule cycle, got {other:?}"),
    }
}

#[test]
fn test_engine_shared_across_threads() {
    let engine = Arc::new(RewriteEngine::new(Arc::new(SpliceParser::new())));
    assert!(engine.add_rule("$x * 1", "$x"));

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                let mut ast = parse(&format!("v{worker} = w{worker} * 1 * 1;"));
                engine.process(&mut ast).unwrap();
                assert_eq!(ast.to_source(), format!("v{worker} = w{worker};"));
            });
        }
    });

    assert_eq!(engine.rule_stats()[0].hits, 8);
}

#[test]
fn test_trace_and_stats_serialize() {
    let engine = RewriteEngine::new(Arc::new(SpliceParser::new()));
    assert!(engine.add_rule("!!$x", "$x"));
    engine.set_debug_trace(true);
    let mut ast = parse("ready = !!flag;");
    engine.process(&mut ast).unwrap();

    let trace = serde_json::to_value(engine.trace_entries()).unwrap();
    assert_eq!(
        trace,
        serde_json::json!([{
            "rule": 0,
            "location": { "origin": "it.php", "line": 1 },
            "before": "!!flag",
            "after": "flag",
        }])
    );
    let stats = serde_json::to_value(engine.rule_stats()).unwrap();
    assert_eq!(stats[0]["hits"], 1);
    assert_eq!(stats[0]["from"], "!!$x");
}

#[test]
fn test_config_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("splice.json");
    std::fs::write(&path, r#"{"max_rewrites_per_node": 3, "trace_capacity": 2}"#).unwrap();
    let config = RewriteConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.max_rewrites_per_node, 3);
    assert_eq!(config.trace_capacity, 2);
    assert_eq!(config.max_depth, RewriteConfig::default().max_depth);
    assert!(matches!(
        RewriteConfig::from_file(&path),
        Err(SpliceError::Config(_))
    ));
}

#[test]
fn test_duplicate_operand_rule_as_written() {
    let engine = RewriteEngine::new(Arc::new(SpliceParser::new()));
    assert!(engine.add_rule("$a + $a", "$a * 2"));

    let mut same = parse("x + x;");
    engine.process(&mut same).unwrap();
    assert_eq!(same.to_source(), "x * 2;");

    let mut different = parse("x + y;");
    assert!(!engine.process(&mut different).unwrap().changed());
    assert_eq!(different.to_source(), "x + y;");
}

#[test]
fn test_deep_unit_keeps_unrelated_statements_working() {
    let engine = RewriteEngine::new(Arc::new(SpliceParser::new()));
    assert!(engine.add_rule("$x * 1", "$x"));

    let chain = (0..3000).map(|i| format!("a{i}")).collect::<Vec<_>>().join(" . ");
    let mut ast = parse(&format!("y = {chain};\nz = w * 1;"));
    let summary = engine.process(&mut ast).unwrap();
    assert_eq!(summary.rewrites, 1);

    let root = ast.root().unwrap();
    let last = ast.children(root)[1];
    assert_eq!(ast.node_ref(last).to_source(), "z = w");
}
