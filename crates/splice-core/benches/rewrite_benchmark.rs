use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use splice_core::{Ast, Parser, RewriteConfig, RewriteEngine, SpliceParser};
use std::sync::Arc;

/// A unit with `functions` functions, each mixing rewritable and plain code
fn generate_unit(functions: usize) -> String {
    let mut source = String::from("<?php\n");
    for n in 0..functions {
        source.push_str(&format!(
            "function f{n}(a, b) {{
    total = total + a * 1;
    if (true && ready(a)) {{ log(b); }}
    for (i = 0; i < b; i++) {{ count += 1; }}
    return is_a(a, Item) || false;
}}
"
        ));
    }
    source
}

fn builtin_engine() -> (Arc<SpliceParser>, RewriteEngine) {
    let parser = Arc::new(SpliceParser::new());
    let config = RewriteConfig {
        builtin_rules: true,
        ..RewriteConfig::default()
    };
    let engine = RewriteEngine::with_config(parser.clone(), config).unwrap();
    engine.add_rule("$x * 1", "$x");
    (parser, engine)
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");
    let (parser, engine) = builtin_engine();

    for functions in [10, 100, 1000] {
        let unit: Ast = parser.parse(&generate_unit(functions), "bench.php").unwrap();
        group.bench_with_input(BenchmarkId::new("builtin_rules", functions), &unit, |b, unit| {
            b.iter_batched(
                || unit.clone(),
                |mut ast| {
                    let summary = engine.process(&mut ast).unwrap();
                    black_box(summary);
                },
                BatchSize::LargeInput,
            );
        });
    }

    // Fixpoint input: every rule is tried at every node, none applies
    let mut settled = parser.parse(&generate_unit(1000), "bench.php").unwrap();
    engine.process(&mut settled).unwrap();
    group.bench_function("settled_1000", |b| {
        b.iter_batched(
            || settled.clone(),
            |mut ast| black_box(engine.process(&mut ast).unwrap()),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let parser = SpliceParser::new();
    let source = generate_unit(100);
    c.bench_function("parse_100_functions", |b| {
        b.iter(|| black_box(parser.parse(&source, "bench.php").unwrap()));
    });
}

criterion_group!(benches, bench_process, bench_parse);
criterion_main!(benches);
