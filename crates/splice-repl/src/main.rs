use std::{
    fs,
    io::{self, IsTerminal},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use splice_core::{init_tracing, RewriteConfig, Runtime};
use splice_repl::repl::{rules_file, LineProcessResult, MultiLineCollector, Repl};
use tracing::debug;

fn main() -> Result<()> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let matches = Command::new("splice-repl")
        .version(splice_core::VERSION)
        .about("Interactive REPL for pattern-based source rewriting")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("JSON rewrite configuration"),
        )
        .arg(
            Arg::new("rules")
                .long("rules")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("JSON list of {\"from\", \"to\"} rules to register"),
        )
        .arg(
            Arg::new("builtin")
                .long("builtin")
                .help("Register the built-in rule set")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .help("Start with rewrite tracing enabled")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Rewrite FILE, print the result and exit")
                .index(1),
        )
        .get_matches();

    // Extract command line options
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => RewriteConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RewriteConfig::default(),
    };
    if matches.get_flag("builtin") {
        config.builtin_rules = true;
    }
    if matches.get_flag("trace") {
        config.debug_trace = true;
    }

    // Create runtime with the rewrite stage installed
    let runtime = Runtime::new(config)?;
    if let Some(path) = matches.get_one::<PathBuf>("rules") {
        let specs = rules_file::load(path)?;
        rules_file::register(runtime.engine(), &specs)
            .with_context(|| format!("registering {}", path.display()))?;
    }

    if let Some(path) = matches.get_one::<PathBuf>("file") {
        return rewrite_file(&runtime, path);
    }

    let mut repl = Repl::new(runtime)?;

    println!("Splice REPL v{}", splice_core::VERSION);
    println!("Rules: {}", repl.runtime().engine().rule_count());
    println!("Type .help for help, .quit to exit");
    println!();

    run_repl(&mut repl)
}

/// Rewrite one file and print the result
fn rewrite_file(runtime: &Runtime, path: &Path) -> Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let output = runtime.rewrite_source(&source, &path.display().to_string())?;
    debug!(path = %path.display(), bytes = output.len(), "rewrote file");
    println!("{output}");

    let engine = runtime.engine();
    if engine.debug_trace() {
        for entry in engine.take_trace() {
            eprintln!("{} rule {}: {} => {}", entry.location, entry.rule, entry.before, entry.after);
        }
    }
    Ok(())
}

fn run_repl(repl: &mut Repl) -> Result<()> {
    use rustyline::{error::ReadlineError, DefaultEditor};

    let mut rl = DefaultEditor::new()?;
    let mut multiline = MultiLineCollector::new();
    let is_interactive = io::stdin().is_terminal();

    while repl.is_running() {
        match rl.readline(multiline.get_prompt()) {
            Ok(line) => {
                let trimmed = line.trim();

                // Handle empty input
                if trimmed.is_empty() && !multiline.is_collecting() {
                    continue;
                }

                // Check if it's a REPL command
                if trimmed.starts_with('.') && !multiline.is_collecting() {
                    rl.add_history_entry(&line)?;
                    match repl.parse_input(trimmed) {
                        Ok(command) => match repl.handle_command(command) {
                            Ok(output) => repl.notifier().on_output(&output),
                            Err(e) => repl.notifier().on_error(&format!("Error: {e:#}")),
                        },
                        Err(e) => repl.notifier().on_error(&format!("Error: {e}")),
                    }
                    continue;
                }

                // Process through multi-line collector
                match multiline.process_line(&line, repl.parser()) {
                    LineProcessResult::Complete(code) => {
                        rl.add_history_entry(&code)?;

                        // Echo input in non-interactive mode
                        if !is_interactive {
                            println!(">> {code}");
                        }

                        match repl.execute(&code) {
                            Ok(result) => repl.notifier().on_result(
                                &result.output,
                                result.rewrites,
                                result.duration_ms,
                                repl.is_quiet(),
                            ),
                            Err(e) => repl.notifier().on_error(&format!("Error: {e}")),
                        }
                    }
                    LineProcessResult::NeedMore => {
                        // Continue collecting lines
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if multiline.is_collecting() {
                    // Cancel multi-line collection
                    println!("^C");
                    multiline.reset();
                } else {
                    println!("Use .quit to exit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    // Show exit statistics
    repl.show_exit_stats();

    Ok(())
}
