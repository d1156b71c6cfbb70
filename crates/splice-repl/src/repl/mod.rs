//! REPL (Read-Eval-Print Loop) functionality for Splice
//!
//! This module provides interactive command-line interface components that wrap
//! the core Splice runtime with user-friendly features like:
//! - Command history and editing
//! - Multi-line input collection
//! - REPL commands (.rule, .trace, .log, etc.)
//! - Output formatting and notifications

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use splice_core::{Parser, RewriteConfig, Runtime, ToSource, TraceEntry};

pub mod commands;
pub mod multiline;
pub mod notifier;
pub mod rules_file;

pub use commands::ReplCommand;
pub use multiline::{LineProcessResult, MultiLineCollector, REPL_ORIGIN};
pub use notifier::{DefaultNotifier, ReplNotifier};
pub use rules_file::RuleSpec;

/// A rewritten snippet ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub output: String,
    pub rewrites: u64,
    pub duration_ms: u64,
}

/// Interactive REPL over a rewrite runtime
pub struct Repl {
    /// Core Splice runtime
    runtime: Runtime,
    /// Current notifier for output
    notifier: Box<dyn ReplNotifier>,
    /// Whether the REPL is running
    running: bool,
    /// Quiet mode (suppress rewrite counts and timing)
    quiet: bool,
    /// Append the kind tree to each result
    dump: bool,
    /// Snippets rewritten this session
    units: u64,
}

impl Repl {
    /// Create a new REPL with the given runtime
    pub fn new(runtime: Runtime) -> Result<Self> {
        Ok(Self {
            runtime,
            notifier: Box::new(DefaultNotifier::new()),
            running: true,
            quiet: false,
            dump: false,
            units: 0,
        })
    }

    /// Create a new REPL over a fresh runtime
    pub fn with_config(config: RewriteConfig) -> Result<Self> {
        let runtime = Runtime::new(config)?;
        Self::new(runtime)
    }

    /// Set the notifier for this REPL
    pub fn set_notifier(&mut self, notifier: Box<dyn ReplNotifier>) {
        self.notifier = notifier;
    }

    /// Get a reference to the current notifier
    pub fn notifier(&self) -> &dyn ReplNotifier {
        self.notifier.as_ref()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Parser used for snippets and rule registration
    pub fn parser(&self) -> &dyn Parser {
        self.runtime.parser().as_ref()
    }

    /// Check if the REPL is still running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Set quiet mode
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Parse REPL input into a command
    pub fn parse_input(&self, input: &str) -> Result<ReplCommand> {
        commands::parse_command(input)
    }

    /// Handle a REPL command
    pub fn handle_command(&mut self, command: ReplCommand) -> Result<String> {
        match command {
            ReplCommand::Help => Ok(self.get_help_text()),
            ReplCommand::Quit => {
                self.running = false;
                Ok("Goodbye!".to_string())
            }
            ReplCommand::Quiet => {
                self.quiet = !self.quiet;
                Ok(format!("Quiet mode: {}", on_off(self.quiet)))
            }
            ReplCommand::Rule { from, to } => self.add_rule(&from, &to),
            ReplCommand::Trace(state) => {
                let engine = self.runtime.engine();
                let enabled = state.unwrap_or(!engine.debug_trace());
                engine.set_debug_trace(enabled);
                Ok(format!("Trace: {}", on_off(enabled)))
            }
            ReplCommand::Rules => Ok(self.list_rules()),
            ReplCommand::Log => Ok(format_trace(&self.runtime.engine().take_trace())),
            ReplCommand::Dump => {
                self.dump = !self.dump;
                Ok(format!("Tree dump: {}", on_off(self.dump)))
            }
            ReplCommand::Load(path) => self.load_rules(Path::new(&path)),
        }
    }

    /// Rewrite a source snippet and return the result with its rewrite count
    pub fn execute(&mut self, code: &str) -> Result<Execution> {
        let start = Instant::now();
        let before = self.total_hits();

        let ast = self.runtime.compile_unit(code, REPL_ORIGIN)?;
        let mut output = ast.to_source();
        if self.dump {
            if let Some(root) = ast.root() {
                output.push('\n');
                output.push_str(&ast.dump(root));
            }
        }

        self.units += 1;
        Ok(Execution {
            output,
            rewrites: self.total_hits().saturating_sub(before),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Register a rule typed at the prompt
    fn add_rule(&mut self, from: &str, to: &str) -> Result<String> {
        let id = self.runtime.engine().try_add_rule(from, to)?;
        Ok(format!("Rule {} added: {} => {}", id, from, to))
    }

    /// Register every rule in a JSON rules file
    pub fn load_rules(&mut self, path: &Path) -> Result<String> {
        let specs = rules_file::load(path)?;
        let count = rules_file::register(self.runtime.engine(), &specs)?;
        Ok(format!("Loaded {} rules from {}", count, path.display()))
    }

    fn list_rules(&self) -> String {
        let stats = self.runtime.engine().rule_stats();
        if stats.is_empty() {
            return "No rules registered.".to_string();
        }
        let lines = stats
            .iter()
            .map(|rule| format!("  {} {} => {}  ({} hits)", rule.id, rule.from, rule.to, rule.hits))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Rules:\n{}", lines)
    }

    fn total_hits(&self) -> u64 {
        self.runtime.engine().rule_stats().iter().map(|rule| rule.hits).sum()
    }

    /// Get help text
    fn get_help_text(&self) -> String {
        r#"Splice REPL Commands:
  .help               - Show this help message
  .quit               - Exit the REPL
  .quiet              - Toggle quiet mode (hide rewrite counts and timing)
  .rule FROM => TO    - Register a rewrite rule
  .load FILE          - Register rules from a JSON rules file
  .rules              - List rules with their hit counts
  .trace [on|off]     - Set or toggle rewrite tracing
  .log                - Show and clear the trace log
  .dump               - Toggle printing the kind tree after each rewrite

Rules are written as source snippets. Identifiers starting with the capture
sigil are wildcards, and a name used twice must match equal subtrees:
  .rule $a + $a => $a * 2
  .rule strlen($s) == 0 => $s === ''

Anything else typed at the prompt is parsed, rewritten and printed back."#
            .to_string()
    }

    /// Show exit statistics
    pub fn show_exit_stats(&self) {
        if !self.quiet {
            let rules = self.runtime.engine().rule_count();
            println!(
                "\nSession complete: {} snippets rewritten, {} rules, {} rewrites applied.",
                self.units,
                rules,
                self.total_hits()
            );
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn format_trace(entries: &[TraceEntry]) -> String {
    if entries.is_empty() {
        return "Trace log is empty.".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} rule {}: {} => {}",
                entry.location, entry.rule, entry.before, entry.after
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
