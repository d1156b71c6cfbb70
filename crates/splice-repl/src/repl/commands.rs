//! REPL command parsing and definitions
//!
//! Handles parsing of dot-commands (.help, .rule, .trace, etc.).

use anyhow::{anyhow, Result};

/// Separator between the two snippets of a `.rule` command
pub const RULE_ARROW: &str = "=>";

/// Available REPL commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Show help information
    Help,
    /// Exit the REPL
    Quit,
    /// Toggle quiet mode
    Quiet,
    /// Register a rewrite rule
    Rule { from: String, to: String },
    /// Set tracing, or toggle it when no state is given
    Trace(Option<bool>),
    /// List registered rules with their hit counts
    Rules,
    /// Drain and show the trace log
    Log,
    /// Toggle printing the kind tree after each rewrite
    Dump,
    /// Register rules from a JSON rules file
    Load(String),
}

/// Parse a command string into a ReplCommand
pub fn parse_command(input: &str) -> Result<ReplCommand> {
    let trimmed = input.trim();

    let Some(body) = trimmed.strip_prefix('.') else {
        return Err(anyhow!("Commands must start with '.'"));
    };

    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };

    if name.is_empty() {
        return Err(anyhow!("Empty command"));
    }

    match name {
        "help" | "h" => Ok(ReplCommand::Help),
        "quit" | "q" | "exit" => Ok(ReplCommand::Quit),
        "quiet" => Ok(ReplCommand::Quiet),
        "rule" => {
            let Some((from, to)) = rest.split_once(RULE_ARROW) else {
                return Err(anyhow!("Usage: .rule <from> {RULE_ARROW} <to>"));
            };
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() {
                return Err(anyhow!("Usage: .rule <from> {RULE_ARROW} <to>"));
            }
            Ok(ReplCommand::Rule {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
        "trace" => match rest {
            "" => Ok(ReplCommand::Trace(None)),
            "on" => Ok(ReplCommand::Trace(Some(true))),
            "off" => Ok(ReplCommand::Trace(Some(false))),
            _ => Err(anyhow!("Usage: .trace [on|off]")),
        },
        "rules" => Ok(ReplCommand::Rules),
        "log" => Ok(ReplCommand::Log),
        "dump" => Ok(ReplCommand::Dump),
        "load" => {
            if rest.is_empty() {
                return Err(anyhow!("Usage: .load <rules.json>"));
            }
            Ok(ReplCommand::Load(rest.to_string()))
        }
        _ => Err(anyhow!("Unknown command: .{}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_help() {
        assert!(matches!(parse_command(".help").unwrap(), ReplCommand::Help));
        assert!(matches!(parse_command(".h").unwrap(), ReplCommand::Help));
    }

    #[test]
    fn test_parse_quit() {
        assert!(matches!(parse_command(".quit").unwrap(), ReplCommand::Quit));
        assert!(matches!(parse_command(".q").unwrap(), ReplCommand::Quit));
        assert!(matches!(parse_command(".exit").unwrap(), ReplCommand::Quit));
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!(
            parse_command(".rule $a + $a => $a * 2").unwrap(),
            ReplCommand::Rule {
                from: "$a + $a".to_string(),
                to: "$a * 2".to_string(),
            }
        );
        // an empty replacement is left for the compiler to reject
        assert_eq!(
            parse_command(".rule f($x) =>").unwrap(),
            ReplCommand::Rule {
                from: "f($x)".to_string(),
                to: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_trace() {
        assert_eq!(parse_command(".trace").unwrap(), ReplCommand::Trace(None));
        assert_eq!(parse_command(".trace on").unwrap(), ReplCommand::Trace(Some(true)));
        assert_eq!(parse_command(".trace off").unwrap(), ReplCommand::Trace(Some(false)));
    }

    #[test]
    fn test_parse_invalid_command() {
        assert!(parse_command(".invalid").is_err());
        assert!(parse_command("help").is_err()); // Missing dot
        assert!(parse_command(".rule $a + 0").is_err()); // Missing arrow
        assert!(parse_command(".trace maybe").is_err());
        assert!(parse_command(".load").is_err()); // Missing argument
    }
}
