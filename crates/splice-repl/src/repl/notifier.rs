//! Where the REPL sends rewritten units, command replies and errors
//!
//! The binary prints to the console. Tests and embedders can swap in a
//! [`ReplNotifier`] that records what a session produced.

/// Receives everything a REPL session prints
pub trait ReplNotifier: Send + Sync {
    /// Reply to a dot command such as `.rules` or `.log`
    fn on_output(&self, content: &str);

    /// Parse failures, rejected rules and command errors
    fn on_error(&self, content: &str);

    /// A rewritten unit. Unless `quiet`, followed by how many rules fired
    fn on_result(&self, output: &str, rewrites: u64, duration_ms: u64, quiet: bool);
}

/// Prints to stdout, errors to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNotifier;

impl DefaultNotifier {
    pub fn new() -> Self {
        Self
    }

    fn summary(rewrites: u64, duration_ms: u64) -> String {
        let plural = if rewrites == 1 { "" } else { "s" };
        format!("=> {rewrites} rewrite{plural} ({duration_ms}ms)")
    }
}

impl ReplNotifier for DefaultNotifier {
    fn on_output(&self, content: &str) {
        if !content.is_empty() {
            println!("{content}");
        }
    }

    fn on_error(&self, content: &str) {
        eprintln!("{content}");
    }

    fn on_result(&self, output: &str, rewrites: u64, duration_ms: u64, quiet: bool) {
        println!("{output}");
        if !quiet {
            println!("{}", Self::summary(rewrites, duration_ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_pluralizes_rewrites() {
        assert_eq!(DefaultNotifier::summary(1, 3), "=> 1 rewrite (3ms)");
        assert_eq!(DefaultNotifier::summary(0, 0), "=> 0 rewrites (0ms)");
    }
}
