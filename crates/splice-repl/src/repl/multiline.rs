//! Multi-line input collection for the REPL
//!
//! Handles collection of multi-line source snippets, including:
//! - Bracket/brace matching
//! - String literal handling
//! - Statement completion detection
//! - Prompt management

use splice_core::Parser;

/// Origin label for snippets typed at the prompt
pub const REPL_ORIGIN: &str = "<repl>";

/// Result of processing a line of input
#[derive(Debug)]
pub enum LineProcessResult {
    /// Input is complete and ready for rewriting
    Complete(String),
    /// More input is needed to complete the statement
    NeedMore,
}

/// Collects multi-line input for complete statements
pub struct MultiLineCollector {
    /// Buffer for collecting lines
    buffer: String,
    /// Current nesting level (for braces, brackets, etc.)
    nesting_level: i32,
    /// Whether we're inside a string literal
    in_string: bool,
    /// String delimiter character (single or double quote)
    string_delimiter: char,
    /// Whether the last character was an escape
    last_was_escape: bool,
}

impl MultiLineCollector {
    /// Create a new multi-line collector
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            nesting_level: 0,
            in_string: false,
            string_delimiter: '"',
            last_was_escape: false,
        }
    }

    /// Get the appropriate prompt for the current state
    pub fn get_prompt(&self) -> &'static str {
        if self.is_collecting() {
            "   " // Continuation prompt
        } else {
            ">> " // Main prompt
        }
    }

    /// Check if we're currently collecting a multi-line statement
    pub fn is_collecting(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Reset the collector state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.nesting_level = 0;
        self.in_string = false;
        self.last_was_escape = false;
    }

    /// Process a line of input
    pub fn process_line(&mut self, line: &str, parser: &dyn Parser) -> LineProcessResult {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);

        self.update_parsing_state(line);

        if self.is_complete_statement(parser) {
            let complete_code = self.buffer.clone();
            self.reset();
            LineProcessResult::Complete(complete_code)
        } else {
            LineProcessResult::NeedMore
        }
    }

    /// Update parsing state based on the new line
    fn update_parsing_state(&mut self, line: &str) {
        for ch in line.chars() {
            if self.in_string {
                if self.last_was_escape {
                    self.last_was_escape = false;
                } else if ch == '\\' {
                    self.last_was_escape = true;
                } else if ch == self.string_delimiter {
                    self.in_string = false;
                }
            } else {
                match ch {
                    '"' | '\'' => {
                        self.in_string = true;
                        self.string_delimiter = ch;
                        self.last_was_escape = false;
                    }
                    '{' | '(' | '[' => {
                        self.nesting_level += 1;
                    }
                    '}' | ')' | ']' => {
                        self.nesting_level -= 1;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Check if the current buffer contains a complete statement
    fn is_complete_statement(&self, parser: &dyn Parser) -> bool {
        if self.in_string || self.nesting_level > 0 {
            return false;
        }

        if parser.parse(&self.buffer, REPL_ORIGIN).is_ok() {
            return true;
        }

        // Unparseable but balanced: keep collecting only when the text
        // visibly stops mid-statement, otherwise hand it over for the error
        let trimmed = self.buffer.trim_end();
        let dangling_operator = ['=', ',', '+', '-', '*', '/', '.', '&', '|', '?', ':', '!', '<', '>']
            .iter()
            .any(|c| trimmed.ends_with(*c));
        let dangling_keyword = ["if", "else", "elseif", "for", "while", "function", "return", "echo", "new"]
            .iter()
            .any(|kw| trimmed.split_whitespace().last() == Some(*kw));

        !(dangling_operator || dangling_keyword)
    }
}

impl Default for MultiLineCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use splice_core::SpliceParser;

    use super::*;

    #[test]
    fn test_simple_complete_statement() {
        let mut collector = MultiLineCollector::new();
        let parser = SpliceParser::new();

        match collector.process_line("x = 42;", &parser) {
            LineProcessResult::Complete(code) => assert_eq!(code, "x = 42;"),
            LineProcessResult::NeedMore => panic!("Expected complete statement"),
        }
    }

    #[test]
    fn test_multiline_function() {
        let mut collector = MultiLineCollector::new();
        let parser = SpliceParser::new();

        match collector.process_line("function twice(n) {", &parser) {
            LineProcessResult::NeedMore => {}
            LineProcessResult::Complete(_) => panic!("Expected need more"),
        }
        assert!(collector.is_collecting());
        assert_eq!(collector.get_prompt(), "   ");

        match collector.process_line("    return n + n;", &parser) {
            LineProcessResult::NeedMore => {}
            LineProcessResult::Complete(_) => panic!("Expected need more"),
        }

        match collector.process_line("}", &parser) {
            LineProcessResult::Complete(code) => {
                assert!(code.starts_with("function twice(n) {"));
                assert!(code.ends_with('}'));
            }
            LineProcessResult::NeedMore => panic!("Expected complete statement"),
        }
        assert!(!collector.is_collecting());
    }

    #[test]
    fn test_dangling_operator_needs_more() {
        let mut collector = MultiLineCollector::new();
        let parser = SpliceParser::new();

        assert!(matches!(collector.process_line("total = a +", &parser), LineProcessResult::NeedMore));
        match collector.process_line("b;", &parser) {
            LineProcessResult::Complete(code) => assert_eq!(code, "total = a +\nb;"),
            LineProcessResult::NeedMore => panic!("Expected complete statement"),
        }
    }

    #[test]
    fn test_string_with_braces() {
        let mut collector = MultiLineCollector::new();
        let parser = SpliceParser::new();

        match collector.process_line("s = \"{ not a block\";", &parser) {
            LineProcessResult::Complete(code) => assert_eq!(code, "s = \"{ not a block\";"),
            LineProcessResult::NeedMore => panic!("Expected complete statement"),
        }
    }

    #[test]
    fn test_balanced_garbage_is_handed_over() {
        let mut collector = MultiLineCollector::new();
        let parser = SpliceParser::new();

        assert!(matches!(collector.process_line("x = = 1;", &parser), LineProcessResult::Complete(_)));
    }
}
