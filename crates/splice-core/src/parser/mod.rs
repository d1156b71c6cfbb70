// Parser module - host language front end behind a swappable trait
use std::path::Path;

use thiserror::Error;

use crate::ast::Ast;
use crate::DEFAULT_SIGIL;

pub(crate) mod grammar;
mod lexer;


/// Syntax error with the position it was detected at
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{origin}:{line}:{column}: {message}")]
pub struct ParseError {
    pub origin: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Trait for host language parsers
pub trait Parser: Send + Sync {
    /// Parse a complete compilation unit; `origin` labels the source for
    /// diagnostics and trace locations
    fn parse(&self, source: &str, origin: &str) -> Result<Ast, ParseError>;

    /// Parse a file, using its path as the origin
    fn parse_file(&self, path: &Path) -> Result<Ast, ParseError> {
        let origin = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|e| ParseError {
            origin: origin.clone(),
            line: 0,
            column: 0,
            message: e.to_string(),
        })?;
        self.parse(&source, &origin)
    }

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}

/// Reference front end for the PHP-flavoured host language
#[derive(Debug, Clone)]
pub struct SpliceParser {
    sigil: char,
}

impl SpliceParser {
    pub fn new() -> Self {
        Self::with_capture_sigil(DEFAULT_SIGIL)
    }

    /// Parser that also accepts identifiers starting with `sigil`, so rule
    /// snippets using a non-default capture sigil can be lexed
    pub fn with_capture_sigil(sigil: char) -> Self {
        Self { sigil }
    }

    pub fn capture_sigil(&self) -> char {
        self.sigil
    }
}

impl Default for SpliceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for SpliceParser {
    fn parse(&self, source: &str, origin: &str) -> Result<Ast, ParseError> {
        grammar::parse_unit(source, origin, self.sigil)
    }

    fn name(&self) -> &'static str {
        "splice"
    }
}

/// Whether `sigil` can prefix an identifier without clashing with the grammar
pub fn is_valid_sigil(sigil: char) -> bool {
    sigil != '_' && !sigil.is_alphanumeric() && !sigil.is_whitespace() && !lexer::RESERVED_CHARS.contains(sigil)
}

/// Create a parser by name
pub fn create_parser(name: &str) -> Option<Box<dyn Parser>> {
    match name {
        "splice" | "php" => Some(Box::new(SpliceParser::new())),
        _ => None,
    }
}
