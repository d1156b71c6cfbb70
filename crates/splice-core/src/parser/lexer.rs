// Token-level nom parsers. Every token parser skips leading whitespace and
// comments, so the grammar can chain them directly.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while},
    character::complete::{char, digit1, hex_digit1, multispace1, one_of, satisfy},
    combinator::{opt, recognize, value},
    error::{ContextError, ErrorKind, ParseError as _, VerboseError},
    multi::many0_count,
    sequence::{pair, preceded, tuple},
    IResult,
};

use crate::ast::Value;

pub(crate) type R<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Punctuation and operators, longest first so matching is maximal munch
const PUNCTUATION: &[&str] = &[
    "===", "!==", "**=", "<<=", ">>=", "...", "==", "!=", "<=", ">=", "&&", "||", "++", "--",
    "+=", "-=", "*=", "/=", ".=", "%=", "|=", "&=", "^=", "<<", ">>", "**", "->", "::", "=>",
    "+", "-", "*", "/", "%", ".", "<", ">", "=", "!", "~", "&", "|", "^", "?", ":", ";", ",",
    "(", ")", "[", "]", "{", "}",
];

/// Characters the grammar gives meaning to; none of them can start an identifier
pub(crate) const RESERVED_CHARS: &str = "+-*/%.<>=!~&|^?:;,()[]{}\"'#\\";

pub(crate) const KEYWORDS: &[&str] = &[
    "if",
    "else",
    "elseif",
    "while",
    "for",
    "return",
    "echo",
    "function",
    "class",
    "extends",
    "implements",
    "new",
    "instanceof",
    "use",
    "abstract",
    "final",
    "public",
    "protected",
    "private",
    "static",
];

pub(crate) fn error<'a, T>(input: &'a str, message: &'static str) -> R<'a, T> {
    Err(nom::Err::Error(VerboseError::add_context(
        input,
        message,
        VerboseError::from_error_kind(input, ErrorKind::Verify),
    )))
}

fn line_comment(input: &str) -> R<'_, &str> {
    recognize(pair(alt((tag("//"), tag("#"))), take_while(|c| c != '\n')))(input)
}

fn block_comment(input: &str) -> R<'_, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

/// Whitespace and comments
pub(crate) fn ws(input: &str) -> R<'_, ()> {
    value((), many0_count(alt((multispace1, line_comment, block_comment))))(input)
}

fn punct(input: &str) -> R<'_, &str> {
    for candidate in PUNCTUATION.iter().copied() {
        if let Some(rest) = input.strip_prefix(candidate) {
            return Ok((rest, &input[..candidate.len()]));
        }
    }
    error(input, "expected operator")
}

/// Next operator or punctuation token
pub(crate) fn operator(input: &str) -> R<'_, &str> {
    preceded(ws, punct)(input)
}

/// The exact punctuation token `symbol`
pub(crate) fn sym<'a>(symbol: &'static str) -> impl FnMut(&'a str) -> R<'a, &'a str> {
    move |input: &'a str| {
        let (start, _) = ws(input)?;
        match punct(start) {
            Ok((rest, token)) if token == symbol => Ok((rest, token)),
            _ => error(start, symbol),
        }
    }
}

fn word(input: &str) -> R<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)
}

/// The keyword `keyword`, not followed by further identifier characters
pub(crate) fn kw<'a>(keyword: &'static str) -> impl FnMut(&'a str) -> R<'a, &'a str> {
    move |input: &'a str| {
        let (start, _) = ws(input)?;
        match word(start) {
            Ok((rest, text)) if text == keyword => Ok((rest, text)),
            _ => error(start, keyword),
        }
    }
}

/// Peek at the next bare word without consuming it
pub(crate) fn peek_word(input: &str) -> Option<&str> {
    let (start, _) = ws(input).ok()?;
    word(start).ok().map(|(_, text)| text)
}

/// Identifier; `$` and the capture sigil may lead
pub(crate) fn identifier<'a>(sigil: char) -> impl FnMut(&'a str) -> R<'a, &'a str> {
    move |input: &'a str| {
        let (start, _) = ws(input)?;
        recognize(pair(
            satisfy(move |c| c.is_alphabetic() || c == '_' || c == '$' || c == sigil),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        ))(start)
    }
}

pub(crate) fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

/// Integer, hexadecimal or float literal
pub(crate) fn number(input: &str) -> R<'_, Value> {
    let (start, _) = ws(input)?;
    if let Ok((rest, digits)) = preceded(tag_no_case("0x"), hex_digit1::<_, VerboseError<&str>>)(start) {
        return match i64::from_str_radix(digits, 16) {
            Ok(n) => Ok((rest, Value::Integer(n))),
            Err(_) => error(start, "hexadecimal literal out of range"),
        };
    }
    let (rest, text) = recognize(tuple((
        digit1,
        opt(pair(char('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(start)?;
    if text.contains(['.', 'e', 'E']) {
        match text.parse::<f64>() {
            Ok(f) => Ok((rest, Value::Float(f))),
            Err(_) => error(start, "malformed float literal"),
        }
    } else {
        // Integers beyond i64 degrade to floats
        match text.parse::<i64>() {
            Ok(n) => Ok((rest, Value::Integer(n))),
            Err(_) => match text.parse::<f64>() {
                Ok(f) => Ok((rest, Value::Float(f))),
                Err(_) => error(start, "malformed integer literal"),
            },
        }
    }
}

/// Single- or double-quoted string literal
pub(crate) fn string(input: &str) -> R<'_, String> {
    let (start, _) = ws(input)?;
    let (mut rest, quote) = one_of("\"'")(start)?;
    let mut text = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => {
                return Err(nom::Err::Failure(VerboseError::add_context(
                    start,
                    "unterminated string literal",
                    VerboseError::from_error_kind(start, ErrorKind::Eof),
                )))
            }
            Some(c) if c == quote => return Ok((chars.as_str(), text)),
            Some('\\') => {
                let escaped = chars.next();
                match (quote, escaped) {
                    ('"', Some('n')) => text.push('\n'),
                    ('"', Some('t')) => text.push('\t'),
                    ('"', Some('r')) => text.push('\r'),
                    ('"', Some('0')) => text.push('\0'),
                    ('"', Some('$')) => text.push('$'),
                    (_, Some('\\')) => text.push('\\'),
                    (q, Some(c)) if c == q => text.push(c),
                    (_, Some(c)) => {
                        text.push('\\');
                        text.push(c);
                    }
                    (_, None) => text.push('\\'),
                }
            }
            Some(c) => text.push(c),
        }
        rest = chars.as_str();
    }
}

/// True when the next significant character starts a number
pub(crate) fn at_digit(input: &str) -> bool {
    matches!(ws(input), Ok((rest, _)) if rest.starts_with(|c: char| c.is_ascii_digit()))
}

pub(crate) fn at_quote(input: &str) -> bool {
    matches!(ws(input), Ok((rest, _)) if rest.starts_with(['"', '\'']))
}

/// Optional `<?php` open tag
pub(crate) fn open_tag(input: &str) -> R<'_, Option<&str>> {
    preceded(ws, opt(tag("<?php")))(input)
}
