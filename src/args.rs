//! Argument parser for the body of one `@Name(...)` occurrence.
//!
//! The body is scanned left to right over an immutable character buffer.
//! Every helper takes the cursor it starts at and hands back the cursor
//! where the caller should continue, so nested composites are parsed by a
//! fresh application of [`parse_args`] on their own slice instead of
//! sharing a position with the enclosing scan.
//!
//! Grammar summary:
//!
//! - `name=value` pairs separated by `,` produce a map
//! - bare values separated by `,` produce a list; a lone value without any
//!   `,` is a scalar
//! - empty entries (`a,,b`, a trailing `,`) are dropped
//! - `"..."` quotes suspend recognition of `{ } , =`
//! - `{...}` is a nested composite parsed with the same grammar

use crate::error::ParseError;
use crate::value::{cast, Value};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

// Leading comment stars on continuation lines of a multi-line body.
static RE_LINE_STAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\*").unwrap());

/// Parse the text between an annotation's outer parentheses.
pub fn parse_args(content: &str) -> Result<Value, ParseError> {
    let content = RE_LINE_STAR.replace_all(content, "");
    let chars: Vec<char> = content.chars().collect();
    parse_body(&chars)
}

/// Text or composite collected for the current token.
#[derive(Debug)]
enum Pending {
    Text(String),
    Composite(Value),
}

impl Default for Pending {
    fn default() -> Self {
        Pending::Text(String::new())
    }
}

impl Pending {
    fn push(&mut self, c: char) {
        match self {
            Pending::Text(buf) => buf.push(c),
            // Only whitespace can reach a closed composite; it is dropped.
            Pending::Composite(_) => {}
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Pending::Text(buf) => buf.trim().is_empty(),
            Pending::Composite(_) => false,
        }
    }

    fn into_value(self, quoted: bool) -> Value {
        match self {
            Pending::Text(buf) => cast(&buf, quoted),
            Pending::Composite(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Name,
    Value,
}

/// One `name=value` pair (or lone value) under construction.
#[derive(Debug)]
struct Pair {
    level: Level,
    name: Pending,
    value: Pending,
    quoted: bool,
}

impl Default for Pair {
    fn default() -> Self {
        Pair {
            level: Level::Name,
            name: Pending::default(),
            value: Pending::default(),
            quoted: false,
        }
    }
}

impl Pair {
    fn current(&mut self) -> &mut Pending {
        match self.level {
            Level::Name => &mut self.name,
            Level::Value => &mut self.value,
        }
    }

    fn is_empty(&self) -> bool {
        self.level == Level::Name && !self.quoted && self.name.is_blank()
    }

    fn finish(self) -> Entry {
        match self.level {
            Level::Value => {
                let key = match self.name {
                    Pending::Text(buf) => buf.trim().to_string(),
                    Pending::Composite(value) => value.to_string(),
                };
                Entry::Named(key, self.value.into_value(self.quoted))
            }
            Level::Name => {
                let key = match &self.name {
                    Pending::Text(buf) => buf.trim().to_string(),
                    Pending::Composite(value) => value.to_string(),
                };
                Entry::Unnamed(key, self.name.into_value(self.quoted))
            }
        }
    }
}

#[derive(Debug)]
enum Entry {
    Named(String, Value),
    /// A lone value. Keeps its raw text for when the occurrence turns out
    /// to be a map and the value becomes a flag-style key.
    Unnamed(String, Value),
}

fn parse_body(chars: &[char]) -> Result<Value, ParseError> {
    let mut entries: Vec<Entry> = Vec::new();
    let mut pair = Pair::default();
    let mut keyed = false;
    let mut separated = false;
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '"' if !is_escaped(chars, pos) => {
                let (text, next) = scan_quoted(chars, pos)?;
                expect_separator(chars, next)?;
                *pair.current() = Pending::Text(text);
                pair.quoted = true;
                pos = next;
            }
            '=' if pair.level == Level::Name => {
                pair.level = Level::Value;
                pair.quoted = false;
                keyed = true;
                pos += 1;
            }
            ',' => {
                let done = std::mem::take(&mut pair);
                if !done.is_empty() {
                    entries.push(done.finish());
                }
                separated = true;
                pos += 1;
            }
            '{' => {
                let (value, next) = scan_composite(chars, pos)?;
                let next = skip_whitespace(chars, next);
                expect_separator(chars, next)?;
                *pair.current() = Pending::Composite(value);
                pos = next;
            }
            '}' => pos += 1,
            _ => {
                pair.current().push(c);
                pos += 1;
            }
        }
    }

    if !pair.is_empty() {
        entries.push(pair.finish());
    }

    Ok(assemble(entries, keyed, separated))
}

/// Shape the collected entries into the occurrence value.
fn assemble(entries: Vec<Entry>, keyed: bool, separated: bool) -> Value {
    if keyed {
        let mut map = IndexMap::new();
        for entry in entries {
            match entry {
                Entry::Named(key, value) => {
                    map.insert(key, value);
                }
                Entry::Unnamed(key, _) => {
                    map.insert(key, Value::String(String::new()));
                }
            }
        }
        return Value::Map(map);
    }

    let mut values: Vec<Value> = entries
        .into_iter()
        .map(|entry| match entry {
            Entry::Named(_, value) | Entry::Unnamed(_, value) => value,
        })
        .collect();

    if values.len() == 1 && !separated {
        values.remove(0)
    } else {
        Value::List(values)
    }
}

/// Read a quoted string starting at the opening quote.
///
/// Returns the raw content (escapes intact) and the cursor just past the
/// closing quote.
fn scan_quoted(chars: &[char], open: usize) -> Result<(String, usize), ParseError> {
    let mut text = String::new();
    let mut pos = open + 1;
    while pos < chars.len() {
        let c = chars[pos];
        if c == '"' && !is_escaped(chars, pos) {
            return Ok((text, pos + 1));
        }
        text.push(c);
        pos += 1;
    }
    Err(ParseError::UnterminatedQuote { offset: open })
}

/// Parse a `{...}` composite starting at the opening brace.
///
/// Braces inside quotes do not count toward nesting.
fn scan_composite(chars: &[char], open: usize) -> Result<(Value, usize), ParseError> {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut pos = open;
    while pos < chars.len() {
        let c = chars[pos];
        if c == '"' && !is_escaped(chars, pos) {
            in_quote = !in_quote;
        } else if !in_quote {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let value = parse_body(&chars[open + 1..pos])?;
                        return Ok((value, pos + 1));
                    }
                }
                _ => {}
            }
        }
        pos += 1;
    }
    Err(ParseError::UnterminatedComposite {
        near: chars[open + 1..].iter().collect(),
    })
}

/// A closed quote or composite must be followed by `,` or end of input.
fn expect_separator(chars: &[char], pos: usize) -> Result<(), ParseError> {
    match chars.get(pos) {
        None | Some(',') => Ok(()),
        Some(_) => Err(ParseError::MissingCommaSeparator {
            near: context_before(chars, pos),
        }),
    }
}

fn skip_whitespace(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

/// Up to ten characters ending at `pos` (inclusive), for error messages.
fn context_before(chars: &[char], pos: usize) -> String {
    let end = (pos + 1).min(chars.len());
    let start = end.saturating_sub(10);
    chars[start..end].iter().collect()
}

/// Odd number of consecutive preceding backslashes means escaped.
fn is_escaped(chars: &[char], pos: usize) -> bool {
    let mut backslashes = 0;
    let mut j = pos;
    while j > 0 && chars[j - 1] == '\\' {
        backslashes += 1;
        j -= 1;
    }
    backslashes % 2 == 1
}
