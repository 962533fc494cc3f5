//! Annotation scanner: finds every `@Name(args)` in a comment block.

use crate::args::parse_args;
use crate::error::{Error, Result};
use crate::value::Value;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Annotation name → occurrences in source order.
pub type AnnotationSet = IndexMap<String, Vec<Value>>;

// Body runs to the first unescaped `)` and may span lines.
static RE_ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)@(?P<name>[A-Za-z_-]+)\s*\((?P<args>(?:[^)\\]|\\.)*)\)").unwrap()
});

/// Length of the `/**` header and `*/` footer removed before matching.
const HEADER_LEN: usize = 3;
const FOOTER_LEN: usize = 2;

/// Scan a comment block into an [`AnnotationSet`].
///
/// A malformed body aborts the whole block; nothing partial is returned.
pub fn scan(comment: &str) -> Result<AnnotationSet> {
    let mut annotations = AnnotationSet::new();
    let body = strip_delimiters(comment);

    for caps in RE_ANNOTATION.captures_iter(body) {
        let name = &caps["name"];
        let value = parse_args(caps["args"].trim()).map_err(|source| Error::Parse {
            annotation: name.to_string(),
            source,
        })?;
        annotations.entry(name.to_string()).or_default().push(value);
    }

    Ok(annotations)
}

/// Drop the fixed comment header and footer, counted in characters.
fn strip_delimiters(comment: &str) -> &str {
    let total = comment.chars().count();
    if total <= HEADER_LEN + FOOTER_LEN {
        return "";
    }
    let start = byte_offset(comment, HEADER_LEN);
    let end = byte_offset(comment, total - FOOTER_LEN);
    &comment[start..end]
}

fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Turns one comment block into annotations.
///
/// [`crate::Extractor`] is generic over this so callers can swap in their
/// own scanning (or count calls in tests).
pub trait CommentScanner {
    fn scan(&self, comment: &str) -> Result<AnnotationSet>;
}

impl<S: CommentScanner + ?Sized> CommentScanner for &S {
    fn scan(&self, comment: &str) -> Result<AnnotationSet> {
        (**self).scan(comment)
    }
}

impl<S: CommentScanner + ?Sized> CommentScanner for Arc<S> {
    fn scan(&self, comment: &str) -> Result<AnnotationSet> {
        (**self).scan(comment)
    }
}

/// The default scanner, backed by [`scan`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Scanner;

impl CommentScanner for Scanner {
    fn scan(&self, comment: &str) -> Result<AnnotationSet> {
        scan(comment)
    }
}
