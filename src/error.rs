//! Error types for annotation extraction.

use thiserror::Error;

/// Failure while parsing the body of a single `@Name(...)` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `"` was opened but never closed.
    #[error("unterminated quote opened at offset {offset}")]
    UnterminatedQuote { offset: usize },

    /// A closing quote or composite was followed by something other than `,`.
    #[error("missing comma separator near: ...{near}<--")]
    MissingCommaSeparator { near: String },

    /// A `{` without its matching `}`.
    #[error("composite value is not enclosed correctly near: ...{near}")]
    UnterminatedComposite { near: String },
}

/// Errors surfaced by the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("failed to parse arguments of @{annotation}: {source}")]
    Parse {
        annotation: String,
        #[source]
        source: ParseError,
    },

    /// Raised only by strict object materialization.
    #[error("annotation kind not registered: {name}")]
    UnknownAnnotationKind { name: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
