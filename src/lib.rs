//! apidoc — extract `@Annotation(...)` facts from documentation comments.
//!
//! The engine works on plain strings: the caller supplies the comment of a
//! declaration and the comments of its members, and gets back, per member,
//! the member's annotations merged with the declaration-wide ones.
//!
//! - [`scan`] parses one comment block into an [`AnnotationSet`]
//! - [`consolidate`] merges a member's set with its declaration's set
//! - [`Extractor`] does both and caches the results
//! - [`registry::materialize`] turns merged annotations into caller objects
//!
//! ```
//! use apidoc::{Declaration, Extractor, Value};
//!
//! let user = Declaration::new("User", r#"/** @ApiRoute(name="/user") */"#)
//!     .member("get", r#"/** @ApiRoute(name="/get/{id}") */"#);
//!
//! let extractor = Extractor::new();
//! let merged = extractor.extract(&user).unwrap();
//! assert_eq!(
//!     merged["get"]["ApiRoute"][0].get("name"),
//!     Some(&Value::from("/user/get/{id}"))
//! );
//! ```

pub mod args;
pub mod consolidate;
pub mod error;
pub mod extract;
pub mod registry;
pub mod scan;
pub mod source;
pub mod value;

pub use args::parse_args;
pub use consolidate::{consolidate, ConsolidationRules};
pub use error::{Error, ParseError, Result};
pub use extract::{Declaration, Extraction, Extractor, Member};
pub use scan::{scan, AnnotationSet, CommentScanner, Scanner};
pub use value::{cast, Value};
