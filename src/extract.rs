//! Extraction service with its memo of parsed annotations.
//!
//! An [`Extractor`] owns two caches: declaration name → the declaration's own
//! annotations, and (declaration, member) → the member's merged annotations.
//! Entries are computed on first request and then reused unchanged for as
//! long as the extractor lives; the only way to drop them is [`Extractor::clear`].
//! The comment text is not part of the key, so a name must always be paired
//! with the same comment within one extractor.
//!
//! Lookup-or-compute for a key runs under that key's shard lock, which makes
//! the extractor safe to share between threads: two callers asking for the
//! same key never both run the scanner.

use crate::consolidate::{consolidate, ConsolidationRules};
use crate::error::Result;
use crate::scan::{AnnotationSet, CommentScanner, Scanner};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::sync::Arc;

/// A class-like construct and the comments of its members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub comment: String,
    pub members: Vec<Member>,
}

/// A method-like construct owned by a [`Declaration`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub comment: String,
}

impl Declaration {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Declaration {
            name: name.into(),
            comment: comment.into(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: impl Into<String>, comment: impl Into<String>) -> Self {
        self.members.push(Member {
            name: name.into(),
            comment: comment.into(),
        });
        self
    }
}

/// Member name → merged annotations, in member order.
pub type Extraction = IndexMap<String, Arc<AnnotationSet>>;

type MemberKey = (String, String);

pub struct Extractor<S = Scanner> {
    scanner: S,
    rules: ConsolidationRules,
    declarations: DashMap<String, Arc<AnnotationSet>>,
    members: DashMap<MemberKey, Arc<AnnotationSet>>,
}

impl Extractor<Scanner> {
    pub fn new() -> Self {
        Self::with_scanner(Scanner)
    }
}

impl Default for Extractor<Scanner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CommentScanner> Extractor<S> {
    pub fn with_scanner(scanner: S) -> Self {
        Extractor {
            scanner,
            rules: ConsolidationRules::default(),
            declarations: DashMap::new(),
            members: DashMap::new(),
        }
    }

    pub fn with_rules(mut self, rules: ConsolidationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &ConsolidationRules {
        &self.rules
    }

    /// The declaration's own annotations, without any member merging.
    pub fn declaration_annotations(&self, declaration: &Declaration) -> Result<Arc<AnnotationSet>> {
        self.declaration_set(&declaration.name, &declaration.comment)
    }

    /// One member's annotations merged with its declaration's.
    pub fn member_annotations(
        &self,
        declaration: &Declaration,
        member: &Member,
    ) -> Result<Arc<AnnotationSet>> {
        let key = (declaration.name.clone(), member.name.clone());
        if let Some(hit) = self.members.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }

        match self.members.entry(key) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let own = self.scanner.scan(&member.comment)?;
                let base = self.declaration_set(&declaration.name, &declaration.comment)?;
                let merged = Arc::new(consolidate(own, &base, &self.rules));
                entry.insert(Arc::clone(&merged));
                Ok(merged)
            }
        }
    }

    /// Merged annotations for every member of the declaration.
    pub fn extract(&self, declaration: &Declaration) -> Result<Extraction> {
        declaration
            .members
            .iter()
            .map(|member| {
                let merged = self.member_annotations(declaration, member)?;
                Ok((member.name.clone(), merged))
            })
            .collect()
    }

    /// [`Extractor::extract`] over several declarations, keyed by declaration name.
    ///
    /// Stops at the first declaration that fails to parse.
    pub fn extract_all(&self, declarations: &[Declaration]) -> Result<IndexMap<String, Extraction>> {
        declarations
            .iter()
            .map(|declaration| Ok((declaration.name.clone(), self.extract(declaration)?)))
            .collect()
    }

    /// Forget every cached entry.
    pub fn clear(&self) {
        self.declarations.clear();
        self.members.clear();
    }

    /// Number of cached entries, declarations and members together.
    pub fn len(&self) -> usize {
        self.declarations.len() + self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn declaration_set(&self, name: &str, comment: &str) -> Result<Arc<AnnotationSet>> {
        if let Some(hit) = self.declarations.get(name) {
            return Ok(Arc::clone(hit.value()));
        }

        match self.declarations.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let set = Arc::new(self.scanner.scan(comment)?);
                entry.insert(Arc::clone(&set));
                Ok(set)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn user() -> Declaration {
        Declaration::new("User", r#"/** @ApiRoute(name="/user") @ApiSector(name="Users") */"#)
            .member("get", r#"/** @ApiRoute(name="/get/{id}") @ApiMethod(type="get") */"#)
            .member("helper", "/** Internal. */")
    }

    #[test]
    fn extract_merges_each_member() {
        let extractor = Extractor::new();
        let result = extractor.extract(&user()).unwrap();

        let names: Vec<&str> = result.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, ["get", "helper"]);

        let get = &result["get"];
        assert_eq!(get["ApiRoute"][0].get("name"), Some(&Value::from("/user/get/{id}")));
        assert_eq!(get["ApiSector"][0].get("name"), Some(&Value::from("Users")));
        assert!(result["helper"].is_empty());
    }

    #[test]
    fn declaration_annotations_are_unmerged() {
        let extractor = Extractor::new();
        let set = extractor.declaration_annotations(&user()).unwrap();
        assert_eq!(set["ApiRoute"][0].get("name"), Some(&Value::from("/user")));
    }

    #[test]
    fn entries_are_reused() {
        let extractor = Extractor::new();
        let decl = user();
        let first = extractor.member_annotations(&decl, &decl.members[0]).unwrap();
        let second = extractor.member_annotations(&decl, &decl.members[0]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn clear_empties_the_cache() {
        let extractor = Extractor::new();
        extractor.extract(&user()).unwrap();
        // one declaration, two members
        assert_eq!(extractor.len(), 3);

        extractor.clear();
        assert!(extractor.is_empty());
    }

    #[test]
    fn failures_are_not_cached() {
        let extractor = Extractor::new();
        let broken = Declaration::new("Broken", "/** */").member("m", r#"/** @Foo(a="x) */"#);
        assert!(extractor.extract(&broken).is_err());
        assert!(extractor.member_annotations(&broken, &broken.members[0]).is_err());
        assert!(extractor.is_empty());
    }

    #[test]
    fn broken_declaration_fails_every_member() {
        let extractor = Extractor::new();
        let decl = Declaration::new("Bad", r#"/** @ApiRoute(name={"/x") */"#)
            .member("ok", r#"/** @ApiMethod(type="get") */"#);
        assert!(extractor.extract(&decl).is_err());
    }

    #[test]
    fn extract_all_keys_by_declaration() {
        let extractor = Extractor::new();
        let other = Declaration::new("Article", "/** */").member("list", "/** @ApiMethod(get) */");
        let all = extractor.extract_all(&[user(), other]).unwrap();

        let names: Vec<&str> = all.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, ["User", "Article"]);
        assert_eq!(all["Article"]["list"]["ApiMethod"], vec![Value::from("get")]);
    }
}
