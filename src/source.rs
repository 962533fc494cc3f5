//! Docblock collector for C-style `/** ... */` comments.
//!
//! Finds the comment blocks in a source file and pairs them with the
//! declaration that follows:
//! - `/** ... */` before `class|interface|trait Name` → a new [`Declaration`]
//! - `/** ... */` before `function name` → a [`Member`] of the current declaration
//!
//! Functions without a docblock still become members with an empty comment.
//! Declarations are named by their fully qualified name (`App\Http\User`)
//! so same-named classes from different namespaces stay apart.
//! This is a line scanner, not a language parser.

use crate::extract::{Declaration, Member};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static RE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:abstract|final|readonly)\s+)*(?:class|interface|trait)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .unwrap()
});

static RE_NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^namespace\s+([A-Za-z_][A-Za-z0-9_\\]*)\s*[;{]").unwrap()
});

static RE_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:public|protected|private|static|abstract|final)\s+)*function\s+&?([A-Za-z_][A-Za-z0-9_]*)",
    )
    .unwrap()
});

const DOC_OPEN: &str = "/**";
const DOC_CLOSE: &str = "*/";
// The close may share the opener's second star, as in `/**/`.
const CLOSE_SEARCH_FROM: usize = 2;

/// Collect declarations and their members from source text.
pub fn collect(input: &str) -> Vec<Declaration> {
    let mut declarations: Vec<Declaration> = Vec::new();
    let mut pending_doc: Option<String> = None;
    let mut open_doc: Option<String> = None;
    let mut namespace: Option<String> = None;

    for raw in input.lines() {
        let mut line = raw.trim();

        // Inside a multi-line docblock
        if let Some(doc) = open_doc.as_mut() {
            doc.push('\n');
            match line.find(DOC_CLOSE) {
                Some(end) => {
                    doc.push_str(&line[..end + DOC_CLOSE.len()]);
                    pending_doc = open_doc.take();
                    line = line[end + DOC_CLOSE.len()..].trim();
                }
                None => {
                    doc.push_str(line);
                    continue;
                }
            }
        }

        // Docblock start, possibly closing on the same line
        if line.starts_with(DOC_OPEN) {
            match line[CLOSE_SEARCH_FROM..].find(DOC_CLOSE) {
                Some(end) => {
                    let end = CLOSE_SEARCH_FROM + end + DOC_CLOSE.len();
                    pending_doc = Some(line[..end].to_string());
                    line = line[end..].trim();
                }
                None => {
                    open_doc = Some(line.to_string());
                    continue;
                }
            }
        }

        if line.is_empty() || line.starts_with("#[") {
            continue;
        }

        if let Some(caps) = RE_NAMESPACE.captures(line) {
            debug!(namespace = &caps[1], "entering namespace");
            namespace = Some(caps[1].to_string());
            pending_doc = None;
            continue;
        }

        if let Some(caps) = RE_DECLARATION.captures(line) {
            let name = match &namespace {
                Some(ns) => format!("{ns}\\{}", &caps[1]),
                None => caps[1].to_string(),
            };
            debug!(declaration = %name, documented = pending_doc.is_some(), "found declaration");
            declarations.push(Declaration::new(name, pending_doc.take().unwrap_or_default()));
            continue;
        }

        if let Some(caps) = RE_MEMBER.captures(line) {
            let name = caps[1].to_string();
            let comment = pending_doc.take().unwrap_or_default();
            match declarations.last_mut() {
                Some(owner) => {
                    debug!(declaration = %owner.name, member = %name, "found member");
                    owner.members.push(Member { name, comment });
                }
                None => debug!(function = %name, "skipping function outside any declaration"),
            }
            continue;
        }

        // Any other code detaches a pending docblock
        pending_doc = None;
    }

    declarations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_with_documented_methods() {
        let input = r#"<?php
namespace App;

/**
 * @ApiRoute(name="/user")
 */
class User
{
    /**
     * @ApiMethod(type="get")
     */
    public function get()
    {
    }

    public static function helper() {}
}
"#;
        let decls = collect(input);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, r"App\User");
        assert_eq!(decls[0].comment, "/**\n* @ApiRoute(name=\"/user\")\n*/");
        assert_eq!(decls[0].members.len(), 2);
        assert_eq!(decls[0].members[0].name, "get");
        assert!(decls[0].members[0].comment.contains("@ApiMethod"));
        assert_eq!(decls[0].members[1].name, "helper");
        assert_eq!(decls[0].members[1].comment, "");
    }

    #[test]
    fn single_line_docblock() {
        let input = "/** @ApiSector(name=\"Admin\") */\nfinal class Admin {\n/** @Foo(1) */ public function run() {}\n}\n";
        let decls = collect(input);
        assert_eq!(decls[0].comment, "/** @ApiSector(name=\"Admin\") */");
        assert_eq!(decls[0].members[0].name, "run");
        assert_eq!(decls[0].members[0].comment, "/** @Foo(1) */");
    }

    #[test]
    fn docblock_detached_by_code() {
        let input = "class A {\n/** @Foo(1) */\n$x = 1;\nfunction f() {}\n}\n";
        let decls = collect(input);
        assert_eq!(decls[0].members[0].comment, "");
    }

    #[test]
    fn attributes_do_not_detach() {
        let input = "class A {\n/** @Foo(1) */\n#[Pure]\nfunction f() {}\n}\n";
        let decls = collect(input);
        assert_eq!(decls[0].members[0].comment, "/** @Foo(1) */");
    }

    #[test]
    fn free_functions_are_skipped() {
        let decls = collect("/** @Foo(1) */\nfunction main() {}\n");
        assert!(decls.is_empty());
    }

    #[test]
    fn multiple_declarations() {
        let input = "/** @A(1) */\nclass One {}\ninterface Two {\nfunction x();\n}\n";
        let decls = collect(input);
        let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["One", "Two"]);
        assert_eq!(decls[1].comment, "");
        assert_eq!(decls[1].members[0].name, "x");
    }

    #[test]
    fn namespaces_qualify_declaration_names() {
        let input = "<?php\nnamespace App\\Admin;\nclass User {}\nnamespace App\\Public {\nclass User {}\n}\n";
        let names: Vec<String> = collect(input).into_iter().map(|d| d.name).collect();
        assert_eq!(names, [r"App\Admin\User", r"App\Public\User"]);
    }

    #[test]
    fn docblock_before_namespace_is_not_attached() {
        let input = "/** @ApiSector(name=\"File\") */\nnamespace App;\nclass User {}\n";
        assert_eq!(collect(input)[0].comment, "");
    }

    #[test]
    fn empty_comment_closes_on_its_own_line() {
        let input = "class A {\n/**/\npublic function f() {}\n/** @Foo(1) */\npublic function g() {}\n}\n";
        let decls = collect(input);
        let members: Vec<&str> = decls[0].members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, ["f", "g"]);
        assert_eq!(decls[0].members[0].comment, "/**/");
        assert_eq!(decls[0].members[1].comment, "/** @Foo(1) */");
    }
}
