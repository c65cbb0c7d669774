// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Qualified type name replacement.

use std::collections::BTreeMap;

use migtool_core::entity::ReferenceContext;
use migtool_core::namespace;
use migtool_core::patch::{Span, TextEdit};
use serde::{Deserialize, Serialize};

use super::{check_namespace, RewriteError, RewriteOutput, Rewriting};
use crate::references::collect_references;
use crate::syntax::SyntaxTree;

/// Replace qualified type names as written, `Acme.Core.Foo` → `Acme.Web.Foo`.
///
/// A mapping matches a reference whose whole name equals the old text,
/// `global::` included. For `Type.Member` the longest matching prefix is
/// replaced and the member access kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedNameRewrite {
    pub mappings: BTreeMap<String, String>,
}

impl QualifiedNameRewrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.mappings.insert(old.into(), new.into());
        self
    }

    pub fn apply(&self, source: &str) -> Result<RewriteOutput, RewriteError> {
        for (old, new) in &self.mappings {
            check_namespace(namespace::strip_global(old).0)?;
            check_namespace(namespace::strip_global(new).0)?;
        }
        let tree = SyntaxTree::parse(source)?;
        let mut rewriting = Rewriting::new(source);

        for reference in collect_references(&tree) {
            let segments = &reference.segments;
            let prefix = if reference.anchored { namespace::GLOBAL_ALIAS } else { "" };
            let lengths: Vec<usize> = if reference.context == ReferenceContext::StaticMemberAccess {
                (1..segments.len()).rev().collect()
            } else {
                vec![segments.len()]
            };
            for p in lengths {
                let written: Vec<&str> = segments[..p].iter().map(|s| s.text.as_str()).collect();
                let written = format!("{}{}", prefix, written.join("."));
                let Some((old, new)) = self.mappings.get_key_value(&written) else {
                    continue;
                };
                if old != new {
                    let start = tree.span(reference.first_token).start;
                    let span = Span::new(start, segments[p - 1].span.end);
                    rewriting.edit(TextEdit::replace(span, new.clone()));
                    rewriting.applied(old, new);
                }
                break;
            }
        }
        rewriting.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_names_and_member_access() {
        let source = "class A\n{\n    Acme.Core.Foo f = Acme.Core.Foo.Create();\n    global::Acme.Core.Foo g;\n    Acme.Core.Bar b;\n}\n";
        let output = QualifiedNameRewrite::new()
            .map("Acme.Core.Foo", "Acme.Web.Foo")
            .map("global::Acme.Core.Foo", "global::Acme.Web.Foo")
            .apply(source)
            .unwrap();
        assert_eq!(
            output.text,
            "class A\n{\n    Acme.Web.Foo f = Acme.Web.Foo.Create();\n    global::Acme.Web.Foo g;\n    Acme.Core.Bar b;\n}\n"
        );
        assert_eq!(output.manifest.edit_count, 3);
        assert_eq!(output.manifest.applied.len(), 2);
    }

    #[test]
    fn generic_arguments_are_kept() {
        let output = QualifiedNameRewrite::new()
            .map("Acme.Core.Box", "Acme.Web.Box")
            .apply("class A { Acme.Core.Box<int> b; }")
            .unwrap();
        assert_eq!(output.text, "class A { Acme.Web.Box<int> b; }");
    }

    #[test]
    fn names_inside_generic_arguments() {
        let source = "class A\n{\n    List<global::Acme.Core.Foo> items;\n    Dictionary<string, List<Acme.Core.Foo>> map;\n}\n";
        let output = QualifiedNameRewrite::new()
            .map("global::Acme.Core.Foo", "global::Acme.Web.Foo")
            .apply(source)
            .unwrap();
        assert_eq!(
            output.text,
            "class A\n{\n    List<global::Acme.Web.Foo> items;\n    Dictionary<string, List<Acme.Core.Foo>> map;\n}\n"
        );
        assert_eq!(output.manifest.edit_count, 1);

        let output = QualifiedNameRewrite::new()
            .map("Acme.Core.Foo", "Acme.Web.Foo")
            .map("global::Acme.Core.Foo", "global::Acme.Web.Foo")
            .apply(source)
            .unwrap();
        assert_eq!(
            output.text,
            "class A\n{\n    List<global::Acme.Web.Foo> items;\n    Dictionary<string, List<Acme.Web.Foo>> map;\n}\n"
        );
        assert_eq!(output.manifest.edit_count, 2);
        assert_eq!(output.manifest.applied.len(), 2);
    }

    #[test]
    fn partial_qualifiers_do_not_match() {
        let source = "class A { Core.Foo f; }";
        let output = QualifiedNameRewrite::new()
            .map("Acme.Core.Foo", "Acme.Web.Foo")
            .apply(source)
            .unwrap();
        assert!(output.is_unchanged());
    }
}
