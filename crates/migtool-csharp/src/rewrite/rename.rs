// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Type renaming.

use std::collections::BTreeMap;

use migtool_core::entity::ReferenceContext;
use migtool_core::namespace;
use migtool_core::patch::{Span, TextEdit};
use serde::{Deserialize, Serialize};

use super::{RewriteError, RewriteOutput, Rewriting};
use crate::lexer::TokenKind;
use crate::references::collect_references;
use crate::syntax::SyntaxTree;

const ATTRIBUTE_SUFFIX: &str = "Attribute";

/// Rename a type by simple name.
///
/// Rewrites the declaration name, constructor and destructor names, and
/// every reference in a type position. For `Name.Member` the type segment is
/// renamed unless `Name` is a declared variable. Attribute uses written
/// without the `Attribute` suffix keep that short form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRename {
    pub from: String,
    pub to: String,
}

impl TypeRename {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        TypeRename {
            from: from.into(),
            to: to.into(),
        }
    }

    fn check(&self) -> Result<(), RewriteError> {
        for name in [&self.from, &self.to] {
            if !namespace::is_valid_identifier(name) || namespace::is_reserved_keyword(name) {
                return Err(RewriteError::InvalidIdentifier { name: name.clone() });
            }
        }
        Ok(())
    }

    pub fn apply(&self, source: &str) -> Result<RewriteOutput, RewriteError> {
        self.check()?;
        let tree = SyntaxTree::parse(source)?;
        let mut rewriting = Rewriting::new(source);

        // Keyed by start offset so a token is renamed once.
        let mut edits: BTreeMap<usize, (Span, String)> = BTreeMap::new();
        for decl in tree.types.iter().filter(|decl| decl.name == self.from) {
            edits.insert(decl.name_span.start, (decl.name_span, self.to.clone()));
        }
        for i in self.member_names(&tree) {
            let span = tree.span(i);
            edits.insert(span.start, (span, self.to.clone()));
        }
        for reference in collect_references(&tree) {
            let segments = &reference.segments;
            let target = if reference.context == ReferenceContext::StaticMemberAccess {
                segments[..segments.len().saturating_sub(1)]
                    .iter()
                    .find(|segment| segment.text == self.from)
            } else {
                segments.last()
            };
            let Some(segment) = target else {
                continue;
            };
            let renamed = if segment.text == self.from {
                Some(self.to.clone())
            } else if reference.context == ReferenceContext::Attribute {
                self.short_attribute(&segment.text)
            } else {
                None
            };
            if let Some(renamed) = renamed {
                edits.insert(segment.span.start, (segment.span, renamed));
            }
        }

        if !edits.is_empty() {
            rewriting.applied(&self.from, &self.to);
        }
        for (span, text) in edits.into_values() {
            rewriting.edit(TextEdit::replace(span, text));
        }
        rewriting.finish()
    }

    /// `[Short]` for `ShortAttribute` becomes the short form of the new name.
    fn short_attribute(&self, written: &str) -> Option<String> {
        let short = self.from.strip_suffix(ATTRIBUTE_SUFFIX)?;
        if written != short {
            return None;
        }
        Some(
            self.to
                .strip_suffix(ATTRIBUTE_SUFFIX)
                .filter(|short| !short.is_empty())
                .unwrap_or(self.to.as_str())
                .to_string(),
        )
    }

    /// Constructor and destructor name tokens inside types named `from`.
    fn member_names(&self, tree: &SyntaxTree<'_>) -> Vec<usize> {
        let mut found = Vec::new();
        for decl in tree.types.iter().filter(|decl| decl.name == self.from) {
            let Some((open, close)) = decl.body else {
                continue;
            };
            for i in open + 1..close {
                if tree.kind(i) != Some(TokenKind::Identifier)
                    || tree.text(i).trim_start_matches('@') != self.from
                    || tree.text(i + 1) != "("
                {
                    continue;
                }
                let innermost = tree.type_at(i).is_some_and(|at| at.name_token == decl.name_token);
                let prev = tree.text_before(i, 1);
                if innermost && prev != "new" && prev != "." {
                    found.push(i);
                }
            }
        }
        found
    }
}
