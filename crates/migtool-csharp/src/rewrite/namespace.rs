// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Namespace declaration rewriting.

use std::collections::BTreeMap;

use migtool_core::namespace;
use migtool_core::patch::{Span, TextEdit};
use serde::{Deserialize, Serialize};

use super::{check_namespace, RewriteError, RewriteOutput, Rewriting};
use crate::references::collect_references;
use crate::syntax::SyntaxTree;

/// Maps full namespace names, old to new.
///
/// Declarations match on segment boundaries: a mapping for `Acme.Core` also
/// moves `Acme.Core.Models` to the new prefix. The longest matching old name
/// wins. Nested declarations are rewritten relative to their (possibly
/// rewritten) outer declaration.
///
/// With [`with_qualified_names`](Self::with_qualified_names), namespace
/// qualifiers in code (`Acme.Core.Foo`, `global::Acme.Core.Foo`) are
/// rewritten too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRewrite {
    pub mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub qualified_names: bool,
}

/// Outcome of looking a name up in the mappings.
enum Lookup<'m> {
    Mapped {
        old: &'m str,
        new: &'m str,
        name: String,
    },
    /// The name already sits under the new prefix of a mapping that nests
    /// new under old.
    AlreadyApplied,
    NoMatch,
}

impl NamespaceRewrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.mappings.insert(old.into(), new.into());
        self
    }

    pub fn with_qualified_names(mut self) -> Self {
        self.qualified_names = true;
        self
    }

    fn lookup(&self, name: &str) -> Lookup<'_> {
        let best = self
            .mappings
            .iter()
            .filter(|(old, _)| namespace::is_same_or_child(name, old))
            .max_by_key(|(old, _)| old.len());
        let Some((old, new)) = best else {
            return Lookup::NoMatch;
        };
        if namespace::is_strict_child(new, old) && namespace::is_same_or_child(name, new) {
            return Lookup::AlreadyApplied;
        }
        match namespace::replace_prefix(name, old, new) {
            Some(name) => Lookup::Mapped { old, new, name },
            None => Lookup::NoMatch,
        }
    }

    /// New full name of `name`, or the name itself when unmapped.
    fn renamed(&self, name: &str) -> String {
        match self.lookup(name) {
            Lookup::Mapped { name, .. } => name,
            _ => name.to_string(),
        }
    }

    pub fn apply(&self, source: &str) -> Result<RewriteOutput, RewriteError> {
        for (old, new) in &self.mappings {
            check_namespace(old)?;
            check_namespace(new)?;
        }
        let tree = SyntaxTree::parse(source)?;
        let mut rewriting = Rewriting::new(source);
        self.declarations(&tree, &mut rewriting);
        if self.qualified_names {
            self.qualified(&tree, &mut rewriting);
        }
        rewriting.finish()
    }

    fn declarations(&self, tree: &SyntaxTree<'_>, rewriting: &mut Rewriting<'_>) {
        for decl in &tree.namespaces {
            let Lookup::Mapped { old, new, name } = self.lookup(&decl.name) else {
                continue;
            };
            let written = match decl.parent {
                None => name,
                Some(parent) => {
                    let outer = self.renamed(&tree.namespaces[parent].name);
                    if !namespace::is_strict_child(&name, &outer) {
                        rewriting.skipped(
                            old,
                            new,
                            format!("{} cannot be declared inside namespace {}", name, outer),
                        );
                        continue;
                    }
                    name[outer.len() + 1..].to_string()
                }
            };
            if written != decl.written {
                rewriting.edit(TextEdit::replace(decl.name_span, written));
                rewriting.applied(old, new);
            }
        }
    }

    fn qualified(&self, tree: &SyntaxTree<'_>, rewriting: &mut Rewriting<'_>) {
        for reference in collect_references(tree) {
            let segments = &reference.segments;
            if segments.len() < 2 {
                continue;
            }
            let ns = tree.namespace_at(reference.first_token);
            'prefixes: for p in (1..segments.len()).rev() {
                let written: Vec<&str> = segments[..p].iter().map(|s| s.text.as_str()).collect();
                let written = written.join(".");
                // Absolute first, then relative to each enclosing namespace,
                // innermost first. `global::` names are only absolute.
                let mut scopes = vec![""];
                if !reference.anchored {
                    scopes.extend(namespace::enclosing_chain(ns).into_iter().filter(|s| !s.is_empty()));
                }
                for scope in scopes {
                    let full = namespace::join(scope, &written);
                    match self.lookup(&full) {
                        Lookup::NoMatch => continue,
                        Lookup::AlreadyApplied => break 'prefixes,
                        Lookup::Mapped { old, new, name } => {
                            let outer = self.renamed(scope);
                            let replacement = if !scope.is_empty() && namespace::is_strict_child(&name, &outer) {
                                name[outer.len() + 1..].to_string()
                            } else {
                                name
                            };
                            if replacement != written {
                                let span = Span::new(segments[0].span.start, segments[p - 1].span.end);
                                rewriting.edit(TextEdit::replace(span, replacement));
                                rewriting.applied(old, new);
                            }
                            break 'prefixes;
                        }
                    }
                }
            }
        }
    }
}
