// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! `using` directive rewriting.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use migtool_core::namespace;
use migtool_core::patch::{Span, TextEdit};
use migtool_core::text;
use serde::{Deserialize, Serialize};

use super::{check_namespace, RewriteError, RewriteOutput, Rewriting};
use crate::syntax::{SyntaxTree, UsingDirective};

/// Explicit add, remove and replace sets for `using` directives.
///
/// - `replace` is tried by exact target first, then by the longest dotted
///   prefix (`Acme.Core` → `Acme.Kernel` turns `using Acme.Core.Models;`
///   into `using Acme.Kernel.Models;`). Static and alias targets are
///   replaced too. When replacements leave several plain directives with
///   the same target in one scope, only one of them is kept, preferring a
///   directive the rewrite did not touch.
/// - `remove` deletes plain directives whose target matches exactly.
/// - `add` inserts plain file-level directives that are not already
///   present, in alphabetical position with `System` namespaces first,
///   without reordering the existing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsingRewrite {
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub replace: BTreeMap<String, String>,
}

/// What happens to one existing directive.
enum Fate {
    Keep,
    Delete,
    Retarget(String),
}

impl UsingRewrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, namespace: impl Into<String>) -> Self {
        self.add.push(namespace.into());
        self
    }

    pub fn remove(mut self, namespace: impl Into<String>) -> Self {
        self.remove.push(namespace.into());
        self
    }

    pub fn replace(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.replace.insert(old.into(), new.into());
        self
    }

    /// Replacement target and the mapping used, exact match first.
    fn replacement(&self, target: &str) -> Option<(&str, &str, String)> {
        if let Some((old, new)) = self.replace.get_key_value(target) {
            return Some((old, new, new.clone()));
        }
        let (old, new) = self
            .replace
            .iter()
            .filter(|(old, _)| namespace::is_strict_child(target, old))
            .max_by_key(|(old, _)| old.len())?;
        if namespace::is_strict_child(new, old) && namespace::is_same_or_child(target, new) {
            return None;
        }
        namespace::replace_prefix(target, old, new).map(|name| (old.as_str(), new.as_str(), name))
    }

    pub fn apply(&self, source: &str) -> Result<RewriteOutput, RewriteError> {
        for name in self.add.iter().chain(&self.remove) {
            check_namespace(name)?;
        }
        for (old, new) in &self.replace {
            check_namespace(old)?;
            check_namespace(new)?;
        }
        let tree = SyntaxTree::parse(source)?;
        let mut rewriting = Rewriting::new(source);

        let mut fates = Vec::with_capacity(tree.usings.len());
        for using in &tree.usings {
            let (target, anchored) = namespace::strip_global(&using.target);
            let fate = if using.is_plain() && self.remove.iter().any(|r| r == target) {
                rewriting.applied(target, "");
                Fate::Delete
            } else if let Some((old, new, replaced)) = self.replacement(target) {
                rewriting.applied(old, new);
                let written = if anchored {
                    format!("{}{}", namespace::GLOBAL_ALIAS, replaced)
                } else {
                    replaced
                };
                Fate::Retarget(written)
            } else {
                Fate::Keep
            };
            fates.push(fate);
        }

        // Plain directives grouped by scope and final target. A group that a
        // replacement joined keeps one directive: an untouched one if any,
        // else the first.
        let mut groups: BTreeMap<(Option<usize>, String), Vec<usize>> = BTreeMap::new();
        for (index, (using, fate)) in tree.usings.iter().zip(&fates).enumerate() {
            if !using.is_plain() {
                continue;
            }
            if let Some(name) = final_target(using, fate) {
                groups.entry((using.scope, name)).or_default().push(index);
            }
        }
        for indices in groups.values() {
            if !indices.iter().any(|&i| matches!(fates[i], Fate::Retarget(_))) {
                continue;
            }
            let survivor = indices
                .iter()
                .copied()
                .find(|&i| matches!(fates[i], Fate::Keep))
                .unwrap_or(indices[0]);
            for &i in indices {
                if i != survivor {
                    fates[i] = Fate::Delete;
                }
            }
        }
        let present: BTreeSet<(Option<usize>, String)> = groups.into_keys().collect();

        for (using, fate) in tree.usings.iter().zip(&fates) {
            match fate {
                Fate::Keep => {}
                Fate::Delete => rewriting.edit(TextEdit::delete(line_span(source, using))),
                Fate::Retarget(written) => {
                    rewriting.edit(TextEdit::replace(using.target_span, written.clone()))
                }
            }
        }

        self.additions(&tree, &fates, &present, &mut rewriting);
        rewriting.finish()
    }

    fn additions(
        &self,
        tree: &SyntaxTree<'_>,
        fates: &[Fate],
        present: &BTreeSet<(Option<usize>, String)>,
        rewriting: &mut Rewriting<'_>,
    ) {
        let source = tree.source;
        let newline = text::detect_newline(source);
        let mut wanted: Vec<&str> = Vec::new();
        for name in &self.add {
            if present.contains(&(None, name.clone())) {
                rewriting.skipped(name, name, "already imported");
            } else if !wanted.contains(&name.as_str()) {
                wanted.push(name);
            }
        }
        wanted.sort_by(|a, b| import_order(a, b));

        // File-level directives: surviving plain ones are the ordering anchors.
        let file_level: Vec<(&UsingDirective, &Fate)> = tree
            .usings
            .iter()
            .zip(fates)
            .filter(|(using, _)| using.scope.is_none() && !using.is_global)
            .collect();
        let anchors: Vec<(&UsingDirective, String)> = file_level
            .iter()
            .filter(|(using, _)| using.is_plain())
            .filter_map(|(using, fate)| final_target(using, fate).map(|name| (*using, name)))
            .collect();

        let mut inserts: BTreeMap<usize, String> = BTreeMap::new();
        for name in wanted {
            let line = format!("using {};", name);
            let (offset, text) = if let Some((before, _)) = anchors
                .iter()
                .find(|(_, target)| import_order(name, target) == Ordering::Less)
            {
                let indent = text::indentation_at(source, before.span.start);
                (
                    text::line_start(source, before.span.start),
                    format!("{}{}{}", indent, line, newline),
                )
            } else if let Some((last, _)) = anchors.last() {
                let indent = text::indentation_at(source, last.span.start);
                let offset = text::next_line_start(source, last.span.end);
                let lead = if offset == source.len() && !source.ends_with('\n') {
                    newline
                } else {
                    ""
                };
                (offset, format!("{}{}{}{}", lead, indent, line, newline))
            } else if let Some((first, _)) = file_level.first() {
                let indent = text::indentation_at(source, first.span.start);
                (
                    text::line_start(source, first.span.start),
                    format!("{}{}{}", indent, line, newline),
                )
            } else {
                let offset = tree
                    .tokens
                    .first()
                    .map_or(source.len(), |token| text::line_start(source, token.span.start));
                (offset, format!("{}{}", line, newline))
            };
            inserts.entry(offset).or_default().push_str(&text);
            rewriting.applied("", name);
            rewriting.manifest.edit_count += 1;
        }

        let no_usings = file_level.is_empty();
        for (offset, mut text) in inserts {
            if no_usings && offset < source.len() {
                text.push_str(newline);
            }
            rewriting.edits.push(TextEdit::insert_at(offset, text));
        }
    }
}

/// Target a directive ends up with, without any `global::` prefix.
fn final_target(using: &UsingDirective, fate: &Fate) -> Option<String> {
    match fate {
        Fate::Keep => Some(namespace::strip_global(&using.target).0.to_string()),
        Fate::Retarget(written) => Some(namespace::strip_global(written).0.to_string()),
        Fate::Delete => None,
    }
}

/// `System` namespaces first, then ordinal.
fn import_order(a: &str, b: &str) -> Ordering {
    let system = |name: &str| !namespace::is_same_or_child(name, "System");
    (system(a), a).cmp(&(system(b), b))
}

/// The directive's whole line when it stands alone on it, else the directive.
fn line_span(source: &str, using: &UsingDirective) -> Span {
    let line_end = text::next_line_start(source, using.span.end);
    let alone = text::only_whitespace_before(source, using.span.start)
        && source[using.span.end..line_end].trim().is_empty();
    if alone {
        Span::new(text::line_start(source, using.span.start), line_end)
    } else {
        using.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "using System;\nusing Acme.Core;\nusing Zeta.Tools;\n\nnamespace Acme.App { }\n";

    mod replace {
        use super::*;

        #[test]
        fn exact_then_prefix() {
            let source = "using Acme.Core;\nusing Acme.Core.Models;\nusing static Acme.Core.Math;\n";
            let output = UsingRewrite::new()
                .replace("Acme.Core", "Acme.Kernel")
                .apply(source)
                .unwrap();
            assert_eq!(
                output.text,
                "using Acme.Kernel;\nusing Acme.Kernel.Models;\nusing static Acme.Kernel.Math;\n"
            );
            assert_eq!(output.manifest.edit_count, 3);
            assert_eq!(output.manifest.applied.len(), 1);
        }

        #[test]
        fn exact_mapping_beats_prefix() {
            let source = "using Acme.Core.Models;\n";
            let output = UsingRewrite::new()
                .replace("Acme.Core", "Acme.Kernel")
                .replace("Acme.Core.Models", "Acme.Domain")
                .apply(source)
                .unwrap();
            assert_eq!(output.text, "using Acme.Domain;\n");
        }

        #[test]
        fn duplicate_after_replace_is_removed() {
            let source = "using Acme.Kernel;\nusing Acme.Core;\nclass A { }\n";
            let output = UsingRewrite::new()
                .replace("Acme.Core", "Acme.Kernel")
                .apply(source)
                .unwrap();
            assert_eq!(output.text, "using Acme.Kernel;\nclass A { }\n");
            assert_eq!(output.manifest.edit_count, 1);
        }

        #[test]
        fn target_already_imported_later_is_not_duplicated() {
            let source = "using Acme.Core;\nusing Acme.Kernel;\nclass A { }\n";
            let rewrite = UsingRewrite::new().replace("Acme.Core", "Acme.Kernel");
            let output = rewrite.apply(source).unwrap();
            assert_eq!(output.text, "using Acme.Kernel;\nclass A { }\n");
            assert_eq!(output.text.matches("using Acme.Kernel;").count(), 1);
            assert_eq!(output.manifest.edit_count, 1);
            assert!(rewrite.apply(&output.text).unwrap().is_unchanged());
        }

        #[test]
        fn two_sources_merging_into_one_target() {
            let source = "using Acme.Core;\nusing System;\nusing Acme.Legacy;\nclass A { }\n";
            let output = UsingRewrite::new()
                .replace("Acme.Core", "Acme.Kernel")
                .replace("Acme.Legacy", "Acme.Kernel")
                .apply(source)
                .unwrap();
            assert_eq!(output.text, "using Acme.Kernel;\nusing System;\nclass A { }\n");
            assert_eq!(output.manifest.applied.len(), 2);
        }

        #[test]
        fn duplicates_in_other_scopes_are_kept() {
            let source = "using Acme.Core;\nnamespace App\n{\n    using Acme.Kernel;\n    class A { }\n}\n";
            let output = UsingRewrite::new()
                .replace("Acme.Core", "Acme.Kernel")
                .apply(source)
                .unwrap();
            assert_eq!(
                output.text,
                "using Acme.Kernel;\nnamespace App\n{\n    using Acme.Kernel;\n    class A { }\n}\n"
            );
        }

        #[test]
        fn global_prefix_and_alias_survive() {
            let source = "using global::Acme.Core;\nusing Core = Acme.Core.Thing;\n";
            let output = UsingRewrite::new()
                .replace("Acme.Core", "Acme.Kernel")
                .apply(source)
                .unwrap();
            assert_eq!(
                output.text,
                "using global::Acme.Kernel;\nusing Core = Acme.Kernel.Thing;\n"
            );
        }
    }

    mod add_remove {
        use super::*;

        #[test]
        fn additions_are_ordered_system_first() {
            let output = UsingRewrite::new()
                .add("System.Linq")
                .add("Beta.Util")
                .add("Zulu")
                .apply(HEADER)
                .unwrap();
            assert_eq!(
                output.text,
                "using System;\nusing System.Linq;\nusing Acme.Core;\nusing Beta.Util;\nusing Zeta.Tools;\nusing Zulu;\n\nnamespace Acme.App { }\n"
            );
            assert_eq!(output.manifest.edit_count, 3);
        }

        #[test]
        fn present_namespaces_are_not_added() {
            let output = UsingRewrite::new().add("Acme.Core").apply(HEADER).unwrap();
            assert!(output.is_unchanged());
            assert_eq!(output.text, HEADER);
            assert_eq!(output.manifest.skipped[0].reason, "already imported");
        }

        #[test]
        fn removal_deletes_the_line() {
            let output = UsingRewrite::new().remove("Acme.Core").apply(HEADER).unwrap();
            assert_eq!(
                output.text,
                "using System;\nusing Zeta.Tools;\n\nnamespace Acme.App { }\n"
            );
            assert_eq!(output.manifest.applied[0].old, "Acme.Core");
            assert_eq!(output.manifest.applied[0].new, "");
        }

        #[test]
        fn indentation_and_newlines_are_copied() {
            let indented = "  using Acme.Core;\r\n  using Zeta;\r\n";
            let output = UsingRewrite::new().add("Beta").apply(indented).unwrap();
            assert_eq!(output.text, "  using Acme.Core;\r\n  using Beta;\r\n  using Zeta;\r\n");

            let source = "namespace A\r\n{\r\n}\r\n";
            let output = UsingRewrite::new().add("Acme.Core").apply(source).unwrap();
            assert_eq!(output.text, "using Acme.Core;\r\n\r\nnamespace A\r\n{\r\n}\r\n");
        }

        #[test]
        fn file_without_usings_gets_them_after_the_header() {
            let source = "// Copyright\n\nnamespace A { }\n";
            let output = UsingRewrite::new().add("System").add("Acme").apply(source).unwrap();
            assert_eq!(
                output.text,
                "// Copyright\n\nusing System;\nusing Acme;\n\nnamespace A { }\n"
            );
        }

        #[test]
        fn last_line_without_newline() {
            let output = UsingRewrite::new().add("Zeta").apply("using Acme;").unwrap();
            assert_eq!(output.text, "using Acme;\nusing Zeta;\n");
        }

        #[test]
        fn swap_in_place() {
            let source = "using Acme.App;\nusing Acme.Core;\nusing Zeta;\n";
            let output = UsingRewrite::new()
                .remove("Acme.Core")
                .add("Acme.Core.V2")
                .apply(source)
                .unwrap();
            assert_eq!(output.text, "using Acme.App;\nusing Acme.Core.V2;\nusing Zeta;\n");
            let again = UsingRewrite::new()
                .remove("Acme.Core")
                .add("Acme.Core.V2")
                .apply(&output.text)
                .unwrap();
            assert!(again.is_unchanged());
        }
    }
}
