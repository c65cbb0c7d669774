//! Impact of renaming a namespace.
//!
//! Renaming `Old` also renames every namespace nested under it. The walk
//! covers declarations, `using` directives (plain, static and alias
//! targets), qualified references to the renamed types, and code inside the
//! renamed namespaces that relied on an enclosing namespace it leaves.

use std::collections::{BTreeMap, BTreeSet};

use crate::cancel::Cancelled;
use crate::impact::complexity::by_file_count;
use crate::impact::report::{codes, ChangeKind, Complexity, ReportDiagnostic, RequiredChange};
use crate::impact::Analysis;
use crate::namespace;

pub(super) fn analyze(
    analysis: &mut Analysis<'_>,
    old: &str,
    new: &str,
) -> Result<Complexity, Cancelled> {
    analysis.cancel.check()?;
    let graph = analysis.graph;

    let mut invalid = false;
    for name in [old, new] {
        if !namespace::is_valid_namespace(name) {
            analysis.report.error(ReportDiagnostic::new(
                codes::INVALID_NAMESPACE,
                format!("'{}' is not a valid namespace name", name),
            ));
            invalid = true;
        }
    }
    if invalid {
        return Ok(Complexity::Trivial);
    }
    if old == new {
        analysis.report.warn(ReportDiagnostic::new(
            codes::NO_CHANGE,
            format!("namespace {} is unchanged", old),
        ));
        return Ok(Complexity::Trivial);
    }

    let declared: Vec<_> = graph.namespaces_under(old).collect();
    let importing: BTreeSet<&str> = graph
        .files()
        .filter(|file| {
            file.imports
                .iter()
                .any(|import| namespace::is_same_or_child(&import.namespace, old))
        })
        .map(|file| file.path.as_str())
        .collect();
    if declared.is_empty() && importing.is_empty() {
        return Ok(analysis.not_found(format!("namespace {} is not used in the solution", old)));
    }

    // Renamed types, old key -> new key.
    let mut renamed: BTreeMap<&str, String> = BTreeMap::new();
    let mut declaring: BTreeSet<&str> = BTreeSet::new();
    for node in &declared {
        declaring.extend(node.files.iter().map(String::as_str));
        for key in &node.types {
            let Some(new_key) = namespace::replace_prefix(key, old, new) else {
                continue;
            };
            if let Some(existing) = graph.type_node(&new_key) {
                if !namespace::is_same_or_child(&existing.namespace, old) {
                    analysis.report.warn(
                        ReportDiagnostic::new(
                            codes::NAMESPACE_COLLISION,
                            format!("renamed {} collides with existing {}", key, new_key),
                        )
                        .at(existing.primary_file(), None),
                    );
                }
            }
            if let Some(ty) = graph.type_node(key) {
                analysis
                    .report
                    .affected_type(key, ty.primary_file(), "namespace declaration update");
            }
            renamed.insert(key.as_str(), new_key);
        }
    }

    declarations(analysis, &declaring, old, new)?;
    directives(analysis, &importing, old, new)?;
    qualified_references(analysis, &renamed, old)?;

    let keys: BTreeSet<String> = renamed.keys().map(|key| key.to_string()).collect();
    analysis.copy_ambiguity_warnings(&keys);
    analysis.copy_parse_failures();

    Ok(by_file_count(analysis.report.affected_count(), analysis.config))
}

/// Namespace declarations, plus usings for enclosing namespaces the renamed
/// code stops seeing.
fn declarations(
    analysis: &mut Analysis<'_>,
    declaring: &BTreeSet<&str>,
    old: &str,
    new: &str,
) -> Result<(), Cancelled> {
    let graph = analysis.graph;
    for path in declaring {
        analysis.cancel.check()?;
        let Some(file) = graph.file(path) else {
            continue;
        };
        let reason = format!("declares namespace {}", old);
        for decl in &file.namespaces {
            let Some(renamed) = namespace::replace_prefix(&decl.name, old, new) else {
                continue;
            };
            analysis.report.change(
                path,
                &file.project,
                &reason,
                RequiredChange::new(
                    ChangeKind::NamespaceUpdate,
                    decl.name.clone(),
                    renamed,
                    "rename namespace declaration",
                )
                .at_line(decl.line),
            );
        }

        let mut lost: BTreeSet<&str> = BTreeSet::new();
        for edge in graph.uses_in_file(path) {
            if edge.is_qualified() {
                continue;
            }
            let Some(target) = graph.type_node(&edge.to) else {
                continue;
            };
            let owner = target.namespace.as_str();
            if owner.is_empty() || namespace::is_same_or_child(owner, old) {
                continue;
            }
            let imported = file
                .imports
                .iter()
                .any(|import| import.is_plain() && import.namespace == owner);
            if !imported
                && namespace::is_strict_child(old, owner)
                && !namespace::is_strict_child(new, owner)
            {
                lost.insert(owner);
            }
        }
        for owner in lost {
            analysis.report.change(
                path,
                &file.project,
                &reason,
                RequiredChange::new(
                    ChangeKind::UsingUpdate,
                    "",
                    owner,
                    format!("add using for enclosing namespace {}", owner),
                ),
            );
        }
    }
    Ok(())
}

fn directives(
    analysis: &mut Analysis<'_>,
    importing: &BTreeSet<&str>,
    old: &str,
    new: &str,
) -> Result<(), Cancelled> {
    let graph = analysis.graph;
    for path in importing {
        analysis.cancel.check()?;
        let Some(file) = graph.file(path) else {
            continue;
        };
        for import in &file.imports {
            let Some(renamed) = namespace::replace_prefix(&import.namespace, old, new) else {
                continue;
            };
            let description = if import.is_static {
                "update using static directive"
            } else if import.alias.is_some() {
                "update using alias target"
            } else {
                "update using directive"
            };
            analysis.report.change(
                path,
                &file.project,
                &format!("imports namespace {}", old),
                RequiredChange::new(
                    ChangeKind::UsingUpdate,
                    import.namespace.clone(),
                    renamed,
                    description,
                )
                .at_line(import.line),
            );
        }
    }
    Ok(())
}

/// Qualified names spelling out the old namespace, fully or partially.
fn qualified_references(
    analysis: &mut Analysis<'_>,
    renamed: &BTreeMap<&str, String>,
    old: &str,
) -> Result<(), Cancelled> {
    let graph = analysis.graph;
    for (key, new_key) in renamed {
        analysis.cancel.check()?;
        for edge in graph.incoming_uses(key) {
            if !edge.is_qualified() {
                continue;
            }
            let (body, anchored) = namespace::strip_global(&edge.written);
            // Part of the full name the reference leaves implicit.
            let Some(implied) = key
                .strip_suffix(body)
                .filter(|head| head.is_empty() || head.ends_with('.'))
                .map(|head| head.trim_end_matches('.'))
            else {
                continue;
            };
            if !implied.is_empty() && namespace::is_same_or_child(implied, old) {
                // Written below the renamed prefix; still resolves.
                continue;
            }
            let new_written = if implied.is_empty() {
                new_key.clone()
            } else {
                match new_key.strip_prefix(implied).and_then(|rest| rest.strip_prefix('.')) {
                    Some(rest) => rest.to_string(),
                    None => new_key.clone(),
                }
            };
            if new_written == body {
                continue;
            }
            let new_value = if anchored {
                format!("{}{}", namespace::GLOBAL_ALIAS, new_written)
            } else {
                new_written
            };
            let project = analysis.project_of(&edge.file);
            analysis.report.change(
                &edge.file,
                project,
                &format!("qualified reference to {}", key),
                RequiredChange::new(
                    ChangeKind::QualifiedNameUpdate,
                    edge.written.clone(),
                    new_value,
                    format!("update qualified {} reference", edge.context.as_str()),
                )
                .at_line(edge.line),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::entity::{
        IdentifierRef, ImportDirective, ParsedUnit, ProjectFacts, ReferenceContext,
        StaticProvider, TypeDecl, TypeKind,
    };
    use crate::graph::{Graph, GraphBuilder};
    use crate::impact::{analyze, ImpactReport, Operation};
    use std::path::Path;

    const A: &str = "ProjectA/ProjectA.csproj";
    const B: &str = "ProjectB/ProjectB.csproj";

    fn solution() -> StaticProvider {
        StaticProvider::new()
            .project(ProjectFacts::new("ProjectA", A))
            .project(ProjectFacts::new("ProjectB", B).with_reference(A))
            .file(
                "ProjectA/Foo.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme.Core", 1)
                    .with_type(TypeDecl::new("Acme.Core", "Foo", TypeKind::Class, 3)),
            )
            .file(
                "ProjectB/Bar.cs",
                B,
                ParsedUnit::new()
                    .with_import(ImportDirective::new("Acme.Core", 1))
                    .with_namespace("Acme.App", 3)
                    .with_type(TypeDecl::new("Acme.App", "Bar", TypeKind::Class, 5))
                    .with_reference(
                        IdentifierRef::new("Foo", ReferenceContext::Declaration, 7)
                            .within("Acme.App", Some("Acme.App.Bar")),
                    ),
            )
    }

    fn build(provider: &StaticProvider) -> Graph {
        GraphBuilder::new(provider).build(Path::new(".")).unwrap()
    }

    fn run(graph: &Graph, old: &str, new: &str) -> ImpactReport {
        analyze(
            graph,
            &Operation::RenameNamespace {
                old_namespace: old.to_string(),
                new_namespace: new.to_string(),
            },
            &AnalysisConfig::default(),
        )
    }

    #[test]
    fn declaration_and_using_are_updated() {
        let graph = build(&solution());
        let report = run(&graph, "Acme.Core", "Acme.Core.V2");
        assert!(report.can_proceed);
        assert_eq!(report.complexity, Complexity::Simple);

        let paths: Vec<_> = report.affected_files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["ProjectA/Foo.cs", "ProjectB/Bar.cs"]);

        let foo = &report.affected_files[0].required_changes[0];
        assert_eq!(foo.kind, ChangeKind::NamespaceUpdate);
        assert_eq!(foo.line_number, Some(1));
        assert_eq!(foo.current_value, "Acme.Core");
        assert_eq!(foo.new_value, "Acme.Core.V2");

        let bar = &report.affected_files[1].required_changes[0];
        assert_eq!(bar.kind, ChangeKind::UsingUpdate);
        assert_eq!(bar.line_number, Some(1));
        assert_eq!(bar.new_value, "Acme.Core.V2");

        assert_eq!(report.affected_types.len(), 1);
        assert_eq!(report.affected_types[0].full_name, "Acme.Core.Foo");
        assert_eq!(report.affected_types[0].reason, "namespace declaration update");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn qualified_references_are_rewritten() {
        let provider = solution().file(
            "ProjectB/Qualified.cs",
            B,
            ParsedUnit::new()
                .with_namespace("Acme", 1)
                .with_type(TypeDecl::new("Acme", "Q", TypeKind::Class, 2))
                .with_reference(
                    IdentifierRef::new("global::Acme.Core.Foo", ReferenceContext::Declaration, 4)
                        .within("Acme", Some("Acme.Q")),
                )
                .with_reference(
                    IdentifierRef::new("Core.Foo", ReferenceContext::ObjectCreation, 5)
                        .within("Acme", Some("Acme.Q")),
                ),
        );
        let graph = build(&provider);
        let report = run(&graph, "Acme.Core", "Acme.Kernel");
        let file = report.affected_file("ProjectB/Qualified.cs").unwrap();
        let values: Vec<_> = file
            .required_changes
            .iter()
            .map(|c| (c.current_value.as_str(), c.new_value.as_str()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("global::Acme.Core.Foo", "global::Acme.Kernel.Foo"),
                ("Core.Foo", "Kernel.Foo"),
            ]
        );
    }

    #[test]
    fn nested_namespaces_follow_the_rename() {
        let provider = solution().file(
            "ProjectA/Sub/Baz.cs",
            A,
            ParsedUnit::new()
                .with_namespace("Acme.Core.Sub", 1)
                .with_type(TypeDecl::new("Acme.Core.Sub", "Baz", TypeKind::Class, 2)),
        );
        let graph = build(&provider);
        let report = run(&graph, "Acme.Core", "Contoso.Core");
        let baz = report.affected_file("ProjectA/Sub/Baz.cs").unwrap();
        assert_eq!(baz.required_changes[0].new_value, "Contoso.Core.Sub");
        assert_eq!(report.affected_types.len(), 2);
    }

    #[test]
    fn leaving_an_enclosing_namespace_adds_using() {
        let provider = StaticProvider::new()
            .project(ProjectFacts::new("ProjectA", A))
            .file(
                "ProjectA/Helper.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme", 1)
                    .with_type(TypeDecl::new("Acme", "Helper", TypeKind::Class, 2)),
            )
            .file(
                "ProjectA/Core/Foo.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme.Core", 1)
                    .with_type(TypeDecl::new("Acme.Core", "Foo", TypeKind::Class, 2))
                    .with_reference(
                        IdentifierRef::new("Helper", ReferenceContext::Declaration, 4)
                            .within("Acme.Core", Some("Acme.Core.Foo")),
                    ),
            );
        let graph = build(&provider);
        let report = run(&graph, "Acme.Core", "Contoso.Core");
        let foo = report.affected_file("ProjectA/Core/Foo.cs").unwrap();
        assert!(foo.required_changes.iter().any(|c| c.kind == ChangeKind::UsingUpdate
            && c.current_value.is_empty()
            && c.new_value == "Acme"));

        // Staying under Acme keeps Helper visible.
        let report = run(&graph, "Acme.Core", "Acme.Kernel");
        let foo = report.affected_file("ProjectA/Core/Foo.cs").unwrap();
        assert!(foo
            .required_changes
            .iter()
            .all(|c| c.kind == ChangeKind::NamespaceUpdate));
    }

    #[test]
    fn invalid_unknown_and_unchanged_names() {
        let graph = build(&solution());
        assert!(run(&graph, "Acme.Core", "Acme.1Core").has_error(codes::INVALID_NAMESPACE));
        assert!(run(&graph, "", "Acme").has_error(codes::INVALID_NAMESPACE));
        assert!(run(&graph, "Nope", "Other").has_error(codes::ENTITY_NOT_FOUND));
        // Prefix match must respect segment boundaries.
        assert!(run(&graph, "Acme.Cor", "Acme.X").has_error(codes::ENTITY_NOT_FOUND));

        let same = run(&graph, "Acme.Core", "Acme.Core");
        assert!(same.can_proceed);
        assert!(same.has_warning(codes::NO_CHANGE));
    }

    #[test]
    fn colliding_type_names_warn() {
        let provider = solution().file(
            "ProjectA/Other.cs",
            A,
            ParsedUnit::new()
                .with_namespace("Acme.Other", 1)
                .with_type(TypeDecl::new("Acme.Other", "Foo", TypeKind::Class, 2)),
        );
        let graph = build(&provider);
        let report = run(&graph, "Acme.Core", "Acme.Other");
        assert!(report.has_warning(codes::NAMESPACE_COLLISION));
        assert_eq!(report.warnings[0].path.as_deref(), Some("ProjectA/Other.cs"));
        assert!(report.can_proceed);

        // Merging into an existing namespace without clashes is quiet.
        let report = run(&graph, "Acme.Other", "Acme.Core");
        assert!(report.has_warning(codes::NAMESPACE_COLLISION));
        let report = run(&graph, "Acme.App", "Acme.Core");
        assert!(report.warnings.is_empty());
    }
}
