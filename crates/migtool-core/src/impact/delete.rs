//! Impact of deleting a file, a directory or a whole project.
//!
//! Every surviving file that refers to something the delete removes is a
//! `ReferencedEntityDeletion`: an error that blocks the operation, or a
//! warning when the delete is forced.

use std::collections::{BTreeMap, BTreeSet};

use crate::cancel::Cancelled;
use crate::graph::{normalize_path, FileNode};
use crate::impact::report::{codes, ChangeKind, Complexity, ReportDiagnostic, RequiredChange};
use crate::impact::Analysis;

/// What a delete request resolved to.
enum Target<'g> {
    Project(&'g str),
    Files,
}

pub(super) fn analyze(
    analysis: &mut Analysis<'_>,
    path: &str,
    force: bool,
) -> Result<Complexity, Cancelled> {
    analysis.cancel.check()?;
    let graph = analysis.graph;
    let path = normalize_path(path);

    let (target, files): (Target<'_>, Vec<&FileNode>) = if let Some(project) = graph.project(&path) {
        (
            Target::Project(project.path.as_str()),
            project.files.iter().filter_map(|file| graph.file(file)).collect(),
        )
    } else if let Some(file) = graph.file(&path) {
        (Target::Files, vec![file])
    } else {
        let under: Vec<_> = graph.files_under(&path).collect();
        if under.is_empty() {
            return Ok(analysis.not_found(format!("{} matches no project, file or directory", path)));
        }
        (Target::Files, under)
    };

    let deleted: BTreeSet<&str> = files.iter().map(|file| file.path.as_str()).collect();
    for file in &files {
        analysis.report.change(
            &file.path,
            &file.project,
            "deleted",
            RequiredChange::new(ChangeKind::FileDelete, file.path.clone(), "", "delete file"),
        );
    }

    // Types whose every declaration goes away.
    let mut removed_types: BTreeSet<String> = BTreeSet::new();
    for file in &files {
        for key in &file.types {
            let Some(ty) = graph.type_node(key) else {
                continue;
            };
            if ty.files.iter().all(|f| deleted.contains(f.as_str())) {
                if removed_types.insert(key.clone()) {
                    analysis.report.affected_type(key, ty.primary_file(), "deleted");
                }
            } else if ty.is_partial {
                analysis.report.warn(
                    ReportDiagnostic::new(
                        codes::PARTIAL_TYPE_SPLIT,
                        format!("partial type {} keeps its declarations outside the deleted files", key),
                    )
                    .at(file.path.clone(), None),
                );
            }
        }
    }

    let removed_namespaces: BTreeSet<&str> = graph
        .namespaces()
        .filter(|node| {
            !node.files.is_empty() && node.files.iter().all(|f| deleted.contains(f.as_str()))
        })
        .map(|node| node.name.as_str())
        .collect();

    // Dangling references per surviving file.
    let mut dangling: BTreeMap<&str, BTreeSet<RequiredChange>> = BTreeMap::new();
    for key in &removed_types {
        for edge in graph.incoming_uses(key) {
            if deleted.contains(edge.file.as_str()) {
                continue;
            }
            dangling.entry(edge.file.as_str()).or_default().insert(
                RequiredChange::new(
                    ChangeKind::DanglingReference,
                    edge.written.clone(),
                    "",
                    format!("{} reference to deleted type {}", edge.context.as_str(), key),
                )
                .at_line(edge.line),
            );
        }
    }
    for file in graph.files() {
        if deleted.contains(file.path.as_str()) {
            continue;
        }
        for import in &file.imports {
            let description = if import.is_plain() {
                if !removed_namespaces.contains(import.namespace.as_str()) {
                    continue;
                }
                "using of namespace removed by the delete"
            } else {
                if !removed_types.contains(&import.namespace) {
                    continue;
                }
                "directive names deleted type"
            };
            dangling.entry(file.path.as_str()).or_default().insert(
                RequiredChange::new(
                    ChangeKind::DanglingReference,
                    import.namespace.clone(),
                    "",
                    description,
                )
                .at_line(import.line),
            );
        }
    }

    let mut referenced = false;
    for (path, changes) in dangling {
        analysis.cancel.check()?;
        referenced = true;
        let project = analysis.project_of(path);
        let first_line = changes.iter().filter_map(|c| c.line_number).min();
        let names: BTreeSet<&str> = changes.iter().map(|c| c.current_value.as_str()).collect();
        let diagnostic = ReportDiagnostic::new(
            codes::REFERENCED_ENTITY_DELETION,
            format!(
                "{} references deleted {}",
                path,
                names.into_iter().collect::<Vec<_>>().join(", ")
            ),
        )
        .at(path, first_line);
        gate(analysis, diagnostic, force);
        for change in changes {
            analysis
                .report
                .change(path, project, "references deleted code", change);
        }
    }

    if let Target::Project(project) = target {
        for dependent in graph
            .projects()
            .filter(|node| node.references.contains(project))
        {
            referenced = true;
            let diagnostic = ReportDiagnostic::new(
                codes::REFERENCED_ENTITY_DELETION,
                format!("project {} references deleted project {}", dependent.path, project),
            )
            .at(dependent.path.clone(), None);
            gate(analysis, diagnostic, force);
        }
    }

    analysis.copy_ambiguity_warnings(&removed_types);
    analysis.copy_parse_failures();

    if referenced {
        Ok(Complexity::Breaking)
    } else {
        Ok(Complexity::Trivial)
    }
}

/// Forced deletes downgrade reference errors to warnings.
fn gate(analysis: &mut Analysis<'_>, diagnostic: ReportDiagnostic, force: bool) {
    if force {
        analysis.report.warn(diagnostic);
    } else {
        analysis.report.error(diagnostic);
    }
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
                "ProjectA/Util/Lonely.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme.Util", 1)
                    .with_type(TypeDecl::new("Acme.Util", "Lonely", TypeKind::Class, 3)),
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

    fn run(graph: &Graph, path: &str, force: bool) -> ImpactReport {
        analyze(
            graph,
            &Operation::Delete {
                path: path.to_string(),
                force,
            },
            &AnalysisConfig::default(),
        )
    }

    #[test]
    fn referenced_file_blocks_delete() {
        let graph = build(&solution());
        let report = run(&graph, "ProjectA/Foo.cs", false);
        assert!(!report.can_proceed);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, codes::REFERENCED_ENTITY_DELETION);
        assert_eq!(report.errors[0].path.as_deref(), Some("ProjectB/Bar.cs"));
        assert_eq!(report.errors[0].line, Some(1));
        assert!(report.errors[0].message.contains("ProjectB/Bar.cs"));

        let bar = report.affected_file("ProjectB/Bar.cs").unwrap();
        assert_eq!(bar.required_changes.len(), 2);
        assert!(bar
            .required_changes
            .iter()
            .all(|c| c.kind == ChangeKind::DanglingReference));
    }

    #[test]
    fn forced_delete_downgrades_to_warning() {
        let graph = build(&solution());
        let blocked = run(&graph, "ProjectA/Foo.cs", false);
        let forced = run(&graph, "ProjectA/Foo.cs", true);
        assert!(forced.can_proceed);
        assert!(forced.errors.is_empty());
        assert_eq!(forced.warnings, blocked.errors);
        assert_eq!(forced.complexity, Complexity::Breaking);
    }

    #[test]
    fn isolated_file_is_trivial() {
        let graph = build(&solution());
        let report = run(&graph, "ProjectA/Util/Lonely.cs", false);
        assert!(report.can_proceed);
        assert!(report.warnings.is_empty());
        assert_eq!(report.affected_files.len(), 1);
        assert_eq!(report.affected_files[0].path, "ProjectA/Util/Lonely.cs");
        assert_eq!(
            report.affected_files[0].required_changes[0].kind,
            ChangeKind::FileDelete
        );
        assert_eq!(report.complexity, Complexity::Trivial);
    }

    #[test]
    fn directory_delete_covers_files_under_it() {
        let graph = build(&solution());
        let report = run(&graph, "ProjectA/Util/", false);
        assert!(report.can_proceed);
        assert_eq!(report.affected_types[0].full_name, "Acme.Util.Lonely");
    }

    #[test]
    fn project_delete_reports_dependents() {
        let graph = build(&solution());
        let report = run(&graph, A, false);
        assert!(!report.can_proceed);
        assert!(report
            .errors
            .iter()
            .any(|e| e.path.as_deref() == Some(B) && e.message.contains("project")));
        assert!(report.affected_file("ProjectA/Foo.cs").is_some());
        assert!(report.affected_file("ProjectA/Util/Lonely.cs").is_some());
    }

    #[test]
    fn surviving_partial_part_keeps_references_valid() {
        let provider = StaticProvider::new()
            .project(ProjectFacts::new("ProjectA", A))
            .file(
                "ProjectA/Foo.1.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme", 1)
                    .with_type(TypeDecl::new("Acme", "Foo", TypeKind::Class, 2).partial()),
            )
            .file(
                "ProjectA/Foo.2.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme", 1)
                    .with_type(TypeDecl::new("Acme", "Foo", TypeKind::Class, 2).partial()),
            )
            .file(
                "ProjectA/User.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme", 1)
                    .with_type(TypeDecl::new("Acme", "User", TypeKind::Class, 2))
                    .with_reference(
                        IdentifierRef::new("Foo", ReferenceContext::Declaration, 4)
                            .within("Acme", Some("Acme.User")),
                    ),
            );
        let graph = build(&provider);
        let report = run(&graph, "ProjectA/Foo.2.cs", false);
        assert!(report.can_proceed);
        assert!(report.has_warning(codes::PARTIAL_TYPE_SPLIT));
        assert!(report.affected_types.is_empty());
    }

    #[test]
    fn unknown_path_is_not_found() {
        let graph = build(&solution());
        let report = run(&graph, "ProjectC/Nothing.cs", false);
        assert!(report.has_error(codes::ENTITY_NOT_FOUND));
    }
}
