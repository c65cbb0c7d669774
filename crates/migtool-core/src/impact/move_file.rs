//! Impact of moving a source file or a directory of them.
//!
//! The file's namespace follows the folder convention: when the current
//! namespace equals the one derived from the project root namespace and the
//! folder path, the moved file gets the namespace derived from its new
//! location. Files that never followed the convention keep their namespace.
//!
//! A directory move relocates every graph file under it, keeping paths
//! relative to the directory, as one relocation with one report. Directories
//! holding a project file are rejected.

use std::collections::{BTreeMap, BTreeSet};

use crate::cancel::Cancelled;
use crate::graph::{normalize_path, FileNode, Graph, ProjectNode};
use crate::impact::complexity::for_relocation;
use crate::impact::relocate::{relocate, Relocated, Relocation};
use crate::impact::report::{codes, ChangeKind, Complexity, ReportDiagnostic, RequiredChange};
use crate::impact::Analysis;
use crate::namespace;

/// One file and where it goes.
struct FileMove<'g> {
    file: &'g FileNode,
    target: String,
}

pub(super) fn analyze(
    analysis: &mut Analysis<'_>,
    source: &str,
    target: &str,
) -> Result<Complexity, Cancelled> {
    analysis.cancel.check()?;
    let graph = analysis.graph;
    let source = normalize_path(source);
    let target = normalize_path(target);

    let moves = match graph.file(&source) {
        Some(file) => vec![FileMove {
            file,
            target: target.clone(),
        }],
        None => match directory_moves(graph, &source, &target) {
            Some(moves) => moves,
            None => {
                return Ok(analysis.not_found(format!(
                    "{} is neither a file nor a directory of the solution",
                    source
                )))
            }
        },
    };
    if source == target {
        analysis.report.warn(
            ReportDiagnostic::new(codes::NO_CHANGE, "source and target paths are identical")
                .at(source.clone(), None),
        );
        return Ok(Complexity::Trivial);
    }
    let is_directory = graph.file(&source).is_none();
    if is_directory {
        if target.strip_prefix(source.as_str()).is_some_and(|rest| rest.starts_with('/')) {
            analysis.report.error(
                ReportDiagnostic::new(
                    codes::INVALID_TARGET,
                    format!("cannot move {} into itself", source),
                )
                .at(target.clone(), None),
            );
            return Ok(Complexity::Trivial);
        }
        if let Some(project) = graph.projects().find(|project| {
            project.directory == source
                || project
                    .directory
                    .strip_prefix(source.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        }) {
            analysis.report.error(
                ReportDiagnostic::new(
                    codes::PROJECT_DIRECTORY_MOVE,
                    format!("{} holds project {}; project directories are not moved", source, project.path),
                )
                .at(source.clone(), None),
            );
            return Ok(Complexity::Trivial);
        }
    }

    for planned in &moves {
        if graph.file(&planned.target).is_some() {
            analysis.report.error(
                ReportDiagnostic::new(
                    codes::TARGET_EXISTS,
                    format!("{} already exists", planned.target),
                )
                .at(planned.target.clone(), None),
            );
        }
    }
    let mut target_projects: BTreeMap<&str, &ProjectNode> = BTreeMap::new();
    for planned in &moves {
        let Some(project) = graph.project_containing(&planned.target) else {
            analysis.report.error(ReportDiagnostic::new(
                codes::TARGET_PROJECT_NOT_FOUND,
                format!("no project directory contains {}", planned.target),
            ));
            return Ok(Complexity::Trivial);
        };
        target_projects.insert(project.path.as_str(), project);
    }
    if target_projects.len() > 1 {
        analysis.report.error(
            ReportDiagnostic::new(
                codes::PROJECT_DIRECTORY_MOVE,
                format!(
                    "moving {} to {} spreads its files over projects {}",
                    source,
                    target,
                    target_projects.keys().copied().collect::<Vec<_>>().join(", ")
                ),
            )
            .at(target.clone(), None),
        );
        return Ok(Complexity::Trivial);
    }
    let Some(target_project) = target_projects.into_values().next() else {
        return Ok(Complexity::Trivial);
    };

    let moving: BTreeSet<&str> = moves.iter().map(|planned| planned.file.path.as_str()).collect();
    let mut relocation = Relocation {
        types: BTreeMap::new(),
        declaring_files: moving.iter().map(|path| path.to_string()).collect(),
        target_project: target_project.path.clone(),
    };
    for planned in &moves {
        analysis.cancel.check()?;
        move_one(analysis, planned, target_project, &moving, &mut relocation);
    }

    relocate(analysis, &relocation)?;

    let moved: BTreeSet<String> = relocation.types.keys().cloned().collect();
    analysis.copy_ambiguity_warnings(&moved);
    analysis.copy_parse_failures();

    let home = moves[0].file.project.as_str();
    Ok(for_relocation(&analysis.report, moves.len(), home))
}

/// Every graph file under directory `source`, mapped below `target`.
fn directory_moves<'g>(graph: &'g Graph, source: &'g str, target: &str) -> Option<Vec<FileMove<'g>>> {
    if source.is_empty() || source == "." {
        return None;
    }
    let moves: Vec<_> = graph
        .files_under(source)
        .filter_map(|file| {
            let rest = file.path.strip_prefix(source)?.trim_start_matches('/');
            let target = if target.is_empty() || target == "." {
                rest.to_string()
            } else {
                format!("{}/{}", target, rest)
            };
            Some(FileMove { file, target })
        })
        .collect();
    (!moves.is_empty()).then_some(moves)
}

/// Report the file's own changes and add its types to `relocation`.
fn move_one(
    analysis: &mut Analysis<'_>,
    planned: &FileMove<'_>,
    target_project: &ProjectNode,
    moving: &BTreeSet<&str>,
    relocation: &mut Relocation,
) {
    let graph = analysis.graph;
    let file = planned.file;
    let source = file.path.as_str();
    let target = planned.target.as_str();
    let source_project = file.project.as_str();

    // Namespace mapping for every declaration in the file.
    let mut renames: BTreeMap<&str, String> = BTreeMap::new();
    if let Some(home) = graph.project(source_project) {
        let derived_old = conventional_namespace(home, source);
        let derived_new = conventional_namespace(target_project, target);
        for decl in &file.namespaces {
            if let Some(renamed) = namespace::replace_prefix(&decl.name, &derived_old, &derived_new) {
                if renamed != decl.name && namespace::is_valid_namespace(&renamed) {
                    renames.insert(decl.name.as_str(), renamed);
                }
            }
        }
    }

    let reason = "moved file";
    analysis.report.change(
        source,
        source_project,
        reason,
        RequiredChange::new(ChangeKind::FileMove, source, target, "move file"),
    );
    for decl in &file.namespaces {
        if let Some(renamed) = renames.get(decl.name.as_str()) {
            analysis.report.change(
                source,
                source_project,
                reason,
                RequiredChange::new(
                    ChangeKind::NamespaceUpdate,
                    decl.name.clone(),
                    renamed.clone(),
                    "match namespace to new folder",
                )
                .at_line(decl.line),
            );
        }
    }

    for key in &file.types {
        let Some(ty) = graph.type_node(key) else {
            continue;
        };
        if relocation.types.contains_key(&ty.full_name) {
            continue;
        }
        let left_behind: Vec<&str> = ty
            .files
            .iter()
            .map(String::as_str)
            .filter(|path| !moving.contains(path))
            .collect();
        if !left_behind.is_empty() {
            analysis.report.warn(
                ReportDiagnostic::new(
                    codes::PARTIAL_TYPE_SPLIT,
                    format!(
                        "partial type {} is also declared in {}; only this part moves",
                        ty.full_name,
                        left_behind.join(", ")
                    ),
                )
                .at(source, None),
            );
            continue;
        }
        let new_namespace = renames
            .get(ty.namespace.as_str())
            .cloned()
            .unwrap_or_else(|| ty.namespace.clone());
        let new_key = namespace::replace_prefix(&ty.full_name, &ty.namespace, &new_namespace)
            .unwrap_or_else(|| ty.full_name.clone());
        let taken = new_key != ty.full_name
            && graph
                .type_node(&new_key)
                .is_some_and(|existing| existing.files.iter().any(|path| !moving.contains(path.as_str())));
        if taken {
            analysis.report.error(
                ReportDiagnostic::new(
                    codes::TYPE_NAME_CONFLICT,
                    format!("{} already exists", new_key),
                )
                .at(source, None),
            );
        }
        analysis
            .report
            .affected_type(&ty.full_name, target, "declared in moved file");
        relocation.types.insert(
            ty.full_name.clone(),
            Relocated {
                new_key,
                old_namespace: ty.namespace.clone(),
                new_namespace,
            },
        );
    }
}

/// Namespace the folder convention assigns to `path` inside `project`.
fn conventional_namespace(project: &ProjectNode, path: &str) -> String {
    let relative = project.relative_path(path);
    let folders = relative.rsplit_once('/').map_or("", |(dir, _)| dir);
    let mut name = project.root_namespace.clone();
    for segment in folders.split('/').filter(|s| !s.is_empty()) {
        let segment = sanitize_segment(segment);
        if segment.is_empty() {
            continue;
        }
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&segment);
    }
    name
}

/// Folder name as a namespace identifier: dotted folders split, invalid
/// characters become `_`, a leading digit gets a `_` prefix.
fn sanitize_segment(folder: &str) -> String {
    folder
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut ident: String = part
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
                .collect();
            if ident.starts_with(|c: char| c.is_ascii_digit()) {
                ident.insert(0, '_');
            }
            ident
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{
        IdentifierRef, ImportDirective, ParsedUnit, ProjectFacts, ReferenceContext,
        StaticProvider, TypeDecl, TypeKind,
    };
    use crate::graph::{Graph, GraphBuilder};
    use crate::impact::{analyze, ImpactReport, Operation};
    use crate::config::AnalysisConfig;
    use std::path::Path;

    const A: &str = "ProjectA/ProjectA.csproj";
    const B: &str = "ProjectB/ProjectB.csproj";

    fn solution() -> Graph {
        let provider = StaticProvider::new()
            .project(ProjectFacts::new("ProjectA", A).with_root_namespace("Acme"))
            .project(ProjectFacts::new("ProjectB", B).with_root_namespace("Acme.App").with_reference(A))
            .file(
                "ProjectA/Models/Foo.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme.Models", 1)
                    .with_type(TypeDecl::new("Acme.Models", "Foo", TypeKind::Class, 3)),
            )
            .file(
                "ProjectA/Models/Other.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme.Models", 1)
                    .with_type(TypeDecl::new("Acme.Models", "Other", TypeKind::Class, 3)),
            )
            .file(
                "ProjectB/Bar.cs",
                B,
                ParsedUnit::new()
                    .with_import(ImportDirective::new("Acme.Models", 1))
                    .with_namespace("Acme.App", 3)
                    .with_type(TypeDecl::new("Acme.App", "Bar", TypeKind::Class, 5))
                    .with_reference(
                        IdentifierRef::new("Foo", ReferenceContext::Declaration, 7)
                            .within("Acme.App", Some("Acme.App.Bar")),
                    ),
            );
        GraphBuilder::new(&provider).build(Path::new(".")).unwrap()
    }

    fn run(graph: &Graph, source: &str, target: &str) -> ImpactReport {
        analyze(
            graph,
            &Operation::Move {
                source_path: source.to_string(),
                target_path: target.to_string(),
            },
            &AnalysisConfig::default(),
        )
    }

    #[test]
    fn conventional_namespace_follows_folders() {
        let project = ProjectNode {
            name: "A".to_string(),
            path: A.to_string(),
            directory: "ProjectA".to_string(),
            root_namespace: "Acme".to_string(),
            target_frameworks: Default::default(),
            references: Default::default(),
            unresolved_references: Vec::new(),
            package_references: Vec::new(),
            files: Default::default(),
        };
        assert_eq!(conventional_namespace(&project, "ProjectA/Foo.cs"), "Acme");
        assert_eq!(
            conventional_namespace(&project, "ProjectA/Models/Sub/Foo.cs"),
            "Acme.Models.Sub"
        );
        assert_eq!(
            conventional_namespace(&project, "ProjectA/my-stuff/2d/Foo.cs"),
            "Acme.my_stuff._2d"
        );
    }

    #[test]
    fn move_within_folder_tree_updates_namespace_and_users() {
        let graph = solution();
        let report = run(&graph, "ProjectA/Models/Foo.cs", "ProjectA/Domain/Foo.cs");
        assert!(report.can_proceed);

        let moved = report.affected_file("ProjectA/Models/Foo.cs").unwrap();
        assert!(moved.required_changes.iter().any(|c| c.kind == ChangeKind::FileMove
            && c.new_value == "ProjectA/Domain/Foo.cs"));
        assert!(moved.required_changes.iter().any(|c| c.kind == ChangeKind::NamespaceUpdate
            && c.current_value == "Acme.Models"
            && c.new_value == "Acme.Domain"
            && c.line_number == Some(1)));

        let user = report.affected_file("ProjectB/Bar.cs").unwrap();
        assert!(user.required_changes.iter().any(|c| c.kind == ChangeKind::UsingUpdate
            && c.current_value.is_empty()
            && c.new_value == "Acme.Domain"));
        assert_eq!(report.affected_types[0].full_name, "Acme.Models.Foo");
        assert_eq!(report.affected_types[0].path, "ProjectA/Domain/Foo.cs");
        assert!(report.required_project_references.is_empty());
    }

    #[test]
    fn move_into_other_project_takes_its_root_namespace() {
        let graph = solution();
        let report = run(&graph, "ProjectA/Models/Foo.cs", "ProjectB/Models/Foo.cs");
        // Bar lives in ProjectB already; nothing else in ProjectA uses Foo.
        assert!(report.can_proceed);
        let moved = report.affected_file("ProjectA/Models/Foo.cs").unwrap();
        assert!(moved.required_changes.iter().any(|c| c.kind == ChangeKind::NamespaceUpdate
            && c.new_value == "Acme.App.Models"));
        assert_ne!(report.complexity, Complexity::Trivial);
    }

    #[test]
    fn unconventional_namespace_is_kept() {
        let provider = StaticProvider::new()
            .project(ProjectFacts::new("ProjectA", A).with_root_namespace("Acme"))
            .file(
                "ProjectA/Odd.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Legacy.Stuff", 1)
                    .with_type(TypeDecl::new("Legacy.Stuff", "Odd", TypeKind::Class, 2)),
            );
        let graph = GraphBuilder::new(&provider).build(Path::new(".")).unwrap();
        let report = run(&graph, "ProjectA/Odd.cs", "ProjectA/Sub/Odd.cs");
        let moved = report.affected_file("ProjectA/Odd.cs").unwrap();
        assert!(moved
            .required_changes
            .iter()
            .all(|c| c.kind != ChangeKind::NamespaceUpdate));
        assert_eq!(report.complexity, Complexity::Trivial);
    }

    #[test]
    fn missing_source_and_existing_target_are_errors() {
        let graph = solution();
        let report = run(&graph, "ProjectA/Nope.cs", "ProjectA/X.cs");
        assert!(report.has_error(codes::ENTITY_NOT_FOUND));
        assert!(!report.can_proceed);

        let report = run(&graph, "ProjectA/Models/Foo.cs", "ProjectA/Models/Other.cs");
        assert!(report.has_error(codes::TARGET_EXISTS));

        let report = run(&graph, "ProjectA/Models/Foo.cs", "Elsewhere/Foo.cs");
        assert!(report.has_error(codes::TARGET_PROJECT_NOT_FOUND));
    }

    #[test]
    fn directory_move_relocates_every_file_in_one_report() {
        let graph = solution();
        let report = run(&graph, "ProjectA/Models/", "ProjectA/Domain");
        assert!(report.can_proceed, "errors: {:?}", report.errors);

        for (from, to) in [
            ("ProjectA/Models/Foo.cs", "ProjectA/Domain/Foo.cs"),
            ("ProjectA/Models/Other.cs", "ProjectA/Domain/Other.cs"),
        ] {
            let moved = report.affected_file(from).unwrap();
            assert!(moved
                .required_changes
                .iter()
                .any(|c| c.kind == ChangeKind::FileMove && c.new_value == to));
            assert!(moved.required_changes.iter().any(|c| c.kind == ChangeKind::NamespaceUpdate
                && c.new_value == "Acme.Domain"));
        }

        // The whole namespace moved, so Bar's import is replaced.
        let user = report.affected_file("ProjectB/Bar.cs").unwrap();
        assert!(user.required_changes.iter().any(|c| c.kind == ChangeKind::UsingUpdate
            && c.current_value == "Acme.Models"
            && c.new_value == "Acme.Domain"));
        let types: Vec<_> = report.affected_types.iter().map(|t| t.full_name.as_str()).collect();
        assert_eq!(types, vec!["Acme.Models.Foo", "Acme.Models.Other"]);
        assert_eq!(report.affected_files.len(), 3);
    }

    #[test]
    fn directory_holding_a_project_is_rejected() {
        let graph = solution();
        let report = run(&graph, "ProjectA", "Moved/ProjectA");
        assert!(!report.can_proceed);
        assert!(report.has_error(codes::PROJECT_DIRECTORY_MOVE));
        assert!(report.affected_files.is_empty());
    }

    #[test]
    fn directory_cannot_move_into_itself() {
        let graph = solution();
        let report = run(&graph, "ProjectA/Models", "ProjectA/Models/Sub");
        assert!(report.has_error(codes::INVALID_TARGET));
        assert!(report.affected_files.is_empty());
    }

    #[test]
    fn directory_move_onto_existing_files_is_an_error() {
        let provider = StaticProvider::new()
            .project(ProjectFacts::new("ProjectA", A).with_root_namespace("Acme"))
            .file(
                "ProjectA/Models/Foo.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme.Models", 1)
                    .with_type(TypeDecl::new("Acme.Models", "Foo", TypeKind::Class, 2)),
            )
            .file(
                "ProjectA/Domain/Foo.cs",
                A,
                ParsedUnit::new()
                    .with_namespace("Acme.Domain", 1)
                    .with_type(TypeDecl::new("Acme.Domain", "Foo", TypeKind::Class, 2)),
            );
        let graph = GraphBuilder::new(&provider).build(Path::new(".")).unwrap();
        let report = run(&graph, "ProjectA/Models", "ProjectA/Domain");
        assert!(report.has_error(codes::TARGET_EXISTS));
        assert!(report.has_error(codes::TYPE_NAME_CONFLICT));
        assert!(!report.can_proceed);
    }

    #[test]
    fn identical_paths_warn_without_changes() {
        let graph = solution();
        let report = run(&graph, "ProjectA/Models/Foo.cs", "./ProjectA/Models/Foo.cs");
        assert!(report.can_proceed);
        assert!(report.has_warning(codes::NO_CHANGE));
        assert!(report.affected_files.is_empty());
    }
}
