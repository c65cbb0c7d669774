//! Impact of moving one type into another namespace.
//!
//! A type alone in its file keeps its file; only the namespace declaration
//! changes. A type sharing its file with other types has to be extracted
//! into a file of its own first, which is reported but not automated.

use std::collections::{BTreeMap, BTreeSet};

use crate::cancel::Cancelled;
use crate::impact::complexity::for_relocation;
use crate::impact::relocate::{relocate, Relocated, Relocation};
use crate::impact::report::{codes, ChangeKind, Complexity, ReportDiagnostic, RequiredChange};
use crate::impact::Analysis;
use crate::namespace;

pub(super) fn analyze(
    analysis: &mut Analysis<'_>,
    type_full_name: &str,
    target_namespace: &str,
) -> Result<Complexity, Cancelled> {
    analysis.cancel.check()?;
    let graph = analysis.graph;

    let Some(ty) = graph.type_node(type_full_name) else {
        return Ok(analysis.not_found(format!("type {} is not declared in the solution", type_full_name)));
    };
    if !namespace::is_valid_namespace(target_namespace) {
        analysis.report.error(ReportDiagnostic::new(
            codes::INVALID_NAMESPACE,
            format!("'{}' is not a valid namespace name", target_namespace),
        ));
        return Ok(Complexity::Trivial);
    }
    if let Some(outer) = &ty.outer {
        analysis.report.error(
            ReportDiagnostic::new(
                codes::NESTED_TYPE_MOVE,
                format!("{} is nested in {}; move the containing type instead", ty.full_name, outer),
            )
            .at(ty.primary_file(), None),
        );
        return Ok(Complexity::Trivial);
    }
    if ty.namespace == target_namespace {
        analysis.report.warn(ReportDiagnostic::new(
            codes::NO_CHANGE,
            format!("{} is already in {}", ty.full_name, target_namespace),
        ));
        return Ok(Complexity::Trivial);
    }

    let new_key = namespace::join(target_namespace, &ty.name);
    if graph.type_node(&new_key).is_some() {
        analysis.report.error(ReportDiagnostic::new(
            codes::TYPE_NAME_CONFLICT,
            format!("{} already exists", new_key),
        ));
    }

    let home = analysis.project_of(ty.primary_file());
    let destination = match graph.namespace(target_namespace) {
        Some(node) if !node.projects.contains(home) => node
            .projects
            .iter()
            .next()
            .map_or(home, String::as_str),
        _ => home,
    };
    let destination_dir = graph
        .project(destination)
        .map_or("", |project| project.directory.as_str());

    let mut relocation = Relocation {
        types: BTreeMap::new(),
        declaring_files: ty.files.clone(),
        target_project: destination.to_string(),
    };
    for moved in graph.type_with_nested(&ty.full_name) {
        let moved_key = namespace::replace_prefix(&moved.full_name, &ty.full_name, &new_key)
            .unwrap_or_else(|| moved.full_name.clone());
        relocation.types.insert(
            moved.full_name.clone(),
            Relocated {
                new_key: moved_key,
                old_namespace: moved.namespace.clone(),
                new_namespace: target_namespace.to_string(),
            },
        );
    }

    for path in &ty.files {
        analysis.cancel.check()?;
        let Some(file) = graph.file(path) else {
            continue;
        };
        let project = file.project.as_str();
        let file_name = path.rsplit_once('/').map_or(path.as_str(), |(_, name)| name);
        let directory = path.rsplit_once('/').map_or("", |(dir, _)| dir);
        let new_directory = if destination == project {
            directory
        } else {
            destination_dir
        };
        let reason = format!("declares {}", ty.full_name);

        let shares_file = file
            .types
            .iter()
            .any(|key| !relocation.types.contains_key(key));
        if shares_file {
            let extracted = join_path(new_directory, &format!("{}.cs", ty.name));
            if graph.file(&extracted).is_some() {
                analysis.report.error(
                    ReportDiagnostic::new(
                        codes::TARGET_EXISTS,
                        format!("{} already exists", extracted),
                    )
                    .at(extracted.clone(), None),
                );
            }
            analysis.report.warn(
                ReportDiagnostic::new(
                    codes::TYPE_EXTRACTION,
                    format!(
                        "{} shares its file with other types and must be extracted to {}",
                        ty.full_name, extracted
                    ),
                )
                .at(path.clone(), None),
            );
            analysis.report.change(
                path,
                project,
                &reason,
                RequiredChange::new(
                    ChangeKind::TypeExtraction,
                    path.clone(),
                    extracted.clone(),
                    format!("extract {} into its own file", ty.name),
                ),
            );
            analysis
                .report
                .affected_type(&ty.full_name, &extracted, "type moved to another namespace");
            continue;
        }

        for decl in file.namespaces.iter().filter(|decl| decl.name == ty.namespace) {
            analysis.report.change(
                path,
                project,
                &reason,
                RequiredChange::new(
                    ChangeKind::NamespaceUpdate,
                    decl.name.clone(),
                    target_namespace,
                    "move type to target namespace",
                )
                .at_line(decl.line),
            );
        }
        let mut new_path = path.clone();
        if destination != project {
            new_path = join_path(new_directory, file_name);
            analysis.report.change(
                path,
                project,
                &reason,
                RequiredChange::new(
                    ChangeKind::FileMove,
                    path.clone(),
                    new_path.clone(),
                    "move file into the project declaring the target namespace",
                ),
            );
        }
        analysis
            .report
            .affected_type(&ty.full_name, &new_path, "type moved to another namespace");
    }

    relocate(analysis, &relocation)?;

    let moved: BTreeSet<String> = relocation.types.keys().cloned().collect();
    analysis.copy_ambiguity_warnings(&moved);
    analysis.copy_parse_failures();

    Ok(for_relocation(&analysis.report, ty.files.len(), home))
}

fn join_path(directory: &str, file_name: &str) -> String {
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", directory, file_name)
    }
}
