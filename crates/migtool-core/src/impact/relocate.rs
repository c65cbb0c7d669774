//! Consequences of relocating types to a new namespace and/or project.
//!
//! Shared by file moves and type moves. The caller reports the relocated
//! declarations themselves; this walk covers everyone else:
//!
//! - files using a relocated type (qualified names, missing usings)
//! - importers of a namespace the relocation empties
//! - alias and static directives naming a relocated type
//! - what the relocated code itself depends on
//! - project references both ways

use std::collections::{BTreeMap, BTreeSet};

use crate::cancel::Cancelled;
use crate::graph::UsesEdge;
use crate::impact::report::{ChangeKind, RequiredChange};
use crate::impact::{qualified_update, Analysis};
use crate::namespace;

/// Old and new identity of one relocated type.
#[derive(Debug, Clone)]
pub(crate) struct Relocated {
    pub new_key: String,
    pub old_namespace: String,
    pub new_namespace: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Relocation {
    /// Relocated types by current key, nested types included.
    pub types: BTreeMap<String, Relocated>,
    /// Files whose declarations travel with the types.
    pub declaring_files: BTreeSet<String>,
    pub target_project: String,
}

impl Relocation {
    /// True when every type of `namespace` is relocated out of it.
    fn empties(&self, analysis: &Analysis<'_>, namespace: &str) -> bool {
        analysis.graph.namespace(namespace).is_some_and(|node| {
            !node.types.is_empty()
                && node.types.iter().all(|key| {
                    self.types
                        .get(key)
                        .is_some_and(|moved| moved.new_namespace != namespace)
                })
        })
    }

    fn namespace_changes(&self) -> bool {
        self.types
            .values()
            .any(|moved| moved.old_namespace != moved.new_namespace)
    }
}

pub(crate) fn relocate(analysis: &mut Analysis<'_>, relocation: &Relocation) -> Result<(), Cancelled> {
    users(analysis, relocation)?;
    emptied_importers(analysis, relocation)?;
    directives(analysis, relocation);
    dependencies(analysis, relocation)?;
    Ok(())
}

/// Files referring to relocated types.
fn users(analysis: &mut Analysis<'_>, relocation: &Relocation) -> Result<(), Cancelled> {
    let graph = analysis.graph;
    let mut by_file: BTreeMap<&str, Vec<&UsesEdge>> = BTreeMap::new();
    for key in relocation.types.keys() {
        for edge in graph.incoming_uses(key) {
            if relocation.declaring_files.contains(&edge.file) {
                continue;
            }
            by_file.entry(edge.file.as_str()).or_default().push(edge);
        }
    }

    for (path, edges) in by_file {
        analysis.cancel.check()?;
        let Some(file) = graph.file(path) else {
            continue;
        };
        let project = file.project.as_str();
        let names: BTreeSet<&str> = edges
            .iter()
            .map(|edge| namespace::last_segment(&edge.to))
            .collect();
        let reason = format!(
            "uses relocated type {}",
            names.into_iter().collect::<Vec<_>>().join(", ")
        );

        let mut needs: BTreeSet<&str> = BTreeSet::new();
        for edge in &edges {
            let Some(moved) = relocation.types.get(&edge.to) else {
                continue;
            };
            if moved.old_namespace == moved.new_namespace {
                continue;
            }
            let (body, anchored) = namespace::strip_global(&edge.written);
            if file
                .imports
                .iter()
                .any(|import| import.alias.as_deref() == Some(body))
            {
                // Type alias; `directives` updates the alias target.
                continue;
            }
            let in_namespace = edge
                .to
                .strip_prefix(moved.old_namespace.as_str())
                .map(|rest| rest.trim_start_matches('.'))
                .unwrap_or(&edge.to);
            if edge.is_qualified() && (anchored || body != in_namespace) {
                analysis
                    .report
                    .change(path, project, &reason, qualified_update(edge, &moved.new_key));
            } else {
                needs.insert(moved.new_namespace.as_str());
            }
        }

        for new_namespace in needs {
            if file.sees_namespace(new_namespace) {
                continue;
            }
            let replaced = file.imports.iter().find(|import| {
                import.is_plain()
                    && relocation.types.values().any(|moved| {
                        moved.new_namespace == new_namespace
                            && moved.old_namespace == import.namespace
                    })
                    && relocation.empties(analysis, &import.namespace)
            });
            let change = match replaced {
                Some(import) => RequiredChange::new(
                    ChangeKind::UsingUpdate,
                    import.namespace.clone(),
                    new_namespace,
                    "replace using of emptied namespace",
                )
                .at_line(import.line),
                None => RequiredChange::new(
                    ChangeKind::UsingUpdate,
                    "",
                    new_namespace,
                    "add using for relocated type",
                ),
            };
            analysis.report.change(path, project, &reason, change);
        }

        if project != relocation.target_project {
            let needs_reference = graph
                .project(project)
                .is_some_and(|node| !node.references.contains(&relocation.target_project));
            if needs_reference {
                analysis.report.touch(path, project, &reason);
                analysis.require_reference(
                    project,
                    &relocation.target_project,
                    format!("{} uses types relocated into {}", path, relocation.target_project),
                );
            }
        }
    }
    Ok(())
}

/// Importers of namespaces left empty by the relocation.
fn emptied_importers(analysis: &mut Analysis<'_>, relocation: &Relocation) -> Result<(), Cancelled> {
    if !relocation.namespace_changes() {
        return Ok(());
    }
    let graph = analysis.graph;
    let mut emptied: BTreeMap<&str, &str> = BTreeMap::new();
    for moved in relocation.types.values() {
        if moved.old_namespace != moved.new_namespace
            && relocation.empties(analysis, &moved.old_namespace)
        {
            emptied.insert(moved.old_namespace.as_str(), moved.new_namespace.as_str());
        }
    }

    for (old_namespace, new_namespace) in emptied {
        for path in graph.importers_of(old_namespace) {
            analysis.cancel.check()?;
            if relocation.declaring_files.contains(path) {
                continue;
            }
            let Some(file) = graph.file(path) else {
                continue;
            };
            let reason = format!("imports namespace {} emptied by the move", old_namespace);
            for import in file
                .imports
                .iter()
                .filter(|import| import.is_plain() && import.namespace == old_namespace)
            {
                analysis.report.change(
                    path,
                    &file.project,
                    &reason,
                    RequiredChange::new(
                        ChangeKind::UsingUpdate,
                        old_namespace,
                        new_namespace,
                        "replace using of emptied namespace",
                    )
                    .at_line(import.line),
                );
            }
            if file.project != relocation.target_project {
                analysis.require_reference(
                    &file.project,
                    &relocation.target_project,
                    format!("{} imports {} which moves to {}", path, old_namespace, relocation.target_project),
                );
            }
        }
    }
    Ok(())
}

/// `using X = Old.Type;` and `using static Old.Type;` directives.
fn directives(analysis: &mut Analysis<'_>, relocation: &Relocation) {
    let graph = analysis.graph;
    for file in graph.files() {
        for import in &file.imports {
            if import.is_plain() {
                continue;
            }
            let Some(moved) = relocation.types.get(&import.namespace) else {
                continue;
            };
            if moved.new_key == import.namespace {
                continue;
            }
            analysis.report.change(
                &file.path,
                &file.project,
                "directive names relocated type",
                RequiredChange::new(
                    ChangeKind::UsingUpdate,
                    import.namespace.clone(),
                    moved.new_key.clone(),
                    if import.is_static {
                        "update using static directive"
                    } else {
                        "update using alias target"
                    },
                )
                .at_line(import.line),
            );
        }
    }
}

/// Types the relocated code uses: visibility and project references.
fn dependencies(analysis: &mut Analysis<'_>, relocation: &Relocation) -> Result<(), Cancelled> {
    let graph = analysis.graph;
    for path in &relocation.declaring_files {
        analysis.cancel.check()?;
        let Some(file) = graph.file(path) else {
            continue;
        };
        for edge in graph.uses_in_file(path) {
            let Some(moved) = relocation.types.get(&edge.from) else {
                continue;
            };
            if relocation.types.contains_key(&edge.to) {
                continue;
            }
            let Some(target) = graph.type_node(&edge.to) else {
                continue;
            };

            let visible_after = edge.is_qualified()
                || target.namespace.is_empty()
                || namespace::is_same_or_child(&moved.new_namespace, &target.namespace)
                || file
                    .imports
                    .iter()
                    .any(|import| import.is_plain() && import.namespace == target.namespace);
            if !visible_after {
                analysis.report.change(
                    path,
                    &file.project,
                    "relocated code depends on types it no longer sees",
                    RequiredChange::new(
                        ChangeKind::UsingUpdate,
                        "",
                        target.namespace.clone(),
                        format!("add using for {}", target.name),
                    ),
                );
            }

            let owners: BTreeSet<&str> = target
                .files
                .iter()
                .map(|declaring| analysis.project_of(declaring))
                .collect();
            for owner in owners {
                if owner != relocation.target_project {
                    analysis.require_reference(
                        &relocation.target_project,
                        owner,
                        format!("relocated {} uses {}", moved.new_key, target.full_name),
                    );
                }
            }
        }
    }
    Ok(())
}
