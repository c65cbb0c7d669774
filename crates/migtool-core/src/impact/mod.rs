//! Impact analysis.
//!
//! [`analyze`] walks an immutable [`Graph`] to predict everything a proposed
//! [`Operation`] touches. It is pure: the same graph and operation always
//! produce the same report, byte for byte once serialized. Problems found in
//! the solution are report entries, never `Err` values.
//!
//! ## Operations
//!
//! | Operation | Module |
//! |-----------|--------|
//! | `Move` | `move_file` |
//! | `RenameNamespace` | `rename_namespace` |
//! | `Delete` | `delete` |
//! | `MoveType` | `move_type` |
//!
//! `Move` and `MoveType` share the relocation walk in `relocate`.

mod complexity;
mod delete;
mod move_file;
mod move_type;
mod relocate;
mod rename_namespace;
mod report;

pub use report::{
    codes, AffectedFile, AffectedType, ChangeKind, Complexity, ImpactReport,
    RequiredChange, RequiredProjectReference, ReportDiagnostic,
};

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cancel::{CancellationToken, Cancelled};
use crate::config::AnalysisConfig;
use crate::graph::{DiagnosticCode, Graph, UsesEdge};
use crate::namespace;
use report::ReportBuilder;

// ============================================================================
// Operations
// ============================================================================

/// A proposed reorganization step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum Operation {
    /// Move a source file, or a directory of them, to a new path (possibly
    /// another project).
    Move {
        source_path: String,
        target_path: String,
    },
    /// Rename a namespace and everything nested under it.
    RenameNamespace {
        old_namespace: String,
        new_namespace: String,
    },
    /// Delete a file, a directory or a project.
    Delete {
        path: String,
        #[serde(default)]
        force: bool,
    },
    /// Move one type into another namespace.
    MoveType {
        type_full_name: String,
        target_namespace: String,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Move { .. } => "Move",
            Operation::RenameNamespace { .. } => "RenameNamespace",
            Operation::Delete { .. } => "Delete",
            Operation::MoveType { .. } => "MoveType",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Move {
                source_path,
                target_path,
            } => write!(f, "move {} -> {}", source_path, target_path),
            Operation::RenameNamespace {
                old_namespace,
                new_namespace,
            } => write!(f, "rename namespace {} -> {}", old_namespace, new_namespace),
            Operation::Delete { path, force } => {
                write!(f, "delete {}{}", path, if *force { " (forced)" } else { "" })
            }
            Operation::MoveType {
                type_full_name,
                target_namespace,
            } => write!(f, "move type {} -> {}", type_full_name, target_namespace),
        }
    }
}

/// An ordered list of operations, as stored in plan files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub operations: Vec<Operation>,
}

impl MigrationPlan {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Analyze `operation` against `graph`.
pub fn analyze(graph: &Graph, operation: &Operation, config: &AnalysisConfig) -> ImpactReport {
    match analyze_cancellable(graph, operation, config, &CancellationToken::new()) {
        Ok(report) => report,
        Err(Cancelled) => cancelled_report(),
    }
}

/// Analyze with cooperative cancellation, checked between files.
pub fn analyze_cancellable(
    graph: &Graph,
    operation: &Operation,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<ImpactReport, Cancelled> {
    let mut analysis = Analysis {
        graph,
        config,
        cancel,
        report: ReportBuilder::new(),
    };

    let complexity = match operation {
        Operation::Move {
            source_path,
            target_path,
        } => move_file::analyze(&mut analysis, source_path, target_path)?,
        Operation::RenameNamespace {
            old_namespace,
            new_namespace,
        } => rename_namespace::analyze(&mut analysis, old_namespace, new_namespace)?,
        Operation::Delete { path, force } => delete::analyze(&mut analysis, path, *force)?,
        Operation::MoveType {
            type_full_name,
            target_namespace,
        } => move_type::analyze(&mut analysis, type_full_name, target_namespace)?,
    };

    tracing::debug!(
        operation = operation.name(),
        affected = analysis.report.affected_count(),
        complexity = complexity.as_str(),
        "analysis complete"
    );
    Ok(analysis.report.finish(complexity))
}

fn cancelled_report() -> ImpactReport {
    let mut report = ReportBuilder::new();
    report.error(ReportDiagnostic::new(codes::CANCELLED, "analysis cancelled"));
    report.finish(Complexity::Trivial)
}

// ============================================================================
// Shared Analysis State
// ============================================================================

pub(crate) struct Analysis<'g> {
    pub graph: &'g Graph,
    pub config: &'g AnalysisConfig,
    pub cancel: &'g CancellationToken,
    pub report: ReportBuilder,
}

impl<'g> Analysis<'g> {
    /// Project key of a file, `""` when unknown.
    pub fn project_of(&self, file: &str) -> &'g str {
        self.graph.file(file).map_or("", |node| node.project.as_str())
    }

    pub fn not_found(&mut self, message: String) -> Complexity {
        self.report
            .error(ReportDiagnostic::new(codes::ENTITY_NOT_FOUND, message));
        Complexity::Trivial
    }

    /// Copy build-time ambiguity warnings naming any of `types`.
    pub fn copy_ambiguity_warnings(&mut self, types: &BTreeSet<String>) {
        for diagnostic in self.graph.diagnostics() {
            if diagnostic.code != DiagnosticCode::AmbiguousReference {
                continue;
            }
            if !diagnostic.candidates.iter().any(|c| types.contains(c)) {
                continue;
            }
            let mut warning = ReportDiagnostic::new(
                codes::AMBIGUOUS_REFERENCE,
                format!("{} (not included in this report)", diagnostic.message),
            );
            if let Some(path) = &diagnostic.path {
                warning = warning.at(path.clone(), diagnostic.line);
            }
            self.report.warn(warning);
        }
    }

    /// Copy parse failures: references in those files are invisible.
    pub fn copy_parse_failures(&mut self) {
        for diagnostic in self.graph.diagnostics() {
            if diagnostic.code != DiagnosticCode::ParseFailure {
                continue;
            }
            let mut warning = ReportDiagnostic::new(
                codes::PARSE_FAILURE,
                format!(
                    "file could not be parsed; its references are not analyzed: {}",
                    diagnostic.message
                ),
            );
            if let Some(path) = &diagnostic.path {
                warning = warning.at(path.clone(), diagnostic.line);
            }
            self.report.warn(warning);
        }
    }

    /// Require `project` to reference `reference`, with the matching
    /// missing-reference and cycle warnings.
    pub fn require_reference(&mut self, project: &str, reference: &str, reason: String) {
        if project.is_empty() || reference.is_empty() || project == reference {
            return;
        }
        let already = self
            .graph
            .project(project)
            .is_some_and(|node| node.references.contains(reference));
        if already {
            return;
        }
        if !self.report.require_reference(project, reference, &reason) {
            return;
        }
        self.report.warn(
            ReportDiagnostic::new(
                codes::REQUIRED_PROJECT_REFERENCE_MISSING,
                format!("{} must reference {}: {}", project, reference, reason),
            )
            .at(project, None),
        );
        if self.graph.project_reaches(reference, project) {
            self.report.warn(
                ReportDiagnostic::new(
                    codes::CIRCULAR_PROJECT_REFERENCE,
                    format!(
                        "adding {} -> {} would create a project reference cycle",
                        project, reference
                    ),
                )
                .at(project, None),
            );
        }
    }
}

/// Change for a qualified reference to a type whose full name changes.
pub(crate) fn qualified_update(edge: &UsesEdge, new_full_name: &str) -> RequiredChange {
    let (_, anchored) = namespace::strip_global(&edge.written);
    let new_value = if anchored {
        format!("{}{}", namespace::GLOBAL_ALIAS, new_full_name)
    } else {
        new_full_name.to_string()
    };
    RequiredChange::new(
        ChangeKind::QualifiedNameUpdate,
        edge.written.clone(),
        new_value,
        format!("update qualified {} reference", edge.context.as_str()),
    )
    .at_line(edge.line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_serialize_with_kind_tag() {
        let op = Operation::RenameNamespace {
            old_namespace: "Acme.Core".to_string(),
            new_namespace: "Acme.Core.V2".to_string(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["kind"], "RenameNamespace");
        assert_eq!(json["oldNamespace"], "Acme.Core");
        assert_eq!(json["newNamespace"], "Acme.Core.V2");
    }

    #[test]
    fn delete_force_defaults_to_false() {
        let op: Operation =
            serde_json::from_str(r#"{"kind":"Delete","path":"ProjectA/Foo.cs"}"#).unwrap();
        assert_eq!(
            op,
            Operation::Delete {
                path: "ProjectA/Foo.cs".to_string(),
                force: false
            }
        );
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = MigrationPlan {
            operations: vec![
                Operation::Move {
                    source_path: "A/Foo.cs".to_string(),
                    target_path: "B/Foo.cs".to_string(),
                },
                Operation::MoveType {
                    type_full_name: "Acme.Foo".to_string(),
                    target_namespace: "Acme.Models".to_string(),
                },
            ],
        };
        let text = plan.to_json().unwrap();
        assert!(text.contains("\"typeFullName\""));
        assert_eq!(MigrationPlan::from_json(&text).unwrap(), plan);
    }

    #[test]
    fn display_describes_operation() {
        let op = Operation::Delete {
            path: "A/Foo.cs".to_string(),
            force: true,
        };
        assert_eq!(op.to_string(), "delete A/Foo.cs (forced)");
    }

    #[test]
    fn cancelled_analysis_reports_error() {
        let graph = Graph::default();
        let token = CancellationToken::new();
        token.cancel();
        let op = Operation::RenameNamespace {
            old_namespace: "A".to_string(),
            new_namespace: "B".to_string(),
        };
        let result = analyze_cancellable(&graph, &op, &AnalysisConfig::default(), &token);
        assert_eq!(result, Err(Cancelled));
        assert!(cancelled_report().has_error(codes::CANCELLED));
    }
}
