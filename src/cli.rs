//! Runners behind the `mig` subcommands.
//!
//! Each runner builds the graph of the solution, analyzes the operation and,
//! unless this is a dry run, applies the report when it allows proceeding.
//! Reports that still need project references added are never applied.
//! Runners return response values; printing and exit codes belong to the
//! binary.

use std::path::{Path, PathBuf};

use migtool_core::config::Config;
use migtool_core::error::{BuildError, MigError};
use migtool_core::graph::{normalize_path, Graph, GraphBuilder};
use migtool_core::impact::{analyze, Operation};
use migtool_core::output::{GraphResponse, OperationResponse};
use migtool_csharp::SolutionProvider;

use crate::apply::EditPlan;

/// Solution root plus the configuration that applies to it.
#[derive(Debug, Clone)]
pub struct Session {
    root: PathBuf,
    config: Config,
}

impl Session {
    /// Open the solution at `root`, reading `config` when given and
    /// `.migtool/config.toml` under the root otherwise.
    pub fn open(root: &Path, config: Option<&Path>) -> Result<Self, MigError> {
        if !root.is_dir() {
            return Err(MigError::invalid_args(format!(
                "solution root {} is not a directory",
                root.display()
            )));
        }
        let config = match config {
            Some(path) => Config::load(path)?,
            None => Config::load_from_solution(root)?,
        };
        Ok(Session {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build_graph(&self) -> Result<Graph, MigError> {
        let provider =
            SolutionProvider::with_scan_config(&self.root, &self.config.scan).map_err(BuildError::from)?;
        let graph = GraphBuilder::new(&provider)
            .with_config(self.config.build.clone())
            .build(&self.root)?;
        let stats = graph.stats();
        tracing::info!(
            projects = stats.projects,
            files = stats.files,
            types = stats.types,
            parse_failures = stats.parse_failures,
            "built graph"
        );
        Ok(graph)
    }
}

// ============================================================================
// Runners
// ============================================================================

/// Analyze one operation and apply it unless `dry_run`.
pub fn run_operation(
    session: &Session,
    operation: Operation,
    dry_run: bool,
) -> Result<OperationResponse, MigError> {
    let graph = session.build_graph()?;
    run_against(session, &graph, normalize_operation(operation), dry_run)
}

pub fn run_graph(session: &Session) -> Result<GraphResponse, MigError> {
    let graph = session.build_graph()?;
    Ok(GraphResponse::new(graph.stats(), graph.diagnostics().to_vec()))
}

fn run_against(
    session: &Session,
    graph: &Graph,
    operation: Operation,
    dry_run: bool,
) -> Result<OperationResponse, MigError> {
    let report = analyze(graph, &operation, &session.config.analysis);
    tracing::info!(
        operation = %operation,
        can_proceed = report.can_proceed,
        complexity = report.complexity.as_str(),
        affected = report.affected_files.len(),
        "analyzed operation"
    );
    let response = OperationResponse::new(operation, report, dry_run);
    if dry_run || !response.report.can_proceed {
        return Ok(response);
    }
    let missing = response.report.required_project_references.len();
    if missing > 0 {
        return Err(MigError::blocked(format!(
            "{} project reference(s) must be added before applying; run with --dry-run to list them",
            missing
        )));
    }
    let plan = EditPlan::from_report(&response.report)?;
    let summary = plan.apply(&session.root)?;
    tracing::info!(
        written = summary.files_written,
        moved = summary.files_moved,
        deleted = summary.files_deleted,
        edits = summary.edit_count,
        "applied operation"
    );
    Ok(response.with_applied(summary))
}

/// Bring user-supplied paths into graph key form.
fn normalize_operation(operation: Operation) -> Operation {
    match operation {
        Operation::Move {
            source_path,
            target_path,
        } => Operation::Move {
            source_path: normalize_path(&source_path),
            target_path: normalize_path(&target_path),
        },
        Operation::Delete { path, force } => Operation::Delete {
            path: normalize_path(&path),
            force,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_paths_are_normalized() {
        let op = normalize_operation(Operation::Move {
            source_path: ".\\ProjectA\\Foo.cs".to_string(),
            target_path: "ProjectA/Sub/Foo.cs".to_string(),
        });
        assert_eq!(
            op,
            Operation::Move {
                source_path: "ProjectA/Foo.cs".to_string(),
                target_path: "ProjectA/Sub/Foo.cs".to_string(),
            }
        );
    }

    #[test]
    fn missing_root_is_invalid_arguments() {
        let err = Session::open(Path::new("/definitely/not/here"), None).unwrap_err();
        assert!(matches!(err, MigError::InvalidArguments { .. }));
    }
}
