//! JSON response envelopes and text rendering for CLI output.
//!
//! Every response carries `status` first and a `schema_version`. The impact
//! report itself is embedded unchanged, so its PascalCase field names reach
//! consumers as-is.
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `ok` | the report allows proceeding (and changes were applied unless dry-run) |
//! | `blocked` | `CanProceed` is false; nothing was applied |
//! | `error` | the command failed before or while producing a report |

use std::fmt::Write as _;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{MigError, OutputErrorCode};
use crate::graph::{BuildDiagnostic, GraphStats};
use crate::impact::{ImpactReport, Operation};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (same as the process exit code).
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &MigError) -> Self {
        let details = match err {
            MigError::ApplyError {
                file: Some(file), ..
            } => Some(serde_json::json!({ "file": file })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &MigError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// What applying an operation did on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub files_written: usize,
    pub files_moved: usize,
    pub files_deleted: usize,
    pub edit_count: usize,
}

/// Response for the operation subcommands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResponse {
    /// Status: "ok" or "blocked".
    pub status: String,
    pub schema_version: String,
    pub operation: Operation,
    pub dry_run: bool,
    pub report: ImpactReport,
    /// Present when changes were applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<ApplySummary>,
}

impl OperationResponse {
    pub fn new(operation: Operation, report: ImpactReport, dry_run: bool) -> Self {
        OperationResponse {
            status: if report.can_proceed { "ok" } else { "blocked" }.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            operation,
            dry_run,
            report,
            applied: None,
        }
    }

    pub fn with_applied(mut self, summary: ApplySummary) -> Self {
        self.applied = Some(summary);
        self
    }
}

/// Response for the `graph` subcommand.
#[derive(Debug, Clone, Serialize)]
pub struct GraphResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub stats: GraphStats,
    pub diagnostics: Vec<BuildDiagnostic>,
}

impl GraphResponse {
    pub fn new(stats: GraphStats, diagnostics: Vec<BuildDiagnostic>) -> Self {
        GraphResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            stats,
            diagnostics,
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Human-readable rendering of an impact report.
pub fn render_report_text(operation: &Operation, report: &ImpactReport) -> String {
    let mut out = String::new();
    let verdict = if report.can_proceed { "can proceed" } else { "BLOCKED" };
    let _ = writeln!(out, "{}: {} ({})", operation, verdict, report.complexity.as_str());

    if !report.affected_files.is_empty() {
        let _ = writeln!(out, "\nAffected files ({}):", report.affected_files.len());
        for file in &report.affected_files {
            let _ = writeln!(out, "  {} [{}]", file.path, file.reason);
            for change in &file.required_changes {
                let location = change
                    .line_number
                    .map_or(String::new(), |line| format!(":{}", line));
                let _ = writeln!(
                    out,
                    "    {:?}{} {} -> {}",
                    change.kind,
                    location,
                    display_value(&change.current_value),
                    display_value(&change.new_value)
                );
            }
        }
    }
    if !report.affected_types.is_empty() {
        let _ = writeln!(out, "\nAffected types ({}):", report.affected_types.len());
        for ty in &report.affected_types {
            let _ = writeln!(out, "  {} ({}) [{}]", ty.full_name, ty.path, ty.reason);
        }
    }
    if !report.required_project_references.is_empty() {
        let _ = writeln!(out, "\nRequired project references:");
        for reference in &report.required_project_references {
            let _ = writeln!(
                out,
                "  {} -> {} ({})",
                reference.project_path, reference.reference_path, reference.reason
            );
        }
    }
    for (title, entries) in [("Warnings", &report.warnings), ("Errors", &report.errors)] {
        if entries.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}:", title);
        for entry in entries {
            let location = match (&entry.path, entry.line) {
                (Some(path), Some(line)) => format!(" {}:{}", path, line),
                (Some(path), None) => format!(" {}", path),
                _ => String::new(),
            };
            let _ = writeln!(out, "  [{}]{} {}", entry.code, location, entry.message);
        }
    }
    out
}

fn display_value(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::{codes, AffectedFile, ChangeKind, Complexity, ReportDiagnostic, RequiredChange};

    fn report(can_proceed: bool) -> ImpactReport {
        ImpactReport {
            can_proceed,
            complexity: Complexity::Simple,
            affected_files: vec![AffectedFile {
                path: "ProjectB/Bar.cs".to_string(),
                project: "ProjectB/ProjectB.csproj".to_string(),
                reason: "imports namespace Acme.Core".to_string(),
                required_changes: vec![RequiredChange::new(
                    ChangeKind::UsingUpdate,
                    "Acme.Core",
                    "Acme.Core.V2",
                    "update using directive",
                )
                .at_line(1)],
            }],
            affected_types: Vec::new(),
            required_project_references: Vec::new(),
            warnings: Vec::new(),
            errors: if can_proceed {
                Vec::new()
            } else {
                vec![ReportDiagnostic::new(codes::REFERENCED_ENTITY_DELETION, "in use")
                    .at("ProjectB/Bar.cs", Some(1))]
            },
        }
    }

    fn operation() -> Operation {
        Operation::RenameNamespace {
            old_namespace: "Acme.Core".to_string(),
            new_namespace: "Acme.Core.V2".to_string(),
        }
    }

    mod json {
        use super::*;

        #[test]
        fn status_follows_can_proceed() {
            assert_eq!(OperationResponse::new(operation(), report(true), true).status, "ok");
            assert_eq!(
                OperationResponse::new(operation(), report(false), true).status,
                "blocked"
            );
        }

        #[test]
        fn response_embeds_report_fields() {
            let response = OperationResponse::new(operation(), report(true), false)
                .with_applied(ApplySummary {
                    files_written: 1,
                    ..ApplySummary::default()
                });
            let mut output = Vec::new();
            emit_response(&response, &mut output).unwrap();
            let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
            assert_eq!(value["status"], "ok");
            assert_eq!(value["schema_version"], SCHEMA_VERSION);
            assert_eq!(value["operation"]["kind"], "RenameNamespace");
            assert_eq!(value["report"]["CanProceed"], true);
            assert_eq!(value["report"]["Complexity"], "Simple");
            assert_eq!(value["applied"]["files_written"], 1);
        }

        #[test]
        fn dry_run_omits_applied() {
            let response = OperationResponse::new(operation(), report(true), true);
            let value = serde_json::to_value(&response).unwrap();
            assert!(value.get("applied").is_none());
        }

        #[test]
        fn error_response_carries_exit_code() {
            let err = MigError::apply("disk full", Some("A/Foo.cs".to_string()));
            let value = serde_json::to_value(ErrorResponse::from_error(&err)).unwrap();
            assert_eq!(value["status"], "error");
            assert_eq!(value["error"]["code"], 4);
            assert_eq!(value["error"]["details"]["file"], "A/Foo.cs");
        }
    }

    mod text {
        use super::*;

        #[test]
        fn renders_changes_and_errors() {
            let text = render_report_text(&operation(), &report(false));
            assert!(text.starts_with("rename namespace Acme.Core -> Acme.Core.V2: BLOCKED (Simple)"));
            assert!(text.contains("  ProjectB/Bar.cs [imports namespace Acme.Core]"));
            assert!(text.contains("    UsingUpdate:1 Acme.Core -> Acme.Core.V2"));
            assert!(text.contains("[ReferencedEntityDeletion] ProjectB/Bar.cs:1 in use"));
        }
    }
}
