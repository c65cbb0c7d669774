//! Impact report types.
//!
//! Top-level report fields serialize in PascalCase (`CanProceed`,
//! `AffectedFiles`, ...); nested records use camelCase.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Diagnostic codes used in report `Warnings` and `Errors`.
pub mod codes {
    pub const ENTITY_NOT_FOUND: &str = "EntityNotFound";
    pub const REFERENCED_ENTITY_DELETION: &str = "ReferencedEntityDeletion";
    pub const REQUIRED_PROJECT_REFERENCE_MISSING: &str = "RequiredProjectReferenceMissing";
    pub const AMBIGUOUS_REFERENCE: &str = "AmbiguousReference";
    pub const PARSE_FAILURE: &str = "ParseFailure";
    pub const TARGET_EXISTS: &str = "TargetExists";
    pub const TARGET_PROJECT_NOT_FOUND: &str = "TargetProjectNotFound";
    pub const INVALID_TARGET: &str = "InvalidTarget";
    pub const PROJECT_DIRECTORY_MOVE: &str = "ProjectDirectoryMove";
    pub const CIRCULAR_PROJECT_REFERENCE: &str = "CircularProjectReference";
    pub const INVALID_NAMESPACE: &str = "InvalidNamespace";
    pub const NAMESPACE_COLLISION: &str = "NamespaceCollision";
    pub const TYPE_NAME_CONFLICT: &str = "TypeNameConflict";
    pub const TYPE_EXTRACTION: &str = "TypeExtraction";
    pub const PARTIAL_TYPE_SPLIT: &str = "PartialTypeSplit";
    pub const NESTED_TYPE_MOVE: &str = "NestedTypeMove";
    pub const NO_CHANGE: &str = "NoChange";
    pub const CANCELLED: &str = "Cancelled";
}

/// Overall effort/risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Complexity {
    Trivial,
    Simple,
    Moderate,
    Complex,
    Breaking,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Trivial => "Trivial",
            Complexity::Simple => "Simple",
            Complexity::Moderate => "Moderate",
            Complexity::Complex => "Complex",
            Complexity::Breaking => "Breaking",
        }
    }
}

/// Kind of a textual change a file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    NamespaceUpdate,
    UsingUpdate,
    QualifiedNameUpdate,
    FileMove,
    FileDelete,
    TypeExtraction,
    DanglingReference,
}

/// One change required in an affected file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredChange {
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    pub current_value: String,
    pub new_value: String,
    pub description: String,
}

impl RequiredChange {
    pub fn new(
        kind: ChangeKind,
        current_value: impl Into<String>,
        new_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        RequiredChange {
            kind,
            line_number: None,
            current_value: current_value.into(),
            new_value: new_value.into(),
            description: description.into(),
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }

    /// Sort key: line first (file-level changes last), then kind and values.
    fn order_key(&self) -> (u32, ChangeKind, &str, &str) {
        (
            self.line_number.unwrap_or(u32::MAX),
            self.kind,
            &self.current_value,
            &self.new_value,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedFile {
    pub path: String,
    pub project: String,
    pub reason: String,
    pub required_changes: Vec<RequiredChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedType {
    pub full_name: String,
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredProjectReference {
    pub project_path: String,
    pub reference_path: String,
    pub reason: String,
}

/// A warning or error entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDiagnostic {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl ReportDiagnostic {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        ReportDiagnostic {
            code: code.to_string(),
            message: message.into(),
            path: None,
            line: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>, line: Option<u32>) -> Self {
        self.path = Some(path.into());
        self.line = line;
        self
    }

    fn order_key(&self) -> (&str, Option<&str>, Option<u32>, &str) {
        (&self.code, self.path.as_deref(), self.line, &self.message)
    }
}

/// Result of analyzing one operation against a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImpactReport {
    pub can_proceed: bool,
    pub complexity: Complexity,
    pub affected_files: Vec<AffectedFile>,
    pub affected_types: Vec<AffectedType>,
    pub required_project_references: Vec<RequiredProjectReference>,
    pub warnings: Vec<ReportDiagnostic>,
    pub errors: Vec<ReportDiagnostic>,
}

impl ImpactReport {
    pub fn affected_file(&self, path: &str) -> Option<&AffectedFile> {
        self.affected_files.iter().find(|file| file.path == path)
    }

    pub fn has_error(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn has_warning(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}

// ============================================================================
// Report Builder
// ============================================================================

struct FileEntry {
    project: String,
    reasons: Vec<String>,
    changes: BTreeSet<RequiredChange>,
}

/// Accumulates findings; duplicates collapse and every list is sorted on
/// [`finish`](ReportBuilder::finish).
#[derive(Default)]
pub(crate) struct ReportBuilder {
    files: BTreeMap<String, FileEntry>,
    types: BTreeSet<AffectedType>,
    references: BTreeMap<(String, String), String>,
    warnings: Vec<ReportDiagnostic>,
    errors: Vec<ReportDiagnostic>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a file affected, recording why.
    pub fn touch(&mut self, path: &str, project: &str, reason: &str) {
        let entry = self
            .files
            .entry(path.to_string())
            .or_insert_with(|| FileEntry {
                project: project.to_string(),
                reasons: Vec::new(),
                changes: BTreeSet::new(),
            });
        if !entry.reasons.iter().any(|r| r == reason) {
            entry.reasons.push(reason.to_string());
        }
    }

    pub fn change(&mut self, path: &str, project: &str, reason: &str, change: RequiredChange) {
        self.touch(path, project, reason);
        if let Some(entry) = self.files.get_mut(path) {
            entry.changes.insert(change);
        }
    }

    pub fn affected_projects(&self) -> BTreeSet<&str> {
        self.files.values().map(|entry| entry.project.as_str()).collect()
    }

    pub fn affected_count(&self) -> usize {
        self.files.len()
    }

    pub fn affected_type(&mut self, full_name: &str, path: &str, reason: &str) {
        self.types.insert(AffectedType {
            full_name: full_name.to_string(),
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Record a project reference the operation needs. Returns false if
    /// the pair was already recorded.
    pub fn require_reference(&mut self, project: &str, reference: &str, reason: &str) -> bool {
        let key = (project.to_string(), reference.to_string());
        if self.references.contains_key(&key) {
            return false;
        }
        self.references.insert(key, reason.to_string());
        true
    }

    pub fn required_reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn warn(&mut self, diagnostic: ReportDiagnostic) {
        self.warnings.push(diagnostic);
    }

    pub fn error(&mut self, diagnostic: ReportDiagnostic) {
        self.errors.push(diagnostic);
    }

    pub fn finish(self, complexity: Complexity) -> ImpactReport {
        let affected_files = self
            .files
            .into_iter()
            .map(|(path, entry)| {
                let mut required_changes: Vec<_> = entry.changes.into_iter().collect();
                required_changes.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
                AffectedFile {
                    path,
                    project: entry.project,
                    reason: entry.reasons.join("; "),
                    required_changes,
                }
            })
            .collect();

        let required_project_references = self
            .references
            .into_iter()
            .map(|((project_path, reference_path), reason)| RequiredProjectReference {
                project_path,
                reference_path,
                reason,
            })
            .collect();

        let mut warnings = self.warnings;
        warnings.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        warnings.dedup();
        let mut errors = self.errors;
        errors.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        errors.dedup();

        ImpactReport {
            can_proceed: errors.is_empty(),
            complexity,
            affected_files,
            affected_types: self.types.into_iter().collect(),
            required_project_references,
            warnings,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_with_exact_field_names() {
        let mut builder = ReportBuilder::new();
        builder.change(
            "ProjectB/Bar.cs",
            "ProjectB/ProjectB.csproj",
            "imports renamed namespace",
            RequiredChange::new(ChangeKind::UsingUpdate, "Acme.Core", "Acme.Core.V2", "update using")
                .at_line(1),
        );
        builder.affected_type("Acme.Core.Foo", "ProjectA/Foo.cs", "namespace declaration update");
        builder.require_reference("B.csproj", "A.csproj", "needed");
        builder.warn(ReportDiagnostic::new(codes::AMBIGUOUS_REFERENCE, "Foo").at("X.cs", Some(3)));
        let report = builder.finish(Complexity::Simple);

        let json = serde_json::to_value(&report).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "CanProceed",
            "Complexity",
            "AffectedFiles",
            "AffectedTypes",
            "RequiredProjectReferences",
            "Warnings",
            "Errors",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert_eq!(json["Complexity"], "Simple");
        let change = &json["AffectedFiles"][0]["requiredChanges"][0];
        assert_eq!(change["kind"], "UsingUpdate");
        assert_eq!(change["lineNumber"], 1);
        assert_eq!(change["currentValue"], "Acme.Core");
        assert_eq!(change["newValue"], "Acme.Core.V2");
        assert_eq!(json["AffectedTypes"][0]["fullName"], "Acme.Core.Foo");
        assert_eq!(json["RequiredProjectReferences"][0]["projectPath"], "B.csproj");
        assert_eq!(json["RequiredProjectReferences"][0]["referencePath"], "A.csproj");
        assert_eq!(json["Warnings"][0]["line"], 3);

        let back: ImpactReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let change = RequiredChange::new(ChangeKind::FileDelete, "A.cs", "", "delete");
        let json = serde_json::to_value(&change).unwrap();
        assert!(json.get("lineNumber").is_none());

        let diagnostic = ReportDiagnostic::new(codes::ENTITY_NOT_FOUND, "missing");
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert!(json.get("path").is_none());
        assert!(json.get("line").is_none());
    }

    #[test]
    fn builder_collapses_duplicates_and_sorts() {
        let mut builder = ReportBuilder::new();
        for path in ["b.cs", "a.cs", "b.cs"] {
            builder.change(
                path,
                "P",
                "reason",
                RequiredChange::new(ChangeKind::UsingUpdate, "X", "Y", "d").at_line(2),
            );
        }
        builder.change(
            "a.cs",
            "P",
            "other reason",
            RequiredChange::new(ChangeKind::NamespaceUpdate, "X", "Y", "d").at_line(1),
        );
        builder.error(ReportDiagnostic::new("Z", "z"));
        builder.error(ReportDiagnostic::new("A", "a"));
        let report = builder.finish(Complexity::Moderate);

        let paths: Vec<_> = report.affected_files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.cs", "b.cs"]);
        let a = &report.affected_files[0];
        assert_eq!(a.reason, "reason; other reason");
        assert_eq!(a.required_changes.len(), 2);
        assert_eq!(a.required_changes[0].kind, ChangeKind::NamespaceUpdate);
        assert_eq!(report.affected_files[1].required_changes.len(), 1);
        assert!(!report.can_proceed);
        assert_eq!(report.errors[0].code, "A");
    }
}
