//! Complexity classification.

use crate::config::AnalysisConfig;
use crate::impact::report::{Complexity, ReportBuilder};

/// Classify by the number of affected files.
///
/// One file or none is `Trivial`; past `large_change_threshold` the change
/// is `Breaking`.
pub(crate) fn by_file_count(count: usize, config: &AnalysisConfig) -> Complexity {
    if count <= 1 {
        Complexity::Trivial
    } else if count <= config.simple_max_files {
        Complexity::Simple
    } else if count <= config.moderate_max_files {
        Complexity::Moderate
    } else if count <= config.large_change_threshold {
        Complexity::Complex
    } else {
        Complexity::Breaking
    }
}

/// Classify a file or type relocation.
///
/// - `Trivial`: nothing besides the relocated files is affected
/// - `Simple`: affected files stay inside `home_project` and no project
///   reference is needed
/// - `Moderate`: one more project is involved, or new references are needed
///   but the affected files stay in one project
/// - `Complex`: anything wider
///
/// Relocations are never `Breaking`: every consequence is mechanical.
pub(crate) fn for_relocation(
    report: &ReportBuilder,
    relocated: usize,
    home_project: &str,
) -> Complexity {
    let others = report.affected_count().saturating_sub(relocated);
    if others == 0 && report.required_reference_count() == 0 {
        return Complexity::Trivial;
    }

    let projects = report.affected_projects();
    let foreign = projects.iter().filter(|p| **p != home_project).count();
    let needs_references = report.required_reference_count() > 0;

    match (foreign, needs_references) {
        (0, false) => Complexity::Simple,
        (0, true) | (1, false) => Complexity::Moderate,
        _ => Complexity::Complex,
    }
}
