//! Applying an impact report to the solution on disk.
//!
//! An [`EditPlan`] is derived from the report's required changes, one entry
//! per affected file:
//!
//! | Change | Applied as |
//! |--------|------------|
//! | `NamespaceUpdate` | [`NamespaceRewrite`] mapping |
//! | `UsingUpdate` | [`UsingRewrite`] add (empty current value) or replace |
//! | `QualifiedNameUpdate` | [`QualifiedNameRewrite`] mapping |
//! | `FileMove` | rename on disk, after rewriting |
//! | `FileDelete` | removal, then pruning of emptied directories |
//! | `DanglingReference` | nothing; forced deletes leave these behind |
//! | `TypeExtraction` | refused: splitting a file is not automated |
//!
//! Application runs in two phases. Every rewrite is computed first, in
//! parallel, and any failure aborts before a byte is written. Then files are
//! written atomically (temp file + rename), moved and deleted.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

use migtool_core::error::MigError;
use migtool_core::impact::{ChangeKind, ImpactReport};
use migtool_core::output::ApplySummary;
use migtool_csharp::{apply_all, NamespaceRewrite, QualifiedNameRewrite, Rewrite, RewriteError, UsingRewrite};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{path}: {message}")]
    Unsupported { path: String, message: String },

    #[error("{path}: {source}")]
    Rewrite {
        path: String,
        #[source]
        source: RewriteError,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl ApplyError {
    pub fn path(&self) -> &str {
        match self {
            ApplyError::Unsupported { path, .. }
            | ApplyError::Rewrite { path, .. }
            | ApplyError::Io { path, .. } => path,
        }
    }
}

impl From<ApplyError> for MigError {
    fn from(err: ApplyError) -> Self {
        let file = Some(err.path().to_string());
        MigError::apply(err.to_string(), file)
    }
}

// ============================================================================
// Plan
// ============================================================================

/// What happens to one affected file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePlan {
    pub namespaces: NamespaceRewrite,
    pub usings: UsingRewrite,
    pub qualified: QualifiedNameRewrite,
    pub move_to: Option<String>,
    pub delete: bool,
}

impl FilePlan {
    /// Rewrites in application order, empty ones left out.
    pub fn rewrites(&self) -> Vec<Rewrite> {
        let mut rewrites = Vec::new();
        if !self.namespaces.mappings.is_empty() {
            rewrites.push(self.namespaces.clone().into());
        }
        if !(self.usings.add.is_empty() && self.usings.remove.is_empty() && self.usings.replace.is_empty()) {
            rewrites.push(self.usings.clone().into());
        }
        if !self.qualified.mappings.is_empty() {
            rewrites.push(self.qualified.clone().into());
        }
        rewrites
    }
}

/// Per-file actions derived from a report, keyed by solution-relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPlan {
    pub files: BTreeMap<String, FilePlan>,
}

/// A rewritten file ready to be written.
struct Rewritten {
    path: String,
    text: Option<String>,
    edit_count: usize,
}

impl EditPlan {
    pub fn from_report(report: &ImpactReport) -> Result<Self, ApplyError> {
        let mut plan = EditPlan::default();
        for file in &report.affected_files {
            let entry = plan.files.entry(file.path.clone()).or_default();
            for change in &file.required_changes {
                let current = change.current_value.clone();
                let new = change.new_value.clone();
                match change.kind {
                    ChangeKind::NamespaceUpdate => {
                        entry.namespaces.mappings.insert(current, new);
                    }
                    ChangeKind::UsingUpdate if current.is_empty() => {
                        if !entry.usings.add.contains(&new) {
                            entry.usings.add.push(new);
                        }
                    }
                    ChangeKind::UsingUpdate => {
                        entry.usings.replace.insert(current, new);
                    }
                    ChangeKind::QualifiedNameUpdate => {
                        entry.qualified.mappings.insert(current, new);
                    }
                    ChangeKind::FileMove => entry.move_to = Some(new),
                    ChangeKind::FileDelete => entry.delete = true,
                    ChangeKind::DanglingReference => {}
                    ChangeKind::TypeExtraction => {
                        return Err(ApplyError::Unsupported {
                            path: file.path.clone(),
                            message: format!(
                                "{}; extract it to {} by hand and re-run",
                                change.description, new
                            ),
                        });
                    }
                }
            }
        }
        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Apply the plan to the solution at `root`.
    pub fn apply(&self, root: &Path) -> Result<ApplySummary, ApplyError> {
        let rewritten = self.rewrite_all(root)?;
        let mut summary = ApplySummary::default();

        for file in &rewritten {
            summary.edit_count += file.edit_count;
            let plan = &self.files[&file.path];
            if plan.delete {
                continue;
            }
            let destination = plan.move_to.as_deref().unwrap_or(&file.path);
            if let Some(text) = &file.text {
                write_atomic(&root.join(destination), text).map_err(|source| ApplyError::Io {
                    path: destination.to_string(),
                    source,
                })?;
                summary.files_written += 1;
                tracing::debug!(path = %destination, edits = file.edit_count, "wrote file");
            }
        }

        let mut vacated: Vec<PathBuf> = Vec::new();
        for (path, plan) in &self.files {
            let Some(target) = plan.move_to.as_deref().filter(|_| !plan.delete) else {
                continue;
            };
            let rewritten_here = rewritten
                .iter()
                .any(|file| &file.path == path && file.text.is_some());
            let io_err = |source| ApplyError::Io {
                path: path.clone(),
                source,
            };
            if rewritten_here {
                // New content already sits at the target.
                fs::remove_file(root.join(path)).map_err(io_err)?;
            } else {
                let target_path = root.join(target);
                if let Some(parent) = target_path.parent() {
                    fs::create_dir_all(parent).map_err(io_err)?;
                }
                fs::rename(root.join(path), &target_path).map_err(io_err)?;
            }
            summary.files_moved += 1;
            tracing::info!(from = %path, to = %target, "moved file");
            if let Some(parent) = root.join(path).parent() {
                vacated.push(parent.to_path_buf());
            }
        }

        for (path, _plan) in self.files.iter().filter(|(_, plan)| plan.delete) {
            let full = root.join(path);
            fs::remove_file(&full).map_err(|source| ApplyError::Io {
                path: path.clone(),
                source,
            })?;
            summary.files_deleted += 1;
            tracing::info!(path = %path, "deleted file");
            if let Some(parent) = full.parent() {
                vacated.push(parent.to_path_buf());
            }
        }
        prune_empty_dirs(root, vacated);

        Ok(summary)
    }

    /// Compute every rewrite without touching the disk.
    fn rewrite_all(&self, root: &Path) -> Result<Vec<Rewritten>, ApplyError> {
        self.files
            .par_iter()
            .filter(|(_, plan)| !plan.delete)
            .map(|(path, plan)| {
                let rewrites = plan.rewrites();
                if rewrites.is_empty() {
                    return Ok(Rewritten {
                        path: path.clone(),
                        text: None,
                        edit_count: 0,
                    });
                }
                let source = fs::read_to_string(root.join(path)).map_err(|source| ApplyError::Io {
                    path: path.clone(),
                    source,
                })?;
                let output = apply_all(&source, &rewrites).map_err(|source| ApplyError::Rewrite {
                    path: path.clone(),
                    source,
                })?;
                for skipped in &output.manifest.skipped {
                    tracing::warn!(path = %path, old = %skipped.old, new = %skipped.new, reason = %skipped.reason, "mapping skipped");
                }
                // Moved files are written to the target even when unchanged.
                let text = (output.manifest.edit_count > 0 || plan.move_to.is_some())
                    .then_some(output.text);
                Ok(Rewritten {
                    path: path.clone(),
                    text,
                    edit_count: output.manifest.edit_count,
                })
            })
            .collect()
    }
}

// ============================================================================
// File System
// ============================================================================

fn write_atomic(path: &Path, text: &str) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(text.as_bytes())?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove directories left empty by moves and deletions, bottom-up, never
/// `root`.
fn prune_empty_dirs(root: &Path, dirs: Vec<PathBuf>) {
    for dir in dirs {
        let mut current = Some(dir.as_path());
        while let Some(path) = current.filter(|p| *p != root && p.starts_with(root)) {
            let empty = WalkDir::new(path)
                .min_depth(1)
                .into_iter()
                .filter_map(Result::ok)
                .all(|entry| entry.file_type().is_dir());
            if !empty || !path.is_dir() {
                break;
            }
            if fs::remove_dir_all(path).is_err() {
                break;
            }
            tracing::debug!(path = %path.display(), "removed empty directory");
            current = path.parent();
        }
    }
}
