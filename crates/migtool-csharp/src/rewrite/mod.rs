// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Trivia-preserving source rewriters.
//!
//! Each [`Rewrite`] is a pure function from source text to new text plus a
//! [`RewriteManifest`]. Rewriters parse the file into a [`SyntaxTree`],
//! compute span edits against the original text and apply them in one pass,
//! so bytes outside the edited spans are carried over untouched.
//!
//! | Variant | Edits |
//! |---------|-------|
//! | [`Rewrite::Namespace`] | namespace declarations, optionally qualified names in code |
//! | [`Rewrite::Using`] | `using` directives: add, remove, replace |
//! | [`Rewrite::RenameType`] | a type's declaration, constructors and references |
//! | [`Rewrite::QualifiedName`] | qualified type names exactly as written |
//!
//! A rewrite whose configuration matches nothing returns the source as-is
//! with an `editCount` of zero. Source that does not parse is a
//! [`RewriteError::Parse`] and produces no text at all.
//!
//! [`SyntaxTree`]: crate::syntax::SyntaxTree

mod namespace;
mod qualified;
mod rename;
mod using;

use migtool_core::patch::{EditError, SpanEditor, TextEdit};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::syntax::ParseError;

pub use self::namespace::NamespaceRewrite;
pub use self::qualified::QualifiedNameRewrite;
pub use self::rename::TypeRename;
pub use self::using::UsingRewrite;

// ============================================================================
// Configuration
// ============================================================================

/// One configured rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Rewrite {
    Namespace(NamespaceRewrite),
    Using(UsingRewrite),
    RenameType(TypeRename),
    QualifiedName(QualifiedNameRewrite),
}

impl Rewrite {
    pub fn apply(&self, source: &str) -> Result<RewriteOutput, RewriteError> {
        match self {
            Rewrite::Namespace(rewrite) => rewrite.apply(source),
            Rewrite::Using(rewrite) => rewrite.apply(source),
            Rewrite::RenameType(rewrite) => rewrite.apply(source),
            Rewrite::QualifiedName(rewrite) => rewrite.apply(source),
        }
    }
}

impl From<NamespaceRewrite> for Rewrite {
    fn from(rewrite: NamespaceRewrite) -> Self {
        Rewrite::Namespace(rewrite)
    }
}

impl From<UsingRewrite> for Rewrite {
    fn from(rewrite: UsingRewrite) -> Self {
        Rewrite::Using(rewrite)
    }
}

impl From<TypeRename> for Rewrite {
    fn from(rewrite: TypeRename) -> Self {
        Rewrite::RenameType(rewrite)
    }
}

impl From<QualifiedNameRewrite> for Rewrite {
    fn from(rewrite: QualifiedNameRewrite) -> Self {
        Rewrite::QualifiedName(rewrite)
    }
}

// ============================================================================
// Results
// ============================================================================

/// An old→new pair that matched something in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMapping {
    pub old: String,
    pub new: String,
}

/// A matching pair that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMapping {
    pub old: String,
    pub new: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteManifest {
    pub edit_count: usize,
    pub applied: Vec<AppliedMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedMapping>,
}

impl RewriteManifest {
    fn merge(&mut self, other: RewriteManifest) {
        self.edit_count += other.edit_count;
        for mapping in other.applied {
            if !self.applied.contains(&mapping) {
                self.applied.push(mapping);
            }
        }
        self.skipped.extend(other.skipped);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutput {
    pub text: String,
    pub manifest: RewriteManifest,
}

impl RewriteOutput {
    pub fn is_unchanged(&self) -> bool {
        self.manifest.edit_count == 0
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("cannot parse source for rewriting: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid identifier: {name}")]
    InvalidIdentifier { name: String },

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Apply `rewrites` in order, each to the previous result.
pub fn apply_all(source: &str, rewrites: &[Rewrite]) -> Result<RewriteOutput, RewriteError> {
    let mut output = RewriteOutput {
        text: source.to_string(),
        manifest: RewriteManifest::default(),
    };
    for rewrite in rewrites {
        let step = rewrite.apply(&output.text)?;
        output.text = step.text;
        output.manifest.merge(step.manifest);
    }
    Ok(output)
}

// ============================================================================
// Edit Collection
// ============================================================================

/// Edits and manifest entries gathered by one rewriter run.
struct Rewriting<'s> {
    source: &'s str,
    edits: Vec<TextEdit>,
    manifest: RewriteManifest,
}

impl<'s> Rewriting<'s> {
    fn new(source: &'s str) -> Self {
        Rewriting {
            source,
            edits: Vec::new(),
            manifest: RewriteManifest::default(),
        }
    }

    /// Queue an edit that counts as one change.
    fn edit(&mut self, edit: TextEdit) {
        self.manifest.edit_count += 1;
        self.edits.push(edit);
    }

    fn applied(&mut self, old: &str, new: &str) {
        let mapping = AppliedMapping {
            old: old.to_string(),
            new: new.to_string(),
        };
        if !self.manifest.applied.contains(&mapping) {
            self.manifest.applied.push(mapping);
        }
    }

    fn skipped(&mut self, old: &str, new: &str, reason: impl Into<String>) {
        self.manifest.skipped.push(SkippedMapping {
            old: old.to_string(),
            new: new.to_string(),
            reason: reason.into(),
        });
    }

    fn finish(self) -> Result<RewriteOutput, RewriteError> {
        let text = if self.edits.is_empty() {
            self.source.to_string()
        } else {
            let mut editor = SpanEditor::new(self.source);
            editor.add_all(self.edits);
            editor.apply()?
        };
        Ok(RewriteOutput {
            text,
            manifest: self.manifest,
        })
    }
}

/// Validate every name of a dotted namespace.
fn check_namespace(name: &str) -> Result<(), RewriteError> {
    if migtool_core::namespace::is_valid_namespace(name) {
        Ok(())
    } else {
        Err(RewriteError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}
