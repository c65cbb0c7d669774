//! The solution dependency graph.
//!
//! A [`Graph`] is an immutable snapshot of a solution: projects, files,
//! namespaces and types, joined by reference, ownership, declaration,
//! inheritance, import and usage edges. It is produced by the
//! [`GraphBuilder`] and consumed read-only by the impact analyzer; after an
//! edit is applied the graph is rebuilt, never patched.
//!
//! ## Storage
//!
//! Node tables are `BTreeMap`s keyed by stable strings (solution-relative
//! paths for projects and files, full names for namespaces and types), so
//! every iteration is deterministic. Edge lists are kept sorted and indexed
//! through `HashMap` postings lists for the common lookups.
//!
//! ## Edges
//!
//! | Edge | Storage |
//! |------|---------|
//! | Project → Project reference | [`ProjectNode::references`] |
//! | File → Project ownership | [`FileNode::project`] |
//! | Namespace → Type declares | [`NamespaceNode::types`] |
//! | Type → Type inherits/implements | [`InheritanceEdge`] |
//! | File → Namespace imports | [`ImportEdge`] |
//! | Type → Type uses | [`UsesEdge`] |

mod builder;
mod resolve;

pub use builder::GraphBuilder;
pub use resolve::Resolution;

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use crate::entity::{
    ImportDirective, NamespaceDecl, PackageReference, ReferenceContext, TypeKind,
};
use crate::namespace;

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectNode {
    pub name: String,
    pub path: String,
    pub directory: String,
    pub root_namespace: String,
    pub target_frameworks: BTreeSet<String>,
    /// Resolved project references (keys of other project nodes).
    pub references: BTreeSet<String>,
    /// Declared references that name no project in the solution.
    pub unresolved_references: Vec<String>,
    pub package_references: Vec<PackageReference>,
    pub files: BTreeSet<String>,
}

impl ProjectNode {
    /// True when `path` lies inside this project's directory.
    pub fn contains_path(&self, path: &str) -> bool {
        self.directory.is_empty()
            || path
                .strip_prefix(self.directory.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Path of `path` relative to this project's directory.
    pub fn relative_path<'a>(&self, path: &'a str) -> &'a str {
        if self.directory.is_empty() {
            path
        } else {
            path.strip_prefix(self.directory.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(path)
        }
    }
}

/// Outcome of parsing a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseStatus {
    Parsed,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub path: String,
    /// Key of the owning project.
    pub project: String,
    pub namespaces: Vec<NamespaceDecl>,
    pub imports: Vec<ImportDirective>,
    /// Types with at least one declaration in this file.
    pub types: BTreeSet<String>,
    pub status: ParseStatus,
}

impl FileNode {
    /// First declared namespace, or the global namespace.
    pub fn primary_namespace(&self) -> &str {
        self.namespaces.first().map_or("", |ns| ns.name.as_str())
    }

    pub fn declares_namespace(&self, name: &str) -> bool {
        self.namespaces.iter().any(|ns| ns.name == name)
    }

    /// True when code in this file sees types of `name` without qualification:
    /// it imports the namespace or is declared in it or one of its children.
    pub fn sees_namespace(&self, name: &str) -> bool {
        name.is_empty()
            || self
                .imports
                .iter()
                .any(|import| import.is_plain() && import.namespace == name)
            || self
                .namespaces
                .iter()
                .any(|ns| namespace::is_same_or_child(&ns.name, name))
    }

    pub fn is_parsed(&self) -> bool {
        self.status == ParseStatus::Parsed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceNode {
    pub name: String,
    pub types: BTreeSet<String>,
    pub files: BTreeSet<String>,
    pub projects: BTreeSet<String>,
}

/// A base-type entry of a type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseTypeRef {
    pub written: String,
    /// Key of the resolved type; `None` for external or unresolvable bases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeNode {
    pub full_name: String,
    pub name: String,
    pub namespace: String,
    pub kind: TypeKind,
    /// Declaring files; more than one for partial types.
    pub files: BTreeSet<String>,
    pub base_types: Vec<BaseTypeRef>,
    pub has_unresolved_base: bool,
    pub is_partial: bool,
    /// Full name of the containing type for nested types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer: Option<String>,
    pub arity: u32,
}

impl TypeNode {
    /// First declaring file in path order.
    pub fn primary_file(&self) -> &str {
        self.files.iter().next().map_or("", String::as_str)
    }

    pub fn is_nested(&self) -> bool {
        self.outer.is_some()
    }
}

// ============================================================================
// Edges
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum InheritanceKind {
    Inherits,
    Implements,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct InheritanceEdge {
    pub child: String,
    pub parent: String,
    pub kind: InheritanceKind,
}

/// A file importing a namespace present in the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ImportEdge {
    pub file: String,
    pub namespace: String,
    pub line: u32,
}

/// A type referring to another type from a specific source location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UsesEdge {
    pub file: String,
    pub line: u32,
    pub from: String,
    pub to: String,
    pub context: ReferenceContext,
    /// The name as written at the reference site.
    pub written: String,
}

impl UsesEdge {
    /// True when the written name carries a qualifier.
    pub fn is_qualified(&self) -> bool {
        self.written.contains('.') || self.written.contains("::")
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DiagnosticCode {
    AmbiguousReference,
    ParseFailure,
    UnresolvedProjectReference,
    DuplicateFile,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::AmbiguousReference => "AmbiguousReference",
            DiagnosticCode::ParseFailure => "ParseFailure",
            DiagnosticCode::UnresolvedProjectReference => "UnresolvedProjectReference",
            DiagnosticCode::DuplicateFile => "DuplicateFile",
        }
    }
}

/// A non-fatal finding recorded while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BuildDiagnostic {
    pub code: DiagnosticCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
    /// For ambiguous references: the name as written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// For ambiguous references: every matching type.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

/// Node and edge counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub projects: usize,
    pub files: usize,
    pub namespaces: usize,
    pub types: usize,
    pub uses_edges: usize,
    pub import_edges: usize,
    pub inheritance_edges: usize,
    pub parse_failures: usize,
    pub ambiguous_references: usize,
}

// ============================================================================
// Graph
// ============================================================================

/// Mutable tables filled by the builder before freezing into a [`Graph`].
#[derive(Debug, Default)]
pub(crate) struct GraphParts {
    pub projects: BTreeMap<String, ProjectNode>,
    pub files: BTreeMap<String, FileNode>,
    pub namespaces: BTreeMap<String, NamespaceNode>,
    pub types: BTreeMap<String, TypeNode>,
    pub inheritance: Vec<InheritanceEdge>,
    pub uses: Vec<UsesEdge>,
    pub imports: Vec<ImportEdge>,
    pub diagnostics: Vec<BuildDiagnostic>,
}

/// Immutable dependency graph of a solution.
#[derive(Debug, Default)]
pub struct Graph {
    projects: BTreeMap<String, ProjectNode>,
    files: BTreeMap<String, FileNode>,
    namespaces: BTreeMap<String, NamespaceNode>,
    types: BTreeMap<String, TypeNode>,
    inheritance: Vec<InheritanceEdge>,
    uses: Vec<UsesEdge>,
    imports: Vec<ImportEdge>,
    diagnostics: Vec<BuildDiagnostic>,

    uses_by_target: HashMap<String, Vec<usize>>,
    uses_by_file: HashMap<String, Vec<usize>>,
    inheritance_by_parent: HashMap<String, Vec<usize>>,
    importers: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    pub(crate) fn from_parts(mut parts: GraphParts) -> Self {
        parts.uses.sort();
        parts.uses.dedup();
        parts.imports.sort();
        parts.imports.dedup();
        parts.inheritance.sort();
        parts.inheritance.dedup();
        parts.diagnostics.sort();
        parts.diagnostics.dedup();

        let mut uses_by_target: HashMap<String, Vec<usize>> = HashMap::new();
        let mut uses_by_file: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, edge) in parts.uses.iter().enumerate() {
            uses_by_target.entry(edge.to.clone()).or_default().push(idx);
            uses_by_file.entry(edge.file.clone()).or_default().push(idx);
        }

        let mut inheritance_by_parent: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, edge) in parts.inheritance.iter().enumerate() {
            inheritance_by_parent
                .entry(edge.parent.clone())
                .or_default()
                .push(idx);
        }

        let mut importers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in &parts.imports {
            importers
                .entry(edge.namespace.clone())
                .or_default()
                .insert(edge.file.clone());
        }

        Graph {
            projects: parts.projects,
            files: parts.files,
            namespaces: parts.namespaces,
            types: parts.types,
            inheritance: parts.inheritance,
            uses: parts.uses,
            imports: parts.imports,
            diagnostics: parts.diagnostics,
            uses_by_target,
            uses_by_file,
            inheritance_by_parent,
            importers,
        }
    }

    // ------------------------------------------------------------------------
    // Node lookup
    // ------------------------------------------------------------------------

    pub fn project(&self, path: &str) -> Option<&ProjectNode> {
        self.projects.get(path)
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectNode> {
        self.projects.values()
    }

    pub fn file(&self, path: &str) -> Option<&FileNode> {
        self.files.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileNode> {
        self.files.values()
    }

    pub fn namespace(&self, name: &str) -> Option<&NamespaceNode> {
        self.namespaces.get(name)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &NamespaceNode> {
        self.namespaces.values()
    }

    pub fn type_node(&self, full_name: &str) -> Option<&TypeNode> {
        self.types.get(full_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeNode> {
        self.types.values()
    }

    /// Project owning a file.
    pub fn project_of_file(&self, file: &str) -> Option<&ProjectNode> {
        self.files
            .get(file)
            .and_then(|node| self.projects.get(&node.project))
    }

    /// Project whose directory holds `path`; the deepest directory wins.
    pub fn project_containing(&self, path: &str) -> Option<&ProjectNode> {
        self.projects
            .values()
            .filter(|project| project.contains_path(path))
            .max_by_key(|project| project.directory.len())
    }

    /// Files at `prefix` or under the directory `prefix`.
    pub fn files_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a FileNode> + 'a {
        let prefix = prefix.trim_end_matches('/');
        self.files.values().filter(move |file| {
            prefix.is_empty()
                || file.path == prefix
                || file
                    .path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Namespaces equal to or nested under `prefix`.
    pub fn namespaces_under<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a NamespaceNode> + 'a {
        self.namespaces
            .range(prefix.to_string()..)
            .take_while(move |(name, _)| name.starts_with(prefix))
            .map(|(_, node)| node)
            .filter(move |node| namespace::is_same_or_child(&node.name, prefix))
    }

    /// Types with the given simple name.
    pub fn types_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TypeNode> + 'a {
        self.types.values().filter(move |ty| ty.name == name)
    }

    /// The type and every type nested in it.
    pub fn type_with_nested<'a>(&'a self, full_name: &'a str) -> impl Iterator<Item = &'a TypeNode> + 'a {
        self.types
            .range(full_name.to_string()..)
            .take_while(move |(name, _)| name.starts_with(full_name))
            .map(|(_, node)| node)
            .filter(move |node| {
                node.full_name == full_name
                    || node
                        .outer
                        .as_deref()
                        .is_some_and(|outer| namespace::is_same_or_child(outer, full_name))
            })
    }

    // ------------------------------------------------------------------------
    // Edge lookup
    // ------------------------------------------------------------------------

    pub fn uses_edges(&self) -> &[UsesEdge] {
        &self.uses
    }

    pub fn import_edges(&self) -> &[ImportEdge] {
        &self.imports
    }

    pub fn inheritance_edges(&self) -> &[InheritanceEdge] {
        &self.inheritance
    }

    /// Usage edges pointing at `type_key`, in (file, line) order.
    pub fn incoming_uses<'a>(&'a self, type_key: &str) -> impl Iterator<Item = &'a UsesEdge> + 'a {
        self.uses_by_target
            .get(type_key)
            .into_iter()
            .flatten()
            .map(|&idx| &self.uses[idx])
    }

    /// Usage edges recorded in `file`.
    pub fn uses_in_file<'a>(&'a self, file: &str) -> impl Iterator<Item = &'a UsesEdge> + 'a {
        self.uses_by_file
            .get(file)
            .into_iter()
            .flatten()
            .map(|&idx| &self.uses[idx])
    }

    /// Direct subtypes of `type_key`.
    pub fn subtypes<'a>(&'a self, type_key: &str) -> impl Iterator<Item = &'a InheritanceEdge> + 'a {
        self.inheritance_by_parent
            .get(type_key)
            .into_iter()
            .flatten()
            .map(|&idx| &self.inheritance[idx])
    }

    /// Files importing exactly `namespace`.
    pub fn importers_of<'a>(&'a self, namespace: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.importers
            .get(namespace)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// True when `from` reaches `to` through project references.
    pub fn project_reaches(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.projects.get(current) else {
                continue;
            };
            for next in &node.references {
                if next == to {
                    return true;
                }
                queue.push_back(next.as_str());
            }
        }
        false
    }

    pub fn diagnostics(&self) -> &[BuildDiagnostic] {
        &self.diagnostics
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            projects: self.projects.len(),
            files: self.files.len(),
            namespaces: self.namespaces.len(),
            types: self.types.len(),
            uses_edges: self.uses.len(),
            import_edges: self.imports.len(),
            inheritance_edges: self.inheritance.len(),
            parse_failures: self
                .diagnostics
                .iter()
                .filter(|d| d.code == DiagnosticCode::ParseFailure)
                .count(),
            ambiguous_references: self
                .diagnostics
                .iter()
                .filter(|d| d.code == DiagnosticCode::AmbiguousReference)
                .count(),
        }
    }
}

/// Normalize a user-supplied path into graph key form.
///
/// Backslashes become `/`, leading `./` and trailing `/` are dropped.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}
