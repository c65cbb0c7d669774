//! Entity facts and the provider seam.
//!
//! An [`EntityProvider`] knows how to enumerate projects and source files of a
//! solution and how to parse one file into a [`ParsedUnit`]. The graph builder
//! only ever talks to this trait; language-specific parsing lives in the
//! provider's crate.
//!
//! All paths handed across this seam are solution-relative with `/`
//! separators. These strings are the stable keys of the graph.
//!
//! # Example
//!
//! ```
//! use migtool_core::entity::{ParsedUnit, ProjectFacts, StaticProvider, TypeDecl, TypeKind};
//!
//! let provider = StaticProvider::new()
//!     .project(ProjectFacts::new("ProjectA", "ProjectA/ProjectA.csproj"))
//!     .file(
//!         "ProjectA/Foo.cs",
//!         "ProjectA/ProjectA.csproj",
//!         ParsedUnit::new()
//!             .with_namespace("Acme.Core", 1)
//!             .with_type(TypeDecl::new("Acme.Core", "Foo", TypeKind::Class, 3)),
//!     );
//! # let _ = provider;
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::namespace;

// ============================================================================
// Projects and Files
// ============================================================================

/// A package dependency declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageReference {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Facts about one project as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFacts {
    /// Project name (file stem of the project file).
    pub name: String,
    /// Solution-relative path of the project file.
    pub path: String,
    /// Solution-relative directory holding the project file (`""` at the root).
    pub directory: String,
    /// Namespace new files in this project default to.
    pub root_namespace: String,
    pub target_frameworks: Vec<String>,
    /// Solution-relative paths of referenced project files.
    pub project_references: Vec<String>,
    pub package_references: Vec<PackageReference>,
}

impl ProjectFacts {
    /// Create facts for a project; the root namespace defaults to the name.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name = name.into();
        let path = path.into();
        let directory = path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .unwrap_or_default();
        ProjectFacts {
            root_namespace: name.clone(),
            name,
            path,
            directory,
            target_frameworks: Vec::new(),
            project_references: Vec::new(),
            package_references: Vec::new(),
        }
    }

    pub fn with_root_namespace(mut self, root_namespace: impl Into<String>) -> Self {
        self.root_namespace = root_namespace.into();
        self
    }

    pub fn with_reference(mut self, project_path: impl Into<String>) -> Self {
        self.project_references.push(project_path.into());
        self
    }

    pub fn with_target_framework(mut self, framework: impl Into<String>) -> Self {
        self.target_frameworks.push(framework.into());
        self
    }

    pub fn with_package(mut self, name: impl Into<String>, version: Option<&str>) -> Self {
        self.package_references.push(PackageReference {
            name: name.into(),
            version: version.map(str::to_string),
        });
        self
    }
}

/// One source file listed for a project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileFacts {
    pub path: String,
    /// Path of the owning project file.
    pub project: String,
}

impl FileFacts {
    pub fn new(path: impl Into<String>, project: impl Into<String>) -> Self {
        FileFacts {
            path: path.into(),
            project: project.into(),
        }
    }
}

// ============================================================================
// Parsed Units
// ============================================================================

/// Kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    Record,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Struct => "struct",
            TypeKind::Enum => "enum",
            TypeKind::Record => "record",
        }
    }

    /// Map a declaration keyword to a kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "class" => Some(TypeKind::Class),
            "interface" => Some(TypeKind::Interface),
            "struct" => Some(TypeKind::Struct),
            "enum" => Some(TypeKind::Enum),
            "record" => Some(TypeKind::Record),
            _ => None,
        }
    }
}

/// A namespace declaration (block or file-scoped).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    /// Fully-qualified name, with outer declarations folded in.
    pub name: String,
    pub line: u32,
}

/// A type declaration found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    /// Namespace-qualified name; nested types are `Outer.Inner`.
    pub full_name: String,
    pub namespace: String,
    pub kind: TypeKind,
    pub line: u32,
    pub is_partial: bool,
    /// Base types as written, generic arguments removed.
    pub base_types: Vec<String>,
    /// Number of generic type parameters.
    pub arity: u32,
}

impl TypeDecl {
    /// A top-level type declared directly in `namespace`.
    pub fn new(namespace: &str, name: &str, kind: TypeKind, line: u32) -> Self {
        TypeDecl {
            name: name.to_string(),
            full_name: namespace::join(namespace, name),
            namespace: namespace.to_string(),
            kind,
            line,
            is_partial: false,
            base_types: Vec::new(),
            arity: 0,
        }
    }

    /// A type nested in `outer`.
    pub fn nested(outer: &TypeDecl, name: &str, kind: TypeKind, line: u32) -> Self {
        TypeDecl {
            full_name: format!("{}.{}", outer.full_name, name),
            ..TypeDecl::new(&outer.namespace, name, kind, line)
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_types.push(base.into());
        self
    }

    pub fn partial(mut self) -> Self {
        self.is_partial = true;
        self
    }

    pub fn with_arity(mut self, arity: u32) -> Self {
        self.arity = arity;
        self
    }

    /// True for types declared inside another type.
    pub fn is_nested(&self) -> bool {
        self.full_name != namespace::join(&self.namespace, &self.name)
    }

    /// Full name of the containing type, if nested.
    pub fn outer_type(&self) -> Option<&str> {
        if self.is_nested() {
            namespace::parent(&self.full_name)
        } else {
            None
        }
    }
}

/// A `using` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDirective {
    /// Target as written: a namespace, or a type for static/alias forms.
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub is_static: bool,
    pub is_global: bool,
    pub line: u32,
}

impl ImportDirective {
    pub fn new(namespace: impl Into<String>, line: u32) -> Self {
        ImportDirective {
            namespace: namespace.into(),
            alias: None,
            is_static: false,
            is_global: false,
            line,
        }
    }

    pub fn aliased(alias: impl Into<String>, target: impl Into<String>, line: u32) -> Self {
        ImportDirective {
            alias: Some(alias.into()),
            ..ImportDirective::new(target, line)
        }
    }

    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn with_global(mut self) -> Self {
        self.is_global = true;
        self
    }

    /// A plain `using Namespace;` directive.
    pub fn is_plain(&self) -> bool {
        self.alias.is_none() && !self.is_static
    }
}

/// Syntactic position in which a name denotes a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReferenceContext {
    BaseType,
    Declaration,
    ObjectCreation,
    GenericArgument,
    Cast,
    Attribute,
    TypeOf,
    TypePattern,
    Constraint,
    StaticMemberAccess,
}

impl ReferenceContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceContext::BaseType => "base type",
            ReferenceContext::Declaration => "declaration",
            ReferenceContext::ObjectCreation => "object creation",
            ReferenceContext::GenericArgument => "generic argument",
            ReferenceContext::Cast => "cast",
            ReferenceContext::Attribute => "attribute",
            ReferenceContext::TypeOf => "typeof",
            ReferenceContext::TypePattern => "type pattern",
            ReferenceContext::Constraint => "constraint",
            ReferenceContext::StaticMemberAccess => "static member access",
        }
    }
}

/// A name used in a type position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRef {
    /// Text as written, dotted, without generic arguments (may start with `global::`).
    pub written: String,
    pub simple_name: String,
    pub context: ReferenceContext,
    pub line: u32,
    /// Full name of the innermost enclosing type declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing_type: Option<String>,
    /// Innermost enclosing namespace (`""` for global).
    pub enclosing_namespace: String,
}

impl IdentifierRef {
    pub fn new(written: impl Into<String>, context: ReferenceContext, line: u32) -> Self {
        let written = written.into();
        let simple_name = namespace::last_segment(namespace::strip_global(&written).0).to_string();
        IdentifierRef {
            written,
            simple_name,
            context,
            line,
            enclosing_type: None,
            enclosing_namespace: String::new(),
        }
    }

    pub fn within(mut self, namespace: &str, enclosing_type: Option<&str>) -> Self {
        self.enclosing_namespace = namespace.to_string();
        self.enclosing_type = enclosing_type.map(str::to_string);
        self
    }

    /// True when the reference is written with at least one qualifier.
    pub fn is_qualified(&self) -> bool {
        self.written.contains('.') || self.written.contains("::")
    }
}

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedUnit {
    pub namespaces: Vec<NamespaceDecl>,
    pub types: Vec<TypeDecl>,
    pub imports: Vec<ImportDirective>,
    pub references: Vec<IdentifierRef>,
}

impl ParsedUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, name: impl Into<String>, line: u32) -> Self {
        self.namespaces.push(NamespaceDecl {
            name: name.into(),
            line,
        });
        self
    }

    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    pub fn with_import(mut self, import: ImportDirective) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_reference(mut self, reference: IdentifierRef) -> Self {
        self.references.push(reference);
        self
    }
}

/// A file that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("failed to parse {path}: {message}")]
pub struct ParseFailure {
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

// ============================================================================
// Provider
// ============================================================================

/// Fatal provider errors: the solution cannot be enumerated at all.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("solution root not found: {path}")]
    RootNotFound { path: String },

    #[error("project file not found: {path}")]
    ProjectNotFound { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {path}: {message}")]
    Malformed { path: String, message: String },
}

/// Source of projects, files and parsed units for the graph builder.
///
/// Implementations must be shareable across discovery workers.
pub trait EntityProvider: Sync {
    /// Enumerate the projects of the solution at `solution_root`.
    fn list_projects(&self, solution_root: &Path) -> Result<Vec<ProjectFacts>, ProviderError>;

    /// Enumerate the source files owned by `project`.
    fn list_files(&self, project: &ProjectFacts) -> Result<Vec<FileFacts>, ProviderError>;

    /// Read and parse one source file.
    fn parse_file(&self, path: &str) -> Result<ParsedUnit, ParseFailure>;
}

/// Provider over pre-built facts and parsed units.
///
/// Useful when the units come from somewhere other than source text, and for
/// exercising the builder and analyzer without a parser.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    projects: Vec<ProjectFacts>,
    files: BTreeMap<String, (String, Result<ParsedUnit, ParseFailure>)>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project: ProjectFacts) -> Self {
        self.projects.push(project);
        self
    }

    pub fn file(mut self, path: &str, project: &str, unit: ParsedUnit) -> Self {
        self.files
            .insert(path.to_string(), (project.to_string(), Ok(unit)));
        self
    }

    /// Register a file whose parse fails with `message`.
    pub fn broken_file(mut self, path: &str, project: &str, message: &str) -> Self {
        let failure = ParseFailure {
            path: path.to_string(),
            message: message.to_string(),
            line: None,
        };
        self.files
            .insert(path.to_string(), (project.to_string(), Err(failure)));
        self
    }
}

impl EntityProvider for StaticProvider {
    fn list_projects(&self, _solution_root: &Path) -> Result<Vec<ProjectFacts>, ProviderError> {
        Ok(self.projects.clone())
    }

    fn list_files(&self, project: &ProjectFacts) -> Result<Vec<FileFacts>, ProviderError> {
        Ok(self
            .files
            .iter()
            .filter(|(_, (owner, _))| *owner == project.path)
            .map(|(path, (owner, _))| FileFacts::new(path.clone(), owner.clone()))
            .collect())
    }

    fn parse_file(&self, path: &str) -> Result<ParsedUnit, ParseFailure> {
        match self.files.get(path) {
            Some((_, result)) => result.clone(),
            None => Err(ParseFailure {
                path: path.to_string(),
                message: "file not registered".to_string(),
                line: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_defaults() {
        let project = ProjectFacts::new("ProjectA", "src/ProjectA/ProjectA.csproj");
        assert_eq!(project.directory, "src/ProjectA");
        assert_eq!(project.root_namespace, "ProjectA");

        let root = ProjectFacts::new("Root", "Root.csproj");
        assert_eq!(root.directory, "");
    }

    #[test]
    fn nested_type_names() {
        let outer = TypeDecl::new("Acme", "Outer", TypeKind::Class, 1);
        let inner = TypeDecl::nested(&outer, "Inner", TypeKind::Struct, 2);
        assert_eq!(inner.full_name, "Acme.Outer.Inner");
        assert_eq!(inner.namespace, "Acme");
        assert!(inner.is_nested());
        assert_eq!(inner.outer_type(), Some("Acme.Outer"));
        assert!(!outer.is_nested());
    }

    #[test]
    fn identifier_ref_simple_name() {
        let r = IdentifierRef::new("global::Acme.Core.Foo", ReferenceContext::Cast, 4);
        assert_eq!(r.simple_name, "Foo");
        assert!(r.is_qualified());
        assert!(!IdentifierRef::new("Foo", ReferenceContext::Cast, 4).is_qualified());
    }

    #[test]
    fn static_provider_lists_files_per_project() {
        let provider = StaticProvider::new()
            .project(ProjectFacts::new("A", "A/A.csproj"))
            .project(ProjectFacts::new("B", "B/B.csproj"))
            .file("A/One.cs", "A/A.csproj", ParsedUnit::new())
            .broken_file("B/Two.cs", "B/B.csproj", "unbalanced braces");

        let projects = provider.list_projects(Path::new(".")).unwrap();
        let files = provider.list_files(&projects[0]).unwrap();
        assert_eq!(files, vec![FileFacts::new("A/One.cs", "A/A.csproj")]);
        assert!(provider.parse_file("B/Two.cs").is_err());
        assert!(provider.parse_file("missing.cs").is_err());
    }
}
