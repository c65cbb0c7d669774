//! Graph construction.
//!
//! Building runs in three phases:
//!
//! 1. **Enumeration**: projects and their files are listed through the
//!    provider. Any provider error here is fatal.
//! 2. **Discovery**: every file is parsed in parallel on a rayon pool.
//!    Results are collected in path order; a parse failure only marks its
//!    file. Cancellation is checked before each file.
//! 3. **Resolution**: after the barrier, type and namespace nodes are merged
//!    and every reference is resolved against the complete type table.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::config::BuildConfig;
use crate::entity::{
    EntityProvider, FileFacts, ParseFailure, ParsedUnit, ProjectFacts, ReferenceContext, TypeKind,
};
use crate::error::BuildError;
use crate::graph::resolve::{Resolution, Scope, SymbolTable};
use crate::graph::{
    BaseTypeRef, BuildDiagnostic, DiagnosticCode, FileNode, Graph, GraphParts, ImportEdge,
    InheritanceEdge, InheritanceKind, NamespaceNode, ParseStatus, ProjectNode, TypeNode, UsesEdge,
};

/// One discovered file.
struct Discovered {
    facts: FileFacts,
    parsed: Result<ParsedUnit, ParseFailure>,
}

/// Builds a [`Graph`] from an [`EntityProvider`].
pub struct GraphBuilder<'p, P: EntityProvider + ?Sized> {
    provider: &'p P,
    config: BuildConfig,
    cancel: CancellationToken,
}

impl<'p, P: EntityProvider + ?Sized> GraphBuilder<'p, P> {
    pub fn new(provider: &'p P) -> Self {
        GraphBuilder {
            provider,
            config: BuildConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the graph of the solution at `solution_root`.
    ///
    /// # Errors
    ///
    /// - `BuildError::Provider` when projects or files cannot be enumerated
    /// - `BuildError::Cancelled` when the token fires before completion
    /// - `BuildError::WorkerPool` when a sized worker pool cannot start
    pub fn build(&self, solution_root: &Path) -> Result<Graph, BuildError> {
        let mut projects = self.provider.list_projects(solution_root)?;
        projects.sort_by(|a, b| a.path.cmp(&b.path));
        projects.dedup_by(|a, b| a.path == b.path);
        tracing::debug!(projects = projects.len(), "enumerated projects");

        let mut parts = GraphParts::default();
        let mut files = Vec::new();
        for project in &projects {
            self.cancel.check()?;
            let mut listed = self.provider.list_files(project)?;
            listed.sort();
            files.extend(listed);
        }
        let files = dedup_files(files, &mut parts);

        let discovered = self.discover(&files)?;
        self.cancel.check()?;
        tracing::debug!(files = discovered.len(), "discovery complete");

        add_projects(&mut parts, &projects);
        let units = add_files(&mut parts, discovered);
        self.resolve(&mut parts, &units);

        let graph = Graph::from_parts(parts);
        let stats = graph.stats();
        tracing::info!(
            projects = stats.projects,
            files = stats.files,
            types = stats.types,
            uses = stats.uses_edges,
            parse_failures = stats.parse_failures,
            "graph built"
        );
        Ok(graph)
    }

    /// Parse every file in parallel, preserving input order.
    fn discover(&self, files: &[FileFacts]) -> Result<Vec<Discovered>, BuildError> {
        let run = || -> Result<Vec<Discovered>, BuildError> {
            files
                .par_iter()
                .map(|facts| {
                    self.cancel.check()?;
                    let parsed = self.provider.parse_file(&facts.path);
                    if let Err(failure) = &parsed {
                        tracing::debug!(path = %facts.path, error = %failure.message, "parse failed");
                    }
                    Ok(Discovered {
                        facts: facts.clone(),
                        parsed,
                    })
                })
                .collect()
        };

        match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| BuildError::WorkerPool {
                    message: e.to_string(),
                })?
                .install(run),
            None => run(),
        }
    }

    fn resolve(&self, parts: &mut GraphParts, units: &BTreeMap<String, ParsedUnit>) {
        let symbols = SymbolTable::new(&parts.types);
        let mut uses = Vec::new();
        let mut inheritance = Vec::new();
        let mut imports = Vec::new();
        let mut diagnostics = Vec::new();
        let mut base_updates: BTreeMap<String, Vec<(String, Option<String>)>> = BTreeMap::new();

        for (path, unit) in units {
            for import in &unit.imports {
                if import.is_plain() && parts.namespaces.contains_key(&import.namespace) {
                    imports.push(ImportEdge {
                        file: path.clone(),
                        namespace: import.namespace.clone(),
                        line: import.line,
                    });
                }
            }

            for reference in &unit.references {
                let scope = Scope {
                    namespace: &reference.enclosing_namespace,
                    enclosing_type: reference.enclosing_type.as_deref(),
                    imports: &unit.imports,
                };
                match symbols.resolve(&reference.written, reference.context, &scope) {
                    Resolution::Resolved { key, written } => {
                        // References outside any type declaration (assembly
                        // attributes, top-level statements) carry no source type.
                        let Some(from) = reference.enclosing_type.as_ref() else {
                            continue;
                        };
                        if *from == key || !parts.types.contains_key(from) {
                            continue;
                        }
                        uses.push(UsesEdge {
                            file: path.clone(),
                            line: reference.line,
                            from: from.clone(),
                            to: key,
                            context: reference.context,
                            written,
                        });
                    }
                    Resolution::Ambiguous(candidates) => {
                        if self.config.report_ambiguous_references {
                            diagnostics.push(ambiguous(path, reference.line, &reference.written, candidates));
                        }
                    }
                    Resolution::Unresolved => {}
                }
            }

            for decl in &unit.types {
                let scope = Scope {
                    namespace: &decl.namespace,
                    enclosing_type: decl.outer_type(),
                    imports: &unit.imports,
                };
                for base in &decl.base_types {
                    let resolved = match symbols.resolve(base, ReferenceContext::BaseType, &scope) {
                        Resolution::Resolved { key, .. } if key != decl.full_name => Some(key),
                        Resolution::Ambiguous(candidates) => {
                            if self.config.report_ambiguous_references {
                                diagnostics.push(ambiguous(path, decl.line, base, candidates));
                            }
                            None
                        }
                        _ => None,
                    };
                    if let Some(parent) = &resolved {
                        let kind = match parts.types.get(parent).map(|node| node.kind) {
                            Some(TypeKind::Interface) => InheritanceKind::Implements,
                            _ => InheritanceKind::Inherits,
                        };
                        inheritance.push(InheritanceEdge {
                            child: decl.full_name.clone(),
                            parent: parent.clone(),
                            kind,
                        });
                    }
                    base_updates
                        .entry(decl.full_name.clone())
                        .or_default()
                        .push((base.clone(), resolved));
                }
            }
        }

        for (key, bases) in base_updates {
            if let Some(node) = parts.types.get_mut(&key) {
                for (written, resolved) in bases {
                    if node.base_types.iter().any(|b| b.written == written) {
                        continue;
                    }
                    node.has_unresolved_base |= resolved.is_none();
                    node.base_types.push(BaseTypeRef { written, resolved });
                }
            }
        }

        let ambiguous_count = diagnostics.len();
        if ambiguous_count > 0 {
            tracing::warn!(count = ambiguous_count, "ambiguous type references skipped");
        }

        parts.uses = uses;
        parts.inheritance = inheritance;
        parts.imports = imports;
        parts.diagnostics.extend(diagnostics);
    }
}

fn ambiguous(path: &str, line: u32, written: &str, candidates: Vec<String>) -> BuildDiagnostic {
    BuildDiagnostic {
        code: DiagnosticCode::AmbiguousReference,
        path: Some(path.to_string()),
        line: Some(line),
        message: format!(
            "'{}' matches {} types: {}",
            written,
            candidates.len(),
            candidates.join(", ")
        ),
        name: Some(written.to_string()),
        candidates,
    }
}

/// Keep the first listing of each path (projects are visited in path order).
fn dedup_files(files: Vec<FileFacts>, parts: &mut GraphParts) -> Vec<FileFacts> {
    let mut seen = BTreeSet::new();
    let mut unique = Vec::with_capacity(files.len());
    for facts in files {
        if seen.insert(facts.path.clone()) {
            unique.push(facts);
        } else {
            tracing::warn!(path = %facts.path, project = %facts.project, "file listed by several projects");
            parts.diagnostics.push(BuildDiagnostic {
                code: DiagnosticCode::DuplicateFile,
                path: Some(facts.path.clone()),
                line: None,
                message: format!("also listed by {}; first owner kept", facts.project),
                name: None,
                candidates: Vec::new(),
            });
        }
    }
    unique.sort();
    unique
}

fn add_projects(parts: &mut GraphParts, projects: &[ProjectFacts]) {
    let known: BTreeSet<&str> = projects.iter().map(|p| p.path.as_str()).collect();
    for project in projects {
        let mut node = ProjectNode {
            name: project.name.clone(),
            path: project.path.clone(),
            directory: project.directory.clone(),
            root_namespace: project.root_namespace.clone(),
            target_frameworks: project.target_frameworks.iter().cloned().collect(),
            references: BTreeSet::new(),
            unresolved_references: Vec::new(),
            package_references: project.package_references.clone(),
            files: BTreeSet::new(),
        };
        for reference in &project.project_references {
            if known.contains(reference.as_str()) && *reference != project.path {
                node.references.insert(reference.clone());
            } else {
                parts.diagnostics.push(BuildDiagnostic {
                    code: DiagnosticCode::UnresolvedProjectReference,
                    path: Some(project.path.clone()),
                    line: None,
                    message: format!("project reference {} is not part of the solution", reference),
                    name: Some(reference.clone()),
                    candidates: Vec::new(),
                });
                node.unresolved_references.push(reference.clone());
            }
        }
        parts.projects.insert(node.path.clone(), node);
    }
}

/// Create file, namespace and type nodes; return parsed units by path.
fn add_files(parts: &mut GraphParts, discovered: Vec<Discovered>) -> BTreeMap<String, ParsedUnit> {
    let mut units = BTreeMap::new();

    for Discovered { facts, parsed } in discovered {
        if let Some(project) = parts.projects.get_mut(&facts.project) {
            project.files.insert(facts.path.clone());
        }

        let unit = match parsed {
            Ok(unit) => unit,
            Err(failure) => {
                parts.diagnostics.push(BuildDiagnostic {
                    code: DiagnosticCode::ParseFailure,
                    path: Some(facts.path.clone()),
                    line: failure.line,
                    message: failure.message.clone(),
                    name: None,
                    candidates: Vec::new(),
                });
                parts.files.insert(
                    facts.path.clone(),
                    FileNode {
                        path: facts.path,
                        project: facts.project,
                        namespaces: Vec::new(),
                        imports: Vec::new(),
                        types: BTreeSet::new(),
                        status: ParseStatus::Failed {
                            message: failure.message,
                        },
                    },
                );
                continue;
            }
        };

        let mut file_types = BTreeSet::new();
        for decl in &unit.types {
            file_types.insert(decl.full_name.clone());

            let namespace = parts
                .namespaces
                .entry(decl.namespace.clone())
                .or_insert_with(|| NamespaceNode {
                    name: decl.namespace.clone(),
                    ..NamespaceNode::default()
                });
            namespace.types.insert(decl.full_name.clone());
            namespace.files.insert(facts.path.clone());
            namespace.projects.insert(facts.project.clone());

            let node = parts
                .types
                .entry(decl.full_name.clone())
                .or_insert_with(|| TypeNode {
                    full_name: decl.full_name.clone(),
                    name: decl.name.clone(),
                    namespace: decl.namespace.clone(),
                    kind: decl.kind,
                    files: BTreeSet::new(),
                    base_types: Vec::new(),
                    has_unresolved_base: false,
                    is_partial: false,
                    outer: decl.outer_type().map(str::to_string),
                    arity: decl.arity,
                });
            node.files.insert(facts.path.clone());
            node.is_partial |= decl.is_partial;
        }

        for decl in &unit.namespaces {
            let namespace = parts
                .namespaces
                .entry(decl.name.clone())
                .or_insert_with(|| NamespaceNode {
                    name: decl.name.clone(),
                    ..NamespaceNode::default()
                });
            namespace.files.insert(facts.path.clone());
            namespace.projects.insert(facts.project.clone());
        }

        parts.files.insert(
            facts.path.clone(),
            FileNode {
                path: facts.path.clone(),
                project: facts.project,
                namespaces: unit.namespaces.clone(),
                imports: unit.imports.clone(),
                types: file_types,
                status: ParseStatus::Parsed,
            },
        );
        units.insert(facts.path, unit);
    }

    units
}
