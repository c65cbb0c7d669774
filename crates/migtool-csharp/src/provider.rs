// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Filesystem entity provider.
//!
//! Projects come from the `.sln` files directly under the solution root, or
//! from a walk for `.csproj` files when there is none. Project files are read
//! with quick-xml; source files are every `.cs` file under the project
//! directory, minus the configured exclude globs and minus directories owned
//! by a nested project.
//!
//! All paths handed out are relative to the solution root and use `/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use migtool_core::config::ScanConfig;
use migtool_core::entity::{EntityProvider, FileFacts, ParseFailure, ParsedUnit, ProjectFacts, ProviderError};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::extract::parse_source;

/// Project type GUID of solution folders, which are not projects.
const SOLUTION_FOLDER_GUID: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

const PROJECT_EXTENSION: &str = "csproj";
const SOURCE_EXTENSION: &str = "cs";

static PROJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*Project\("\{([0-9A-Fa-f-]+)\}"\)\s*=\s*"([^"]*)"\s*,\s*"([^"]*)"\s*,\s*"\{[0-9A-Fa-f-]+\}""#).unwrap()
});

/// Provider over a solution directory on disk.
///
/// The provider is bound to one solution root: project and file paths it
/// returns are relative to it, and `parse_file` resolves against it.
#[derive(Debug, Clone)]
pub struct SolutionProvider {
    root: PathBuf,
    exclude: GlobSet,
}

impl SolutionProvider {
    /// Provider for `root` with the default excludes (`bin/`, `obj/`).
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        Self::with_scan_config(root, &ScanConfig::default())
    }

    pub fn with_scan_config(root: impl Into<PathBuf>, scan: &ScanConfig) -> Result<Self, ProviderError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &scan.exclude {
            let glob = Glob::new(pattern).map_err(|e| ProviderError::Malformed {
                path: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let exclude = builder.build().map_err(|e| ProviderError::Malformed {
            path: "scan.exclude".to_string(),
            message: e.to_string(),
        })?;
        Ok(SolutionProvider {
            root: root.into(),
            exclude,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.exclude.is_match(relative)
    }

    /// Solution-relative `/` path of `path`, if it lies under `root`.
    fn relative(root: &Path, path: &Path) -> Option<String> {
        let rest = path.strip_prefix(root).ok()?;
        let parts: Vec<String> = rest
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Project file paths listed by the `.sln` files in `root`, or `None`
    /// when there is no solution file.
    fn solution_projects(&self, root: &Path) -> Result<Option<Vec<String>>, ProviderError> {
        let entries = fs::read_dir(root).map_err(|source| ProviderError::Io {
            path: root.display().to_string(),
            source,
        })?;
        let mut solutions: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("sln")))
            .collect();
        if solutions.is_empty() {
            return Ok(None);
        }
        solutions.sort();

        let mut projects = Vec::new();
        for solution in &solutions {
            let text = fs::read_to_string(solution).map_err(|source| ProviderError::Io {
                path: solution.display().to_string(),
                source,
            })?;
            let listed = parse_solution(&text);
            tracing::debug!(solution = %solution.display(), projects = listed.len(), "read solution");
            projects.extend(listed);
        }
        Ok(Some(projects))
    }

    /// Every `.csproj` under `root`, for solutions without a `.sln`.
    fn walk_projects(&self, root: &Path) -> Vec<String> {
        let mut projects: Vec<String> = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file() && has_extension(entry.path(), PROJECT_EXTENSION))
            .filter_map(|entry| Self::relative(root, entry.path()))
            .filter(|relative| !self.is_excluded(relative))
            .collect();
        projects.sort();
        projects
    }

    fn read_project(&self, root: &Path, relative: &str) -> Result<ProjectFacts, ProviderError> {
        let path = root.join(relative);
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProviderError::ProjectNotFound {
                    path: relative.to_string(),
                }
            } else {
                ProviderError::Io {
                    path: relative.to_string(),
                    source,
                }
            }
        })?;
        parse_project(relative, strip_bom(&text))
    }
}

impl EntityProvider for SolutionProvider {
    fn list_projects(&self, solution_root: &Path) -> Result<Vec<ProjectFacts>, ProviderError> {
        if !solution_root.is_dir() {
            return Err(ProviderError::RootNotFound {
                path: solution_root.display().to_string(),
            });
        }
        let listed = match self.solution_projects(solution_root)? {
            Some(listed) => listed,
            None => {
                tracing::debug!(root = %solution_root.display(), "no solution file, scanning for projects");
                self.walk_projects(solution_root)
            }
        };

        let mut projects = Vec::with_capacity(listed.len());
        for relative in listed {
            match self.read_project(solution_root, &relative) {
                Ok(project) => projects.push(project),
                Err(ProviderError::ProjectNotFound { path }) => {
                    tracing::warn!(project = %path, "project listed in solution is missing, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(projects)
    }

    fn list_files(&self, project: &ProjectFacts) -> Result<Vec<FileFacts>, ProviderError> {
        let directory = self.root.join(&project.directory);
        if !directory.is_dir() {
            return Err(ProviderError::ProjectNotFound {
                path: project.path.clone(),
            });
        }
        let mut files = Vec::new();
        let walker = WalkDir::new(&directory)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !(is_hidden(entry) || owns_project(entry)));
        for entry in walker {
            let entry = entry.map_err(|e| ProviderError::Io {
                path: project.directory.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() || !has_extension(entry.path(), SOURCE_EXTENSION) {
                continue;
            }
            let Some(relative) = Self::relative(&self.root, entry.path()) else {
                continue;
            };
            if self.is_excluded(&relative) {
                continue;
            }
            files.push(FileFacts::new(relative, project.path.clone()));
        }
        files.sort();
        tracing::debug!(project = %project.name, files = files.len(), "listed source files");
        Ok(files)
    }

    fn parse_file(&self, path: &str) -> Result<ParsedUnit, ParseFailure> {
        let text = fs::read_to_string(self.root.join(path)).map_err(|e| ParseFailure {
            path: path.to_string(),
            message: format!("cannot read file: {e}"),
            line: None,
        })?;
        parse_source(path, strip_bom(&text))
    }
}

// ============================================================================
// Solution and Project Files
// ============================================================================

/// Project file paths of a `.sln`, normalized to `/`.
pub fn parse_solution(text: &str) -> Vec<String> {
    PROJECT_LINE
        .captures_iter(text)
        .filter(|caps| !caps[1].eq_ignore_ascii_case(SOLUTION_FOLDER_GUID))
        .map(|caps| normalize(&caps[3].replace('\\', "/")))
        .filter(|path| has_extension(Path::new(path), PROJECT_EXTENSION))
        .collect()
}

/// Read a `.csproj` at solution-relative `path`.
pub fn parse_project(path: &str, xml: &str) -> Result<ProjectFacts, ProviderError> {
    let stem = Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut project = ProjectFacts::new(stem, path);
    let mut root_namespace = None;
    let mut assembly_name = None;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    // Element whose text is being read, and the open PackageReference.
    let mut element: Option<String> = None;
    let mut package: Option<(String, Option<String>)> = None;

    loop {
        let event = reader.read_event().map_err(|e| ProviderError::Malformed {
            path: path.to_string(),
            message: format!("at byte {}: {e}", reader.buffer_position()),
        })?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let attribute = |key: &[u8]| -> Option<String> {
                    e.attributes()
                        .filter_map(Result::ok)
                        .find(|attr| attr.key.as_ref() == key)
                        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
                };
                match name.as_str() {
                    "ProjectReference" => {
                        if let Some(include) = attribute(b"Include") {
                            let joined = if project.directory.is_empty() {
                                include.replace('\\', "/")
                            } else {
                                format!("{}/{}", project.directory, include.replace('\\', "/"))
                            };
                            project.project_references.push(normalize(&joined));
                        }
                    }
                    "PackageReference" => {
                        if let Some(include) = attribute(b"Include") {
                            let version = attribute(b"Version");
                            if empty {
                                project = project.with_package(include, version.as_deref());
                            } else {
                                package = Some((include, version));
                            }
                        }
                    }
                    _ if !empty => element = Some(name),
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                let text = t.unescape().map_err(|e| ProviderError::Malformed {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;
                let text = text.trim();
                match element.as_deref() {
                    Some("RootNamespace") => root_namespace = Some(text.to_string()),
                    Some("AssemblyName") => assembly_name = Some(text.to_string()),
                    Some("TargetFramework") | Some("TargetFrameworks") => {
                        for framework in text.split(';').map(str::trim).filter(|f| !f.is_empty()) {
                            if !project.target_frameworks.iter().any(|f| f == framework) {
                                project.target_frameworks.push(framework.to_string());
                            }
                        }
                    }
                    Some("Version") => {
                        if let Some((_, version)) = package.as_mut() {
                            *version = Some(text.to_string());
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"PackageReference" {
                    if let Some((name, version)) = package.take() {
                        project = project.with_package(name, version.as_deref());
                    }
                }
                element = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(root) = root_namespace.or(assembly_name).filter(|r| !r.is_empty()) {
        project.root_namespace = root;
    }
    Ok(project)
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve `.` and `..` segments of a `/` path.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// A directory below the project directory that holds its own project.
fn owns_project(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && fs::read_dir(entry.path()).is_ok_and(|mut children| {
            children.any(|child| {
                child.is_ok_and(|child| has_extension(&child.path(), PROJECT_EXTENSION))
            })
        })
}
