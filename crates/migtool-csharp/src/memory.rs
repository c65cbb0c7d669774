// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! In-memory entity provider over source text.

use std::collections::BTreeMap;
use std::path::Path;

use migtool_core::entity::{EntityProvider, FileFacts, ParseFailure, ParsedUnit, ProjectFacts, ProviderError};

use crate::extract::parse_source;

/// Projects and C# sources held in memory, parsed on demand.
///
/// ```
/// use migtool_core::entity::ProjectFacts;
/// use migtool_csharp::InMemoryProvider;
///
/// let provider = InMemoryProvider::new()
///     .project(ProjectFacts::new("ProjectA", "ProjectA/ProjectA.csproj"))
///     .source("ProjectA/Foo.cs", "ProjectA/ProjectA.csproj", "namespace ProjectA { class Foo { } }");
/// assert_eq!(provider.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    projects: Vec<ProjectFacts>,
    /// Path → (project path, source text).
    sources: BTreeMap<String, (String, String)>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project: ProjectFacts) -> Self {
        self.projects.push(project);
        self
    }

    pub fn source(mut self, path: &str, project: &str, text: &str) -> Self {
        self.sources
            .insert(path.to_string(), (project.to_string(), text.to_string()));
        self
    }

    /// Number of source files.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Source text of `path`.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.sources.get(path).map(|(_, text)| text.as_str())
    }
}

impl EntityProvider for InMemoryProvider {
    fn list_projects(&self, _solution_root: &Path) -> Result<Vec<ProjectFacts>, ProviderError> {
        Ok(self.projects.clone())
    }

    fn list_files(&self, project: &ProjectFacts) -> Result<Vec<FileFacts>, ProviderError> {
        if !self.projects.iter().any(|p| p.path == project.path) {
            return Err(ProviderError::ProjectNotFound {
                path: project.path.clone(),
            });
        }
        Ok(self
            .sources
            .iter()
            .filter(|(_, (owner, _))| *owner == project.path)
            .map(|(path, (owner, _))| FileFacts::new(path.clone(), owner.clone()))
            .collect())
    }

    fn parse_file(&self, path: &str) -> Result<ParsedUnit, ParseFailure> {
        let (_, text) = self.sources.get(path).ok_or_else(|| ParseFailure {
            path: path.to_string(),
            message: "no such file".to_string(),
            line: None,
        })?;
        parse_source(path, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> InMemoryProvider {
        InMemoryProvider::new()
            .project(ProjectFacts::new("ProjectA", "ProjectA/ProjectA.csproj"))
            .project(ProjectFacts::new("ProjectB", "ProjectB/ProjectB.csproj"))
            .source("ProjectA/Foo.cs", "ProjectA/ProjectA.csproj", "namespace ProjectA { class Foo { } }")
            .source("ProjectB/Bar.cs", "ProjectB/ProjectB.csproj", "namespace ProjectB { class Bar : Foo { } }")
            .source("ProjectB/Broken.cs", "ProjectB/ProjectB.csproj", "class Broken {")
    }

    #[test]
    fn files_belong_to_their_project() {
        let provider = provider();
        let projects = provider.list_projects(Path::new("/")).unwrap();
        let files = provider.list_files(&projects[1]).unwrap();
        assert_eq!(
            files,
            vec![
                FileFacts::new("ProjectB/Bar.cs", "ProjectB/ProjectB.csproj"),
                FileFacts::new("ProjectB/Broken.cs", "ProjectB/ProjectB.csproj"),
            ]
        );
    }

    #[test]
    fn unknown_project_is_an_error() {
        let err = provider()
            .list_files(&ProjectFacts::new("Ghost", "Ghost/Ghost.csproj"))
            .unwrap_err();
        assert!(matches!(err, ProviderError::ProjectNotFound { .. }));
    }

    #[test]
    fn parsing_goes_through_the_extractor() {
        let provider = provider();
        let unit = provider.parse_file("ProjectB/Bar.cs").unwrap();
        assert_eq!(unit.types[0].base_types, vec!["Foo"]);
        assert!(provider.parse_file("ProjectB/Broken.cs").is_err());
        assert_eq!(provider.parse_file("Nope.cs").unwrap_err().message, "no such file");
    }
}
