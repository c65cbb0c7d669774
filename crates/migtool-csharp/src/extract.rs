// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Entity extraction: one C# file to a [`ParsedUnit`].

use migtool_core::entity::{IdentifierRef, ImportDirective, NamespaceDecl, ParseFailure, ParsedUnit, TypeDecl};
use migtool_core::namespace;

use crate::references::collect_references;
use crate::syntax::{SyntaxTree, UsingDirective};

/// Parse `source` (the contents of `path`) into entity facts.
pub fn parse_source(path: &str, source: &str) -> Result<ParsedUnit, ParseFailure> {
    let tree = SyntaxTree::parse(source).map_err(|err| ParseFailure {
        path: path.to_string(),
        message: err.message,
        line: Some(err.line),
    })?;
    Ok(extract(&tree))
}

/// Entity facts of an already-parsed tree.
pub fn extract(tree: &SyntaxTree<'_>) -> ParsedUnit {
    let mut unit = ParsedUnit::new();
    for decl in &tree.namespaces {
        unit.namespaces.push(NamespaceDecl {
            name: decl.name.clone(),
            line: decl.line,
        });
    }
    for decl in &tree.types {
        unit.types.push(TypeDecl {
            name: decl.name.clone(),
            full_name: decl.full_name.clone(),
            namespace: decl.namespace.clone(),
            kind: decl.kind,
            line: decl.line,
            is_partial: decl.is_partial,
            base_types: decl.bases.iter().map(|base| base.written.clone()).collect(),
            arity: decl.type_parameters.len() as u32,
        });
    }
    unit.imports = tree.usings.iter().map(import_of).collect();
    for reference in collect_references(tree) {
        let at = reference.first_token;
        unit.references.push(
            IdentifierRef::new(reference.written, reference.context, reference.line).within(
                tree.namespace_at(at),
                tree.type_at(at).map(|decl| decl.full_name.as_str()),
            ),
        );
    }
    unit
}

fn import_of(using: &UsingDirective) -> ImportDirective {
    let target = namespace::strip_global(&using.target).0;
    let target = target.split('<').next().unwrap_or(target);
    let mut import = match &using.alias {
        Some(alias) => ImportDirective::aliased(alias.clone(), target, using.line),
        None => ImportDirective::new(target, using.line),
    };
    import.is_static = using.is_static;
    import.is_global = using.is_global;
    import
}

#[cfg(test)]
mod tests {
    use super::*;
    use migtool_core::entity::{ReferenceContext, TypeKind};

    const BAR: &str = "using Acme.Core;\nusing Gen = System.Collections.Generic.List<int>;\n\nnamespace Acme.App\n{\n    public class Bar : BarBase<Foo>\n    {\n        private Foo foo = new Foo();\n    }\n}\n";

    #[test]
    fn facts_of_a_file() {
        let unit = parse_source("ProjectB/Bar.cs", BAR).unwrap();
        assert_eq!(unit.namespaces[0].name, "Acme.App");
        assert_eq!(unit.namespaces[0].line, 4);

        let bar = &unit.types[0];
        assert_eq!(bar.full_name, "Acme.App.Bar");
        assert_eq!(bar.kind, TypeKind::Class);
        assert_eq!(bar.line, 6);
        assert_eq!(bar.base_types, vec!["BarBase"]);

        assert_eq!(unit.imports[0], ImportDirective::new("Acme.Core", 1));
        assert_eq!(unit.imports[1].namespace, "System.Collections.Generic.List");
        assert_eq!(unit.imports[1].alias.as_deref(), Some("Gen"));
    }

    #[test]
    fn references_know_their_scope() {
        let unit = parse_source("ProjectB/Bar.cs", BAR).unwrap();
        let contexts: Vec<_> = unit
            .references
            .iter()
            .map(|r| (r.written.as_str(), r.context, r.line))
            .collect();
        assert_eq!(
            contexts,
            vec![
                ("BarBase", ReferenceContext::BaseType, 6),
                ("Foo", ReferenceContext::GenericArgument, 6),
                ("Foo", ReferenceContext::Declaration, 8),
                ("Foo", ReferenceContext::ObjectCreation, 8),
            ]
        );
        assert!(unit.references.iter().all(|r| r.enclosing_namespace == "Acme.App"
            && r.enclosing_type.as_deref() == Some("Acme.App.Bar")));
    }

    #[test]
    fn generic_arity_and_global_imports() {
        let source = "global using global::System.Linq;\nnamespace N { struct Pair<TLeft, TRight> { } }";
        let unit = parse_source("Pair.cs", source).unwrap();
        assert_eq!(unit.types[0].arity, 2);
        assert!(unit.imports[0].is_global);
        assert_eq!(unit.imports[0].namespace, "System.Linq");
    }

    #[test]
    fn parse_failure_carries_path_and_line() {
        let failure = parse_source("Broken.cs", "namespace A {\nclass B {\n").unwrap_err();
        assert_eq!(failure.path, "Broken.cs");
        assert!(failure.line.is_some());
    }
}
