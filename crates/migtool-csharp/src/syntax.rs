// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Structural syntax tree over the significant tokens of a C# file.
//!
//! [`SyntaxTree::parse`] recognizes the declarations that matter for a
//! solution reorganization and skips everything else:
//!
//! - `using` directives (global, static and alias forms)
//! - block and file-scoped `namespace` declarations, folded into full names
//! - class, struct, interface, enum and record declarations, nested or not,
//!   with their type parameters, base lists and constraint clauses
//!
//! Member bodies are never parsed; they are skipped by jumping over matched
//! brackets. Bracket matching is also the well-formedness check: a file whose
//! braces, parentheses or brackets do not balance is a [`ParseError`].

use std::collections::HashMap;

use migtool_core::entity::TypeKind;
use migtool_core::namespace;
use migtool_core::patch::Span;
use thiserror::Error;

use crate::lexer::{tokenize, LexError, Token, TokenKind};

/// Source text that cannot be parsed into a tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        ParseError {
            message: message.into(),
            line,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.message, err.line)
    }
}

/// Modifiers that may precede a type keyword.
const MODIFIERS: &[&str] = &[
    "abstract", "file", "internal", "new", "partial", "private", "protected", "public",
    "readonly", "ref", "sealed", "static", "unsafe",
];

// ============================================================================
// Declarations
// ============================================================================

/// A `using` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDirective {
    /// From `using` (or `global`) through the closing `;`.
    pub span: Span,
    /// Target with trivia removed, e.g. `System.Text` or `global::Acme.Core`.
    pub target: String,
    pub target_span: Span,
    pub alias: Option<String>,
    pub is_static: bool,
    pub is_global: bool,
    pub line: u32,
    /// Enclosing namespace declaration, `None` at file level.
    pub scope: Option<usize>,
    /// First and last significant token (the `;`).
    pub tokens: (usize, usize),
}

impl UsingDirective {
    /// A plain `using Namespace;` directive.
    pub fn is_plain(&self) -> bool {
        self.alias.is_none() && !self.is_static
    }
}

/// A block or file-scoped namespace declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// Full name with enclosing declarations folded in.
    pub name: String,
    /// Name as written after the keyword.
    pub written: String,
    pub name_span: Span,
    pub line: u32,
    pub file_scoped: bool,
    pub parent: Option<usize>,
    /// Token range `[start, end)` of the name.
    pub name_tokens: (usize, usize),
    /// Token range `[start, end)` from the keyword to the end of the body.
    pub extent: (usize, usize),
}

/// One entry of a base list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseEntry {
    /// Dotted name with generic arguments removed.
    pub written: String,
    /// First token of the entry.
    pub first: usize,
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub name: String,
    pub name_span: Span,
    pub name_token: usize,
    pub kind: TypeKind,
    pub full_name: String,
    pub namespace: String,
    pub line: u32,
    pub is_partial: bool,
    pub type_parameters: Vec<String>,
    /// `<` and `>` of the type parameter list.
    pub type_parameter_list: Option<(usize, usize)>,
    pub bases: Vec<BaseEntry>,
    /// `[start, end)` token ranges of `where` clauses.
    pub constraints: Vec<(usize, usize)>,
    /// `{` and `}` of the body; `None` for `record R(...);`.
    pub body: Option<(usize, usize)>,
    /// Token range `[start, end)` including attributes and modifiers.
    pub extent: (usize, usize),
    pub outer: Option<usize>,
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone)]
pub struct SyntaxTree<'s> {
    pub source: &'s str,
    /// Significant (non-trivia) tokens.
    pub tokens: Vec<Token>,
    pub usings: Vec<UsingDirective>,
    pub namespaces: Vec<NamespaceDeclaration>,
    pub types: Vec<TypeDeclaration>,
    /// `[` and `]` of attribute sections on declarations.
    pub attribute_sections: Vec<(usize, usize)>,
    matching: HashMap<usize, usize>,
    namespace_scope: Vec<Option<usize>>,
    type_scope: Vec<Option<usize>>,
}

impl<'s> SyntaxTree<'s> {
    pub fn parse(source: &'s str) -> Result<Self, ParseError> {
        let tokens: Vec<Token> = tokenize(source)?
            .into_iter()
            .filter(|token| !token.kind.is_trivia())
            .collect();
        let matching = match_brackets(source, &tokens)?;
        let mut tree = SyntaxTree {
            source,
            tokens,
            usings: Vec::new(),
            namespaces: Vec::new(),
            types: Vec::new(),
            attribute_sections: Vec::new(),
            matching,
            namespace_scope: Vec::new(),
            type_scope: Vec::new(),
        };
        let end = tree.tokens.len();
        tree.parse_scope(0, end, String::new(), None, None)?;
        tree.assign_scopes();
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Text of token `i`, `""` past the end.
    pub fn text(&self, i: usize) -> &'s str {
        match self.tokens.get(i) {
            Some(token) => token.text(self.source),
            None => "",
        }
    }

    /// Text of the token `back` positions before `i`, `""` before the start.
    pub fn text_before(&self, i: usize, back: usize) -> &'s str {
        match i.checked_sub(back) {
            Some(k) => self.text(k),
            None => "",
        }
    }

    pub fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|token| token.kind)
    }

    pub fn span(&self, i: usize) -> Span {
        self.tokens
            .get(i)
            .map_or(Span::empty(self.source.len()), |token| token.span)
    }

    pub fn line(&self, i: usize) -> u32 {
        self.tokens.get(i).map_or(1, |token| token.line)
    }

    /// Index of the bracket closing the one at `open`.
    pub fn matching(&self, open: usize) -> Option<usize> {
        self.matching.get(&open).copied()
    }

    /// Full name of the innermost namespace containing token `i`.
    pub fn namespace_at(&self, i: usize) -> &str {
        match self.namespace_scope.get(i).copied().flatten() {
            Some(index) => &self.namespaces[index].name,
            None => "",
        }
    }

    /// Innermost type declaration containing token `i`, header included.
    pub fn type_at(&self, i: usize) -> Option<&TypeDeclaration> {
        self.type_scope
            .get(i)
            .copied()
            .flatten()
            .map(|index| &self.types[index])
    }

    /// File-level `using` directives, in source order.
    pub fn top_level_usings(&self) -> impl Iterator<Item = &UsingDirective> {
        self.usings.iter().filter(|using| using.scope.is_none())
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    fn close_of(&self, open: usize) -> Result<usize, ParseError> {
        self.matching(open)
            .ok_or_else(|| ParseError::new(format!("unmatched '{}'", self.text(open)), self.line(open)))
    }

    fn parse_scope(
        &mut self,
        start: usize,
        end: usize,
        ns: String,
        ns_index: Option<usize>,
        outer: Option<usize>,
    ) -> Result<(), ParseError> {
        let mut i = start;
        let mut attributes_from: Option<usize> = None;
        while i < end {
            let text = self.text(i);
            if text == "[" {
                let close = self.close_of(i)?;
                self.attribute_sections.push((i, close));
                attributes_from.get_or_insert(i);
                i = close + 1;
                continue;
            }
            let member_start = attributes_from.take().unwrap_or(i);
            let in_type = outer.is_some();
            i = if !in_type && self.is_using_directive(i) {
                self.parse_using(i, end, ns_index)?
            } else if !in_type && text == "namespace" {
                self.parse_namespace(i, end, &ns, ns_index)?
            } else if text == "extern" && self.text(i + 1) == "alias" {
                self.skip_member(i, end)
            } else if let Some(keyword) = self.type_keyword(i, end) {
                self.parse_type(member_start, i, keyword, end, &ns, outer)?
            } else {
                self.skip_member(i, end)
            };
        }
        Ok(())
    }

    fn is_using_directive(&self, i: usize) -> bool {
        let at = if self.text(i) == "global" { i + 1 } else { i };
        self.text(at) == "using" && !matches!(self.text(at + 1), "(" | "var" | "await")
    }

    /// Index of the type keyword if the member at `i` declares a type.
    fn type_keyword(&self, i: usize, end: usize) -> Option<usize> {
        let mut j = i;
        while j < end && MODIFIERS.contains(&self.text(j)) {
            j += 1;
        }
        match self.text(j) {
            "class" | "struct" | "interface" | "enum" => Some(j),
            "record" if self.kind(j + 1) == Some(TokenKind::Identifier) => Some(j),
            _ => None,
        }
    }

    fn parse_using(&mut self, first: usize, end: usize, scope: Option<usize>) -> Result<usize, ParseError> {
        let mut j = first;
        let is_global = self.text(j) == "global";
        if is_global {
            j += 1;
        }
        j += 1;
        let is_static = self.text(j) == "static";
        if is_static {
            j += 1;
        }
        let mut alias = None;
        if self.kind(j) == Some(TokenKind::Identifier) && self.text(j + 1) == "=" {
            alias = Some(self.text(j).trim_start_matches('@').to_string());
            j += 2;
        }
        let target_start = j;
        while j < end && self.text(j) != ";" {
            j += 1;
        }
        if j >= end || j == target_start {
            return Err(ParseError::new(
                "expected a name and ';' in using directive",
                self.line(first),
            ));
        }
        self.usings.push(UsingDirective {
            span: self.span(first).cover(&self.span(j)),
            target: (target_start..j).map(|k| self.text(k)).collect(),
            target_span: self.span(target_start).cover(&self.span(j - 1)),
            alias,
            is_static,
            is_global,
            line: self.line(first),
            scope,
            tokens: (first, j),
        });
        Ok(j + 1)
    }

    fn parse_namespace(
        &mut self,
        keyword: usize,
        end: usize,
        outer_ns: &str,
        parent: Option<usize>,
    ) -> Result<usize, ParseError> {
        let name_start = keyword + 1;
        let mut j = name_start;
        while j < end && (self.kind(j) == Some(TokenKind::Identifier) || self.text(j) == ".") {
            j += 1;
        }
        if j == name_start {
            return Err(ParseError::new("expected a namespace name", self.line(keyword)));
        }
        let written: String = (name_start..j).map(|k| self.text(k)).collect();
        let name = namespace::join(outer_ns, &written);
        let (file_scoped, body_start, body_end, next) = match self.text(j) {
            "{" => {
                let close = self.close_of(j)?;
                (false, j + 1, close, close + 1)
            }
            ";" => (true, j + 1, end, end),
            _ => {
                return Err(ParseError::new(
                    format!("expected '{{' or ';' after namespace {}", written),
                    self.line(keyword),
                ))
            }
        };
        let index = self.namespaces.len();
        self.namespaces.push(NamespaceDeclaration {
            name: name.clone(),
            written,
            name_span: self.span(name_start).cover(&self.span(j - 1)),
            line: self.line(keyword),
            file_scoped,
            parent,
            name_tokens: (name_start, j),
            extent: (keyword, next),
        });
        self.parse_scope(body_start, body_end, name, Some(index), None)?;
        Ok(next)
    }

    fn parse_type(
        &mut self,
        member_start: usize,
        modifiers_start: usize,
        keyword: usize,
        end: usize,
        ns: &str,
        outer: Option<usize>,
    ) -> Result<usize, ParseError> {
        let is_partial = (modifiers_start..keyword).any(|k| self.text(k) == "partial");
        let line = self.line(keyword);
        let mut j = keyword;
        let kind = if self.text(j) == "record" {
            j += 1;
            if matches!(self.text(j), "class" | "struct") {
                j += 1;
            }
            TypeKind::Record
        } else {
            let kind = TypeKind::from_keyword(self.text(j))
                .ok_or_else(|| ParseError::new("expected a type keyword", line))?;
            j += 1;
            kind
        };

        if self.kind(j) != Some(TokenKind::Identifier) {
            return Err(ParseError::new(
                format!("expected a name after '{}'", self.text(j - 1)),
                line,
            ));
        }
        let name_token = j;
        let name = self.text(j).trim_start_matches('@').to_string();
        j += 1;

        let mut type_parameters = Vec::new();
        let mut type_parameter_list = None;
        if self.text(j) == "<" {
            let close = self
                .angle_close(j, end)
                .ok_or_else(|| ParseError::new(format!("unclosed type parameter list of {}", name), line))?;
            for k in j + 1..close {
                if self.kind(k) == Some(TokenKind::Identifier)
                    && matches!(self.text(k + 1), "," | ">")
                {
                    type_parameters.push(self.text(k).to_string());
                }
            }
            type_parameter_list = Some((j, close));
            j = close + 1;
        }

        if self.text(j) == "(" {
            j = self.close_of(j)? + 1;
        }

        let mut bases = Vec::new();
        if self.text(j) == ":" {
            let mut k = j + 1;
            let mut entry_start = k;
            let mut angle = 0i32;
            while k < end {
                let t = self.text(k);
                if angle == 0 && matches!(t, "{" | ";" | "where") {
                    break;
                }
                match t {
                    "<" => angle += 1,
                    ">" => angle -= 1,
                    "(" | "[" => k = self.close_of(k)?,
                    "," if angle == 0 => {
                        bases.push(self.base_entry(entry_start, k));
                        entry_start = k + 1;
                    }
                    _ => {}
                }
                k += 1;
            }
            if entry_start < k {
                bases.push(self.base_entry(entry_start, k));
            }
            j = k;
        }

        let mut constraints = Vec::new();
        while self.text(j) == "where" {
            let mut k = j + 1;
            while k < end && !matches!(self.text(k), "where" | "{" | ";" | "=>") {
                if self.text(k) == "(" {
                    k = self.close_of(k)?;
                }
                k += 1;
            }
            constraints.push((j, k));
            j = k;
        }

        let (body, next) = match self.text(j) {
            "{" => {
                let close = self.close_of(j)?;
                (Some((j, close)), close + 1)
            }
            ";" => (None, j + 1),
            _ => {
                return Err(ParseError::new(
                    format!("expected '{{' in declaration of {}", name),
                    line,
                ))
            }
        };

        let full_name = match outer {
            Some(index) => format!("{}.{}", self.types[index].full_name, name),
            None => namespace::join(ns, &name),
        };
        let index = self.types.len();
        self.types.push(TypeDeclaration {
            name_span: self.span(name_token),
            name,
            name_token,
            kind,
            full_name,
            namespace: ns.to_string(),
            line,
            is_partial,
            type_parameters,
            type_parameter_list,
            bases,
            constraints,
            body,
            extent: (member_start, next),
            outer,
        });

        if let Some((open, close)) = body {
            if kind != TypeKind::Enum {
                self.parse_scope(open + 1, close, ns.to_string(), None, Some(index))?;
            }
        }
        Ok(next)
    }

    fn base_entry(&self, start: usize, stop: usize) -> BaseEntry {
        let mut written = String::new();
        for k in start..stop {
            let t = self.text(k);
            if self.kind(k) == Some(TokenKind::Identifier) || t == "." || t == "::" {
                written.push_str(t.trim_start_matches('@'));
            } else {
                break;
            }
        }
        BaseEntry {
            written,
            first: start,
        }
    }

    /// Matching `>` of a type parameter list.
    fn angle_close(&self, open: usize, end: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut k = open;
        while k < end {
            match self.text(k) {
                "<" => depth += 1,
                ">" => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(k);
                    }
                }
                "[" | "(" => k = self.matching(k)?,
                "{" | "}" | ";" => return None,
                _ => {}
            }
            k += 1;
        }
        None
    }

    /// Skip one non-type member and return the index after it.
    fn skip_member(&self, start: usize, end: usize) -> usize {
        let mut j = start;
        while j < end {
            match self.text(j) {
                ";" => return j + 1,
                "{" => {
                    j = self.matching(j).map_or(end, |close| close + 1);
                    // Property initializer: `{ get; } = value;`
                    if self.text(j) != "=" {
                        return j.min(end);
                    }
                }
                "(" | "[" => j = self.matching(j).map_or(end, |close| close + 1),
                _ => j += 1,
            }
        }
        end
    }

    fn assign_scopes(&mut self) {
        let n = self.tokens.len();
        let mut namespace_scope = vec![None; n];
        for (index, decl) in self.namespaces.iter().enumerate() {
            for slot in &mut namespace_scope[decl.extent.0..decl.extent.1.min(n)] {
                *slot = Some(index);
            }
        }
        let mut type_scope = vec![None; n];
        for (index, decl) in self.types.iter().enumerate() {
            for slot in &mut type_scope[decl.extent.0..decl.extent.1.min(n)] {
                *slot = Some(index);
            }
        }
        self.namespace_scope = namespace_scope;
        self.type_scope = type_scope;
    }
}

fn match_brackets(source: &str, tokens: &[Token]) -> Result<HashMap<usize, usize>, ParseError> {
    let mut stack: Vec<usize> = Vec::new();
    let mut pairs = HashMap::new();
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        let text = token.text(source);
        match text {
            "{" | "(" | "[" => stack.push(i),
            "}" | ")" | "]" => {
                let Some(open) = stack.pop() else {
                    return Err(ParseError::new(format!("unexpected '{}'", text), token.line));
                };
                let opener = tokens[open].text(source);
                let expected = match opener {
                    "{" => "}",
                    "(" => ")",
                    _ => "]",
                };
                if text != expected {
                    return Err(ParseError::new(
                        format!(
                            "expected '{}' to close '{}' from line {}, found '{}'",
                            expected, opener, tokens[open].line, text
                        ),
                        token.line,
                    ));
                }
                pairs.insert(open, i);
            }
            _ => {}
        }
    }
    match stack.pop() {
        Some(open) => Err(ParseError::new(
            format!("unclosed '{}'", tokens[open].text(source)),
            tokens[open].line,
        )),
        None => Ok(pairs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"global using System;
using static System.Math;
using IO = System.IO;

namespace Acme.Core
{
    using Acme.Util;

    [Serializable]
    public sealed partial class Widget<TKey, TValue> : Base<TKey>, IWidget
        where TKey : class, new()
    {
        private int count = 0;
        public string Name { get; set; } = "x";

        public void Run() { var t = new { A = 1 }; }

        public enum Mode { On, Off }

        protected struct Part { }
    }

    namespace Inner
    {
        public record Point(int X, int Y);
        interface IShape { }
    }
}
"#;

    mod declarations {
        use super::*;

        #[test]
        fn usings_are_classified() {
            let tree = SyntaxTree::parse(SAMPLE).unwrap();
            assert_eq!(tree.usings.len(), 4);
            assert!(tree.usings[0].is_global);
            assert_eq!(tree.usings[0].target, "System");
            assert!(tree.usings[1].is_static);
            assert_eq!(tree.usings[2].alias.as_deref(), Some("IO"));
            assert_eq!(tree.usings[2].target, "System.IO");
            assert_eq!(tree.usings[3].scope, Some(0));
            assert_eq!(tree.top_level_usings().count(), 3);
            assert_eq!(
                tree.usings[1].span.slice(SAMPLE),
                Some("using static System.Math;")
            );
        }

        #[test]
        fn namespaces_fold_outer_names() {
            let tree = SyntaxTree::parse(SAMPLE).unwrap();
            let names: Vec<_> = tree.namespaces.iter().map(|n| n.name.as_str()).collect();
            assert_eq!(names, vec!["Acme.Core", "Acme.Core.Inner"]);
            assert_eq!(tree.namespaces[1].written, "Inner");
            assert_eq!(tree.namespaces[1].parent, Some(0));
            assert_eq!(tree.namespaces[0].name_span.slice(SAMPLE), Some("Acme.Core"));
            assert_eq!(tree.namespaces[0].line, 5);
        }

        #[test]
        fn types_with_headers() {
            let tree = SyntaxTree::parse(SAMPLE).unwrap();
            let names: Vec<_> = tree.types.iter().map(|t| t.full_name.as_str()).collect();
            assert_eq!(
                names,
                vec![
                    "Acme.Core.Widget",
                    "Acme.Core.Widget.Mode",
                    "Acme.Core.Widget.Part",
                    "Acme.Core.Inner.Point",
                    "Acme.Core.Inner.IShape",
                ]
            );
            let widget = &tree.types[0];
            assert!(widget.is_partial);
            assert_eq!(widget.type_parameters, vec!["TKey", "TValue"]);
            let bases: Vec<_> = widget.bases.iter().map(|b| b.written.as_str()).collect();
            assert_eq!(bases, vec!["Base", "IWidget"]);
            assert_eq!(widget.constraints.len(), 1);
            assert_eq!(widget.line, 10);

            assert_eq!(tree.types[1].kind, TypeKind::Enum);
            assert_eq!(tree.types[1].outer, Some(0));
            assert_eq!(tree.types[3].kind, TypeKind::Record);
            assert!(tree.types[3].body.is_none());
            assert_eq!(tree.types[4].namespace, "Acme.Core.Inner");
        }

        #[test]
        fn file_scoped_namespace() {
            let source = "namespace Acme.Models;\n\npublic record struct Money(decimal Amount);\nclass Ledger { }\n";
            let tree = SyntaxTree::parse(source).unwrap();
            assert!(tree.namespaces[0].file_scoped);
            assert_eq!(tree.types.len(), 2);
            assert!(tree.types.iter().all(|t| t.namespace == "Acme.Models"));
        }

        #[test]
        fn statements_are_not_directives() {
            let source = "class A { void M() { using (var s = Open()) { } using var t = Open(); } }";
            let tree = SyntaxTree::parse(source).unwrap();
            assert!(tree.usings.is_empty());
            assert_eq!(tree.types.len(), 1);
        }
    }

    mod scopes {
        use super::*;

        #[test]
        fn tokens_know_their_container() {
            let tree = SyntaxTree::parse(SAMPLE).unwrap();
            let count = (0..tree.len()).find(|&i| tree.text(i) == "count").unwrap();
            assert_eq!(tree.namespace_at(count), "Acme.Core");
            assert_eq!(tree.type_at(count).unwrap().name, "Widget");

            let part_body = (0..tree.len())
                .find(|&i| tree.text(i) == "Part")
                .unwrap();
            assert_eq!(tree.type_at(part_body).unwrap().name, "Part");

            let shape = (0..tree.len()).find(|&i| tree.text(i) == "IShape").unwrap();
            assert_eq!(tree.namespace_at(shape), "Acme.Core.Inner");
            assert_eq!(tree.namespace_at(0), "");
        }

        #[test]
        fn attributes_belong_to_the_type() {
            let tree = SyntaxTree::parse(SAMPLE).unwrap();
            let attribute = (0..tree.len()).find(|&i| tree.text(i) == "Serializable").unwrap();
            assert_eq!(tree.type_at(attribute).unwrap().name, "Widget");
            assert_eq!(tree.attribute_sections.len(), 1);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn unbalanced_braces() {
            let err = SyntaxTree::parse("namespace A {\n class B {\n}\n").unwrap_err();
            assert!(err.message.contains("unclosed"));
            assert_eq!(err.line, 1);

            let err = SyntaxTree::parse("class B { void M() { ) }").unwrap_err();
            assert!(err.message.contains("expected '}'"));
        }

        #[test]
        fn missing_names() {
            assert!(SyntaxTree::parse("namespace { }").is_err());
            assert!(SyntaxTree::parse("class { }").is_err());
            assert!(SyntaxTree::parse("using ;").is_err());
        }

        #[test]
        fn lexer_errors_surface() {
            let err = SyntaxTree::parse("class A { string s = \"open\n; }").unwrap_err();
            assert_eq!(err.line, 1);
        }
    }
}
