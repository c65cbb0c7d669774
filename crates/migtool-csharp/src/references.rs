// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Detection of names used in type positions.
//!
//! Whether an identifier denotes a type is decided from its syntactic
//! surroundings alone, against a fixed set of contexts:
//!
//! | Context | Shape |
//! |---------|-------|
//! | `Attribute` | `[Name]`, `[Name(...)]`, `[assembly: Name]` |
//! | `BaseType` | an entry of a declaration's base list |
//! | `Constraint` | `where T : Name` |
//! | `ObjectCreation` | `new Name(...)` |
//! | `TypeOf` | `typeof(Name)`, `default(Name)`, `sizeof(Name)` |
//! | `TypePattern` | `is Name`, `as Name`, `case Name x:` |
//! | `Cast` | `(Name)expr` |
//! | `Declaration` | `Name x = ...`, parameters, fields, return types |
//! | `GenericArgument` | anything inside `<...>` after a name |
//! | `StaticMemberAccess` | `Name.Member` where `Name` is not a declared variable |
//!
//! Names inside `using` directives, namespace names and declared type names
//! are never references.

use std::collections::HashSet;

use migtool_core::entity::ReferenceContext;
use migtool_core::namespace;
use migtool_core::patch::Span;

use crate::lexer::TokenKind;
use crate::syntax::SyntaxTree;

/// Contextual keywords that never start a type name.
const CONTEXTUAL: &[&str] = &[
    "add", "alias", "and", "args", "ascending", "async", "await", "by", "descending", "dynamic",
    "equals", "file", "from", "get", "group", "init", "into", "join", "let", "managed", "nameof",
    "not", "notnull", "on", "or", "orderby", "partial", "record", "remove", "required", "scoped",
    "select", "set", "unmanaged", "value", "var", "when", "where", "with", "yield",
];

/// Predefined type keywords; a name after one of these is a declared variable.
const PREDEFINED: &[&str] = &[
    "bool", "byte", "char", "decimal", "double", "float", "int", "long", "object", "sbyte",
    "short", "string", "uint", "ulong", "ushort",
];

/// Tokens that may follow the variable name of a declaration.
const DECLARATION_FOLLOW: &[&str] = &["=", ";", ",", ")", "{", "(", "=>", "in", "<", ".", ":"];

/// Keywords that may follow a parenthesized cast.
const CAST_OPERAND_KEYWORDS: &[&str] = &[
    "base", "checked", "default", "false", "new", "null", "sizeof", "stackalloc", "this", "true",
    "typeof", "unchecked",
];

/// Statement keywords whose parentheses are never a cast.
const STATEMENT_KEYWORDS: &[&str] = &[
    "catch", "fixed", "for", "foreach", "if", "lock", "switch", "using", "when", "while",
];

/// One dotted segment of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Identifier text, verbatim `@` removed.
    pub text: String,
    pub span: Span,
}

/// A name used in a type position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    /// Dotted text without generic arguments; may start with `global::`.
    pub written: String,
    pub segments: Vec<Segment>,
    /// Starts with `global::`.
    pub anchored: bool,
    pub context: ReferenceContext,
    pub line: u32,
    /// First significant token (`global` when anchored).
    pub first_token: usize,
}

impl TypeReference {
    /// From the first token through the last segment.
    pub fn span(&self, tree: &SyntaxTree<'_>) -> Span {
        let start = tree.span(self.first_token);
        match self.segments.last() {
            Some(last) => start.cover(&last.span),
            None => start,
        }
    }
}

/// A dotted name starting at some token.
struct NameMatch {
    first: usize,
    segments: Vec<usize>,
    anchored: bool,
    written: String,
    generic_lists: Vec<(usize, usize)>,
    /// Token after the name, generic arguments included.
    end: usize,
}

/// Collect every type reference in the file, in token order.
pub fn collect_references(tree: &SyntaxTree<'_>) -> Vec<TypeReference> {
    let n = tree.len();
    let excluded = excluded_tokens(tree);
    let mut in_generic = vec![false; n];
    let mut found: Vec<(NameMatch, ReferenceContext)> = Vec::new();

    for i in 0..n {
        if excluded[i] || !starts_name(tree, i) {
            continue;
        }
        let Some(name) = parse_name(tree, i) else {
            continue;
        };
        for &(open, close) in &name.generic_lists {
            for slot in &mut in_generic[open + 1..close] {
                *slot = true;
            }
        }
        if let Some(context) = classify(tree, &name, &in_generic) {
            found.push((name, context));
        }
    }

    let declared = declared_names(tree, &found);
    found
        .into_iter()
        .filter(|(name, context)| {
            *context != ReferenceContext::StaticMemberAccess
                || !declared.contains(tree.text(name.segments[0]))
        })
        .map(|(name, context)| TypeReference {
            segments: name
                .segments
                .iter()
                .map(|&k| Segment {
                    text: tree.text(k).trim_start_matches('@').to_string(),
                    span: tree.span(k),
                })
                .collect(),
            written: name.written,
            anchored: name.anchored,
            context,
            line: tree.line(name.first),
            first_token: name.first,
        })
        .collect()
}

/// Tokens that belong to directives and declared names.
fn excluded_tokens(tree: &SyntaxTree<'_>) -> Vec<bool> {
    let mut excluded = vec![false; tree.len()];
    for using in &tree.usings {
        for slot in &mut excluded[using.tokens.0..=using.tokens.1] {
            *slot = true;
        }
    }
    for decl in &tree.namespaces {
        for slot in &mut excluded[decl.name_tokens.0..decl.name_tokens.1] {
            *slot = true;
        }
    }
    for decl in &tree.types {
        excluded[decl.name_token] = true;
        if let Some((open, close)) = decl.type_parameter_list {
            for slot in &mut excluded[open..=close] {
                *slot = true;
            }
        }
    }
    excluded
}

fn is_name_token(tree: &SyntaxTree<'_>, i: usize) -> bool {
    tree.kind(i) == Some(TokenKind::Identifier) && !namespace::is_reserved_keyword(tree.text(i))
}

fn starts_name(tree: &SyntaxTree<'_>, i: usize) -> bool {
    if !is_name_token(tree, i) {
        return false;
    }
    if matches!(tree.text_before(i, 1), "." | "::" | "->") {
        return false;
    }
    let text = tree.text(i);
    if text == "global" {
        return tree.text(i + 1) == "::";
    }
    !CONTEXTUAL.contains(&text)
}

fn parse_name(tree: &SyntaxTree<'_>, first: usize) -> Option<NameMatch> {
    let mut i = first;
    let mut written = String::new();
    let anchored = tree.text(i) == "global" && tree.text(i + 1) == "::";
    if anchored {
        written.push_str(namespace::GLOBAL_ALIAS);
        i += 2;
    }
    if !is_name_token(tree, i) {
        return None;
    }

    let mut segments = Vec::new();
    let mut generic_lists = Vec::new();
    loop {
        segments.push(i);
        written.push_str(tree.text(i).trim_start_matches('@'));
        let mut j = i + 1;
        if tree.text(j) == "<" {
            if let Some(close) = generic_close(tree, j) {
                generic_lists.push((j, close));
                j = close + 1;
            }
        }
        let separator = tree.text(j);
        let alias_qualified = separator == "::" && segments.len() == 1 && !anchored;
        if (separator == "." || alias_qualified) && is_name_token(tree, j + 1) {
            // `Alias::Type` resolves like `Alias.Type`.
            written.push('.');
            i = j + 1;
            continue;
        }
        return Some(NameMatch {
            first,
            segments,
            anchored,
            written,
            generic_lists,
            end: j,
        });
    }
}

/// Closing `>` of a generic argument list, if the tokens form one.
fn generic_close(tree: &SyntaxTree<'_>, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for k in open..tree.len() {
        match tree.text(k) {
            "<" => depth += 1,
            ">" => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            "," | "." | "::" | "?" | "[" | "]" | "*" | "(" | ")" => {}
            _ if tree.kind(k) == Some(TokenKind::Identifier) => {}
            _ => return None,
        }
    }
    None
}

fn classify(tree: &SyntaxTree<'_>, name: &NameMatch, in_generic: &[bool]) -> Option<ReferenceContext> {
    let first = name.first;
    let prev = tree.text_before(first, 1);
    let prev2 = tree.text_before(first, 2);
    let after = tree.text(name.end);

    if in_generic[first] {
        return Some(ReferenceContext::GenericArgument);
    }
    if after != ":" && is_attribute_name(tree, first) {
        return Some(ReferenceContext::Attribute);
    }
    if tree
        .types
        .iter()
        .any(|decl| decl.bases.iter().any(|base| base.first == first))
    {
        return Some(ReferenceContext::BaseType);
    }
    if matches!(prev, ":" | ",")
        && tree
            .types
            .iter()
            .flat_map(|decl| decl.constraints.iter())
            .any(|&(start, end)| start < first && first < end)
    {
        return Some(ReferenceContext::Constraint);
    }

    match prev {
        "new" => return Some(ReferenceContext::ObjectCreation),
        "is" | "as" => return Some(ReferenceContext::TypePattern),
        "not" if prev2 == "is" => return Some(ReferenceContext::TypePattern),
        "case" if is_designation(tree, name.end) || (after == ":" && name.segments.len() == 1) => {
            return Some(ReferenceContext::TypePattern)
        }
        "(" if matches!(prev2, "typeof" | "default" | "sizeof") && after == ")" => {
            return Some(ReferenceContext::TypeOf)
        }
        "(" if prev2 == "catch" && matches!(after, ")" | "when") => {
            return Some(ReferenceContext::Declaration)
        }
        "(" if after == ")" && is_cast(tree, first, name.end) => {
            return Some(ReferenceContext::Cast)
        }
        _ => {}
    }

    if declared_after(tree, name.end).is_some() {
        return Some(ReferenceContext::Declaration);
    }
    if name.segments.len() > 1 {
        return Some(ReferenceContext::StaticMemberAccess);
    }
    None
}

/// `[Name`, `[Name, Other` and `[target: Name` inside an attribute section,
/// or `[Name]` on a parameter.
fn is_attribute_name(tree: &SyntaxTree<'_>, first: usize) -> bool {
    let prev = tree.text_before(first, 1);
    let section = tree
        .attribute_sections
        .iter()
        .find(|&&(open, close)| open < first && first < close);
    if let Some(&(open, _)) = section {
        let depth: i32 = (open + 1..first)
            .map(|k| match tree.text(k) {
                "(" => 1,
                ")" => -1,
                _ => 0,
            })
            .sum();
        return depth == 0
            && (prev == "[" || prev == "," || (prev == ":" && first >= 3 && first - 3 == open));
    }
    prev == "[" && matches!(tree.text_before(first, 2), "(" | ",")
}

/// A designation after a pattern type: `case Foo f:`.
fn is_designation(tree: &SyntaxTree<'_>, k: usize) -> bool {
    is_name_token(tree, k) && matches!(tree.text(k + 1), ":" | "when" | ")" | "&&" | "&")
}

fn is_cast(tree: &SyntaxTree<'_>, first: usize, close: usize) -> bool {
    let before_paren = tree.text_before(first, 2);
    if STATEMENT_KEYWORDS.contains(&before_paren) {
        return false;
    }
    // `Call(x)`, `Generic<T>(x)`, `a[i](x)`, `f()(x)`
    if (first >= 2 && is_name_token(tree, first - 2)) || matches!(before_paren, ">" | "]" | ")") {
        return false;
    }
    let operand = close + 1;
    match tree.kind(operand) {
        Some(TokenKind::Number | TokenKind::String | TokenKind::Char) => true,
        Some(TokenKind::Identifier) => {
            let text = tree.text(operand);
            !namespace::is_reserved_keyword(text) || CAST_OPERAND_KEYWORDS.contains(&text)
        }
        Some(TokenKind::Punct) => matches!(tree.text(operand), "(" | "!" | "~"),
        _ => false,
    }
}

/// Index of the variable name declared after a type ending at `k`.
fn declared_after(tree: &SyntaxTree<'_>, k: usize) -> Option<usize> {
    let mut k = k;
    loop {
        match tree.text(k) {
            "?" | "*" => k += 1,
            "[" if matches!(tree.text(k + 1), "]" | ",") => k = tree.matching(k)? + 1,
            _ => break,
        }
    }
    if !is_name_token(tree, k) || CONTEXTUAL.contains(&tree.text(k)) {
        return None;
    }
    DECLARATION_FOLLOW
        .contains(&tree.text(k + 1))
        .then_some(k)
}

/// Names bound as variables, parameters, fields or members anywhere in the file.
fn declared_names<'s>(tree: &SyntaxTree<'s>, found: &[(NameMatch, ReferenceContext)]) -> HashSet<&'s str> {
    let mut declared = HashSet::new();
    for (name, context) in found {
        if *context == ReferenceContext::Declaration {
            if let Some(k) = declared_after(tree, name.end) {
                declared.insert(tree.text(k));
            }
        }
    }
    for i in 0..tree.len() {
        let text = tree.text(i);
        if PREDEFINED.contains(&text) || text == "var" || text == "dynamic" {
            if let Some(k) = declared_after(tree, i + 1) {
                declared.insert(tree.text(k));
            }
        }
        if text == "=>" {
            let before = i.saturating_sub(1);
            if is_name_token(tree, before) {
                declared.insert(tree.text(before));
            } else if tree.text(before) == ")" {
                if let Some(open) = (0..before).rev().find(|&o| tree.matching(o) == Some(before)) {
                    for p in open + 1..before {
                        if is_name_token(tree, p) && matches!(tree.text(p + 1), "," | ")") {
                            declared.insert(tree.text(p));
                        }
                    }
                }
            }
        }
    }
    declared
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(source: &str) -> Vec<(String, ReferenceContext)> {
        let tree = SyntaxTree::parse(source).unwrap();
        collect_references(&tree)
            .into_iter()
            .map(|r| (r.written, r.context))
            .collect()
    }

    fn has(source: &str, written: &str, context: ReferenceContext) -> bool {
        refs(source)
            .iter()
            .any(|(w, c)| w == written && *c == context)
    }

    fn names(source: &str) -> Vec<String> {
        refs(source).into_iter().map(|(w, _)| w).collect()
    }

    mod contexts {
        use super::*;
        use ReferenceContext::*;

        #[test]
        fn declarations_and_headers() {
            let source = "class A : Base, IThing where T : IComparable { Widget w; Gadget? g = null; Part[] parts; Result Run(Input input) { return null; } }";
            assert!(has(source, "Base", BaseType));
            assert!(has(source, "IThing", BaseType));
            assert!(has(source, "IComparable", Constraint));
            assert!(has(source, "Widget", Declaration));
            assert!(has(source, "Gadget", Declaration));
            assert!(has(source, "Part", Declaration));
            assert!(has(source, "Result", Declaration));
            assert!(has(source, "Input", Declaration));
        }

        #[test]
        fn expressions() {
            let source = "class A { void M(object o) { var x = new Foo(); var y = (Bar)o; var t = typeof(Baz); if (o is Qux q) { } var s = o as Quux; var d = default(Corge); } }";
            assert!(has(source, "Foo", ObjectCreation));
            assert!(has(source, "Bar", Cast));
            assert!(has(source, "Baz", TypeOf));
            assert!(has(source, "Qux", TypePattern));
            assert!(has(source, "Quux", TypePattern));
            assert!(has(source, "Corge", TypeOf));
        }

        #[test]
        fn generics_and_attributes() {
            let source = "[Serializable]\nclass A { [Obsolete(\"x\")] List<Item> items; Dictionary<Key, List<Value>> map; void M([FromBody] Body b) { } }";
            assert!(has(source, "Serializable", Attribute));
            assert!(has(source, "Obsolete", Attribute));
            assert!(has(source, "List", Declaration));
            assert!(has(source, "Item", GenericArgument));
            assert!(has(source, "Key", GenericArgument));
            assert!(has(source, "Value", GenericArgument));
            assert!(has(source, "FromBody", Attribute));
            assert!(has(source, "Body", Declaration));
        }

        #[test]
        fn static_member_access() {
            let source = "class A { void M(Widget widget) { Helpers.Run(); widget.Spin(); Acme.Core.Util.Go(); } }";
            assert!(has(source, "Helpers.Run", StaticMemberAccess));
            assert!(has(source, "Acme.Core.Util.Go", StaticMemberAccess));
            assert!(!names(source).iter().any(|n| n.starts_with("widget")));
        }

        #[test]
        fn qualified_forms() {
            let source = "class A { global::Acme.Core.Foo f; Alias::Bar b; Outer<int>.Inner i; }";
            assert!(has(source, "global::Acme.Core.Foo", Declaration));
            assert!(has(source, "Alias.Bar", Declaration));
            assert!(has(source, "Outer.Inner", Declaration));
        }

        #[test]
        fn case_patterns() {
            let source = "class A { void M(object o) { switch (o) { case Circle c: break; case Square: break; } } }";
            assert!(has(source, "Circle", TypePattern));
            assert!(has(source, "Square", TypePattern));
        }
    }

    mod exclusions {
        use super::*;

        #[test]
        fn directives_and_declared_names_are_not_references() {
            let source = "using Acme.Core;\nnamespace Acme.App { class Bar<T> { } }";
            assert!(names(source).is_empty());
        }

        #[test]
        fn calls_and_statements_are_not_casts() {
            let source = "class A { void M(bool ok) { if (ok) Run(); Call(x) ; while (ok) Go(); } }";
            assert!(refs(source).iter().all(|(_, c)| *c != ReferenceContext::Cast));
        }

        #[test]
        fn contextual_keywords_are_skipped() {
            let source = "class A { int P { get; set; } async Task M() { var v = await Load(); } }";
            let found = names(source);
            assert!(found.contains(&"Task".to_string()));
            assert!(!found.iter().any(|n| n == "var" || n == "get" || n == "await"));
        }

        #[test]
        fn lambda_parameters_are_variables() {
            let source = "class A { void M() { Apply(item => item.Count); Each((a, b) => a.Merge(b)); } }";
            assert!(!names(source).iter().any(|n| n.starts_with("item") || n.starts_with("a.")));
        }

        #[test]
        fn comparisons_are_not_generics() {
            let source = "class A { void M(int a, int b) { for (int i = 0; i < a; i++) { } var c = a < b && b > a; } }";
            assert!(refs(source)
                .iter()
                .all(|(_, c)| *c != ReferenceContext::GenericArgument));
        }
    }

    #[test]
    fn segments_carry_spans() {
        let source = "class A { Acme.Foo f; }";
        let tree = SyntaxTree::parse(source).unwrap();
        let found = collect_references(&tree);
        assert_eq!(found.len(), 1);
        let segments: Vec<_> = found[0]
            .segments
            .iter()
            .map(|s| s.span.slice(source).unwrap())
            .collect();
        assert_eq!(segments, vec!["Acme", "Foo"]);
        assert_eq!(found[0].span(&tree).slice(source), Some("Acme.Foo"));
    }
}
