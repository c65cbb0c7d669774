//! Dotted-name helpers.
//!
//! Namespace and type names are compared on segment boundaries only:
//! `Acme.Core` matches `Acme.Core` and `Acme.Core.Sub`, never `Acme.Corex`.

/// Prefix C# uses to anchor a name at the global namespace.
pub const GLOBAL_ALIAS: &str = "global::";

/// True when `name` equals `prefix` or is nested under it.
pub fn is_same_or_child(name: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    name == prefix || is_strict_child(name, prefix)
}

/// True when `name` is nested strictly under `prefix`.
pub fn is_strict_child(name: &str, prefix: &str) -> bool {
    !prefix.is_empty()
        && name.len() > prefix.len()
        && name.starts_with(prefix)
        && name.as_bytes()[prefix.len()] == b'.'
}

/// Replace the dotted prefix `old` of `name` with `new`.
///
/// Returns `None` when `name` is not `old` or a child of it.
pub fn replace_prefix(name: &str, old: &str, new: &str) -> Option<String> {
    if name == old {
        Some(new.to_string())
    } else if is_strict_child(name, old) {
        Some(format!("{}{}", new, &name[old.len()..]))
    } else {
        None
    }
}

/// Parent of a dotted name, `None` for a single segment.
pub fn parent(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(head, _)| head)
}

/// Last segment of a dotted name.
pub fn last_segment(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, tail)| tail)
}

/// Join a namespace and a name; the global namespace is the empty string.
pub fn join(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        namespace.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Strip a leading `global::` qualifier.
pub fn strip_global(name: &str) -> (&str, bool) {
    match name.strip_prefix(GLOBAL_ALIAS) {
        Some(rest) => (rest, true),
        None => (name, false),
    }
}

/// The namespace and its enclosing namespaces, innermost first, ending with
/// the global namespace (`""`).
pub fn enclosing_chain(namespace: &str) -> Vec<&str> {
    let mut chain = Vec::new();
    let mut current = Some(namespace).filter(|ns| !ns.is_empty());
    while let Some(ns) = current {
        chain.push(ns);
        current = parent(ns);
    }
    chain.push("");
    chain
}

/// True when `name` is a well-formed C# identifier.
///
/// A leading `@` (verbatim identifier) is allowed. Keywords are allowed only
/// in their verbatim form.
pub fn is_valid_identifier(name: &str) -> bool {
    let (body, verbatim) = match name.strip_prefix('@') {
        Some(rest) => (rest, true),
        None => (name, false),
    };
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first.is_alphabetic()) {
        return false;
    }
    if !chars.all(|c| c == '_' || c.is_alphanumeric()) {
        return false;
    }
    verbatim || !is_reserved_keyword(body)
}

/// True when every dotted segment is a valid identifier.
pub fn is_valid_namespace(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_valid_identifier)
}

/// Reserved C# keywords (contextual keywords are valid identifiers).
pub const RESERVED_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked",
    "class", "const", "continue", "decimal", "default", "delegate", "do", "double", "else",
    "enum", "event", "explicit", "extern", "false", "finally", "fixed", "float", "for",
    "foreach", "goto", "if", "implicit", "in", "int", "interface", "internal", "is", "lock",
    "long", "namespace", "new", "null", "object", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true",
    "try", "typeof", "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual",
    "void", "volatile", "while",
];

pub fn is_reserved_keyword(word: &str) -> bool {
    RESERVED_KEYWORDS.binary_search(&word).is_ok()
}
