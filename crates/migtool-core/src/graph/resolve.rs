//! Name resolution against the discovered types.
//!
//! Resolution runs once, after every file has been discovered. It maps a name
//! as written at a reference site to a type key following C# lookup order:
//!
//! 1. `global::` names match full names exactly.
//! 2. Qualified names: exact full name, using-alias expansion of the first
//!    segment, nesting in the enclosing types, then relative to each
//!    enclosing namespace, then relative to each imported namespace.
//! 3. Simple names: using aliases, nested types of the enclosing types,
//!    the enclosing namespace chain innermost first, then imported
//!    namespaces. Only the import level can be ambiguous.
//!
//! Attribute names also try the `Attribute` suffix. Generic arity is not
//! part of a key.

use std::collections::{BTreeMap, BTreeSet};

use crate::entity::{ImportDirective, ReferenceContext};
use crate::graph::TypeNode;
use crate::namespace;

/// Outcome of resolving one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one type. `written` is the part of the name that denotes it.
    Resolved { key: String, written: String },
    /// Several types match at the deciding level (sorted keys).
    Ambiguous(Vec<String>),
    /// No type in the solution; external or not a type at all.
    Unresolved,
}

/// Lexical position of a reference.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub namespace: &'a str,
    pub enclosing_type: Option<&'a str>,
    pub imports: &'a [ImportDirective],
}

pub(crate) struct SymbolTable<'g> {
    types: &'g BTreeMap<String, TypeNode>,
}

impl<'g> SymbolTable<'g> {
    pub fn new(types: &'g BTreeMap<String, TypeNode>) -> Self {
        SymbolTable { types }
    }

    pub fn resolve(&self, written: &str, context: ReferenceContext, scope: &Scope<'_>) -> Resolution {
        if context != ReferenceContext::StaticMemberAccess {
            return self.resolve_name(written, context == ReferenceContext::Attribute, scope);
        }

        // `A.B.C.Member`: the extractor cannot tell where the type ends, so
        // try the longest prefix first.
        let mut candidate = written;
        loop {
            match self.resolve_name(candidate, false, scope) {
                Resolution::Unresolved => {}
                found => return found,
            }
            match namespace::parent(candidate) {
                Some(shorter) => candidate = shorter,
                None => return Resolution::Unresolved,
            }
        }
    }

    fn resolve_name(&self, written: &str, attribute: bool, scope: &Scope<'_>) -> Resolution {
        let (name, anchored) = namespace::strip_global(written);
        let mut variants = vec![name.to_string()];
        if attribute && !name.ends_with("Attribute") {
            variants.push(format!("{}Attribute", name));
        }

        for variant in &variants {
            let found = if anchored {
                self.exact(variant, written)
            } else if variant.contains('.') {
                self.resolve_qualified(variant, written, scope)
            } else {
                self.resolve_simple(variant, written, scope)
            };
            if found != Resolution::Unresolved {
                return found;
            }
        }
        Resolution::Unresolved
    }

    fn exact(&self, key: &str, written: &str) -> Resolution {
        if self.types.contains_key(key) {
            Resolution::Resolved {
                key: key.to_string(),
                written: written.to_string(),
            }
        } else {
            Resolution::Unresolved
        }
    }

    fn resolve_qualified(&self, name: &str, written: &str, scope: &Scope<'_>) -> Resolution {
        if self.types.contains_key(name) {
            return self.exact(name, written);
        }

        if let Some((head, tail)) = name.split_once('.') {
            if let Some(alias) = scope
                .imports
                .iter()
                .find(|import| import.alias.as_deref() == Some(head))
            {
                return self.exact(&format!("{}.{}", alias.namespace, tail), written);
            }
        }

        for outer in self.type_chain(scope.enclosing_type) {
            let found = self.exact(&namespace::join(outer, name), written);
            if found != Resolution::Unresolved {
                return found;
            }
        }

        for ns in namespace::enclosing_chain(scope.namespace) {
            let found = self.exact(&namespace::join(ns, name), written);
            if found != Resolution::Unresolved {
                return found;
            }
        }

        self.from_imports(name, written, scope)
    }

    fn resolve_simple(&self, name: &str, written: &str, scope: &Scope<'_>) -> Resolution {
        if let Some(alias) = scope
            .imports
            .iter()
            .find(|import| !import.is_static && import.alias.as_deref() == Some(name))
        {
            return self.exact(&alias.namespace, written);
        }

        for outer in self.type_chain(scope.enclosing_type) {
            let found = self.exact(&namespace::join(outer, name), written);
            if found != Resolution::Unresolved {
                return found;
            }
        }

        for ns in namespace::enclosing_chain(scope.namespace) {
            let found = self.exact(&namespace::join(ns, name), written);
            if found != Resolution::Unresolved {
                return found;
            }
        }

        self.from_imports(name, written, scope)
    }

    /// Candidates reachable through plain and static imports.
    fn from_imports(&self, name: &str, written: &str, scope: &Scope<'_>) -> Resolution {
        let candidates: BTreeSet<String> = scope
            .imports
            .iter()
            .filter(|import| import.alias.is_none())
            .map(|import| namespace::join(&import.namespace, name))
            .filter(|key| self.types.contains_key(key))
            .collect();

        let mut candidates = candidates.into_iter();
        match (candidates.next(), candidates.next()) {
            (None, _) => Resolution::Unresolved,
            (Some(key), None) => Resolution::Resolved {
                key,
                written: written.to_string(),
            },
            (Some(first), Some(second)) => {
                let mut all = vec![first, second];
                all.extend(candidates);
                Resolution::Ambiguous(all)
            }
        }
    }

    /// The enclosing type followed by its containing types, innermost first.
    fn type_chain<'a>(&'a self, enclosing: Option<&'a str>) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut current = enclosing;
        while let Some(key) = current {
            chain.push(key);
            current = self.types.get(key).and_then(|node| node.outer.as_deref());
        }
        chain
    }
}
