// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! C# language support for migtool.
//!
//! - [`lexer`]: trivia-preserving token stream
//! - [`syntax`]: declarations, `using` directives and bracket structure
//! - [`references`]: names in type positions
//! - [`extract`]: a file's entity facts for the graph builder
//! - [`rewrite`]: namespace, `using`, qualified-name and type-rename rewriters
//! - [`provider`] and [`memory`]: entity providers over disk and memory

pub mod extract;
pub mod lexer;
pub mod memory;
pub mod provider;
pub mod references;
pub mod rewrite;
pub mod syntax;

pub use extract::parse_source;
pub use memory::InMemoryProvider;
pub use provider::SolutionProvider;
pub use rewrite::{
    apply_all, NamespaceRewrite, QualifiedNameRewrite, Rewrite, RewriteError, RewriteManifest, RewriteOutput,
    TypeRename, UsingRewrite,
};
