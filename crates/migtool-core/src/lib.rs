//! Core infrastructure for migtool.
//!
//! This crate provides the language-agnostic engine behind solution
//! reorganization:
//! - Entity facts and the [`entity::EntityProvider`] seam
//! - The immutable dependency [`graph::Graph`] and its builder
//! - Impact analysis over the graph for move/rename/delete operations
//! - Report, error and JSON output types
//! - Configuration, cancellation and text/patch utilities

pub mod cancel;
pub mod config;
pub mod entity;
pub mod error;
pub mod graph;
pub mod impact;
pub mod namespace;
pub mod output;
pub mod patch;
pub mod text;
