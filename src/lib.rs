//! migtool: impact analysis and rewriting for reorganizing C# solutions.
//!
//! The engine lives in [`migtool_core`] and the C# front end in
//! [`migtool_csharp`]. This crate ties them together for the `mig` binary:
//!
//! - [`cli`]: runners that build the graph, analyze and apply
//! - [`apply`]: turning an impact report into on-disk edits

pub mod apply;
pub mod cli;

pub use apply::{ApplyError, EditPlan, FilePlan};
pub use cli::{run_graph, run_operation, Session};
