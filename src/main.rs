//! Binary entry point for the mig CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Preview a namespace rename
//! mig rename-namespace Acme.Core Acme.Core.V2 --dry-run
//!
//! # Move a file into another folder (applies when nothing blocks it)
//! mig move ProjectA/Foo.cs ProjectA/Models/Foo.cs
//!
//! # Delete even though other files still use it
//! mig delete ProjectA/Legacy --force --format json
//! ```
//!
//! Exit status is 0 when the operation may proceed, 3 when it is blocked, and
//! the error's code otherwise.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use migtool::cli::{run_graph, run_operation, Session};
use migtool_core::error::{MigError, OutputErrorCode};
use migtool_core::impact::Operation;
use migtool_core::output::{emit_response, render_report_text, ErrorResponse, GraphResponse, OperationResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Impact analysis and source rewriting for C# solutions.
#[derive(Parser, Debug)]
#[command(name = "mig", version, about = "Reorganize C# solutions safely")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Solution root directory (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    solution: PathBuf,

    /// Config file (default: .migtool/config.toml in the solution root).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable report (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Move a source file or directory, updating namespaces and importers.
    Move {
        /// Current file or directory path, relative to the solution root.
        source: String,
        /// New path, relative to the solution root.
        target: String,
        /// Report without changing any file.
        #[arg(long)]
        dry_run: bool,
    },
    /// Rename a namespace and everything nested under it.
    RenameNamespace {
        old: String,
        new: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete a file, directory or project.
    Delete {
        path: String,
        /// Proceed even when the deleted types are still referenced.
        #[arg(long)]
        force: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Move one type into another namespace.
    MoveType {
        /// Full name of the type, e.g. `Acme.Core.Foo`.
        type_name: String,
        /// Namespace to move it into.
        namespace: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Build the dependency graph and print its summary.
    Graph,
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(OutputErrorCode::Blocked.code()),
        Err(err) => {
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON regardless of --format.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(OutputErrorCode::from(&err).code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Execute the CLI command. `Ok(false)` means an operation was blocked.
fn execute(cli: Cli) -> Result<bool, MigError> {
    let global = cli.global;
    let (operation, dry_run) = match cli.command {
        Command::Graph => return execute_graph(&global),
        Command::Move {
            source,
            target,
            dry_run,
        } => (
            Operation::Move {
                source_path: source,
                target_path: target,
            },
            dry_run,
        ),
        Command::RenameNamespace { old, new, dry_run } => (
            Operation::RenameNamespace {
                old_namespace: old,
                new_namespace: new,
            },
            dry_run,
        ),
        Command::Delete {
            path,
            force,
            dry_run,
        } => (Operation::Delete { path, force }, dry_run),
        Command::MoveType {
            type_name,
            namespace,
            dry_run,
        } => (
            Operation::MoveType {
                type_full_name: type_name,
                target_namespace: namespace,
            },
            dry_run,
        ),
    };
    let session = open_session(&global)?;
    let response = run_operation(&session, operation, dry_run)?;
    let proceeds = response.report.can_proceed;
    emit_operation(global.format, &response)?;
    Ok(proceeds)
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_graph(global: &GlobalArgs) -> Result<bool, MigError> {
    let session = open_session(global)?;
    let response = run_graph(&session)?;
    match global.format {
        OutputFormat::Json => emit_response(&response, &mut io::stdout())?,
        OutputFormat::Text => print!("{}", render_graph_text(&response)),
    }
    io::stdout().flush()?;
    Ok(true)
}

fn open_session(global: &GlobalArgs) -> Result<Session, MigError> {
    Session::open(&global.solution, global.config.as_deref())
}

// ============================================================================
// Output
// ============================================================================

fn emit_operation(format: OutputFormat, response: &OperationResponse) -> Result<(), MigError> {
    let mut stdout = io::stdout();
    match format {
        OutputFormat::Json => emit_response(response, &mut stdout)?,
        OutputFormat::Text => {
            write!(stdout, "{}", render_report_text(&response.operation, &response.report))?;
            match (&response.applied, response.dry_run) {
                (Some(applied), _) => writeln!(
                    stdout,
                    "\nApplied: {} written, {} moved, {} deleted ({} edits)",
                    applied.files_written, applied.files_moved, applied.files_deleted, applied.edit_count
                )?,
                (None, true) => writeln!(stdout, "\nDry run: no files changed")?,
                (None, false) => {}
            }
        }
    }
    stdout.flush()?;
    Ok(())
}

fn render_graph_text(response: &GraphResponse) -> String {
    let stats = &response.stats;
    let mut out = format!(
        "projects: {}\nfiles: {}\nnamespaces: {}\ntypes: {}\nuses edges: {}\nimport edges: {}\ninheritance edges: {}\nparse failures: {}\nambiguous references: {}\n",
        stats.projects,
        stats.files,
        stats.namespaces,
        stats.types,
        stats.uses_edges,
        stats.import_edges,
        stats.inheritance_edges,
        stats.parse_failures,
        stats.ambiguous_references,
    );
    if !response.diagnostics.is_empty() {
        out.push_str("\nDiagnostics:\n");
        for diagnostic in &response.diagnostics {
            let location = match (&diagnostic.path, diagnostic.line) {
                (Some(path), Some(line)) => format!(" {}:{}", path, line),
                (Some(path), None) => format!(" {}", path),
                _ => String::new(),
            };
            out.push_str(&format!("  [{}]{} {}\n", diagnostic.code.as_str(), location, diagnostic.message));
        }
    }
    out
}
