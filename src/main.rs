//! Binary entry point for the retalk CLI.
//!
//! ## Usage
//!
//! ```bash
//! # List refactorings available at a location (1-based line and column)
//! retalk actions --at src/stack.lgt:12:5
//!
//! # Add an argument to the predicate under the cursor
//! retalk run addArgument --at src/stack.lgt:12:5 --answer Size --answer 2
//!
//! # Preview extracting lines 20-28 into a new file
//! retalk run extractToNewFile --at src/stack.lgt:20:1 --to 29:1 --answer helpers --dry-run
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use retalk::cli::{run_actions, run_command, OutputFormat, RunRequest, Workspace};
use retalk::{ErrorResponse, OutputErrorCode, RetalkError};
use retalk_core::output::emit_response;

// ============================================================================
// CLI Structure
// ============================================================================

/// Structural refactoring for Logtalk sources.
#[derive(Parser, Debug)]
#[command(name = "retalk", version, about = "Structural refactoring for Logtalk sources")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Log level for tracing output (`RUST_LOG` takes precedence).
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
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

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Output format for the run command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RunFormat {
    /// Brief text summary.
    Text,
    /// Full JSON response.
    Json,
    /// Unified diff.
    Diff,
}

impl From<RunFormat> for OutputFormat {
    fn from(format: RunFormat) -> Self {
        match format {
            RunFormat::Text => OutputFormat::Text,
            RunFormat::Json => OutputFormat::Json,
            RunFormat::Diff => OutputFormat::Diff,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List the refactorings available at a location or selection.
    Actions {
        /// Location: path:line:col (1-based).
        #[arg(long)]
        at: String,
        /// Selection end: line:col (1-based, exclusive).
        #[arg(long)]
        to: Option<String>,
    },
    /// Run one refactoring.
    ///
    /// Prompts are answered from `--answer` values in order; with none, the
    /// terminal is asked. Output defaults to a unified diff for dry runs and
    /// JSON otherwise.
    Run {
        /// Refactoring kind (`addArgument`) or command id (`logtalk.refactor.addArgument`).
        command: String,
        /// Location: path:line:col (1-based).
        #[arg(long)]
        at: String,
        /// Selection end: line:col (1-based, exclusive).
        #[arg(long)]
        to: Option<String>,
        /// Target kind for convertEntity: object, protocol or category.
        #[arg(long)]
        kind: Option<String>,
        /// Answer to the next prompt; repeat for each prompt.
        #[arg(long = "answer")]
        answers: Vec<String>,
        /// Compute the patch without writing any file.
        #[arg(long)]
        dry_run: bool,
        /// Output format.
        #[arg(long, value_enum)]
        format: Option<RunFormat>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(output) => {
            print!("{}", output);
            let _ = io::stdout().flush();
            ExitCode::SUCCESS
        }
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            // errors go to stdout as JSON, like every other response
            let _ = emit_response(&ErrorResponse::from_error(&err), &mut io::stdout());
            let _ = io::stdout().flush();
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber on stderr.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command, returning what to print on stdout.
fn execute(cli: Cli) -> Result<String, RetalkError> {
    let root = match cli.global.workspace {
        Some(root) => root,
        None => std::env::current_dir()
            .map_err(|e| RetalkError::internal(format!("cannot determine current directory: {}", e)))?,
    };
    let workspace = Workspace::open(&root)?;
    tracing::debug!(root = %workspace.root().display(), "workspace ready");

    match cli.command {
        Command::Actions { at, to } => run_actions(&workspace, &at, to.as_deref()),
        Command::Run {
            command,
            at,
            to,
            kind,
            answers,
            dry_run,
            format,
        } => run_command(
            &workspace,
            &RunRequest {
                command,
                at,
                to,
                kind,
                answers,
                dry_run,
                format: format.map(OutputFormat::from),
            },
        ),
    }
}
