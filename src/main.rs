//! SheetQL - SQL over spreadsheets
//!
//! Loads workbooks and delimited files into an in-memory SQL engine.

mod cli_format;
mod cli_shell;

use clap::{Parser, Subcommand};
use colored::Colorize;
use sheetql::{
    CellValue, ConfigFile, ExportFormat, ExportTarget, Record, Result, Session, SessionArgs,
    SessionConfig, SheetqlError,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli_format::{format_result, format_tables, OutputFormat};

/// SheetQL - query spreadsheets with SQL
#[derive(Parser, Debug)]
#[command(name = "sheetql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query spreadsheets with SQL")]
#[command(
    long_about = "SheetQL loads every sheet of a workbook (and any CSV/TSV files) as a table \
in an in-memory SQL engine. Sheet and column names are case-insensitive; quote names with \
spaces as \"Unit Price\"."
)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the tables built from the given files
    Tables {
        /// Workbooks or CSV/TSV files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run one statement against the given files
    Query {
        /// Workbooks or CSV/TSV files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Statement to run
        #[arg(short = 'e', long = "execute")]
        sql: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Also write the result to this file (.xlsx or .csv)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Edit one cell and export the edited sheet
    Edit {
        /// Workbook or CSV/TSV file
        file: PathBuf,

        /// Sheet holding the cell
        #[arg(long)]
        table: String,

        /// Zero-based data row, as read from the file
        #[arg(long)]
        row: usize,

        /// Column label
        #[arg(long)]
        column: String,

        /// New value; numbers and true/false are typed, empty means NULL
        #[arg(long, allow_hyphen_values = true)]
        value: String,

        /// Where to write the edited sheet (.xlsx or .csv); defaults to the output directory
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Interactive shell over the given files
    Shell {
        /// Workbooks or CSV/TSV files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print an example configuration file
    InitConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "✗".red(), e);
        if let Some(hint) = e.hint() {
            eprintln!("  {} {}", "hint:".yellow(), hint);
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::InitConfig = cli.command {
        println!("{}", ConfigFile::generate_example());
        return Ok(());
    }

    let config = SessionConfig::load(&cli.session)?;
    init_logging(&config.log_level);
    debug!(?config, "Resolved configuration");

    match cli.command {
        Commands::Tables { files, format } => {
            let session = open_session(config, &files)?;
            println!("{}", format_tables(&session.tables(), format));
        }
        Commands::Query {
            files,
            sql,
            format,
            export,
        } => {
            let mut session = open_session(config, &files)?;
            let outcome = session.execute(&sql);
            println!("{}", format_result(&outcome.result, format));
            if !outcome.result.success {
                return Err(SheetqlError::Validation(
                    outcome.result.error.unwrap_or_else(|| "query failed".to_string()),
                ));
            }
            if let Some(notice) = outcome.notice {
                eprintln!("{} {}", "ℹ".blue(), notice);
            }
            if let Some(path) = export {
                write_export(&outcome.result.data, &path, session.config().export_format)?;
                eprintln!("{} Exported to {}", "✓".green(), path.display());
            }
        }
        Commands::Edit {
            file,
            table,
            row,
            column,
            value,
            output,
        } => {
            let mut session = open_session(config, std::slice::from_ref(&file))?;
            session.set_cell(&table, row, &column, CellValue::infer_from_text(&value))?;
            eprintln!("{} Updated {}[{}].{}", "✓".green(), table, row, column);

            let path = match output {
                Some(path) => {
                    let records = session.sheet(&table).unwrap_or_default();
                    write_export(records, &path, session.config().export_format)?;
                    path
                }
                None => session.export_to_dir(&ExportTarget::Sheet(table))?,
            };
            eprintln!("{} Exported to {}", "✓".green(), path.display());
        }
        Commands::Shell { files } => {
            let mut session = open_session(config, &files)?;
            cli_shell::run_shell(&mut session)?;
        }
        Commands::InitConfig => {}
    }
    Ok(())
}

/// Log to stderr so command output on stdout stays machine readable.
fn init_logging(level: &str) {
    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter)
        .init();
}

fn open_session(config: SessionConfig, files: &[PathBuf]) -> Result<Session> {
    let mut session = Session::new(config)?;
    let report = session.load_files(files)?;
    info!(
        tables = report.tables.len(),
        rows = report.rows_inserted,
        elapsed_ms = report.elapsed_ms,
        "Loaded"
    );
    for skipped in &report.skipped {
        eprintln!(
            "{} Skipped {}: {}",
            "⚠".yellow(),
            skipped.source,
            skipped.reason
        );
    }
    Ok(session)
}

/// Encode `records` in the format implied by the extension of `path`,
/// falling back to `default`, and write them there.
fn write_export(records: &[Record], path: &Path, default: ExportFormat) -> Result<()> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse::<ExportFormat>().ok())
        .unwrap_or(default);
    let label = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("export");

    let artifact = sheetql_engine::export_as(records, label, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &artifact.bytes)?;
    Ok(())
}
