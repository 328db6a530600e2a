//! sleep-tables CLI - Flatten a Garmin sleep push-log export into CSV tables
//!
//! Commands:
//! - flatten: Write the summary, stage and respiration tables
//! - validate: Report rows that cannot be flattened
//! - schema: Print the output table headers

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use garmin_sleep_tables::config::{
    DEFAULT_INPUT, DEFAULT_RESPIRATION_FILE, DEFAULT_STAGES_FILE, DEFAULT_SUMMARY_FILE,
};
use garmin_sleep_tables::{
    export, read_payload_rows, DateFilter, ExportConfig, ExportReport, FlattenError, Flattener,
    RowPolicy, Table, VERSION,
};

/// Flatten Garmin sleep payloads into relational CSV tables
#[derive(Parser)]
#[command(name = "sleep-tables")]
#[command(version = VERSION)]
#[command(about = "Flatten Garmin sleep push payloads into CSV tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the summary, stage segment and respiration tables
    Flatten {
        /// Input CSV with a `data` column of JSON payloads
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Directory for the output tables
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Summary table file name
        #[arg(long, default_value = DEFAULT_SUMMARY_FILE)]
        summary_file: String,

        /// Stage segment table file name
        #[arg(long, default_value = DEFAULT_STAGES_FILE)]
        stages_file: String,

        /// Respiration table file name
        #[arg(long, default_value = DEFAULT_RESPIRATION_FILE)]
        respiration_file: String,

        /// Drop rows that cannot be flattened instead of aborting
        #[arg(long)]
        skip_invalid_rows: bool,

        /// Only keep nights on or after this date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,

        /// Only keep nights on or before this date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report rows that cannot be flattened
    Validate {
        /// Input CSV with a `data` column of JSON payloads
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print output table headers
    Schema {
        /// Table to describe (all tables if omitted)
        #[arg(value_enum)]
        table: Option<TableArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TableArg {
    Summary,
    Stages,
    Respiration,
}

impl From<TableArg> for Table {
    fn from(arg: TableArg) -> Self {
        match arg {
            TableArg::Summary => Table::Summary,
            TableArg::Stages => Table::Stages,
            TableArg::Respiration => Table::Respiration,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SleepCliError> {
    match cli.command {
        Commands::Flatten {
            input,
            output_dir,
            summary_file,
            stages_file,
            respiration_file,
            skip_invalid_rows,
            start_date,
            end_date,
            json,
        } => {
            let policy = if skip_invalid_rows {
                RowPolicy::Skip
            } else {
                RowPolicy::Abort
            };
            let config = ExportConfig::new(input)
                .with_output_dir(output_dir)
                .with_file_name(Table::Summary, summary_file)
                .with_file_name(Table::Stages, stages_file)
                .with_file_name(Table::Respiration, respiration_file)
                .with_row_policy(policy)
                .with_date_filter(DateFilter::parse(
                    start_date.as_deref(),
                    end_date.as_deref(),
                )?);
            cmd_flatten(&config, json)
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Schema { table } => {
            cmd_schema(table.map(Table::from));
            Ok(())
        }
    }
}

fn cmd_flatten(config: &ExportConfig, json: bool) -> Result<(), SleepCliError> {
    let report = export(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ExportReport) {
    println!("Export Report");
    println!("=============");
    println!("Rows read:     {}", report.rows_read);
    if report.skipped_rows > 0 {
        println!("Rows skipped:  {}", report.skipped_rows);
    }
    if report.filtered_rows > 0 {
        println!("Rows filtered: {}", report.filtered_rows);
    }
    println!("\nTables:");
    for output in &report.outputs {
        println!(
            "  {:<22} {:>7} rows  {}",
            output.table.as_str(),
            output.rows,
            output.path.display()
        );
    }
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), SleepCliError> {
    let rows = read_payload_rows(input)?;
    let issues = Flattener::new().validate(&rows);

    let report = ValidationReport {
        total_rows: rows.len(),
        valid_rows: rows.len() - issues.len(),
        invalid_rows: issues.len(),
        errors: issues
            .into_iter()
            .map(|issue| ValidationErrorDetail {
                row: issue.row,
                summary_id: issue.summary_id,
                error: issue.error,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.invalid_rows);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Summary {} (row {}): {}",
                    err.summary_id.as_deref().unwrap_or("unknown"),
                    err.row,
                    err.error
                );
            }
        }
    }

    if report.invalid_rows > 0 {
        Err(SleepCliError::ValidationFailed(report.invalid_rows))
    } else {
        Ok(())
    }
}

fn cmd_schema(table: Option<Table>) {
    let tables = match table {
        Some(t) => vec![t],
        None => Table::ALL.to_vec(),
    };
    for table in tables {
        println!("{}: {}", table.as_str(), table.headers().join(","));
    }
}

// Error types

#[derive(Debug)]
enum SleepCliError {
    Flatten(FlattenError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<FlattenError> for SleepCliError {
    fn from(e: FlattenError) -> Self {
        SleepCliError::Flatten(e)
    }
}

impl From<serde_json::Error> for SleepCliError {
    fn from(e: serde_json::Error) -> Self {
        SleepCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: String, hint: &str) -> Self {
        CliError {
            code: code.to_string(),
            message,
            hint: Some(hint.to_string()),
        }
    }
}

impl From<SleepCliError> for CliError {
    fn from(e: SleepCliError) -> Self {
        match e {
            SleepCliError::Flatten(e) => {
                let message = e.to_string();
                match e {
                    FlattenError::InputNotFound { .. } => CliError::new(
                        "INPUT_NOT_FOUND",
                        message,
                        "Check the input path and permissions",
                    ),
                    FlattenError::MissingColumn(_) => CliError::new(
                        "MISSING_COLUMN",
                        message,
                        "The input CSV needs a `data` column holding the JSON payload",
                    ),
                    FlattenError::ParseError { .. } => CliError::new(
                        "PARSE_ERROR",
                        message,
                        "Run 'sleep-tables validate' to list every bad row",
                    ),
                    FlattenError::MissingField { .. } => CliError::new(
                        "MISSING_FIELD",
                        message,
                        "Stage segments need startTimeInSeconds and endTimeInSeconds",
                    ),
                    FlattenError::InvalidConfig(_) => CliError::new(
                        "INVALID_CONFIG",
                        message,
                        "Dates use the YYYY-MM-DD format",
                    ),
                    FlattenError::Csv(_) => {
                        CliError::new("CSV_ERROR", message, "Check the input CSV syntax")
                    }
                    FlattenError::Io(_) => CliError::new(
                        "IO_ERROR",
                        message,
                        "Check output paths and permissions",
                    ),
                }
            }
            SleepCliError::Json(e) => {
                CliError::new("JSON_ERROR", e.to_string(), "Report serialization failed")
            }
            SleepCliError::ValidationFailed(count) => CliError::new(
                "VALIDATION_FAILED",
                format!("{} rows failed validation", count),
                "Fix the listed rows or rerun flatten with --skip-invalid-rows",
            ),
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    row: usize,
    summary_id: Option<String>,
    error: String,
}
