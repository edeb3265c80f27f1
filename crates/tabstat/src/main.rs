//! CLI entry point for tabular dataset statistics.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tabstat::service::HEAD_ROWS_DEFAULT;
use tabstat::storage::{CleanupWorker, sweep_stale_files};
use tabstat::{
    AnalysisConfig, AnalysisService, ColumnStatistics, DatasetReport, QualityReport,
    TypedStatistics,
};
use tokio::sync::watch;
use tracing::{debug, info};

/// Environment variable overriding the default upload directory.
const UPLOAD_DIR_ENV: &str = "TABSTAT_UPLOAD_DIR";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Descriptive statistics and data-quality profiling for tabular datasets",
    long_about = "Store CSV and Excel datasets and report column statistics and data quality.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  TABSTAT_UPLOAD_DIR    Directory holding uploaded datasets (default: data/uploads)\n\n\
                  EXAMPLES:\n  \
                  # Store a dataset and print its report\n  \
                  tabstat upload data.csv\n\n  \
                  # Statistics of one column as JSON\n  \
                  tabstat --json column 20240115_103000_1a2b3c4d.csv age\n\n  \
                  # Remove stale uploads every 5 minutes until Ctrl-C\n  \
                  tabstat cleanup --watch"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding uploaded datasets
    ///
    /// Falls back to $TABSTAT_UPLOAD_DIR, then "data/uploads"
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    /// Distinct/non-blank ratio below which a column is categorical
    #[arg(long, global = true, default_value = "0.5")]
    categorical_threshold: f64,

    /// Minimum values before std, skewness and kurtosis are reported
    #[arg(long, global = true, default_value = "2")]
    min_values: usize,

    /// Number of most/least common values to report
    #[arg(long, global = true, default_value = "5")]
    top_n: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so the output can be piped: `... --json | jq .total_rows`
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a CSV or Excel file and print its dataset report
    Upload {
        /// Path to a .csv, .xlsx or .xls file
        file: PathBuf,
    },
    /// List stored datasets, newest first
    List,
    /// List the columns of a dataset
    Columns { dataset_id: String },
    /// Show the first rows of a dataset
    Head {
        dataset_id: String,
        /// Number of rows (1-100)
        #[arg(short, default_value_t = HEAD_ROWS_DEFAULT)]
        n: usize,
    },
    /// Full statistics and quality report of a dataset
    Describe { dataset_id: String },
    /// Statistics of a single column
    Column { dataset_id: String, column: String },
    /// Data-quality metrics of every column
    Quality { dataset_id: String },
    /// Delete a stored dataset
    Delete { dataset_id: String },
    /// Remove uploads older than the maximum age
    Cleanup {
        /// Keep sweeping on an interval until Ctrl-C
        #[arg(long)]
        watch: bool,
        /// Maximum upload age in minutes
        #[arg(long, default_value = "30")]
        max_age_minutes: u64,
        /// Minutes between sweeps in watch mode
        #[arg(long, default_value = "5")]
        interval_minutes: u64,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_config(args: &Args) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .categorical_ratio_threshold(args.categorical_threshold)
        .min_values_for_dispersion(args.min_values)
        .top_n(args.top_n);

    let upload_dir = args
        .upload_dir
        .clone()
        .or_else(|| std::env::var_os(UPLOAD_DIR_ENV).map(PathBuf::from));
    if let Some(dir) = upload_dir {
        builder = builder.upload_dir(dir);
    }

    if let Command::Cleanup {
        max_age_minutes,
        interval_minutes,
        ..
    } = args.command
    {
        builder = builder
            .max_file_age(Duration::from_secs(max_age_minutes.saturating_mul(60)))
            .cleanup_interval(Duration::from_secs(interval_minutes.saturating_mul(60)));
    }

    Ok(builder.build()?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config = build_config(&args)?;
    debug!(?config, "Configuration resolved");
    let service = AnalysisService::from_config(config)?;

    match &args.command {
        Command::Upload { file } => {
            if !file.exists() {
                return Err(anyhow!("Input file not found: {}", file.display()));
            }
            let summary = service.upload(file)?;
            if args.json {
                return print_json(&summary);
            }
            println!(
                "Stored {} as {} ({} rows x {} columns)",
                summary.filename, summary.dataset_id, summary.rows, summary.columns
            );
            print_dataset_report(&summary.report);
        }
        Command::List => {
            let datasets = service.list_datasets()?;
            if args.json {
                return print_json(&datasets);
            }
            if datasets.is_empty() {
                println!("No datasets stored in {}", service.store().upload_dir().display());
                return Ok(());
            }
            println!(
                "{:<32} {:<6} {:>10} {:>8}  {}",
                "Dataset", "Format", "Bytes", "Columns", "Created"
            );
            println!("{}", "-".repeat(80));
            for d in &datasets {
                println!(
                    "{:<32} {:<6} {:>10} {:>8}  {}",
                    d.id,
                    d.format,
                    d.size_bytes,
                    d.columns,
                    d.created.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Command::Columns { dataset_id } => {
            let columns = service.list_columns(dataset_id)?;
            if args.json {
                return print_json(&columns);
            }
            println!(
                "{:<24} {:<14} {:>8} {:>8}",
                "Column", "Dtype", "Missing", "Unique"
            );
            println!("{}", "-".repeat(58));
            for c in &columns {
                println!(
                    "{:<24} {:<14} {:>8} {:>8}",
                    truncate_str(&c.name, 23),
                    truncate_str(&c.dtype, 13),
                    c.missing_count,
                    c.unique_count
                );
            }
        }
        Command::Head { dataset_id, n } => {
            let preview = service.head(dataset_id, *n)?;
            if args.json {
                return print_json(&preview);
            }
            println!("{}", preview.columns.join("\t"));
            for row in &preview.rows {
                let cells: Vec<String> = row
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::Null => String::new(),
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                println!("{}", cells.join("\t"));
            }
            println!("({} of {} rows)", preview.rows.len(), preview.total_rows);
        }
        Command::Describe { dataset_id } => {
            let report = service.get_dataset_report(dataset_id)?;
            if args.json {
                return print_json(&report);
            }
            print_dataset_report(&report);
        }
        Command::Column { dataset_id, column } => {
            let stats = service.get_column_report(dataset_id, column)?;
            if args.json {
                return print_json(&stats);
            }
            print_column_statistics(&stats);
        }
        Command::Quality { dataset_id } => {
            let report = service.get_quality_report(dataset_id)?;
            if args.json {
                return print_json(&report);
            }
            print_quality_report(&report);
        }
        Command::Delete { dataset_id } => {
            service.delete_dataset(dataset_id)?;
            if args.json {
                return print_json(&serde_json::json!({ "deleted": dataset_id }));
            }
            println!("Deleted {dataset_id}");
        }
        Command::Cleanup { watch, .. } => {
            if *watch {
                run_cleanup_worker(&service)?;
            } else {
                let outcome = sweep_stale_files(
                    service.store(),
                    service.config().max_file_age,
                    SystemTime::now(),
                )?;
                if args.json {
                    return print_json(&outcome);
                }
                println!(
                    "Removed {} stale file(s), {} failure(s)",
                    outcome.removed.len(),
                    outcome.failed
                );
            }
        }
    }

    Ok(())
}

/// Sweep on the configured interval until Ctrl-C.
fn run_cleanup_worker(service: &AnalysisService) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let config = service.config();

    runtime.block_on(async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = CleanupWorker::new(
            Arc::clone(service.store()),
            config.max_file_age,
            config.cleanup_interval,
            shutdown_rx,
        );
        let handle = tokio::spawn(worker.run());

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Ctrl-C received");
        shutdown_tx
            .send(true)
            .map_err(|_| anyhow!("Cleanup worker exited early"))?;

        let stats = handle.await.context("Cleanup worker panicked")?;
        println!(
            "Cleanup stopped after {} sweep(s): {} file(s) removed, {} error(s)",
            stats.sweeps, stats.files_removed, stats.errors
        );
        Ok::<(), anyhow::Error>(())
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_dataset_report(report: &DatasetReport) {
    println!("\n{}", "=".repeat(80));
    println!("DATASET REPORT");
    println!("{}\n", "=".repeat(80));
    println!("  Rows: {}", report.total_rows);
    println!(
        "  Columns: {} ({} analyzed)",
        report.total_columns, report.analyzed_columns
    );
    println!("  Missing cells: {}", report.total_missing_cells);
    println!("  Duplicate rows: {}", report.duplicate_rows);
    println!();

    println!(
        "{:<20} {:<12} {:>8} {:>10} {:>8} {:>10}",
        "Column", "Type", "Unique", "Missing %", "Nulls", "Duplicates"
    );
    println!("{}", "-".repeat(73));
    for column in &report.columns {
        let s = &column.statistics;
        println!(
            "{:<20} {:<12} {:>8} {:>10.1} {:>8} {:>10}",
            truncate_str(&s.name, 19),
            s.classification(),
            s.basic.unique_values,
            s.basic.missing_percentage,
            column.quality.null_count,
            column.quality.duplicate_count
        );
    }

    if !report.failures.is_empty() {
        println!("\nSKIPPED COLUMNS");
        println!("{}", "-".repeat(40));
        for failure in &report.failures {
            println!("  {} [{}]: {}", failure.column, failure.code, failure.reason);
        }
    }
}

fn print_column_statistics(stats: &ColumnStatistics) {
    println!("Column: {} ({})", stats.name, stats.classification());
    println!("  Count: {}", stats.basic.count);
    println!("  Unique: {}", stats.basic.unique_values);
    println!(
        "  Missing: {} ({:.1}%)",
        stats.basic.missing_values, stats.basic.missing_percentage
    );

    match &stats.stats {
        TypedStatistics::Numeric(n) => {
            let rows = [
                ("Mean", n.mean),
                ("Std", n.std),
                ("Min", n.min),
                ("25%", n.quartile_25),
                ("Median", n.median),
                ("75%", n.quartile_75),
                ("Max", n.max),
                ("Skewness", n.skewness),
                ("Kurtosis", n.kurtosis),
            ];
            for (label, value) in rows {
                match value {
                    Some(v) => println!("  {label}: {v:.4}"),
                    None => println!("  {label}: n/a"),
                }
            }
        }
        TypedStatistics::Datetime => {}
        TypedStatistics::Categorical(c) | TypedStatistics::Text(c) => {
            println!("  Most common:");
            for (vc, share) in c.most_common.iter().zip(&c.value_distribution) {
                println!(
                    "    {:<24} {:>6} ({:.1}%)",
                    truncate_str(&vc.value, 23),
                    vc.count,
                    share.percentage
                );
            }
            println!("  Least common:");
            for vc in &c.least_common {
                println!("    {:<24} {:>6}", truncate_str(&vc.value, 23), vc.count);
            }
        }
    }
}

fn print_quality_report(report: &QualityReport) {
    println!("Rows: {}", report.total_rows);
    println!(
        "{:<24} {:>8} {:>10} {:>8} {:>8}",
        "Column", "Unique", "Duplicates", "Missing", "Nulls"
    );
    println!("{}", "-".repeat(62));
    for c in &report.columns {
        println!(
            "{:<24} {:>8} {:>10} {:>8} {:>8}",
            truncate_str(&c.name, 23),
            c.metrics.unique_count,
            c.metrics.duplicate_count,
            c.metrics.missing_count,
            c.metrics.null_count
        );
    }
    for failure in &report.failures {
        println!("  skipped {}: {}", failure.column, failure.reason);
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
