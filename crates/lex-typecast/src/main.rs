//! CLI entry point for column type inference and conversion.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use lex_typecast::{
    ComplexPolicy, ConversionOutput, FallbackPolicy, InferenceConfig, InferencePipeline,
    OverrideOutcome, OverridePipeline, TabularSource,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// CLI-compatible complex policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliComplexPolicy {
    /// Replace unparseable values with empty fields
    Mask,
    /// Drop unparseable values from the complex column only
    Drop,
}

impl From<CliComplexPolicy> for ComplexPolicy {
    fn from(cli: CliComplexPolicy) -> Self {
        match cli {
            CliComplexPolicy::Mask => ComplexPolicy::MaskUnparseable,
            CliComplexPolicy::Drop => ComplexPolicy::DropUnparseable,
        }
    }
}

/// CLI-compatible fallback policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFallbackPolicy {
    /// Zero-fill any failed numeric override
    PerColumn,
    /// Zero-fill only while the last numeric override succeeded
    Sticky,
}

impl From<CliFallbackPolicy> for FallbackPolicy {
    fn from(cli: CliFallbackPolicy) -> Self {
        match cli {
            CliFallbackPolicy::PerColumn => FallbackPolicy::PerColumn,
            CliFallbackPolicy::Sticky => FallbackPolicy::Sticky,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Column type inference and conversion for CSV and Excel files",
    long_about = "Infers a type for every column of a CSV or XLSX file and writes the data \
                  back as CSV with each column name annotated by its type.\n\n\
                  EXAMPLES:\n  \
                  # Infer types and print to stdout\n  \
                  lex-typecast -i sales.csv\n\n  \
                  # Force some types and write to a file\n  \
                  lex-typecast -i sales.xlsx -t '{\"Revenue\": \"float64\"}' -o typed.csv\n\n  \
                  # Read overrides from a file and show a summary\n  \
                  lex-typecast -i sales.csv --types-file types.json --summary"
)]
struct Args {
    /// Path to the CSV or XLSX file to process
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON object mapping column names to type labels
    ///
    /// Labels: int8, int16, int32, int64, float16, float32, float64, bool,
    /// datetime64, timedelta, category, object
    #[arg(short, long, conflicts_with = "types_file")]
    types: Option<String>,

    /// File containing the JSON override map
    #[arg(long)]
    types_file: Option<PathBuf>,

    /// JSON file with an InferenceConfig
    #[arg(long)]
    config: Option<PathBuf>,

    /// How to treat unparseable values in complex columns
    #[arg(long, value_enum)]
    complex_policy: Option<CliComplexPolicy>,

    /// When to attempt the zero-fill fallback after a failed override
    #[arg(long, value_enum)]
    fallback: Option<CliFallbackPolicy>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,

    /// Print a per-column summary table to stderr
    #[arg(long)]
    summary: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout only carries CSV.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = load_config(&args)?;
    let source = TabularSource::from_path(&args.input)?;

    let types = match (&args.types, &args.types_file) {
        (Some(json), _) => Some(json.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read types file {}", path.display()))?,
        ),
        (None, None) => None,
    };

    let output = match types {
        Some(json) => OverridePipeline::builder()
            .config(config)
            .build()?
            .run(&source, &json)?,
        None => InferencePipeline::builder()
            .config(config)
            .build()?
            .run(&source)?,
    };

    if let Some(report) = output.overrides() {
        for entry in &report.entries {
            if let OverrideOutcome::Unchanged { reason } = &entry.outcome {
                warn!(
                    "Column '{}' kept its inferred type instead of {}: {}",
                    entry.column, entry.requested, reason
                );
            }
        }
    }

    if args.summary {
        print_summary(&output);
    }

    write_output(args.output.as_deref(), output)
}

/// Resolve the configuration: file first, then command line flags.
fn load_config(args: &Args) -> Result<InferenceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<InferenceConfig>(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => InferenceConfig::default(),
    };

    if let Some(policy) = args.complex_policy {
        config.complex_policy = policy.into();
    }
    if let Some(policy) = args.fallback {
        config.fallback_policy = policy.into();
    }

    config.validate()?;
    Ok(config)
}

fn write_output(path: Option<&Path>, output: ConversionOutput) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output.csv())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.csv())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Print the per-column table.
///
/// Note: This uses `eprintln!` intentionally so the table is visible
/// regardless of log level without mixing into CSV on stdout.
fn print_summary(output: &ConversionOutput) {
    eprintln!("\n{}", "=".repeat(78));
    eprintln!(
        "{:<24} {:<28} {:<12} {:>6} {:>6}",
        "Source", "Output", "Claimed by", "Rows", "Empty"
    );
    eprintln!("{}", "-".repeat(78));
    for column in output.columns() {
        eprintln!(
            "{:<24} {:<28} {:<12} {:>6} {:>6}",
            truncate_str(&column.source_name, 23),
            truncate_str(&column.name, 27),
            column.claimed_by.as_deref().unwrap_or("-"),
            column.length,
            column.missing
        );
    }
    eprintln!("{}", "=".repeat(78));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
