//! CLI tool to copy a TSV file through a filter/aggregation pipeline.
//!
//! Usage:
//!   tsv-run <origin.tsv> <destination.tsv>
//!   tsv-run <origin.tsv> <destination.tsv> -c query.pipe
//!   tsv-run <origin.tsv> <destination.tsv> -s Age=18,20 -a Name=COUNT
//!
//! Column reports go to stdout, one per line.

use clap::Parser;
use env_logger::Env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tsv_pipelines::{
    ColumnReport, CompositeObserver, Literal, LogObserver, PipelineConfig, PipelineConfigBuilder,
    PipelineObserver, PipelineResult, RunSummary, Terminal, TsvPipeline, configure,
};

/// Copy a typed TSV file, keeping selected records and reporting aggregates.
#[derive(Parser)]
#[command(name = "tsv-run")]
struct Cli {
    /// Source file: names header, types header, then data records
    origin: PathBuf,

    /// Destination file (parent directories are created)
    destination: PathBuf,

    /// Read SELECT/COMPUTE commands from a .pipe file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep records whose COLUMN holds one of the values (repeatable)
    #[arg(short, long, value_name = "COLUMN=V1,V2")]
    select: Vec<String>,

    /// Compute a terminal over COLUMN (repeatable)
    #[arg(short = 'a', long, value_name = "COLUMN=KIND")]
    compute: Vec<String>,

    /// Show the configuration and record counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Split `COLUMN=REST` at the first `=`.
fn split_assignment(arg: &str) -> Result<(&str, &str), String> {
    match arg.split_once('=') {
        Some((column, rest)) if !column.is_empty() => Ok((column, rest)),
        _ => Err(format!("expected COLUMN=VALUE, got '{arg}'")),
    }
}

/// Values that parse as 64-bit integers become longs, everything else strings.
fn parse_literal(value: &str) -> Literal {
    value
        .parse::<i64>()
        .map(Literal::Long)
        .unwrap_or_else(|_| Literal::from(value))
}

fn build_config(cli: &Cli) -> Result<PipelineConfig, String> {
    let mut builder: PipelineConfigBuilder =
        PipelineConfig::builder(&cli.origin).map_err(|e| e.to_string())?;

    if let Some(path) = &cli.config {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Error reading config file '{}': {e}", path.display()))?;
        builder = configure(builder, &text).map_err(|e| format!("{}: {e}", path.display()))?;
    }

    for arg in &cli.select {
        let (column, values) = split_assignment(arg)?;
        let literals: Vec<Literal> = values.split(',').map(parse_literal).collect();
        builder = builder
            .select_any(column, literals)
            .map_err(|e| e.to_string())?;
    }

    for arg in &cli.compute {
        let (column, kind) = split_assignment(arg)?;
        let terminal: Terminal = kind.parse().map_err(|e| format!("{e}"))?;
        builder = builder.compute(column, terminal);
    }

    Ok(builder.done())
}

/// Prints each column report to stdout.
struct StdoutReporter;

impl PipelineObserver for StdoutReporter {
    fn on_report(&self, report: &ColumnReport) {
        println!("{report}");
    }
}

fn run(config: PipelineConfig, destination: &Path) -> PipelineResult<RunSummary> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let observers: Vec<Arc<dyn PipelineObserver>> =
        vec![Arc::new(LogObserver), Arc::new(StdoutReporter)];
    TsvPipeline::new(config)
        .with_observer(Arc::new(CompositeObserver::new(observers)))
        .copy_to(destination)
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    if cli.verbose {
        eprint!("{config}");
        eprintln!("destination: {}", cli.destination.display());
    }

    match run(config, &cli.destination) {
        Ok(summary) => {
            if cli.verbose {
                eprintln!(
                    "Processed {} records: {} malformed, {} filtered out, {} written",
                    summary.records_read, summary.malformed, summary.filtered_out, summary.written
                );
            }
        }
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            process::exit(1);
        }
    }
}
