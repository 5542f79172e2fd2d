use std::process::ExitCode;

use agc::{
    compare_all_fields, compare_key_lists, process_source, run_read_benchmarks,
    scan_cluster_boundaries, traits::*, AgcResult, AnalysisOptions, EventBatch, ParquetSource,
    ReadTiming, SampleMetadata, ScanWindow,
};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agc")]
#[command(author, version, about = "Analysis Grand Challenge ttbar tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare the fields of two files holding the same events
    Compare {
        left: String,
        right: String,
        /// Only compare these fields (default: pair up all fields by name)
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },
    /// Compare one field in small windows around every cluster boundary of the right file
    Scan {
        left: String,
        right: String,
        #[arg(short, long)]
        field: String,
        /// Sweep 19 entries on each side of a boundary instead of 9
        #[arg(long)]
        wide: bool,
    },
    /// Fill the 4j1b and 4j2b histograms of one sample
    Analyze {
        file: String,
        #[arg(long, default_value = "ttbar")]
        process: String,
        #[arg(long, default_value = "nominal")]
        variation: String,
        /// Histogram label (default: the process name)
        #[arg(long)]
        label: Option<String>,
        /// Cross-section in pb
        #[arg(long, default_value_t = 1.0)]
        xsec: f64,
        /// Total number of generated events
        #[arg(long, default_value_t = 1)]
        nevts: u64,
        /// Events processed per partition
        #[arg(long)]
        partition_size: Option<usize>,
        /// Save the histograms as a pickle
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Time the read patterns of one or more files
    Bench {
        #[arg(required = true)]
        files: Vec<String>,
        /// Fields read by the selected-arrays pattern (default: the analysis branches)
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },
}

fn compare(left: &str, right: &str, fields: &[String]) -> AgcResult<bool> {
    let left = ParquetSource::open(left)?;
    let right = ParquetSource::open(right)?;
    let report = if fields.is_empty() {
        let keys = compare_key_lists(&left, &right);
        println!(
            "key matches: {}; key mismatches: {}",
            keys.key_matches, keys.key_mismatches
        );
        if keys.key_mismatches > 0 {
            warn!(
                mismatches = keys.key_mismatches,
                "field lists differ between files"
            );
        }
        keys.arrays
    } else {
        compare_all_fields(fields, &left, &right)
    };
    for record in report.records.iter().filter(|record| !record.equal()) {
        println!("{record}");
    }
    println!("{}", report.stats);
    Ok(report.stats.mismatch_count == 0 && report.stats.error_count == 0)
}

fn scan(left: &str, right: &str, field: &str, wide: bool) -> AgcResult<bool> {
    let left = ParquetSource::open(left)?;
    let right = ParquetSource::open(right)?;
    let window = if wide {
        ScanWindow::WIDE
    } else {
        ScanWindow::NARROW
    };
    let boundaries = right.cluster_boundaries();
    info!(
        field,
        clusters = boundaries.len(),
        window = window.window,
        "scanning cluster boundaries"
    );
    let report = scan_cluster_boundaries(field, &left, &right, &boundaries, window);
    let mut all_matched = true;
    for (range, matched) in &report {
        if !matched {
            all_matched = false;
            println!("{field}: entries {}..{} differ", range.start, range.end);
        }
    }
    println!(
        "{} of {} ranges matched",
        report.iter().filter(|(_, matched)| *matched).count(),
        report.len()
    );
    Ok(all_matched)
}

#[allow(clippy::too_many_arguments)]
fn analyze(
    file: &str,
    process: String,
    variation: String,
    label: Option<String>,
    xsec: f64,
    nevts: u64,
    partition_size: Option<usize>,
    output: Option<String>,
) -> AgcResult<bool> {
    let source = ParquetSource::open(file)?;
    let label = label.unwrap_or_else(|| process.clone());
    let metadata = SampleMetadata::new(process, variation)
        .process_label(label)
        .xsec(xsec)
        .nevts(nevts);
    let mut options = AnalysisOptions::default();
    if let Some(partition_size) = partition_size {
        options = options.partition_size(partition_size);
    }
    let histograms = process_source(&source, &metadata, &options)?;
    print!("{histograms}");
    if let Some(output) = output {
        histograms.save(&output)?;
        info!(path = %output, "saved histograms");
    }
    Ok(true)
}

fn bench(files: &[String], fields: &[String]) -> AgcResult<bool> {
    let fields: Vec<String> = if fields.is_empty() {
        EventBatch::required_columns()
    } else {
        fields.to_vec()
    };
    let selected: Vec<&str> = fields.iter().map(String::as_str).collect();
    let mut timings: Vec<ReadTiming> = Vec::new();
    for file in files {
        timings.extend(run_read_benchmarks(
            file,
            || ParquetSource::open(file),
            &selected,
        )?);
    }
    timings.sort_by(|a, b| a.operation.cmp(&b.operation));
    println!("{:<16} {:<32} {:>10}", "source", "operation", "time(s)");
    for timing in &timings {
        println!("{timing}");
    }
    Ok(true)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Compare {
            left,
            right,
            fields,
        } => compare(&left, &right, &fields),
        Command::Scan {
            left,
            right,
            field,
            wide,
        } => scan(&left, &right, &field, wide),
        Command::Analyze {
            file,
            process,
            variation,
            label,
            xsec,
            nevts,
            partition_size,
            output,
        } => analyze(
            &file,
            process,
            variation,
            label,
            xsec,
            nevts,
            partition_size,
            output,
        ),
        Command::Bench { files, fields } => bench(&files, &fields),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
