use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info};

use indelstat::{
    read_indel_report_from_file, write_barcode_stats_to_file, AnalyzerConfig, IndelAnalyzer,
    IndelstatError,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Tab-separated indel report with a header row
    #[clap(long)]
    input: PathBuf,

    /// Where to write the statistics table. Defaults to <input>_analyzed.csv
    #[clap(long)]
    output: Option<PathBuf>,

    /// Name of the barcode column in the input report
    #[clap(long, default_value = "Barcode")]
    barcode_column: String,

    /// Name of the info-string column in the input report
    #[clap(long, default_value = "Info")]
    info_column: String,

    /// Allowed deviation of a kind's ratio sum from 100% before a warning is logged
    #[clap(long, default_value_t = 10.0)]
    ratio_tolerance: f64,

    /// Skip malformed or observation-free barcodes instead of aborting the run
    #[clap(long)]
    skip_invalid: bool,

    /// Number of worker threads. Defaults to one per CPU core
    #[clap(long)]
    threads: Option<usize>,
}

fn main() {
    if let Err(_) = std::env::var("RUST_LOG") {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init_timed();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), IndelstatError> {
    if let Some(threads) = args.threads {
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global();
    }

    let config = AnalyzerConfig {
        barcode_column: args.barcode_column.clone(),
        info_column: args.info_column.clone(),
        ratio_sum_tolerance: args.ratio_tolerance,
        skip_invalid: args.skip_invalid,
    };

    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output_path(&args.input),
    };

    info!("Loading indel report from {}", args.input.display());
    let report = read_indel_report_from_file(&args.input, &config)?;
    info!("Data load completed: {} barcodes", report.len());

    let analyzer = IndelAnalyzer::new(config);
    let stats = analyzer.analyze(&report)?;

    write_barcode_stats_to_file(&output, &stats)?;
    info!(
        "Wrote statistics for {} barcodes to {}",
        stats.len(),
        output.display()
    );
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push("_analyzed.csv");
    PathBuf::from(name)
}
