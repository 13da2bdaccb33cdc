use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ipsummary::analysis::{write_json_report, write_text_report, TrafficReport};
use ipsummary::config::{ReportFormat, RunConfig};
use ipsummary::config_loader::{self, CliOverrides};
use ipsummary::{orchestrator, registry};

/// Attribute metered traffic to registry owners by longest-prefix match
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Registry file with one '<owner> <cidr-prefix>' entry per line
    registry: PathBuf,

    /// Traffic log file ('-' for standard input)
    #[arg(short, long, default_value = "-")]
    log: PathBuf,

    /// Report output file ('-' for standard output)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Optional YAML run configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Number of parallel workers (1 = sequential, 0 = auto-detect)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Records per shard in parallel mode
    #[arg(long)]
    shard_size: Option<usize>,

    /// Check that reported totals add up to the bytes consumed
    #[arg(long)]
    verify: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config_loader::load_config(path)?,
        None => RunConfig::default(),
    };
    let overrides = CliOverrides {
        threads: args.threads,
        shard_size: args.shard_size,
        format: args.format,
        log_level: args.log_level.clone(),
        verify: args.verify,
    };
    config_loader::apply_cli_overrides(&mut config, &overrides)?;

    // Initialize logging; RUST_LOG takes precedence over the configured level
    env_logger::Builder::from_env(Env::default().default_filter_or(&config.log_level)).init();

    info!("Registry file: {:?}", args.registry);
    info!("Log source: {:?}", args.log);

    // The registry must load completely before any record is attributed
    let registry = registry::load_registry(&args.registry)
        .wrap_err_with(|| format!("Failed to load registry '{}'", args.registry.display()))?;

    let input: Box<dyn BufRead> = if is_stdio(&args.log) {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&args.log)
            .wrap_err_with(|| format!("Failed to open log file '{}'", args.log.display()))?;
        Box::new(BufReader::with_capacity(64 * 1024, file))
    };

    let outcome = orchestrator::run(&registry, input, &config)?;

    let mut output: Box<dyn Write> = if is_stdio(&args.output) {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        let file = File::create(&args.output)
            .wrap_err_with(|| format!("Failed to create output file '{}'", args.output.display()))?;
        Box::new(BufWriter::new(file))
    };

    match config.format {
        ReportFormat::Text => {
            write_text_report(&outcome.table, &mut output).wrap_err("Failed to write report")?
        }
        ReportFormat::Json => {
            write_json_report(&TrafficReport::new(&outcome.table, &outcome.stats), &mut output)?
        }
    }
    output.flush().wrap_err("Failed to write report")?;

    if outcome.stats.malformed > 0 {
        eprintln!("{} malformed log records skipped", outcome.stats.malformed);
    }

    info!("Attribution completed successfully");
    Ok(())
}
