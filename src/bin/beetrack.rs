//! beetrack - identity stabilization for detector output
//!
//! Usage:
//!   beetrack fix-ids <INPUT> --num-objects 5          Write <INPUT stem>_fixed_ids.csv
//!   beetrack fix-ids <INPUT> -n 5 -o out.csv          Write to an explicit path
//!   beetrack fix-ids <INPUT> --config track.yaml      Read settings from YAML

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use beetrack_rs::integration::default_output_path;
use beetrack_rs::tracker::ConfigFile;
use beetrack_rs::{DetectionTable, MatchingStrategy, StabilizationPipeline, UnobservedPolicy};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

#[derive(Parser)]
#[command(name = "beetrack", version, about = "Stable identities for per-frame detections")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign stable identities and fill missing detections
    FixIds(FixIdsArgs),
}

#[derive(clap::Args)]
struct FixIdsArgs {
    /// Raw detection CSV with frame_id, class_id, x, y columns
    input: PathBuf,

    /// Output CSV path [default: <INPUT stem>_fixed_ids.csv]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of tracked objects
    #[arg(short, long)]
    num_objects: Option<usize>,

    /// YAML file with stabilizer settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Class id removed before assignment
    #[arg(long)]
    feeder_class_id: Option<i64>,

    /// Matching strategy for identities seen in earlier frames
    #[arg(long, value_enum)]
    matching: Option<MatchingArg>,

    /// Handling of identities that are never detected
    #[arg(long, value_enum)]
    unobserved_policy: Option<PolicyArg>,

    /// Let late detections claim identities missing on the first frame
    #[arg(long)]
    activate_late_identities: bool,

    /// Run without writing the output
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchingArg {
    Optimal,
    Greedy,
}

impl From<MatchingArg> for MatchingStrategy {
    fn from(arg: MatchingArg) -> Self {
        match arg {
            MatchingArg::Optimal => MatchingStrategy::Optimal,
            MatchingArg::Greedy => MatchingStrategy::Greedy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Placeholder,
    Fail,
}

impl From<PolicyArg> for UnobservedPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Placeholder => UnobservedPolicy::Placeholder,
            PolicyArg::Fail => UnobservedPolicy::Fail,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::FixIds(args) => cmd_fix_ids(args),
    }
}

fn cmd_fix_ids(args: FixIdsArgs) -> Result<()> {
    let file = match &args.config {
        Some(path) => ConfigFile::from_yaml_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ConfigFile::default(),
    };
    let overrides = ConfigFile {
        num_objects: args.num_objects.or(file.num_objects),
        feeder_class_id: args.feeder_class_id.or(file.feeder_class_id),
        matching: args.matching.map(Into::into).or(file.matching),
        unobserved_policy: args.unobserved_policy.map(Into::into).or(file.unobserved_policy),
        activate_late_identities: args
            .activate_late_identities
            .then_some(true)
            .or(file.activate_late_identities),
    };
    let config = overrides.into_config(None)?;

    let table = DetectionTable::from_path(&args.input)
        .with_context(|| format!("Failed to read detections: {}", args.input.display()))?;

    let pipeline = StabilizationPipeline::new(config)?;
    let stabilized = pipeline.process_table(&table)?;
    if stabilized.is_empty() {
        bail!(
            "No detections left in {} after removing class {}",
            args.input.display(),
            pipeline.stabilizer().config().feeder_class_id
        );
    }

    info!(report = %stabilized.report(), "stabilized {}", args.input.display());

    if args.dry_run {
        info!("dry run, not writing output");
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));
    stabilized
        .write_path(&output)
        .with_context(|| format!("Failed to write output: {}", output.display()))?;
    info!(path = %output.display(), rows = stabilized.len(), "wrote stabilized table");
    Ok(())
}
