//! densoff CLI: AMPCOR planning, offset stacking and offset cleaning for one pair.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use densoff::core::{GapFillParams, ResampleMethod};
use densoff::{FilterPreset, PairConfig};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "densoff")]
#[command(about = "Dense offset-map post-processing for InSAR pairs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PairArgs {
    /// JSON pair configuration; explicit flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the SLCs, their parameter files and matcher outputs.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output directory (defaults to the data directory).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Reference scene id.
    #[arg(long)]
    reference: Option<String>,

    /// Secondary scene id.
    #[arg(long)]
    secondary: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write AMPCOR chunk inputs and the batch script.
    PlanAmpcor {
        #[command(flatten)]
        pair: PairArgs,

        /// Number of parallel matcher jobs.
        #[arg(long)]
        n_proc: Option<usize>,

        /// Initial range offset.
        #[arg(long, allow_hyphen_values = true)]
        r0: Option<i64>,

        /// Initial azimuth offset.
        #[arg(long, allow_hyphen_values = true)]
        z0: Option<i64>,

        /// AMPCOR binary named in the batch script.
        #[arg(long)]
        ampcor_bin: Option<String>,
    },
    /// Stack matcher outputs onto the estimation grid.
    Stack {
        #[command(flatten)]
        pair: PairArgs,

        /// Rows list centres first (`x y dx dy snr`) instead of AMPCOR order.
        #[arg(long)]
        centers_first: bool,
    },
    /// Clean, detrend and regrid a stacked offset map.
    Clean {
        #[command(flatten)]
        pair: PairArgs,

        /// Outlier filter preset (1: kernel 9 / threshold 1, 2: kernel 15 / threshold 0.5).
        #[arg(long)]
        off_filter: Option<u8>,

        /// Apply 7x7 boxcar smoothing.
        #[arg(long)]
        off_smooth: bool,

        /// Fill gaps before regridding.
        #[arg(long)]
        off_fill: bool,

        /// Output offset spacing in pixels (range and azimuth).
        #[arg(long)]
        out_off_spacing: Option<i64>,

        /// Resampling method: nearest, bilinear, cubic or average.
        #[arg(long)]
        resampling: Option<ResampleMethod>,

        /// Interferogram-forming binary named in the companion script.
        #[arg(long)]
        interf_bin: Option<String>,
    },
    /// Print a summary of an offset parameter file.
    Describe {
        /// Parameter file to describe.
        par: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::PlanAmpcor {
            pair,
            n_proc,
            r0,
            z0,
            ampcor_bin,
        } => {
            let mut config = load_config(&pair)?;
            if let Some(n) = n_proc {
                config.n_proc = n;
            }
            if let Some(r0) = r0 {
                config.initial_offset.0 = r0;
            }
            if let Some(z0) = z0 {
                config.initial_offset.1 = z0;
            }
            if let Some(bin) = ampcor_bin {
                config.ampcor_bin = bin;
            }
            let written = densoff::plan_ampcor(&config)?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Stack {
            pair,
            centers_first,
        } => {
            let mut config = load_config(&pair)?;
            if centers_first {
                config.layout = densoff::io::ColumnLayout::CentersFirst;
            }
            let stacked = densoff::stack_pair(&config)?;
            println!("{}", stacked.params.describe());
        }
        Commands::Clean {
            pair,
            off_filter,
            off_smooth,
            off_fill,
            out_off_spacing,
            resampling,
            interf_bin,
        } => {
            let mut config = load_config(&pair)?;
            if let Some(id) = off_filter {
                config.cleaner.preset = FilterPreset::from_id(id)?;
            }
            if off_smooth {
                config.cleaner.boxcar = Some(7);
            }
            if off_fill {
                config.cleaner.fill = Some(GapFillParams::default());
            }
            if let Some(spacing) = out_off_spacing {
                config.cleaner.target_spacing = Some((spacing, spacing));
            }
            if let Some(method) = resampling {
                config.cleaner.resampling = method;
            }
            if let Some(bin) = interf_bin {
                config.interf_bin = bin;
            }
            let cleaned = densoff::clean_pair(&config)?;
            println!("{}", serde_json::to_string_pretty(&cleaned.report)?);
        }
        Commands::Describe { par } => {
            let summary = densoff::pipeline::describe_par(&par)
                .with_context(|| format!("Failed to read {}", par.display()))?;
            print!("{}", summary);
        }
    }

    log::info!("Computation time: {:.2?}", start.elapsed());
    Ok(())
}

fn load_config(args: &PairArgs) -> Result<PairConfig> {
    let mut config = match &args.config {
        Some(path) => PairConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => {
            let (Some(data_dir), Some(reference), Some(secondary)) =
                (&args.data_dir, &args.reference, &args.secondary)
            else {
                bail!("--data-dir, --reference and --secondary are required without --config");
            };
            PairConfig::new(data_dir, reference, secondary)
        }
    };
    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(reference) = &args.reference {
        config.reference = reference.clone();
    }
    if let Some(secondary) = &args.secondary {
        config.secondary = secondary.clone();
    }
    if let Some(out_dir) = &args.out_dir {
        config.out_dir = Some(out_dir.clone());
    }
    config.validate()?;
    Ok(config)
}
