use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter::LevelFilter, prelude::*};

use tracker_bench::annotations::{self, ImageSize};
use tracker_bench::config::*;
use tracker_bench::dataset;
use tracker_bench::plot_results;
use tracker_bench::predictions;
use tracker_bench::summary_table;
use tracker_bench::video_stats;

#[derive(Parser)]
#[clap(name = "tracker-bench", about = "Tools for tracker benchmark datasets and results")]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
    #[clap(flatten)]
    pub config: Config,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert an XML annotation export to the normalized text format
    ConvertAnnotations { input: PathBuf, output: PathBuf },
    /// Frame and duration statistics of every video below a directory
    DatasetStats {
        root: PathBuf,
        /// Also write the statistics as JSON
        #[clap(long)]
        json: Option<PathBuf>,
    },
    /// List the tracking sequences of a directory
    DatasetInfo { dir: PathBuf },
    /// Score tracker outputs against a sequence's ground truth
    Evaluate {
        sequence: PathBuf,
        predictions: PathBuf,
        #[clap(long, default_value = "runs")]
        output: PathBuf,
        /// Frame width, read from the media when omitted
        #[clap(long, requires = "height")]
        width: Option<u32>,
        #[clap(long, requires = "width")]
        height: Option<u32>,
    },
    /// Plot per-frame tracker logs of a run directory
    PlotResults { dir: PathBuf },
    /// Comparison tables over every summary.yaml of an experiment
    SummaryTable { base_dir: PathBuf },
}

fn evaluate(
    sequence: &Path,
    predictions_dir: &Path,
    output: &Path,
    size: Option<ImageSize>,
) -> Result<()> {
    let info = dataset::dataset_info(sequence)?;
    let ground_truth = info.load_ground_truth()?;
    let size = match size {
        Some(size) => size,
        None => info.media_size()?,
    };
    if size.width == 0 || size.height == 0 {
        bail!("frame size must be positive, got {}x{}", size.width, size.height);
    }

    let run_dir = predictions::create_run_directory(output)?;
    let summaries = predictions::evaluate_run(&ground_truth, size, predictions_dir, &run_dir)?;
    println!("Evaluated {} trackers into {}", summaries.len(), run_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    // parse the config
    let args = Args::parse();
    let level = if args.config.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let _ = CONFIG.set(args.config);

    // setup logging
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stdout_writer()))
        .with(indicatif_layer)
        .init();

    match args.command {
        Command::ConvertAnnotations { input, output } => {
            let track = annotations::convert_xml_to_txt(&input, &output)?;
            info!(
                "{} boxes over {} frames written to {}",
                track.boxes.len(),
                track.total_frames,
                output.display()
            );
        }
        Command::DatasetStats { root, json } => {
            let stats = video_stats::analyze_dataset(&root)?;
            stats.write_report(&mut std::io::stdout().lock())?;
            if let Some(path) = json {
                video_stats::save_json(&stats, &path)?;
            }
        }
        Command::DatasetInfo { dir } => {
            for info in dataset::load_dataset_infos(&dir)? {
                println!("{info}");
            }
        }
        Command::Evaluate {
            sequence,
            predictions,
            output,
            width,
            height,
        } => {
            let size = width.zip(height).map(|(width, height)| ImageSize { width, height });
            evaluate(&sequence, &predictions, &output, size)?;
        }
        Command::PlotResults { dir } => {
            plot_results::process_directory(&dir)?;
        }
        Command::SummaryTable { base_dir } => {
            summary_table::process_experiment(&base_dir)?;
        }
    }

    Ok(())
}
