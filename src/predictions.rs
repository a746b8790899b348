//! Tracker outputs and their scoring against ground truth.
//!
//! A tracker output file holds one line per processed frame:
//!
//! ```text
//! 1,120,64,40,38,0.0123
//! 2,0.0310
//! 3
//! ```
//!
//! `frame,x,y,w,h,seconds` for a pixel box, `frame,seconds` or a bare frame
//! index when the tracker lost the target on that frame.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as AnyhowContext, Result};
use chrono::Local;
use tracing::{debug, info, warn};

use crate::annotations::{ImageSize, NormalizedBox};
use crate::evaluation::{self, BBox, SequenceSummaries, TrackerPerformanceEvaluator};
use crate::files;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    pub frame: usize,
    /// `None` when the target was lost
    pub bbox: Option<BBox>,
    pub processing_time: f64,
}

pub fn read_predictions<R: BufRead>(reader: R) -> Result<Vec<Prediction>> {
    let mut predictions = vec![];
    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let context = || format!("line {}: {:?}", line_number + 1, line);

        let frame: usize = fields[0].parse().with_context(context)?;
        let prediction = match fields.len() {
            1 => Prediction {
                frame,
                bbox: None,
                processing_time: 0.,
            },
            2 => Prediction {
                frame,
                bbox: None,
                processing_time: fields[1].parse().with_context(context)?,
            },
            6 => {
                let mut v = [0; 4];
                for (i, field) in fields[1..5].iter().enumerate() {
                    // boxes are sometimes logged with sub-pixel precision
                    let value: f64 = field.parse().with_context(context)?;
                    v[i] = value.round() as i32;
                }
                Prediction {
                    frame,
                    bbox: Some(BBox::new(v[0], v[1], v[2], v[3])),
                    processing_time: fields[5].parse().with_context(context)?,
                }
            }
            n => bail!("line {}: expected 1, 2 or 6 fields, got {}", line_number + 1, n),
        };
        predictions.push(prediction);
    }
    Ok(predictions)
}

pub fn load_predictions(path: &Path) -> Result<Vec<Prediction>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    read_predictions(BufReader::new(file)).with_context(|| format!("cannot parse {}", path.display()))
}

/// Score one tracker on a sequence. Frames without ground truth are skipped,
/// a box reported right after a lost frame counts as a re-initialisation.
pub fn evaluate_tracker(
    tracker_name: &str,
    ground_truth: &[Option<NormalizedBox>],
    size: ImageSize,
    predictions: &[Prediction],
) -> TrackerPerformanceEvaluator {
    let mut evaluator = TrackerPerformanceEvaluator::new(tracker_name);
    let mut lost = false;
    for prediction in predictions {
        // recovery counts even when the lost frame had no ground truth
        if prediction.bbox.is_some() && lost {
            evaluator.tracking_reinited();
        }
        lost = prediction.bbox.is_none();

        let Some(Some(gt)) = ground_truth.get(prediction.frame) else {
            debug!("{tracker_name}: no ground truth for frame {}", prediction.frame);
            continue;
        };
        let gt = gt.to_pixels(size);
        match prediction.bbox {
            Some(bbox) => evaluator.add_frame_result(&gt, &bbox, prediction.processing_time, true),
            None => evaluator.add_frame_result(&gt, &BBox::default(), prediction.processing_time, false),
        };
    }
    evaluator
}

/// Tracker output files of a directory, keyed by file stem
pub fn find_prediction_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut outputs = vec![];
    for path in files::find_files(dir, "*.txt")? {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            outputs.push((stem.to_string(), path.clone()));
        }
    }
    outputs.sort();
    Ok(outputs)
}

/// `<base>/<local time>` named as `2024-05-01_13-45-00`, created on disk
pub fn create_run_directory(base: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let dir = base.join(stamp);
    fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(dir)
}

/// Score every tracker output against the ground truth, writing
/// `<tracker>_results.csv` files and `summary.yaml` into `output`.
pub fn evaluate_run(
    ground_truth: &[Option<NormalizedBox>],
    size: ImageSize,
    predictions_dir: &Path,
    output: &Path,
) -> Result<SequenceSummaries> {
    let files = find_prediction_files(predictions_dir)?;
    if files.is_empty() {
        warn!("no tracker outputs in {}", predictions_dir.display());
    }

    let mut summaries = SequenceSummaries::new();
    for (name, path) in files {
        let predictions = load_predictions(&path)?;
        let evaluator = evaluate_tracker(&name, ground_truth, size, &predictions);
        info!(
            "{}: {} frames scored, average overlap {:.3}",
            name,
            evaluator.results().len(),
            evaluator.average_overlap()
        );
        evaluator.save_results(&output.join(format!("{name}_results.csv")))?;
        summaries.insert(name, evaluator.summary());
    }
    evaluation::save_summaries(&summaries, &output.join("summary.yaml"))?;
    Ok(summaries)
}
