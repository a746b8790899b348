use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats;

/// Integer pixel rectangle, top-left corner plus size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn intersection(&self, other: &BBox) -> BBox {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        // far corners in i64, they may not fit an i32
        let x2 = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let y2 = (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);
        if x2 <= x1 as i64 || y2 <= y1 as i64 {
            return BBox::default();
        }
        BBox::new(x1, y1, (x2 - x1 as i64) as i32, (y2 - y1 as i64) as i32)
    }

    /// Midpoint of the top-left and bottom-right corners, rounded half to
    /// even onto the pixel grid
    pub fn center(&self) -> (f64, f64) {
        let mid = |start: i32, size: i32| ((2 * start as i64 + size as i64) as f64 * 0.5).round_ties_even();
        (mid(self.x, self.width), mid(self.y, self.height))
    }
}

/// Intersection over union, 0 when both boxes are empty
pub fn overlap(ground_truth: &BBox, tracking_result: &BBox) -> f64 {
    let intersection = ground_truth.intersection(tracking_result).area();
    let union = ground_truth.area() + tracking_result.area() - intersection;
    if union <= 0 {
        return 0.;
    }
    intersection as f64 / union as f64
}

/// Distance in pixels between the box centers
pub fn center_error(ground_truth: &BBox, tracking_result: &BBox) -> f64 {
    let (gx, gy) = ground_truth.center();
    let (tx, ty) = tracking_result.center();
    ((gx - tx).powi(2) + (gy - ty).powi(2)).sqrt()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameResult {
    pub overlap: f64,
    /// `None` when the tracker reported no box
    pub error: Option<f64>,
    pub processing_time: f64,
    pub bbox_area: i64,
    pub valid: bool,
}

/// Per-sequence scores of one tracker, as stored in `summary.yaml`
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceTrackingSummary {
    pub average_overlap: f64,
    pub average_error: f64,
    pub average_processing_time: f64,
    pub valid_frame_percent: f64,
    pub reinit_count: u32,
}

/// Tracker name to its scores on one sequence.
pub type SequenceSummaries = BTreeMap<String, SequenceTrackingSummary>;

pub fn save_summaries(summaries: &SequenceSummaries, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    serde_yaml::to_writer(BufWriter::new(file), summaries)
        .with_context(|| format!("cannot write {}", path.display()))
}

#[derive(Debug)]
pub struct TrackerPerformanceEvaluator {
    tracker_name: String,
    results: Vec<FrameResult>,
    reinit_count: u32,
}

impl TrackerPerformanceEvaluator {
    pub fn new(tracker_name: &str) -> Self {
        Self {
            tracker_name: tracker_name.to_string(),
            results: vec![],
            reinit_count: 0,
        }
    }

    pub fn tracker_name(&self) -> &str {
        &self.tracker_name
    }

    pub fn results(&self) -> &[FrameResult] {
        &self.results
    }

    /// Score one frame. An invalid result counts as zero overlap and has no
    /// center error.
    pub fn add_frame_result(
        &mut self,
        ground_truth: &BBox,
        tracking_result: &BBox,
        processing_time: f64,
        valid: bool,
    ) -> &FrameResult {
        let result = if valid {
            FrameResult {
                overlap: overlap(ground_truth, tracking_result),
                error: Some(center_error(ground_truth, tracking_result)),
                processing_time,
                bbox_area: tracking_result.area(),
                valid,
            }
        } else {
            FrameResult {
                overlap: 0.,
                error: None,
                processing_time,
                bbox_area: 0,
                valid,
            }
        };
        self.results.push(result);
        &self.results[self.results.len() - 1]
    }

    pub fn tracking_reinited(&mut self) {
        debug!("Tracker {} reinited", self.tracker_name);
        self.reinit_count += 1;
    }

    pub fn reinit_count(&self) -> u32 {
        self.reinit_count
    }

    pub fn average_overlap(&self) -> f64 {
        let values: Vec<f64> = self.results.iter().map(|r| r.overlap).collect();
        stats::mean(&values).unwrap_or(0.)
    }

    pub fn average_error(&self) -> f64 {
        let values: Vec<f64> = self.results.iter().filter_map(|r| r.error).collect();
        stats::mean(&values).unwrap_or(0.)
    }

    pub fn average_processing_time(&self) -> f64 {
        let values: Vec<f64> = self.results.iter().map(|r| r.processing_time).collect();
        stats::mean(&values).unwrap_or(0.)
    }

    /// Share of frames with a valid tracking result, in percent
    pub fn valid_frame_percent(&self) -> f64 {
        if self.results.is_empty() {
            return 0.;
        }
        let valid = self.results.iter().filter(|r| r.valid).count();
        100. * valid as f64 / self.results.len() as f64
    }

    pub fn summary(&self) -> SequenceTrackingSummary {
        SequenceTrackingSummary {
            average_overlap: self.average_overlap(),
            average_error: self.average_error(),
            average_processing_time: self.average_processing_time(),
            valid_frame_percent: self.valid_frame_percent(),
            reinit_count: self.reinit_count,
        }
    }

    pub fn write_results<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "Frame,Overlap,Center Error,Processing Time,BBox Area,Valid")?;
        for (i, result) in self.results.iter().enumerate() {
            let error = result.error.map(|e| e.to_string()).unwrap_or_default();
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                i + 1,
                result.overlap,
                error,
                result.processing_time,
                result.bbox_area,
                result.valid as u8
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Average Overlap: {}", self.average_overlap())?;
        writeln!(writer, "Average Center Error: {}", self.average_error())?;
        Ok(())
    }

    pub fn save_results(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Could not open the file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_results(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_overlap() {
        let a = BBox::new(0, 0, 10, 10);
        assert_relative_eq!(overlap(&a, &a), 1.0);

        let b = BBox::new(5, 0, 10, 10);
        // 50 shared pixels out of 150
        assert_relative_eq!(overlap(&a, &b), 1. / 3., epsilon = 1e-12);

        let c = BBox::new(20, 20, 5, 5);
        assert_eq!(overlap(&a, &c), 0.);
        assert_eq!(a.intersection(&c), BBox::default());

        assert_eq!(overlap(&BBox::default(), &BBox::default()), 0.);
    }

    #[test]
    fn test_center_error() {
        let a = BBox::new(0, 0, 10, 10);
        let b = BBox::new(3, 4, 10, 10);
        assert_relative_eq!(center_error(&a, &b), 5.0, epsilon = 1e-12);
        assert_relative_eq!(center_error(&a, &a), 0.0);
    }

    #[test]
    fn test_center_on_pixel_grid() {
        assert_eq!(BBox::new(0, 0, 11, 11).center(), (6., 6.));
        assert_eq!(BBox::new(0, 0, 13, 9).center(), (6., 4.));
        let error = center_error(&BBox::new(0, 0, 11, 11), &BBox::new(0, 0, 10, 10));
        assert_relative_eq!(error, 2_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_far_boxes() {
        let a = BBox::new(2_000_000_000, 0, 2_000_000_000, 10);
        let b = BBox::new(0, 0, 20, 20);
        assert_eq!(a.intersection(&b), BBox::default());
        assert_eq!(overlap(&b, &a), 0.);
        assert_eq!(a.intersection(&a), a);
        assert_eq!(a.center(), (3e9, 5.));
    }

    #[test]
    fn test_evaluator() {
        let gt = BBox::new(0, 0, 10, 10);
        let mut evaluator = TrackerPerformanceEvaluator::new("CSRT");
        assert_eq!(evaluator.average_overlap(), 0.);
        assert_eq!(evaluator.valid_frame_percent(), 0.);

        evaluator.add_frame_result(&gt, &gt, 0.01, true);
        evaluator.add_frame_result(&gt, &BBox::new(3, 4, 10, 10), 0.03, true);
        let lost = evaluator.add_frame_result(&gt, &BBox::default(), 0.02, false);
        assert_eq!(lost.error, None);
        evaluator.tracking_reinited();

        let summary = evaluator.summary();
        let second_overlap = 42. / 158.;
        assert_relative_eq!(summary.average_overlap, (1. + second_overlap) / 3., epsilon = 1e-12);
        assert_relative_eq!(summary.average_error, 2.5, epsilon = 1e-12);
        assert_relative_eq!(summary.average_processing_time, 0.02, epsilon = 1e-12);
        assert_relative_eq!(summary.valid_frame_percent, 200. / 3., epsilon = 1e-12);
        assert_eq!(summary.reinit_count, 1);
    }

    #[test]
    fn test_write_results() {
        let gt = BBox::new(0, 0, 10, 10);
        let mut evaluator = TrackerPerformanceEvaluator::new("VIT");
        evaluator.add_frame_result(&gt, &gt, 0.5, true);
        evaluator.add_frame_result(&gt, &gt, 0.25, false);

        let mut out = vec![];
        evaluator.write_results(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Frame,Overlap,Center Error,Processing Time,BBox Area,Valid");
        assert_eq!(lines[1], "1,1,0,0.5,100,1");
        assert_eq!(lines[2], "2,0,,0.25,0,0");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Average Overlap: 0.5");
        assert_eq!(lines[5], "Average Center Error: 0");
    }

    #[test]
    fn test_summaries_yaml() {
        let mut summaries = SequenceSummaries::new();
        summaries.insert(
            "DaSiam".to_string(),
            SequenceTrackingSummary {
                average_overlap: 0.75,
                reinit_count: 2,
                ..Default::default()
            },
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.yaml");
        save_summaries(&summaries, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let read: SequenceSummaries = serde_yaml::from_str(&text).unwrap();
        assert_eq!(read, summaries);
        assert!(text.contains("reinit_count: 2"));
    }
}
