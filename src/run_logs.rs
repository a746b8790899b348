//! Per-frame tracker logs, as written by the evaluator:
//!
//! ```text
//! Frame,Overlap,Center Error,Processing Time,BBox Area,Valid
//! 1,0.8123,3.2,0.0121,1520,1
//! 2,0,,0.0119,0,0
//!
//! Average Overlap: 0.40615
//! Average Center Error: 3.2
//! ```
//!
//! Older logs lack the `BBox Area` and `Valid` columns. Empty cells mark a
//! value the tracker could not produce for that frame.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use tracing::debug;

use crate::files;
use crate::stats;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Overlap,
    CenterError,
    ProcessingTime,
    BBoxArea,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Overlap,
        Metric::CenterError,
        Metric::ProcessingTime,
        Metric::BBoxArea,
    ];

    /// Header of the CSV column holding the metric
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Overlap => "Overlap",
            Metric::CenterError => "Center Error",
            Metric::ProcessingTime => "Processing Time",
            Metric::BBoxArea => "BBox Area",
        }
    }

    /// Only the area column may be absent from a log
    pub fn is_optional(&self) -> bool {
        *self == Metric::BBoxArea
    }
}

/// One tracker's run, a `(frame, value)` series per metric
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunLog {
    pub tracker: String,
    pub overlaps: Vec<(u32, f64)>,
    pub errors: Vec<(u32, f64)>,
    pub processing_times: Vec<(u32, f64)>,
    pub bbox_areas: Vec<(u32, f64)>,
}

impl RunLog {
    pub fn series(&self, metric: Metric) -> &[(u32, f64)] {
        match metric {
            Metric::Overlap => &self.overlaps,
            Metric::CenterError => &self.errors,
            Metric::ProcessingTime => &self.processing_times,
            Metric::BBoxArea => &self.bbox_areas,
        }
    }

    fn series_mut(&mut self, metric: Metric) -> &mut Vec<(u32, f64)> {
        match metric {
            Metric::Overlap => &mut self.overlaps,
            Metric::CenterError => &mut self.errors,
            Metric::ProcessingTime => &mut self.processing_times,
            Metric::BBoxArea => &mut self.bbox_areas,
        }
    }

    pub fn average(&self, metric: Metric) -> Option<f64> {
        let values: Vec<f64> = self.series(metric).iter().map(|p| p.1).collect();
        stats::mean(&values)
    }
}

fn is_frame_number(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

pub fn read_run_log<R: Read>(tracker: &str, reader: R) -> Result<RunLog> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let index = |name: &str| headers.iter().position(|h| h == name);
    let frame_index = index("Frame").ok_or_else(|| anyhow!("missing column Frame"))?;
    let mut columns = vec![];
    for metric in Metric::ALL {
        match index(metric.column()) {
            Some(i) => columns.push((metric, i)),
            None if metric.is_optional() => {}
            None => return Err(anyhow!("missing column {}", metric.column())),
        }
    }

    let mut log = RunLog {
        tracker: tracker.to_string(),
        ..Default::default()
    };
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let frame = record.get(frame_index).unwrap_or_default();
        // trailer lines such as "Average Overlap: 0.5"
        if !is_frame_number(frame) {
            continue;
        }
        let frame: u32 = frame
            .parse()
            .with_context(|| format!("row {}: bad Frame value {:?}", row + 2, frame))?;
        for &(metric, i) in &columns {
            let cell = record.get(i).unwrap_or_default();
            if cell.is_empty() {
                continue;
            }
            let value: f64 = cell
                .parse()
                .with_context(|| format!("row {}: bad {} value {:?}", row + 2, metric.column(), cell))?;
            log.series_mut(metric).push((frame, value));
        }
    }
    Ok(log)
}

/// Every `*.csv` log of `dir`, sorted by tracker name (the file stem)
pub fn load_run_logs(dir: &Path) -> Result<Vec<RunLog>> {
    let paths = files::find_files(dir, "*.csv")?;

    let mut logs = vec![];
    for path in paths {
        let tracker = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let file = fs::File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
        let log = read_run_log(&tracker, file).with_context(|| format!("cannot parse {}", path.display()))?;
        debug!("{}: {} frames", tracker, log.overlaps.len());
        logs.push(log);
    }
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_read_full_log() {
        let text = "Frame,Overlap,Center Error,Processing Time,BBox Area,Valid\n\
                    1,0.8,3.0,0.01,1500,1\n\
                    2,0,,0.03,0,0\n\
                    \n\
                    Average Overlap: 0.4\n\
                    Average Center Error: 3\n";
        let log = read_run_log("CSRT_results", text.as_bytes()).unwrap();
        assert_eq!(log.tracker, "CSRT_results");
        assert_eq!(log.overlaps, vec![(1, 0.8), (2, 0.)]);
        assert_eq!(log.errors, vec![(1, 3.)]);
        assert_eq!(log.bbox_areas, vec![(1, 1500.), (2, 0.)]);
        assert_relative_eq!(log.average(Metric::ProcessingTime).unwrap(), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_read_log_without_area() {
        let text = "Frame,Overlap,Center Error,Processing Time\n1,0.5,2,0.1\n2,0.7,4,0.3\n";
        let log = read_run_log("VIT", text.as_bytes()).unwrap();
        assert!(log.bbox_areas.is_empty());
        assert_eq!(log.average(Metric::BBoxArea), None);
        assert_relative_eq!(log.average(Metric::CenterError).unwrap(), 3.);
    }

    #[test]
    fn test_read_bad_log() {
        let text = "Frame,Overlap,Processing Time\n1,0.5,0.1\n";
        assert!(read_run_log("VIT", text.as_bytes()).is_err());

        let text = "Frame,Overlap,Center Error,Processing Time\n1,high,2,0.1\n";
        assert!(read_run_log("VIT", text.as_bytes()).is_err());

        let text = "Frame,Overlap,Center Error,Processing Time\n1,0.5,2,0.1\n99999999999,0.5,2,0.1\n";
        let err = read_run_log("VIT", text.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("row 3: bad Frame value"));
    }

    #[test]
    fn test_load_run_logs() {
        let dir = tempfile::tempdir().unwrap();
        let header = "Frame,Overlap,Center Error,Processing Time\n";
        fs::write(dir.path().join("VIT.csv"), format!("{header}1,0.5,2,0.1\n")).unwrap();
        fs::write(dir.path().join("CSRT.csv"), header).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("plots")).unwrap();

        let logs = load_run_logs(dir.path()).unwrap();
        let names: Vec<_> = logs.iter().map(|l| l.tracker.as_str()).collect();
        assert_eq!(names, vec!["CSRT", "VIT"]);
        assert!(logs[0].overlaps.is_empty());
    }
}
