use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as AnyhowContext, Result};
use tracing::{info, warn};

use crate::config;
use crate::run_logs::{self, Metric, RunLog};
use crate::visualization::LineChart;

/// Text of the figures drawn for a metric
struct FigureText {
    file_name: &'static str,
    title: &'static str,
    y_label: &'static str,
    name: &'static str,
}

fn figure_text(metric: Metric) -> FigureText {
    match metric {
        Metric::Overlap => FigureText {
            file_name: "overlap_plot.png",
            title: "Overlap per Frame for All Trackers",
            y_label: "Overlap",
            name: "Overlap",
        },
        Metric::CenterError => FigureText {
            file_name: "center_error_plot.png",
            title: "Center Error per Frame for All Trackers",
            y_label: "Center Error",
            name: "Center Error",
        },
        Metric::ProcessingTime => FigureText {
            file_name: "processing_time_plot.png",
            title: "Processing Time per Frame for All Trackers",
            y_label: "Processing Time (s)",
            name: "Processing Time",
        },
        Metric::BBoxArea => FigureText {
            file_name: "bbox_area_plot.png",
            title: "Bounding Box Area per Frame for All Trackers",
            y_label: "BBox Area (px)",
            name: "BBox Area",
        },
    }
}

pub fn metric_chart(logs: &[RunLog], metric: Metric) -> LineChart {
    let figure = figure_text(metric);
    let mut chart = LineChart::new(figure.title, "Frame Number", figure.y_label);
    for log in logs {
        let points = log.series(metric).iter().map(|&(f, v)| (f as f64, v)).collect();
        chart.add_series(&format!("{} {}", log.tracker, figure.name), points);
    }
    chart
}

/// Metrics worth a plot: the area plot only when some log recorded areas
pub fn plotted_metrics(logs: &[RunLog]) -> Vec<Metric> {
    Metric::ALL
        .into_iter()
        .filter(|m| !m.is_optional() || logs.iter().any(|l| !l.series(*m).is_empty()))
        .collect()
}

pub fn write_averages<W: std::io::Write>(logs: &[RunLog], writer: &mut W) -> Result<()> {
    let metrics = plotted_metrics(logs);
    for log in logs {
        writeln!(writer, "Tracker: {}", log.tracker)?;
        for metric in &metrics {
            // nothing logged, nothing to average
            if let Some(avg) = log.average(*metric) {
                writeln!(writer, "  Average {}: {}", figure_text(*metric).name, avg)?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Plot every tracker log of `dir` into `dir/plots` and print the averages.
/// Returns the written image paths, none when `dir` does not exist.
pub fn process_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        println!("Directory '{}' does not exist.", dir.display());
        return Ok(vec![]);
    }
    let plots_dir = dir.join("plots");
    fs::create_dir_all(&plots_dir).with_context(|| format!("cannot create {}", plots_dir.display()))?;

    let logs = run_logs::load_run_logs(dir)?;
    if logs.is_empty() {
        warn!("no tracker logs in {}", dir.display());
    }

    let config = config::get();
    let mut written = vec![];
    for metric in plotted_metrics(&logs) {
        let path = plots_dir.join(figure_text(metric).file_name);
        metric_chart(&logs, metric).save(&path, config.figure_width, config.figure_height)?;
        info!("saved {}", path.display());
        written.push(path);
    }

    write_averages(&logs, &mut std::io::stdout().lock())?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(tracker: &str, with_area: bool) -> RunLog {
        RunLog {
            tracker: tracker.to_string(),
            overlaps: vec![(1, 0.5), (2, 0.7)],
            errors: vec![(1, 2.), (2, 4.)],
            processing_times: vec![(1, 0.1), (2, 0.2)],
            bbox_areas: if with_area { vec![(1, 100.)] } else { vec![] },
        }
    }

    #[test]
    fn test_plotted_metrics() {
        assert_eq!(plotted_metrics(&[log("VIT", false)]).len(), 3);
        assert_eq!(
            plotted_metrics(&[log("VIT", false), log("CSRT", true)]),
            Metric::ALL.to_vec()
        );
    }

    #[test]
    fn test_metric_chart() {
        let chart = metric_chart(&[log("CSRT", false), log("VIT", false)], Metric::CenterError);
        assert_eq!(chart.title, "Center Error per Frame for All Trackers");
        assert_eq!(chart.series[1].label, "VIT Center Error");
        assert_eq!(chart.series[0].points, vec![(1., 2.), (2., 4.)]);
    }

    #[test]
    fn test_write_averages() {
        let mut empty = log("DaSiam", false);
        empty.overlaps.clear();
        let mut out = vec![];
        write_averages(&[log("CSRT", false), empty], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Tracker: CSRT\n  Average Overlap: 0.6"));
        assert!(text.contains("  Average Center Error: 3\n"));
        assert!(text.contains("Tracker: DaSiam\n  Average Center Error: 3\n"));
        assert!(!text.contains("n/a"));
        assert!(!text.contains("BBox Area"));
    }

    #[test]
    fn test_process_directory() {
        let dir = tempfile::tempdir().unwrap();
        let header = "Frame,Overlap,Center Error,Processing Time,BBox Area,Valid\n";
        fs::write(dir.path().join("CSRT.csv"), format!("{header}1,0.5,2,0.1,100,1\n2,0.6,3,0.1,120,1\n")).unwrap();
        fs::write(dir.path().join("VIT.csv"), format!("{header}1,0.4,5,0.2,90,1\n")).unwrap();

        let written = process_directory(dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(dir.path().join("plots/overlap_plot.png").is_file());
        assert!(dir.path().join("plots/bbox_area_plot.png").is_file());

        assert!(process_directory(&dir.path().join("missing")).unwrap().is_empty());
    }
}
