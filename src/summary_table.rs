//! Comparison tables over experiment summaries.
//!
//! An experiment directory holds a `config.yaml` and any number of
//! sub-directories with a `summary.yaml` mapping each tracker to its
//! sequence scores. Every summary becomes one table, and all of them
//! together the overall table with mean and standard deviation per cell.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as AnyhowContext, Result};
use tracing::{info, warn};

use crate::config::{self, ExperimentConfig};
use crate::files;
use crate::stats;
use crate::visualization::{BarChart, TableImage};

/// Trackers compared in every experiment, in table order
pub const TRACKERS: [&str; 4] = ["CSRT", "VIT", "ModVIT", "DaSiam"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Best {
    Max,
    Min,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    AverageOverlap,
    AverageError,
    AverageProcessingTime,
    ValidFramePercent,
    ReinitCount,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::AverageOverlap,
        Column::AverageError,
        Column::AverageProcessingTime,
        Column::ValidFramePercent,
        Column::ReinitCount,
    ];

    /// Key in `summary.yaml` and column label
    pub fn key(&self) -> &'static str {
        match self {
            Column::AverageOverlap => "average_overlap",
            Column::AverageError => "average_error",
            Column::AverageProcessingTime => "average_processing_time",
            Column::ValidFramePercent => "valid_frame_percent",
            Column::ReinitCount => "reinit_count",
        }
    }

    /// Overlap and valid frames are better high, errors, times and
    /// re-initialisations better low.
    pub fn best(&self) -> Best {
        match self {
            Column::AverageOverlap | Column::ValidFramePercent => Best::Max,
            _ => Best::Min,
        }
    }
}

/// Columns shown for an experiment: re-initialisations mean nothing when
/// trackers were only initialised once.
pub fn visible_columns(config: &ExperimentConfig) -> Vec<Column> {
    Column::ALL
        .into_iter()
        .filter(|c| !(config.is_one_init() && *c == Column::ReinitCount))
        .collect()
}

/// Collected values, indexed by tracker then by column
#[derive(Clone, Debug, PartialEq)]
pub struct Samples {
    values: Vec<Vec<Vec<f64>>>,
}

impl Default for Samples {
    fn default() -> Self {
        Self {
            values: vec![vec![vec![]; Column::ALL.len()]; TRACKERS.len()],
        }
    }
}

impl Samples {
    /// Values of one `summary.yaml`. Every tracker must list every column.
    pub fn from_summary(text: &str) -> Result<Samples> {
        let data: serde_yaml::Value = serde_yaml::from_str(text)?;
        let mut samples = Samples::default();
        for (t, tracker) in TRACKERS.iter().enumerate() {
            let scores = data
                .get(*tracker)
                .ok_or_else(|| anyhow!("no results for tracker {tracker}"))?;
            for (c, column) in Column::ALL.iter().enumerate() {
                let value = scores
                    .get(column.key())
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| anyhow!("{tracker} has no numeric {}", column.key()))?;
                samples.values[t][c].push(value);
            }
        }
        Ok(samples)
    }

    pub fn load(path: &Path) -> Result<Samples> {
        let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
        Samples::from_summary(&text).with_context(|| format!("invalid summary {}", path.display()))
    }

    pub fn extend(&mut self, other: &Samples) {
        for (mine, theirs) in self.values.iter_mut().zip(&other.values) {
            for (a, b) in mine.iter_mut().zip(theirs) {
                a.extend_from_slice(b);
            }
        }
    }

    pub fn values(&self, tracker: usize, column: Column) -> &[f64] {
        &self.values[tracker][column as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().flatten().all(|v| v.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub tracker: String,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

/// Per tracker mean and standard deviation of every visible column,
/// rounded to the configured precision
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonTable {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

impl ComparisonTable {
    pub fn new(samples: &Samples, columns: &[Column], precision: u32) -> ComparisonTable {
        let rows = TRACKERS
            .iter()
            .enumerate()
            .map(|(t, tracker)| {
                let mut means = vec![];
                let mut stds = vec![];
                for column in columns {
                    let values = samples.values(t, *column);
                    let mean = stats::mean(values).unwrap_or(f64::NAN);
                    let std = stats::std(values).unwrap_or(f64::NAN);
                    means.push(stats::round_to(mean, precision));
                    stds.push(stats::round_to(std, precision));
                }
                TableRow {
                    tracker: tracker.to_string(),
                    means,
                    stds,
                }
            })
            .collect();
        ComparisonTable {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Best mean of a column under its rule
    pub fn best_value(&self, column: usize) -> Option<f64> {
        let values: Vec<f64> = self.rows.iter().map(|r| r.means[column]).collect();
        match self.columns[column].best() {
            Best::Max => stats::max(&values),
            Best::Min => stats::min(&values),
        }
    }

    /// Cells holding their column's best value; ties are all marked
    pub fn highlighted(&self) -> Vec<Vec<bool>> {
        let best: Vec<Option<f64>> = (0..self.columns.len()).map(|j| self.best_value(j)).collect();
        self.rows
            .iter()
            .map(|row| {
                row.means
                    .iter()
                    .zip(&best)
                    .map(|(v, b)| Some(*v) == *b)
                    .collect()
            })
            .collect()
    }

    pub fn to_image(&self) -> TableImage {
        TableImage {
            column_labels: self.columns.iter().map(|c| c.key().to_string()).collect(),
            row_labels: self.rows.iter().map(|r| r.tracker.clone()).collect(),
            cells: self
                .rows
                .iter()
                .map(|r| r.means.iter().map(|v| v.to_string()).collect())
                .collect(),
            highlighted: self.highlighted(),
        }
    }

    pub fn to_bar_chart(&self, title: &str) -> BarChart {
        let mut chart = BarChart::new(title, self.rows.iter().map(|r| r.tracker.clone()).collect());
        for (j, column) in self.columns.iter().enumerate() {
            let values = self.rows.iter().map(|r| r.means[j]).collect();
            let errors = self.rows.iter().map(|r| Some(r.stds[j])).collect();
            chart.add_group(column.key(), values, errors);
        }
        chart
    }

    /// Aligned text rendering, with `± std` next to each mean when asked
    pub fn format_text(&self, with_std: bool) -> String {
        let cell = |row: &TableRow, j: usize| {
            if with_std {
                format!("{} ± {}", row.means[j], row.stds[j])
            } else {
                row.means[j].to_string()
            }
        };
        let label_width = self.rows.iter().map(|r| r.tracker.len()).max().unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| {
                self.rows
                    .iter()
                    .map(|r| cell(r, j).chars().count())
                    .chain(std::iter::once(c.key().len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = format!("{:label_width$}", "");
        for (column, width) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", column.key()));
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format!("{:label_width$}", row.tracker));
            for (j, width) in widths.iter().enumerate() {
                out.push_str(&format!("  {:>width$}", cell(row, j)));
            }
            out.push('\n');
        }
        out
    }
}

/// Directories below `root` (itself included) holding a `summary.yaml`,
/// in sorted order
pub fn find_summaries(root: &Path) -> Result<Vec<PathBuf>> {
    files::find_files(root, "**/summary.yaml")
}

fn save_table(table: &ComparisonTable, path: &Path) -> Result<()> {
    table.to_image().save(path)?;
    println!("Results table saved as an image to {}", path.display());
    Ok(())
}

/// Render one table per `summary.yaml` below `base_dir` and the overall
/// table into `base_dir/plots`. Returns the overall table, `None` when no
/// summary was found.
pub fn process_experiment(base_dir: &Path) -> Result<Option<ComparisonTable>> {
    let experiment = ExperimentConfig::load(&base_dir.join("config.yaml"))?;
    let columns = visible_columns(&experiment);
    let config = config::get();

    let plots_dir = base_dir.join("plots");
    fs::create_dir_all(&plots_dir).with_context(|| format!("cannot create {}", plots_dir.display()))?;

    let mut overall = Samples::default();
    for summary in find_summaries(base_dir)? {
        let samples = Samples::load(&summary)?;
        let folder = summary.parent().unwrap_or(base_dir);
        let table = ComparisonTable::new(&samples, &columns, config.precision);
        println!("Results for {}:\n{}", folder.display(), table.format_text(false));

        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "results".to_string());
        save_table(&table, &plots_dir.join(format!("{name}_average_results.png")))?;
        overall.extend(&samples);
    }

    if overall.is_empty() {
        warn!("no summary.yaml below {}", base_dir.display());
        return Ok(None);
    }

    let table = ComparisonTable::new(&overall, &columns, config.precision);
    println!("Overall Results:\n{}", table.format_text(true));
    save_table(&table, &plots_dir.join("overall_average_tracker_results.png"))?;

    let bars = plots_dir.join("overall_average_tracker_results_bars.png");
    table
        .to_bar_chart("Overall Average Tracker Results")
        .save(&bars, config.figure_width, config.figure_height)?;
    info!("saved {}", bars.display());
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn summary(overlaps: [f64; 4], reinits: [u32; 4]) -> String {
        let mut text = String::new();
        for (i, tracker) in TRACKERS.iter().enumerate() {
            text += &format!(
                "{tracker}:\n  average_overlap: {}\n  average_error: {}\n  average_processing_time: 0.01\n  valid_frame_percent: 90\n  reinit_count: {}\n",
                overlaps[i],
                10. - i as f64,
                reinits[i]
            );
        }
        text
    }

    #[test]
    fn test_best_rule() {
        assert_eq!(Column::AverageOverlap.best(), Best::Max);
        assert_eq!(Column::ValidFramePercent.best(), Best::Max);
        assert_eq!(Column::AverageError.best(), Best::Min);
        assert_eq!(Column::AverageProcessingTime.best(), Best::Min);
        assert_eq!(Column::ReinitCount.best(), Best::Min);
    }

    #[test]
    fn test_visible_columns() {
        let config = ExperimentConfig {
            reinit_strategy: "one_init".to_string(),
        };
        let columns = visible_columns(&config);
        assert_eq!(columns.len(), 4);
        assert!(!columns.contains(&Column::ReinitCount));
        assert_eq!(visible_columns(&ExperimentConfig::default()).len(), 5);
    }

    #[test]
    fn test_from_summary() {
        let samples = Samples::from_summary(&summary([0.5, 0.6, 0.7, 0.8], [3, 2, 1, 0])).unwrap();
        assert_eq!(samples.values(2, Column::AverageOverlap), &[0.7]);
        assert_eq!(samples.values(0, Column::ReinitCount), &[3.]);
        assert_eq!(samples.values(3, Column::AverageError), &[7.]);

        let broken = summary([0.5; 4], [0; 4]).replace("ModVIT", "Other");
        let err = Samples::from_summary(&broken).unwrap_err();
        assert!(err.to_string().contains("ModVIT"));

        let broken = summary([0.5; 4], [0; 4]).replacen("reinit_count: 0", "reinit_count: many", 1);
        assert!(Samples::from_summary(&broken).is_err());
    }

    #[test]
    fn test_overall_table() {
        let mut samples = Samples::from_summary(&summary([0.5, 0.6, 0.7, 0.8], [3, 2, 1, 0])).unwrap();
        samples.extend(&Samples::from_summary(&summary([0.7, 0.6, 0.9, 0.6], [1, 2, 1, 0])).unwrap());

        let table = ComparisonTable::new(&samples, &Column::ALL, 5);
        assert_eq!(table.rows[0].tracker, "CSRT");
        assert_relative_eq!(table.rows[0].means[0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(table.rows[0].stds[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(table.rows[0].means[4], 2., epsilon = 1e-12);

        let marks = table.highlighted();
        // ModVIT has the best overlap
        assert_eq!(marks.iter().map(|r| r[0]).collect::<Vec<_>>(), vec![false, false, true, false]);
        // DaSiam the lowest error and no re-initialisation
        assert!(marks[3][1] && marks[3][4]);
        // equal processing times and valid frames are all best
        assert!(marks.iter().all(|r| r[2] && r[3]));
    }

    #[test]
    fn test_rounding() {
        let samples = Samples::from_summary(&summary([0.123456789, 0.2, 0.3, 0.4], [0; 4])).unwrap();
        let table = ComparisonTable::new(&samples, &[Column::AverageOverlap], 5);
        assert_eq!(table.rows[0].means, vec![0.12346]);
        assert_eq!(table.to_image().cells[0], vec!["0.12346".to_string()]);
    }

    #[test]
    fn test_column_lookup() {
        let samples = Samples::from_summary(&summary([0.5, 0.6, 0.7, 0.8], [3, 2, 1, 0])).unwrap();
        for (t, column) in [(0, Column::ReinitCount), (1, Column::AverageProcessingTime), (3, Column::ValidFramePercent)] {
            assert_eq!(samples.values(t, column).len(), 1);
        }
        assert_eq!(samples.values(1, Column::ReinitCount), &[2.]);
        assert_eq!(samples.values(1, Column::AverageProcessingTime), &[0.01]);
        assert_eq!(samples.values(3, Column::ValidFramePercent), &[90.]);
    }

    #[test]
    fn test_find_summaries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        for name in ["summary.yaml", "b/c/summary.yaml", "a/summary.yaml", "a/summary.yml"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let found = find_summaries(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![
                dir.path().join("a/summary.yaml"),
                dir.path().join("b/c/summary.yaml"),
                dir.path().join("summary.yaml"),
            ]
        );
    }

    #[test]
    fn test_format_text() {
        let samples = Samples::from_summary(&summary([0.5, 0.6, 0.7, 0.8], [3, 2, 1, 0])).unwrap();
        let table = ComparisonTable::new(&samples, &[Column::AverageOverlap, Column::ReinitCount], 5);
        let text = table.format_text(false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("average_overlap  reinit_count"));
        assert!(lines[1].starts_with("CSRT  "));
        assert!(lines[1].ends_with("0.5             3"));
        assert!(table.format_text(true).contains("0.5 ± 0"));
    }

    #[test]
    fn test_process_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        assert!(process_experiment(base).is_err());

        fs::write(base.join("config.yaml"), "reinit_strategy: one_init\n").unwrap();
        assert!(process_experiment(base).unwrap().is_none());

        for (name, overlaps) in [("seq_a", [0.5, 0.6, 0.7, 0.8]), ("seq_b", [0.7, 0.6, 0.9, 0.6])] {
            fs::create_dir_all(base.join(name)).unwrap();
            fs::write(base.join(name).join("summary.yaml"), summary(overlaps, [1; 4])).unwrap();
        }

        let table = process_experiment(base).unwrap().unwrap();
        assert_eq!(table.columns.len(), 4);
        assert_relative_eq!(table.rows[2].means[0], 0.8, epsilon = 1e-12);
        for file in [
            "seq_a_average_results.png",
            "seq_b_average_results.png",
            "overall_average_tracker_results.png",
            "overall_average_tracker_results_bars.png",
        ] {
            assert!(base.join("plots").join(file).is_file(), "{file}");
        }
    }
}
