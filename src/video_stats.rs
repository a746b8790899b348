use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as AnyhowContext, Result};
use indicatif::ProgressStyle;
use serde::Serialize;
use tracing::{info_span, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::files;
use crate::video::VideoInput;

const VIDEO_SUFFIXES: [&str; 3] = [".mp4", ".avi", ".mov"];

/// Frame and duration totals over a video corpus
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DatasetStats {
    pub video_count: usize,
    pub total_frames: u64,
    pub total_duration: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    pub min_frames: u64,
    pub max_frames: u64,
}

impl DatasetStats {
    pub fn add(&mut self, frames: u64, duration: f64) {
        if self.video_count == 0 {
            self.min_duration = duration;
            self.max_duration = duration;
            self.min_frames = frames;
            self.max_frames = frames;
        } else {
            self.min_duration = self.min_duration.min(duration);
            self.max_duration = self.max_duration.max(duration);
            self.min_frames = self.min_frames.min(frames);
            self.max_frames = self.max_frames.max(frames);
        }
        self.video_count += 1;
        self.total_frames += frames;
        self.total_duration += duration;
    }

    pub fn average_duration(&self) -> f64 {
        if self.video_count == 0 {
            0.
        } else {
            self.total_duration / self.video_count as f64
        }
    }

    pub fn write_report<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "\nSummary:")?;
        writeln!(writer, "Total number of videos: {}", self.video_count)?;
        writeln!(writer, "Total frames: {}", self.total_frames)?;
        writeln!(writer, "Total duration: {:.2} seconds", self.total_duration)?;
        writeln!(writer, "Average duration: {:.2} seconds", self.average_duration())?;
        writeln!(writer, "Minimum duration: {:.2} seconds", self.min_duration)?;
        writeln!(writer, "Maximum duration: {:.2} seconds", self.max_duration)?;
        writeln!(writer, "Minimum number of frames: {}", self.min_frames)?;
        writeln!(writer, "Maximum number of frames: {}", self.max_frames)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    stats: &'a DatasetStats,
    average_duration: f64,
}

pub fn save_json(stats: &DatasetStats, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let report = JsonReport {
        stats,
        average_duration: stats.average_duration(),
    };
    serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
    Ok(())
}

pub fn is_video_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |name| VIDEO_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// Every video file below `root`, in sorted order. A missing root holds no
/// videos.
pub fn find_videos(root: &Path) -> Result<Vec<PathBuf>> {
    let mut videos = vec![];
    for suffix in VIDEO_SUFFIXES {
        videos.extend(files::find_files(root, &format!("**/*{suffix}"))?);
    }
    videos.retain(|p| is_video_file(p));
    videos.sort();
    Ok(videos)
}

/// Probe every video below `root`. Files the backend cannot open or that
/// report no frame rate are skipped.
pub fn analyze_dataset(root: &Path) -> Result<DatasetStats> {
    let videos = find_videos(root)?;

    let span = info_span!("videos");
    span.pb_set_style(&ProgressStyle::default_bar());
    span.pb_set_length(videos.len() as u64);
    let _enter = span.enter();

    let mut stats = DatasetStats::default();
    for path in &videos {
        span.pb_inc(1);
        let video = match VideoInput::new(path) {
            Ok(video) => video,
            Err(err) => {
                warn!("Error: {err:#}");
                continue;
            }
        };
        let Some(duration) = video.duration() else {
            warn!("{} reports no frame rate, skipped", path.display());
            continue;
        };
        stats.add(video.frame_count, duration);
        println!(
            "Processed {}: {} frames, {:.2} seconds",
            path.display(),
            video.frame_count,
            duration
        );
    }
    Ok(stats)
}
