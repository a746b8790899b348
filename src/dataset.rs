use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as AnyhowContext, Result};
use tracing::warn;

use crate::annotations::{self, ImageSize, NormalizedBox};
use crate::video;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DatasetKind {
    /// a single `.mp4` clip
    Custom,
    /// an `img/` directory of frames, as in OTB
    Otb,
    #[default]
    Unknown,
}

/// One tracking sequence: media plus its ground truth files
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetInfo {
    pub name: String,
    pub media_path: Option<PathBuf>,
    pub kind: DatasetKind,
    pub ground_truth_paths: Vec<PathBuf>,
}

impl DatasetInfo {
    pub fn has_media(&self) -> bool {
        self.kind != DatasetKind::Unknown
    }

    pub fn media_size(&self) -> Result<ImageSize> {
        let media = self
            .media_path
            .as_ref()
            .ok_or_else(|| anyhow!("sequence {} has no media", self.name))?;
        video::media_size(media)
    }

    /// The first ground truth file, parsed
    pub fn load_ground_truth(&self) -> Result<Vec<Option<NormalizedBox>>> {
        let path = self
            .ground_truth_paths
            .first()
            .ok_or_else(|| anyhow!("sequence {} has no ground truth file", self.name))?;
        annotations::load_text(path)
    }
}

impl fmt::Display for DatasetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let media = self
            .media_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Media Path: {}", media)?;
        writeln!(f, "Dataset Type: {:?}", self.kind)?;
        writeln!(f, "Ground Truth Paths:")?;
        for path in &self.ground_truth_paths {
            writeln!(f, "  - {}", path.display())?;
        }
        Ok(())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

/// Describe the sequence stored directly in `path`.
pub fn dataset_info(path: &Path) -> Result<DatasetInfo> {
    let mut info = DatasetInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        ..Default::default()
    };
    if !path.is_dir() {
        warn!("The provided path is not a directory: {}", path.display());
        return Ok(info);
    }

    let mut entries = fs::read_dir(path)
        .with_context(|| format!("cannot list {}", path.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for entry in entries {
        if entry.is_file() && has_extension(&entry, "mp4") {
            info.media_path = Some(entry);
            info.kind = DatasetKind::Custom;
        } else if entry.is_dir() && entry.file_name().map_or(false, |n| n == "img") {
            info.media_path = Some(entry);
            info.kind = DatasetKind::Otb;
        } else if entry.is_file() && has_extension(&entry, "txt") {
            info.ground_truth_paths.push(entry);
        }
    }
    Ok(info)
}

/// A sequence directory yields itself, a dataset root yields one info per
/// child sequence.
pub fn load_dataset_infos(path: &Path) -> Result<Vec<DatasetInfo>> {
    let info = dataset_info(path)?;
    if info.has_media() {
        return Ok(vec![info]);
    }
    if !path.is_dir() {
        return Ok(vec![]);
    }

    let mut children = fs::read_dir(path)
        .with_context(|| format!("cannot list {}", path.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    children.sort();

    let mut infos = vec![];
    for child in children.into_iter().filter(|c| c.is_dir()) {
        let info = dataset_info(&child)?;
        if info.has_media() {
            infos.push(info);
        }
    }
    Ok(infos)
}
