use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::warn;

fn below_symlink(path: &Path, root: &Path) -> bool {
    path.ancestors()
        .skip(1)
        .take_while(|a| *a != root)
        .any(|a| fs::symlink_metadata(a).map_or(false, |m| m.file_type().is_symlink()))
}

/// Files below `dir` matching the glob `pattern`, sorted. Symlinked
/// directories are not descended into and unreadable entries are skipped, so
/// a missing `dir` yields nothing.
pub fn find_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let root = dir
        .to_str()
        .ok_or_else(|| anyhow!("non utf-8 path {}", dir.display()))?;
    let full = format!("{}/{}", glob::Pattern::escape(root), pattern);

    let mut paths = vec![];
    for entry in glob::glob(&full)? {
        match entry {
            Ok(path) if path.is_file() && !below_symlink(&path, dir) => paths.push(path),
            Ok(_) => {}
            Err(err) => warn!("cannot read {}: {}", err.path().display(), err.error()),
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}
