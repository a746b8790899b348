use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use opencv as cv2;
use cv2::prelude::*;

use crate::annotations::ImageSize;
use crate::files;

/// Container properties reported by the video backend
#[derive(Clone, Debug)]
pub struct VideoInput {
    pub path: PathBuf,
    pub frame_count: u64,
    pub fps: f64,
    pub size: ImageSize,
}

impl VideoInput {
    pub fn new(path: &Path) -> Result<VideoInput> {
        let filename = path
            .to_str()
            .ok_or_else(|| anyhow!("non utf-8 path {}", path.display()))?;
        let mut capture = cv2::videoio::VideoCapture::from_file(filename, cv2::videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            bail!("Could not open video file {}", path.display());
        }

        let frame_count = capture.get(cv2::videoio::CAP_PROP_FRAME_COUNT)?.max(0.) as u64;
        let fps = capture.get(cv2::videoio::CAP_PROP_FPS)?;
        let width = capture.get(cv2::videoio::CAP_PROP_FRAME_WIDTH)?.max(0.) as u32;
        let height = capture.get(cv2::videoio::CAP_PROP_FRAME_HEIGHT)?.max(0.) as u32;
        capture.release()?;

        Ok(VideoInput {
            path: path.to_path_buf(),
            frame_count,
            fps,
            size: ImageSize { width, height },
        })
    }

    /// Length in seconds, `None` when the container reports no frame rate
    pub fn duration(&self) -> Option<f64> {
        duration(self.frame_count, self.fps)
    }
}

pub fn duration(frame_count: u64, fps: f64) -> Option<f64> {
    if fps > 0. && fps.is_finite() {
        Some(frame_count as f64 / fps)
    } else {
        None
    }
}

const IMAGE_PATTERNS: [&str; 3] = ["*.jpg", "*.jpeg", "*.png"];

/// Sorted image files of an image sequence directory
pub fn sequence_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = vec![];
    for pattern in IMAGE_PATTERNS {
        images.extend(files::find_files(dir, pattern)?);
    }
    images.sort();
    Ok(images)
}

/// Frame size of a video file or of the first image of an image directory
pub fn media_size(media: &Path) -> Result<ImageSize> {
    if media.is_dir() {
        let images = sequence_images(media)?;
        let first = images
            .first()
            .ok_or_else(|| anyhow!("No images found in directory: {}", media.display()))?;
        let filename = first
            .to_str()
            .ok_or_else(|| anyhow!("non utf-8 path {}", first.display()))?;
        let image = cv2::imgcodecs::imread(filename, cv2::imgcodecs::IMREAD_COLOR)?;
        if image.cols() <= 0 || image.rows() <= 0 {
            bail!("Failed to load image: {}", first.display());
        }
        return Ok(ImageSize {
            width: image.cols() as u32,
            height: image.rows() as u32,
        });
    }

    let size = VideoInput::new(media)?.size;
    if size.width == 0 || size.height == 0 {
        bail!("video {} reports no frame size", media.display());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_duration() {
        assert_eq!(duration(300, 30.), Some(10.));
        assert_eq!(duration(300, 0.), None);
        assert_eq!(duration(300, f64::NAN), None);
    }

    #[test]
    fn test_sequence_images() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0002.jpg", "0001.jpg", "notes.txt", "0003.png"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let images = sequence_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["0001.jpg", "0002.jpg", "0003.png"]);
    }

    #[test]
    fn test_missing_video() {
        assert!(VideoInput::new(Path::new("/nonexistent/clip.mp4")).is_err());
    }
}
