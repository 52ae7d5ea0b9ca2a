//! Image-sequence frame source.
//!
//! Reads every PNG/JPEG file of a directory as one frame, in file-name order.
//! Timestamps are derived from the configured frame rate.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::file::FileStats;
use crate::frame::Frame;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub(crate) struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    fps: f64,
    frame_count: u64,
    dimensions: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    pub(crate) fn open(dir: &str, fps: f64) -> Result<Self> {
        let dir = PathBuf::from(dir);
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
            .with_context(|| format!("failed to list frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_file(path))
            .collect();
        files.sort();
        Ok(Self {
            dir,
            files,
            fps,
            frame_count: 0,
            dimensions: None,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: connected to {} (image sequence, {} frames)",
            self.dir.display(),
            self.files.len()
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.frame_count as usize) else {
            return Ok(None);
        };
        let image = image::open(path)
            .with_context(|| format!("failed to decode frame {}", path.display()))?
            .to_rgb8();
        match self.dimensions {
            Some(expected) if image.dimensions() != expected => {
                return Err(anyhow!(
                    "frame {} is {}x{}, expected {}x{}",
                    path.display(),
                    image.width(),
                    image.height(),
                    expected.0,
                    expected.1
                ));
            }
            Some(_) => {}
            None => self.dimensions = Some(image.dimensions()),
        }
        self.frame_count += 1;
        let timestamp_ms = (self.frame_count - 1) as f64 * 1000.0 / self.fps;
        Ok(Some(Frame::new(self.frame_count, timestamp_ms, image)))
    }

    pub(crate) fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.dir.display().to_string(),
        }
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}
