//! Output frame sinks.
//!
//! A sink accepts annotated frames in order and publishes them only when
//! `finish` is called. Dropping an unfinished sink discards what it staged.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tempfile::TempDir;

use crate::error::PipelineError;

/// Consumer of annotated output frames.
pub trait FrameSink {
    /// Append one frame. Every frame must have the same size.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Publish everything written so far. Returns where it landed.
    fn finish(self: Box<Self>) -> Result<PathBuf>;
}

/// Writes numbered PNG frames (`frame_000001.png`, ...) into a directory.
///
/// Frames go to a hidden staging directory next to the destination, which is
/// renamed into place on `finish`, replacing the output of an earlier run.
pub struct ImageSequenceSink {
    staging: TempDir,
    dest: PathBuf,
    dimensions: Option<(u32, u32)>,
    written: u64,
}

impl ImageSequenceSink {
    pub fn create<P: AsRef<Path>>(dest: P) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let unavailable = |reason: String| PipelineError::SinkUnavailable {
            path: dest.clone(),
            reason,
        };
        if dest.exists() && !dest.is_dir() {
            return Err(unavailable("destination exists and is not a directory".to_string()).into());
        }
        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| unavailable(e.to_string()))?;
        let staging = tempfile::Builder::new()
            .prefix(".table-cards-frames-")
            .tempdir_in(&parent)
            .map_err(|e| unavailable(e.to_string()))?;
        Ok(Self {
            staging,
            dest,
            dimensions: None,
            written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != frame.dimensions() => {
                return Err(anyhow!(
                    "output frame is {}x{}, sink was opened at {}x{}",
                    frame.width(),
                    frame.height(),
                    expected.0,
                    expected.1
                ));
            }
            Some(_) => {}
            None => self.dimensions = Some(frame.dimensions()),
        }
        self.written += 1;
        let path = self
            .staging
            .path()
            .join(format!("frame_{:06}.png", self.written));
        frame
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        if self.dest.is_dir() {
            std::fs::remove_dir_all(&self.dest).with_context(|| {
                format!("failed to replace {}", self.dest.display())
            })?;
        }
        let staged = self.staging.keep();
        std::fs::rename(&staged, &self.dest).with_context(|| {
            format!(
                "failed to move {} into {}",
                staged.display(),
                self.dest.display()
            )
        })?;
        log::info!(
            "ImageSequenceSink: wrote {} frames to {}",
            self.written,
            self.dest.display()
        );
        Ok(self.dest)
    }
}

/// Keeps frames in memory. Used by tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    pub frames: Vec<RgbImage>,
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if let Some(first) = self.frames.first() {
            if first.dimensions() != frame.dimensions() {
                return Err(anyhow!("output frame size changed mid-stream"));
            }
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        Ok(PathBuf::from("<memory>"))
    }
}
