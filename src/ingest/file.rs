//! Local file frame source.
//!
//! `FileSource` picks a backend from the configured path:
//! - `stub://<frames>`: synthetic blank frames for tests and dry runs
//! - a directory: an image sequence, one frame per file, sorted by name
//! - anything else: a video file decoded with FFmpeg (feature: ingest-file-ffmpeg)
//!
//! Only local paths are accepted.

use std::path::Path;

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::sequence::ImageSequenceSource;
use crate::frame::Frame;

pub const DEFAULT_FPS: f64 = 25.0;

const STUB_WIDTH: u32 = 1280;
const STUB_HEIGHT: u32 = 720;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local path: a video file, a frame directory or `stub://<frames>`.
    pub path: String,
    /// Frame rate used to derive timestamps when the source carries none.
    pub fps: f64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            fps: DEFAULT_FPS,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    Sequence(ImageSequenceSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        if config.fps <= 0.0 || !config.fps.is_finite() {
            return Err(anyhow!("source fps must be a positive number"));
        }
        if let Some(count) = config.path.strip_prefix("stub://") {
            let frames = count
                .parse()
                .map_err(|_| anyhow!("stub source expects stub://<frames>, got {}", config.path))?;
            return Ok(Self {
                backend: FileBackend::Synthetic(SyntheticFileSource::new(config, frames)),
            });
        }
        if Path::new(&config.path).is_dir() {
            return Ok(Self {
                backend: FileBackend::Sequence(ImageSequenceSource::open(&config.path, config.fps)?),
            });
        }
        #[cfg(feature = "ingest-file-ffmpeg")]
        {
            Ok(Self {
                backend: FileBackend::Ffmpeg(FfmpegFileSource::new(config)?),
            })
        }
        #[cfg(not(feature = "ingest-file-ffmpeg"))]
        {
            Err(anyhow!(
                "video file {} requires the ingest-file-ffmpeg feature (or pass a frame directory)",
                config.path
            ))
        }
    }

    /// Connect to the file source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.connect(),
            FileBackend::Sequence(source) => source.connect(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    /// Decode the next frame; `None` once the file is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => Ok(source.next_frame()),
            FileBackend::Sequence(source) => source.next_frame(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    /// Base name of the source, e.g. `table.mp4`.
    pub fn video_name(&self) -> String {
        let path = self.stats().path;
        if let Some(count) = path.strip_prefix("stub://") {
            return format!("stub_{count}");
        }
        Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(path)
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            FileBackend::Sequence(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_captured: u64,
    pub path: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    total: u64,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(config: FileConfig, total: u64) -> Self {
        Self {
            config,
            total,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: connected to {} (synthetic, {} frames)",
            self.config.path,
            self.total
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.frame_count >= self.total {
            return None;
        }
        self.frame_count += 1;
        let timestamp_ms = (self.frame_count - 1) as f64 * 1000.0 / self.config.fps;
        let image = RgbImage::from_pixel(STUB_WIDTH, STUB_HEIGHT, Rgb([0, 96, 48]));
        Some(Frame::new(self.frame_count, timestamp_ms, image))
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
