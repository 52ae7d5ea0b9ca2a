//! Frame ingestion sources.
//!
//! This module provides the sources a run can read frames from:
//! - Image sequences (a directory of PNG/JPEG frames)
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Stub source (`stub://<frames>`, testing)
//!
//! Every source yields frames in strictly increasing index order and reports
//! the end of the stream with `Ok(None)`. Decoding errors are failures, not
//! end of stream.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod sequence;

use anyhow::Result;

use crate::frame::Frame;

pub use file::{FileConfig, FileSource, FileStats};

/// A source of decoded frames.
pub trait FrameSource {
    /// Next frame in source order, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Name of the video, used in the session log.
    fn video_name(&self) -> String;
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        FileSource::next_frame(self)
    }

    fn video_name(&self) -> String {
        FileSource::video_name(self)
    }
}
