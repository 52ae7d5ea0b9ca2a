use std::collections::VecDeque;

use anyhow::Result;
use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;

/// Stub backend for testing. Returns scripted detections, one entry per call.
///
/// Once the script runs out every frame comes back empty.
#[derive(Default)]
pub struct StubBackend {
    script: VecDeque<Vec<RawDetection>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames(frames: Vec<Vec<RawDetection>>) -> Self {
        Self {
            script: frames.into(),
        }
    }

    /// Scripted frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _region: &RgbImage) -> Result<Vec<RawDetection>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
