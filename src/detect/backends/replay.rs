use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;

/// Replays detections recorded by an external model run.
///
/// The file holds one JSON array per frame, in frame order:
/// `[[{"box": [x0, y0, x1, y1], "confidence": 0.93, "label": "AS"}], []]`.
/// This backend does not load or run any model itself.
pub struct ReplayBackend {
    path: PathBuf,
    frames: VecDeque<Vec<RawDetection>>,
    served: u64,
    exhausted_warned: bool,
}

impl ReplayBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detections file {}", path.display()))?;
        let frames = Self::parse(&raw)
            .with_context(|| format!("invalid detections file {}", path.display()))?;
        log::info!(
            "ReplayBackend: loaded {} frames of detections from {}",
            frames.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            frames: frames.into(),
            served: 0,
            exhausted_warned: false,
        })
    }

    fn parse(raw: &str) -> Result<Vec<Vec<RawDetection>>> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn frames_served(&self) -> u64 {
        self.served
    }
}

impl DetectorBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&mut self, _region: &RgbImage) -> Result<Vec<RawDetection>> {
        self.served += 1;
        match self.frames.pop_front() {
            Some(detections) => Ok(detections),
            None => {
                if !self.exhausted_warned {
                    log::warn!(
                        "ReplayBackend: {} has no detections past frame {}; treating the rest as empty",
                        self.path.display(),
                        self.served - 1
                    );
                    self.exhausted_warned = true;
                }
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn replays_recorded_frames_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[
                [{"box": [10.0, 20.0, 40.0, 60.0], "confidence": 0.91, "label": "KD"}],
                [],
                [{"box": [1.0, 2.0, 3.0, 4.0], "confidence": 0.5, "label": "2C"},
                 {"box": [5.0, 6.0, 7.0, 8.0], "confidence": 0.99, "label": "2C"}]
            ]"#,
        )
        .unwrap();

        let mut backend = ReplayBackend::open(file.path()).unwrap();
        let region = RgbImage::new(2, 2);

        let first = backend.detect(&region).unwrap();
        assert_eq!(first, vec![RawDetection::new([10.0, 20.0, 40.0, 60.0], 0.91, "KD")]);
        assert!(backend.detect(&region).unwrap().is_empty());
        assert_eq!(backend.detect(&region).unwrap().len(), 2);
        assert!(backend.detect(&region).unwrap().is_empty());
        assert_eq!(backend.frames_served(), 4);
    }

    #[test]
    fn rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"frames": 3}"#).unwrap();
        assert!(ReplayBackend::open(file.path()).is_err());
    }
}
