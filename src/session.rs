//! Session log: per-frame records, per-video summaries and their emission.
//!
//! The log is built in memory while frames are processed and only touches
//! disk once the run has finished. Artifacts are staged as temporary files in
//! the output directory and renamed into place together, so an aborted run
//! leaves nothing behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregate::{FinalCardList, FrequencyTally};
use crate::card::Card;
use crate::filter::Detection;

pub const DEFAULT_JSON_FILE: &str = "framewise_detected_table_cards.json";
pub const DEFAULT_TEXT_FILE: &str = "table_cards_list.txt";

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Everything recorded about one processed frame. Never mutated once pushed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_id: u64,
    /// Seconds, 2 decimal places.
    pub timestamp: f64,
    pub cards_detected_one_corner: Vec<Card>,
    /// Left to right.
    pub cards_detected_two_corners: Vec<Card>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards_detected_ambiguous: Vec<Card>,
    pub cards_info: Vec<Detection>,
}

/// End-of-video statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video: String,
    pub card_frequency: FrequencyTally,
    pub total_frames: u64,
    /// Raw detections dropped as malformed.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dropped_detections: u64,
}

/// The structured detection log of one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub frames: Vec<FrameRecord>,
    pub video_data: Vec<VideoSummary>,
}

impl SessionLog {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid session log")
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        Ok(out)
    }

    /// Counts summed over every video of the session.
    pub fn combined_frequency(&self) -> FrequencyTally {
        let mut tally = FrequencyTally::default();
        for summary in &self.video_data {
            tally.merge(&summary.card_frequency);
        }
        tally
    }

    /// Final card list derived from the completed log.
    pub fn final_cards(&self, min_appearance: u32) -> FinalCardList {
        let last_frame = self
            .frames
            .last()
            .map(|record| record.cards_info.as_slice())
            .unwrap_or(&[]);
        FinalCardList::select(&self.combined_frequency(), last_frame, min_appearance)
    }

    /// Write the JSON log and the text summary into `dir`.
    ///
    /// Both files are staged next to their destination and renamed only after
    /// both have been written.
    pub fn write_artifacts(
        &self,
        dir: &Path,
        names: &ArtifactNames,
        min_appearance: u32,
    ) -> Result<ArtifactPaths> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        let json = self.to_json_pretty()?;
        let text = self.final_cards(min_appearance).summary_text();

        let json_tmp = stage_file(dir, &json)?;
        let text_tmp = stage_file(dir, text.as_bytes())?;

        let paths = ArtifactPaths {
            json: dir.join(&names.json_file),
            text: dir.join(&names.text_file),
        };
        json_tmp
            .persist(&paths.json)
            .map_err(|e| anyhow!("failed to write {}: {}", paths.json.display(), e.error))?;
        text_tmp
            .persist(&paths.text)
            .map_err(|e| anyhow!("failed to write {}: {}", paths.text.display(), e.error))?;
        Ok(paths)
    }
}

fn stage_file(dir: &Path, bytes: &[u8]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(".table-cards-")
        .tempfile_in(dir)
        .with_context(|| format!("failed to stage artifact in {}", dir.display()))?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// File names of the emitted artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactNames {
    pub json_file: String,
    pub text_file: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            json_file: DEFAULT_JSON_FILE.to_string(),
            text_file: DEFAULT_TEXT_FILE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ArtifactPaths {
    pub json: PathBuf,
    pub text: PathBuf,
}

// ----------------------------------------------------------------------------
// SessionLogBuilder
// ----------------------------------------------------------------------------

/// Accumulates frame records in arrival order.
#[derive(Debug, Default)]
pub struct SessionLogBuilder {
    log: SessionLog,
    video_start: usize,
}

impl SessionLogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame record. Frame ids must increase within a video.
    pub fn push_frame(&mut self, record: FrameRecord) -> Result<&FrameRecord> {
        if let Some(last) = self.log.frames[self.video_start..].last() {
            if record.frame_id <= last.frame_id {
                return Err(anyhow!(
                    "frame {} arrived after frame {}; records must follow source order",
                    record.frame_id,
                    last.frame_id
                ));
            }
        }
        self.log.frames.push(record);
        let pushed = self.log.frames.len() - 1;
        Ok(&self.log.frames[pushed])
    }

    /// Frames recorded for the current video.
    pub fn current_video_frames(&self) -> usize {
        self.log.frames.len() - self.video_start
    }

    /// Close the current video with its summary.
    pub fn finish_video(&mut self, summary: VideoSummary) -> &VideoSummary {
        self.video_start = self.log.frames.len();
        self.log.video_data.push(summary);
        let last = self.log.video_data.len() - 1;
        &self.log.video_data[last]
    }

    /// Drop the records of the current, unfinished video. Returns how many
    /// were dropped.
    pub fn discard_video(&mut self) -> usize {
        let discarded = self.current_video_frames();
        self.log.frames.truncate(self.video_start);
        discarded
    }

    pub fn finish(self) -> SessionLog {
        self.log
    }
}
