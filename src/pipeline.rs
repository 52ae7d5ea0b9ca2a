//! Per-frame processing loop.
//!
//! `CardPipeline` owns all run state: the label index, the filter, the
//! aggregator for the current video and the session log under construction.
//! Frames flow through it strictly in source order:
//!
//! filter → classify → record → tally → render
//!
//! Nothing is written to disk here; see `SessionLog::write_artifacts`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::aggregate::TemporalAggregator;
use crate::card::CardIndex;
use crate::config::PipelineConfig;
use crate::corners::classify;
use crate::detect::{DetectorBackend, RawDetection};
use crate::error::PipelineError;
use crate::filter::{round2, DetectionFilter};
use crate::frame::{Frame, Roi};
use crate::ingest::FrameSource;
use crate::render::FrameRenderer;
use crate::session::{FrameRecord, SessionLog, SessionLogBuilder, VideoSummary};
use crate::sink::FrameSink;

pub struct CardPipeline {
    index: CardIndex,
    roi: Roi,
    filter: DetectionFilter,
    aggregator: TemporalAggregator,
    log: SessionLogBuilder,
    dropped: u64,
}

impl CardPipeline {
    pub fn new(index: CardIndex, threshold: f64, roi: Roi) -> Self {
        let aggregator = TemporalAggregator::new(&index);
        Self {
            index,
            roi,
            filter: DetectionFilter::new(threshold, roi),
            aggregator,
            log: SessionLogBuilder::new(),
            dropped: 0,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Ok(Self::new(
            config.card_index()?,
            config.confidence_threshold,
            config.roi,
        ))
    }

    pub fn index(&self) -> &CardIndex {
        &self.index
    }

    pub fn aggregator(&self) -> &TemporalAggregator {
        &self.aggregator
    }

    /// Run one frame's raw detections through filter, classifier and tally.
    ///
    /// `raw` boxes are in ROI-local pixels.
    pub fn process_detections(
        &mut self,
        frame_id: u64,
        timestamp_ms: f64,
        raw: &[RawDetection],
    ) -> Result<&FrameRecord> {
        let filtered = self.filter.apply(raw, &self.index)?;
        if !filtered.malformed.is_empty() {
            log::warn!(
                "frame {}: dropped {} malformed detections ({})",
                frame_id,
                filtered.malformed.len(),
                filtered.malformed[0]
            );
        }

        let split = classify(&filtered.detections);
        if !split.ambiguous.is_empty() {
            log::warn!(
                "frame {}: {} cards seen three or more times, not counted",
                frame_id,
                split.ambiguous.len()
            );
        }

        let record = FrameRecord {
            frame_id,
            timestamp: round2(timestamp_ms / 1000.0),
            cards_detected_one_corner: split.one_corner,
            cards_detected_two_corners: split.two_corners,
            cards_detected_ambiguous: split.ambiguous,
            cards_info: filtered.detections,
        };
        log::debug!(
            "frame {}: {} detections, {} two-corner, {} one-corner",
            record.frame_id,
            record.cards_info.len(),
            record.cards_detected_two_corners.len(),
            record.cards_detected_one_corner.len()
        );

        // Only frames that made it into the log are counted.
        let record = self.log.push_frame(record)?;
        self.aggregator
            .fold(&record.cards_detected_two_corners, &record.cards_info);
        self.dropped += filtered.malformed.len() as u64;
        Ok(record)
    }

    /// Crop the ROI, run the detector and process its output.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        backend: &mut dyn DetectorBackend,
    ) -> Result<&FrameRecord> {
        let region = frame.region(&self.roi)?;
        let raw = backend
            .detect(&region)
            .with_context(|| format!("detector {} failed on frame {}", backend.name(), frame.index))?;
        self.process_detections(frame.index, frame.timestamp_ms, &raw)
    }

    /// Close the current video and reset the aggregator for the next one.
    pub fn finish_video(&mut self, video: impl Into<String>) -> &VideoSummary {
        let summary = VideoSummary {
            video: video.into(),
            total_frames: self.aggregator.frames(),
            card_frequency: self.aggregator.take_tally(&self.index),
            dropped_detections: std::mem::take(&mut self.dropped),
        };
        log::info!(
            "video {}: {} frames, {} cards seen with two corners",
            summary.video,
            summary.total_frames,
            summary.card_frequency.nonzero().count()
        );
        self.log.finish_video(summary)
    }

    pub fn into_log(self) -> SessionLog {
        self.log.finish()
    }
}

// ----------------------------------------------------------------------------
// Video job
// ----------------------------------------------------------------------------

/// Collaborators for processing one video end to end.
pub struct VideoJob<'a> {
    pub source: &'a mut dyn FrameSource,
    pub backend: &'a mut dyn DetectorBackend,
    pub renderer: &'a FrameRenderer,
    pub sink: Box<dyn FrameSink>,
    /// Set from a signal handler; checked between frames.
    pub abort: &'a AtomicBool,
    /// Called after each frame has been written to the sink.
    pub on_frame: Option<&'a mut dyn FnMut(&FrameRecord)>,
}

/// Outcome of a processed video.
#[derive(Debug, Clone)]
pub struct VideoOutcome {
    pub video: String,
    pub frames: u64,
    pub output: PathBuf,
}

impl CardPipeline {
    /// Process every frame of `job.source`, then close the video.
    ///
    /// Fails with `PipelineError::Aborted` if the abort flag is raised; the
    /// sink is dropped unfinished in that case. On any failure the frames and
    /// counts of this video are discarded, so the log holds only completed
    /// videos.
    pub fn process_video(&mut self, job: VideoJob<'_>) -> Result<VideoOutcome> {
        let result = self.run_video(job);
        if result.is_err() {
            self.abandon_video();
        }
        result
    }

    fn run_video(&mut self, job: VideoJob<'_>) -> Result<VideoOutcome> {
        let VideoJob {
            source,
            backend,
            renderer,
            mut sink,
            abort,
            mut on_frame,
        } = job;
        let video = source.video_name();
        backend.warm_up()?;
        let mut frames = 0u64;
        loop {
            if abort.load(Ordering::SeqCst) {
                return Err(PipelineError::Aborted { frames }.into());
            }
            let Some(mut frame) = source.next_frame()? else {
                break;
            };
            let record = self.process_frame(&frame, backend)?;
            renderer.render(&mut frame.image, record)?;
            sink.write_frame(&frame.image)?;
            if let Some(callback) = on_frame.as_mut() {
                callback(record);
            }
            frames += 1;
        }
        let output = sink.finish()?;
        self.finish_video(video.clone());
        Ok(VideoOutcome {
            video,
            frames,
            output,
        })
    }

    /// Drop everything recorded for the unfinished video.
    fn abandon_video(&mut self) {
        let discarded = self.log.discard_video();
        self.aggregator.reset(&self.index);
        self.dropped = 0;
        log::warn!("discarded {} frames of the unfinished video", discarded);
    }
}
