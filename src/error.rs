use std::path::PathBuf;

use thiserror::Error;

use crate::card::Card;

/// Fatal pipeline failures.
///
/// Every variant aborts the run before any artifact is persisted. They are
/// raised through `anyhow`, so callers that need to branch on the cause use
/// `err.downcast_ref::<PipelineError>()`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("detector reported unknown class label '{0}'")]
    UnknownLabel(String),
    #[error("no icon asset for card {card} (looked in {dir})")]
    MissingIcon { card: Card, dir: PathBuf },
    #[error("cannot open output sink {path}: {reason}")]
    SinkUnavailable { path: PathBuf, reason: String },
    #[error("invalid label table: {0}")]
    InvalidLabelTable(String),
    #[error("region of interest {roi} does not fit a {width}x{height} frame")]
    RegionOutOfBounds {
        roi: String,
        width: u32,
        height: u32,
    },
    #[error("processing aborted after {frames} frames; no artifacts written")]
    Aborted { frames: u64 },
}

/// Why a single raw detection was dropped.
///
/// Malformed detections are a data-quality event, not a failure: the frame
/// keeps going without them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MalformedDetection {
    #[error("confidence outside [0, 1]")]
    ConfidenceOutOfRange,
    #[error("non-finite box coordinate")]
    NonFiniteBox,
}
