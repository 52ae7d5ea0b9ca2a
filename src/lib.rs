//! Table Cards Detector
//!
//! Aggregates per-frame playing-card detections from a top-down table video
//! into a stable list of cards judged present on the table.
//!
//! # Architecture
//!
//! Frames are processed strictly in order by a single loop:
//!
//! 1. **Detection Filter**: drop low-confidence and malformed detections,
//!    translate boxes from the region of interest into frame coordinates.
//! 2. **Corner Disambiguator**: a card seen twice in one frame shows both
//!    corners and is reliable; once means one corner; three or more is
//!    ambiguous and ignored.
//! 3. **Temporal Aggregator**: count the frames each card was seen with two
//!    corners.
//! 4. **Frame Renderer**: draw the frame counter and a row of card icons.
//! 5. **Session Log Builder**: per-frame records and per-video summaries,
//!    emitted as JSON plus a one-line text report when the run succeeds.
//!
//! # Module Structure
//!
//! - `card`: card identities and the detector label table
//! - `frame`: decoded frames and the region of interest
//! - `detect`: detector backends (replayed detections, scripted stub)
//! - `ingest`: frame sources (image sequences, stub, ffmpeg files)
//! - `sink`: output frame sinks
//! - `filter`, `corners`, `aggregate`, `render`, `session`: the stages above
//! - `pipeline`: the per-frame loop tying them together
//! - `config`: file and environment configuration

pub mod aggregate;
pub mod card;
pub mod config;
pub mod corners;
pub mod detect;
pub mod error;
pub mod filter;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod sink;

pub use aggregate::{FinalCardList, FrequencyTally, TemporalAggregator};
pub use card::{Card, CardIndex, Rank, Suit};
pub use config::PipelineConfig;
pub use corners::{classify, CornerSplit};
pub use detect::{DetectorBackend, RawDetection, ReplayBackend, StubBackend};
pub use error::{MalformedDetection, PipelineError};
pub use filter::{Detection, DetectionFilter};
pub use frame::{Frame, Roi};
pub use ingest::{FileConfig, FileSource, FrameSource};
pub use pipeline::{CardPipeline, VideoJob, VideoOutcome};
pub use render::{FrameRenderer, IconSet};
pub use session::{ArtifactNames, ArtifactPaths, FrameRecord, SessionLog, VideoSummary};
pub use sink::{FrameSink, ImageSequenceSink, MemorySink};
