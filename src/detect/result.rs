use serde::{Deserialize, Serialize};

/// One raw detection as produced by the card detector.
///
/// Coordinates are pixels relative to the region of interest, not the full
/// frame. The label is the detector's class name and has not been validated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// `[x0, y0, x1, y1]` in region-of-interest pixels.
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub confidence: f32,
    pub label: String,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], confidence: f32, label: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            label: label.into(),
        }
    }
}
