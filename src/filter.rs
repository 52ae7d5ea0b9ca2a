//! Detection filter: confidence gate, label resolution and ROI translation.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardIndex};
use crate::detect::RawDetection;
use crate::error::MalformedDetection;
use crate::frame::Roi;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A card detection that passed the filter.
///
/// Coordinates are the top-left corner of the detector box in full-frame
/// pixels. All three numbers are already rounded to 2 decimal places.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub card_id: u32,
    #[serde(rename = "name")]
    pub card: Card,
    #[serde(rename = "x_coord")]
    pub x: f64,
    #[serde(rename = "y_coord")]
    pub y: f64,
    pub confidence: f64,
}

/// Output of filtering one frame.
#[derive(Clone, Debug, Default)]
pub struct FilteredFrame {
    /// Surviving detections, in detector order.
    pub detections: Vec<Detection>,
    /// Detections dropped as malformed.
    pub malformed: Vec<MalformedDetection>,
}

#[derive(Clone, Debug)]
pub struct DetectionFilter {
    threshold: f64,
    roi: Roi,
}

impl DetectionFilter {
    pub fn new(threshold: f64, roi: Roi) -> Self {
        Self { threshold, roi }
    }

    /// Filter one frame of raw detections.
    ///
    /// Fails only when the detector reports a label the index does not know.
    pub fn apply(&self, raw: &[RawDetection], index: &CardIndex) -> Result<FilteredFrame> {
        let mut out = FilteredFrame::default();
        for detection in raw {
            if let Err(reason) = check_well_formed(detection) {
                out.malformed.push(reason);
                continue;
            }
            let card = index.resolve(&detection.label)?;
            let confidence = f64::from(detection.confidence);
            if confidence < self.threshold {
                continue;
            }
            out.detections.push(Detection {
                card_id: index.card_id(card),
                card,
                x: round2(f64::from(detection.bbox[0]) + f64::from(self.roi.x)),
                y: round2(f64::from(detection.bbox[1]) + f64::from(self.roi.y)),
                confidence: round2(confidence),
            });
        }
        Ok(out)
    }
}

fn check_well_formed(detection: &RawDetection) -> Result<(), MalformedDetection> {
    if !(0.0..=1.0).contains(&detection.confidence) {
        return Err(MalformedDetection::ConfidenceOutOfRange);
    }
    if detection.bbox.iter().any(|v| !v.is_finite()) {
        return Err(MalformedDetection::NonFiniteBox);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use approx::assert_relative_eq;

    fn filter() -> DetectionFilter {
        DetectionFilter::new(DEFAULT_CONFIDENCE_THRESHOLD, Roi::new(195, 243, 825, 250))
    }

    fn raw(x0: f32, conf: f32, label: &str) -> RawDetection {
        RawDetection::new([x0, 10.0, x0 + 30.0, 50.0], conf, label)
    }

    #[test]
    fn drops_detections_below_threshold() {
        let index = CardIndex::standard();
        let out = filter()
            .apply(
                &[raw(1.0, 0.79, "AS"), raw(2.0, 0.8, "KD"), raw(3.0, 0.95, "2C")],
                &index,
            )
            .unwrap();
        let names: Vec<String> = out.detections.iter().map(|d| d.card.label()).collect();
        assert_eq!(names, vec!["KD", "2C"]);
        assert!(out.malformed.is_empty());
    }

    #[test]
    fn translates_and_rounds_coordinates() {
        let index = CardIndex::standard();
        let out = filter()
            .apply(&[RawDetection::new([100.456, 7.004, 130.0, 40.0], 0.876, "AS")], &index)
            .unwrap();
        let d = &out.detections[0];
        assert_relative_eq!(d.x, 295.46);
        assert_relative_eq!(d.y, 250.0);
        assert_relative_eq!(d.confidence, 0.88);
        assert_eq!(d.card_id, 40);
    }

    #[test]
    fn unknown_label_is_fatal() {
        let index = CardIndex::standard();
        let err = filter()
            .apply(&[raw(1.0, 0.99, "AS"), raw(2.0, 0.99, "XX")], &index)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnknownLabel(label)) if label == "XX"
        ));
    }

    #[test]
    fn unknown_label_is_fatal_even_below_threshold() {
        let index = CardIndex::standard();
        assert!(filter().apply(&[raw(1.0, 0.1, "XX")], &index).is_err());
    }

    #[test]
    fn malformed_detections_are_counted_not_fatal() {
        let index = CardIndex::standard();
        let out = filter()
            .apply(
                &[
                    raw(1.0, 1.5, "AS"),
                    raw(1.0, -0.1, "AS"),
                    raw(1.0, f32::NAN, "AS"),
                    RawDetection::new([f32::INFINITY, 0.0, 1.0, 1.0], 0.9, "AS"),
                    raw(5.0, 0.9, "AS"),
                ],
                &index,
            )
            .unwrap();
        assert_eq!(out.detections.len(), 1);
        assert_eq!(
            out.malformed,
            vec![
                MalformedDetection::ConfidenceOutOfRange,
                MalformedDetection::ConfidenceOutOfRange,
                MalformedDetection::ConfidenceOutOfRange,
                MalformedDetection::NonFiniteBox,
            ]
        );
    }

    #[test]
    fn round2_is_consistent() {
        assert_relative_eq!(round2(0.125), 0.13);
        assert_relative_eq!(round2(2.0), 2.0);
        assert_relative_eq!(round2(-1.006), -1.01);
    }
}
