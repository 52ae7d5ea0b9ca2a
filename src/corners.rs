//! Corner disambiguation for one frame.
//!
//! A card lying flat in the region of interest usually shows both of its
//! rank/suit corner markers, and the detector reports each one separately.
//! Two detections of the same card in one frame therefore corroborate each
//! other; a single detection is reported but never used for presence.
//! Three or more detections of one card cannot come from one physical card
//! and land in the ambiguous bucket.

use std::collections::HashMap;

use crate::card::Card;
use crate::filter::Detection;

/// First detection of a card within a frame, plus how often it occurred.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Representative {
    pub card: Card,
    pub x: f64,
    pub count: usize,
}

/// Per-frame map from card to its representative detection.
///
/// Built once per frame; lookups do not rescan the detections.
#[derive(Clone, Debug, Default)]
pub struct Representatives {
    entries: Vec<Representative>,
    slots: HashMap<Card, usize>,
}

impl Representatives {
    pub fn build(detections: &[Detection]) -> Self {
        let mut reps = Self::default();
        for detection in detections {
            match reps.slots.get(&detection.card) {
                Some(&slot) => reps.entries[slot].count += 1,
                None => {
                    reps.slots.insert(detection.card, reps.entries.len());
                    reps.entries.push(Representative {
                        card: detection.card,
                        x: detection.x,
                        count: 1,
                    });
                }
            }
        }
        reps
    }

    pub fn get(&self, card: Card) -> Option<&Representative> {
        self.slots.get(&card).map(|&slot| &self.entries[slot])
    }

    /// Representatives in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = &Representative> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Classification of one frame's cards by visible corner count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CornerSplit {
    /// Cards detected exactly twice, left to right.
    pub two_corners: Vec<Card>,
    /// Cards detected exactly once, in first-occurrence order.
    pub one_corner: Vec<Card>,
    /// Cards detected three or more times, in first-occurrence order.
    pub ambiguous: Vec<Card>,
}

/// Split a frame's filtered detections by corner count.
pub fn classify(detections: &[Detection]) -> CornerSplit {
    let reps = Representatives::build(detections);
    let mut split = CornerSplit::default();
    let mut two: Vec<&Representative> = Vec::new();

    for rep in reps.iter() {
        match rep.count {
            1 => split.one_corner.push(rep.card),
            2 => two.push(rep),
            _ => split.ambiguous.push(rep.card),
        }
    }

    // Stable: equal x keeps first-occurrence order.
    two.sort_by(|a, b| a.x.total_cmp(&b.x));
    split.two_corners = two.into_iter().map(|rep| rep.card).collect();
    split
}
