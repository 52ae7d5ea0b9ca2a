//! Temporal aggregation across the frames of a video.
//!
//! Presence is decided by frequency: a card counts once for every frame in
//! which both of its corners were detected. Cards that reach the
//! minimum-appearance threshold make the final list, ordered by where they
//! sat in the last frame. Transient misdetections (a dealer's hand passing
//! over the table, motion blur) never accumulate enough frames.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::card::{Card, CardIndex, DECK_SIZE};
use crate::corners::Representatives;
use crate::filter::Detection;

pub const DEFAULT_MIN_APPEARANCE: u32 = 20;

pub const SUMMARY_PREFIX: &str = "Karty na stole: ";
pub const SUMMARY_SUFFIX: &str = ".";

// ----------------------------------------------------------------------------
// FrequencyTally
// ----------------------------------------------------------------------------

/// Per-card count of two-corner frames.
///
/// Iterates in label-table order. Serializes as a `{label: count}` map that
/// lists only cards with a non-zero count. Two tallies are equal when their
/// non-zero counts match in iteration order.
#[derive(Clone, Debug)]
pub struct FrequencyTally {
    counts: Vec<u32>,
    order: Vec<Card>,
}

impl FrequencyTally {
    /// Empty tally iterating in the order of `cards`.
    pub fn new(cards: &[Card]) -> Self {
        Self {
            counts: vec![0; DECK_SIZE],
            order: cards.to_vec(),
        }
    }

    pub fn for_index(index: &CardIndex) -> Self {
        Self::new(index.cards())
    }

    /// Count one more frame for `card`.
    pub fn record(&mut self, card: Card) {
        self.add(card, 1);
    }

    fn add(&mut self, card: Card, n: u32) {
        let slot = &mut self.counts[card.ordinal()];
        if *slot == 0 && !self.order.contains(&card) {
            self.order.push(card);
        }
        *slot = slot.saturating_add(n);
    }

    pub fn count(&self, card: Card) -> u32 {
        self.counts[card.ordinal()]
    }

    /// All tracked cards with their counts, zero counts included.
    pub fn iter(&self) -> impl Iterator<Item = (Card, u32)> + '_ {
        self.order.iter().map(|card| (*card, self.count(*card)))
    }

    pub fn nonzero(&self) -> impl Iterator<Item = (Card, u32)> + '_ {
        self.iter().filter(|(_, n)| *n > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|n| *n == 0)
    }

    /// Add another tally's counts into this one.
    pub fn merge(&mut self, other: &FrequencyTally) {
        for (card, n) in other.nonzero() {
            self.add(card, n);
        }
    }
}

impl PartialEq for FrequencyTally {
    fn eq(&self, other: &Self) -> bool {
        self.nonzero().eq(other.nonzero())
    }
}

impl Eq for FrequencyTally {}

impl Default for FrequencyTally {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl Serialize for FrequencyTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<(Card, u32)> = self.nonzero().collect();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (card, n) in entries {
            map.serialize_entry(&card, &n)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FrequencyTally {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TallyVisitor;

        impl<'de> Visitor<'de> for TallyVisitor {
            type Value = FrequencyTally;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of card labels to frame counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut tally = FrequencyTally::default();
                while let Some((card, n)) = access.next_entry::<Card, u32>()? {
                    tally.add(card, n);
                }
                Ok(tally)
            }
        }

        deserializer.deserialize_map(TallyVisitor)
    }
}

// ----------------------------------------------------------------------------
// FinalCardList
// ----------------------------------------------------------------------------

/// Cards judged present on the table, left to right.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FinalCardList(Vec<Card>);

impl FinalCardList {
    /// Cards with at least `min_appearance` counted frames, ordered by the x
    /// of their first detection in `last_frame`.
    ///
    /// Cards missing from the last frame go to the end, in tally order.
    pub fn select(tally: &FrequencyTally, last_frame: &[Detection], min_appearance: u32) -> Self {
        let positions = Representatives::build(last_frame);
        let mut cards: Vec<(Card, Option<f64>)> = tally
            .iter()
            .filter(|(_, n)| *n >= min_appearance)
            .map(|(card, _)| (card, positions.get(card).map(|rep| rep.x)))
            .collect();
        cards.sort_by(|a, b| match (a.1, b.1) {
            (Some(xa), Some(xb)) => xa.total_cmp(&xb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Self(cards.into_iter().map(|(card, _)| card).collect())
    }

    pub fn cards(&self) -> &[Card] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain-text report, e.g. `Karty na stole: 2C, AS.`
    pub fn summary_text(&self) -> String {
        let names: Vec<String> = self.0.iter().map(|card| card.label()).collect();
        format!("{}{}{}", SUMMARY_PREFIX, names.join(", "), SUMMARY_SUFFIX)
    }
}

impl fmt::Display for FinalCardList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary_text())
    }
}

// ----------------------------------------------------------------------------
// TemporalAggregator
// ----------------------------------------------------------------------------

/// Running statistics for one video, owned by the processing loop.
#[derive(Clone, Debug)]
pub struct TemporalAggregator {
    tally: FrequencyTally,
    last_frame: Vec<Detection>,
    frames: u64,
}

impl TemporalAggregator {
    pub fn new(index: &CardIndex) -> Self {
        Self {
            tally: FrequencyTally::for_index(index),
            last_frame: Vec::new(),
            frames: 0,
        }
    }

    /// Fold in one frame: its two-corner cards and all of its detections.
    pub fn fold(&mut self, two_corners: &[Card], detections: &[Detection]) {
        for card in two_corners {
            self.tally.record(*card);
        }
        self.last_frame.clear();
        self.last_frame.extend_from_slice(detections);
        self.frames += 1;
    }

    pub fn tally(&self) -> &FrequencyTally {
        &self.tally
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn final_cards(&self, min_appearance: u32) -> FinalCardList {
        FinalCardList::select(&self.tally, &self.last_frame, min_appearance)
    }

    /// Hand over the tally and reset for the next video.
    pub fn take_tally(&mut self, index: &CardIndex) -> FrequencyTally {
        self.last_frame.clear();
        self.frames = 0;
        std::mem::replace(&mut self.tally, FrequencyTally::for_index(index))
    }

    /// Forget everything folded in so far.
    pub fn reset(&mut self, index: &CardIndex) {
        *self = Self::new(index);
    }
}
