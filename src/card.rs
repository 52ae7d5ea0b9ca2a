//! Card identities and the detector label table.
//!
//! A `Card` is one of the 52 rank × suit combinations. Detector class labels
//! are resolved through a `CardIndex`, which must cover the whole deck; a
//! label outside it is a configuration error, never a silent miss.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PipelineError;

pub const DECK_SIZE: usize = 52;

/// Label order of the shipped card detector. `card_id` is the position + 1.
pub const STANDARD_LABELS: [&str; DECK_SIZE] = [
    "10C", "10D", "10H", "10S", "2C", "2D", "2H", "2S", "3C", "3D", "3H", "3S", "4C", "4D", "4H",
    "4S", "5C", "5D", "5H", "5S", "6C", "6D", "6H", "6S", "7C", "7D", "7H", "7S", "8C", "8D",
    "8H", "8S", "9C", "9D", "9H", "9S", "AC", "AD", "AH", "AS", "JC", "JD", "JH", "JS", "KC",
    "KD", "KH", "KS", "QC", "QD", "QH", "QS",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    fn symbol(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        Rank::ALL.into_iter().find(|rank| rank.symbol() == symbol)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    fn symbol(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        Suit::ALL.into_iter().find(|suit| suit.symbol() == symbol)
    }
}

/// One of the 52 card identities. Serialized as its label, e.g. `"10C"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Dense index in `0..DECK_SIZE`, independent of any label table.
    pub fn ordinal(self) -> usize {
        self.rank as usize * Suit::ALL.len() + self.suit as usize
    }

    pub fn label(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

impl FromStr for Card {
    type Err = PipelineError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let unknown = || PipelineError::UnknownLabel(label.to_string());
        let mut chars = label.chars();
        let suit = chars
            .next_back()
            .and_then(Suit::from_symbol)
            .ok_or_else(unknown)?;
        let rank = Rank::from_symbol(chars.as_str()).ok_or_else(unknown)?;
        Ok(Card::new(rank, suit))
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

// ----------------------------------------------------------------------------
// CardIndex: detector label table
// ----------------------------------------------------------------------------

/// Total mapping between detector labels, cards and numeric card ids.
#[derive(Clone, Debug)]
pub struct CardIndex {
    order: Vec<Card>,
    ids: [u32; DECK_SIZE],
}

impl CardIndex {
    /// Build the table from the detector's label list.
    ///
    /// The list must name every card of the deck exactly once.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self> {
        if labels.len() != DECK_SIZE {
            return Err(PipelineError::InvalidLabelTable(format!(
                "expected {} labels, got {}",
                DECK_SIZE,
                labels.len()
            ))
            .into());
        }
        let mut order = Vec::with_capacity(DECK_SIZE);
        let mut ids = [0u32; DECK_SIZE];
        for (position, label) in labels.iter().enumerate() {
            let label = label.as_ref().trim();
            let card: Card = label
                .parse()
                .map_err(|_| PipelineError::InvalidLabelTable(format!("unknown label '{label}'")))?;
            if ids[card.ordinal()] != 0 {
                return Err(PipelineError::InvalidLabelTable(format!(
                    "label '{label}' listed twice"
                ))
                .into());
            }
            ids[card.ordinal()] = position as u32 + 1;
            order.push(card);
        }
        Ok(Self { order, ids })
    }

    /// Label table of the shipped detector.
    pub fn standard() -> Self {
        let order: Vec<Card> = STANDARD_LABELS
            .iter()
            .filter_map(|label| label.parse().ok())
            .collect();
        let mut ids = [0u32; DECK_SIZE];
        for (position, card) in order.iter().enumerate() {
            ids[card.ordinal()] = position as u32 + 1;
        }
        Self { order, ids }
    }

    /// Resolve a detector label to its card.
    pub fn resolve(&self, label: &str) -> Result<Card> {
        let card: Card = label.trim().parse()?;
        Ok(card)
    }

    /// 1-based id of a card in this table.
    pub fn card_id(&self, card: Card) -> u32 {
        self.ids[card.ordinal()]
    }

    /// Cards in table order.
    pub fn cards(&self) -> &[Card] {
        &self.order
    }
}

impl Default for CardIndex {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_display() {
        for label in STANDARD_LABELS {
            let card: Card = label.parse().unwrap();
            assert_eq!(card.to_string(), label);
        }
    }

    #[test]
    fn ordinals_are_dense_and_unique() {
        let mut seen = [false; DECK_SIZE];
        for rank in Rank::ALL {
            for suit in Suit::ALL {
                let ordinal = Card::new(rank, suit).ordinal();
                assert!(!seen[ordinal]);
                seen[ordinal] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn rejects_unknown_labels() {
        for label in ["", "1C", "11S", "AX", "as", "10", "Joker"] {
            let err = label.parse::<Card>().unwrap_err();
            assert!(matches!(err, PipelineError::UnknownLabel(_)), "{label}");
        }
    }

    #[test]
    fn standard_table_ids_follow_label_order() {
        let index = CardIndex::standard();
        assert_eq!(index.cards().len(), DECK_SIZE);
        assert_eq!(index.card_id("10C".parse().unwrap()), 1);
        assert_eq!(index.card_id("AS".parse().unwrap()), 40);
        assert_eq!(index.card_id("QS".parse().unwrap()), 52);
    }

    #[test]
    fn label_table_must_cover_the_deck() {
        let short = &STANDARD_LABELS[..51];
        let err = CardIndex::from_labels(short).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidLabelTable(_))
        ));

        let mut duplicated = STANDARD_LABELS.to_vec();
        duplicated[51] = "AS";
        assert!(CardIndex::from_labels(&duplicated).is_err());
    }

    #[test]
    fn custom_label_order_changes_ids() {
        let mut labels = STANDARD_LABELS.to_vec();
        labels.reverse();
        let index = CardIndex::from_labels(&labels).unwrap();
        assert_eq!(index.card_id("QS".parse().unwrap()), 1);
        assert_eq!(index.cards()[0].to_string(), "QS");
    }

    #[test]
    fn resolve_signals_unknown_label() {
        let index = CardIndex::standard();
        assert_eq!(index.resolve("KD").unwrap().to_string(), "KD");
        let err = index.resolve("ZZ").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::UnknownLabel(label)) if label == "ZZ"
        ));
    }

    #[test]
    fn configured_and_detected_labels_are_trimmed_alike() {
        let labels: Vec<String> = STANDARD_LABELS.iter().map(|l| format!(" {l} ")).collect();
        let index = CardIndex::from_labels(&labels).unwrap();
        assert_eq!(index.resolve(" AS\n").unwrap(), index.resolve("AS").unwrap());
        assert_eq!(index.card_id(index.resolve("10C ").unwrap()), 1);
    }
}
