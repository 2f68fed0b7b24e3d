//! Playing card value objects

use crate::closed_set;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

closed_set! {
    /// Card rank, ordered from two to ace
    pub enum CardValue: "card value" {
        Two => "two",
        Three => "three",
        Four => "four",
        Five => "five",
        Six => "six",
        Seven => "seven",
        Eight => "eight",
        Nine => "nine",
        Ten => "ten",
        Jack => "jack",
        Queen => "queen",
        King => "king",
        Ace => "ace",
    }
}

closed_set! {
    /// Card suit
    pub enum CardSuit: "card suit" {
        Clubs => "clubs",
        Diamonds => "diamonds",
        Hearts => "hearts",
        Spades => "spades",
    }
}

impl CardValue {
    /// Single-character rank symbol used in hand notation
    pub fn symbol(self) -> char {
        match self {
            CardValue::Two => '2',
            CardValue::Three => '3',
            CardValue::Four => '4',
            CardValue::Five => '5',
            CardValue::Six => '6',
            CardValue::Seven => '7',
            CardValue::Eight => '8',
            CardValue::Nine => '9',
            CardValue::Ten => 'T',
            CardValue::Jack => 'J',
            CardValue::Queen => 'Q',
            CardValue::King => 'K',
            CardValue::Ace => 'A',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            '2' => Some(CardValue::Two),
            '3' => Some(CardValue::Three),
            '4' => Some(CardValue::Four),
            '5' => Some(CardValue::Five),
            '6' => Some(CardValue::Six),
            '7' => Some(CardValue::Seven),
            '8' => Some(CardValue::Eight),
            '9' => Some(CardValue::Nine),
            'T' => Some(CardValue::Ten),
            'J' => Some(CardValue::Jack),
            'Q' => Some(CardValue::Queen),
            'K' => Some(CardValue::King),
            'A' => Some(CardValue::Ace),
            _ => None,
        }
    }
}

impl CardSuit {
    pub fn symbol(self) -> char {
        match self {
            CardSuit::Clubs => 'c',
            CardSuit::Diamonds => 'd',
            CardSuit::Hearts => 'h',
            CardSuit::Spades => 's',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_lowercase() {
            'c' => Some(CardSuit::Clubs),
            'd' => Some(CardSuit::Diamonds),
            'h' => Some(CardSuit::Hearts),
            's' => Some(CardSuit::Spades),
            _ => None,
        }
    }
}

/// A single playing card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub value: CardValue,
    pub suit: CardSuit,
}

impl Card {
    pub fn new(value: CardValue, suit: CardSuit) -> Self {
        Self { value, suit }
    }

    /// Two-character notation such as `As` or `Td`
    pub fn short(&self) -> String {
        format!("{}{}", self.value.symbol(), self.suit.symbol())
    }

    /// Parse two-character notation (`As`, `td`, `9H`)
    pub fn from_short(notation: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidEnumValue {
            field: "card".to_string(),
            token: notation.to_string(),
        };

        let mut chars = notation.trim().chars();
        let (Some(rank), Some(suit), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(invalid());
        };

        let value = CardValue::from_symbol(rank).ok_or_else(invalid)?;
        let suit = CardSuit::from_symbol(suit).ok_or_else(invalid)?;
        Ok(Self { value, suit })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.value, self.suit)
    }
}
