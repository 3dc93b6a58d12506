use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn glyph(&self) -> char {
        match self {
            Suit::Clubs => '♣',
            Suit::Diamonds => '♦',
            Suit::Hearts => '♥',
            Suit::Spades => '♠',
        }
    }
}

/// A single playing card. Rank 1 is the Ace, 11 to 13 are the face cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    rank: u8,
    suit: Suit,
}

impl Card {
    pub const ACE: u8 = 1;
    pub const KING: u8 = 13;

    pub fn new(rank: u8, suit: Suit) -> Result<Self> {
        if !(Self::ACE..=Self::KING).contains(&rank) {
            return Err(Error::InvalidRank(rank));
        }
        Ok(Self { rank, suit })
    }

    /// Ace through King of one suit.
    pub fn suit_run(suit: Suit) -> impl Iterator<Item = Card> {
        (Self::ACE..=Self::KING).map(move |rank| Card { rank, suit })
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    /// Base scoring value: face cards count 10, the Ace counts 1 until promoted.
    pub fn value(&self) -> u32 {
        u32::from(self.rank.min(10))
    }

    pub fn is_ace(&self) -> bool {
        self.rank == Self::ACE
    }

    pub fn label(&self) -> &'static str {
        match self.rank {
            1 => "A",
            2 => "2",
            3 => "3",
            4 => "4",
            5 => "5",
            6 => "6",
            7 => "7",
            8 => "8",
            9 => "9",
            10 => "10",
            11 => "J",
            12 => "Q",
            _ => "K",
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.label(), self.suit.glyph())
    }
}
