use std::collections::VecDeque;

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::card::{Card, Suit};
use crate::error::{Error, Result};

pub const DECK_SIZE: usize = 52;

lazy_static! {
    // Suits in `Suit::ALL` order, Ace through King within each suit.
    static ref STANDARD_CARDS: Vec<Card> = Suit::ALL
        .iter()
        .flat_map(|&suit| Card::suit_run(suit))
        .collect();
}

/// Result of a single draw: the card and the shoe length once the draw settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub card: Card,
    pub remaining: usize,
    /// A fresh shuffled set was appended because the draw emptied the shoe.
    pub replenished: bool,
}

/// The shoe. Cards are served from the front; drawn cards leave the deck.
pub struct Deck {
    cards: VecDeque<Card>,
    rng: StdRng,
}

impl Deck {
    /// A shuffled standard deck.
    pub fn new() -> Self {
        let mut deck = Self::create_default();
        deck.shuffle();
        deck
    }

    /// The 52 standard cards in canonical order.
    pub fn create_default() -> Self {
        Self::with_rng(STANDARD_CARDS.iter().copied().collect(), StdRng::from_entropy())
    }

    /// Canonical order, but every later shuffle is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(STANDARD_CARDS.iter().copied().collect(), StdRng::seed_from_u64(seed))
    }

    /// A stacked shoe served in the given order.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self::with_rng(cards.into(), StdRng::from_entropy())
    }

    fn with_rng(cards: VecDeque<Card>, rng: StdRng) -> Self {
        Self { cards, rng }
    }

    pub fn shuffle(&mut self) {
        self.cards.make_contiguous().shuffle(&mut self.rng);
    }

    pub fn draw(&mut self) -> Result<Draw> {
        let card = self.cards.pop_front().ok_or(Error::EmptyDeck)?;
        let replenished = self.cards.is_empty();
        if replenished {
            self.replenish();
        }
        debug!(%card, remaining = self.cards.len(), replenished, "drew card");
        Ok(Draw {
            card,
            remaining: self.cards.len(),
            replenished,
        })
    }

    pub fn draw_many(&mut self, n: usize) -> Result<Vec<Card>> {
        (0..n).map(|_| self.draw().map(|draw| draw.card)).collect()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    fn replenish(&mut self) {
        self.cards.extend(STANDARD_CARDS.iter().copied());
        self.shuffle();
        debug!("shoe exhausted, appended a fresh shuffled deck");
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

/// Spades of the given ranks, served in order.
#[cfg(test)]
pub(crate) fn stacked(ranks: &[u8]) -> Deck {
    Deck::from_cards(
        ranks
            .iter()
            .map(|&rank| Card::new(rank, Suit::Spades).unwrap())
            .collect(),
    )
}
