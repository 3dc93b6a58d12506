use serde::Serialize;

use crate::card::Card;

pub const BLACKJACK: u32 = 21;

/// Best total for a hand under blackjack ace rules.
///
/// Cards are counted from the highest base value down. Each Ace is promoted
/// to 11 when the running total stays below 22, otherwise it counts 1. This
/// is the exact, reproducible rule rather than an exhaustive search, and the
/// result does not depend on the order of `cards`.
pub fn score_hand(cards: &[Card]) -> u32 {
    let mut ordered: Vec<&Card> = cards.iter().collect();
    ordered.sort_by_key(|card| std::cmp::Reverse(card.value()));
    ordered.into_iter().fold(0, |total, card| {
        if card.is_ace() && total + 11 <= BLACKJACK {
            total + 11
        } else {
            total + card.value()
        }
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn extend(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn score(&self) -> u32 {
        score_hand(&self.cards)
    }

    pub fn is_bust(&self) -> bool {
        self.score() > BLACKJACK
    }
}
