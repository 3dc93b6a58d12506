use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hand::BLACKJACK;

/// Result of a round from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

impl Outcome {
    /// Resolves final player and dealer scores. The first matching rule wins.
    pub fn resolve(player: u32, dealer: u32) -> Self {
        if player > BLACKJACK && dealer <= BLACKJACK {
            Outcome::Lose
        } else if dealer > BLACKJACK && player <= BLACKJACK {
            Outcome::Win
        } else if dealer < player && player <= BLACKJACK {
            Outcome::Win
        } else if player < dealer && dealer <= BLACKJACK {
            Outcome::Lose
        } else {
            // Equal scores, or both bust.
            Outcome::Draw
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Outcome::Win => "You Win",
            Outcome::Lose => "You Lose",
            Outcome::Draw => "You Got a Draw",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
