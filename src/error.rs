use thiserror::Error;

use crate::round::{Action, DealerStep, Phase};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot draw from an empty deck")]
    EmptyDeck,
    #[error("invalid card rank {0}, expected 1..=13")]
    InvalidRank(u8),
    #[error("cannot {action} during {phase}")]
    InvalidAction { action: Action, phase: Phase },
    #[error("dealer cannot {step} on {score} during {phase}")]
    DealerOutOfTurn {
        step: DealerStep,
        score: u32,
        phase: Phase,
    },
    #[error("session is closed")]
    SessionClosed,
    #[error("stats store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stats store encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
