//! Single-player blackjack against a dealer: shoe management, hand scoring,
//! the round state machine and session statistics. Rendering is left to the
//! caller, which reads [`Snapshot`]s and drives a [`SessionHandle`] or a bare
//! [`Round`].

pub mod card;
pub mod deck;
pub mod error;
pub mod hand;
pub mod outcome;
pub mod round;
pub mod session;
pub mod stats;
pub mod store;

pub use card::{Card, Suit};
pub use deck::{Deck, Draw};
pub use error::{Error, Result};
pub use hand::{score_hand, Hand};
pub use outcome::Outcome;
pub use round::{Action, DealerStep, Phase, Round, Snapshot};
pub use session::{Notice, Session, SessionConfig, SessionHandle};
pub use stats::{SessionStats, Totals};
pub use store::{open_or_memory, JsonFileStore, MemoryStore, StatsStore};
