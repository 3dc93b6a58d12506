use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::card::Card;
use crate::deck::Deck;
use crate::error::{Error, Result};
use crate::hand::Hand;
use crate::outcome::Outcome;
use crate::stats::SessionStats;
use crate::store::StatsStore;

/// The dealer keeps drawing while at or below this total.
pub const DEALER_DRAWS_THROUGH: u32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    PlayerTurn,
    DealerTurn,
    Resolved,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::PlayerTurn => "the player's turn",
            Phase::DealerTurn => "the dealer's turn",
            Phase::Resolved => "a resolved round",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Deal,
    Hit,
    Stay,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Deal => "deal",
            Action::Hit => "hit",
            Action::Stay => "stay",
        })
    }
}

/// Dealer moves driven by the round's owner rather than the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealerStep {
    Draw,
    Stand,
}

impl fmt::Display for DealerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DealerStep::Draw => "draw",
            DealerStep::Stand => "stand",
        })
    }
}

/// Everything a presentation layer needs to draw the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub player: Vec<Card>,
    pub dealer: Vec<Card>,
    pub player_score: u32,
    pub dealer_score: u32,
    pub cards_remaining: usize,
    pub phase: Phase,
    pub last_outcome: Option<Outcome>,
    pub stats: SessionStats,
}

/// One player against the dealer, round after round, over a single shoe.
///
/// Every resolution and [`reset_totals`](Round::reset_totals) queues a write
/// to the [`StatsStore`]. A [`Session`](crate::session::Session) drains the
/// queue as it runs; any other owner must drive [`next_write`](Round::next_write)
/// or [`flush`](Round::flush) itself, typically once per round.
pub struct Round {
    deck: Deck,
    player: Hand,
    dealer: Hand,
    cards_remaining: usize,
    phase: Phase,
    last_outcome: Option<Outcome>,
    stats: SessionStats,
    store: Arc<dyn StatsStore>,
    writes: FuturesUnordered<BoxFuture<'static, ()>>,
}

impl Round {
    /// Takes ownership of the shoe and deals the first round.
    pub fn new(deck: Deck, store: Arc<dyn StatsStore>) -> Result<Self> {
        let mut round = Self {
            cards_remaining: deck.len(),
            deck,
            player: Hand::new(),
            dealer: Hand::new(),
            phase: Phase::PlayerTurn,
            last_outcome: None,
            stats: SessionStats::default(),
            store,
            writes: FuturesUnordered::new(),
        };
        round.deal()?;
        info!(cards_remaining = round.cards_remaining, "session started");
        Ok(round)
    }

    /// Clears both hands and deals two cards to the dealer, then two to the player.
    ///
    /// Valid from any phase; an unfinished dealer turn is abandoned unresolved.
    pub fn deal(&mut self) -> Result<()> {
        if self.phase == Phase::DealerTurn {
            debug!("dealer turn abandoned by a new deal");
        }
        self.player.clear();
        self.dealer.clear();
        for _ in 0..2 {
            let card = self.draw()?;
            self.dealer.push(card);
        }
        for _ in 0..2 {
            let card = self.draw()?;
            self.player.push(card);
        }
        self.phase = Phase::PlayerTurn;
        self.last_outcome = None;
        Ok(())
    }

    /// Draws one card for the player. Returns the outcome if the player busts.
    pub fn hit(&mut self) -> Result<Option<Outcome>> {
        if self.phase != Phase::PlayerTurn || self.player.is_bust() {
            return Err(self.reject(Action::Hit));
        }
        let card = self.draw()?;
        self.player.push(card);
        if self.player.is_bust() {
            return Ok(Some(self.resolve()));
        }
        Ok(None)
    }

    /// Ends the player's turn; the dealer plays next.
    pub fn stay(&mut self) -> Result<()> {
        if self.phase != Phase::PlayerTurn {
            return Err(self.reject(Action::Stay));
        }
        self.phase = Phase::DealerTurn;
        Ok(())
    }

    pub fn dealer_should_draw(&self) -> bool {
        self.phase == Phase::DealerTurn && self.dealer.score() <= DEALER_DRAWS_THROUGH
    }

    pub fn dealer_draw(&mut self) -> Result<Card> {
        if !self.dealer_should_draw() {
            return Err(self.dealer_out_of_turn(DealerStep::Draw));
        }
        let card = self.draw()?;
        self.dealer.push(card);
        Ok(card)
    }

    /// Resolves the round once the dealer stands or busts.
    pub fn finish_dealer(&mut self) -> Result<Outcome> {
        if self.phase != Phase::DealerTurn || self.dealer_should_draw() {
            return Err(self.dealer_out_of_turn(DealerStep::Stand));
        }
        Ok(self.resolve())
    }

    /// Plays the whole dealer turn without pacing.
    pub fn play_dealer(&mut self) -> Result<Outcome> {
        while self.dealer_should_draw() {
            self.dealer_draw()?;
        }
        self.finish_dealer()
    }

    /// Queues a reset of the durable totals. Session counters are untouched.
    pub fn reset_totals(&mut self) {
        let request = self.store.reset();
        self.writes.push(
            async move {
                if let Err(err) = request.await {
                    warn!(?err, "failed to reset saved stats");
                }
            }
            .boxed(),
        );
    }

    /// Starts a fresh session: zeroes the session counters and deals.
    pub fn restart_session(&mut self) -> Result<()> {
        self.stats.reset();
        self.deal()
    }

    pub fn player(&self) -> &Hand {
        &self.player
    }

    pub fn dealer(&self) -> &Hand {
        &self.dealer
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cards_remaining(&self) -> usize {
        self.cards_remaining
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn store(&self) -> Arc<dyn StatsStore> {
        self.store.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            player: self.player.cards().to_vec(),
            dealer: self.dealer.cards().to_vec(),
            player_score: self.player.score(),
            dealer_score: self.dealer.score(),
            cards_remaining: self.cards_remaining,
            phase: self.phase,
            last_outcome: self.last_outcome,
            stats: self.stats,
        }
    }

    /// Number of stat writes issued but not yet completed.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Drives one outstanding stat write to completion.
    ///
    /// Resolves to `None` straight away when nothing is pending.
    pub async fn next_write(&mut self) -> Option<()> {
        self.writes.next().await
    }

    /// Waits for every outstanding stat write.
    pub async fn flush(&mut self) {
        while self.writes.next().await.is_some() {}
    }

    fn draw(&mut self) -> Result<Card> {
        let draw = self.deck.draw()?;
        self.cards_remaining = draw.remaining;
        Ok(draw.card)
    }

    fn resolve(&mut self) -> Outcome {
        let player = self.player.score();
        let dealer = self.dealer.score();
        let outcome = Outcome::resolve(player, dealer);
        self.stats.record(outcome);
        self.phase = Phase::Resolved;
        self.last_outcome = Some(outcome);
        info!(player, dealer, ?outcome, "round resolved");

        let request = self.store.increment(outcome);
        self.writes.push(
            async move {
                if let Err(err) = request.await {
                    warn!(?err, ?outcome, "failed to record outcome in saved stats");
                }
            }
            .boxed(),
        );
        outcome
    }

    fn dealer_out_of_turn(&self, step: DealerStep) -> Error {
        let score = self.dealer.score();
        debug!(%step, score, phase = ?self.phase, "dealer step out of turn");
        Error::DealerOutOfTurn {
            step,
            score,
            phase: self.phase,
        }
    }

    fn reject(&self, action: Action) -> Error {
        warn!(%action, phase = ?self.phase, "rejected action");
        Error::InvalidAction {
            action,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{stacked, DECK_SIZE};
    use crate::stats::Totals;
    use crate::store::MemoryStore;

    // Dealer takes the first two cards, the player the next two.
    fn round(ranks: &[u8]) -> (Round, MemoryStore) {
        let store = MemoryStore::new();
        let round = Round::new(stacked(ranks), Arc::new(store.clone())).unwrap();
        (round, store)
    }

    #[test]
    fn deals_two_cards_each_dealer_first() {
        let (round, _) = round(&[10, 7, 9, 2, 5, 5]);
        assert_eq!(round.dealer().score(), 17);
        assert_eq!(round.player().score(), 11);
        assert_eq!(round.phase(), Phase::PlayerTurn);
        assert_eq!(round.cards_remaining(), 2);
        assert_eq!(round.last_outcome(), None);
    }

    #[tokio::test]
    async fn hitting_into_a_bust_loses() {
        let (mut round, store) = round(&[10, 8, 10, 4, 5, 9, 6]);
        assert_eq!(round.hit().unwrap(), None);
        assert_eq!(round.player().score(), 19);
        let outcome = round.hit().unwrap();
        assert_eq!(outcome, Some(Outcome::Lose));
        assert_eq!(round.phase(), Phase::Resolved);
        assert_eq!(round.dealer().len(), 2);
        assert_eq!(round.stats().loses, 1);
        assert_eq!(round.stats().total(), 1);
        assert_eq!(round.pending_writes(), 1);

        round.flush().await;
        assert_eq!(round.pending_writes(), 0);
        assert_eq!(
            store.totals(),
            Totals {
                total_wins: 0,
                total_loses: 1,
                total_draws: 0
            }
        );
    }

    #[test]
    fn staying_against_a_made_dealer_resolves_without_drawing() {
        let (mut round, _) = round(&[10, 10, 10, 9, 5, 5]);
        let before = round.cards_remaining();
        round.stay().unwrap();
        assert_eq!(round.phase(), Phase::DealerTurn);
        assert!(!round.dealer_should_draw());
        assert_eq!(round.play_dealer().unwrap(), Outcome::Lose);
        assert_eq!(round.dealer().len(), 2);
        assert_eq!(round.cards_remaining(), before);
        assert_eq!(round.stats().loses, 1);
    }

    #[test]
    fn dealer_draws_on_seventeen() {
        let (mut round, _) = round(&[10, 7, 10, 9, 2, 5]);
        round.stay().unwrap();
        assert!(round.dealer_should_draw());
        assert_eq!(round.dealer_draw().unwrap().rank(), 2);
        assert_eq!(round.dealer().score(), 19);
        assert!(!round.dealer_should_draw());
        assert_eq!(round.finish_dealer().unwrap(), Outcome::Draw);
        assert_eq!(round.stats().draws, 1);
    }

    #[test]
    fn dealer_bust_is_a_win() {
        let (mut round, _) = round(&[10, 6, 10, 8, 9, 5]);
        round.stay().unwrap();
        assert_eq!(round.play_dealer().unwrap(), Outcome::Win);
        assert_eq!(round.dealer().score(), 25);
        assert_eq!(round.last_outcome(), Some(Outcome::Win));
    }

    #[test]
    fn actions_outside_the_player_turn_are_rejected() {
        let (mut round, _) = round(&[10, 9, 10, 8, 3, 3]);
        round.stay().unwrap();
        assert!(matches!(
            round.hit(),
            Err(Error::InvalidAction {
                action: Action::Hit,
                phase: Phase::DealerTurn
            })
        ));
        assert!(matches!(round.stay(), Err(Error::InvalidAction { .. })));

        round.play_dealer().unwrap();
        let resolved = round.snapshot();
        assert!(round.hit().is_err());
        assert!(round.stay().is_err());
        assert!(matches!(
            round.dealer_draw(),
            Err(Error::DealerOutOfTurn {
                step: DealerStep::Draw,
                score: 19,
                phase: Phase::Resolved
            })
        ));
        assert_eq!(round.snapshot(), resolved);
        assert_eq!(round.stats().total(), 1);
    }

    #[test]
    fn finishing_early_is_rejected() {
        let (mut round, _) = round(&[2, 3, 10, 8, 3, 3]);
        assert!(matches!(
            round.finish_dealer(),
            Err(Error::DealerOutOfTurn {
                step: DealerStep::Stand,
                phase: Phase::PlayerTurn,
                ..
            })
        ));
        round.stay().unwrap();
        let err = round.finish_dealer().unwrap_err();
        assert_eq!(err.to_string(), "dealer cannot stand on 5 during the dealer's turn");
        assert_eq!(round.phase(), Phase::DealerTurn);
    }

    #[test]
    fn deal_starts_over_and_keeps_session_stats() {
        let (mut round, _) = round(&[10, 10, 10, 5, 9]);
        round.hit().unwrap();
        assert_eq!(round.stats().loses, 1);

        round.deal().unwrap();
        assert_eq!(round.phase(), Phase::PlayerTurn);
        assert_eq!(round.player().len(), 2);
        assert_eq!(round.dealer().len(), 2);
        assert_eq!(round.last_outcome(), None);
        assert_eq!(round.stats().loses, 1);

        round.restart_session().unwrap();
        assert_eq!(round.stats().total(), 0);
    }

    #[test]
    fn deal_abandons_a_dealer_turn_without_counting_it() {
        let (mut round, _) = round(&[2, 3, 10, 8]);
        round.stay().unwrap();
        round.dealer_draw().unwrap();
        round.deal().unwrap();
        assert_eq!(round.phase(), Phase::PlayerTurn);
        assert_eq!(round.stats().total(), 0);
        assert_eq!(round.pending_writes(), 0);
    }

    #[test]
    fn cards_remaining_follows_replenishment() {
        // The fourth card empties the stacked shoe.
        let (mut round, _) = round(&[10, 9, 2, 3]);
        assert_eq!(round.cards_remaining(), DECK_SIZE);
        round.hit().unwrap();
        assert_eq!(round.cards_remaining(), DECK_SIZE - 1);
    }

    #[tokio::test]
    async fn reset_totals_is_queued() {
        let store = MemoryStore::with_totals(Totals {
            total_wins: 3,
            total_loses: 2,
            total_draws: 1,
        });
        let mut round = Round::new(stacked(&[10, 10, 10, 9, 4]), Arc::new(store.clone())).unwrap();
        round.reset_totals();
        assert_eq!(round.pending_writes(), 1);
        round.flush().await;
        assert_eq!(store.totals(), Totals::default());
    }

    #[tokio::test]
    async fn draining_each_round_keeps_totals_current() {
        let store = MemoryStore::new();
        let mut round = Round::new(Deck::with_seed(11), Arc::new(store.clone())).unwrap();
        for _ in 0..500 {
            round.stay().unwrap();
            round.play_dealer().unwrap();
            round.flush().await;
            assert_eq!(round.pending_writes(), 0);
            round.deal().unwrap();
        }
        let totals = store.totals();
        let stats = round.stats();
        assert_eq!(stats.total(), 500);
        assert_eq!(totals.total_wins, stats.wins);
        assert_eq!(totals.total_loses, stats.loses);
        assert_eq!(totals.total_draws, stats.draws);
    }

    #[test]
    fn empty_shoe_is_an_error() {
        let result = Round::new(Deck::from_cards(Vec::new()), Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(Error::EmptyDeck)));
    }
}
