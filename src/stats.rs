use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;

/// Counters for the current play session. "Play again" keeps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub wins: u64,
    pub loses: u64,
    pub draws: u64,
}

impl SessionStats {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Lose => self.loses += 1,
            Outcome::Draw => self.draws += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.wins + self.loses + self.draws
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Cumulative counters kept by a [`StatsStore`](crate::store::StatsStore).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(rename = "wins", default)]
    pub total_wins: u64,
    #[serde(rename = "loses", default)]
    pub total_loses: u64,
    #[serde(rename = "draws", default)]
    pub total_draws: u64,
}

impl Totals {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.total_wins += 1,
            Outcome::Lose => self.total_loses += 1,
            Outcome::Draw => self.total_draws += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_counts_each_outcome() {
        let mut stats = SessionStats::default();
        stats.record(Outcome::Win);
        stats.record(Outcome::Win);
        stats.record(Outcome::Lose);
        stats.record(Outcome::Draw);
        assert_eq!(
            stats,
            SessionStats {
                wins: 2,
                loses: 1,
                draws: 1
            }
        );
        assert_eq!(stats.total(), 4);
        stats.reset();
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn totals_use_short_keys_and_default_missing_ones() {
        let totals: Totals = serde_json::from_str(r#"{"wins": 4}"#).unwrap();
        assert_eq!(totals.total_wins, 4);
        assert_eq!(totals.total_loses, 0);
        assert_eq!(totals.total_draws, 0);

        let mut totals = Totals::default();
        totals.record(Outcome::Draw);
        let json = serde_json::to_value(totals).unwrap();
        assert_eq!(json["draws"], 1);
        assert_eq!(json["wins"], 0);
    }
}
