//! Payoff matrix for the Prisoner's Dilemma

use serde::{Deserialize, Serialize};

use crate::strategy::Move;

/// The four configured payoffs.
///
/// Conventionally `T > R > P > S`; the engine does not enforce it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayoffMatrix {
    /// R: both cooperate
    pub reward: f64,
    /// T: defect against a cooperator
    pub temptation: f64,
    /// S: cooperate against a defector
    pub sucker: f64,
    /// P: both defect
    pub punishment: f64,
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self {
            reward: 5.0,
            temptation: 9.0,
            sucker: 0.0,
            punishment: 1.0,
        }
    }
}

impl PayoffMatrix {
    pub fn new(reward: f64, temptation: f64, sucker: f64, punishment: f64) -> Self {
        Self { reward, temptation, sucker, punishment }
    }

    /// Returns (own_points, other_points)
    pub fn score(&self, own: Move, other: Move) -> (f64, f64) {
        match (own, other) {
            (Move::Cooperate, Move::Cooperate) => (self.reward, self.reward),
            (Move::Cooperate, Move::Defect) => (self.sucker, self.temptation),
            (Move::Defect, Move::Cooperate) => (self.temptation, self.sucker),
            (Move::Defect, Move::Defect) => (self.punishment, self.punishment),
        }
    }

    /// Cumulative scores over two equal-length move sequences
    pub fn total(&self, moves_a: &[Move], moves_b: &[Move]) -> (f64, f64) {
        debug_assert_eq!(moves_a.len(), moves_b.len());
        moves_a
            .iter()
            .zip(moves_b)
            .fold((0.0, 0.0), |(total_a, total_b), (&a, &b)| {
                let (score_a, score_b) = self.score(a, b);
                (total_a + score_a, total_b + score_b)
            })
    }

    /// Whether `T > R > P > S` holds
    pub fn is_dilemma(&self) -> bool {
        self.temptation > self.reward
            && self.reward > self.punishment
            && self.punishment > self.sucker
    }
}
