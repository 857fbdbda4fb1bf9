//! Tournament results and the run report

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ipd_match::{MatchScore, NoiseConfig, PayoffMatrix};
use serde::{Deserialize, Serialize};

use crate::scheduler::FaultedPairing;
use crate::validation::Rejection;

/// Mean scores per ordered pair: `result[a][b] = (score of a, score of b)`.
///
/// Only completed pairings appear, and always in both directions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TournamentResult {
    scores: BTreeMap<String, BTreeMap<String, (f64, f64)>>,
}

impl TournamentResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<(f64, f64)> {
        self.scores.get(a)?.get(b).copied()
    }

    /// Record a completed match between `a` (side A) and `b` (side B).
    pub fn record(&mut self, a: &str, b: &str, score: &MatchScore) {
        self.scores
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), (score.score_a, score.score_b));
        self.scores
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string(), (score.score_b, score.score_a));
    }

    /// Number of strategies with at least one completed match
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Opponents of `name` with a recorded result
    pub fn opponents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.scores
            .get(name)
            .into_iter()
            .flat_map(|row| row.keys().map(String::as_str))
    }

    /// Sum of each strategy's own scores over all its completed matches
    pub fn totals(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|(name, row)| (name.clone(), row.values().map(|(own, _)| own).sum()))
            .collect()
    }
}

/// One line of the final table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub name: String,
    pub total: f64,
    /// Total divided by completed matches
    pub average: f64,
    pub matches: usize,
}

/// Everything an external reporter needs about one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentReport {
    pub result: TournamentResult,
    pub rejected: Vec<Rejection>,
    pub faulted: Vec<FaultedPairing>,
    pub pairings_scheduled: usize,
    /// Base seed the run used; replaying with it reproduces the report
    pub seed: u64,
    pub rounds: u32,
    pub noise: NoiseConfig,
    pub payoff: PayoffMatrix,
}

impl TournamentReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn faulted_count(&self) -> usize {
        self.faulted.len()
    }

    /// Standings sorted by total score (descending), ties by name
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .result
            .totals()
            .into_iter()
            .map(|(name, total)| {
                let matches = self.result.opponents(&name).count();
                Standing {
                    average: if matches == 0 { 0.0 } else { total / matches as f64 },
                    name,
                    total,
                    matches,
                }
            })
            .collect();

        standings.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        standings
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
