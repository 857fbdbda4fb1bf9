//! Parallel round-robin scheduler
//!
//! Every unordered pair of accepted strategies plays one match on a local
//! rayon pool. Workers receive snapshots, rebuild both strategies and play on
//! an RNG stream keyed by the pairing's rank, so results do not depend on
//! which thread runs which pairing.

use std::collections::HashSet;

use ipd_match::{
    generate_round_robin_pairings, pairing_rank, play_match, MatchScore, MatchSettings, Strategy,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TournamentConfig;
use crate::error::{ArenaError, PairingFault};
use crate::report::{TournamentReport, TournamentResult};
use crate::snapshot::StrategySnapshot;
use crate::validation::validate_all;

/// A pairing that produced no score
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultedPairing {
    pub a: String,
    pub b: String,
    pub fault: PairingFault,
}

/// Results of scheduling an already-validated pool
#[derive(Debug)]
pub struct ScheduleOutcome {
    pub result: TournamentResult,
    pub faulted: Vec<FaultedPairing>,
    pub pairings_scheduled: usize,
    pub seed: u64,
}

/// Validate `candidates`, then play the round-robin among the accepted ones.
pub fn run_tournament(
    candidates: Vec<Strategy>,
    config: &TournamentConfig,
) -> Result<TournamentReport, ArenaError> {
    config.validate()?;
    let validation = validate_all(candidates, config.rounds);
    let outcome = run_round_robin(&validation.accepted, config)?;

    info!(
        accepted = validation.accepted.len(),
        rejected = validation.rejected.len(),
        faulted = outcome.faulted.len(),
        seed = outcome.seed,
        "tournament finished"
    );

    Ok(TournamentReport {
        result: outcome.result,
        rejected: validation.rejected,
        faulted: outcome.faulted,
        pairings_scheduled: outcome.pairings_scheduled,
        seed: outcome.seed,
        rounds: config.rounds,
        noise: config.noise,
        payoff: config.payoff,
    })
}

/// Play every pairing of `strategies` once.
///
/// Strategies are expected to have passed validation; a strategy that still
/// faults only loses the pairing it faulted in. Names must be unique since
/// results are keyed by name.
pub fn run_round_robin(
    strategies: &[Strategy],
    config: &TournamentConfig,
) -> Result<ScheduleOutcome, ArenaError> {
    config.validate()?;
    ensure_unique_names(strategies)?;
    let seed = config.seed.unwrap_or_else(rand::random::<u64>);
    let settings = config.match_settings();

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(workers) = config.workers {
        builder = builder.num_threads(workers);
    }
    let pool = builder.build()?;

    let snapshots: Vec<_> = strategies.iter().map(StrategySnapshot::capture).collect();
    let pairings = generate_round_robin_pairings(strategies.len());

    info!(
        strategies = strategies.len(),
        pairings = pairings.len(),
        seed,
        workers = pool.current_num_threads(),
        "scheduling round-robin"
    );

    let played: Vec<((usize, usize), Result<MatchScore, PairingFault>)> = pool.install(|| {
        pairings
            .par_iter()
            .map(|&(i, j)| {
                let result = match (&snapshots[i], &snapshots[j]) {
                    (Ok(a), Ok(b)) => execute_pairing(a, b, &settings, seed, pairing_rank(i, j)),
                    (Err(err), _) | (_, Err(err)) => Err(PairingFault::Scheduling(err.clone())),
                };
                ((i, j), result)
            })
            .collect()
    });

    let mut result = TournamentResult::new();
    let mut faulted = Vec::new();
    for ((i, j), outcome) in played {
        let (a, b) = (&strategies[i].name, &strategies[j].name);
        match outcome {
            Ok(score) => {
                debug!(a = %a, b = %b, score_a = score.score_a, score_b = score.score_b, "pairing complete");
                result.record(a, b, &score);
            }
            Err(fault) => {
                warn!(a = %a, b = %b, %fault, "pairing faulted");
                faulted.push(FaultedPairing {
                    a: a.clone(),
                    b: b.clone(),
                    fault,
                });
            }
        }
    }

    Ok(ScheduleOutcome {
        result,
        faulted,
        pairings_scheduled: pairings.len(),
        seed,
    })
}

fn ensure_unique_names(strategies: &[Strategy]) -> Result<(), ArenaError> {
    let mut seen = HashSet::with_capacity(strategies.len());
    for strategy in strategies {
        if !seen.insert(strategy.name.as_str()) {
            warn!(name = %strategy.name, "duplicate strategy name in pool");
            return Err(ArenaError::DuplicateName(strategy.name.clone()));
        }
    }
    Ok(())
}

/// Restore both sides from their snapshots and play the match.
fn execute_pairing(
    a: &StrategySnapshot,
    b: &StrategySnapshot,
    settings: &MatchSettings,
    seed: u64,
    stream: u64,
) -> Result<MatchScore, PairingFault> {
    let a = a.restore("p1")?;
    let b = b.restore("p2")?;
    Ok(play_match(&a, &b, settings, seed, stream)?)
}
