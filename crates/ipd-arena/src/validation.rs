//! Pre-tournament validation harness
//!
//! Every candidate is run against a fixed battery of synthetic histories
//! before it may enter. A strategy that faults, mutates its inputs or returns
//! a malformed decision on any battery case is rejected for the whole tournament.

use std::collections::HashSet;

use ipd_match::{invoke_checked, Move, SeededRng, Strategy, StrategyLogic};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ContractViolation;

/// Base seed for battery RNG streams
pub const HARNESS_SEED: u64 = 0x5eed_0f_1a2b_3c4d;

/// Synthetic history pairs replayed at each round
const CASES_PER_ROUND: u64 = 3;

/// Outcome for a single candidate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub name: String,
    pub accepted: bool,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub strategy: String,
    pub reason: ContractViolation,
}

/// Result of validating a candidate pool
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub accepted: Vec<Strategy>,
    pub rejected: Vec<Rejection>,
    verdicts: Vec<ValidationVerdict>,
}

impl ValidationReport {
    /// One verdict per candidate, in submission order
    pub fn verdicts(&self) -> &[ValidationVerdict] {
        &self.verdicts
    }
}

/// Validate a single strategy against the validation battery.
pub fn validate(strategy: &Strategy, max_rounds: u32) -> ValidationVerdict {
    verdict(&strategy.name, check(strategy, max_rounds))
}

/// Validate a pool. Accepted strategies keep their submission order.
pub fn validate_all(candidates: Vec<Strategy>, max_rounds: u32) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut names = HashSet::new();

    for candidate in candidates {
        let outcome = if names.contains(&candidate.name) {
            Err(ContractViolation::DuplicateName)
        } else {
            check(&candidate, max_rounds)
        };

        report.verdicts.push(verdict(&candidate.name, outcome.clone()));
        match outcome {
            Ok(()) => {
                names.insert(candidate.name.clone());
                report.accepted.push(candidate);
            }
            Err(reason) => {
                warn!(strategy = %candidate.name, %reason, "strategy rejected");
                report.rejected.push(Rejection {
                    strategy: candidate.name,
                    reason,
                });
            }
        }
    }

    report
}

fn verdict(name: &str, outcome: Result<(), ContractViolation>) -> ValidationVerdict {
    ValidationVerdict {
        name: name.to_string(),
        accepted: outcome.is_ok(),
        reason: outcome.err().map(|reason| reason.to_string()),
    }
}

/// Run the battery; stops at the first violation.
fn check(strategy: &Strategy, max_rounds: u32) -> Result<(), ContractViolation> {
    if let StrategyLogic::Program(program) = &strategy.logic {
        program.validate().map_err(ContractViolation::InvalidProgram)?;
    }

    for round in 0..max_rounds.max(1) {
        for (case, (own, opponent)) in battery_histories(round).into_iter().enumerate() {
            let index = u64::from(round) * CASES_PER_ROUND + case as u64;
            let mut rng = SeededRng::new(HARNESS_SEED, index);
            invoke_checked(strategy, &own, &opponent, round, &mut rng)
                .map_err(|fault| ContractViolation::from_fault(round, fault))?;
        }
    }
    Ok(())
}

/// History pairs of length `round`: own always defecting against an
/// always-cooperating opponent, then two alternating patterns.
fn battery_histories(round: u32) -> [(Vec<Move>, Vec<Move>); 3] {
    let len = round as usize;
    let alternating = |first_defects: bool| -> Vec<Move> {
        (0..len).map(|i| Move::from((i % 2 == 0) == first_defects)).collect()
    };
    [
        (vec![Move::Defect; len], vec![Move::Cooperate; len]),
        (alternating(true), alternating(false)),
        (alternating(false), alternating(true)),
    ]
}
