//! Tournament orchestration for the Iterated Prisoner's Dilemma
//!
//! Candidates are validated once, then every pair of accepted strategies
//! plays a match on a local worker pool. Results land in a
//! [`TournamentReport`] together with the rejections and faulted pairings.
//!
//! This crate emits `tracing` events but never installs a subscriber.

mod config;
mod error;
mod report;
mod scheduler;
mod snapshot;
mod validation;

pub use config::TournamentConfig;
pub use error::{ArenaError, ConfigError, ContractViolation, PairingFault, SnapshotError};
pub use report::{Standing, TournamentReport, TournamentResult};
pub use scheduler::{run_round_robin, run_tournament, FaultedPairing, ScheduleOutcome};
pub use snapshot::StrategySnapshot;
pub use validation::{
    validate, validate_all, Rejection, ValidationReport, ValidationVerdict, HARNESS_SEED,
};

pub use ipd_match::{
    Builtin, MatchScore, Move, NoiseConfig, PayoffMatrix, Program, Strategy, StrategyLogic,
};
