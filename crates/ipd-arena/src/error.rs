//! Error types for validation, scheduling and configuration

use ipd_match::{BytecodeError, HistoryArg, MatchFault, StrategyFault};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a candidate strategy was refused entry.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ContractViolation {
    #[error("mutated its {argument:?} history in round {round}")]
    Mutated { round: u32, argument: HistoryArg },

    #[error("faulted in round {round}: {fault}")]
    Faulted { round: u32, fault: StrategyFault },

    #[error("invalid program: {0}")]
    InvalidProgram(BytecodeError),

    #[error("another strategy is already registered under this name")]
    DuplicateName,
}

impl ContractViolation {
    /// Classify a fault observed while probing `round`.
    pub fn from_fault(round: u32, fault: StrategyFault) -> Self {
        match fault {
            StrategyFault::Mutated { argument } => ContractViolation::Mutated { round, argument },
            fault => ContractViolation::Faulted { round, fault },
        }
    }
}

/// Snapshot encode/decode failure
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SnapshotError {
    #[error("failed to encode strategy `{name}`: {message}")]
    Encode { name: String, message: String },

    #[error("failed to decode strategy `{name}`: {message}")]
    Decode { name: String, message: String },

    #[error("strategy `{name}` did not reconstruct: {source}")]
    Reconstruct {
        name: String,
        #[source]
        source: BytecodeError,
    },
}

/// A pairing that produced no result. Recorded, never retried.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PairingFault {
    #[error(transparent)]
    Runtime(#[from] MatchFault),

    #[error("scheduling failed: {0}")]
    Scheduling(#[from] SnapshotError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("noise level {0} is outside [0, 1]")]
    NoiseLevel(f64),

    #[error("noise is enabled with zero trials")]
    ZeroTrials,

    #[error("worker pool size must be at least 1")]
    ZeroWorkers,

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a tournament run as a whole
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("strategy name `{0}` appears more than once")]
    DuplicateName(String),
}
