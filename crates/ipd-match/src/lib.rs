//! Match logic for the Iterated Prisoner's Dilemma
//!
//! Everything here is single-threaded and deterministic given its inputs:
//! strategies, the bytecode VM, the payoff and noise models, the match
//! engine and round-robin pairing enumeration.

mod game;
mod noise;
mod pairing;
mod payoff;
mod random;
mod strategy;
pub mod vm;

pub use game::{
    play_match, play_trial, MatchFault, MatchScore, MatchSettings, MatchState, RoundResult, Side,
    Trial, TrialResult,
};
pub use noise::{perceive, NoiseConfig};
pub use pairing::{calculate_match_count, generate_round_robin_pairings, pairing_for_index, pairing_rank};
pub use payoff::PayoffMatrix;
pub use random::SeededRng;
pub use strategy::{
    invoke_checked, Builtin, Decide, Decision, HistoryArg, Move, Strategy, StrategyFault,
    StrategyLogic, MAX_LOOKAHEAD,
};
pub use vm::{validate_bytecode, AssembleError, BytecodeError, Program};
