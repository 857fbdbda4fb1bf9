//! Strategy definitions and execution

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::random::SeededRng;
use crate::vm::Program;

/// Longest lookahead plan a strategy may return in one call.
pub const MAX_LOOKAHEAD: usize = 16;

/// A move in the Prisoner's Dilemma
///
/// Encoded system-wide as `false` = cooperate, `true` = defect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Cooperate,
    Defect,
}

impl Move {
    pub fn is_defect(self) -> bool {
        self == Move::Defect
    }

    pub fn flipped(self) -> Move {
        match self {
            Move::Cooperate => Move::Defect,
            Move::Defect => Move::Cooperate,
        }
    }
}

impl From<bool> for Move {
    fn from(defect: bool) -> Self {
        if defect {
            Move::Defect
        } else {
            Move::Cooperate
        }
    }
}

impl From<Move> for bool {
    fn from(m: Move) -> Self {
        m.is_defect()
    }
}

/// What a single `decide` call produced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Move for the current round
    Move(Move),
    /// Moves for this and the following rounds, consumed one per round
    Plan(Vec<Move>),
}

impl Decision {
    /// Reject plans that are empty or longer than `MAX_LOOKAHEAD`.
    pub fn checked(self) -> Result<Decision, StrategyFault> {
        match &self {
            Decision::Plan(moves) if moves.is_empty() => Err(StrategyFault::EmptyPlan),
            Decision::Plan(moves) if moves.len() > MAX_LOOKAHEAD => {
                Err(StrategyFault::PlanTooLong { len: moves.len() })
            }
            _ => Ok(self),
        }
    }
}

/// Which history argument a strategy touched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryArg {
    Own,
    Opponent,
}

/// Contract violation observed during one `decide` call
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StrategyFault {
    #[error("returned non-boolean value {value}")]
    NonBoolean { value: u32 },
    #[error("returned an empty lookahead plan")]
    EmptyPlan,
    #[error("lookahead plan of {len} moves exceeds the limit of {}", MAX_LOOKAHEAD)]
    PlanTooLong { len: usize },
    #[error("mutated its {argument:?} history argument")]
    Mutated { argument: HistoryArg },
    #[error("raised: {message}")]
    Raised { message: String },
    #[error("stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },
    #[error("stack overflow at offset {offset}")]
    StackOverflow { offset: usize },
    #[error("unknown opcode 0x{opcode:02X} at offset {offset}")]
    UnknownOpcode { offset: usize, opcode: u8 },
    #[error("program ended without a decision")]
    NoDecision,
}

/// The decision contract every strategy satisfies.
///
/// `own` and `opponent` are scratch copies owned by the caller and hold
/// exactly `round` moves each. Implementations must leave them unchanged
/// and must not raise.
pub trait Decide {
    fn decide(
        &self,
        own: &mut Vec<Move>,
        opponent: &mut Vec<Move>,
        round: u32,
        rng: &mut SeededRng,
    ) -> Result<Decision, StrategyFault>;
}

/// Call `decide` on defensive copies and enforce the whole contract:
/// no fault, no mutation of either argument, a well-formed decision.
pub fn invoke_checked<S: Decide + ?Sized>(
    strategy: &S,
    own: &[Move],
    opponent: &[Move],
    round: u32,
    rng: &mut SeededRng,
) -> Result<Decision, StrategyFault> {
    let mut own_copy = own.to_vec();
    let mut opponent_copy = opponent.to_vec();

    let decision = strategy.decide(&mut own_copy, &mut opponent_copy, round, rng)?;

    if own_copy != own {
        return Err(StrategyFault::Mutated { argument: HistoryArg::Own });
    }
    if opponent_copy != opponent {
        return Err(StrategyFault::Mutated { argument: HistoryArg::Opponent });
    }
    decision.checked()
}

/// Built-in reference strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Builtin {
    /// Always defect, never cooperate.
    AlwaysDefect,
    /// Always cooperate, never defect.
    AlwaysCooperate,
    /// Fair coin each round.
    Random,
    /// Defect with probability 0.9.
    MostlyDefect,
    /// Copy opponent's last move. Start with cooperate.
    TitForTat,
    /// Defect only if opponent defected twice in a row.
    TitForTwoTats,
    /// Cooperate until opponent defects once, then always defect.
    Grudger,
    /// Cooperate until opponent defects in two consecutive rounds, then always defect.
    GrudgerForTwoTats,
    /// Defect if the opponent defected in either of the last two rounds.
    TwoTitsForTat,
    /// Cooperate when both players made the same move last round.
    Pavlov,
    /// Tit-for-Tat but start with defect.
    SuspiciousTitForTat,
    /// Retaliate with increasing defection streaks, then forgive.
    Gradual,
}

impl Builtin {
    pub fn all() -> &'static [Builtin] {
        &[
            Builtin::AlwaysDefect,
            Builtin::AlwaysCooperate,
            Builtin::Random,
            Builtin::MostlyDefect,
            Builtin::TitForTat,
            Builtin::TitForTwoTats,
            Builtin::Grudger,
            Builtin::GrudgerForTwoTats,
            Builtin::TwoTitsForTat,
            Builtin::Pavlov,
            Builtin::SuspiciousTitForTat,
            Builtin::Gradual,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::AlwaysDefect => "always_defect",
            Builtin::AlwaysCooperate => "always_cooperate",
            Builtin::Random => "random",
            Builtin::MostlyDefect => "mostly_defect",
            Builtin::TitForTat => "tit_for_tat",
            Builtin::TitForTwoTats => "tit_for_two_tats",
            Builtin::Grudger => "grudger",
            Builtin::GrudgerForTwoTats => "grudger_for_two_tats",
            Builtin::TwoTitsForTat => "two_tits_for_tat",
            Builtin::Pavlov => "pavlov",
            Builtin::SuspiciousTitForTat => "suspicious_tit_for_tat",
            Builtin::Gradual => "gradual",
        }
    }

    /// Pick this round's move
    pub fn execute(self, own: &[Move], opponent: &[Move], rng: &mut SeededRng) -> Move {
        match self {
            Builtin::AlwaysDefect => Move::Defect,
            Builtin::AlwaysCooperate => Move::Cooperate,
            Builtin::Random => Move::from(rng.next_u64() & 1 == 1),
            Builtin::MostlyDefect => Move::from(rng.chance(0.9)),
            Builtin::TitForTat => opponent.last().copied().unwrap_or(Move::Cooperate),
            Builtin::TitForTwoTats => execute_tit_for_two_tats(opponent),
            Builtin::Grudger => Move::from(opponent.iter().any(|m| m.is_defect())),
            Builtin::GrudgerForTwoTats => Move::from(
                opponent
                    .windows(2)
                    .any(|pair| pair[0].is_defect() && pair[1].is_defect()),
            ),
            Builtin::TwoTitsForTat => {
                Move::from(opponent.iter().rev().take(2).any(|m| m.is_defect()))
            }
            Builtin::Pavlov => execute_pavlov(own, opponent),
            Builtin::SuspiciousTitForTat => opponent.last().copied().unwrap_or(Move::Defect),
            Builtin::Gradual => execute_gradual(own, opponent),
        }
    }
}

impl Decide for Builtin {
    fn decide(
        &self,
        own: &mut Vec<Move>,
        opponent: &mut Vec<Move>,
        _round: u32,
        rng: &mut SeededRng,
    ) -> Result<Decision, StrategyFault> {
        Ok(Decision::Move(self.execute(own, opponent, rng)))
    }
}

/// Tit-for-Two-Tats: Only defect if opponent defected twice in a row
fn execute_tit_for_two_tats(opponent: &[Move]) -> Move {
    match opponent {
        [.., a, b] => Move::from(a.is_defect() && b.is_defect()),
        _ => Move::Cooperate,
    }
}

/// Pavlov: Win-stay, lose-switch
///
/// Cooperate after matching moves, defect after mismatched ones.
fn execute_pavlov(own: &[Move], opponent: &[Move]) -> Move {
    match (own.last(), opponent.last()) {
        (Some(mine), Some(theirs)) => Move::from(mine != theirs),
        _ => Move::Cooperate,
    }
}

/// Gradual: Escalating retaliation
/// After N opponent defections, player should have made N(N+1)/2 total defections
fn execute_gradual(own: &[Move], opponent: &[Move]) -> Move {
    let their_defections = opponent.iter().filter(|m| m.is_defect()).count();
    let my_defections = own.iter().filter(|m| m.is_defect()).count();

    // Expected total defections: 1 + 2 + ... + N = N(N+1)/2
    let expected = their_defections * (their_defections + 1) / 2;

    Move::from(my_defections < expected)
}

/// How a strategy decides: a builtin or a bytecode program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyLogic {
    Builtin(Builtin),
    Program(Program),
}

impl Decide for StrategyLogic {
    fn decide(
        &self,
        own: &mut Vec<Move>,
        opponent: &mut Vec<Move>,
        round: u32,
        rng: &mut SeededRng,
    ) -> Result<Decision, StrategyFault> {
        match self {
            StrategyLogic::Builtin(builtin) => builtin.decide(own, opponent, round, rng),
            StrategyLogic::Program(program) => program.decide(own, opponent, round, rng),
        }
    }
}

/// A named tournament participant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub logic: StrategyLogic,
}

impl Strategy {
    pub fn new(name: impl Into<String>, logic: StrategyLogic) -> Self {
        Self { name: name.into(), logic }
    }

    /// A builtin under its canonical name
    pub fn builtin(builtin: Builtin) -> Self {
        Self::new(builtin.name(), StrategyLogic::Builtin(builtin))
    }

    pub fn program(name: impl Into<String>, program: Program) -> Self {
        Self::new(name, StrategyLogic::Program(program))
    }

    /// Every builtin, each under its canonical name
    pub fn all_builtins() -> Vec<Strategy> {
        Builtin::all().iter().copied().map(Strategy::builtin).collect()
    }
}

impl Decide for Strategy {
    fn decide(
        &self,
        own: &mut Vec<Move>,
        opponent: &mut Vec<Move>,
        round: u32,
        rng: &mut SeededRng,
    ) -> Result<Decision, StrategyFault> {
        self.logic.decide(own, opponent, round, rng)
    }
}
