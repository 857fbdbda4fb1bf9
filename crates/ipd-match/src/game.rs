//! Match execution engine

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::noise::NoiseConfig;
use crate::payoff::PayoffMatrix;
use crate::random::SeededRng;
use crate::strategy::{invoke_checked, Decide, Decision, Move, StrategyFault};

/// Stream offsets inside one round
const STREAM_A: u64 = 0;
const STREAM_B: u64 = 1;
const STREAM_NOISE_A_TO_B: u64 = 2;
const STREAM_NOISE_B_TO_A: u64 = 3;
const STREAMS_PER_ROUND: u64 = 4;

/// Upper bound on history pre-allocation; longer matches grow on demand
const PREALLOC_ROUNDS: u32 = 1024;

/// Parameters shared by every match in a tournament
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSettings {
    pub rounds: u32,
    pub payoff: PayoffMatrix,
    pub noise: NoiseConfig,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            rounds: 100,
            payoff: PayoffMatrix::default(),
            noise: NoiseConfig::default(),
        }
    }
}

/// Player position within a match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

/// A strategy violated its contract mid-match. The match has no score.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("player {side:?} faulted in trial {trial}, round {round}: {fault}")]
pub struct MatchFault {
    pub side: Side,
    pub trial: u32,
    pub round: u32,
    pub fault: StrategyFault,
}

/// Lifecycle of a trial
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchState {
    Initialized,
    /// `round` is the next round to play
    Running { round: u32 },
    Completed,
    Faulted,
}

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u32,
    pub move_a: Move,
    pub move_b: Move,
    /// A's move as B perceived it
    pub seen_by_b: Move,
    /// B's move as A perceived it
    pub seen_by_a: Move,
    pub score_a: f64,
    pub score_b: f64,
    pub cumulative_a: f64,
    pub cumulative_b: f64,
}

/// Result of one complete trial
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub rounds: Vec<RoundResult>,
    pub total_a: f64,
    pub total_b: f64,
}

/// Mean scores over all trials of a match
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score_a: f64,
    pub score_b: f64,
    pub trials: u32,
}

/// Histories of one trial
#[derive(Default)]
struct GameState {
    own_a: Vec<Move>,
    own_b: Vec<Move>,
    /// B's moves as A perceived them
    seen_by_a: Vec<Move>,
    /// A's moves as B perceived them
    seen_by_b: Vec<Move>,
    queue_a: VecDeque<Move>,
    queue_b: VecDeque<Move>,
}

impl GameState {
    fn with_capacity(rounds: usize) -> Self {
        Self {
            own_a: Vec::with_capacity(rounds),
            own_b: Vec::with_capacity(rounds),
            seen_by_a: Vec::with_capacity(rounds),
            seen_by_b: Vec::with_capacity(rounds),
            ..Self::default()
        }
    }
}

/// A single trial, advanced one round per [`Trial::step`].
pub struct Trial<'s, A: ?Sized, B: ?Sized> {
    a: &'s A,
    b: &'s B,
    settings: &'s MatchSettings,
    rng: SeededRng,
    state: MatchState,
    game: GameState,
    rounds: Vec<RoundResult>,
    total_a: f64,
    total_b: f64,
}

impl<'s, A: Decide + ?Sized, B: Decide + ?Sized> Trial<'s, A, B> {
    pub fn new(a: &'s A, b: &'s B, settings: &'s MatchSettings, rng: &SeededRng) -> Self {
        let capacity = settings.rounds.min(PREALLOC_ROUNDS) as usize;
        Self {
            a,
            b,
            settings,
            rng: rng.clone(),
            state: MatchState::Initialized,
            game: GameState::with_capacity(capacity),
            rounds: Vec::with_capacity(capacity),
            total_a: 0.0,
            total_b: 0.0,
        }
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Advance by one transition. Completed and faulted trials stay put.
    pub fn step(&mut self) -> Result<MatchState, MatchFault> {
        let current = self.state;
        self.state = match current {
            MatchState::Initialized => self.after(0),
            MatchState::Running { round } => match self.play_round(round) {
                Ok(()) => self.after(round + 1),
                Err(fault) => {
                    self.state = MatchState::Faulted;
                    return Err(fault);
                }
            },
            done => done,
        };
        Ok(self.state)
    }

    /// Step until the trial completes or faults.
    pub fn run(mut self) -> Result<TrialResult, MatchFault> {
        while !matches!(self.step()?, MatchState::Completed | MatchState::Faulted) {}
        Ok(TrialResult {
            rounds: self.rounds,
            total_a: self.total_a,
            total_b: self.total_b,
        })
    }

    fn after(&self, played: u32) -> MatchState {
        if played >= self.settings.rounds {
            MatchState::Completed
        } else {
            MatchState::Running { round: played }
        }
    }

    fn play_round(&mut self, round: u32) -> Result<(), MatchFault> {
        let base = u64::from(round) * STREAMS_PER_ROUND;
        let mut rng_a = self.rng.derive(base + STREAM_A);
        let mut rng_b = self.rng.derive(base + STREAM_B);

        let game = &mut self.game;
        let move_a = next_move(self.a, &mut game.queue_a, &game.own_a, &game.seen_by_a, round, &mut rng_a)
            .map_err(|fault| MatchFault { side: Side::A, trial: 0, round, fault })?;
        let move_b = next_move(self.b, &mut game.queue_b, &game.own_b, &game.seen_by_b, round, &mut rng_b)
            .map_err(|fault| MatchFault { side: Side::B, trial: 0, round, fault })?;

        let noise = &self.settings.noise;
        let seen_by_b = noise.observe(move_a, &mut self.rng.derive(base + STREAM_NOISE_A_TO_B));
        let seen_by_a = noise.observe(move_b, &mut self.rng.derive(base + STREAM_NOISE_B_TO_A));

        game.own_a.push(move_a);
        game.own_b.push(move_b);
        game.seen_by_a.push(seen_by_a);
        game.seen_by_b.push(seen_by_b);

        // Scores come from actual moves, not perceived ones
        let (score_a, score_b) = self.settings.payoff.score(move_a, move_b);
        self.total_a += score_a;
        self.total_b += score_b;

        self.rounds.push(RoundResult {
            round,
            move_a,
            move_b,
            seen_by_b,
            seen_by_a,
            score_a,
            score_b,
            cumulative_a: self.total_a,
            cumulative_b: self.total_b,
        });
        Ok(())
    }
}

/// Next move for one player: queued lookahead first, otherwise a checked `decide` call.
fn next_move<S: Decide + ?Sized>(
    strategy: &S,
    queue: &mut VecDeque<Move>,
    own: &[Move],
    seen: &[Move],
    round: u32,
    rng: &mut SeededRng,
) -> Result<Move, StrategyFault> {
    if let Some(queued) = queue.pop_front() {
        return Ok(queued);
    }
    match invoke_checked(strategy, own, seen, round, rng)? {
        Decision::Move(m) => Ok(m),
        Decision::Plan(plan) => {
            let mut plan = plan.into_iter();
            let first = plan.next().ok_or(StrategyFault::EmptyPlan)?;
            queue.extend(plan);
            Ok(first)
        }
    }
}

/// Play one trial with the given trial stream.
pub fn play_trial<A: Decide + ?Sized, B: Decide + ?Sized>(
    a: &A,
    b: &B,
    settings: &MatchSettings,
    rng: &SeededRng,
) -> Result<TrialResult, MatchFault> {
    Trial::new(a, b, settings, rng).run()
}

/// Play a full match and average over its trials.
///
/// `stream` identifies the pairing; trial `t` plays on
/// `SeededRng::new(seed, stream).derive(t)`. Any faulted trial faults the match.
pub fn play_match<A: Decide + ?Sized, B: Decide + ?Sized>(
    a: &A,
    b: &B,
    settings: &MatchSettings,
    seed: u64,
    stream: u64,
) -> Result<MatchScore, MatchFault> {
    let base = SeededRng::new(seed, stream);
    let trials = settings.noise.effective_trials().max(1);

    let mut sum_a = 0.0;
    let mut sum_b = 0.0;
    for trial in 0..trials {
        let result = play_trial(a, b, settings, &base.derive(u64::from(trial)))
            .map_err(|fault| MatchFault { trial, ..fault })?;
        sum_a += result.total_a;
        sum_b += result.total_b;
    }

    Ok(MatchScore {
        score_a: sum_a / f64::from(trials),
        score_b: sum_b / f64::from(trials),
        trials,
    })
}
