//! Perception noise
//!
//! With noise on, each player sees the other's actual move flipped with
//! probability `level`. Noisy matches are repeated for `trials` independent
//! trials and averaged.

use serde::{Deserialize, Serialize};

use crate::random::SeededRng;
use crate::strategy::Move;

/// Noise settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub enabled: bool,
    /// Per-move flip probability in `[0, 1]`
    pub level: f64,
    /// Trials per match when enabled
    pub trials: u32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: 0.1,
            trials: 50,
        }
    }
}

impl NoiseConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_level(level: f64, trials: u32) -> Self {
        Self { enabled: true, level, trials }
    }

    /// Number of trials a match runs: `trials` with noise on, otherwise 1.
    pub fn effective_trials(&self) -> u32 {
        if self.enabled {
            self.trials
        } else {
            1
        }
    }

    /// What the observer sees of `actual`.
    ///
    /// Draws from `rng` only when noise is enabled.
    pub fn observe(&self, actual: Move, rng: &mut SeededRng) -> Move {
        if self.enabled {
            perceive(actual, self.level, rng)
        } else {
            actual
        }
    }
}

/// Flip `actual` with probability `level`; consumes exactly one draw.
pub fn perceive(actual: Move, level: f64, rng: &mut SeededRng) -> Move {
    if rng.chance(level) {
        actual.flipped()
    } else {
        actual
    }
}
