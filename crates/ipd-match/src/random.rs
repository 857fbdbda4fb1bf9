//! Seeded pseudo-random number generator
//!
//! Deterministic PRNG for reproducible match execution.
//! Uses a simple but effective xorshift algorithm.
//!
//! Streams are derived from a base seed plus the identity of whatever is
//! being played (pairing, trial, round, purpose), so a draw never depends on
//! which worker thread runs it.

/// Fallback state; xorshift never leaves an all-zero state.
const NONZERO_STATE: u64 = 0x9e3779b97f4a7c15;

/// Seeded random number generator
///
/// Deterministic: same seed + stream = same sequence
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a new RNG from a base seed and a stream index
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut state = seed ^ 0x6a09e667f3bcc908;
        state ^= stream.wrapping_mul(0x517cc1b727220a95);

        // Warm up the generator
        let mut rng = Self::from_state(state);
        for _ in 0..8 {
            rng.next_u64();
        }

        rng
    }

    /// Create an independent child stream (a trial, a round, a player)
    pub fn derive(&self, index: u64) -> Self {
        let mut new_state = self.state;
        new_state ^= index.wrapping_add(1).wrapping_mul(NONZERO_STATE);

        let mut rng = Self::from_state(new_state);
        rng.next_u64(); // Mix
        rng
    }

    fn from_state(state: u64) -> Self {
        Self {
            state: if state == 0 { NONZERO_STATE } else { state },
        }
    }

    /// Generate next u64
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545f4914f6cdd1d)
    }

    /// Generate next u32
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a value 0-99 (for percentage checks)
    pub fn next_percent(&mut self) -> u8 {
        (self.next_u32() % 100) as u8
    }

    /// Uniform float in [0, 1) built from the top 53 bits
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Bernoulli draw: `true` with probability `p`.
    ///
    /// Always consumes exactly one draw, even for `p <= 0.0`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
