//! Round-robin pairing enumeration
//!
//! Pairs are ranked in colexicographic order: `rank = C(j,2) + i` for `i < j`.
//! The rank doubles as the pairing's RNG stream id, so a pairing's match is
//! fully determined by the base seed and the two participant indices.

/// Number of pairings in a full round-robin of `n` participants.
pub fn calculate_match_count(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    n * (n - 1) / 2
}

/// Every unordered pair `(i, j)` with `i < j < n`, in rank order.
pub fn generate_round_robin_pairings(n: usize) -> Vec<(usize, usize)> {
    (0..calculate_match_count(n) as u64)
        .map(pairing_for_index)
        .collect()
}

/// Rank of the pair `(i, j)`; arguments may come in either order.
pub fn pairing_rank(i: usize, j: usize) -> u64 {
    let (a, b) = if i < j { (i, j) } else { (j, i) };
    let (a, b) = (a as u64, b as u64);
    b * b.saturating_sub(1) / 2 + a
}

/// Colexicographic combination unranking: rank → (a, b) with a < b.
pub fn pairing_for_index(rank: u64) -> (usize, usize) {
    // Estimate b via integer floor(sqrt(1 + 8·rank))
    let val = 1u128 + 8 * u128::from(rank);
    let mut s = val;
    let mut t = (s + 1) / 2;
    while t < s {
        s = t;
        t = (s + val / s) / 2;
    }
    let mut b = ((1 + s) / 2) as u64;

    // Correct estimate
    while b > 0 && b * (b - 1) / 2 > rank {
        b -= 1;
    }
    while (b + 1) * b / 2 <= rank {
        b += 1;
    }

    let a = rank - b * (b - 1) / 2;
    (a as usize, b as usize)
}
