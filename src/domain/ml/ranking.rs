//! Conversion of continuous model scores into finishing positions.
//!
//! The regressor predicts a real-valued finishing position per driver. Those
//! scores collide and rarely land on integers, so positions are assigned by
//! ranking: the lowest score finishes first. Confidence measures how far each
//! score sits from the position it was given, relative to the worst offender
//! in the same race.

/// Floor for the spread divisor, so identical spreads of zero never divide by zero.
pub const MIN_MAX_SPREAD: f64 = 1.0;

/// Assigns positions 1..=N by ascending score.
///
/// The sort is stable: equal scores keep their input order, so the mapping is
/// a deterministic bijection onto {1..N}.
pub fn rank_to_positions(scores: &[f64]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positions = vec![0u32; scores.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        positions[idx] = rank as u32 + 1;
    }
    positions
}

/// `1 - |score - position| / max(max_spread, 1.0)`, rounded to 4 decimals.
pub fn compute_confidences(scores: &[f64], positions: &[u32]) -> Vec<f64> {
    let spreads: Vec<f64> = scores
        .iter()
        .zip(positions)
        .map(|(score, pos)| (score - f64::from(*pos)).abs())
        .collect();

    let max_spread = spreads.iter().copied().fold(MIN_MAX_SPREAD, f64::max);

    spreads
        .iter()
        .map(|spread| round_to(1.0 - spread / max_spread, 4))
        .collect()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
