//! Signal confidence: how strongly the valuation and price signals agree.
//!
//! Each input is oriented so that a positive value means "cheap":
//! `-z`, `0.5 - percentile`, `-price_vs_ma`. Agreement is the absolute sum of
//! their signs over 3; alignment checks that the valuation gradient points the
//! same way as the consensus (a falling valuation confirms "cheap").

const AGREEMENT_WEIGHT: f64 = 0.7;
const ALIGNMENT_WEIGHT: f64 = 0.3;

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Agreement score in [0, 1].
pub fn signal_confidence(zscore: f64, percentile: f64, price_vs_ma: f64, gradient: f64) -> f64 {
    let votes = sign(-zscore) + sign(0.5 - percentile) + sign(-price_vs_ma);
    let agreement = votes.abs() / 3.0;

    let direction = sign(-gradient);
    let consensus = sign(votes);
    let alignment = if direction == 0.0 || consensus == 0.0 {
        0.5
    } else if direction == consensus {
        1.0
    } else {
        0.0
    };

    AGREEMENT_WEIGHT * agreement + ALIGNMENT_WEIGHT * alignment
}
