//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Sum invariant: every allocation sums to 1.0
//! 2. Floor invariant: every weight is at least MIN_W
//! 3. Future uniformity: entries after the as-of index are equal
//! 4. Locking: a longer locked prefix never changes earlier weights
//! 5. Extreme boost continuity and bounded multipliers

use proptest::prelude::*;
use stacklab_core::allocation::allocate;
use stacklab_core::config::NormalizationPolicy;
use stacklab_core::signal::{dynamic_multiplier, extreme_boost, SIGNAL_CLIP};

const MIN_W: f64 = 1e-6;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Multipliers as produced by the composer: exp of a clipped signal.
fn arb_multipliers() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-SIGNAL_CLIP..SIGNAL_CLIP, 2..400)
        .prop_map(|signals| signals.into_iter().map(f64::exp).collect())
}

fn arb_policy() -> impl Strategy<Value = NormalizationPolicy> {
    prop_oneof![
        (1.0..10.0_f64).prop_map(|max_ratio| NormalizationPolicy::PrefixMean { max_ratio }),
        (1.0..10.0_f64).prop_map(|max_ratio| NormalizationPolicy::Absolute { max_ratio }),
    ]
}

/// Multipliers plus an as-of index inside (or before) the window.
fn arb_window() -> impl Strategy<Value = (Vec<f64>, Option<usize>)> {
    arb_multipliers().prop_flat_map(|m| {
        let n = m.len();
        (Just(m), prop::option::of(0..n))
    })
}

// ── 1-3. Sum, floor and future uniformity ────────────────────────────

proptest! {
    #[test]
    fn allocation_invariants_hold((m, current) in arb_window(), policy in arb_policy()) {
        let w = allocate(&m, current, MIN_W, policy).unwrap();
        prop_assert_eq!(w.len(), m.len());

        let sum: f64 = w.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6, "sum = {}", sum);

        for &x in &w {
            prop_assert!(x >= MIN_W, "weight {} below floor", x);
        }

        let future_start = current.map_or(0, |c| c + 1);
        if let Some(&first) = w[future_start..].first() {
            for &x in &w[future_start..] {
                prop_assert!((x - first).abs() <= 1e-12, "future {} vs {}", x, first);
            }
        }
    }

    #[test]
    fn large_floor_still_sums_to_one((m, current) in arb_window()) {
        let floor = 0.9 / m.len() as f64;
        let w = allocate(&m, current, floor, NormalizationPolicy::default()).unwrap();
        let sum: f64 = w.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-6);
        for &x in &w {
            prop_assert!(x >= floor * (1.0 - 1e-12));
        }
    }
}

// ── 4. Locking ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn later_as_of_never_rewrites_locked_weights(
        m in arb_multipliers(),
        a in 0.0..1.0_f64,
        b in 0.0..1.0_f64,
        policy in arb_policy(),
    ) {
        let n = m.len();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let early = ((lo * n as f64) as usize).min(n - 1);
        let late = ((hi * n as f64) as usize).min(n - 1);

        let w1 = allocate(&m, Some(early), MIN_W, policy).unwrap();
        let w2 = allocate(&m, Some(late), MIN_W, policy).unwrap();
        for i in 0..=early {
            prop_assert_eq!(w1[i].to_bits(), w2[i].to_bits(), "day {} moved", i);
        }
    }

    #[test]
    fn locked_weights_ignore_future_multipliers(
        m in arb_multipliers(),
        noise in prop::collection::vec(-SIGNAL_CLIP..SIGNAL_CLIP, 400),
        frac in 0.0..1.0_f64,
    ) {
        let n = m.len();
        let current = ((frac * n as f64) as usize).min(n - 1);
        let mut altered = m.clone();
        for (i, x) in altered.iter_mut().enumerate().skip(current + 1) {
            *x = noise[i].exp();
        }
        let policy = NormalizationPolicy::default();
        let w1 = allocate(&m, Some(current), MIN_W, policy).unwrap();
        let w2 = allocate(&altered, Some(current), MIN_W, policy).unwrap();
        prop_assert_eq!(w1, w2);
    }
}

// ── 5. Boost continuity and multiplier bounds ────────────────────────

proptest! {
    #[test]
    fn boost_has_no_jumps(z in -6.0..6.0_f64) {
        let h = 1e-9;
        let jump = (extreme_boost(z + h) - extreme_boost(z)).abs();
        // Steepest slope is the deep-value quadratic: |1.6 (z + 2)| <= 6.4 on this range.
        prop_assert!(jump < 1e-7, "jump {} at z={}", jump, z);
    }

    #[test]
    fn multiplier_stays_in_exp_bounds(c in -1e6..1e6_f64, s in 0.01..10.0_f64) {
        let m = dynamic_multiplier(c, s);
        prop_assert!(m >= (-SIGNAL_CLIP).exp() && m <= SIGNAL_CLIP.exp());
    }
}
