//! Batch normalisation against an outlier-fenced ceiling.
//!
//! ceiling = Q3 + 1.5 × (Q3 − Q1), taken over every `finalScore` in the batch.
//! Scores above the fence normalise past 100 instead of compressing the rest.

use serde::Serialize;
use tracing::{info, warn};

use ammoscope_common::{AmmoRecord, Tier};

/// Tukey fence multiplier.
pub const FENCE_FACTOR: f64 = 1.5;

/// Quartile of an ascending slice using the (n+1)p plotting position,
/// interpolated linearly and clamped to the sample extremes.
/// `p` is a fraction in [0, 1]. Returns NaN for an empty slice.
pub fn quartile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let h = (n as f64 + 1.0) * p;
    if h <= 1.0 {
        return sorted[0];
    }
    if h >= n as f64 {
        return sorted[n - 1];
    }
    let lo = h.floor() as usize; // 1-based rank below h
    let frac = h - lo as f64;
    sorted[lo - 1] + frac * (sorted[lo] - sorted[lo - 1])
}

/// The normalisation denominator and the statistics it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ceiling {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub value: f64,
}

/// None for an empty batch.
pub fn outlier_ceiling(scores: &[f64]) -> Option<Ceiling> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quartile(&sorted, 0.25);
    let q3 = quartile(&sorted, 0.75);
    let iqr = q3 - q1;
    Some(Ceiling { q1, q3, iqr, value: q3 + FENCE_FACTOR * iqr })
}

/// Percentage of the ceiling, rounded to one decimal, uncapped.
pub fn normalise_score(score: f64, ceiling: f64) -> f64 {
    (score / ceiling * 100.0 * 10.0).round() / 10.0
}

/// Why a batch was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormaliseSkip {
    EmptyBatch,
    DegenerateCeiling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NormaliseOutcome {
    Applied(Ceiling),
    Skipped(NormaliseSkip),
}

/// Annotate every record with `normalized` and `tier` from one shared ceiling.
/// Records without a numeric `finalScore` count as 0.
pub fn normalise_batch(records: &mut [AmmoRecord]) -> NormaliseOutcome {
    let scores: Vec<f64> = records
        .iter()
        .map(|r| r.final_score().unwrap_or(0.0))
        .collect();

    let Some(ceiling) = outlier_ceiling(&scores) else {
        warn!("Empty batch, normalisation skipped");
        return NormaliseOutcome::Skipped(NormaliseSkip::EmptyBatch);
    };

    if ceiling.value == 0.0 || !ceiling.value.is_finite() {
        warn!(ceiling = ceiling.value, "Degenerate ceiling, normalisation skipped");
        return NormaliseOutcome::Skipped(NormaliseSkip::DegenerateCeiling);
    }

    info!(
        q1 = ceiling.q1,
        q3 = ceiling.q3,
        ceiling = ceiling.value,
        n = records.len(),
        "Normalising scores"
    );

    for (record, score) in records.iter_mut().zip(scores) {
        let normalized = normalise_score(score, ceiling.value);
        record.set_normalization(normalized, Tier::from_normalized(normalized));
    }

    NormaliseOutcome::Applied(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ammoscope_test_utils::fixtures::scored;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quartiles_three_values() {
        let sorted = [10.0, 50.0, 100.0];
        assert_eq!(quartile(&sorted, 0.25), 10.0);
        assert_eq!(quartile(&sorted, 0.75), 100.0);
    }

    #[test]
    fn test_quartiles_interpolate() {
        // h = 2.25 and 6.75 for n = 8
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        assert!((quartile(&sorted, 0.25) - 2.25).abs() < 1e-12);
        assert!((quartile(&sorted, 0.75) - 6.75).abs() < 1e-12);
    }

    #[test]
    fn test_quartile_single_value() {
        assert_eq!(quartile(&[42.0], 0.25), 42.0);
        assert_eq!(quartile(&[42.0], 0.75), 42.0);
        assert!(quartile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_ceiling_ignores_input_order() {
        let c = outlier_ceiling(&[100.0, 50.0, 10.0]).unwrap();
        assert_eq!(c, Ceiling { q1: 10.0, q3: 100.0, iqr: 90.0, value: 235.0 });
        assert_eq!(outlier_ceiling(&[]), None);
    }

    #[test]
    fn test_three_record_batch() {
        let mut batch = vec![scored("a", 100.0), scored("b", 50.0), scored("c", 10.0)];
        let outcome = normalise_batch(&mut batch);
        assert!(matches!(outcome, NormaliseOutcome::Applied(c) if c.value == 235.0));

        let normalized: Vec<f64> = batch.iter().filter_map(|r| r.normalized()).collect();
        assert_eq!(normalized, vec![42.6, 21.3, 4.3]);
        let tiers: Vec<Tier> = batch.iter().filter_map(|r| r.tier()).collect();
        assert_eq!(tiers, vec![Tier::C, Tier::D, Tier::D]);
    }

    #[test]
    fn test_one_score_moves_every_normalized_value() {
        let mut before = vec![scored("a", 100.0), scored("b", 50.0), scored("c", 10.0), scored("d", 70.0)];
        let mut after = vec![scored("a", 100.0), scored("b", 50.0), scored("c", 30.0), scored("d", 70.0)];
        normalise_batch(&mut before);
        normalise_batch(&mut after);
        assert_ne!(before[0].normalized(), after[0].normalized());
        assert_ne!(before[1].normalized(), after[1].normalized());
    }

    #[test]
    fn test_outlier_exceeds_hundred_without_cap() {
        let mut batch: Vec<_> = [40.0, 42.0, 44.0, 46.0, 48.0, 50.0, 52.0, 400.0]
            .iter()
            .enumerate()
            .map(|(i, s)| scored(&format!("r{i}"), *s))
            .collect();
        normalise_batch(&mut batch);
        let top = batch[7].normalized().unwrap();
        assert!(top > 100.0, "outlier normalised to {top}");
        assert_eq!(batch[7].tier(), Some(Tier::SPlus));
        // the bulk is not squashed towards zero
        assert!(batch[6].normalized().unwrap() > 50.0);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut batch: Vec<AmmoRecord> = Vec::new();
        assert_eq!(normalise_batch(&mut batch), NormaliseOutcome::Skipped(NormaliseSkip::EmptyBatch));
    }

    #[test]
    fn test_zero_ceiling_leaves_batch_unchanged() {
        let mut batch = vec![scored("a", 0.0), scored("b", 0.0)];
        let snapshot = batch.clone();
        assert_eq!(
            normalise_batch(&mut batch),
            NormaliseOutcome::Skipped(NormaliseSkip::DegenerateCeiling)
        );
        assert_eq!(batch, snapshot);
    }
}
