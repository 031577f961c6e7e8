//! End-to-end enrichment and synchronisation.
//!
//! One run over a catalog batch:
//!   1. Flatten nested `item` objects
//!   2. Strip the caliber prefix (optional)
//!   3. Score every record and refresh `minBuyPrice`
//!   4. Normalise the batch and assign tiers
//!   5. Synchronise into the entity store
//!
//! Enrichment is pure and in-memory; only step 5 touches the store.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use ammoscope_common::{fields, flatten_nested, AmmoRecord};
use ammoscope_db::EntityStore;
use ammoscope_ranker::{normalise_batch, score_batch, NormaliseOutcome, ScoreWeights, ScoringSummary};

use crate::clean::clean_calibers;
use crate::sync::{SyncMode, SyncReport, Synchronizer};

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub clean_caliber: bool,
    pub mode: SyncMode,
    pub weights: ScoreWeights,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            clean_caliber: true,
            mode: SyncMode::Upsert,
            weights: ScoreWeights::default(),
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentSummary {
    pub flattened: usize,
    pub calibers_cleaned: usize,
    pub scoring: ScoringSummary,
    pub normalisation: NormaliseOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub enrichment: EnrichmentSummary,
    pub report: SyncReport,
    pub duration_ms: u64,
}

// ── Stages ────────────────────────────────────────────────────────────────────

/// Steps 1 to 4, in place.
pub fn enrich_batch(records: &mut [AmmoRecord], options: &PipelineOptions) -> EnrichmentSummary {
    let flattened = records
        .iter_mut()
        .map(|r| flatten_nested(r.document_mut(), fields::NESTED_ITEM))
        .filter(|&lifted| lifted)
        .count();
    let calibers_cleaned = if options.clean_caliber { clean_calibers(records) } else { 0 };
    let scoring = score_batch(records, &options.weights);
    let normalisation = normalise_batch(records);

    EnrichmentSummary { flattened, calibers_cleaned, scoring, normalisation }
}

/// Enrich `records` and synchronise them into `store`.
///
/// Never fails as a whole: an unreachable store shows up as an error
/// status in the report, per-record problems as skips.
#[instrument(skip(records, store, options), fields(n = records.len()))]
pub async fn run_pipeline(
    mut records: Vec<AmmoRecord>,
    store: Arc<dyn EntityStore>,
    options: &PipelineOptions,
) -> PipelineResult {
    let run_id = Uuid::new_v4();
    let t0 = Instant::now();
    info!(run_id = %run_id, mode = ?options.mode, "Starting pipeline");

    let enrichment = enrich_batch(&mut records, options);
    info!(
        run_id = %run_id,
        scored       = enrichment.scoring.computed,
        pre_scored   = enrichment.scoring.already_scored,
        degraded     = enrichment.scoring.degraded,
        normalisation = ?enrichment.normalisation,
        "Batch enriched"
    );

    let report = Synchronizer::new(store)
        .with_mode(options.mode)
        .run(&records)
        .await;

    let duration_ms = t0.elapsed().as_millis() as u64;
    info!(run_id = %run_id, status = ?report.status, duration_ms, "Pipeline complete");

    PipelineResult { run_id, enrichment, report, duration_ms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ammoscope_common::Tier;
    use ammoscope_ranker::NormaliseSkip;
    use ammoscope_test_utils::fixtures::{sample_catalog, scored};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_enrich_sample_catalog() {
        let mut batch = sample_catalog();
        let summary = enrich_batch(&mut batch, &PipelineOptions::default());

        assert_eq!(summary.calibers_cleaned, batch.len());
        assert_eq!(summary.scoring.computed, batch.len());
        assert!(matches!(summary.normalisation, NormaliseOutcome::Applied(_)));
        for record in &batch {
            assert!(!record.caliber().unwrap().starts_with("Caliber"));
            assert!(record.final_score().is_some());
            assert!(record.tier().is_some());
        }
    }

    #[test]
    fn test_enrich_keeps_caliber_when_disabled() {
        let mut batch = sample_catalog();
        let options = PipelineOptions { clean_caliber: false, ..Default::default() };
        let summary = enrich_batch(&mut batch, &options);

        assert_eq!(summary.calibers_cleaned, 0);
        assert!(batch[0].caliber().unwrap().starts_with("Caliber"));
    }

    #[test]
    fn test_enrich_respects_existing_scores() {
        let mut batch = vec![scored("a", 100.0), scored("b", 50.0), scored("c", 10.0)];
        let summary = enrich_batch(&mut batch, &PipelineOptions::default());

        assert_eq!(summary.scoring.already_scored, 3);
        assert_eq!(batch[0].normalized(), Some(42.6));
        assert_eq!(batch[0].tier(), Some(Tier::C));
    }

    #[test]
    fn test_enrich_flattens_nested_items() {
        let mut batch = vec![AmmoRecord::from_value(json!({
            "item": { "id": "n", "name": "nested" }, "damage": 40
        }))
        .unwrap()];
        let summary = enrich_batch(&mut batch, &PipelineOptions::default());

        assert_eq!(summary.flattened, 1);
        assert_eq!(batch[0].id(), Some("n"));
    }

    #[test]
    fn test_enrich_empty_batch() {
        let summary = enrich_batch(&mut [], &PipelineOptions::default());
        assert_eq!(summary.normalisation, NormaliseOutcome::Skipped(NormaliseSkip::EmptyBatch));
    }
}
