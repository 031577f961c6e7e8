//! ammoscope-ingestion: Catalog loading, enrichment and store synchronisation.
//! - Catalog parsing (bare array, `ammo` object, GraphQL envelope)
//! - Caliber clean-up
//! - Enrichment: scoring, normalisation, tiers
//! - Diff-based incremental sync with a per-run change report
//! - Ranking table

pub mod catalog;
pub mod clean;
pub mod pipeline;
pub mod sync;
pub mod table;

pub use catalog::{load_catalog, parse_catalog};
pub use pipeline::{enrich_batch, run_pipeline, EnrichmentSummary, PipelineOptions, PipelineResult};
pub use sync::{
    diff_documents, plan_change, values_equal, ChangePlan, FieldChange, FieldDiff, ModifiedDetail,
    RecordSync, RunStatus, SkipReason, SyncMode, SyncOutcome, SyncReport, Synchronizer,
};
pub use table::{ranking_rows, render_table, RankingRow};
