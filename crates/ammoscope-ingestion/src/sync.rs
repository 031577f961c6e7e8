//! Incremental synchronisation of an enriched batch into an [`EntityStore`].
//!
//! Each record is matched to its stored counterpart by `id`:
//!   - no counterpart: insert the whole record, stamped with `last_updated`
//!   - counterpart differs: send only the differing fields plus `last_updated`
//!   - counterpart identical: no write at all
//!
//! `_id` and `last_updated` never take part in the comparison, so a second
//! run over the same batch is a no-op. Per-record failures are reported as
//! skips and the run carries on; only an unreachable store fails the run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::{debug, error, info, warn};

use ammoscope_common::{fields, flatten_nested, AmmoRecord, Document};
use ammoscope_db::EntityStore;

/// Fields excluded from the stored-vs-incoming comparison.
pub const VOLATILE_FIELDS: [&str; 2] = [fields::STORE_ID, fields::LAST_UPDATED];

// ── Diffing ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub before: Value,
    pub after: Value,
}

/// Changed fields, keyed by field name.
pub type FieldDiff = BTreeMap<String, FieldChange>;

/// Numeric equality across integer and float representations. Two integers
/// compare exactly; only a float on either side widens both to `f64`.
fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    if !(x.is_f64() || y.is_f64()) {
        // One side is negative, the other above i64::MAX.
        return false;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => x == y,
    }
}

/// JSON equality where numbers compare by value, so a stored `10.0`
/// matches an incoming `10`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Fields of `incoming` whose value differs from `stored`. A field absent
/// from `stored` counts as null there. Fields only `stored` has are ignored.
pub fn diff_documents(incoming: &Document, stored: &Document) -> FieldDiff {
    incoming
        .iter()
        .filter(|(key, _)| !VOLATILE_FIELDS.contains(&key.as_str()))
        .filter_map(|(key, after)| {
            let before = stored.get(key).unwrap_or(&Value::Null);
            if values_equal(before, after) {
                None
            } else {
                Some((
                    key.clone(),
                    FieldChange { before: before.clone(), after: after.clone() },
                ))
            }
        })
        .collect()
}

// ── Planning ──────────────────────────────────────────────────────────────────

/// How existing entities are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Insert new entities, patch changed ones.
    #[default]
    Upsert,
    /// Insert new entities, leave existing ones alone (initial seeding).
    InsertOnly,
}

/// Write to perform for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangePlan {
    Insert,
    Update(FieldDiff),
    NoChange,
}

/// Decide the write for `incoming` given what the store currently holds.
pub fn plan_change(incoming: &Document, existing: Option<&Document>, mode: SyncMode) -> ChangePlan {
    let Some(stored) = existing else {
        return ChangePlan::Insert;
    };
    if mode == SyncMode::InsertOnly {
        return ChangePlan::NoChange;
    }
    let diff = diff_documents(incoming, stored);
    if diff.is_empty() {
        ChangePlan::NoChange
    } else {
        ChangePlan::Update(diff)
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingId,
    LookupFailed(String),
    WriteFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingId => write!(f, "record has no id"),
            SkipReason::LookupFailed(e) => write!(f, "lookup failed: {e}"),
            SkipReason::WriteFailed(e) => write!(f, "write failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Inserted,
    Modified(FieldDiff),
    Unchanged,
    Skipped(SkipReason),
}

/// Outcome of one record together with what identifies it in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSync {
    pub id: Option<String>,
    pub name: Option<String>,
    pub outcome: SyncOutcome,
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifiedDetail {
    pub id: String,
    pub name: Option<String>,
    pub changes: Vec<String>,
}

/// Summary of one synchronisation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub processed_count: usize,
    pub modified_count: usize,
    pub unchanged_count: usize,
    pub inserted_count: usize,
    pub skipped_count: usize,
    pub modified_details: Vec<ModifiedDetail>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Success,
            message: None,
            processed_count: 0,
            modified_count: 0,
            unchanged_count: 0,
            inserted_count: 0,
            skipped_count: 0,
            modified_details: Vec::new(),
        }
    }

    /// A run that did not get as far as touching any record.
    pub fn failed(message: impl Into<String>) -> Self {
        Self { status: RunStatus::Error, message: Some(message.into()), ..Self::new() }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Fold one record outcome into the counters.
    pub fn record(&mut self, synced: &RecordSync) {
        self.processed_count += 1;
        match &synced.outcome {
            SyncOutcome::Inserted => self.inserted_count += 1,
            SyncOutcome::Unchanged => self.unchanged_count += 1,
            SyncOutcome::Skipped(_) => self.skipped_count += 1,
            SyncOutcome::Modified(diff) => {
                self.modified_count += 1;
                self.modified_details.push(ModifiedDetail {
                    id: synced.id.clone().unwrap_or_default(),
                    name: synced.name.clone(),
                    changes: diff.keys().cloned().collect(),
                });
            }
        }
    }
}

impl Default for SyncReport {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> FromIterator<&'a RecordSync> for SyncReport {
    fn from_iter<I: IntoIterator<Item = &'a RecordSync>>(iter: I) -> Self {
        let mut report = SyncReport::new();
        for synced in iter {
            report.record(synced);
        }
        report
    }
}

// ── Synchronizer ──────────────────────────────────────────────────────────────

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Synchronizer {
    store: Arc<dyn EntityStore>,
    mode: SyncMode,
    clock: Clock,
}

impl Synchronizer {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store, mode: SyncMode::default(), clock: Arc::new(Utc::now) }
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the wall clock used for `last_updated`.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    fn timestamp(&self) -> Value {
        Value::String((self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Synchronise a single record. Never fails; problems become skips.
    pub async fn sync_record(&self, record: &AmmoRecord) -> RecordSync {
        let mut doc = record.document().clone();
        flatten_nested(&mut doc, fields::NESTED_ITEM);

        let id = match doc.get(fields::ID) {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            _ => None,
        };
        let name = doc.get(fields::NAME).and_then(Value::as_str).map(str::to_string);
        let outcome = match &id {
            Some(id) => self.apply(id, doc).await,
            None => {
                warn!(name = name.as_deref().unwrap_or("?"), "Skipping record without id");
                SyncOutcome::Skipped(SkipReason::MissingId)
            }
        };

        RecordSync { id, name, outcome }
    }

    async fn apply(&self, id: &str, mut doc: Document) -> SyncOutcome {
        let existing = match self.store.find_one(id).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(id, error = %e, "Lookup failed, skipping record");
                return SyncOutcome::Skipped(SkipReason::LookupFailed(e.to_string()));
            }
        };

        match plan_change(&doc, existing.as_ref(), self.mode) {
            ChangePlan::NoChange => {
                debug!(id, "Unchanged");
                SyncOutcome::Unchanged
            }
            ChangePlan::Insert => {
                doc.insert(fields::LAST_UPDATED.to_string(), self.timestamp());
                match self.store.insert_one(&doc).await {
                    Ok(()) => {
                        debug!(id, "Inserted");
                        SyncOutcome::Inserted
                    }
                    Err(e) => {
                        warn!(id, error = %e, "Insert failed, skipping record");
                        SyncOutcome::Skipped(SkipReason::WriteFailed(e.to_string()))
                    }
                }
            }
            ChangePlan::Update(diff) => {
                let mut patch: Document = diff
                    .iter()
                    .map(|(key, change)| (key.clone(), change.after.clone()))
                    .collect();
                patch.insert(fields::LAST_UPDATED.to_string(), self.timestamp());

                match self.store.update_one(id, &patch).await {
                    Ok(true) => {
                        for (field, change) in &diff {
                            debug!(id, field = %field, before = %change.before, after = %change.after, "Field changed");
                        }
                        info!(id, n_fields = diff.len(), "Modified");
                        SyncOutcome::Modified(diff)
                    }
                    Ok(false) => {
                        warn!(id, "Entity disappeared before update, skipping record");
                        SyncOutcome::Skipped(SkipReason::WriteFailed("no entity matched".to_string()))
                    }
                    Err(e) => {
                        warn!(id, error = %e, "Update failed, skipping record");
                        SyncOutcome::Skipped(SkipReason::WriteFailed(e.to_string()))
                    }
                }
            }
        }
    }

    /// Synchronise a whole batch. The store is pinged first; if it cannot be
    /// reached no record is touched and the report carries the error.
    pub async fn run(&self, batch: &[AmmoRecord]) -> SyncReport {
        if let Err(e) = self.store.ping().await {
            error!(error = %e, "Store unreachable, aborting synchronisation");
            return SyncReport::failed(format!("store unreachable: {e}"));
        }

        info!(n = batch.len(), mode = ?self.mode, "Synchronising batch");
        let mut report = SyncReport::new();
        for record in batch {
            let synced = self.sync_record(record).await;
            report.record(&synced);
        }

        info!(
            processed = report.processed_count,
            inserted  = report.inserted_count,
            modified  = report.modified_count,
            unchanged = report.unchanged_count,
            skipped   = report.skipped_count,
            "Synchronisation complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ammoscope_db::MemoryStore;
    use ammoscope_test_utils::fixtures::RecordBuilder;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(values_equal(&json!(10), &json!(10.0)));
        assert!(values_equal(&json!({ "a": [1, 2.0] }), &json!({ "a": [1.0, 2] })));
        assert!(!values_equal(&json!(10), &json!("10")));
        assert!(!values_equal(&json!({ "a": 1 }), &json!({ "a": 1, "b": 2 })));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        // Both round to the same f64.
        assert!(!values_equal(&json!(9_007_199_254_740_993_i64), &json!(9_007_199_254_740_992_i64)));
        assert!(!values_equal(&json!(u64::MAX), &json!(u64::MAX - 1)));
        assert!(!values_equal(&json!(-1), &json!(u64::MAX)));
        assert!(values_equal(&json!(9_007_199_254_740_993_i64), &json!(9_007_199_254_740_993_u64)));
        assert!(values_equal(&json!(9_007_199_254_740_992_i64), &json!(9_007_199_254_740_992.0)));

        let diff = diff_documents(
            &doc(json!({ "id": "x", "serial": 9_007_199_254_740_993_i64 })),
            &doc(json!({ "id": "x", "serial": 9_007_199_254_740_992_i64 })),
        );
        assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["serial"]);
    }

    #[test]
    fn test_diff_ignores_volatile_fields() {
        let incoming = doc(json!({ "id": "x", "finalScore": 10, "_id": 99, "last_updated": "now" }));
        let stored = doc(json!({ "id": "x", "finalScore": 5, "_id": 1, "last_updated": "then" }));

        let diff = diff_documents(&incoming, &stored);
        assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["finalScore"]);
        assert_eq!(diff["finalScore"], FieldChange { before: json!(5), after: json!(10) });
    }

    #[test]
    fn test_diff_new_field_has_null_before() {
        let diff = diff_documents(&doc(json!({ "tier": "A" })), &doc(json!({})));
        assert_eq!(diff["tier"].before, Value::Null);
    }

    #[test]
    fn test_plan_change() {
        let incoming = doc(json!({ "id": "x", "finalScore": 10 }));
        let same = doc(json!({ "id": "x", "finalScore": 10.0, "_id": 3 }));
        let older = doc(json!({ "id": "x", "finalScore": 5 }));

        assert_eq!(plan_change(&incoming, None, SyncMode::Upsert), ChangePlan::Insert);
        assert_eq!(plan_change(&incoming, Some(&same), SyncMode::Upsert), ChangePlan::NoChange);
        assert!(matches!(plan_change(&incoming, Some(&older), SyncMode::Upsert), ChangePlan::Update(_)));
        assert_eq!(plan_change(&incoming, Some(&older), SyncMode::InsertOnly), ChangePlan::NoChange);
        assert_eq!(plan_change(&incoming, None, SyncMode::InsertOnly), ChangePlan::Insert);
    }

    #[test]
    fn test_report_counters() {
        let mut diff = FieldDiff::new();
        diff.insert("finalScore".into(), FieldChange { before: json!(5), after: json!(10) });
        let outcomes = vec![
            RecordSync { id: Some("a".into()), name: None, outcome: SyncOutcome::Inserted },
            RecordSync { id: Some("b".into()), name: Some("Foo".into()), outcome: SyncOutcome::Modified(diff) },
            RecordSync { id: Some("c".into()), name: None, outcome: SyncOutcome::Unchanged },
            RecordSync { id: None, name: None, outcome: SyncOutcome::Skipped(SkipReason::MissingId) },
        ];

        let report: SyncReport = outcomes.iter().collect();
        assert_eq!(report.processed_count, 4);
        assert_eq!(report.inserted_count, 1);
        assert_eq!(report.modified_count, 1);
        assert_eq!(report.unchanged_count, 1);
        assert_eq!(report.skipped_count, 1);
        assert_eq!(
            report.modified_details,
            vec![ModifiedDetail { id: "b".into(), name: Some("Foo".into()), changes: vec!["finalScore".into()] }]
        );
    }

    #[test]
    fn test_report_serialises_snake_case() {
        let value = serde_json::to_value(SyncReport::failed("down")).unwrap();
        assert_eq!(value["status"], json!("error"));
        assert_eq!(value["message"], json!("down"));
        assert_eq!(value["processed_count"], json!(0));

        let ok = serde_json::to_value(SyncReport::new()).unwrap();
        assert_eq!(ok["status"], json!("success"));
        assert!(ok.get("message").is_none());
    }

    #[tokio::test]
    async fn test_insert_stamps_last_updated() {
        let store = Arc::new(MemoryStore::new());
        let sync = Synchronizer::new(store.clone()).with_clock(fixed_clock);

        let synced = sync.sync_record(&RecordBuilder::new("x").name("Foo").build()).await;
        assert_eq!(synced.outcome, SyncOutcome::Inserted);

        let stored = store.get("x").await.unwrap();
        assert_eq!(stored.get("last_updated"), Some(&json!("2025-03-01T12:00:00.000Z")));
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_one(&doc(json!({ "id": "x", "name": "Foo", "finalScore": 5, "extra": true })))
            .await
            .unwrap();
        let sync = Synchronizer::new(store.clone()).with_clock(fixed_clock);

        let record = RecordBuilder::new("x").name("Foo").final_score(10.0).build();
        let synced = sync.sync_record(&record).await;

        let SyncOutcome::Modified(diff) = synced.outcome else {
            panic!("expected a modification, got {:?}", synced.outcome);
        };
        assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["finalScore"]);
        assert_eq!(
            store.get("x").await.unwrap(),
            doc(json!({
                "id": "x", "name": "Foo", "finalScore": 10.0, "extra": true,
                "last_updated": "2025-03-01T12:00:00.000Z"
            }))
        );
    }

    #[tokio::test]
    async fn test_nested_item_is_flattened_before_lookup() {
        let store = Arc::new(MemoryStore::new());
        let sync = Synchronizer::new(store.clone());

        let record = AmmoRecord::from_value(json!({
            "ammoType": "buckshot",
            "item": { "id": "nested", "name": "12/70 7mm buckshot" }
        }))
        .unwrap();
        let synced = sync.sync_record(&record).await;

        assert_eq!(synced.id.as_deref(), Some("nested"));
        assert_eq!(synced.name.as_deref(), Some("12/70 7mm buckshot"));
        assert_eq!(synced.outcome, SyncOutcome::Inserted);
        assert!(store.get("nested").await.unwrap().get("item").is_none());
    }

    #[tokio::test]
    async fn test_insert_only_leaves_existing_untouched() {
        let store = Arc::new(MemoryStore::new());
        store.insert_one(&doc(json!({ "id": "x", "finalScore": 5 }))).await.unwrap();
        let sync = Synchronizer::new(store.clone()).with_mode(SyncMode::InsertOnly);

        let report = sync
            .run(&[RecordBuilder::new("x").final_score(10.0).build(), RecordBuilder::new("y").build()])
            .await;

        assert_eq!(report.unchanged_count, 1);
        assert_eq!(report.inserted_count, 1);
        assert_eq!(store.get("x").await.unwrap().get("finalScore"), Some(&json!(5)));
    }
}
