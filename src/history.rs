//! Result history and the record-pool collaborators.
//!
//! The [`HistoryStore`] is the only state shared across games. Games never
//! touch it directly; they hand a finished [`TestResult`] to `add_result`,
//! which annotates it (personal best, percentile) against the store and the
//! shared population *before* insertion, then forwards a copy to the record
//! pool.
//!
//! Consistency model: local state is authoritative for the session. The
//! remote forward on insert is fire-and-forget; delete and clear propagate a
//! remote failure to the caller, but the local mutation stands either way.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::grading::{compare_scores, is_new_personal_best};
use crate::percentile::{percentile_among, DEFAULT_PERCENTILE};
use crate::result::{MetricKey, TestKind, TestResult};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("record store i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("record store payload: {0}")]
    Codec(String),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("remote delete failed (local copy already removed): {0}")]
    RemoteDelete(#[source] SyncError),
    #[error("remote clear failed (local history already cleared): {0}")]
    RemoteClear(#[source] SyncError),
}

/// The metric payload shared with the record pool. Mirrors the optional
/// metric fields of [`TestResult`] without the session-local annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_clicks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slowest_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl ScoreBag {
    pub fn from_result(result: &TestResult) -> Self {
        Self {
            average_time: result.average_time,
            total_clicks: result.total_clicks,
            fastest_time: result.fastest_time,
            slowest_time: result.slowest_time,
            accuracy: result.accuracy,
            score: result.score,
        }
    }

    pub fn metric(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::AverageTime => self.average_time,
            MetricKey::TotalClicks => self.total_clicks.map(f64::from),
            MetricKey::Accuracy => self.accuracy,
            MetricKey::Score => self.score.map(f64::from),
        }
    }
}

/// One contribution to the shared population pool, authenticated (`owner`
/// present) or anonymous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "type")]
    pub kind: TestKind,
    pub score: ScoreBag,
    pub created_ms: u64,
}

/// Key-value persistence for the local history: full read on load, full
/// overwrite on every mutation.
pub trait HistoryPersistence {
    fn load(&mut self) -> std::io::Result<Vec<TestResult>>;
    fn save(&mut self, results: &[TestResult]) -> std::io::Result<()>;
}

/// The remote population/record collaborator. Every operation may fail; the
/// store decides per-operation whether that failure is surfaced.
pub trait RecordSync {
    fn insert(&mut self, record: PopulationRecord) -> Result<(), SyncError>;
    /// All population values for `(kind, key)`, unordered.
    fn scores(&self, kind: TestKind, key: MetricKey) -> Result<Vec<f64>, SyncError>;
    fn delete(&mut self, id: &str) -> Result<(), SyncError>;
    /// Bulk-delete every record owned by `owner`.
    fn clear(&mut self, owner: &str) -> Result<(), SyncError>;
    /// All records contributed by `owner`, newest first.
    fn records_for_owner(&self, owner: &str) -> Result<Vec<PopulationRecord>, SyncError>;
}

/// Session-owned result history, newest first by insertion.
pub struct HistoryStore<P, S> {
    results: Vec<TestResult>,
    persistence: P,
    sync: S,
}

impl<P: HistoryPersistence, S: RecordSync> HistoryStore<P, S> {
    /// Load whatever the persistence adapter has; a failed load starts empty
    /// (logged, not fatal).
    pub fn open(mut persistence: P, sync: S) -> Self {
        let results = match persistence.load() {
            Ok(results) => results,
            Err(e) => {
                warn!("history load failed, starting empty: {e}");
                Vec::new()
            }
        };
        Self {
            results,
            persistence,
            sync,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Newest first, all kinds.
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Annotate, prepend, persist, and forward one finished result.
    ///
    /// Annotation reads the store as it was *before* insertion. The remote
    /// forward is fire-and-forget: local insertion succeeds even when the
    /// pool is unreachable.
    pub fn add_result(&mut self, mut result: TestResult, owner: Option<&str>) -> &TestResult {
        result.is_personal_best = is_new_personal_best(&result, self.best_result(result.kind));

        let key = result.kind.key_metric();
        result.percentile = result.metric(key).map(|value| {
            match self.sync.scores(result.kind, key) {
                Ok(scores) => percentile_among(&scores, value, key.direction()),
                Err(e) => {
                    warn!("population fetch failed, assuming median: {e}");
                    DEFAULT_PERCENTILE
                }
            }
        });

        let record = PopulationRecord {
            id: result.id.clone(),
            owner: owner.map(str::to_owned),
            kind: result.kind,
            score: ScoreBag::from_result(&result),
            created_ms: result.timestamp,
        };

        self.results.insert(0, result);
        self.persist();

        if let Err(e) = self.sync.insert(record) {
            warn!("record upload failed (kept locally): {e}");
        }

        &self.results[0]
    }

    /// Remove one result by id. Unknown ids are a no-op. A remote failure is
    /// reported to the caller, but the local removal is not rolled back.
    pub fn delete_result(&mut self, id: &str) -> Result<(), HistoryError> {
        self.results.retain(|r| r.id != id);
        self.persist();
        self.sync.delete(id).map_err(HistoryError::RemoteDelete)
    }

    /// Empty the local history; with an owner, also bulk-delete that owner's
    /// remote records. Remote failure propagates, local clear stands.
    pub fn clear_history(&mut self, owner: Option<&str>) -> Result<(), HistoryError> {
        self.results.clear();
        self.persist();
        match owner {
            Some(owner) => self.sync.clear(owner).map_err(HistoryError::RemoteClear),
            None => Ok(()),
        }
    }

    /// All results of `kind`, best first. Ties keep insertion order.
    pub fn results_by_kind(&self, kind: TestKind) -> Vec<TestResult> {
        let mut matching: Vec<TestResult> = self
            .results
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect();
        // Stable sort: equal-ranked entries stay in stored (insertion) order.
        matching.sort_by(|a, b| {
            compare_scores(b, a)
                .partial_cmp(&0.0)
                .unwrap_or(core::cmp::Ordering::Equal)
        });
        matching
    }

    /// The current best of `kind`, if any.
    pub fn best_result(&self, kind: TestKind) -> Option<&TestResult> {
        let mut best: Option<&TestResult> = None;
        for r in self.results.iter().filter(|r| r.kind == kind) {
            match best {
                // Strictly-better replaces; ties keep the earlier (newer) entry.
                Some(current) if compare_scores(r, current) <= 0.0 => {}
                _ => best = Some(r),
            }
        }
        best
    }

    pub fn sync(&self) -> &S {
        &self.sync
    }

    fn persist(&mut self) {
        if let Err(e) = self.persistence.save(&self.results) {
            warn!("history save failed: {e}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// In-memory adapters: the test substrate, and the base the file-backed
// daemon adapters build on.
// ─────────────────────────────────────────────────────────────────────────

/// Volatile persistence; what you save is what you load.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    saved: Vec<TestResult>,
}

impl HistoryPersistence for MemoryHistory {
    fn load(&mut self) -> std::io::Result<Vec<TestResult>> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, results: &[TestResult]) -> std::io::Result<()> {
        self.saved = results.to_vec();
        Ok(())
    }
}

/// In-memory record pool grouped by kind.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemoryRecordStore {
    by_kind: HashMap<TestKind, Vec<PopulationRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }
}

impl RecordSync for MemoryRecordStore {
    fn insert(&mut self, record: PopulationRecord) -> Result<(), SyncError> {
        self.by_kind.entry(record.kind).or_default().insert(0, record);
        Ok(())
    }

    fn scores(&self, kind: TestKind, key: MetricKey) -> Result<Vec<f64>, SyncError> {
        Ok(self
            .by_kind
            .get(&kind)
            .map(|records| records.iter().filter_map(|r| r.score.metric(key)).collect())
            .unwrap_or_default())
    }

    fn delete(&mut self, id: &str) -> Result<(), SyncError> {
        for records in self.by_kind.values_mut() {
            records.retain(|r| r.id != id);
        }
        Ok(())
    }

    fn clear(&mut self, owner: &str) -> Result<(), SyncError> {
        for records in self.by_kind.values_mut() {
            records.retain(|r| r.owner.as_deref() != Some(owner));
        }
        Ok(())
    }

    fn records_for_owner(&self, owner: &str) -> Result<Vec<PopulationRecord>, SyncError> {
        let mut records: Vec<PopulationRecord> = self
            .by_kind
            .values()
            .flatten()
            .filter(|r| r.owner.as_deref() == Some(owner))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_ms.cmp(&a.created_ms));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HistoryStore<MemoryHistory, MemoryRecordStore> {
        HistoryStore::open(MemoryHistory::default(), MemoryRecordStore::new())
    }

    fn color_result(id: &str, avg: f64) -> TestResult {
        let mut r = TestResult::new(id.into(), TestKind::ColorChange, 1);
        r.average_time = Some(avg);
        r.total_clicks = Some(5);
        r.fastest_time = Some(avg - 40.0);
        r.slowest_time = Some(avg + 40.0);
        r
    }

    #[test]
    fn first_result_is_personal_best_and_best_result() {
        let mut store = store();
        store.add_result(color_result("a", 250.0), None);

        let best = store.best_result(TestKind::ColorChange).unwrap();
        assert_eq!(best.id, "a");
        assert!(best.is_personal_best);
        // Fresh pool at annotation time: no population existed yet.
        assert_eq!(best.percentile, Some(DEFAULT_PERCENTILE));
    }

    #[test]
    fn annotation_uses_state_before_insertion() {
        let mut store = store();
        store.add_result(color_result("slow", 400.0), None);
        store.add_result(color_result("fast", 200.0), None);
        store.add_result(color_result("mid", 300.0), None);

        let results = store.results();
        // Newest first by insertion.
        assert_eq!(results[0].id, "mid");
        assert!(!results[0].is_personal_best);
        assert_eq!(results[1].id, "fast");
        assert!(results[1].is_personal_best);
        // "mid" beat 1 of the 2 pooled records -> 50%.
        assert_eq!(results[0].percentile, Some(50.0));
    }

    #[test]
    fn results_by_kind_sorts_best_first_and_is_stable() {
        let mut store = store();
        store.add_result(color_result("a", 300.0), None);
        store.add_result(color_result("b", 200.0), None);
        store.add_result(color_result("c", 300.0), None);
        let mut seq = TestResult::new("d".into(), TestKind::SequenceMemory, 1);
        seq.score = Some(4);
        store.add_result(seq, None);

        let ranked = store.results_by_kind(TestKind::ColorChange);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].id, "b");
        // Tied 300s keep stored order: "c" was inserted later, so it sits
        // above "a" in the newest-first store and stays there.
        assert_eq!(ranked[1].id, "c");
        assert_eq!(ranked[2].id, "a");
    }

    #[test]
    fn delete_removes_everywhere_and_ignores_unknown_ids() {
        let mut store = store();
        store.add_result(color_result("a", 250.0), Some("user-1"));
        assert_eq!(store.sync().record_count(), 1);

        store.delete_result("a").unwrap();
        assert!(store.results_by_kind(TestKind::ColorChange).is_empty());
        assert_eq!(store.sync().record_count(), 0);

        // Unknown id: no panic, no error from the local side.
        store.delete_result("nope").unwrap();
    }

    #[test]
    fn clear_scopes_remote_deletion_to_the_owner() {
        let mut store = store();
        store.add_result(color_result("mine", 250.0), Some("user-1"));
        store.add_result(color_result("theirs", 260.0), Some("user-2"));

        store.clear_history(Some("user-1")).unwrap();
        assert!(store.is_empty());
        // user-2's pool contribution survives an owner-scoped clear.
        assert_eq!(store.sync().record_count(), 1);
    }

    #[test]
    fn persistence_sees_every_mutation() {
        let mut persistence = MemoryHistory::default();
        persistence.saved = vec![color_result("old", 500.0)];

        let mut store = HistoryStore::open(persistence, MemoryRecordStore::new());
        assert_eq!(store.len(), 1);

        store.add_result(color_result("new", 240.0), None);
        assert_eq!(store.len(), 2);
        store.delete_result("old").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.results()[0].id, "new");
    }

    // Remote double that refuses every write but still serves reads.
    struct FlakyRemote(MemoryRecordStore);

    impl RecordSync for FlakyRemote {
        fn insert(&mut self, _record: PopulationRecord) -> Result<(), SyncError> {
            Err(SyncError::Unavailable("insert refused".into()))
        }
        fn scores(&self, kind: TestKind, key: MetricKey) -> Result<Vec<f64>, SyncError> {
            self.0.scores(kind, key)
        }
        fn delete(&mut self, _id: &str) -> Result<(), SyncError> {
            Err(SyncError::Unavailable("delete refused".into()))
        }
        fn clear(&mut self, _owner: &str) -> Result<(), SyncError> {
            Err(SyncError::Unavailable("clear refused".into()))
        }
        fn records_for_owner(&self, owner: &str) -> Result<Vec<PopulationRecord>, SyncError> {
            self.0.records_for_owner(owner)
        }
    }

    #[test]
    fn insert_failures_stay_local_delete_failures_propagate() {
        let mut store =
            HistoryStore::open(MemoryHistory::default(), FlakyRemote(MemoryRecordStore::new()));

        // Fire-and-forget: the local insert succeeds regardless.
        store.add_result(color_result("a", 250.0), None);
        assert_eq!(store.len(), 1);

        // Destructive ops surface the failure, but local state already moved.
        let err = store.delete_result("a").unwrap_err();
        assert!(matches!(err, HistoryError::RemoteDelete(_)));
        assert!(store.is_empty());

        store.add_result(color_result("b", 250.0), None);
        let err = store.clear_history(Some("user-1")).unwrap_err();
        assert!(matches!(err, HistoryError::RemoteClear(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn population_fetch_failure_degrades_to_median() {
        struct NoScores;
        impl RecordSync for NoScores {
            fn insert(&mut self, _r: PopulationRecord) -> Result<(), SyncError> {
                Ok(())
            }
            fn scores(&self, _k: TestKind, _m: MetricKey) -> Result<Vec<f64>, SyncError> {
                Err(SyncError::Unavailable("offline".into()))
            }
            fn delete(&mut self, _id: &str) -> Result<(), SyncError> {
                Ok(())
            }
            fn clear(&mut self, _o: &str) -> Result<(), SyncError> {
                Ok(())
            }
            fn records_for_owner(&self, _o: &str) -> Result<Vec<PopulationRecord>, SyncError> {
                Ok(Vec::new())
            }
        }

        let mut store = HistoryStore::open(MemoryHistory::default(), NoScores);
        let added = store.add_result(color_result("a", 250.0), None);
        assert_eq!(added.percentile, Some(DEFAULT_PERCENTILE));
    }

    #[test]
    fn failed_run_gets_no_percentile() {
        let mut store = store();
        let mut aborted = TestResult::new("f".into(), TestKind::ColorChange, 1);
        aborted.success = false;
        aborted.total_clicks = Some(2);
        let added = store.add_result(aborted, None);
        assert_eq!(added.percentile, None);
    }
}
