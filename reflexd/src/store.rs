//! File-backed persistence and record-pool adapters.
//!
//! Both files use the `reflex::storage` snapshot frame (magic + version +
//! LZ4 JSON). The record pool keeps its working set in memory and rewrites
//! its snapshot after every mutation; read queries never touch the disk.

use std::fs::File;
use std::io;
use std::path::PathBuf;

use reflex::history::{
    HistoryPersistence, MemoryRecordStore, PopulationRecord, RecordSync, SyncError,
};
use reflex::result::{MetricKey, TestKind, TestResult};
use reflex::storage::{read_snapshot, write_snapshot};
use tracing::info;

pub struct FileHistory {
    path: PathBuf,
}

impl FileHistory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HistoryPersistence for FileHistory {
    fn load(&mut self) -> io::Result<Vec<TestResult>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut file = File::open(&self.path)?;
        let results: Vec<TestResult> = read_snapshot(&mut file)?;
        info!("loaded {} history entries", results.len());
        Ok(results)
    }

    fn save(&mut self, results: &[TestResult]) -> io::Result<()> {
        let mut file = File::create(&self.path)?;
        write_snapshot(&mut file, &results)
    }
}

pub struct FileRecordStore {
    path: PathBuf,
    records: MemoryRecordStore,
}

impl FileRecordStore {
    /// Open the pool snapshot, or start an empty pool on first run.
    pub fn open(path: PathBuf) -> io::Result<Self> {
        let records = if path.exists() {
            let mut file = File::open(&path)?;
            let records: MemoryRecordStore = read_snapshot(&mut file)?;
            info!("loaded record pool ({} records)", records.record_count());
            records
        } else {
            MemoryRecordStore::new()
        };
        Ok(Self { path, records })
    }

    fn persist(&self) -> Result<(), SyncError> {
        let mut file = File::create(&self.path)?;
        write_snapshot(&mut file, &self.records)?;
        Ok(())
    }
}

impl RecordSync for FileRecordStore {
    fn insert(&mut self, record: PopulationRecord) -> Result<(), SyncError> {
        self.records.insert(record)?;
        self.persist()
    }

    fn scores(&self, kind: TestKind, key: MetricKey) -> Result<Vec<f64>, SyncError> {
        self.records.scores(kind, key)
    }

    fn delete(&mut self, id: &str) -> Result<(), SyncError> {
        self.records.delete(id)?;
        self.persist()
    }

    fn clear(&mut self, owner: &str) -> Result<(), SyncError> {
        self.records.clear(owner)?;
        self.persist()
    }

    fn records_for_owner(&self, owner: &str) -> Result<Vec<PopulationRecord>, SyncError> {
        self.records.records_for_owner(owner)
    }
}
