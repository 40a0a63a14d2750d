//! # Extraction Context
//!
//! Stato condiviso di un singolo run, costruito una volta dal driver e
//! passato ai worker tramite `Arc`.

use crate::bundle::RecordKey;
use crate::exporter::Exporter;
use crate::extractor::{ProgressTracker, WorkerPool};
use crate::hierarchy::HierarchyMerger;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Shared state of one extraction run
pub struct ExtractionContext {
    pub progress: ProgressTracker,
    pub merger: HierarchyMerger,
    pub exporter: Exporter,
    pub file_pool: WorkerPool,
    pub record_pool: WorkerPool,
    processed: Mutex<HashSet<RecordKey>>,
}

impl ExtractionContext {
    pub fn new(progress: ProgressTracker, exporter: Exporter, file_workers: usize, record_workers: usize) -> Self {
        Self {
            progress,
            merger: HierarchyMerger::new(),
            exporter,
            file_pool: WorkerPool::new("file", file_workers),
            record_pool: WorkerPool::new("record", record_workers),
            processed: Mutex::new(HashSet::new()),
        }
    }

    /// Segna il record come processato. `false` se lo era già.
    pub fn mark_processed(&self, key: RecordKey) -> bool {
        self.processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Attende la fine di tutto il lavoro: prima i file, poi i record
    /// (che possono crescere durante l'attesa).
    pub async fn join(&self) {
        self.file_pool.join().await;
        self.file_pool.close();
        self.record_pool.join().await;
        self.record_pool.close();
    }
}
