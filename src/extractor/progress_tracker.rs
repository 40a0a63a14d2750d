//! # Progress Tracking Module
//!
//! Unifica progress bar e contatori in un singolo tracker thread-safe.
//!
//! Il totale è dinamico: ogni file conta inizialmente come un'unità, che
//! viene rimossa quando il file si carica e i suoi record sono noti; ogni
//! record schedulato aggiunge un'unità.

use crate::progress::{ExtractionStats, ProgressManager};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tracker progress + contatori condiviso da tutti i worker
#[derive(Clone)]
pub struct ProgressTracker {
    files_found: usize,
    total: Arc<Mutex<u64>>,
    counters: Arc<Mutex<BTreeMap<String, u64>>>,
    progress_manager: ProgressManager,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // i contatori restano validi anche se un worker è andato in panic
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressTracker {
    /// Crea un nuovo tracker
    pub fn new(files_found: usize, visible: bool) -> Self {
        Self {
            files_found,
            total: Arc::new(Mutex::new(files_found as u64)),
            counters: Arc::new(Mutex::new(BTreeMap::new())),
            progress_manager: ProgressManager::new(files_found as u64, visible),
        }
    }

    /// Applica una variazione al totale in modo atomico rispetto alle altre
    fn adjust_total(&self, delta: i64) {
        let mut total = lock(&self.total);
        *total = total.saturating_add_signed(delta);
        self.progress_manager.set_length(*total);
    }

    /// Un record da processare è stato scoperto
    pub fn add_discovered(&self) {
        self.adjust_total(1);
    }

    /// Il file è stato caricato: la sua unità stimata viene sostituita dai record
    pub fn resolve_file_slot(&self) {
        self.adjust_total(-1);
    }

    /// Un'unità di lavoro è terminata
    pub fn advance(&self, message: &str) {
        self.progress_manager.update(message);
    }

    pub fn total(&self) -> u64 {
        *lock(&self.total)
    }

    pub fn completed(&self) -> u64 {
        self.progress_manager.position()
    }

    /// Incrementa il contatore di una categoria
    pub fn count(&self, category: &str) {
        let mut counters = lock(&self.counters);
        *counters.entry(category.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, category: &str) -> u64 {
        lock(&self.counters).get(category).copied().unwrap_or(0)
    }

    /// Finalizza progress bar
    pub fn finish(&self, summary: &str) {
        self.progress_manager.finish(summary);
    }

    /// Ottieni statistiche per report finale
    pub fn get_stats(&self, duration_seconds: f64) -> ExtractionStats {
        ExtractionStats {
            files_found: self.files_found,
            counts: lock(&self.counters).clone(),
            duration_seconds,
        }
    }
}
