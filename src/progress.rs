//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar e le statistiche di estrazione.
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar principale (`indicatif`)
//! - `ExtractionStats`: Snapshot dei contatori per categoria a fine run
//!
//! ## Progress tracking:
//! La lunghezza della barra non è nota in anticipo: parte dal numero di file
//! e viene corretta man mano che i record vengono scoperti (vedi
//! `extractor::ProgressTracker`).
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================>---------------] 1500/2300 (65%) [OK] bg_01
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;

/// Manages the progress bar of one extraction run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total: u64, visible: bool) -> Self {
        if !visible {
            return Self { bar: ProgressBar::hidden() };
        }

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Imposta la lunghezza totale corrente
    pub fn set_length(&self, total: u64) {
        self.bar.set_length(total);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Per-category counters of a finished run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionStats {
    pub files_found: usize,
    pub counts: BTreeMap<String, u64>,
    pub duration_seconds: f64,
}

/// Categorie fisse; tutte le altre sono nomi di tipi senza handler
const BUILTIN_CATEGORIES: [&str; 7] = ["text", "image", "audio", "gameobject", "skipped", "error", "failed_files"];

impl ExtractionStats {
    pub fn is_builtin_category(category: &str) -> bool {
        BUILTIN_CATEGORIES.contains(&category)
    }

    pub fn get(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn exported(&self) -> u64 {
        ["text", "image", "audio", "gameobject"]
            .iter()
            .map(|category| self.get(category))
            .sum()
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Files: {} ({} failed) | Exported: {} (text {}, image {}, audio {}, gameobject {}) | Skipped: {} | Errors: {}",
            self.files_found,
            self.get("failed_files"),
            self.exported(),
            self.get("text"),
            self.get("image"),
            self.get("audio"),
            self.get("gameobject"),
            self.get("skipped"),
            self.get("error"),
        )
    }
}
