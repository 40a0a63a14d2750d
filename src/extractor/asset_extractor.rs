//! # Asset Extractor Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli specializzati.
//!
//! ## Flusso di un run:
//! 1. Discovery dei file di input (la directory di output è esclusa)
//! 2. Un task per file sul file pool: cartella di output, load del bundle,
//!    dispatch dei record elencati
//! 3. Attesa in due fasi: file pool, poi record pool fino a quiescenza
//! 4. Flush unico di tutti i `GameObject.json`
//! 5. Report finale per categoria

use crate::{
    bundle::{BundleLoader, RecordHandle, RecordType},
    codec::AudioDecoder,
    config::Config,
    exporter::Exporter,
    extractor::{Dispatcher, ExtractionContext, PathResolver, ProgressTracker},
    file_manager::FileManager,
    progress::ExtractionStats,
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Orchestratore principale
pub struct AssetExtractor {
    config: Config,
    loader: Arc<dyn BundleLoader>,
    audio_decoder: Arc<dyn AudioDecoder>,
}

/// Tutto ciò che serve a un task del file pool
#[derive(Clone)]
struct FileJob {
    dispatcher: Arc<Dispatcher>,
    loader: Arc<dyn BundleLoader>,
    input_dir: Arc<Path>,
    output_root: Arc<Path>,
    skip_existing_dirs: bool,
    skip_asset_bundles: bool,
}

impl AssetExtractor {
    /// Crea nuova istanza dell'estrattore
    pub fn new(config: Config, loader: Arc<dyn BundleLoader>, audio_decoder: Arc<dyn AudioDecoder>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            loader,
            audio_decoder,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Esegue l'estrazione di tutti i file sotto `input_dir`
    pub async fn run(&self, input_dir: &Path) -> Result<ExtractionStats> {
        let start_time = Instant::now();

        let input_dir = tokio::fs::canonicalize(input_dir)
            .await
            .map_err(|e| anyhow::anyhow!("Cannot read input directory {}: {}", input_dir.display(), e))?;
        tokio::fs::create_dir_all(&self.config.output_path).await.map_err(|e| {
            anyhow::anyhow!(
                "Failed to create output directory {}: {}",
                self.config.output_path.display(),
                e
            )
        })?;
        let output_root = tokio::fs::canonicalize(&self.config.output_path).await?;

        let files = FileManager::find_input_files(&input_dir, &output_root)?;
        self.log_configuration(&input_dir, &output_root, files.len());

        let progress = ProgressTracker::new(files.len(), self.config.show_progress);
        let context = Arc::new(ExtractionContext::new(
            progress.clone(),
            Exporter::new(self.audio_decoder.clone()),
            self.config.workers,
            self.config.record_workers,
        ));

        let job = FileJob {
            dispatcher: Dispatcher::new(context.clone()),
            loader: self.loader.clone(),
            input_dir: Arc::from(input_dir),
            output_root: Arc::from(output_root),
            skip_existing_dirs: self.config.skip_existing_dirs,
            skip_asset_bundles: self.config.skip_asset_bundles,
        };
        for file in files {
            context.file_pool.spawn(job.clone().process_file(file));
        }

        context.join().await;
        debug!(
            "All workers idle, {} records seen, {} scene folders to flush",
            context.processed_count(),
            context.merger.folder_count()
        );

        let flushed = context.merger.flush_all().await;
        let stats = progress.get_stats(start_time.elapsed().as_secs_f64());
        progress.finish(&stats.format_summary());

        let written = flushed.map_err(|e| anyhow::anyhow!("Failed to write scene hierarchy: {}", e))?;
        self.print_final_stats(&stats, written);
        Ok(stats)
    }

    /// Logga configurazione
    fn log_configuration(&self, input_dir: &Path, output_root: &Path, file_count: usize) {
        info!("Starting asset extraction in: {}", input_dir.display());
        info!("Output directory: {}", output_root.display());
        info!(
            "Workers: {} file, {} record",
            self.config.workers, self.config.record_workers
        );
        if self.config.skip_existing_dirs {
            info!("Skip mode: Will skip files whose output directory is already populated");
        }
        if self.config.skip_asset_bundles {
            info!("AssetBundle records listed in files will not be expanded");
        }
        info!("Found {} input files to process", file_count);
    }

    fn print_final_stats(&self, stats: &ExtractionStats, hierarchy_files: usize) {
        info!("=== Extraction Complete ===");
        info!("Files found: {}", stats.files_found);
        info!("Files failed to load: {}", stats.get("failed_files"));
        info!(
            "Exported: {} text, {} image, {} audio, {} gameobject",
            stats.get("text"),
            stats.get("image"),
            stats.get("audio"),
            stats.get("gameobject")
        );
        info!("Skipped: {}", stats.get("skipped"));
        info!("Errors: {}", stats.get("error"));
        info!("Scene hierarchy files written: {}", hierarchy_files);

        let unhandled: Vec<String> = stats
            .counts
            .iter()
            .filter(|(category, _)| !ExtractionStats::is_builtin_category(category))
            .map(|(category, count)| format!("{} {}", category, count))
            .collect();
        if !unhandled.is_empty() {
            info!("Unhandled record types: {}", unhandled.join(", "));
        }
        info!("Duration: {:.2}s", stats.duration_seconds);
    }
}

impl FileJob {
    /// Task del file pool per un singolo file di input
    async fn process_file(self, file: PathBuf) {
        let progress = &self.dispatcher.context().progress;

        let out_dir = match PathResolver::prepare_output_dir(
            &file,
            &self.input_dir,
            &self.output_root,
            self.skip_existing_dirs,
        )
        .await
        {
            Ok(Some(out_dir)) => out_dir,
            Ok(None) => {
                info!("[SKIP] Output directory already populated for {}", file.display());
                progress.count("skipped");
                progress.advance(&format!("[SKIP] {}", file.display()));
                return;
            }
            Err(e) => {
                error!("Failed to prepare output for {}: {}", file.display(), e);
                progress.count("failed_files");
                progress.advance(&format!("[ERROR] {}", file.display()));
                return;
            }
        };

        let loader = self.loader.clone();
        let path = file.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load(&path).map(|bundle| bundle.records())).await;
        let records: Vec<RecordHandle> = match loaded {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                error!("Failed to load {}: {}", file.display(), e);
                progress.count("failed_files");
                progress.advance(&format!("[ERROR] {}", file.display()));
                return;
            }
            Err(e) => {
                error!("Loader crashed on {}: {}", file.display(), e);
                progress.count("failed_files");
                progress.advance(&format!("[ERROR] {}", file.display()));
                return;
            }
        };

        // l'unità stimata del file viene sostituita dai suoi record
        progress.resolve_file_slot();

        let source: Arc<Path> = Arc::from(file.as_path());
        let out_dir: Arc<Path> = Arc::from(out_dir);
        for record in records {
            if self.skip_asset_bundles && record.record_type() == RecordType::AssetBundle {
                continue;
            }
            self.dispatcher.dispatch(record, &source, &out_dir);
        }
        debug!("Finished file {}", file.display());
    }
}
