//! # Asset Extractor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione da file e override da CLI
//! - Avvio dell'estrattore e stampa del riepilogo
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (directory, output, workers, etc.)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` se presente)
//! 3. Valida che la directory di input esista
//! 4. Carica `Config` dal file (se presente) e applica gli override
//! 5. Istanzia AssetExtractor e avvia l'estrazione
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-extractor /path/to/dumps --output /path/to/out --workers 8 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use asset_extractor::{AssetExtractor, Config, JsonDumpLoader, UnavailableAudioDecoder};

#[derive(Parser)]
#[command(name = "asset-extractor")]
#[command(about = "Extract game-asset bundles and rebuild their scene hierarchy")]
struct Args {
    /// Directory containing bundle files to extract
    input_dir: PathBuf,

    /// Output directory (default from config, then ./extracted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel file loaders
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of parallel record handlers
    #[arg(long)]
    record_workers: Option<usize>,

    /// Skip files whose output directory already has entries
    #[arg(long)]
    skip_existing_dirs: bool,

    /// Do not expand AssetBundle records listed in the files
    #[arg(long)]
    skip_asset_bundles: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Applica gli override della command line
    fn apply(&self, config: &mut Config) {
        if let Some(ref output) = self.output {
            config.output_path = output.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(record_workers) = self.record_workers {
            config.record_workers = record_workers;
        }
        config.skip_existing_dirs |= self.skip_existing_dirs;
        config.skip_asset_bundles |= self.skip_asset_bundles;
        if self.no_progress {
            config.show_progress = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Validate arguments
    if !args.input_dir.is_dir() {
        return Err(anyhow::anyhow!("Input directory does not exist: {}", args.input_dir.display()));
    }

    let mut config = match args.config.clone().or_else(Config::default_config_path) {
        Some(path) => {
            let config = Config::from_file(&path).await?;
            if path.exists() {
                info!("Loaded configuration from {}", path.display());
            }
            config
        }
        None => Config::default(),
    };
    args.apply(&mut config);

    let extractor = AssetExtractor::new(
        config,
        Arc::new(JsonDumpLoader::new()),
        Arc::new(UnavailableAudioDecoder),
    )?;
    let stats = extractor.run(&args.input_dir).await?;

    println!("{}", stats.format_summary());
    Ok(())
}
