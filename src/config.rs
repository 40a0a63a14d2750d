//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'estrattore.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di estrazione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `workers`: Worker del file pool (default: 8)
//! - `record_workers`: Worker del record pool (default: 8)
//! - `output_path`: Directory radice di output
//! - `skip_existing_dirs`: Salta i file la cui cartella di output è già popolata
//! - `skip_asset_bundles`: Non espande i record AssetBundle elencati nei file
//! - `show_progress`: Mostra la progress bar
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     workers: 4,
//!     output_path: PathBuf::from("/out"),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for asset extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of parallel file loaders
    pub workers: usize,
    /// Number of parallel record handlers
    pub record_workers: usize,
    /// Output root directory
    pub output_path: PathBuf,
    /// Skip input files whose output directory already has entries
    pub skip_existing_dirs: bool,
    /// Do not dispatch AssetBundle records listed directly in a file
    pub skip_asset_bundles: bool,
    /// Draw the progress bar
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 8,
            record_workers: 8,
            output_path: PathBuf::from("extracted"),
            skip_existing_dirs: false,
            skip_asset_bundles: false,
            show_progress: true,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.record_workers == 0 {
            return Err(anyhow::anyhow!("Number of record workers must be greater than 0"));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Output path must not be empty"));
        }

        if self.output_path.exists() && !self.output_path.is_dir() {
            return Err(anyhow::anyhow!("Output path is not a directory: {}", self.output_path.display()));
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Path di default del file di configurazione utente
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("asset-extractor").join("config.json"))
    }
}
