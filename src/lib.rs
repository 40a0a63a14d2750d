//! # Asset Extractor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom dei collaboratori e degli exporter
//! - `bundle`: Seam verso il decoder dei bundle, più il loader di dump JSON
//! - `codec`: Encoder WebP/WAV e seam verso il decoder audio
//! - `exporter`: Writer per testo, immagini e audio
//! - `hierarchy`: Merge della gerarchia di scena per cartella
//! - `extractor`: Orchestratore, dispatcher e scheduler
//! - `file_manager`: Discovery dei file e scritture atomiche
//! - `progress`: Progress bar e statistiche
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use asset_extractor::{AssetExtractor, Config, JsonDumpLoader, UnavailableAudioDecoder};
//!
//! let extractor = AssetExtractor::new(config, Arc::new(JsonDumpLoader::new()), Arc::new(UnavailableAudioDecoder))?;
//! let stats = extractor.run(&path).await?;
//! ```

pub mod config;
pub mod error;
pub mod bundle;
pub mod codec;
pub mod exporter;
pub mod hierarchy;
pub mod extractor;
pub mod file_manager;
pub mod progress;

pub use config::Config;
pub use error::ExtractError;
pub use bundle::dump::JsonDumpLoader;
pub use bundle::{Bundle, BundleLoader, RecordHandle, RecordKey, RecordReader, RecordType};
pub use codec::{AudioDecoder, PcmAudio, UnavailableAudioDecoder};
pub use extractor::AssetExtractor;
pub use hierarchy::{HierarchyMerger, SceneNode, SceneTree};
pub use progress::ExtractionStats;
