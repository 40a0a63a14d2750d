//! # Bundle Collaborator Module
//!
//! Confine tra la pipeline e il decoder esterno del formato bundle.
//!
//! ## Responsabilità:
//! - `BundleLoader`: carica un file e restituisce il container decodificato
//! - `Bundle`: elenca i record direttamente contenuti nel file
//! - `RecordReader`: id, tag di tipo e accesso lazy al payload di un record
//! - `RecordKey`: chiave di dedup `(file sorgente, record id)`
//! - `RecordType`: insieme chiuso dei tag gestiti, più `Other` per il resto
//!
//! Il formato binario dei bundle non è definito qui; l'unica implementazione
//! concreta inclusa è `dump::JsonDumpLoader`.

pub mod dump;
pub mod payload;

#[cfg(test)]
pub(crate) mod memory;

pub use payload::*;

use crate::error::ExtractError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Type tag of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    TextAsset,
    Texture2D,
    Sprite,
    AudioClip,
    AssetBundle,
    GameObject,
    Other(String),
}

impl RecordType {
    /// Converte il nome del tipo riportato dal decoder
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "TextAsset" => Self::TextAsset,
            "Texture2D" => Self::Texture2D,
            "Sprite" => Self::Sprite,
            "AudioClip" => Self::AudioClip,
            "AssetBundle" => Self::AssetBundle,
            "GameObject" => Self::GameObject,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::TextAsset => "TextAsset",
            Self::Texture2D => "Texture2D",
            Self::Sprite => "Sprite",
            Self::AudioClip => "AudioClip",
            Self::AssetBundle => "AssetBundle",
            Self::GameObject => "GameObject",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Globally unique identity of a record for one run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub source: Arc<Path>,
    pub record_id: i64,
}

impl RecordKey {
    pub fn new(source: Arc<Path>, record_id: i64) -> Self {
        Self { source, record_id }
    }
}

/// One typed record inside a bundle
pub trait RecordReader: Send + Sync {
    fn record_id(&self) -> i64;

    fn record_type(&self) -> RecordType;

    /// Decodifica il payload. Può essere costoso: viene chiamato solo dal
    /// handler del record, mai durante il dispatch.
    fn read(&self) -> Result<Payload, ExtractError>;
}

pub type RecordHandle = Arc<dyn RecordReader>;

/// A decoded bundle file
pub trait Bundle: Send + Sync {
    /// Records listed directly by the file, in file order
    fn records(&self) -> Vec<RecordHandle>;
}

/// Loads bundle files. Implementations are blocking and are called from
/// the blocking thread pool.
pub trait BundleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn Bundle>, ExtractError>;
}
